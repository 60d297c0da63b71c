use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use super::protocol::{Envelope, Request, Response};
use crate::model::{ExifModificationResult, ImageData};

#[derive(Debug, Error, PartialEq)]
pub enum BridgeError {
    #[error("bridge disconnected")]
    Disconnected,
    #[error("scan failed: {0}")]
    ScanFailed(String),
    #[error("expected {expected}, got {got}")]
    Unexpected {
        expected: &'static str,
        got: &'static str,
    },
}

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Response>>>>;

/// UI-side handle to a bridge.
///
/// Every request gets a fresh id and its own future; responses are routed
/// back by id, so concurrent requests of the same kind cannot be mixed up.
#[derive(Clone)]
pub struct BridgeClient {
    requests: mpsc::Sender<Envelope<Request>>,
    pending: Pending,
    next_id: Arc<AtomicU64>,
}

impl BridgeClient {
    /// Attach to the two ends of a bridge. Spawns the response dispatcher on
    /// the current runtime.
    pub fn connect(
        requests: mpsc::Sender<Envelope<Request>>,
        mut responses: mpsc::Receiver<Envelope<Response>>,
    ) -> Self {
        let pending: Pending = Arc::default();

        let dispatch = Arc::clone(&pending);
        tokio::spawn(async move {
            while let Some(Envelope { id, message }) = responses.recv().await {
                let waiter = lock(&dispatch).remove(&id);
                match waiter {
                    Some(tx) => {
                        // The caller may have given up on the answer.
                        let _ = tx.send(message);
                    }
                    None => log::warn!("Response #{id} ({}) matches no request", message.name()),
                }
            }
            // Dropping the senders wakes every waiter with an error.
            lock(&dispatch).clear();
        });

        Self {
            requests,
            pending,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Send one request and wait for its response.
    pub async fn request(&self, request: Request) -> Result<Response, BridgeError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        lock(&self.pending).insert(id, tx);

        if self
            .requests
            .send(Envelope { id, message: request })
            .await
            .is_err()
        {
            lock(&self.pending).remove(&id);
            return Err(BridgeError::Disconnected);
        }

        rx.await.map_err(|_| BridgeError::Disconnected)
    }

    /// Open the directory chooser. `None` when cancelled.
    pub async fn select_directory(&self) -> Result<Option<PathBuf>, BridgeError> {
        match self.request(Request::SelectDirectory).await? {
            Response::DirectorySelected(dir) => Ok(dir),
            other => Err(unexpected("directory-selected", other)),
        }
    }

    pub async fn get_images(&self, dir: &Path) -> Result<Vec<ImageData>, BridgeError> {
        let request = Request::GetImages {
            dir: dir.to_path_buf(),
        };
        match self.request(request).await? {
            Response::ImagesFound(images) => Ok(images),
            other => Err(unexpected("images-found", other)),
        }
    }

    pub async fn get_images_count(&self, dir: &Path) -> Result<usize, BridgeError> {
        let request = Request::GetImagesCount {
            dir: dir.to_path_buf(),
        };
        match self.request(request).await? {
            Response::ImagesCount(count) => Ok(count),
            other => Err(unexpected("images-count", other)),
        }
    }

    pub async fn get_images_page(
        &self,
        dir: &Path,
        page: usize,
        page_size: usize,
    ) -> Result<Vec<ImageData>, BridgeError> {
        let request = Request::GetImagesPage {
            dir: dir.to_path_buf(),
            page,
            page_size,
        };
        match self.request(request).await? {
            Response::ImagesPageFound(images) => Ok(images),
            other => Err(unexpected("images-page-found", other)),
        }
    }

    pub async fn modify_exif(&self, image: ImageData) -> Result<ExifModificationResult, BridgeError> {
        match self.request(Request::ModifyExif(image)).await? {
            Response::ModifyExifResult(result) => Ok(result),
            other => Err(unexpected("modify-exif-result", other)),
        }
    }
}

fn unexpected(expected: &'static str, got: Response) -> BridgeError {
    match got {
        Response::ScanFailed { message } => BridgeError::ScanFailed(message),
        other => BridgeError::Unexpected {
            expected,
            got: other.name(),
        },
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{spawn, Bridge, FixedPicker, NoPicker};
    use crate::config::OutputConfig;
    use crate::fixtures;
    use crate::scan::Scanner;
    use tempfile::TempDir;

    fn client() -> BridgeClient {
        spawn(Bridge::new(
            Scanner::default(),
            FixedPicker(Some(PathBuf::from("/picked"))),
            OutputConfig::default(),
        ))
    }

    #[tokio::test]
    async fn typed_calls() {
        let dir = TempDir::new().unwrap();
        for name in ["a.jpg", "b.jpg", "c.jpg"] {
            std::fs::write(dir.path().join(name), fixtures::plain_jpeg()).unwrap();
        }
        let client = client();

        assert_eq!(client.get_images_count(dir.path()).await.unwrap(), 3);
        assert_eq!(client.get_images(dir.path()).await.unwrap().len(), 3);
        assert_eq!(client.get_images_page(dir.path(), 1, 2).await.unwrap().len(), 1);
        assert_eq!(
            client.select_directory().await.unwrap(),
            Some(PathBuf::from("/picked"))
        );
    }

    #[tokio::test]
    async fn overlapping_requests_get_their_own_answers() {
        let small = TempDir::new().unwrap();
        let large = TempDir::new().unwrap();
        std::fs::write(small.path().join("a.jpg"), fixtures::plain_jpeg()).unwrap();
        for i in 0..4 {
            std::fs::write(large.path().join(format!("{i}.jpg")), fixtures::plain_jpeg()).unwrap();
        }
        let client = client();

        let (a, b, c) = tokio::join!(
            client.get_images_count(large.path()),
            client.get_images_count(small.path()),
            client.get_images_count(Path::new("")),
        );
        assert_eq!((a.unwrap(), b.unwrap(), c.unwrap()), (4, 1, 0));
    }

    #[tokio::test]
    async fn scan_failure_surfaces_as_error() {
        let err = client()
            .get_images(Path::new("/nonexistent/photos"))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::ScanFailed(_)));
    }

    #[tokio::test]
    async fn cancelled_chooser_is_none() {
        let client = spawn(Bridge::new(Scanner::default(), NoPicker, OutputConfig::default()));
        assert_eq!(client.select_directory().await.unwrap(), None);
    }

    #[tokio::test]
    async fn closed_bridge_is_disconnected() {
        let (req_tx, req_rx) = mpsc::channel(1);
        let (_resp_tx, resp_rx) = mpsc::channel(1);
        drop(req_rx);
        let client = BridgeClient::connect(req_tx, resp_rx);
        assert_eq!(
            client.get_images_count(Path::new("")).await,
            Err(BridgeError::Disconnected)
        );
    }

    #[tokio::test]
    async fn dropped_responses_wake_waiters() {
        let (req_tx, mut req_rx) = mpsc::channel(1);
        let (resp_tx, resp_rx) = mpsc::channel::<Envelope<Response>>(1);
        let client = BridgeClient::connect(req_tx, resp_rx);

        tokio::spawn(async move {
            // Receive the request, then hang up without answering.
            let _ = req_rx.recv().await;
            drop(resp_tx);
        });
        assert_eq!(
            client.get_images_count(Path::new("")).await,
            Err(BridgeError::Disconnected)
        );
    }
}
