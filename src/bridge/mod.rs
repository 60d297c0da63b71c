//! Message bridge between the UI side and the privileged (filesystem) side.
//!
//! The UI sends a [`Request`] wrapped in an [`Envelope`] and later receives
//! the [`Response`] carrying the same id. [`Bridge`] is the privileged
//! handler; [`serve`] runs it over a pair of channels, one task per request,
//! so overlapping requests never wait on each other. Scanning, decoding and
//! writing run on tokio's blocking pool.
//!
//! - [`spawn`] wires a [`BridgeClient`] to a bridge inside the current process
//! - [`stdio::serve_stdio`] runs the same protocol as JSON lines over
//!   stdin/stdout, for a UI living in another process

mod client;
mod picker;
mod protocol;
pub mod stdio;

pub use client::{BridgeClient, BridgeError};
pub use picker::{DirectoryPicker, FixedPicker, NoPicker};
#[cfg(feature = "dialog")]
pub use picker::RfdPicker;
pub use protocol::{Envelope, Request, Response};

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::config::{Config, OutputConfig};
use crate::exif;
use crate::facade::ImageDataFacade;
use crate::model::{ExifModificationResult, ImageData};
use crate::scan::{ScanError, Scanner};

/// Channel capacity on both directions of an in-process bridge.
const CHANNEL_CAPACITY: usize = 32;

pub struct Bridge {
    scanner: Scanner,
    picker: Box<dyn DirectoryPicker>,
    output: OutputConfig,
}

impl Bridge {
    pub fn new(scanner: Scanner, picker: impl DirectoryPicker + 'static, output: OutputConfig) -> Self {
        Self {
            scanner,
            picker: Box::new(picker),
            output,
        }
    }

    pub fn from_config(config: &Config, picker: impl DirectoryPicker + 'static) -> Self {
        Self::new(
            Scanner::new(config.scan.sniff_bytes),
            picker,
            config.output.clone(),
        )
    }

    /// Answer one request.
    pub async fn handle(&self, request: Request) -> Response {
        match request {
            Request::SelectDirectory => {
                let dir = self.picker.pick_directory().await;
                match &dir {
                    Some(d) => log::info!("Directory selected: {}", d.display()),
                    None => log::debug!("Directory selection cancelled"),
                }
                Response::DirectorySelected(dir)
            }
            Request::GetImages { dir } => {
                let scanner = self.scanner.clone();
                match blocking(move || scanner.list_all_images(&dir)).await {
                    Ok(images) => Response::ImagesFound(images),
                    Err(e) => scan_failed(e),
                }
            }
            Request::GetImagesCount { dir } => {
                let scanner = self.scanner.clone();
                match blocking(move || scanner.count_images(&dir)).await {
                    Ok(count) => Response::ImagesCount(count),
                    Err(e) => scan_failed(e),
                }
            }
            Request::GetImagesPage { dir, page, page_size } => {
                let scanner = self.scanner.clone();
                match blocking(move || scanner.list_images_page(&dir, page, page_size)).await {
                    Ok(images) => Response::ImagesPageFound(images),
                    Err(e) => scan_failed(e),
                }
            }
            Request::ModifyExif(image) => Response::ModifyExifResult(self.modify_exif(image).await),
        }
    }

    async fn modify_exif(&self, image: ImageData) -> ExifModificationResult {
        let path: PathBuf = image.path.clone();

        let facade = ImageDataFacade::new(image);
        if !facade.is_valid() {
            let problems: Vec<String> = facade
                .properties()
                .iter()
                .flat_map(|p| p.control.errors.iter().map(move |e| format!("{}: {e}", p.label)))
                .collect();
            log::warn!("Refusing to write invalid EXIF to {}: {}", path.display(), problems.join("; "));
            return ExifModificationResult::failed(path, problems.join("; "));
        }

        let image = facade.into_image();
        let backup = self.output.backup_originals;
        let dry_run = self.output.dry_run;
        let written = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
            let result = exif::write_exif(&image, backup, dry_run)?;
            if dry_run {
                return Ok((result, None));
            }
            let saved = exif::read_image(&image.path)
                .map_err(|e| log::warn!("Could not re-read {}: {e:#}", image.path.display()))
                .ok();
            Ok((result, saved))
        })
        .await;

        match written {
            Ok(Ok((result, _))) if dry_run => {
                log::info!(
                    "Dry run: {} tags not written to {}",
                    result.tags_written,
                    path.display()
                );
                ExifModificationResult::ok(path).as_dry_run()
            }
            Ok(Ok((result, saved))) => {
                log::info!("Saved EXIF ({} tags) to {}", result.tags_written, path.display());
                match saved {
                    Some(image) => ExifModificationResult::ok(path).with_saved(image),
                    None => ExifModificationResult::ok(path),
                }
            }
            Ok(Err(e)) => {
                log::error!("Failed to save EXIF to {}: {e:#}", path.display());
                ExifModificationResult::failed(path, format!("{e:#}"))
            }
            Err(e) => {
                log::error!("EXIF write task failed for {}: {e}", path.display());
                ExifModificationResult::failed(path, e.to_string())
            }
        }
    }
}

async fn blocking<T, F>(f: F) -> Result<T, ScanError>
where
    F: FnOnce() -> Result<T, ScanError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

fn scan_failed(e: ScanError) -> Response {
    log::error!("{e}");
    Response::ScanFailed {
        message: e.to_string(),
    }
}

/// Answer every request arriving on `requests` until that channel closes.
pub async fn serve(
    bridge: Arc<Bridge>,
    mut requests: mpsc::Receiver<Envelope<Request>>,
    responses: mpsc::Sender<Envelope<Response>>,
) {
    while let Some(Envelope { id, message }) = requests.recv().await {
        log::debug!("-> #{id} {}", message.name());
        let bridge = Arc::clone(&bridge);
        let responses = responses.clone();
        tokio::spawn(async move {
            let response = bridge.handle(message).await;
            log::debug!("<- #{id} {}", response.name());
            if responses
                .send(Envelope {
                    id,
                    message: response,
                })
                .await
                .is_err()
            {
                log::debug!("Client gone, dropping response #{id}");
            }
        });
    }
    log::debug!("Bridge request channel closed");
}

/// Run `bridge` on the current runtime and return a client connected to it.
pub fn spawn(bridge: Bridge) -> BridgeClient {
    let (request_tx, request_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (response_tx, response_rx) = mpsc::channel(CHANNEL_CAPACITY);
    tokio::spawn(serve(Arc::new(bridge), request_rx, response_tx));
    BridgeClient::connect(request_tx, response_rx)
}
