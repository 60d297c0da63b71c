//! UI-side state driven by the bridge.
//!
//! [`ImageService`] forwards requests through a [`BridgeClient`] and publishes
//! each answer on a `watch` channel, so any number of views can follow the
//! current image list, the image count and the outcome of the last save.

use std::path::{Path, PathBuf};
use tokio::sync::watch;

use crate::bridge::{BridgeClient, BridgeError};
use crate::facade::ImageDataFacade;
use crate::model::{ExifModificationResult, ImageData};

pub struct ImageService {
    client: BridgeClient,
    current_dir: watch::Sender<Option<PathBuf>>,
    images_number: watch::Sender<usize>,
    images_data: watch::Sender<Vec<ImageData>>,
    modification_response: watch::Sender<Option<ExifModificationResult>>,
}

impl ImageService {
    pub fn new(client: BridgeClient) -> Self {
        Self {
            client,
            current_dir: watch::channel(None).0,
            images_number: watch::channel(0).0,
            images_data: watch::channel(Vec::new()).0,
            modification_response: watch::channel(None).0,
        }
    }

    /// Ask for a directory. A chosen directory becomes the current one;
    /// cancelling keeps the previous choice.
    pub async fn select_directory(&self) -> Result<Option<PathBuf>, BridgeError> {
        let dir = self.client.select_directory().await?;
        if let Some(dir) = &dir {
            self.current_dir.send_replace(Some(dir.clone()));
        }
        Ok(dir)
    }

    /// Make `dir` the current directory without asking.
    pub fn set_current_dir(&self, dir: impl Into<PathBuf>) {
        self.current_dir.send_replace(Some(dir.into()));
    }

    pub fn current_dir(&self) -> Option<PathBuf> {
        self.current_dir.borrow().clone()
    }

    /// Load every JPEG in `dir` and publish the list.
    pub async fn get_images(&self, dir: &Path) -> Result<(), BridgeError> {
        let images = self.client.get_images(dir).await?;
        log::debug!("{} images loaded from {}", images.len(), dir.display());
        self.images_data.send_replace(images);
        Ok(())
    }

    /// Load one page of `dir` and publish it as the current list.
    pub async fn get_images_page(
        &self,
        dir: &Path,
        page: usize,
        page_size: usize,
    ) -> Result<(), BridgeError> {
        let images = self.client.get_images_page(dir, page, page_size).await?;
        log::debug!("Page {page} of {}: {} images", dir.display(), images.len());
        self.images_data.send_replace(images);
        Ok(())
    }

    pub async fn get_images_count(&self, dir: &Path) -> Result<usize, BridgeError> {
        let count = self.client.get_images_count(dir).await?;
        self.images_number.send_replace(count);
        Ok(count)
    }

    /// Send an edited image back for writing and publish the outcome.
    ///
    /// After a real write the held copy of that image is replaced with the
    /// one read back from disk. A dry run leaves the held images alone.
    pub async fn save_new_exif_value(
        &self,
        image: ImageData,
    ) -> Result<ExifModificationResult, BridgeError> {
        let result = self.client.modify_exif(image).await?;
        if !result.success {
            log::warn!(
                "EXIF not saved for {}: {}",
                result.path.display(),
                result.message.as_deref().unwrap_or("unknown error")
            );
        } else if let Some(saved) = &result.saved {
            self.images_data.send_if_modified(|images| {
                match images.iter_mut().find(|held| held.path == saved.path) {
                    Some(held) => {
                        *held = saved.clone();
                        true
                    }
                    None => false,
                }
            });
        } else if result.dry_run {
            log::debug!("Dry run for {}, held image unchanged", result.path.display());
        }
        self.modification_response.send_replace(Some(result.clone()));
        Ok(result)
    }

    pub fn images(&self) -> Vec<ImageData> {
        self.images_data.borrow().clone()
    }

    pub fn images_number(&self) -> usize {
        *self.images_number.borrow()
    }

    pub fn last_modification(&self) -> Option<ExifModificationResult> {
        self.modification_response.borrow().clone()
    }

    /// One editable facade per held image.
    pub fn facades(&self) -> Vec<ImageDataFacade> {
        self.images_data
            .borrow()
            .iter()
            .cloned()
            .map(ImageDataFacade::new)
            .collect()
    }

    pub fn subscribe_current_dir(&self) -> watch::Receiver<Option<PathBuf>> {
        self.current_dir.subscribe()
    }

    pub fn subscribe_images_number(&self) -> watch::Receiver<usize> {
        self.images_number.subscribe()
    }

    pub fn subscribe_images_data(&self) -> watch::Receiver<Vec<ImageData>> {
        self.images_data.subscribe()
    }

    pub fn subscribe_modification_response(
        &self,
    ) -> watch::Receiver<Option<ExifModificationResult>> {
        self.modification_response.subscribe()
    }
}

/// Pages needed to show `count` images, `page_size` at a time.
pub fn page_count(count: usize, page_size: usize) -> usize {
    if page_size == 0 {
        0
    } else {
        count.div_ceil(page_size)
    }
}
