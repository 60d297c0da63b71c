use async_trait::async_trait;
use std::path::PathBuf;

/// Native directory chooser.
///
/// Returns `None` when the user cancels.
#[async_trait]
pub trait DirectoryPicker: Send + Sync {
    async fn pick_directory(&self) -> Option<PathBuf>;
}

/// Used when no native dialog is available; every request counts as cancelled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPicker;

#[async_trait]
impl DirectoryPicker for NoPicker {
    async fn pick_directory(&self) -> Option<PathBuf> {
        log::info!("No directory chooser available (build with the `dialog` feature)");
        None
    }
}

/// Always answers with the same directory. Handy for scripting and tests.
#[derive(Debug, Default, Clone)]
pub struct FixedPicker(pub Option<PathBuf>);

#[async_trait]
impl DirectoryPicker for FixedPicker {
    async fn pick_directory(&self) -> Option<PathBuf> {
        self.0.clone()
    }
}

#[cfg(feature = "dialog")]
pub use self::native::RfdPicker;

#[cfg(feature = "dialog")]
mod native {
    use super::*;

    /// Directory chooser backed by the platform dialog.
    #[derive(Debug, Clone)]
    pub struct RfdPicker {
        title: String,
    }

    impl Default for RfdPicker {
        fn default() -> Self {
            Self {
                title: "Select image directory".to_string(),
            }
        }
    }

    impl RfdPicker {
        pub fn with_title(title: impl Into<String>) -> Self {
            Self { title: title.into() }
        }
    }

    #[async_trait]
    impl DirectoryPicker for RfdPicker {
        async fn pick_directory(&self) -> Option<PathBuf> {
            rfd::AsyncFileDialog::new()
                .set_title(&self.title)
                .pick_folder()
                .await
                .map(|handle| handle.path().to_path_buf())
        }
    }
}
