use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::model::{ExifModificationResult, ImageData};

/// Messages from the UI side to the privileged side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum Request {
    SelectDirectory,
    GetImages {
        dir: PathBuf,
    },
    GetImagesCount {
        dir: PathBuf,
    },
    GetImagesPage {
        dir: PathBuf,
        page: usize,
        page_size: usize,
    },
    ModifyExif(ImageData),
}

impl Request {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SelectDirectory => "select-directory",
            Self::GetImages { .. } => "get-images",
            Self::GetImagesCount { .. } => "get-images-count",
            Self::GetImagesPage { .. } => "get-images-page",
            Self::ModifyExif(_) => "modify-exif",
        }
    }
}

/// Messages from the privileged side back to the UI side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum Response {
    /// `None` when the chooser was cancelled.
    DirectorySelected(Option<PathBuf>),
    ImagesFound(Vec<ImageData>),
    ImagesCount(usize),
    ImagesPageFound(Vec<ImageData>),
    ModifyExifResult(ExifModificationResult),
    /// The directory could not be listed at all.
    ScanFailed { message: String },
}

impl Response {
    pub fn name(&self) -> &'static str {
        match self {
            Self::DirectorySelected(_) => "directory-selected",
            Self::ImagesFound(_) => "images-found",
            Self::ImagesCount(_) => "images-count",
            Self::ImagesPageFound(_) => "images-page-found",
            Self::ModifyExifResult(_) => "modify-exif-result",
            Self::ScanFailed { .. } => "scan-failed",
        }
    }
}

/// A message plus the id that correlates a response with its request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub id: u64,
    pub message: T,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_wire_shape() {
        let env = Envelope {
            id: 7,
            message: Request::GetImagesPage {
                dir: PathBuf::from("/photos"),
                page: 2,
                page_size: 10,
            },
        };
        assert_eq!(
            serde_json::to_value(&env).unwrap(),
            json!({
                "id": 7,
                "message": {
                    "event": "get-images-page",
                    "payload": { "dir": "/photos", "page": 2, "page_size": 10 }
                }
            })
        );
    }

    #[test]
    fn unit_request_parses_without_payload() {
        let env: Envelope<Request> =
            serde_json::from_str(r#"{"id": 1, "message": {"event": "select-directory"}}"#).unwrap();
        assert_eq!(env.message, Request::SelectDirectory);
    }

    #[test]
    fn response_wire_shape() {
        let value = serde_json::to_value(Response::ImagesCount(3)).unwrap();
        assert_eq!(value, json!({ "event": "images-count", "payload": 3 }));

        let value = serde_json::to_value(Response::DirectorySelected(None)).unwrap();
        assert_eq!(value, json!({ "event": "directory-selected", "payload": null }));
    }

    #[test]
    fn names_match_wire_events() {
        let requests = [
            Request::SelectDirectory,
            Request::GetImages { dir: PathBuf::new() },
            Request::GetImagesCount { dir: PathBuf::new() },
            Request::GetImagesPage { dir: PathBuf::new(), page: 0, page_size: 1 },
        ];
        for request in requests {
            let value = serde_json::to_value(&request).unwrap();
            assert_eq!(value["event"], request.name());
        }
        let value = serde_json::to_value(Response::ScanFailed { message: "x".into() }).unwrap();
        assert_eq!(value["event"], "scan-failed");
    }
}
