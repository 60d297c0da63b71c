use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// An unsigned EXIF rational (`num / denom`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct URational {
    pub num: u32,
    pub denom: u32,
}

impl URational {
    pub const fn new(num: u32, denom: u32) -> Self {
        Self { num, denom }
    }

    /// Value as `f64`. A zero denominator yields `None`.
    pub fn to_f64(self) -> Option<f64> {
        if self.denom == 0 {
            None
        } else {
            Some(self.num as f64 / self.denom as f64)
        }
    }

    /// Approximate a non-negative decimal as a rational.
    ///
    /// Values below one that are the reciprocal of a whole number (shutter
    /// speeds such as 1/250) are kept exact; everything else is stored with
    /// four decimal places.
    pub fn from_f64(value: f64) -> Self {
        let value = value.max(0.0);
        if value > 0.0 && value < 1.0 {
            let reciprocal = 1.0 / value;
            if (reciprocal - reciprocal.round()).abs() < 1e-6 && reciprocal.round() <= u32::MAX as f64 {
                return Self::new(1, reciprocal.round() as u32);
            }
        }
        let scaled = (value * 10_000.0).round();
        if scaled > u32::MAX as f64 {
            return Self::new(value.round().min(u32::MAX as f64) as u32, 1);
        }
        Self::new(scaled as u32, 10_000)
    }
}

/// The GPS sub-structure of EXIF: degree/minute/second triples plus hemisphere references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GpsBlock {
    pub latitude_ref: Option<char>,
    pub latitude: Option<[URational; 3]>,
    pub longitude_ref: Option<char>,
    pub longitude: Option<[URational; 3]>,
}

impl GpsBlock {
    pub fn is_empty(&self) -> bool {
        self.latitude.is_none() && self.longitude.is_none()
    }
}

/// Decoded EXIF fields the browser can show and edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ExifFields {
    pub date_time_original: Option<NaiveDateTime>,
    pub focal_length: Option<f64>,
    pub f_number: Option<f64>,
    pub exposure_time: Option<f64>,
    pub pixel_x_dimension: Option<u32>,
    pub pixel_y_dimension: Option<u32>,
    pub iso_speed_rating: Option<u32>,
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    pub editing_software: Option<String>,
    /// EXIF orientation, 1..=8.
    pub orientation: Option<u16>,
    pub gps: Option<GpsBlock>,
}

impl ExifFields {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// One photo: where it lives, its bytes (base64, so it can cross the bridge) and its EXIF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageData {
    pub path: PathBuf,
    pub base64: String,
    pub exif: ExifFields,
}

impl ImageData {
    pub fn new(path: impl Into<PathBuf>, base64: String, exif: ExifFields) -> Self {
        Self {
            path: path.into(),
            base64,
            exif,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Answer to a `modify-exif` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExifModificationResult {
    pub path: PathBuf,
    pub success: bool,
    pub message: Option<String>,
    /// The file was left untouched because the bridge runs in dry-run mode.
    #[serde(default)]
    pub dry_run: bool,
    /// The image as read back from disk after the write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved: Option<ImageData>,
}

impl ExifModificationResult {
    pub fn ok(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            success: true,
            message: None,
            dry_run: false,
            saved: None,
        }
    }

    pub fn failed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            success: false,
            message: Some(message.into()),
            dry_run: false,
            saved: None,
        }
    }

    pub fn with_saved(mut self, image: ImageData) -> Self {
        self.saved = Some(image);
        self
    }

    pub fn as_dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }
}
