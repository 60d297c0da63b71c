//! Editable view over one [`ImageData`].
//!
//! The facade lists every editable field in a fixed order, keeps a form
//! control (text value + validation errors) per field, and writes valid edits
//! through to the image it holds. A pristine copy is kept so edits can be
//! reverted.

use crate::coordinates;
use crate::model::{GpsBlock, ImageData};
use crate::validation::{
    parse_date_input, parse_number, validate_all, ValidationError, Validator, ASCII_MAX_CHARS,
    LONG_MAX_VAL,
};

/// Pattern used to present `DateTimeOriginal` in a `datetime-local` input.
pub const DATE_DISPLAY_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageField {
    DateTime,
    FocalLength,
    FNumber,
    ExposureTime,
    PixelXDimension,
    PixelYDimension,
    IsoSpeedRating,
    CameraMake,
    CameraModel,
    Software,
    Orientation,
    Latitude,
    Longitude,
}

impl ImageField {
    /// Every field, in display order.
    pub const ALL: [ImageField; 13] = [
        Self::DateTime,
        Self::FocalLength,
        Self::FNumber,
        Self::ExposureTime,
        Self::PixelXDimension,
        Self::PixelYDimension,
        Self::IsoSpeedRating,
        Self::CameraMake,
        Self::CameraModel,
        Self::Software,
        Self::Orientation,
        Self::Latitude,
        Self::Longitude,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::DateTime => "Date and time",
            Self::FocalLength => "Focal length",
            Self::FNumber => "F number",
            Self::ExposureTime => "Exposure time",
            Self::PixelXDimension => "X dimension",
            Self::PixelYDimension => "Y dimension",
            Self::IsoSpeedRating => "Iso speed rating",
            Self::CameraMake => "Camera manufacturer",
            Self::CameraModel => "Camera model",
            Self::Software => "Software",
            Self::Orientation => "Image orientation",
            Self::Latitude => "Latitude",
            Self::Longitude => "Longitude",
        }
    }

    /// Short machine name, used by the CLI (`--set f-number=2.8`).
    pub fn key(self) -> &'static str {
        match self {
            Self::DateTime => "date-time",
            Self::FocalLength => "focal-length",
            Self::FNumber => "f-number",
            Self::ExposureTime => "exposure-time",
            Self::PixelXDimension => "x-dimension",
            Self::PixelYDimension => "y-dimension",
            Self::IsoSpeedRating => "iso",
            Self::CameraMake => "make",
            Self::CameraModel => "model",
            Self::Software => "software",
            Self::Orientation => "orientation",
            Self::Latitude => "latitude",
            Self::Longitude => "longitude",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|f| f.key() == key)
    }

    pub fn input(self) -> InputKind {
        match self {
            Self::DateTime => InputKind::DateTimeLocal,
            Self::CameraMake | Self::CameraModel | Self::Software => InputKind::Text,
            _ => InputKind::Number,
        }
    }

    pub fn step(self) -> Option<f64> {
        match self {
            Self::FocalLength | Self::FNumber | Self::ExposureTime => Some(0.0001),
            Self::PixelXDimension
            | Self::PixelYDimension
            | Self::IsoSpeedRating
            | Self::Orientation => Some(1.0),
            Self::Latitude | Self::Longitude => Some(0.00001),
            _ => None,
        }
    }

    pub fn unit(self) -> Option<&'static str> {
        match self {
            Self::FocalLength => Some("mm"),
            Self::PixelXDimension | Self::PixelYDimension => Some("px"),
            Self::Latitude | Self::Longitude => Some("Decimal degrees"),
            _ => None,
        }
    }

    pub fn validators(self) -> Vec<Validator> {
        match self {
            Self::DateTime => vec![Validator::Date],
            Self::FocalLength | Self::FNumber | Self::ExposureTime => vec![Validator::NonNegative],
            Self::PixelXDimension | Self::PixelYDimension | Self::IsoSpeedRating => {
                vec![Validator::NonNegative, Validator::Max(LONG_MAX_VAL)]
            }
            Self::CameraMake | Self::CameraModel | Self::Software => {
                vec![Validator::MaxChars(ASCII_MAX_CHARS)]
            }
            Self::Orientation => vec![Validator::Min(1.0), Validator::Max(8.0)],
            Self::Latitude => vec![Validator::Min(-90.0), Validator::Max(90.0)],
            Self::Longitude => vec![Validator::Min(-180.0), Validator::Max(180.0)],
        }
    }

    /// Current value of this field in `image`, formatted for its input.
    pub fn format(self, image: &ImageData) -> String {
        let exif = &image.exif;
        match self {
            Self::DateTime => exif
                .date_time_original
                .map(|d| d.format(DATE_DISPLAY_FORMAT).to_string())
                .unwrap_or_default(),
            Self::FocalLength => format_opt(exif.focal_length),
            Self::FNumber => format_opt(exif.f_number),
            Self::ExposureTime => format_opt(exif.exposure_time),
            Self::PixelXDimension => format_opt(exif.pixel_x_dimension),
            Self::PixelYDimension => format_opt(exif.pixel_y_dimension),
            Self::IsoSpeedRating => format_opt(exif.iso_speed_rating),
            Self::CameraMake => exif.camera_make.clone().unwrap_or_default(),
            Self::CameraModel => exif.camera_model.clone().unwrap_or_default(),
            Self::Software => exif.editing_software.clone().unwrap_or_default(),
            Self::Orientation => format_opt(exif.orientation),
            Self::Latitude => exif
                .gps
                .as_ref()
                .and_then(coordinates::latitude)
                .map(|v| format!("{v:.5}"))
                .unwrap_or_default(),
            Self::Longitude => exif
                .gps
                .as_ref()
                .and_then(coordinates::longitude)
                .map(|v| format!("{v:.5}"))
                .unwrap_or_default(),
        }
    }

    /// Write an already-validated value into `image`. Blank clears the field.
    fn apply(self, image: &mut ImageData, value: &str) -> Result<(), ValidationError> {
        let value = value.trim();
        let exif = &mut image.exif;
        let blank = value.is_empty();

        match self {
            Self::DateTime => {
                exif.date_time_original = if blank {
                    None
                } else {
                    Some(
                        parse_date_input(value)
                            .ok_or_else(|| ValidationError::InvalidDate(value.to_string()))?,
                    )
                };
            }
            Self::FocalLength => exif.focal_length = parse_opt(value)?,
            Self::FNumber => exif.f_number = parse_opt(value)?,
            Self::ExposureTime => exif.exposure_time = parse_opt(value)?,
            Self::PixelXDimension => exif.pixel_x_dimension = parse_opt(value)?.map(|n| n as u32),
            Self::PixelYDimension => exif.pixel_y_dimension = parse_opt(value)?.map(|n| n as u32),
            Self::IsoSpeedRating => exif.iso_speed_rating = parse_opt(value)?.map(|n| n as u32),
            Self::CameraMake => exif.camera_make = text_opt(value),
            Self::CameraModel => exif.camera_model = text_opt(value),
            Self::Software => exif.editing_software = text_opt(value),
            Self::Orientation => {
                exif.orientation = parse_opt(value)?.map(|n| n.floor() as u16);
            }
            Self::Latitude => {
                if blank {
                    if let Some(gps) = exif.gps.as_mut() {
                        gps.latitude = None;
                        gps.latitude_ref = None;
                    }
                } else {
                    let gps = exif.gps.get_or_insert_with(GpsBlock::default);
                    coordinates::set_latitude(gps, parse_number(value)?);
                }
            }
            Self::Longitude => {
                if blank {
                    if let Some(gps) = exif.gps.as_mut() {
                        gps.longitude = None;
                        gps.longitude_ref = None;
                    }
                } else {
                    let gps = exif.gps.get_or_insert_with(GpsBlock::default);
                    coordinates::set_longitude(gps, parse_number(value)?);
                }
            }
        }

        if exif.gps.as_ref().is_some_and(GpsBlock::is_empty) {
            exif.gps = None;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    DateTimeLocal,
    Number,
    Text,
}

impl InputKind {
    /// HTML input type name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DateTimeLocal => "datetime-local",
            Self::Number => "number",
            Self::Text => "text",
        }
    }
}

/// Text value of one field plus the validation errors it currently has.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormControl {
    pub value: String,
    pub errors: Vec<ValidationError>,
}

impl FormControl {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditableProperty {
    pub field: ImageField,
    pub input: InputKind,
    pub label: &'static str,
    pub step: Option<f64>,
    pub unit: Option<&'static str>,
    pub validators: Vec<Validator>,
    pub control: FormControl,
}

impl EditableProperty {
    fn new(field: ImageField, image: &ImageData) -> Self {
        let validators = field.validators();
        let value = field.format(image);
        let errors = validate_all(&validators, &value);
        Self {
            field,
            input: field.input(),
            label: field.label(),
            step: field.step(),
            unit: field.unit(),
            validators,
            control: FormControl { value, errors },
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageDataFacade {
    original: ImageData,
    image: ImageData,
    properties: Vec<EditableProperty>,
}

impl ImageDataFacade {
    pub fn new(image: ImageData) -> Self {
        let properties = build_properties(&image);
        Self {
            original: image.clone(),
            image,
            properties,
        }
    }

    pub fn image(&self) -> &ImageData {
        &self.image
    }

    pub fn into_image(self) -> ImageData {
        self.image
    }

    pub fn properties(&self) -> &[EditableProperty] {
        &self.properties
    }

    pub fn property(&self, field: ImageField) -> Option<&EditableProperty> {
        self.properties.iter().find(|p| p.field == field)
    }

    /// Edit one field.
    ///
    /// The control always takes the new text. The image is only updated when
    /// every validator passes; otherwise the errors are returned and stay on
    /// the control.
    pub fn set(&mut self, field: ImageField, value: &str) -> Result<(), Vec<ValidationError>> {
        let Some(property) = self.properties.iter_mut().find(|p| p.field == field) else {
            return Ok(());
        };

        property.control.value = value.to_string();
        property.control.errors = validate_all(&property.validators, value);
        if !property.control.errors.is_empty() {
            log::debug!("Rejected {} = {value:?}: {:?}", field.key(), property.control.errors);
            return Err(property.control.errors.clone());
        }

        if let Err(e) = field.apply(&mut self.image, value) {
            property.control.errors = vec![e.clone()];
            return Err(vec![e]);
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.properties.iter().all(|p| p.control.is_valid())
    }

    pub fn is_dirty(&self) -> bool {
        self.image != self.original
    }

    /// Discard every edit and rebuild the controls from the pristine copy.
    pub fn revert(&mut self) {
        self.image = self.original.clone();
        self.properties = build_properties(&self.image);
    }
}

fn build_properties(image: &ImageData) -> Vec<EditableProperty> {
    ImageField::ALL
        .into_iter()
        .map(|field| EditableProperty::new(field, image))
        .collect()
}

fn format_opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn parse_opt(value: &str) -> Result<Option<f64>, ValidationError> {
    if value.is_empty() {
        Ok(None)
    } else {
        parse_number(value).map(Some)
    }
}

fn text_opt(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
