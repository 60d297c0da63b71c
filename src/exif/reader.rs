use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::NaiveDateTime;
use exif::{Exif, In, Reader, Tag, Value};
use std::io::Cursor;
use std::path::Path;

use crate::model::{ExifFields, GpsBlock, ImageData, URational};

/// Format of EXIF `DateTime*` tags.
pub(crate) const EXIF_DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Decode the EXIF fields the browser knows about from raw JPEG bytes.
///
/// A JPEG without an EXIF segment decodes to empty fields. A segment that is
/// present but unparseable is an error.
pub fn decode_exif(bytes: &[u8]) -> Result<ExifFields> {
    let exif = match Reader::new().read_from_container(&mut Cursor::new(bytes)) {
        Ok(exif) => exif,
        Err(exif::Error::NotFound(_)) => return Ok(ExifFields::default()),
        Err(e) => return Err(e).context("Failed to parse EXIF"),
    };

    let gps = GpsBlock {
        latitude_ref: reference(&exif, Tag::GPSLatitudeRef),
        latitude: dms(&exif, Tag::GPSLatitude),
        longitude_ref: reference(&exif, Tag::GPSLongitudeRef),
        longitude: dms(&exif, Tag::GPSLongitude),
    };

    Ok(ExifFields {
        date_time_original: ascii(&exif, Tag::DateTimeOriginal)
            .and_then(|s| NaiveDateTime::parse_from_str(&s, EXIF_DATE_FORMAT).ok()),
        focal_length: rational(&exif, Tag::FocalLength),
        f_number: rational(&exif, Tag::FNumber),
        exposure_time: rational(&exif, Tag::ExposureTime),
        pixel_x_dimension: uint(&exif, Tag::PixelXDimension),
        pixel_y_dimension: uint(&exif, Tag::PixelYDimension),
        iso_speed_rating: iso(&exif),
        camera_make: ascii(&exif, Tag::Make),
        camera_model: ascii(&exif, Tag::Model),
        editing_software: ascii(&exif, Tag::Software),
        orientation: uint(&exif, Tag::Orientation).and_then(|o| u16::try_from(o).ok()),
        gps: if gps.is_empty() { None } else { Some(gps) },
    })
}

/// Read one JPEG into an [`ImageData`].
///
/// Unreadable files are an error. Undecodable EXIF is logged and the image is
/// returned with empty fields, so it still shows up in listings.
pub fn read_image(path: &Path) -> Result<ImageData> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let exif = decode_exif(&bytes).unwrap_or_else(|e| {
        log::warn!("Could not decode EXIF of {}: {e:#}", path.display());
        ExifFields::default()
    });

    Ok(ImageData::new(path, STANDARD.encode(&bytes), exif))
}

fn ascii(exif: &Exif, tag: Tag) -> Option<String> {
    match &exif.get_field(tag, In::PRIMARY)?.value {
        Value::Ascii(parts) => {
            let s = String::from_utf8_lossy(parts.first()?);
            let s = s.trim_matches(|c: char| c == '\0' || c.is_whitespace());
            if s.is_empty() { None } else { Some(s.to_string()) }
        }
        _ => None,
    }
}

fn rational(exif: &Exif, tag: Tag) -> Option<f64> {
    match &exif.get_field(tag, In::PRIMARY)?.value {
        Value::Rational(values) => values
            .first()
            .and_then(|r| URational::new(r.num, r.denom).to_f64()),
        _ => None,
    }
}

fn uint(exif: &Exif, tag: Tag) -> Option<u32> {
    exif.get_field(tag, In::PRIMARY)?.value.get_uint(0)
}

/// PhotographicSensitivity saturates at 65535; the exact value then lives in ISOSpeed.
fn iso(exif: &Exif) -> Option<u32> {
    match (uint(exif, Tag::PhotographicSensitivity), uint(exif, Tag::ISOSpeed)) {
        (None | Some(65535), Some(exact)) => Some(exact),
        (short, _) => short,
    }
}

fn dms(exif: &Exif, tag: Tag) -> Option<[URational; 3]> {
    match &exif.get_field(tag, In::PRIMARY)?.value {
        Value::Rational(values) if values.len() >= 3 => Some([
            URational::new(values[0].num, values[0].denom),
            URational::new(values[1].num, values[1].denom),
            URational::new(values[2].num, values[2].denom),
        ]),
        _ => None,
    }
}

fn reference(exif: &Exif, tag: Tag) -> Option<char> {
    ascii(exif, tag)?.chars().next()
}
