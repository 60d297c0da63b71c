use anyhow::{Context, Result};
use exif::experimental::Writer;
use exif::{Exif, Field, In, Rational, Reader, Tag, Value};
use img_parts::jpeg::Jpeg;
use img_parts::{Bytes, ImageEXIF};
use std::io::Cursor;
use std::path::{Path, PathBuf};

use super::reader::EXIF_DATE_FORMAT;
use crate::model::{ExifFields, ImageData, URational};

/// Tags whose value comes from [`ExifFields`]. Everything else in the file is
/// carried over untouched.
const MANAGED_TAGS: &[Tag] = &[
    Tag::DateTimeOriginal,
    Tag::FocalLength,
    Tag::FNumber,
    Tag::ExposureTime,
    Tag::PixelXDimension,
    Tag::PixelYDimension,
    Tag::PhotographicSensitivity,
    Tag::ISOSpeed,
    Tag::Make,
    Tag::Model,
    Tag::Software,
    Tag::Orientation,
    Tag::GPSLatitudeRef,
    Tag::GPSLatitude,
    Tag::GPSLongitudeRef,
    Tag::GPSLongitude,
];

/// Offsets into the TIFF block. The writer regenerates the ones it knows
/// about; the rest would point at stale data.
const POINTER_TAGS: &[Tag] = &[
    Tag::ExifIFDPointer,
    Tag::GPSInfoIFDPointer,
    Tag::InteropIFDPointer,
    Tag::JPEGInterchangeFormat,
    Tag::JPEGInterchangeFormatLength,
    Tag::StripOffsets,
    Tag::StripByteCounts,
    Tag::TileOffsets,
    Tag::TileByteCounts,
];

/// `SensitivityType` value meaning "ISO speed" (EXIF 2.3).
const SENSITIVITY_ISO_SPEED: u16 = 3;

/// Result of writing EXIF data to an image.
#[derive(Debug, Default)]
pub struct WriteResult {
    /// Tags taken from the edited fields.
    pub tags_written: usize,
    /// Unrelated tags carried over from the original file.
    pub tags_preserved: usize,
    pub backup_path: Option<PathBuf>,
}

/// Write the EXIF fields of `image` back into the JPEG at `image.path`.
///
/// Strategy:
/// 1. Decode the file's existing EXIF and keep every tag the browser does
///    not manage, including IFD1 and its embedded thumbnail
/// 2. Add the managed tags from the edited fields (absent fields are removed)
/// 3. Serialize a fresh TIFF block and splice it into the APP1 segment with
///    img-parts, leaving every other segment as it was
pub fn write_exif(image: &ImageData, backup: bool, dry_run: bool) -> Result<WriteResult> {
    let path = image.path.as_path();
    let file_bytes = std::fs::read(path).context("Failed to read image file")?;

    let edited = managed_fields(&image.exif);
    let existing = Preserved::read(&file_bytes, &edited);
    let mut result = WriteResult {
        tags_written: edited.len(),
        tags_preserved: existing.fields.len(),
        ..Default::default()
    };

    let mut fields = existing.fields;
    fields.extend(edited);

    let mut jpeg = Jpeg::from_bytes(Bytes::from(file_bytes))
        .map_err(|e| anyhow::anyhow!("Failed to parse JPEG: {e}"))?;

    let orig_exif_pos = find_exif_segment_pos(&jpeg);
    if fields.is_empty() {
        jpeg.set_exif(None);
    } else {
        let mut writer = Writer::new();
        for field in &fields {
            writer.push_field(field);
        }
        if let Some(thumbnail) = &existing.thumbnail {
            writer.set_jpeg(thumbnail, In::THUMBNAIL);
        }
        let mut tiff = Cursor::new(Vec::new());
        writer
            .write(&mut tiff, false)
            .context("Failed to encode EXIF data")?;
        jpeg.set_exif(Some(Bytes::from(tiff.into_inner())));
    }

    // set_exif() inserts at a fixed position; move the segment back to where
    // the original was so it stays ahead of any XMP APP1.
    if let (Some(new_pos), Some(target_pos)) = (find_exif_segment_pos(&jpeg), orig_exif_pos) {
        if target_pos < new_pos {
            let segments = jpeg.segments_mut();
            let seg = segments.remove(new_pos);
            segments.insert(target_pos, seg);
        }
    }

    if dry_run {
        log::info!(
            "Dry run: would write {} tag(s) to {}",
            result.tags_written,
            path.display()
        );
        return Ok(result);
    }

    if backup {
        result.backup_path = Some(backup_file(path)?);
    }

    let output = jpeg.encoder().bytes();
    std::fs::write(path, &output).context("Failed to write JPEG file")?;
    log::debug!(
        "Wrote {} tag(s), kept {} to {}",
        result.tags_written,
        result.tags_preserved,
        path.display()
    );

    Ok(result)
}

/// What survives from the file's existing EXIF.
struct Preserved {
    fields: Vec<Field>,
    thumbnail: Option<Vec<u8>>,
}

impl Preserved {
    /// Fields of IFD0 and IFD1 not managed by the editor nor replaced by
    /// `edited`, plus the IFD1 JPEG thumbnail.
    fn read(file_bytes: &[u8], edited: &[Field]) -> Self {
        let exif = match Reader::new().read_from_container(&mut Cursor::new(file_bytes)) {
            Ok(exif) => exif,
            Err(e) => {
                log::debug!("No existing EXIF to preserve: {e}");
                return Self {
                    fields: Vec::new(),
                    thumbnail: None,
                };
            }
        };

        let fields = exif
            .fields()
            .filter(|f| f.ifd_num == In::PRIMARY || f.ifd_num == In::THUMBNAIL)
            .filter(|f| !POINTER_TAGS.contains(&f.tag))
            .filter(|f| f.ifd_num != In::PRIMARY || !MANAGED_TAGS.contains(&f.tag))
            .filter(|f| !edited.iter().any(|e| e.tag == f.tag && e.ifd_num == f.ifd_num))
            // The writer cannot encode values of unknown type.
            .filter(|f| !matches!(f.value, Value::Unknown(..)))
            .map(|f| Field {
                tag: f.tag,
                ifd_num: f.ifd_num,
                value: f.value.clone(),
            })
            .collect();

        Self {
            fields,
            thumbnail: thumbnail(&exif),
        }
    }
}

/// Bytes of the JPEG thumbnail referenced from IFD1, if any.
fn thumbnail(exif: &Exif) -> Option<Vec<u8>> {
    let offset = exif
        .get_field(Tag::JPEGInterchangeFormat, In::THUMBNAIL)?
        .value
        .get_uint(0)? as usize;
    let len = exif
        .get_field(Tag::JPEGInterchangeFormatLength, In::THUMBNAIL)?
        .value
        .get_uint(0)? as usize;
    let bytes = exif.buf().get(offset..offset.checked_add(len)?);
    if bytes.is_none() {
        log::warn!("Thumbnail at {offset}+{len} lies outside the EXIF block, dropping it");
    }
    bytes.map(<[u8]>::to_vec)
}

/// Build the managed fields from the edited values.
fn managed_fields(exif: &ExifFields) -> Vec<Field> {
    let mut fields = Vec::new();

    if let Some(date) = exif.date_time_original {
        fields.push(ascii_field(Tag::DateTimeOriginal, &date.format(EXIF_DATE_FORMAT).to_string()));
    }
    for (tag, value) in [
        (Tag::FocalLength, exif.focal_length),
        (Tag::FNumber, exif.f_number),
        (Tag::ExposureTime, exif.exposure_time),
    ] {
        if let Some(v) = value {
            fields.push(rational_field(tag, &[URational::from_f64(v)]));
        }
    }
    for (tag, value) in [
        (Tag::PixelXDimension, exif.pixel_x_dimension),
        (Tag::PixelYDimension, exif.pixel_y_dimension),
    ] {
        if let Some(v) = value {
            fields.push(field(tag, Value::Long(vec![v])));
        }
    }
    if let Some(iso) = exif.iso_speed_rating {
        // PhotographicSensitivity is a SHORT; above 65535 it holds 65535 and
        // the real value goes to the LONG ISOSpeed tag.
        match u16::try_from(iso) {
            Ok(iso) => fields.push(field(Tag::PhotographicSensitivity, Value::Short(vec![iso]))),
            Err(_) => {
                fields.push(field(Tag::PhotographicSensitivity, Value::Short(vec![u16::MAX])));
                fields.push(field(Tag::SensitivityType, Value::Short(vec![SENSITIVITY_ISO_SPEED])));
                fields.push(field(Tag::ISOSpeed, Value::Long(vec![iso])));
            }
        }
    }
    for (tag, value) in [
        (Tag::Make, &exif.camera_make),
        (Tag::Model, &exif.camera_model),
        (Tag::Software, &exif.editing_software),
    ] {
        if let Some(v) = value {
            fields.push(ascii_field(tag, v));
        }
    }
    if let Some(orientation) = exif.orientation {
        fields.push(field(Tag::Orientation, Value::Short(vec![orientation])));
    }

    if let Some(gps) = &exif.gps {
        if let Some(dms) = &gps.latitude {
            fields.push(ascii_field(Tag::GPSLatitudeRef, &gps.latitude_ref.unwrap_or('N').to_string()));
            fields.push(rational_field(Tag::GPSLatitude, dms));
        }
        if let Some(dms) = &gps.longitude {
            fields.push(ascii_field(Tag::GPSLongitudeRef, &gps.longitude_ref.unwrap_or('E').to_string()));
            fields.push(rational_field(Tag::GPSLongitude, dms));
        }
    }

    fields
}

fn field(tag: Tag, value: Value) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value,
    }
}

fn ascii_field(tag: Tag, value: &str) -> Field {
    field(tag, Value::Ascii(vec![value.as_bytes().to_vec()]))
}

fn rational_field(tag: Tag, values: &[URational]) -> Field {
    field(
        tag,
        Value::Rational(
            values
                .iter()
                .map(|r| Rational { num: r.num, denom: r.denom })
                .collect(),
        ),
    )
}

/// Find the position of the EXIF APP1 segment in a JPEG.
/// EXIF segments have marker 0xE1 (APP1) and contents starting with "Exif\0\0".
fn find_exif_segment_pos(jpeg: &Jpeg) -> Option<usize> {
    const EXIF_PREFIX: &[u8] = b"Exif\0\0";
    jpeg.segments().iter().position(|s| {
        s.marker() == 0xE1 && s.contents().starts_with(EXIF_PREFIX)
    })
}

/// Copy the original next to itself as `<name>.<ext>.bak`, once.
fn backup_file(path: &Path) -> Result<PathBuf> {
    let backup_path = path.with_extension(format!(
        "{}.bak",
        path.extension().unwrap_or_default().to_string_lossy()
    ));

    if !backup_path.exists() {
        std::fs::copy(path, &backup_path).context("Failed to create backup")?;
        log::debug!("Backup created: {}", backup_path.display());
    }

    Ok(backup_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinates::{self, Coordinates};
    use crate::exif::read_image;
    use crate::facade::{ImageDataFacade, ImageField};
    use crate::fixtures;
    use crate::model::GpsBlock;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn edited_fields() -> ExifFields {
        let mut gps = GpsBlock::default();
        coordinates::from_decimal(&mut gps, Coordinates { lat: 40.7128, lng: -74.006 });
        ExifFields {
            date_time_original: NaiveDate::from_ymd_opt(2024, 3, 15)
                .and_then(|d| d.and_hms_opt(14, 30, 0)),
            focal_length: Some(50.0),
            f_number: Some(1.8),
            exposure_time: Some(1.0 / 250.0),
            pixel_x_dimension: Some(16),
            pixel_y_dimension: Some(8),
            iso_speed_rating: Some(400),
            camera_make: Some("Canon".into()),
            camera_model: Some("EOS R5".into()),
            editing_software: Some("exif-browser".into()),
            orientation: Some(6),
            gps: Some(gps),
        }
    }

    fn write_fixture(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("photo.jpg");
        std::fs::write(&path, fixtures::plain_jpeg()).unwrap();
        path
    }

    // ── managed_fields ───────────────────────────────────────────────

    #[test]
    fn empty_fields_produce_no_tags() {
        assert!(managed_fields(&ExifFields::default()).is_empty());
    }

    #[test]
    fn gps_axis_written_independently() {
        let mut gps = GpsBlock::default();
        coordinates::set_latitude(&mut gps, -10.0);
        let exif = ExifFields {
            gps: Some(gps),
            ..Default::default()
        };
        let tags: Vec<Tag> = managed_fields(&exif).iter().map(|f| f.tag).collect();
        assert_eq!(tags, vec![Tag::GPSLatitudeRef, Tag::GPSLatitude]);
    }

    // ── write_exif ───────────────────────────────────────────────────

    #[test]
    fn round_trip_through_file() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir);
        let image = ImageData::new(&path, String::new(), edited_fields());

        let result = write_exif(&image, false, false).unwrap();
        assert_eq!(result.tags_written, 15);
        assert!(result.backup_path.is_none());

        let back = read_image(&path).unwrap().exif;
        let expected = edited_fields();
        assert_eq!(back.date_time_original, expected.date_time_original);
        assert_eq!(back.camera_make, expected.camera_make);
        assert_eq!(back.camera_model, expected.camera_model);
        assert_eq!(back.editing_software, expected.editing_software);
        assert_eq!(back.orientation, Some(6));
        assert_eq!(back.iso_speed_rating, Some(400));
        assert_eq!(back.pixel_x_dimension, Some(16));
        assert!((back.f_number.unwrap() - 1.8).abs() < 1e-9);
        assert!((back.exposure_time.unwrap() - 0.004).abs() < 1e-9);

        let coords = coordinates::to_decimal(back.gps.as_ref()).unwrap();
        assert!((coords.lat - 40.7128).abs() < 1e-5);
        assert!((coords.lng - (-74.006)).abs() < 1e-5);
    }

    #[test]
    fn cleared_fields_are_removed() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir);
        write_exif(&ImageData::new(&path, String::new(), edited_fields()), false, false).unwrap();

        let mut exif = edited_fields();
        exif.camera_model = None;
        exif.gps = None;
        write_exif(&ImageData::new(&path, String::new(), exif), false, false).unwrap();

        let back = read_image(&path).unwrap().exif;
        assert_eq!(back.camera_model, None);
        assert_eq!(back.gps, None);
        assert_eq!(back.camera_make.as_deref(), Some("Canon"));
    }

    /// Replace the fixture's EXIF with a raw block built from `fields`.
    fn seed_exif(path: &Path, fields: &[Field], thumbnail: Option<&[u8]>) {
        let mut writer = Writer::new();
        for f in fields {
            writer.push_field(f);
        }
        if let Some(thumbnail) = thumbnail {
            writer.set_jpeg(thumbnail, In::THUMBNAIL);
        }
        let mut tiff = Cursor::new(Vec::new());
        writer.write(&mut tiff, false).unwrap();
        let mut jpeg = Jpeg::from_bytes(Bytes::from(std::fs::read(path).unwrap())).unwrap();
        jpeg.set_exif(Some(Bytes::from(tiff.into_inner())));
        std::fs::write(path, jpeg.encoder().bytes()).unwrap();
    }

    fn raw_exif(path: &Path) -> Exif {
        let bytes = std::fs::read(path).unwrap();
        Reader::new().read_from_container(&mut Cursor::new(&bytes)).unwrap()
    }

    #[test]
    fn unmanaged_tags_are_preserved() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir);
        seed_exif(&path, &[ascii_field(Tag::Artist, "Jane Doe")], None);

        let image = ImageData::new(&path, String::new(), edited_fields());
        let result = write_exif(&image, false, false).unwrap();
        assert_eq!(result.tags_preserved, 1);

        let exif = raw_exif(&path);
        let artist = exif.get_field(Tag::Artist, In::PRIMARY).unwrap();
        assert!(artist.display_value().to_string().contains("Jane Doe"));
    }

    #[test]
    fn thumbnail_ifd_survives_an_edit() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir);
        let thumb = fixtures::plain_jpeg();
        let caption = Field {
            tag: Tag::ImageDescription,
            ifd_num: In::THUMBNAIL,
            value: Value::Ascii(vec![b"preview".to_vec()]),
        };
        seed_exif(&path, &[ascii_field(Tag::Make, "Canon"), caption], Some(&thumb));

        let mut image = read_image(&path).unwrap();
        assert_eq!(image.exif.camera_make.as_deref(), Some("Canon"));
        image.exif.camera_model = Some("R5".into());
        write_exif(&image, false, false).unwrap();

        let exif = raw_exif(&path);
        let caption = exif.get_field(Tag::ImageDescription, In::THUMBNAIL).unwrap();
        assert!(caption.display_value().to_string().contains("preview"));
        assert_eq!(thumbnail(&exif).as_deref(), Some(thumb.as_slice()));

        let back = read_image(&path).unwrap().exif;
        assert_eq!(back.camera_make.as_deref(), Some("Canon"));
        assert_eq!(back.camera_model.as_deref(), Some("R5"));
    }

    #[test]
    fn iso_above_short_range_keeps_exact_value() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir);

        let mut facade = ImageDataFacade::new(read_image(&path).unwrap());
        facade.set(ImageField::IsoSpeedRating, "100000").unwrap();
        write_exif(facade.image(), false, false).unwrap();

        assert_eq!(read_image(&path).unwrap().exif.iso_speed_rating, Some(100_000));
        let exif = raw_exif(&path);
        let short = exif.get_field(Tag::PhotographicSensitivity, In::PRIMARY).unwrap();
        assert_eq!(short.value.get_uint(0), Some(65535));
        let exact = exif.get_field(Tag::ISOSpeed, In::PRIMARY).unwrap();
        assert_eq!(exact.value.get_uint(0), Some(100_000));

        // Back into SHORT range: the LONG tag goes away.
        let mut facade = ImageDataFacade::new(read_image(&path).unwrap());
        facade.set(ImageField::IsoSpeedRating, "800").unwrap();
        write_exif(facade.image(), false, false).unwrap();
        assert_eq!(read_image(&path).unwrap().exif.iso_speed_rating, Some(800));
        assert!(raw_exif(&path).get_field(Tag::ISOSpeed, In::PRIMARY).is_none());
    }

    #[test]
    fn dry_run_leaves_file_alone() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir);
        let before = std::fs::read(&path).unwrap();

        write_exif(&ImageData::new(&path, String::new(), edited_fields()), true, true).unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), before);
        assert!(!dir.path().join("photo.jpg.bak").exists());
    }

    #[test]
    fn backup_written_once() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir);
        let original = std::fs::read(&path).unwrap();

        let image = ImageData::new(&path, String::new(), edited_fields());
        let result = write_exif(&image, true, false).unwrap();
        let backup = result.backup_path.unwrap();
        assert_eq!(backup, dir.path().join("photo.jpg.bak"));
        assert_eq!(std::fs::read(&backup).unwrap(), original);

        write_exif(&image, true, false).unwrap();
        assert_eq!(std::fs::read(&backup).unwrap(), original);
    }

    #[test]
    fn clearing_everything_drops_the_segment() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir);
        write_exif(&ImageData::new(&path, String::new(), edited_fields()), false, false).unwrap();

        let result =
            write_exif(&ImageData::new(&path, String::new(), ExifFields::default()), false, false)
                .unwrap();
        assert_eq!(result.tags_written, 0);
        assert!(read_image(&path).unwrap().exif.is_empty());
    }

    #[test]
    fn not_a_jpeg_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fake.jpg");
        std::fs::write(&path, b"text").unwrap();
        assert!(write_exif(&ImageData::new(&path, String::new(), edited_fields()), false, false).is_err());
    }
}
