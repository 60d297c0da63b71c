//! Test images generated on the fly.

use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

/// A small baseline JPEG with no EXIF segment.
pub(crate) fn plain_jpeg() -> Vec<u8> {
    let img = RgbImage::from_pixel(16, 8, Rgb([200, 120, 40]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Jpeg).unwrap();
    out.into_inner()
}

/// A small PNG, for "not a JPEG" cases.
pub(crate) fn png_bytes() -> Vec<u8> {
    // Signature + IHDR is enough for content sniffing.
    let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
    bytes.extend_from_slice(&[0, 0, 0, 13]);
    bytes.extend_from_slice(b"IHDR");
    bytes.extend_from_slice(&[0; 17]);
    bytes
}

/// [`plain_jpeg`] with an `Exif` APP1 segment whose TIFF payload is garbage.
pub(crate) fn jpeg_with_corrupt_exif() -> Vec<u8> {
    let jpeg = plain_jpeg();
    let mut payload = b"Exif\0\0".to_vec();
    payload.extend_from_slice(b"not a tiff header at all");
    let len = u16::try_from(payload.len() + 2).unwrap();

    let mut out = jpeg[..2].to_vec();
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(&payload);
    out.extend_from_slice(&jpeg[2..]);
    out
}
