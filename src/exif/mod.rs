//! EXIF reading and writing for JPEG files.
//!
//! - [`decode_exif`] / [`read_image`]: decode the editable fields (and the
//!   base64 payload) from a JPEG
//! - [`write_exif`]: write edited fields back, preserving every other tag

mod reader;
mod writer;

pub use reader::{decode_exif, read_image};
pub use writer::{write_exif, WriteResult};
