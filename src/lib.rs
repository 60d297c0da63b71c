//! # exif-browser
//!
//! Browse a directory of JPEG images and view or edit a fixed set of EXIF fields
//! (capture date, exposure, dimensions, camera, orientation, GPS position).
//!
//! The crate is split the way a desktop shell would split it: a privileged side
//! that touches the filesystem ([`bridge::Bridge`], built on [`scan`] and [`exif`])
//! and a UI side that only holds state ([`service::ImageService`],
//! [`settings::SettingsService`]) and edits images through
//! [`facade::ImageDataFacade`]. The two talk through asynchronous, correlated
//! messages, either in-process or as JSON lines over stdio.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use exif_browser::bridge::{self, Bridge, NoPicker};
//! use exif_browser::config::Config;
//! use exif_browser::facade::ImageField;
//! use exif_browser::service::ImageService;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(Some("config.json".as_ref()))?;
//!     let service = ImageService::new(bridge::spawn(Bridge::from_config(&config, NoPicker)));
//!
//!     let dir = Path::new("./photos");
//!     let count = service.get_images_count(dir).await?;
//!     service.get_images_page(dir, 0, config.scan.page_size).await?;
//!     println!("{count} images, showing {}", service.images().len());
//!
//!     // Edit the first image through its facade and save it back
//!     if let Some(mut facade) = service.facades().into_iter().next() {
//!         facade
//!             .set(ImageField::Latitude, "48.85837")
//!             .map_err(|errors| anyhow::anyhow!("{errors:?}"))?;
//!         let result = service.save_new_exif_value(facade.into_image()).await?;
//!         println!("Saved: {}", result.success);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Lower-Level Usage
//!
//! The scanner and codec work without any runtime:
//!
//! ```rust,no_run
//! use exif_browser::coordinates;
//! use exif_browser::exif::{read_image, write_exif};
//! use exif_browser::scan::Scanner;
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     for path in Scanner::default().list_jpegs(Path::new("./photos"))? {
//!         let mut image = read_image(&path)?;
//!         if let Some(c) = coordinates::to_decimal(image.exif.gps.as_ref()) {
//!             println!("{}: {:.5}, {:.5}", image.file_name(), c.lat, c.lng);
//!         }
//!         image.exif.editing_software = Some("exif-browser".into());
//!         write_exif(&image, true, false)?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`model`]: image and EXIF field types shared by both sides
//! - [`coordinates`]: GPS degree/minute/second rationals to decimal degrees and back
//! - [`validation`]: field validators
//! - [`facade`]: editable view of one image
//! - [`exif`]: EXIF decoding and write-back for JPEG files
//! - [`scan`]: directory listing, JPEG sniffing, pagination
//! - [`bridge`]: request/response protocol, handler, client and stdio transport
//! - [`service`]: UI-side image state
//! - [`settings`]: persisted preferences and the settings dialog
//! - [`config`]: configuration types and loading/saving

pub mod bridge;
pub mod config;
pub mod coordinates;
pub mod exif;
pub mod facade;
pub mod model;
pub mod scan;
pub mod service;
pub mod settings;
pub mod validation;

#[cfg(test)]
mod fixtures;
