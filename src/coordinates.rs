//! Conversion between EXIF GPS degree/minute/second rationals and decimal degrees.

use serde::{Deserialize, Serialize};

use crate::model::{GpsBlock, URational};

/// Seconds are stored with this denominator (1/10000 s is about 3e-9 degrees).
const SECONDS_DENOMINATOR: u32 = 10_000;
const TICKS_PER_MINUTE: u64 = 60 * SECONDS_DENOMINATOR as u64;
const TICKS_PER_DEGREE: u64 = 60 * TICKS_PER_MINUTE;

/// A decimal GPS position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Convert a GPS block to decimal degrees.
///
/// Returns `None` when the image has no GPS block. An axis missing from the
/// block reads as `0.0`.
pub fn to_decimal(gps: Option<&GpsBlock>) -> Option<Coordinates> {
    let gps = gps?;
    Some(Coordinates {
        lat: latitude(gps).unwrap_or(0.0),
        lng: longitude(gps).unwrap_or(0.0),
    })
}

pub fn latitude(gps: &GpsBlock) -> Option<f64> {
    gps.latitude
        .as_ref()
        .map(|dms| dms_to_decimal(dms, gps.latitude_ref.unwrap_or('N')))
}

pub fn longitude(gps: &GpsBlock) -> Option<f64> {
    gps.longitude
        .as_ref()
        .map(|dms| dms_to_decimal(dms, gps.longitude_ref.unwrap_or('E')))
}

/// Convert a DMS triple to decimal degrees. `S` and `W` references are negative.
pub fn dms_to_decimal(dms: &[URational; 3], reference: char) -> f64 {
    let degrees = dms[0].to_f64().unwrap_or(0.0);
    let minutes = dms[1].to_f64().unwrap_or(0.0);
    let seconds = dms[2].to_f64().unwrap_or(0.0);

    let coord = degrees + minutes / 60.0 + seconds / 3600.0;

    match reference.to_ascii_uppercase() {
        'S' | 'W' => -coord,
        _ => coord,
    }
}

/// Convert the magnitude of a decimal coordinate to a DMS triple.
pub fn decimal_to_dms(value: f64) -> [URational; 3] {
    let ticks = (value.abs() * TICKS_PER_DEGREE as f64).round() as u64;

    let degrees = ticks / TICKS_PER_DEGREE;
    let rest = ticks % TICKS_PER_DEGREE;
    let minutes = rest / TICKS_PER_MINUTE;
    let seconds = rest % TICKS_PER_MINUTE;

    [
        URational::new(degrees as u32, 1),
        URational::new(minutes as u32, 1),
        URational::new(seconds as u32, SECONDS_DENOMINATOR),
    ]
}

/// Write both axes into the block.
pub fn from_decimal(gps: &mut GpsBlock, coords: Coordinates) {
    set_latitude(gps, coords.lat);
    set_longitude(gps, coords.lng);
}

/// Write the latitude only; the longitude is left as it is.
pub fn set_latitude(gps: &mut GpsBlock, lat: f64) {
    gps.latitude_ref = Some(if lat < 0.0 { 'S' } else { 'N' });
    gps.latitude = Some(decimal_to_dms(lat));
}

/// Write the longitude only; the latitude is left as it is.
pub fn set_longitude(gps: &mut GpsBlock, lng: f64) {
    gps.longitude_ref = Some(if lng < 0.0 { 'W' } else { 'E' });
    gps.longitude = Some(decimal_to_dms(lng));
}
