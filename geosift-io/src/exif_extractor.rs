//! EXIF-based location extraction.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::NaiveDateTime;
use exif::{Exif, In, Tag, Value};
use log::{debug, info};

use geosift_core::{Error, GeoPoint, LocationExtractor, PhotoLocation, Result};

/// Extracts GPS coordinates, capture time, altitude, and accuracy from JPEG
/// EXIF metadata.
///
/// Files without usable GPS tags yield `Ok(None)`; unreadable files yield a
/// file-operation error. Both are recoverable at the run level.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifLocationExtractor;

impl ExifLocationExtractor {
    /// Creates an extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl LocationExtractor for ExifLocationExtractor {
    fn extract(&self, path: &Path) -> Result<Option<PhotoLocation>> {
        let file = File::open(path)
            .map_err(|err| Error::FileOperation(format!("{}: {err}", path.display())))?;
        let mut reader = BufReader::new(file);

        let exif = match exif::Reader::new().read_from_container(&mut reader) {
            Ok(exif) => exif,
            Err(err) => {
                // No EXIF segment or a corrupt one; not an image we can use.
                info!("no usable metadata in {}: {err}", path.display());
                return Ok(None);
            }
        };

        let Some(point) = decimal_coords(&exif) else {
            debug!("{} has no GPS coordinates", path.display());
            return Ok(None);
        };

        let mut record = PhotoLocation::new(path, point);
        if let Some(altitude) = altitude_m(&exif) {
            record = record.with_altitude(altitude);
        }
        if let Some(taken) = capture_time(&exif) {
            record = record.with_taken(taken);
        }
        if let Some(accuracy) = accuracy_m(&exif) {
            record = record.with_accuracy(accuracy);
        }

        Ok(Some(record))
    }
}

/// Converts a degrees/minutes/seconds rational triple to decimal degrees.
pub(crate) fn dms_to_decimal(dms: &[exif::Rational]) -> Option<f64> {
    if dms.len() < 3 {
        return None;
    }
    let degrees = dms[0].to_f64();
    let minutes = dms[1].to_f64() / 60.0;
    let seconds = dms[2].to_f64() / 3600.0;
    let value = degrees + minutes + seconds;
    value.is_finite().then_some(value)
}

fn rational_values(exif: &Exif, tag: Tag) -> Option<&[exif::Rational]> {
    match &exif.get_field(tag, In::PRIMARY)?.value {
        Value::Rational(values) if !values.is_empty() => Some(values.as_slice()),
        _ => None,
    }
}

fn ascii_value(exif: &Exif, tag: Tag) -> Option<String> {
    match &exif.get_field(tag, In::PRIMARY)?.value {
        Value::Ascii(values) if !values.is_empty() => {
            Some(String::from_utf8_lossy(&values[0]).trim().to_string())
        }
        _ => None,
    }
}

fn decimal_coords(exif: &Exif) -> Option<GeoPoint> {
    let lat = dms_to_decimal(rational_values(exif, Tag::GPSLatitude)?)?;
    let lon = dms_to_decimal(rational_values(exif, Tag::GPSLongitude)?)?;

    // South and West hemispheres carry negative signs.
    let lat = match ascii_value(exif, Tag::GPSLatitudeRef).as_deref() {
        Some("S") => -lat,
        _ => lat,
    };
    let lon = match ascii_value(exif, Tag::GPSLongitudeRef).as_deref() {
        Some("W") => -lon,
        _ => lon,
    };

    GeoPoint::new(lat, lon).ok()
}

fn altitude_m(exif: &Exif) -> Option<f64> {
    let altitude = rational_values(exif, Tag::GPSAltitude)?[0].to_f64();
    // GPSAltitudeRef 1 means below sea level.
    let below = matches!(
        exif.get_field(Tag::GPSAltitudeRef, In::PRIMARY).map(|f| &f.value),
        Some(Value::Byte(bytes)) if bytes.first() == Some(&1)
    );
    Some(if below { -altitude } else { altitude })
}

fn capture_time(exif: &Exif) -> Option<NaiveDateTime> {
    for tag in [Tag::DateTimeOriginal, Tag::DateTime, Tag::DateTimeDigitized] {
        if let Some(text) = ascii_value(exif, tag) {
            // EXIF datetime format: "YYYY:MM:DD HH:MM:SS".
            if let Ok(parsed) = NaiveDateTime::parse_from_str(&text, "%Y:%m:%d %H:%M:%S") {
                return Some(parsed);
            }
        }
    }
    None
}

fn accuracy_m(exif: &Exif) -> Option<f64> {
    // Prefer the explicit horizontal positioning error; fall back to DOP.
    rational_values(exif, Tag::GPSHPositioningError)
        .or_else(|| rational_values(exif, Tag::GPSDOP))
        .map(|values| values[0].to_f64())
}
