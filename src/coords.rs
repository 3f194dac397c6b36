//! Conversion between compact degrees-minutes-seconds strings and decimal
//! degrees.
//!
//! Latitudes are written `ddmmssH` (`H` is `N` or `S`) and longitudes
//! `dddmmssH` (`E` or `W`), as in AIP waypoint tables: `242621N`,
//! `1231508E`.

use crate::error::{Error, Result};
use crate::normalizer::round_coordinate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Latitude,
    Longitude,
}

impl Axis {
    fn degree_digits(self) -> usize {
        match self {
            Axis::Latitude => 2,
            Axis::Longitude => 3,
        }
    }

    fn max_degrees(self) -> u32 {
        match self {
            Axis::Latitude => 90,
            Axis::Longitude => 180,
        }
    }

    fn hemispheres(self) -> (char, char) {
        match self {
            Axis::Latitude => ('N', 'S'),
            Axis::Longitude => ('E', 'W'),
        }
    }
}

/// Parse `ddmmssN` / `ddmmssS` into decimal degrees rounded to four digits.
pub fn parse_latitude(value: &str) -> Result<f64> {
    parse_dms(value, Axis::Latitude)
}

/// Parse `dddmmssE` / `dddmmssW` into decimal degrees rounded to four digits.
pub fn parse_longitude(value: &str) -> Result<f64> {
    parse_dms(value, Axis::Longitude)
}

fn parse_dms(value: &str, axis: Axis) -> Result<f64> {
    let trimmed = value.trim();
    let width = axis.degree_digits() + 4;

    let (digits, hemisphere) = match trimmed.char_indices().last() {
        Some((idx, c)) => (&trimmed[..idx], c.to_ascii_uppercase()),
        None => return Err(Error::coordinate(value, "empty value")),
    };
    if digits.len() != width || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::coordinate(
            value,
            format!("expected {} digits followed by a hemisphere letter", width),
        ));
    }

    let (positive, negative) = axis.hemispheres();
    let sign = if hemisphere == positive {
        1.0
    } else if hemisphere == negative {
        -1.0
    } else {
        return Err(Error::coordinate(
            value,
            format!("hemisphere must be {} or {}", positive, negative),
        ));
    };

    let split = axis.degree_digits();
    let number = |range: std::ops::Range<usize>| -> u32 {
        digits[range].parse().unwrap_or_default()
    };
    let degrees = number(0..split);
    let minutes = number(split..split + 2);
    let seconds = number(split + 2..split + 4);

    if minutes >= 60 || seconds >= 60 {
        return Err(Error::coordinate(value, "minutes and seconds must be below 60"));
    }
    let decimal = degrees as f64 + minutes as f64 / 60.0 + seconds as f64 / 3600.0;
    if decimal > axis.max_degrees() as f64 {
        return Err(Error::coordinate(
            value,
            format!("more than {} degrees", axis.max_degrees()),
        ));
    }

    Ok(round_coordinate(sign * decimal))
}

/// Render decimal degrees as `DD°MM'SS"H`, seconds rounded to the nearest
/// whole second.
pub fn format_dms(degrees: f64, axis: Axis) -> String {
    let (positive, negative) = axis.hemispheres();
    let hemisphere = if degrees < 0.0 { negative } else { positive };

    let mut total_seconds = (degrees.abs() * 3600.0).round() as u64;
    let seconds = total_seconds % 60;
    total_seconds /= 60;
    let minutes = total_seconds % 60;
    let whole = total_seconds / 60;

    format!(
        "{:0width$}°{:02}'{:02}\"{}",
        whole,
        minutes,
        seconds,
        hemisphere,
        width = axis.degree_digits()
    )
}
