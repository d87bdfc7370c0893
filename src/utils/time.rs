//! Time parsing and formatting utilities

use crate::domain::errors::DomainError;
use crate::domain::model::{Micros, MICROS_PER_SECOND};

/// Format a microsecond timestamp, played back at `speed`, as `mm:ss.SSS`
///
/// Minutes are not wrapped at the hour, so `61:00.000` is a valid result.
pub fn format_time_duration(time: Micros, speed: f64) -> String {
    let millis = (time as f64 / 1000.0 / speed).round().max(0.0) as u64;
    let minutes = millis / 60_000;
    let seconds = (millis % 60_000) / 1000;
    let ms = millis % 1000;
    format!("{:02}:{:02}.{:03}", minutes, seconds, ms)
}

/// Time parser for the formats accepted on the command line
pub struct TimeParser;

impl TimeParser {
    /// Parse seconds, `MM:SS.ms` or `HH:MM:SS.ms` into microseconds
    pub fn parse_micros(time_str: &str) -> Result<Micros, DomainError> {
        let trimmed = time_str.trim();
        let invalid = || {
            DomainError::BadArgs(format!(
                "Invalid time format: {}. Expected seconds, MM:SS.ms or HH:MM:SS.ms",
                time_str
            ))
        };

        let parts: Vec<&str> = trimmed.split(':').collect();
        let seconds = match parts.as_slice() {
            [secs] => secs.parse::<f64>().map_err(|_| invalid())?,
            [mins, secs] => {
                let minutes = mins.parse::<u64>().map_err(|_| invalid())?;
                let seconds = Self::parse_seconds_field(secs).ok_or_else(invalid)?;
                minutes as f64 * 60.0 + seconds
            }
            [hours, mins, secs] => {
                let hours = hours.parse::<u64>().map_err(|_| invalid())?;
                let minutes = mins.parse::<u64>().map_err(|_| invalid())?;
                if minutes >= 60 {
                    return Err(DomainError::BadArgs(
                        "Minutes must be less than 60".to_string(),
                    ));
                }
                let seconds = Self::parse_seconds_field(secs).ok_or_else(invalid)?;
                hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds
            }
            _ => return Err(invalid()),
        };

        if !seconds.is_finite() || seconds < 0.0 {
            return Err(DomainError::BadArgs("Time cannot be negative".to_string()));
        }

        Ok((seconds * MICROS_PER_SECOND).round() as Micros)
    }

    fn parse_seconds_field(secs: &str) -> Option<f64> {
        let value = secs.parse::<f64>().ok()?;
        (0.0..60.0).contains(&value).then_some(value)
    }
}
