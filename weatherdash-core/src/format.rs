//! Pure display helpers: dates, times, temperatures and condition/AQI classification.

use chrono::{DateTime, NaiveDate, TimeZone};

use crate::{error::Failure, model::UnitSystem};

/// m/s → mph.
const MPS_TO_MPH: f64 = 2.237;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateStyle {
    /// `Fri, Oct 16`
    Short,
    /// `Friday, October 16, 2026`
    Full,
}

pub fn format_date(date: NaiveDate, style: DateStyle) -> String {
    match style {
        DateStyle::Short => date.format("%a, %b %-d").to_string(),
        DateStyle::Full => date.format("%A, %B %-d, %Y").to_string(),
    }
}

/// Hour with a 12-hour period marker, e.g. `2 PM`.
pub fn format_time<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    at.format("%-I %p").to_string()
}

/// Converts a Celsius value for display. No rounding happens here.
pub fn convert_temperature(celsius: f64, to: UnitSystem) -> f64 {
    match to {
        UnitSystem::Metric => celsius,
        UnitSystem::Imperial => celsius * 9.0 / 5.0 + 32.0,
    }
}

/// Converted, rounded and suffixed, e.g. `18°C`.
pub fn display_temperature(celsius: f64, unit: UnitSystem) -> String {
    // Halves round up: -2.5 shows as -2, not -3.
    let value = (convert_temperature(celsius, unit) + 0.5).floor() as i64;
    format!("{value}{}", unit.temperature_suffix())
}

pub fn display_wind(speed_mps: f64, unit: UnitSystem) -> String {
    match unit {
        UnitSystem::Metric => format!("{speed_mps} m/s"),
        UnitSystem::Imperial => format!("{:.1} mph", speed_mps * MPS_TO_MPH),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IconKey {
    Storm,
    Drizzle,
    Rain,
    Snow,
    Atmosphere,
    Clear,
    Cloudy,
    Unknown,
}

impl IconKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Storm => "storm",
            Self::Drizzle => "drizzle",
            Self::Rain => "rain",
            Self::Snow => "snow",
            Self::Atmosphere => "atmosphere",
            Self::Clear => "clear",
            Self::Cloudy => "cloudy",
            Self::Unknown => "unknown",
        }
    }

    pub fn glyph(&self) -> &'static str {
        match self {
            Self::Storm => "⚡",
            Self::Drizzle => "🌦",
            Self::Rain => "☔",
            Self::Snow => "❄",
            Self::Atmosphere => "🌫",
            Self::Clear => "☀",
            Self::Cloudy => "☁",
            Self::Unknown => "?",
        }
    }
}

/// Maps an OpenWeather condition code onto an icon category.
///
/// Codes 400..=499 and anything below 200 have no category.
pub fn classify_condition_icon(code: i64) -> IconKey {
    match code {
        200..=299 => IconKey::Storm,
        300..=399 => IconKey::Drizzle,
        500..=599 => IconKey::Rain,
        600..=699 => IconKey::Snow,
        700..=799 => IconKey::Atmosphere,
        800 => IconKey::Clear,
        801.. => IconKey::Cloudy,
        _ => IconKey::Unknown,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AqiLevel {
    pub label: &'static str,
    pub color: &'static str,
}

impl AqiLevel {
    pub const UNKNOWN: AqiLevel = AqiLevel {
        label: "Unknown",
        color: "gray",
    };
}

const AQI_LEVELS: [AqiLevel; 5] = [
    AqiLevel {
        label: "Good",
        color: "aqi-good",
    },
    AqiLevel {
        label: "Moderate",
        color: "aqi-moderate",
    },
    AqiLevel {
        label: "Unhealthy for Sensitive Groups",
        color: "aqi-unhealthy-sensitive",
    },
    AqiLevel {
        label: "Unhealthy",
        color: "aqi-unhealthy",
    },
    AqiLevel {
        label: "Very Unhealthy",
        color: "aqi-very-unhealthy",
    },
];

/// Looks up the 1..=5 air-quality index. Any other value is a data-shape failure.
pub fn classify_air_quality(index: i64) -> Result<AqiLevel, Failure> {
    usize::try_from(index)
        .ok()
        .and_then(|i| i.checked_sub(1))
        .and_then(|i| AQI_LEVELS.get(i).copied())
        .ok_or_else(|| Failure::DataShape(format!("air quality index {index} outside 1..=5")))
}
