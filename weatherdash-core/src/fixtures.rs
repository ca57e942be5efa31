//! Shared test payloads.

use chrono::{DateTime, FixedOffset, TimeZone};

use crate::model::{HourlyEntry, HourlyMain, WeatherSnapshot};

/// Paris, seven forecast days, first day hourly at 09/12/15/18/21 UTC plus
/// midnight of the next day.
pub(crate) const PARIS_JSON: &str = r#"{
    "current": {
        "name": "Paris",
        "country": "FR",
        "dt": 1792159200,
        "main": {"temp": 18.4, "feels_like": 17.9, "humidity": 72, "pressure": 1015},
        "weather": {"id": 803, "description": "broken clouds"},
        "wind": {"speed": 3.6}
    },
    "forecast": [
        {
            "date": "2026-10-16",
            "min_temp": 11.2,
            "max_temp": 19.0,
            "weather": {"id": 500, "description": "light rain"},
            "hourly": [
                {"dt": 1792141200, "main": {"temp": 12.1}, "weather": [{"id": 500}]},
                {"dt": 1792152000, "main": {"temp": 16.7}, "weather": [{"id": 803}]},
                {"dt": 1792162800, "main": {"temp": 18.9}, "weather": [{"id": 800}]},
                {"dt": 1792173600, "main": {"temp": 15.2}, "weather": [{"id": 801}]},
                {"dt": 1792184400, "main": {"temp": 12.8}, "weather": [{"id": 801}]},
                {"dt": 1792195200, "main": {"temp": 11.3}, "weather": [{"id": 701}]}
            ]
        },
        {
            "date": "2026-10-17", "min_temp": 10.0, "max_temp": 17.5,
            "weather": {"id": 800, "description": "clear sky"}
        },
        {
            "date": "2026-10-18", "min_temp": 9.4, "max_temp": 16.0,
            "weather": {"id": 802, "description": "scattered clouds"}
        },
        {
            "date": "2026-10-19", "min_temp": 8.1, "max_temp": 14.2,
            "weather": {"id": 501, "description": "moderate rain"}
        },
        {
            "date": "2026-10-20", "min_temp": 7.0, "max_temp": 13.3,
            "weather": {"id": 211, "description": "thunderstorm"}
        },
        {
            "date": "2026-10-21", "min_temp": 6.5, "max_temp": 12.0,
            "weather": {"id": 600, "description": "light snow"}
        },
        {
            "date": "2026-10-22", "min_temp": 6.0, "max_temp": 11.0,
            "weather": {"id": 804, "description": "overcast clouds"}
        }
    ],
    "air_quality": {
        "main": {"aqi": 2},
        "components": {"pm2_5": 6.04, "pm10": 9.1, "no2": 14.2, "o3": 51.0}
    },
    "is_day": true
}"#;

pub(crate) fn paris() -> WeatherSnapshot {
    serde_json::from_str(PARIS_JSON).expect("fixture must parse")
}

/// 2026-10-16 14:00 UTC.
pub(crate) fn afternoon() -> DateTime<FixedOffset> {
    utc().with_ymd_and_hms(2026, 10, 16, 14, 0, 0).unwrap()
}

pub(crate) fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap()
}

pub(crate) fn hour_entry(at: DateTime<FixedOffset>, temp: f64) -> HourlyEntry {
    HourlyEntry {
        dt: at.timestamp(),
        main: HourlyMain { temp },
        weather: Vec::new(),
    }
}
