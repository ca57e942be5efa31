use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Location text as typed by the user or stored in favorites/history.
///
/// Always trimmed and non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocationQuery(String);

impl LocationQuery {
    /// Returns `None` for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LocationQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated WGS84 position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    lat: f64,
    lon: f64,
}

impl Coordinates {
    /// Returns `None` unless `lat` is in [-90, 90] and `lon` in [-180, 180].
    pub fn new(lat: f64, lon: f64) -> Option<Self> {
        let lat_ok = lat.is_finite() && (-90.0..=90.0).contains(&lat);
        let lon_ok = lon.is_finite() && (-180.0..=180.0).contains(&lon);
        (lat_ok && lon_ok).then_some(Self { lat, lon })
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }
}

/// What a fetching user action asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum WeatherRequest {
    ByName(LocationQuery),
    ByCoordinates(Coordinates),
    /// Ask the position source, then search by the coordinates it yields.
    DevicePosition,
    /// Let the backend resolve the caller's city, then search by that name.
    NetworkLocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

impl UnitSystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Imperial => "imperial",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Metric => Self::Imperial,
            Self::Imperial => Self::Metric,
        }
    }

    pub fn temperature_suffix(&self) -> &'static str {
        match self {
            Self::Metric => "°C",
            Self::Imperial => "°F",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Preferences {
    pub unit: UnitSystem,
    pub theme: Theme,
}

/// Complete result of one weather query, as returned by `/weather` and
/// `/weather/coordinates`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub current: CurrentConditions,
    #[serde(default)]
    pub forecast: Vec<DailyForecast>,
    #[serde(default)]
    pub air_quality: Option<AirQualityPayload>,
    #[serde(default)]
    pub is_day: Option<bool>,
}

impl WeatherSnapshot {
    pub fn location_name(&self) -> &str {
        &self.current.name
    }

    /// Air-quality reading, unless absent or reported as an error by the backend.
    pub fn air_quality_reading(&self) -> Option<&AirQuality> {
        match self.air_quality.as_ref()? {
            AirQualityPayload::Reading(reading) => Some(reading),
            AirQualityPayload::Failed { .. } | AirQualityPayload::Malformed(_) => None,
        }
    }
}

/// Current observation.
///
/// The by-coordinates endpoint forwards the upstream object untouched, so
/// `weather` may arrive as a list and the country only under `sys.country`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCurrentConditions")]
pub struct CurrentConditions {
    pub name: String,
    pub country: String,
    /// Observation time, unix seconds.
    pub dt: Option<i64>,
    pub main: Measurements,
    pub weather: Condition,
    pub wind: Wind,
}

#[derive(Deserialize)]
struct RawCurrentConditions {
    name: String,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    sys: Option<SysInfo>,
    #[serde(default)]
    dt: Option<i64>,
    main: Measurements,
    weather: ConditionField,
    wind: Wind,
}

#[derive(Deserialize)]
struct SysInfo {
    #[serde(default)]
    country: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ConditionField {
    One(Condition),
    Many(Vec<Condition>),
}

impl TryFrom<RawCurrentConditions> for CurrentConditions {
    type Error = String;

    fn try_from(raw: RawCurrentConditions) -> Result<Self, Self::Error> {
        let weather = match raw.weather {
            ConditionField::One(condition) => condition,
            ConditionField::Many(list) => list
                .into_iter()
                .next()
                .ok_or_else(|| "current weather has no conditions".to_string())?,
        };
        let country = raw
            .country
            .or_else(|| raw.sys.and_then(|sys| sys.country))
            .unwrap_or_default();

        Ok(Self {
            name: raw.name,
            country,
            dt: raw.dt,
            main: raw.main,
            weather,
            wind: raw.wind,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurements {
    /// Celsius.
    pub temp: f64,
    pub feels_like: f64,
    pub humidity: f64,
    /// hPa.
    pub pressure: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub id: i64,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    /// Metres per second.
    pub speed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    pub date: NaiveDate,
    pub min_temp: f64,
    pub max_temp: f64,
    pub weather: Condition,
    #[serde(default)]
    pub hourly: Vec<HourlyEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyEntry {
    /// Unix seconds.
    pub dt: i64,
    pub main: HourlyMain,
    #[serde(default)]
    pub weather: Vec<Condition>,
}

impl HourlyEntry {
    pub fn condition_code(&self) -> Option<i64> {
        self.weather.first().map(|c| c.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyMain {
    pub temp: f64,
}

/// The `air_quality` member: a reading, an error object from the backend, or
/// something else entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AirQualityPayload {
    Failed { error: String },
    Reading(AirQuality),
    Malformed(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQuality {
    pub main: AqiMain,
    pub components: Pollutants,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AqiMain {
    /// Expected in 1..=5; anything else is rendered as unknown.
    pub aqi: i64,
}

/// Concentrations in µg/m³.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pollutants {
    #[serde(default)]
    pub pm2_5: f64,
    #[serde(default)]
    pub pm10: f64,
    #[serde(default)]
    pub no2: f64,
    #[serde(default)]
    pub o3: f64,
}

/// One entry of the server-owned search history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub location: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// City resolved by the backend from the caller's network address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedCity {
    pub city: String,
    #[serde(default)]
    pub country: Option<String>,
}
