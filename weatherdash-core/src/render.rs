//! Display model and the renderer that is its only writer.

use chrono::{DateTime, FixedOffset, Local, TimeZone, Timelike};
use std::fmt;

use crate::{
    format::{
        AqiLevel, DateStyle, IconKey, classify_air_quality, classify_condition_icon,
        display_temperature, display_wind, format_date, format_time,
    },
    model::{
        AirQuality, HistoryEntry, HourlyEntry, Preferences, Theme, UnitSystem, WeatherSnapshot,
    },
};

pub const FORECAST_DAYS: usize = 5;
pub const HOURLY_LIMIT: usize = 24;

/// Mutually exclusive display mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewState {
    #[default]
    Welcome,
    Loading,
    Content,
    Error,
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// Always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurrentPanel {
    pub header: String,
    pub date: String,
    pub temperature: String,
    pub description: String,
    pub feels_like: String,
    pub humidity: String,
    pub wind: String,
    pub pressure: String,
    pub icon: IconKey,
    pub day_phase: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastCard {
    pub date: String,
    pub icon: IconKey,
    pub description: String,
    pub max: String,
    pub min: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HourlyCard {
    pub time: String,
    pub icon: IconKey,
    pub temperature: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AirQualityPanel {
    pub index: i64,
    pub level: AqiLevel,
    pub pm2_5: String,
    pub pm10: String,
    pub no2: String,
    pub o3: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FavoriteButton {
    pub active: bool,
    pub label: &'static str,
}

/// Everything on screen. Fields are readable by anyone; only [`Renderer`] writes them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dashboard {
    view: ViewState,
    theme: Theme,
    unit_label: &'static str,
    error_message: Option<String>,
    current: Option<CurrentPanel>,
    forecast: Vec<ForecastCard>,
    hourly: Vec<HourlyCard>,
    air_quality: Option<AirQualityPanel>,
    favorite_button: FavoriteButton,
    favorites: Vec<String>,
    history: Vec<String>,
}

impl Dashboard {
    pub fn view(&self) -> ViewState {
        self.view
    }

    /// True for exactly one region at any time.
    pub fn is_visible(&self, region: ViewState) -> bool {
        self.view == region
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn unit_label(&self) -> &str {
        self.unit_label
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn current(&self) -> Option<&CurrentPanel> {
        self.current.as_ref()
    }

    pub fn forecast(&self) -> &[ForecastCard] {
        &self.forecast
    }

    pub fn hourly(&self) -> &[HourlyCard] {
        &self.hourly
    }

    pub fn air_quality(&self) -> Option<&AirQualityPanel> {
        self.air_quality.as_ref()
    }

    pub fn favorite_button(&self) -> &FavoriteButton {
        &self.favorite_button
    }

    pub fn favorites(&self) -> &[String] {
        &self.favorites
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }
}

pub struct Renderer {
    clock: Box<dyn Clock>,
    dashboard: Dashboard,
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("now", &self.clock.now())
            .field("dashboard", &self.dashboard)
            .finish()
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(Box::new(SystemClock))
    }
}

impl Renderer {
    pub fn new(clock: Box<dyn Clock>) -> Self {
        Self {
            clock,
            dashboard: Dashboard {
                unit_label: unit_label(UnitSystem::Metric),
                favorite_button: favorite_button(false),
                ..Dashboard::default()
            },
        }
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    /// Brings the whole dashboard in line with the given state.
    ///
    /// Content panels are rewritten only when a snapshot is given; otherwise they
    /// keep their last values and are simply hidden.
    pub fn render(
        &mut self,
        view: ViewState,
        snapshot: Option<&WeatherSnapshot>,
        preferences: Preferences,
        favorites: &[String],
    ) {
        self.show_only(view);
        self.dashboard.theme = preferences.theme;
        self.dashboard.unit_label = unit_label(preferences.unit);

        if view != ViewState::Error {
            self.dashboard.error_message = None;
        }

        if let Some(snapshot) = snapshot {
            let now = self.clock.now();
            self.render_current(snapshot, preferences.unit, now);
            self.render_forecast(snapshot, preferences.unit);
            self.render_hourly(snapshot, preferences.unit, now);
            self.render_air_quality(snapshot);
        }

        self.render_favorites(snapshot.map(|s| s.location_name()), favorites);
    }

    /// Switches to the Error view with a user-facing message.
    pub fn render_error(&mut self, message: impl Into<String>) {
        self.show_only(ViewState::Error);
        self.dashboard.error_message = Some(message.into());
    }

    pub fn render_favorites(&mut self, shown: Option<&str>, favorites: &[String]) {
        let active = shown.is_some_and(|name| favorites.iter().any(|f| f == name));
        self.dashboard.favorite_button = favorite_button(active);
        self.dashboard.favorites = favorites.to_vec();
    }

    pub fn render_history(&mut self, history: &[HistoryEntry]) {
        self.dashboard.history = history.iter().map(|h| h.location.clone()).collect();
    }

    fn show_only(&mut self, view: ViewState) {
        self.dashboard.view = view;
    }

    fn render_current(
        &mut self,
        snapshot: &WeatherSnapshot,
        unit: UnitSystem,
        now: DateTime<FixedOffset>,
    ) {
        let current = &snapshot.current;
        let header = if current.country.is_empty() {
            current.name.clone()
        } else {
            format!("{}, {}", current.name, current.country)
        };

        self.dashboard.current = Some(CurrentPanel {
            header,
            date: format_date(now.date_naive(), DateStyle::Full),
            temperature: display_temperature(current.main.temp, unit),
            description: current.weather.description.clone(),
            feels_like: display_temperature(current.main.feels_like, unit),
            humidity: format!("{}%", current.main.humidity),
            wind: display_wind(current.wind.speed, unit),
            pressure: format!("{} hPa", current.main.pressure),
            icon: classify_condition_icon(current.weather.id),
            day_phase: snapshot.is_day.map(|day| if day { "Day" } else { "Night" }),
        });
    }

    fn render_forecast(&mut self, snapshot: &WeatherSnapshot, unit: UnitSystem) {
        self.dashboard.forecast = snapshot
            .forecast
            .iter()
            .take(FORECAST_DAYS)
            .map(|day| ForecastCard {
                date: format_date(day.date, DateStyle::Short),
                icon: classify_condition_icon(day.weather.id),
                description: day.weather.description.clone(),
                max: display_temperature(day.max_temp, unit),
                min: display_temperature(day.min_temp, unit),
            })
            .collect();
    }

    fn render_hourly(
        &mut self,
        snapshot: &WeatherSnapshot,
        unit: UnitSystem,
        now: DateTime<FixedOffset>,
    ) {
        let entries = snapshot
            .forecast
            .first()
            .map(|day| day.hourly.as_slice())
            .unwrap_or_default();

        self.dashboard.hourly = upcoming_hours(entries, now)
            .into_iter()
            .filter_map(|entry| {
                let at = now.timezone().timestamp_opt(entry.dt, 0).single()?;
                Some(HourlyCard {
                    time: format_time(&at),
                    icon: entry
                        .condition_code()
                        .map(classify_condition_icon)
                        .unwrap_or(IconKey::Unknown),
                    temperature: display_temperature(entry.main.temp, unit),
                })
            })
            .collect();
    }

    fn render_air_quality(&mut self, snapshot: &WeatherSnapshot) {
        self.dashboard.air_quality = snapshot.air_quality_reading().map(air_quality_panel);
    }
}

/// Entries at or after the current hour today, or on any later day, capped at
/// [`HOURLY_LIMIT`] and kept in source order.
pub fn upcoming_hours(entries: &[HourlyEntry], now: DateTime<FixedOffset>) -> Vec<&HourlyEntry> {
    let tz = now.timezone();
    let today = now.date_naive();
    let hour_start = today.and_hms_opt(now.hour(), 0, 0);

    entries
        .iter()
        .filter(|entry| {
            let Some(at) = tz.timestamp_opt(entry.dt, 0).single() else {
                return false;
            };
            let local = at.naive_local();
            if local.date() > today {
                return true;
            }
            local.date() == today && hour_start.is_some_and(|start| local >= start)
        })
        .take(HOURLY_LIMIT)
        .collect()
}

fn air_quality_panel(reading: &AirQuality) -> AirQualityPanel {
    let index = reading.main.aqi;
    let pollutant = |v: f64| format!("{v:.1} µg/m³");

    AirQualityPanel {
        index,
        level: classify_air_quality(index).unwrap_or(AqiLevel::UNKNOWN),
        pm2_5: pollutant(reading.components.pm2_5),
        pm10: pollutant(reading.components.pm10),
        no2: pollutant(reading.components.no2),
        o3: pollutant(reading.components.o3),
    }
}

fn unit_label(unit: UnitSystem) -> &'static str {
    match unit {
        UnitSystem::Metric => "°C / °F",
        UnitSystem::Imperial => "°F / °C",
    }
}

fn favorite_button(active: bool) -> FavoriteButton {
    FavoriteButton {
        active,
        label: if active {
            "Remove from favorites"
        } else {
            "Add to favorites"
        },
    }
}

impl fmt::Display for Dashboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let theme_glyph = match self.theme {
            Theme::Light => "☾",
            Theme::Dark => "☀",
        };
        writeln!(f, "[{}]  [{theme_glyph}]", self.unit_label)?;
        writeln!(f)?;

        match self.view {
            ViewState::Welcome => {
                writeln!(f, "Welcome! Search for a city to see its weather.")?;
            }
            ViewState::Loading => {
                writeln!(f, "Loading weather data...")?;
            }
            ViewState::Error => {
                writeln!(f, "Error")?;
                writeln!(f, "{}", self.error_message.as_deref().unwrap_or_default())?;
            }
            ViewState::Content => self.fmt_content(f)?,
        }

        writeln!(f)?;
        writeln!(f, "Favorites")?;
        if self.favorites.is_empty() {
            writeln!(f, "  No favorite locations yet")?;
        }
        for name in &self.favorites {
            writeln!(f, "  ★ {name}")?;
        }

        writeln!(f, "Recent searches")?;
        if self.history.is_empty() {
            writeln!(f, "  No recent searches")?;
        }
        for name in &self.history {
            writeln!(f, "  ↺ {name}")?;
        }
        Ok(())
    }
}

impl Dashboard {
    fn fmt_content(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(current) = &self.current {
            writeln!(f, "{}", current.header)?;
            writeln!(f, "{}", current.date)?;
            if let Some(phase) = current.day_phase {
                writeln!(f, "{phase}")?;
            }
            writeln!(
                f,
                "{} {}  {}",
                current.icon.glyph(),
                current.temperature,
                current.description
            )?;
            writeln!(
                f,
                "Feels like {} | Humidity {} | Wind {} | Pressure {}",
                current.feels_like, current.humidity, current.wind, current.pressure
            )?;
            let marker = if self.favorite_button.active { "♥" } else { "♡" };
            writeln!(f, "{marker} {}", self.favorite_button.label)?;
        }

        if !self.hourly.is_empty() {
            writeln!(f)?;
            writeln!(f, "Hourly")?;
            for hour in &self.hourly {
                writeln!(f, "  {:>5}  {}  {}", hour.time, hour.icon.glyph(), hour.temperature)?;
            }
        }

        if !self.forecast.is_empty() {
            writeln!(f)?;
            writeln!(f, "Forecast")?;
            for day in &self.forecast {
                writeln!(
                    f,
                    "  {:<11} {}  {:>6} / {:<6} {}",
                    day.date,
                    day.icon.glyph(),
                    day.max,
                    day.min,
                    day.description
                )?;
            }
        }

        if let Some(aq) = &self.air_quality {
            writeln!(f)?;
            writeln!(f, "Air quality: {} ({})", aq.index, aq.level.label)?;
            writeln!(
                f,
                "  PM2.5 {} | PM10 {} | NO2 {} | O3 {}",
                aq.pm2_5, aq.pm10, aq.no2, aq.o3
            )?;
        }
        Ok(())
    }
}
