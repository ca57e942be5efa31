use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use std::{fmt::Debug, time::Duration};
use tracing::debug;

use crate::{
    Config,
    error::Failure,
    model::{Coordinates, HistoryEntry, LocationQuery, ResolvedCity, WeatherSnapshot},
};

/// The weather backend consumed by the dashboard.
#[async_trait]
pub trait WeatherBackend: Send + Sync + Debug {
    /// `POST /weather`
    async fn search_by_name(&self, query: &LocationQuery) -> Result<WeatherSnapshot, Failure>;

    /// `GET /weather/coordinates`
    async fn search_by_coordinates(&self, at: Coordinates) -> Result<WeatherSnapshot, Failure>;

    /// `GET /get_location`: the backend resolves the caller's city from its address.
    async fn reverse_geolocate(&self) -> Result<ResolvedCity, Failure>;

    /// `GET /history`
    async fn fetch_history(&self) -> Result<Vec<HistoryEntry>, Failure>;
}

#[derive(Debug, Clone)]
pub struct HttpBackend {
    base: Url,
    http: Client,
}

impl HttpBackend {
    pub fn new(base: Url, timeout: Duration) -> Result<Self, Failure> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Failure::Transport(e.to_string()))?;

        Ok(Self { base, http })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let base = config.backend_url()?;
        Ok(Self::new(base, config.request_timeout())?)
    }

    fn endpoint(&self, path: &str) -> Result<Url, Failure> {
        self.base
            .join(path)
            .map_err(|e| Failure::Transport(format!("invalid endpoint {path}: {e}")))
    }

    async fn read_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<T, Failure> {
        let res = request
            .send()
            .await
            .map_err(|e| Failure::Transport(format!("{what}: {e}")))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| Failure::Transport(format!("{what}: failed to read body: {e}")))?;

        debug!(%status, endpoint = what, bytes = body.len(), "backend response");

        let value: Option<serde_json::Value> = serde_json::from_str(&body).ok();

        if let Some(message) = value.as_ref().and_then(error_field) {
            return Err(Failure::Application {
                message: Some(message),
                status: Some(status.as_u16()),
            });
        }

        if !status.is_success() {
            debug!(endpoint = what, body = %truncate_body(&body), "non-success status");
            return Err(Failure::Application {
                message: None,
                status: Some(status.as_u16()),
            });
        }

        let value = value.ok_or_else(|| {
            Failure::DataShape(format!("{what}: body is not JSON: {}", truncate_body(&body)))
        })?;

        serde_json::from_value(value).map_err(|e| Failure::DataShape(format!("{what}: {e}")))
    }
}

#[async_trait]
impl WeatherBackend for HttpBackend {
    async fn search_by_name(&self, query: &LocationQuery) -> Result<WeatherSnapshot, Failure> {
        let url = self.endpoint("weather")?;
        debug!(location = %query, "searching by name");

        let request = self
            .http
            .post(url)
            .json(&serde_json::json!({ "location": query.as_str() }));

        self.read_json(request, "/weather").await
    }

    async fn search_by_coordinates(&self, at: Coordinates) -> Result<WeatherSnapshot, Failure> {
        let url = self.endpoint("weather/coordinates")?;
        debug!(lat = at.lat(), lon = at.lon(), "searching by coordinates");

        let request = self.http.get(url).query(&[
            ("lat", at.lat().to_string()),
            ("lon", at.lon().to_string()),
        ]);

        self.read_json(request, "/weather/coordinates").await
    }

    async fn reverse_geolocate(&self) -> Result<ResolvedCity, Failure> {
        let url = self.endpoint("get_location")?;
        self.read_json(self.http.get(url), "/get_location").await
    }

    async fn fetch_history(&self) -> Result<Vec<HistoryEntry>, Failure> {
        let url = self.endpoint("history")?;
        self.read_json(self.http.get(url), "/history").await
    }
}

/// Top-level `error` member of an object body, if present and not null.
fn error_field(value: &serde_json::Value) -> Option<String> {
    match value.get("error")? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
