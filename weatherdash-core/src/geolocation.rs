//! Device position lookup behind a fixed timeout policy.

use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc, time::Duration};
use tracing::debug;

use crate::{config::PositionConfig, error::GeolocationFailure, model::Coordinates};

pub const POSITION_TIMEOUT: Duration = Duration::from_millis(5000);

/// Options handed to the position source on every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub enable_high_accuracy: bool,
    pub timeout: Duration,
    /// Age of a cached position the source may return. Zero forbids caching.
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: true,
            timeout: POSITION_TIMEOUT,
            maximum_age: Duration::ZERO,
        }
    }
}

/// Error reported by a position source, using the platform's numeric codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionError {
    pub code: u16,
    pub message: String,
}

impl PositionError {
    pub const PERMISSION_DENIED: u16 = 1;
    pub const POSITION_UNAVAILABLE: u16 = 2;
    pub const TIMEOUT: u16 = 3;

    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Raw latitude/longitude as produced by a source, not yet validated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawPosition {
    pub latitude: f64,
    pub longitude: f64,
}

#[async_trait]
pub trait PositionSource: Send + Sync + Debug {
    async fn current_position(&self, options: &PositionOptions)
    -> Result<RawPosition, PositionError>;
}

/// A source that always reports the same position.
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition(pub RawPosition);

impl From<PositionConfig> for FixedPosition {
    fn from(cfg: PositionConfig) -> Self {
        Self(RawPosition {
            latitude: cfg.latitude,
            longitude: cfg.longitude,
        })
    }
}

#[async_trait]
impl PositionSource for FixedPosition {
    async fn current_position(
        &self,
        _options: &PositionOptions,
    ) -> Result<RawPosition, PositionError> {
        Ok(self.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Geolocator {
    source: Option<Arc<dyn PositionSource>>,
    options: PositionOptions,
}

impl Geolocator {
    pub fn new(source: Arc<dyn PositionSource>) -> Self {
        Self {
            source: Some(source),
            options: PositionOptions::default(),
        }
    }

    /// A locator with no position capability; every request fails as unsupported.
    pub fn unsupported() -> Self {
        Self::default()
    }

    pub fn is_supported(&self) -> bool {
        self.source.is_some()
    }

    pub async fn get_position(&self) -> Result<Coordinates, GeolocationFailure> {
        let source = self
            .source
            .as_ref()
            .ok_or(GeolocationFailure::Unsupported)?;

        let raw = tokio::time::timeout(self.options.timeout, source.current_position(&self.options))
            .await
            .map_err(|_| GeolocationFailure::Timeout)?
            .map_err(|err| {
                debug!(code = err.code, message = %err.message, "position source failed");
                map_error_code(err.code)
            })?;

        Coordinates::new(raw.latitude, raw.longitude).ok_or(GeolocationFailure::PositionUnavailable)
    }
}

fn map_error_code(code: u16) -> GeolocationFailure {
    match code {
        PositionError::PERMISSION_DENIED => GeolocationFailure::PermissionDenied,
        PositionError::POSITION_UNAVAILABLE => GeolocationFailure::PositionUnavailable,
        PositionError::TIMEOUT => GeolocationFailure::Timeout,
        _ => GeolocationFailure::Unknown,
    }
}
