use thiserror::Error;

/// Failure kinds reported by the backend client and the geolocation adapter.
///
/// Every variant carries enough detail for logging; what reaches the screen is
/// [`Failure::user_message`] only.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Failure {
    /// No usable response arrived (connection refused, DNS, timeout, truncated body).
    #[error("transport failure: {0}")]
    Transport(String),

    /// The backend answered but reported an error, either through an `error`
    /// field in the body or through a non-success status.
    #[error("backend reported an error (status {status:?}): {message:?}")]
    Application {
        message: Option<String>,
        status: Option<u16>,
    },

    #[error(transparent)]
    Geolocation(#[from] GeolocationFailure),

    /// The payload was missing a field or carried a value outside its domain.
    #[error("unexpected payload: {0}")]
    DataShape(String),
}

impl Failure {
    /// Text suitable for the Error view. Never contains transport or parser internals.
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(_) => "Network error. Please try again later.".to_string(),
            Self::Application {
                message: Some(message),
                ..
            } => message.clone(),
            Self::Application { message: None, .. } => "Failed to fetch weather data.".to_string(),
            Self::Geolocation(failure) => failure.user_message().to_string(),
            Self::DataShape(_) => "Received unexpected data from the weather service.".to_string(),
        }
    }
}

/// Outcomes of a device position request that did not produce coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GeolocationFailure {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("position unavailable")]
    PositionUnavailable,
    #[error("position request timed out")]
    Timeout,
    #[error("no position source available")]
    Unsupported,
    #[error("unknown position error")]
    Unknown,
}

impl GeolocationFailure {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "Location access denied. Please enable location services.",
            Self::PositionUnavailable => "Location information unavailable.",
            Self::Timeout => "Location request timed out.",
            Self::Unsupported => "Geolocation is not supported on this device.",
            Self::Unknown => "An unknown error occurred.",
        }
    }
}

/// Errors raised by durable key/value storage.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("storage file is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),
}
