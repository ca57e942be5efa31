//! Core library for the `weatherdash` weather dashboard.
//!
//! This crate defines:
//! - Domain models for backend payloads and user preferences
//! - Display formatters and the dashboard renderer
//! - The state store with durable key/value persistence
//! - The backend client and the geolocation adapter
//! - The controller that ties user actions to all of the above
//!
//! It is used by `weatherdash-cli`, but any front-end that can show a
//! [`Dashboard`] and forward user actions can drive it.

pub mod backend;
pub mod config;
pub mod controller;
pub mod error;
pub mod format;
pub mod geolocation;
pub mod model;
pub mod render;
pub mod store;

#[cfg(test)]
pub(crate) mod fixtures;

pub use backend::{HttpBackend, WeatherBackend};
pub use config::{Config, PositionConfig};
pub use controller::{CompletedRequest, Controller, PendingRequest, RequestToken};
pub use error::{Failure, GeolocationFailure, StorageError};
pub use geolocation::{FixedPosition, Geolocator, PositionSource};
pub use model::{
    Coordinates, LocationQuery, Preferences, Theme, UnitSystem, WeatherRequest, WeatherSnapshot,
};
pub use render::{Dashboard, Renderer, SystemClock, ViewState};
pub use store::{FileStorage, MemoryStorage, StateStore, Storage};
