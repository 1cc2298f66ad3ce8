//! Core library for the `weather` app.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The OpenWeather client behind a provider trait
//! - Location sources for "use my location"
//! - The request lifecycle (`RequestState`) and its controller
//! - Condition-dependent background themes
//!
//! It is used by `weather-cli`, but can also be reused by other front ends.

pub mod config;
pub mod controller;
pub mod location;
pub mod model;
pub mod provider;
pub mod state;
pub mod theme;

pub use config::{Config, LocationConfig, LocationMode};
pub use controller::WeatherRequestController;
pub use location::{FixedLocation, IpLocationService, LocationError, LocationService};
pub use model::{Coordinates, Query, QueryKind, WeatherReport};
pub use provider::{LookupError, OpenWeatherProvider, WeatherProvider};
pub use state::{Failure, RequestState};
pub use theme::{Theme, derive_background_theme};
