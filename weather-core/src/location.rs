//! Sources for the "use my location" position.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::fmt::Debug;

use crate::model::Coordinates;

/// Free IP geolocation endpoint, no API key required.
pub const DEFAULT_IP_ENDPOINT: &str = "http://ip-api.com/json";

/// Location service errors
#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location service unavailable: {0}")]
    Unavailable(String),
}

impl LocationError {
    /// True when the user refused, as opposed to the service failing.
    pub fn is_denial(&self) -> bool {
        matches!(self, LocationError::PermissionDenied)
    }
}

/// Something that can tell where the device is.
#[async_trait]
pub trait LocationService: Send + Sync + Debug {
    async fn current_position(&self) -> Result<Coordinates, LocationError>;
}

/// A position supplied up front, e.g. from `--lat/--lon` or the config file.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation {
    coords: Coordinates,
}

impl FixedLocation {
    pub fn new(coords: Coordinates) -> Self {
        Self { coords }
    }
}

#[async_trait]
impl LocationService for FixedLocation {
    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        Ok(self.coords)
    }
}

/// Approximate position of the public IP address.
#[derive(Debug, Clone)]
pub struct IpLocationService {
    endpoint: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    lat: Option<f64>,
    lon: Option<f64>,
    message: Option<String>,
}

impl IpLocationService {
    pub fn with_endpoint(endpoint: &str) -> Self {
        Self { endpoint: endpoint.to_string(), http: Client::new() }
    }
}

#[async_trait]
impl LocationService for IpLocationService {
    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        let res = self
            .http
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| LocationError::Unavailable(e.to_string()))?;

        if !res.status().is_success() {
            return Err(LocationError::Unavailable(format!(
                "geolocation endpoint returned status {}",
                res.status()
            )));
        }

        let body: IpApiResponse =
            res.json().await.map_err(|e| LocationError::Unavailable(e.to_string()))?;

        match (body.status.as_str(), body.lat, body.lon) {
            ("success", Some(lat), Some(lon)) => {
                tracing::debug!(lat, lon, "resolved position from IP");
                Ok(Coordinates::new(lat, lon))
            }
            _ => Err(LocationError::Unavailable(
                body.message.unwrap_or_else(|| "no position in response".to_string()),
            )),
        }
    }
}
