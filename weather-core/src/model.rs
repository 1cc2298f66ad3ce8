use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Base URL for OpenWeather condition icons.
pub const DEFAULT_ICON_BASE_URL: &str = "https://openweathermap.org/img/wn";

/// A geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// What a single lookup asks the provider for.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Free-text city name, already trimmed and non-empty.
    City(String),
    Coordinates(Coordinates),
}

impl Query {
    /// Builds a city query, or `None` if the text is blank.
    pub fn city(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() { None } else { Some(Query::City(trimmed.to_string())) }
    }

    pub fn kind(&self) -> QueryKind {
        match self {
            Query::City(_) => QueryKind::City,
            Query::Coordinates(_) => QueryKind::Coordinates,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    City,
    Coordinates,
}

/// Current conditions for one location, in metric units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub location_name: String,
    pub country: Option<String>,
    /// Primary condition group, e.g. "Clear" or "Rain".
    pub condition: String,
    pub description: String,
    /// Provider icon id, e.g. "10d".
    pub icon: String,
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub pressure_hpa: f64,
    pub wind_speed_mps: f64,
    pub observation_time: DateTime<Utc>,
}

impl WeatherReport {
    /// Temperature floored to whole degrees, as it is displayed.
    pub fn temperature_floor_c(&self) -> i64 {
        self.temperature_c.floor() as i64
    }

    pub fn icon_url(&self, base_url: &str) -> String {
        format!("{}/{}@2x.png", base_url.trim_end_matches('/'), self.icon)
    }
}

#[cfg(test)]
pub(crate) fn sample_report(condition: &str) -> WeatherReport {
    WeatherReport {
        location_name: "London".to_string(),
        country: Some("GB".to_string()),
        condition: condition.to_string(),
        description: "light rain".to_string(),
        icon: "10d".to_string(),
        temperature_c: 12.7,
        humidity_pct: 81.0,
        pressure_hpa: 1012.0,
        wind_speed_mps: 4.1,
        observation_time: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).expect("valid timestamp"),
    }
}
