use anyhow::{Context, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::{
    config::Config,
    model::{Query, WeatherReport},
};

use super::{LookupError, WeatherProvider};

/// Current-weather endpoint of the OpenWeather 2.5 API.
pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn with_base_url(api_key: String, base_url: &str) -> Self {
        Self { api_key, base_url: base_url.to_string(), http: Client::new() }
    }

    /// Builds a provider from config. A missing API key is passed through as
    /// an empty `appid`; the provider's own 401 answer reports it.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build().context("Failed to build HTTP client for OpenWeather")?;

        Ok(Self {
            api_key: config.api_key.clone().unwrap_or_default(),
            base_url: config.base_url().to_string(),
            http,
        })
    }

    fn query_params(&self, query: &Query) -> Vec<(&'static str, String)> {
        let mut params = match query {
            Query::City(city) => vec![("q", city.clone())],
            Query::Coordinates(coords) => vec![
                ("lat", coords.latitude.to_string()),
                ("lon", coords.longitude.to_string()),
            ],
        };
        params.push(("appid", self.api_key.clone()));
        params.push(("units", "metric".to_string()));
        params
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn current(&self, query: &Query) -> Result<WeatherReport, LookupError> {
        tracing::debug!(?query, url = %self.base_url, "requesting current weather");

        let res = self
            .http
            .get(&self.base_url)
            .query(&self.query_params(query))
            .send()
            .await
            .context("Failed to send request to OpenWeather (current weather)")?;

        let status = res.status();
        let body = res.text().await.context("Failed to read OpenWeather response body")?;

        if !status.is_success() {
            let message = parse_error_message(&body)?;
            tracing::debug!(%status, ?message, "OpenWeather rejected the request");
            return Err(LookupError::Rejected { status: status.as_u16(), message });
        }

        let parsed: OwCurrentResponse = serde_json::from_str(&body).with_context(|| {
            format!("Failed to parse OpenWeather current JSON: {}", truncate_body(&body))
        })?;

        Ok(parsed.into_report()?)
    }
}

/// Pulls `message` out of an error body. A body that is not JSON at all is a
/// transport problem, a JSON body without a usable message is not.
fn parse_error_message(body: &str) -> anyhow::Result<Option<String>> {
    let value: serde_json::Value = serde_json::from_str(body).with_context(|| {
        format!("Failed to parse OpenWeather error JSON: {}", truncate_body(body))
    })?;

    Ok(value
        .get("message")
        .and_then(serde_json::Value::as_str)
        .filter(|m| !m.is_empty())
        .map(str::to_string))
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    humidity: f64,
    pressure: f64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    main: String,
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    dt: Option<i64>,
    sys: Option<OwSys>,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
}

impl OwCurrentResponse {
    fn into_report(self) -> anyhow::Result<WeatherReport> {
        let primary = self
            .weather
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("OpenWeather response contained no weather conditions"))?;

        let observation_time = self.dt.and_then(unix_to_utc).unwrap_or_else(Utc::now);

        Ok(WeatherReport {
            location_name: self.name,
            country: self.sys.and_then(|s| s.country),
            condition: primary.main,
            description: primary.description,
            icon: primary.icon,
            temperature_c: self.main.temp,
            humidity_pct: self.main.humidity,
            pressure_hpa: self.main.pressure,
            wind_speed_mps: self.wind.speed,
            observation_time,
        })
    }
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(ts, 0)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Coordinates;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn london_body() -> serde_json::Value {
        json!({
            "name": "London",
            "dt": 1_700_000_000,
            "sys": { "country": "GB" },
            "weather": [
                { "id": 500, "main": "Rain", "description": "light rain", "icon": "10d" }
            ],
            "main": { "temp": 12.7, "feels_like": 11.9, "humidity": 81, "pressure": 1012 },
            "wind": { "speed": 4.1, "deg": 230 }
        })
    }

    fn provider_for(server: &MockServer) -> OpenWeatherProvider {
        OpenWeatherProvider::with_base_url("KEY".to_string(), &format!("{}/weather", server.uri()))
    }

    #[tokio::test]
    async fn city_lookup_sends_q_key_and_metric_units() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("q", "London"))
            .and(query_param("appid", "KEY"))
            .and(query_param("units", "metric"))
            .respond_with(ResponseTemplate::new(200).set_body_json(london_body()))
            .expect(1)
            .mount(&server)
            .await;

        let report = provider_for(&server)
            .current(&Query::City("London".to_string()))
            .await
            .expect("lookup should succeed");

        assert_eq!(report.location_name, "London");
        assert_eq!(report.country.as_deref(), Some("GB"));
        assert_eq!(report.condition, "Rain");
        assert_eq!(report.description, "light rain");
        assert_eq!(report.icon, "10d");
        assert_eq!(report.temperature_c, 12.7);
        assert_eq!(report.humidity_pct, 81.0);
        assert_eq!(report.pressure_hpa, 1012.0);
        assert_eq!(report.wind_speed_mps, 4.1);
        assert_eq!(report.observation_time.timestamp(), 1_700_000_000);
    }

    #[tokio::test]
    async fn coordinate_lookup_sends_lat_and_lon() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("lat", "51.5"))
            .and(query_param("lon", "-0.12"))
            .and(query_param("units", "metric"))
            .respond_with(ResponseTemplate::new(200).set_body_json(london_body()))
            .expect(1)
            .mount(&server)
            .await;

        let report = provider_for(&server)
            .current(&Query::Coordinates(Coordinates::new(51.5, -0.12)))
            .await
            .expect("lookup should succeed");

        assert_eq!(report.location_name, "London");
    }

    #[tokio::test]
    async fn fractional_humidity_and_pressure_pass_through() {
        let server = MockServer::start().await;
        let mut body = london_body();
        body["main"] = json!({ "temp": 1.0, "humidity": 81.0, "pressure": 1012.5 });

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let report = provider_for(&server)
            .current(&Query::City("London".to_string()))
            .await
            .expect("lookup should succeed");

        assert_eq!(report.humidity_pct, 81.0);
        assert_eq!(report.pressure_hpa, 1012.5);
    }

    #[tokio::test]
    async fn error_status_carries_provider_message() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(json!({ "cod": "404", "message": "city not found" })),
            )
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .current(&Query::City("Atlantis".to_string()))
            .await
            .unwrap_err();

        match err {
            LookupError::Rejected { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message.as_deref(), Some("city not found"));
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn error_status_without_message() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "cod": "404" })))
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .current(&Query::City("Atlantis".to_string()))
            .await
            .unwrap_err();

        assert!(matches!(err, LookupError::Rejected { status: 404, message: None }));
    }

    #[tokio::test]
    async fn non_json_error_body_is_a_transport_failure() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .current(&Query::City("London".to_string()))
            .await
            .unwrap_err();

        assert!(matches!(err, LookupError::Transport(_)));
    }

    #[tokio::test]
    async fn malformed_success_body_is_a_transport_failure() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "London" })))
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .current(&Query::City("London".to_string()))
            .await
            .unwrap_err();

        assert!(matches!(err, LookupError::Transport(_)));
    }

    #[tokio::test]
    async fn empty_weather_list_is_a_transport_failure() {
        let server = MockServer::start().await;
        let mut body = london_body();
        body["weather"] = json!([]);

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .current(&Query::City("London".to_string()))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("no weather conditions"));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_failure() {
        let provider =
            OpenWeatherProvider::with_base_url("KEY".to_string(), "http://127.0.0.1:9/weather");

        let err = provider.current(&Query::City("London".to_string())).await.unwrap_err();

        assert!(matches!(err, LookupError::Transport(_)));
    }

    #[test]
    fn missing_dt_is_tolerated() {
        let mut body = london_body();
        if let Some(obj) = body.as_object_mut() {
            obj.remove("dt");
        }
        let parsed: OwCurrentResponse = serde_json::from_value(body).expect("parse");

        let report = parsed.into_report().expect("report");
        assert_eq!(report.location_name, "London");
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let long = "é".repeat(300);
        let truncated = truncate_body(&long);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncated.chars().count(), 203);
        assert_eq!(truncate_body("short"), "short");
    }
}
