use serde::Serialize;
use std::fmt;

use crate::model::{QueryKind, WeatherReport};

/// Why a request ended without a report. Rendered as a user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Failure {
    EmptyInput,
    /// The provider answered with an error status. `message` is the
    /// provider's own text when it sent one.
    NotFound {
        query: QueryKind,
        message: Option<String>,
    },
    PermissionDenied,
    GeolocationUnsupported,
    /// Network failure, timeout or a body we could not read.
    Transient,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::EmptyInput => f.write_str("Please enter a city name"),
            Failure::NotFound { message: Some(message), .. } => f.write_str(message),
            Failure::NotFound { query: QueryKind::City, message: None } => {
                f.write_str("City not found")
            }
            Failure::NotFound { query: QueryKind::Coordinates, message: None } => {
                f.write_str("Location weather not found")
            }
            Failure::PermissionDenied => f.write_str("Location permission denied"),
            Failure::GeolocationUnsupported => f.write_str("Geolocation not supported"),
            Failure::Transient => f.write_str("Something went wrong"),
        }
    }
}

/// Everything the presentation layer needs to know about the current request.
///
/// Always replaced as a whole, so a report and an error can never be shown
/// together.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "snake_case")]
pub enum RequestState {
    #[default]
    Idle,
    Loading,
    Success(WeatherReport),
    Failed(Failure),
}

impl RequestState {
    pub fn is_loading(&self) -> bool {
        matches!(self, RequestState::Loading)
    }

    pub fn report(&self) -> Option<&WeatherReport> {
        match self {
            RequestState::Success(report) => Some(report),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            RequestState::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    /// The message to show, if the request failed.
    pub fn error_message(&self) -> Option<String> {
        self.failure().map(ToString::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::sample_report;

    #[test]
    fn provider_message_is_shown_verbatim() {
        let failure = Failure::NotFound {
            query: QueryKind::City,
            message: Some("city not found".to_string()),
        };
        assert_eq!(failure.to_string(), "city not found");
    }

    #[test]
    fn not_found_default_depends_on_query_kind() {
        let city = Failure::NotFound { query: QueryKind::City, message: None };
        let coords = Failure::NotFound { query: QueryKind::Coordinates, message: None };

        assert_eq!(city.to_string(), "City not found");
        assert_eq!(coords.to_string(), "Location weather not found");
    }

    #[test]
    fn accessors_follow_the_variant() {
        let idle = RequestState::default();
        assert_eq!(idle, RequestState::Idle);
        assert!(!idle.is_loading());

        let success = RequestState::Success(sample_report("Clear"));
        assert_eq!(success.report().map(|r| r.location_name.as_str()), Some("London"));
        assert!(success.failure().is_none());

        let failed = RequestState::Failed(Failure::Transient);
        assert_eq!(failed.error_message().as_deref(), Some("Something went wrong"));
        assert!(failed.report().is_none());
    }

    #[test]
    fn serializes_with_state_tag() {
        let json = serde_json::to_value(RequestState::Failed(Failure::PermissionDenied))
            .expect("serialize state");

        assert_eq!(json["state"], "failed");
        assert_eq!(json["data"]["kind"], "permission_denied");
    }
}
