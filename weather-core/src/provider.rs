use crate::model::{Query, WeatherReport};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openweather;

pub use openweather::OpenWeatherProvider;

/// Why a lookup did not produce a report.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    /// The provider answered, but with an error status.
    #[error("provider rejected the request with status {status}{}", message_suffix(.message))]
    Rejected { status: u16, message: Option<String> },

    /// The request never produced a usable answer: network failure, timeout,
    /// or a body that could not be parsed.
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

fn message_suffix(message: &Option<String>) -> String {
    message.as_ref().map(|m| format!(": {m}")).unwrap_or_default()
}

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Fetches current conditions for one query. One call, one HTTP request.
    async fn current(&self, query: &Query) -> Result<WeatherReport, LookupError>;
}
