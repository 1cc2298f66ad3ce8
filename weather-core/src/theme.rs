use serde::Serialize;
use std::fmt;

use crate::state::RequestState;

/// Background style keyed off the current weather condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Theme {
    Warm,
    NeutralGray,
    DeepBlue,
    IcyCyan,
    DarkSlate,
    LightGray,
    #[default]
    DefaultBlue,
}

impl Theme {
    /// Theme for a provider condition group. Exact, case-sensitive match.
    pub fn for_condition(condition: &str) -> Self {
        match condition {
            "Clear" => Theme::Warm,
            "Clouds" => Theme::NeutralGray,
            "Rain" => Theme::DeepBlue,
            "Snow" => Theme::IcyCyan,
            "Thunderstorm" => Theme::DarkSlate,
            "Mist" | "Haze" => Theme::LightGray,
            _ => Theme::DefaultBlue,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Warm => "warm",
            Theme::NeutralGray => "neutral-gray",
            Theme::DeepBlue => "deep-blue",
            Theme::IcyCyan => "icy-cyan",
            Theme::DarkSlate => "dark-slate",
            Theme::LightGray => "light-gray",
            Theme::DefaultBlue => "default-blue",
        }
    }

    /// Start and end colours of the background gradient.
    pub fn gradient(&self) -> (&'static str, &'static str) {
        match self {
            Theme::Warm => ("#facc15", "#f97316"),
            Theme::NeutralGray => ("#9ca3af", "#4b5563"),
            Theme::DeepBlue => ("#1d4ed8", "#1e3a8a"),
            Theme::IcyCyan => ("#a5f3fc", "#93c5fd"),
            Theme::DarkSlate => ("#374151", "#000000"),
            Theme::LightGray => ("#d1d5db", "#6b7280"),
            Theme::DefaultBlue => ("#60a5fa", "#2563eb"),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Background theme for whatever the state currently shows.
/// Anything without a report gets the default.
pub fn derive_background_theme(state: &RequestState) -> Theme {
    state
        .report()
        .map(|report| Theme::for_condition(&report.condition))
        .unwrap_or_default()
}
