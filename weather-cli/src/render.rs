use weather_core::{RequestState, Theme, WeatherReport, derive_background_theme};

pub const LOADING: &str = "Loading...";

/// Human-readable rendering of a request state. Idle renders as nothing.
pub fn render(state: &RequestState, icon_base_url: &str) -> String {
    match state {
        RequestState::Idle => String::new(),
        RequestState::Loading => LOADING.to_string(),
        RequestState::Failed(failure) => failure.to_string(),
        RequestState::Success(report) => {
            render_report(report, icon_base_url, derive_background_theme(state))
        }
    }
}

fn render_report(report: &WeatherReport, icon_base_url: &str, theme: Theme) -> String {
    let heading = match &report.country {
        Some(country) => format!("{}, {}", report.location_name, country),
        None => report.location_name.clone(),
    };
    let (from, to) = theme.gradient();

    [
        heading,
        format!("Icon: {}", report.icon_url(icon_base_url)),
        capitalize_words(&report.description),
        format!("Temp: {} °C", report.temperature_floor_c()),
        format!("Humidity: {}%", report.humidity_pct),
        format!("Pressure: {} hPa", report.pressure_hpa),
        format!("Wind: {} m/s", report.wind_speed_mps),
        format!("Observed: {}", report.observation_time.format("%Y-%m-%d %H:%M UTC")),
        format!("Theme: {theme} ({from} -> {to})"),
    ]
    .join("\n")
}

/// Machine-readable rendering used by `--json`.
pub fn render_json(state: &RequestState, icon_base_url: &str) -> anyhow::Result<String> {
    let value = serde_json::json!({
        "request": state,
        "theme": derive_background_theme(state),
        "icon_url": state.report().map(|r| r.icon_url(icon_base_url)),
        "message": state.error_message(),
    });
    Ok(serde_json::to_string_pretty(&value)?)
}

fn capitalize_words(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
