use std::{fmt, future::Future, process::ExitCode};

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use inquire::{CustomType, InquireError, Password, PasswordDisplayMode, Select, Text};
use weather_core::{
    Config, Coordinates, FixedLocation, LocationMode, LocationService, OpenWeatherProvider,
    RequestState, WeatherRequestController,
};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Current weather for a city or your location")]
pub struct Cli {
    /// Print the final state as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    /// More log output (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key and location settings.
    Configure,

    /// Show the weather for a city.
    City {
        /// City name; several words are joined with spaces.
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
    },

    /// Show the weather at your current location.
    Here {
        /// Latitude to use instead of the configured location source.
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,

        /// Longitude to use instead of the configured location source.
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,

        /// Behave as if no location capability were available.
        #[arg(long, conflicts_with_all = ["lat", "lon"])]
        no_geo: bool,
    },

    /// Prompt for searches until you quit.
    Interactive,
}

/// Where "use my location" gets its position for this invocation.
enum LocationSource {
    Configured,
    Fixed(Coordinates),
    Disabled,
}

impl LocationSource {
    fn service(self, config: &Config) -> Option<Box<dyn LocationService>> {
        match self {
            LocationSource::Configured => config.location_service(),
            LocationSource::Fixed(coords) => Some(Box::new(FixedLocation::new(coords))),
            LocationSource::Disabled => None,
        }
    }
}

enum Request {
    City(String),
    Here,
    Interactive,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<ExitCode> {
        let (request, source) = match self.command {
            Command::Configure => {
                configure()?;
                return Ok(ExitCode::SUCCESS);
            }
            Command::City { name } => (Request::City(name.join(" ")), LocationSource::Configured),
            Command::Here { no_geo: true, .. } => (Request::Here, LocationSource::Disabled),
            Command::Here { lat: Some(lat), lon: Some(lon), .. } => {
                (Request::Here, LocationSource::Fixed(Coordinates::new(lat, lon)))
            }
            Command::Here { .. } => (Request::Here, LocationSource::Configured),
            Command::Interactive => (Request::Interactive, LocationSource::Configured),
        };

        let config = Config::load()?;
        if !config.has_api_key() {
            tracing::warn!(
                "No OpenWeather API key configured. Run `weather configure` or set {}.",
                weather_core::config::API_KEY_ENV
            );
        }

        let provider = OpenWeatherProvider::from_config(&config)?;
        let controller =
            WeatherRequestController::new(Box::new(provider), source.service(&config));
        let screen = Screen {
            controller: &controller,
            icon_base_url: config.icon_base_url(),
            json: self.json,
        };

        let state = match request {
            Request::City(city) => screen.show(controller.submit_city_query(&city)).await?,
            Request::Here => screen.show(controller.submit_location_query()).await?,
            Request::Interactive => {
                screen.interactive().await?;
                return Ok(ExitCode::SUCCESS);
            }
        };

        Ok(exit_code(&state))
    }
}

fn exit_code(state: &RequestState) -> ExitCode {
    match state {
        RequestState::Failed(_) => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    }
}

/// Presentation surface: prints state transitions of one controller.
struct Screen<'a> {
    controller: &'a WeatherRequestController,
    icon_base_url: &'a str,
    json: bool,
}

impl Screen<'_> {
    /// Drives one request to completion, showing `Loading...` while it is in
    /// flight, then prints the final state.
    async fn show<F>(&self, request: F) -> anyhow::Result<RequestState>
    where
        F: Future<Output = RequestState>,
    {
        let mut rx = self.controller.subscribe();
        tokio::pin!(request);

        let state = loop {
            tokio::select! {
                state = &mut request => break state,
                Ok(()) = rx.changed() => {
                    if !self.json && rx.borrow_and_update().is_loading() {
                        eprintln!("{}", render::LOADING);
                    }
                }
            }
        };

        if self.json {
            println!("{}", render::render_json(&state, self.icon_base_url)?);
        } else {
            println!("{}", render::render(&state, self.icon_base_url));
        }

        Ok(state)
    }

    async fn interactive(&self) -> anyhow::Result<()> {
        let actions = vec![Action::Search, Action::UseMyLocation, Action::Quit];

        loop {
            let prompt = Select::new("What would you like to do?", actions.clone());
            let action = match prompt.prompt() {
                Ok(action) => action,
                Err(err) if is_cancel(&err) => return Ok(()),
                Err(err) => return Err(err).context("Failed to read action"),
            };

            match action {
                Action::Search => {
                    let prompt = Text::new("City:").with_placeholder("Enter city name");
                    let city = match prompt.prompt() {
                        Ok(city) => city,
                        Err(err) if is_cancel(&err) => continue,
                        Err(err) => return Err(err).context("Failed to read city name"),
                    };
                    self.show(self.controller.submit_city_query(&city)).await?;
                }
                Action::UseMyLocation => {
                    self.show(self.controller.submit_location_query()).await?;
                }
                Action::Quit => return Ok(()),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Search,
    UseMyLocation,
    Quit,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Search => "Search",
            Action::UseMyLocation => "Use my location",
            Action::Quit => "Quit",
        })
    }
}

fn is_cancel(err: &InquireError) -> bool {
    matches!(err, InquireError::OperationCanceled | InquireError::OperationInterrupted)
}

/// Interactive configuration, persisted to the platform config file.
fn configure() -> anyhow::Result<()> {
    // Read the file alone so environment overrides are not persisted.
    let mut config = Config::load_from(&Config::config_file_path()?)?;

    let api_key = Password::new("OpenWeather API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    if !api_key.trim().is_empty() {
        config.set_api_key(api_key.trim().to_string());
    }

    let mode = Select::new(
        "Where should \"use my location\" get a position?",
        LocationMode::all().to_vec(),
    )
    .prompt()
    .context("Failed to read location mode")?;
    config.location.mode = mode;

    if mode == LocationMode::Fixed {
        let latitude = CustomType::<f64>::new("Latitude:")
            .with_error_message("Please enter a number, e.g. 51.5")
            .prompt()
            .context("Failed to read latitude")?;
        let longitude = CustomType::<f64>::new("Longitude:")
            .with_error_message("Please enter a number, e.g. -0.12")
            .prompt()
            .context("Failed to read longitude")?;
        config.location.latitude = Some(latitude);
        config.location.longitude = Some(longitude);
    }

    let path = config.save()?;
    println!("Configuration saved to {}", path.display());
    Ok(())
}
