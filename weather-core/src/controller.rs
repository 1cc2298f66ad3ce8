//! Request lifecycle for the single weather screen.
//!
//! The controller owns one [`RequestState`] and replaces it wholesale on every
//! transition: `Idle -> Loading -> Success | Failed`. Presentation code reads
//! it through [`WeatherRequestController::state`] or a
//! [`watch::Receiver`] from [`WeatherRequestController::subscribe`].
//!
//! Overlapping submissions are resolved with a generation counter: each
//! submit takes the next generation, and an outcome is only applied while its
//! generation is still the latest. The last request issued wins, whatever
//! order the answers arrive in.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;

use crate::{
    location::LocationService,
    model::Query,
    provider::{LookupError, WeatherProvider},
    state::{Failure, RequestState},
    theme::{Theme, derive_background_theme},
};

#[derive(Debug)]
pub struct WeatherRequestController {
    provider: Box<dyn WeatherProvider>,
    location: Option<Box<dyn LocationService>>,
    state: watch::Sender<RequestState>,
    generation: AtomicU64,
}

impl WeatherRequestController {
    /// `location` is `None` when the platform has no way to locate the device.
    pub fn new(
        provider: Box<dyn WeatherProvider>,
        location: Option<Box<dyn LocationService>>,
    ) -> Self {
        let (state, _) = watch::channel(RequestState::Idle);
        Self { provider, location, state, generation: AtomicU64::new(0) }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> RequestState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RequestState> {
        self.state.subscribe()
    }

    pub fn theme(&self) -> Theme {
        derive_background_theme(&self.state.borrow())
    }

    /// Looks up the weather for a typed city name.
    ///
    /// Blank input fails without touching the network. Returns the outcome of
    /// this request, which is only applied to the shared state if no newer
    /// request was issued meanwhile.
    pub async fn submit_city_query(&self, city_text: &str) -> RequestState {
        let generation = self.next_generation();

        let Some(query) = Query::city(city_text) else {
            return self.finish(generation, RequestState::Failed(Failure::EmptyInput));
        };

        self.begin(generation);
        let outcome = self.lookup(&query).await;
        self.finish(generation, outcome)
    }

    /// Looks up the weather at the device's current position.
    pub async fn submit_location_query(&self) -> RequestState {
        let generation = self.next_generation();

        let Some(location) = self.location.as_deref() else {
            return self.finish(generation, RequestState::Failed(Failure::GeolocationUnsupported));
        };

        self.begin(generation);
        let outcome = match location.current_position().await {
            Ok(coords) => self.lookup(&Query::Coordinates(coords)).await,
            Err(err) => {
                if err.is_denial() {
                    tracing::info!(%err, "could not determine current position");
                } else {
                    tracing::warn!(%err, "location service failed");
                }
                RequestState::Failed(Failure::PermissionDenied)
            }
        };
        self.finish(generation, outcome)
    }

    async fn lookup(&self, query: &Query) -> RequestState {
        match self.provider.current(query).await {
            Ok(report) => {
                tracing::info!(
                    location = %report.location_name,
                    condition = %report.condition,
                    "weather lookup succeeded"
                );
                RequestState::Success(report)
            }
            Err(LookupError::Rejected { status, message }) => {
                tracing::info!(status, ?message, "provider rejected weather lookup");
                RequestState::Failed(Failure::NotFound { query: query.kind(), message })
            }
            Err(LookupError::Transport(err)) => {
                tracing::warn!("weather lookup failed: {err:#}");
                RequestState::Failed(Failure::Transient)
            }
        }
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn begin(&self, generation: u64) {
        self.apply(generation, RequestState::Loading);
    }

    fn finish(&self, generation: u64, outcome: RequestState) -> RequestState {
        if !self.apply(generation, outcome.clone()) {
            tracing::debug!(generation, "discarding outcome of superseded request");
        }
        outcome
    }

    /// Replaces the state if `generation` is still the latest. The check runs
    /// under the channel's write lock.
    fn apply(&self, generation: u64, next: RequestState) -> bool {
        self.state.send_if_modified(|state| {
            if !self.is_current(generation) {
                return false;
            }
            *state = next;
            true
        })
    }
}
