//! User actions → backend/geolocation → state store → renderer.
//!
//! Every fetching action bumps a generation counter. A response is installed
//! only if it carries the current generation, so a slow early response can never
//! overwrite the result of a later action.

use std::{fmt, future::Future, pin::Pin, sync::Arc};

use tracing::{info, warn};

use crate::{
    backend::WeatherBackend,
    error::Failure,
    geolocation::Geolocator,
    model::{Coordinates, LocationQuery, WeatherRequest, WeatherSnapshot},
    render::{Dashboard, Renderer, ViewState},
    store::{StateStore, Storage},
};

type Fetch = Pin<Box<dyn Future<Output = Result<WeatherSnapshot, Failure>> + Send>>;

/// Generation stamp of an in-flight request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestToken(u64);

/// A dispatched request whose result has not been applied yet.
pub struct PendingRequest {
    token: RequestToken,
    request: WeatherRequest,
    fetch: Fetch,
}

impl fmt::Debug for PendingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingRequest")
            .field("token", &self.token)
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

impl PendingRequest {
    pub fn token(&self) -> RequestToken {
        self.token
    }

    /// Drives the request to completion. Does not touch controller state.
    pub async fn resolve(self) -> CompletedRequest {
        let outcome = self.fetch.await;
        CompletedRequest {
            token: self.token,
            request: self.request,
            outcome,
        }
    }
}

#[derive(Debug)]
pub struct CompletedRequest {
    token: RequestToken,
    request: WeatherRequest,
    outcome: Result<WeatherSnapshot, Failure>,
}

impl CompletedRequest {
    pub fn token(&self) -> RequestToken {
        self.token
    }
}

pub struct Controller<S> {
    backend: Arc<dyn WeatherBackend>,
    geolocator: Geolocator,
    store: StateStore<S>,
    renderer: Renderer,
    view: ViewState,
    generation: u64,
}

impl<S: fmt::Debug> fmt::Debug for Controller<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("backend", &self.backend)
            .field("view", &self.view)
            .field("generation", &self.generation)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl<S: Storage> Controller<S> {
    /// Starts in the Welcome view with persisted preferences and favorites shown.
    pub fn new(
        backend: Arc<dyn WeatherBackend>,
        geolocator: Geolocator,
        store: StateStore<S>,
        renderer: Renderer,
    ) -> Self {
        let mut controller = Self {
            backend,
            geolocator,
            store,
            renderer,
            view: ViewState::Welcome,
            generation: 0,
        };
        controller.rerender();
        controller
    }

    pub fn view_state(&self) -> ViewState {
        self.view
    }

    pub fn dashboard(&self) -> &Dashboard {
        self.renderer.dashboard()
    }

    pub fn store(&self) -> &StateStore<S> {
        &self.store
    }

    /// Initial load: fetches the server-owned search history.
    pub async fn start(&mut self) {
        self.refresh_history().await;
    }

    /// Search form submission. Blank text is ignored without leaving the current view.
    ///
    /// Returns whether a request was made and its result applied.
    pub async fn submit_search(&mut self, text: &str) -> bool {
        let Some(query) = LocationQuery::parse(text) else {
            return false;
        };
        self.run(WeatherRequest::ByName(query)).await
    }

    /// Click on a favorite or history entry.
    pub async fn select_location(&mut self, name: &str) -> bool {
        self.submit_search(name).await
    }

    pub async fn request_geolocation(&mut self) -> bool {
        self.run(WeatherRequest::DevicePosition).await
    }

    /// Search at explicit coordinates, bypassing the position source.
    pub async fn search_coordinates(&mut self, at: Coordinates) -> bool {
        self.run(WeatherRequest::ByCoordinates(at)).await
    }

    pub async fn locate_by_network(&mut self) -> bool {
        self.run(WeatherRequest::NetworkLocation).await
    }

    /// Dispatches `request`, waits for it and applies the result.
    pub async fn run(&mut self, request: WeatherRequest) -> bool {
        let pending = self.dispatch(request);
        let completed = pending.resolve().await;
        let records_history = matches!(
            completed.request,
            WeatherRequest::ByName(_) | WeatherRequest::NetworkLocation
        );

        let applied = self.apply(completed);
        if applied && records_history && self.view == ViewState::Content {
            self.refresh_history().await;
        }
        applied
    }

    /// Moves to Loading and returns the request, stamped with a fresh generation.
    /// Any request dispatched earlier becomes stale.
    pub fn dispatch(&mut self, request: WeatherRequest) -> PendingRequest {
        self.generation = self.generation.wrapping_add(1);
        let token = RequestToken(self.generation);
        info!(generation = token.0, ?request, "dispatching weather request");

        self.transition(ViewState::Loading);

        let backend = Arc::clone(&self.backend);
        let geolocator = self.geolocator.clone();
        let owned = request.clone();
        let fetch: Fetch = Box::pin(async move {
            match owned {
                WeatherRequest::ByName(query) => backend.search_by_name(&query).await,
                WeatherRequest::ByCoordinates(at) => backend.search_by_coordinates(at).await,
                WeatherRequest::DevicePosition => {
                    let at = geolocator.get_position().await?;
                    backend.search_by_coordinates(at).await
                }
                WeatherRequest::NetworkLocation => {
                    let resolved = backend.reverse_geolocate().await?;
                    let query = LocationQuery::parse(&resolved.city).ok_or_else(|| {
                        Failure::DataShape("backend resolved an empty city name".into())
                    })?;
                    backend.search_by_name(&query).await
                }
            }
        });

        PendingRequest {
            token,
            request,
            fetch,
        }
    }

    /// Installs a completed request's outcome unless a newer request was
    /// dispatched in the meantime. Returns whether it was installed.
    pub fn apply(&mut self, completed: CompletedRequest) -> bool {
        if completed.token.0 != self.generation {
            warn!(
                stale = completed.token.0,
                current = self.generation,
                "discarding superseded weather response"
            );
            return false;
        }

        match completed.outcome {
            Ok(snapshot) => {
                info!(location = snapshot.location_name(), "weather loaded");
                self.store.set_snapshot(snapshot);
                self.transition(ViewState::Content);
            }
            Err(failure) => {
                warn!(error = %failure, "weather request failed");
                self.view = ViewState::Error;
                self.renderer.render_error(failure.user_message());
            }
        }
        true
    }

    /// Flips metric/imperial and re-renders from the last snapshot without fetching.
    pub fn toggle_unit(&mut self) {
        let unit = self.store.preferences().unit.toggled();
        if let Err(err) = self.store.set_unit(unit) {
            warn!(error = %err, "failed to persist unit preference");
            return;
        }
        self.rerender();
    }

    pub fn toggle_theme(&mut self) {
        let theme = self.store.preferences().theme.toggled();
        if let Err(err) = self.store.set_theme(theme) {
            warn!(error = %err, "failed to persist theme");
            return;
        }
        self.rerender();
    }

    /// Adds or removes the shown location. Only meaningful in the Content view;
    /// returns the new membership, or `None` when nothing is shown.
    pub fn toggle_favorite(&mut self) -> Option<bool> {
        if self.view != ViewState::Content {
            return None;
        }
        let name = self.store.snapshot()?.location_name().to_string();

        match self.store.toggle_favorite(&name) {
            Ok(now_favorite) => {
                self.renderer
                    .render_favorites(Some(&name), self.store.favorites());
                Some(now_favorite)
            }
            Err(err) => {
                warn!(error = %err, location = %name, "failed to persist favorites");
                None
            }
        }
    }

    /// Removes `name` from the favorites list, whatever is currently shown.
    pub fn remove_favorite(&mut self, name: &str) -> bool {
        match self.store.remove_favorite(name) {
            Ok(removed) => {
                self.renderer.render_favorites(
                    self.store.snapshot().map(|s| s.location_name()),
                    self.store.favorites(),
                );
                removed
            }
            Err(err) => {
                warn!(error = %err, location = %name, "failed to persist favorites");
                false
            }
        }
    }

    /// Reloads search history. Failures leave the list and the view untouched.
    pub async fn refresh_history(&mut self) {
        match self.backend.fetch_history().await {
            Ok(items) => {
                self.renderer.render_history(&items);
                self.store.set_history(items);
            }
            Err(err) => warn!(error = %err, "failed to fetch search history"),
        }
    }

    fn transition(&mut self, view: ViewState) {
        if self.view != view {
            info!(from = ?self.view, to = ?view, "view transition");
        }
        self.view = view;
        self.rerender();
    }

    fn rerender(&mut self) {
        let snapshot = match self.view {
            ViewState::Content => self.store.snapshot(),
            _ => None,
        };
        self.renderer.render(
            self.view,
            snapshot,
            self.store.preferences(),
            self.store.favorites(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::GeolocationFailure,
        fixtures::{self, afternoon},
        geolocation::{FixedPosition, PositionError, PositionOptions, PositionSource, RawPosition},
        model::{HistoryEntry, ResolvedCity, UnitSystem},
        render::FixedClock,
        store::{MemoryStorage, THEME_KEY},
    };
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct FakeBackend {
        calls: Mutex<Vec<String>>,
        fail_with: Option<Failure>,
        history: Vec<HistoryEntry>,
        city: Option<String>,
    }

    impl FakeBackend {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn weather_calls(&self) -> usize {
            self.calls().iter().filter(|c| *c != "history").count()
        }
    }

    fn snapshot_named(name: &str) -> WeatherSnapshot {
        let mut snapshot = fixtures::paris();
        snapshot.current.name = name.to_string();
        snapshot
    }

    #[async_trait]
    impl WeatherBackend for FakeBackend {
        async fn search_by_name(&self, query: &LocationQuery) -> Result<WeatherSnapshot, Failure> {
            self.record(format!("name:{query}"));
            match &self.fail_with {
                Some(failure) => Err(failure.clone()),
                None => Ok(snapshot_named(query.as_str())),
            }
        }

        async fn search_by_coordinates(&self, at: Coordinates) -> Result<WeatherSnapshot, Failure> {
            self.record(format!("coords:{},{}", at.lat(), at.lon()));
            match &self.fail_with {
                Some(failure) => Err(failure.clone()),
                None => Ok(snapshot_named("Berlin")),
            }
        }

        async fn reverse_geolocate(&self) -> Result<ResolvedCity, Failure> {
            self.record("get_location".into());
            self.city
                .clone()
                .map(|city| ResolvedCity {
                    city,
                    country: None,
                })
                .ok_or(Failure::Application {
                    message: Some("Location not found".into()),
                    status: Some(404),
                })
        }

        async fn fetch_history(&self) -> Result<Vec<HistoryEntry>, Failure> {
            self.record("history".into());
            Ok(self.history.clone())
        }
    }

    #[derive(Debug)]
    struct Denied;

    #[async_trait]
    impl PositionSource for Denied {
        async fn current_position(
            &self,
            _options: &PositionOptions,
        ) -> Result<RawPosition, PositionError> {
            Err(PositionError::new(PositionError::PERMISSION_DENIED, "User denied Geolocation"))
        }
    }

    fn controller_with(
        backend: Arc<FakeBackend>,
        geolocator: Geolocator,
    ) -> Controller<MemoryStorage> {
        Controller::new(
            backend,
            geolocator,
            StateStore::load(MemoryStorage::default()),
            Renderer::new(Box::new(FixedClock(afternoon()))),
        )
    }

    fn controller(backend: Arc<FakeBackend>) -> Controller<MemoryStorage> {
        controller_with(backend, Geolocator::unsupported())
    }

    #[tokio::test]
    async fn starts_in_welcome() {
        let backend = Arc::new(FakeBackend::default());
        let ctl = controller(backend.clone());

        assert_eq!(ctl.view_state(), ViewState::Welcome);
        assert!(ctl.dashboard().is_visible(ViewState::Welcome));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn successful_search_shows_content() {
        let backend = Arc::new(FakeBackend::default());
        let mut ctl = controller(backend.clone());

        assert!(ctl.submit_search("  Paris ").await);

        assert_eq!(ctl.view_state(), ViewState::Content);
        assert!(ctl.dashboard().is_visible(ViewState::Content));
        assert_eq!(ctl.dashboard().current().unwrap().header, "Paris, FR");
        let expected_days = ctl.store().snapshot().unwrap().forecast.len().min(5);
        assert_eq!(ctl.dashboard().forecast().len(), expected_days);
        assert_eq!(backend.calls(), ["name:Paris", "history"]);
    }

    #[tokio::test]
    async fn empty_search_is_a_no_op() {
        let backend = Arc::new(FakeBackend::default());
        let mut ctl = controller(backend.clone());

        assert!(!ctl.submit_search("").await);
        assert!(!ctl.submit_search("   ").await);

        assert!(backend.calls().is_empty());
        assert_eq!(ctl.view_state(), ViewState::Welcome);
    }

    #[tokio::test]
    async fn denied_geolocation_shows_error_without_backend_call() {
        let backend = Arc::new(FakeBackend::default());
        let mut ctl = controller_with(backend.clone(), Geolocator::new(Arc::new(Denied)));

        assert!(ctl.request_geolocation().await);

        assert_eq!(ctl.view_state(), ViewState::Error);
        assert_eq!(
            ctl.dashboard().error_message(),
            Some(GeolocationFailure::PermissionDenied.user_message())
        );
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn unsupported_geolocation_never_calls_backend() {
        let backend = Arc::new(FakeBackend::default());
        let mut ctl = controller(backend.clone());

        ctl.request_geolocation().await;

        assert_eq!(
            ctl.dashboard().error_message(),
            Some("Geolocation is not supported on this device.")
        );
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn explicit_coordinates_skip_position_source() {
        let backend = Arc::new(FakeBackend::default());
        let mut ctl = controller(backend.clone());

        let at = Coordinates::new(-33.87, 151.21).unwrap();
        assert!(ctl.search_coordinates(at).await);

        assert_eq!(ctl.view_state(), ViewState::Content);
        assert_eq!(backend.calls(), ["coords:-33.87,151.21"]);
    }

    #[tokio::test]
    async fn geolocation_searches_by_coordinates() {
        let backend = Arc::new(FakeBackend::default());
        let source = FixedPosition(RawPosition {
            latitude: 52.52,
            longitude: 13.405,
        });
        let mut ctl = controller_with(backend.clone(), Geolocator::new(Arc::new(source)));

        ctl.request_geolocation().await;

        assert_eq!(ctl.view_state(), ViewState::Content);
        assert_eq!(backend.calls(), ["coords:52.52,13.405"]);
        assert_eq!(ctl.dashboard().current().unwrap().header, "Berlin, FR");
    }

    #[tokio::test]
    async fn network_location_resolves_city_then_searches() {
        let backend = Arc::new(FakeBackend {
            city: Some("Lisbon".into()),
            ..FakeBackend::default()
        });
        let mut ctl = controller(backend.clone());

        ctl.locate_by_network().await;

        assert_eq!(ctl.view_state(), ViewState::Content);
        assert_eq!(backend.calls(), ["get_location", "name:Lisbon", "history"]);
    }

    #[tokio::test]
    async fn network_location_failure_is_shown() {
        let backend = Arc::new(FakeBackend::default());
        let mut ctl = controller(backend.clone());

        ctl.locate_by_network().await;

        assert_eq!(ctl.view_state(), ViewState::Error);
        assert_eq!(ctl.dashboard().error_message(), Some("Location not found"));
    }

    #[tokio::test]
    async fn transport_failure_shows_generic_message() {
        let backend = Arc::new(FakeBackend {
            fail_with: Some(Failure::Transport("connection refused (os error 111)".into())),
            ..FakeBackend::default()
        });
        let mut ctl = controller(backend.clone());

        ctl.submit_search("Paris").await;

        assert_eq!(ctl.view_state(), ViewState::Error);
        assert_eq!(
            ctl.dashboard().error_message(),
            Some("Network error. Please try again later.")
        );
        assert_eq!(backend.weather_calls(), 1);
    }

    #[tokio::test]
    async fn stale_response_is_discarded() {
        let backend = Arc::new(FakeBackend::default());
        let mut ctl = controller(backend.clone());

        let first = ctl.dispatch(WeatherRequest::ByName(LocationQuery::parse("Paris").unwrap()));
        let second = ctl.dispatch(WeatherRequest::ByName(LocationQuery::parse("Lyon").unwrap()));
        assert!(first.token() < second.token());

        let second_done = second.resolve().await;
        let first_done = first.resolve().await;
        assert!(first_done.token() < second_done.token());

        assert!(ctl.apply(second_done));
        assert!(!ctl.apply(first_done));

        assert_eq!(ctl.store().snapshot().unwrap().location_name(), "Lyon");
        assert_eq!(ctl.dashboard().current().unwrap().header, "Lyon, FR");
    }

    #[tokio::test]
    async fn older_response_does_not_end_newer_loading() {
        let backend = Arc::new(FakeBackend::default());
        let mut ctl = controller(backend.clone());

        let first = ctl.dispatch(WeatherRequest::ByName(LocationQuery::parse("Paris").unwrap()));
        let _second = ctl.dispatch(WeatherRequest::DevicePosition);

        assert!(!ctl.apply(first.resolve().await));
        assert_eq!(ctl.view_state(), ViewState::Loading);
        assert!(ctl.store().snapshot().is_none());
    }

    #[tokio::test]
    async fn unit_toggle_rerenders_without_fetching() {
        let backend = Arc::new(FakeBackend::default());
        let mut ctl = controller(backend.clone());
        ctl.submit_search("Paris").await;
        let calls_before = backend.calls().len();

        ctl.toggle_unit();

        assert_eq!(ctl.view_state(), ViewState::Content);
        assert_eq!(ctl.store().preferences().unit, UnitSystem::Imperial);
        assert_eq!(ctl.dashboard().current().unwrap().temperature, "65°F");
        assert_eq!(ctl.dashboard().forecast()[0].max, "66°F");
        assert_eq!(backend.calls().len(), calls_before);

        ctl.toggle_unit();
        assert_eq!(ctl.dashboard().current().unwrap().temperature, "18°C");
    }

    #[tokio::test]
    async fn theme_toggle_keeps_view() {
        let backend = Arc::new(FakeBackend {
            fail_with: Some(Failure::DataShape("missing field `current`".into())),
            ..FakeBackend::default()
        });
        let mut ctl = controller(backend);
        ctl.submit_search("Paris").await;
        let message = ctl.dashboard().error_message().map(str::to_string);

        ctl.toggle_theme();

        assert_eq!(ctl.view_state(), ViewState::Error);
        assert_eq!(ctl.dashboard().error_message().map(str::to_string), message);
        assert_eq!(ctl.store().storage().get(THEME_KEY).as_deref(), Some("dark"));
    }

    #[tokio::test]
    async fn favorite_toggle_requires_content() {
        let backend = Arc::new(FakeBackend::default());
        let mut ctl = controller(backend);

        assert_eq!(ctl.toggle_favorite(), None);

        ctl.submit_search("Paris").await;
        assert_eq!(ctl.toggle_favorite(), Some(true));
        assert!(ctl.dashboard().favorite_button().active);
        assert_eq!(ctl.dashboard().favorites(), ["Paris"]);

        assert_eq!(ctl.toggle_favorite(), Some(false));
        assert!(!ctl.dashboard().favorite_button().active);
        assert!(ctl.dashboard().favorites().is_empty());
        assert_eq!(ctl.view_state(), ViewState::Content);
    }

    #[tokio::test]
    async fn removing_shown_favorite_updates_button() {
        let backend = Arc::new(FakeBackend::default());
        let mut ctl = controller(backend);
        ctl.submit_search("Paris").await;
        ctl.toggle_favorite();

        assert!(ctl.remove_favorite("Paris"));
        assert!(!ctl.dashboard().favorite_button().active);
        assert!(!ctl.remove_favorite("Paris"));
    }

    #[tokio::test]
    async fn history_is_loaded_on_start() {
        let backend = Arc::new(FakeBackend {
            history: vec![HistoryEntry {
                location: "Oslo".into(),
                timestamp: Some("2026-10-15T09:00:00".into()),
            }],
            ..FakeBackend::default()
        });
        let mut ctl = controller(backend);

        ctl.start().await;

        assert_eq!(ctl.store().history().len(), 1);
        assert_eq!(ctl.dashboard().history(), ["Oslo"]);
        assert_eq!(ctl.view_state(), ViewState::Welcome);
    }

    #[tokio::test]
    async fn selecting_history_entry_searches_by_name() {
        let backend = Arc::new(FakeBackend::default());
        let mut ctl = controller(backend.clone());

        ctl.select_location("Oslo").await;

        assert_eq!(backend.calls()[0], "name:Oslo");
        assert_eq!(ctl.view_state(), ViewState::Content);
    }
}
