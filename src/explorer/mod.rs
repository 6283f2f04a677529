//! The station explorer: the one object that owns the engine's state.
//!
//! It does no I/O of its own. Every fetch it wants is handed back to the
//! caller as a [`FetchRequest`] carrying a ticket, and the result only lands
//! if the ticket's generation is still the one the explorer is waiting for.
//! Late answers for old bounds or an abandoned global search are dropped.


use crate::config::EngineConfig;
use crate::dataset::fallback::{FetchMode, should_global_search};
use crate::dataset::filter::{SearchQuery, StationFilter, StatusFilter, TypeFilter};
use crate::dataset::{UnionIndex, merge_results};
use crate::density::{CellBoundaryResolver, DensityOverlay, DensityPolygon};
use crate::models::{DensityCell, StationRecord, ViewportBounds};
use crate::reliability::{UptimeTimeline, calculate_uptime, last_known_status};
use crate::selection::{CameraRequest, MapClick, SelectionAction, resolve_click};
use crate::services::{
    DensityService, FetchError, ReliabilityHistoryService, StationQueryParams, StationQueryService,
};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FetchSource {
    Viewport,
    GlobalSearch,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchTicket {
    pub source: FetchSource,
    pub generation: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FetchRequest {
    pub ticket: FetchTicket,
    pub params: StationQueryParams,
}

#[derive(Clone, Debug)]
pub struct FetchCompletion {
    pub ticket: FetchTicket,
    pub result: Result<Vec<StationRecord>, FetchError>,
}

/// Per-source fetch bookkeeping.
struct SourceState<K> {
    // key the explorer currently wants data for
    key: Option<K>,
    // generation of the request that may still land, 0 if none
    generation: u64,
    pending: bool,
    settled_once: bool,
    records: Arc<Vec<StationRecord>>,
    records_key: Option<K>,
    error: Option<FetchError>,
}

impl<K> Default for SourceState<K> {
    fn default() -> Self {
        Self {
            key: None,
            generation: 0,
            pending: false,
            settled_once: false,
            records: Arc::new(Vec::new()),
            records_key: None,
            error: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExplorerView {
    pub mode: FetchMode,
    pub stations: Vec<StationRecord>,
    pub loading: bool,
    pub error: Option<FetchError>,
}

/// Everything the render surface draws.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderFrame {
    pub stations: Vec<StationRecord>,
    pub density_polygons: Vec<DensityPolygon>,
    pub selected_id: Option<String>,
    pub popup_open: bool,
    pub viewport: Option<ViewportBounds>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReliabilityReport {
    pub station_id: String,
    pub timeline: UptimeTimeline,
    pub last_status: Option<String>,
    pub error: Option<FetchError>,
}

pub struct StationExplorer {
    config: EngineConfig,
    filter: StationFilter,
    last_generation: u64,
    viewport: SourceState<ViewportBounds>,
    global: SourceState<SearchQuery>,
    index: UnionIndex,
    mode: FetchMode,
    selected_id: Option<String>,
    popup_open: bool,
    current_zoom: f64,
    camera_request: Option<CameraRequest>,
    density: DensityOverlay,
}

impl StationExplorer {
    pub fn new(config: EngineConfig, resolver: Arc<dyn CellBoundaryResolver>) -> Self {
        Self {
            config,
            filter: StationFilter::default(),
            last_generation: 0,
            viewport: SourceState::default(),
            global: SourceState::default(),
            index: UnionIndex::new(),
            mode: FetchMode::Viewport,
            selected_id: None,
            popup_open: false,
            current_zoom: 0.0,
            camera_request: None,
            density: DensityOverlay::new(resolver),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn filter(&self) -> &StationFilter {
        &self.filter
    }

    pub fn mode(&self) -> FetchMode {
        self.mode
    }

    pub fn index(&self) -> &UnionIndex {
        &self.index
    }

    pub fn committed_bounds(&self) -> Option<ViewportBounds> {
        self.viewport.key
    }

    fn next_generation(&mut self) -> u64 {
        self.last_generation += 1;
        self.last_generation
    }

    // Viewport

    /// Called with each committed (debounced) bounds value.
    pub fn commit_bounds(&mut self, bounds: ViewportBounds) -> Option<FetchRequest> {
        let unchanged = self.viewport.key == Some(bounds)
            && (self.viewport.pending
                || (self.viewport.records_key == Some(bounds) && self.viewport.error.is_none()));
        if unchanged {
            return None;
        }

        let generation = self.next_generation();
        self.viewport.key = Some(bounds);
        self.viewport.generation = generation;
        self.viewport.pending = true;

        tracing::debug!(generation, "viewport fetch issued");

        Some(FetchRequest {
            ticket: FetchTicket {
                source: FetchSource::Viewport,
                generation,
            },
            params: StationQueryParams::Bounds(bounds),
        })
    }

    // Filters

    pub fn set_query(&mut self, raw: &str) -> Option<FetchRequest> {
        self.filter.query = SearchQuery::new(raw);
        self.sync_mode()
    }

    pub fn set_status_filter(&mut self, status: StatusFilter) -> Option<FetchRequest> {
        self.filter.status = status;
        self.sync_mode()
    }

    pub fn set_type_filter(&mut self, station_type: TypeFilter) -> Option<FetchRequest> {
        self.filter.station_type = station_type;
        self.sync_mode()
    }

    fn locally_filtered_len(&self) -> usize {
        self.viewport
            .records
            .iter()
            .filter(|record| self.filter.matches(record))
            .count()
    }

    /// Re-evaluates the fallback rule and returns the global fetch it needs, if any.
    fn sync_mode(&mut self) -> Option<FetchRequest> {
        let global_wanted = should_global_search(&self.filter.query, self.locally_filtered_len());

        if global_wanted {
            if self.mode != FetchMode::GlobalSearch {
                tracing::info!(query = %self.filter.query.as_str(), "no local matches, switching to global search");
                self.mode = FetchMode::GlobalSearch;
            }

            // a failed search is reissued on the next change, a loaded or pending one is not
            let same_query = self.global.key.as_ref() == Some(&self.filter.query);
            let loaded = self.global.records_key == self.global.key && self.global.error.is_none();
            if same_query && (self.global.pending || loaded) {
                return None;
            }

            let generation = self.next_generation();
            self.global.key = Some(self.filter.query.clone());
            self.global.generation = generation;
            self.global.pending = true;
            self.global.error = None;

            tracing::debug!(generation, "global search fetch issued");

            return Some(FetchRequest {
                ticket: FetchTicket {
                    source: FetchSource::GlobalSearch,
                    generation,
                },
                params: StationQueryParams::Text(self.filter.query.as_str().to_string()),
            });
        }

        if self.mode != FetchMode::Viewport {
            tracing::info!("leaving global search");
            self.mode = FetchMode::Viewport;
        }

        if self.global.key.is_some() || self.global.pending {
            // bump so an in-flight global answer can't land
            self.global.generation = self.next_generation();
            self.global.key = None;
            self.global.pending = false;
            self.global.error = None;
        }

        None
    }

    // Fetch completion

    /// Applies a finished fetch if it is still wanted. May return a follow-up
    /// global search request when the new data leaves the viewport empty.
    pub fn complete(&mut self, completion: FetchCompletion) -> Option<FetchRequest> {
        let ticket = completion.ticket;

        let applied = match ticket.source {
            FetchSource::Viewport => apply_completion(&mut self.viewport, ticket, completion.result),
            FetchSource::GlobalSearch => apply_completion(&mut self.global, ticket, completion.result),
        };

        if !applied {
            tracing::debug!(
                source = ?ticket.source,
                generation = ticket.generation,
                "discarding stale fetch response"
            );
            return None;
        }

        self.index = UnionIndex::from_sources(&self.viewport.records, &self.global.records);

        match ticket.source {
            FetchSource::Viewport => self.sync_mode(),
            // global answers don't change the local match count, and a failed
            // search must wait for the next change instead of looping
            FetchSource::GlobalSearch => None,
        }
    }

    // Output

    pub fn view(&self) -> ExplorerView {
        let global_records: &[StationRecord] = if self.global.key.is_some()
            && self.global.records_key == self.global.key
        {
            self.global.records.as_slice()
        } else {
            &[]
        };

        let merged = merge_results(
            &self.viewport.records,
            global_records,
            &self.filter,
            self.config.max_global_results,
        );

        let global_active = merged.mode == FetchMode::GlobalSearch;

        let error = self.viewport.error.clone().or_else(|| {
            if global_active {
                self.global.error.clone()
            } else {
                None
            }
        });

        ExplorerView {
            mode: merged.mode,
            stations: merged.stations,
            loading: !self.viewport.settled_once || (global_active && self.global.pending),
            error,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.view().loading
    }

    pub fn error(&self) -> Option<FetchError> {
        self.view().error
    }

    /// Hides the inline error. Data and fetch state stay as they are.
    pub fn dismiss_error(&mut self) {
        self.viewport.error = None;
        self.global.error = None;
    }

    pub fn render_frame(&mut self) -> RenderFrame {
        let stations = self.view().stations;

        RenderFrame {
            stations,
            density_polygons: self.density.polygons().to_vec(),
            selected_id: self.selected_id.clone(),
            popup_open: self.popup_open,
            viewport: self.viewport.key,
        }
    }

    // Selection

    pub fn set_zoom(&mut self, zoom: f64) {
        self.current_zoom = zoom;
    }

    pub fn handle_click(&mut self, click: &MapClick) -> SelectionAction {
        let action = resolve_click(
            click,
            &self.index,
            self.config.map_context,
            self.current_zoom,
            &self.config.selection,
        );

        match &action {
            SelectionAction::FocusStation { station, camera } => {
                self.selected_id = Some(station.id.clone());
                self.popup_open = true;
                self.camera_request = Some(*camera);
            }
            SelectionAction::ZoomToCluster { camera } => {
                self.camera_request = Some(*camera);
            }
            SelectionAction::Ignored => {}
        }

        action
    }

    /// Camera move the render surface still has to perform.
    pub fn take_camera_request(&mut self) -> Option<CameraRequest> {
        self.camera_request.take()
    }

    pub fn selected_station(&self) -> Option<&StationRecord> {
        self.selected_id.as_deref().and_then(|id| self.index.get(id))
    }

    pub fn popup_open(&self) -> bool {
        self.popup_open
    }

    pub fn close_popup(&mut self) {
        self.popup_open = false;
    }

    pub fn clear_selection(&mut self) {
        self.popup_open = false;
        self.selected_id = None;
    }

    // Density overlay

    /// Returns true when the overlay is on but has no cells loaded yet.
    pub fn set_coverage_enabled(&mut self, enabled: bool) -> bool {
        self.density.set_enabled(enabled);
        enabled && !self.density.has_cells()
    }

    pub fn coverage_enabled(&self) -> bool {
        self.density.is_enabled()
    }

    pub fn set_density_cells(&mut self, cells: Vec<DensityCell>) {
        self.density.set_cells(cells);
    }

    // Async drivers

    /// Runs the given requests concurrently and keeps going until the
    /// completions stop producing follow-up requests.
    pub async fn settle<S: StationQueryService>(&mut self, service: &S, requests: Vec<FetchRequest>) {
        let mut queue = requests;

        while !queue.is_empty() {
            let batch = std::mem::take(&mut queue);
            let completions = join_all(batch.into_iter().map(|request| execute(service, request))).await;

            for completion in completions {
                if let Some(next) = self.complete(completion) {
                    queue.push(next);
                }
            }
        }
    }

    pub async fn load_density<D: DensityService>(&mut self, service: &D) -> Result<(), FetchError> {
        match service.fetch_density(self.config.density_resolution).await {
            Ok(cells) => {
                self.set_density_cells(cells);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "density fetch failed");
                Err(e)
            }
        }
    }

    /// Uptime for the selected station, `None` when nothing is selected.
    pub async fn selected_reliability<R: ReliabilityHistoryService>(
        &self,
        service: &R,
        now: DateTime<Utc>,
    ) -> Option<ReliabilityReport> {
        let station_id = self.selected_id.clone()?;
        Some(station_reliability(service, &station_id, now, &self.config).await)
    }
}

fn apply_completion<K: PartialEq + Clone>(
    state: &mut SourceState<K>,
    ticket: FetchTicket,
    result: Result<Vec<StationRecord>, FetchError>,
) -> bool {
    if !state.pending || state.generation != ticket.generation {
        return false;
    }

    state.pending = false;
    state.settled_once = true;

    match result {
        Ok(records) => {
            tracing::debug!(
                source = ?ticket.source,
                generation = ticket.generation,
                count = records.len(),
                "fetch settled"
            );
            state.records = Arc::new(records);
            state.records_key = state.key.clone();
            state.error = None;
        }
        Err(e) => {
            // previous records stay on screen
            tracing::warn!(source = ?ticket.source, error = %e, "station fetch failed");
            state.error = Some(e);
        }
    }

    true
}

pub async fn execute<S: StationQueryService>(service: &S, request: FetchRequest) -> FetchCompletion {
    let result = service.fetch_stations(request.params).await;

    FetchCompletion {
        ticket: request.ticket,
        result,
    }
}

/// Fetches and bins a station's history. A failed fetch is reported and the
/// timeline falls back to the empty log.
pub async fn station_reliability<R: ReliabilityHistoryService>(
    service: &R,
    station_id: &str,
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> ReliabilityReport {
    let (events, error) = match service.fetch_reliability_history(station_id).await {
        Ok(events) => (events, None),
        Err(e) => {
            tracing::warn!(station_id = %station_id, error = %e, "reliability history fetch failed");
            (Vec::new(), Some(e))
        }
    };

    ReliabilityReport {
        station_id: station_id.to_string(),
        timeline: calculate_uptime(&events, now, &config.reliability),
        last_status: last_known_status(&events, now),
        error,
    }
}
