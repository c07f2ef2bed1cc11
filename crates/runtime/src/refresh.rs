//! Refresh cycle: clear deselected layers, then load each selected dataset in
//! a fixed order, one at a time, stopping at the first failure.
//!
//! Refreshes may overlap (two clicks in quick succession). Every refresh takes
//! a generation number when it starts and, after each network wait, checks
//! that no newer refresh has begun. A stale refresh applies nothing further.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use foundation::{BoundingBox, DatasetKey, MapView, current_bounding_box};
use layers::{LayerRegistry, VisualPoint, to_visual_point};
use parking_lot::Mutex;
use sources::{DataClient, FeatureCollection, QueryError};
use tracing::{debug, error, info, warn};

use crate::status::{StatusBoard, StatusEvent};

/// Which datasets the user has switched on. Read-only to the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToggleState {
    on: BTreeSet<DatasetKey>,
}

impl ToggleState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: DatasetKey) -> Self {
        self.on.insert(key);
        self
    }

    pub fn set(&mut self, key: DatasetKey, on: bool) {
        if on {
            self.on.insert(key);
        } else {
            self.on.remove(&key);
        }
    }

    pub fn is_on(&self, key: DatasetKey) -> bool {
        self.on.contains(&key)
    }
}

/// Raw text of the seismic inputs; coercion happens in the data client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeismicInputs {
    pub hours: String,
    pub min_magnitude: String,
}

impl SeismicInputs {
    pub fn new(hours: impl Into<String>, min_magnitude: impl Into<String>) -> Self {
        Self {
            hours: hours.into(),
            min_magnitude: min_magnitude.into(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RefreshPolicy {
    /// Refresh when the viewport moves. Off by default: refresh is explicit.
    pub auto_refresh_on_move: bool,
    /// Clear a selected dataset right before its new points go in, so a
    /// reload never duplicates points. Off reproduces accumulation.
    pub replace_on_reload: bool,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            auto_refresh_on_move: false,
            replace_on_reload: true,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RefreshPhase {
    Clearing,
    Loading(DatasetKey),
    Done,
    Failed(DatasetKey),
    /// A newer refresh started while this one was waiting on the network.
    Superseded,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshResult {
    Done { loaded: Vec<(DatasetKey, usize)> },
    Failed { dataset: DatasetKey, error: QueryError },
    Superseded { dataset: DatasetKey },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefreshOutcome {
    pub generation: u64,
    pub bbox: BoundingBox,
    pub phases: Vec<RefreshPhase>,
    pub result: RefreshResult,
}

impl RefreshOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self.result, RefreshResult::Done { .. })
    }
}

/// Drives refresh cycles against a shared layer registry.
///
/// Cloning is cheap and clones share the registry, status line and
/// generation counter, so overlapping refreshes see each other.
#[derive(Clone)]
pub struct RefreshOrchestrator {
    client: Arc<dyn DataClient>,
    registry: Arc<Mutex<LayerRegistry>>,
    status: Arc<Mutex<StatusBoard>>,
    generation: Arc<AtomicU64>,
    policy: RefreshPolicy,
}

impl RefreshOrchestrator {
    pub fn new(client: Arc<dyn DataClient>, registry: Arc<Mutex<LayerRegistry>>) -> Self {
        Self {
            client,
            registry,
            status: Arc::new(Mutex::new(StatusBoard::new())),
            generation: Arc::new(AtomicU64::new(0)),
            policy: RefreshPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RefreshPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> RefreshPolicy {
        self.policy
    }

    pub fn registry(&self) -> Arc<Mutex<LayerRegistry>> {
        Arc::clone(&self.registry)
    }

    pub fn status(&self) -> String {
        self.status.lock().current().to_string()
    }

    pub fn status_history(&self) -> Vec<StatusEvent> {
        self.status.lock().events().cloned().collect()
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn set_status(&self, generation: u64, message: String) {
        debug!(generation, "status: {message}");
        self.status.lock().set(generation, message);
    }

    /// Viewport-change hook; refreshes only when the policy asks for it.
    pub async fn on_viewport_changed<V: MapView + ?Sized>(
        &self,
        view: &V,
        toggles: &ToggleState,
        inputs: &SeismicInputs,
    ) -> Option<RefreshOutcome> {
        if !self.policy.auto_refresh_on_move {
            return None;
        }
        Some(self.refresh(view, toggles, inputs).await)
    }

    pub async fn refresh<V: MapView + ?Sized>(
        &self,
        view: &V,
        toggles: &ToggleState,
        inputs: &SeismicInputs,
    ) -> RefreshOutcome {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let bbox = current_bounding_box(view);
        let mut phases = vec![RefreshPhase::Clearing];
        info!(generation, %bbox, "refresh started");

        // Selected datasets keep their old points until new ones arrive.
        {
            let mut registry = self.registry.lock();
            for key in DatasetKey::ALL.into_iter().filter(|k| !toggles.is_on(*k)) {
                registry.clear(key);
            }
        }

        let mut loaded = Vec::new();
        for key in DatasetKey::ALL.into_iter().filter(|k| toggles.is_on(*k)) {
            if !self.is_current(generation) {
                return self.superseded(generation, bbox, phases, key);
            }
            phases.push(RefreshPhase::Loading(key));
            self.set_status(generation, format!("Loading {key}..."));

            let fetched = self.fetch(key, bbox, inputs).await;
            if !self.is_current(generation) {
                if let Err(error) = &fetched {
                    warn!(
                        generation,
                        dataset = ?key,
                        "discarding error from stale refresh: {error}"
                    );
                }
                return self.superseded(generation, bbox, phases, key);
            }

            let collection = match fetched {
                Ok(c) => c,
                Err(error) => {
                    error!(generation, dataset = ?key, "refresh failed: {error}");
                    phases.push(RefreshPhase::Failed(key));
                    self.set_status(generation, format!("Error: {error}"));
                    return RefreshOutcome {
                        generation,
                        bbox,
                        phases,
                        result: RefreshResult::Failed {
                            dataset: key,
                            error,
                        },
                    };
                }
            };

            let count = self.apply(key, &collection);
            debug!(
                generation,
                dataset = ?key,
                features = collection.len(),
                points = count,
                "dataset loaded"
            );
            self.set_status(generation, format!("Loaded {key}: {count}"));
            loaded.push((key, count));
        }

        phases.push(RefreshPhase::Done);
        self.set_status(generation, "Done.".to_string());
        info!(generation, "refresh finished");
        RefreshOutcome {
            generation,
            bbox,
            phases,
            result: RefreshResult::Done { loaded },
        }
    }

    async fn fetch(
        &self,
        key: DatasetKey,
        bbox: BoundingBox,
        inputs: &SeismicInputs,
    ) -> Result<FeatureCollection, QueryError> {
        match key.brand_id() {
            Some(brand) => self.client.query_brand(brand, bbox).await,
            None => {
                self.client
                    .query_seismic(&inputs.hours, &inputs.min_magnitude, bbox)
                    .await
            }
        }
    }

    /// Maps and inserts one dataset's features; returns the number of points.
    fn apply(&self, key: DatasetKey, collection: &FeatureCollection) -> usize {
        let points: Vec<VisualPoint> = collection
            .features
            .iter()
            .filter_map(|f| to_visual_point(f, key))
            .collect();
        let count = points.len();

        let mut registry = self.registry.lock();
        if self.policy.replace_on_reload {
            registry.clear(key);
        }
        for point in points {
            registry.add_point(key, point);
        }
        registry.ensure_visible(key);
        count
    }

    fn superseded(
        &self,
        generation: u64,
        bbox: BoundingBox,
        mut phases: Vec<RefreshPhase>,
        dataset: DatasetKey,
    ) -> RefreshOutcome {
        debug!(generation, dataset = ?dataset, "refresh superseded, discarding");
        phases.push(RefreshPhase::Superseded);
        RefreshOutcome {
            generation,
            bbox,
            phases,
            result: RefreshResult::Superseded { dataset },
        }
    }
}
