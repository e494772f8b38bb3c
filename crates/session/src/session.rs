//! Pin placement session.
//!
//! Owns the selection state machine, the loaded terrain and the last pin list
//! fetched from the store. All mutable state sits behind one lock that is
//! never held across an await; async work (terrain queries, store calls)
//! re-checks its generation or ticket before publishing a result.

use std::future::Future;
use std::sync::Arc;

use foundation::bounds::ModelBounds;
use foundation::math::{GeoPoint, GeoProjector, PlanePoint, ProjectionError, Vec3};
use parking_lot::Mutex;
use pins::{NewPin, Pin, PinId, PinStore, PinStoreError};
use terrain::{MeshProvider, Resolution, TerrainResolver};
use tracing::{debug, info, warn};

use crate::config::{MissPolicy, SessionConfig};
use crate::error::SessionError;
use crate::notice::{Notice, NoticeBus};
use crate::selection::{
    Candidate, CandidateOrigin, ClickOutcome, Generation, MeshStatus, Selection,
};

#[derive(Debug)]
struct Terrain {
    resolver: TerrainResolver,
    /// A bad reference frame only disables 2D placement.
    projector: Result<GeoProjector, ProjectionError>,
}

#[derive(Debug)]
struct State {
    mesh_status: MeshStatus,
    terrain: Option<Arc<Terrain>>,
    load_epoch: u64,
    last_generation: u64,
    selection: Selection,
    pins: Vec<Pin>,
    reload_issued: u64,
    reload_applied: u64,
    notices: NoticeBus,
}

impl State {
    fn new() -> Self {
        Self {
            mesh_status: MeshStatus::NotLoaded,
            terrain: None,
            load_epoch: 0,
            last_generation: 0,
            selection: Selection::Idle,
            pins: Vec::new(),
            reload_issued: 0,
            reload_applied: 0,
            notices: NoticeBus::new(),
        }
    }

    fn next_generation(&mut self) -> Generation {
        self.last_generation += 1;
        Generation(self.last_generation)
    }

    fn loaded_terrain(&mut self) -> Result<Arc<Terrain>, SessionError> {
        match &self.terrain {
            Some(t) => Ok(Arc::clone(t)),
            None => {
                self.notices
                    .warning("click.rejected", "The 3D model is still loading");
                Err(SessionError::NotLoaded)
            }
        }
    }
}

struct Shared {
    config: SessionConfig,
    store: Arc<dyn PinStore>,
    state: Mutex<State>,
}

/// A 2D click whose terrain query is in flight.
pub(crate) struct MapClick {
    generation: Generation,
    geo: GeoPoint,
    plane: PlanePoint,
    terrain: Arc<Terrain>,
}

impl MapClick {
    pub(crate) async fn resolve(&self) -> Result<Resolution, SessionError> {
        let terrain = Arc::clone(&self.terrain);
        let plane = self.plane;
        tokio::task::spawn_blocking(move || terrain.resolver.resolve_plane(plane))
            .await
            .map_err(|e| SessionError::Resolve(e.to_string()))
    }
}

/// Cheap, clonable handle to one operator session.
#[derive(Clone)]
pub struct Session {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.shared.config)
            .field("state", &*self.shared.state.lock())
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(config: SessionConfig, store: Arc<dyn PinStore>) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                store,
                state: Mutex::new(State::new()),
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    pub fn selection(&self) -> Selection {
        self.shared.state.lock().selection.clone()
    }

    pub fn pins(&self) -> Vec<Pin> {
        self.shared.state.lock().pins.clone()
    }

    pub fn mesh_status(&self) -> MeshStatus {
        self.shared.state.lock().mesh_status.clone()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.shared.state.lock().notices.notices().to_vec()
    }

    pub fn drain_notices(&self) -> Vec<Notice> {
        self.shared.state.lock().notices.drain()
    }

    /// Loads the terrain mesh. Clicks are rejected until this succeeds.
    ///
    /// Any open selection is dropped since it refers to the previous mesh.
    /// When loads overlap, only the most recent one is applied.
    pub async fn load_mesh(&self, provider: &dyn MeshProvider) -> Result<ModelBounds, SessionError> {
        let source = provider.describe();
        let epoch = {
            let mut st = self.shared.state.lock();
            st.load_epoch += 1;
            st.mesh_status = MeshStatus::Loading;
            st.terrain = None;
            if !st.selection.is_idle() {
                st.next_generation();
                st.selection = Selection::Idle;
            }
            st.load_epoch
        };
        info!(%source, "loading terrain mesh");

        let deadline = self.shared.config.mesh_load_timeout;
        let loaded = match tokio::time::timeout(deadline, provider.load()).await {
            Ok(Ok(mesh)) => Ok(mesh),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!("timed out after {deadline:?}")),
        };

        let mut st = self.shared.state.lock();
        if st.load_epoch != epoch {
            debug!(%source, "discarding superseded mesh load");
            return Err(SessionError::Superseded);
        }
        match loaded {
            Ok(mesh) => {
                let triangles = mesh.triangle_count();
                let resolver =
                    TerrainResolver::new(Arc::new(mesh)).with_margin(self.shared.config.ray_margin);
                let bounds = *resolver.bounds();
                let projector = GeoProjector::new(self.shared.config.reference_frame, bounds);
                if let Err(e) = &projector {
                    st.notices.error(
                        "terrain.frame",
                        format!("Map coordinates cannot be placed on this model: {e}"),
                    );
                }
                st.terrain = Some(Arc::new(Terrain {
                    resolver,
                    projector,
                }));
                st.mesh_status = MeshStatus::Loaded {
                    source: source.clone(),
                    bounds,
                    triangles,
                };
                st.notices
                    .info("terrain.load", format!("3D model loaded from {source}"));
                Ok(bounds)
            }
            Err(msg) => {
                st.mesh_status = MeshStatus::Failed(msg.clone());
                st.notices
                    .error("terrain.load", format!("Failed to load the 3D model: {msg}"));
                Err(SessionError::MeshLoad(msg))
            }
        }
    }

    /// Selects a point picked on the rendered terrain. Replaces any previous
    /// candidate, including one being saved.
    pub fn handle_direct_3d_click(&self, point: Vec3) -> Result<ClickOutcome, SessionError> {
        let mut st = self.shared.state.lock();
        st.loaded_terrain()?;
        if !point.is_finite() {
            st.notices
                .error("click.invalid", "The picked point has no valid coordinates");
            return Err(SessionError::InvalidPoint(point));
        }
        let generation = st.next_generation();
        debug!(%generation, x = point.x, y = point.y, z = point.z, "terrain click");
        st.selection = Selection::Selecting(Candidate::new(
            generation,
            point,
            CandidateOrigin::Direct,
        ));
        Ok(ClickOutcome::Resolved(point))
    }

    /// Selects the terrain point under a 2D map coordinate.
    ///
    /// Returns [`SessionError::Superseded`] when another click or a cancel
    /// happened while the terrain was being queried.
    pub async fn handle_2d_click(&self, geo: GeoPoint) -> Result<ClickOutcome, SessionError> {
        let click = self.begin_map_click(geo)?;
        let resolved = click.resolve().await;
        self.finish_map_click(&click, resolved)
    }

    pub(crate) fn begin_map_click(&self, geo: GeoPoint) -> Result<MapClick, SessionError> {
        let mut st = self.shared.state.lock();
        let terrain = st.loaded_terrain()?;
        let plane = match terrain.projector.and_then(|p| p.project(geo)) {
            Ok(plane) => plane,
            Err(e) => {
                st.notices
                    .error("click.projection", format!("Cannot place this location: {e}"));
                return Err(e.into());
            }
        };
        let generation = st.next_generation();
        debug!(%generation, lat = geo.lat, lng = geo.lng, x = plane.x, z = plane.z, "map click");
        st.selection = Selection::Resolving { generation, geo };
        Ok(MapClick {
            generation,
            geo,
            plane,
            terrain,
        })
    }

    pub(crate) fn finish_map_click(
        &self,
        click: &MapClick,
        resolved: Result<Resolution, SessionError>,
    ) -> Result<ClickOutcome, SessionError> {
        let mut st = self.shared.state.lock();
        let current = matches!(
            st.selection,
            Selection::Resolving { generation, .. } if generation == click.generation
        );
        if !current {
            debug!(generation = %click.generation, "discarding superseded terrain query");
            return Err(SessionError::Superseded);
        }

        let resolution = match resolved {
            Ok(r) => r,
            Err(e) => {
                st.selection = Selection::Idle;
                st.notices.error("click.resolve", e.to_string());
                return Err(e);
            }
        };
        let geo = click.geo;
        match resolution {
            Resolution::Hit(hit) => {
                st.selection = Selection::Selecting(Candidate::new(
                    click.generation,
                    hit.point,
                    CandidateOrigin::Map {
                        geo,
                        on_terrain: true,
                    },
                ));
                Ok(ClickOutcome::Resolved(hit.point))
            }
            Resolution::NoIntersection { .. } => match self.shared.config.miss_policy {
                MissPolicy::FlatFallback => {
                    let point = resolution.or_flat(0.0);
                    st.selection = Selection::Selecting(Candidate::new(
                        click.generation,
                        point,
                        CandidateOrigin::Map {
                            geo,
                            on_terrain: false,
                        },
                    ));
                    st.notices.warning(
                        "click.outside",
                        "Location is outside the 3D model area; placed at ground level",
                    );
                    Ok(ClickOutcome::OutOfBounds {
                        fallback: Some(point),
                    })
                }
                MissPolicy::Reject => {
                    st.selection = Selection::Idle;
                    st.notices
                        .warning("click.outside", "Location is outside the 3D model area");
                    Ok(ClickOutcome::OutOfBounds { fallback: None })
                }
            },
        }
    }

    /// Stores the label being typed for the current candidate.
    pub fn set_draft_label(&self, label: impl Into<String>) -> Result<(), SessionError> {
        let mut st = self.shared.state.lock();
        match &mut st.selection {
            Selection::Selecting(c) => {
                c.label = label.into();
                Ok(())
            }
            Selection::Persisting(_) => Err(SessionError::Busy),
            Selection::Idle | Selection::Resolving { .. } => Err(SessionError::NoSelection),
        }
    }

    /// Drops the current candidate or pending click. Returns whether anything
    /// was open.
    pub fn cancel_selection(&self) -> bool {
        let mut st = self.shared.state.lock();
        if st.selection.is_idle() {
            return false;
        }
        let generation = st.next_generation();
        debug!(%generation, "selection cancelled");
        st.selection = Selection::Idle;
        true
    }

    /// Saves the current candidate as a pin labelled `label` (trimmed).
    ///
    /// On failure the candidate stays selected with the label as typed so the
    /// operator can retry. A newer click during the save keeps the newer
    /// candidate; the saved pin still shows up in the list.
    pub async fn confirm_selection(&self, label: &str) -> Result<Pin, SessionError> {
        let (generation, new_pin) = {
            let mut st = self.shared.state.lock();
            let mut candidate = match std::mem::take(&mut st.selection) {
                Selection::Selecting(c) => c,
                other => {
                    let err = match other {
                        Selection::Persisting(_) => SessionError::Busy,
                        _ => SessionError::NoSelection,
                    };
                    st.selection = other;
                    return Err(err);
                }
            };
            candidate.label = label.to_string();
            let trimmed = candidate.label.trim().to_string();
            if trimmed.is_empty() {
                st.selection = Selection::Selecting(candidate);
                st.notices
                    .warning("pin.label", "Please enter a label for the pin");
                return Err(SessionError::EmptyLabel);
            }
            let new_pin = NewPin::new(trimmed, candidate.point);
            let generation = candidate.generation;
            st.selection = Selection::Persisting(candidate);
            (generation, new_pin)
        };
        info!(%generation, label = %new_pin.label, "saving pin");

        let result = self.store_call(self.shared.store.create(new_pin)).await;

        let outcome = {
            let mut st = self.shared.state.lock();
            let current = matches!(
                &st.selection,
                Selection::Persisting(c) if c.generation == generation
            );
            match result {
                Ok(pin) => {
                    if current {
                        st.selection = Selection::Idle;
                    }
                    st.notices
                        .info("pin.create", format!("Pin \"{}\" saved", pin.label));
                    Ok(pin)
                }
                Err(e) => {
                    if current {
                        if let Selection::Persisting(c) = std::mem::take(&mut st.selection) {
                            st.selection = Selection::Selecting(c);
                        }
                    }
                    st.notices
                        .error("pin.create", format!("Failed to save pin: {e}"));
                    Err(SessionError::Persistence(e))
                }
            }
        };

        if outcome.is_ok() {
            // Failures are already reported as notices.
            let _ = self.reload_pins().await;
        }
        outcome
    }

    /// Deletes a pin. Confirmation is the caller's job.
    pub async fn delete_pin(&self, id: &PinId) -> Result<(), SessionError> {
        info!(%id, "deleting pin");
        let result = self.store_call(self.shared.store.delete(id)).await;
        {
            let mut st = self.shared.state.lock();
            match &result {
                Ok(()) => st.notices.info("pin.delete", format!("Pin {id} deleted")),
                Err(e) => st
                    .notices
                    .error("pin.delete", format!("Failed to delete pin: {e}")),
            }
        }
        result.map_err(SessionError::Persistence)?;
        let _ = self.reload_pins().await;
        Ok(())
    }

    /// Refetches the pin list. Returns `Ok(false)` when a reload issued later
    /// already published its result.
    pub async fn reload_pins(&self) -> Result<bool, SessionError> {
        let ticket = {
            let mut st = self.shared.state.lock();
            st.reload_issued += 1;
            st.reload_issued
        };

        let result = self.store_call(self.shared.store.list()).await;

        let mut st = self.shared.state.lock();
        match result {
            Ok(pins) => {
                if ticket <= st.reload_applied {
                    debug!(ticket, applied = st.reload_applied, "discarding stale pin list");
                    return Ok(false);
                }
                debug!(ticket, count = pins.len(), "pin list updated");
                st.reload_applied = ticket;
                st.pins = pins;
                Ok(true)
            }
            Err(e) => {
                if ticket <= st.reload_applied {
                    debug!(ticket, applied = st.reload_applied, "stale pin list reload failed: {e}");
                } else {
                    st.notices
                        .error("pin.list", format!("Failed to load pins: {e}"));
                }
                Err(SessionError::Persistence(e))
            }
        }
    }

    async fn store_call<T, F>(&self, call: F) -> Result<T, PinStoreError>
    where
        F: Future<Output = Result<T, PinStoreError>>,
    {
        let deadline = self.shared.config.store_timeout;
        match tokio::time::timeout(deadline, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(?deadline, "pin store call timed out");
                Err(PinStoreError::Timeout)
            }
        }
    }
}
