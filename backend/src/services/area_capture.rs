//! Area capture engine
//!
//! Interactive multi-polygon capture over the map. Each closed polygon gets
//! its own edit channel and listener task; vertex edits are debounced per
//! polygon before the area is recomputed. The aggregate [`ServiceArea`] is
//! published on a watch channel only when its shape actually changes.
//!
//! The polygon being drawn already has an id and is reported as
//! [`PolygonState::Drawing`]; completing it closes the ring under that id.

use shared::{Coordinate, Polygon, PolygonState, ServiceArea};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::AreaConfig;
use crate::error::{AppError, AppResult};

/// Polygon under construction
struct Draft {
    id: Uuid,
    vertices: Vec<Coordinate>,
}

impl Draft {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            vertices: Vec::new(),
        }
    }
}

#[derive(Default)]
struct CaptureState {
    drawing: bool,
    draft: Option<Draft>,
    /// Insertion order; the last entry is the newest polygon
    polygons: Vec<Polygon>,
}

impl CaptureState {
    fn polygon_mut(&mut self, id: Uuid) -> AppResult<&mut Polygon> {
        self.polygons
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| AppError::InvalidStateTransition(format!("unknown polygon {}", id)))
    }
}

struct Listener {
    edits: mpsc::UnboundedSender<Vec<Coordinate>>,
    task: JoinHandle<()>,
}

type SharedState = Arc<Mutex<CaptureState>>;

fn lock(state: &SharedState) -> MutexGuard<'_, CaptureState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

/// Publish the aggregate when (total area, vertex set) differs from the last one
fn publish(state: &CaptureState, aggregate: &watch::Sender<ServiceArea>) -> bool {
    let next = ServiceArea::from_polygons(state.polygons.clone());
    aggregate.send_if_modified(|current| {
        if current.shape_differs(&next) {
            *current = next;
            true
        } else {
            false
        }
    })
}

/// Capture session for one service area. Must be used inside a Tokio runtime.
pub struct AreaCaptureEngine {
    anchor: Coordinate,
    debounce: Duration,
    state: SharedState,
    aggregate: Arc<watch::Sender<ServiceArea>>,
    listeners: HashMap<Uuid, Listener>,
}

impl AreaCaptureEngine {
    /// Start a session anchored at a resolved location
    pub fn new(anchor: Option<Coordinate>, debounce: Duration) -> AppResult<Self> {
        let anchor = anchor.ok_or(AppError::NoAnchor)?;
        if !anchor.is_valid() {
            return Err(AppError::NoAnchor);
        }

        let (aggregate, _) = watch::channel(ServiceArea::default());
        tracing::debug!(%anchor, "Area capture session started");

        Ok(Self {
            anchor,
            debounce,
            state: Arc::new(Mutex::new(CaptureState::default())),
            aggregate: Arc::new(aggregate),
            listeners: HashMap::new(),
        })
    }

    /// Start a session with the configured edit debounce
    pub fn from_config(anchor: Option<Coordinate>, config: &AreaConfig) -> AppResult<Self> {
        Self::new(anchor, config.debounce())
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn anchor(&self) -> Coordinate {
        self.anchor
    }

    // ========================================================================
    // Drawing
    // ========================================================================

    /// Enter draw mode. Calling it again while drawing keeps the current draft.
    pub fn start_drawing(&self) {
        let mut state = lock(&self.state);
        state.drawing = true;
        state.draft.get_or_insert_with(Draft::new);
    }

    /// Leave draw mode, discarding an unfinished draft
    pub fn stop_drawing(&self) {
        let mut state = lock(&self.state);
        state.drawing = false;
        state.draft = None;
    }

    pub fn is_drawing(&self) -> bool {
        lock(&self.state).drawing
    }

    /// Vertices clicked so far for the polygon being drawn
    pub fn draft(&self) -> Vec<Coordinate> {
        lock(&self.state)
            .draft
            .as_ref()
            .map(|draft| draft.vertices.clone())
            .unwrap_or_default()
    }

    /// Id the polygon being drawn will keep once it is closed
    pub fn draft_id(&self) -> Option<Uuid> {
        lock(&self.state).draft.as_ref().map(|draft| draft.id)
    }

    /// Append a vertex to the draft
    pub fn add_vertex(&self, vertex: Coordinate) -> AppResult<()> {
        let mut state = lock(&self.state);
        if !state.drawing {
            return Err(AppError::InvalidStateTransition(
                "vertices can only be added in draw mode".to_string(),
            ));
        }
        if !vertex.is_valid() {
            return Err(AppError::validation(
                "vertex",
                "Vertex is not a valid coordinate",
                "Der Punkt ist keine gültige Koordinate",
            ));
        }
        state.draft.get_or_insert_with(Draft::new).vertices.push(vertex);
        Ok(())
    }

    /// Register the ring closed by the map's completion gesture.
    /// Draw mode stays on so the next polygon can follow.
    pub fn on_polygon_complete(&mut self, vertices: &[Coordinate]) -> AppResult<Uuid> {
        let polygon = {
            let mut state = lock(&self.state);
            if !state.drawing {
                return Err(AppError::InvalidStateTransition(
                    "no polygon is being drawn".to_string(),
                ));
            }

            let id = state.draft.as_ref().map_or_else(Uuid::new_v4, |draft| draft.id);
            let polygon = Polygon::with_id(id, vertices).map_err(|e| {
                AppError::validation(
                    "vertices",
                    &e.to_string(),
                    "Eine Fläche braucht mindestens 3 verschiedene gültige Punkte",
                )
            })?;

            state.draft = Some(Draft::new());
            state.polygons.push(polygon.clone());
            publish(&state, &self.aggregate);
            polygon
        };

        let listener = self.spawn_listener(polygon.id);
        self.listeners.insert(polygon.id, listener);

        tracing::info!(
            polygon = %polygon.id,
            area_m2 = polygon.area_m2(),
            "Polygon added"
        );
        Ok(polygon.id)
    }

    // ========================================================================
    // Editing
    // ========================================================================

    /// A closed polygon starts being dragged
    pub fn on_drag_start(&self, id: Uuid) -> AppResult<()> {
        let mut state = lock(&self.state);
        let polygon = state.polygon_mut(id)?;
        match polygon.state {
            PolygonState::Closed => {
                polygon.state = PolygonState::Editing;
                Ok(())
            }
            other => Err(AppError::InvalidStateTransition(format!(
                "cannot drag polygon in state {:?}",
                other
            ))),
        }
    }

    /// The ring of a polygon changed. Recomputation happens once edits settle.
    pub fn on_vertex_changed(&self, id: Uuid, vertices: Vec<Coordinate>) -> AppResult<()> {
        let listener = self
            .listeners
            .get(&id)
            .ok_or_else(|| AppError::InvalidStateTransition(format!("unknown polygon {}", id)))?;

        listener
            .edits
            .send(vertices)
            .map_err(|_| AppError::Internal(format!("edit listener for {} stopped", id)))
    }

    /// Dragging ended
    pub fn on_drag_end(&self, id: Uuid) -> AppResult<()> {
        let mut state = lock(&self.state);
        let polygon = state.polygon_mut(id)?;
        match polygon.state {
            PolygonState::Editing => {
                polygon.state = PolygonState::Closed;
                Ok(())
            }
            other => Err(AppError::InvalidStateTransition(format!(
                "polygon is not being dragged ({:?})",
                other
            ))),
        }
    }

    /// Remove the most recently added polygon
    pub fn remove_last(&mut self) -> Option<Polygon> {
        let mut polygon = {
            let mut state = lock(&self.state);
            let polygon = state.polygons.pop()?;
            publish(&state, &self.aggregate);
            polygon
        };

        if let Some(listener) = self.listeners.remove(&polygon.id) {
            listener.task.abort();
        }

        polygon.state = PolygonState::Removed;
        tracing::info!(polygon = %polygon.id, "Polygon removed");
        Some(polygon)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Current aggregate, including edits that have already settled
    pub fn service_area(&self) -> ServiceArea {
        ServiceArea::from_polygons(lock(&self.state).polygons.clone())
    }

    pub fn polygon(&self, id: Uuid) -> Option<Polygon> {
        lock(&self.state).polygons.iter().find(|p| p.id == id).cloned()
    }

    /// Lifecycle state of the draft or of a captured polygon
    pub fn state_of(&self, id: Uuid) -> Option<PolygonState> {
        let state = lock(&self.state);
        if state.draft.as_ref().is_some_and(|draft| draft.id == id) {
            return Some(PolygonState::Drawing);
        }
        state.polygons.iter().find(|p| p.id == id).map(|p| p.state)
    }

    pub fn polygon_count(&self) -> usize {
        lock(&self.state).polygons.len()
    }

    /// Aggregate updates, only sent when the shape changed
    pub fn subscribe(&self) -> watch::Receiver<ServiceArea> {
        self.aggregate.subscribe()
    }

    /// End the session and hand over the captured area
    pub fn finish(mut self) -> ServiceArea {
        self.stop_listeners();
        self.service_area()
    }

    fn stop_listeners(&mut self) {
        for (_, listener) in self.listeners.drain() {
            listener.task.abort();
        }
    }

    fn spawn_listener(&self, id: Uuid) -> Listener {
        let (edits, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(listen(
            id,
            rx,
            self.debounce,
            Arc::clone(&self.state),
            Arc::clone(&self.aggregate),
        ));
        Listener { edits, task }
    }
}

impl Drop for AreaCaptureEngine {
    fn drop(&mut self) {
        self.stop_listeners();
    }
}

/// Trailing-edge debounce: every edit restarts the quiet period, and only the
/// last ring received is applied.
async fn listen(
    id: Uuid,
    mut edits: mpsc::UnboundedReceiver<Vec<Coordinate>>,
    debounce: Duration,
    state: SharedState,
    aggregate: Arc<watch::Sender<ServiceArea>>,
) {
    let mut pending: Option<Vec<Coordinate>> = None;

    loop {
        tokio::select! {
            edit = edits.recv() => match edit {
                Some(vertices) => pending = Some(vertices),
                None => break,
            },
            _ = tokio::time::sleep(debounce), if pending.is_some() => {
                if let Some(vertices) = pending.take() {
                    apply_edit(id, &vertices, &state, &aggregate);
                }
            }
        }
    }
}

fn apply_edit(
    id: Uuid,
    vertices: &[Coordinate],
    state: &SharedState,
    aggregate: &watch::Sender<ServiceArea>,
) {
    let mut state = lock(state);
    let Some(polygon) = state.polygons.iter_mut().find(|p| p.id == id) else {
        return;
    };

    match polygon.set_vertices(vertices) {
        Ok(()) => {
            tracing::debug!(polygon = %id, area_m2 = polygon.area_m2(), "Polygon re-measured");
            publish(&state, aggregate);
        }
        Err(e) => {
            tracing::warn!(polygon = %id, "Ignoring invalid polygon edit: {}", e);
        }
    }
}
