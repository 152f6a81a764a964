use crate::config::{ControlPosition, MapOptions};
use crate::model::{LngLat, MarkerSpec, PlacedMarker};
use crate::prelude::{MapSurface, MarkerId, SurfaceError, SurfaceFactory, SurfaceResult};
use crate::telemetry::log::LogManager;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

pub const STYLE_PREFIX: &str = "mapbox://styles/";
pub const MIN_ZOOM: f64 = 0.0;
pub const MAX_ZOOM: f64 = 8.0;

/// Camera and chrome of an activated map.
#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    pub style: String,
    pub center: LngLat,
    pub zoom: f64,
    pub navigation_control: Option<ControlPosition>,
}

impl MapView {
    pub fn from_options(options: &MapOptions) -> Self {
        Self {
            style: options.style.clone(),
            center: options.center,
            zoom: options.zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            navigation_control: options.navigation_control,
        }
    }

    pub fn zoom_by(&mut self, delta: f64) {
        self.zoom = (self.zoom + delta).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Moves the center by a number of degrees, wrapping longitude.
    pub fn pan_by(&mut self, d_lng: f64, d_lat: f64) {
        let lng = (self.center.lng + d_lng + 180.0).rem_euclid(360.0) - 180.0;
        let lat = (self.center.lat + d_lat).clamp(-85.0, 85.0);
        self.center = LngLat::new(lng, lat);
    }

    /// Style name after the owner, e.g. `light-v10`.
    pub fn style_name(&self) -> &str {
        self.style.rsplit('/').next().unwrap_or(&self.style)
    }
}

/// In-memory map state: the active view and the markers attached to it.
#[derive(Debug, Default)]
pub struct MarkerBoard {
    next_id: u64,
    view: Option<MapView>,
    markers: BTreeMap<MarkerId, PlacedMarker>,
}

impl MarkerBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> Option<&MapView> {
        self.view.as_ref()
    }

    pub fn view_mut(&mut self) -> Option<&mut MapView> {
        self.view.as_mut()
    }

    pub fn activate(&mut self, view: MapView) {
        self.view = Some(view);
        self.markers.clear();
    }

    pub fn deactivate(&mut self) {
        self.view = None;
        self.markers.clear();
    }

    /// Attaches a marker. Ids are never reused on a board.
    pub fn place(&mut self, spec: MarkerSpec, now: Instant) -> MarkerId {
        self.next_id += 1;
        let id = MarkerId(self.next_id);
        self.markers.insert(
            id,
            PlacedMarker {
                id,
                spec,
                placed_at: now,
            },
        );
        id
    }

    pub fn remove(&mut self, id: MarkerId) -> Option<PlacedMarker> {
        self.markers.remove(&id)
    }

    pub fn markers(&self) -> impl Iterator<Item = &PlacedMarker> {
        self.markers.values()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

/// Board shared between a surface and whatever draws it.
#[derive(Debug, Clone, Default)]
pub struct SharedBoard(Arc<Mutex<MarkerBoard>>);

impl SharedBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self) -> MutexGuard<'_, MarkerBoard> {
        // A poisoned board still holds usable marker state.
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn view(&self) -> Option<MapView> {
        self.lock().view().cloned()
    }

    pub fn snapshot(&self) -> Vec<PlacedMarker> {
        self.lock().markers().cloned().collect()
    }
}

/// [`MapSurface`] backed by a [`SharedBoard`].
pub struct BoardSurface {
    board: SharedBoard,
    logger: LogManager,
}

impl MapSurface for BoardSurface {
    fn add_marker(&self, marker: MarkerSpec) -> MarkerId {
        let coordinate = marker.coordinate;
        let class = marker.severity.css_class();
        let id = self.board.lock().place(marker, Instant::now());
        self.logger.debug(&format!(
            "marker {} ({}) at [{:.1}, {:.1}]",
            id.0, class, coordinate.lng, coordinate.lat
        ));
        id
    }

    fn remove_marker(&self, id: MarkerId) {
        if self.board.lock().remove(id).is_some() {
            self.logger.debug(&format!("marker {} removed", id.0));
        }
    }

    fn teardown(&self) {
        self.board.lock().deactivate();
    }
}

/// Creates [`BoardSurface`]s after checking the credential and style.
pub struct BoardSurfaceFactory {
    board: SharedBoard,
    styles: Vec<String>,
}

impl BoardSurfaceFactory {
    pub fn new(board: SharedBoard) -> Self {
        Self {
            board,
            styles: ["light-v10", "dark-v10", "streets-v11", "outdoors-v11"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    pub fn board(&self) -> &SharedBoard {
        &self.board
    }

    fn check_credential(token: &str) -> SurfaceResult<()> {
        if token.trim().is_empty() {
            return Err(SurfaceError::InvalidCredential("token is empty".into()));
        }
        if token.chars().any(char::is_whitespace) {
            return Err(SurfaceError::InvalidCredential(
                "token contains whitespace".into(),
            ));
        }
        Ok(())
    }

    fn check_style(&self, style: &str) -> SurfaceResult<()> {
        let known = style
            .strip_prefix(STYLE_PREFIX)
            .and_then(|path| path.rsplit('/').next())
            .map(|name| self.styles.iter().any(|s| s == name))
            .unwrap_or(false);
        if known {
            Ok(())
        } else {
            Err(SurfaceError::UnknownStyle(style.to_string()))
        }
    }
}

impl SurfaceFactory for BoardSurfaceFactory {
    fn create(
        &self,
        access_token: &str,
        options: &MapOptions,
    ) -> SurfaceResult<Arc<dyn MapSurface>> {
        Self::check_credential(access_token)?;
        self.check_style(&options.style)?;

        self.board.lock().activate(MapView::from_options(options));
        Ok(Arc::new(BoardSurface {
            board: self.board.clone(),
            logger: LogManager::new("surface"),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Severity;

    fn spec(severity: Severity) -> MarkerSpec {
        MarkerSpec {
            coordinate: LngLat::new(20.1, 10.1),
            severity,
            mean_duration: 1.0,
        }
    }

    #[test]
    fn factory_activates_board_with_options() {
        let factory = BoardSurfaceFactory::new(SharedBoard::new());
        factory.create("pk.token", &MapOptions::default()).unwrap();
        let view = factory.board().view().unwrap();
        assert_eq!(view.style_name(), "light-v10");
        assert_eq!(view.navigation_control, Some(ControlPosition::TopLeft));
    }

    #[test]
    fn factory_rejects_bad_credentials_and_styles() {
        let factory = BoardSurfaceFactory::new(SharedBoard::new());
        assert!(matches!(
            factory.create("pk. token", &MapOptions::default()),
            Err(SurfaceError::InvalidCredential(_))
        ));
        let options = MapOptions {
            style: "mapbox://styles/mapbox/neon-v1".into(),
            ..MapOptions::default()
        };
        assert!(matches!(
            factory.create("pk.token", &options),
            Err(SurfaceError::UnknownStyle(_))
        ));
        assert!(factory.board().view().is_none());
    }

    #[test]
    fn surface_places_and_removes_markers() {
        let factory = BoardSurfaceFactory::new(SharedBoard::new());
        let surface = factory.create("pk.token", &MapOptions::default()).unwrap();
        let first = surface.add_marker(spec(Severity::Red));
        let second = surface.add_marker(spec(Severity::Green));
        assert_ne!(first, second);
        assert_eq!(factory.board().lock().len(), 2);

        surface.remove_marker(first);
        let remaining = factory.board().snapshot();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].spec.severity, Severity::Green);
    }

    #[test]
    fn teardown_clears_view_and_markers() {
        let factory = BoardSurfaceFactory::new(SharedBoard::new());
        let surface = factory.create("pk.token", &MapOptions::default()).unwrap();
        surface.add_marker(spec(Severity::Yellow));
        surface.teardown();
        assert!(factory.board().view().is_none());
        assert!(factory.board().lock().is_empty());
    }

    #[test]
    fn view_navigation_wraps_and_clamps() {
        let mut view = MapView::from_options(&MapOptions::default());
        view.zoom_by(-3.0);
        assert_eq!(view.zoom, MIN_ZOOM);
        view.zoom_by(100.0);
        assert_eq!(view.zoom, MAX_ZOOM);
        view.pan_by(150.0, 30.0);
        assert!((view.center.lng - (-168.7716)).abs() < 1e-9);
        assert_eq!(view.center.lat, 85.0);
    }
}
