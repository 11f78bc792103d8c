use crate::coordinate::{Coordinate, ViewportRegion};
use egui::{Pos2, Rect, Vec2};

/// Tile-size convention: at zoom 0 the whole world is 256 px wide.
const WORLD_SIZE_AT_ZOOM_0: f64 = 256.0;
const MIN_ZOOM: f64 = 1.0;
const MAX_ZOOM: f64 = 20.0;

/// Where the map looks. Positions are kept on the unit Web Mercator square,
/// scale is pixels per world unit.
pub struct MapCamera {
    home: ViewportRegion,
    center: (f64, f64),
    scale: Option<f64>,
}

impl MapCamera {
    pub fn new(home: ViewportRegion) -> Self {
        Self {
            home,
            center: home.center().to_mercator(),
            scale: None,
        }
    }

    /// Frames the home region the first time a view size is known.
    pub fn ensure_fitted(&mut self, view_rect: Rect) {
        if self.scale.is_none() {
            self.scale = Some(Self::fit_scale(self.home, view_rect));
        }
    }

    /// Scale at which the whole region fits inside the view.
    pub fn fit_scale(region: ViewportRegion, view_rect: Rect) -> f64 {
        let (west, north) = region.north_west().to_mercator();
        let (east, south) = region.south_east().to_mercator();
        let span_x = (east - west).abs().max(f64::EPSILON);
        let span_y = (south - north).abs().max(f64::EPSILON);
        let by_width = view_rect.width() as f64 / span_x;
        let by_height = view_rect.height() as f64 / span_y;
        by_width.min(by_height).clamp(Self::min_scale(), Self::max_scale())
    }

    fn min_scale() -> f64 {
        WORLD_SIZE_AT_ZOOM_0 * MIN_ZOOM.exp2()
    }

    fn max_scale() -> f64 {
        WORLD_SIZE_AT_ZOOM_0 * MAX_ZOOM.exp2()
    }

    pub fn scale(&self) -> f64 {
        self.scale.unwrap_or_else(Self::min_scale)
    }

    /// Slippy-map style zoom level.
    pub fn zoom_level(&self) -> f64 {
        (self.scale() / WORLD_SIZE_AT_ZOOM_0).log2()
    }

    pub fn center(&self) -> Coordinate {
        Coordinate::from_mercator(self.center.0, self.center.1)
    }

    pub fn pan(&mut self, delta: Vec2) {
        let scale = self.scale();
        self.center.0 = (self.center.0 - delta.x as f64 / scale).clamp(0.0, 1.0);
        self.center.1 = (self.center.1 - delta.y as f64 / scale).clamp(0.0, 1.0);
    }

    /// Zooms by `factor` while keeping the point under `pos` fixed.
    pub fn zoom_at(&mut self, factor: f64, pos: Pos2, view_rect: Rect) {
        let anchor = self.screen_to_world(pos, view_rect);
        let scale = (self.scale() * factor).clamp(Self::min_scale(), Self::max_scale());
        self.scale = Some(scale);

        let offset = pos - view_rect.center();
        self.center.0 = (anchor.0 - offset.x as f64 / scale).clamp(0.0, 1.0);
        self.center.1 = (anchor.1 - offset.y as f64 / scale).clamp(0.0, 1.0);
    }

    /// Back to the region the screen was framed with.
    pub fn recenter(&mut self, view_rect: Rect) {
        self.center = self.home.center().to_mercator();
        self.scale = Some(Self::fit_scale(self.home, view_rect));
    }

    fn screen_to_world(&self, pos: Pos2, view_rect: Rect) -> (f64, f64) {
        let offset = pos - view_rect.center();
        let scale = self.scale();
        (
            self.center.0 + offset.x as f64 / scale,
            self.center.1 + offset.y as f64 / scale,
        )
    }

    pub fn screen_to_coordinate(&self, pos: Pos2, view_rect: Rect) -> Coordinate {
        let (x, y) = self.screen_to_world(pos, view_rect);
        Coordinate::from_mercator(x.clamp(0.0, 1.0), y.clamp(0.0, 1.0))
    }

    pub fn coordinate_to_screen(&self, coordinate: Coordinate, view_rect: Rect) -> Pos2 {
        let (x, y) = coordinate.to_mercator();
        let scale = self.scale();
        let center = view_rect.center();
        Pos2::new(
            center.x + ((x - self.center.0) * scale) as f32,
            center.y + ((y - self.center.1) * scale) as f32,
        )
    }

    /// North-west and south-east corners of what is currently visible.
    pub fn visible_bounds(&self, view_rect: Rect) -> (Coordinate, Coordinate) {
        (
            self.screen_to_coordinate(view_rect.left_top(), view_rect),
            self.screen_to_coordinate(view_rect.right_bottom(), view_rect),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> Rect {
        Rect::from_min_size(Pos2::ZERO, Vec2::new(800.0, 600.0))
    }

    fn sf_region() -> ViewportRegion {
        ViewportRegion::around(Coordinate::new(37.7749, -122.4194), 0.05)
    }

    #[test]
    fn fitted_camera_shows_whole_region() {
        let mut camera = MapCamera::new(sf_region());
        camera.ensure_fitted(view());

        let (nw, se) = camera.visible_bounds(view());
        let region = sf_region();
        assert!(nw.latitude >= region.north_west().latitude - 1e-9);
        assert!(nw.longitude <= region.north_west().longitude + 1e-9);
        assert!(se.latitude <= region.south_east().latitude + 1e-9);
        assert!(se.longitude >= region.south_east().longitude - 1e-9);
    }

    #[test]
    fn region_center_lands_on_view_center() {
        let mut camera = MapCamera::new(sf_region());
        camera.ensure_fitted(view());
        let pos = camera.coordinate_to_screen(sf_region().center(), view());
        assert!((pos - view().center()).length() < 0.01);
    }

    #[test]
    fn screen_and_coordinate_conversions_agree() {
        let mut camera = MapCamera::new(sf_region());
        camera.ensure_fitted(view());
        let pos = Pos2::new(123.0, 456.0);
        let coordinate = camera.screen_to_coordinate(pos, view());
        let back = camera.coordinate_to_screen(coordinate, view());
        assert!((back - pos).length() < 0.01);
    }

    #[test]
    fn zoom_keeps_cursor_point_fixed() {
        let mut camera = MapCamera::new(sf_region());
        camera.ensure_fitted(view());
        let cursor = Pos2::new(200.0, 150.0);
        let before = camera.screen_to_coordinate(cursor, view());

        camera.zoom_at(2.0, cursor, view());
        let after = camera.screen_to_coordinate(cursor, view());
        assert!((before.latitude - after.latitude).abs() < 1e-7);
        assert!((before.longitude - after.longitude).abs() < 1e-7);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut camera = MapCamera::new(sf_region());
        camera.ensure_fitted(view());
        camera.zoom_at(1e12, view().center(), view());
        assert!((camera.zoom_level() - MAX_ZOOM).abs() < 1e-9);
        camera.zoom_at(1e-12, view().center(), view());
        assert!((camera.zoom_level() - MIN_ZOOM).abs() < 1e-9);
    }

    #[test]
    fn pan_moves_against_drag_and_recenter_restores() {
        let mut camera = MapCamera::new(sf_region());
        camera.ensure_fitted(view());
        let home = camera.center();

        // dragging the map right reveals what lies to the west
        camera.pan(Vec2::new(100.0, 0.0));
        assert!(camera.center().longitude < home.longitude);

        camera.zoom_at(3.0, Pos2::new(10.0, 10.0), view());
        camera.recenter(view());
        assert!((camera.center().latitude - home.latitude).abs() < 1e-9);
        assert!((camera.center().longitude - home.longitude).abs() < 1e-9);
        assert_eq!(camera.scale(), MapCamera::fit_scale(sf_region(), view()));
    }
}
