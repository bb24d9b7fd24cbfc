use kurbo::{Point, Size, Vec2};
use crate::config::EditorConfig;
use crate::types::Artboard;

/// Pan/zoom transform between screen pixels and artboard (canvas) units.
///
/// The artboard is centred in the host container and then shifted by the
/// pan offset, which is always in screen pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct Viewport {
    pub zoom: f64,
    pub pan_offset: Vec2,
    pub container_origin: Point,
    pub container_size: Size,
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport {
            zoom: 1.0,
            pan_offset: Vec2::ZERO,
            container_origin: Point::ZERO,
            container_size: Size::new(1080.0, 1080.0),
        }
    }
}

impl Viewport {
    pub fn set_container(&mut self, origin: Point, size: Size) {
        self.container_origin = origin;
        self.container_size = size;
    }

    /// Screen position of the artboard's top-left corner.
    pub fn artboard_screen_origin(&self, artboard: &Artboard) -> Point {
        let centring = Vec2::new(
            (self.container_size.width - artboard.width * self.zoom) / 2.0,
            (self.container_size.height - artboard.height * self.zoom) / 2.0,
        );
        self.container_origin + centring + self.pan_offset
    }

    pub fn to_canvas(&self, screen: Point, artboard: &Artboard) -> Point {
        let d = screen - self.artboard_screen_origin(artboard);
        Point::new(d.x / self.zoom, d.y / self.zoom)
    }

    pub fn to_screen(&self, canvas: Point, artboard: &Artboard) -> Point {
        self.artboard_screen_origin(artboard) + canvas.to_vec2() * self.zoom
    }

    /// Convert a screen-space delta into canvas units.
    pub fn delta_to_canvas(&self, delta: Vec2) -> Vec2 {
        delta / self.zoom
    }

    pub fn set_zoom(&mut self, zoom: f64, config: &EditorConfig) {
        self.zoom = config.clamp_zoom(zoom);
    }

    pub fn zoom_in(&mut self, config: &EditorConfig) {
        self.set_zoom(round_step(self.zoom + config.zoom_step), config);
    }

    pub fn zoom_out(&mut self, config: &EditorConfig) {
        self.set_zoom(round_step(self.zoom - config.zoom_step), config);
    }

    pub fn fit_to_screen(&mut self, artboard: &Artboard, config: &EditorConfig) {
        let fit_w = config.fit_margin * self.container_size.width / artboard.width;
        let fit_h = config.fit_margin * self.container_size.height / artboard.height;
        self.set_zoom(fit_w.min(fit_h).min(1.0), config);
        self.pan_offset = Vec2::ZERO;
    }

    pub fn reset(&mut self, config: &EditorConfig) {
        self.set_zoom(config.default_zoom, config);
        self.pan_offset = Vec2::ZERO;
    }
}

// Keeps repeated +/- steps on clean tenths.
fn round_step(zoom: f64) -> f64 {
    (zoom * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOARD: Artboard = Artboard { width: 1000.0, height: 500.0 };

    #[test]
    fn screen_and_canvas_are_inverse() {
        let mut vp = Viewport::default();
        vp.zoom = 0.5;
        vp.pan_offset = Vec2::new(30.0, -12.0);
        let canvas = Point::new(120.0, 340.0);
        let back = vp.to_canvas(vp.to_screen(canvas, &BOARD), &BOARD);
        assert!((back - canvas).hypot() < 1e-9);
    }

    #[test]
    fn to_canvas_divides_by_zoom() {
        let mut vp = Viewport::default();
        vp.zoom = 2.0;
        let origin = vp.artboard_screen_origin(&BOARD);
        let p = vp.to_canvas(origin + Vec2::new(100.0, 50.0), &BOARD);
        assert_eq!(p, Point::new(50.0, 25.0));
    }

    #[test]
    fn zoom_steps_clamp() {
        let config = EditorConfig::default();
        let mut vp = Viewport::default();
        for _ in 0..20 { vp.zoom_in(&config); }
        assert_eq!(vp.zoom, 2.0);
        for _ in 0..40 { vp.zoom_out(&config); }
        assert_eq!(vp.zoom, 0.1);
        vp.zoom_in(&config);
        assert_eq!(vp.zoom, 0.2);
    }

    #[test]
    fn fit_to_screen_uses_tighter_axis_and_resets_pan() {
        let config = EditorConfig::default();
        let mut vp = Viewport::default();
        vp.set_container(Point::ZERO, Size::new(800.0, 600.0));
        vp.pan_offset = Vec2::new(40.0, 40.0);
        vp.fit_to_screen(&BOARD, &config);
        assert!((vp.zoom - 0.72).abs() < 1e-9);
        assert_eq!(vp.pan_offset, Vec2::ZERO);
    }

    #[test]
    fn fit_to_screen_never_exceeds_one() {
        let config = EditorConfig::default();
        let mut vp = Viewport::default();
        vp.set_container(Point::ZERO, Size::new(4000.0, 4000.0));
        vp.fit_to_screen(&BOARD, &config);
        assert_eq!(vp.zoom, 1.0);
    }

    #[test]
    fn reset_restores_default_zoom() {
        let config = EditorConfig::default();
        let mut vp = Viewport::default();
        vp.zoom = 1.7;
        vp.pan_offset = Vec2::new(5.0, 5.0);
        vp.reset(&config);
        assert_eq!(vp.zoom, 0.5);
        assert_eq!(vp.pan_offset, Vec2::ZERO);
    }
}
