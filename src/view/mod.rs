//! Screen mapping, pointer interaction and scene drawing shared by both
//! canvases.

pub mod interaction;
pub mod scene;

use egui::{Pos2, Rect, Vec2};

pub const MIN_ZOOM: f32 = 0.3;
pub const MAX_ZOOM: f32 = 4.0;

/// World → screen mapping for a canvas.
///
/// The world rectangle `[0, world_size]` is fitted into the screen rect
/// (uniform scale, centered), then scaled by `zoom` around the screen
/// center and shifted by `pan` (screen points).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub pan: Vec2,
    zoom: f32,
    world_size: Vec2,
    screen: Rect,
}

impl ViewTransform {
    pub fn new(world_size: Vec2) -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 1.0,
            world_size,
            screen: Rect::from_min_size(Pos2::ZERO, world_size),
        }
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn screen(&self) -> Rect {
        self.screen
    }

    pub fn world_size(&self) -> Vec2 {
        self.world_size
    }

    pub fn world_center(&self) -> Pos2 {
        (self.world_size / 2.0).to_pos2()
    }

    /// Update the screen rect the canvas occupies this frame
    pub fn set_screen(&mut self, screen: Rect) {
        self.screen = screen;
    }

    pub fn set_world_size(&mut self, world_size: Vec2) {
        self.world_size = world_size;
    }

    /// Uniform scale fitting the world into the screen at zoom 1
    pub fn fit(&self) -> f32 {
        if self.world_size.x <= 0.0 || self.world_size.y <= 0.0 {
            return 1.0;
        }
        let fit = (self.screen.width() / self.world_size.x).min(self.screen.height() / self.world_size.y);
        if fit.is_finite() && fit > 0.0 {
            fit
        } else {
            1.0
        }
    }

    /// Screen points per world unit
    pub fn scale(&self) -> f32 {
        self.fit() * self.zoom
    }

    pub fn to_screen(&self, world: Pos2) -> Pos2 {
        self.screen.center() + self.pan + (world - self.world_center()) * self.scale()
    }

    pub fn to_world(&self, screen: Pos2) -> Pos2 {
        self.world_center() + (screen - self.screen.center() - self.pan) / self.scale()
    }

    /// Multiply the zoom by `factor` (clamped), keeping the world point
    /// under `anchor` fixed on screen.
    pub fn zoom_at(&mut self, factor: f32, anchor: Pos2) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let world = self.to_world(anchor);
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        self.pan = anchor - self.screen.center() - (world - self.world_center()) * self.scale();
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        self.pan += delta;
    }

    pub fn reset(&mut self) {
        self.pan = Vec2::ZERO;
        self.zoom = 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> ViewTransform {
        let mut view = ViewTransform::new(Vec2::new(800.0, 500.0));
        view.set_screen(Rect::from_min_size(Pos2::new(200.0, 40.0), Vec2::new(1600.0, 1000.0)));
        view
    }

    fn close(a: Pos2, b: Pos2) -> bool {
        a.distance(b) < 1e-3
    }

    #[test]
    fn world_is_fitted_into_screen() {
        let view = view();
        assert_eq!(view.fit(), 2.0);
        assert!(close(view.to_screen(Pos2::ZERO), Pos2::new(200.0, 40.0)));
        assert!(close(view.to_screen(Pos2::new(800.0, 500.0)), Pos2::new(1800.0, 1040.0)));
    }

    #[test]
    fn round_trip_under_pan_and_zoom() {
        let mut view = view();
        view.pan_by(Vec2::new(-35.0, 80.0));
        view.zoom_at(1.7, Pos2::new(640.0, 300.0));
        for p in [Pos2::new(0.0, 0.0), Pos2::new(123.0, 456.0), Pos2::new(-50.0, 900.0)] {
            assert!(close(view.to_world(view.to_screen(p)), p));
        }
    }

    #[test]
    fn zoom_is_clamped() {
        let mut view = view();
        view.zoom_at(100.0, Pos2::new(500.0, 500.0));
        assert_eq!(view.zoom(), MAX_ZOOM);
        view.zoom_at(1e-4, Pos2::new(500.0, 500.0));
        assert_eq!(view.zoom(), MIN_ZOOM);
    }

    #[test]
    fn zoom_keeps_anchor_fixed() {
        let mut view = view();
        let anchor = Pos2::new(1234.0, 222.0);
        let before = view.to_world(anchor);
        view.zoom_at(2.5, anchor);
        assert!(close(view.to_world(anchor), before));
    }

    #[test]
    fn ignores_bad_zoom_factor() {
        let mut view = view();
        view.zoom_at(f32::NAN, Pos2::ZERO);
        view.zoom_at(-1.0, Pos2::ZERO);
        assert_eq!(view.zoom(), 1.0);
        assert_eq!(view.pan, Vec2::ZERO);
    }

    #[test]
    fn reset_restores_identity() {
        let mut view = view();
        view.pan_by(Vec2::new(10.0, 10.0));
        view.zoom_at(2.0, Pos2::new(0.0, 0.0));
        view.reset();
        assert_eq!(view.zoom(), 1.0);
        assert_eq!(view.pan, Vec2::ZERO);
    }
}
