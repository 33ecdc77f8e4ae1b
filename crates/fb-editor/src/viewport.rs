//! Pan and zoom state.
//!
//! `screen = world * zoom + pan`. Every zoom change keeps some screen
//! point fixed: the pointer for the wheel, the canvas center for the zoom
//! commands.

use fb_core::config::EditorConfig;
use fb_core::geometry::{Bounds, Point};
use fb_render::ViewTransform;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub zoom: f64,
    pub pan: Point,
    /// Canvas size in screen pixels.
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            zoom: 1.0,
            pan: Point::ZERO,
            width,
            height,
        }
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width.max(0.0);
        self.height = height.max(0.0);
    }

    pub fn screen_to_world(&self, p: Point) -> Point {
        Point::new((p.x - self.pan.x) / self.zoom, (p.y - self.pan.y) / self.zoom)
    }

    pub fn world_to_screen(&self, p: Point) -> Point {
        Point::new(p.x * self.zoom + self.pan.x, p.y * self.zoom + self.pan.y)
    }

    /// Multiply the zoom by `factor` (clamped) keeping `anchor` (screen)
    /// fixed. Returns whether the zoom changed.
    pub fn zoom_at(&mut self, anchor: Point, factor: f64, config: &EditorConfig) -> bool {
        self.set_zoom_at(anchor, self.zoom * factor, config)
    }

    fn set_zoom_at(&mut self, anchor: Point, zoom: f64, config: &EditorConfig) -> bool {
        if !zoom.is_finite() {
            return false;
        }
        let new_zoom = config.clamp_zoom(zoom);
        if new_zoom == self.zoom {
            return false;
        }
        let ratio = new_zoom / self.zoom;
        self.pan = Point::new(
            anchor.x - (anchor.x - self.pan.x) * ratio,
            anchor.y - (anchor.y - self.pan.y) * ratio,
        );
        self.zoom = new_zoom;
        true
    }

    /// One wheel notch at `anchor`: `deltaY > 0` zooms out.
    pub fn wheel(&mut self, anchor: Point, delta_y: f64, config: &EditorConfig) -> bool {
        let factor = if delta_y > 0.0 {
            config.wheel_zoom_out
        } else {
            config.wheel_zoom_in
        };
        self.zoom_at(anchor, factor, config)
    }

    fn center(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }

    pub fn zoom_in(&mut self, config: &EditorConfig) -> bool {
        self.zoom_at(self.center(), config.zoom_step, config)
    }

    pub fn zoom_out(&mut self, config: &EditorConfig) -> bool {
        self.zoom_at(self.center(), 1.0 / config.zoom_step, config)
    }

    /// Back to 100 % with no pan.
    pub fn reset(&mut self) {
        self.zoom = 1.0;
        self.pan = Point::ZERO;
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan = self.pan.offset(dx, dy);
    }

    /// Center `content` with `fit_padding` screen pixels around it, never
    /// zooming past `fit_max_zoom`.
    pub fn fit_to(&mut self, content: Bounds, config: &EditorConfig) {
        let pad = config.fit_padding * 2.0;
        let (w, h) = (content.width().max(1.0), content.height().max(1.0));
        let fit = ((self.width - pad) / w).min((self.height - pad) / h);
        let zoom = fit.min(config.fit_max_zoom).max(config.min_zoom);
        let center = content.to_rect().center();
        self.zoom = zoom;
        self.pan = Point::new(
            self.width / 2.0 - center.x * zoom,
            self.height / 2.0 - center.y * zoom,
        );
        log::debug!("fit to view at {:.0}%", zoom * 100.0);
    }

    pub fn zoom_percent(&self) -> u32 {
        (self.zoom * 100.0).round() as u32
    }

    pub fn transform(&self) -> ViewTransform {
        ViewTransform {
            zoom: self.zoom,
            pan: self.pan,
            width: self.width,
            height: self.height,
        }
    }
}
