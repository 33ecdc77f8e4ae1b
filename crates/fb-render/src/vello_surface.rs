//! Vello backend: a [`Surface`] that appends to a `vello::Scene`.
//!
//! The caller presents the scene through its own wgpu setup. Text needs a
//! font context vello does not provide, so labels are only traced.

use crate::surface::{StrokeStyle, Surface, TextStyle};
use fb_core::model::Color as ModelColor;
use kurbo::{Affine, BezPath, Point, Stroke};
use peniko::{Color, Fill};
use vello::Scene;

pub struct VelloSurface<'a> {
    scene: &'a mut Scene,
    transform: Affine,
    alpha: f64,
    stack: Vec<(Affine, f64)>,
}

impl<'a> VelloSurface<'a> {
    pub fn new(scene: &'a mut Scene) -> Self {
        Self {
            scene,
            transform: Affine::IDENTITY,
            alpha: 1.0,
            stack: Vec::new(),
        }
    }

    fn color(&self, color: ModelColor) -> Color {
        let [r, g, b, a] = color.to_rgba8();
        Color::from_rgba8(r, g, b, (f64::from(a) * self.alpha).round() as u8)
    }
}

impl Surface for VelloSurface<'_> {
    fn save(&mut self) {
        self.stack.push((self.transform, self.alpha));
    }

    fn restore(&mut self) {
        if let Some((transform, alpha)) = self.stack.pop() {
            self.transform = transform;
            self.alpha = alpha;
        }
    }

    fn transform(&mut self, affine: Affine) {
        self.transform *= affine;
    }

    fn set_alpha(&mut self, alpha: f64) {
        self.alpha *= alpha.clamp(0.0, 1.0);
    }

    fn fill_path(&mut self, path: &BezPath, color: ModelColor) {
        let color = self.color(color);
        self.scene.fill(Fill::NonZero, self.transform, color, None, path);
    }

    fn stroke_path(&mut self, path: &BezPath, stroke: &StrokeStyle) {
        let mut style = Stroke::new(stroke.width);
        if let Some(dash) = stroke.dash {
            style = style.with_dashes(0.0, dash);
        }
        let color = self.color(stroke.color);
        self.scene.stroke(&style, self.transform, color, None, path);
    }

    fn fill_text(&mut self, text: &str, at: Point, style: &TextStyle) {
        log::trace!("TEXT {text:?} at ({}, {}) size {}", at.x, at.y, style.size);
    }
}
