//! Canvas2D backend for the shared painters.
//!
//! The browser context already keeps a transform/alpha stack, so save,
//! restore and transform map straight onto it.

use fb_core::model::Color;
use fb_render::{StrokeStyle, Surface, TextAnchor, TextStyle};
use kurbo::{Affine, BezPath, PathEl, Point};
use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

const FONT_FAMILY: &str = "Inter, system-ui, sans-serif";

pub struct Canvas2dSurface<'a> {
    ctx: &'a CanvasRenderingContext2d,
}

impl<'a> Canvas2dSurface<'a> {
    pub fn new(ctx: &'a CanvasRenderingContext2d) -> Self {
        Self { ctx }
    }

    /// Reset the context and clear the whole canvas.
    pub fn clear(&self, width: f64, height: f64) {
        let _ = self.ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);
        self.ctx.set_global_alpha(1.0);
        self.ctx.clear_rect(0.0, 0.0, width, height);
    }

    fn trace(&self, path: &BezPath) {
        self.ctx.begin_path();
        for el in path.elements() {
            match *el {
                PathEl::MoveTo(p) => self.ctx.move_to(p.x, p.y),
                PathEl::LineTo(p) => self.ctx.line_to(p.x, p.y),
                PathEl::QuadTo(c, p) => self.ctx.quadratic_curve_to(c.x, c.y, p.x, p.y),
                PathEl::CurveTo(c1, c2, p) => {
                    self.ctx.bezier_curve_to(c1.x, c1.y, c2.x, c2.y, p.x, p.y)
                }
                PathEl::ClosePath => self.ctx.close_path(),
            }
        }
    }

    fn apply_font(&self, style: &TextStyle) {
        let weight = if style.bold { "bold " } else { "" };
        self.ctx
            .set_font(&format!("{weight}{}px {FONT_FAMILY}", style.size));
    }
}

fn css_color(color: Color) -> String {
    let [r, g, b, _] = color.to_rgba8();
    format!("rgba({r}, {g}, {b}, {})", color.a.clamp(0.0, 1.0))
}

impl Surface for Canvas2dSurface<'_> {
    fn save(&mut self) {
        self.ctx.save();
    }

    fn restore(&mut self) {
        self.ctx.restore();
    }

    fn transform(&mut self, affine: Affine) {
        let [a, b, c, d, e, f] = affine.as_coeffs();
        let _ = self.ctx.transform(a, b, c, d, e, f);
    }

    fn set_alpha(&mut self, alpha: f64) {
        let current = self.ctx.global_alpha();
        self.ctx.set_global_alpha(current * alpha.clamp(0.0, 1.0));
    }

    fn fill_path(&mut self, path: &BezPath, color: Color) {
        self.trace(path);
        self.ctx.set_fill_style_str(&css_color(color));
        self.ctx.fill();
    }

    fn stroke_path(&mut self, path: &BezPath, stroke: &StrokeStyle) {
        self.trace(path);
        self.ctx.set_stroke_style_str(&css_color(stroke.color));
        self.ctx.set_line_width(stroke.width);
        let dash = match stroke.dash {
            Some([on, off]) => js_sys::Array::of2(&JsValue::from_f64(on), &JsValue::from_f64(off)),
            None => js_sys::Array::new(),
        };
        let _ = self.ctx.set_line_dash(&dash);
        self.ctx.stroke();
        let _ = self.ctx.set_line_dash(&js_sys::Array::new());
    }

    fn fill_text(&mut self, text: &str, at: Point, style: &TextStyle) {
        self.apply_font(style);
        self.ctx.set_fill_style_str(&css_color(style.color));
        self.ctx.set_text_align(match style.anchor {
            TextAnchor::Start => "left",
            TextAnchor::Middle => "center",
            TextAnchor::End => "right",
        });
        self.ctx.set_text_baseline("middle");
        let _ = self.ctx.fill_text(text, at.x, at.y);
    }

    fn measure_text(&self, text: &str, style: &TextStyle) -> f64 {
        self.apply_font(style);
        match self.ctx.measure_text(text) {
            Ok(metrics) => metrics.width(),
            Err(_) => {
                let factor = if style.bold { 0.62 } else { 0.56 };
                text.chars().count() as f64 * style.size * factor
            }
        }
    }
}
