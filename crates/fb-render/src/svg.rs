//! SVG backend: a [`Surface`] that writes an SVG document.
//!
//! Every primitive becomes one element carrying the current transform and
//! alpha, so the output needs no nested groups.

use crate::surface::{StrokeStyle, Surface, TextAnchor, TextStyle};
use fb_core::model::Color;
use kurbo::{Affine, BezPath, Point};
use std::fmt::Write;

pub struct SvgSurface {
    width: f64,
    height: f64,
    body: String,
    transform: Affine,
    alpha: f64,
    stack: Vec<(Affine, f64)>,
    error: Option<std::fmt::Error>,
}

impl SvgSurface {
    /// An empty document `width` × `height` user units.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            body: String::with_capacity(4096),
            transform: Affine::IDENTITY,
            alpha: 1.0,
            stack: Vec::new(),
            error: None,
        }
    }

    /// Close the document.
    ///
    /// # Errors
    /// The first formatting error hit while writing.
    pub fn finish(self) -> Result<String, std::fmt::Error> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let (w, h) = (self.width, self.height);
        let mut svg = String::with_capacity(self.body.len() + 256);
        writeln!(
            svg,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">"
        )?;
        svg.push_str("<style>\n  text { font-family: Arial, sans-serif; }\n</style>\n");
        svg.push_str(&self.body);
        svg.push_str("</svg>\n");
        Ok(svg)
    }

    fn emit(&mut self, result: std::fmt::Result) {
        if let Err(err) = result
            && self.error.is_none()
        {
            self.error = Some(err);
        }
    }

    /// ` transform="matrix(...)"` unless the transform is the identity.
    fn transform_attr(&self) -> String {
        if self.transform == Affine::IDENTITY {
            return String::new();
        }
        let [a, b, c, d, e, f] = self.transform.as_coeffs();
        format!(" transform=\"matrix({a} {b} {c} {d} {e} {f})\"")
    }
}

fn svg_color(color: Color) -> String {
    let [r, g, b, _] = color.to_rgba8();
    format!("#{r:02x}{g:02x}{b:02x}")
}

pub(crate) fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

impl Surface for SvgSurface {
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

    fn fill_path(&mut self, path: &BezPath, color: Color) {
        let opacity = f64::from(color.a) * self.alpha;
        let transform = self.transform_attr();
        let result = writeln!(
            self.body,
            "  <path d=\"{}\" fill=\"{}\" fill-opacity=\"{opacity}\"{transform} />",
            path.to_svg(),
            svg_color(color)
        );
        self.emit(result);
    }

    fn stroke_path(&mut self, path: &BezPath, stroke: &StrokeStyle) {
        let opacity = f64::from(stroke.color.a) * self.alpha;
        let dash = stroke
            .dash
            .map(|[on, off]| format!(" stroke-dasharray=\"{on} {off}\""))
            .unwrap_or_default();
        let transform = self.transform_attr();
        let result = writeln!(
            self.body,
            "  <path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\" stroke-opacity=\"{opacity}\"{dash}{transform} />",
            path.to_svg(),
            svg_color(stroke.color),
            stroke.width
        );
        self.emit(result);
    }

    fn fill_text(&mut self, text: &str, at: Point, style: &TextStyle) {
        let anchor = match style.anchor {
            TextAnchor::Start => "start",
            TextAnchor::Middle => "middle",
            TextAnchor::End => "end",
        };
        let weight = if style.bold { "bold" } else { "normal" };
        let opacity = f64::from(style.color.a) * self.alpha;
        let transform = self.transform_attr();
        let result = writeln!(
            self.body,
            "  <text x=\"{}\" y=\"{}\" font-size=\"{}\" font-weight=\"{weight}\" text-anchor=\"{anchor}\" dominant-baseline=\"middle\" fill=\"{}\" fill-opacity=\"{opacity}\"{transform}>{}</text>",
            at.x,
            at.y,
            style.size,
            svg_color(style.color),
            escape_xml(text)
        );
        self.emit(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Shape;

    #[test]
    fn writes_paths_with_state() {
        let mut svg = SvgSurface::new(200.0, 100.0);
        svg.save();
        svg.transform(Affine::translate((10.0, 20.0)));
        svg.set_alpha(0.5);
        let rect = kurbo::Rect::new(0.0, 0.0, 10.0, 10.0).to_path(0.1);
        svg.fill_path(&rect, Color::rgb8(0xff, 0x00, 0x00));
        svg.restore();
        svg.stroke_path(
            &rect,
            &StrokeStyle::dashed(Color::BLACK, 2.0),
        );
        let out = svg.finish().unwrap();

        assert!(out.starts_with("<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"200\" height=\"100\""));
        assert!(out.contains("fill=\"#ff0000\" fill-opacity=\"0.5\" transform=\"matrix(1 0 0 1 10 20)\""));
        assert!(out.contains("stroke-dasharray=\"5 5\" />"));
        assert!(out.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn text_is_escaped() {
        let mut svg = SvgSurface::new(10.0, 10.0);
        svg.fill_text("a < b & \"c\"", Point::new(1.0, 2.0), &TextStyle::new(Color::BLACK, 14.0));
        let out = svg.finish().unwrap();
        assert!(out.contains(">a &lt; b &amp; &quot;c&quot;</text>"));
        assert!(out.contains("text-anchor=\"middle\""));
    }
}
