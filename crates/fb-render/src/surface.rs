//! Drawing target abstraction.
//!
//! Painters only talk to a [`Surface`]: a transform/alpha stack plus path
//! fill, path stroke and text. Backends are the vello scene, the SVG
//! writer, the wasm Canvas2D context, and [`RecordingSurface`] for tests.

use fb_core::model::Color;
use kurbo::{Affine, BezPath, Point};

// ─── Styles ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct StrokeStyle {
    pub color: Color,
    pub width: f64,
    /// Dash on/off lengths; `None` draws a solid line.
    pub dash: Option<[f64; 2]>,
}

impl StrokeStyle {
    pub fn solid(color: Color, width: f64) -> Self {
        Self {
            color,
            width,
            dash: None,
        }
    }

    pub fn dashed(color: Color, width: f64) -> Self {
        Self {
            color,
            width,
            dash: Some([5.0, 5.0]),
        }
    }
}

/// Horizontal placement of text relative to its anchor point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAnchor {
    Start,
    #[default]
    Middle,
    End,
}

/// Text is always vertically centered on its anchor point.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub color: Color,
    pub size: f64,
    pub bold: bool,
    pub anchor: TextAnchor,
}

impl TextStyle {
    pub fn new(color: Color, size: f64) -> Self {
        Self {
            color,
            size,
            bold: false,
            anchor: TextAnchor::Middle,
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }
}

// ─── Surface ─────────────────────────────────────────────────────────────

pub trait Surface {
    /// Push the current transform and alpha.
    fn save(&mut self);
    /// Pop back to the last [`Surface::save`]. Unbalanced calls are ignored.
    fn restore(&mut self);
    /// Pre-multiply `affine` onto the current transform, like Canvas2D.
    fn transform(&mut self, affine: Affine);
    /// Multiply the current alpha by `alpha` (0..=1).
    fn set_alpha(&mut self, alpha: f64);
    fn fill_path(&mut self, path: &BezPath, color: Color);
    fn stroke_path(&mut self, path: &BezPath, stroke: &StrokeStyle);
    fn fill_text(&mut self, text: &str, at: Point, style: &TextStyle);

    /// Advance width of `text`. Backends without font metrics use an
    /// average glyph width.
    fn measure_text(&self, text: &str, style: &TextStyle) -> f64 {
        let factor = if style.bold { 0.62 } else { 0.56 };
        text.chars().count() as f64 * style.size * factor
    }
}

// ─── Recording ───────────────────────────────────────────────────────────

/// One call made against a [`RecordingSurface`].
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Save,
    Restore,
    Transform(Affine),
    Alpha(f64),
    Fill { path: BezPath, color: Color },
    Stroke { path: BezPath, stroke: StrokeStyle },
    Text { text: String, at: Point, style: TextStyle },
}

/// Surface that records every call. Used by tests and by hosts that want
/// to replay a frame elsewhere.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub ops: Vec<DrawOp>,
    depth: usize,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Labels drawn, in order.
    pub fn texts(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn fills(&self) -> impl Iterator<Item = (&BezPath, Color)> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Fill { path, color } => Some((path, *color)),
            _ => None,
        })
    }

    pub fn strokes(&self) -> impl Iterator<Item = (&BezPath, &StrokeStyle)> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Stroke { path, stroke } => Some((path, stroke)),
            _ => None,
        })
    }

    /// Whether every save was matched by a restore.
    pub fn is_balanced(&self) -> bool {
        self.depth == 0
    }
}

impl Surface for RecordingSurface {
    fn save(&mut self) {
        self.depth += 1;
        self.ops.push(DrawOp::Save);
    }

    fn restore(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.ops.push(DrawOp::Restore);
    }

    fn transform(&mut self, affine: Affine) {
        self.ops.push(DrawOp::Transform(affine));
    }

    fn set_alpha(&mut self, alpha: f64) {
        self.ops.push(DrawOp::Alpha(alpha));
    }

    fn fill_path(&mut self, path: &BezPath, color: Color) {
        self.ops.push(DrawOp::Fill {
            path: path.clone(),
            color,
        });
    }

    fn stroke_path(&mut self, path: &BezPath, stroke: &StrokeStyle) {
        self.ops.push(DrawOp::Stroke {
            path: path.clone(),
            stroke: stroke.clone(),
        });
    }

    fn fill_text(&mut self, text: &str, at: Point, style: &TextStyle) {
        self.ops.push(DrawOp::Text {
            text: text.to_string(),
            at,
            style: style.clone(),
        });
    }
}
