//! Export: render the scene into a surface sized to its content.
//!
//! The frame is the union of visible element bounds grown by the padding,
//! scaled by an integer factor. The same painters as the live canvas are
//! used, without the editor overlay.

use crate::paint::{paint_content, rect_path};
use crate::surface::Surface;
use crate::svg::SvgSurface;
use crate::vello_surface::VelloSurface;
use fb_core::geometry::{Rect, bounds_of};
use fb_core::model::{Color, Element, Metadata};
use fb_core::scene::Scene;
use kurbo::Affine;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("nothing to export: the diagram has no visible elements")]
    NothingToExport,
    #[error("failed to write the export: {0}")]
    Format(#[from] std::fmt::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Background {
    #[default]
    Transparent,
    White,
    LightGray,
}

impl Background {
    pub fn color(self) -> Option<Color> {
        match self {
            Background::Transparent => None,
            Background::White => Some(Color::WHITE),
            Background::LightGray => Some(Color::rgb8(0xf5, 0xf5, 0xf5)),
        }
    }

    /// `transparent`, `white` or `light-gray`.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "transparent" | "none" => Some(Background::Transparent),
            "white" => Some(Background::White),
            "light-gray" | "lightgray" | "light-grey" => Some(Background::LightGray),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    pub background: Background,
    /// Pixel multiplier. Default: **1**; 0 is treated as 1.
    pub scale: u32,
    /// Margin around the content in document units. Default: **50**.
    pub padding: f64,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            background: Background::Transparent,
            scale: 1,
            padding: 50.0,
        }
    }
}

/// Where the content lands in an export.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportFrame {
    /// Exported document area: content bounds plus padding.
    pub area: Rect,
    pub scale: f64,
    /// Output size in pixels.
    pub width: u32,
    pub height: u32,
}

impl ExportFrame {
    /// Document → output mapping.
    pub fn affine(&self) -> Affine {
        Affine::scale(self.scale) * Affine::translate((-self.area.x, -self.area.y))
    }
}

/// Frame for exporting the visible content of `scene`.
///
/// # Errors
/// [`ExportError::NothingToExport`] when no element is visible.
pub fn export_frame(scene: &Scene, options: &ExportOptions) -> Result<ExportFrame, ExportError> {
    if scene.visible_elements().next().is_none() {
        return Err(ExportError::NothingToExport);
    }
    let area = bounds_of(scene.visible_elements().map(Element::bounds))
        .to_rect()
        .inflate(options.padding.max(0.0));
    let scale = f64::from(options.scale.max(1));
    Ok(ExportFrame {
        area,
        scale,
        width: (area.width * scale).ceil() as u32,
        height: (area.height * scale).ceil() as u32,
    })
}

/// Paint background and content into `surface` using `frame`.
pub fn paint_export(surface: &mut dyn Surface, scene: &Scene, frame: &ExportFrame, background: Background) {
    surface.save();
    surface.transform(frame.affine());
    if let Some(color) = background.color() {
        surface.fill_path(&rect_path(&frame.area), color);
    }
    paint_content(surface, scene, None);
    surface.restore();
}

/// Export as an SVG document.
///
/// # Errors
/// [`ExportError::NothingToExport`] for an empty scene, or a formatting
/// failure while writing.
pub fn export_svg(scene: &Scene, options: &ExportOptions) -> Result<String, ExportError> {
    let frame = export_frame(scene, options)?;
    let mut surface = SvgSurface::new(f64::from(frame.width), f64::from(frame.height));
    paint_export(&mut surface, scene, &frame, options.background);
    let svg = surface.finish()?;
    log::debug!("exported SVG {}×{}", frame.width, frame.height);
    Ok(svg)
}

/// Export into a fresh vello scene, ready to render to a texture of the
/// returned frame size.
///
/// # Errors
/// [`ExportError::NothingToExport`] for an empty scene.
pub fn export_vello(scene: &Scene, options: &ExportOptions) -> Result<(vello::Scene, ExportFrame), ExportError> {
    let frame = export_frame(scene, options)?;
    let mut out = vello::Scene::new();
    paint_export(&mut VelloSurface::new(&mut out), scene, &frame, options.background);
    Ok((out, frame))
}

/// `<title slug>.<extension>`.
pub fn export_file_name(metadata: &Metadata, extension: &str) -> String {
    format!("{}.{extension}", metadata.file_stem())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{DrawOp, RecordingSurface};
    use fb_core::geometry::Point;
    use fb_core::model::ElementKind;
    use pretty_assertions::assert_eq;

    fn two_elements() -> Scene {
        let mut scene = Scene::new();
        scene.add_element(ElementKind::Action, Point::new(100.0, 100.0));
        scene.add_element(ElementKind::Action, Point::new(300.0, 200.0));
        scene
    }

    #[test]
    fn empty_scene_has_nothing_to_export() {
        let scene = Scene::new();
        assert!(matches!(
            export_frame(&scene, &ExportOptions::default()),
            Err(ExportError::NothingToExport)
        ));
        assert!(export_svg(&scene, &ExportOptions::default()).is_err());
    }

    #[test]
    fn frame_pads_and_scales() {
        let scene = two_elements();
        let options = ExportOptions {
            scale: 2,
            ..ExportOptions::default()
        };
        let frame = export_frame(&scene, &options).unwrap();
        // Content spans (100, 100)–(440, 260).
        assert_eq!(frame.area, Rect::new(50.0, 50.0, 440.0, 260.0));
        assert_eq!((frame.width, frame.height), (880, 520));
        assert_eq!(frame.affine() * kurbo::Point::new(50.0, 50.0), kurbo::Point::ZERO);
    }

    #[test]
    fn background_is_painted_first() {
        let scene = two_elements();
        let frame = export_frame(&scene, &ExportOptions::default()).unwrap();
        let mut surface = RecordingSurface::new();
        paint_export(&mut surface, &scene, &frame, Background::LightGray);
        let first_fill = surface.ops.iter().find_map(|op| match op {
            DrawOp::Fill { color, .. } => Some(*color),
            _ => None,
        });
        assert_eq!(first_fill, Some(Color::rgb8(0xf5, 0xf5, 0xf5)));
        assert!(surface.is_balanced());
    }

    #[test]
    fn svg_export_contains_labels() {
        let svg = export_svg(&two_elements(), &ExportOptions::default()).unwrap();
        assert!(svg.contains("width=\"440\" height=\"260\""));
        assert_eq!(svg.matches(">Action</text>").count(), 2);
    }

    #[test]
    fn names_and_backgrounds() {
        let meta = Metadata {
            flow_title: "Expense  Approval Flow".into(),
            ..Metadata::default()
        };
        assert_eq!(export_file_name(&meta, "svg"), "expense-approval-flow.svg");
        assert_eq!(Background::parse("Light-Gray"), Some(Background::LightGray));
        assert_eq!(Background::parse("plaid"), None);
    }
}
