//! Scene → drawing calls.
//!
//! Paint order: grid, connections, elements on visible layers (array
//! order, last on top), selection outlines with resize handles,
//! connection-point markers of the primary selection, the rubber band of
//! a connection being drawn, the marquee, and the placement preview.
//!
//! Each element kind is drawn by one entry of a painter table. Opacity and
//! rotation are applied around the element center inside a save/restore
//! pair, so nothing leaks into the next element.

use crate::surface::{StrokeStyle, Surface, TextAnchor, TextStyle};
use fb_core::geometry::{Point, Rect};
use fb_core::id::ObjectId;
use fb_core::model::{ArrowKind, Color, Connection, Element, ElementKind, FontWeight, LineStyle, TextAlign};
use fb_core::scene::Scene;
use kurbo::{Affine, BezPath, Circle, Ellipse, RoundedRect, Shape};
use std::f64::consts::PI;

pub const SELECTION_COLOR: Color = Color::rgb8(0x21, 0x96, 0xf3);
pub const MARKER_COLOR: Color = Color::rgb8(0xff, 0x44, 0x44);
pub const GRID_COLOR: Color = Color::rgb8(0xe0, 0xe0, 0xe0);
pub const LABEL_COLOR: Color = Color::rgb8(0x33, 0x33, 0x33);
/// Alpha multiplier for elements outside the outcome filter.
pub const DIMMED_ALPHA: f64 = 0.25;
pub const MARKER_RADIUS: f64 = 4.0;
const ARROW_HEAD: f64 = 10.0;
const MESSAGE_HEAD: f64 = 8.0;
const NOTE_FOLD: f64 = 10.0;
const TOLERANCE: f64 = 0.1;

// ─── View and overlay ────────────────────────────────────────────────────

/// Document → screen mapping: `screen = world * zoom + pan`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub zoom: f64,
    pub pan: Point,
    /// Surface size in screen pixels.
    pub width: f64,
    pub height: f64,
}

impl ViewTransform {
    pub fn identity(width: f64, height: f64) -> Self {
        Self {
            zoom: 1.0,
            pan: Point::ZERO,
            width,
            height,
        }
    }

    pub fn affine(&self) -> Affine {
        Affine::translate((self.pan.x, self.pan.y)) * Affine::scale(self.zoom)
    }

    /// The part of the document the surface shows.
    pub fn visible_world(&self) -> Rect {
        let zoom = if self.zoom > 0.0 { self.zoom } else { 1.0 };
        Rect::new(
            -self.pan.x / zoom,
            -self.pan.y / zoom,
            self.width / zoom,
            self.height / zoom,
        )
    }
}

/// Transient editor state drawn on top of the scene. All geometry is in
/// document units.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub selection: Vec<ObjectId>,
    /// Element whose connection points are shown.
    pub primary: Option<ObjectId>,
    /// Connection being drawn: anchor point and pointer.
    pub rubber_band: Option<(Point, Point)>,
    pub marquee: Option<Rect>,
    /// Placement preview while drawing a new element.
    pub preview: Option<(ElementKind, Rect)>,
    /// Dim every element not tagged with this outcome.
    pub outcome_filter: Option<String>,
    /// Grid cell size, when the grid is shown.
    pub grid: Option<f64>,
    /// Side of the square resize handles.
    pub handle_size: f64,
}

impl Default for Overlay {
    fn default() -> Self {
        Self {
            selection: Vec::new(),
            primary: None,
            rubber_band: None,
            marquee: None,
            preview: None,
            outcome_filter: None,
            grid: None,
            handle_size: 8.0,
        }
    }
}

// ─── Entry points ────────────────────────────────────────────────────────

/// Paint one frame.
pub fn paint_scene(surface: &mut dyn Surface, scene: &Scene, overlay: &Overlay, view: &ViewTransform) {
    surface.save();
    surface.transform(view.affine());

    if let Some(grid) = overlay.grid {
        paint_grid(surface, view.visible_world(), grid);
    }
    paint_content(surface, scene, overlay.outcome_filter.as_deref());

    for id in &overlay.selection {
        if let Some(el) = scene.element(*id).filter(|e| scene.is_visible(e)) {
            paint_selection(surface, el, overlay.handle_size);
        }
    }
    if let Some(el) = overlay
        .primary
        .and_then(|id| scene.element(id))
        .filter(|e| scene.is_visible(e))
    {
        paint_connection_points(surface, el);
    }
    if let Some((from, to)) = overlay.rubber_band {
        let mut path = BezPath::new();
        path.move_to(kp(from));
        path.line_to(kp(to));
        surface.stroke_path(&path, &StrokeStyle::dashed(SELECTION_COLOR, 2.0));
    }
    if let Some(rect) = overlay.marquee {
        let path = rect_path(&rect);
        surface.save();
        surface.set_alpha(0.1);
        surface.fill_path(&path, SELECTION_COLOR);
        surface.restore();
        surface.stroke_path(&path, &StrokeStyle::dashed(SELECTION_COLOR, 1.0));
    }
    if let Some((kind, rect)) = overlay.preview {
        paint_preview(surface, kind, &rect);
    }

    surface.restore();
    log::trace!(
        "painted {} element(s), {} selected",
        scene.elements().len(),
        overlay.selection.len()
    );
}

/// Connections and visible elements, without any editor overlay. Shared
/// by the live canvas and the exporters.
pub fn paint_content(surface: &mut dyn Surface, scene: &Scene, outcome_filter: Option<&str>) {
    for conn in scene.connections() {
        let ends_visible = [conn.start_element_id, conn.end_element_id]
            .iter()
            .all(|id| scene.element(*id).is_some_and(|e| scene.is_visible(e)));
        if ends_visible {
            paint_connection(surface, conn);
        }
    }
    for el in scene.visible_elements() {
        let dimmed = outcome_filter.is_some_and(|f| el.annotation.as_deref() != Some(f));
        paint_element(surface, el, if dimmed { DIMMED_ALPHA } else { 1.0 });
    }
}

/// One element with its opacity and rotation.
pub fn paint_element(surface: &mut dyn Surface, el: &Element, alpha: f64) {
    surface.save();
    surface.set_alpha(el.alpha() * alpha);
    if el.style.rotation != 0.0 {
        surface.transform(Affine::rotate_about(el.style.rotation.to_radians(), kp(el.center())));
    }
    painter_for(el.kind)(surface, el);
    surface.restore();
}

// ─── Painter table ───────────────────────────────────────────────────────

/// Draws one element in document coordinates.
pub type Painter = fn(&mut dyn Surface, &Element);

/// Indexed by `ElementKind as usize`, in [`ElementKind::ALL`] order.
static PAINTERS: [Painter; 15] = [
    paint_start,
    paint_action,
    paint_decision,
    paint_end,
    paint_timer,
    paint_participant,
    paint_lifeline,
    paint_message,
    paint_fragment,
    paint_text,
    paint_note,
    paint_rectangle,
    paint_circle,
    paint_diamond,
    paint_triangle,
];

pub fn painter_for(kind: ElementKind) -> Painter {
    PAINTERS[kind as usize]
}

fn paint_start(s: &mut dyn Surface, el: &Element) {
    let r = el.bounds();
    let radius = r.width.min(r.height) / 4.0;
    let path = RoundedRect::from_rect(krect(&r), radius).to_path(TOLERANCE);
    fill_and_stroke(s, &path, el);
    let c = r.center();
    s.fill_path(&Circle::new(kp(c), 8.0).to_path(TOLERANCE), Color::WHITE);
    label(s, el, Point::new(c.x, c.y + 20.0), Color::WHITE);
}

fn paint_action(s: &mut dyn Surface, el: &Element) {
    fill_and_stroke(s, &rect_path(&el.bounds()), el);
    label(s, el, el.center(), Color::WHITE);
}

fn paint_decision(s: &mut dyn Surface, el: &Element) {
    fill_and_stroke(s, &diamond_path(&el.bounds()), el);
    label(s, el, el.center(), Color::WHITE);
}

fn paint_end(s: &mut dyn Surface, el: &Element) {
    let c = el.center();
    let radius = el.width().min(el.height()) / 2.0;
    fill_and_stroke(s, &Circle::new(kp(c), radius).to_path(TOLERANCE), el);
    let ink = el.style.border_color.color().unwrap_or(LABEL_COLOR);
    if radius > 8.0 {
        s.fill_path(&Circle::new(kp(c), radius - 8.0).to_path(TOLERANCE), ink);
    }
    label(s, el, Point::new(c.x, c.y + radius + 20.0), ink);
}

fn paint_timer(s: &mut dyn Surface, el: &Element) {
    let c = el.center();
    let radius = el.width().min(el.height()) / 2.0;
    fill_and_stroke(s, &Circle::new(kp(c), radius).to_path(TOLERANCE), el);
    let mut hands = BezPath::new();
    hands.move_to(kp(c));
    hands.line_to((c.x, c.y - radius * 0.6));
    hands.move_to(kp(c));
    hands.line_to((c.x + radius * 0.4, c.y));
    s.stroke_path(&hands, &StrokeStyle::solid(Color::WHITE, 2.0));
    let ink = el.style.border_color.color().unwrap_or(LABEL_COLOR);
    label(s, el, Point::new(c.x, c.y + radius + 20.0), ink);
}

fn paint_participant(s: &mut dyn Surface, el: &Element) {
    fill_and_stroke(s, &rect_path(&el.bounds()), el);
    label(s, el, el.center(), Color::WHITE);
}

fn paint_lifeline(s: &mut dyn Surface, el: &Element) {
    fill_and_stroke(s, &rect_path(&el.bounds()), el);
}

fn paint_message(s: &mut dyn Surface, el: &Element) {
    let r = el.bounds();
    let y = r.center().y;
    let mut path = BezPath::new();
    path.move_to((r.x, y));
    path.line_to((r.right(), y));
    path.line_to((r.right() - MESSAGE_HEAD, y - MESSAGE_HEAD / 2.0));
    path.move_to((r.right(), y));
    path.line_to((r.right() - MESSAGE_HEAD, y + MESSAGE_HEAD / 2.0));
    let ink = el.style.border_color.color().unwrap_or(LABEL_COLOR);
    s.stroke_path(&path, &StrokeStyle::solid(ink, el.style.border_width.max(1.0)));
    label(s, el, Point::new(r.center().x, y - 10.0), ink);
}

fn paint_fragment(s: &mut dyn Surface, el: &Element) {
    let r = el.bounds();
    fill_and_stroke(s, &rect_path(&r), el);
    let ink = el.style.border_color.color().unwrap_or(LABEL_COLOR);
    s.fill_path(&rect_path(&Rect::new(r.x, r.y, 40.0, 20.0)), ink);
    if !el.label.is_empty() {
        let style = TextStyle::new(Color::WHITE, 12.0).bold();
        s.fill_text(&el.label, kurbo::Point::new(r.x + 20.0, r.y + 10.0), &style);
    }
}

fn paint_text(s: &mut dyn Surface, el: &Element) {
    if let Some(fill) = el.style.fill_color.color() {
        s.fill_path(&rect_path(&el.bounds()), fill);
    }
    let ink = el.style.border_color.color().unwrap_or(Color::BLACK);
    label(s, el, el.center(), ink);
}

fn paint_note(s: &mut dyn Surface, el: &Element) {
    let r = el.bounds();
    let fold = NOTE_FOLD.min(r.width).min(r.height);
    let mut body = BezPath::new();
    body.move_to((r.x, r.y));
    body.line_to((r.right() - fold, r.y));
    body.line_to((r.right(), r.y + fold));
    body.line_to((r.right(), r.bottom()));
    body.line_to((r.x, r.bottom()));
    body.close_path();
    fill_and_stroke(s, &body, el);

    if let Some(border) = el.style.border_color.color() {
        let mut crease = BezPath::new();
        crease.move_to((r.right() - fold, r.y));
        crease.line_to((r.right() - fold, r.y + fold));
        crease.line_to((r.right(), r.y + fold));
        s.stroke_path(&crease, &StrokeStyle::solid(border, el.style.border_width));
    }
    label(s, el, el.center(), LABEL_COLOR);
}

fn paint_rectangle(s: &mut dyn Surface, el: &Element) {
    fill_and_stroke(s, &rect_path(&el.bounds()), el);
    label(s, el, el.center(), LABEL_COLOR);
}

fn paint_circle(s: &mut dyn Surface, el: &Element) {
    let path = Ellipse::from_rect(krect(&el.bounds())).to_path(TOLERANCE);
    fill_and_stroke(s, &path, el);
    label(s, el, el.center(), LABEL_COLOR);
}

fn paint_diamond(s: &mut dyn Surface, el: &Element) {
    fill_and_stroke(s, &diamond_path(&el.bounds()), el);
    label(s, el, el.center(), LABEL_COLOR);
}

fn paint_triangle(s: &mut dyn Surface, el: &Element) {
    let r = el.bounds();
    let mut path = BezPath::new();
    path.move_to((r.center().x, r.y));
    path.line_to((r.right(), r.bottom()));
    path.line_to((r.x, r.bottom()));
    path.close_path();
    fill_and_stroke(s, &path, el);
    // Centroid sits lower than the box center.
    label(s, el, Point::new(r.center().x, r.y + r.height * 2.0 / 3.0), LABEL_COLOR);
}

// ─── Connections ─────────────────────────────────────────────────────────

pub fn paint_connection(s: &mut dyn Surface, conn: &Connection) {
    let (a, b) = (conn.start_point, conn.end_point);
    let mut line = BezPath::new();
    line.move_to(kp(a));
    line.line_to(kp(b));
    let mut stroke = StrokeStyle::solid(conn.color, conn.width);
    if conn.line_style == LineStyle::Dashed {
        stroke.dash = Some([5.0, 5.0]);
    }
    s.stroke_path(&line, &stroke);

    if conn.arrow_kind == ArrowKind::Arrow {
        let angle = (b.y - a.y).atan2(b.x - a.x);
        let mut head = BezPath::new();
        for side in [-PI / 6.0, PI / 6.0] {
            head.move_to(kp(b));
            head.line_to((
                b.x - ARROW_HEAD * (angle + side).cos(),
                b.y - ARROW_HEAD * (angle + side).sin(),
            ));
        }
        s.stroke_path(&head, &StrokeStyle::solid(conn.color, conn.width));
    }

    if !conn.label.is_empty() {
        let mid = kurbo::Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0 - 5.0);
        s.fill_text(&conn.label, mid, &TextStyle::new(LABEL_COLOR, 12.0));
    }
}

// ─── Overlay pieces ──────────────────────────────────────────────────────

fn paint_grid(s: &mut dyn Surface, area: Rect, grid: f64) {
    if grid <= 0.0 {
        return;
    }
    let mut path = BezPath::new();
    let mut x = (area.x / grid).floor() * grid;
    while x <= area.right() {
        path.move_to((x, area.y));
        path.line_to((x, area.bottom()));
        x += grid;
    }
    let mut y = (area.y / grid).floor() * grid;
    while y <= area.bottom() {
        path.move_to((area.x, y));
        path.line_to((area.right(), y));
        y += grid;
    }
    s.save();
    s.set_alpha(0.5);
    s.stroke_path(&path, &StrokeStyle::solid(GRID_COLOR, 0.5));
    s.restore();
}

/// Corner handle squares of `bounds`: top-left, top-right, bottom-left,
/// bottom-right.
pub fn handle_rects(bounds: &Rect, size: f64) -> [Rect; 4] {
    let half = size / 2.0;
    [
        Point::new(bounds.x, bounds.y),
        Point::new(bounds.right(), bounds.y),
        Point::new(bounds.x, bounds.bottom()),
        Point::new(bounds.right(), bounds.bottom()),
    ]
    .map(|c| Rect::new(c.x - half, c.y - half, size, size))
}

fn paint_selection(s: &mut dyn Surface, el: &Element, handle_size: f64) {
    let bounds = el.bounds();
    s.stroke_path(
        &rect_path(&bounds.inflate(2.0)),
        &StrokeStyle::dashed(SELECTION_COLOR, 2.0),
    );
    for handle in handle_rects(&bounds, handle_size) {
        s.fill_path(&rect_path(&handle), SELECTION_COLOR);
    }
}

fn paint_connection_points(s: &mut dyn Surface, el: &Element) {
    for p in el.connection_points() {
        s.fill_path(&Circle::new(kp(*p), MARKER_RADIUS).to_path(TOLERANCE), MARKER_COLOR);
    }
}

fn paint_preview(s: &mut dyn Surface, kind: ElementKind, rect: &Rect) {
    s.stroke_path(&rect_path(rect), &StrokeStyle::dashed(SELECTION_COLOR, 1.0));
    let style = TextStyle::new(SELECTION_COLOR, 12.0);
    s.fill_text(kind.spec().label, kp(rect.center()), &style);
}

// ─── Helpers ─────────────────────────────────────────────────────────────

fn kp(p: Point) -> kurbo::Point {
    kurbo::Point::new(p.x, p.y)
}

fn krect(r: &Rect) -> kurbo::Rect {
    kurbo::Rect::new(r.x, r.y, r.right(), r.bottom())
}

pub(crate) fn rect_path(r: &Rect) -> BezPath {
    krect(r).to_path(TOLERANCE)
}

fn diamond_path(r: &Rect) -> BezPath {
    let c = r.center();
    let mut path = BezPath::new();
    path.move_to((c.x, r.y));
    path.line_to((r.right(), c.y));
    path.line_to((c.x, r.bottom()));
    path.line_to((r.x, c.y));
    path.close_path();
    path
}

/// Fill with the element fill, then outline with its border. Transparent
/// swatches and zero-width borders are skipped.
fn fill_and_stroke(s: &mut dyn Surface, path: &BezPath, el: &Element) {
    if let Some(fill) = el.style.fill_color.color() {
        s.fill_path(path, fill);
    }
    if let Some(border) = el.style.border_color.color()
        && el.style.border_width > 0.0
    {
        s.stroke_path(path, &StrokeStyle::solid(border, el.style.border_width));
    }
}

/// Element label, one line per `\n`, the block centered on `at.y`. The
/// text alignment moves the anchor to the matching edge of the element.
fn label(s: &mut dyn Surface, el: &Element, at: Point, color: Color) {
    if el.label.is_empty() {
        return;
    }
    let r = el.bounds();
    let (x, anchor) = match el.style.text_align {
        TextAlign::Left => (r.x + 8.0, TextAnchor::Start),
        TextAlign::Center => (at.x, TextAnchor::Middle),
        TextAlign::Right => (r.right() - 8.0, TextAnchor::End),
    };
    let style = TextStyle {
        color,
        size: el.style.font_size,
        bold: el.style.font_weight == FontWeight::Bold,
        anchor,
    };
    let lines: Vec<&str> = el.label.lines().collect();
    let line_height = style.size * 1.2;
    let mut y = at.y - line_height * (lines.len() as f64 - 1.0) / 2.0;
    for line in lines {
        s.fill_text(line, kurbo::Point::new(x, y), &style);
        y += line_height;
    }
}
