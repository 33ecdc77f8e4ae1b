//! Diagram data model: element kinds and their defaults, styles, elements,
//! connections, layers and document metadata.
//!
//! Geometry fields on [`Element`] are crate-private. Every change goes
//! through [`crate::scene::Scene`], which keeps the derived connection
//! points and the connections anchored to them in step.

use crate::geometry::{HitShape, Point, PointRing, Rect, RingPolicy};
use crate::id::ObjectId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// ─── Colors ──────────────────────────────────────────────────────────────

/// RGBA color. Stored as 4 × f32 [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// Helper to parse a single hex digit.
pub fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Color {
    pub const WHITE: Color = Color::rgb8(0xff, 0xff, 0xff);
    pub const BLACK: Color = Color::rgb8(0x00, 0x00, 0x00);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, 1.0)
    }

    /// Parse `#RGB`, `#RRGGBB` or `#RRGGBBAA`. The `#` is optional.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let bytes = hex.as_bytes();
        let pair = |i: usize| -> Option<u8> { Some(hex_val(bytes[i])? << 4 | hex_val(bytes[i + 1])?) };

        match bytes.len() {
            3 => {
                let r = hex_val(bytes[0])?;
                let g = hex_val(bytes[1])?;
                let b = hex_val(bytes[2])?;
                Some(Self::rgb8(r * 17, g * 17, b * 17))
            }
            6 => Some(Self::rgb8(pair(0)?, pair(2)?, pair(4)?)),
            8 => {
                let mut c = Self::rgb8(pair(0)?, pair(2)?, pair(4)?);
                c.a = pair(6)? as f32 / 255.0;
                Some(c)
            }
            _ => None,
        }
    }

    /// Channels as bytes.
    pub fn to_rgba8(&self) -> [u8; 4] {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }

    /// Lowercase `#rrggbb`, or `#rrggbbaa` when not opaque.
    pub fn to_hex(&self) -> String {
        let [r, g, b, a] = self.to_rgba8();
        if a == 255 {
            format!("#{r:02x}{g:02x}{b:02x}")
        } else {
            format!("#{r:02x}{g:02x}{b:02x}{a:02x}")
        }
    }
}

/// A fill or border color, or nothing at all.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Swatch {
    Transparent,
    Solid(Color),
}

impl Swatch {
    pub const fn hex(r: u8, g: u8, b: u8) -> Self {
        Swatch::Solid(Color::rgb8(r, g, b))
    }

    pub fn color(&self) -> Option<Color> {
        match self {
            Swatch::Transparent => None,
            Swatch::Solid(c) => Some(*c),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("transparent") || s.eq_ignore_ascii_case("none") {
            return Some(Swatch::Transparent);
        }
        Color::from_hex(s).map(Swatch::Solid)
    }
}

impl fmt::Display for Swatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Swatch::Transparent => f.write_str("transparent"),
            Swatch::Solid(c) => f.write_str(&c.to_hex()),
        }
    }
}

impl Serialize for Swatch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Swatch {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Swatch::parse(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid color `{s}`")))
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Color::from_hex(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid color `{s}`")))
    }
}

// ─── Element kinds ───────────────────────────────────────────────────────

/// The closed set of shapes a diagram can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Start,
    #[serde(alias = "process")]
    Action,
    Decision,
    End,
    Timer,
    Participant,
    Lifeline,
    Message,
    Fragment,
    Text,
    Note,
    #[serde(alias = "generic-rectangle", alias = "rect")]
    Rectangle,
    Circle,
    Diamond,
    Triangle,
}

impl ElementKind {
    pub const ALL: [ElementKind; 15] = [
        ElementKind::Start,
        ElementKind::Action,
        ElementKind::Decision,
        ElementKind::End,
        ElementKind::Timer,
        ElementKind::Participant,
        ElementKind::Lifeline,
        ElementKind::Message,
        ElementKind::Fragment,
        ElementKind::Text,
        ElementKind::Note,
        ElementKind::Rectangle,
        ElementKind::Circle,
        ElementKind::Diamond,
        ElementKind::Triangle,
    ];

    /// Defaults and strategies for this kind.
    pub fn spec(self) -> &'static ShapeSpec {
        &SHAPES[self as usize]
    }

    /// Lowercase name used in documents and markdown class tags.
    pub fn name(self) -> &'static str {
        self.spec().name
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        match name.as_str() {
            "process" => return Some(ElementKind::Action),
            "generic-rectangle" | "rect" => return Some(ElementKind::Rectangle),
            _ => {}
        }
        SHAPES.iter().find(|s| s.name == name).map(|s| s.kind)
    }
}

/// One row of the kind table: everything that varies per kind apart from
/// the painter, which lives with the renderer.
#[derive(Debug)]
pub struct ShapeSpec {
    pub kind: ElementKind,
    pub name: &'static str,
    pub width: f64,
    pub height: f64,
    pub min_width: f64,
    pub min_height: f64,
    pub fill: Swatch,
    pub border: Swatch,
    pub border_width: f64,
    pub label: &'static str,
    pub hit: HitShape,
    pub ring: RingPolicy,
}

/// Minimum element extent on either axis, unless a kind overrides it.
pub const MIN_SIZE: f64 = 20.0;

const fn row(
    kind: ElementKind,
    name: &'static str,
    size: (f64, f64),
    fill: Swatch,
    border: Swatch,
    border_width: f64,
    label: &'static str,
) -> ShapeSpec {
    ShapeSpec {
        kind,
        name,
        width: size.0,
        height: size.1,
        min_width: MIN_SIZE,
        min_height: MIN_SIZE,
        fill,
        border,
        border_width,
        label,
        hit: HitShape::Rect,
        ring: RingPolicy::Cardinal,
    }
}

const fn with_hit(mut spec: ShapeSpec, hit: HitShape) -> ShapeSpec {
    spec.hit = hit;
    spec
}

const fn with_min(mut spec: ShapeSpec, min_width: f64, min_height: f64) -> ShapeSpec {
    spec.min_width = min_width;
    spec.min_height = min_height;
    spec
}

const fn with_ring(mut spec: ShapeSpec, ring: RingPolicy) -> ShapeSpec {
    spec.ring = ring;
    spec
}

/// Indexed by `ElementKind as usize`.
static SHAPES: [ShapeSpec; 15] = [
    row(
        ElementKind::Start,
        "start",
        (120.0, 60.0),
        Swatch::hex(0x4c, 0xaf, 0x50),
        Swatch::hex(0x38, 0x8e, 0x3c),
        3.0,
        "Start",
    ),
    row(
        ElementKind::Action,
        "action",
        (140.0, 60.0),
        Swatch::hex(0x21, 0x96, 0xf3),
        Swatch::hex(0x19, 0x76, 0xd2),
        2.0,
        "Action",
    ),
    with_hit(
        row(
            ElementKind::Decision,
            "decision",
            (100.0, 80.0),
            Swatch::hex(0xff, 0x98, 0x00),
            Swatch::hex(0xf5, 0x7c, 0x00),
            2.0,
            "Decision?",
        ),
        HitShape::Diamond,
    ),
    row(
        ElementKind::End,
        "end",
        (100.0, 60.0),
        Swatch::hex(0xf4, 0x43, 0x36),
        Swatch::hex(0xd3, 0x2f, 0x2f),
        3.0,
        "End",
    ),
    row(
        ElementKind::Timer,
        "timer",
        (80.0, 80.0),
        Swatch::hex(0x9c, 0x27, 0xb0),
        Swatch::hex(0x7b, 0x1f, 0xa2),
        2.0,
        "Timer",
    ),
    row(
        ElementKind::Participant,
        "participant",
        (120.0, 40.0),
        Swatch::hex(0x9c, 0x27, 0xb0),
        Swatch::hex(0x7b, 0x1f, 0xa2),
        2.0,
        "Participant",
    ),
    with_ring(
        with_min(
            row(
                ElementKind::Lifeline,
                "lifeline",
                (2.0, 200.0),
                Swatch::hex(0x66, 0x66, 0x66),
                Swatch::hex(0x66, 0x66, 0x66),
                2.0,
                "",
            ),
            2.0,
            MIN_SIZE,
        ),
        RingPolicy::Lifeline,
    ),
    with_min(
        row(
            ElementKind::Message,
            "message",
            (150.0, 20.0),
            Swatch::Transparent,
            Swatch::hex(0x33, 0x33, 0x33),
            2.0,
            "Message",
        ),
        MIN_SIZE,
        2.0,
    ),
    row(
        ElementKind::Fragment,
        "fragment",
        (200.0, 100.0),
        Swatch::hex(0xff, 0xf3, 0xe0),
        Swatch::hex(0xff, 0x98, 0x00),
        2.0,
        "alt",
    ),
    row(
        ElementKind::Text,
        "text",
        (120.0, 30.0),
        Swatch::Transparent,
        Swatch::Transparent,
        0.0,
        "Text",
    ),
    row(
        ElementKind::Note,
        "note",
        (100.0, 80.0),
        Swatch::hex(0xff, 0xeb, 0x3b),
        Swatch::hex(0xfb, 0xc0, 0x2d),
        2.0,
        "Note",
    ),
    row(
        ElementKind::Rectangle,
        "rectangle",
        (100.0, 50.0),
        Swatch::hex(0xff, 0xff, 0xff),
        Swatch::hex(0x00, 0x00, 0x00),
        2.0,
        "Rectangle",
    ),
    with_hit(
        row(
            ElementKind::Circle,
            "circle",
            (80.0, 80.0),
            Swatch::hex(0xff, 0xf3, 0xe0),
            Swatch::hex(0xff, 0x98, 0x00),
            2.0,
            "Circle",
        ),
        HitShape::Circle,
    ),
    with_hit(
        row(
            ElementKind::Diamond,
            "diamond",
            (120.0, 120.0),
            Swatch::hex(0xff, 0xff, 0xff),
            Swatch::hex(0x00, 0x00, 0x00),
            2.0,
            "Diamond",
        ),
        HitShape::Diamond,
    ),
    row(
        ElementKind::Triangle,
        "triangle",
        (100.0, 90.0),
        Swatch::hex(0xff, 0xff, 0xff),
        Swatch::hex(0x00, 0x00, 0x00),
        2.0,
        "Triangle",
    ),
];

// ─── Style ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

/// Visual properties of an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementStyle {
    pub fill_color: Swatch,
    pub border_color: Swatch,
    pub border_width: f64,
    /// Percent, 0..=100.
    pub opacity: u8,
    /// Degrees, clockwise.
    pub rotation: f64,
    pub font_size: f64,
    pub font_weight: FontWeight,
    pub text_align: TextAlign,
}

impl ElementStyle {
    /// Kind defaults from the shape table.
    pub fn for_kind(kind: ElementKind) -> Self {
        let spec = kind.spec();
        Self {
            fill_color: spec.fill,
            border_color: spec.border,
            border_width: spec.border_width,
            opacity: 100,
            rotation: 0.0,
            font_size: 14.0,
            font_weight: FontWeight::Normal,
            text_align: TextAlign::Center,
        }
    }

    /// Clamp values to their valid ranges.
    pub(crate) fn sanitize(&mut self) {
        self.opacity = self.opacity.min(100);
        if !self.border_width.is_finite() || self.border_width < 0.0 {
            self.border_width = 0.0;
        }
        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            self.font_size = 14.0;
        }
        if !self.rotation.is_finite() {
            self.rotation = 0.0;
        }
    }
}

// ─── Element ─────────────────────────────────────────────────────────────

/// A diagram node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub id: ObjectId,
    #[serde(rename = "type")]
    pub kind: ElementKind,
    pub(crate) x: f64,
    pub(crate) y: f64,
    pub(crate) width: f64,
    pub(crate) height: f64,
    #[serde(flatten)]
    pub style: ElementStyle,
    #[serde(rename = "text")]
    pub label: String,
    pub layer: ObjectId,
    /// Business-outcome tag.
    #[serde(
        default,
        rename = "businessOutcome",
        skip_serializing_if = "Option::is_none"
    )]
    pub annotation: Option<String>,
    #[serde(skip)]
    pub(crate) connection_points: PointRing,
}

impl Element {
    /// A new element with its kind's defaults, top-left at `position`.
    pub(crate) fn new(id: ObjectId, kind: ElementKind, position: Point, layer: ObjectId) -> Self {
        let spec = kind.spec();
        let mut el = Self {
            id,
            kind,
            x: position.x,
            y: position.y,
            width: spec.width,
            height: spec.height,
            style: ElementStyle::for_kind(kind),
            label: spec.label.to_string(),
            layer,
            annotation: None,
            connection_points: PointRing::new(),
        };
        el.refresh_points();
        el
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    pub fn center(&self) -> Point {
        self.bounds().center()
    }

    /// Cached connection points, always in step with the geometry.
    pub fn connection_points(&self) -> &[Point] {
        &self.connection_points
    }

    /// Kind-specific containment test.
    pub fn contains(&self, p: Point) -> bool {
        self.kind.spec().hit.contains(&self.bounds(), p)
    }

    /// Fraction in [0, 1] used when painting.
    pub fn alpha(&self) -> f64 {
        f64::from(self.style.opacity.min(100)) / 100.0
    }

    pub(crate) fn set_position(&mut self, p: Point) {
        self.x = p.x;
        self.y = p.y;
        self.refresh_points();
    }

    /// Apply a size, clamped to the kind's floor.
    pub(crate) fn set_size(&mut self, width: f64, height: f64) {
        let spec = self.kind.spec();
        self.width = finite_or(width, spec.width).max(spec.min_width);
        self.height = finite_or(height, spec.height).max(spec.min_height);
        self.refresh_points();
    }

    pub(crate) fn refresh_points(&mut self) {
        self.connection_points = self.kind.spec().ring.points(&self.bounds());
    }
}

fn finite_or(v: f64, fallback: f64) -> f64 {
    if v.is_finite() { v } else { fallback }
}

// ─── Connection ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineStyle {
    #[default]
    Solid,
    Dashed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrowKind {
    None,
    #[default]
    Arrow,
}

/// A directed edge between two elements. Endpoint coordinates are cached
/// from the closest connection-point pair and re-anchored on every move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: ObjectId,
    pub start_element_id: ObjectId,
    pub end_element_id: ObjectId,
    pub start_point: Point,
    pub end_point: Point,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub line_style: LineStyle,
    #[serde(default)]
    pub arrow_kind: ArrowKind,
    #[serde(default = "default_connection_color")]
    pub color: Color,
    #[serde(default = "default_connection_width")]
    pub width: f64,
}

pub const CONNECTION_COLOR: Color = Color::rgb8(0x33, 0x33, 0x33);

fn default_connection_color() -> Color {
    CONNECTION_COLOR
}

fn default_connection_width() -> f64 {
    2.0
}

impl Connection {
    pub fn touches(&self, id: ObjectId) -> bool {
        self.start_element_id == id || self.end_element_id == id
    }
}

// ─── Layer ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub id: ObjectId,
    pub name: String,
    pub visible: bool,
    pub locked: bool,
}

impl Layer {
    pub fn default_id() -> ObjectId {
        ObjectId::intern("default")
    }

    /// The layer every scene starts with.
    pub fn base() -> Self {
        Self {
            id: Self::default_id(),
            name: "Default".into(),
            visible: true,
            locked: false,
        }
    }
}

// ─── Metadata ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DiagramType {
    #[default]
    #[serde(alias = "flowchart", alias = "flow")]
    Flowchart,
    #[serde(alias = "sequence")]
    Sequence,
}

impl DiagramType {
    /// Lenient parse: anything mentioning "sequence" is a sequence diagram.
    pub fn detect(text: &str) -> Self {
        if text.to_ascii_lowercase().contains("sequence") {
            DiagramType::Sequence
        } else {
            DiagramType::Flowchart
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DiagramType::Flowchart => "Flowchart",
            DiagramType::Sequence => "Sequence",
        }
    }
}

/// Descriptive document metadata. Missing fields take defaults on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Metadata {
    pub flow_title: String,
    pub methodology: String,
    pub diagram_type: DiagramType,
    pub primary_outcomes: Vec<String>,
    pub timers: Vec<String>,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            flow_title: "Untitled Flow".into(),
            methodology: "BDD".into(),
            diagram_type: DiagramType::Flowchart,
            primary_outcomes: Vec::new(),
            timers: Vec::new(),
        }
    }
}

impl Metadata {
    /// Tagline shown under the methodology name.
    pub fn methodology_subtitle(&self) -> &'static str {
        match self.methodology.trim().to_ascii_uppercase().as_str() {
            "TDD" => "Red-Green-Refactor",
            "DDD" => "Domain-Driven",
            "SDD" => "Specification-Driven",
            _ => "Given-When-Then",
        }
    }

    /// File stem for exports: lowercase title with spaces turned into `-`.
    pub fn file_stem(&self) -> String {
        let slug: String = self
            .flow_title
            .trim()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-")
            .to_lowercase();
        if slug.is_empty() { "diagram".into() } else { slug }
    }
}
