//! Geometry kernel: points, rectangles, shape hit tests, and the
//! connection-point rings elements expose to connections.
//!
//! Everything here is a pure function of its inputs.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Connection points of one element. Rings hold 4 points, lifelines 11.
pub type PointRing = SmallVec<[Point; 11]>;

/// Number of points along a lifeline.
pub const LIFELINE_POINTS: usize = 11;

// ─── Point ───────────────────────────────────────────────────────────────

/// A point (or offset) in document space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    #[must_use]
    pub fn offset(self, dx: f64, dy: f64) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }

    /// Difference `self - origin` as an offset.
    #[must_use]
    pub fn delta_from(self, origin: Point) -> Point {
        Point::new(self.x - origin.x, self.y - origin.y)
    }
}

/// Snap one coordinate to the grid: `round(v / grid) * grid`.
pub fn snap_to_grid(value: f64, grid: f64) -> f64 {
    if grid <= 0.0 {
        return value;
    }
    (value / grid).round() * grid
}

// ─── Rect ────────────────────────────────────────────────────────────────

/// Axis-aligned rectangle, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Normalized rect spanning two corners in any order.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x <= other.right()
            && other.x <= self.right()
            && self.y <= other.bottom()
            && other.y <= self.bottom()
    }

    /// Grow outward by `pad` on every side.
    #[must_use]
    pub fn inflate(&self, pad: f64) -> Rect {
        Rect::new(
            self.x - pad,
            self.y - pad,
            self.width + pad * 2.0,
            self.height + pad * 2.0,
        )
    }
}

/// Extent of a set of elements.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    /// Extent reported for an empty element set.
    pub const EMPTY_DEFAULT: Bounds = Bounds {
        min_x: 0.0,
        min_y: 0.0,
        max_x: 100.0,
        max_y: 100.0,
    };

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn to_rect(&self) -> Rect {
        Rect::new(self.min_x, self.min_y, self.width(), self.height())
    }
}

/// Union of the given rectangles, or [`Bounds::EMPTY_DEFAULT`] when there
/// are none.
pub fn bounds_of<I>(rects: I) -> Bounds
where
    I: IntoIterator<Item = Rect>,
{
    let mut iter = rects.into_iter();
    let Some(first) = iter.next() else {
        return Bounds::EMPTY_DEFAULT;
    };
    iter.fold(
        Bounds {
            min_x: first.x,
            min_y: first.y,
            max_x: first.right(),
            max_y: first.bottom(),
        },
        |b, r| Bounds {
            min_x: b.min_x.min(r.x),
            min_y: b.min_y.min(r.y),
            max_x: b.max_x.max(r.right()),
            max_y: b.max_y.max(r.bottom()),
        },
    )
}

// ─── Hit shapes ──────────────────────────────────────────────────────────

/// Containment test used for a kind of element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitShape {
    /// Axis-aligned bounding box.
    Rect,
    /// Circle of radius `min(w, h) / 2` around the center.
    Circle,
    /// `|dx|/halfW + |dy|/halfH <= 1`.
    Diamond,
}

impl HitShape {
    pub fn contains(self, rect: &Rect, p: Point) -> bool {
        match self {
            HitShape::Rect => rect.contains(p),
            HitShape::Circle => {
                let radius = rect.width.min(rect.height) / 2.0;
                rect.center().distance(p) <= radius
            }
            HitShape::Diamond => {
                let half_w = rect.width / 2.0;
                let half_h = rect.height / 2.0;
                if half_w <= 0.0 || half_h <= 0.0 {
                    return false;
                }
                let c = rect.center();
                (p.x - c.x).abs() / half_w + (p.y - c.y).abs() / half_h <= 1.0
            }
        }
    }
}

// ─── Connection points ───────────────────────────────────────────────────

/// How an element exposes connection points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingPolicy {
    /// Midpoints of the four sides: N, E, S, W.
    Cardinal,
    /// [`LIFELINE_POINTS`] points down the vertical center line.
    Lifeline,
}

impl RingPolicy {
    pub fn points(self, rect: &Rect) -> PointRing {
        let c = rect.center();
        match self {
            RingPolicy::Cardinal => smallvec::smallvec![
                Point::new(c.x, rect.y),
                Point::new(rect.right(), c.y),
                Point::new(c.x, rect.bottom()),
                Point::new(rect.x, c.y),
            ],
            RingPolicy::Lifeline => {
                let step = rect.height / (LIFELINE_POINTS - 1) as f64;
                (0..LIFELINE_POINTS)
                    .map(|i| Point::new(c.x, rect.y + step * i as f64))
                    .collect()
            }
        }
    }
}

/// Closest candidate within `radius` of `query`.
pub fn nearest_point_at(query: Point, radius: f64, candidates: &[Point]) -> Option<Point> {
    candidates
        .iter()
        .copied()
        .map(|p| (p, p.distance(query)))
        .filter(|(_, d)| *d <= radius)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(p, _)| p)
}

/// Exhaustive search for the closest pair across two rings.
/// The first pair found wins ties. Returns `None` if either side is empty.
pub fn closest_point_pair(a: &[Point], b: &[Point]) -> Option<(Point, Point)> {
    let mut best: Option<(Point, Point, f64)> = None;
    for &pa in a {
        for &pb in b {
            let d = pa.distance(pb);
            if best.is_none_or(|(_, _, bd)| d < bd) {
                best = Some((pa, pb, d));
            }
        }
    }
    best.map(|(pa, pb, _)| (pa, pb))
}
