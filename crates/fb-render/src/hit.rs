//! Hit testing: document point → element lookup.
//!
//! Walks elements in reverse paint order (last painted = topmost) and
//! dispatches to each kind's hit shape. Elements on hidden layers can
//! neither be seen nor hit.

use crate::paint::handle_rects;
use fb_core::geometry::{Point, Rect, nearest_point_at};
use fb_core::id::ObjectId;
use fb_core::scene::Scene;

/// Topmost visible element containing `p`.
pub fn hit_test(scene: &Scene, p: Point) -> Option<ObjectId> {
    scene
        .visible_elements()
        .rev()
        .find(|el| el.contains(p))
        .map(|el| el.id)
}

/// Visible elements whose bounds intersect `rect`, in paint order. Used
/// for marquee selection.
pub fn hit_test_rect(scene: &Scene, rect: &Rect) -> Vec<ObjectId> {
    scene
        .visible_elements()
        .filter(|el| el.bounds().intersects(rect))
        .map(|el| el.id)
        .collect()
}

/// Connection point of `id` within `radius` of `p`.
pub fn connection_point_at(scene: &Scene, id: ObjectId, p: Point, radius: f64) -> Option<Point> {
    let el = scene.element(id).filter(|e| scene.is_visible(e))?;
    nearest_point_at(p, radius, el.connection_points())
}

/// Corner of an element's bounds that a resize can grab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handle {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Handle {
    pub const ALL: [Handle; 4] = [
        Handle::TopLeft,
        Handle::TopRight,
        Handle::BottomLeft,
        Handle::BottomRight,
    ];

    /// The corner diagonally across, which stays fixed while resizing.
    pub fn anchor(self, bounds: &Rect) -> Point {
        match self {
            Handle::TopLeft => Point::new(bounds.right(), bounds.bottom()),
            Handle::TopRight => Point::new(bounds.x, bounds.bottom()),
            Handle::BottomLeft => Point::new(bounds.right(), bounds.y),
            Handle::BottomRight => Point::new(bounds.x, bounds.y),
        }
    }
}

/// Resize handle of `id` under `p`, with handles drawn `size` wide.
pub fn resize_handle_at(scene: &Scene, id: ObjectId, p: Point, size: f64) -> Option<Handle> {
    let el = scene.element(id).filter(|e| scene.is_visible(e))?;
    handle_rects(&el.bounds(), size)
        .iter()
        .zip(Handle::ALL)
        .find(|(rect, _)| rect.contains(p))
        .map(|(_, handle)| handle)
}
