//! Undo/redo history.
//!
//! A bounded list of whole-scene snapshots with a cursor at the state the
//! editor currently shows. Each completed user action pushes one snapshot;
//! gestures push once at the end, never per frame.
//!
//! Snapshots are plain `Scene` clones (O(n) per entry). Restoring
//! recomputes derived geometry so a restored scene never carries stale
//! connection points.

use fb_core::scene::Scene;
use std::collections::VecDeque;

/// Snapshot-based undo/redo stack.
#[derive(Debug, Clone)]
pub struct History {
    snapshots: VecDeque<Scene>,
    /// Index of the snapshot matching the live scene.
    cursor: usize,
    capacity: usize,
}

impl History {
    /// An empty history. Call [`History::reset`] with the starting scene
    /// so the first edit can be undone.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            snapshots: VecDeque::with_capacity(capacity),
            cursor: 0,
            capacity,
        }
    }

    /// Forget everything and start from `scene`.
    pub fn reset(&mut self, scene: &Scene) {
        self.snapshots.clear();
        self.snapshots.push_back(scene.clone());
        self.cursor = 0;
    }

    /// Record `scene` as the newest state. Prunes the redo branch and
    /// evicts the oldest snapshot beyond capacity.
    pub fn snapshot(&mut self, scene: &Scene) {
        if !self.snapshots.is_empty() {
            self.snapshots.truncate(self.cursor + 1);
        }
        self.snapshots.push_back(scene.clone());
        if self.snapshots.len() > self.capacity {
            self.snapshots.pop_front();
        }
        self.cursor = self.snapshots.len() - 1;
        log::trace!("snapshot {}/{}", self.cursor + 1, self.snapshots.len());
    }

    /// Step back. Returns the scene to restore, or `None` at the oldest
    /// snapshot.
    pub fn undo(&mut self) -> Option<Scene> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        self.restore()
    }

    /// Step forward. Returns the scene to restore, or `None` at the newest
    /// snapshot.
    pub fn redo(&mut self) -> Option<Scene> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        self.restore()
    }

    fn restore(&self) -> Option<Scene> {
        let mut scene = self.snapshots.get(self.cursor)?.clone();
        scene.refresh_geometry();
        Some(scene)
    }

    /// The snapshot the cursor points at.
    pub fn current(&self) -> Option<&Scene> {
        self.snapshots.get(self.cursor)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fb_core::geometry::Point;
    use fb_core::model::ElementKind;

    fn scene_with(n: usize) -> Scene {
        let mut scene = Scene::new();
        for i in 0..n {
            scene.add_element(ElementKind::Action, Point::new(0.0, i as f64 * 100.0));
        }
        scene
    }

    #[test]
    fn undo_redo_walks_the_cursor() {
        let mut h = History::new(10);
        h.reset(&scene_with(0));
        h.snapshot(&scene_with(1));
        h.snapshot(&scene_with(2));
        assert_eq!(h.len(), 3);
        assert!(h.can_undo());
        assert!(!h.can_redo());

        assert_eq!(h.undo().map(|s| s.elements().len()), Some(1));
        assert_eq!(h.undo().map(|s| s.elements().len()), Some(0));
        assert!(h.undo().is_none());
        assert_eq!(h.redo().map(|s| s.elements().len()), Some(1));
    }

    #[test]
    fn new_snapshot_prunes_redo_branch() {
        let mut h = History::new(10);
        h.reset(&scene_with(0));
        h.snapshot(&scene_with(1));
        h.snapshot(&scene_with(2));
        h.undo();
        h.snapshot(&scene_with(3));
        assert_eq!(h.len(), 3);
        assert!(!h.can_redo());
        assert_eq!(h.current().map(|s| s.elements().len()), Some(3));
    }

    #[test]
    fn capacity_evicts_oldest() {
        let mut h = History::new(3);
        h.reset(&scene_with(0));
        for n in 1..=5 {
            h.snapshot(&scene_with(n));
        }
        assert_eq!(h.len(), 3);
        assert_eq!(h.cursor(), 2);
        h.undo();
        assert_eq!(h.undo().map(|s| s.elements().len()), Some(3));
        assert!(!h.can_undo());
    }

    #[test]
    fn zero_capacity_keeps_one() {
        let mut h = History::new(0);
        h.snapshot(&scene_with(1));
        h.snapshot(&scene_with(2));
        assert_eq!(h.len(), 1);
        assert!(!h.can_undo());
    }
}
