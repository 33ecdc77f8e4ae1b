//! Ordered selection set.
//!
//! The most recently added element is the primary selection: its
//! connection points are shown and grabbed to start a connection.

use fb_core::id::ObjectId;
use fb_core::scene::Scene;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    ids: Vec<ObjectId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(&self) -> &[ObjectId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.ids.contains(&id)
    }

    /// Last selected element.
    pub fn primary(&self) -> Option<ObjectId> {
        self.ids.last().copied()
    }

    /// The only selected element, if exactly one is selected.
    pub fn single(&self) -> Option<ObjectId> {
        match self.ids.as_slice() {
            [id] => Some(*id),
            _ => None,
        }
    }

    pub fn replace(&mut self, id: ObjectId) {
        self.ids.clear();
        self.ids.push(id);
    }

    pub fn set(&mut self, ids: impl IntoIterator<Item = ObjectId>) {
        self.ids.clear();
        self.extend(ids);
    }

    /// Add ids not already selected, keeping order.
    pub fn extend(&mut self, ids: impl IntoIterator<Item = ObjectId>) {
        for id in ids {
            if !self.ids.contains(&id) {
                self.ids.push(id);
            }
        }
    }

    /// Add `id`, or remove it when already selected.
    pub fn toggle(&mut self, id: ObjectId) {
        if let Some(pos) = self.ids.iter().position(|s| *s == id) {
            self.ids.remove(pos);
        } else {
            self.ids.push(id);
        }
    }

    pub fn clear(&mut self) -> bool {
        let had = !self.ids.is_empty();
        self.ids.clear();
        had
    }

    /// Drop ids that no longer resolve in `scene`.
    pub fn retain_existing(&mut self, scene: &Scene) {
        self.ids.retain(|id| scene.contains_element(*id));
    }

    /// Selected ids whose layer allows editing.
    pub fn editable(&self, scene: &Scene) -> Vec<ObjectId> {
        self.ids
            .iter()
            .copied()
            .filter(|id| scene.is_editable(*id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fb_core::geometry::Point;
    use fb_core::model::ElementKind;

    #[test]
    fn primary_is_last_selected() {
        let a = ObjectId::intern("sel_a");
        let b = ObjectId::intern("sel_b");
        let mut sel = Selection::new();
        sel.replace(a);
        sel.toggle(b);
        assert_eq!(sel.primary(), Some(b));
        assert_eq!(sel.single(), None);
        sel.toggle(b);
        assert_eq!(sel.ids(), &[a]);
        assert_eq!(sel.single(), Some(a));
    }

    #[test]
    fn extend_skips_duplicates() {
        let a = ObjectId::intern("sel_c");
        let mut sel = Selection::new();
        sel.set([a, a]);
        sel.extend([a]);
        assert_eq!(sel.len(), 1);
        assert!(sel.clear());
        assert!(!sel.clear());
    }

    #[test]
    fn locked_and_missing_are_filtered() {
        let mut scene = Scene::new();
        let free = scene.add_element(ElementKind::Action, Point::ZERO).id;
        let pinned = scene.add_element(ElementKind::Action, Point::new(200.0, 0.0)).id;
        let layer = scene.add_layer("Pinned");
        scene.assign_layer(pinned, layer);
        scene.set_layer_locked(layer, true);

        let mut sel = Selection::new();
        sel.set([free, pinned, ObjectId::intern("sel_gone")]);
        assert_eq!(sel.editable(&scene), vec![free]);
        sel.retain_existing(&scene);
        assert_eq!(sel.ids(), &[free, pinned]);
    }
}
