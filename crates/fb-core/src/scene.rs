//! The scene aggregate and its mutation API.
//!
//! Every mutating call validates up front, applies its change, then
//! recomputes connection points and re-anchors affected connections before
//! returning. Rejected input (unknown ids, self-connections, deleting the
//! last layer) is a no-op reported through the return value, never an error.

use crate::geometry::{Bounds, Point, Rect, bounds_of, closest_point_pair, snap_to_grid};
use crate::id::ObjectId;
use crate::model::{
    ArrowKind, CONNECTION_COLOR, Connection, Element, ElementKind, ElementStyle, Layer, LineStyle,
    Metadata,
};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Where [`Scene::reorder`] moves an element in paint order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZOrder {
    Front,
    Back,
}

/// One diagram document: elements in paint order (last is topmost),
/// connections, layers and metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub(crate) elements: Vec<Element>,
    pub(crate) connections: Vec<Connection>,
    pub(crate) layers: Vec<Layer>,
    pub(crate) active_layer: ObjectId,
    pub metadata: Metadata,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self::with_metadata(Metadata::default())
    }

    pub fn with_metadata(metadata: Metadata) -> Self {
        Self {
            elements: Vec::new(),
            connections: Vec::new(),
            layers: vec![Layer::base()],
            active_layer: Layer::default_id(),
            metadata,
        }
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    /// Elements in paint order.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn element(&self, id: ObjectId) -> Option<&Element> {
        self.elements.iter().find(|e| e.id == id)
    }

    pub fn contains_element(&self, id: ObjectId) -> bool {
        self.element(id).is_some()
    }

    pub fn element_ids(&self) -> Vec<ObjectId> {
        self.elements.iter().map(|e| e.id).collect()
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn connection(&self, id: ObjectId) -> Option<&Connection> {
        self.connections.iter().find(|c| c.id == id)
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, id: ObjectId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn active_layer(&self) -> ObjectId {
        self.active_layer
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Whether the element's layer is shown. Elements on unknown layers
    /// count as visible.
    pub fn is_visible(&self, element: &Element) -> bool {
        self.layer(element.layer).is_none_or(|l| l.visible)
    }

    /// Whether the element exists and its layer is not locked.
    pub fn is_editable(&self, id: ObjectId) -> bool {
        self.element(id)
            .is_some_and(|e| self.layer(e.layer).is_none_or(|l| !l.locked))
    }

    /// Visible elements in paint order.
    pub fn visible_elements(&self) -> impl DoubleEndedIterator<Item = &Element> {
        self.elements.iter().filter(|e| self.is_visible(e))
    }

    /// Extent of the visible elements, or the default extent when none.
    pub fn content_bounds(&self) -> Bounds {
        bounds_of(self.visible_elements().map(Element::bounds))
    }

    /// Elements grouped by their business-outcome tag.
    pub fn outcomes(&self) -> BTreeMap<String, Vec<ObjectId>> {
        let mut map: BTreeMap<String, Vec<ObjectId>> = BTreeMap::new();
        for el in &self.elements {
            if let Some(outcome) = el.annotation.as_deref()
                && !outcome.trim().is_empty()
            {
                map.entry(outcome.trim().to_string())
                    .or_default()
                    .push(el.id);
            }
        }
        map
    }

    /// A fresh id with `prefix` that nothing in this scene uses.
    pub fn fresh_id(&self, prefix: &str) -> ObjectId {
        loop {
            let id = ObjectId::with_prefix(prefix);
            let taken = self.elements.iter().any(|e| e.id == id)
                || self.connections.iter().any(|c| c.id == id)
                || self.layers.iter().any(|l| l.id == id);
            if !taken {
                return id;
            }
        }
    }

    fn index_of(&self, id: ObjectId) -> Option<usize> {
        self.elements.iter().position(|e| e.id == id)
    }

    // ─── Elements ────────────────────────────────────────────────────────

    /// Add an element of `kind` with its defaults, top-left at `position`,
    /// on the active layer, in front of everything else.
    pub fn add_element(&mut self, kind: ElementKind, position: Point) -> &Element {
        let id = self.fresh_id("el");
        let el = Element::new(id, kind, position, self.active_layer);
        log::debug!("add {} {id} at ({}, {})", kind.name(), position.x, position.y);
        self.elements.push(el);
        &self.elements[self.elements.len() - 1]
    }

    /// Translate one element. See [`Scene::move_elements`].
    pub fn move_element(&mut self, id: ObjectId, delta: Point, grid: Option<f64>) -> bool {
        self.move_elements(&[id], delta, grid)
    }

    /// Translate elements by `delta`, snapping each axis of the result to
    /// `grid` when given. Unknown ids are skipped. Returns whether anything
    /// moved.
    pub fn move_elements(&mut self, ids: &[ObjectId], delta: Point, grid: Option<f64>) -> bool {
        let targets: Vec<(ObjectId, Point)> = ids
            .iter()
            .filter_map(|id| self.element(*id))
            .map(|e| (e.id, e.position().offset(delta.x, delta.y)))
            .collect();
        self.set_positions(&targets, grid)
    }

    /// Put elements at absolute positions (snapped when `grid` is given).
    /// Used by drags that track their own origin. Returns whether anything
    /// moved.
    pub fn set_positions(&mut self, targets: &[(ObjectId, Point)], grid: Option<f64>) -> bool {
        let mut moved = Vec::new();
        for (id, pos) in targets {
            let Some(idx) = self.index_of(*id) else {
                continue;
            };
            let pos = match grid {
                Some(g) => Point::new(snap_to_grid(pos.x, g), snap_to_grid(pos.y, g)),
                None => *pos,
            };
            if !pos.x.is_finite() || !pos.y.is_finite() {
                continue;
            }
            let el = &mut self.elements[idx];
            if el.position() != pos {
                el.set_position(pos);
                moved.push(*id);
            }
        }
        self.update_connections(&moved);
        !moved.is_empty()
    }

    /// Resize, clamping to the kind's minimum size.
    pub fn resize_element(&mut self, id: ObjectId, width: f64, height: f64) -> bool {
        let Some(idx) = self.index_of(id) else {
            return false;
        };
        let el = &mut self.elements[idx];
        let before = el.bounds();
        el.set_size(width, height);
        let changed = el.bounds() != before;
        self.update_connections(&[id]);
        changed
    }

    /// Set position and size together (size floor-clamped).
    pub fn set_element_bounds(&mut self, id: ObjectId, bounds: Rect) -> bool {
        let Some(idx) = self.index_of(id) else {
            return false;
        };
        if !bounds.x.is_finite() || !bounds.y.is_finite() {
            return false;
        }
        let el = &mut self.elements[idx];
        let before = el.bounds();
        el.x = bounds.x;
        el.y = bounds.y;
        el.set_size(bounds.width, bounds.height);
        let changed = el.bounds() != before;
        self.update_connections(&[id]);
        changed
    }

    /// Remove elements and every connection touching them.
    /// Returns how many elements were removed.
    pub fn delete_elements(&mut self, ids: &[ObjectId]) -> usize {
        let doomed: HashSet<ObjectId> = ids.iter().copied().collect();
        let before = self.elements.len();
        self.elements.retain(|e| !doomed.contains(&e.id));
        let removed = before - self.elements.len();
        if removed > 0 {
            let conn_before = self.connections.len();
            self.connections.retain(|c| {
                !doomed.contains(&c.start_element_id) && !doomed.contains(&c.end_element_id)
            });
            log::debug!(
                "deleted {removed} element(s), {} connection(s)",
                conn_before - self.connections.len()
            );
        }
        removed
    }

    /// Move an element to the front or back of paint order.
    pub fn reorder(&mut self, id: ObjectId, to: ZOrder) -> bool {
        let Some(idx) = self.index_of(id) else {
            return false;
        };
        let el = self.elements.remove(idx);
        match to {
            ZOrder::Front => self.elements.push(el),
            ZOrder::Back => self.elements.insert(0, el),
        }
        true
    }

    pub fn set_label(&mut self, id: ObjectId, label: &str) -> bool {
        match self.index_of(id) {
            Some(idx) if self.elements[idx].label != label => {
                self.elements[idx].label = label.to_string();
                true
            }
            _ => false,
        }
    }

    /// Replace an element's style (values clamped to their ranges).
    pub fn set_style(&mut self, id: ObjectId, mut style: ElementStyle) -> bool {
        style.sanitize();
        match self.index_of(id) {
            Some(idx) if self.elements[idx].style != style => {
                self.elements[idx].style = style;
                true
            }
            _ => false,
        }
    }

    pub fn set_annotation(&mut self, id: ObjectId, annotation: Option<String>) -> bool {
        let annotation = annotation.filter(|a| !a.trim().is_empty());
        match self.index_of(id) {
            Some(idx) if self.elements[idx].annotation != annotation => {
                self.elements[idx].annotation = annotation;
                true
            }
            _ => false,
        }
    }

    /// Copy elements (style, label, annotation) shifted by `offset`.
    /// Connections between two copied elements are copied too.
    /// Returns the new ids in the order given.
    pub fn duplicate_elements(&mut self, ids: &[ObjectId], offset: Point) -> Vec<ObjectId> {
        let mut mapping: HashMap<ObjectId, ObjectId> = HashMap::new();
        let mut created = Vec::new();
        for id in ids {
            if mapping.contains_key(id) {
                continue;
            }
            let Some(src) = self.element(*id).cloned() else {
                continue;
            };
            let new_id = self.fresh_id("el");
            let mut copy = src;
            copy.id = new_id;
            copy.set_position(copy.position().offset(offset.x, offset.y));
            self.elements.push(copy);
            mapping.insert(*id, new_id);
            created.push(new_id);
        }

        let copied: Vec<Connection> = self
            .connections
            .iter()
            .filter_map(|c| {
                let start = *mapping.get(&c.start_element_id)?;
                let end = *mapping.get(&c.end_element_id)?;
                Some((c.clone(), start, end))
            })
            .map(|(mut c, start, end)| {
                c.start_element_id = start;
                c.end_element_id = end;
                c
            })
            .collect();
        for mut c in copied {
            c.id = self.fresh_id("conn");
            self.connections.push(c);
        }
        self.update_connections(&created);
        created
    }

    /// Remove every element and connection. Layers and metadata stay.
    pub fn clear(&mut self) {
        self.elements.clear();
        self.connections.clear();
    }

    // ─── Connections ─────────────────────────────────────────────────────

    /// Connect two distinct elements through their closest connection-point
    /// pair. Self-connections and unknown ids are rejected.
    pub fn create_connection(&mut self, start: ObjectId, end: ObjectId) -> Option<&Connection> {
        if start == end {
            log::debug!("rejected self-connection on {start}");
            return None;
        }
        let a = self.element(start)?;
        let b = self.element(end)?;
        let (start_point, end_point) =
            closest_point_pair(a.connection_points(), b.connection_points())?;
        let conn = Connection {
            id: self.fresh_id("conn"),
            start_element_id: start,
            end_element_id: end,
            start_point,
            end_point,
            label: String::new(),
            line_style: LineStyle::Solid,
            arrow_kind: ArrowKind::Arrow,
            color: CONNECTION_COLOR,
            width: 2.0,
        };
        self.connections.push(conn);
        self.connections.last()
    }

    /// Re-anchor every connection touching one of `moved`.
    pub fn update_connections(&mut self, moved: &[ObjectId]) {
        if moved.is_empty() {
            return;
        }
        let moved: HashSet<ObjectId> = moved.iter().copied().collect();
        let elements = &self.elements;
        let find = |id: ObjectId| elements.iter().find(|e| e.id == id);
        for conn in &mut self.connections {
            if !moved.contains(&conn.start_element_id) && !moved.contains(&conn.end_element_id) {
                continue;
            }
            if let (Some(a), Some(b)) = (find(conn.start_element_id), find(conn.end_element_id))
                && let Some((sp, ep)) =
                    closest_point_pair(a.connection_points(), b.connection_points())
            {
                conn.start_point = sp;
                conn.end_point = ep;
            }
        }
    }

    pub fn delete_connection(&mut self, id: ObjectId) -> bool {
        let before = self.connections.len();
        self.connections.retain(|c| c.id != id);
        self.connections.len() != before
    }

    pub fn set_connection_label(&mut self, id: ObjectId, label: &str) -> bool {
        match self.connections.iter_mut().find(|c| c.id == id) {
            Some(c) if c.label != label => {
                c.label = label.to_string();
                true
            }
            _ => false,
        }
    }

    pub fn set_connection_line(&mut self, id: ObjectId, line: LineStyle, arrow: ArrowKind) -> bool {
        match self.connections.iter_mut().find(|c| c.id == id) {
            Some(c) if (c.line_style, c.arrow_kind) != (line, arrow) => {
                c.line_style = line;
                c.arrow_kind = arrow;
                true
            }
            _ => false,
        }
    }

    /// Recompute every element's connection points and re-anchor every
    /// connection. Run after wholesale replacement (restore, load).
    pub fn refresh_geometry(&mut self) {
        for el in &mut self.elements {
            el.refresh_points();
        }
        let all = self.element_ids();
        self.update_connections(&all);
    }

    // ─── Layers ──────────────────────────────────────────────────────────

    pub fn add_layer(&mut self, name: &str) -> ObjectId {
        let id = self.fresh_id("layer");
        let name = if name.trim().is_empty() {
            format!("Layer {}", self.layers.len() + 1)
        } else {
            name.trim().to_string()
        };
        self.layers.push(Layer {
            id,
            name,
            visible: true,
            locked: false,
        });
        id
    }

    /// Delete a layer. The last remaining layer cannot be deleted. Members
    /// move to the default layer (or the first remaining one when the
    /// default layer itself goes); an active layer hands over to it too.
    pub fn delete_layer(&mut self, id: ObjectId) -> bool {
        if self.layers.len() <= 1 {
            log::warn!("refusing to delete the only layer");
            return false;
        }
        let Some(idx) = self.layers.iter().position(|l| l.id == id) else {
            return false;
        };
        self.layers.remove(idx);
        let fallback = self
            .layers
            .iter()
            .find(|l| l.id == Layer::default_id())
            .or_else(|| self.layers.first())
            .map(|l| l.id)
            .unwrap_or_else(Layer::default_id);
        for el in self.elements.iter_mut().filter(|e| e.layer == id) {
            el.layer = fallback;
        }
        if self.active_layer == id {
            self.active_layer = fallback;
        }
        true
    }

    pub fn set_active_layer(&mut self, id: ObjectId) -> bool {
        if self.layer(id).is_none() {
            return false;
        }
        self.active_layer = id;
        true
    }

    pub fn set_layer_visible(&mut self, id: ObjectId, visible: bool) -> bool {
        self.edit_layer(id, |l| l.visible = visible)
    }

    pub fn set_layer_locked(&mut self, id: ObjectId, locked: bool) -> bool {
        self.edit_layer(id, |l| l.locked = locked)
    }

    pub fn rename_layer(&mut self, id: ObjectId, name: &str) -> bool {
        self.edit_layer(id, |l| l.name = name.to_string())
    }

    fn edit_layer(&mut self, id: ObjectId, f: impl FnOnce(&mut Layer)) -> bool {
        match self.layers.iter_mut().find(|l| l.id == id) {
            Some(layer) => {
                f(layer);
                true
            }
            None => false,
        }
    }

    /// Move an element to another existing layer.
    pub fn assign_layer(&mut self, element: ObjectId, layer: ObjectId) -> bool {
        if self.layer(layer).is_none() {
            return false;
        }
        match self.index_of(element) {
            Some(idx) => {
                self.elements[idx].layer = layer;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn two_boxes() -> (Scene, ObjectId, ObjectId) {
        let mut scene = Scene::new();
        let a = scene.add_element(ElementKind::Start, Point::new(100.0, 100.0)).id;
        let b = scene.add_element(ElementKind::Action, Point::new(100.0, 250.0)).id;
        (scene, a, b)
    }

    fn assert_points_fresh(scene: &Scene) {
        for el in scene.elements() {
            let expected = el.kind.spec().ring.points(&el.bounds());
            assert_eq!(el.connection_points(), expected.as_slice());
        }
    }

    #[test]
    fn add_element_uses_active_layer_and_fresh_ids() {
        let (scene, a, b) = two_boxes();
        assert_ne!(a, b);
        assert_eq!(scene.elements().len(), 2);
        assert!(scene.elements().iter().all(|e| e.layer == Layer::default_id()));
    }

    #[test]
    fn connection_uses_closest_pair() {
        let (mut scene, a, b) = two_boxes();
        let conn = scene.create_connection(a, b).unwrap().clone();
        assert_eq!(conn.start_point, Point::new(160.0, 160.0));
        assert_eq!(conn.end_point, Point::new(170.0, 250.0));
        assert_eq!(conn.color, CONNECTION_COLOR);
        assert_eq!(conn.arrow_kind, ArrowKind::Arrow);
    }

    #[test]
    fn self_connection_rejected() {
        let (mut scene, a, _) = two_boxes();
        assert!(scene.create_connection(a, a).is_none());
        assert!(scene.connections().is_empty());
        assert!(
            scene
                .create_connection(a, ObjectId::intern("missing"))
                .is_none()
        );
    }

    #[test]
    fn move_recomputes_points_and_reanchors() {
        let (mut scene, a, b) = two_boxes();
        scene.create_connection(a, b);
        assert!(scene.move_element(b, Point::new(300.0, -150.0), None));
        assert_points_fresh(&scene);
        let conn = &scene.connections()[0];
        // b now sits to the right of a: east side to west side.
        assert_eq!(conn.start_point, Point::new(220.0, 130.0));
        assert_eq!(conn.end_point, Point::new(400.0, 130.0));
    }

    #[test]
    fn move_snaps_each_axis() {
        let (mut scene, a, _) = two_boxes();
        scene.move_element(a, Point::new(13.0, 27.0), Some(20.0));
        assert_eq!(scene.element(a).unwrap().position(), Point::new(120.0, 120.0));
    }

    #[test]
    fn resize_clamps_to_floor() {
        let (mut scene, a, _) = two_boxes();
        scene.resize_element(a, 5.0, 300.0);
        let el = scene.element(a).unwrap();
        assert_eq!((el.width(), el.height()), (20.0, 300.0));
        assert_points_fresh(&scene);
    }

    #[test]
    fn delete_cascades_to_connections() {
        let (mut scene, a, b) = two_boxes();
        let c = scene.add_element(ElementKind::End, Point::new(400.0, 250.0)).id;
        scene.create_connection(a, b);
        scene.create_connection(b, c);
        scene.create_connection(a, c);
        assert_eq!(scene.delete_elements(&[b]), 1);
        assert_eq!(scene.connections().len(), 1);
        assert!(
            scene
                .connections()
                .iter()
                .all(|conn| !conn.touches(b))
        );
        assert_eq!(scene.delete_elements(&[]), 0);
    }

    #[test]
    fn reorder_moves_to_ends() {
        let (mut scene, a, b) = two_boxes();
        scene.reorder(a, ZOrder::Front);
        assert_eq!(scene.element_ids(), vec![b, a]);
        scene.reorder(a, ZOrder::Back);
        assert_eq!(scene.element_ids(), vec![a, b]);
    }

    #[test]
    fn duplicate_copies_inner_connections() {
        let (mut scene, a, b) = two_boxes();
        let c = scene.add_element(ElementKind::End, Point::new(400.0, 400.0)).id;
        scene.create_connection(a, b);
        scene.create_connection(b, c);
        let copies = scene.duplicate_elements(&[a, b], Point::new(20.0, 20.0));
        assert_eq!(copies.len(), 2);
        assert_eq!(scene.elements().len(), 5);
        assert_eq!(
            scene.element(copies[0]).unwrap().position(),
            Point::new(120.0, 120.0)
        );
        // a->b copied, b->c not.
        assert_eq!(scene.connections().len(), 3);
        let copied = &scene.connections()[2];
        assert_eq!(copied.start_element_id, copies[0]);
        assert_eq!(copied.end_element_id, copies[1]);
    }

    #[test]
    fn deleting_active_layer_reassigns_members() {
        let mut scene = Scene::new();
        let layer = scene.add_layer("Annotations");
        scene.set_active_layer(layer);
        let note = scene.add_element(ElementKind::Note, Point::ZERO).id;
        assert_eq!(scene.element(note).unwrap().layer, layer);

        assert!(scene.delete_layer(layer));
        assert_eq!(scene.layers().len(), 1);
        assert_eq!(scene.active_layer(), Layer::default_id());
        assert_eq!(scene.element(note).unwrap().layer, Layer::default_id());
    }

    #[test]
    fn last_layer_cannot_be_deleted() {
        let mut scene = Scene::new();
        assert!(!scene.delete_layer(Layer::default_id()));
        assert_eq!(scene.layers().len(), 1);
    }

    #[test]
    fn deleting_default_layer_falls_back_to_remaining() {
        let mut scene = Scene::new();
        let el = scene.add_element(ElementKind::Text, Point::ZERO).id;
        let other = scene.add_layer("");
        assert_eq!(scene.layer(other).unwrap().name, "Layer 2");
        assert!(scene.delete_layer(Layer::default_id()));
        assert_eq!(scene.element(el).unwrap().layer, other);
        assert_eq!(scene.active_layer(), other);
    }

    #[test]
    fn hidden_and_locked_layers() {
        let mut scene = Scene::new();
        let layer = scene.add_layer("Hidden");
        scene.set_active_layer(layer);
        let el = scene.add_element(ElementKind::Circle, Point::ZERO).id;
        scene.set_layer_visible(layer, false);
        assert_eq!(scene.visible_elements().count(), 0);
        assert_eq!(scene.content_bounds(), Bounds::EMPTY_DEFAULT);
        scene.set_layer_locked(layer, true);
        assert!(!scene.is_editable(el));
    }

    #[test]
    fn outcomes_group_by_tag() {
        let (mut scene, a, b) = two_boxes();
        scene.set_annotation(a, Some("Paid".into()));
        scene.set_annotation(b, Some("Paid".into()));
        assert!(!scene.set_annotation(b, Some("Paid".into())));
        let outcomes = scene.outcomes();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes["Paid"], vec![a, b]);
    }

    #[test]
    fn style_edits_are_clamped() {
        let (mut scene, a, _) = two_boxes();
        let mut style = scene.element(a).unwrap().style.clone();
        style.opacity = 250;
        style.border_width = -3.0;
        assert!(scene.set_style(a, style));
        let el = scene.element(a).unwrap();
        assert_eq!(el.style.opacity, 100);
        assert_eq!(el.style.border_width, 0.0);
    }
}
