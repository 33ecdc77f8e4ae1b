//! Several open documents behind one controller.
//!
//! Only the active document lives in the controller. The others are
//! parked here with their own history, so switching back restores undo.

use crate::controller::{Controller, ParkedDocument};
use fb_core::id::ObjectId;
use fb_core::model::{DiagramType, Metadata};
use serde::Serialize;

/// Listing entry for a document tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentInfo {
    pub id: String,
    pub title: String,
    pub diagram_type: DiagramType,
    pub active: bool,
}

struct Slot {
    id: ObjectId,
    /// `None` while the document is live in the controller.
    parked: Option<ParkedDocument>,
}

pub struct DocumentSet {
    slots: Vec<Slot>,
    active: usize,
}

impl DocumentSet {
    /// Track the document currently open in `controller`.
    pub fn new() -> Self {
        Self {
            slots: vec![Slot {
                id: ObjectId::with_prefix("doc"),
                parked: None,
            }],
            active: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn active_id(&self) -> ObjectId {
        self.slots[self.active].id
    }

    /// Open a blank document and make it active.
    pub fn create(&mut self, controller: &mut Controller, title: &str, diagram_type: DiagramType) -> ObjectId {
        self.park(controller);
        let metadata = Metadata {
            flow_title: if title.trim().is_empty() {
                Metadata::default().flow_title
            } else {
                title.trim().to_string()
            },
            diagram_type,
            ..Metadata::default()
        };
        controller.new_document(metadata);
        let id = ObjectId::with_prefix("doc");
        self.slots.push(Slot { id, parked: None });
        self.active = self.slots.len() - 1;
        log::debug!("opened document {id}");
        id
    }

    /// Make `id` the live document. Returns false for unknown ids.
    pub fn switch(&mut self, controller: &mut Controller, id: ObjectId) -> bool {
        let Some(idx) = self.slots.iter().position(|s| s.id == id) else {
            return false;
        };
        if idx == self.active {
            return true;
        }
        self.park(controller);
        self.activate(controller, idx);
        true
    }

    /// Close a document. The last open document cannot be closed; closing
    /// the active one activates its neighbour.
    pub fn close(&mut self, controller: &mut Controller, id: ObjectId) -> bool {
        if self.slots.len() <= 1 {
            return false;
        }
        let Some(idx) = self.slots.iter().position(|s| s.id == id) else {
            return false;
        };
        if idx == self.active {
            // Discard the live document, then bring in the neighbour.
            let _ = controller.take_document();
            self.slots.remove(idx);
            self.activate(controller, idx.min(self.slots.len() - 1));
        } else {
            self.slots.remove(idx);
            if idx < self.active {
                self.active -= 1;
            }
        }
        true
    }

    /// Tabs in opening order.
    pub fn list(&self, controller: &Controller) -> Vec<DocumentInfo> {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, slot)| {
                let metadata = match &slot.parked {
                    Some(parked) => &parked.scene.metadata,
                    None => &controller.scene().metadata,
                };
                DocumentInfo {
                    id: slot.id.as_str().to_string(),
                    title: metadata.flow_title.clone(),
                    diagram_type: metadata.diagram_type,
                    active: i == self.active,
                }
            })
            .collect()
    }

    fn park(&mut self, controller: &mut Controller) {
        let parked = controller.take_document();
        self.slots[self.active].parked = Some(parked);
    }

    fn activate(&mut self, controller: &mut Controller, idx: usize) {
        self.active = idx;
        if let Some(parked) = self.slots[idx].parked.take() {
            controller.restore_document(parked);
        }
    }
}

impl Default for DocumentSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fb_core::config::EditorConfig;
    use fb_core::geometry::Point;
    use fb_core::model::ElementKind;

    fn controller() -> Controller {
        Controller::new(EditorConfig::default(), 800.0, 600.0)
    }

    #[test]
    fn switching_keeps_scene_and_history() {
        let mut ctl = controller();
        let mut docs = DocumentSet::new();
        let first = docs.active_id();
        ctl.drop_element(ElementKind::Start, Point::new(100.0, 100.0));

        let second = docs.create(&mut ctl, "Refunds", DiagramType::Sequence);
        assert!(ctl.scene().is_empty());
        assert_eq!(ctl.scene().metadata.flow_title, "Refunds");
        assert!(!ctl.history().can_undo());

        assert!(docs.switch(&mut ctl, first));
        assert_eq!(ctl.scene().elements().len(), 1);
        assert!(ctl.undo());
        assert!(ctl.scene().is_empty());

        let tabs = docs.list(&ctl);
        assert_eq!(tabs.len(), 2);
        assert!(tabs[0].active);
        assert_eq!(tabs[1].title, "Refunds");
        assert_eq!(tabs[1].id, second.as_str());
    }

    #[test]
    fn close_rules() {
        let mut ctl = controller();
        let mut docs = DocumentSet::new();
        let first = docs.active_id();
        assert!(!docs.close(&mut ctl, first));

        ctl.drop_element(ElementKind::Action, Point::new(200.0, 200.0));
        let second = docs.create(&mut ctl, "", DiagramType::Flowchart);
        assert_eq!(ctl.scene().metadata.flow_title, "Untitled Flow");
        assert!(docs.close(&mut ctl, second));
        assert_eq!(docs.len(), 1);
        assert_eq!(docs.active_id(), first);
        assert_eq!(ctl.scene().elements().len(), 1);
        assert!(!docs.switch(&mut ctl, second));
    }

    #[test]
    fn unsaved_flag_travels_with_its_document() {
        let mut ctl = controller();
        let mut docs = DocumentSet::new();
        let first = docs.active_id();
        ctl.drop_element(ElementKind::Note, Point::new(100.0, 100.0));
        assert!(ctl.is_dirty());

        let second = docs.create(&mut ctl, "Clean", DiagramType::Flowchart);
        assert!(!ctl.is_dirty());

        assert!(docs.switch(&mut ctl, first));
        assert!(ctl.is_dirty());
        assert!(docs.switch(&mut ctl, second));
        assert!(!ctl.is_dirty());
    }
}
