//! Presentation state handed to the host.
//!
//! The controller never touches host UI. After each handled event it
//! builds a [`ViewState`] and passes it, along with any [`Notice`]s, to the
//! registered [`EditorObserver`].

use fb_core::id::ObjectId;
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;

/// Snapshot of everything a toolbar or status bar shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub element_count: usize,
    pub connection_count: usize,
    pub selection_count: usize,
    pub zoom_percent: u32,
    pub can_undo: bool,
    pub can_redo: bool,
    /// Unsaved changes since the last save or load.
    pub dirty: bool,
    pub methodology_subtitle: String,
}

/// One-off messages for the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Notice {
    /// Export of a scene with no visible elements.
    NothingToExport,
    /// The only remaining layer cannot be deleted.
    LayerDeleteRejected,
    /// Double-click on an element: the host should open a label editor.
    EditLabel { id: String, label: String },
    /// Markdown import finished with skipped lines.
    ImportWarnings { warnings: Vec<String> },
    /// A JSON document failed to load.
    LoadFailed { message: String },
}

impl Notice {
    pub fn edit_label(id: ObjectId, label: &str) -> Self {
        Notice::EditLabel {
            id: id.as_str().to_string(),
            label: label.to_string(),
        }
    }
}

/// Receives view-state updates and notices.
pub trait EditorObserver {
    fn view_changed(&mut self, state: &ViewState);

    fn notify(&mut self, _notice: &Notice) {}
}

/// Shared observers: the host keeps one handle, the controller the other.
impl<T: EditorObserver> EditorObserver for Rc<RefCell<T>> {
    fn view_changed(&mut self, state: &ViewState) {
        self.borrow_mut().view_changed(state);
    }

    fn notify(&mut self, notice: &Notice) {
        self.borrow_mut().notify(notice);
    }
}

/// Observer that keeps everything it receives. Handy in tests and for
/// hosts that poll instead of subscribing.
#[derive(Debug, Default, Clone)]
pub struct RecordingObserver {
    pub last: Option<ViewState>,
    pub updates: usize,
    pub notices: Vec<Notice>,
}

impl EditorObserver for RecordingObserver {
    fn view_changed(&mut self, state: &ViewState) {
        self.last = Some(state.clone());
        self.updates += 1;
    }

    fn notify(&mut self, notice: &Notice) {
        self.notices.push(notice.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notices_serialize_tagged() {
        let json = serde_json::to_string(&Notice::edit_label(ObjectId::intern("el_9"), "Pay"))
            .unwrap();
        assert_eq!(json, r#"{"kind":"editLabel","id":"el_9","label":"Pay"}"#);
        let json = serde_json::to_string(&Notice::NothingToExport).unwrap();
        assert_eq!(json, r#"{"kind":"nothingToExport"}"#);
    }
}
