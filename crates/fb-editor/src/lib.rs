pub mod controller;
pub mod documents;
pub mod history;
pub mod input;
pub mod observer;
pub mod selection;
pub mod shortcuts;
pub mod viewport;

pub use controller::{Controller, Mode, ParkedDocument, Tool};
pub use documents::{DocumentInfo, DocumentSet};
pub use history::History;
pub use input::{InputEvent, Modifiers, PointerButton};
pub use observer::{EditorObserver, Notice, RecordingObserver, ViewState};
pub use selection::Selection;
pub use shortcuts::{Direction, ShortcutAction, ShortcutMap};
pub use viewport::Viewport;
