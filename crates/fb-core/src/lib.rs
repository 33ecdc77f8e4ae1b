pub mod config;
pub mod document;
pub mod emitter;
pub mod geometry;
pub mod id;
pub mod layout;
pub mod model;
pub mod parser;
pub mod scene;

pub use config::EditorConfig;
pub use document::{DocumentError, load_document, save_document};
pub use emitter::{emit_behavior_flow, emit_markdown, emit_mermaid};
pub use geometry::{Bounds, HitShape, Point, Rect, RingPolicy};
pub use id::ObjectId;
pub use model::*;
pub use parser::{ImportResult, ParseError, ParseOptions, parse_markdown};
pub use scene::{Scene, ZOrder};
