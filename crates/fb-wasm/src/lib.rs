//! WASM bridge for Flowboard: exposes the editor controller to JavaScript.
//!
//! Compiled via `wasm-pack build --target web`. The host forwards DOM
//! events with screen coordinates and flattened modifier flags, calls
//! `render` when `take_redraw` says so, and receives view-state updates
//! through a JS callback.

mod canvas2d;

use canvas2d::Canvas2dSurface;
use fb_core::config::EditorConfig;
use fb_core::geometry::Point;
use fb_core::id::ObjectId;
use fb_core::model::{DiagramType, ElementKind, ElementStyle, Metadata};
use fb_core::parser::ParseOptions;
use fb_editor::{
    Controller, DocumentSet, EditorObserver, InputEvent, Modifiers, Notice, PointerButton,
    ShortcutAction, ShortcutMap, Tool, ViewState,
};
use fb_render::Background;
use serde::Serialize;
use wasm_bindgen::prelude::*;
use web_sys::CanvasRenderingContext2d;

/// The main WASM-facing canvas controller.
///
/// Holds the live controller and the parked documents. All interaction
/// from the page goes through this struct.
#[wasm_bindgen]
pub struct FbCanvas {
    controller: Controller,
    documents: DocumentSet,
}

#[wasm_bindgen]
impl FbCanvas {
    /// Create a canvas controller for a viewport of the given size.
    #[wasm_bindgen(constructor)]
    pub fn new(width: f64, height: f64) -> Self {
        console_error_panic_hook_setup();
        Self {
            controller: Controller::new(EditorConfig::default(), width, height),
            documents: DocumentSet::new(),
        }
    }

    /// Update the canvas size (CSS pixels).
    pub fn resize(&mut self, width: f64, height: f64) {
        self.controller.resize_viewport(width, height);
    }

    /// Register a callback receiving JSON messages:
    /// `{"type":"view", ...}` after every handled event and
    /// `{"type":"notice","kind":...}` for one-off notices.
    pub fn set_observer(&mut self, callback: js_sys::Function) {
        self.controller
            .set_observer(Box::new(JsObserver { callback }));
    }

    /// Render the current frame to a Canvas2D context.
    pub fn render(&self, ctx: &CanvasRenderingContext2d) {
        let viewport = self.controller.viewport();
        let mut surface = Canvas2dSurface::new(ctx);
        surface.clear(viewport.width, viewport.height);
        self.controller.render(&mut surface);
    }

    /// Whether anything changed since the last call.
    pub fn take_redraw(&mut self) -> bool {
        self.controller.take_redraw()
    }

    // ─── Pointer ─────────────────────────────────────────────────────────

    /// Handle pointer down. `button` is the DOM `MouseEvent.button`.
    #[allow(clippy::too_many_arguments)]
    pub fn handle_pointer_down(
        &mut self,
        x: f64,
        y: f64,
        button: i16,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
    ) -> bool {
        self.controller.handle(&InputEvent::PointerDown {
            x,
            y,
            button: PointerButton::from_dom(button),
            modifiers: Modifiers {
                shift,
                ctrl,
                alt,
                meta,
            },
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn handle_pointer_move(
        &mut self,
        x: f64,
        y: f64,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
    ) -> bool {
        self.controller.handle(&InputEvent::PointerMove {
            x,
            y,
            modifiers: Modifiers {
                shift,
                ctrl,
                alt,
                meta,
            },
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn handle_pointer_up(
        &mut self,
        x: f64,
        y: f64,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
    ) -> bool {
        self.controller.handle(&InputEvent::PointerUp {
            x,
            y,
            modifiers: Modifiers {
                shift,
                ctrl,
                alt,
                meta,
            },
        })
    }

    pub fn handle_double_click(&mut self, x: f64, y: f64) -> bool {
        self.controller.handle(&InputEvent::DoubleClick { x, y })
    }

    pub fn handle_wheel(&mut self, x: f64, y: f64, delta_y: f64) -> bool {
        self.controller.handle(&InputEvent::Wheel { x, y, delta_y })
    }

    // ─── Keyboard ────────────────────────────────────────────────────────

    /// Handle a key press.
    ///
    /// Returns JSON: `{"changed":bool,"action":"name"}` where `action` is
    /// empty when the key is not bound. The host calls `preventDefault`
    /// whenever `action` is non-empty.
    pub fn handle_key(&mut self, key: &str, shift: bool, ctrl: bool, alt: bool, meta: bool) -> String {
        let modifiers = Modifiers {
            shift,
            ctrl,
            alt,
            meta,
        };
        let action = ShortcutMap::resolve(key, ctrl, shift, alt, meta)
            .map(action_name)
            .unwrap_or("");
        let changed = self
            .controller
            .handle(&InputEvent::key(key, modifiers));
        format!(r#"{{"changed":{changed},"action":"{action}"}}"#)
    }

    pub fn handle_key_up(&mut self, key: &str) -> bool {
        self.controller.handle(&InputEvent::KeyUp {
            key: key.to_string(),
        })
    }

    // ─── Tools & commands ────────────────────────────────────────────────

    /// `"select"` or an element kind name (`"action"`, `"decision"`, …).
    pub fn set_tool(&mut self, name: &str) -> bool {
        let tool = match name {
            "select" => Tool::Select,
            other => match ElementKind::from_name(other) {
                Some(kind) => Tool::Place(kind),
                None => {
                    log_error(&format!("unknown tool: {other}"));
                    return false;
                }
            },
        };
        self.controller.set_tool(tool)
    }

    pub fn get_tool_name(&self) -> String {
        match self.controller.tool() {
            Tool::Select => "select".to_string(),
            Tool::Place(kind) => kind.name().to_string(),
        }
    }

    /// Palette drop at a screen point. Returns the new element id, or an
    /// empty string for an unknown kind.
    pub fn drop_element(&mut self, kind: &str, x: f64, y: f64) -> String {
        match ElementKind::from_name(kind) {
            Some(kind) => self
                .controller
                .drop_element(kind, Point::new(x, y))
                .as_str()
                .to_string(),
            None => {
                log_error(&format!("unknown element kind: {kind}"));
                String::new()
            }
        }
    }

    pub fn undo(&mut self) -> bool {
        self.controller.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.controller.redo()
    }

    pub fn delete_selected(&mut self) -> bool {
        self.controller.delete_selection()
    }

    pub fn duplicate_selected(&mut self) -> bool {
        self.controller.duplicate_selection()
    }

    pub fn fit_to_view(&mut self) -> bool {
        self.controller.fit_to_view()
    }

    pub fn zoom_in(&mut self) -> bool {
        self.controller.zoom_in()
    }

    pub fn zoom_out(&mut self) -> bool {
        self.controller.zoom_out()
    }

    pub fn reset_zoom(&mut self) -> bool {
        self.controller.reset_zoom()
    }

    /// Returns the new grid visibility.
    pub fn toggle_grid(&mut self) -> bool {
        self.controller.toggle_grid()
    }

    /// Returns the new snap setting.
    pub fn toggle_snap(&mut self) -> bool {
        self.controller.toggle_snap()
    }

    // ─── Properties ──────────────────────────────────────────────────────

    pub fn set_label(&mut self, id: &str, label: &str) -> bool {
        self.controller.set_label(ObjectId::intern(id), label)
    }

    pub fn set_connection_label(&mut self, id: &str, label: &str) -> bool {
        self.controller
            .set_connection_label(ObjectId::intern(id), label)
    }

    /// Style as camelCase JSON (`fillColor`, `borderWidth`, …).
    pub fn set_style_json(&mut self, id: &str, json: &str) -> bool {
        match serde_json::from_str::<ElementStyle>(json) {
            Ok(style) => self.controller.set_style(ObjectId::intern(id), style),
            Err(err) => {
                log_error(&format!("invalid style: {err}"));
                false
            }
        }
    }

    /// Empty `outcome` clears the annotation.
    pub fn set_annotation(&mut self, id: &str, outcome: &str) -> bool {
        let outcome = (!outcome.trim().is_empty()).then(|| outcome.trim().to_string());
        self.controller
            .set_annotation(ObjectId::intern(id), outcome)
    }

    /// Empty `outcome` shows everything again.
    pub fn set_outcome_filter(&mut self, outcome: &str) -> bool {
        let outcome = (!outcome.is_empty()).then(|| outcome.to_string());
        self.controller.set_outcome_filter(outcome)
    }

    pub fn get_metadata_json(&self) -> String {
        serde_json::to_string(&self.controller.scene().metadata).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn set_metadata_json(&mut self, json: &str) -> bool {
        match serde_json::from_str::<Metadata>(json) {
            Ok(metadata) => self.controller.set_metadata(metadata),
            Err(err) => {
                log_error(&format!("invalid metadata: {err}"));
                false
            }
        }
    }

    // ─── Layers ──────────────────────────────────────────────────────────

    pub fn get_layers_json(&self) -> String {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct LayerRow<'a> {
            id: &'a str,
            name: &'a str,
            visible: bool,
            locked: bool,
            active: bool,
        }
        let scene = self.controller.scene();
        let active = scene.active_layer();
        let rows: Vec<LayerRow> = scene
            .layers()
            .iter()
            .map(|l| LayerRow {
                id: l.id.as_str(),
                name: &l.name,
                visible: l.visible,
                locked: l.locked,
                active: l.id == active,
            })
            .collect();
        serde_json::to_string(&rows).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn add_layer(&mut self, name: &str) -> String {
        self.controller.add_layer(name).as_str().to_string()
    }

    pub fn delete_layer(&mut self, id: &str) -> bool {
        self.controller.delete_layer(ObjectId::intern(id))
    }

    pub fn set_active_layer(&mut self, id: &str) -> bool {
        self.controller.set_active_layer(ObjectId::intern(id))
    }

    pub fn set_layer_visible(&mut self, id: &str, visible: bool) -> bool {
        self.controller
            .set_layer_visible(ObjectId::intern(id), visible)
    }

    pub fn set_layer_locked(&mut self, id: &str, locked: bool) -> bool {
        self.controller
            .set_layer_locked(ObjectId::intern(id), locked)
    }

    // ─── Import / export ─────────────────────────────────────────────────

    /// Import a markdown flow, replacing the scene as one undo step.
    /// `diagram_type` is used when the document does not declare one.
    /// Returns the skipped-line warnings as a JSON array, or `null` when
    /// nothing could be imported.
    pub fn import_markdown(&mut self, text: &str, diagram_type: &str) -> String {
        let hint = if diagram_type == "sequence" {
            DiagramType::Sequence
        } else {
            DiagramType::Flowchart
        };
        let options = ParseOptions::with_hint(hint);
        match self.controller.import_markdown(text, &options) {
            Ok(warnings) => serde_json::to_string(&warnings).unwrap_or_else(|_| "[]".to_string()),
            Err(err) => {
                log_error(&format!("import failed: {err}"));
                "null".to_string()
            }
        }
    }

    pub fn export_markdown(&self) -> String {
        self.controller.export_markdown()
    }

    /// SVG of the visible content, or an empty string when there is
    /// nothing to export.
    pub fn export_svg(&mut self, background: &str, scale: u32) -> String {
        let mut options = self.controller.export_options();
        options.background = Background::parse(background).unwrap_or_default();
        options.scale = scale.max(1);
        match self.controller.export_svg(&options) {
            Ok(svg) => svg,
            Err(err) => {
                log::warn!("export skipped: {err}");
                String::new()
            }
        }
    }

    /// Suggested download name, e.g. `password-reset.svg`.
    pub fn export_file_name(&self, extension: &str) -> String {
        fb_render::export::export_file_name(&self.controller.scene().metadata, extension)
    }

    pub fn save_json(&mut self) -> String {
        match self.controller.save_json() {
            Ok(text) => text,
            Err(err) => {
                log_error(&format!("save failed: {err}"));
                String::new()
            }
        }
    }

    pub fn load_json(&mut self, text: &str) -> bool {
        self.controller.load_json(text).is_ok()
    }

    // ─── Documents ───────────────────────────────────────────────────────

    /// `diagram_type`: `"flowchart"` or `"sequence"`. Returns the new id.
    pub fn create_document(&mut self, title: &str, diagram_type: &str) -> String {
        let diagram_type = if diagram_type == "sequence" {
            DiagramType::Sequence
        } else {
            DiagramType::Flowchart
        };
        self.documents
            .create(&mut self.controller, title, diagram_type)
            .as_str()
            .to_string()
    }

    pub fn switch_document(&mut self, id: &str) -> bool {
        self.documents
            .switch(&mut self.controller, ObjectId::intern(id))
    }

    pub fn close_document(&mut self, id: &str) -> bool {
        self.documents
            .close(&mut self.controller, ObjectId::intern(id))
    }

    pub fn get_documents_json(&self) -> String {
        serde_json::to_string(&self.documents.list(&self.controller))
            .unwrap_or_else(|_| "[]".to_string())
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    pub fn get_view_state_json(&self) -> String {
        serde_json::to_string(&self.controller.view_state()).unwrap_or_else(|_| "{}".to_string())
    }

    /// Selected element ids as a JSON array, last-selected last.
    pub fn get_selected_ids(&self) -> String {
        let ids: Vec<&str> = self
            .controller
            .selection()
            .ids()
            .iter()
            .map(|id| id.as_str())
            .collect();
        serde_json::to_string(&ids).unwrap_or_else(|_| "[]".to_string())
    }

    /// The selected element as JSON, or an empty string unless exactly
    /// one element is selected.
    pub fn get_selected_element_json(&self) -> String {
        self.controller
            .selection()
            .single()
            .and_then(|id| self.controller.scene().element(id))
            .and_then(|el| serde_json::to_string(el).ok())
            .unwrap_or_default()
    }

    pub fn get_zoom_percent(&self) -> u32 {
        self.controller.viewport().zoom_percent()
    }
}

// ─── Observer ────────────────────────────────────────────────────────────

struct JsObserver {
    callback: js_sys::Function,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum Message<'a> {
    View(&'a ViewState),
    Notice(&'a Notice),
}

impl JsObserver {
    fn send(&self, message: &Message) {
        let Ok(json) = serde_json::to_string(message) else {
            return;
        };
        if let Err(err) = self.callback.call1(&JsValue::NULL, &JsValue::from_str(&json)) {
            web_sys::console::error_2(&"Flowboard observer failed:".into(), &err);
        }
    }
}

impl EditorObserver for JsObserver {
    fn view_changed(&mut self, state: &ViewState) {
        self.send(&Message::View(state));
    }

    fn notify(&mut self, notice: &Notice) {
        self.send(&Message::Notice(notice));
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────

fn action_name(action: ShortcutAction) -> &'static str {
    match action {
        ShortcutAction::ToolSelect => "tool-select",
        ShortcutAction::ToolRectangle => "tool-rectangle",
        ShortcutAction::ToolCircle => "tool-circle",
        ShortcutAction::ToolText => "tool-text",
        ShortcutAction::ToolNote => "tool-note",
        ShortcutAction::Undo => "undo",
        ShortcutAction::Redo => "redo",
        ShortcutAction::Delete => "delete",
        ShortcutAction::SelectAll => "select-all",
        ShortcutAction::Duplicate => "duplicate",
        ShortcutAction::Nudge { .. } => "nudge",
        ShortcutAction::ZoomIn => "zoom-in",
        ShortcutAction::ZoomOut => "zoom-out",
        ShortcutAction::ResetZoom => "reset-zoom",
        ShortcutAction::FitToView => "fit-to-view",
        ShortcutAction::PanStart => "pan-start",
        ShortcutAction::BringToFront => "bring-to-front",
        ShortcutAction::SendToBack => "send-to-back",
        ShortcutAction::Deselect => "deselect",
    }
}

fn log_error(message: &str) {
    log::error!("{message}");
    #[cfg(target_arch = "wasm32")]
    web_sys::console::error_1(&message.into());
}

fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("Flowboard WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}
