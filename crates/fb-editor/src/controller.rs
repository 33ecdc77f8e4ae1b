//! Interaction controller.
//!
//! Owns the live scene, its history, the selection and the viewport, and
//! turns normalized input into scene mutations. One pointer gesture is in
//! flight at a time ([`Mode`]); a gesture that changes the scene commits
//! exactly one history snapshot when it ends.
//!
//! ## Pointer-down priority (select tool)
//!
//! 1. Connection point of the primary selection → draw a connection
//! 2. Corner handle of the single selected element → resize
//! 3. Element → select it and drag
//! 4. Empty canvas → marquee
//!
//! Middle button, or any button while Space is held, pans instead.

use crate::history::History;
use crate::input::{InputEvent, Modifiers, PointerButton};
use crate::observer::{EditorObserver, Notice, ViewState};
use crate::selection::Selection;
use crate::shortcuts::{Direction, ShortcutAction, ShortcutMap};
use crate::viewport::Viewport;
use fb_core::config::EditorConfig;
use fb_core::document::{DocumentError, load_document, save_document};
use fb_core::emitter::emit_markdown;
use fb_core::geometry::{Point, Rect, snap_to_grid};
use fb_core::id::ObjectId;
use fb_core::model::{ElementKind, ElementStyle, Metadata};
use fb_core::parser::{ParseError, ParseOptions, parse_markdown};
use fb_core::scene::{Scene, ZOrder};
use fb_render::{
    ExportError, ExportOptions, Handle, Overlay, Surface, connection_point_at, export_svg,
    hit_test, hit_test_rect, paint_scene, resize_handle_at,
};

/// Below this screen distance a placement gesture counts as a click.
const CLICK_SLOP: f64 = 4.0;

/// What pointer presses do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    #[default]
    Select,
    /// Click places a default-size element, drag defines its bounds.
    Place(ElementKind),
}

/// The gesture in progress. All points are in document space except
/// `Panning::last`.
#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Idle,
    Panning {
        last: Point,
    },
    Dragging {
        origin: Point,
        /// Start positions of the dragged elements.
        starts: Vec<(ObjectId, Point)>,
        moved: bool,
    },
    Resizing {
        id: ObjectId,
        handle: Handle,
        start: Rect,
    },
    ConnectingDraft {
        start: ObjectId,
        anchor: Point,
        pointer: Point,
    },
    Drawing {
        kind: ElementKind,
        origin: Point,
        current: Point,
    },
    Marquee {
        origin: Point,
        current: Point,
        /// Selection kept when the marquee started with a multi-select
        /// modifier.
        base: Vec<ObjectId>,
    },
}

/// A document that is not live: its scene, undo history and unsaved flag.
#[derive(Debug, Clone)]
pub struct ParkedDocument {
    pub scene: Scene,
    pub history: History,
    pub dirty: bool,
}

pub struct Controller {
    scene: Scene,
    history: History,
    selection: Selection,
    viewport: Viewport,
    config: EditorConfig,
    tool: Tool,
    mode: Mode,
    space_held: bool,
    outcome_filter: Option<String>,
    /// Unsaved changes.
    dirty: bool,
    needs_redraw: bool,
    observer: Option<Box<dyn EditorObserver>>,
    pending: Vec<Notice>,
}

impl Controller {
    pub fn new(config: EditorConfig, width: f64, height: f64) -> Self {
        Self::with_scene(Scene::new(), config, width, height)
    }

    pub fn with_scene(mut scene: Scene, config: EditorConfig, width: f64, height: f64) -> Self {
        scene.refresh_geometry();
        let mut history = History::new(config.history_capacity);
        history.reset(&scene);
        Self {
            scene,
            history,
            selection: Selection::new(),
            viewport: Viewport::new(width, height),
            config,
            tool: Tool::Select,
            mode: Mode::Idle,
            space_held: false,
            outcome_filter: None,
            dirty: false,
            needs_redraw: true,
            observer: None,
            pending: Vec::new(),
        }
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn outcome_filter(&self) -> Option<&str> {
        self.outcome_filter.as_deref()
    }

    pub fn set_observer(&mut self, observer: Box<dyn EditorObserver>) {
        self.observer = Some(observer);
        self.publish();
    }

    /// Consume the redraw request. Hosts call this once per frame.
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.needs_redraw)
    }

    pub fn request_redraw(&mut self) {
        self.needs_redraw = true;
    }

    pub fn resize_viewport(&mut self, width: f64, height: f64) {
        self.viewport.resize(width, height);
        self.needs_redraw = true;
    }

    // ─── Rendering ───────────────────────────────────────────────────────

    /// Transient state for the renderer.
    pub fn overlay(&self) -> Overlay {
        let zoom = self.viewport.zoom;
        let mut overlay = Overlay {
            selection: self.selection.ids().to_vec(),
            primary: self.selection.primary(),
            outcome_filter: self.outcome_filter.clone(),
            grid: (self.config.show_grid && self.config.grid_size > 0.0)
                .then_some(self.config.grid_size),
            handle_size: self.config.handle_size / zoom,
            ..Overlay::default()
        };
        match &self.mode {
            Mode::ConnectingDraft {
                anchor, pointer, ..
            } => overlay.rubber_band = Some((*anchor, *pointer)),
            Mode::Marquee {
                origin, current, ..
            } => overlay.marquee = Some(Rect::from_corners(*origin, *current)),
            Mode::Drawing {
                kind,
                origin,
                current,
            } => overlay.preview = Some((*kind, self.placement_rect(*kind, *origin, *current))),
            _ => {}
        }
        overlay
    }

    /// Paint the current frame.
    pub fn render(&self, surface: &mut dyn Surface) {
        paint_scene(
            surface,
            &self.scene,
            &self.overlay(),
            &self.viewport.transform(),
        );
    }

    // ─── Event dispatch ──────────────────────────────────────────────────

    /// Handle one input event. Returns whether a redraw is needed.
    pub fn handle(&mut self, event: &InputEvent) -> bool {
        let redraw = match event {
            InputEvent::PointerDown {
                x,
                y,
                button,
                modifiers,
            } => self.pointer_down(Point::new(*x, *y), *button, *modifiers),
            InputEvent::PointerMove { x, y, modifiers } => {
                self.pointer_move(Point::new(*x, *y), *modifiers)
            }
            InputEvent::PointerUp { x, y, .. } => self.pointer_up(Point::new(*x, *y)),
            InputEvent::DoubleClick { x, y } => self.double_click(Point::new(*x, *y)),
            InputEvent::Wheel { x, y, delta_y } => {
                self.viewport
                    .wheel(Point::new(*x, *y), *delta_y, &self.config)
            }
            InputEvent::KeyDown { key, modifiers } => self.key_down(key, *modifiers),
            InputEvent::KeyUp { key } => self.key_up(key),
        };
        if redraw {
            self.needs_redraw = true;
        }
        self.publish();
        redraw
    }

    fn pointer_down(&mut self, screen: Point, button: PointerButton, modifiers: Modifiers) -> bool {
        // A press without a release for the last one (second touch, lost
        // pointerup) closes the earlier gesture first.
        self.finish_gesture();
        if button == PointerButton::Middle || self.space_held {
            self.set_mode(Mode::Panning { last: screen });
            return false;
        }
        if button != PointerButton::Primary {
            return false;
        }
        let world = self.viewport.screen_to_world(screen);

        if let Tool::Place(kind) = self.tool {
            self.set_mode(Mode::Drawing {
                kind,
                origin: world,
                current: world,
            });
            return true;
        }

        let zoom = self.viewport.zoom;
        if let Some(primary) = self.selection.primary()
            && let Some(anchor) =
                connection_point_at(&self.scene, primary, world, self.config.grab_radius / zoom)
        {
            self.set_mode(Mode::ConnectingDraft {
                start: primary,
                anchor,
                pointer: world,
            });
            return true;
        }

        if let Some(id) = self.selection.single()
            && self.scene.is_editable(id)
            && let Some(handle) =
                resize_handle_at(&self.scene, id, world, self.config.handle_size / zoom)
            && let Some(el) = self.scene.element(id)
        {
            let start = el.bounds();
            self.set_mode(Mode::Resizing { id, handle, start });
            return true;
        }

        if let Some(id) = hit_test(&self.scene, world) {
            if modifiers.multi_select() {
                self.selection.toggle(id);
            } else if !self.selection.contains(id) {
                self.selection.replace(id);
            }
            if self.selection.contains(id) {
                let starts = self
                    .selection
                    .editable(&self.scene)
                    .into_iter()
                    .filter_map(|id| self.scene.element(id).map(|e| (id, e.position())))
                    .collect();
                self.set_mode(Mode::Dragging {
                    origin: world,
                    starts,
                    moved: false,
                });
            }
            return true;
        }

        let base = if modifiers.multi_select() {
            self.selection.ids().to_vec()
        } else {
            self.selection.clear();
            Vec::new()
        };
        self.set_mode(Mode::Marquee {
            origin: world,
            current: world,
            base,
        });
        true
    }

    fn pointer_move(&mut self, screen: Point, modifiers: Modifiers) -> bool {
        let world = self.viewport.screen_to_world(screen);
        let grid = self.config.snap_grid();
        match &mut self.mode {
            Mode::Idle => false,
            Mode::Panning { last } => {
                let (dx, dy) = (screen.x - last.x, screen.y - last.y);
                *last = screen;
                self.viewport.pan_by(dx, dy);
                true
            }
            Mode::Dragging {
                origin,
                starts,
                moved,
            } => {
                if starts.is_empty() {
                    return false;
                }
                let delta = world.delta_from(*origin);
                let targets: Vec<(ObjectId, Point)> = starts
                    .iter()
                    .map(|(id, p)| (*id, p.offset(delta.x, delta.y)))
                    .collect();
                if self.scene.set_positions(&targets, grid) {
                    *moved = true;
                    return true;
                }
                false
            }
            Mode::Resizing { id, handle, start } => {
                let rect = resize_rect(&self.scene, *id, *handle, start, world, modifiers.shift);
                self.scene.set_element_bounds(*id, rect)
            }
            Mode::ConnectingDraft { pointer, .. } => {
                *pointer = world;
                true
            }
            Mode::Drawing { current, .. } => {
                *current = world;
                true
            }
            Mode::Marquee {
                origin,
                current,
                base,
            } => {
                *current = world;
                let rect = Rect::from_corners(*origin, world);
                let base = base.clone();
                self.selection.set(base);
                self.selection.extend(hit_test_rect(&self.scene, &rect));
                true
            }
        }
    }

    fn pointer_up(&mut self, screen: Point) -> bool {
        let world = self.viewport.screen_to_world(screen);
        match std::mem::replace(&mut self.mode, Mode::Idle) {
            Mode::Idle => false,
            Mode::Panning { .. } => false,
            mode @ (Mode::Dragging { .. } | Mode::Resizing { .. }) => self.commit_gesture(mode),
            Mode::ConnectingDraft { start, .. } => {
                if let Some(end) = hit_test(&self.scene, world)
                    && self.scene.create_connection(start, end).is_some()
                {
                    self.commit("connect");
                }
                true
            }
            Mode::Drawing {
                kind,
                origin,
                current,
            } => {
                let end = if current == origin { origin } else { world };
                let rect = self.placement_rect(kind, origin, end);
                let id = self.scene.add_element(kind, Point::new(rect.x, rect.y)).id;
                self.scene.set_element_bounds(id, rect);
                self.selection.replace(id);
                self.tool = Tool::Select;
                self.commit("place");
                true
            }
            Mode::Marquee { .. } => true,
        }
    }

    fn double_click(&mut self, screen: Point) -> bool {
        let world = self.viewport.screen_to_world(screen);
        if let Some(id) = hit_test(&self.scene, world)
            && let Some(el) = self.scene.element(id)
        {
            let notice = Notice::edit_label(id, &el.label);
            self.selection.replace(id);
            self.pending.push(notice);
            return true;
        }
        false
    }

    fn key_down(&mut self, key: &str, modifiers: Modifiers) -> bool {
        let Some(action) =
            ShortcutMap::resolve(key, modifiers.ctrl, modifiers.shift, modifiers.alt, modifiers.meta)
        else {
            return false;
        };
        self.apply(action)
    }

    fn key_up(&mut self, key: &str) -> bool {
        if key == " " {
            self.space_held = false;
            if matches!(self.mode, Mode::Panning { .. }) {
                self.set_mode(Mode::Idle);
            }
        }
        false
    }

    /// Run a shortcut action. Returns whether a redraw is needed.
    pub fn apply(&mut self, action: ShortcutAction) -> bool {
        match action {
            ShortcutAction::ToolSelect => self.set_tool(Tool::Select),
            ShortcutAction::ToolRectangle => self.set_tool(Tool::Place(ElementKind::Rectangle)),
            ShortcutAction::ToolCircle => self.set_tool(Tool::Place(ElementKind::Circle)),
            ShortcutAction::ToolText => self.set_tool(Tool::Place(ElementKind::Text)),
            ShortcutAction::ToolNote => self.set_tool(Tool::Place(ElementKind::Note)),
            ShortcutAction::Undo => self.undo(),
            ShortcutAction::Redo => self.redo(),
            ShortcutAction::Delete => self.delete_selection(),
            ShortcutAction::SelectAll => self.select_all(),
            ShortcutAction::Duplicate => self.duplicate_selection(),
            ShortcutAction::Nudge { direction, large } => self.nudge(direction, large),
            ShortcutAction::ZoomIn => self.viewport.zoom_in(&self.config),
            ShortcutAction::ZoomOut => self.viewport.zoom_out(&self.config),
            ShortcutAction::ResetZoom => {
                self.viewport.reset();
                true
            }
            ShortcutAction::FitToView => self.fit_to_view(),
            ShortcutAction::PanStart => {
                self.space_held = true;
                false
            }
            ShortcutAction::BringToFront => self.reorder_selection(ZOrder::Front),
            ShortcutAction::SendToBack => self.reorder_selection(ZOrder::Back),
            ShortcutAction::Deselect => self.escape(),
        }
    }

    // ─── Commands ────────────────────────────────────────────────────────

    pub fn set_tool(&mut self, tool: Tool) -> bool {
        if self.tool == tool {
            return false;
        }
        self.tool = tool;
        if matches!(self.mode, Mode::Drawing { .. }) {
            self.set_mode(Mode::Idle);
        }
        log::debug!("tool → {tool:?}");
        true
    }

    pub fn undo(&mut self) -> bool {
        self.cancel_gesture();
        match self.history.undo() {
            Some(scene) => {
                self.restore(scene);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        self.cancel_gesture();
        match self.history.redo() {
            Some(scene) => {
                self.restore(scene);
                true
            }
            None => false,
        }
    }

    fn restore(&mut self, scene: Scene) {
        self.scene = scene;
        self.selection.retain_existing(&self.scene);
        self.dirty = true;
        self.needs_redraw = true;
    }

    /// Delete the selected elements on unlocked layers.
    pub fn delete_selection(&mut self) -> bool {
        self.finish_gesture();
        let ids = self.selection.editable(&self.scene);
        if ids.is_empty() || self.scene.delete_elements(&ids) == 0 {
            return false;
        }
        self.selection.retain_existing(&self.scene);
        self.commit("delete");
        true
    }

    /// Copy the selection offset by the configured distance and select
    /// the copies.
    pub fn duplicate_selection(&mut self) -> bool {
        self.finish_gesture();
        if self.selection.is_empty() {
            return false;
        }
        let offset = self.config.duplicate_offset;
        let copies = self
            .scene
            .duplicate_elements(self.selection.ids(), Point::new(offset, offset));
        if copies.is_empty() {
            return false;
        }
        self.selection.set(copies);
        self.commit("duplicate");
        true
    }

    pub fn select_all(&mut self) -> bool {
        let ids: Vec<ObjectId> = self.scene.visible_elements().map(|e| e.id).collect();
        self.selection.set(ids);
        true
    }

    /// Move the selection one nudge step. Nudges are never snapped.
    pub fn nudge(&mut self, direction: Direction, large: bool) -> bool {
        self.finish_gesture();
        let step = if large {
            self.config.nudge_large
        } else {
            self.config.nudge
        };
        let unit = direction.unit();
        let ids = self.selection.editable(&self.scene);
        if ids.is_empty()
            || !self
                .scene
                .move_elements(&ids, Point::new(unit.x * step, unit.y * step), None)
        {
            return false;
        }
        self.commit("nudge");
        true
    }

    pub fn reorder_selection(&mut self, to: ZOrder) -> bool {
        self.finish_gesture();
        let ids = self.selection.ids().to_vec();
        let ordered: Vec<ObjectId> = match to {
            // Keep relative order: bring to front in paint order, send to
            // back in reverse.
            ZOrder::Front => self
                .scene
                .element_ids()
                .into_iter()
                .filter(|id| ids.contains(id))
                .collect(),
            ZOrder::Back => self
                .scene
                .element_ids()
                .into_iter()
                .rev()
                .filter(|id| ids.contains(id))
                .collect(),
        };
        let before = self.scene.element_ids();
        for id in ordered {
            self.scene.reorder(id, to);
        }
        if self.scene.element_ids() == before {
            return false;
        }
        self.commit("reorder");
        true
    }

    /// Clear the selection and abort the gesture in progress, putting
    /// dragged or resized elements back where the gesture found them.
    pub fn escape(&mut self) -> bool {
        self.cancel_gesture();
        self.selection.clear();
        true
    }

    fn cancel_gesture(&mut self) {
        match std::mem::replace(&mut self.mode, Mode::Idle) {
            Mode::Dragging { starts, moved, .. } if moved => {
                self.scene.set_positions(&starts, None);
            }
            Mode::Resizing { id, start, .. } => {
                self.scene.set_element_bounds(id, start);
            }
            _ => {}
        }
    }

    /// End the gesture in flight as if the pointer had been released, so
    /// its geometry change gets its own snapshot before anything else
    /// commits.
    fn finish_gesture(&mut self) {
        let mode = std::mem::replace(&mut self.mode, Mode::Idle);
        self.commit_gesture(mode);
    }

    /// Commit a finished drag or resize if it changed geometry. Other
    /// gestures commit nothing here.
    fn commit_gesture(&mut self, mode: Mode) -> bool {
        match mode {
            Mode::Dragging { moved, .. } => {
                if moved {
                    self.commit("move");
                }
                moved
            }
            Mode::Resizing { id, start, .. } => {
                let changed = self.scene.element(id).is_some_and(|e| e.bounds() != start);
                if changed {
                    self.commit("resize");
                }
                changed
            }
            _ => false,
        }
    }

    pub fn fit_to_view(&mut self) -> bool {
        if self.scene.visible_elements().next().is_none() {
            return false;
        }
        self.viewport.fit_to(self.scene.content_bounds(), &self.config);
        true
    }

    pub fn zoom_in(&mut self) -> bool {
        let changed = self.viewport.zoom_in(&self.config);
        self.after_command(changed)
    }

    pub fn zoom_out(&mut self) -> bool {
        let changed = self.viewport.zoom_out(&self.config);
        self.after_command(changed)
    }

    pub fn reset_zoom(&mut self) -> bool {
        self.viewport.reset();
        self.after_command(true)
    }

    /// Returns whether the grid is now shown.
    pub fn toggle_grid(&mut self) -> bool {
        self.config.show_grid = !self.config.show_grid;
        self.after_command(true);
        self.config.show_grid
    }

    /// Returns whether snapping is now on.
    pub fn toggle_snap(&mut self) -> bool {
        self.config.snap_to_grid = !self.config.snap_to_grid;
        self.publish();
        self.config.snap_to_grid
    }

    /// Palette drop: place a default-size element centered on a screen
    /// point.
    pub fn drop_element(&mut self, kind: ElementKind, screen: Point) -> ObjectId {
        self.finish_gesture();
        let world = self.viewport.screen_to_world(screen);
        let spec = kind.spec();
        let mut top_left = Point::new(world.x - spec.width / 2.0, world.y - spec.height / 2.0);
        if let Some(g) = self.config.snap_grid() {
            top_left = Point::new(snap_to_grid(top_left.x, g), snap_to_grid(top_left.y, g));
        }
        let id = self.scene.add_element(kind, top_left).id;
        self.selection.replace(id);
        self.commit("drop");
        self.after_command(true);
        id
    }

    // ─── Property edits ──────────────────────────────────────────────────

    pub fn set_label(&mut self, id: ObjectId, label: &str) -> bool {
        let changed = self.scene.set_label(id, label);
        self.commit_if(changed, "label")
    }

    pub fn set_style(&mut self, id: ObjectId, style: ElementStyle) -> bool {
        let changed = self.scene.set_style(id, style);
        self.commit_if(changed, "style")
    }

    pub fn set_annotation(&mut self, id: ObjectId, outcome: Option<String>) -> bool {
        let changed = self.scene.set_annotation(id, outcome);
        self.commit_if(changed, "annotation")
    }

    pub fn set_connection_label(&mut self, id: ObjectId, label: &str) -> bool {
        let changed = self.scene.set_connection_label(id, label);
        self.commit_if(changed, "connection label")
    }

    pub fn set_metadata(&mut self, metadata: Metadata) -> bool {
        let changed = self.scene.metadata != metadata;
        if changed {
            self.scene.metadata = metadata;
        }
        self.commit_if(changed, "metadata")
    }

    /// Dim everything not tagged with `outcome`. `None` shows all.
    pub fn set_outcome_filter(&mut self, outcome: Option<String>) -> bool {
        let outcome = outcome.filter(|o| !o.trim().is_empty());
        if self.outcome_filter == outcome {
            return false;
        }
        self.outcome_filter = outcome;
        self.after_command(true)
    }

    // ─── Layers ──────────────────────────────────────────────────────────

    pub fn add_layer(&mut self, name: &str) -> ObjectId {
        let id = self.scene.add_layer(name);
        self.commit("add layer");
        id
    }

    /// Delete a layer. Deleting the only layer is rejected with a notice.
    pub fn delete_layer(&mut self, id: ObjectId) -> bool {
        if self.scene.layers().len() <= 1 {
            self.pending.push(Notice::LayerDeleteRejected);
            self.publish();
            return false;
        }
        let changed = self.scene.delete_layer(id);
        self.commit_if(changed, "delete layer")
    }

    pub fn set_active_layer(&mut self, id: ObjectId) -> bool {
        let changed = self.scene.active_layer() != id && self.scene.set_active_layer(id);
        self.commit_if(changed, "active layer")
    }

    pub fn set_layer_visible(&mut self, id: ObjectId, visible: bool) -> bool {
        let changed = self.scene.layer(id).is_some_and(|l| l.visible != visible)
            && self.scene.set_layer_visible(id, visible);
        if changed {
            // Hidden elements cannot stay selected.
            let hidden: Vec<ObjectId> = self
                .selection
                .ids()
                .iter()
                .copied()
                .filter(|s| self.scene.element(*s).is_some_and(|e| !self.scene.is_visible(e)))
                .collect();
            for s in hidden {
                self.selection.toggle(s);
            }
        }
        self.commit_if(changed, "layer visibility")
    }

    pub fn set_layer_locked(&mut self, id: ObjectId, locked: bool) -> bool {
        let changed = self.scene.layer(id).is_some_and(|l| l.locked != locked)
            && self.scene.set_layer_locked(id, locked);
        self.commit_if(changed, "layer lock")
    }

    // ─── Documents ───────────────────────────────────────────────────────

    /// Replace the scene with a markdown import. The import is one undo
    /// step. Returns the parser warnings.
    ///
    /// # Errors
    /// [`ParseError::Empty`] for blank input; the scene is left alone.
    pub fn import_markdown(
        &mut self,
        text: &str,
        options: &ParseOptions,
    ) -> Result<Vec<String>, ParseError> {
        let result = parse_markdown(text, options)?;
        log::debug!(
            "imported {} element(s), {} warning(s)",
            result.scene.elements().len(),
            result.warnings.len()
        );
        self.cancel_gesture();
        self.scene = result.scene;
        self.selection.clear();
        if !result.warnings.is_empty() {
            self.pending.push(Notice::ImportWarnings {
                warnings: result.warnings.clone(),
            });
        }
        self.commit("import");
        self.fit_to_view();
        self.publish();
        Ok(result.warnings)
    }

    pub fn export_markdown(&self) -> String {
        emit_markdown(&self.scene)
    }

    /// SVG export of the visible content.
    ///
    /// # Errors
    /// [`ExportError::NothingToExport`] (also sent as a notice) for an
    /// empty scene.
    pub fn export_svg(&mut self, options: &ExportOptions) -> Result<String, ExportError> {
        let result = export_svg(&self.scene, options);
        if let Err(ExportError::NothingToExport) = result {
            self.pending.push(Notice::NothingToExport);
            self.publish();
        }
        result
    }

    /// Export options with the configured padding.
    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            padding: self.config.export_padding,
            ..ExportOptions::default()
        }
    }

    /// Serialize the scene as a JSON document and mark it saved.
    ///
    /// # Errors
    /// Serialization failure from `serde_json`.
    pub fn save_json(&mut self) -> Result<String, DocumentError> {
        let text = save_document(&self.scene)?;
        self.dirty = false;
        self.publish();
        Ok(text)
    }

    /// Replace the scene with a JSON document. History restarts.
    ///
    /// # Errors
    /// Malformed JSON or dangling references; the scene is left alone and
    /// a notice is sent.
    pub fn load_json(&mut self, text: &str) -> Result<(), DocumentError> {
        match load_document(text) {
            Ok(scene) => {
                self.open_scene(scene);
                self.fit_to_view();
                self.publish();
                Ok(())
            }
            Err(err) => {
                self.pending.push(Notice::LoadFailed {
                    message: err.to_string(),
                });
                self.publish();
                Err(err)
            }
        }
    }

    /// Start a fresh document.
    pub fn new_document(&mut self, metadata: Metadata) {
        self.open_scene(Scene::with_metadata(metadata));
        self.viewport.reset();
        self.publish();
    }

    fn open_scene(&mut self, scene: Scene) {
        self.mode = Mode::Idle;
        self.scene = scene;
        self.history.reset(&self.scene);
        self.selection.clear();
        self.dirty = false;
        self.needs_redraw = true;
    }

    /// Hand the live document over, leaving a blank one in its place.
    pub fn take_document(&mut self) -> ParkedDocument {
        self.cancel_gesture();
        self.selection.clear();
        let history = std::mem::replace(
            &mut self.history,
            History::new(self.config.history_capacity),
        );
        let scene = std::mem::take(&mut self.scene);
        self.history.reset(&self.scene);
        let dirty = std::mem::take(&mut self.dirty);
        self.needs_redraw = true;
        ParkedDocument {
            scene,
            history,
            dirty,
        }
    }

    /// Make a parked document live again.
    pub fn restore_document(&mut self, parked: ParkedDocument) {
        self.mode = Mode::Idle;
        self.scene = parked.scene;
        self.history = parked.history;
        self.dirty = parked.dirty;
        self.selection.clear();
        self.needs_redraw = true;
        self.publish();
    }

    // ─── Internals ───────────────────────────────────────────────────────

    fn set_mode(&mut self, mode: Mode) {
        if std::mem::discriminant(&self.mode) != std::mem::discriminant(&mode) {
            log::debug!("mode {} → {}", mode_name(&self.mode), mode_name(&mode));
        }
        self.mode = mode;
    }

    /// Bounds for a placement gesture: the default size at the press point
    /// for a click, the dragged rectangle otherwise. Snapped when enabled.
    fn placement_rect(&self, kind: ElementKind, origin: Point, current: Point) -> Rect {
        let spec = kind.spec();
        let slop = CLICK_SLOP / self.viewport.zoom;
        let grid = self.config.snap_grid();
        let snap = |v: f64| grid.map_or(v, |g| snap_to_grid(v, g));
        if origin.distance(current) < slop {
            return Rect::new(snap(origin.x), snap(origin.y), spec.width, spec.height);
        }
        let r = Rect::from_corners(origin, current);
        Rect::new(
            snap(r.x),
            snap(r.y),
            r.width.max(spec.min_width),
            r.height.max(spec.min_height),
        )
    }

    fn commit(&mut self, what: &str) {
        self.history.snapshot(&self.scene);
        self.dirty = true;
        self.needs_redraw = true;
        log::debug!("commit {what}");
    }

    fn commit_if(&mut self, changed: bool, what: &str) -> bool {
        if changed {
            self.commit(what);
            self.publish();
        }
        changed
    }

    fn after_command(&mut self, changed: bool) -> bool {
        if changed {
            self.needs_redraw = true;
        }
        self.publish();
        changed
    }

    pub fn view_state(&self) -> ViewState {
        ViewState {
            element_count: self.scene.elements().len(),
            connection_count: self.scene.connections().len(),
            selection_count: self.selection.len(),
            zoom_percent: self.viewport.zoom_percent(),
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
            dirty: self.dirty,
            methodology_subtitle: self.scene.metadata.methodology_subtitle().to_string(),
        }
    }

    fn publish(&mut self) {
        let notices = std::mem::take(&mut self.pending);
        let state = self.view_state();
        if let Some(observer) = self.observer.as_mut() {
            for notice in &notices {
                observer.notify(notice);
            }
            observer.view_changed(&state);
        }
    }
}

fn mode_name(mode: &Mode) -> &'static str {
    match mode {
        Mode::Idle => "idle",
        Mode::Panning { .. } => "panning",
        Mode::Dragging { .. } => "dragging",
        Mode::Resizing { .. } => "resizing",
        Mode::ConnectingDraft { .. } => "connecting",
        Mode::Drawing { .. } => "drawing",
        Mode::Marquee { .. } => "marquee",
    }
}

/// New bounds for a corner drag: the corner opposite `handle` stays put,
/// each axis is floored, and `keep_aspect` preserves the start ratio.
fn resize_rect(
    scene: &Scene,
    id: ObjectId,
    handle: Handle,
    start: &Rect,
    pointer: Point,
    keep_aspect: bool,
) -> Rect {
    let anchor = handle.anchor(start);
    let (min_w, min_h) = scene
        .element(id)
        .map(|e| (e.kind.spec().min_width, e.kind.spec().min_height))
        .unwrap_or((0.0, 0.0));
    let dx = pointer.x - anchor.x;
    let dy = pointer.y - anchor.y;
    let mut w = dx.abs();
    let mut h = dy.abs();
    if keep_aspect && start.width > 0.0 && start.height > 0.0 {
        if w * start.height > h * start.width {
            h = w * start.height / start.width;
        } else {
            w = h * start.width / start.height;
        }
    }
    let w = w.max(min_w);
    let h = h.max(min_h);
    let x = if dx < 0.0 { anchor.x - w } else { anchor.x };
    let y = if dy < 0.0 { anchor.y - h } else { anchor.y };
    Rect::new(x, y, w, h)
}
