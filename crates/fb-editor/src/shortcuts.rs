//! Keyboard shortcut mapping.
//!
//! Maps key + modifier combos to semantic `ShortcutAction`s, shared by the
//! WASM bridge and native hosts. Ctrl and ⌘ are interchangeable.

use fb_core::geometry::Point;

/// Arrow-key direction for nudging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    /// Unit vector in document space (y grows downward).
    pub fn unit(self) -> Point {
        match self {
            Direction::Left => Point::new(-1.0, 0.0),
            Direction::Right => Point::new(1.0, 0.0),
            Direction::Up => Point::new(0.0, -1.0),
            Direction::Down => Point::new(0.0, 1.0),
        }
    }
}

/// Actions that keyboard shortcuts can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    // ── Tool switching ──
    ToolSelect,
    ToolRectangle,
    ToolCircle,
    ToolText,
    ToolNote,

    // ── Edit ──
    Undo,
    Redo,
    Delete,
    SelectAll,
    Duplicate,
    /// Move the selection one step; `large` is the Shift variant.
    Nudge { direction: Direction, large: bool },

    // ── View ──
    ZoomIn,
    ZoomOut,
    ResetZoom,
    FitToView,
    /// Space held: pointer drags pan the view until released.
    PanStart,

    // ── Z-order ──
    BringToFront,
    SendToBack,

    // ── UI ──
    /// Clear the selection and abort the gesture in progress.
    Deselect,
}

fn arrow(key: &str) -> Option<Direction> {
    match key {
        "ArrowLeft" => Some(Direction::Left),
        "ArrowRight" => Some(Direction::Right),
        "ArrowUp" => Some(Direction::Up),
        "ArrowDown" => Some(Direction::Down),
        _ => None,
    }
}

/// Resolves key events into shortcut actions.
pub struct ShortcutMap;

impl ShortcutMap {
    /// Resolve a key event to an action.
    ///
    /// `key` is the `KeyboardEvent.key` value (e.g. `"z"`, `"Delete"`).
    /// Returns `None` if the key combo has no binding.
    pub fn resolve(
        key: &str,
        ctrl: bool,
        shift: bool,
        _alt: bool,
        meta: bool,
    ) -> Option<ShortcutAction> {
        let cmd = ctrl || meta;

        // ── Modifier combos first (most specific) ──
        if cmd && shift {
            return match key {
                "z" | "Z" => Some(ShortcutAction::Redo),
                _ => None,
            };
        }

        if cmd {
            return match key {
                "z" | "Z" => Some(ShortcutAction::Undo),
                "y" | "Y" => Some(ShortcutAction::Redo),
                "a" | "A" => Some(ShortcutAction::SelectAll),
                "d" | "D" => Some(ShortcutAction::Duplicate),
                "=" | "+" => Some(ShortcutAction::ZoomIn),
                "-" => Some(ShortcutAction::ZoomOut),
                "0" => Some(ShortcutAction::ResetZoom),
                "]" => Some(ShortcutAction::BringToFront),
                "[" => Some(ShortcutAction::SendToBack),
                _ => None,
            };
        }

        if shift {
            if let Some(direction) = arrow(key) {
                return Some(ShortcutAction::Nudge {
                    direction,
                    large: true,
                });
            }
            return match key {
                // Shift+1 reports "!" on US layouts.
                "!" | "1" => Some(ShortcutAction::FitToView),
                _ => None,
            };
        }

        // ── Single keys (no modifiers) ──
        if let Some(direction) = arrow(key) {
            return Some(ShortcutAction::Nudge {
                direction,
                large: false,
            });
        }
        match key {
            "v" | "V" => Some(ShortcutAction::ToolSelect),
            "r" | "R" => Some(ShortcutAction::ToolRectangle),
            "o" | "O" => Some(ShortcutAction::ToolCircle),
            "t" | "T" => Some(ShortcutAction::ToolText),
            "n" | "N" => Some(ShortcutAction::ToolNote),
            "Delete" | "Backspace" => Some(ShortcutAction::Delete),
            "Escape" => Some(ShortcutAction::Deselect),
            " " => Some(ShortcutAction::PanStart),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_tool_shortcuts() {
        assert_eq!(
            ShortcutMap::resolve("v", false, false, false, false),
            Some(ShortcutAction::ToolSelect)
        );
        assert_eq!(
            ShortcutMap::resolve("r", false, false, false, false),
            Some(ShortcutAction::ToolRectangle)
        );
        assert_eq!(
            ShortcutMap::resolve("o", false, false, false, false),
            Some(ShortcutAction::ToolCircle)
        );
        assert_eq!(
            ShortcutMap::resolve("T", false, false, false, false),
            Some(ShortcutAction::ToolText)
        );
        assert_eq!(
            ShortcutMap::resolve("n", false, false, false, false),
            Some(ShortcutAction::ToolNote)
        );
    }

    #[test]
    fn resolve_undo_redo() {
        // Cmd+Z → Undo
        assert_eq!(
            ShortcutMap::resolve("z", false, false, false, true),
            Some(ShortcutAction::Undo)
        );
        // Ctrl+Z → Undo
        assert_eq!(
            ShortcutMap::resolve("z", true, false, false, false),
            Some(ShortcutAction::Undo)
        );
        // Ctrl+Shift+Z → Redo (key arrives uppercase)
        assert_eq!(
            ShortcutMap::resolve("Z", true, true, false, false),
            Some(ShortcutAction::Redo)
        );
        // Cmd+Y → Redo
        assert_eq!(
            ShortcutMap::resolve("y", false, false, false, true),
            Some(ShortcutAction::Redo)
        );
    }

    #[test]
    fn resolve_delete_and_escape() {
        assert_eq!(
            ShortcutMap::resolve("Delete", false, false, false, false),
            Some(ShortcutAction::Delete)
        );
        assert_eq!(
            ShortcutMap::resolve("Backspace", false, false, false, false),
            Some(ShortcutAction::Delete)
        );
        assert_eq!(
            ShortcutMap::resolve("Escape", false, false, false, false),
            Some(ShortcutAction::Deselect)
        );
    }

    #[test]
    fn resolve_nudges() {
        assert_eq!(
            ShortcutMap::resolve("ArrowLeft", false, false, false, false),
            Some(ShortcutAction::Nudge {
                direction: Direction::Left,
                large: false
            })
        );
        assert_eq!(
            ShortcutMap::resolve("ArrowDown", false, true, false, false),
            Some(ShortcutAction::Nudge {
                direction: Direction::Down,
                large: true
            })
        );
        assert_eq!(Direction::Up.unit(), Point::new(0.0, -1.0));
    }

    #[test]
    fn resolve_edit_and_order() {
        assert_eq!(
            ShortcutMap::resolve("d", true, false, false, false),
            Some(ShortcutAction::Duplicate)
        );
        assert_eq!(
            ShortcutMap::resolve("a", false, false, false, true),
            Some(ShortcutAction::SelectAll)
        );
        assert_eq!(
            ShortcutMap::resolve("]", true, false, false, false),
            Some(ShortcutAction::BringToFront)
        );
        assert_eq!(
            ShortcutMap::resolve("[", true, false, false, false),
            Some(ShortcutAction::SendToBack)
        );
    }

    #[test]
    fn resolve_zoom() {
        assert_eq!(
            ShortcutMap::resolve("=", false, false, false, true),
            Some(ShortcutAction::ZoomIn)
        );
        assert_eq!(
            ShortcutMap::resolve("-", true, false, false, false),
            Some(ShortcutAction::ZoomOut)
        );
        assert_eq!(
            ShortcutMap::resolve("0", true, false, false, false),
            Some(ShortcutAction::ResetZoom)
        );
        assert_eq!(
            ShortcutMap::resolve("!", false, true, false, false),
            Some(ShortcutAction::FitToView)
        );
    }

    #[test]
    fn resolve_modifier_precedence() {
        assert_eq!(ShortcutMap::resolve("z", false, false, false, false), None);
        assert_eq!(ShortcutMap::resolve("d", false, false, false, false), None);
        assert_eq!(ShortcutMap::resolve("v", true, false, false, false), None);
        assert_eq!(ShortcutMap::resolve("q", false, false, false, false), None);
        assert_eq!(
            ShortcutMap::resolve(" ", false, false, false, false),
            Some(ShortcutAction::PanStart)
        );
    }
}
