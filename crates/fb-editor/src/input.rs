//! Input abstraction layer.
//!
//! Host pointer, wheel and keyboard events normalized into one
//! `InputEvent` enum. Pointer coordinates are in screen pixels relative to
//! the canvas; the controller maps them into document space.

/// Modifier keys held during an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub const SHIFT: Modifiers = Modifiers {
        shift: true,
        ..Modifiers::NONE
    };

    pub const CTRL: Modifiers = Modifiers {
        ctrl: true,
        ..Modifiers::NONE
    };

    /// Ctrl on most platforms, ⌘ on macOS.
    pub fn command(self) -> bool {
        self.ctrl || self.meta
    }

    /// Held to toggle selection membership instead of replacing it.
    pub fn multi_select(self) -> bool {
        self.shift || self.command()
    }
}

/// Which pointer button went down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerButton {
    #[default]
    Primary,
    Middle,
    Secondary,
}

impl PointerButton {
    /// From a DOM `MouseEvent.button` value.
    pub fn from_dom(button: i16) -> Self {
        match button {
            1 => PointerButton::Middle,
            2 => PointerButton::Secondary,
            _ => PointerButton::Primary,
        }
    }
}

/// A normalized input event.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerDown {
        x: f64,
        y: f64,
        button: PointerButton,
        modifiers: Modifiers,
    },
    PointerMove {
        x: f64,
        y: f64,
        modifiers: Modifiers,
    },
    PointerUp {
        x: f64,
        y: f64,
        modifiers: Modifiers,
    },
    DoubleClick {
        x: f64,
        y: f64,
    },
    /// Wheel notch; `delta_y > 0` scrolls away from the user.
    Wheel {
        x: f64,
        y: f64,
        delta_y: f64,
    },
    /// `key` is the DOM `KeyboardEvent.key` value (`"z"`, `"Delete"`, `" "`).
    KeyDown {
        key: String,
        modifiers: Modifiers,
    },
    KeyUp {
        key: String,
    },
}

impl InputEvent {
    pub fn pointer_down(x: f64, y: f64, modifiers: Modifiers) -> Self {
        Self::PointerDown {
            x,
            y,
            button: PointerButton::Primary,
            modifiers,
        }
    }

    pub fn pointer_move(x: f64, y: f64) -> Self {
        Self::PointerMove {
            x,
            y,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn pointer_up(x: f64, y: f64) -> Self {
        Self::PointerUp {
            x,
            y,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn key(key: &str, modifiers: Modifiers) -> Self {
        Self::KeyDown {
            key: key.to_string(),
            modifiers,
        }
    }

    /// Screen position if this is a pointer or wheel event.
    pub fn position(&self) -> Option<(f64, f64)> {
        match self {
            Self::PointerDown { x, y, .. }
            | Self::PointerMove { x, y, .. }
            | Self::PointerUp { x, y, .. }
            | Self::DoubleClick { x, y }
            | Self::Wheel { x, y, .. } => Some((*x, *y)),
            Self::KeyDown { .. } | Self::KeyUp { .. } => None,
        }
    }
}
