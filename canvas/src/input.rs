//! Input model: mouse buttons, cursor hints and the gesture state machine.
//!
//! `InputState` is the active gesture being tracked between pointer-down and
//! pointer-up. Only one vertex can be dragged at a time; the drag index lives
//! in the state itself, so a second press while dragging has nowhere to go
//! and is ignored.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use serde::{Deserialize, Serialize};

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Button {
    /// Left mouse button (or single-finger tap).
    #[default]
    Primary,
    /// Middle mouse button (scroll wheel click).
    Middle,
    /// Right mouse button (or two-finger tap).
    Secondary,
}

/// Cursor the host should show over the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Cursor {
    /// Placing vertices / idle.
    #[default]
    Crosshair,
    /// Over a draggable vertex, or dragging one.
    Move,
}

impl Cursor {
    /// CSS `cursor` value.
    #[must_use]
    pub fn as_css(self) -> &'static str {
        match self {
            Self::Crosshair => "crosshair",
            Self::Move => "move",
        }
    }
}

/// Persistent UI state visible to the renderer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UiState {
    /// Vertex under the pointer while the triangle is complete.
    pub hovered: Option<usize>,
    /// Cursor most recently requested from the host.
    pub cursor: Cursor,
}

/// Internal state for the input state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InputState {
    /// No gesture in progress; waiting for the next pointer-down.
    #[default]
    Idle,
    /// A vertex of the complete triangle is bound to pointer motion.
    DraggingVertex {
        /// Index of the vertex being dragged (0 = A, 1 = B, 2 = C).
        index: usize,
    },
}

impl InputState {
    /// Index of the dragged vertex, if a drag session is active.
    #[must_use]
    pub fn dragging(self) -> Option<usize> {
        match self {
            Self::DraggingVertex { index } => Some(index),
            Self::Idle => None,
        }
    }
}
