//=========================================================================
// Contact Event Types
//
// Engine-side representation of low-level contact input.
//
// The platform layer translates winit touch and mouse events into these
// discrete, id-keyed events; `ContactTracker` folds them into one
// snapshot per tick.
//
// Event Flow:
// ```text
// Platform Layer (Winit)
//         ↓
//    ContactEvent (this module)
//         ↓
//    ContactTracker (per-tick snapshot)
//         ↓
//    RawContact → TouchDispatcher
// ```
//
//=========================================================================

//=== Internal Dependencies ===============================================

use crate::core::touch::{TouchId, Vec2};

//=== ContactEvent ========================================================

/// One discrete change of a contact, in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContactEvent {
    /// Finger touched down (or pointer button pressed).
    Down { id: TouchId, position: Vec2 },

    /// Contact moved while down.
    Move { id: TouchId, position: Vec2 },

    /// Contact lifted cleanly.
    Up { id: TouchId, position: Vec2 },

    /// Contact aborted by the OS (gesture stolen, pointer left, ...).
    Cancel { id: TouchId },
}

impl ContactEvent {
    /// Contact this event refers to.
    pub fn id(&self) -> TouchId {
        match self {
            Self::Down { id, .. } | Self::Move { id, .. } | Self::Up { id, .. } | Self::Cancel { id } => *id,
        }
    }

    /// Returns `true` for `Move` events on `id`; used when coalescing.
    pub fn is_move_of(&self, id: TouchId) -> bool {
        matches!(self, Self::Move { id: other, .. } if *other == id)
    }
}
