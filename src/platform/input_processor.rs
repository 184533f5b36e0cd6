//=========================================================================
// Input Processor
//=========================================================================
//
// Converts platform-specific Winit events into engine ContactEvents.
//
// Architecture:
//   Winit Events → InputProcessor → ContactEvent (engine type) → InputBuffer
//
// Touch events map one-to-one onto contacts keyed by the OS finger id.
// On pointer-only platforms the left mouse button drives a synthetic
// contact with `TouchId::POINTER`: press is Down, drag is Move, release
// is Up, and leaving the window while pressed is Cancel.
//
//=========================================================================

//=== External Dependencies ===============================================

use winit::event::{ElementState, MouseButton as WinitMouseButton, TouchPhase as WinitTouchPhase};

//=== Internal Dependencies ===============================================

use crate::core::input::ContactEvent;
use crate::core::touch::{TouchId, Vec2};

//=== InputProcessor ======================================================

/// Converts Winit events to contact events with stateful pointer tracking.
pub(crate) struct InputProcessor {
    cursor: Vec2,
    pointer_down: bool,
}

impl InputProcessor {
    //--- Construction -----------------------------------------------------

    pub(crate) fn new() -> Self {
        Self {
            cursor: Vec2::ZERO,
            pointer_down: false,
        }
    }

    //--- Touch ------------------------------------------------------------

    /// Converts one Winit touch sample (physical pixels) to a contact event.
    pub(crate) fn process_touch(&self, finger: u64, phase: WinitTouchPhase, x: f64, y: f64) -> ContactEvent {
        let id = touch_id(finger);
        let position = Vec2::new(x as f32, y as f32);

        match phase {
            WinitTouchPhase::Started => ContactEvent::Down { id, position },
            WinitTouchPhase::Moved => ContactEvent::Move { id, position },
            WinitTouchPhase::Ended => ContactEvent::Up { id, position },
            WinitTouchPhase::Cancelled => ContactEvent::Cancel { id },
        }
    }

    //--- Pointer ----------------------------------------------------------

    /// Tracks the cursor; emits a pointer move while the button is held.
    pub(crate) fn process_cursor_moved(&mut self, x: f64, y: f64) -> Option<ContactEvent> {
        self.cursor = Vec2::new(x as f32, y as f32);
        self.pointer_down.then_some(ContactEvent::Move {
            id: TouchId::POINTER,
            position: self.cursor,
        })
    }

    /// Left button press/release at the last known cursor position.
    pub(crate) fn process_mouse_button(&mut self, button: WinitMouseButton, state: ElementState) -> Option<ContactEvent> {
        if button != WinitMouseButton::Left {
            return None;
        }

        match (state, self.pointer_down) {
            (ElementState::Pressed, false) => {
                self.pointer_down = true;
                Some(ContactEvent::Down {
                    id: TouchId::POINTER,
                    position: self.cursor,
                })
            }
            (ElementState::Released, true) => {
                self.pointer_down = false;
                Some(ContactEvent::Up {
                    id: TouchId::POINTER,
                    position: self.cursor,
                })
            }
            _ => None,
        }
    }

    /// Cursor left the window; a held pointer contact is cancelled.
    pub(crate) fn process_cursor_left(&mut self) -> Option<ContactEvent> {
        if !self.pointer_down {
            return None;
        }
        self.pointer_down = false;
        Some(ContactEvent::Cancel { id: TouchId::POINTER })
    }

    /// Forgets pointer state (host suspended).
    pub(crate) fn reset(&mut self) {
        self.pointer_down = false;
    }

    pub(crate) fn pointer_down(&self) -> bool {
        self.pointer_down
    }
}

//=== Winit Conversions ===================================================

/// Maps an OS finger id into the non-negative hardware id range.
fn touch_id(finger: u64) -> TouchId {
    TouchId((finger & i64::MAX as u64) as i64)
}

//=========================================================================
// Unit Tests
//=========================================================================
