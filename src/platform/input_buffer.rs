//=========================================================================
// Input Buffer
//
// Collects contact events between frame boundaries on the platform
// thread. Acts as a transient aggregator between the InputProcessor and
// the channel to the core thread.
//
// Responsibilities:
// - Store incoming contact events per frame, in arrival order
// - Coalesce consecutive moves of the same contact
// - Hand the frame over via `drain()`
//
// Notes:
// Down/Up/Cancel are never merged; only a Move directly following a Move
// of the same contact replaces it.
//=========================================================================

//=== Internal Modules ====================================================
use crate::core::input::ContactEvent;

//=== InputBuffer Struct ==================================================
pub struct InputBuffer {
    events: Vec<ContactEvent>,
}

impl InputBuffer {
    //--- Construction -----------------------------------------------------
    //
    // Preallocates for a busy multi-touch frame.
    //
    pub fn new() -> Self {
        const BASE_CAPACITY: usize = 64;

        Self {
            events: Vec::with_capacity(BASE_CAPACITY),
        }
    }

    //--- Event Handling ---------------------------------------------------
    pub fn push(&mut self, event: ContactEvent) {
        if let ContactEvent::Move { id, .. } = event {
            if let Some(last) = self.events.last_mut() {
                if last.is_move_of(id) {
                    *last = event;
                    return;
                }
            }
        }
        self.events.push(event);
    }

    //--- Drain ------------------------------------------------------------
    //
    // Returns this frame's events and leaves the buffer empty, or `None`
    // when nothing was buffered.
    //
    pub fn drain(&mut self) -> Option<Vec<ContactEvent>> {
        if self.events.is_empty() {
            return None;
        }
        Some(self.events.drain(..).collect())
    }

    //--- Utilities --------------------------------------------------------
    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
