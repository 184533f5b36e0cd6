//=========================================================================
// Input Source
//
// Boundary between raw contact input and the dispatch core.
//
// Responsibilities:
// - Define the per-tick contact tuple (`RawContact`)
// - Define the polling contract the dispatcher consumes (`InputSource`)
// - Provide the stock source fed by the platform layer (`ContactTracker`)
//
// Notes:
// The dispatcher polls its source exactly once per tick and never
// pushes back into it.
//
//=========================================================================

//=== Submodules ==========================================================
pub mod event;
mod contact_tracker;

//=== Public API ==========================================================
pub use contact_tracker::ContactTracker;
pub use event::ContactEvent;

//=== Internal Imports ====================================================
use crate::core::touch::{TouchId, TouchPhase, Vec2};

//=== RawContact ==========================================================

/// One contact as reported by an input source for a single tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawContact {
    pub id: TouchId,
    pub phase: TouchPhase,
    pub position: Vec2,
}

impl RawContact {
    pub const fn new(id: TouchId, phase: TouchPhase, position: Vec2) -> Self {
        Self { id, phase, position }
    }
}

//=== InputSource =========================================================

/// Anything that can report the current set of contacts once per tick.
///
/// A contact missing from a snapshot while the dispatcher still tracks it
/// is treated as lost and force-cancelled.
pub trait InputSource {
    fn poll(&mut self) -> Vec<RawContact>;
}
