//=========================================================================
// Prelude
//=========================================================================
//
// Convenience module that re-exports commonly used types and traits.
//
// Usage:
//   use aetheric_touch::prelude::*;
//
//=========================================================================

//=== Public API ==========================================================

// Engine
pub use crate::engine::{Engine, EngineBuilder};

// Touches
pub use crate::core::touch::{
    Classification, DisplayMetrics, TapThresholds, Touch, TouchError, TouchId, TouchPhase, Vec2,
};

// Dispatch
pub use crate::core::dispatch::{
    BroadcastHandler, BroadcastObserver, DispatchError, DispatcherLifecycle, ExclusiveHandler, ExclusiveObserver,
    ObserverKey, Registration, TickReport, TouchDispatcher, UnboundObserver,
};

// Input sources
pub use crate::core::input::{ContactEvent, ContactTracker, InputSource, RawContact};
