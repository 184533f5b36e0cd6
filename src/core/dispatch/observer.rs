//=========================================================================
// Observers & Registration
//=========================================================================
//
// Capability sets the dispatch core calls into, and the tagged union used
// to register them.
//
// Observer flavors:
// - `ExclusiveObserver`: claims individual touches on Began
// - `UnboundObserver`: additionally claims never-claimed touches mid-gesture
// - `BroadcastObserver`: receives whole per-phase batches, never claims
//
// The flavor is fixed once at registration through `Registration`; the
// per-touch dispatch path never inspects observer types.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::RefCell;
use std::rc::Rc;

//=== Internal Dependencies ===============================================

use crate::core::touch::Touch;

//=== ExclusiveObserver ===================================================

/// Observer that claims individual touches.
///
/// Only touches claimed in [`on_began`](Self::on_began) are reported to
/// the other callbacks. `on_moved` receives both `Moved` and `Stationary`
/// touches; check [`Touch::phase`] to tell them apart.
pub trait ExclusiveObserver {
    /// Offered a new touch; return `true` to claim it.
    fn on_began(&mut self, touch: &Touch) -> bool;

    fn on_moved(&mut self, _touch: &Touch) {}

    fn on_ended(&mut self, _touch: &Touch) {}

    fn on_cancelled(&mut self, _touch: &Touch) {}

    /// Returns `false` once the owner is gone. Dead observers are skipped
    /// and reaped on the next housekeeping pass.
    fn is_alive(&self) -> bool {
        true
    }
}

//=== UnboundObserver =====================================================

/// Exclusive observer that may also claim touches nobody ever claimed.
///
/// Each `on_unbound_*` is offered a touch whose Began went unclaimed;
/// returning `true` claims it from that phase on.
pub trait UnboundObserver: ExclusiveObserver {
    fn on_unbound_began(&mut self, _touch: &Touch) -> bool {
        false
    }

    fn on_unbound_moved(&mut self, _touch: &Touch) -> bool {
        false
    }

    fn on_unbound_ended(&mut self, _touch: &Touch) -> bool {
        false
    }

    fn on_unbound_cancelled(&mut self, _touch: &Touch) -> bool {
        false
    }
}

//=== BroadcastObserver ===================================================

/// Observer that receives every unclaimed touch of a phase as one batch.
pub trait BroadcastObserver {
    fn on_touches_began(&mut self, _touches: &[&Touch]) {}

    /// Receives `Moved` and `Stationary` batches.
    fn on_touches_moved(&mut self, _touches: &[&Touch]) {}

    fn on_touches_ended(&mut self, _touches: &[&Touch]) {}

    fn on_touches_cancelled(&mut self, _touches: &[&Touch]) {}

    fn is_alive(&self) -> bool {
        true
    }
}

//=== Shared Handles ======================================================

pub type SharedExclusive = Rc<RefCell<dyn ExclusiveObserver>>;
pub type SharedUnbound = Rc<RefCell<dyn UnboundObserver>>;
pub type SharedBroadcast = Rc<RefCell<dyn BroadcastObserver>>;

//=== ObserverKey =========================================================

/// Identity of a registered observer (its shared allocation).
///
/// Two handles to the same `Rc` produce the same key, whatever trait
/// object they were coerced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverKey(usize);

impl ObserverKey {
    /// Key of the observer behind `observer`.
    pub fn of<T: ?Sized>(observer: &Rc<RefCell<T>>) -> Self {
        Self(Rc::as_ptr(observer) as *const () as usize)
    }

    #[cfg(test)]
    pub(crate) const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }
}

//=== Registration ========================================================

/// Observer plus the capability set it was registered with.
///
/// # Example
///
/// ```
/// use std::{cell::RefCell, rc::Rc};
/// use aetheric_touch::prelude::*;
///
/// struct Button;
/// impl ExclusiveObserver for Button {
///     fn on_began(&mut self, _touch: &Touch) -> bool { true }
/// }
///
/// let button = Rc::new(RefCell::new(Button));
/// let registration = Registration::exclusive(&button);
/// assert_eq!(registration.key(), ObserverKey::of(&button));
/// ```
#[derive(Clone)]
pub enum Registration {
    ExclusiveOnly(SharedExclusive),
    ExclusiveWithUnbound(SharedUnbound),
    Broadcast(SharedBroadcast),
}

impl Registration {
    pub fn exclusive<O: ExclusiveObserver + 'static>(observer: &Rc<RefCell<O>>) -> Self {
        let shared: SharedExclusive = observer.clone();
        Self::ExclusiveOnly(shared)
    }

    pub fn with_unbound<O: UnboundObserver + 'static>(observer: &Rc<RefCell<O>>) -> Self {
        let shared: SharedUnbound = observer.clone();
        Self::ExclusiveWithUnbound(shared)
    }

    pub fn broadcast<O: BroadcastObserver + 'static>(observer: &Rc<RefCell<O>>) -> Self {
        let shared: SharedBroadcast = observer.clone();
        Self::Broadcast(shared)
    }

    pub fn key(&self) -> ObserverKey {
        match self {
            Self::ExclusiveOnly(o) => ObserverKey::of(o),
            Self::ExclusiveWithUnbound(o) => ObserverKey::of(o),
            Self::Broadcast(o) => ObserverKey::of(o),
        }
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            Self::ExclusiveOnly(_) => "ExclusiveOnly",
            Self::ExclusiveWithUnbound(_) => "ExclusiveWithUnbound",
            Self::Broadcast(_) => "Broadcast",
        };
        f.debug_tuple(kind).field(&self.key()).finish()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
