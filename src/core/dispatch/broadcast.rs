//=========================================================================
// Broadcast Dispatch Handler
//=========================================================================
//
// Multi-touch handler: every live binding receives the whole batch of
// unclaimed touches for a phase, in priority order. Nothing is claimed
// and nothing is swallowed.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::RefCell;
use std::rc::Rc;

use log::{debug, trace};

//=== Internal Dependencies ===============================================

use super::observer::{BroadcastObserver, ObserverKey, SharedBroadcast};
use super::registry::{BindingEntry, BindingRegistry};
use super::DispatchError;
use crate::core::touch::{Touch, TouchPhase};

//=== BroadcastBinding ====================================================

pub(crate) struct BroadcastBinding {
    observer: SharedBroadcast,
}

impl BindingEntry for BroadcastBinding {
    fn is_alive(&self) -> bool {
        self.observer.try_borrow().map_or(true, |o| o.is_alive())
    }

    fn merge(&mut self, update: Self) {
        self.observer = update.observer;
    }
}

//=== BroadcastHandler ====================================================

/// Handle to the broadcast binding list. Clones share the same list.
#[derive(Clone)]
pub struct BroadcastHandler {
    registry: Rc<RefCell<BindingRegistry<BroadcastBinding>>>,
}

impl BroadcastHandler {
    pub fn new() -> Self {
        Self {
            registry: Rc::new(RefCell::new(BindingRegistry::new())),
        }
    }

    //--- Registration -----------------------------------------------------

    /// Registers `observer`, or updates its priority if already present.
    pub fn register<O: BroadcastObserver + 'static>(&self, observer: &Rc<RefCell<O>>, priority: i32) {
        let shared: SharedBroadcast = observer.clone();
        self.register_shared(shared, priority);
    }

    pub(crate) fn register_shared(&self, observer: SharedBroadcast, priority: i32) {
        let key = ObserverKey::of(&observer);
        debug!(target: "touch::dispatch", "Broadcast register {:?} (priority {})", key, priority);
        self.registry
            .borrow_mut()
            .register(key, priority, BroadcastBinding { observer });
    }

    pub fn unregister<T: ?Sized>(&self, observer: &Rc<RefCell<T>>) {
        self.unregister_key(ObserverKey::of(observer));
    }

    pub fn unregister_key(&self, key: ObserverKey) {
        debug!(target: "touch::dispatch", "Broadcast unregister {:?}", key);
        self.registry.borrow_mut().unregister(key);
    }

    //--- Dispatch ---------------------------------------------------------

    /// Delivers `touches` (all in `phase`) to every live binding.
    ///
    /// `Stationary` batches are delivered through `on_touches_moved`.
    /// An empty batch notifies nobody.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Reentrant`] if this handler is already dispatching.
    pub fn dispatch(&self, phase: TouchPhase, touches: &[&Touch]) -> Result<(), DispatchError> {
        if touches.is_empty() {
            return Ok(());
        }

        let observers: Vec<SharedBroadcast> = {
            let mut registry = self.registry.borrow_mut();
            registry.begin_dispatch()?;
            registry
                .ordered()
                .map(|(_, entry)| entry.binding.observer.clone())
                .collect()
        };

        trace!(
            target: "touch::dispatch",
            "Broadcast {:?}: {} touches, {} bindings",
            phase,
            touches.len(),
            observers.len()
        );

        for observer in &observers {
            let mut observer = observer.borrow_mut();
            if !observer.is_alive() {
                continue;
            }
            match phase {
                TouchPhase::Began => observer.on_touches_began(touches),
                TouchPhase::Moved | TouchPhase::Stationary => observer.on_touches_moved(touches),
                TouchPhase::Ended => observer.on_touches_ended(touches),
                TouchPhase::Cancelled => observer.on_touches_cancelled(touches),
            }
        }

        self.registry.borrow_mut().end_dispatch();
        Ok(())
    }

    //--- Queries & Housekeeping -------------------------------------------

    pub fn contains(&self, key: &ObserverKey) -> bool {
        self.registry.borrow().contains(key)
    }

    pub fn len(&self) -> usize {
        self.registry.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_dispatching(&self) -> bool {
        self.registry.borrow().is_dispatching()
    }

    pub fn housekeeping(&self) -> usize {
        self.registry.borrow_mut().reap_dead()
    }

    /// # Errors
    ///
    /// [`DispatchError::DispatchInProgress`] while dispatching.
    pub fn clear(&self) -> Result<(), DispatchError> {
        self.registry.borrow_mut().clear()
    }
}

impl Default for BroadcastHandler {
    fn default() -> Self {
        Self::new()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
