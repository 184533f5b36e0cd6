//=========================================================================
// Binding Registry
//=========================================================================
//
// Priority-ordered binding arena shared by both dispatch handlers.
//
// Architecture:
//   register()/unregister() ──Idle──────────→ slots + index (applied now)
//                           └─Dispatching──→ pending (applied on unlock)
//
//   begin_dispatch() → sort if dirty → iterate `order` → end_dispatch()
//                                                        └─ flush pending:
//                                                           removals, then adds
//
// Order: priority descending, then registration id ascending.
// `order` is never rebuilt while Dispatching; slot indices handed out
// during a dispatch stay valid until end_dispatch().
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cmp::Reverse;
use std::collections::HashMap;

use log::debug;

//=== Internal Dependencies ===============================================

use super::observer::ObserverKey;
use super::DispatchError;

//=== BindingEntry ========================================================

/// Per-handler payload stored for each binding.
pub(crate) trait BindingEntry {
    /// Returns `false` once the owning observer is gone.
    fn is_alive(&self) -> bool;

    /// Applies a re-registration of the same observer.
    fn merge(&mut self, update: Self)
    where
        Self: Sized;
}

//=== DispatchState =======================================================

/// Re-entrancy guard state of a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DispatchState {
    Idle,
    Dispatching,
}

//=== Slot ================================================================

pub(crate) struct Slot<B> {
    pub(crate) key: ObserverKey,
    pub(crate) priority: i32,
    pub(crate) registration_id: u64,
    pub(crate) binding: B,
}

enum PendingOp<B> {
    Add { priority: i32, binding: B },
    Remove,
}

//=== BindingRegistry =====================================================

pub(crate) struct BindingRegistry<B> {
    slots: Vec<Option<Slot<B>>>,
    free: Vec<usize>,
    index: HashMap<ObserverKey, usize>,
    order: Vec<usize>,
    dirty: bool,
    state: DispatchState,
    pending: Vec<(ObserverKey, PendingOp<B>)>,
    next_registration_id: u64,
}

impl<B: BindingEntry> BindingRegistry<B> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            order: Vec::new(),
            dirty: false,
            state: DispatchState::Idle,
            pending: Vec::new(),
            next_registration_id: 0,
        }
    }

    //--- Registration -----------------------------------------------------

    /// Adds or updates the binding for `key`.
    ///
    /// Deferred while dispatching. A later add for the same key replaces a
    /// still-pending removal.
    pub(crate) fn register(&mut self, key: ObserverKey, priority: i32, binding: B) {
        match self.state {
            DispatchState::Idle => self.apply_add(key, priority, binding),
            DispatchState::Dispatching => {
                debug!(target: "touch::dispatch", "Deferring registration of {:?}", key);
                let op = PendingOp::Add { priority, binding };
                match self.pending.iter_mut().find(|(k, _)| *k == key) {
                    Some(entry) => entry.1 = op,
                    None => self.pending.push((key, op)),
                }
            }
        }
    }

    /// Removes the binding for `key`; no-op if absent.
    ///
    /// Deferred while dispatching. Removing a key whose add is still
    /// pending cancels that add.
    pub(crate) fn unregister(&mut self, key: ObserverKey) {
        match self.state {
            DispatchState::Idle => {
                self.apply_remove(key);
            }
            DispatchState::Dispatching => {
                debug!(target: "touch::dispatch", "Deferring removal of {:?}", key);
                let registered = self.index.contains_key(&key);
                match self.pending.iter().position(|(k, _)| *k == key) {
                    Some(pos) if registered => self.pending[pos].1 = PendingOp::Remove,
                    Some(pos) => {
                        self.pending.remove(pos);
                    }
                    None if registered => self.pending.push((key, PendingOp::Remove)),
                    None => {}
                }
            }
        }
    }

    //--- Dispatch Window --------------------------------------------------

    /// Locks the registry and brings `order` up to date.
    pub(crate) fn begin_dispatch(&mut self) -> Result<(), DispatchError> {
        if self.state == DispatchState::Dispatching {
            return Err(DispatchError::Reentrant);
        }
        self.sort_if_dirty();
        self.state = DispatchState::Dispatching;
        Ok(())
    }

    /// Unlocks the registry and applies pending removals, then additions.
    pub(crate) fn end_dispatch(&mut self) {
        self.state = DispatchState::Idle;

        if self.pending.is_empty() {
            return;
        }

        let pending = std::mem::take(&mut self.pending);
        let mut additions = Vec::with_capacity(pending.len());

        for (key, op) in pending {
            match op {
                PendingOp::Remove => {
                    self.apply_remove(key);
                }
                PendingOp::Add { priority, binding } => additions.push((key, priority, binding)),
            }
        }

        for (key, priority, binding) in additions {
            self.apply_add(key, priority, binding);
        }
    }

    pub(crate) fn is_dispatching(&self) -> bool {
        self.state == DispatchState::Dispatching
    }

    /// `true` while a registration change awaits the next sort.
    #[cfg(test)]
    pub(crate) fn needs_sort(&self) -> bool {
        self.dirty
    }

    //--- Housekeeping -----------------------------------------------------

    /// Drops bindings whose observer reports not alive.
    ///
    /// Skipped while dispatching. Returns the number of reaped bindings.
    pub(crate) fn reap_dead(&mut self) -> usize {
        if self.is_dispatching() {
            return 0;
        }

        let dead: Vec<ObserverKey> = self
            .slots
            .iter()
            .flatten()
            .filter(|slot| !slot.binding.is_alive())
            .map(|slot| slot.key)
            .collect();

        for key in &dead {
            self.apply_remove(*key);
        }

        if !dead.is_empty() {
            debug!(target: "touch::dispatch", "Reaped {} dead bindings", dead.len());
        }
        dead.len()
    }

    /// Drops every binding and pending change.
    pub(crate) fn clear(&mut self) -> Result<(), DispatchError> {
        if self.is_dispatching() {
            return Err(DispatchError::DispatchInProgress);
        }
        self.slots.clear();
        self.free.clear();
        self.index.clear();
        self.order.clear();
        self.pending.clear();
        self.dirty = false;
        Ok(())
    }

    //--- Queries ----------------------------------------------------------

    /// Slots in dispatch order, as of the last sort.
    pub(crate) fn ordered(&self) -> impl Iterator<Item = (usize, &Slot<B>)> + '_ {
        self.order
            .iter()
            .filter_map(move |&i| self.slots[i].as_ref().map(|slot| (i, slot)))
    }

    /// Every registered binding, in no particular order.
    pub(crate) fn bindings(&self) -> impl Iterator<Item = &B> + '_ {
        self.slots.iter().flatten().map(|slot| &slot.binding)
    }

    pub(crate) fn binding(&self, slot: usize) -> Option<&B> {
        self.slots.get(slot)?.as_ref().map(|s| &s.binding)
    }

    pub(crate) fn binding_mut(&mut self, slot: usize) -> Option<&mut B> {
        self.slots.get_mut(slot)?.as_mut().map(|s| &mut s.binding)
    }

    pub(crate) fn get(&self, key: &ObserverKey) -> Option<&Slot<B>> {
        self.index.get(key).and_then(|&i| self.slots[i].as_ref())
    }

    pub(crate) fn contains(&self, key: &ObserverKey) -> bool {
        self.index.contains_key(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.index.len()
    }

    //--- Internal Helpers -------------------------------------------------

    fn apply_add(&mut self, key: ObserverKey, priority: i32, binding: B) {
        if let Some(&i) = self.index.get(&key) {
            if let Some(slot) = self.slots[i].as_mut() {
                slot.priority = priority;
                slot.binding.merge(binding);
            }
            self.dirty = true;
            return;
        }

        let slot = Slot {
            key,
            priority,
            registration_id: self.next_registration_id,
            binding,
        };
        self.next_registration_id += 1;

        let i = match self.free.pop() {
            Some(i) => {
                self.slots[i] = Some(slot);
                i
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        };

        self.index.insert(key, i);
        self.dirty = true;
    }

    fn apply_remove(&mut self, key: ObserverKey) -> Option<B> {
        let i = self.index.remove(&key)?;
        let slot = self.slots[i].take()?;
        self.free.push(i);
        self.dirty = true;
        Some(slot.binding)
    }

    fn sort_if_dirty(&mut self) {
        if !self.dirty {
            return;
        }

        let slots = &self.slots;
        self.order.clear();
        self.order.extend(self.index.values().copied());
        self.order.sort_by_key(|&i| {
            slots[i]
                .as_ref()
                .map(|s| (Reverse(s.priority), s.registration_id))
                .unwrap_or((Reverse(i32::MIN), u64::MAX))
        });
        self.dirty = false;
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
