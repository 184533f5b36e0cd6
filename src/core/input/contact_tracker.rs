//=========================================================================
// Contact Tracker
//=========================================================================
//
// Folds discrete contact events into per-tick snapshots.
//
// Architecture:
//   ContactEvent → apply() → entries (one per contact) → poll() → RawContact
//
// Snapshot rules:
// - a new contact is reported as Began exactly once
// - afterwards Moved if it moved since the last poll, else Stationary
// - Up/Cancel is reported on the first poll after Began was reported,
//   then the contact is dropped
// - an id reused before its previous contact was reported waits behind it
//
//=========================================================================

//=== External Dependencies ===============================================

use log::{trace, warn};

//=== Internal Dependencies ===============================================

use super::event::ContactEvent;
use super::{InputSource, RawContact};
use crate::core::touch::{TouchId, TouchPhase, Vec2};

//=== ContactEntry ========================================================

#[derive(Debug, Clone)]
struct ContactEntry {
    id: TouchId,
    position: Vec2,
    began_reported: bool,
    moved: bool,
    terminal: Option<TouchPhase>,
}

impl ContactEntry {
    fn is_live(&self) -> bool {
        self.terminal.is_none()
    }
}

//=== ContactTracker ======================================================

/// Stock [`InputSource`] fed with [`ContactEvent`]s between ticks.
#[derive(Debug, Default)]
pub struct ContactTracker {
    entries: Vec<ContactEntry>,
}

impl ContactTracker {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    //--- Event Processing -------------------------------------------------

    /// Applies events in arrival order.
    pub fn apply_all<I: IntoIterator<Item = ContactEvent>>(&mut self, events: I) {
        for event in events {
            self.apply(event);
        }
    }

    pub fn apply(&mut self, event: ContactEvent) {
        match event {
            ContactEvent::Down { id, position } => {
                if let Some(entry) = self.live_entry_mut(id) {
                    // Down on a contact we still hold: the OS lost its Up.
                    warn!(target: "platform::input", "Contact {} went down twice; treating as move", id);
                    entry.position = position;
                    entry.moved = true;
                    return;
                }
                self.entries.push(ContactEntry {
                    id,
                    position,
                    began_reported: false,
                    moved: false,
                    terminal: None,
                });
            }

            ContactEvent::Move { id, position } => match self.live_entry_mut(id) {
                Some(entry) => {
                    entry.position = position;
                    entry.moved = true;
                }
                None => trace!(target: "platform::input", "Move for unknown contact {} ignored", id),
            },

            ContactEvent::Up { id, position } => match self.live_entry_mut(id) {
                Some(entry) => {
                    entry.position = position;
                    entry.terminal = Some(TouchPhase::Ended);
                }
                None => trace!(target: "platform::input", "Up for unknown contact {} ignored", id),
            },

            ContactEvent::Cancel { id } => match self.live_entry_mut(id) {
                Some(entry) => entry.terminal = Some(TouchPhase::Cancelled),
                None => trace!(target: "platform::input", "Cancel for unknown contact {} ignored", id),
            },
        }
    }

    /// Forgets every contact, as when the host is suspended mid-gesture.
    ///
    /// The dispatcher sees the contacts vanish and cancels them.
    pub fn suspend(&mut self) {
        if !self.entries.is_empty() {
            warn!(
                target: "platform::input",
                "Input suspended with {} contacts down",
                self.entries.len()
            );
        }
        self.entries.clear();
    }

    //--- Queries ----------------------------------------------------------

    /// Number of contacts not yet fully reported.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    //--- Internal Helpers -------------------------------------------------

    fn live_entry_mut(&mut self, id: TouchId) -> Option<&mut ContactEntry> {
        self.entries.iter_mut().rev().find(|e| e.id == id && e.is_live())
    }
}

//=== InputSource =========================================================

impl InputSource for ContactTracker {
    fn poll(&mut self) -> Vec<RawContact> {
        let mut snapshot: Vec<RawContact> = Vec::with_capacity(self.entries.len());
        let mut finished: Vec<usize> = Vec::new();

        for (index, entry) in self.entries.iter_mut().enumerate() {
            // Only the oldest entry per id is visible this tick.
            if snapshot.iter().any(|c| c.id == entry.id) {
                continue;
            }

            let phase = if !entry.began_reported {
                entry.began_reported = true;
                TouchPhase::Began
            } else if let Some(terminal) = entry.terminal {
                finished.push(index);
                terminal
            } else if entry.moved {
                TouchPhase::Moved
            } else {
                TouchPhase::Stationary
            };

            entry.moved = false;
            snapshot.push(RawContact::new(entry.id, phase, entry.position));
        }

        for index in finished.into_iter().rev() {
            self.entries.remove(index);
        }

        snapshot
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
