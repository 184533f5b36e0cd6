//=========================================================================
// Touch Identity & Phase
//=========================================================================
//
// Identifier and lifecycle phase of a single contact.
//
// Lifecycle (forward only, never resurrects):
//   Began → {Moved | Stationary}* → {Ended | Cancelled}
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt;

//=== TouchId =============================================================

/// Process-unique identifier of a contact.
///
/// Hardware contacts use ids `>= 0`. The synthetic pointer-as-touch
/// contact (mouse on desktop platforms) uses the reserved
/// [`TouchId::POINTER`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TouchId(pub i64);

impl TouchId {
    /// Reserved id for the synthetic pointer contact.
    pub const POINTER: Self = Self(-1);

    /// Returns `true` for the synthetic pointer contact.
    #[inline]
    pub const fn is_pointer(self) -> bool {
        self.0 == Self::POINTER.0
    }
}

impl fmt::Display for TouchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_pointer() {
            write!(f, "pointer")
        } else {
            write!(f, "#{}", self.0)
        }
    }
}

//=== TouchPhase ==========================================================

/// Lifecycle stage of a touch at a given tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TouchPhase {
    /// Contact started this tick.
    Began,

    /// Contact moved since the previous tick.
    Moved,

    /// Contact is held without movement.
    Stationary,

    /// Contact lifted normally.
    Ended,

    /// Contact was aborted (by the OS, or recovered by the dispatcher).
    Cancelled,
}

impl TouchPhase {
    /// Phases in bucket dispatch order: cleanup first, new contacts last.
    pub const DISPATCH_ORDER: [Self; 5] = [
        Self::Cancelled,
        Self::Ended,
        Self::Stationary,
        Self::Moved,
        Self::Began,
    ];

    /// Returns `true` for `Ended` and `Cancelled`.
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Ended | Self::Cancelled)
    }

    /// Returns `true` if a touch in `self` may move to `next`.
    pub const fn can_transition_to(self, next: Self) -> bool {
        match self {
            Self::Ended | Self::Cancelled => false,
            Self::Began | Self::Moved | Self::Stationary => !matches!(next, Self::Began),
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
