//=========================================================================
// Touch
//=========================================================================
//
// Mutable record of one active contact.
//
// Architecture:
//   RawContact → Touch::begin() → Touch::update() (per tick) → classify()
//
// Invariants:
// - `position` is always clamped to the active display bounds
// - `max_distance` never decreases while the touch is alive
// - phase only moves forward and never leaves Ended/Cancelled
// - a rejected sample leaves the touch exactly as it was
//
//=========================================================================

//=== Submodules ==========================================================

mod metrics;
mod phase;

//=== Public API ==========================================================

pub use metrics::{DisplayMetrics, TapThresholds, Vec2};
pub use phase::{TouchId, TouchPhase};

//=== External Dependencies ===============================================

use std::fmt;

//=== TouchError ==========================================================

/// Reasons a touch sample or query is rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TouchError {
    /// Elapsed time since the previous sample was negative.
    NegativeDelta(f64),

    /// Position or elapsed time was NaN or infinite.
    NonFiniteSample,

    /// Requested phase change would move backwards or resurrect.
    InvalidTransition { from: TouchPhase, to: TouchPhase },

    /// Display pixel density is unknown, so travel distance cannot be
    /// expressed in device-independent units.
    UnknownPixelDensity,
}

impl fmt::Display for TouchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegativeDelta(dt) => write!(f, "negative sample delta: {}s", dt),
            Self::NonFiniteSample => write!(f, "non-finite touch sample"),
            Self::InvalidTransition { from, to } => {
                write!(f, "invalid phase transition {:?} -> {:?}", from, to)
            }
            Self::UnknownPixelDensity => write!(f, "pixel density unknown, cannot classify"),
        }
    }
}

impl std::error::Error for TouchError {}

//=== Classification ======================================================

/// Gesture metrics derived from a touch's history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    /// Short, low-travel contact.
    pub is_tap: bool,

    /// Maximum travel from the initial position, in device-independent units.
    pub distance: f32,

    /// Seconds since the touch began.
    pub duration: f64,
}

//=== Touch ===============================================================

/// One active contact and its position history.
#[derive(Debug, Clone, PartialEq)]
pub struct Touch {
    id: TouchId,
    phase: TouchPhase,

    //--- Position History -------------------------------------------------
    position: Vec2,
    previous_position: Vec2,
    initial_position: Vec2,
    velocity: Vec2,
    max_distance: f32,

    //--- Timing -----------------------------------------------------------
    start_time: f64,
    elapsed: f64,

    //--- Claim State (maintained by the exclusive handler) ----------------
    bound: bool,
    ever_bound: bool,
}

impl Touch {
    //--- Construction -----------------------------------------------------

    /// Starts a new touch in phase `Began` at `position` (clamped).
    pub fn begin(id: TouchId, position: Vec2, start_time: f64, metrics: &DisplayMetrics) -> Self {
        let position = if position.is_finite() {
            metrics.clamp(position)
        } else {
            Vec2::ZERO
        };

        Self {
            id,
            phase: TouchPhase::Began,
            position,
            previous_position: position,
            initial_position: position,
            velocity: Vec2::ZERO,
            max_distance: 0.0,
            start_time,
            elapsed: 0.0,
            bound: false,
            ever_bound: false,
        }
    }

    //--- Sampling ---------------------------------------------------------

    /// Records a new position sample taken `dt` seconds after the last one.
    ///
    /// The position is clamped into `metrics`. Velocity becomes
    /// `(position - previous) / dt`; with `dt == 0` the previous velocity
    /// is kept.
    ///
    /// # Errors
    ///
    /// Negative or non-finite `dt` and non-finite positions are rejected
    /// and the touch is left untouched.
    pub fn update(&mut self, position: Vec2, dt: f64, metrics: &DisplayMetrics) -> Result<(), TouchError> {
        if !dt.is_finite() || !position.is_finite() {
            return Err(TouchError::NonFiniteSample);
        }
        if dt < 0.0 {
            return Err(TouchError::NegativeDelta(dt));
        }

        let clamped = metrics.clamp(position);

        self.previous_position = self.position;
        self.position = clamped;
        if dt > 0.0 {
            self.velocity = (self.position - self.previous_position) / dt as f32;
        }
        self.max_distance = self.max_distance.max(self.position.distance(self.initial_position));
        self.elapsed += dt;

        Ok(())
    }

    /// Clamps the position history into new display bounds.
    ///
    /// Velocity is kept. The maximum distance never shrinks.
    pub(crate) fn reclamp(&mut self, metrics: &DisplayMetrics) {
        self.position = metrics.clamp(self.position);
        self.previous_position = metrics.clamp(self.previous_position);
        self.initial_position = metrics.clamp(self.initial_position);
        self.max_distance = self.max_distance.max(self.position.distance(self.initial_position));
    }

    /// Moves the touch to `phase`.
    ///
    /// # Errors
    ///
    /// [`TouchError::InvalidTransition`] if the lifecycle would move
    /// backwards; the phase is left unchanged.
    pub fn set_phase(&mut self, phase: TouchPhase) -> Result<(), TouchError> {
        if !self.phase.can_transition_to(phase) {
            return Err(TouchError::InvalidTransition {
                from: self.phase,
                to: phase,
            });
        }
        self.phase = phase;
        Ok(())
    }

    //--- Classification ---------------------------------------------------

    /// Derives tap metrics.
    ///
    /// A tap travels less than `thresholds.max_distance` device-independent
    /// units and lasts less than `thresholds.max_duration` seconds.
    ///
    /// # Errors
    ///
    /// [`TouchError::UnknownPixelDensity`] when `metrics` carries no usable
    /// density.
    pub fn classify(&self, metrics: &DisplayMetrics, thresholds: &TapThresholds) -> Result<Classification, TouchError> {
        let distance = metrics
            .to_units(self.max_distance)
            .ok_or(TouchError::UnknownPixelDensity)?;

        Ok(Classification {
            is_tap: distance < thresholds.max_distance && self.elapsed < thresholds.max_duration,
            distance,
            duration: self.elapsed,
        })
    }

    /// Shorthand for `classify(..).is_tap`.
    pub fn is_tap(&self, metrics: &DisplayMetrics, thresholds: &TapThresholds) -> Result<bool, TouchError> {
        self.classify(metrics, thresholds).map(|c| c.is_tap)
    }

    //--- Claim State ------------------------------------------------------

    pub(crate) fn set_bound(&mut self, bound: bool) {
        self.bound = bound;
        self.ever_bound |= bound;
    }

    //--- Accessors --------------------------------------------------------

    pub fn id(&self) -> TouchId {
        self.id
    }

    pub fn phase(&self) -> TouchPhase {
        self.phase
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn previous_position(&self) -> Vec2 {
        self.previous_position
    }

    pub fn initial_position(&self) -> Vec2 {
        self.initial_position
    }

    /// Movement since the previous sample.
    pub fn delta(&self) -> Vec2 {
        self.position - self.previous_position
    }

    /// Pixels per second.
    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    /// Maximum distance from the initial position seen so far, in pixels.
    pub fn max_distance(&self) -> f32 {
        self.max_distance
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    /// Seconds since the touch began.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Currently claimed by at least one exclusive binding.
    pub fn is_bound(&self) -> bool {
        self.bound
    }

    /// Claimed at some point in its lifetime.
    pub fn was_ever_bound(&self) -> bool {
        self.ever_bound
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
