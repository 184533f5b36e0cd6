//=========================================================================
// Touch Dispatcher
//=========================================================================
//
// Per-tick orchestration of touch input.
//
// Architecture:
//   InputSource::poll() (once)
//        ↓
//   reconcile live touches ──missing──→ forced Cancelled
//        ↓
//   admit new contacts as Began
//        ↓
//   bucket by phase: Cancelled → Ended → Stationary → Moved → Began
//        ↓                 (per bucket)
//   ExclusiveHandler ──unclaimed──→ BroadcastHandler
//        ↓
//   drop touches that ended this tick
//
// Lifecycle: Unknown → Started → Running → Quit (terminal)
//
//=========================================================================

//=== Submodules ==========================================================

pub mod broadcast;
pub mod exclusive;
pub mod observer;
mod registry;

//=== Public API ==========================================================

pub use broadcast::BroadcastHandler;
pub use exclusive::ExclusiveHandler;
pub use observer::{
    BroadcastObserver, ExclusiveObserver, ObserverKey, Registration, SharedBroadcast, SharedExclusive,
    SharedUnbound, UnboundObserver,
};

//=== External Dependencies ===============================================

use std::collections::{HashMap, HashSet};
use std::fmt;

use log::{debug, error, trace, warn};

//=== Internal Dependencies ===============================================

use crate::core::input::{InputSource, RawContact};
use crate::core::touch::{DisplayMetrics, TapThresholds, Touch, TouchId, TouchPhase};
use exclusive::ExclusiveTarget;

//=== DispatchError =======================================================

/// Invalid operations on the dispatcher or its handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// `clear()` was called while a handler was delivering events.
    DispatchInProgress,

    /// A handler was asked to dispatch from inside its own dispatch.
    Reentrant,

    /// The dispatcher has quit and cannot be used again.
    Terminated,
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DispatchInProgress => write!(f, "cannot clear while a dispatch is in progress"),
            Self::Reentrant => write!(f, "handler is already dispatching"),
            Self::Terminated => write!(f, "dispatcher has quit"),
        }
    }
}

impl std::error::Error for DispatchError {}

//=== DispatcherLifecycle =================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherLifecycle {
    Unknown,
    Started,
    Running,
    /// Terminal. Nothing is re-created after this point.
    Quit,
}

//=== TickReport ==========================================================

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub began: usize,
    pub moved: usize,
    pub stationary: usize,
    pub ended: usize,
    pub cancelled: usize,

    /// Live touches missing from the snapshot, cancelled by the dispatcher.
    pub forced_cancellations: usize,

    /// Touches handed to the broadcast handler.
    pub unclaimed: usize,

    /// Samples dropped as malformed (bad timestamp or position).
    pub rejected_samples: usize,
}

impl TickReport {
    fn record(&mut self, phase: TouchPhase, count: usize) {
        match phase {
            TouchPhase::Began => self.began += count,
            TouchPhase::Moved => self.moved += count,
            TouchPhase::Stationary => self.stationary += count,
            TouchPhase::Ended => self.ended += count,
            TouchPhase::Cancelled => self.cancelled += count,
        }
    }

    /// Touches dispatched across all buckets.
    pub fn dispatched(&self) -> usize {
        self.began + self.moved + self.stationary + self.ended + self.cancelled
    }
}

//=== TouchDispatcher =====================================================

/// Owns the canonical touch list and drives both handlers once per tick.
pub struct TouchDispatcher {
    lifecycle: DispatcherLifecycle,
    metrics: DisplayMetrics,
    thresholds: TapThresholds,

    touches: Vec<Touch>,
    exclusive: ExclusiveHandler,
    broadcast: BroadcastHandler,

    last_tick: Option<f64>,
    /// Terminal phases reported on a contact's first sighting, delivered
    /// on the tick after its Began.
    deferred_terminal: HashMap<TouchId, TouchPhase>,
}

impl TouchDispatcher {
    //--- Construction -----------------------------------------------------

    pub fn new(metrics: DisplayMetrics) -> Self {
        Self {
            lifecycle: DispatcherLifecycle::Unknown,
            metrics,
            thresholds: TapThresholds::default(),
            touches: Vec::new(),
            exclusive: ExclusiveHandler::new(),
            broadcast: BroadcastHandler::new(),
            last_tick: None,
            deferred_terminal: HashMap::new(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: TapThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    //--- Lifecycle --------------------------------------------------------

    /// Moves `Unknown` to `Started`; no-op once started.
    pub fn start(&mut self) -> Result<(), DispatchError> {
        self.ensure_alive("start")?;
        if self.lifecycle == DispatcherLifecycle::Unknown {
            debug!(target: "touch::dispatch", "Dispatcher started");
            self.lifecycle = DispatcherLifecycle::Started;
        }
        Ok(())
    }

    /// Cancels every live touch, drops all bindings and enters `Quit`.
    pub fn quit(&mut self) {
        if self.lifecycle == DispatcherLifecycle::Quit {
            return;
        }

        let mut live: Vec<&mut Touch> = self.touches.iter_mut().filter(|t| !t.phase().is_terminal()).collect();
        for touch in live.iter_mut() {
            if let Err(e) = touch.set_phase(TouchPhase::Cancelled) {
                warn!(target: "touch::dispatch", "Touch {}: {}", touch.id(), e);
            }
        }

        if !live.is_empty() {
            debug!(target: "touch::dispatch", "Cancelling {} touches on quit", live.len());
            match self.exclusive.dispatch(TouchPhase::Cancelled, &mut live) {
                Ok(unclaimed) => {
                    let leftovers: Vec<&Touch> = live
                        .iter()
                        .filter(|t| unclaimed.contains(&t.id()))
                        .map(|t| &**t)
                        .collect();
                    if let Err(e) = self.broadcast.dispatch(TouchPhase::Cancelled, &leftovers) {
                        error!(target: "touch::dispatch", "Broadcast cancel on quit failed: {}", e);
                    }
                }
                Err(e) => error!(target: "touch::dispatch", "Exclusive cancel on quit failed: {}", e),
            }
        }

        self.touches.clear();
        self.deferred_terminal.clear();
        for result in [self.exclusive.clear(), self.broadcast.clear()] {
            if let Err(e) = result {
                error!(target: "touch::dispatch", "Clearing bindings on quit failed: {}", e);
            }
        }

        debug!(target: "touch::dispatch", "Dispatcher quit");
        self.lifecycle = DispatcherLifecycle::Quit;
    }

    pub fn lifecycle(&self) -> DispatcherLifecycle {
        self.lifecycle
    }

    //--- Tick -------------------------------------------------------------

    /// Polls `source` once and dispatches the resulting touches.
    ///
    /// `now` is a monotonic timestamp in seconds. A `now` earlier than the
    /// previous tick leaves every touch position as it was for this tick.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Terminated`] after [`quit`](Self::quit).
    pub fn tick(&mut self, source: &mut dyn InputSource, now: f64) -> Result<TickReport, DispatchError> {
        self.ensure_alive("tick")?;
        if self.lifecycle == DispatcherLifecycle::Unknown {
            self.start()?;
        }

        let reaped = self.exclusive.housekeeping() + self.broadcast.housekeeping();
        if reaped > 0 {
            debug!(target: "touch::dispatch", "Reaped {} dead bindings", reaped);
            self.refresh_bound();
        }

        let mut report = TickReport::default();

        let dt = match self.last_tick {
            _ if !now.is_finite() => None,
            Some(last) if now < last => None,
            Some(last) => Some(now - last),
            None => Some(0.0),
        };
        match dt {
            Some(_) => self.last_tick = Some(now),
            None => warn!(
                target: "touch::dispatch",
                "Tick timestamp {} precedes {:?}; keeping previous positions",
                now,
                self.last_tick
            ),
        }
        let stamp = if now.is_finite() { now } else { self.last_tick.unwrap_or(0.0) };

        //--- Reconcile & Admit --------------------------------------------
        let snapshot = source.poll();
        let mut seen: HashSet<TouchId> = HashSet::with_capacity(snapshot.len());
        let mut fresh: Vec<RawContact> = Vec::new();

        for raw in snapshot {
            if !seen.insert(raw.id) {
                warn!(target: "touch::dispatch", "Duplicate contact {} in one snapshot ignored", raw.id);
                continue;
            }
            match self.touches.iter_mut().find(|t| t.id() == raw.id) {
                Some(touch) => {
                    self.deferred_terminal.remove(&raw.id);
                    Self::reconcile(touch, raw, dt, &self.metrics, &mut report);
                }
                None => fresh.push(raw),
            }
        }

        for touch in self.touches.iter_mut().filter(|t| !seen.contains(&t.id())) {
            let phase = match self.deferred_terminal.remove(&touch.id()) {
                Some(phase) => phase,
                None => {
                    warn!(target: "touch::dispatch", "Touch {} lost by input source; cancelling", touch.id());
                    report.forced_cancellations += 1;
                    TouchPhase::Cancelled
                }
            };
            if let Err(e) = touch.set_phase(phase) {
                warn!(target: "touch::dispatch", "Touch {}: {}", touch.id(), e);
            }
        }

        for raw in fresh {
            if !raw.position.is_finite() {
                warn!(target: "touch::dispatch", "Contact {} has a non-finite position; not admitted", raw.id);
                report.rejected_samples += 1;
                continue;
            }
            if raw.phase.is_terminal() {
                self.deferred_terminal.insert(raw.id, raw.phase);
            }
            self.touches.push(Touch::begin(raw.id, raw.position, stamp, &self.metrics));
        }

        //--- Dispatch -----------------------------------------------------
        for phase in TouchPhase::DISPATCH_ORDER {
            let mut bucket: Vec<&mut Touch> = self.touches.iter_mut().filter(|t| t.phase() == phase).collect();
            if bucket.is_empty() {
                continue;
            }
            report.record(phase, bucket.len());

            let unclaimed = match self.exclusive.dispatch(phase, &mut bucket) {
                Ok(unclaimed) => unclaimed,
                Err(e) => {
                    error!(target: "touch::dispatch", "{:?} bucket skipped: {}", phase, e);
                    continue;
                }
            };
            let leftovers: Vec<&Touch> = bucket
                .iter()
                .filter(|t| unclaimed.contains(&t.id()))
                .map(|t| &**t)
                .collect();
            report.unclaimed += leftovers.len();

            trace!(
                target: "touch::dispatch",
                "{:?} bucket: {} touches, {} unclaimed",
                phase,
                bucket.len(),
                leftovers.len()
            );
            if let Err(e) = self.broadcast.dispatch(phase, &leftovers) {
                error!(target: "touch::dispatch", "{:?} broadcast skipped: {}", phase, e);
            }
        }

        //--- Retire -------------------------------------------------------
        self.touches.retain(|t| !t.phase().is_terminal());
        let live: HashSet<TouchId> = self.touches.iter().map(Touch::id).collect();
        self.deferred_terminal.retain(|id, _| live.contains(id));

        self.lifecycle = DispatcherLifecycle::Running;
        Ok(report)
    }

    fn reconcile(
        touch: &mut Touch,
        raw: RawContact,
        dt: Option<f64>,
        metrics: &DisplayMetrics,
        report: &mut TickReport,
    ) {
        let phase = match raw.phase {
            // Already admitted: a repeated Began is a continuation.
            TouchPhase::Began if raw.position.is_finite() && metrics.clamp(raw.position) != touch.position() => {
                TouchPhase::Moved
            }
            TouchPhase::Began => TouchPhase::Stationary,
            other => other,
        };

        match dt {
            Some(dt) => {
                if let Err(e) = touch.update(raw.position, dt, metrics) {
                    warn!(target: "touch::dispatch", "Touch {} sample rejected: {}", touch.id(), e);
                    report.rejected_samples += 1;
                }
            }
            None => report.rejected_samples += 1,
        }

        if let Err(e) = touch.set_phase(phase) {
            warn!(target: "touch::dispatch", "Touch {}: {}", touch.id(), e);
        }
    }

    //--- Registration -----------------------------------------------------

    /// Registers an observer with the handler its registration kind names.
    ///
    /// `swallow` only applies to exclusive registrations.
    pub fn register(&mut self, registration: Registration, priority: i32, swallow: bool) -> Result<(), DispatchError> {
        self.ensure_alive("register")?;
        match registration {
            Registration::ExclusiveOnly(o) => {
                self.exclusive
                    .register_target(ExclusiveTarget::Claim(o), priority, swallow)
            }
            Registration::ExclusiveWithUnbound(o) => {
                self.exclusive
                    .register_target(ExclusiveTarget::ClaimWithUnbound(o), priority, swallow)
            }
            Registration::Broadcast(o) => self.broadcast.register_shared(o, priority),
        }
        Ok(())
    }

    /// Removes `key` from both handlers.
    pub fn unregister(&mut self, key: &ObserverKey) {
        self.exclusive.unregister_key(*key);
        self.broadcast.unregister_key(*key);
        self.refresh_bound();
    }

    /// Handle to the exclusive handler, for registering from callbacks.
    pub fn exclusive(&self) -> ExclusiveHandler {
        self.exclusive.clone()
    }

    pub fn broadcast(&self) -> BroadcastHandler {
        self.broadcast.clone()
    }

    //--- State ------------------------------------------------------------

    /// Drops every touch and binding.
    ///
    /// # Errors
    ///
    /// [`DispatchError::DispatchInProgress`] if either handler is
    /// dispatching; nothing is reset in that case.
    pub fn clear(&mut self) -> Result<(), DispatchError> {
        if self.exclusive.is_dispatching() || self.broadcast.is_dispatching() {
            error!(target: "touch::dispatch", "clear() called during dispatch");
            return Err(DispatchError::DispatchInProgress);
        }

        self.exclusive.clear()?;
        self.broadcast.clear()?;
        self.touches.clear();
        self.deferred_terminal.clear();
        self.last_tick = None;
        debug!(target: "touch::dispatch", "Dispatcher cleared");
        Ok(())
    }

    /// Replaces the display metrics and clamps live touches into them.
    pub fn set_display(&mut self, metrics: DisplayMetrics) {
        debug!(target: "touch::dispatch", "Display changed: {:?}", metrics);
        self.metrics = metrics;
        for touch in &mut self.touches {
            touch.reclamp(&self.metrics);
        }
    }

    pub fn display(&self) -> &DisplayMetrics {
        &self.metrics
    }

    pub fn thresholds(&self) -> &TapThresholds {
        &self.thresholds
    }

    /// Live touches, in admission order.
    pub fn touches(&self) -> &[Touch] {
        &self.touches
    }

    pub fn touch(&self, id: TouchId) -> Option<&Touch> {
        self.touches.iter().find(|t| t.id() == id)
    }

    //--- Internal Helpers -------------------------------------------------

    /// Re-reads the bound flag of every live touch from the exclusive claims.
    fn refresh_bound(&mut self) {
        for touch in &mut self.touches {
            let bound = !touch.phase().is_terminal() && self.exclusive.is_claimed(touch.id());
            touch.set_bound(bound);
        }
    }

    fn ensure_alive(&self, operation: &str) -> Result<(), DispatchError> {
        if self.lifecycle == DispatcherLifecycle::Quit {
            warn!(target: "touch::dispatch", "{}() called after quit", operation);
            return Err(DispatchError::Terminated);
        }
        Ok(())
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
