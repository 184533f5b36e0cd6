//=========================================================================
// Exclusive Dispatch Handler
//=========================================================================
//
// Single-touch handler: bindings claim individual touches.
//
// Per touch, in batch order:
//   1. Bound pass over the sorted bindings
//        Began           → on_began() may claim; a swallowing claimer
//                          stops the walk
//        Moved/Stationary→ claimers only; a swallowing claimer stops
//                          the walk
//        Ended/Cancelled → every claimer, claim released afterwards
//   2. Unbound pass, only for touches never claimed in their lifetime
//        on_unbound_<phase>() may claim; swallow per binding
//   3. Touches nobody holds after both passes are returned as unclaimed
//
// The handler stays locked for the whole batch. Registrations made by
// callbacks are applied once the batch completes.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use log::{debug, trace};

//=== Internal Dependencies ===============================================

use super::observer::{
    ExclusiveObserver, ObserverKey, SharedExclusive, SharedUnbound, UnboundObserver,
};
use super::registry::{BindingEntry, BindingRegistry};
use super::DispatchError;
use crate::core::touch::{Touch, TouchId, TouchPhase};

//=== ExclusiveTarget =====================================================

/// Observer of an exclusive binding, tagged by capability.
#[derive(Clone)]
pub(crate) enum ExclusiveTarget {
    Claim(SharedExclusive),
    ClaimWithUnbound(SharedUnbound),
}

impl ExclusiveTarget {
    /// An observer borrowed by a callback in progress counts as alive.
    fn is_alive(&self) -> bool {
        match self {
            Self::Claim(o) => o.try_borrow().map_or(true, |o| o.is_alive()),
            Self::ClaimWithUnbound(o) => o.try_borrow().map_or(true, |o| o.is_alive()),
        }
    }

    fn offer(&self, touch: &Touch) -> bool {
        match self {
            Self::Claim(o) => o.borrow_mut().on_began(touch),
            Self::ClaimWithUnbound(o) => o.borrow_mut().on_began(touch),
        }
    }

    fn notify(&self, touch: &Touch) {
        match self {
            Self::Claim(o) => notify_claimed(&mut *o.borrow_mut(), touch),
            Self::ClaimWithUnbound(o) => notify_claimed(&mut *o.borrow_mut(), touch),
        }
    }

    /// Offers a never-claimed touch; `false` for claim-only observers.
    fn offer_unbound(&self, touch: &Touch) -> bool {
        let Self::ClaimWithUnbound(o) = self else {
            return false;
        };
        let mut observer = o.borrow_mut();
        match touch.phase() {
            TouchPhase::Began => observer.on_unbound_began(touch),
            TouchPhase::Moved | TouchPhase::Stationary => observer.on_unbound_moved(touch),
            TouchPhase::Ended => observer.on_unbound_ended(touch),
            TouchPhase::Cancelled => observer.on_unbound_cancelled(touch),
        }
    }
}

fn notify_claimed<O: ExclusiveObserver + ?Sized>(observer: &mut O, touch: &Touch) {
    match touch.phase() {
        TouchPhase::Began => {}
        TouchPhase::Moved | TouchPhase::Stationary => observer.on_moved(touch),
        TouchPhase::Ended => observer.on_ended(touch),
        TouchPhase::Cancelled => observer.on_cancelled(touch),
    }
}

//=== ExclusiveBinding ====================================================

pub(crate) struct ExclusiveBinding {
    target: ExclusiveTarget,
    swallow: bool,
    claims: HashSet<TouchId>,
}

impl BindingEntry for ExclusiveBinding {
    fn is_alive(&self) -> bool {
        self.target.is_alive()
    }

    /// Re-registration keeps live claims.
    fn merge(&mut self, update: Self) {
        self.target = update.target;
        self.swallow = update.swallow;
    }
}

//=== Walker ==============================================================

/// Binding as seen by one dispatch call.
struct Walker {
    slot: usize,
    target: ExclusiveTarget,
    swallow: bool,
}

//=== ExclusiveHandler ====================================================

/// Handle to the exclusive (claiming) binding list.
///
/// Cloning yields another handle to the same list, so observers can keep
/// one and register or unregister from inside their own callbacks.
#[derive(Clone)]
pub struct ExclusiveHandler {
    registry: Rc<RefCell<BindingRegistry<ExclusiveBinding>>>,
}

impl ExclusiveHandler {
    pub fn new() -> Self {
        Self {
            registry: Rc::new(RefCell::new(BindingRegistry::new())),
        }
    }

    //--- Registration -----------------------------------------------------

    /// Registers a claim-only observer.
    ///
    /// Registering an observer again updates its priority and swallow flag
    /// instead of adding a second binding. Deferred while dispatching.
    pub fn register<O: ExclusiveObserver + 'static>(&self, observer: &Rc<RefCell<O>>, priority: i32, swallow: bool) {
        let shared: SharedExclusive = observer.clone();
        self.register_target(ExclusiveTarget::Claim(shared), priority, swallow);
    }

    /// Registers an observer that also answers the unbound pass.
    pub fn register_with_unbound<O: UnboundObserver + 'static>(
        &self,
        observer: &Rc<RefCell<O>>,
        priority: i32,
        swallow: bool,
    ) {
        let shared: SharedUnbound = observer.clone();
        self.register_target(ExclusiveTarget::ClaimWithUnbound(shared), priority, swallow);
    }

    pub(crate) fn register_target(&self, target: ExclusiveTarget, priority: i32, swallow: bool) {
        let key = match &target {
            ExclusiveTarget::Claim(o) => ObserverKey::of(o),
            ExclusiveTarget::ClaimWithUnbound(o) => ObserverKey::of(o),
        };
        debug!(
            target: "touch::dispatch",
            "Exclusive register {:?} (priority {}, swallow {})",
            key, priority, swallow
        );

        self.registry.borrow_mut().register(
            key,
            priority,
            ExclusiveBinding {
                target,
                swallow,
                claims: HashSet::new(),
            },
        );
    }

    /// Removes the binding of `observer`; no-op if absent.
    pub fn unregister<T: ?Sized>(&self, observer: &Rc<RefCell<T>>) {
        self.unregister_key(ObserverKey::of(observer));
    }

    pub fn unregister_key(&self, key: ObserverKey) {
        debug!(target: "touch::dispatch", "Exclusive unregister {:?}", key);
        self.registry.borrow_mut().unregister(key);
    }

    //--- Dispatch ---------------------------------------------------------

    /// Routes one phase batch through the bindings.
    ///
    /// Every touch in `touches` must be in `phase`. Returns the ids of the
    /// touches no binding holds after both passes, in batch order.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Reentrant`] if this handler is already dispatching.
    pub fn dispatch(&self, phase: TouchPhase, touches: &mut [&mut Touch]) -> Result<Vec<TouchId>, DispatchError> {
        let walkers: Vec<Walker> = {
            let mut registry = self.registry.borrow_mut();
            registry.begin_dispatch()?;
            registry
                .ordered()
                .map(|(slot, entry)| Walker {
                    slot,
                    target: entry.binding.target.clone(),
                    swallow: entry.binding.swallow,
                })
                .collect()
        };

        trace!(
            target: "touch::dispatch",
            "Exclusive {:?}: {} touches, {} bindings",
            phase,
            touches.len(),
            walkers.len()
        );

        let mut unclaimed = Vec::new();
        for touch in touches.iter_mut() {
            debug_assert_eq!(touch.phase(), phase, "touch batched under the wrong phase");

            let mut held = self.bound_pass(touch, &walkers);
            if !held && !touch.was_ever_bound() {
                held = self.unbound_pass(touch, &walkers);
            }

            if !held {
                unclaimed.push(touch.id());
            }
        }

        // Removals made by callbacks drop their claims here.
        self.registry.borrow_mut().end_dispatch();
        for touch in touches.iter_mut() {
            let still_bound = !phase.is_terminal() && self.is_claimed(touch.id());
            touch.set_bound(still_bound);
        }

        Ok(unclaimed)
    }

    //--- Passes -----------------------------------------------------------

    /// Returns `true` if some binding held the touch during this pass.
    fn bound_pass(&self, touch: &mut Touch, walkers: &[Walker]) -> bool {
        let id = touch.id();
        let mut held = false;

        match touch.phase() {
            TouchPhase::Began => {
                for walker in walkers {
                    if !walker.target.is_alive() {
                        continue;
                    }
                    if walker.target.offer(touch) {
                        self.claim(walker.slot, id);
                        touch.set_bound(true);
                        held = true;
                        if walker.swallow {
                            break;
                        }
                    }
                }
            }

            TouchPhase::Moved | TouchPhase::Stationary => {
                for walker in walkers {
                    if !self.holds(walker.slot, id) {
                        continue;
                    }
                    held = true;
                    if walker.target.is_alive() {
                        walker.target.notify(touch);
                    }
                    if walker.swallow {
                        break;
                    }
                }
            }

            TouchPhase::Ended | TouchPhase::Cancelled => {
                for walker in walkers {
                    if !self.holds(walker.slot, id) {
                        continue;
                    }
                    held = true;
                    if walker.target.is_alive() {
                        walker.target.notify(touch);
                    }
                    self.release(walker.slot, id);
                }
            }
        }

        held
    }

    /// Lets unbound-capable bindings claim a touch nobody ever claimed.
    fn unbound_pass(&self, touch: &mut Touch, walkers: &[Walker]) -> bool {
        let id = touch.id();
        let mut held = false;

        for walker in walkers {
            if !walker.target.is_alive() {
                continue;
            }
            if walker.target.offer_unbound(touch) {
                trace!(target: "touch::dispatch", "Touch {} claimed in unbound pass", id);
                if !touch.phase().is_terminal() {
                    self.claim(walker.slot, id);
                }
                touch.set_bound(true);
                held = true;
                if walker.swallow {
                    break;
                }
            }
        }

        held
    }

    //--- Claim Bookkeeping ------------------------------------------------

    fn holds(&self, slot: usize, id: TouchId) -> bool {
        self.registry
            .borrow()
            .binding(slot)
            .is_some_and(|b| b.claims.contains(&id))
    }

    fn claim(&self, slot: usize, id: TouchId) {
        if let Some(binding) = self.registry.borrow_mut().binding_mut(slot) {
            binding.claims.insert(id);
        }
    }

    fn release(&self, slot: usize, id: TouchId) {
        if let Some(binding) = self.registry.borrow_mut().binding_mut(slot) {
            binding.claims.remove(&id);
        }
    }

    //--- Queries & Housekeeping -------------------------------------------

    /// `true` if any registered binding holds a claim on `id`.
    pub fn is_claimed(&self, id: TouchId) -> bool {
        self.registry.borrow().bindings().any(|b| b.claims.contains(&id))
    }

    /// Touches currently claimed by `key`, sorted by id.
    pub fn claimed_touches(&self, key: &ObserverKey) -> Vec<TouchId> {
        let registry = self.registry.borrow();
        let mut ids: Vec<TouchId> = registry
            .get(key)
            .map(|slot| slot.binding.claims.iter().copied().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

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

    /// Reaps bindings whose observer is no longer alive.
    pub fn housekeeping(&self) -> usize {
        self.registry.borrow_mut().reap_dead()
    }

    /// Drops every binding and claim.
    ///
    /// # Errors
    ///
    /// [`DispatchError::DispatchInProgress`] while dispatching; nothing is
    /// cleared in that case.
    pub fn clear(&self) -> Result<(), DispatchError> {
        self.registry.borrow_mut().clear()
    }
}

impl Default for ExclusiveHandler {
    fn default() -> Self {
        Self::new()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::touch::{DisplayMetrics, Vec2};

    //--- Test Helpers -----------------------------------------------------

    type Log = Rc<RefCell<Vec<String>>>;

    /// Records every callback as "<name>:<event>:<touch id>".
    struct Recorder {
        name: &'static str,
        log: Log,
        claim: bool,
        claim_unbound_on: Option<TouchPhase>,
        alive: bool,
        on_began_hook: Option<Box<dyn FnMut()>>,
    }

    impl Recorder {
        fn new(name: &'static str, log: &Log, claim: bool) -> Rc<RefCell<Self>> {
            Rc::new(RefCell::new(Self {
                name,
                log: log.clone(),
                claim,
                claim_unbound_on: None,
                alive: true,
                on_began_hook: None,
            }))
        }

        fn record(&self, event: &str, touch: &Touch) {
            self.log
                .borrow_mut()
                .push(format!("{}:{}:{}", self.name, event, touch.id().0));
        }
    }

    impl ExclusiveObserver for Recorder {
        fn on_began(&mut self, touch: &Touch) -> bool {
            self.record("began", touch);
            if let Some(hook) = self.on_began_hook.as_mut() {
                hook();
            }
            self.claim
        }

        fn on_moved(&mut self, touch: &Touch) {
            self.record("moved", touch);
        }

        fn on_ended(&mut self, touch: &Touch) {
            self.record("ended", touch);
        }

        fn on_cancelled(&mut self, touch: &Touch) {
            self.record("cancelled", touch);
        }

        fn is_alive(&self) -> bool {
            self.alive
        }
    }

    impl UnboundObserver for Recorder {
        fn on_unbound_began(&mut self, touch: &Touch) -> bool {
            self.record("unbound_began", touch);
            self.claim_unbound_on == Some(TouchPhase::Began)
        }

        fn on_unbound_moved(&mut self, touch: &Touch) -> bool {
            self.record("unbound_moved", touch);
            self.claim_unbound_on == Some(touch.phase())
        }

        fn on_unbound_ended(&mut self, touch: &Touch) -> bool {
            self.record("unbound_ended", touch);
            self.claim_unbound_on == Some(TouchPhase::Ended)
        }

        fn on_unbound_cancelled(&mut self, touch: &Touch) -> bool {
            self.record("unbound_cancelled", touch);
            self.claim_unbound_on == Some(TouchPhase::Cancelled)
        }
    }

    fn new_log() -> Log {
        Rc::new(RefCell::new(Vec::new()))
    }

    fn take(log: &Log) -> Vec<String> {
        std::mem::take(&mut *log.borrow_mut())
    }

    fn touch(id: i64) -> Touch {
        Touch::begin(TouchId(id), Vec2::new(10.0, 10.0), 0.0, &DisplayMetrics::default())
    }

    fn advance(touch: &mut Touch, phase: TouchPhase) {
        touch.set_phase(phase).unwrap();
    }

    fn dispatch(handler: &ExclusiveHandler, touches: &mut [Touch]) -> Vec<TouchId> {
        let phase = touches[0].phase();
        let mut batch: Vec<&mut Touch> = touches.iter_mut().collect();
        handler.dispatch(phase, &mut batch).unwrap()
    }

    //=====================================================================
    // Priority & Swallow
    //=====================================================================

    #[test]
    fn began_visits_by_priority_then_registration() {
        let log = new_log();
        let handler = ExclusiveHandler::new();
        let p10 = Recorder::new("p10", &log, false);
        let p5a = Recorder::new("p5a", &log, false);
        let p5b = Recorder::new("p5b", &log, false);
        let p1 = Recorder::new("p1", &log, false);

        handler.register(&p1, 1, false);
        handler.register(&p5a, 5, false);
        handler.register(&p10, 10, false);
        handler.register(&p5b, 5, false);

        dispatch(&handler, &mut [touch(0)]);

        assert_eq!(take(&log), vec!["p10:began:0", "p5a:began:0", "p5b:began:0", "p1:began:0"]);
    }

    #[test]
    fn swallowing_claim_stops_lower_bindings() {
        let log = new_log();
        let handler = ExclusiveHandler::new();
        let top = Recorder::new("top", &log, true);
        let low = Recorder::new("low", &log, true);
        handler.register(&top, 10, true);
        handler.register(&low, 1, true);

        let unclaimed = dispatch(&handler, &mut [touch(7)]);

        assert!(unclaimed.is_empty());
        assert_eq!(take(&log), vec!["top:began:7"]);
        assert_eq!(handler.claimed_touches(&ObserverKey::of(&top)), vec![TouchId(7)]);
        assert!(handler.claimed_touches(&ObserverKey::of(&low)).is_empty());
    }

    #[test]
    fn non_swallowing_claim_lets_others_claim_too() {
        let log = new_log();
        let handler = ExclusiveHandler::new();
        let top = Recorder::new("top", &log, true);
        let low = Recorder::new("low", &log, true);
        handler.register(&top, 10, false);
        handler.register(&low, 1, false);

        let mut touches = [touch(1)];
        dispatch(&handler, &mut touches);

        assert_eq!(take(&log), vec!["top:began:1", "low:began:1"]);
        assert!(touches[0].is_bound());
        assert!(touches[0].was_ever_bound());
    }

    #[test]
    fn declined_touch_is_returned_unclaimed() {
        let log = new_log();
        let handler = ExclusiveHandler::new();
        let shy = Recorder::new("shy", &log, false);
        handler.register(&shy, 0, true);

        let mut touches = [touch(1), touch(2)];
        let unclaimed = dispatch(&handler, &mut touches);

        assert_eq!(unclaimed, vec![TouchId(1), TouchId(2)]);
        assert!(!touches[0].is_bound());
    }

    //=====================================================================
    // Claimed Lifecycle
    //=====================================================================

    #[test]
    fn only_claimers_see_moves_and_ends() {
        let log = new_log();
        let handler = ExclusiveHandler::new();
        let claimer = Recorder::new("claimer", &log, true);
        let other = Recorder::new("other", &log, false);
        handler.register(&claimer, 1, false);
        handler.register(&other, 0, false);

        let mut touches = [touch(3)];
        dispatch(&handler, &mut touches);
        take(&log);

        advance(&mut touches[0], TouchPhase::Moved);
        let unclaimed = dispatch(&handler, &mut touches);
        assert!(unclaimed.is_empty());
        assert_eq!(take(&log), vec!["claimer:moved:3"]);

        advance(&mut touches[0], TouchPhase::Stationary);
        dispatch(&handler, &mut touches);
        assert_eq!(take(&log), vec!["claimer:moved:3"]);

        advance(&mut touches[0], TouchPhase::Ended);
        let unclaimed = dispatch(&handler, &mut touches);
        assert!(unclaimed.is_empty());
        assert_eq!(take(&log), vec!["claimer:ended:3"]);
        assert!(!touches[0].is_bound());
        assert!(handler.claimed_touches(&ObserverKey::of(&claimer)).is_empty());
    }

    #[test]
    fn terminal_phase_reaches_every_claimer() {
        let log = new_log();
        let handler = ExclusiveHandler::new();
        let a = Recorder::new("a", &log, true);
        let b = Recorder::new("b", &log, true);
        handler.register(&a, 2, false);
        handler.register(&b, 1, false);

        let mut touches = [touch(4)];
        dispatch(&handler, &mut touches);
        take(&log);

        // Later swallow must not strand b's claim.
        handler.register(&a, 2, true);
        advance(&mut touches[0], TouchPhase::Cancelled);
        dispatch(&handler, &mut touches);

        assert_eq!(take(&log), vec!["a:cancelled:4", "b:cancelled:4"]);
        assert!(handler.claimed_touches(&ObserverKey::of(&b)).is_empty());
    }

    #[test]
    fn swallowing_claimer_hides_moves_from_lower_claimers() {
        let log = new_log();
        let handler = ExclusiveHandler::new();
        let a = Recorder::new("a", &log, true);
        let b = Recorder::new("b", &log, true);
        handler.register(&a, 2, false);
        handler.register(&b, 1, false);

        let mut touches = [touch(4)];
        dispatch(&handler, &mut touches);
        take(&log);

        handler.register(&a, 2, true);
        advance(&mut touches[0], TouchPhase::Moved);
        dispatch(&handler, &mut touches);

        assert_eq!(take(&log), vec!["a:moved:4"]);
    }

    //=====================================================================
    // Unbound Pass
    //=====================================================================

    #[test]
    fn unbound_observer_can_claim_mid_gesture() {
        let log = new_log();
        let handler = ExclusiveHandler::new();
        let late = Recorder::new("late", &log, false);
        late.borrow_mut().claim_unbound_on = Some(TouchPhase::Moved);
        handler.register_with_unbound(&late, 0, true);

        let mut touches = [touch(5)];
        let unclaimed = dispatch(&handler, &mut touches);
        assert_eq!(unclaimed, vec![TouchId(5)]);
        assert_eq!(take(&log), vec!["late:began:5", "late:unbound_began:5"]);

        advance(&mut touches[0], TouchPhase::Moved);
        let unclaimed = dispatch(&handler, &mut touches);
        assert!(unclaimed.is_empty());
        assert_eq!(take(&log), vec!["late:unbound_moved:5"]);
        assert!(touches[0].is_bound());

        advance(&mut touches[0], TouchPhase::Ended);
        dispatch(&handler, &mut touches);
        assert_eq!(take(&log), vec!["late:ended:5"]);
    }

    #[test]
    fn unbound_pass_skips_claim_only_observers() {
        let log = new_log();
        let handler = ExclusiveHandler::new();
        let plain = Recorder::new("plain", &log, false);
        handler.register(&plain, 0, false);

        let mut touches = [touch(6)];
        dispatch(&handler, &mut touches);
        advance(&mut touches[0], TouchPhase::Moved);
        let unclaimed = dispatch(&handler, &mut touches);

        assert_eq!(unclaimed, vec![TouchId(6)]);
        assert_eq!(take(&log), vec!["plain:began:6"]);
    }

    #[test]
    fn previously_bound_touch_skips_unbound_pass() {
        let log = new_log();
        let handler = ExclusiveHandler::new();
        let owner = Recorder::new("owner", &log, true);
        let late = Recorder::new("late", &log, false);
        late.borrow_mut().claim_unbound_on = Some(TouchPhase::Moved);
        handler.register(&owner, 5, true);
        handler.register_with_unbound(&late, 0, true);

        let mut touches = [touch(8)];
        dispatch(&handler, &mut touches);
        handler.unregister(&owner);
        take(&log);

        advance(&mut touches[0], TouchPhase::Moved);
        let unclaimed = dispatch(&handler, &mut touches);

        assert_eq!(unclaimed, vec![TouchId(8)], "Orphaned claim goes unclaimed, not unbound");
        assert!(take(&log).is_empty());
    }

    #[test]
    fn unbound_terminal_claim_is_not_retained() {
        let log = new_log();
        let handler = ExclusiveHandler::new();
        let sweeper = Recorder::new("sweeper", &log, false);
        sweeper.borrow_mut().claim_unbound_on = Some(TouchPhase::Ended);
        handler.register_with_unbound(&sweeper, 0, false);

        let mut touches = [touch(9)];
        dispatch(&handler, &mut touches);
        advance(&mut touches[0], TouchPhase::Ended);
        let unclaimed = dispatch(&handler, &mut touches);

        assert!(unclaimed.is_empty());
        assert!(handler.claimed_touches(&ObserverKey::of(&sweeper)).is_empty());
        assert!(touches[0].was_ever_bound());
        assert!(!touches[0].is_bound());
    }

    #[test]
    fn binding_that_claimed_one_touch_may_answer_unbound_for_another() {
        let log = new_log();
        let handler = ExclusiveHandler::new();
        let both = Recorder::new("both", &log, true);
        both.borrow_mut().claim_unbound_on = Some(TouchPhase::Moved);
        handler.register_with_unbound(&both, 0, true);

        // Touch 1 is claimed on Began; touch 2 began before the binding existed.
        let mut first = [touch(1)];
        dispatch(&handler, &mut first);
        let mut second = touch(2);
        take(&log);

        advance(&mut first[0], TouchPhase::Moved);
        advance(&mut second, TouchPhase::Moved);
        let mut batch: Vec<&mut Touch> = vec![&mut first[0], &mut second];
        let unclaimed = handler.dispatch(TouchPhase::Moved, &mut batch).unwrap();

        assert!(unclaimed.is_empty());
        assert_eq!(take(&log), vec!["both:moved:1", "both:unbound_moved:2"]);
    }

    //=====================================================================
    // Re-entrancy
    //=====================================================================

    #[test]
    fn self_unregister_applies_from_next_dispatch() {
        let log = new_log();
        let handler = ExclusiveHandler::new();
        let quitter = Recorder::new("quitter", &log, false);
        let after = Recorder::new("after", &log, false);
        handler.register(&quitter, 10, false);
        handler.register(&after, 1, false);

        let h = handler.clone();
        let key = ObserverKey::of(&quitter);
        quitter.borrow_mut().on_began_hook = Some(Box::new(move || h.unregister_key(key)));

        dispatch(&handler, &mut [touch(1), touch(2)]);
        assert_eq!(
            take(&log),
            vec!["quitter:began:1", "after:began:1", "quitter:began:2", "after:began:2"],
            "Whole batch uses the pre-call binding list"
        );
        assert!(!handler.contains(&key));

        dispatch(&handler, &mut [touch(3)]);
        assert_eq!(take(&log), vec!["after:began:3"]);
    }

    #[test]
    fn claimer_that_unregisters_itself_leaves_touch_unbound() {
        let log = new_log();
        let handler = ExclusiveHandler::new();
        let fleeting = Recorder::new("fleeting", &log, true);
        handler.register(&fleeting, 0, true);

        let h = handler.clone();
        let key = ObserverKey::of(&fleeting);
        fleeting.borrow_mut().on_began_hook = Some(Box::new(move || h.unregister_key(key)));

        let mut touches = [touch(1)];
        let unclaimed = dispatch(&handler, &mut touches);

        assert!(unclaimed.is_empty(), "Claimed during the call");
        assert!(handler.is_empty());
        assert!(!handler.is_claimed(TouchId(1)));
        assert!(!touches[0].is_bound());
        assert!(touches[0].was_ever_bound());
    }

    #[test]
    fn registration_during_dispatch_is_deferred() {
        let log = new_log();
        let handler = ExclusiveHandler::new();
        let host = Recorder::new("host", &log, false);
        let guest = Recorder::new("guest", &log, false);
        handler.register(&host, 0, false);

        let h = handler.clone();
        let g = guest.clone();
        host.borrow_mut().on_began_hook = Some(Box::new(move || h.register(&g, 100, false)));

        dispatch(&handler, &mut [touch(1)]);
        assert_eq!(take(&log), vec!["host:began:1"]);
        assert_eq!(handler.len(), 2);

        dispatch(&handler, &mut [touch(2)]);
        assert_eq!(take(&log), vec!["guest:began:2", "host:began:2"]);
    }

    #[test]
    fn clear_inside_callback_fails() {
        let log = new_log();
        let handler = ExclusiveHandler::new();
        let host = Recorder::new("host", &log, false);
        handler.register(&host, 0, false);

        let result = Rc::new(RefCell::new(None));
        let (h, r) = (handler.clone(), result.clone());
        host.borrow_mut().on_began_hook = Some(Box::new(move || {
            *r.borrow_mut() = Some(h.clear());
        }));

        dispatch(&handler, &mut [touch(1)]);

        assert_eq!(*result.borrow(), Some(Err(DispatchError::DispatchInProgress)));
        assert_eq!(handler.len(), 1);
    }

    #[test]
    fn nested_dispatch_is_rejected() {
        let log = new_log();
        let handler = ExclusiveHandler::new();
        let host = Recorder::new("host", &log, false);
        handler.register(&host, 0, false);

        let result = Rc::new(RefCell::new(None));
        let (h, r) = (handler.clone(), result.clone());
        host.borrow_mut().on_began_hook = Some(Box::new(move || {
            let mut inner = touch(99);
            let mut batch = vec![&mut inner];
            *r.borrow_mut() = Some(h.dispatch(TouchPhase::Began, &mut batch));
        }));

        dispatch(&handler, &mut [touch(1)]);

        assert_eq!(*result.borrow(), Some(Err(DispatchError::Reentrant)));
        assert!(!handler.is_dispatching());
    }

    //=====================================================================
    // Liveness
    //=====================================================================

    #[test]
    fn dead_observer_is_skipped_then_reaped() {
        let log = new_log();
        let handler = ExclusiveHandler::new();
        let ghost = Recorder::new("ghost", &log, true);
        let live = Recorder::new("live", &log, false);
        handler.register(&ghost, 10, true);
        handler.register(&live, 0, false);

        ghost.borrow_mut().alive = false;
        let unclaimed = dispatch(&handler, &mut [touch(1)]);

        assert_eq!(unclaimed, vec![TouchId(1)]);
        assert_eq!(take(&log), vec!["live:began:1"]);
        assert_eq!(handler.len(), 2, "Reaping waits for housekeeping");

        assert_eq!(handler.housekeeping(), 1);
        assert!(!handler.contains(&ObserverKey::of(&ghost)));
    }
}
