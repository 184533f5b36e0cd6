//=========================================================================
// Core Systems Orchestrator
//
// Coordinator for the touch dispatch core, running on the logic
// (non-platform) thread.
//
// Responsibilities:
// - Own the `TouchDispatcher` and its `ContactTracker` input source
// - Receive platform events over the bounded channel
// - Tick the dispatcher at a fixed rate (TPS)
// - Quit the dispatcher when the window closes or the platform goes away
//
// Notes:
// Observers are `Rc`-based, so the dispatcher is created inside the core
// thread and never leaves it. The platform only talks to it through
// `PlatformEvent` messages.
//
//=========================================================================

//=== Submodules ==========================================================
pub mod dispatch;
pub mod input;
pub(crate) mod platform_bridge;
pub mod touch;

//=== Standard Library Imports ============================================
use std::thread;
use std::time::{Duration, Instant};

//=== External Crates =====================================================
use crossbeam_channel::Receiver;
use log::{error, info};

//=== Internal Modules ====================================================
use dispatch::TouchDispatcher;
use input::ContactTracker;
use platform_bridge::{EventCollector, PlatformEvent, TickControl};
use touch::{DisplayMetrics, TapThresholds};

//=== CoreInit ============================================================

/// Setup run once on the core thread before the first tick.
pub(crate) type CoreInit = Box<dyn FnOnce(&mut TouchDispatcher) + Send + 'static>;

//=== CoreSystemsOrchestrator =============================================
//
// Holds the configuration needed to build the dispatcher on the core
// thread, plus the optional user setup closure.
//
pub(crate) struct CoreSystemsOrchestrator {
    metrics: DisplayMetrics,
    thresholds: TapThresholds,
    init: Option<CoreInit>,
}

impl CoreSystemsOrchestrator {
    //--- Construction -----------------------------------------------------
    pub fn new(metrics: DisplayMetrics, thresholds: TapThresholds) -> Self {
        Self {
            metrics,
            thresholds,
            init: None,
        }
    }

    /// Replaces the setup closure run before the first tick.
    pub fn set_init(&mut self, init: CoreInit) {
        self.init = Some(init);
    }

    //--- spawn_core_thread() ---------------------------------------------
    //
    // Spawns the logic thread ticking the dispatcher at `tps`.
    //
    // Each tick:
    //  1. Collects platform events (exit on close or disconnect)
    //  2. Feeds contacts, display and suspend changes to the core
    //  3. Ticks the dispatcher
    //  4. Sleeps to maintain fixed pacing
    //
    pub fn spawn_core_thread(self, receiver: Receiver<PlatformEvent>, tps: f64) -> thread::JoinHandle<()> {
        let frame_duration = Duration::from_secs_f64(1.0 / tps);

        thread::spawn(move || {
            let mut dispatcher = TouchDispatcher::new(self.metrics).with_thresholds(self.thresholds);
            let mut tracker = ContactTracker::new();
            let mut collector = EventCollector::new(receiver);

            if let Some(init) = self.init {
                init(&mut dispatcher);
            }
            if let Err(e) = dispatcher.start() {
                error!(target: "touch::dispatch", "Dispatcher failed to start: {}", e);
                return;
            }

            let clock = Instant::now();
            loop {
                let frame_start = Instant::now();

                //--- Step 1: Gather platform events ------------------------
                let control = collector.collect_frame();
                Self::apply_platform_events(&mut dispatcher, &mut tracker, collector.take_events());
                if control == TickControl::Exit {
                    info!("Core thread exiting.");
                    break;
                }

                //--- Step 2: Dispatch touches ------------------------------
                if let Err(e) = dispatcher.tick(&mut tracker, clock.elapsed().as_secs_f64()) {
                    error!(target: "touch::dispatch", "Tick failed: {}", e);
                    break;
                }

                //--- Step 3: Maintain deterministic pacing ----------------
                let elapsed = frame_start.elapsed();
                if elapsed < frame_duration {
                    thread::sleep(frame_duration - elapsed);
                }
            }

            dispatcher.quit();
        })
    }

    //--- apply_platform_events() -----------------------------------------
    //
    // Routes one frame of platform events, in arrival order.
    //
    fn apply_platform_events(dispatcher: &mut TouchDispatcher, tracker: &mut ContactTracker, events: Vec<PlatformEvent>) {
        for event in events {
            match event {
                PlatformEvent::Contacts(contacts) => tracker.apply_all(contacts),
                PlatformEvent::DisplayChanged(metrics) => dispatcher.set_display(metrics),
                PlatformEvent::Suspended => tracker.suspend(),
                PlatformEvent::WindowClosed => {}
            }
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
