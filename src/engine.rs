//=========================================================================
// Aetheric Touch Engine
//
// Main entry point and coordinator for the runtime.
//
// Architecture:
// ```text
//     EngineBuilder  ──build()──>  Engine  ──run()──>  [Runtime]
//         │                          │
//         ├─ with_tps()              ├─ init(): observer setup on the
//         ├─ with_channel_capacity() │          core thread
//         ├─ with_window_size()      └─ run(): spawns core thread,
//         ├─ with_pixel_density()              runs platform,
//         ├─ with_tap_thresholds()             blocks until exit
//         └─ with_title()
// ```
//
//=========================================================================

//=== External Dependencies ===============================================

use crossbeam_channel::{bounded, Receiver, Sender};
use log::{error, info};

//=== Internal Dependencies ===============================================

use crate::core::dispatch::TouchDispatcher;
use crate::core::platform_bridge::PlatformEvent;
use crate::core::touch::{DisplayMetrics, TapThresholds};
use crate::core::CoreSystemsOrchestrator;
use crate::platform::{Platform, WindowConfig};

//=== EngineBuilder =======================================================

/// Builder for configuring and constructing an [`Engine`].
///
/// # Default Values
///
/// - **TPS**: 60.0 (dispatch ticks per second)
/// - **Channel capacity**: 128 events
/// - **Window**: 800x600, titled "Aetheric Touch"
/// - **Pixel density**: unknown (tap classification reports an error)
/// - **Tap thresholds**: 0.25 units, 0.333 s
///
/// # Examples
///
/// ```no_run
/// use aetheric_touch::EngineBuilder;
///
/// EngineBuilder::new()
///     .with_tps(120.0)
///     .with_pixel_density(160.0)
///     .build()
///     .run();
/// ```
pub struct EngineBuilder {
    tps: f64,
    channel_capacity: usize,
    window: WindowConfig,
    thresholds: TapThresholds,
}

impl EngineBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            tps: 60.0,
            channel_capacity: 128,
            window: WindowConfig::default(),
            thresholds: TapThresholds::default(),
        }
    }

    /// Sets the target ticks per second for the core thread.
    ///
    /// Default: 60.0
    ///
    /// # Panics
    ///
    /// Panics if `tps <= 0.0`.
    pub fn with_tps(mut self, tps: f64) -> Self {
        assert!(tps > 0.0, "TPS must be positive, got {}", tps);
        self.tps = tps;
        self
    }

    /// Sets the channel capacity for platform → core communication.
    ///
    /// Default: 128
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        assert!(capacity > 0, "Channel capacity must be positive");
        self.channel_capacity = capacity;
        self
    }

    /// Sets the initial logical window size.
    ///
    /// # Panics
    ///
    /// Panics if either dimension is zero.
    pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
        assert!(width > 0 && height > 0, "Window size must be non-zero, got {}x{}", width, height);
        self.window.width = width;
        self.window.height = height;
        self
    }

    /// Sets the display density in pixels per device-independent unit.
    ///
    /// # Panics
    ///
    /// Panics unless `density` is finite and positive.
    pub fn with_pixel_density(mut self, density: f32) -> Self {
        assert!(
            density.is_finite() && density > 0.0,
            "Pixel density must be positive, got {}",
            density
        );
        self.window.pixel_density = Some(density);
        self
    }

    /// Overrides the tap classification limits.
    ///
    /// # Panics
    ///
    /// Panics if either limit is not positive.
    pub fn with_tap_thresholds(mut self, thresholds: TapThresholds) -> Self {
        assert!(
            thresholds.max_distance > 0.0 && thresholds.max_duration > 0.0,
            "Tap thresholds must be positive"
        );
        self.thresholds = thresholds;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.window.title = title.into();
        self
    }

    /// Builds the engine instance.
    pub fn build(self) -> Engine {
        info!(
            "Building engine (TPS: {}, channel: {}, window: {}x{})",
            self.tps, self.channel_capacity, self.window.width, self.window.height
        );

        let mut metrics = DisplayMetrics::new(self.window.width as f32, self.window.height as f32);
        if let Some(density) = self.window.pixel_density {
            metrics = metrics.with_pixel_density(density);
        }

        Engine {
            orchestrator: CoreSystemsOrchestrator::new(metrics, self.thresholds),
            tps: self.tps,
            channel_capacity: self.channel_capacity,
            window: self.window,
        }
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//=== Engine ==============================================================

/// Aetheric Touch runtime.
///
/// # Architecture
///
/// ```text
/// Engine (Main Thread)
///   ├─► CoreSystemsOrchestrator (Core Thread @ TPS)
///   │     └─► ContactTracker → TouchDispatcher → observers
///   │
///   └─► Platform (Event Loop)
///         └─► Window, touch and pointer input
///
/// Communication: bounded channel (PlatformEvent)
/// ```
pub struct Engine {
    orchestrator: CoreSystemsOrchestrator,
    tps: f64,
    channel_capacity: usize,
    window: WindowConfig,
}

impl Engine {
    //--- Initialization ---------------------------------------------------

    /// Sets up observers before the first tick.
    ///
    /// The closure runs on the core thread, where the dispatcher lives, so
    /// `Rc`-based observers are created inside it.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::{cell::RefCell, rc::Rc};
    /// use aetheric_touch::prelude::*;
    ///
    /// struct Logger;
    /// impl BroadcastObserver for Logger {
    ///     fn on_touches_began(&mut self, touches: &[&Touch]) {
    ///         println!("{} touches began", touches.len());
    ///     }
    /// }
    ///
    /// EngineBuilder::new()
    ///     .build()
    ///     .init(|dispatcher| {
    ///         let logger = Rc::new(RefCell::new(Logger));
    ///         dispatcher.register(Registration::broadcast(&logger), 0, false).unwrap();
    ///     })
    ///     .run();
    /// ```
    pub fn init<F>(mut self, init_fn: F) -> Self
    where
        F: FnOnce(&mut TouchDispatcher) + Send + 'static,
    {
        info!("Registering core initialization");
        self.orchestrator.set_init(Box::new(init_fn));
        self
    }

    //--- Execution --------------------------------------------------------

    /// Starts the runtime and blocks until the application exits.
    ///
    /// # Lifecycle
    ///
    /// 1. Creates the bounded channel for platform → core communication
    /// 2. Spawns the core thread running at the configured TPS
    /// 3. Runs the platform event loop (blocks here)
    /// 4. On window close: `WindowClosed` → core thread quits the dispatcher
    pub fn run(self) {
        info!("Starting engine runtime (TPS: {})", self.tps);

        //--- 1. Create communication channel -----------------------------
        let (tx, rx): (Sender<PlatformEvent>, Receiver<PlatformEvent>) = bounded(self.channel_capacity);

        info!("Channel created (capacity: {})", self.channel_capacity);

        //--- 2. Spawn the core logic thread -------------------------------
        let core_handle = self.orchestrator.spawn_core_thread(rx, self.tps);
        info!("Core logic thread spawned");

        //--- 3. Launch the platform subsystem -----------------------------
        let platform = Platform::new(tx, self.window);
        info!("Platform initialized, entering event loop");

        if let Err(e) = platform.run() {
            error!("Platform error: {}", e);
        }

        info!("Platform event loop exited");

        //--- 4. Cleanup: Wait for logic thread to terminate --------------
        match core_handle.join() {
            Ok(()) => info!("Core thread terminated cleanly"),
            Err(e) => error!("Core thread panicked: {:?}", e),
        }

        info!("Engine shutdown complete");
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
