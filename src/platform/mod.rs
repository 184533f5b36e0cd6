//=========================================================================
// Platform Subsystem
//
// Bridges Winit (OS-level events) with the engine's core thread.
//
// Architecture:
// ```text
//  Main Thread:                     Logic Thread:
//  ┌──────────────────────────┐    ┌──────────────────┐
//  │  Winit Event Loop        │    │  ContactTracker  │
//  │   ↓                      │    │  ↓               │
//  │  InputProcessor          │    │  TouchDispatcher │
//  │   ├─ Touch → contacts    │    │  ↓               │
//  │   └─ Mouse → pointer     │    │  Observers       │
//  │   ↓                      │    │                  │
//  │  InputBuffer             │    └──────────────────┘
//  │   ↓                      │             ↑
//  │  RedrawRequested         │             │
//  │   ↓ (flush)              │             │
//  │  Bounded Channel ────────┼─────────────┘
//  └──────────────────────────┘    PlatformEvent
//
//  Frame Boundary: RedrawRequested
//    → All buffered contacts sent as one batch, in order
//    → Core ticks at fixed TPS (independent of refresh rate)
//    → Empty buffers NOT sent
// ```
//
// Responsibilities:
// - Create and manage the OS window
// - Convert Winit touch/mouse events → engine ContactEvents
// - Report display size changes and host suspension
// - Send batched events to the core thread
//
//=========================================================================

//=== Submodules ==========================================================

mod input_buffer;
mod input_processor;

//=== External Crates =====================================================

use crossbeam_channel::Sender;
use log::*;
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalSize},
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowAttributes},
};

//=== Internal Imports ====================================================

use crate::core::platform_bridge::{PlatformError, PlatformEvent};
use crate::core::touch::DisplayMetrics;
use input_buffer::InputBuffer;
use input_processor::InputProcessor;

//=== WindowConfig ========================================================

/// Window settings chosen through the engine builder.
#[derive(Debug, Clone)]
pub(crate) struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,

    /// Pixels per device-independent unit; winit cannot report it.
    pub pixel_density: Option<f32>,
}

impl WindowConfig {
    /// Display metrics for a window of `size` physical pixels.
    fn metrics(&self, size: PhysicalSize<u32>) -> DisplayMetrics {
        let metrics = DisplayMetrics::new(size.width as f32, size.height as f32);
        match self.pixel_density {
            Some(density) => metrics.with_pixel_density(density),
            None => metrics,
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Aetheric Touch".to_string(),
            width: 800,
            height: 600,
            pixel_density: None,
        }
    }
}

//=== Platform ============================================================

/// Window manager and contact event aggregator.
///
/// Runs on the main thread (Winit requirement on macOS/iOS) and sends
/// batched events to the core thread.
///
/// # Lifecycle
///
/// 1. **Construction**: `Platform::new(sender, config)`
/// 2. **Execution**: `platform.run()` - runs the event loop until exit
/// 3. **Event processing**: Winit calls `ApplicationHandler` methods
/// 4. **Shutdown**: User closes window → sends `WindowClosed` → exits
pub(crate) struct Platform {
    /// OS window handle (None until `resumed()` called).
    window: Option<Window>,

    /// Buffers contact events until `RedrawRequested`.
    buffer: InputBuffer,

    /// Channel to send events to core thread.
    event_sender: Sender<PlatformEvent>,

    /// Converts Winit events to contact events.
    input_processor: InputProcessor,

    config: WindowConfig,
}

impl Platform {
    //--- Construction -----------------------------------------------------

    /// Creates a new platform instance; the window is created in `resumed()`.
    pub fn new(event_sender: Sender<PlatformEvent>, config: WindowConfig) -> Self {
        info!(target: "platform", "Platform subsystem initialized");
        Self {
            window: None,
            buffer: InputBuffer::new(),
            event_sender,
            input_processor: InputProcessor::new(),
            config,
        }
    }

    //--- Execution --------------------------------------------------------

    /// Runs the Winit event loop on the calling (main) thread.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] if the event loop cannot be created or
    /// exits with an error.
    pub fn run(mut self) -> Result<(), PlatformError> {
        debug!(target: "platform", "Starting Winit event loop");

        let event_loop = EventLoop::new().map_err(|e| PlatformError::EventLoopCreation(e.to_string()))?;

        event_loop
            .run_app(&mut self)
            .map_err(|e| PlatformError::EventLoopExecution(e.to_string()))
    }

    //--- Internal Helpers -------------------------------------------------

    /// Sends buffered contacts to the core thread as one batch.
    ///
    /// If the channel is disconnected (core thread exited early), the
    /// events are dropped with a warning so the window can still close.
    fn flush_input_buffer(&mut self) {
        if let Some(contacts) = self.buffer.drain() {
            let count = contacts.len();
            trace!(target: "platform::input", "Flushing {} contact events", count);

            if self.event_sender.send(PlatformEvent::Contacts(contacts)).is_err() {
                warn!(
                    target: "platform::input",
                    "Channel disconnected, dropping {} contact events",
                    count
                );
            }
        }
    }

    fn send(&self, event: PlatformEvent) {
        if self.event_sender.send(event).is_err() {
            warn!(target: "platform", "Channel disconnected, core thread is gone");
        }
    }

    /// Drops buffered and in-flight pointer state and tells the core.
    fn suspend_input(&mut self) {
        self.buffer.clear();
        self.input_processor.reset();
        self.send(PlatformEvent::Suspended);
    }

    //--- Test Accessors ---------------------------------------------------

    #[cfg(test)]
    pub(crate) fn window(&self) -> Option<&Window> {
        self.window.as_ref()
    }
}

//=== Winit Integration ===================================================

impl ApplicationHandler for Platform {
    /// Called when app becomes active (startup or mobile resume).
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            debug!(target: "platform", "Window already exists (mobile resume?)");
            let metrics = self.config.metrics(window.inner_size());
            self.send(PlatformEvent::DisplayChanged(metrics));
            return;
        }

        let attrs = WindowAttributes::default()
            .with_title(self.config.title.clone())
            .with_inner_size(LogicalSize::new(self.config.width, self.config.height));

        match event_loop.create_window(attrs) {
            Ok(window) => {
                info!(
                    target: "platform",
                    "Window created: {}x{} @ {}x scale",
                    window.inner_size().width,
                    window.inner_size().height,
                    window.scale_factor()
                );
                if self.config.pixel_density.is_none() {
                    warn!(target: "platform", "Pixel density unknown; tap classification disabled");
                }
                self.send(PlatformEvent::DisplayChanged(self.config.metrics(window.inner_size())));
                window.request_redraw();
                self.window = Some(window);
            }
            Err(e) => {
                error!(target: "platform", "Window creation failed: {}", e);
                self.send(PlatformEvent::WindowClosed);
                event_loop.exit();
            }
        }
    }

    /// Host suspended (mobile background); contacts in flight are lost.
    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        info!(target: "platform", "Application suspended");
        self.suspend_input();
    }

    /// Handles per-window events.
    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: winit::window::WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!(target: "platform", "Window close requested");
                self.send(PlatformEvent::WindowClosed);
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                debug!(target: "platform", "Window resized to {}x{}", size.width, size.height);
                self.send(PlatformEvent::DisplayChanged(self.config.metrics(size)));
            }

            WindowEvent::Touch(touch) => {
                let event = self.input_processor.process_touch(
                    touch.id,
                    touch.phase,
                    touch.location.x,
                    touch.location.y,
                );
                self.buffer.push(event);
            }

            WindowEvent::CursorMoved { position, .. } => {
                if let Some(event) = self.input_processor.process_cursor_moved(position.x, position.y) {
                    self.buffer.push(event);
                }
            }

            WindowEvent::MouseInput { state, button, .. } => {
                if let Some(event) = self.input_processor.process_mouse_button(button, state) {
                    self.buffer.push(event);
                }
            }

            WindowEvent::CursorLeft { .. } => {
                if let Some(event) = self.input_processor.process_cursor_left() {
                    trace!(target: "platform::input", "Pointer left window while pressed");
                    self.buffer.push(event);
                }
            }

            WindowEvent::RedrawRequested => {
                // Frame boundary: flush all buffered input
                self.flush_input_buffer();

                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }

            _ => {}
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
