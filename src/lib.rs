//=========================================================================
// Aetheric Touch — Library Root
//
// Per-tick touch dispatch: priority-ordered exclusive bindings that claim
// touches, broadcast bindings that receive whatever nobody claimed, and
// a winit runtime that feeds them.
//
// Responsibilities:
// - Expose the runtime facade (`EngineBuilder`, `Engine`)
// - Expose the dispatch core (`core`) for direct, windowless use
// - Keep the winit integration (`platform`) private
//
// Typical usage:
// ```no_run
// use aetheric_touch::EngineBuilder;
//
// fn main() {
//     EngineBuilder::new().build().run();
// }
// ```
//
//=========================================================================

//--- Public Modules ------------------------------------------------------
//
// `core` holds the single-threaded dispatch logic (touches, handlers,
// dispatcher, input source). It can be driven directly with any
// `InputSource`, without a window.
//
pub mod core;
pub mod prelude;

//--- Internal Modules ----------------------------------------------------
//
// `platform` contains the Winit window and event translation.
// `engine` wires platform and core thread together.
//
mod engine;
mod platform;

//--- Public Exports ------------------------------------------------------
pub use engine::{Engine, EngineBuilder};
