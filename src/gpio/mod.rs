//! Digital pin bookkeeping.
//!
//! The firmware exposes a fixed set of pins, each configured once at boot as
//! either an input (sampled from hardware) or an output (driven by the
//! application). [`PinRegistry`] owns that set and is the only state shared
//! between connection handlers.

pub mod driver;
pub mod pin;
pub mod registry;

pub use driver::{PinDriver, SysfsPins};
pub use pin::{Direction, Pin, PinError, PinId, PinReading};
pub use registry::PinRegistry;
