//! Strategy layer: adaptive threshold, signal detection, and the
//! pending-order state machine.
//!
//! Everything here is pure state manipulation over `InstrumentState`;
//! I/O and scheduling live in `engine`.

pub mod pending;
pub mod signal;
pub mod threshold;

pub use pending::{open, resolve, start_probe, Resolution};
pub use signal::{evaluate, Signal};
pub use threshold::{adapt_threshold, ThresholdConfig};
