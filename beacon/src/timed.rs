//! Time-operator cells.
//!
//! Each operator wraps a producer core plus its own pending state (timer
//! handle, buffer, history, …) and schedules against the runtime clock, so
//! tests drive them with [`ManualClock`](`luciferin::ManualClock`).

mod buffered;
mod debounced;
mod filtered;
mod throttled;
mod timestamped;
mod undo_redo;

pub use buffered::{BufferedCountBeacon, BufferedTimeBeacon};
pub use debounced::DebouncedBeacon;
pub use filtered::FilteredBeacon;
pub use throttled::ThrottledBeacon;
pub use timestamped::{Stamped, TimestampedBeacon};
pub use undo_redo::UndoRedoBeacon;
