//! Reactive value cells ("beacons") over an auto-tracking dependency graph.
//!
//! Application code declares writable cells, derived computations, and
//! effects; the runtime discovers dependencies by read-tracking, propagates
//! writes in order with one notification per observer per flush, coordinates
//! async derivations with latest-wins cancellation, and composes time-based
//! operators (debounce, throttle, buffers) with the graph.
//!
//! ```
//! use beacon::{Beacon, ReadableBeacon};
//!
//! let count = Beacon::writable(0);
//! let doubled = Beacon::derived({
//! 	let count = count.clone();
//! 	move || count.get() * 2
//! });
//! count.set(21);
//! assert_eq!(doubled.get(), 42);
//! ```
//!
//! The graph backing the cells lives in the `luciferin` crate; one
//! [`Runtime`] is one isolated graph, and everything here defaults to
//! [`Runtime::global`].
#![warn(clippy::pedantic)]
#![warn(unreachable_pub)]

mod async_value;
mod collections;
mod creator;
mod derived;
mod effect;
mod erased;
mod error;
mod family;
mod future;
mod group;
mod observer;
mod producer;
mod stream;
mod subscription;
mod timed;
mod traits;
mod wrap;
mod writable;

pub use async_value::{AsyncError, AsyncStatus, AsyncValue};
pub use collections::{ListBeacon, MapBeacon, SetBeacon};
pub use creator::{Beacon, Creator};
pub use derived::{DerivedBeacon, DerivedOptions};
pub use effect::{Effect, EffectOptions};
pub use erased::ErasedBeacon;
pub use error::{BeaconError, BoxedError, ComputePanic};
pub use family::Family;
pub use future::{AsyncBeacon, AsyncOptions, ComputeFuture};
pub use group::BeaconGroup;
pub use luciferin::{
	Clock, FlushTask, ManualClock, Runtime, ScheduleMode, Spawner, ThreadClock, ThreadSpawner,
	TimerHandle,
};
pub use stream::{BeaconStream, NextValue, RawStreamBeacon, StreamBeacon};
pub use subscription::{Disposer, SubscribeOptions};
pub use timed::{
	BufferedCountBeacon, BufferedTimeBeacon, DebouncedBeacon, FilteredBeacon, Stamped,
	ThrottledBeacon, TimestampedBeacon, UndoRedoBeacon,
};
pub use traits::ReadableBeacon;
pub use wrap::WrapOptions;
pub use writable::WritableBeacon;

/// Runs `f` with writes accumulated; each producer written inside notifies
/// once when the outermost batch exits. Global-runtime convenience for
/// [`Runtime::batch`].
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
	Runtime::global().batch(f)
}

/// Runs `f` with reads untracked and write notifications suppressed.
/// Global-runtime convenience for [`Runtime::untracked`].
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
	Runtime::global().untracked(f)
}

/// Creates an effect on the global runtime; see [`Beacon::effect`].
pub fn effect(body: impl FnMut() + Send + 'static) -> Effect {
	Beacon::effect(body)
}

/// Drains the global runtime's scheduler queue.
pub fn flush() {
	Runtime::global().flush();
}
