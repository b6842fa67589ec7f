//! Injectable time: monotonic `now` plus one-shot timers.
//!
//! Time-operator cells never touch the wall clock directly; they schedule
//! against whatever [`Clock`] their runtime carries. [`ThreadClock`] is the
//! wall-clock default, [`ManualClock`] is virtual time for deterministic
//! tests.

use std::{
	collections::BTreeMap,
	sync::{
		atomic::{AtomicBool, Ordering},
		Arc,
	},
	thread,
	time::{Duration, Instant},
};

use parking_lot::Mutex;
use tracing::trace;

/// Monotonic clock with one-shot timer scheduling.
pub trait Clock: Send + Sync {
	/// Monotonic reading; only differences are meaningful.
	fn now(&self) -> Duration;

	/// Runs `callback` once, `after` from now, unless the returned handle is
	/// cancelled first.
	fn schedule(&self, after: Duration, callback: Box<dyn FnOnce() + Send>) -> TimerHandle;
}

/// Cancellation handle for a scheduled callback.
///
/// Dropping the handle does *not* cancel the timer; cells cancel explicitly
/// on dispose or re-arm.
#[derive(Debug, Clone)]
pub struct TimerHandle {
	cancelled: Arc<AtomicBool>,
}

impl TimerHandle {
	#[must_use]
	pub fn new() -> Self {
		Self {
			cancelled: Arc::new(AtomicBool::new(false)),
		}
	}

	/// Idempotent.
	pub fn cancel(&self) {
		self.cancelled.store(true, Ordering::SeqCst);
	}

	#[must_use]
	pub fn is_cancelled(&self) -> bool {
		self.cancelled.load(Ordering::SeqCst)
	}
}

impl Default for TimerHandle {
	fn default() -> Self {
		Self::new()
	}
}

/// Wall-clock [`Clock`] backed by one sleeping thread per armed timer.
///
/// Hosts with an event loop will usually supply their own implementation;
/// this one needs nothing but `std`.
pub struct ThreadClock {
	epoch: Instant,
}

impl ThreadClock {
	#[must_use]
	pub fn new() -> Self {
		Self {
			epoch: Instant::now(),
		}
	}
}

impl Default for ThreadClock {
	fn default() -> Self {
		Self::new()
	}
}

impl Clock for ThreadClock {
	fn now(&self) -> Duration {
		self.epoch.elapsed()
	}

	fn schedule(&self, after: Duration, callback: Box<dyn FnOnce() + Send>) -> TimerHandle {
		let handle = TimerHandle::new();
		let cancelled = Arc::clone(&handle.cancelled);
		thread::Builder::new()
			.name("beacon-timer".to_owned())
			.spawn(move || {
				thread::sleep(after);
				if !cancelled.load(Ordering::SeqCst) {
					callback();
				}
			})
			.expect("failed to spawn timer thread");
		handle
	}
}

struct PendingTimer {
	cancelled: Arc<AtomicBool>,
	callback: Box<dyn FnOnce() + Send>,
}

#[derive(Default)]
struct ManualClockState {
	now: Duration,
	sequence: u64,
	pending: BTreeMap<(Duration, u64), PendingTimer>,
}

/// Virtual-time [`Clock`] for tests.
///
/// Time only moves through [`advance`](`ManualClock::advance`), which fires
/// due callbacks in deadline order with `now` stepped to each deadline.
#[derive(Default)]
pub struct ManualClock {
	state: Mutex<ManualClockState>,
}

impl ManualClock {
	#[must_use]
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn advance(&self, by: Duration) {
		let target = self.state.lock().now + by;
		loop {
			let due = {
				let mut state = self.state.lock();
				match state.pending.keys().next().copied() {
					Some(key) if key.0 <= target => {
						let timer = state.pending.remove(&key).expect("key just observed");
						state.now = key.0;
						Some(timer)
					}
					_ => {
						state.now = target;
						None
					}
				}
			};
			match due {
				Some(timer) => {
					if !timer.cancelled.load(Ordering::SeqCst) {
						trace!("manual clock firing timer");
						(timer.callback)();
					}
				}
				None => break,
			}
		}
	}

	#[must_use]
	pub fn pending_timers(&self) -> usize {
		self.state.lock().pending.len()
	}
}

impl Clock for ManualClock {
	fn now(&self) -> Duration {
		self.state.lock().now
	}

	fn schedule(&self, after: Duration, callback: Box<dyn FnOnce() + Send>) -> TimerHandle {
		let handle = TimerHandle::new();
		let mut state = self.state.lock();
		let deadline = state.now + after;
		state.sequence += 1;
		let key = (deadline, state.sequence);
		state.pending.insert(
			key,
			PendingTimer {
				cancelled: Arc::clone(&handle.cancelled),
				callback,
			},
		);
		handle
	}
}
