//! A writable cell with a bounded history ring.

use std::{
	collections::VecDeque,
	sync::Arc,
};

use luciferin::Runtime;
use parking_lot::Mutex;

use crate::{
	error::BeaconError,
	producer::ProducerCore,
	traits::sealed::AsProducer,
};

struct History<T> {
	entries: VecDeque<T>,
	cursor: usize,
}

/// A writable cell remembering its last `limit` accepted values.
///
/// The initial value is history entry 0. Accepted writes clear the redo
/// suffix; `undo`/`redo` step the cursor without touching the ring. Stepping
/// past either end is a no-op.
pub struct UndoRedoBeacon<T: Send + 'static> {
	inner: Arc<UndoRedoInner<T>>,
}

pub(crate) struct UndoRedoInner<T: Send + 'static> {
	core: Arc<ProducerCore<T>>,
	limit: usize,
	history: Mutex<History<T>>,
}

impl<T: Send + 'static> Clone for UndoRedoBeacon<T> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<T: Send + 'static> AsProducer<T> for UndoRedoBeacon<T> {
	fn core(&self) -> &Arc<ProducerCore<T>> {
		&self.inner.core
	}
}

impl<T: Send + Clone + PartialEq + 'static> UndoRedoBeacon<T> {
	pub(crate) fn create(
		runtime: Arc<Runtime>,
		initial: T,
		limit: usize,
		name: Option<String>,
	) -> Self {
		assert!(limit > 0, "history limit must be positive");
		let mut entries = VecDeque::with_capacity(limit.min(16));
		entries.push_back(initial.clone());
		Self {
			inner: Arc::new(UndoRedoInner {
				core: ProducerCore::new_with(runtime, initial, name),
				limit,
				history: Mutex::new(History { entries, cursor: 0 }),
			}),
		}
	}

	/// Equality-gated write; an accepted value becomes the new history tip.
	///
	/// # Panics
	///
	/// Panics on a circular write; see [`try_set`](`UndoRedoBeacon::try_set`).
	pub fn set(&self, value: T) {
		self.try_set(value).unwrap_or_else(|error| panic!("{error}"));
	}

	pub fn try_set(&self, value: T) -> Result<(), BeaconError> {
		let inner = &self.inner;
		let _critical = inner.core.runtime().enter();
		ProducerCore::check_circular(&inner.core)?;
		if inner.core.is_disposed() {
			return Ok(());
		}
		if ProducerCore::settle_value(&inner.core, value.clone(), false) {
			{
				let mut history = inner.history.lock();
				let cursor = history.cursor;
				history.entries.truncate(cursor + 1);
				history.entries.push_back(value);
				while history.entries.len() > inner.limit {
					history.entries.pop_front();
				}
				history.cursor = history.entries.len() - 1;
			}
			ProducerCore::notify(&inner.core);
		}
		Ok(())
	}

	/// Steps one entry back; at the oldest entry this is a no-op.
	pub fn undo(&self) {
		self.step(false);
	}

	/// Steps one entry forward; at the tip this is a no-op.
	pub fn redo(&self) {
		self.step(true);
	}

	fn step(&self, forward: bool) {
		let inner = &self.inner;
		let _critical = inner.core.runtime().enter();
		let value = {
			let mut history = inner.history.lock();
			let target = if forward {
				match history.cursor + 1 {
					next if next < history.entries.len() => next,
					_ => return,
				}
			} else {
				match history.cursor.checked_sub(1) {
					Some(previous) => previous,
					None => return,
				}
			};
			history.cursor = target;
			history.entries[target].clone()
		};
		if ProducerCore::settle_value(&inner.core, value, true) {
			ProducerCore::notify(&inner.core);
		}
	}

	#[must_use]
	pub fn can_undo(&self) -> bool {
		self.inner.history.lock().cursor > 0
	}

	#[must_use]
	pub fn can_redo(&self) -> bool {
		let history = self.inner.history.lock();
		history.cursor + 1 < history.entries.len()
	}

	/// Snapshot of the ring, oldest first.
	#[must_use]
	pub fn history(&self) -> Vec<T> {
		self.inner.history.lock().entries.iter().cloned().collect()
	}

	#[must_use]
	pub fn history_limit(&self) -> usize {
		self.inner.limit
	}
}
