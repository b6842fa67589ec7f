//! Cells whose value is a flushed batch of writes.

use std::{
	mem,
	sync::Arc,
	time::Duration,
};

use luciferin::{Runtime, TimerHandle};
use parking_lot::Mutex;

use crate::{
	error::BeaconError,
	producer::ProducerCore,
	subscription::SubscribeOptions,
	traits::sealed::AsProducer,
};

/// Accumulates writes and flushes a snapshot once `capacity` items are
/// pending. The cell's value is the last flushed batch; it starts as the
/// empty batch.
pub struct BufferedCountBeacon<T: Send + 'static> {
	inner: Arc<BufferedCountInner<T>>,
}

pub(crate) struct BufferedCountInner<T: Send + 'static> {
	core: Arc<ProducerCore<Vec<T>>>,
	capacity: usize,
	buffer: Mutex<Vec<T>>,
}

impl<T: Send + 'static> Clone for BufferedCountBeacon<T> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<T: Send + 'static> AsProducer<Vec<T>> for BufferedCountBeacon<T> {
	fn core(&self) -> &Arc<ProducerCore<Vec<T>>> {
		&self.inner.core
	}
}

impl<T: Send + Clone + 'static> BufferedCountBeacon<T> {
	pub(crate) fn create(
		runtime: Arc<Runtime>,
		capacity: usize,
		seed: Option<T>,
		name: Option<String>,
	) -> Self {
		assert!(capacity > 0, "buffer capacity must be positive");
		let inner = Arc::new(BufferedCountInner {
			core: ProducerCore::new_with(runtime, Vec::new(), name),
			capacity,
			buffer: Mutex::new(seed.into_iter().collect()),
		});
		let weak = Arc::downgrade(&inner);
		ProducerCore::on_dispose(&inner.core, move || {
			if let Some(inner) = weak.upgrade() {
				inner.buffer.lock().clear();
			}
		});
		Self { inner }
	}

	/// # Panics
	///
	/// Panics on a circular write; see [`try_add`](`BufferedCountBeacon::try_add`).
	pub fn add(&self, value: T) {
		self.try_add(value).unwrap_or_else(|error| panic!("{error}"));
	}

	pub fn try_add(&self, value: T) -> Result<(), BeaconError> {
		let inner = &self.inner;
		let _critical = inner.core.runtime().enter();
		ProducerCore::check_circular(&inner.core)?;
		if inner.core.is_disposed() {
			return Ok(());
		}
		let flushed = {
			let mut buffer = inner.buffer.lock();
			buffer.push(value);
			(buffer.len() >= inner.capacity).then(|| mem::take(&mut *buffer))
		};
		if let Some(batch) = flushed {
			ProducerCore::write_forced(&inner.core, batch)?;
		}
		Ok(())
	}

	/// The writes accumulated since the last flush.
	#[must_use]
	pub fn pending(&self) -> Vec<T> {
		self.inner.buffer.lock().clone()
	}

	/// Drops pending writes and restores the empty batch.
	pub fn reset(&self) {
		let inner = &self.inner;
		let _critical = inner.core.runtime().enter();
		inner.buffer.lock().clear();
		let _ = ProducerCore::write_forced(&inner.core, Vec::new());
	}

	#[must_use]
	pub fn capacity(&self) -> usize {
		self.inner.capacity
	}

	/// A count buffer fed by every accepted write of `source`. Disposing the
	/// buffer releases the feed.
	pub(crate) fn feeding(source: &Arc<ProducerCore<T>>, capacity: usize) -> Self {
		let cell = Self::create(Arc::clone(source.runtime()), capacity, None, None);
		let weak = Arc::downgrade(&cell.inner);
		let feed = ProducerCore::subscribe(
			source,
			move |value: &T| {
				if let Some(inner) = weak.upgrade() {
					let _ = (BufferedCountBeacon { inner }).try_add(value.clone());
				}
			},
			SubscribeOptions {
				start_now: false,
				synchronous: true,
			},
		);
		ProducerCore::on_dispose(&cell.inner.core, move || feed.dispose());
		cell
	}
}

/// Accumulates writes and flushes a snapshot one window after the first
/// pending write.
pub struct BufferedTimeBeacon<T: Send + 'static> {
	inner: Arc<BufferedTimeInner<T>>,
}

struct TimeBuffer<T> {
	buffer: Vec<T>,
	timer: Option<TimerHandle>,
}

pub(crate) struct BufferedTimeInner<T: Send + 'static> {
	core: Arc<ProducerCore<Vec<T>>>,
	duration: Duration,
	state: Mutex<TimeBuffer<T>>,
}

impl<T: Send + Clone + 'static> BufferedTimeInner<T> {
	fn fire(this: &Arc<Self>) {
		let _critical = this.core.runtime().enter();
		let batch = {
			let mut state = this.state.lock();
			state.timer = None;
			mem::take(&mut state.buffer)
		};
		if !batch.is_empty() {
			let _ = ProducerCore::write_forced(&this.core, batch);
		}
	}
}

impl<T: Send + 'static> Clone for BufferedTimeBeacon<T> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<T: Send + 'static> AsProducer<Vec<T>> for BufferedTimeBeacon<T> {
	fn core(&self) -> &Arc<ProducerCore<Vec<T>>> {
		&self.inner.core
	}
}

impl<T: Send + Clone + 'static> BufferedTimeBeacon<T> {
	pub(crate) fn create(runtime: Arc<Runtime>, duration: Duration, name: Option<String>) -> Self {
		let inner = Arc::new(BufferedTimeInner {
			core: ProducerCore::new_with(runtime, Vec::new(), name),
			duration,
			state: Mutex::new(TimeBuffer {
				buffer: Vec::new(),
				timer: None,
			}),
		});
		let weak = Arc::downgrade(&inner);
		ProducerCore::on_dispose(&inner.core, move || {
			if let Some(inner) = weak.upgrade() {
				let mut state = inner.state.lock();
				if let Some(timer) = state.timer.take() {
					timer.cancel();
				}
				state.buffer.clear();
			}
		});
		Self { inner }
	}

	/// # Panics
	///
	/// Panics on a circular write; see [`try_add`](`BufferedTimeBeacon::try_add`).
	pub fn add(&self, value: T) {
		self.try_add(value).unwrap_or_else(|error| panic!("{error}"));
	}

	pub fn try_add(&self, value: T) -> Result<(), BeaconError> {
		let inner = &self.inner;
		let runtime = inner.core.runtime();
		let _critical = runtime.enter();
		ProducerCore::check_circular(&inner.core)?;
		if inner.core.is_disposed() {
			return Ok(());
		}
		let mut state = inner.state.lock();
		state.buffer.push(value);
		if state.timer.is_none() {
			let weak = Arc::downgrade(inner);
			state.timer = Some(runtime.clock().schedule(
				inner.duration,
				Box::new(move || {
					if let Some(inner) = weak.upgrade() {
						BufferedTimeInner::fire(&inner);
					}
				}),
			));
		}
		Ok(())
	}

	#[must_use]
	pub fn pending(&self) -> Vec<T> {
		self.inner.state.lock().buffer.clone()
	}

	/// Drops pending writes, disarms the window, and restores the empty
	/// batch.
	pub fn reset(&self) {
		let inner = &self.inner;
		let _critical = inner.core.runtime().enter();
		{
			let mut state = inner.state.lock();
			if let Some(timer) = state.timer.take() {
				timer.cancel();
			}
			state.buffer.clear();
		}
		let _ = ProducerCore::write_forced(&inner.core, Vec::new());
	}

	#[must_use]
	pub fn duration(&self) -> Duration {
		self.inner.duration
	}

	/// A time buffer fed by every accepted write of `source`. Disposing the
	/// buffer releases the feed.
	pub(crate) fn feeding(source: &Arc<ProducerCore<T>>, duration: Duration) -> Self {
		let cell = Self::create(Arc::clone(source.runtime()), duration, None);
		let weak = Arc::downgrade(&cell.inner);
		let feed = ProducerCore::subscribe(
			source,
			move |value: &T| {
				if let Some(inner) = weak.upgrade() {
					let _ = (BufferedTimeBeacon { inner }).try_add(value.clone());
				}
			},
			SubscribeOptions {
				start_now: false,
				synchronous: true,
			},
		);
		ProducerCore::on_dispose(&cell.inner.core, move || feed.dispose());
		cell
	}
}
