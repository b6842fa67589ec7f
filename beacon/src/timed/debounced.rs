//! Writes settle only after a quiet period.

use std::{
	sync::Arc,
	time::Duration,
};

use luciferin::{Runtime, TimerHandle};
use parking_lot::Mutex;
use tracing::trace;

use crate::{
	error::BeaconError,
	producer::ProducerCore,
	traits::sealed::AsProducer,
};

struct Pending<T> {
	value: Option<T>,
	timer: Option<TimerHandle>,
}

pub(crate) struct DebouncedInner<T: Send + 'static> {
	core: Arc<ProducerCore<T>>,
	duration: Duration,
	pending: Mutex<Pending<T>>,
}

impl<T: Send + Clone + PartialEq + 'static> DebouncedInner<T> {
	fn fire(this: &Arc<Self>) {
		let _critical = this.core.runtime().enter();
		let value = {
			let mut pending = this.pending.lock();
			pending.timer = None;
			pending.value.take()
		};
		if let Some(value) = value {
			let _ = ProducerCore::write(&this.core, value, false);
		}
	}
}

/// A writable cell that only takes the last value of a write burst: each
/// write re-arms the quiet-period timer, and the pending value settles when
/// it fires.
pub struct DebouncedBeacon<T: Send + 'static> {
	inner: Arc<DebouncedInner<T>>,
}

impl<T: Send + 'static> Clone for DebouncedBeacon<T> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<T: Send + 'static> AsProducer<T> for DebouncedBeacon<T> {
	fn core(&self) -> &Arc<ProducerCore<T>> {
		&self.inner.core
	}
}

impl<T: Send + Clone + PartialEq + 'static> DebouncedBeacon<T> {
	pub(crate) fn create(
		runtime: Arc<Runtime>,
		initial: Option<T>,
		duration: Duration,
		name: Option<String>,
	) -> Self {
		let core = match initial {
			Some(value) => ProducerCore::new_with(runtime, value, name),
			None => ProducerCore::new_lazy(runtime, name),
		};
		let inner = Arc::new(DebouncedInner {
			core,
			duration,
			pending: Mutex::new(Pending {
				value: None,
				timer: None,
			}),
		});
		let weak = Arc::downgrade(&inner);
		ProducerCore::on_dispose(&inner.core, move || {
			if let Some(inner) = weak.upgrade() {
				let mut pending = inner.pending.lock();
				if let Some(timer) = pending.timer.take() {
					timer.cancel();
				}
				pending.value = None;
			}
		});
		Self { inner }
	}

	/// Stages `value`; it settles `duration` after the last write.
	///
	/// # Panics
	///
	/// Panics on a circular write; see [`try_set`](`DebouncedBeacon::try_set`).
	pub fn set(&self, value: T) {
		self.try_set(value).unwrap_or_else(|error| panic!("{error}"));
	}

	pub fn try_set(&self, value: T) -> Result<(), BeaconError> {
		let inner = &self.inner;
		let runtime = inner.core.runtime();
		let _critical = runtime.enter();
		ProducerCore::check_circular(&inner.core)?;
		if inner.core.is_disposed() {
			return Ok(());
		}
		let clock = runtime.clock();
		let mut pending = inner.pending.lock();
		pending.value = Some(value);
		if let Some(timer) = pending.timer.take() {
			timer.cancel();
		}
		trace!(
			name = %inner.core.display_name(),
			millis = inner.duration.as_millis() as u64,
			"debounce timer armed"
		);
		let weak = Arc::downgrade(inner);
		pending.timer = Some(clock.schedule(
			inner.duration,
			Box::new(move || {
				if let Some(inner) = weak.upgrade() {
					DebouncedInner::fire(&inner);
				}
			}),
		));
		Ok(())
	}

	/// Bypasses the quiet period: cancels any staged value and writes now.
	pub fn force_set(&self, value: T) {
		let inner = &self.inner;
		let _critical = inner.core.runtime().enter();
		{
			let mut pending = inner.pending.lock();
			if let Some(timer) = pending.timer.take() {
				timer.cancel();
			}
			pending.value = None;
		}
		ProducerCore::write_forced(&inner.core, value).unwrap_or_else(|error| panic!("{error}"));
	}

	#[must_use]
	pub fn duration(&self) -> Duration {
		self.inner.duration
	}

	/// Feeds every `target` emission through the debounce window.
	pub fn wrap<S: crate::ReadableBeacon<T>>(
		&self,
		target: &S,
		options: crate::WrapOptions,
	) -> Result<crate::Disposer, BeaconError> {
		let weak = Arc::downgrade(&self.inner);
		crate::wrap::wrap_into(
			&self.inner.core,
			target,
			move |value: &T| {
				if let Some(inner) = weak.upgrade() {
					let _ = (DebouncedBeacon { inner }).try_set(value.clone());
				}
			},
			options,
		)
	}
}
