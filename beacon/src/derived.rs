//! Cells computed from other cells.

use std::{
	panic::resume_unwind,
	sync::{Arc, Weak},
};

use luciferin::{
	runtime::{NodeId, Observer},
	Runtime,
};
use parking_lot::Mutex;
use tracing::debug;

use crate::{
	observer::ObserverCore,
	producer::{NodeHooks, ProducerCore},
	traits::{sealed::AsProducer, ReadableBeacon},
};

/// Configuration for derived cells.
#[derive(Debug, Clone, Copy)]
pub struct DerivedOptions {
	/// Detach from dependencies and discard the cached value while nothing
	/// listens; recompute on next contact.
	pub should_sleep: bool,
	/// Re-record the dependency set on every run, so branches taken under
	/// changed control flow are discovered. With `false`, the first run's
	/// dependency set is frozen.
	pub support_conditional: bool,
}

impl Default for DerivedOptions {
	fn default() -> Self {
		Self {
			should_sleep: true,
			support_conditional: true,
		}
	}
}

pub(crate) struct DerivedInner<T: Send + 'static> {
	producer: Arc<ProducerCore<T>>,
	observer: ObserverCore,
	compute: Mutex<Box<dyn FnMut() -> T + Send>>,
	should_sleep: bool,
	support_conditional: bool,
}

impl<T: Send + Clone + PartialEq + 'static> DerivedInner<T> {
	fn refresh_if_needed(&self) {
		if self.observer.needs_refresh() {
			self.recompute();
		}
	}

	fn recompute(&self) {
		let track = self.support_conditional || !self.observer.has_run();
		let result = if track {
			self.observer.run_tracked(|| {
				let mut compute = self.compute.lock();
				(*compute)()
			})
		} else {
			self.observer.run_frozen(|| {
				let mut compute = self.compute.lock();
				(*compute)()
			})
		};
		match result {
			Ok(value) => {
				self.observer.note_ran();
				if ProducerCore::settle_value(&self.producer, value, false) {
					ProducerCore::notify(&self.producer);
				}
			}
			Err(payload) => {
				// Dependency set stays as before the failed run.
				self.observer.clear_stale();
				resume_unwind(payload)
			}
		}
	}

	fn maybe_sleep(&self) {
		if !self.should_sleep
			|| self.producer.listeners_count() != 0
			|| self.observer.is_disposed()
			|| self.observer.is_sleeping()
		{
			return;
		}
		debug!(name = %self.producer.display_name(), "derived cell sleeping");
		self.observer.set_sleeping(true);
		self.observer.clear_stale();
		self.observer.release_dependencies();
		self.producer.clear_value();
	}
}

impl<T: Send + Clone + PartialEq + 'static> Observer for DerivedInner<T> {
	fn id(&self) -> NodeId {
		self.observer.id()
	}

	fn notify_stale(&self) {
		if self.observer.is_disposed() || self.observer.is_sleeping() {
			return;
		}
		self.observer.mark_stale();
		if self.should_sleep && self.producer.listeners_count() == 0 {
			self.maybe_sleep();
		} else {
			self.observer.schedule_run();
		}
	}

	fn run(&self) {
		if self.observer.is_disposed() || self.observer.is_sleeping() {
			return;
		}
		if self.observer.is_stale() {
			self.recompute();
		}
	}

	fn is_disposed(&self) -> bool {
		self.observer.is_disposed()
	}

	fn debug_label(&self) -> String {
		self.producer.display_name()
	}
}

impl<T: Send + Clone + PartialEq + 'static> NodeHooks for DerivedInner<T> {
	fn ensure_fresh(&self) {
		self.refresh_if_needed();
	}

	fn listeners_became_nonempty(&self) {
		self.refresh_if_needed();
	}

	fn listeners_became_empty(&self) {
		self.maybe_sleep();
	}
}

/// A cell whose value is a pure function of other cells.
///
/// Lazy: the compute function first runs on first read or subscription.
/// Dependencies are discovered by read-tracking during the run.
pub struct DerivedBeacon<T: Send + 'static> {
	inner: Arc<DerivedInner<T>>,
}

impl<T: Send + 'static> Clone for DerivedBeacon<T> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<T: Send + 'static> AsProducer<T> for DerivedBeacon<T> {
	fn core(&self) -> &Arc<ProducerCore<T>> {
		&self.inner.producer
	}
}

impl<T: Send + Clone + PartialEq + 'static> DerivedBeacon<T> {
	pub(crate) fn create(
		runtime: Arc<Runtime>,
		compute: impl FnMut() -> T + Send + 'static,
		options: DerivedOptions,
		name: Option<String>,
	) -> Self {
		let inner = Arc::new(DerivedInner {
			producer: ProducerCore::new_lazy(Arc::clone(&runtime), name),
			observer: ObserverCore::new(runtime),
			compute: Mutex::new(Box::new(compute)),
			should_sleep: options.should_sleep,
			support_conditional: options.support_conditional,
		});
		let observer_arc: Arc<dyn Observer> = inner.clone();
		let as_observer: Weak<dyn Observer> = Arc::downgrade(&observer_arc);
		inner.observer.bind(as_observer);
		let hooks_arc: Arc<dyn NodeHooks> = inner.clone();
		let as_hooks: Weak<dyn NodeHooks> = Arc::downgrade(&hooks_arc);
		inner.producer.set_hooks(as_hooks);
		let weak = Arc::downgrade(&inner);
		ProducerCore::on_dispose(&inner.producer, move || {
			if let Some(inner) = weak.upgrade() {
				inner.observer.dispose();
			}
		});
		Self { inner }
	}

	/// Whether the cell is currently detached from its dependencies.
	#[must_use]
	pub fn is_sleeping(&self) -> bool {
		self.inner.observer.is_sleeping()
	}
}

impl<T: Send + Clone + std::fmt::Debug + 'static> std::fmt::Debug for DerivedBeacon<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DerivedBeacon")
			.field("name", &self.name())
			.field("value", &self.try_peek().ok())
			.finish()
	}
}
