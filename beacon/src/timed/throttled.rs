//! At most one settled write per window.

use std::{
	collections::VecDeque,
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

struct Gate<T> {
	open: bool,
	blocked: VecDeque<T>,
	timer: Option<TimerHandle>,
}

pub(crate) struct ThrottledInner<T: Send + 'static> {
	core: Arc<ProducerCore<T>>,
	duration: Duration,
	drop_blocked: bool,
	gate: Mutex<Gate<T>>,
}

impl<T: Send + Clone + PartialEq + 'static> ThrottledInner<T> {
	fn arm(this: &Arc<Self>) -> TimerHandle {
		let weak = Arc::downgrade(this);
		this.core.runtime().clock().schedule(
			this.duration,
			Box::new(move || {
				if let Some(this) = weak.upgrade() {
					Self::window_elapsed(&this);
				}
			}),
		)
	}

	fn window_elapsed(this: &Arc<Self>) {
		let _critical = this.core.runtime().enter();
		let head = {
			let mut gate = this.gate.lock();
			match gate.blocked.pop_front() {
				Some(head) => {
					// Stay closed for another window while the backlog drains.
					gate.timer = Some(Self::arm(this));
					Some(head)
				}
				None => {
					gate.open = true;
					gate.timer = None;
					None
				}
			}
		};
		if let Some(head) = head {
			let _ = ProducerCore::write(&this.core, head, true);
		}
	}
}

/// A writable cell that passes one write per window: the first write passes
/// through and closes the gate for the window; writes that land while closed
/// are dropped (`drop_blocked`) or queued and released one per window.
pub struct ThrottledBeacon<T: Send + 'static> {
	inner: Arc<ThrottledInner<T>>,
}

impl<T: Send + 'static> Clone for ThrottledBeacon<T> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<T: Send + 'static> AsProducer<T> for ThrottledBeacon<T> {
	fn core(&self) -> &Arc<ProducerCore<T>> {
		&self.inner.core
	}
}

impl<T: Send + Clone + PartialEq + 'static> ThrottledBeacon<T> {
	pub(crate) fn create(
		runtime: Arc<Runtime>,
		initial: Option<T>,
		duration: Duration,
		drop_blocked: bool,
		name: Option<String>,
	) -> Self {
		let core = match initial {
			Some(value) => ProducerCore::new_with(runtime, value, name),
			None => ProducerCore::new_lazy(runtime, name),
		};
		let inner = Arc::new(ThrottledInner {
			core,
			duration,
			drop_blocked,
			gate: Mutex::new(Gate {
				open: true,
				blocked: VecDeque::new(),
				timer: None,
			}),
		});
		let weak = Arc::downgrade(&inner);
		ProducerCore::on_dispose(&inner.core, move || {
			if let Some(inner) = weak.upgrade() {
				let mut gate = inner.gate.lock();
				if let Some(timer) = gate.timer.take() {
					timer.cancel();
				}
				gate.blocked.clear();
				gate.open = true;
			}
		});
		Self { inner }
	}

	/// # Panics
	///
	/// Panics on a circular write; see [`try_set`](`ThrottledBeacon::try_set`).
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
		let pass = {
			let mut gate = inner.gate.lock();
			if gate.open {
				gate.open = false;
				gate.timer = Some(ThrottledInner::arm(inner));
				true
			} else {
				if inner.drop_blocked {
					trace!(name = %inner.core.display_name(), "throttled write dropped");
				} else {
					gate.blocked.push_back(value.clone());
				}
				false
			}
		};
		if pass {
			ProducerCore::write(&inner.core, value, false)?;
		}
		Ok(())
	}

	#[must_use]
	pub fn duration(&self) -> Duration {
		self.inner.duration
	}

	/// Writes currently waiting for a window.
	#[must_use]
	pub fn blocked_count(&self) -> usize {
		self.inner.gate.lock().blocked.len()
	}

	/// Feeds every `target` emission through the throttle gate.
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
					let _ = (ThrottledBeacon { inner }).try_set(value.clone());
				}
			},
			options,
		)
	}
}
