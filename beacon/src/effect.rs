//! Side-effecting consumers.

use std::{
	panic::resume_unwind,
	sync::{Arc, Weak},
};

use luciferin::{
	runtime::{NodeId, Observer},
	Runtime,
};
use parking_lot::Mutex;

use crate::observer::ObserverCore;

/// Configuration for effects.
#[derive(Debug, Clone, Copy)]
pub struct EffectOptions {
	/// See [`DerivedOptions::support_conditional`](`crate::DerivedOptions`).
	pub support_conditional: bool,
}

impl Default for EffectOptions {
	fn default() -> Self {
		Self {
			support_conditional: true,
		}
	}
}

pub(crate) struct EffectInner {
	observer: ObserverCore,
	body: Mutex<Box<dyn FnMut() + Send>>,
	support_conditional: bool,
	name: Option<String>,
}

impl EffectInner {
	fn rerun(&self) {
		let track = self.support_conditional || !self.observer.has_run();
		let result = if track {
			self.observer.run_tracked(|| {
				let mut body = self.body.lock();
				(*body)();
			})
		} else {
			self.observer.run_frozen(|| {
				let mut body = self.body.lock();
				(*body)();
			})
		};
		match result {
			Ok(()) => self.observer.note_ran(),
			Err(payload) => {
				self.observer.clear_stale();
				resume_unwind(payload)
			}
		}
	}
}

impl Observer for EffectInner {
	fn id(&self) -> NodeId {
		self.observer.id()
	}

	fn notify_stale(&self) {
		if self.observer.is_disposed() {
			return;
		}
		self.observer.mark_stale();
		self.observer.schedule_run();
	}

	fn run(&self) {
		if self.observer.is_disposed() {
			return;
		}
		if self.observer.is_stale() {
			self.rerun();
		}
	}

	fn is_disposed(&self) -> bool {
		self.observer.is_disposed()
	}

	fn debug_label(&self) -> String {
		self.name
			.clone()
			.unwrap_or_else(|| format!("effect #{}", self.observer.id().get()))
	}
}

/// A running effect.
///
/// The body runs once at creation and again whenever a tracked dependency
/// changes. Cancelled when dropped; [`dispose`](`Effect::dispose`) cancels
/// explicitly and is idempotent.
#[must_use = "effects are cancelled when dropped"]
pub struct Effect {
	inner: Arc<EffectInner>,
}

impl Effect {
	pub(crate) fn create(
		runtime: Arc<Runtime>,
		body: impl FnMut() + Send + 'static,
		options: EffectOptions,
		name: Option<String>,
	) -> Self {
		let inner = Arc::new(EffectInner {
			observer: ObserverCore::new(runtime),
			body: Mutex::new(Box::new(body)),
			support_conditional: options.support_conditional,
			name,
		});
		let observer_arc: Arc<dyn Observer> = inner.clone();
		let as_observer: Weak<dyn Observer> = Arc::downgrade(&observer_arc);
		inner.observer.bind(as_observer);
		inner.rerun();
		Self { inner }
	}

	/// Cancels the effect: dependency subscriptions are released and pending
	/// re-runs become no-ops. Idempotent.
	pub fn dispose(&self) {
		self.inner.observer.dispose();
	}

	#[must_use]
	pub fn is_disposed(&self) -> bool {
		self.inner.observer.is_disposed()
	}
}

impl Drop for Effect {
	fn drop(&mut self) {
		self.dispose();
	}
}

impl std::fmt::Debug for Effect {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Effect")
			.field("label", &self.inner.debug_label())
			.field("disposed", &self.is_disposed())
			.finish()
	}
}
