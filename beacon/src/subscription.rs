//! Subscription handles and options.

use parking_lot::Mutex;

/// Options recognised by `subscribe_with`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubscribeOptions {
	/// Deliver the current value (if any) immediately on subscription.
	pub start_now: bool,
	/// Deliver at the write site instead of through the scheduler.
	///
	/// Synchronous subscribers see every accepted write; scheduled ones see
	/// coalesced notifications with the value as of delivery.
	pub synchronous: bool,
}

impl SubscribeOptions {
	#[must_use]
	pub fn start_now(mut self) -> Self {
		self.start_now = true;
		self
	}

	#[must_use]
	pub fn synchronous(mut self) -> Self {
		self.synchronous = true;
		self
	}
}

/// Undoes one subscription (or other registration) when asked to.
///
/// Idempotent: disposing twice is a no-op. Dropping a `Disposer` does *not*
/// unsubscribe — producers own their listeners and explicit disposal is the
/// normative teardown path.
#[must_use = "dropping a Disposer does not unsubscribe; call `dispose`"]
pub struct Disposer {
	action: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Disposer {
	/// Wraps an arbitrary teardown action (group disposers, adapters).
	pub fn new(action: impl FnOnce() + Send + 'static) -> Self {
		Self {
			action: Mutex::new(Some(Box::new(action))),
		}
	}

	pub(crate) fn noop() -> Self {
		Self {
			action: Mutex::new(None),
		}
	}

	pub fn dispose(&self) {
		if let Some(action) = self.action.lock().take() {
			action();
		}
	}

	#[must_use]
	pub fn is_disposed(&self) -> bool {
		self.action.lock().is_none()
	}
}

impl std::fmt::Debug for Disposer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Disposer")
			.field("disposed", &self.is_disposed())
			.finish()
	}
}
