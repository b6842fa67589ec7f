//! Values paired with the clock reading at acceptance.

use std::{sync::Arc, time::Duration};

use luciferin::Runtime;

use crate::{
	error::BeaconError,
	producer::ProducerCore,
	traits::sealed::AsProducer,
};

/// A value plus the monotonic clock reading at which it was accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stamped<T> {
	pub value: T,
	pub at: Duration,
}

/// A writable cell whose value is always a [`Stamped`] pair.
pub struct TimestampedBeacon<T: Send + 'static> {
	core: Arc<ProducerCore<Stamped<T>>>,
}

impl<T: Send + 'static> Clone for TimestampedBeacon<T> {
	fn clone(&self) -> Self {
		Self {
			core: Arc::clone(&self.core),
		}
	}
}

impl<T: Send + 'static> AsProducer<Stamped<T>> for TimestampedBeacon<T> {
	fn core(&self) -> &Arc<ProducerCore<Stamped<T>>> {
		&self.core
	}
}

impl<T: Send + Clone + PartialEq + 'static> TimestampedBeacon<T> {
	pub(crate) fn create(runtime: Arc<Runtime>, initial: Option<T>, name: Option<String>) -> Self {
		let core = match initial {
			Some(value) => {
				let at = runtime.clock().now();
				ProducerCore::new_with(runtime, Stamped { value, at }, name)
			}
			None => ProducerCore::new_lazy(runtime, name),
		};
		Self { core }
	}

	/// Equality-gated on the carried value; an accepted write is stamped
	/// with the clock reading at acceptance.
	///
	/// # Panics
	///
	/// Panics on a circular write; see [`try_set`](`TimestampedBeacon::try_set`).
	pub fn set(&self, value: T) {
		self.try_set(value).unwrap_or_else(|error| panic!("{error}"));
	}

	pub fn try_set(&self, value: T) -> Result<(), BeaconError> {
		let runtime = self.core.runtime();
		let _critical = runtime.enter();
		ProducerCore::check_circular(&self.core)?;
		if self.core.is_disposed() {
			return Ok(());
		}
		if let Some(current) = self.core.raw_value() {
			if current.value == value {
				return Ok(());
			}
		}
		let at = runtime.clock().now();
		ProducerCore::write_forced(&self.core, Stamped { value, at })
	}
}
