//! The externally writable cell.

use std::sync::Arc;

use luciferin::Runtime;
use tap::Pipe;

use crate::{
	error::BeaconError,
	producer::ProducerCore,
	traits::{sealed::AsProducer, ReadableBeacon},
};

/// A cell that accepts external writes.
///
/// Writes are equality-gated: setting the current value again is a no-op
/// unless forced. Cheap to clone; clones are handles onto the same cell.
pub struct WritableBeacon<T: Send + 'static> {
	core: Arc<ProducerCore<T>>,
}

impl<T: Send + 'static> Clone for WritableBeacon<T> {
	fn clone(&self) -> Self {
		Self {
			core: Arc::clone(&self.core),
		}
	}
}

impl<T: Send + 'static> AsProducer<T> for WritableBeacon<T> {
	fn core(&self) -> &Arc<ProducerCore<T>> {
		&self.core
	}
}

impl<T: Send + 'static> WritableBeacon<T> {
	pub(crate) fn create(runtime: Arc<Runtime>, value: T, name: Option<String>) -> Self
	where
		T: Clone,
	{
		ProducerCore::new_with(runtime, value, name).pipe(|core| Self { core })
	}

	/// A writable that starts empty; reading it before the first write is a
	/// [`LazyRead`](`BeaconError::LazyRead`) failure.
	pub(crate) fn create_lazy(runtime: Arc<Runtime>, name: Option<String>) -> Self {
		ProducerCore::new_lazy(runtime, name).pipe(|core| Self { core })
	}

	pub(crate) fn from_core(core: Arc<ProducerCore<T>>) -> Self {
		Self { core }
	}

	/// Equality-gated write.
	///
	/// # Panics
	///
	/// Panics when called from a consumer that depends on this cell; use
	/// [`try_set`](`WritableBeacon::try_set`) to handle the cycle instead.
	pub fn set(&self, value: T)
	where
		T: Clone + PartialEq,
	{
		self.try_set(value).unwrap_or_else(|error| panic!("{error}"));
	}

	pub fn try_set(&self, value: T) -> Result<(), BeaconError>
	where
		T: Clone + PartialEq,
	{
		ProducerCore::write(&self.core, value, false)
	}

	/// Write bypassing the equality gate: dependents are notified even when
	/// the value compares equal.
	pub fn force_set(&self, value: T)
	where
		T: Clone,
	{
		ProducerCore::write_forced(&self.core, value).unwrap_or_else(|error| panic!("{error}"));
	}

	pub fn try_force_set(&self, value: T) -> Result<(), BeaconError>
	where
		T: Clone,
	{
		ProducerCore::write_forced(&self.core, value)
	}

	/// Reads (untracked), applies `f`, writes the result.
	///
	/// # Panics
	///
	/// Panics when the cell is empty.
	pub fn update(&self, f: impl FnOnce(&T) -> T)
	where
		T: Clone + PartialEq,
	{
		let next = f(&self.peek());
		self.set(next);
	}

	/// Writes the initial value back.
	///
	/// # Panics
	///
	/// Panics when the cell is lazy and was never written.
	pub fn reset(&self)
	where
		T: Clone + PartialEq,
	{
		self.try_reset().unwrap_or_else(|error| panic!("{error}"));
	}

	pub fn try_reset(&self) -> Result<(), BeaconError>
	where
		T: Clone + PartialEq,
	{
		let initial = self
			.core
			.initial_value()
			.ok_or_else(|| BeaconError::Uninitialized {
				name: self.core.display_name(),
			})?;
		ProducerCore::write(&self.core, initial, false)
	}
}

impl<T: Send + Clone + std::fmt::Debug + 'static> std::fmt::Debug for WritableBeacon<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("WritableBeacon")
			.field("name", &self.name())
			.field("value", &self.try_peek().ok())
			.finish()
	}
}
