//! The shared read surface of every cell handle.

use std::{sync::Arc, time::Duration};

use luciferin::{runtime::NodeId, Runtime};

use crate::{
	error::BeaconError,
	producer::ProducerCore,
	stream::{BeaconStream, NextValue},
	subscription::{Disposer, SubscribeOptions},
	timed::{BufferedCountBeacon, BufferedTimeBeacon},
};

pub(crate) mod sealed {
	use std::sync::Arc;

	use crate::producer::ProducerCore;

	pub trait AsProducer<T: Send + 'static> {
		fn core(&self) -> &Arc<ProducerCore<T>>;
	}
}

/// **Most application code consumes cells through this.** Reading,
/// subscribing, and lifecycle — everything except writing, which each
/// writable-like variant exposes itself.
pub trait ReadableBeacon<T: Send + 'static>: sealed::AsProducer<T> {
	/// Records the cell as a dependency of the current consumer and returns
	/// a clone of the value.
	///
	/// # Panics
	///
	/// Panics when the cell is lazy and was never written; use
	/// [`try_get`](`ReadableBeacon::try_get`) to handle that case.
	fn get(&self) -> T
	where
		T: Clone,
	{
		self.try_get().unwrap_or_else(|error| panic!("{error}"))
	}

	fn try_get(&self) -> Result<T, BeaconError>
	where
		T: Clone,
	{
		ProducerCore::try_get(self.core())
	}

	/// Reads without recording a dependency.
	///
	/// # Panics
	///
	/// Panics when the cell is lazy and was never written.
	fn peek(&self) -> T
	where
		T: Clone,
	{
		self.try_peek().unwrap_or_else(|error| panic!("{error}"))
	}

	fn try_peek(&self) -> Result<T, BeaconError>
	where
		T: Clone,
	{
		ProducerCore::try_peek(self.core())
	}

	/// Borrows the value for `f` (tracked). `f` must not call back into this
	/// cell.
	fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R, BeaconError>
	where
		Self: Sized,
	{
		ProducerCore::with_value(self.core(), true, f)
	}

	/// The value before the last accepted write, if any.
	fn previous_value(&self) -> Option<T>
	where
		T: Clone,
	{
		self.core().previous_value()
	}

	/// The value captured at the first write, if any.
	fn initial_value(&self) -> Option<T>
	where
		T: Clone,
	{
		self.core().initial_value()
	}

	fn is_empty(&self) -> bool {
		self.core().is_empty()
	}

	fn is_disposed(&self) -> bool {
		self.core().is_disposed()
	}

	fn listeners_count(&self) -> usize {
		self.core().listeners_count()
	}

	fn name(&self) -> Option<String> {
		self.core().name()
	}

	fn set_name(&self, name: impl Into<String>)
	where
		Self: Sized,
	{
		self.core().set_name(name.into());
	}

	fn node_id(&self) -> NodeId {
		self.core().id()
	}

	fn runtime(&self) -> Arc<Runtime> {
		Arc::clone(self.core().runtime())
	}

	/// Subscribes with default options (scheduled delivery, no immediate
	/// emission).
	fn subscribe(&self, callback: impl FnMut(&T) + Send + 'static) -> Disposer
	where
		Self: Sized,
		T: Clone,
	{
		self.subscribe_with(callback, SubscribeOptions::default())
	}

	fn subscribe_with(
		&self,
		callback: impl FnMut(&T) + Send + 'static,
		options: SubscribeOptions,
	) -> Disposer
	where
		Self: Sized,
		T: Clone,
	{
		ProducerCore::subscribe(self.core(), callback, options)
	}

	fn on_dispose(&self, hook: impl FnOnce() + Send + 'static)
	where
		Self: Sized,
	{
		ProducerCore::on_dispose(self.core(), hook);
	}

	/// Tears the cell down: listeners cleared, value reset to the initial
	/// value, dispose hooks run. Idempotent.
	fn dispose(&self)
	where
		T: Clone,
	{
		ProducerCore::dispose(self.core());
	}

	/// Exposes the cell as a push stream: the current value on subscription,
	/// then every subsequent change.
	fn to_stream(&self) -> BeaconStream<T>
	where
		Self: Sized,
		T: Clone,
	{
		crate::stream::to_stream(self.core(), None)
	}

	/// Like [`to_stream`](`ReadableBeacon::to_stream`), with a hook that
	/// fires when the stream side is dropped.
	fn to_stream_with(&self, on_cancel: impl FnOnce() + Send + 'static) -> BeaconStream<T>
	where
		Self: Sized,
		T: Clone,
	{
		crate::stream::to_stream(self.core(), Some(Box::new(on_cancel)))
	}

	/// A count buffer fed by this cell's accepted writes.
	fn buffer(&self, capacity: usize) -> BufferedCountBeacon<T>
	where
		Self: Sized,
		T: Clone,
	{
		BufferedCountBeacon::feeding(self.core(), capacity)
	}

	/// A time buffer fed by this cell's accepted writes.
	fn buffer_time(&self, duration: Duration) -> BufferedTimeBeacon<T>
	where
		Self: Sized,
		T: Clone,
	{
		BufferedTimeBeacon::feeding(self.core(), duration)
	}

	/// One-shot future resolving to the next value this cell accepts.
	fn next_value(&self) -> NextValue<T>
	where
		Self: Sized,
		T: Clone,
	{
		crate::stream::next_value(self.core(), None, None)
	}

	/// One-shot future resolving to the next value matching `filter`; with a
	/// timeout it resolves to the value current at the deadline instead.
	fn next_where(
		&self,
		filter: impl FnMut(&T) -> bool + Send + 'static,
		timeout: Option<Duration>,
	) -> NextValue<T>
	where
		Self: Sized,
		T: Clone,
	{
		crate::stream::next_value(self.core(), Some(Box::new(filter)), timeout)
	}
}

impl<T: Send + 'static, B: sealed::AsProducer<T>> ReadableBeacon<T> for B {}
