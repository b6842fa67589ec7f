//! Bulk-lifetime containers.

use std::{
	collections::{BTreeMap, BTreeSet},
	future::Future,
	mem,
	time::Duration,
};

use futures_lite::Stream;
use parking_lot::Mutex;

use crate::{
	collections::{ListBeacon, MapBeacon, SetBeacon},
	creator::Creator,
	derived::{DerivedBeacon, DerivedOptions},
	effect::{Effect, EffectOptions},
	erased::ErasedBeacon,
	error::BoxedError,
	future::{AsyncBeacon, AsyncOptions},
	stream::{RawStreamBeacon, StreamBeacon},
	subscription::Disposer,
	timed::{
		BufferedCountBeacon, BufferedTimeBeacon, DebouncedBeacon, FilteredBeacon,
		ThrottledBeacon, TimestampedBeacon, UndoRedoBeacon,
	},
	writable::WritableBeacon,
};

/// Owns cells, effects, and disposers for collective teardown.
///
/// Every creation method delegates to the group's [`Creator`] and records
/// the produced cell. [`dispose_all`](`BeaconGroup::dispose_all`) runs
/// registered disposers first, then disposes effects and cells;
/// [`reset_all`](`BeaconGroup::reset_all`) resets the cells that support it
/// (writable, buffered, async).
pub struct BeaconGroup {
	creator: Creator,
	cells: Mutex<Vec<Box<dyn ErasedBeacon>>>,
	effects: Mutex<Vec<Effect>>,
	disposers: Mutex<Vec<Disposer>>,
}

impl BeaconGroup {
	pub(crate) fn create(creator: Creator) -> Self {
		Self {
			creator,
			cells: Mutex::new(Vec::new()),
			effects: Mutex::new(Vec::new()),
			disposers: Mutex::new(Vec::new()),
		}
	}

	/// Adopts an externally created cell into this group's lifetime.
	pub fn add(&self, cell: &dyn ErasedBeacon) {
		self.cells.lock().push(cell.erased_clone());
	}

	/// Registers an extra disposer to run first in
	/// [`dispose_all`](`BeaconGroup::dispose_all`).
	pub fn add_disposer(&self, disposer: Disposer) {
		self.disposers.lock().push(disposer);
	}

	pub fn writable<T: Send + Clone + PartialEq + 'static>(&self, value: T) -> WritableBeacon<T> {
		let cell = self.creator.writable(value);
		self.add(&cell);
		cell
	}

	pub fn lazy_writable<T: Send + Clone + PartialEq + 'static>(&self) -> WritableBeacon<T> {
		let cell = self.creator.lazy_writable();
		self.add(&cell);
		cell
	}

	pub fn derived<T: Send + Clone + PartialEq + 'static>(
		&self,
		compute: impl FnMut() -> T + Send + 'static,
	) -> DerivedBeacon<T> {
		self.derived_with(compute, DerivedOptions::default())
	}

	pub fn derived_with<T: Send + Clone + PartialEq + 'static>(
		&self,
		compute: impl FnMut() -> T + Send + 'static,
		options: DerivedOptions,
	) -> DerivedBeacon<T> {
		let cell = self.creator.derived_with(compute, options);
		self.add(&cell);
		cell
	}

	pub fn effect(&self, body: impl FnMut() + Send + 'static) -> &Self {
		self.effect_with(body, EffectOptions::default())
	}

	pub fn effect_with(
		&self,
		body: impl FnMut() + Send + 'static,
		options: EffectOptions,
	) -> &Self {
		let effect = self.creator.effect_with(body, options);
		self.effects.lock().push(effect);
		self
	}

	pub fn async_derived<T, Fut>(
		&self,
		compute: impl FnMut() -> Fut + Send + 'static,
	) -> AsyncBeacon<T>
	where
		T: Send + Clone + 'static,
		Fut: Future<Output = Result<T, BoxedError>> + Send + 'static,
	{
		self.async_derived_with(compute, AsyncOptions::default())
	}

	pub fn async_derived_with<T, Fut>(
		&self,
		compute: impl FnMut() -> Fut + Send + 'static,
		options: AsyncOptions,
	) -> AsyncBeacon<T>
	where
		T: Send + Clone + 'static,
		Fut: Future<Output = Result<T, BoxedError>> + Send + 'static,
	{
		let cell = self.creator.async_derived_with(compute, options);
		self.add(&cell);
		cell
	}

	pub fn future<T, Fut>(&self, compute: impl FnMut() -> Fut + Send + 'static) -> AsyncBeacon<T>
	where
		T: Send + Clone + 'static,
		Fut: Future<Output = Result<T, BoxedError>> + Send + 'static,
	{
		let cell = self.creator.future(compute);
		self.add(&cell);
		cell
	}

	pub fn debounced<T: Send + Clone + PartialEq + 'static>(
		&self,
		initial: T,
		duration: Duration,
	) -> DebouncedBeacon<T> {
		let cell = self.creator.debounced(initial, duration);
		self.add(&cell);
		cell
	}

	pub fn throttled<T: Send + Clone + PartialEq + 'static>(
		&self,
		initial: T,
		duration: Duration,
		drop_blocked: bool,
	) -> ThrottledBeacon<T> {
		let cell = self.creator.throttled(initial, duration, drop_blocked);
		self.add(&cell);
		cell
	}

	pub fn buffered_count<T: Send + Clone + 'static>(
		&self,
		capacity: usize,
	) -> BufferedCountBeacon<T> {
		let cell = self.creator.buffered_count(capacity);
		self.add(&cell);
		cell
	}

	pub fn buffered_time<T: Send + Clone + 'static>(
		&self,
		duration: Duration,
	) -> BufferedTimeBeacon<T> {
		let cell = self.creator.buffered_time(duration);
		self.add(&cell);
		cell
	}

	pub fn filtered<T: Send + Clone + PartialEq + 'static>(
		&self,
		initial: T,
		filter: impl FnMut(Option<&T>, &T) -> bool + Send + 'static,
	) -> FilteredBeacon<T> {
		let cell = self.creator.filtered(initial, filter);
		self.add(&cell);
		cell
	}

	pub fn timestamped<T: Send + Clone + PartialEq + 'static>(
		&self,
		initial: T,
	) -> TimestampedBeacon<T> {
		let cell = self.creator.timestamped(initial);
		self.add(&cell);
		cell
	}

	pub fn undo_redo<T: Send + Clone + PartialEq + 'static>(
		&self,
		initial: T,
		history_limit: usize,
	) -> UndoRedoBeacon<T> {
		let cell = self.creator.undo_redo(initial, history_limit);
		self.add(&cell);
		cell
	}

	pub fn list<T: Send + Clone + 'static>(&self, initial: Vec<T>) -> ListBeacon<T> {
		let cell = self.creator.list(initial);
		self.add(&cell);
		cell
	}

	pub fn ordered_set<T: Ord + Send + Clone + 'static>(
		&self,
		initial: BTreeSet<T>,
	) -> SetBeacon<T> {
		let cell = self.creator.ordered_set(initial);
		self.add(&cell);
		cell
	}

	pub fn map<K: Ord + Send + Clone + 'static, V: Send + Clone + 'static>(
		&self,
		initial: BTreeMap<K, V>,
	) -> MapBeacon<K, V> {
		let cell = self.creator.map(initial);
		self.add(&cell);
		cell
	}

	pub fn stream<T, S>(&self, stream: S, cancel_on_error: bool) -> StreamBeacon<T>
	where
		T: Send + Clone + 'static,
		S: Stream<Item = Result<T, BoxedError>> + Send + 'static,
	{
		let cell = self.creator.stream(stream, cancel_on_error);
		self.add(&cell);
		cell
	}

	pub fn stream_raw<T, S>(&self, stream: S, initial: Option<T>) -> RawStreamBeacon<T>
	where
		T: Send + Clone + 'static,
		S: Stream<Item = T> + Send + 'static,
	{
		let cell = self.creator.stream_raw(stream, initial);
		self.add(&cell);
		cell
	}

	/// Runs registered disposers, cancels effects, then disposes every cell.
	/// Idempotent (everything it drains is itself idempotent).
	pub fn dispose_all(&self) {
		let disposers = mem::take(&mut *self.disposers.lock());
		for disposer in disposers {
			disposer.dispose();
		}
		let effects = mem::take(&mut *self.effects.lock());
		for effect in &effects {
			effect.dispose();
		}
		drop(effects);
		let cells = mem::take(&mut *self.cells.lock());
		for cell in cells {
			cell.erased_dispose();
		}
	}

	/// Resets every cell that supports reset.
	pub fn reset_all(&self) {
		for cell in self.cells.lock().iter() {
			let _ = cell.erased_reset();
		}
	}

	#[must_use]
	pub fn cell_count(&self) -> usize {
		self.cells.lock().len()
	}
}
