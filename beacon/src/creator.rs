//! The factory surface.
//!
//! [`Beacon`] creates cells on the global runtime; a [`Creator`] is the same
//! surface bound to a specific [`Runtime`], for isolated graphs (tests,
//! embedded hosts).

use std::{
	collections::{BTreeMap, BTreeSet},
	future::Future,
	sync::Arc,
	time::Duration,
};

use futures_lite::Stream;
use luciferin::{clock::Clock, runtime::FlushTask, spawner::Spawner, Runtime, ScheduleMode};

use crate::{
	collections::{ListBeacon, MapBeacon, SetBeacon},
	derived::{DerivedBeacon, DerivedOptions},
	effect::{Effect, EffectOptions},
	error::BoxedError,
	family::Family,
	future::{AsyncBeacon, AsyncOptions, ComputeFuture},
	group::BeaconGroup,
	stream::{RawStreamBeacon, StreamBeacon},
	timed::{
		BufferedCountBeacon, BufferedTimeBeacon, DebouncedBeacon, FilteredBeacon,
		ThrottledBeacon, TimestampedBeacon, UndoRedoBeacon,
	},
	writable::WritableBeacon,
};

/// Factory bound to one [`Runtime`].
#[derive(Clone)]
pub struct Creator {
	runtime: Arc<Runtime>,
}

impl Creator {
	#[must_use]
	pub fn new(runtime: Arc<Runtime>) -> Self {
		Self { runtime }
	}

	/// The factory over [`Runtime::global`].
	#[must_use]
	pub fn global() -> Self {
		Self {
			runtime: Runtime::global(),
		}
	}

	#[must_use]
	pub fn runtime(&self) -> &Arc<Runtime> {
		&self.runtime
	}

	fn rt(&self) -> Arc<Runtime> {
		Arc::clone(&self.runtime)
	}

	// --- cells ------------------------------------------------------------

	pub fn writable<T: Send + Clone + 'static>(&self, value: T) -> WritableBeacon<T> {
		WritableBeacon::create(self.rt(), value, None)
	}

	/// A writable that starts empty; reads before the first write fail.
	pub fn lazy_writable<T: Send + Clone + 'static>(&self) -> WritableBeacon<T> {
		WritableBeacon::create_lazy(self.rt(), None)
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
		DerivedBeacon::create(self.rt(), compute, options, None)
	}

	pub fn effect(&self, body: impl FnMut() + Send + 'static) -> Effect {
		self.effect_with(body, EffectOptions::default())
	}

	pub fn effect_with(
		&self,
		body: impl FnMut() + Send + 'static,
		options: EffectOptions,
	) -> Effect {
		Effect::create(self.rt(), body, options, None)
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
		mut compute: impl FnMut() -> Fut + Send + 'static,
		options: AsyncOptions,
	) -> AsyncBeacon<T>
	where
		T: Send + Clone + 'static,
		Fut: Future<Output = Result<T, BoxedError>> + Send + 'static,
	{
		AsyncBeacon::create(
			self.rt(),
			Box::new(move || {
				let future: ComputeFuture<T> = Box::pin(compute());
				future
			}),
			options,
			true,
			None,
		)
	}

	/// An async cell with no dependency tracking: the compute runs once (and
	/// again only on [`AsyncBeacon::run`] / [`AsyncBeacon::reset`]).
	pub fn future<T, Fut>(&self, compute: impl FnMut() -> Fut + Send + 'static) -> AsyncBeacon<T>
	where
		T: Send + Clone + 'static,
		Fut: Future<Output = Result<T, BoxedError>> + Send + 'static,
	{
		self.future_with(compute, AsyncOptions::default())
	}

	pub fn future_with<T, Fut>(
		&self,
		mut compute: impl FnMut() -> Fut + Send + 'static,
		options: AsyncOptions,
	) -> AsyncBeacon<T>
	where
		T: Send + Clone + 'static,
		Fut: Future<Output = Result<T, BoxedError>> + Send + 'static,
	{
		AsyncBeacon::create(
			self.rt(),
			Box::new(move || {
				let future: ComputeFuture<T> = Box::pin(compute());
				future
			}),
			options,
			false,
			None,
		)
	}

	pub fn debounced<T: Send + Clone + PartialEq + 'static>(
		&self,
		initial: T,
		duration: Duration,
	) -> DebouncedBeacon<T> {
		DebouncedBeacon::create(self.rt(), Some(initial), duration, None)
	}

	pub fn lazy_debounced<T: Send + Clone + PartialEq + 'static>(
		&self,
		duration: Duration,
	) -> DebouncedBeacon<T> {
		DebouncedBeacon::create(self.rt(), None, duration, None)
	}

	pub fn throttled<T: Send + Clone + PartialEq + 'static>(
		&self,
		initial: T,
		duration: Duration,
		drop_blocked: bool,
	) -> ThrottledBeacon<T> {
		ThrottledBeacon::create(self.rt(), Some(initial), duration, drop_blocked, None)
	}

	pub fn lazy_throttled<T: Send + Clone + PartialEq + 'static>(
		&self,
		duration: Duration,
		drop_blocked: bool,
	) -> ThrottledBeacon<T> {
		ThrottledBeacon::create(self.rt(), None, duration, drop_blocked, None)
	}

	/// Buffer flushing every `capacity` written items; only written items
	/// are buffered.
	pub fn buffered_count<T: Send + Clone + 'static>(
		&self,
		capacity: usize,
	) -> BufferedCountBeacon<T> {
		BufferedCountBeacon::create(self.rt(), capacity, None, None)
	}

	/// Buffer whose `seed` counts as its first pending item.
	pub fn buffered_count_seeded<T: Send + Clone + 'static>(
		&self,
		capacity: usize,
		seed: T,
	) -> BufferedCountBeacon<T> {
		BufferedCountBeacon::create(self.rt(), capacity, Some(seed), None)
	}

	pub fn buffered_time<T: Send + Clone + 'static>(
		&self,
		duration: Duration,
	) -> BufferedTimeBeacon<T> {
		BufferedTimeBeacon::create(self.rt(), duration, None)
	}

	pub fn filtered<T: Send + Clone + PartialEq + 'static>(
		&self,
		initial: T,
		filter: impl FnMut(Option<&T>, &T) -> bool + Send + 'static,
	) -> FilteredBeacon<T> {
		FilteredBeacon::create(self.rt(), Some(initial), Some(Box::new(filter)), None)
	}

	pub fn lazy_filtered<T: Send + Clone + PartialEq + 'static>(
		&self,
		filter: impl FnMut(Option<&T>, &T) -> bool + Send + 'static,
	) -> FilteredBeacon<T> {
		FilteredBeacon::create(self.rt(), None, Some(Box::new(filter)), None)
	}

	pub fn timestamped<T: Send + Clone + PartialEq + 'static>(
		&self,
		initial: T,
	) -> TimestampedBeacon<T> {
		TimestampedBeacon::create(self.rt(), Some(initial), None)
	}

	pub fn undo_redo<T: Send + Clone + PartialEq + 'static>(
		&self,
		initial: T,
		history_limit: usize,
	) -> UndoRedoBeacon<T> {
		UndoRedoBeacon::create(self.rt(), initial, history_limit, None)
	}

	pub fn list<T: Send + Clone + 'static>(&self, initial: Vec<T>) -> ListBeacon<T> {
		ListBeacon::create(self.rt(), initial, None)
	}

	pub fn ordered_set<T: Ord + Send + Clone + 'static>(
		&self,
		initial: BTreeSet<T>,
	) -> SetBeacon<T> {
		SetBeacon::create(self.rt(), initial, None)
	}

	pub fn map<K: Ord + Send + Clone + 'static, V: Send + Clone + 'static>(
		&self,
		initial: BTreeMap<K, V>,
	) -> MapBeacon<K, V> {
		MapBeacon::create(self.rt(), initial, None)
	}

	pub fn stream<T, S>(&self, stream: S, cancel_on_error: bool) -> StreamBeacon<T>
	where
		T: Send + Clone + 'static,
		S: Stream<Item = Result<T, BoxedError>> + Send + 'static,
	{
		StreamBeacon::create(self.rt(), stream, cancel_on_error, None)
	}

	pub fn stream_raw<T, S>(&self, stream: S, initial: Option<T>) -> RawStreamBeacon<T>
	where
		T: Send + Clone + 'static,
		S: Stream<Item = T> + Send + 'static,
	{
		RawStreamBeacon::create(self.rt(), stream, initial, None, None)
	}

	pub fn stream_raw_with<T, S>(
		&self,
		stream: S,
		initial: Option<T>,
		on_done: impl FnOnce() + Send + 'static,
	) -> RawStreamBeacon<T>
	where
		T: Send + Clone + 'static,
		S: Stream<Item = T> + Send + 'static,
	{
		RawStreamBeacon::create(self.rt(), stream, initial, Some(Box::new(on_done)), None)
	}

	/// Caching keyed factory.
	pub fn family<K: Ord + Clone, B: Clone>(
		&self,
		factory: impl FnMut(&K) -> B + Send + 'static,
	) -> Family<K, B> {
		Family::create(factory, true)
	}

	pub fn family_with<K: Ord + Clone, B: Clone>(
		&self,
		factory: impl FnMut(&K) -> B + Send + 'static,
		cache: bool,
	) -> Family<K, B> {
		Family::create(factory, cache)
	}

	#[must_use]
	pub fn group(&self) -> BeaconGroup {
		BeaconGroup::create(self.clone())
	}

	// --- runtime controls -------------------------------------------------

	pub fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
		self.runtime.batch(f)
	}

	pub fn untracked<R>(&self, f: impl FnOnce() -> R) -> R {
		self.runtime.untracked(f)
	}

	pub fn flush(&self) {
		self.runtime.flush();
	}

	pub fn settle(&self, after: Duration) -> impl Future<Output = ()> + Send + 'static {
		self.runtime.settle(after)
	}

	pub fn use_sync(&self) {
		self.runtime.use_sync();
	}

	pub fn use_deferred(&self) {
		self.runtime.use_deferred();
	}

	#[must_use]
	pub fn schedule_mode(&self) -> ScheduleMode {
		self.runtime.schedule_mode()
	}

	pub fn set_scheduler(&self, hook: impl Fn(FlushTask) + Send + Sync + 'static) {
		self.runtime.set_scheduler(hook);
	}

	pub fn set_clock(&self, clock: Arc<dyn Clock>) {
		self.runtime.set_clock(clock);
	}

	pub fn set_spawner(&self, spawner: Arc<dyn Spawner>) {
		self.runtime.set_spawner(spawner);
	}
}

/// The global-runtime facade: `Beacon::writable(0)`, `Beacon::derived(…)`, …
pub struct Beacon;

impl Beacon {
	pub fn writable<T: Send + Clone + 'static>(value: T) -> WritableBeacon<T> {
		Creator::global().writable(value)
	}

	pub fn lazy_writable<T: Send + Clone + 'static>() -> WritableBeacon<T> {
		Creator::global().lazy_writable()
	}

	pub fn derived<T: Send + Clone + PartialEq + 'static>(
		compute: impl FnMut() -> T + Send + 'static,
	) -> DerivedBeacon<T> {
		Creator::global().derived(compute)
	}

	pub fn derived_with<T: Send + Clone + PartialEq + 'static>(
		compute: impl FnMut() -> T + Send + 'static,
		options: DerivedOptions,
	) -> DerivedBeacon<T> {
		Creator::global().derived_with(compute, options)
	}

	pub fn effect(body: impl FnMut() + Send + 'static) -> Effect {
		Creator::global().effect(body)
	}

	pub fn effect_with(body: impl FnMut() + Send + 'static, options: EffectOptions) -> Effect {
		Creator::global().effect_with(body, options)
	}

	pub fn async_derived<T, Fut>(compute: impl FnMut() -> Fut + Send + 'static) -> AsyncBeacon<T>
	where
		T: Send + Clone + 'static,
		Fut: Future<Output = Result<T, BoxedError>> + Send + 'static,
	{
		Creator::global().async_derived(compute)
	}

	pub fn future<T, Fut>(compute: impl FnMut() -> Fut + Send + 'static) -> AsyncBeacon<T>
	where
		T: Send + Clone + 'static,
		Fut: Future<Output = Result<T, BoxedError>> + Send + 'static,
	{
		Creator::global().future(compute)
	}

	pub fn debounced<T: Send + Clone + PartialEq + 'static>(
		initial: T,
		duration: Duration,
	) -> DebouncedBeacon<T> {
		Creator::global().debounced(initial, duration)
	}

	pub fn throttled<T: Send + Clone + PartialEq + 'static>(
		initial: T,
		duration: Duration,
		drop_blocked: bool,
	) -> ThrottledBeacon<T> {
		Creator::global().throttled(initial, duration, drop_blocked)
	}

	pub fn buffered_count<T: Send + Clone + 'static>(capacity: usize) -> BufferedCountBeacon<T> {
		Creator::global().buffered_count(capacity)
	}

	pub fn buffered_time<T: Send + Clone + 'static>(duration: Duration) -> BufferedTimeBeacon<T> {
		Creator::global().buffered_time(duration)
	}

	pub fn filtered<T: Send + Clone + PartialEq + 'static>(
		initial: T,
		filter: impl FnMut(Option<&T>, &T) -> bool + Send + 'static,
	) -> FilteredBeacon<T> {
		Creator::global().filtered(initial, filter)
	}

	pub fn timestamped<T: Send + Clone + PartialEq + 'static>(initial: T) -> TimestampedBeacon<T> {
		Creator::global().timestamped(initial)
	}

	pub fn undo_redo<T: Send + Clone + PartialEq + 'static>(
		initial: T,
		history_limit: usize,
	) -> UndoRedoBeacon<T> {
		Creator::global().undo_redo(initial, history_limit)
	}

	pub fn list<T: Send + Clone + 'static>(initial: Vec<T>) -> ListBeacon<T> {
		Creator::global().list(initial)
	}

	pub fn ordered_set<T: Ord + Send + Clone + 'static>(initial: BTreeSet<T>) -> SetBeacon<T> {
		Creator::global().ordered_set(initial)
	}

	pub fn map<K: Ord + Send + Clone + 'static, V: Send + Clone + 'static>(
		initial: BTreeMap<K, V>,
	) -> MapBeacon<K, V> {
		Creator::global().map(initial)
	}

	pub fn stream<T, S>(stream: S, cancel_on_error: bool) -> StreamBeacon<T>
	where
		T: Send + Clone + 'static,
		S: Stream<Item = Result<T, BoxedError>> + Send + 'static,
	{
		Creator::global().stream(stream, cancel_on_error)
	}

	pub fn stream_raw<T, S>(stream: S, initial: Option<T>) -> RawStreamBeacon<T>
	where
		T: Send + Clone + 'static,
		S: Stream<Item = T> + Send + 'static,
	{
		Creator::global().stream_raw(stream, initial)
	}

	pub fn family<K: Ord + Clone, B: Clone>(
		factory: impl FnMut(&K) -> B + Send + 'static,
	) -> Family<K, B> {
		Creator::global().family(factory)
	}

	#[must_use]
	pub fn group() -> BeaconGroup {
		Creator::global().group()
	}

	pub fn batch<R>(f: impl FnOnce() -> R) -> R {
		Creator::global().batch(f)
	}

	pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
		Creator::global().untracked(f)
	}

	pub fn flush() {
		Creator::global().flush();
	}
}
