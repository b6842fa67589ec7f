//! The shared producer core behind every cell variant.
//!
//! One `ProducerCore` owns a cell's value slot (current/previous/initial),
//! its listener registry, and its dispose hooks. Cell variants compose it
//! with their own state; derived variants additionally hang a [`NodeHooks`]
//! back-link on it so reads can pull-refresh and listener-count edges can
//! drive sleep/wake.

use std::{
	collections::{BTreeMap, BTreeSet},
	sync::{Arc, Weak},
};

use luciferin::{
	runtime::{Dependency, DependencyRecord, NodeId, Observer},
	Runtime,
};
use parking_lot::Mutex;
use tracing::debug;

use crate::{
	error::BeaconError,
	subscription::{Disposer, SubscribeOptions},
};

/// Variant-specific behaviour a producer calls back into.
///
/// All hooks run inside the runtime critical section with no producer lock
/// held.
pub(crate) trait NodeHooks: Send + Sync {
	/// Bring the value up to date before it is read or delivered.
	fn ensure_fresh(&self) {}

	/// The listener count left zero.
	fn listeners_became_nonempty(&self) {}

	/// The listener count reached zero.
	fn listeners_became_empty(&self) {}
}

type SubscriberFn<T> = Arc<Mutex<Box<dyn FnMut(&T) + Send>>>;

struct SubscriberEntry<T> {
	callback: SubscriberFn<T>,
	synchronous: bool,
}

pub(crate) struct ProducerState<T> {
	value: Option<T>,
	previous: Option<T>,
	initial: Option<T>,
	observers: BTreeMap<NodeId, Weak<dyn Observer>>,
	subscribers: BTreeMap<u64, SubscriberEntry<T>>,
	next_subscriber: u64,
	/// Target ids this cell currently wraps; double-wrap is a no-op.
	wrapped: BTreeSet<NodeId>,
	dispose_hooks: Vec<Box<dyn FnOnce() + Send>>,
	hooks: Option<Weak<dyn NodeHooks>>,
	name: Option<String>,
	disposed: bool,
}

pub(crate) struct ProducerCore<T: Send + 'static> {
	runtime: Arc<Runtime>,
	id: NodeId,
	state: Mutex<ProducerState<T>>,
}

impl<T: Send + 'static> ProducerCore<T> {
	pub(crate) fn new_lazy(runtime: Arc<Runtime>, name: Option<String>) -> Arc<Self> {
		let id = runtime.next_id();
		Arc::new(Self {
			runtime,
			id,
			state: Mutex::new(ProducerState {
				value: None,
				previous: None,
				initial: None,
				observers: BTreeMap::new(),
				subscribers: BTreeMap::new(),
				next_subscriber: 0,
				wrapped: BTreeSet::new(),
				dispose_hooks: Vec::new(),
				hooks: None,
				name,
				disposed: false,
			}),
		})
	}

	pub(crate) fn new_with(runtime: Arc<Runtime>, value: T, name: Option<String>) -> Arc<Self>
	where
		T: Clone,
	{
		let this = Self::new_lazy(runtime, name);
		{
			let mut state = this.state.lock();
			state.initial = Some(value.clone());
			state.previous = Some(value.clone());
			state.value = Some(value);
		}
		this
	}

	pub(crate) fn runtime(&self) -> &Arc<Runtime> {
		&self.runtime
	}

	pub(crate) fn id(&self) -> NodeId {
		self.id
	}

	pub(crate) fn name(&self) -> Option<String> {
		self.state.lock().name.clone()
	}

	pub(crate) fn set_name(&self, name: String) {
		self.state.lock().name = Some(name);
	}

	/// The diagnostic name, falling back to the node id.
	pub(crate) fn display_name(&self) -> String {
		self.name()
			.unwrap_or_else(|| format!("beacon #{}", self.id.get()))
	}

	pub(crate) fn is_empty(&self) -> bool {
		self.state.lock().value.is_none()
	}

	pub(crate) fn is_disposed(&self) -> bool {
		self.state.lock().disposed
	}

	pub(crate) fn listeners_count(&self) -> usize {
		let state = self.state.lock();
		state.observers.len() + state.subscribers.len()
	}

	pub(crate) fn previous_value(&self) -> Option<T>
	where
		T: Clone,
	{
		self.state.lock().previous.clone()
	}

	pub(crate) fn initial_value(&self) -> Option<T>
	where
		T: Clone,
	{
		self.state.lock().initial.clone()
	}

	pub(crate) fn set_hooks(&self, hooks: Weak<dyn NodeHooks>) {
		self.state.lock().hooks = Some(hooks);
	}

	fn hooks(&self) -> Option<Arc<dyn NodeHooks>> {
		self.state.lock().hooks.as_ref().and_then(Weak::upgrade)
	}

	fn ensure_fresh(&self) {
		if let Some(hooks) = self.hooks() {
			hooks.ensure_fresh();
		}
	}

	// --- reads ------------------------------------------------------------

	/// Tracked read: records this producer as a dependency of the current
	/// consumer, refreshing first.
	pub(crate) fn try_get(this: &Arc<Self>) -> Result<T, BeaconError>
	where
		T: Clone,
	{
		let _critical = this.runtime.enter();
		this.ensure_fresh();
		Self::record_dependency(this);
		let value = this.state.lock().value.clone();
		value.ok_or_else(|| BeaconError::LazyRead {
			name: this.display_name(),
		})
	}

	/// Untracked read; still refreshes derived values.
	pub(crate) fn try_peek(this: &Arc<Self>) -> Result<T, BeaconError>
	where
		T: Clone,
	{
		let _critical = this.runtime.enter();
		this.ensure_fresh();
		this.state
			.lock()
			.value
			.clone()
			.ok_or_else(|| BeaconError::LazyRead {
				name: this.display_name(),
			})
	}

	/// Borrow-style read.
	///
	/// `f` runs with the value lock held: it must not call back into this
	/// cell.
	pub(crate) fn with_value<R>(
		this: &Arc<Self>,
		tracked: bool,
		f: impl FnOnce(&T) -> R,
	) -> Result<R, BeaconError> {
		let _critical = this.runtime.enter();
		this.ensure_fresh();
		if tracked {
			Self::record_dependency(this);
		}
		let state = this.state.lock();
		state
			.value
			.as_ref()
			.map(f)
			.ok_or_else(|| BeaconError::LazyRead {
				name: this.display_name(),
			})
	}

	/// Snapshot of the value slot with no refresh and no tracking.
	pub(crate) fn raw_value(&self) -> Option<T>
	where
		T: Clone,
	{
		self.state.lock().value.clone()
	}

	pub(crate) fn record_dependency(this: &Arc<Self>) {
		let dependency: Weak<dyn Dependency> = {
			let weak: Weak<Self> = Arc::downgrade(this);
			weak
		};
		this.runtime.record_read(DependencyRecord {
			id: this.id,
			dependency,
		});
	}

	// --- writes -----------------------------------------------------------

	/// A consumer may not write a producer it currently depends on.
	pub(crate) fn check_circular(this: &Arc<Self>) -> Result<(), BeaconError> {
		if let Some(observer_id) = this.runtime.current_observer_id() {
			let listens = this.state.lock().observers.contains_key(&observer_id);
			if listens || this.runtime.current_frame_reads(this.id) {
				return Err(BeaconError::CircularDependency {
					name: this.display_name(),
				});
			}
		}
		Ok(())
	}

	/// Applies the value-slot transition of an accepted write without
	/// notifying. **Returns** whether the write was accepted.
	pub(crate) fn settle_value(this: &Arc<Self>, value: T, force: bool) -> bool
	where
		T: Clone + PartialEq,
	{
		let mut state = this.state.lock();
		if state.disposed {
			return false;
		}
		match &state.value {
			None => {
				state.initial = Some(value.clone());
				state.previous = Some(value.clone());
				state.value = Some(value);
				true
			}
			Some(current) if force || *current != value => {
				state.previous = state.value.replace(value);
				true
			}
			Some(_) => false,
		}
	}

	/// [`settle_value`](`Self::settle_value`) without the equality gate (and
	/// so without the `PartialEq` bound).
	pub(crate) fn settle_value_forced(this: &Arc<Self>, value: T) -> bool
	where
		T: Clone,
	{
		let mut state = this.state.lock();
		if state.disposed {
			return false;
		}
		if state.value.is_none() {
			state.initial = Some(value.clone());
			state.previous = Some(value.clone());
			state.value = Some(value);
		} else {
			state.previous = state.value.replace(value);
		}
		true
	}

	/// The standard external write path: circular check, equality-gated
	/// transition, notification.
	pub(crate) fn write(this: &Arc<Self>, value: T, force: bool) -> Result<(), BeaconError>
	where
		T: Clone + PartialEq,
	{
		let _critical = this.runtime.enter();
		Self::check_circular(this)?;
		if Self::settle_value(this, value, force) {
			Self::notify(this);
		}
		Ok(())
	}

	pub(crate) fn write_forced(this: &Arc<Self>, value: T) -> Result<(), BeaconError>
	where
		T: Clone,
	{
		let _critical = this.runtime.enter();
		Self::check_circular(this)?;
		if Self::settle_value_forced(this, value) {
			Self::notify(this);
		}
		Ok(())
	}

	/// In-place mutation of the current value; always notifies.
	///
	/// `f` runs with the value lock held: it must not call back into this
	/// cell.
	pub(crate) fn mutate<R>(
		this: &Arc<Self>,
		f: impl FnOnce(&mut T) -> R,
	) -> Result<R, BeaconError>
	where
		T: Clone,
	{
		let _critical = this.runtime.enter();
		Self::check_circular(this)?;
		let result = {
			let mut state = this.state.lock();
			if state.disposed {
				return Err(BeaconError::LazyRead {
					name: this.display_name(),
				});
			}
			let snapshot = state.value.clone();
			let Some(value) = state.value.as_mut() else {
				return Err(BeaconError::LazyRead {
					name: this.display_name(),
				});
			};
			let result = f(value);
			state.previous = snapshot;
			result
		};
		Self::notify(this);
		Ok(result)
	}

	/// Discards the cached value (derived sleep). Leaves `initial` and
	/// listener structure untouched.
	pub(crate) fn clear_value(&self) {
		self.state.lock().value = None;
	}

	// --- notification -----------------------------------------------------

	/// Routes an accepted write: suppressed while untracked, deferred inside
	/// batches, otherwise delivered now.
	pub(crate) fn notify(this: &Arc<Self>)
	where
		T: Clone,
	{
		let runtime = &this.runtime;
		if runtime.is_untracked() {
			return;
		}
		let weak = Arc::downgrade(this);
		let deferred = runtime.defer_notify(
			this.id,
			Box::new(move || {
				if let Some(this) = weak.upgrade() {
					Self::notify_now(&this);
				}
			}),
		);
		if !deferred {
			Self::notify_now(this);
		}
	}

	fn notify_now(this: &Arc<Self>)
	where
		T: Clone,
	{
		let _critical = this.runtime.enter();
		let (value, observers, synchronous, any_scheduled) = {
			let state = this.state.lock();
			if state.disposed {
				return;
			}
			let Some(value) = state.value.clone() else {
				return;
			};
			let observers: Vec<Weak<dyn Observer>> = state.observers.values().cloned().collect();
			let synchronous: Vec<SubscriberFn<T>> = state
				.subscribers
				.values()
				.filter(|entry| entry.synchronous)
				.map(|entry| Arc::clone(&entry.callback))
				.collect();
			let any_scheduled = state.subscribers.values().any(|entry| !entry.synchronous);
			(value, observers, synchronous, any_scheduled)
		};
		for observer in observers {
			if let Some(observer) = observer.upgrade() {
				if !observer.is_disposed() {
					observer.notify_stale();
				}
			}
		}
		for callback in synchronous {
			this.runtime.detached(|| (*callback.lock())(&value));
		}
		if any_scheduled {
			let weak = Arc::downgrade(this);
			this.runtime.enqueue(
				this.id,
				Box::new(move || {
					if let Some(this) = weak.upgrade() {
						Self::deliver_scheduled(&this);
					}
				}),
			);
		}
	}

	/// Delivers the value as of drain time to every scheduled subscriber.
	fn deliver_scheduled(this: &Arc<Self>)
	where
		T: Clone,
	{
		let _critical = this.runtime.enter();
		let (value, callbacks) = {
			let state = this.state.lock();
			if state.disposed {
				return;
			}
			let Some(value) = state.value.clone() else {
				return;
			};
			let callbacks: Vec<SubscriberFn<T>> = state
				.subscribers
				.values()
				.filter(|entry| !entry.synchronous)
				.map(|entry| Arc::clone(&entry.callback))
				.collect();
			(value, callbacks)
		};
		for callback in callbacks {
			this.runtime.detached(|| (*callback.lock())(&value));
		}
	}

	// --- listeners --------------------------------------------------------

	pub(crate) fn subscribe(
		this: &Arc<Self>,
		callback: impl FnMut(&T) + Send + 'static,
		options: SubscribeOptions,
	) -> Disposer
	where
		T: Clone,
	{
		let _critical = this.runtime.enter();
		this.ensure_fresh();
		let callback: SubscriberFn<T> = Arc::new(Mutex::new(Box::new(callback)));
		let (key, was_empty) = {
			let mut state = this.state.lock();
			if state.disposed {
				return Disposer::noop();
			}
			let was_empty = state.observers.is_empty() && state.subscribers.is_empty();
			state.next_subscriber += 1;
			let key = state.next_subscriber;
			state.subscribers.insert(
				key,
				SubscriberEntry {
					callback: Arc::clone(&callback),
					synchronous: options.synchronous,
				},
			);
			(key, was_empty)
		};
		if was_empty {
			if let Some(hooks) = this.hooks() {
				hooks.listeners_became_nonempty();
			}
		}
		if options.start_now {
			if options.synchronous {
				let value = this.state.lock().value.clone();
				if let Some(value) = value {
					this.runtime.detached(|| (*callback.lock())(&value));
				}
			} else {
				let weak = Arc::downgrade(this);
				let callback = Arc::clone(&callback);
				this.runtime.enqueue(
					this.runtime.next_id(),
					Box::new(move || {
						if let Some(this) = weak.upgrade() {
							let value = this.state.lock().value.clone();
							if let Some(value) = value {
								this.runtime.detached(|| (*callback.lock())(&value));
							}
						}
					}),
				);
			}
		}
		let weak = Arc::downgrade(this);
		Disposer::new(move || {
			if let Some(this) = weak.upgrade() {
				Self::unsubscribe(&this, key);
			}
		})
	}

	fn unsubscribe(this: &Arc<Self>, key: u64) {
		let _critical = this.runtime.enter();
		let now_empty = {
			let mut state = this.state.lock();
			state.subscribers.remove(&key);
			state.observers.is_empty() && state.subscribers.is_empty() && !state.disposed
		};
		if now_empty {
			if let Some(hooks) = this.hooks() {
				hooks.listeners_became_empty();
			}
		}
	}

	// --- wrap bookkeeping -------------------------------------------------

	/// **Returns** `false` iff `target` is already wrapped by this cell.
	pub(crate) fn note_wrapped(&self, target: NodeId) -> bool {
		self.state.lock().wrapped.insert(target)
	}

	pub(crate) fn forget_wrapped(&self, target: NodeId) {
		self.state.lock().wrapped.remove(&target);
	}

	// --- lifecycle --------------------------------------------------------

	/// Registers `hook` to run at disposal; on an already-disposed cell it
	/// runs immediately.
	pub(crate) fn on_dispose(this: &Arc<Self>, hook: impl FnOnce() + Send + 'static) {
		let hook = {
			let mut state = this.state.lock();
			if state.disposed {
				Some(hook)
			} else {
				state.dispose_hooks.push(Box::new(hook));
				None
			}
		};
		if let Some(hook) = hook {
			hook();
		}
	}

	/// Clears listeners, resets the value slot to `initial`, runs dispose
	/// hooks once. Idempotent; disposed cells neither accept nor deliver.
	pub(crate) fn dispose(this: &Arc<Self>)
	where
		T: Clone,
	{
		let _critical = this.runtime.enter();
		let hooks = {
			let mut state = this.state.lock();
			if state.disposed {
				return;
			}
			state.disposed = true;
			state.observers.clear();
			state.subscribers.clear();
			state.wrapped.clear();
			state.value = state.initial.clone();
			state.previous = None;
			state.hooks = None;
			std::mem::take(&mut state.dispose_hooks)
		};
		debug!(name = %this.display_name(), "disposed");
		for hook in hooks {
			hook();
		}
	}
}

impl<T: Send + 'static> Dependency for ProducerCore<T> {
	fn id(&self) -> NodeId {
		self.id
	}

	fn attach(&self, observer_id: NodeId, observer: Weak<dyn Observer>) {
		let was_empty = {
			let mut state = self.state.lock();
			if state.disposed {
				return;
			}
			let was_empty = state.observers.is_empty() && state.subscribers.is_empty();
			state.observers.insert(observer_id, observer);
			was_empty
		};
		if was_empty {
			if let Some(hooks) = self.hooks() {
				hooks.listeners_became_nonempty();
			}
		}
	}

	fn detach(&self, observer_id: NodeId) {
		let now_empty = {
			let mut state = self.state.lock();
			state.observers.remove(&observer_id);
			state.observers.is_empty() && state.subscribers.is_empty() && !state.disposed
		};
		if now_empty {
			if let Some(hooks) = self.hooks() {
				hooks.listeners_became_empty();
			}
		}
	}
}
