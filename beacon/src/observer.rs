//! The shared consumer core behind derived cells, effects, and async
//! derivations.

use std::{
	collections::BTreeSet,
	mem,
	sync::{Arc, OnceLock, Weak},
	thread,
};

use luciferin::{
	runtime::{DependencyRecord, NodeId, Observer},
	Runtime,
};
use parking_lot::Mutex;

struct ObserverState {
	dependencies: Vec<DependencyRecord>,
	dependency_ids: BTreeSet<NodeId>,
	stale: bool,
	disposed: bool,
	has_run: bool,
	sleeping: bool,
}

pub(crate) struct ObserverCore {
	runtime: Arc<Runtime>,
	id: NodeId,
	self_observer: OnceLock<Weak<dyn Observer>>,
	state: Mutex<ObserverState>,
}

impl ObserverCore {
	pub(crate) fn new(runtime: Arc<Runtime>) -> Self {
		let id = runtime.next_id();
		Self {
			runtime,
			id,
			self_observer: OnceLock::new(),
			state: Mutex::new(ObserverState {
				dependencies: Vec::new(),
				dependency_ids: BTreeSet::new(),
				stale: false,
				disposed: false,
				has_run: false,
				sleeping: false,
			}),
		}
	}

	pub(crate) fn id(&self) -> NodeId {
		self.id
	}

	pub(crate) fn runtime(&self) -> &Arc<Runtime> {
		&self.runtime
	}

	/// Binds the owning node's observer identity; called once right after
	/// the owning `Arc` is built.
	pub(crate) fn bind(&self, observer: Weak<dyn Observer>) {
		self.self_observer
			.set(observer)
			.unwrap_or_else(|_| unreachable!("bound twice"));
	}

	pub(crate) fn is_disposed(&self) -> bool {
		self.state.lock().disposed
	}

	pub(crate) fn is_stale(&self) -> bool {
		self.state.lock().stale
	}

	pub(crate) fn is_sleeping(&self) -> bool {
		self.state.lock().sleeping
	}

	pub(crate) fn has_run(&self) -> bool {
		self.state.lock().has_run
	}

	pub(crate) fn mark_stale(&self) {
		self.state.lock().stale = true;
	}

	pub(crate) fn clear_stale(&self) {
		self.state.lock().stale = false;
	}

	/// Records a completed run: fresh, awake, initialised.
	pub(crate) fn note_ran(&self) {
		let mut state = self.state.lock();
		state.stale = false;
		state.sleeping = false;
		state.has_run = true;
	}

	/// Whether a refresh is needed before the owning node's value can be
	/// trusted.
	pub(crate) fn needs_refresh(&self) -> bool {
		let state = self.state.lock();
		!state.disposed && (!state.has_run || state.stale || state.sleeping)
	}

	/// Enqueues the owning node's `run` with the scheduler.
	pub(crate) fn schedule_run(&self) {
		let Some(weak) = self.self_observer.get().cloned() else {
			return;
		};
		self.runtime.enqueue(
			self.id,
			Box::new(move || {
				if let Some(observer) = weak.upgrade() {
					if !observer.is_disposed() {
						observer.run();
					}
				}
			}),
		);
	}

	/// Runs `body` under a recording frame and, on success, swaps the
	/// dependency set for what was read. A panicking body leaves the
	/// previous dependency set in place.
	pub(crate) fn run_tracked<R>(&self, body: impl FnOnce() -> R) -> thread::Result<R> {
		let (result, reads) = self.runtime.record(self.id, body);
		if result.is_ok() {
			self.apply_dependencies(reads);
		}
		result
	}

	/// Runs `body` detached: the frozen-dependency mode, where the first
	/// run's subscriptions stay as they are.
	pub(crate) fn run_frozen<R>(&self, body: impl FnOnce() -> R) -> thread::Result<R> {
		self.runtime.detached(|| {
			std::panic::catch_unwind(std::panic::AssertUnwindSafe(body))
		})
	}

	fn apply_dependencies(&self, new: Vec<DependencyRecord>) {
		let Some(self_weak) = self.self_observer.get().cloned() else {
			return;
		};
		let (removed, added) = {
			let mut state = self.state.lock();
			if state.disposed {
				return;
			}
			let new_ids: BTreeSet<NodeId> = new.iter().map(|record| record.id).collect();
			let old = mem::replace(&mut state.dependencies, new);
			let old_ids = mem::replace(&mut state.dependency_ids, new_ids.clone());
			let removed: Vec<DependencyRecord> = old
				.into_iter()
				.filter(|record| !new_ids.contains(&record.id))
				.collect();
			let added: Vec<DependencyRecord> = state
				.dependencies
				.iter()
				.filter(|record| !old_ids.contains(&record.id))
				.cloned()
				.collect();
			(removed, added)
		};
		for record in removed {
			if let Some(dependency) = record.dependency.upgrade() {
				dependency.detach(self.id);
			}
		}
		for record in added {
			if let Some(dependency) = record.dependency.upgrade() {
				dependency.attach(self.id, self_weak.clone());
			}
		}
	}

	/// Detaches from every dependency and forgets them (sleep).
	pub(crate) fn release_dependencies(&self) {
		let taken = {
			let mut state = self.state.lock();
			state.dependency_ids.clear();
			mem::take(&mut state.dependencies)
		};
		for record in taken {
			if let Some(dependency) = record.dependency.upgrade() {
				dependency.detach(self.id);
			}
		}
	}

	pub(crate) fn set_sleeping(&self, sleeping: bool) {
		self.state.lock().sleeping = sleeping;
	}

	/// Idempotent.
	pub(crate) fn dispose(&self) {
		{
			let mut state = self.state.lock();
			if state.disposed {
				return;
			}
			state.disposed = true;
		}
		self.release_dependencies();
	}
}
