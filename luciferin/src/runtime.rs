//! The per-graph [`Runtime`]: tracking context, batching, and scheduling.
//!
//! One [`Runtime`] instance is one isolated reactive graph. Most applications
//! use [`Runtime::global`]; tests and embedded hosts create their own with
//! [`Runtime::new`] so that graphs cannot observe each other.

use std::{
	collections::BTreeSet,
	future::Future,
	mem,
	num::NonZeroU64,
	panic::{catch_unwind, resume_unwind, AssertUnwindSafe},
	sync::{
		atomic::{AtomicU64, Ordering},
		Arc, OnceLock, Weak,
	},
	thread,
	time::Duration,
};

use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};
use scopeguard::defer;
use tracing::{trace, warn};

use crate::{
	clock::{Clock, ThreadClock},
	spawner::{Spawner, TaskFuture, ThreadSpawner},
};

mod scheduler;
use scheduler::Scheduler;
pub use scheduler::{FlushTask, ScheduleMode};

/// Identifies one node (producer side or consumer side) towards its [`Runtime`].
///
/// Ids are unique per runtime instance and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(NonZeroU64);

impl NodeId {
	#[must_use]
	pub fn get(self) -> u64 {
		self.0.get()
	}
}

/// The consumer side of a graph edge: something that re-runs when a
/// dependency changes.
///
/// # Logic
///
/// Producers hold observers weakly; dropping every strong handle to a
/// consumer is equivalent to disposing it.
pub trait Observer: Send + Sync {
	fn id(&self) -> NodeId;

	/// A dependency of this observer accepted a write.
	///
	/// Called inside the runtime's critical section. The observer decides
	/// whether to enqueue itself, recompute eagerly, or go to sleep.
	fn notify_stale(&self);

	/// Re-evaluates the observer. Called by the scheduler while draining.
	fn run(&self);

	fn is_disposed(&self) -> bool;

	fn debug_label(&self) -> String {
		format!("consumer #{}", self.id().get())
	}
}

/// The producer side of a graph edge: something observers can attach to.
pub trait Dependency: Send + Sync {
	fn id(&self) -> NodeId;

	/// Registers `observer` as a listener. Idempotent per `observer_id`.
	fn attach(&self, observer_id: NodeId, observer: Weak<dyn Observer>);

	/// Removes the listener registered under `observer_id`, if any.
	fn detach(&self, observer_id: NodeId);
}

/// One read recorded while a consumer frame was on the stack.
#[derive(Clone)]
pub struct DependencyRecord {
	pub id: NodeId,
	pub dependency: Weak<dyn Dependency>,
}

struct Frame {
	id: NodeId,
	reads: Vec<DependencyRecord>,
	read_ids: BTreeSet<NodeId>,
}

#[derive(Default)]
struct Tracking {
	/// `None` entries are detached scopes: reads inside them are plain lookups.
	frames: Vec<Option<Frame>>,
	untracked_depth: usize,
	batch_depth: usize,
	batch_queue: Vec<(NodeId, Box<dyn FnOnce() + Send>)>,
	batch_ids: BTreeSet<NodeId>,
}

/// One isolated reactive graph: id allocation, the tracking context, the
/// scheduler, and the host services cells consume.
///
/// All graph mutation happens inside one reentrant critical section, so a
/// runtime is effectively single-threaded cooperative even though handles are
/// `Send + Sync`; threads that call in concurrently serialize at the door.
pub struct Runtime {
	critical: ReentrantMutex<()>,
	ids: AtomicU64,
	tracking: Mutex<Tracking>,
	scheduler: Scheduler,
	clock: Mutex<Arc<dyn Clock>>,
	spawner: Mutex<Arc<dyn Spawner>>,
	self_weak: OnceLock<Weak<Runtime>>,
}

static GLOBAL_RUNTIME: OnceLock<Arc<Runtime>> = OnceLock::new();

impl Runtime {
	/// Creates a fresh, fully isolated graph.
	#[must_use]
	pub fn new() -> Arc<Self> {
		let runtime = Arc::new(Self {
			critical: ReentrantMutex::new(()),
			ids: AtomicU64::new(0),
			tracking: Mutex::new(Tracking::default()),
			scheduler: Scheduler::new(),
			clock: Mutex::new(Arc::new(ThreadClock::new())),
			spawner: Mutex::new(Arc::new(ThreadSpawner)),
			self_weak: OnceLock::new(),
		});
		runtime
			.self_weak
			.set(Arc::downgrade(&runtime))
			.unwrap_or_else(|_| unreachable!());
		runtime
	}

	/// The process-wide default graph.
	#[must_use]
	pub fn global() -> Arc<Self> {
		Arc::clone(GLOBAL_RUNTIME.get_or_init(Self::new))
	}

	pub(crate) fn weak(&self) -> Weak<Self> {
		self.self_weak.get().expect("set in `new`").clone()
	}

	/// Creates a fresh unique [`NodeId`] for this runtime.
	///
	/// Symbols are not interchangeable between runtime instances.
	#[must_use]
	pub fn next_id(&self) -> NodeId {
		NodeId(
			(self.ids.fetch_add(1, Ordering::Relaxed) + 1)
				.try_into()
				.expect("id counter overflow"),
		)
	}

	/// Enters the runtime's reentrant critical section.
	///
	/// Callbacks and cell internals run while it is held; holding it twice
	/// from the same thread is fine.
	pub fn enter(&self) -> ReentrantMutexGuard<'_, ()> {
		self.critical.lock()
	}

	// --- tracking context -------------------------------------------------

	/// Runs `body` with a consumer frame for `observer_id` on the stack and
	/// returns the dependencies it read, in first-read order.
	///
	/// A panicking `body` is returned as the `Err` payload rather than
	/// unwound, so the caller can roll back before re-raising.
	pub fn record<R>(
		&self,
		observer_id: NodeId,
		body: impl FnOnce() -> R,
	) -> (thread::Result<R>, Vec<DependencyRecord>) {
		let _critical = self.enter();
		{
			let mut tracking = self.tracking.lock();
			tracking.frames.push(Some(Frame {
				id: observer_id,
				reads: Vec::new(),
				read_ids: BTreeSet::new(),
			}));
		}
		let result = catch_unwind(AssertUnwindSafe(body));
		let frame = {
			let mut tracking = self.tracking.lock();
			tracking.frames.pop().flatten().expect("unbalanced frame stack")
		};
		debug_assert_eq!(frame.id, observer_id);
		(result, frame.reads)
	}

	/// Runs `f` exempted from any outer dependency recording.
	///
	/// Unlike [`untracked`](`Runtime::untracked`) this does not suppress
	/// write notifications; it is the isolation used around listener
	/// callbacks and frozen-dependency re-runs.
	pub fn detached<R>(&self, f: impl FnOnce() -> R) -> R {
		let _critical = self.enter();
		self.tracking.lock().frames.push(None);
		let result = catch_unwind(AssertUnwindSafe(f));
		let popped = self.tracking.lock().frames.pop();
		debug_assert!(matches!(popped, Some(None)));
		result.unwrap_or_else(|payload| resume_unwind(payload))
	}

	/// Runs `f` with reads untracked *and* write notifications suppressed.
	pub fn untracked<R>(&self, f: impl FnOnce() -> R) -> R {
		let _critical = self.enter();
		{
			let mut tracking = self.tracking.lock();
			tracking.frames.push(None);
			tracking.untracked_depth += 1;
		}
		let result = catch_unwind(AssertUnwindSafe(f));
		{
			let mut tracking = self.tracking.lock();
			let popped = tracking.frames.pop();
			debug_assert!(matches!(popped, Some(None)));
			tracking.untracked_depth -= 1;
		}
		result.unwrap_or_else(|payload| resume_unwind(payload))
	}

	/// When a consumer frame is recording, adds `dependency` to it.
	pub fn record_read(&self, dependency: DependencyRecord) {
		let mut tracking = self.tracking.lock();
		if let Some(Some(frame)) = tracking.frames.last_mut() {
			if frame.read_ids.insert(dependency.id) {
				frame.reads.push(dependency);
			}
		}
	}

	#[must_use]
	pub fn current_observer_id(&self) -> Option<NodeId> {
		self.tracking
			.lock()
			.frames
			.last()
			.and_then(Option::as_ref)
			.map(|frame| frame.id)
	}

	/// Whether the currently recording consumer has already read `id` during
	/// this run. Used for write-into-own-dependency detection.
	#[must_use]
	pub fn current_frame_reads(&self, id: NodeId) -> bool {
		matches!(
			self.tracking.lock().frames.last(),
			Some(Some(frame)) if frame.read_ids.contains(&id)
		)
	}

	#[must_use]
	pub fn is_untracked(&self) -> bool {
		self.tracking.lock().untracked_depth > 0
	}

	// --- batching ---------------------------------------------------------

	#[must_use]
	pub fn in_batch(&self) -> bool {
		self.tracking.lock().batch_depth > 0
	}

	/// Runs `f` with writes accumulated; producers notify once when the
	/// outermost batch exits, each with its value as of the drain.
	///
	/// Writes inside the batch still apply to cells immediately; only the
	/// notifications coalesce. If `f` panics, the pending notifications of
	/// the outermost batch are discarded.
	pub fn batch<R>(self: &Arc<Self>, f: impl FnOnce() -> R) -> R {
		let _critical = self.enter();
		self.tracking.lock().batch_depth += 1;
		let result = catch_unwind(AssertUnwindSafe(f));
		let deferred = {
			let mut tracking = self.tracking.lock();
			tracking.batch_depth -= 1;
			if tracking.batch_depth == 0 {
				tracking.batch_ids.clear();
				mem::take(&mut tracking.batch_queue)
			} else {
				Vec::new()
			}
		};
		match result {
			Ok(value) => {
				for (_, thunk) in deferred {
					thunk();
				}
				if self.schedule_mode() == ScheduleMode::Sync {
					self.drain();
				}
				value
			}
			Err(payload) => {
				drop(deferred);
				resume_unwind(payload)
			}
		}
	}

	/// Defers `thunk` until the outermost batch exits, deduplicated by `id`.
	///
	/// **Returns** `false` (without consuming anything meaningful) when no
	/// batch is active; the caller then notifies directly.
	pub fn defer_notify(&self, id: NodeId, thunk: Box<dyn FnOnce() + Send>) -> bool {
		let mut tracking = self.tracking.lock();
		if tracking.batch_depth == 0 {
			return false;
		}
		if tracking.batch_ids.insert(id) {
			tracking.batch_queue.push((id, thunk));
		}
		true
	}

	// --- scheduling -------------------------------------------------------

	/// Enqueues `task` under `id`, deduplicated against tasks already queued
	/// under the same id.
	///
	/// In [`ScheduleMode::Sync`] the queue drains before this returns (unless
	/// a batch or a drain is already in progress); in
	/// [`ScheduleMode::Deferred`] a single flush is armed and handed to the
	/// schedule hook, if one is installed.
	pub fn enqueue(self: &Arc<Self>, id: NodeId, task: Box<dyn FnOnce() + Send>) {
		let action = self.scheduler.enqueue(id, task);
		match action {
			scheduler::EnqueueAction::None => {}
			scheduler::EnqueueAction::DrainNow => {
				if self.in_batch() {
					// Batch exit re-triggers the drain through its thunks.
					return;
				}
				self.drain();
			}
			scheduler::EnqueueAction::CallHook(hook) => {
				(*hook)(FlushTask {
					runtime: self.weak(),
				});
			}
		}
	}

	/// Synchronously drains the scheduler queue. Idempotent; re-entrant calls
	/// while a drain is in progress are no-ops.
	pub fn flush(self: &Arc<Self>) {
		self.drain();
	}

	/// Resolves after a flush, at least `after` on the runtime clock, and a
	/// final flush.
	pub fn settle(self: &Arc<Self>, after: Duration) -> impl Future<Output = ()> + Send + 'static {
		let runtime = Arc::clone(self);
		async move {
			runtime.flush();
			let (sender, receiver) = futures_channel::oneshot::channel::<()>();
			let _armed = runtime.clock().schedule(
				after,
				Box::new(move || {
					let _ = sender.send(());
				}),
			);
			let _ = receiver.await;
			runtime.flush();
		}
	}

	fn drain(self: &Arc<Self>) {
		let _critical = self.enter();
		if !self.scheduler.begin_drain() {
			return;
		}
		defer! {
			self.scheduler.end_drain();
		}
		let mut first_panic = None;
		let mut ran = 0_usize;
		while let Some((id, task)) = self.scheduler.next_task() {
			ran += 1;
			if let Err(payload) = catch_unwind(AssertUnwindSafe(task)) {
				warn!(id = id.get(), "consumer panicked while draining");
				if first_panic.is_none() {
					first_panic = Some(payload);
				}
			}
		}
		trace!(ran, "drained scheduler queue");
		if let Some(payload) = first_panic {
			resume_unwind(payload)
		}
	}

	pub fn use_sync(self: &Arc<Self>) {
		self.scheduler.set_mode(ScheduleMode::Sync);
		self.drain();
	}

	pub fn use_deferred(&self) {
		self.scheduler.set_mode(ScheduleMode::Deferred);
	}

	#[must_use]
	pub fn schedule_mode(&self) -> ScheduleMode {
		self.scheduler.mode()
	}

	/// Installs the host's flush hook for [`ScheduleMode::Deferred`].
	///
	/// The hook receives one [`FlushTask`] per armed flush; hosts that drive
	/// frame timing run it on their cadence, microtask hosts run it in a
	/// microtask. If a flush is already armed the hook fires immediately.
	pub fn set_scheduler(self: &Arc<Self>, hook: impl Fn(FlushTask) + Send + Sync + 'static) {
		if self.scheduler.set_hook(Arc::new(hook)) {
			self.scheduler.with_hook(|hook| {
				(**hook)(FlushTask {
					runtime: self.weak(),
				});
			});
		}
	}

	// --- host services ----------------------------------------------------

	#[must_use]
	pub fn clock(&self) -> Arc<dyn Clock> {
		Arc::clone(&self.clock.lock())
	}

	pub fn set_clock(&self, clock: Arc<dyn Clock>) {
		*self.clock.lock() = clock;
	}

	pub fn spawn(&self, task: TaskFuture) {
		let spawner = Arc::clone(&self.spawner.lock());
		spawner.spawn(task);
	}

	pub fn set_spawner(&self, spawner: Arc<dyn Spawner>) {
		*self.spawner.lock() = spawner;
	}
}

impl std::fmt::Debug for Runtime {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Runtime")
			.field("ids", &self.ids)
			.field("mode", &self.scheduler.mode())
			.finish_non_exhaustive()
	}
}
