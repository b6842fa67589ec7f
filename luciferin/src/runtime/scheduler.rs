//! FIFO dedup queue of stale consumers and deferred subscriber deliveries.

use std::{
	collections::{BTreeSet, VecDeque},
	sync::{Arc, Weak},
};

use parking_lot::Mutex;
use tracing::trace;

use super::{NodeId, Runtime};

/// How the queue is driven.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScheduleMode {
	/// Drain immediately on enqueue. Deterministic, but unsafe with respect
	/// to feedback loops; meant for tests.
	Sync,
	/// Arm a single flush on the first enqueue after idle and hand it to the
	/// schedule hook (or wait for `flush`/`settle` if none is installed).
	#[default]
	Deferred,
}

pub(crate) type ScheduleHook = Arc<dyn Fn(FlushTask) + Send + Sync>;

/// One armed flush, handed to the host's schedule hook.
///
/// Dropping it without calling [`run`](`FlushTask::run`) leaves the queue
/// armed; a later `flush` still drains it.
pub struct FlushTask {
	pub(crate) runtime: Weak<Runtime>,
}

impl FlushTask {
	pub fn run(self) {
		if let Some(runtime) = self.runtime.upgrade() {
			runtime.flush();
		}
	}
}

pub(crate) enum EnqueueAction {
	None,
	DrainNow,
	CallHook(ScheduleHook),
}

#[derive(Default)]
struct State {
	queue: VecDeque<(NodeId, Box<dyn FnOnce() + Send>)>,
	queued: BTreeSet<NodeId>,
	draining: bool,
	armed: bool,
	mode: ScheduleMode,
	hook: Option<ScheduleHook>,
}

pub(crate) struct Scheduler {
	state: Mutex<State>,
}

impl Scheduler {
	pub(crate) fn new() -> Self {
		Self {
			state: Mutex::new(State::default()),
		}
	}

	/// Queues `task` under `id`. A consumer already queued is not queued
	/// again; a re-enqueue during a drain lands at the tail of the same
	/// drain.
	pub(crate) fn enqueue(
		&self,
		id: NodeId,
		task: Box<dyn FnOnce() + Send>,
	) -> EnqueueAction {
		let mut state = self.state.lock();
		if !state.queued.insert(id) {
			trace!(id = id.get(), "enqueue deduplicated");
			return EnqueueAction::None;
		}
		state.queue.push_back((id, task));
		match state.mode {
			ScheduleMode::Sync => {
				if state.draining {
					EnqueueAction::None
				} else {
					EnqueueAction::DrainNow
				}
			}
			ScheduleMode::Deferred => {
				if state.armed || state.draining {
					EnqueueAction::None
				} else {
					state.armed = true;
					match &state.hook {
						Some(hook) => EnqueueAction::CallHook(Arc::clone(hook)),
						None => EnqueueAction::None,
					}
				}
			}
		}
	}

	/// **Returns** `false` when a drain is already in progress.
	pub(crate) fn begin_drain(&self) -> bool {
		let mut state = self.state.lock();
		if state.draining {
			return false;
		}
		state.draining = true;
		state.armed = false;
		true
	}

	/// Pops the next task, clearing its dedup entry first so that the task
	/// may re-enqueue its id.
	pub(crate) fn next_task(&self) -> Option<(NodeId, Box<dyn FnOnce() + Send>)> {
		let mut state = self.state.lock();
		let (id, task) = state.queue.pop_front()?;
		state.queued.remove(&id);
		Some((id, task))
	}

	pub(crate) fn end_drain(&self) {
		self.state.lock().draining = false;
	}

	pub(crate) fn set_mode(&self, mode: ScheduleMode) {
		self.state.lock().mode = mode;
	}

	pub(crate) fn mode(&self) -> ScheduleMode {
		self.state.lock().mode
	}

	/// Installs `hook`. **Returns** whether a flush was already armed (the
	/// caller then fires the hook once itself).
	pub(crate) fn set_hook(&self, hook: ScheduleHook) -> bool {
		let mut state = self.state.lock();
		state.hook = Some(hook);
		state.armed
	}

	pub(crate) fn with_hook(&self, f: impl FnOnce(&ScheduleHook)) {
		let hook = self.state.lock().hook.clone();
		if let Some(hook) = hook {
			f(&hook);
		}
	}
}
