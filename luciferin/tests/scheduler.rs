use std::sync::{
	atomic::{AtomicBool, Ordering},
	Arc, Mutex, Weak,
};

use luciferin::{
	runtime::{Dependency, DependencyRecord, NodeId},
	Runtime, ScheduleMode,
};

fn log() -> Arc<Mutex<Vec<&'static str>>> {
	Arc::new(Mutex::new(Vec::new()))
}

#[test]
fn sync_mode_drains_on_enqueue() {
	let runtime = Runtime::new();
	runtime.use_sync();
	let seen = log();

	runtime.enqueue(runtime.next_id(), {
		let seen = Arc::clone(&seen);
		Box::new(move || seen.lock().unwrap().push("ran"))
	});
	assert_eq!(*seen.lock().unwrap(), ["ran"]);
}

#[test]
fn deferred_mode_waits_for_flush() {
	let runtime = Runtime::new();
	assert_eq!(runtime.schedule_mode(), ScheduleMode::Deferred);
	let seen = log();

	runtime.enqueue(runtime.next_id(), {
		let seen = Arc::clone(&seen);
		Box::new(move || seen.lock().unwrap().push("ran"))
	});
	assert!(seen.lock().unwrap().is_empty());

	runtime.flush();
	assert_eq!(*seen.lock().unwrap(), ["ran"]);

	runtime.flush();
	assert_eq!(*seen.lock().unwrap(), ["ran"]);
}

#[test]
fn enqueue_deduplicates_by_id() {
	let runtime = Runtime::new();
	let seen = log();
	let id = runtime.next_id();

	runtime.enqueue(id, {
		let seen = Arc::clone(&seen);
		Box::new(move || seen.lock().unwrap().push("first"))
	});
	runtime.enqueue(id, {
		let seen = Arc::clone(&seen);
		Box::new(move || seen.lock().unwrap().push("second"))
	});
	runtime.flush();
	assert_eq!(*seen.lock().unwrap(), ["first"]);
}

#[test]
fn reenqueue_during_drain_runs_in_the_same_pass() {
	let runtime = Runtime::new();
	let seen = log();
	let id = runtime.next_id();
	let once = Arc::new(AtomicBool::new(false));

	runtime.enqueue(id, {
		let runtime = Arc::clone(&runtime);
		let seen = Arc::clone(&seen);
		let once = Arc::clone(&once);
		Box::new(move || {
			seen.lock().unwrap().push("first");
			if !once.swap(true, Ordering::SeqCst) {
				// The id was already removed from the dedup set, so this
				// lands at the tail of the running drain.
				runtime.enqueue(id, {
					let seen = Arc::clone(&seen);
					Box::new(move || seen.lock().unwrap().push("tail"))
				});
			}
		})
	});
	runtime.flush();
	assert_eq!(*seen.lock().unwrap(), ["first", "tail"]);
}

#[test]
fn schedule_hook_receives_the_armed_flush() {
	let runtime = Runtime::new();
	let seen = log();

	runtime.set_scheduler({
		let seen = Arc::clone(&seen);
		move |task| {
			seen.lock().unwrap().push("hook");
			task.run();
		}
	});

	runtime.enqueue(runtime.next_id(), {
		let seen = Arc::clone(&seen);
		Box::new(move || seen.lock().unwrap().push("ran"))
	});
	assert_eq!(*seen.lock().unwrap(), ["hook", "ran"]);

	// One armed flush per idle period, re-armed after the drain.
	runtime.enqueue(runtime.next_id(), {
		let seen = Arc::clone(&seen);
		Box::new(move || seen.lock().unwrap().push("again"))
	});
	assert_eq!(*seen.lock().unwrap(), ["hook", "ran", "hook", "again"]);
}

struct Probe(NodeId);

impl Dependency for Probe {
	fn id(&self) -> NodeId {
		self.0
	}

	fn attach(&self, _observer_id: NodeId, _observer: Weak<dyn luciferin::Observer>) {}

	fn detach(&self, _observer_id: NodeId) {}
}

#[test]
fn recording_collects_deduplicated_reads() {
	let runtime = Runtime::new();
	let probe = Arc::new(Probe(runtime.next_id()));
	let observer_id = runtime.next_id();

	let (result, reads) = runtime.record(observer_id, || {
		let probe_arc: Arc<dyn Dependency> = probe.clone();
		let dependency: Weak<dyn Dependency> = Arc::downgrade(&probe_arc);
		runtime.record_read(DependencyRecord {
			id: probe.0,
			dependency: dependency.clone(),
		});
		runtime.record_read(DependencyRecord {
			id: probe.0,
			dependency,
		});
		runtime.current_observer_id()
	});
	assert_eq!(result.unwrap(), Some(observer_id));
	assert_eq!(reads.len(), 1);
	assert_eq!(reads[0].id, probe.0);
	assert_eq!(runtime.current_observer_id(), None);
}

#[test]
fn untracked_scopes_hide_the_outer_consumer() {
	let runtime = Runtime::new();
	let probe = Arc::new(Probe(runtime.next_id()));
	let observer_id = runtime.next_id();

	let (result, reads) = runtime.record(observer_id, || {
		runtime.untracked(|| {
			let probe_arc: Arc<dyn Dependency> = probe.clone();
			let dependency: Weak<dyn Dependency> = Arc::downgrade(&probe_arc);
			runtime.record_read(DependencyRecord {
				id: probe.0,
				dependency,
			});
			runtime.current_observer_id()
		})
	});
	assert_eq!(result.unwrap(), None);
	assert!(reads.is_empty());
}

#[test]
fn batch_defers_and_deduplicates_notifications() {
	let runtime = Runtime::new();
	let seen = log();
	let id = runtime.next_id();

	runtime.batch(|| {
		assert!(runtime.in_batch());
		assert!(runtime.defer_notify(id, {
			let seen = Arc::clone(&seen);
			Box::new(move || seen.lock().unwrap().push("notify"))
		}));
		assert!(runtime.defer_notify(id, {
			let seen = Arc::clone(&seen);
			Box::new(move || seen.lock().unwrap().push("duplicate"))
		}));
		assert!(seen.lock().unwrap().is_empty());
	});
	assert_eq!(*seen.lock().unwrap(), ["notify"]);

	// Outside a batch the caller notifies directly.
	assert!(!runtime.defer_notify(id, Box::new(|| {})));
}
