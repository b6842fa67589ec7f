use std::{
	sync::{mpsc, Arc, Mutex},
	time::Duration,
};

use luciferin::{Clock, ManualClock, Runtime, ThreadClock};

const MS: Duration = Duration::from_millis(1);

#[test]
fn manual_clock_fires_in_deadline_order() {
	let clock = ManualClock::new();
	let seen = Arc::new(Mutex::new(Vec::new()));

	let _late = clock.schedule(5 * MS, {
		let seen = Arc::clone(&seen);
		Box::new(move || seen.lock().unwrap().push("late"))
	});
	let _early = clock.schedule(2 * MS, {
		let seen = Arc::clone(&seen);
		Box::new(move || seen.lock().unwrap().push("early"))
	});

	clock.advance(MS);
	assert!(seen.lock().unwrap().is_empty());

	clock.advance(9 * MS);
	assert_eq!(*seen.lock().unwrap(), ["early", "late"]);
	assert_eq!(clock.now(), 10 * MS);
	assert_eq!(clock.pending_timers(), 0);
}

#[test]
fn cancelled_timers_do_not_fire() {
	let clock = ManualClock::new();
	let seen = Arc::new(Mutex::new(Vec::<&'static str>::new()));

	let handle = clock.schedule(2 * MS, {
		let seen = Arc::clone(&seen);
		Box::new(move || seen.lock().unwrap().push("fired"))
	});
	handle.cancel();
	handle.cancel();
	assert!(handle.is_cancelled());

	clock.advance(5 * MS);
	assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn callbacks_may_chain_timers_within_one_advance() {
	let clock = ManualClock::new();
	let seen = Arc::new(Mutex::new(Vec::new()));

	let _first = clock.schedule(2 * MS, {
		let clock = Arc::clone(&clock);
		let seen = Arc::clone(&seen);
		Box::new(move || {
			seen.lock().unwrap().push("first");
			let seen = Arc::clone(&seen);
			clock.schedule(
				MS,
				Box::new(move || seen.lock().unwrap().push("chained")),
			);
		})
	});

	clock.advance(10 * MS);
	assert_eq!(*seen.lock().unwrap(), ["first", "chained"]);
}

#[test]
fn thread_clock_fires_and_cancels() {
	let clock = ThreadClock::new();
	let (tx, rx) = mpsc::channel::<&'static str>();

	let _armed = clock.schedule(5 * MS, {
		let tx = tx.clone();
		Box::new(move || {
			let _ = tx.send("fired");
		})
	});
	assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), "fired");

	let cancelled = clock.schedule(5 * MS, Box::new(move || {
		let _ = tx.send("never");
	}));
	cancelled.cancel();
	assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
}

#[test]
fn settle_resolves_after_flush_and_delay() {
	let runtime = Runtime::new();
	let seen = Arc::new(Mutex::new(Vec::<&'static str>::new()));

	runtime.enqueue(runtime.next_id(), {
		let seen = Arc::clone(&seen);
		Box::new(move || seen.lock().unwrap().push("queued"))
	});

	futures_lite::future::block_on(runtime.settle(5 * MS));
	assert_eq!(*seen.lock().unwrap(), ["queued"]);
}
