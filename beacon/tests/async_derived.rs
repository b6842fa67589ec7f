use std::{
	collections::VecDeque,
	sync::{mpsc, Arc, Mutex},
	time::Duration,
};

use beacon::{
	AsyncOptions, AsyncStatus, AsyncValue, Creator, ReadableBeacon, Runtime, SubscribeOptions,
};
use futures_channel::oneshot;

const WAIT: Duration = Duration::from_secs(5);
const QUIET: Duration = Duration::from_millis(200);

fn describe(value: &AsyncValue<i32>) -> String {
	match value {
		AsyncValue::Idle => "idle".to_owned(),
		AsyncValue::Loading { previous } => format!("loading:{previous:?}"),
		AsyncValue::Data { value } => format!("data:{value}"),
		AsyncValue::Error { previous, .. } => format!("error:{previous:?}"),
	}
}

type Gates = Arc<Mutex<VecDeque<oneshot::Receiver<()>>>>;

fn gated_creator() -> (Creator, Gates) {
	let creator = Creator::new(Runtime::new());
	creator.use_sync();
	(creator, Arc::new(Mutex::new(VecDeque::new())))
}

#[test]
fn lifecycle_idle_loading_data_with_previous() {
	let (creator, gates) = gated_creator();
	let (gate1_tx, gate1_rx) = oneshot::channel::<()>();
	let (gate2_tx, gate2_rx) = oneshot::channel::<()>();
	gates.lock().unwrap().extend([gate1_rx, gate2_rx]);

	let p = creator.writable(1);
	let d = creator.async_derived({
		let p = p.clone();
		let gates = Arc::clone(&gates);
		move || {
			let value = p.get();
			let gate = gates.lock().unwrap().pop_front();
			async move {
				if let Some(gate) = gate {
					let _ = gate.await;
				}
				Ok::<i32, beacon::BoxedError>(value * 10)
			}
		}
	});

	let (tx, rx) = mpsc::channel::<String>();
	let _sub = d.subscribe_with(
		move |value: &AsyncValue<i32>| {
			let _ = tx.send(describe(value));
		},
		SubscribeOptions::default().start_now().synchronous(),
	);

	// Subscribing started the first run.
	assert_eq!(rx.recv_timeout(WAIT).unwrap(), "loading:None");

	gate1_tx.send(()).unwrap();
	assert_eq!(rx.recv_timeout(WAIT).unwrap(), "data:10");

	// A dependency write re-runs the compute, preserving the last data.
	p.set(2);
	assert_eq!(rx.recv_timeout(WAIT).unwrap(), "loading:Some(10)");

	gate2_tx.send(()).unwrap();
	assert_eq!(rx.recv_timeout(WAIT).unwrap(), "data:20");
}

#[test]
fn superseded_outcome_is_discarded() {
	let (creator, gates) = gated_creator();
	let (gate1_tx, gate1_rx) = oneshot::channel::<()>();
	let (gate2_tx, gate2_rx) = oneshot::channel::<()>();
	gates.lock().unwrap().extend([gate1_rx, gate2_rx]);

	let p = creator.writable(1);
	let d = creator.async_derived_with(
		{
			let p = p.clone();
			let gates = Arc::clone(&gates);
			move || {
				let value = p.get();
				let gate = gates.lock().unwrap().pop_front();
				async move {
					if let Some(gate) = gate {
						let _ = gate.await;
					}
					Ok::<i32, beacon::BoxedError>(value * 10)
				}
			}
		},
		AsyncOptions {
			manual_start: false,
			cancel_running: false,
		},
	);

	let (tx, rx) = mpsc::channel::<String>();
	let _sub = d.subscribe_with(
		move |value: &AsyncValue<i32>| {
			let _ = tx.send(describe(value));
		},
		SubscribeOptions::default().start_now().synchronous(),
	);
	assert_eq!(rx.recv_timeout(WAIT).unwrap(), "loading:None");

	// Supersede the first run before it resolves.
	p.set(2);
	assert_eq!(rx.recv_timeout(WAIT).unwrap(), "loading:None");

	// The second run resolves first and wins.
	gate2_tx.send(()).unwrap();
	assert_eq!(rx.recv_timeout(WAIT).unwrap(), "data:20");

	// The first run's late outcome carries a stale token and is dropped.
	gate1_tx.send(()).unwrap();
	assert!(rx.recv_timeout(QUIET).is_err());
	assert_eq!(d.peek().data().copied(), Some(20));
}

#[test]
fn manual_start_stays_idle_until_started() {
	let creator = Creator::new(Runtime::new());
	creator.use_sync();

	let d = creator.async_derived_with(
		|| async { Ok::<i32, beacon::BoxedError>(5) },
		AsyncOptions {
			manual_start: true,
			cancel_running: true,
		},
	);
	assert_eq!(d.status(), AsyncStatus::Idle);

	let (tx, rx) = mpsc::channel::<String>();
	let _sub = d.subscribe_with(
		move |value: &AsyncValue<i32>| {
			let _ = tx.send(describe(value));
		},
		SubscribeOptions::default().start_now().synchronous(),
	);
	assert_eq!(rx.recv_timeout(WAIT).unwrap(), "idle");

	d.start();
	assert_eq!(rx.recv_timeout(WAIT).unwrap(), "loading:None");
	assert_eq!(rx.recv_timeout(WAIT).unwrap(), "data:5");

	// A second `start` is a no-op on a running cell.
	d.start();
	assert!(rx.recv_timeout(QUIET).is_err());
}

#[test]
fn compute_errors_become_error_values() {
	let creator = Creator::new(Runtime::new());
	creator.use_sync();

	let d = creator.future(|| async { Err::<i32, beacon::BoxedError>("boom".into()) });

	let (tx, rx) = mpsc::channel::<String>();
	let _sub = d.subscribe_with(
		move |value: &AsyncValue<i32>| {
			let _ = tx.send(describe(value));
		},
		SubscribeOptions::default().start_now().synchronous(),
	);
	assert_eq!(rx.recv_timeout(WAIT).unwrap(), "loading:None");
	assert_eq!(rx.recv_timeout(WAIT).unwrap(), "error:None");

	let value = d.peek();
	assert_eq!(value.status(), AsyncStatus::Error);
	assert_eq!(value.error().unwrap().to_string(), "boom");
	assert!(value.last_data().is_none());
}

#[test]
fn future_cell_resolves_without_tracking() {
	let creator = Creator::new(Runtime::new());
	creator.use_sync();

	let p = creator.writable(1);
	let d = creator.future({
		let p = p.clone();
		move || {
			let value = p.peek();
			async move { Ok::<i32, beacon::BoxedError>(value + 100) }
		}
	});

	let (tx, rx) = mpsc::channel::<String>();
	let _sub = d.subscribe_with(
		move |value: &AsyncValue<i32>| {
			let _ = tx.send(describe(value));
		},
		SubscribeOptions::default().start_now().synchronous(),
	);
	assert_eq!(rx.recv_timeout(WAIT).unwrap(), "loading:None");
	assert_eq!(rx.recv_timeout(WAIT).unwrap(), "data:101");

	// No dependency tracking: writes to `p` do not re-run the compute.
	p.set(2);
	assert!(rx.recv_timeout(QUIET).is_err());
}

#[test]
fn reset_returns_to_idle_and_invalidates_inflight_work() {
	let (creator, gates) = gated_creator();
	let (gate_tx, gate_rx) = oneshot::channel::<()>();
	gates.lock().unwrap().push_back(gate_rx);

	let d = creator.async_derived({
		let gates = Arc::clone(&gates);
		move || {
			let gate = gates.lock().unwrap().pop_front();
			async move {
				if let Some(gate) = gate {
					let _ = gate.await;
				}
				Ok::<i32, beacon::BoxedError>(1)
			}
		}
	});

	let (tx, rx) = mpsc::channel::<String>();
	let _sub = d.subscribe_with(
		move |value: &AsyncValue<i32>| {
			let _ = tx.send(describe(value));
		},
		SubscribeOptions::default().start_now().synchronous(),
	);
	assert_eq!(rx.recv_timeout(WAIT).unwrap(), "loading:None");

	d.reset();
	assert_eq!(rx.recv_timeout(WAIT).unwrap(), "idle");

	// The cancelled run cannot commit even if its gate eventually opens.
	let _ = gate_tx.send(());
	assert!(rx.recv_timeout(QUIET).is_err());
	assert_eq!(d.status(), AsyncStatus::Loading);
}
