use std::sync::Arc;

use beacon::{Creator, DerivedOptions, ReadableBeacon, Runtime};

use _validator::Validator;

#[test]
fn conditional_dependencies_follow_control_flow() {
	let runs = Arc::new(Validator::new());
	let creator = Creator::new(Runtime::new());
	creator.use_sync();

	let toggle = creator.writable(true);
	let left = creator.writable("left");
	let right = creator.writable("right");

	let picked = creator.derived({
		let (toggle, left, right) = (toggle.clone(), left.clone(), right.clone());
		let runs = Arc::clone(&runs);
		move || {
			runs.push(());
			if toggle.get() {
				left.get()
			} else {
				right.get()
			}
		}
	});

	// Keep the derivation awake so writes recompute it through the scheduler.
	let _sub = picked.subscribe(|_| {});
	assert_eq!(picked.get(), "left");
	runs.expect([()]);

	// The unselected branch is not a dependency.
	right.set("RIGHT");
	runs.expect([]);

	left.set("LEFT");
	runs.expect([()]);
	assert_eq!(picked.get(), "LEFT");

	toggle.set(false);
	runs.expect([()]);
	assert_eq!(picked.get(), "RIGHT");

	// After re-tracking, the previously selected branch was dropped.
	left.set("again");
	runs.expect([]);

	right.set("other");
	runs.expect([()]);
	assert_eq!(picked.get(), "other");
}

#[test]
fn frozen_dependencies_skip_retracking() {
	let runs = Arc::new(Validator::new());
	let creator = Creator::new(Runtime::new());
	creator.use_sync();

	let toggle = creator.writable(true);
	let left = creator.writable(1);
	let right = creator.writable(10);

	let picked = creator.derived_with(
		{
			let (toggle, left, right) = (toggle.clone(), left.clone(), right.clone());
			let runs = Arc::clone(&runs);
			move || {
				runs.push(());
				if toggle.get() {
					left.get()
				} else {
					right.get()
				}
			}
		},
		DerivedOptions {
			should_sleep: false,
			support_conditional: false,
		},
	);

	let _sub = picked.subscribe(|_| {});
	assert_eq!(picked.get(), 1);
	runs.expect([()]);

	toggle.set(false);
	runs.expect([()]);
	assert_eq!(picked.peek(), 10);

	// `right` was never in the first run's dependency set, so this write is
	// not discovered.
	right.set(20);
	runs.expect([]);
	assert_eq!(picked.peek(), 10);
}

#[test]
fn derived_chains_propagate_in_order() {
	let v = Arc::new(Validator::new());
	let creator = Creator::new(Runtime::new());
	creator.use_sync();

	let base = creator.writable(1);
	let doubled = creator.derived({
		let base = base.clone();
		move || base.get() * 2
	});
	let quadrupled = creator.derived({
		let doubled = doubled.clone();
		move || doubled.get() * 2
	});
	let _sub = quadrupled.subscribe({
		let v = Arc::clone(&v);
		move |value: &i32| v.push(*value)
	});
	assert_eq!(quadrupled.get(), 4);

	base.set(3);
	v.expect([12]);
	assert_eq!(doubled.peek(), 6);
}

#[test]
fn derived_equality_gate_stops_propagation() {
	let v = Arc::new(Validator::new());
	let creator = Creator::new(Runtime::new());
	creator.use_sync();

	let base = creator.writable(1);
	let parity = creator.derived({
		let base = base.clone();
		move || base.get() % 2
	});
	let _sub = parity.subscribe({
		let v = Arc::clone(&v);
		move |value: &i32| v.push(*value)
	});
	assert_eq!(parity.get(), 1);

	base.set(3);
	// Recomputed, but the result is unchanged, so no notification.
	v.expect([]);

	base.set(4);
	v.expect([0]);
}
