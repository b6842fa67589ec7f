use std::sync::Arc;

use beacon::{Creator, DerivedOptions, ReadableBeacon, Runtime};

use _validator::Validator;

#[test]
fn unwatched_derivation_sleeps() {
	let runs = Arc::new(Validator::new());
	let creator = Creator::new(Runtime::new());
	creator.use_sync();

	let w = creator.writable(1);
	let d = creator.derived({
		let w = w.clone();
		let runs = Arc::clone(&runs);
		move || {
			runs.push(());
			w.get() * 2
		}
	});

	// Lazy: nothing runs before first contact.
	runs.expect([]);

	assert_eq!(d.get(), 2);
	runs.expect([()]);
	assert!(!d.is_sleeping());

	// No listeners: the first dependency write puts the cell to sleep
	// instead of recomputing it.
	w.set(2);
	assert!(d.is_sleeping());
	w.set(3);
	runs.expect([]);

	// The next read recomputes exactly once, with the latest value.
	assert_eq!(d.get(), 6);
	runs.expect([()]);
}

#[test]
fn sleepless_derivation_stays_live() {
	let runs = Arc::new(Validator::new());
	let creator = Creator::new(Runtime::new());
	creator.use_sync();

	let w = creator.writable(1);
	let d = creator.derived_with(
		{
			let w = w.clone();
			let runs = Arc::clone(&runs);
			move || {
				runs.push(());
				w.get() * 2
			}
		},
		DerivedOptions {
			should_sleep: false,
			support_conditional: true,
		},
	);

	assert_eq!(d.get(), 2);
	runs.expect([()]);

	w.set(2);
	runs.expect([()]);
	assert_eq!(d.peek(), 4);
}

#[test]
fn subscription_wakes_a_sleeping_derivation() {
	let runs = Arc::new(Validator::new());
	let v = Arc::new(Validator::new());
	let creator = Creator::new(Runtime::new());
	creator.use_sync();

	let w = creator.writable(1);
	let d = creator.derived({
		let w = w.clone();
		let runs = Arc::clone(&runs);
		move || {
			runs.push(());
			w.get() * 2
		}
	});

	assert_eq!(d.get(), 2);
	w.set(5);
	assert!(d.is_sleeping());
	runs.expect([()]);

	let _sub = d.subscribe({
		let v = Arc::clone(&v);
		move |value: &i32| v.push(*value)
	});
	// Waking recomputed with the latest dependency value.
	runs.expect([()]);
	assert!(!d.is_sleeping());
	assert_eq!(d.peek(), 10);

	w.set(6);
	runs.expect([()]);
	v.expect([12]);
}
