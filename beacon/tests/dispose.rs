use std::sync::Arc;

use beacon::{Creator, ReadableBeacon, Runtime};

use _validator::Validator;

#[test]
fn dispose_is_idempotent_and_silences_the_cell() {
	let v = Arc::new(Validator::new());
	let creator = Creator::new(Runtime::new());
	creator.use_sync();

	let w = creator.writable(1);
	let _sub = w.subscribe({
		let v = Arc::clone(&v);
		move |value: &i32| v.push(*value)
	});
	w.set(2);
	v.expect([2]);
	assert_eq!(w.listeners_count(), 1);

	w.dispose();
	w.dispose();
	assert!(w.is_disposed());
	assert_eq!(w.listeners_count(), 0);

	w.set(3);
	v.expect([]);
	// The value slot was reset to the initial value.
	assert_eq!(w.peek(), 1);
	assert_eq!(w.previous_value(), None);
}

#[test]
fn dispose_hooks_run_once_and_immediately_after() {
	let v = Arc::new(Validator::new());
	let creator = Creator::new(Runtime::new());
	creator.use_sync();

	let w = creator.writable(0);
	w.on_dispose({
		let v = Arc::clone(&v);
		move || v.push("hook")
	});
	w.dispose();
	v.expect(["hook"]);
	w.dispose();
	v.expect([]);

	// Hooks registered after disposal run right away.
	w.on_dispose({
		let v = Arc::clone(&v);
		move || v.push("late")
	});
	v.expect(["late"]);
}

#[test]
fn subscription_disposer_is_idempotent() {
	let v = Arc::new(Validator::new());
	let creator = Creator::new(Runtime::new());
	creator.use_sync();

	let w = creator.writable(0);
	let sub = w.subscribe({
		let v = Arc::clone(&v);
		move |value: &i32| v.push(*value)
	});
	w.set(1);
	v.expect([1]);

	sub.dispose();
	sub.dispose();
	assert!(sub.is_disposed());
	assert_eq!(w.listeners_count(), 0);

	w.set(2);
	v.expect([]);
}

#[test]
fn disposing_a_dependency_detaches_consumers_safely() {
	let v = Arc::new(Validator::new());
	let creator = Creator::new(Runtime::new());
	creator.use_sync();

	let w = creator.writable(1);
	let d = creator.derived({
		let w = w.clone();
		move || w.get() * 2
	});
	let _sub = d.subscribe({
		let v = Arc::clone(&v);
		move |value: &i32| v.push(*value)
	});
	assert_eq!(d.get(), 2);

	w.dispose();
	// Writes to the disposed producer no longer reach the derivation.
	w.set(5);
	v.expect([]);
	assert_eq!(d.peek(), 2);
}
