use std::sync::Arc;

use beacon::{Creator, ReadableBeacon, Runtime};

use _validator::Validator;

#[test]
fn batched_writes_coalesce_sync() {
	let v = Arc::new(Validator::new());
	let creator = Creator::new(Runtime::new());
	creator.use_sync();

	let c = creator.writable(0);
	let _sub = c.subscribe({
		let v = Arc::clone(&v);
		move |value: &i32| v.push(*value)
	});

	creator.batch(|| {
		c.set(1);
		c.set(2);
		c.set(3);
	});

	v.expect([3]);
	assert_eq!(c.peek(), 3);
	// Writes apply immediately inside the batch; only notifications coalesce.
	assert_eq!(c.previous_value(), Some(2));
}

#[test]
fn batched_writes_coalesce_deferred() {
	let v = Arc::new(Validator::new());
	let creator = Creator::new(Runtime::new());

	let c = creator.writable(0);
	let _sub = c.subscribe({
		let v = Arc::clone(&v);
		move |value: &i32| v.push(*value)
	});

	creator.batch(|| {
		c.set(1);
		c.set(2);
		c.set(3);
	});
	// Nothing is delivered until the armed flush is driven.
	v.expect([]);

	creator.flush();
	v.expect([3]);
	assert_eq!(c.previous_value(), Some(2));
}

#[test]
fn deferred_mode_deduplicates_rapid_writes() {
	let v = Arc::new(Validator::new());
	let creator = Creator::new(Runtime::new());

	let w = creator.writable(0);
	let _sub = w.subscribe({
		let v = Arc::clone(&v);
		move |value: &i32| v.push(*value)
	});

	w.set(1);
	w.set(2);
	w.set(3);
	v.expect([]);

	creator.flush();
	// One delivery, carrying the value as of the drain.
	v.expect([3]);

	creator.flush();
	v.expect([]);
}

#[test]
fn nested_batches_flush_once_at_outermost_exit() {
	let v = Arc::new(Validator::new());
	let creator = Creator::new(Runtime::new());
	creator.use_sync();

	let a = creator.writable(0);
	let b = creator.writable(0);
	let _sub_a = a.subscribe({
		let v = Arc::clone(&v);
		move |value: &i32| v.push(*value)
	});
	let _sub_b = b.subscribe({
		let v = Arc::clone(&v);
		move |value: &i32| v.push(*value * 100)
	});

	creator.batch(|| {
		a.set(1);
		creator.batch(|| {
			b.set(2);
			a.set(3);
		});
		v.expect([]);
	});

	v.expect([3, 200]);
}

#[test]
fn consumer_sees_consistent_state_in_batch() {
	let v = Arc::new(Validator::new());
	let creator = Creator::new(Runtime::new());
	creator.use_sync();

	let a = creator.writable(1);
	let sum = creator.derived({
		let (a2, b2) = (a.clone(), a.clone());
		move || a2.get() + b2.get()
	});
	let _sub = sum.subscribe({
		let v = Arc::clone(&v);
		move |value: &i32| v.push(*value)
	});
	assert_eq!(sum.get(), 2);

	creator.batch(|| {
		a.set(10);
	});
	// The derivation recomputed once and never saw a half-applied state.
	v.expect([20]);
}
