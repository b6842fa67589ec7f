use std::{sync::Arc, time::Duration};

use beacon::{Creator, ManualClock, ReadableBeacon, Runtime};

use _validator::Validator;

const MS: Duration = Duration::from_millis(1);

#[test]
fn drop_blocked_discards_writes_in_the_window() {
	let clock = ManualClock::new();
	let creator = Creator::new(Runtime::new());
	creator.use_sync();
	creator.set_clock(clock.clone());

	let t = creator.throttled(0, 10 * MS, true);
	t.set(1);
	t.set(2);
	t.set(3);
	assert_eq!(t.peek(), 1);
	assert_eq!(t.blocked_count(), 0);

	clock.advance(11 * MS);
	t.set(4);
	assert_eq!(t.peek(), 4);
}

#[test]
fn queued_writes_release_one_per_window() {
	let v = Arc::new(Validator::new());
	let clock = ManualClock::new();
	let creator = Creator::new(Runtime::new());
	creator.use_sync();
	creator.set_clock(clock.clone());

	let t = creator.throttled(0, 10 * MS, false);
	let _sub = t.subscribe({
		let v = Arc::clone(&v);
		move |value: &i32| v.push(*value)
	});

	t.set(1);
	t.set(2);
	t.set(3);
	v.expect([1]);
	assert_eq!(t.blocked_count(), 2);

	clock.advance(10 * MS);
	v.expect([2]);

	clock.advance(10 * MS);
	v.expect([3]);
	assert_eq!(t.blocked_count(), 0);

	// One more window and the gate reopens.
	clock.advance(10 * MS);
	t.set(4);
	v.expect([4]);
}
