use std::{sync::Arc, time::Duration};

use beacon::{Creator, ManualClock, ReadableBeacon, Runtime};

use _validator::Validator;

const MS: Duration = Duration::from_millis(1);

#[test]
fn count_buffer_flushes_at_capacity() {
	let creator = Creator::new(Runtime::new());
	creator.use_sync();

	let b = creator.buffered_count::<i32>(3);
	assert_eq!(b.get(), Vec::<i32>::new());

	b.add(1);
	b.add(2);
	assert_eq!(b.get(), Vec::<i32>::new());
	assert_eq!(b.pending(), vec![1, 2]);

	b.add(3);
	assert_eq!(b.get(), vec![1, 2, 3]);
	assert_eq!(b.pending(), Vec::<i32>::new());

	b.add(4);
	assert_eq!(b.get(), vec![1, 2, 3]);

	b.add(5);
	b.add(6);
	assert_eq!(b.get(), vec![4, 5, 6]);
}

#[test]
fn seeded_count_buffer_counts_the_seed() {
	let creator = Creator::new(Runtime::new());
	creator.use_sync();

	let b = creator.buffered_count_seeded(3, 0);
	b.add(1);
	b.add(2);
	assert_eq!(b.get(), vec![0, 1, 2]);
}

#[test]
fn count_buffer_reset_drops_pending() {
	let creator = Creator::new(Runtime::new());
	creator.use_sync();

	let b = creator.buffered_count::<i32>(2);
	b.add(1);
	b.add(2);
	b.add(3);
	assert_eq!(b.get(), vec![1, 2]);

	b.reset();
	assert_eq!(b.get(), Vec::<i32>::new());
	assert_eq!(b.pending(), Vec::<i32>::new());

	b.add(7);
	b.add(8);
	assert_eq!(b.get(), vec![7, 8]);
}

#[test]
fn buffer_extension_feeds_from_a_source_cell() {
	let creator = Creator::new(Runtime::new());
	creator.use_sync();

	let source = creator.writable(0);
	let batches = source.buffer(2);
	source.set(1);
	source.set(2);
	assert_eq!(batches.get(), vec![1, 2]);

	source.set(3);
	assert_eq!(batches.get(), vec![1, 2]);

	// Disposing the buffer releases its feed subscription.
	batches.dispose();
	source.set(4);
	assert_eq!(source.listeners_count(), 0);
}

#[test]
fn time_buffer_flushes_one_window_after_first_write() {
	let v = Arc::new(Validator::new());
	let clock = ManualClock::new();
	let creator = Creator::new(Runtime::new());
	creator.use_sync();
	creator.set_clock(clock.clone());

	let b = creator.buffered_time::<i32>(5 * MS);
	let _sub = b.subscribe({
		let v = Arc::clone(&v);
		move |value: &Vec<i32>| v.push(value.clone())
	});

	b.add(1);
	clock.advance(2 * MS);
	b.add(2);
	assert_eq!(b.get(), Vec::<i32>::new());

	clock.advance(3 * MS);
	v.expect([vec![1, 2]]);
	assert_eq!(b.get(), vec![1, 2]);

	b.add(3);
	clock.advance(5 * MS);
	v.expect([vec![3]]);
}
