use std::{sync::Arc, time::Duration};

use beacon::{BeaconError, Creator, ManualClock, ReadableBeacon, Runtime, WrapOptions};

use _validator::Validator;

#[test]
fn wrap_feeds_target_emissions_through_the_receiver() {
	let creator = Creator::new(Runtime::new());
	creator.use_sync();

	let target = creator.writable(1);
	let receiver = creator.writable(0);
	let _wrap = receiver.wrap(&target, WrapOptions::default()).unwrap();

	// start_now fed the current value.
	assert_eq!(receiver.peek(), 1);

	target.set(5);
	assert_eq!(receiver.peek(), 5);
}

#[test]
fn wrapping_the_same_target_twice_is_a_no_op() {
	let creator = Creator::new(Runtime::new());
	creator.use_sync();

	let target = creator.writable(1);
	let receiver = creator.writable(0);
	let _first = receiver.wrap(&target, WrapOptions::default()).unwrap();
	let second = receiver.wrap(&target, WrapOptions::default()).unwrap();
	assert!(second.is_disposed());
	assert_eq!(target.listeners_count(), 1);
}

#[test]
fn wrap_on_an_empty_target_fails_with_start_now() {
	let creator = Creator::new(Runtime::new());
	creator.use_sync();

	let target = creator.lazy_writable::<i32>();
	let receiver = creator.writable(0);
	assert!(matches!(
		receiver.wrap(&target, WrapOptions::default()),
		Err(BeaconError::WrapEmptyTarget { .. })
	));

	// Without start_now the wrap is accepted and picks up later writes.
	let _wrap = receiver
		.wrap(
			&target,
			WrapOptions {
				start_now: false,
				dispose_together: false,
			},
		)
		.unwrap();
	target.set(4);
	assert_eq!(receiver.peek(), 4);
}

#[test]
fn wrap_with_transforms_emissions() {
	let v = Arc::new(Validator::new());
	let creator = Creator::new(Runtime::new());
	creator.use_sync();

	let words = creator.writable("beacon");
	let lengths = creator.writable(0_usize);
	let _wrap = lengths
		.wrap_with(
			&words,
			|receiver, word: &&str| receiver.set(word.len()),
			WrapOptions::default(),
		)
		.unwrap();
	assert_eq!(lengths.peek(), 6);

	let _sub = lengths.subscribe({
		let v = Arc::clone(&v);
		move |length: &usize| v.push(*length)
	});
	words.set("ok");
	v.expect([2]);
}

#[test]
fn erased_wrap_checks_value_types() {
	let creator = Creator::new(Runtime::new());
	creator.use_sync();

	let strings = creator.writable("text".to_owned());
	let numbers = creator.writable(0_i32);
	assert!(matches!(
		numbers.wrap_erased(&strings, WrapOptions::default()),
		Err(BeaconError::WrapTargetWrongType { .. })
	));

	let other = creator.writable(7_i32);
	let _wrap = numbers
		.wrap_erased(&other, WrapOptions::default())
		.unwrap();
	assert_eq!(numbers.peek(), 7);
	other.set(9);
	assert_eq!(numbers.peek(), 9);
}

#[test]
fn dispose_together_tears_down_both_sides_once() {
	let creator = Creator::new(Runtime::new());
	creator.use_sync();

	let target = creator.writable(1);
	let receiver = creator.writable(0);
	let _wrap = receiver
		.wrap(
			&target,
			WrapOptions {
				start_now: true,
				dispose_together: true,
			},
		)
		.unwrap();

	receiver.dispose();
	assert!(target.is_disposed());
	assert!(receiver.is_disposed());
}

#[test]
fn time_operator_receivers_compose_with_wrap() {
	let clock = ManualClock::new();
	let creator = Creator::new(Runtime::new());
	creator.use_sync();
	creator.set_clock(clock.clone());

	let source = creator.writable(0);
	let debounced = creator.debounced(0, Duration::from_millis(10));
	let _wrap = debounced
		.wrap(
			&source,
			WrapOptions {
				start_now: false,
				dispose_together: false,
			},
		)
		.unwrap();

	source.set(1);
	source.set(2);
	assert_eq!(debounced.peek(), 0);

	clock.advance(Duration::from_millis(10));
	assert_eq!(debounced.peek(), 2);
}

#[test]
fn disposing_the_wrap_detaches_and_allows_rewrapping() {
	let creator = Creator::new(Runtime::new());
	creator.use_sync();

	let target = creator.writable(1);
	let receiver = creator.writable(0);
	let wrap = receiver.wrap(&target, WrapOptions::default()).unwrap();

	wrap.dispose();
	target.set(5);
	assert_eq!(receiver.peek(), 1);
	assert_eq!(target.listeners_count(), 0);

	let rewrap = receiver.wrap(&target, WrapOptions::default()).unwrap();
	assert!(!rewrap.is_disposed());
	assert_eq!(receiver.peek(), 5);
}
