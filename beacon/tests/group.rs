use std::sync::Arc;

use beacon::{Creator, Disposer, ReadableBeacon, Runtime};

use _validator::Validator;

#[test]
fn dispose_all_runs_disposers_then_tears_cells_down() {
	let v = Arc::new(Validator::new());
	let creator = Creator::new(Runtime::new());
	creator.use_sync();

	let group = creator.group();
	let w = group.writable(1);
	group.effect({
		let w = w.clone();
		let v = Arc::clone(&v);
		move || v.push(format!("effect:{}", w.get()))
	});
	v.expect(["effect:1".to_owned()]);

	w.on_dispose({
		let v = Arc::clone(&v);
		move || v.push("cell disposed".to_owned())
	});
	group.add_disposer(Disposer::new({
		let v = Arc::clone(&v);
		move || v.push("disposer".to_owned())
	}));

	group.dispose_all();
	v.expect(["disposer".to_owned(), "cell disposed".to_owned()]);
	assert!(w.is_disposed());

	// Nothing re-runs after teardown.
	w.set(2);
	v.expect([]);
}

#[test]
fn reset_all_resets_resettable_cells() {
	let creator = Creator::new(Runtime::new());
	creator.use_sync();

	let group = creator.group();
	let w = group.writable(1);
	let b = group.buffered_count::<i32>(2);
	let d = group.derived({
		let w = w.clone();
		move || w.get() * 2
	});

	w.set(5);
	b.add(1);
	b.add(2);
	assert_eq!(b.get(), vec![1, 2]);
	assert_eq!(d.get(), 10);

	group.reset_all();
	assert_eq!(w.peek(), 1);
	assert_eq!(b.get(), Vec::<i32>::new());
	// Derivations have no reset; they just follow their dependencies.
	assert_eq!(d.get(), 2);
}

#[test]
fn adopted_cells_join_the_group_lifetime() {
	let creator = Creator::new(Runtime::new());
	creator.use_sync();

	let group = creator.group();
	let outside = creator.writable(3);
	group.add(&outside);
	assert_eq!(group.cell_count(), 1);

	group.dispose_all();
	assert!(outside.is_disposed());
}
