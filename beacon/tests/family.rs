use beacon::{Creator, ReadableBeacon, Runtime};

#[test]
fn cached_family_returns_the_same_cell_per_key() {
	let creator = Creator::new(Runtime::new());
	creator.use_sync();

	let family = creator.family({
		let creator = creator.clone();
		move |key: &String| creator.writable(key.len())
	});

	let a = family.get(&"ab".to_owned());
	let b = family.get(&"ab".to_owned());
	a.set(99);
	// Same underlying cell: the write is visible through the second handle.
	assert_eq!(b.peek(), 99);
	assert_eq!(family.len(), 1);

	let other = family.get(&"xyz".to_owned());
	assert_eq!(other.peek(), 3);
	assert_eq!(family.len(), 2);
}

#[test]
fn clear_drops_the_cache_without_disposing() {
	let creator = Creator::new(Runtime::new());
	creator.use_sync();

	let family = creator.family({
		let creator = creator.clone();
		move |key: &i32| creator.writable(*key)
	});

	let first = family.get(&1);
	first.set(100);
	family.clear();
	assert!(family.is_empty());

	// The held handle still works; the factory builds a fresh cell.
	assert_eq!(first.peek(), 100);
	assert!(!first.is_disposed());
	let second = family.get(&1);
	assert_eq!(second.peek(), 1);
}

#[test]
fn uncached_family_builds_every_time() {
	let creator = Creator::new(Runtime::new());
	creator.use_sync();

	let family = creator.family_with(
		{
			let creator = creator.clone();
			move |key: &i32| creator.writable(*key)
		},
		false,
	);

	let a = family.get(&1);
	a.set(50);
	let b = family.get(&1);
	assert_eq!(b.peek(), 1);
	assert_eq!(family.len(), 0);
}
