use std::sync::Arc;

use beacon::{Creator, ReadableBeacon, Runtime};

use _validator::Validator;

#[test]
fn list_mutations_notify() {
	let v = Arc::new(Validator::new());
	let creator = Creator::new(Runtime::new());
	creator.use_sync();

	let list = creator.list(vec![1, 2]);
	let _sub = list.subscribe({
		let v = Arc::clone(&v);
		move |values: &Vec<i32>| v.push(values.clone())
	});

	list.push(3);
	v.expect([vec![1, 2, 3]]);

	assert_eq!(list.remove(0), 1);
	v.expect([vec![2, 3]]);

	assert_eq!(list.replace(0, 9), 2);
	v.expect([vec![9, 3]]);

	list.clear();
	v.expect([vec![]]);
	assert_eq!(list.previous_value(), Some(vec![9, 3]));
}

#[test]
fn effects_track_collection_queries() {
	let v = Arc::new(Validator::new());
	let creator = Creator::new(Runtime::new());
	creator.use_sync();

	let list = creator.list(Vec::<i32>::new());
	let _effect = creator.effect({
		let list = list.clone();
		let v = Arc::clone(&v);
		move || v.push(list.len())
	});
	v.expect([0]);

	list.push(1);
	v.expect([1]);
	list.extend([2, 3]);
	v.expect([3]);
}

#[test]
fn set_mutations_report_membership() {
	let creator = Creator::new(Runtime::new());
	creator.use_sync();

	let set = creator.ordered_set(std::collections::BTreeSet::new());
	assert!(set.insert("a"));
	assert!(!set.insert("a"));
	assert!(set.contains(&"a"));
	assert_eq!(set.len(), 1);

	assert!(set.remove(&"a"));
	assert!(!set.remove(&"a"));
	assert_eq!(set.len(), 0);
}

#[test]
fn map_mutations_notify_even_when_values_repeat() {
	let v = Arc::new(Validator::new());
	let creator = Creator::new(Runtime::new());
	creator.use_sync();

	let map = creator.map(std::collections::BTreeMap::<&'static str, i32>::new());
	let _sub = map.subscribe({
		let v = Arc::clone(&v);
		move |values: &std::collections::BTreeMap<&'static str, i32>| v.push(values.len())
	});

	assert_eq!(map.insert("a", 1), None);
	// In-place mutation notifies unconditionally.
	assert_eq!(map.insert("a", 1), Some(1));
	v.expect([1, 1]);

	assert_eq!(map.get_key(&"a"), Some(1));
	assert!(map.contains_key(&"a"));
	assert_eq!(map.remove(&"a"), Some(1));
	v.expect([0]);
}
