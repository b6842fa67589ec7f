//! Collection cells notifying on in-place mutation.
//!
//! Mutators always notify (no equality gate); reads of the whole collection
//! go through the usual tracked surface, and the query helpers here are
//! tracked too, so consumers re-run on any mutation.

use std::{
	collections::{BTreeMap, BTreeSet},
	sync::Arc,
};

use luciferin::Runtime;

use crate::{
	producer::ProducerCore,
	traits::sealed::AsProducer,
};

/// A `Vec`-valued cell with in-place mutators.
pub struct ListBeacon<T: Send + 'static> {
	core: Arc<ProducerCore<Vec<T>>>,
}

impl<T: Send + 'static> Clone for ListBeacon<T> {
	fn clone(&self) -> Self {
		Self {
			core: Arc::clone(&self.core),
		}
	}
}

impl<T: Send + 'static> AsProducer<Vec<T>> for ListBeacon<T> {
	fn core(&self) -> &Arc<ProducerCore<Vec<T>>> {
		&self.core
	}
}

impl<T: Send + Clone + 'static> ListBeacon<T> {
	pub(crate) fn create(runtime: Arc<Runtime>, initial: Vec<T>, name: Option<String>) -> Self {
		Self {
			core: ProducerCore::new_with(runtime, initial, name),
		}
	}

	fn mutate<R>(&self, f: impl FnOnce(&mut Vec<T>) -> R) -> R {
		ProducerCore::mutate(&self.core, f).unwrap_or_else(|error| panic!("{error}"))
	}

	pub fn push(&self, value: T) {
		self.mutate(|list| list.push(value));
	}

	/// # Panics
	///
	/// Panics when `index > len`.
	pub fn insert(&self, index: usize, value: T) {
		self.mutate(|list| list.insert(index, value));
	}

	/// # Panics
	///
	/// Panics when `index >= len`.
	pub fn remove(&self, index: usize) -> T {
		self.mutate(|list| list.remove(index))
	}

	/// Replaces the element at `index`, returning the old one.
	///
	/// # Panics
	///
	/// Panics when `index >= len`.
	pub fn replace(&self, index: usize, value: T) -> T {
		self.mutate(|list| std::mem::replace(&mut list[index], value))
	}

	pub fn clear(&self) {
		self.mutate(Vec::clear);
	}

	pub fn extend(&self, values: impl IntoIterator<Item = T>) {
		let values: Vec<T> = values.into_iter().collect();
		self.mutate(|list| list.extend(values));
	}

	/// Tracked length read.
	#[must_use]
	pub fn len(&self) -> usize {
		ProducerCore::with_value(&self.core, true, Vec::len)
			.unwrap_or_else(|error| panic!("{error}"))
	}
}

/// A `BTreeSet`-valued cell with in-place mutators.
pub struct SetBeacon<T: Ord + Send + 'static> {
	core: Arc<ProducerCore<BTreeSet<T>>>,
}

impl<T: Ord + Send + 'static> Clone for SetBeacon<T> {
	fn clone(&self) -> Self {
		Self {
			core: Arc::clone(&self.core),
		}
	}
}

impl<T: Ord + Send + 'static> AsProducer<BTreeSet<T>> for SetBeacon<T> {
	fn core(&self) -> &Arc<ProducerCore<BTreeSet<T>>> {
		&self.core
	}
}

impl<T: Ord + Send + Clone + 'static> SetBeacon<T> {
	pub(crate) fn create(
		runtime: Arc<Runtime>,
		initial: BTreeSet<T>,
		name: Option<String>,
	) -> Self {
		Self {
			core: ProducerCore::new_with(runtime, initial, name),
		}
	}

	fn mutate<R>(&self, f: impl FnOnce(&mut BTreeSet<T>) -> R) -> R {
		ProducerCore::mutate(&self.core, f).unwrap_or_else(|error| panic!("{error}"))
	}

	/// **Returns** whether the value was newly inserted.
	pub fn insert(&self, value: T) -> bool {
		self.mutate(|set| set.insert(value))
	}

	pub fn remove(&self, value: &T) -> bool {
		self.mutate(|set| set.remove(value))
	}

	pub fn clear(&self) {
		self.mutate(BTreeSet::clear);
	}

	/// Tracked membership read.
	#[must_use]
	pub fn contains(&self, value: &T) -> bool {
		ProducerCore::with_value(&self.core, true, |set| set.contains(value))
			.unwrap_or_else(|error| panic!("{error}"))
	}

	/// Tracked length read.
	#[must_use]
	pub fn len(&self) -> usize {
		ProducerCore::with_value(&self.core, true, BTreeSet::len)
			.unwrap_or_else(|error| panic!("{error}"))
	}
}

/// A `BTreeMap`-valued cell with in-place mutators.
pub struct MapBeacon<K: Ord + Send + 'static, V: Send + 'static> {
	core: Arc<ProducerCore<BTreeMap<K, V>>>,
}

impl<K: Ord + Send + 'static, V: Send + 'static> Clone for MapBeacon<K, V> {
	fn clone(&self) -> Self {
		Self {
			core: Arc::clone(&self.core),
		}
	}
}

impl<K: Ord + Send + 'static, V: Send + 'static> AsProducer<BTreeMap<K, V>> for MapBeacon<K, V> {
	fn core(&self) -> &Arc<ProducerCore<BTreeMap<K, V>>> {
		&self.core
	}
}

impl<K: Ord + Send + Clone + 'static, V: Send + Clone + 'static> MapBeacon<K, V> {
	pub(crate) fn create(
		runtime: Arc<Runtime>,
		initial: BTreeMap<K, V>,
		name: Option<String>,
	) -> Self {
		Self {
			core: ProducerCore::new_with(runtime, initial, name),
		}
	}

	fn mutate<R>(&self, f: impl FnOnce(&mut BTreeMap<K, V>) -> R) -> R {
		ProducerCore::mutate(&self.core, f).unwrap_or_else(|error| panic!("{error}"))
	}

	pub fn insert(&self, key: K, value: V) -> Option<V> {
		self.mutate(|map| map.insert(key, value))
	}

	pub fn remove(&self, key: &K) -> Option<V> {
		self.mutate(|map| map.remove(key))
	}

	pub fn clear(&self) {
		self.mutate(BTreeMap::clear);
	}

	/// Tracked single-key read.
	#[must_use]
	pub fn get_key(&self, key: &K) -> Option<V> {
		ProducerCore::with_value(&self.core, true, |map| map.get(key).cloned())
			.unwrap_or_else(|error| panic!("{error}"))
	}

	/// Tracked membership read.
	#[must_use]
	pub fn contains_key(&self, key: &K) -> bool {
		ProducerCore::with_value(&self.core, true, |map| map.contains_key(key))
			.unwrap_or_else(|error| panic!("{error}"))
	}

	/// Tracked length read.
	#[must_use]
	pub fn len(&self) -> usize {
		ProducerCore::with_value(&self.core, true, BTreeMap::len)
			.unwrap_or_else(|error| panic!("{error}"))
	}
}
