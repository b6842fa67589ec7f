//! Keyed cell factories.

use std::collections::BTreeMap;

use parking_lot::Mutex;

/// A memoized factory from key to cell.
///
/// With caching on (the default), structurally equal keys return the same
/// cell handle. [`clear`](`Family::clear`) drops the cache without disposing
/// the produced cells, which may be held elsewhere.
pub struct Family<K, B> {
	factory: Mutex<Box<dyn FnMut(&K) -> B + Send>>,
	cache: Mutex<BTreeMap<K, B>>,
	should_cache: bool,
}

impl<K: Ord + Clone, B: Clone> Family<K, B> {
	pub(crate) fn create(factory: impl FnMut(&K) -> B + Send + 'static, should_cache: bool) -> Self {
		Self {
			factory: Mutex::new(Box::new(factory)),
			cache: Mutex::new(BTreeMap::new()),
			should_cache,
		}
	}

	/// The cell for `key`, from cache or freshly built.
	///
	/// The factory must not re-enter the family.
	pub fn get(&self, key: &K) -> B {
		if self.should_cache {
			if let Some(cell) = self.cache.lock().get(key) {
				return cell.clone();
			}
		}
		let cell = {
			let mut factory = self.factory.lock();
			(*factory)(key)
		};
		if self.should_cache {
			self.cache.lock().insert(key.clone(), cell.clone());
		}
		cell
	}

	/// Drops every cached entry. Produced cells are not disposed.
	pub fn clear(&self) {
		self.cache.lock().clear();
	}

	/// Drops the entry for `key`, returning it.
	pub fn remove(&self, key: &K) -> Option<B> {
		self.cache.lock().remove(key)
	}

	#[must_use]
	pub fn contains(&self, key: &K) -> bool {
		self.cache.lock().contains_key(key)
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.cache.lock().len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.cache.lock().is_empty()
	}
}
