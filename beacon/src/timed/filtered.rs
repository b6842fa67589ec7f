//! A writable cell guarded by a predicate.

use std::sync::Arc;

use luciferin::Runtime;
use parking_lot::Mutex;

use crate::{
	error::BeaconError,
	producer::ProducerCore,
	traits::sealed::AsProducer,
};

type FilterFn<T> = Box<dyn FnMut(Option<&T>, &T) -> bool + Send>;

/// A writable cell that consults `filter(previous, next)` before accepting.
/// The first write always passes, as does `force_set`.
pub struct FilteredBeacon<T: Send + 'static> {
	inner: Arc<FilteredInner<T>>,
}

pub(crate) struct FilteredInner<T: Send + 'static> {
	core: Arc<ProducerCore<T>>,
	filter: Mutex<Option<FilterFn<T>>>,
}

impl<T: Send + 'static> Clone for FilteredBeacon<T> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<T: Send + 'static> AsProducer<T> for FilteredBeacon<T> {
	fn core(&self) -> &Arc<ProducerCore<T>> {
		&self.inner.core
	}
}

impl<T: Send + Clone + PartialEq + 'static> FilteredBeacon<T> {
	pub(crate) fn create(
		runtime: Arc<Runtime>,
		initial: Option<T>,
		filter: Option<FilterFn<T>>,
		name: Option<String>,
	) -> Self {
		let core = match initial {
			Some(value) => ProducerCore::new_with(runtime, value, name),
			None => ProducerCore::new_lazy(runtime, name),
		};
		Self {
			inner: Arc::new(FilteredInner {
				core,
				filter: Mutex::new(filter),
			}),
		}
	}

	/// # Panics
	///
	/// Panics on a circular write; see [`try_set`](`FilteredBeacon::try_set`).
	pub fn set(&self, value: T) {
		self.try_set(value).unwrap_or_else(|error| panic!("{error}"));
	}

	pub fn try_set(&self, value: T) -> Result<(), BeaconError> {
		let inner = &self.inner;
		let _critical = inner.core.runtime().enter();
		ProducerCore::check_circular(&inner.core)?;
		if inner.core.is_disposed() {
			return Ok(());
		}
		let pass = match inner.core.raw_value() {
			None => true,
			Some(current) => {
				let mut filter = inner.filter.lock();
				filter
					.as_mut()
					.map_or(true, |filter| filter(Some(&current), &value))
			}
		};
		if pass {
			ProducerCore::write(&inner.core, value, false)?;
		}
		Ok(())
	}

	/// Bypasses the predicate (and the equality gate).
	pub fn force_set(&self, value: T) {
		ProducerCore::write_forced(&self.inner.core, value)
			.unwrap_or_else(|error| panic!("{error}"));
	}

	/// Replaces the predicate. Applies from the next write on.
	pub fn set_filter(&self, filter: impl FnMut(Option<&T>, &T) -> bool + Send + 'static) {
		*self.inner.filter.lock() = Some(Box::new(filter));
	}

	/// Removes the predicate; subsequent writes are only equality-gated.
	pub fn clear_filter(&self) {
		*self.inner.filter.lock() = None;
	}

	/// Feeds every `target` emission through the predicate.
	pub fn wrap<S: crate::ReadableBeacon<T>>(
		&self,
		target: &S,
		options: crate::WrapOptions,
	) -> Result<crate::Disposer, BeaconError> {
		let weak = Arc::downgrade(&self.inner);
		crate::wrap::wrap_into(
			&self.inner.core,
			target,
			move |value: &T| {
				if let Some(inner) = weak.upgrade() {
					let _ = (FilteredBeacon { inner }).try_set(value.clone());
				}
			},
			options,
		)
	}
}
