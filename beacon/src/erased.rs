//! Type-erased cell handles, for groups and dynamic wrapping.

use std::{
	any::{Any, TypeId},
	collections::{BTreeMap, BTreeSet},
	sync::Arc,
};

use luciferin::runtime::NodeId;

use crate::{
	async_value::AsyncValue,
	collections::{ListBeacon, MapBeacon, SetBeacon},
	derived::DerivedBeacon,
	future::AsyncBeacon,
	producer::ProducerCore,
	stream::{RawStreamBeacon, StreamBeacon},
	subscription::{Disposer, SubscribeOptions},
	timed::{
		BufferedCountBeacon, BufferedTimeBeacon, DebouncedBeacon, FilteredBeacon, Stamped,
		ThrottledBeacon, TimestampedBeacon, UndoRedoBeacon,
	},
	traits::sealed::AsProducer,
	writable::WritableBeacon,
};

/// Object-safe view of any cell handle.
///
/// Methods carry an `erased_` prefix so they never shadow the typed surface.
pub trait ErasedBeacon: Send + Sync {
	fn erased_id(&self) -> NodeId;
	fn erased_name(&self) -> Option<String>;
	fn erased_type_id(&self) -> TypeId;
	fn erased_type_name(&self) -> &'static str;
	fn erased_is_empty(&self) -> bool;
	fn erased_listeners_count(&self) -> usize;
	fn erased_dispose(&self);
	/// **Returns** whether the cell supports reset and was reset.
	fn erased_reset(&self) -> bool;
	fn erased_subscribe(
		&self,
		callback: Box<dyn FnMut(&dyn Any) + Send>,
		options: SubscribeOptions,
	) -> Disposer;
	fn erased_peek(&self) -> Option<Box<dyn Any + Send>>;
	fn erased_on_dispose(&self, hook: Box<dyn FnOnce() + Send>);
	fn erased_clone(&self) -> Box<dyn ErasedBeacon>;
}

/// What a concrete handle contributes to its [`ErasedBeacon`] rendition.
pub(crate) trait ErasedParts: Send + Sync {
	type Value: Send + Clone + 'static;

	fn parts_core(&self) -> &Arc<ProducerCore<Self::Value>>;

	fn parts_reset(&self) -> bool {
		false
	}
}

impl<B: ErasedParts + Clone + 'static> ErasedBeacon for B {
	fn erased_id(&self) -> NodeId {
		self.parts_core().id()
	}

	fn erased_name(&self) -> Option<String> {
		self.parts_core().name()
	}

	fn erased_type_id(&self) -> TypeId {
		TypeId::of::<B::Value>()
	}

	fn erased_type_name(&self) -> &'static str {
		std::any::type_name::<B::Value>()
	}

	fn erased_is_empty(&self) -> bool {
		self.parts_core().is_empty()
	}

	fn erased_listeners_count(&self) -> usize {
		self.parts_core().listeners_count()
	}

	fn erased_dispose(&self) {
		ProducerCore::dispose(self.parts_core());
	}

	fn erased_reset(&self) -> bool {
		self.parts_reset()
	}

	fn erased_subscribe(
		&self,
		mut callback: Box<dyn FnMut(&dyn Any) + Send>,
		options: SubscribeOptions,
	) -> Disposer {
		ProducerCore::subscribe(
			self.parts_core(),
			move |value: &B::Value| callback(value),
			options,
		)
	}

	fn erased_peek(&self) -> Option<Box<dyn Any + Send>> {
		self.parts_core()
			.raw_value()
			.map(|value| Box::new(value) as Box<dyn Any + Send>)
	}

	fn erased_on_dispose(&self, hook: Box<dyn FnOnce() + Send>) {
		ProducerCore::on_dispose(self.parts_core(), hook);
	}

	fn erased_clone(&self) -> Box<dyn ErasedBeacon> {
		Box::new(self.clone())
	}
}

impl<T: Send + Clone + PartialEq + 'static> ErasedParts for WritableBeacon<T> {
	type Value = T;

	fn parts_core(&self) -> &Arc<ProducerCore<T>> {
		self.core()
	}

	fn parts_reset(&self) -> bool {
		self.try_reset().is_ok()
	}
}

impl<T: Send + Clone + 'static> ErasedParts for DerivedBeacon<T> {
	type Value = T;

	fn parts_core(&self) -> &Arc<ProducerCore<T>> {
		self.core()
	}
}

impl<T: Send + Clone + 'static> ErasedParts for AsyncBeacon<T> {
	type Value = AsyncValue<T>;

	fn parts_core(&self) -> &Arc<ProducerCore<AsyncValue<T>>> {
		self.core()
	}

	fn parts_reset(&self) -> bool {
		self.reset();
		true
	}
}

impl<T: Send + Clone + 'static> ErasedParts for DebouncedBeacon<T> {
	type Value = T;

	fn parts_core(&self) -> &Arc<ProducerCore<T>> {
		self.core()
	}
}

impl<T: Send + Clone + 'static> ErasedParts for ThrottledBeacon<T> {
	type Value = T;

	fn parts_core(&self) -> &Arc<ProducerCore<T>> {
		self.core()
	}
}

impl<T: Send + Clone + 'static> ErasedParts for FilteredBeacon<T> {
	type Value = T;

	fn parts_core(&self) -> &Arc<ProducerCore<T>> {
		self.core()
	}
}

impl<T: Send + Clone + PartialEq + 'static> ErasedParts for TimestampedBeacon<T> {
	type Value = Stamped<T>;

	fn parts_core(&self) -> &Arc<ProducerCore<Stamped<T>>> {
		self.core()
	}
}

impl<T: Send + Clone + PartialEq + 'static> ErasedParts for UndoRedoBeacon<T> {
	type Value = T;

	fn parts_core(&self) -> &Arc<ProducerCore<T>> {
		self.core()
	}
}

impl<T: Send + Clone + 'static> ErasedParts for BufferedCountBeacon<T> {
	type Value = Vec<T>;

	fn parts_core(&self) -> &Arc<ProducerCore<Vec<T>>> {
		self.core()
	}

	fn parts_reset(&self) -> bool {
		self.reset();
		true
	}
}

impl<T: Send + Clone + 'static> ErasedParts for BufferedTimeBeacon<T> {
	type Value = Vec<T>;

	fn parts_core(&self) -> &Arc<ProducerCore<Vec<T>>> {
		self.core()
	}

	fn parts_reset(&self) -> bool {
		self.reset();
		true
	}
}

impl<T: Send + Clone + 'static> ErasedParts for ListBeacon<T> {
	type Value = Vec<T>;

	fn parts_core(&self) -> &Arc<ProducerCore<Vec<T>>> {
		self.core()
	}
}

impl<T: Ord + Send + Clone + 'static> ErasedParts for SetBeacon<T> {
	type Value = BTreeSet<T>;

	fn parts_core(&self) -> &Arc<ProducerCore<BTreeSet<T>>> {
		self.core()
	}
}

impl<K: Ord + Send + Clone + 'static, V: Send + Clone + 'static> ErasedParts for MapBeacon<K, V> {
	type Value = BTreeMap<K, V>;

	fn parts_core(&self) -> &Arc<ProducerCore<BTreeMap<K, V>>> {
		self.core()
	}
}

impl<T: Send + Clone + 'static> ErasedParts for StreamBeacon<T> {
	type Value = AsyncValue<T>;

	fn parts_core(&self) -> &Arc<ProducerCore<AsyncValue<T>>> {
		self.core()
	}
}

impl<T: Send + Clone + 'static> ErasedParts for RawStreamBeacon<T> {
	type Value = T;

	fn parts_core(&self) -> &Arc<ProducerCore<T>> {
		self.core()
	}
}
