//! Composing one cell out of another.

use std::{
	any::{Any, TypeId},
	sync::{
		atomic::{AtomicBool, Ordering},
		Arc,
	},
};

use crate::{
	erased::ErasedBeacon,
	error::BeaconError,
	producer::ProducerCore,
	subscription::{Disposer, SubscribeOptions},
	traits::{sealed::AsProducer, ReadableBeacon},
	writable::WritableBeacon,
};

/// Options recognised by the `wrap` family.
#[derive(Debug, Clone, Copy)]
pub struct WrapOptions {
	/// Feed the target's current value immediately. Fails with
	/// [`WrapEmptyTarget`](`BeaconError::WrapEmptyTarget`) when the target
	/// has none.
	pub start_now: bool,
	/// Install mutual dispose hooks (guarded against reentry) so disposing
	/// either side tears down both.
	pub dispose_together: bool,
}

impl Default for WrapOptions {
	fn default() -> Self {
		Self {
			start_now: true,
			dispose_together: false,
		}
	}
}

/// Subscribes `receiver` to `target`, feeding each emission through
/// `ingest`. Wrapping a target already wrapped by this receiver is a no-op.
pub(crate) fn wrap_into<R, U, S>(
	receiver: &Arc<ProducerCore<R>>,
	target: &S,
	mut ingest: impl FnMut(&U) + Send + 'static,
	options: WrapOptions,
) -> Result<Disposer, BeaconError>
where
	R: Send + Clone + 'static,
	U: Send + Clone + 'static,
	S: ReadableBeacon<U>,
{
	let runtime = receiver.runtime();
	let _critical = runtime.enter();
	let target_core = target.core();
	if !receiver.note_wrapped(target_core.id()) {
		return Ok(Disposer::noop());
	}
	if options.start_now {
		match ProducerCore::try_peek(target_core) {
			Ok(value) => ingest(&value),
			Err(_) => {
				receiver.forget_wrapped(target_core.id());
				return Err(BeaconError::WrapEmptyTarget {
					name: target_core.display_name(),
				});
			}
		}
	}
	let subscription = ProducerCore::subscribe(
		target_core,
		move |value: &U| ingest(value),
		SubscribeOptions {
			start_now: false,
			synchronous: true,
		},
	);
	if options.dispose_together {
		install_mutual_dispose(receiver, target_core);
	}
	let receiver_weak = Arc::downgrade(receiver);
	let target_id = target_core.id();
	Ok(Disposer::new(move || {
		subscription.dispose();
		if let Some(receiver) = receiver_weak.upgrade() {
			receiver.forget_wrapped(target_id);
		}
	}))
}

fn install_mutual_dispose<R, U>(receiver: &Arc<ProducerCore<R>>, target: &Arc<ProducerCore<U>>)
where
	R: Send + Clone + 'static,
	U: Send + Clone + 'static,
{
	let torn = Arc::new(AtomicBool::new(false));
	{
		let torn = Arc::clone(&torn);
		let target = Arc::downgrade(target);
		ProducerCore::on_dispose(receiver, move || {
			if !torn.swap(true, Ordering::SeqCst) {
				if let Some(target) = target.upgrade() {
					ProducerCore::dispose(&target);
				}
			}
		});
	}
	{
		let receiver = Arc::downgrade(receiver);
		ProducerCore::on_dispose(target, move || {
			if !torn.swap(true, Ordering::SeqCst) {
				if let Some(receiver) = receiver.upgrade() {
					ProducerCore::dispose(&receiver);
				}
			}
		});
	}
}

impl<T: Send + Clone + PartialEq + 'static> WritableBeacon<T> {
	/// Feeds every `target` emission through this cell's ordinary write
	/// path.
	pub fn wrap<S: ReadableBeacon<T>>(
		&self,
		target: &S,
		options: WrapOptions,
	) -> Result<Disposer, BeaconError> {
		let weak = Arc::downgrade(self.core());
		wrap_into(
			self.core(),
			target,
			move |value: &T| {
				if let Some(core) = weak.upgrade() {
					let _ = ProducerCore::write(&core, value.clone(), false);
				}
			},
			options,
		)
	}

	/// Like [`wrap`](`WritableBeacon::wrap`), but each emission goes through
	/// `then`, which decides what (if anything) to write.
	pub fn wrap_with<U, S>(
		&self,
		target: &S,
		mut then: impl FnMut(&WritableBeacon<T>, &U) + Send + 'static,
		options: WrapOptions,
	) -> Result<Disposer, BeaconError>
	where
		U: Send + Clone + 'static,
		S: ReadableBeacon<U>,
	{
		let weak = Arc::downgrade(self.core());
		wrap_into(
			self.core(),
			target,
			move |value: &U| {
				if let Some(core) = weak.upgrade() {
					then(&WritableBeacon::from_core(core), value);
				}
			},
			options,
		)
	}

	/// Wrap over a type-erased target. The target's value type is checked at
	/// construction: a mismatch is
	/// [`WrapTargetWrongType`](`BeaconError::WrapTargetWrongType`).
	pub fn wrap_erased(
		&self,
		target: &dyn ErasedBeacon,
		options: WrapOptions,
	) -> Result<Disposer, BeaconError> {
		let runtime = self.runtime();
		let _critical = runtime.enter();
		if target.erased_type_id() != TypeId::of::<T>() {
			return Err(BeaconError::WrapTargetWrongType {
				expected: std::any::type_name::<T>(),
				found: target.erased_type_name(),
			});
		}
		if !self.core().note_wrapped(target.erased_id()) {
			return Ok(Disposer::noop());
		}
		if options.start_now {
			match target.erased_peek() {
				Some(value) => {
					if let Some(value) = value.downcast_ref::<T>() {
						let _ = ProducerCore::write(self.core(), value.clone(), false);
					}
				}
				None => {
					self.core().forget_wrapped(target.erased_id());
					return Err(BeaconError::WrapEmptyTarget {
						name: target
							.erased_name()
							.unwrap_or_else(|| format!("beacon #{}", target.erased_id().get())),
					});
				}
			}
		}
		let weak = Arc::downgrade(self.core());
		let subscription = target.erased_subscribe(
			Box::new(move |value: &dyn Any| {
				if let (Some(core), Some(value)) = (weak.upgrade(), value.downcast_ref::<T>()) {
					let _ = ProducerCore::write(&core, value.clone(), false);
				}
			}),
			SubscribeOptions {
				start_now: false,
				synchronous: true,
			},
		);
		if options.dispose_together {
			let torn = Arc::new(AtomicBool::new(false));
			{
				let torn = Arc::clone(&torn);
				let target = target.erased_clone();
				ProducerCore::on_dispose(self.core(), move || {
					if !torn.swap(true, Ordering::SeqCst) {
						target.erased_dispose();
					}
				});
			}
			{
				let receiver = Arc::downgrade(self.core());
				target.erased_on_dispose(Box::new(move || {
					if !torn.swap(true, Ordering::SeqCst) {
						if let Some(receiver) = receiver.upgrade() {
							ProducerCore::dispose(&receiver);
						}
					}
				}));
			}
		}
		let receiver_weak = Arc::downgrade(self.core());
		let target_id = target.erased_id();
		Ok(Disposer::new(move || {
			subscription.dispose();
			if let Some(receiver) = receiver_weak.upgrade() {
				receiver.forget_wrapped(target_id);
			}
		}))
	}
}
