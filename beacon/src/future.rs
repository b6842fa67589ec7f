//! Async derivations and future-backed cells.
//!
//! An async cell owns a compute closure returning a future. Each (re)run
//! increments a token; only the outcome of the newest token commits, so a
//! slow superseded run can never clobber a fresh result. With
//! `cancel_running`, superseded runs additionally receive a cancellation
//! signal they are raced against.

use std::{
	any::Any,
	backtrace::Backtrace,
	future::Future,
	panic::AssertUnwindSafe,
	pin::Pin,
	sync::{
		atomic::{AtomicBool, AtomicU64, Ordering},
		Arc, OnceLock, Weak,
	},
};

use event_listener::Event;
use futures_lite::future::{self, FutureExt};
use luciferin::{
	runtime::{NodeId, Observer},
	Runtime,
};
use parking_lot::Mutex;
use tracing::trace;

use crate::{
	async_value::{AsyncStatus, AsyncValue},
	error::{BoxedError, ComputePanic},
	observer::ObserverCore,
	producer::{NodeHooks, ProducerCore},
	traits::{sealed::AsProducer, ReadableBeacon},
};

/// Boxed future produced by an async cell's compute closure.
pub type ComputeFuture<T> = Pin<Box<dyn Future<Output = Result<T, BoxedError>> + Send>>;

type ComputeOutcome<T> = Result<Result<T, BoxedError>, Box<dyn Any + Send>>;

/// Configuration for async cells.
#[derive(Debug, Clone, Copy)]
pub struct AsyncOptions {
	/// Start `Idle`; nothing runs until [`AsyncBeacon::start`].
	pub manual_start: bool,
	/// Send a cancellation signal to in-flight work when superseded. The
	/// superseded outcome is dropped either way.
	pub cancel_running: bool,
}

impl Default for AsyncOptions {
	fn default() -> Self {
		Self {
			manual_start: false,
			cancel_running: true,
		}
	}
}

pub(crate) struct AsyncInner<T: Send + 'static> {
	producer: Arc<ProducerCore<AsyncValue<T>>>,
	observer: ObserverCore,
	compute: Mutex<Box<dyn FnMut() -> ComputeFuture<T> + Send>>,
	self_typed: OnceLock<Weak<AsyncInner<T>>>,
	/// Monotonic run token; only the newest run's outcome commits.
	token: AtomicU64,
	/// Whether any run was triggered since creation or the last reset.
	ran: AtomicBool,
	cancel: Mutex<Option<Arc<Event>>>,
	cancel_running: bool,
	manual_start: bool,
	tracked: bool,
}

impl<T: Send + Clone + 'static> AsyncInner<T> {
	fn previous_data(&self) -> Option<T> {
		self.producer.raw_value().and_then(|value| match value {
			AsyncValue::Data { value } => Some(value),
			AsyncValue::Loading { previous } | AsyncValue::Error { previous, .. } => previous,
			AsyncValue::Idle => None,
		})
	}

	fn trigger(this: &Arc<Self>) {
		let runtime = Arc::clone(this.observer.runtime());
		let _critical = runtime.enter();
		if this.observer.is_disposed() {
			return;
		}
		this.ran.store(true, Ordering::SeqCst);
		let token = this.token.fetch_add(1, Ordering::SeqCst) + 1;
		let event = {
			let mut cancel = this.cancel.lock();
			if let Some(superseded) = cancel.take() {
				if this.cancel_running {
					trace!(token, "cancelling superseded async run");
					superseded.notify(usize::MAX);
				}
			}
			let event = Arc::new(Event::new());
			*cancel = Some(Arc::clone(&event));
			event
		};
		let listener = event.listen();
		let previous = this.previous_data();
		ProducerCore::settle_value_forced(&this.producer, AsyncValue::Loading { previous });
		ProducerCore::notify(&this.producer);
		let built = if this.tracked {
			this.observer.run_tracked(|| {
				let mut compute = this.compute.lock();
				(*compute)()
			})
		} else {
			this.observer.run_frozen(|| {
				let mut compute = this.compute.lock();
				(*compute)()
			})
		};
		this.observer.note_ran();
		let future = match built {
			Ok(future) => future,
			Err(payload) => {
				// A synchronously panicking compute settles as Error rather
				// than unwinding into the write that triggered it.
				Self::commit(this, token, Err(payload));
				return;
			}
		};
		let weak = Arc::downgrade(this);
		runtime.spawn(Box::pin(async move {
			let raced = future::or(
				async move {
					listener.await;
					None
				},
				async move { Some(AssertUnwindSafe(future).catch_unwind().await) },
			)
			.await;
			let Some(outcome) = raced else {
				return;
			};
			if let Some(this) = weak.upgrade() {
				Self::commit(&this, token, outcome);
			}
		}));
	}

	fn commit(this: &Arc<Self>, token: u64, outcome: ComputeOutcome<T>) {
		let runtime = this.observer.runtime();
		let _critical = runtime.enter();
		if this.token.load(Ordering::SeqCst) != token {
			trace!(token, "stale async outcome dropped");
			return;
		}
		if this.observer.is_disposed() {
			return;
		}
		let previous = this.previous_data();
		let value = match outcome {
			Ok(Ok(value)) => AsyncValue::Data { value },
			Ok(Err(error)) => AsyncValue::Error {
				error: Arc::from(error),
				trace: Arc::new(Backtrace::capture()),
				previous,
			},
			Err(payload) => AsyncValue::Error {
				error: Arc::new(ComputePanic::from_payload(payload.as_ref())),
				trace: Arc::new(Backtrace::capture()),
				previous,
			},
		};
		*this.cancel.lock() = None;
		ProducerCore::settle_value_forced(&this.producer, value);
		ProducerCore::notify(&this.producer);
	}

	fn trigger_weak(&self) {
		if let Some(this) = self.self_typed.get().and_then(Weak::upgrade) {
			Self::trigger(&this);
		}
	}
}

impl<T: Send + Clone + 'static> Observer for AsyncInner<T> {
	fn id(&self) -> NodeId {
		self.observer.id()
	}

	fn notify_stale(&self) {
		if self.observer.is_disposed() || !self.ran.load(Ordering::SeqCst) {
			return;
		}
		self.observer.mark_stale();
		self.observer.schedule_run();
	}

	fn run(&self) {
		if self.observer.is_disposed() {
			return;
		}
		if self.observer.is_stale() {
			self.observer.clear_stale();
			self.trigger_weak();
		}
	}

	fn is_disposed(&self) -> bool {
		self.observer.is_disposed()
	}

	fn debug_label(&self) -> String {
		self.producer.display_name()
	}
}

impl<T: Send + Clone + 'static> NodeHooks for AsyncInner<T> {
	fn ensure_fresh(&self) {
		if !self.manual_start && !self.ran.load(Ordering::SeqCst) {
			self.trigger_weak();
		}
	}
}

/// A cell producing [`AsyncValue`]s from an async compute.
///
/// Created through [`Creator::async_derived`](`crate::Creator::async_derived`)
/// (dependency-tracked) or [`Creator::future`](`crate::Creator::future`)
/// (one-shot, no tracking).
pub struct AsyncBeacon<T: Send + 'static> {
	inner: Arc<AsyncInner<T>>,
}

impl<T: Send + 'static> Clone for AsyncBeacon<T> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<T: Send + 'static> AsProducer<AsyncValue<T>> for AsyncBeacon<T> {
	fn core(&self) -> &Arc<ProducerCore<AsyncValue<T>>> {
		&self.inner.producer
	}
}

impl<T: Send + Clone + 'static> AsyncBeacon<T> {
	pub(crate) fn create(
		runtime: Arc<Runtime>,
		compute: Box<dyn FnMut() -> ComputeFuture<T> + Send>,
		options: AsyncOptions,
		tracked: bool,
		name: Option<String>,
	) -> Self {
		let inner = Arc::new(AsyncInner {
			producer: ProducerCore::new_with(Arc::clone(&runtime), AsyncValue::Idle, name),
			observer: ObserverCore::new(runtime),
			compute: Mutex::new(compute),
			self_typed: OnceLock::new(),
			token: AtomicU64::new(0),
			ran: AtomicBool::new(false),
			cancel: Mutex::new(None),
			cancel_running: options.cancel_running,
			manual_start: options.manual_start,
			tracked,
		});
		let observer_arc: Arc<dyn Observer> = inner.clone();
		let as_observer: Weak<dyn Observer> = Arc::downgrade(&observer_arc);
		inner.observer.bind(as_observer);
		let hooks_arc: Arc<dyn NodeHooks> = inner.clone();
		let as_hooks: Weak<dyn NodeHooks> = Arc::downgrade(&hooks_arc);
		inner.producer.set_hooks(as_hooks);
		inner
			.self_typed
			.set(Arc::downgrade(&inner))
			.unwrap_or_else(|_| unreachable!());
		let weak = Arc::downgrade(&inner);
		ProducerCore::on_dispose(&inner.producer, move || {
			if let Some(inner) = weak.upgrade() {
				inner.token.fetch_add(1, Ordering::SeqCst);
				if let Some(event) = inner.cancel.lock().take() {
					event.notify(usize::MAX);
				}
				inner.observer.dispose();
			}
		});
		Self { inner }
	}

	/// First start of a manual-start cell; on running cells this is a no-op.
	pub fn start(&self) {
		if !self.inner.ran.load(Ordering::SeqCst) {
			AsyncInner::trigger(&self.inner);
		}
	}

	/// The current lifecycle phase.
	///
	/// Reading the status of a non-manual cell that never ran triggers its
	/// first run.
	#[must_use]
	pub fn status(&self) -> AsyncStatus {
		self.peek().status()
	}

	/// Forces a re-execution of the compute, superseding any in-flight run.
	pub fn run(&self) {
		AsyncInner::trigger(&self.inner);
	}

	/// Cancels in-flight work and returns to `Idle`. A non-manual cell
	/// restarts on its next read.
	pub fn reset(&self) {
		let runtime = self.inner.observer.runtime();
		let _critical = runtime.enter();
		self.inner.token.fetch_add(1, Ordering::SeqCst);
		if let Some(event) = self.inner.cancel.lock().take() {
			event.notify(usize::MAX);
		}
		self.inner.ran.store(false, Ordering::SeqCst);
		ProducerCore::settle_value_forced(&self.inner.producer, AsyncValue::Idle);
		ProducerCore::notify(&self.inner.producer);
	}
}

impl<T: Send + Clone + std::fmt::Debug + 'static> std::fmt::Debug for AsyncBeacon<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AsyncBeacon")
			.field("name", &self.name())
			.field("value", &self.try_peek().ok())
			.finish()
	}
}
