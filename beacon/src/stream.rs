//! Bridges between cells and push streams / one-shot futures.

use std::{
	backtrace::Backtrace,
	future::Future,
	pin::Pin,
	sync::{Arc, Weak},
	task::{Context, Poll},
	time::Duration,
};

use event_listener::Event;
use futures_channel::{mpsc, oneshot};
use futures_lite::{future, Stream, StreamExt};
use luciferin::{Runtime, TimerHandle};
use parking_lot::Mutex;
use pin_project::{pin_project, pinned_drop};
use tracing::debug;

use crate::{
	async_value::AsyncValue,
	error::BoxedError,
	producer::ProducerCore,
	subscription::{Disposer, SubscribeOptions},
	traits::sealed::AsProducer,
};

/// A cell exposed as a push stream.
///
/// Emits the current value on creation (when the cell has one) and every
/// accepted write after that. Dropping the stream releases the subscription
/// and fires the cancel hook.
#[pin_project(PinnedDrop)]
pub struct BeaconStream<T> {
	#[pin]
	receiver: mpsc::UnboundedReceiver<T>,
	subscription: Disposer,
	on_cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl<T> Stream for BeaconStream<T> {
	type Item = T;

	fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
		self.project().receiver.poll_next(cx)
	}
}

#[pinned_drop]
impl<T> PinnedDrop for BeaconStream<T> {
	fn drop(self: Pin<&mut Self>) {
		let this = self.project();
		this.subscription.dispose();
		if let Some(on_cancel) = this.on_cancel.take() {
			on_cancel();
		}
	}
}

pub(crate) fn to_stream<T: Send + Clone + 'static>(
	core: &Arc<ProducerCore<T>>,
	on_cancel: Option<Box<dyn FnOnce() + Send>>,
) -> BeaconStream<T> {
	let (sender, receiver) = mpsc::unbounded();
	let subscription = ProducerCore::subscribe(
		core,
		move |value: &T| {
			let _ = sender.unbounded_send(value.clone());
		},
		SubscribeOptions {
			start_now: true,
			synchronous: true,
		},
	);
	BeaconStream {
		receiver,
		subscription,
		on_cancel,
	}
}

struct NextCleanup {
	subscription: Disposer,
	timer: Option<TimerHandle>,
}

impl NextCleanup {
	fn run(self) {
		self.subscription.dispose();
		if let Some(timer) = self.timer {
			timer.cancel();
		}
	}
}

/// One-shot future over a cell's next accepted value.
///
/// Resolves with `Some(value)` on the first match, with the value current at
/// the deadline when a timeout was given, and with `None` when the cell was
/// disposed first (or an empty cell timed out). The subscription is released
/// on resolution; release is idempotent.
#[pin_project(PinnedDrop)]
pub struct NextValue<T> {
	#[pin]
	receiver: oneshot::Receiver<Option<T>>,
	cleanup: Option<NextCleanup>,
}

impl<T> Future for NextValue<T> {
	type Output = Option<T>;

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
		let this = self.project();
		match this.receiver.poll(cx) {
			Poll::Ready(result) => {
				if let Some(cleanup) = this.cleanup.take() {
					cleanup.run();
				}
				Poll::Ready(result.unwrap_or(None))
			}
			Poll::Pending => Poll::Pending,
		}
	}
}

#[pinned_drop]
impl<T> PinnedDrop for NextValue<T> {
	fn drop(self: Pin<&mut Self>) {
		if let Some(cleanup) = self.project().cleanup.take() {
			cleanup.run();
		}
	}
}

pub(crate) fn next_value<T: Send + Clone + 'static>(
	core: &Arc<ProducerCore<T>>,
	mut filter: Option<Box<dyn FnMut(&T) -> bool + Send>>,
	timeout: Option<Duration>,
) -> NextValue<T> {
	let (sender, receiver) = oneshot::channel::<Option<T>>();
	let slot = Arc::new(Mutex::new(Some(sender)));
	let subscription = ProducerCore::subscribe(
		core,
		{
			let slot = Arc::clone(&slot);
			move |value: &T| {
				let matches = filter.as_mut().map_or(true, |filter| filter(value));
				if matches {
					if let Some(sender) = slot.lock().take() {
						let _ = sender.send(Some(value.clone()));
					}
				}
			}
		},
		SubscribeOptions {
			start_now: false,
			synchronous: true,
		},
	);
	let timer = timeout.map(|after| {
		let weak = Arc::downgrade(core);
		let slot = Arc::clone(&slot);
		core.runtime().clock().schedule(
			after,
			Box::new(move || {
				let current = weak.upgrade().and_then(|core| core.raw_value());
				if let Some(sender) = slot.lock().take() {
					let _ = sender.send(current);
				}
			}),
		)
	});
	NextValue {
		receiver,
		cleanup: Some(NextCleanup {
			subscription,
			timer,
		}),
	}
}

/// A push source mapped into [`AsyncValue`] transitions.
///
/// `dispose` stops the driver; with `cancel_on_error` the driver also stops
/// after surfacing the first error.
pub struct StreamBeacon<T: Send + 'static> {
	core: Arc<ProducerCore<AsyncValue<T>>>,
}

impl<T: Send + 'static> Clone for StreamBeacon<T> {
	fn clone(&self) -> Self {
		Self {
			core: Arc::clone(&self.core),
		}
	}
}

impl<T: Send + 'static> AsProducer<AsyncValue<T>> for StreamBeacon<T> {
	fn core(&self) -> &Arc<ProducerCore<AsyncValue<T>>> {
		&self.core
	}
}

fn commit_async<T: Send + Clone + 'static>(
	weak: &Weak<ProducerCore<AsyncValue<T>>>,
	make: impl FnOnce(Option<T>) -> AsyncValue<T>,
) {
	let Some(core) = weak.upgrade() else {
		return;
	};
	let _critical = core.runtime().enter();
	let previous = core.raw_value().and_then(|value| match value {
		AsyncValue::Data { value } => Some(value),
		AsyncValue::Loading { previous } | AsyncValue::Error { previous, .. } => previous,
		AsyncValue::Idle => None,
	});
	ProducerCore::settle_value_forced(&core, make(previous));
	ProducerCore::notify(&core);
}

impl<T: Send + Clone + 'static> StreamBeacon<T> {
	pub(crate) fn create<S>(
		runtime: Arc<Runtime>,
		stream: S,
		cancel_on_error: bool,
		name: Option<String>,
	) -> Self
	where
		S: Stream<Item = Result<T, BoxedError>> + Send + 'static,
	{
		let core = ProducerCore::new_with(
			Arc::clone(&runtime),
			AsyncValue::Loading { previous: None },
			name,
		);
		let stop = Arc::new(Event::new());
		{
			let stop = Arc::clone(&stop);
			ProducerCore::on_dispose(&core, move || {
				stop.notify(usize::MAX);
			});
		}
		let weak = Arc::downgrade(&core);
		runtime.spawn(Box::pin(async move {
			let mut stream = Box::pin(stream);
			loop {
				let listener = stop.listen();
				let step = future::or(
					async move {
						listener.await;
						None
					},
					async { Some(stream.next().await) },
				)
				.await;
				match step {
					None => {
						debug!("stream beacon unsubscribed");
						break;
					}
					Some(None) => {
						debug!("stream beacon source completed");
						break;
					}
					Some(Some(Ok(value))) => {
						commit_async(&weak, |_| AsyncValue::Data { value });
					}
					Some(Some(Err(error))) => {
						commit_async(&weak, |previous| AsyncValue::Error {
							error: Arc::from(error),
							trace: Arc::new(Backtrace::capture()),
							previous,
						});
						if cancel_on_error {
							break;
						}
					}
				}
			}
		}));
		Self { core }
	}
}

/// A push source emitting `T` directly, without the async lifecycle.
pub struct RawStreamBeacon<T: Send + 'static> {
	core: Arc<ProducerCore<T>>,
}

impl<T: Send + 'static> Clone for RawStreamBeacon<T> {
	fn clone(&self) -> Self {
		Self {
			core: Arc::clone(&self.core),
		}
	}
}

impl<T: Send + 'static> AsProducer<T> for RawStreamBeacon<T> {
	fn core(&self) -> &Arc<ProducerCore<T>> {
		&self.core
	}
}

impl<T: Send + Clone + 'static> RawStreamBeacon<T> {
	pub(crate) fn create<S>(
		runtime: Arc<Runtime>,
		stream: S,
		initial: Option<T>,
		on_done: Option<Box<dyn FnOnce() + Send>>,
		name: Option<String>,
	) -> Self
	where
		S: Stream<Item = T> + Send + 'static,
	{
		let core = match initial {
			Some(value) => ProducerCore::new_with(Arc::clone(&runtime), value, name),
			None => ProducerCore::new_lazy(Arc::clone(&runtime), name),
		};
		let stop = Arc::new(Event::new());
		{
			let stop = Arc::clone(&stop);
			ProducerCore::on_dispose(&core, move || {
				stop.notify(usize::MAX);
			});
		}
		let weak = Arc::downgrade(&core);
		runtime.spawn(Box::pin(async move {
			let mut on_done = on_done;
			let mut stream = Box::pin(stream);
			loop {
				let listener = stop.listen();
				let step = future::or(
					async move {
						listener.await;
						None
					},
					async { Some(stream.next().await) },
				)
				.await;
				match step {
					None => break,
					Some(None) => {
						if let Some(on_done) = on_done.take() {
							on_done();
						}
						break;
					}
					Some(Some(value)) => {
						if let Some(core) = weak.upgrade() {
							let _ = ProducerCore::write_forced(&core, value);
						} else {
							break;
						}
					}
				}
			}
		}));
		Self { core }
	}
}
