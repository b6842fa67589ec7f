//! Host task spawning for async derivations and stream drivers.

use std::{future::Future, pin::Pin, thread};

/// A boxed unit task handed to the host.
pub type TaskFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Runs detached tasks on behalf of the runtime.
///
/// The runtime never force-stops a spawned task; superseded work is expected
/// to observe its cancellation signal and finish early.
pub trait Spawner: Send + Sync {
	fn spawn(&self, task: TaskFuture);
}

/// Default [`Spawner`]: one thread per task, driven to completion with
/// [`futures_lite::future::block_on`].
pub struct ThreadSpawner;

impl Spawner for ThreadSpawner {
	fn spawn(&self, task: TaskFuture) {
		thread::Builder::new()
			.name("beacon-task".to_owned())
			.spawn(move || futures_lite::future::block_on(task))
			.expect("failed to spawn task thread");
	}
}
