//! luciferin is the reactive runtime core backing `beacon`.
//!
//! It owns everything that is *not* a value cell: node identities, the
//! dependency-tracking context (the "current consumer" stack, detached scopes,
//! batches), the stale-consumer scheduler, and the host services (clock,
//! task spawner) that cells consume.
//!
//! Cells live in the `beacon` crate. They talk to this crate through the
//! [`Observer`](`runtime::Observer`) and [`Dependency`](`runtime::Dependency`)
//! traits and through a [`Runtime`](`runtime::Runtime`) handle.
#![warn(clippy::pedantic)]
#![warn(unreachable_pub)]

pub mod clock;
pub mod runtime;
pub mod spawner;

pub use clock::{Clock, ManualClock, ThreadClock, TimerHandle};
pub use runtime::{
	Dependency, DependencyRecord, FlushTask, NodeId, Observer, Runtime, ScheduleMode,
};
pub use spawner::{Spawner, TaskFuture, ThreadSpawner};
