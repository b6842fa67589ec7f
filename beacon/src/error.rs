//! Semantic error kinds of the cell library.

use thiserror::Error;

/// Boxed error type carried by async computes and stream items.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Everything the graph can refuse to do.
///
/// The ergonomic accessors (`get`, `set`, `reset`, …) panic with the
/// [`Display`](`std::fmt::Display`) rendering of these; the `try_*` variants
/// return them. Async compute failures never surface here — they become
/// [`AsyncValue::Error`](`crate::AsyncValue::Error`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BeaconError {
	/// A lazy cell was read before its first write.
	#[error("{name} read before its first write")]
	LazyRead { name: String },

	/// A consumer wrote a producer it depends on during its own run.
	#[error("{name} written from a consumer that currently depends on it")]
	CircularDependency { name: String },

	/// `wrap` across incompatible value types on the type-erased path.
	#[error("wrap target holds `{found}` but the receiver expects `{expected}`")]
	WrapTargetWrongType {
		expected: &'static str,
		found: &'static str,
	},

	/// `wrap` with `start_now` on a target that has no value yet.
	#[error("{name} wrapped with start_now but the target is empty")]
	WrapEmptyTarget { name: String },

	/// `reset` on a lazy cell that was never written.
	#[error("{name} reset but was never written")]
	Uninitialized { name: String },
}

/// A panic payload rendered as an [`Error`](`std::error::Error`) so that
/// panicking async computes land in [`AsyncValue::Error`](`crate::AsyncValue`).
#[derive(Debug, Error)]
#[error("async compute panicked: {message}")]
pub struct ComputePanic {
	message: String,
}

impl ComputePanic {
	pub(crate) fn from_payload(payload: &(dyn std::any::Any + Send)) -> Self {
		let message = payload
			.downcast_ref::<&'static str>()
			.map(|s| (*s).to_owned())
			.or_else(|| payload.downcast_ref::<String>().cloned())
			.unwrap_or_else(|| "opaque panic payload".to_owned());
		Self { message }
	}
}
