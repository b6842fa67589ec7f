//! The async value lifecycle.

use std::{backtrace::Backtrace, sync::Arc};

/// Shared error as surfaced by async cells.
pub type AsyncError = Arc<dyn std::error::Error + Send + Sync>;

/// Coarse phase of an [`AsyncValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsyncStatus {
	Idle,
	Loading,
	Data,
	Error,
}

/// The value of an async cell.
///
/// `previous` preserves the last `Data` across `Loading` and `Error`
/// transitions, for stale-while-revalidate rendering.
#[derive(Debug, Clone)]
pub enum AsyncValue<T> {
	/// Not started (manual-start cells before `start`).
	Idle,
	Loading {
		previous: Option<T>,
	},
	Data {
		value: T,
	},
	Error {
		error: AsyncError,
		trace: Arc<Backtrace>,
		previous: Option<T>,
	},
}

impl<T> AsyncValue<T> {
	#[must_use]
	pub fn status(&self) -> AsyncStatus {
		match self {
			Self::Idle => AsyncStatus::Idle,
			Self::Loading { .. } => AsyncStatus::Loading,
			Self::Data { .. } => AsyncStatus::Data,
			Self::Error { .. } => AsyncStatus::Error,
		}
	}

	#[must_use]
	pub fn is_idle(&self) -> bool {
		matches!(self, Self::Idle)
	}

	#[must_use]
	pub fn is_loading(&self) -> bool {
		matches!(self, Self::Loading { .. })
	}

	#[must_use]
	pub fn is_data(&self) -> bool {
		matches!(self, Self::Data { .. })
	}

	#[must_use]
	pub fn is_error(&self) -> bool {
		matches!(self, Self::Error { .. })
	}

	/// The settled value, if this is `Data`.
	#[must_use]
	pub fn data(&self) -> Option<&T> {
		match self {
			Self::Data { value } => Some(value),
			_ => None,
		}
	}

	/// The settled value or the preserved previous one.
	#[must_use]
	pub fn last_data(&self) -> Option<&T> {
		match self {
			Self::Data { value } => Some(value),
			Self::Loading { previous } | Self::Error { previous, .. } => previous.as_ref(),
			Self::Idle => None,
		}
	}

	#[must_use]
	pub fn error(&self) -> Option<&AsyncError> {
		match self {
			Self::Error { error, .. } => Some(error),
			_ => None,
		}
	}

	/// # Panics
	///
	/// Panics unless this is `Data`.
	#[must_use]
	pub fn unwrap_data(self) -> T {
		match self {
			Self::Data { value } => value,
			other => panic!("expected Data, found {:?}", other.status()),
		}
	}
}

/// Equality ignores the captured backtrace; errors compare by identity.
impl<T: PartialEq> PartialEq for AsyncValue<T> {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Idle, Self::Idle) => true,
			(Self::Loading { previous: a }, Self::Loading { previous: b }) => a == b,
			(Self::Data { value: a }, Self::Data { value: b }) => a == b,
			(
				Self::Error {
					error: ea,
					previous: pa,
					..
				},
				Self::Error {
					error: eb,
					previous: pb,
					..
				},
			) => Arc::ptr_eq(ea, eb) && pa == pb,
			_ => false,
		}
	}
}
