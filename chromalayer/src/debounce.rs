//! A cancel-and-replace scheduled task for coalescing rapid edits
//!
//! Time is supplied by the caller, so the debouncer never sleeps or spawns anything.
//! Each newly scheduled task supersedes the pending one; only the most recent value is ever released.

use std::time::{Duration, Instant};

/// Identifies one scheduled task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(u64);

/// The task waiting for its quiet period to elapse
#[derive(Debug)]
struct Pending<T> {
	/// Generation of the task
	generation: u64,
	/// The earliest time the task may run
	deadline: Instant,
	/// The latest scheduled value
	value: T,
}

/// Coalesces values scheduled within a quiet period into the last one
#[derive(Debug)]
pub struct Debouncer<T> {
	/// The quiet period required before a task is released
	window: Duration,
	/// Incremented for every scheduled task
	generation: u64,
	/// The currently scheduled task, if any
	pending: Option<Pending<T>>,
}

impl<T> Debouncer<T> {
	/// Create a debouncer with the given quiet period
	#[must_use]
	pub const fn new(window: Duration) -> Self {
		Self { window, generation: 0, pending: None }
	}

	/// The quiet period
	#[must_use]
	pub const fn window(&self) -> Duration {
		self.window
	}

	/// Schedule `value` to be released once `window` passes after `now` without another schedule.
	///
	/// Any pending task is cancelled and replaced.
	pub fn schedule(&mut self, value: T, now: Instant) -> TaskHandle {
		self.generation += 1;
		self.pending = Some(Pending {
			generation: self.generation,
			deadline: now + self.window,
			value,
		});
		TaskHandle(self.generation)
	}

	/// Cancel the pending task, returning its value.
	pub fn cancel(&mut self) -> Option<T> {
		self.pending.take().map(|pending| pending.value)
	}

	/// Whether `handle` refers to the task that is still pending
	#[must_use]
	pub fn is_current(&self, handle: TaskHandle) -> bool {
		self.pending.as_ref().map_or(false, |pending| pending.generation == handle.0)
	}

	/// Whether a task is waiting to be released
	#[must_use]
	pub const fn is_pending(&self) -> bool {
		self.pending.is_some()
	}

	/// When the pending task may run
	#[must_use]
	pub fn deadline(&self) -> Option<Instant> {
		self.pending.as_ref().map(|pending| pending.deadline)
	}

	/// Release the pending value if its quiet period has elapsed by `now`.
	pub fn poll(&mut self, now: Instant) -> Option<T> {
		if self.deadline().map_or(false, |deadline| deadline <= now) {
			self.cancel()
		} else {
			None
		}
	}
}
