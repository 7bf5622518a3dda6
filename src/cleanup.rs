//! Effect cleanup tracking, including deferred (async) cleanups.
//!
//! `on_mount` and `on_render` may return their cleanup asynchronously as a
//! pending future. The instance never blocks on it; a continuation is spawned
//! that delivers the eventual cleanup to an explicit handle. The handle
//! guarantees the cleanup still runs exactly once even when the future
//! resolves after the owning identity has already unmounted.

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use futures::future::LocalBoxFuture;

use crate::host::{CleanupFn, LocalSpawner};

/// What a lifecycle effect callback hands back.
pub enum EffectReturn {
	/// No cleanup required.
	Nothing,
	/// A synchronous cleanup, ready to store.
	Cleanup(CleanupFn),
	/// The cleanup is still being produced; resolves to an optional cleanup.
	Pending(LocalBoxFuture<'static, Option<CleanupFn>>),
}

impl EffectReturn {
	/// A callback with nothing to clean up.
	pub fn nothing() -> Self {
		Self::Nothing
	}

	/// Wraps a synchronous cleanup closure.
	pub fn cleanup(cleanup: impl FnOnce() + 'static) -> Self {
		Self::Cleanup(Box::new(cleanup))
	}

	/// Wraps a future resolving to an optional cleanup closure.
	pub fn pending<F>(future: F) -> Self
	where
		F: Future<Output = Option<CleanupFn>> + 'static,
	{
		Self::Pending(Box::pin(future))
	}
}

impl fmt::Debug for EffectReturn {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Nothing => f.write_str("EffectReturn::Nothing"),
			Self::Cleanup(_) => f.write_str("EffectReturn::Cleanup(..)"),
			Self::Pending(_) => f.write_str("EffectReturn::Pending(..)"),
		}
	}
}

#[derive(Default)]
enum DeferredState {
	/// Future still running, nobody asked for the cleanup yet.
	#[default]
	Waiting,
	/// `fire` happened before the future resolved; run the cleanup on arrival.
	Due,
	/// The future resolved first; the cleanup is parked here.
	Arrived(CleanupFn),
	/// The cleanup ran (or resolved to nothing). Terminal.
	Done,
}

/// Tracks one deferred cleanup across the resolve/unmount race.
struct DeferredCleanup {
	state: RefCell<DeferredState>,
}

impl DeferredCleanup {
	fn new() -> Self {
		Self {
			state: RefCell::new(DeferredState::Waiting),
		}
	}

	/// Called by the spawned continuation when the future resolves.
	fn arrive(&self, cleanup: Option<CleanupFn>) {
		let state = self.state.replace(DeferredState::Done);
		match (state, cleanup) {
			(DeferredState::Waiting, Some(cleanup)) => {
				*self.state.borrow_mut() = DeferredState::Arrived(cleanup);
			}
			(DeferredState::Due, Some(cleanup)) => cleanup(),
			// Resolved to no cleanup, or arrived twice: nothing left to track.
			_ => {}
		}
	}

	/// Called when the owner wants the cleanup to run. Runs it immediately if
	/// it already arrived, otherwise marks it due so `arrive` runs it.
	fn fire(&self) {
		let state = self.state.replace(DeferredState::Done);
		match state {
			DeferredState::Waiting => *self.state.borrow_mut() = DeferredState::Due,
			DeferredState::Arrived(cleanup) => cleanup(),
			DeferredState::Due | DeferredState::Done => {}
		}
	}
}

enum ActiveCleanup {
	Sync(CleanupFn),
	Deferred(Rc<DeferredCleanup>),
}

/// Holds at most one outstanding cleanup for an effect slot.
///
/// `fire` consumes the current cleanup; `accept` installs the next one. The
/// caller is responsible for firing before accepting when replacement
/// semantics are wanted (cleanup-then-effect).
#[derive(Clone, Default)]
pub(crate) struct CleanupSlot {
	current: Rc<RefCell<Option<ActiveCleanup>>>,
}

impl CleanupSlot {
	pub(crate) fn new() -> Self {
		Self::default()
	}

	/// Runs the outstanding cleanup, if any. For a deferred cleanup whose
	/// future has not resolved yet, marks it due instead; it will run exactly
	/// once on arrival.
	pub(crate) fn fire(&self) {
		let active = self.current.borrow_mut().take();
		match active {
			Some(ActiveCleanup::Sync(cleanup)) => cleanup(),
			Some(ActiveCleanup::Deferred(handle)) => handle.fire(),
			None => {}
		}
	}

	/// Installs the cleanup produced by an effect callback.
	pub(crate) fn accept(&self, ret: EffectReturn, spawner: &Rc<dyn LocalSpawner>) {
		match ret {
			EffectReturn::Nothing => {}
			EffectReturn::Cleanup(cleanup) => {
				*self.current.borrow_mut() = Some(ActiveCleanup::Sync(cleanup));
			}
			EffectReturn::Pending(future) => {
				let handle = Rc::new(DeferredCleanup::new());
				*self.current.borrow_mut() = Some(ActiveCleanup::Deferred(Rc::clone(&handle)));
				spawner.spawn_local(Box::pin(async move {
					let cleanup = future.await;
					handle.arrive(cleanup);
				}));
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::cell::Cell;

	struct ImmediateSpawner;

	impl LocalSpawner for ImmediateSpawner {
		fn spawn_local(&self, task: LocalBoxFuture<'static, ()>) {
			// Tests here only spawn already-ready futures.
			futures::executor::block_on(task);
		}
	}

	fn counting_cleanup(counter: &Rc<Cell<u32>>) -> CleanupFn {
		let counter = Rc::clone(counter);
		Box::new(move || counter.set(counter.get() + 1))
	}

	#[rstest]
	fn test_sync_cleanup_runs_once_on_fire() {
		let spawner: Rc<dyn LocalSpawner> = Rc::new(ImmediateSpawner);
		let count = Rc::new(Cell::new(0));
		let slot = CleanupSlot::new();

		slot.accept(EffectReturn::Cleanup(counting_cleanup(&count)), &spawner);
		slot.fire();
		slot.fire();

		assert_eq!(count.get(), 1);
	}

	#[rstest]
	fn test_nothing_is_a_no_op() {
		let spawner: Rc<dyn LocalSpawner> = Rc::new(ImmediateSpawner);
		let slot = CleanupSlot::new();
		slot.accept(EffectReturn::Nothing, &spawner);
		slot.fire();
	}

	#[rstest]
	fn test_deferred_cleanup_arriving_before_fire() {
		let spawner: Rc<dyn LocalSpawner> = Rc::new(ImmediateSpawner);
		let count = Rc::new(Cell::new(0));
		let slot = CleanupSlot::new();

		let cleanup = counting_cleanup(&count);
		slot.accept(EffectReturn::pending(async move { Some(cleanup) }), &spawner);
		assert_eq!(count.get(), 0);

		slot.fire();
		assert_eq!(count.get(), 1);
		slot.fire();
		assert_eq!(count.get(), 1);
	}

	#[rstest]
	fn test_deferred_fire_before_arrival_runs_on_arrival() {
		let count = Rc::new(Cell::new(0));
		let handle = Rc::new(DeferredCleanup::new());

		handle.fire();
		assert_eq!(count.get(), 0);

		handle.arrive(Some(counting_cleanup(&count)));
		assert_eq!(count.get(), 1);

		// Late duplicate arrivals and fires stay inert.
		handle.arrive(Some(counting_cleanup(&count)));
		handle.fire();
		assert_eq!(count.get(), 1);
	}

	#[rstest]
	fn test_deferred_resolving_to_none() {
		let handle = Rc::new(DeferredCleanup::new());
		handle.fire();
		handle.arrive(None);
		handle.fire();
	}
}
