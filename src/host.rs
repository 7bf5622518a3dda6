//! The interface required from the host UI framework.
//!
//! statebind does not render anything itself; it consumes three primitives a
//! render-on-demand host must provide for each mounted node:
//!
//! - [`HostScope::cell`]: a per-call-site reactive cell with stable
//!   per-position identity across cycles,
//! - [`HostScope::effect`]: a callback scheduled after the cycle's commit,
//! - [`HostScope::identity`]: a token stable for the life of the node.
//!
//! A `HostScope` value represents one render cycle of one node. Cells must be
//! requested unconditionally, in identical order and count, on every cycle;
//! the host matches a call to its cell purely by position.

use std::fmt;
use std::rc::Rc;

use futures::future::LocalBoxFuture;

use crate::value::StateValue;

/// Host-assigned token identifying one mounted node.
///
/// Constant across the node's re-renders; never reused for another node while
/// this one is mounted.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct IdentityToken(u64);

impl IdentityToken {
	/// Wraps a raw host token.
	pub const fn from_raw(raw: u64) -> Self {
		Self(raw)
	}

	/// The raw token value.
	pub const fn raw(self) -> u64 {
		self.0
	}
}

impl fmt::Display for IdentityToken {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "identity #{}", self.0)
	}
}

/// When an effect callback should run relative to the node's lifetime.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EffectTiming {
	/// After the commit that mounts the node. The host retains a returned
	/// cleanup and invokes it exactly once when the node unmounts.
	Mount,
	/// After the commit of the cycle the callback was registered in.
	Render,
}

/// A cleanup handed back to the host or stored by the cleanup tracker.
pub type CleanupFn = Box<dyn FnOnce()>;

/// A post-commit callback registered through [`HostScope::effect`].
pub type EffectCallback = Box<dyn FnOnce() -> Option<CleanupFn>>;

/// Lazy initializer for a cell; only evaluated on the node's first cycle.
pub type CellInit<'a> = &'a mut dyn FnMut() -> StateValue;

/// One reactive cell as seen during one render cycle: the tracked value and
/// the setter that schedules a re-render of dependents.
///
/// Setting never mutates any local snapshot synchronously; the host is the
/// source of truth and consumers observe the new value on the next cycle.
#[derive(Clone)]
pub struct CellSlot {
	value: StateValue,
	setter: Rc<dyn Fn(StateValue)>,
}

impl CellSlot {
	/// Pairs a tracked value with its setter. Called by host implementations.
	pub fn new(value: StateValue, setter: Rc<dyn Fn(StateValue)>) -> Self {
		Self { value, setter }
	}

	/// The value tracked for the current cycle.
	pub fn value(&self) -> &StateValue {
		&self.value
	}

	/// Writes through the host setter, scheduling a re-render.
	pub fn set(&self, value: StateValue) {
		(self.setter)(value);
	}

	/// A clone of the setter, detached from the snapshot.
	pub fn setter(&self) -> Rc<dyn Fn(StateValue)> {
		Rc::clone(&self.setter)
	}
}

impl fmt::Debug for CellSlot {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CellSlot").field("value", &self.value).finish_non_exhaustive()
	}
}

/// Spawns non-`Send` futures onto the host's single render thread.
///
/// Handed out by [`HostScope::spawner`] so continuations registered during a
/// cycle can outlive the scope itself (deferred effect cleanups do).
pub trait LocalSpawner {
	/// Queues `task` for cooperative execution on the render thread.
	fn spawn_local(&self, task: LocalBoxFuture<'static, ()>);
}

/// One render cycle of one mounted node, as provided by the host.
pub trait HostScope {
	/// Requests the reactive cell at the next call position.
	///
	/// `init` is only evaluated the first time this position is seen for the
	/// node. Implementations must hand back the same underlying cell for the
	/// same position on every subsequent cycle.
	fn cell(&mut self, init: CellInit<'_>) -> CellSlot;

	/// Schedules `callback` to run after this cycle's commit.
	///
	/// A cleanup returned by a [`EffectTiming::Mount`] callback must be
	/// retained and invoked exactly once when the node unmounts. Callbacks
	/// registered during a render pass that aborts before commit are
	/// discarded.
	fn effect(&mut self, timing: EffectTiming, callback: EffectCallback);

	/// The node's stable identity token.
	fn identity(&self) -> IdentityToken;

	/// A spawner for continuations that may outlive this cycle.
	fn spawner(&self) -> Rc<dyn LocalSpawner>;
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::cell::RefCell;

	#[rstest]
	fn test_identity_token_roundtrip() {
		let token = IdentityToken::from_raw(7);
		assert_eq!(token.raw(), 7);
		assert_eq!(token, IdentityToken::from_raw(7));
		assert_eq!(token.to_string(), "identity #7");
	}

	#[rstest]
	fn test_cell_slot_set_goes_through_setter() {
		let written: Rc<RefCell<Vec<i32>>> = Rc::new(RefCell::new(Vec::new()));
		let sink = Rc::clone(&written);
		let slot = CellSlot::new(
			StateValue::new(1_i32),
			Rc::new(move |value: StateValue| {
				if let Some(n) = value.get::<i32>() {
					sink.borrow_mut().push(n);
				}
			}),
		);

		slot.set(StateValue::new(2));
		slot.set(StateValue::new(3));

		// The snapshot is untouched; only the host saw the writes.
		assert_eq!(slot.value().get::<i32>(), Some(1));
		assert_eq!(*written.borrow(), vec![2, 3]);
	}
}
