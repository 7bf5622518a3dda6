//! Manual re-render triggering.
//!
//! Most updates flow through state cells. For the rare case where a
//! component must re-render without any named state changing (the classic
//! `force_update`), [`bind_rerender`] binds a dedicated counter cell whose
//! only job is to schedule a new cycle when bumped.

use crate::error::{BindError, StateError};
use crate::host::{CellSlot, HostScope};
use crate::value::StateValue;

/// A cloneable handle that schedules a re-render of the owning identity.
#[derive(Clone, Debug)]
pub struct Rerender {
	slot: CellSlot,
	current: u64,
}

impl Rerender {
	/// Schedules a re-render by bumping the backing counter cell.
	///
	/// Safe to call from effects or event handlers; calling it multiple
	/// times within one cycle coalesces into however many cycles the host
	/// chooses to run.
	pub fn trigger(&self) {
		self.slot.set(StateValue::new(self.current.wrapping_add(1)));
	}
}

/// Binds the re-render counter for the current call site.
pub fn bind_rerender(scope: &mut dyn HostScope) -> Result<Rerender, BindError> {
	let mut init = || StateValue::new(0_u64);
	let slot = scope.cell(&mut init);
	let current = slot.value().get::<u64>().ok_or_else(|| StateError::CellMismatch {
		expected: "u64",
		found: slot.value().type_name(),
	})?;
	Ok(Rerender { slot, current })
}
