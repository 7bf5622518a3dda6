//! The reactive state container.
//!
//! A [`StateContainer`] binds an ordered set of named values to one host
//! reactive cell per key. The key set is fixed at construction: every refresh
//! cycle requests the per-key cells in exactly the captured order, which is
//! what lets the host match each request to the same underlying cell by
//! position. Any drift in key cardinality or order is an author error and
//! fails fast ([`StateError::KeyDrift`]); the host model cannot recover from
//! reordered cell requests.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::{BindError, StateError};
use crate::host::{CellSlot, HostScope};
use crate::value::StateValue;

/// Key names an initial-state spec may not use, because the container exposes
/// members with these names.
pub const RESERVED_KEYS: &[&str] = &[
	"get",
	"set",
	"put_many",
	"initial_state",
	"keys",
	"len",
	"is_empty",
	"refresh",
];

/// An ordered `key -> initial value` record.
///
/// Insertion order is preserved and becomes the container's cell request
/// order. Inserting an existing key replaces its value without moving it.
///
/// # Example
///
/// ```
/// use statebind::InitialState;
///
/// let initial = InitialState::new()
///     .with("count", 0_i64)
///     .with("label", String::from("idle"));
/// assert_eq!(initial.len(), 2);
/// ```
#[derive(Clone, Debug, Default)]
pub struct InitialState {
	entries: Vec<(String, StateValue)>,
}

impl InitialState {
	/// Creates an empty spec.
	pub fn new() -> Self {
		Self::default()
	}

	/// Builder-style insert.
	pub fn with<T: 'static>(mut self, key: impl Into<String>, value: T) -> Self {
		self.insert(key, value);
		self
	}

	/// Inserts `value` under `key`, wrapping it as a [`StateValue`].
	pub fn insert<T: 'static>(&mut self, key: impl Into<String>, value: T) {
		self.insert_value(key, StateValue::new(value));
	}

	/// Inserts an already wrapped value under `key`.
	pub fn insert_value(&mut self, key: impl Into<String>, value: StateValue) {
		let key = key.into();
		match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
			Some((_, slot)) => *slot = value,
			None => self.entries.push((key, value)),
		}
	}

	/// The initial value under `key`, if present.
	pub fn get(&self, key: &str) -> Option<&StateValue> {
		self.entries
			.iter()
			.find(|(existing, _)| existing == key)
			.map(|(_, value)| value)
	}

	/// Iterates keys in insertion order.
	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.entries.iter().map(|(key, _)| key.as_str())
	}

	/// Iterates entries in insertion order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &StateValue)> {
		self.entries.iter().map(|(key, value)| (key.as_str(), value))
	}

	/// Number of keys.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Returns `true` when the spec holds no keys.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

struct ContainerInner {
	/// Key order captured once at construction. The cell request order for
	/// the container's whole lifetime.
	keys: Vec<String>,
	/// Defensive copy of the construction-time spec.
	initial: InitialState,
	/// Cells synchronized on the most recent refresh cycle.
	cells: RefCell<HashMap<String, CellSlot>>,
}

/// A named value set bound to one host reactive cell per key.
///
/// Created once per owning instance and resynchronized on every render cycle
/// via [`refresh`](Self::refresh). Reads return the value synchronized on the
/// most recent cycle; writes go through the host cell setter and become
/// visible on the next cycle (the host is the source of truth).
///
/// Cloning is cheap and shares the underlying cells; this is what lets the
/// container persist inside a host cell across cycles.
#[derive(Clone)]
pub struct StateContainer {
	inner: Rc<ContainerInner>,
}

impl StateContainer {
	/// Captures the spec and validates its keys against [`RESERVED_KEYS`].
	///
	/// Fails with [`StateError::ReservedKey`] before any cell is created.
	pub fn new(initial: InitialState) -> Result<Self, StateError> {
		for key in initial.keys() {
			if RESERVED_KEYS.contains(&key) {
				return Err(StateError::ReservedKey { key: key.to_string() });
			}
		}
		let keys = initial.keys().map(str::to_string).collect();
		Ok(Self {
			inner: Rc::new(ContainerInner {
				keys,
				initial,
				cells: RefCell::new(HashMap::new()),
			}),
		})
	}

	/// Checks the current cycle's key set against the captured one.
	///
	/// Cardinality and order must both match exactly.
	pub fn verify_keys(&self, current: &InitialState) -> Result<(), StateError> {
		let captured = &self.inner.keys;
		let mismatch = captured.len() != current.len()
			|| captured.iter().zip(current.keys()).any(|(a, b)| a != b);
		if mismatch {
			return Err(StateError::KeyDrift {
				captured: captured.join(", "),
				current: current.keys().collect::<Vec<_>>().join(", "),
			});
		}
		Ok(())
	}

	/// One refresh cycle: verifies `current` against the captured key set,
	/// then requests every per-key cell in captured order.
	pub fn refresh(&self, scope: &mut dyn HostScope, current: &InitialState) -> Result<(), StateError> {
		self.verify_keys(current)?;
		self.refresh_captured(scope);
		Ok(())
	}

	/// Requests the per-key cells in captured order without a drift check.
	/// Used when the current spec is by construction the captured one.
	pub(crate) fn refresh_captured(&self, scope: &mut dyn HostScope) {
		for (key, initial) in self.inner.initial.iter() {
			let mut init = || initial.clone();
			let slot = scope.cell(&mut init);
			self.inner.cells.borrow_mut().insert(key.to_string(), slot);
		}
	}

	/// The value synchronized for `key` on the most recent refresh cycle, or
	/// the initial value if no cycle has run yet.
	pub fn get(&self, key: &str) -> Option<StateValue> {
		if let Some(slot) = self.inner.cells.borrow().get(key) {
			return Some(slot.value().clone());
		}
		self.inner.initial.get(key).cloned()
	}

	/// Typed convenience over [`get`](Self::get).
	pub fn get_as<T: Clone + 'static>(&self, key: &str) -> Option<T> {
		self.get(key).and_then(|value| value.get())
	}

	/// Writes `value` through the host setter for `key`.
	///
	/// The local snapshot is not touched; the new value is observed on the
	/// next refresh cycle.
	pub fn set<T: 'static>(&self, key: &str, value: T) -> Result<(), StateError> {
		self.set_value(key, StateValue::new(value))
	}

	/// Writes an already wrapped value through the host setter for `key`.
	pub fn set_value(&self, key: &str, value: StateValue) -> Result<(), StateError> {
		let slot = self.inner.cells.borrow().get(key).cloned();
		match slot {
			Some(slot) => {
				slot.set(value);
				Ok(())
			}
			None => Err(StateError::UnknownKey { key: key.to_string() }),
		}
	}

	/// Applies [`set_value`](Self::set_value) for each entry. Keys are
	/// independent cells, so application order carries no meaning.
	pub fn put_many<I, K>(&self, values: I) -> Result<(), StateError>
	where
		I: IntoIterator<Item = (K, StateValue)>,
		K: AsRef<str>,
	{
		for (key, value) in values {
			self.set_value(key.as_ref(), value)?;
		}
		Ok(())
	}

	/// A defensive copy of the construction-time spec.
	pub fn initial_state(&self) -> InitialState {
		self.inner.initial.clone()
	}

	/// The captured keys, in cell request order.
	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.inner.keys.iter().map(String::as_str)
	}

	/// Number of bound keys.
	pub fn len(&self) -> usize {
		self.inner.keys.len()
	}

	/// Returns `true` when the container binds no keys.
	pub fn is_empty(&self) -> bool {
		self.inner.keys.is_empty()
	}
}

impl fmt::Debug for StateContainer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("StateContainer")
			.field("keys", &self.inner.keys)
			.finish_non_exhaustive()
	}
}

/// Construction failure parked inside the persistence cell so it resurfaces
/// identically on every subsequent cycle.
struct ConstructFailure(StateError);

fn persist_container(
	scope: &mut dyn HostScope,
	construct: impl FnOnce() -> Result<StateContainer, StateError>,
) -> Result<StateContainer, BindError> {
	let mut construct = Some(construct);
	let mut init = || match construct.take() {
		Some(make) => match make() {
			Ok(container) => StateValue::new(container),
			Err(err) => StateValue::new(ConstructFailure(err)),
		},
		// A second evaluation would mean the host ignored its own lazy-init
		// contract; park a marker that fails the downcast below.
		None => StateValue::new(()),
	};
	let slot = scope.cell(&mut init);

	if let Some(failure) = slot.value().downcast_ref::<ConstructFailure>() {
		return Err(failure.0.clone().into());
	}
	slot.value().get::<StateContainer>().ok_or_else(|| {
		StateError::CellMismatch {
			expected: "StateContainer",
			found: slot.value().type_name(),
		}
		.into()
	})
}

/// Binds a state container to the current node, object form.
///
/// The container is created on the node's first cycle and persisted inside a
/// host cell; every call resynchronizes it. Because `initial` is re-supplied
/// each cycle, its key set is checked against the captured one and any drift
/// fails with [`StateError::KeyDrift`] before a single per-key cell is
/// requested.
///
/// # Example
///
/// ```no_run
/// use statebind::{bind_state, HostScope, InitialState};
///
/// fn counter(scope: &mut dyn HostScope) -> Result<(), statebind::BindError> {
///     let state = bind_state(scope, InitialState::new().with("count", 0_i64))?;
///     let count = state.get_as::<i64>("count").unwrap_or_default();
///     state.set("count", count + 1)?;
///     Ok(())
/// }
/// ```
pub fn bind_state(scope: &mut dyn HostScope, initial: InitialState) -> Result<StateContainer, BindError> {
	let container = persist_container(scope, {
		let initial = initial.clone();
		move || StateContainer::new(initial)
	})?;
	container.refresh(scope, &initial)?;
	Ok(container)
}

/// Binds a state container to the current node, initializer form.
///
/// `init` runs exactly once, on the node's first cycle; later cycles reuse
/// the captured spec, so no drift is possible by construction.
pub fn bind_state_with<F>(scope: &mut dyn HostScope, init: F) -> Result<StateContainer, BindError>
where
	F: FnOnce() -> InitialState,
{
	let container = persist_container(scope, move || StateContainer::new(init()))?;
	container.refresh_captured(scope);
	Ok(container)
}
