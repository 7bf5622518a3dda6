//! Dynamically typed values crossing the host boundary.
//!
//! State cells, hook records, and hot-reload member copies all carry values
//! whose concrete types only the component author knows. [`StateValue`] is the
//! cheaply cloneable wrapper used for all of them: an `Rc<dyn Any>` plus the
//! captured type name for diagnostics, with explicit typed accessors instead
//! of any runtime property interception.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// A shared, dynamically typed value.
///
/// Cloning is cheap (reference counted). Values are immutable once wrapped;
/// replacing a state entry always goes through the owning cell's setter.
///
/// # Example
///
/// ```
/// use statebind::StateValue;
///
/// let value = StateValue::new(42_i32);
/// assert_eq!(value.get::<i32>(), Some(42));
/// assert_eq!(value.get::<String>(), None);
/// ```
#[derive(Clone)]
pub struct StateValue {
	value: Rc<dyn Any>,
	type_name: &'static str,
}

impl StateValue {
	/// Wraps a value.
	pub fn new<T: 'static>(value: T) -> Self {
		Self {
			value: Rc::new(value),
			type_name: std::any::type_name::<T>(),
		}
	}

	/// Borrows the wrapped value if it has type `T`.
	pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
		self.value.downcast_ref()
	}

	/// Clones the wrapped value out if it has type `T`.
	pub fn get<T: Clone + 'static>(&self) -> Option<T> {
		self.downcast_ref::<T>().cloned()
	}

	/// Returns `true` if the wrapped value has type `T`.
	pub fn is<T: 'static>(&self) -> bool {
		self.value.is::<T>()
	}

	/// The type name captured when the value was wrapped. Diagnostic only.
	pub fn type_name(&self) -> &'static str {
		self.type_name
	}

	/// Returns `true` if both handles point at the same allocation.
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.value, &other.value)
	}
}

impl fmt::Debug for StateValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "StateValue<{}>", self.type_name)
	}
}

/// The record returned by [`Logic::use_hooks`](crate::Logic::use_hooks).
///
/// Holds the latest values a component derived from host reactive primitives,
/// keyed by name. Rebuilt from scratch on every render cycle.
#[derive(Clone, Debug, Default)]
pub struct HookValues {
	entries: BTreeMap<String, StateValue>,
}

impl HookValues {
	/// Creates an empty record.
	pub fn new() -> Self {
		Self::default()
	}

	/// Builder-style insert.
	pub fn with<T: 'static>(mut self, key: impl Into<String>, value: T) -> Self {
		self.insert(key, value);
		self
	}

	/// Inserts a value under `key`, replacing any previous entry.
	pub fn insert<T: 'static>(&mut self, key: impl Into<String>, value: T) {
		self.insert_value(key, StateValue::new(value));
	}

	/// Inserts an already wrapped value under `key`.
	pub fn insert_value(&mut self, key: impl Into<String>, value: StateValue) {
		self.entries.insert(key.into(), value);
	}

	/// Clones the value under `key` out if present and of type `T`.
	pub fn get<T: Clone + 'static>(&self, key: &str) -> Option<T> {
		self.entries.get(key).and_then(StateValue::get)
	}

	/// Borrows the wrapped value under `key`.
	pub fn get_value(&self, key: &str) -> Option<&StateValue> {
		self.entries.get(key)
	}

	/// Iterates entries in key order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &StateValue)> {
		self.entries.iter().map(|(k, v)| (k.as_str(), v))
	}

	/// Number of entries.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Returns `true` when the record has no entries.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}
