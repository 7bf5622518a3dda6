//! The identity registry: stable identity -> persistent instance.
//!
//! Cross-render persistence is an explicit map rather than a host idiom:
//! entries are created on first bind, looked up on every subsequent bind, and
//! retired exactly once when the identity unmounts. Retirement is terminal;
//! a retired identity can never be bound again.
//!
//! The registry is thread local. The whole layer runs on the host's single
//! render thread, so there is one logical writer and no locking.

use std::any::Any;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::host::IdentityToken;
use crate::lifecycle::LifecycleState;
use crate::logic::DefToken;

#[cfg(feature = "hmr")]
use crate::hmr::MigrationSource;

/// One identity's persistent record.
pub(crate) struct Entry {
	/// The live instance, as `Rc<RefCell<LogicInstance<L>>>` behind `Any`.
	pub(crate) instance: Rc<dyn Any>,
	/// Type-erased migration access to the same instance.
	#[cfg(feature = "hmr")]
	pub(crate) source: Rc<dyn MigrationSource>,
	/// Token of the class definition that built `instance`.
	pub(crate) def_token: DefToken,
	/// Type name of the bound class, for diagnostics.
	pub(crate) type_name: &'static str,
	/// Lifecycle bookkeeping, present once the identity was bound through
	/// `bind_instance`.
	pub(crate) lifecycle: Option<Rc<LifecycleState>>,
}

#[derive(Default)]
pub(crate) struct Registry {
	entries: HashMap<IdentityToken, Entry>,
	retired: HashSet<IdentityToken>,
}

impl Registry {
	pub(crate) fn entry(&self, identity: IdentityToken) -> Option<&Entry> {
		self.entries.get(&identity)
	}

	pub(crate) fn entry_mut(&mut self, identity: IdentityToken) -> Option<&mut Entry> {
		self.entries.get_mut(&identity)
	}

	pub(crate) fn insert(&mut self, identity: IdentityToken, entry: Entry) {
		self.entries.insert(identity, entry);
	}

	pub(crate) fn is_retired(&self, identity: IdentityToken) -> bool {
		self.retired.contains(&identity)
	}

	/// Drops the identity's entry and marks it terminally unmounted.
	pub(crate) fn retire(&mut self, identity: IdentityToken) -> Option<Entry> {
		self.retired.insert(identity);
		self.entries.remove(&identity)
	}

	pub(crate) fn clear(&mut self) {
		self.entries.clear();
		self.retired.clear();
	}
}

thread_local! {
	static REGISTRY: RefCell<Registry> = RefCell::new(Registry::default());
}

/// Runs `f` with the registry borrowed.
///
/// Keep the closure small: user code (constructors, hooks, callbacks) must
/// never run while the registry is borrowed, or a nested bind would panic on
/// re-entry.
pub(crate) fn with<R>(f: impl FnOnce(&mut Registry) -> R) -> R {
	REGISTRY.with(|registry| f(&mut registry.borrow_mut()))
}

/// Retires `identity`, dropping its entry.
pub(crate) fn retire(identity: IdentityToken) {
	with(|registry| {
		registry.retire(identity);
	});
}

/// Clears entries and retirement marks. Test isolation only.
pub(crate) fn reset() {
	with(Registry::clear);
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serial_test::serial;

	#[cfg(feature = "hmr")]
	struct InertSource;

	#[cfg(feature = "hmr")]
	impl MigrationSource for InertSource {
		fn preserve_keys(&self) -> Vec<String> {
			Vec::new()
		}

		fn read_member(&self, _key: &str) -> Option<crate::value::StateValue> {
			None
		}

		fn clone_state(&self) -> crate::state::StateContainer {
			crate::state::StateContainer::new(crate::state::InitialState::new())
				.unwrap_or_else(|_| unreachable!("empty spec has no reserved keys"))
		}

		fn clone_hooks(&self) -> crate::value::HookValues {
			crate::value::HookValues::new()
		}

		fn outgoing_any(&self) -> Rc<dyn Any> {
			Rc::new(())
		}

		fn class_name(&self) -> &'static str {
			"InertSource"
		}
	}

	fn dummy_entry() -> Entry {
		let instance: Rc<dyn Any> = Rc::new(());
		Entry {
			instance,
			#[cfg(feature = "hmr")]
			source: Rc::new(InertSource),
			def_token: DefToken::of::<()>(),
			type_name: "()",
			lifecycle: None,
		}
	}

	#[rstest]
	#[serial]
	fn test_retire_is_terminal() {
		reset();
		let id = IdentityToken::from_raw(900);

		with(|reg| reg.insert(id, dummy_entry()));
		assert!(with(|reg| reg.entry(id).is_some()));

		retire(id);
		assert!(with(|reg| reg.entry(id).is_none()));
		assert!(with(|reg| reg.is_retired(id)));
	}

	#[rstest]
	#[serial]
	fn test_reset_clears_retirement() {
		reset();
		let id = IdentityToken::from_raw(901);

		retire(id);
		assert!(with(|reg| reg.is_retired(id)));

		reset();
		assert!(!with(|reg| reg.is_retired(id)));
		assert!(with(|reg| reg.entry(id).is_none()));
	}
}
