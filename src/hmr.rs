//! The hot-reload migrator. Development mode only (`hmr` feature).
//!
//! When a development host detects that the class definition bound to a live
//! identity changed, the bind routes through [`migrate`]: the new class is
//! instantiated, `state`/`props`/`hooks` plus every member in the outgoing
//! instance's preserve list are carried over, the incoming instance's
//! migration hook runs once with the outgoing one, and the registry entry is
//! swapped atomically. The host keeps the same mounted node, so unrelated
//! native reactive state is not reset by a subtree remount.
//!
//! The outgoing object itself is never mutated or aliased; stale handles
//! keep observing the old instance until they are dropped. Migration errors
//! propagate through the failed bind, which is the host's development error
//! surface.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{BindError, MigrationError};
use crate::host::IdentityToken;
use crate::logic::{BoundLogic, Logic, LogicDef, LogicInstance};
use crate::methods::{CellEntry, Methods, MethodsDef, swap_access};
use crate::registry::{self, Entry};
use crate::state::StateContainer;
use crate::value::{HookValues, StateValue};

/// Type-erased read access to an outgoing instance, so a migration can copy
/// from it without naming its concrete class. This is the only place one
/// instance is permitted to read another, and only during the single
/// synchronous migration step.
pub(crate) trait MigrationSource {
	/// The outgoing instance's preserve list.
	fn preserve_keys(&self) -> Vec<String>;
	/// Reads one preserved member by name.
	fn read_member(&self, key: &str) -> Option<StateValue>;
	/// The state container, shared with the live host cells.
	fn clone_state(&self) -> StateContainer;
	/// The latest hooks record.
	fn clone_hooks(&self) -> HookValues;
	/// The outgoing instance as `Rc<dyn Any>`, for the migration hook.
	fn outgoing_any(&self) -> Rc<dyn Any>;
	/// Type name of the outgoing class, for diagnostics.
	fn class_name(&self) -> &'static str;
}

pub(crate) struct SourceHandle<L: Logic> {
	inner: BoundLogic<L>,
}

impl<L: Logic> SourceHandle<L> {
	pub(crate) fn new(inner: BoundLogic<L>) -> Self {
		Self { inner }
	}
}

impl<L: Logic> MigrationSource for SourceHandle<L> {
	fn preserve_keys(&self) -> Vec<String> {
		self.inner.borrow().logic().hmr_preserve_keys()
	}

	fn read_member(&self, key: &str) -> Option<StateValue> {
		self.inner.borrow().logic().hmr_read(key)
	}

	fn clone_state(&self) -> StateContainer {
		self.inner.borrow().state().clone()
	}

	fn clone_hooks(&self) -> HookValues {
		self.inner.borrow().hooks().clone()
	}

	fn outgoing_any(&self) -> Rc<dyn Any> {
		self.inner.clone()
	}

	fn class_name(&self) -> &'static str {
		std::any::type_name::<L>()
	}
}

/// Replaces the instance bound to `identity` with a fresh one built from
/// `def`, carrying over preserved members plus `state`/`props`/`hooks`.
///
/// Lifecycle bookkeeping survives the swap: outstanding effect cleanups
/// still run at unmount, and `clean_up` is dispatched to whichever instance
/// is live by then.
pub(crate) fn migrate<L: Logic>(
	identity: IdentityToken,
	def: LogicDef<L>,
	props: &L::Props,
) -> Result<BoundLogic<L>, BindError> {
	let Some((source, lifecycle)) = registry::with(|reg| {
		reg.entry(identity)
			.map(|entry| (Rc::clone(&entry.source), entry.lifecycle.clone()))
	}) else {
		return Err(BindError::IdentityRetired { identity });
	};

	crate::info_log!(
		"hot reload: {identity} rebinding {} as {}",
		source.class_name(),
		std::any::type_name::<L>()
	);

	let mut logic = def.construct();
	let state = source.clone_state();
	let hooks = source.clone_hooks();

	for key in source.preserve_keys() {
		let value = source.read_member(&key).ok_or_else(|| MigrationError::PreservedKeyUnreadable {
			key: key.clone(),
			class: source.class_name(),
		})?;
		logic.hmr_write(&key, value);
	}

	let outgoing = source.outgoing_any();
	logic.on_hmr_update(outgoing.as_ref());

	let incoming: BoundLogic<L> = Rc::new(RefCell::new(LogicInstance::assemble(
		logic,
		props.clone(),
		state,
		hooks,
	)));
	let entry = Entry {
		instance: incoming.clone(),
		source: Rc::new(SourceHandle::new(incoming.clone())),
		def_token: def.token(),
		type_name: std::any::type_name::<L>(),
		lifecycle,
	};
	registry::with(|reg| reg.insert(identity, entry));
	Ok(incoming)
}

/// The methods-level counterpart of [`migrate`], swapping the instance held
/// in a call-site persistence cell. The concrete type cannot change here;
/// only the definition generation does.
pub(crate) fn migrate_methods<M: Methods>(
	cell: &Rc<RefCell<CellEntry<M>>>,
	def: MethodsDef<M>,
) -> Result<(), BindError> {
	let outgoing = Rc::clone(&swap_access::instance(&cell.borrow()));

	crate::info_log!(
		"hot reload: replacing methods instance of {}",
		std::any::type_name::<M>()
	);

	let mut methods = def.construct();
	let preserve = outgoing.borrow().methods().hmr_preserve_keys();
	for key in preserve {
		let value = outgoing
			.borrow()
			.methods()
			.hmr_read(&key)
			.ok_or_else(|| MigrationError::PreservedKeyUnreadable {
				key: key.clone(),
				class: std::any::type_name::<M>(),
			})?;
		methods.hmr_write(&key, value);
	}

	let (props, state) = {
		let guard = outgoing.borrow();
		let (_, props, state) = swap_access::parts(&guard);
		(props.clone(), state.cloned())
	};
	methods.on_hmr_update(outgoing.as_ref() as &dyn Any);

	let incoming = Rc::new(RefCell::new(swap_access::assemble(methods, props, state)));
	swap_access::replace(&mut cell.borrow_mut(), incoming, def.token());
	Ok(())
}
