//! Methods-level binding: a persistent value without an owned state container.
//!
//! The lightest of the three binding levels. A [`Methods`] implementor holds
//! plain members and methods for a component; the caller supplies the props
//! snapshot each cycle and, optionally, a [`StateContainer`] it created
//! elsewhere (typically with [`bind_state`](crate::bind_state)). The wrapper
//! persists per call site inside a host cell, not in the identity registry.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{BindError, StateError};
use crate::host::HostScope;
use crate::logic::DefToken;
use crate::state::StateContainer;
use crate::value::StateValue;

/// The authoring contract for a methods-only component helper.
pub trait Methods: 'static {
	/// The props record this component receives.
	type Props: Clone + 'static;

	/// Creates the methods value with its members at their defaults.
	fn create() -> Self
	where
		Self: Sized;

	/// Member names to copy verbatim across a hot-reload swap.
	fn hmr_preserve_keys(&self) -> Vec<String> {
		Vec::new()
	}

	/// Reads one preserved member by name for a hot-reload swap.
	fn hmr_read(&self, key: &str) -> Option<StateValue> {
		let _ = key;
		None
	}

	/// Writes one preserved member by name on the incoming instance.
	fn hmr_write(&mut self, key: &str, value: StateValue) {
		let _ = (key, value);
	}

	/// Custom migration hook, invoked exactly once on the incoming instance
	/// with the outgoing one (a `RefCell<MethodsInstance<OldClass>>`).
	fn on_hmr_update(&mut self, outgoing: &dyn Any) {
		let _ = outgoing;
	}
}

/// The persistent wrapper around a [`Methods`] value.
pub struct MethodsInstance<M: Methods> {
	methods: M,
	props: M::Props,
	state: Option<StateContainer>,
}

/// The shared handle returned from [`bind_methods`].
pub type BoundMethods<M> = Rc<RefCell<MethodsInstance<M>>>;

impl<M: Methods> MethodsInstance<M> {
	/// The author's methods value.
	pub fn methods(&self) -> &M {
		&self.methods
	}

	/// Mutable access to the author's methods value.
	pub fn methods_mut(&mut self) -> &mut M {
		&mut self.methods
	}

	/// The props snapshot from the latest bind call.
	pub fn props(&self) -> &M::Props {
		&self.props
	}

	/// The caller-supplied state container, if one was provided.
	pub fn state(&self) -> Option<&StateContainer> {
		self.state.as_ref()
	}
}

/// A class definition for a [`Methods`] type. Mirrors
/// [`LogicDef`](crate::LogicDef) for the methods-level binding.
pub struct MethodsDef<M: Methods> {
	token: DefToken,
	construct: fn() -> M,
}

impl<M: Methods> MethodsDef<M> {
	/// The build-time definition of `M`.
	pub fn of() -> Self {
		Self {
			token: DefToken::of::<M>(),
			construct: M::create,
		}
	}

	/// Hot-swap generation `version` of `M`.
	pub fn versioned(version: u64) -> Self {
		Self {
			token: DefToken::versioned::<M>(version),
			construct: M::create,
		}
	}

	/// A definition with an explicit constructor.
	pub fn with_constructor(token: DefToken, construct: fn() -> M) -> Self {
		Self { token, construct }
	}

	/// This definition's token.
	pub fn token(&self) -> DefToken {
		self.token
	}

	#[cfg(feature = "hmr")]
	pub(crate) fn construct(&self) -> M {
		(self.construct)()
	}
}

impl<M: Methods> Clone for MethodsDef<M> {
	fn clone(&self) -> Self {
		*self
	}
}

impl<M: Methods> Copy for MethodsDef<M> {}

/// What the persistence cell actually stores: the instance handle plus the
/// token of the definition that built it.
pub(crate) struct MethodsCellEntry<M: Methods> {
	instance: BoundMethods<M>,
	token: DefToken,
}

struct MethodsCell<M: Methods>(Rc<RefCell<MethodsCellEntry<M>>>);

impl<M: Methods> Clone for MethodsCell<M> {
	fn clone(&self) -> Self {
		Self(Rc::clone(&self.0))
	}
}

/// Binds the build-time definition of `M` to the current call site.
///
/// The instance is created on the first cycle and persisted in a host cell;
/// every call replaces the props snapshot wholesale and, when `state` is
/// `Some`, the state reference too.
pub fn bind_methods<M: Methods>(
	scope: &mut dyn HostScope,
	props: M::Props,
	state: Option<StateContainer>,
) -> Result<BoundMethods<M>, BindError> {
	bind_methods_with_def(scope, MethodsDef::of(), props, state)
}

/// Binds an explicit class definition to the current call site.
///
/// A token change for a live call site routes through the hot-reload
/// migrator (with the `hmr` feature) or fails the bind (without it). Unlike
/// logic instances, a methods swap cannot change the concrete type: the
/// persistence cell is typed.
pub fn bind_methods_with_def<M: Methods>(
	scope: &mut dyn HostScope,
	def: MethodsDef<M>,
	props: M::Props,
	state: Option<StateContainer>,
) -> Result<BoundMethods<M>, BindError> {
	let cell = {
		let construct = def.construct;
		let token = def.token;
		let props = props.clone();
		let state = state.clone();
		let mut init = move || {
			let instance = Rc::new(RefCell::new(MethodsInstance {
				methods: construct(),
				props: props.clone(),
				state: state.clone(),
			}));
			StateValue::new(MethodsCell(Rc::new(RefCell::new(MethodsCellEntry {
				instance,
				token,
			}))))
		};
		let slot = scope.cell(&mut init);
		slot.value().get::<MethodsCell<M>>().ok_or_else(|| StateError::CellMismatch {
			expected: "MethodsInstance",
			found: slot.value().type_name(),
		})?
	};

	if cell.0.borrow().token != def.token() {
		#[cfg(feature = "hmr")]
		crate::hmr::migrate_methods(&cell.0, def)?;
		#[cfg(not(feature = "hmr"))]
		{
			let identity = scope.identity();
			return Err(BindError::DefinitionChanged {
				identity,
				bound: std::any::type_name::<M>(),
				requested: std::any::type_name::<M>(),
			});
		}
	}

	let instance = Rc::clone(&cell.0.borrow().instance);
	{
		let mut guard = instance.borrow_mut();
		guard.props = props;
		if state.is_some() {
			guard.state = state;
		}
	}
	Ok(instance)
}

#[cfg(feature = "hmr")]
pub(crate) mod swap_access {
	//! Field access for the migrator, kept out of the public surface.

	use super::{Methods, MethodsCellEntry, MethodsInstance};

	pub(crate) fn parts<M: Methods>(instance: &MethodsInstance<M>) -> (&M, &M::Props, Option<&super::StateContainer>) {
		(&instance.methods, &instance.props, instance.state.as_ref())
	}

	pub(crate) fn instance<M: Methods>(entry: &MethodsCellEntry<M>) -> &super::BoundMethods<M> {
		&entry.instance
	}

	pub(crate) fn assemble<M: Methods>(
		methods: M,
		props: M::Props,
		state: Option<super::StateContainer>,
	) -> MethodsInstance<M> {
		MethodsInstance { methods, props, state }
	}

	pub(crate) fn replace<M: Methods>(
		entry: &mut MethodsCellEntry<M>,
		instance: super::BoundMethods<M>,
		token: super::DefToken,
	) {
		entry.instance = instance;
		entry.token = token;
	}
}

#[cfg(feature = "hmr")]
pub(crate) use MethodsCellEntry as CellEntry;
