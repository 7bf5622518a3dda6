//! Persistent component logic bound to a host identity.
//!
//! A [`Logic`] implementor is the class-like value a component author writes:
//! plain members plus the `initial_state`/`use_hooks` contract. [`bind_logic`]
//! instantiates it exactly once per stable identity, keeps it in the identity
//! registry across renders, and refreshes its `props`/`state`/`hooks` on
//! every call.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::rc::Rc;

use crate::error::BindError;
use crate::host::HostScope;
use crate::lifecycle::InstanceContext;
use crate::registry::{self, Entry};
use crate::state::{InitialState, StateContainer};
use crate::value::{HookValues, StateValue};

/// The authoring contract for component logic.
///
/// Implementors hold whatever plain members they like; the framework supplies
/// `props`, `state` and `hooks` through the surrounding [`LogicInstance`].
///
/// `initial_state` is re-evaluated on every render cycle so its key set can
/// be checked against the captured one; it must therefore be deterministic
/// in its key set for given props.
///
/// `use_hooks` must invoke host reactive primitives unconditionally and in
/// the same relative position on every cycle, exactly like any other code
/// running under a [`HostScope`].
pub trait Logic: 'static {
	/// The props record this component receives.
	type Props: Clone + 'static;

	/// Creates the logic value with its members at their defaults.
	fn create() -> Self
	where
		Self: Sized;

	/// Returns the initial values for the component's state.
	fn initial_state(&self, props: &Self::Props) -> InitialState;

	/// Consumes host reactive primitives and exposes derived values.
	///
	/// The returned record becomes [`LogicInstance::hooks`] for this cycle.
	fn use_hooks(
		&self,
		scope: &mut dyn HostScope,
		state: &StateContainer,
		props: &Self::Props,
	) -> HookValues {
		let _ = (scope, state, props);
		HookValues::new()
	}

	/// Member names to copy verbatim across a hot-reload swap.
	///
	/// Read from the outgoing instance. Development mode only; ignored
	/// without the `hmr` feature.
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
	/// with the outgoing one (a `RefCell<LogicInstance<OldClass>>`).
	fn on_hmr_update(&mut self, outgoing: &dyn Any) {
		let _ = outgoing;
	}
}

/// The persistent wrapper around a [`Logic`] value.
///
/// Holds the author's logic value, the props snapshot (replaced wholesale
/// each render), the state container (created once), and the hooks record
/// (recomputed each render).
pub struct LogicInstance<L: Logic> {
	logic: L,
	props: L::Props,
	state: StateContainer,
	hooks: HookValues,
}

/// The shared handle returned from bind calls.
///
/// `Rc::ptr_eq` on two handles expresses the identity guarantee: binds for
/// the same stable identity return the same instance.
pub type BoundLogic<L> = Rc<RefCell<LogicInstance<L>>>;

impl<L: Logic> LogicInstance<L> {
	pub(crate) fn assemble(logic: L, props: L::Props, state: StateContainer, hooks: HookValues) -> Self {
		Self { logic, props, state, hooks }
	}

	/// The author's logic value.
	pub fn logic(&self) -> &L {
		&self.logic
	}

	/// Mutable access to the author's logic value.
	pub fn logic_mut(&mut self) -> &mut L {
		&mut self.logic
	}

	/// The props snapshot from the latest bind call.
	pub fn props(&self) -> &L::Props {
		&self.props
	}

	/// The state container.
	pub fn state(&self) -> &StateContainer {
		&self.state
	}

	/// The hooks record from the latest bind call.
	pub fn hooks(&self) -> &HookValues {
		&self.hooks
	}

	/// A borrowed view of `state`/`props`/`hooks`, as passed to lifecycle
	/// callbacks.
	pub fn context(&self) -> InstanceContext<'_, L::Props> {
		InstanceContext {
			state: &self.state,
			props: &self.props,
			hooks: &self.hooks,
		}
	}

	/// Splits the wrapper into the mutable logic value and the borrowed
	/// context, so a callback can take `&mut self` alongside its context.
	pub(crate) fn split_mut(&mut self) -> (&mut L, InstanceContext<'_, L::Props>) {
		(
			&mut self.logic,
			InstanceContext {
				state: &self.state,
				props: &self.props,
				hooks: &self.hooks,
			},
		)
	}
}

/// Identifies one class definition, including its hot-swap generation.
///
/// Two tokens compare equal only when both the concrete type and the
/// definition version match. Development hosts bump the version when they
/// hot-swap a class body without changing the type.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DefToken {
	type_id: TypeId,
	version: u64,
}

impl DefToken {
	/// The token for the build-time definition of `T`.
	pub fn of<T: 'static>() -> Self {
		Self::versioned::<T>(0)
	}

	/// A token for hot-swap generation `version` of `T`.
	pub fn versioned<T: 'static>(version: u64) -> Self {
		Self {
			type_id: TypeId::of::<T>(),
			version,
		}
	}
}

/// A class definition: how to construct the logic value, plus the token that
/// detects definition changes across binds.
pub struct LogicDef<L: Logic> {
	token: DefToken,
	construct: fn() -> L,
}

impl<L: Logic> LogicDef<L> {
	/// The build-time definition of `L`.
	pub fn of() -> Self {
		Self {
			token: DefToken::of::<L>(),
			construct: L::create,
		}
	}

	/// Hot-swap generation `version` of `L`, constructed via `L::create`.
	pub fn versioned(version: u64) -> Self {
		Self {
			token: DefToken::versioned::<L>(version),
			construct: L::create,
		}
	}

	/// A definition with an explicit constructor, for hosts that patch the
	/// constructor itself during a hot swap.
	pub fn with_constructor(token: DefToken, construct: fn() -> L) -> Self {
		Self { token, construct }
	}

	/// This definition's token.
	pub fn token(&self) -> DefToken {
		self.token
	}

	pub(crate) fn construct(&self) -> L {
		(self.construct)()
	}
}

impl<L: Logic> Clone for LogicDef<L> {
	fn clone(&self) -> Self {
		*self
	}
}

impl<L: Logic> Copy for LogicDef<L> {}

/// Binds the build-time definition of `L` to the current identity.
///
/// On the identity's first bind the class is instantiated exactly once; on
/// every bind the state container is refreshed, the props snapshot replaced,
/// and `use_hooks` re-run. The same instance handle is returned for the life
/// of the identity.
///
/// # Example
///
/// ```no_run
/// use statebind::{bind_logic, HostScope, InitialState, Logic};
///
/// #[derive(Default)]
/// struct Counter;
///
/// impl Logic for Counter {
///     type Props = i64;
///
///     fn create() -> Self {
///         Self::default()
///     }
///
///     fn initial_state(&self, step: &i64) -> InitialState {
///         InitialState::new().with("count", *step)
///     }
/// }
///
/// fn view(scope: &mut dyn HostScope) -> Result<(), statebind::BindError> {
///     let counter = bind_logic::<Counter>(scope, 1)?;
///     let count = counter.borrow().state().get_as::<i64>("count").unwrap_or_default();
///     counter.borrow().state().set("count", count + 1)?;
///     Ok(())
/// }
/// ```
pub fn bind_logic<L: Logic>(scope: &mut dyn HostScope, props: L::Props) -> Result<BoundLogic<L>, BindError> {
	bind_logic_with_def(scope, LogicDef::of(), props)
}

/// Binds an explicit class definition to the current identity.
///
/// Development hosts pass a freshly versioned [`LogicDef`] after a hot swap;
/// a token change for a live identity routes through the hot-reload migrator
/// (with the `hmr` feature) or fails the bind (without it).
pub fn bind_logic_with_def<L: Logic>(
	scope: &mut dyn HostScope,
	def: LogicDef<L>,
	props: L::Props,
) -> Result<BoundLogic<L>, BindError> {
	let instance = resolve_instance(scope, def, &props)?;
	refresh_instance(scope, &instance, props)?;
	Ok(instance)
}

/// Looks up or creates the persistent instance for the current identity,
/// routing definition changes through the migrator where available.
pub(crate) fn resolve_instance<L: Logic>(
	scope: &mut dyn HostScope,
	def: LogicDef<L>,
	props: &L::Props,
) -> Result<BoundLogic<L>, BindError> {
	let identity = scope.identity();

	if registry::with(|reg| reg.is_retired(identity)) {
		return Err(BindError::IdentityRetired { identity });
	}

	let existing = registry::with(|reg| {
		reg.entry(identity)
			.map(|entry| (entry.instance.clone(), entry.def_token, entry.type_name))
	});

	let Some((stored, stored_token, stored_name)) = existing else {
		// First bind for this identity: instantiate exactly once.
		let logic = def.construct();
		let initial = logic.initial_state(props);
		let state = StateContainer::new(initial)?;
		let instance: BoundLogic<L> = Rc::new(RefCell::new(LogicInstance::assemble(
			logic,
			props.clone(),
			state,
			HookValues::new(),
		)));
		let entry = Entry {
			instance: instance.clone(),
			#[cfg(feature = "hmr")]
			source: Rc::new(crate::hmr::SourceHandle::new(instance.clone())),
			def_token: def.token(),
			type_name: std::any::type_name::<L>(),
			lifecycle: None,
		};
		registry::with(|reg| reg.insert(identity, entry));
		return Ok(instance);
	};

	if stored_token == def.token() {
		if let Ok(instance) = stored.downcast::<RefCell<LogicInstance<L>>>() {
			return Ok(instance);
		}
		// A matching token with a mismatched type means the token was reused
		// across distinct classes; treat it as a definition change.
	}

	#[cfg(feature = "hmr")]
	{
		let _ = stored_name;
		crate::hmr::migrate(identity, def, props)
	}
	#[cfg(not(feature = "hmr"))]
	{
		Err(BindError::DefinitionChanged {
			identity,
			bound: stored_name,
			requested: std::any::type_name::<L>(),
		})
	}
}

/// One refresh cycle for a resolved instance: drift-checked state refresh,
/// wholesale props replacement, then `use_hooks`.
pub(crate) fn refresh_instance<L: Logic>(
	scope: &mut dyn HostScope,
	instance: &BoundLogic<L>,
	props: L::Props,
) -> Result<(), BindError> {
	let mut guard = instance.borrow_mut();
	let inner = &mut *guard;

	inner.props = props;
	let current = inner.logic.initial_state(&inner.props);
	inner.state.refresh(scope, &current)?;
	inner.hooks = inner.logic.use_hooks(scope, &inner.state, &inner.props);
	Ok(())
}
