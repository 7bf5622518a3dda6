//! Lifecycle instances: mount/render/unmount callbacks over a logic binding.
//!
//! [`bind_instance`] is a superset of [`bind_logic`](crate::bind_logic) that
//! maps a declarative callback surface onto the host's effect primitives.
//! Per mounted identity the state machine is
//! `Unmounted -> Mounting -> Mounted -> Unmounting -> Unmounted (terminal)`,
//! and unmount-time cleanups run in a fixed order: the outstanding
//! `on_render` cleanup, then the outstanding `on_mount` cleanup, then
//! `clean_up`.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::cleanup::{CleanupSlot, EffectReturn};
use crate::error::BindError;
use crate::host::{CleanupFn, EffectTiming, HostScope, IdentityToken};
use crate::logic::{self, BoundLogic, Logic, LogicDef};
use crate::registry;
use crate::state::StateContainer;
use crate::value::{HookValues, StateValue};

/// The borrowed view handed to lifecycle callbacks.
pub struct InstanceContext<'a, P> {
	/// The instance's state container. Writes go through host cell setters.
	pub state: &'a StateContainer,
	/// The props snapshot of the current cycle.
	pub props: &'a P,
	/// The hooks record of the current cycle.
	pub hooks: &'a HookValues,
}

/// Lifecycle callbacks layered on top of [`Logic`].
///
/// All methods default to no-ops; authors override the ones they need.
pub trait Lifecycle: Logic {
	/// Runs synchronously on every render pass until the first commit.
	///
	/// A render pass may abort and restart before committing, so state writes
	/// here must be safe to execute multiple times per commit.
	fn before_mount(&mut self, ctx: InstanceContext<'_, Self::Props>) {
		let _ = ctx;
	}

	/// Scheduled after the commit that mounts the identity. The returned
	/// cleanup (synchronous or deferred) runs once when the identity
	/// unmounts.
	fn on_mount(&mut self, ctx: InstanceContext<'_, Self::Props>) -> EffectReturn {
		let _ = ctx;
		EffectReturn::Nothing
	}

	/// Runs synchronously on every render pass, after `before_mount` and
	/// before the instance is returned. Same restart caveat as
	/// [`before_mount`](Self::before_mount).
	fn before_render(&mut self, ctx: InstanceContext<'_, Self::Props>) {
		let _ = ctx;
	}

	/// Scheduled after every commit. The cleanup returned by the previous
	/// invocation runs before the next one is invoked (cleanup-then-effect);
	/// there is no dependency suppression, it reruns every cycle by design.
	fn on_render(&mut self, ctx: InstanceContext<'_, Self::Props>) -> EffectReturn {
		let _ = ctx;
		EffectReturn::Nothing
	}

	/// Runs while the identity unmounts, after both outstanding cleanups.
	fn clean_up(&mut self, ctx: InstanceContext<'_, Self::Props>) {
		let _ = ctx;
	}
}

/// Where a mounted identity is in its lifecycle.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
	/// Not mounted. After `Unmounting` this is terminal: the identity can
	/// never be bound again.
	Unmounted,
	/// Render passes have started but no commit has happened yet.
	Mounting,
	/// Committed and live.
	Mounted,
	/// Unmount-time cleanups are running.
	Unmounting,
}

/// Per-identity lifecycle bookkeeping, owned by the registry entry so it
/// survives hot-reload instance swaps.
pub(crate) struct LifecycleState {
	phase: Cell<Phase>,
	mount_slot: CleanupSlot,
	render_slot: CleanupSlot,
	final_hook: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl LifecycleState {
	fn new() -> Self {
		Self {
			phase: Cell::new(Phase::Mounting),
			mount_slot: CleanupSlot::new(),
			render_slot: CleanupSlot::new(),
			final_hook: RefCell::new(None),
		}
	}

	pub(crate) fn phase(&self) -> Phase {
		self.phase.get()
	}

	fn set_phase(&self, phase: Phase) {
		self.phase.set(phase);
	}

	fn set_final_hook(&self, hook: Box<dyn FnOnce()>) {
		*self.final_hook.borrow_mut() = Some(hook);
	}

	fn run_final_hook(&self) {
		let hook = self.final_hook.borrow_mut().take();
		if let Some(hook) = hook {
			hook();
		}
	}
}

/// The lifecycle phase of `identity`, if it has one.
///
/// Retired identities report the terminal [`Phase::Unmounted`]. Identities
/// bound only through [`bind_logic`](crate::bind_logic), or never bound at
/// all, report `None`.
pub fn phase_of(identity: IdentityToken) -> Option<Phase> {
	registry::with(|reg| {
		if reg.is_retired(identity) {
			return Some(Phase::Unmounted);
		}
		reg.entry(identity)
			.and_then(|entry| entry.lifecycle.as_ref())
			.map(|lifecycle| lifecycle.phase())
	})
}

/// Binds the build-time definition of `L` with lifecycle scheduling.
///
/// Everything [`bind_logic`](crate::bind_logic) guarantees, plus the
/// callback schedule of [`Lifecycle`].
pub fn bind_instance<L: Lifecycle>(
	scope: &mut dyn HostScope,
	props: L::Props,
) -> Result<BoundLogic<L>, BindError> {
	bind_instance_with_def(scope, LogicDef::of(), props)
}

/// Binds an explicit class definition with lifecycle scheduling.
pub fn bind_instance_with_def<L: Lifecycle>(
	scope: &mut dyn HostScope,
	def: LogicDef<L>,
	props: L::Props,
) -> Result<BoundLogic<L>, BindError> {
	let identity = scope.identity();
	let instance = logic::resolve_instance(scope, def, &props)?;

	let lifecycle = registry::with(|reg| {
		reg.entry_mut(identity).map(|entry| match &entry.lifecycle {
			Some(state) => Rc::clone(state),
			None => {
				let state = Rc::new(LifecycleState::new());
				entry.lifecycle = Some(Rc::clone(&state));
				state
			}
		})
	})
	.ok_or(BindError::IdentityRetired { identity })?;

	logic::refresh_instance(scope, &instance, props)?;

	// Point the unmount-time clean_up at the live instance; a hot-reload swap
	// rebinds this on its next render pass.
	{
		let hook_instance = instance.clone();
		lifecycle.set_final_hook(Box::new(move || {
			let mut guard = hook_instance.borrow_mut();
			let (logic, ctx) = guard.split_mut();
			logic.clean_up(ctx);
		}));
	}

	if lifecycle.phase() == Phase::Mounting {
		{
			let mut guard = instance.borrow_mut();
			let (logic, ctx) = guard.split_mut();
			logic.before_mount(ctx);
		}

		// Registered on every pre-commit pass; an aborted pass discards its
		// registration, and only the committing pass's callback runs.
		let effect_instance = instance.clone();
		let effect_lifecycle = Rc::clone(&lifecycle);
		let spawner = scope.spawner();
		scope.effect(
			EffectTiming::Mount,
			Box::new(move || {
				if effect_lifecycle.phase() != Phase::Mounting {
					return None;
				}
				effect_lifecycle.set_phase(Phase::Mounted);
				crate::debug_log!("{identity} mounted");

				let ret = {
					let mut guard = effect_instance.borrow_mut();
					let (logic, ctx) = guard.split_mut();
					logic.on_mount(ctx)
				};
				effect_lifecycle.mount_slot.accept(ret, &spawner);

				Some(Box::new(move || {
					effect_lifecycle.set_phase(Phase::Unmounting);
					effect_lifecycle.render_slot.fire();
					effect_lifecycle.mount_slot.fire();
					effect_lifecycle.run_final_hook();
					effect_lifecycle.set_phase(Phase::Unmounted);
					registry::retire(identity);
					crate::debug_log!("{identity} unmounted");
				}) as CleanupFn)
			}),
		);
	}

	{
		let mut guard = instance.borrow_mut();
		let (logic, ctx) = guard.split_mut();
		logic.before_render(ctx);
	}

	{
		let effect_instance = instance.clone();
		let effect_lifecycle = Rc::clone(&lifecycle);
		let spawner = scope.spawner();
		scope.effect(
			EffectTiming::Render,
			Box::new(move || {
				// Previous cycle's on_render cleanup first.
				effect_lifecycle.render_slot.fire();
				let ret = {
					let mut guard = effect_instance.borrow_mut();
					let (logic, ctx) = guard.split_mut();
					logic.on_render(ctx)
				};
				effect_lifecycle.render_slot.accept(ret, &spawner);
				None
			}),
		);
	}

	Ok(instance)
}

#[derive(Clone)]
struct MountFlag(Rc<Cell<bool>>);

/// Whether the current identity has committed its first render.
///
/// `false` during every pre-commit pass, `true` on all later passes. The
/// flag flips through interior mutability, not a cell setter, so reading it
/// never schedules a re-render by itself.
pub fn bind_mounted(scope: &mut dyn HostScope) -> Result<bool, BindError> {
	let mut init = || StateValue::new(MountFlag(Rc::new(Cell::new(false))));
	let slot = scope.cell(&mut init);
	let flag = slot.value().get::<MountFlag>().ok_or_else(|| {
		crate::error::StateError::CellMismatch {
			expected: "MountFlag",
			found: slot.value().type_name(),
		}
	})?;

	if !flag.0.get() {
		let flag = flag.clone();
		scope.effect(
			EffectTiming::Mount,
			Box::new(move || {
				flag.0.set(true);
				None
			}),
		);
	}
	Ok(flag.0.get())
}
