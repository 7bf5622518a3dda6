//! Integration tests for the lifecycle instance machinery.
//!
//! These drive full mount/render/unmount sequences through the test host:
//! 1. Callback ordering within and across cycles
//! 2. The fixed unmount order: onRender cleanup, onMount cleanup, clean_up
//! 3. Deferred cleanups racing unmount still run exactly once
//! 4. Instance identity and props refresh across renders

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serial_test::serial;
use statebind::testing::{self, CleanupGate, TestHost};
use statebind::{
	BindError, EffectReturn, IdentityToken, InitialState, InstanceContext, Lifecycle, Logic,
	Phase, bind_instance, bind_mounted, bind_rerender, phase_of,
};

/// Shared scratchpad the fixture components log into.
#[derive(Default)]
struct Probe {
	events: RefCell<Vec<String>>,
	mount_cleanups: Cell<u32>,
	render_cleanups: Cell<u32>,
}

impl Probe {
	fn push(&self, event: impl Into<String>) {
		self.events.borrow_mut().push(event.into());
	}

	fn events(&self) -> Vec<String> {
		self.events.borrow().clone()
	}
}

type SharedProbe = Rc<Probe>;

#[derive(Default)]
struct Tracker;

impl Logic for Tracker {
	type Props = SharedProbe;

	fn create() -> Self {
		Self
	}

	fn initial_state(&self, _props: &SharedProbe) -> InitialState {
		InitialState::new().with("renders", 0_u32)
	}
}

impl Lifecycle for Tracker {
	fn before_mount(&mut self, ctx: InstanceContext<'_, SharedProbe>) {
		ctx.props.push("before_mount");
	}

	fn on_mount(&mut self, ctx: InstanceContext<'_, SharedProbe>) -> EffectReturn {
		ctx.props.push("on_mount");
		let probe = Rc::clone(ctx.props);
		EffectReturn::cleanup(move || {
			probe.push("C1");
			probe.mount_cleanups.set(probe.mount_cleanups.get() + 1);
		})
	}

	fn before_render(&mut self, ctx: InstanceContext<'_, SharedProbe>) {
		ctx.props.push("before_render");
	}

	fn on_render(&mut self, ctx: InstanceContext<'_, SharedProbe>) -> EffectReturn {
		ctx.props.push("on_render");
		let probe = Rc::clone(ctx.props);
		EffectReturn::cleanup(move || {
			probe.push("C2");
			probe.render_cleanups.set(probe.render_cleanups.get() + 1);
		})
	}

	fn clean_up(&mut self, ctx: InstanceContext<'_, SharedProbe>) {
		ctx.props.push("clean_up");
	}
}

fn mount_tracker(host: &TestHost, id: IdentityToken, probe: &SharedProbe) {
	host.render(id, {
		let probe = Rc::clone(probe);
		move |scope| bind_instance::<Tracker>(scope, probe).unwrap()
	});
}

/// Scenario from the contract: mount X, onMount yields C1, a later render's
/// onRender yields C2, unmount runs C2, C1, clean_up, each exactly once.
#[test]
#[serial]
fn test_unmount_runs_cleanups_in_fixed_order_exactly_once() {
	testing::reset_registry();
	let host = TestHost::new();
	let id = IdentityToken::from_raw(200);
	let probe: SharedProbe = Rc::default();

	mount_tracker(&host, id, &probe);
	mount_tracker(&host, id, &probe);
	probe.events.borrow_mut().clear();

	host.unmount(id);

	assert_eq!(probe.events(), vec!["C2", "C1", "clean_up"]);
	assert_eq!(probe.mount_cleanups.get(), 1);
	// First render's C2 ran during the second render; the second render's C2
	// ran at unmount.
	assert_eq!(probe.render_cleanups.get(), 2);
	assert_eq!(phase_of(id), Some(Phase::Unmounted));
}

#[test]
#[serial]
fn test_full_event_sequence_over_two_cycles() {
	testing::reset_registry();
	let host = TestHost::new();
	let id = IdentityToken::from_raw(201);
	let probe: SharedProbe = Rc::default();

	mount_tracker(&host, id, &probe);
	mount_tracker(&host, id, &probe);

	assert_eq!(
		probe.events(),
		vec![
			"before_mount",
			"before_render",
			"on_mount",
			"on_render",
			"before_render",
			"C2",
			"on_render",
		]
	);
}

#[test]
#[serial]
fn test_phase_progression() {
	testing::reset_registry();
	let host = TestHost::new();
	let id = IdentityToken::from_raw(202);
	let probe: SharedProbe = Rc::default();

	assert_eq!(phase_of(id), None);

	host.render_uncommitted(id, {
		let probe = Rc::clone(&probe);
		move |scope| bind_instance::<Tracker>(scope, probe).unwrap()
	});
	assert_eq!(phase_of(id), Some(Phase::Mounting));

	mount_tracker(&host, id, &probe);
	assert_eq!(phase_of(id), Some(Phase::Mounted));

	host.unmount(id);
	assert_eq!(phase_of(id), Some(Phase::Unmounted));

	// Terminal: rebinding the retired identity is rejected.
	let result = host.render(id, {
		let probe = Rc::clone(&probe);
		move |scope| bind_instance::<Tracker>(scope, probe)
	});
	assert!(matches!(result, Err(BindError::IdentityRetired { .. })));
}

/// A component whose on_mount cleanup arrives asynchronously.
struct AsyncKit {
	gate: CleanupGate,
	cleanups: Cell<u32>,
}

type SharedKit = Rc<AsyncKit>;

#[derive(Default)]
struct AsyncMount;

impl Logic for AsyncMount {
	type Props = SharedKit;

	fn create() -> Self {
		Self
	}

	fn initial_state(&self, _props: &SharedKit) -> InitialState {
		InitialState::new()
	}
}

impl Lifecycle for AsyncMount {
	fn on_mount(&mut self, ctx: InstanceContext<'_, SharedKit>) -> EffectReturn {
		EffectReturn::pending(ctx.props.gate.future())
	}
}

#[test]
#[serial]
fn test_async_cleanup_resolving_after_unmount_still_runs_once() {
	testing::reset_registry();
	let host = TestHost::new();
	let id = IdentityToken::from_raw(203);
	let kit: SharedKit = Rc::new(AsyncKit {
		gate: CleanupGate::new(),
		cleanups: Cell::new(0),
	});

	host.render(id, {
		let kit = Rc::clone(&kit);
		move |scope| bind_instance::<AsyncMount>(scope, kit).unwrap()
	});
	host.run_tasks();

	// Unmount before the cleanup future resolves.
	host.unmount(id);
	assert_eq!(kit.cleanups.get(), 0);

	let counter = Rc::clone(&kit);
	kit.gate.resolve(Some(Box::new(move || {
		counter.cleanups.set(counter.cleanups.get() + 1);
	})));
	host.run_tasks();

	assert_eq!(kit.cleanups.get(), 1);

	// Nothing left to run it a second time.
	host.run_tasks();
	assert_eq!(kit.cleanups.get(), 1);
}

#[test]
#[serial]
fn test_async_cleanup_resolving_before_unmount_runs_at_unmount() {
	testing::reset_registry();
	let host = TestHost::new();
	let id = IdentityToken::from_raw(204);
	let kit: SharedKit = Rc::new(AsyncKit {
		gate: CleanupGate::new(),
		cleanups: Cell::new(0),
	});

	host.render(id, {
		let kit = Rc::clone(&kit);
		move |scope| bind_instance::<AsyncMount>(scope, kit).unwrap()
	});

	let counter = Rc::clone(&kit);
	kit.gate.resolve(Some(Box::new(move || {
		counter.cleanups.set(counter.cleanups.get() + 1);
	})));
	host.run_tasks();
	assert_eq!(kit.cleanups.get(), 0);

	host.unmount(id);
	assert_eq!(kit.cleanups.get(), 1);
}

#[test]
#[serial]
fn test_instance_identity_and_props_across_renders() {
	testing::reset_registry();
	let host = TestHost::new();
	let id = IdentityToken::from_raw(205);
	let first_probe: SharedProbe = Rc::default();
	let second_probe: SharedProbe = Rc::default();

	let first = host.render(id, {
		let probe = Rc::clone(&first_probe);
		move |scope| bind_instance::<Tracker>(scope, probe).unwrap()
	});
	let second = host.render(id, {
		let probe = Rc::clone(&second_probe);
		move |scope| bind_instance::<Tracker>(scope, probe).unwrap()
	});

	assert!(Rc::ptr_eq(&first, &second));
	// The props snapshot was replaced wholesale by the second bind.
	assert!(Rc::ptr_eq(second.borrow().props(), &second_probe));
}

#[test]
#[serial]
fn test_mounted_probe_and_rerender_handle() {
	testing::reset_registry();
	let host = TestHost::new();
	let id = IdentityToken::from_raw(206);
	let probe: SharedProbe = Rc::default();

	let (was_mounted, rerender) = host.render(id, {
		let probe = Rc::clone(&probe);
		move |scope| {
			let mounted = bind_mounted(scope).unwrap();
			let rerender = bind_rerender(scope).unwrap();
			bind_instance::<Tracker>(scope, probe).unwrap();
			(mounted, rerender)
		}
	});
	assert!(!was_mounted);

	let (was_mounted, _) = host.render(id, {
		let probe = Rc::clone(&probe);
		move |scope| {
			let mounted = bind_mounted(scope).unwrap();
			let rerender = bind_rerender(scope).unwrap();
			bind_instance::<Tracker>(scope, probe).unwrap();
			(mounted, rerender)
		}
	});
	assert!(was_mounted);

	assert!(!host.is_dirty(id));
	rerender.trigger();
	assert!(host.is_dirty(id));
}
