//! A deterministic host harness for exercising bindings in tests.
//!
//! [`TestHost`] implements the full [`HostScope`] contract on a single
//! thread with explicit control over cycles: [`render`](TestHost::render)
//! runs one pass and commits it (draining post-commit effects),
//! [`render_uncommitted`](TestHost::render_uncommitted) simulates a render
//! pass that aborts before commit, [`unmount`](TestHost::unmount) invokes
//! the retained effect cleanups, and [`run_tasks`](TestHost::run_tasks)
//! drives spawned local futures to completion or a stall.
//!
//! The harness enforces the host's cell contract: once a node has committed,
//! requesting a cell at a new position panics, because a real host would
//! have no cell identity to hand back.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use futures::future::LocalBoxFuture;
use futures::task::noop_waker;

use crate::host::{
	CellInit, CellSlot, CleanupFn, EffectCallback, EffectTiming, HostScope, IdentityToken,
	LocalSpawner,
};
use crate::value::StateValue;

/// Clears the identity registry. Call at the start of tests that assert on
/// registry-wide behavior, since the registry is thread local and the test
/// harness may reuse threads.
pub fn reset_registry() {
	crate::registry::reset();
}

struct NodeSlots {
	cells: Vec<Rc<RefCell<StateValue>>>,
	sealed: bool,
}

struct PendingEffect {
	identity: IdentityToken,
	timing: EffectTiming,
	callback: EffectCallback,
}

#[derive(Default)]
struct HostRuntime {
	nodes: HashMap<IdentityToken, NodeSlots>,
	pending: Vec<PendingEffect>,
	retained: HashMap<IdentityToken, Vec<(EffectTiming, CleanupFn)>>,
	tasks: Vec<LocalBoxFuture<'static, ()>>,
	dirty: HashSet<IdentityToken>,
}

/// A single-threaded host with manually driven render cycles.
pub struct TestHost {
	runtime: Rc<RefCell<HostRuntime>>,
}

impl Default for TestHost {
	fn default() -> Self {
		Self::new()
	}
}

impl TestHost {
	/// Creates an empty host.
	pub fn new() -> Self {
		Self {
			runtime: Rc::new(RefCell::new(HostRuntime::default())),
		}
	}

	/// Runs one render pass for `identity` and commits it, draining the
	/// post-commit effects the pass registered.
	pub fn render<R>(&self, identity: IdentityToken, pass: impl FnOnce(&mut TestScope) -> R) -> R {
		let result = self.run_pass(identity, pass);
		self.commit(identity);
		result
	}

	/// Runs one render pass that aborts before commit: its effect
	/// registrations are discarded and nothing mounts.
	pub fn render_uncommitted<R>(
		&self,
		identity: IdentityToken,
		pass: impl FnOnce(&mut TestScope) -> R,
	) -> R {
		let result = self.run_pass(identity, pass);
		self.runtime
			.borrow_mut()
			.pending
			.retain(|effect| effect.identity != identity);
		result
	}

	fn run_pass<R>(&self, identity: IdentityToken, pass: impl FnOnce(&mut TestScope) -> R) -> R {
		self.runtime.borrow_mut().dirty.remove(&identity);
		let mut scope = TestScope {
			runtime: Rc::clone(&self.runtime),
			identity,
			position: 0,
		};
		pass(&mut scope)
	}

	fn commit(&self, identity: IdentityToken) {
		{
			let mut runtime = self.runtime.borrow_mut();
			if let Some(node) = runtime.nodes.get_mut(&identity) {
				node.sealed = true;
			}
		}

		let drained: Vec<PendingEffect> = {
			let mut runtime = self.runtime.borrow_mut();
			let (ours, rest) = runtime
				.pending
				.drain(..)
				.partition(|effect| effect.identity == identity);
			runtime.pending = rest;
			ours
		};

		// Callbacks run in registration order, outside any runtime borrow so
		// they can set cells and spawn tasks.
		for effect in drained {
			let cleanup = (effect.callback)();
			if let Some(cleanup) = cleanup {
				self.runtime
					.borrow_mut()
					.retained
					.entry(effect.identity)
					.or_default()
					.push((effect.timing, cleanup));
			}
		}
	}

	/// Unmounts `identity`: invokes the retained effect cleanups
	/// (render-timed before mount-timed, each group in registration order)
	/// and drops the node's cells.
	pub fn unmount(&self, identity: IdentityToken) {
		let retained = self
			.runtime
			.borrow_mut()
			.retained
			.remove(&identity)
			.unwrap_or_default();
		let (render, mount): (Vec<_>, Vec<_>) = retained
			.into_iter()
			.partition(|(timing, _)| *timing == EffectTiming::Render);
		for (_, cleanup) in render.into_iter().chain(mount) {
			cleanup();
		}
		self.runtime.borrow_mut().nodes.remove(&identity);
	}

	/// Polls spawned local futures until they all complete or stall.
	pub fn run_tasks(&self) {
		loop {
			let mut tasks = std::mem::take(&mut self.runtime.borrow_mut().tasks);
			if tasks.is_empty() {
				return;
			}
			let waker = noop_waker();
			let mut cx = Context::from_waker(&waker);
			let mut stalled = Vec::new();
			let mut progressed = false;
			for mut task in tasks.drain(..) {
				match task.as_mut().poll(&mut cx) {
					Poll::Ready(()) => progressed = true,
					Poll::Pending => stalled.push(task),
				}
			}
			let mut runtime = self.runtime.borrow_mut();
			let spawned = !runtime.tasks.is_empty();
			let newly_spawned: Vec<_> = runtime.tasks.drain(..).collect();
			stalled.extend(newly_spawned);
			runtime.tasks = stalled;
			if !progressed && !spawned {
				return;
			}
		}
	}

	/// Whether a cell setter scheduled a re-render for `identity` since its
	/// last render pass.
	pub fn is_dirty(&self, identity: IdentityToken) -> bool {
		self.runtime.borrow().dirty.contains(&identity)
	}

	/// Number of cells recorded for `identity`.
	pub fn cell_count(&self, identity: IdentityToken) -> usize {
		self.runtime
			.borrow()
			.nodes
			.get(&identity)
			.map_or(0, |node| node.cells.len())
	}

	/// Number of cleanups the host retained for `identity`.
	pub fn retained_cleanup_count(&self, identity: IdentityToken) -> usize {
		self.runtime
			.borrow()
			.retained
			.get(&identity)
			.map_or(0, |cleanups| cleanups.len())
	}

	/// Number of spawned tasks not yet driven to completion.
	pub fn pending_task_count(&self) -> usize {
		self.runtime.borrow().tasks.len()
	}
}

/// One render cycle of one node on a [`TestHost`].
pub struct TestScope {
	runtime: Rc<RefCell<HostRuntime>>,
	identity: IdentityToken,
	position: usize,
}

impl HostScope for TestScope {
	fn cell(&mut self, init: CellInit<'_>) -> CellSlot {
		let position = self.position;
		self.position += 1;

		let existing = {
			let runtime = self.runtime.borrow();
			runtime
				.nodes
				.get(&self.identity)
				.and_then(|node| node.cells.get(position).cloned())
		};
		let cell = match existing {
			Some(cell) => cell,
			None => {
				// Author init runs outside the runtime borrow.
				let value = init();
				let cell = Rc::new(RefCell::new(value));
				let mut runtime = self.runtime.borrow_mut();
				let node = runtime.nodes.entry(self.identity).or_insert_with(|| NodeSlots {
					cells: Vec::new(),
					sealed: false,
				});
				assert!(
					!node.sealed,
					"{}: new cell requested at position {position} after first commit; reactive calls must be unconditional and identically ordered",
					self.identity
				);
				assert_eq!(
					position,
					node.cells.len(),
					"{}: cell positions requested out of order",
					self.identity
				);
				node.cells.push(Rc::clone(&cell));
				cell
			}
		};

		let value = cell.borrow().clone();
		let runtime = Rc::clone(&self.runtime);
		let identity = self.identity;
		let setter = Rc::new(move |new_value: StateValue| {
			*cell.borrow_mut() = new_value;
			runtime.borrow_mut().dirty.insert(identity);
		});
		CellSlot::new(value, setter)
	}

	fn effect(&mut self, timing: EffectTiming, callback: EffectCallback) {
		self.runtime.borrow_mut().pending.push(PendingEffect {
			identity: self.identity,
			timing,
			callback,
		});
	}

	fn identity(&self) -> IdentityToken {
		self.identity
	}

	fn spawner(&self) -> Rc<dyn LocalSpawner> {
		Rc::new(TestSpawner {
			runtime: Rc::clone(&self.runtime),
		})
	}
}

struct TestSpawner {
	runtime: Rc<RefCell<HostRuntime>>,
}

impl LocalSpawner for TestSpawner {
	fn spawn_local(&self, task: LocalBoxFuture<'static, ()>) {
		self.runtime.borrow_mut().tasks.push(task);
	}
}

#[derive(Default)]
struct GateState {
	resolved: Option<Option<CleanupFn>>,
	waker: Option<Waker>,
}

/// A manually resolved future for deferred-cleanup tests.
///
/// [`future`](Self::future) hands out the pending future; a later
/// [`resolve`](Self::resolve) completes it, after which
/// [`TestHost::run_tasks`] can drive the continuation.
#[derive(Default)]
pub struct CleanupGate {
	shared: Rc<RefCell<GateState>>,
}

impl CleanupGate {
	/// Creates an unresolved gate.
	pub fn new() -> Self {
		Self::default()
	}

	/// The future side of the gate. Pass it to
	/// [`EffectReturn::pending`](crate::EffectReturn::pending).
	pub fn future(&self) -> impl Future<Output = Option<CleanupFn>> + 'static {
		GateFuture {
			shared: Rc::clone(&self.shared),
		}
	}

	/// Resolves the gate with `cleanup`.
	pub fn resolve(&self, cleanup: Option<CleanupFn>) {
		let waker = {
			let mut state = self.shared.borrow_mut();
			state.resolved = Some(cleanup);
			state.waker.take()
		};
		if let Some(waker) = waker {
			waker.wake();
		}
	}
}

struct GateFuture {
	shared: Rc<RefCell<GateState>>,
}

impl Future for GateFuture {
	type Output = Option<CleanupFn>;

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		let mut state = self.shared.borrow_mut();
		match state.resolved.take() {
			Some(cleanup) => Poll::Ready(cleanup),
			None => {
				state.waker = Some(cx.waker().clone());
				Poll::Pending
			}
		}
	}
}
