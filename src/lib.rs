//! Statebind - class-based state and lifecycle bindings for reactive hosts
//!
//! A binding layer that lets component state be authored as a plain set of
//! named values while each value independently participates in a host
//! renderer's fine-grained reactivity, and wraps per-instance lifecycle
//! callbacks plus a development-mode hot-reload migration protocol.
//!
//! ## Features
//!
//! - **Per-key reactive cells**: each named state value is bound to its own
//!   host cell, so consumers unaffected by a key are never re-rendered for it
//! - **Persistent instances**: class-like logic values survive across renders
//!   with stable object identity, while `props`/`state`/`hooks` refresh every
//!   cycle
//! - **Declarative lifecycle**: `before_mount`/`on_mount`/`before_render`/
//!   `on_render`/`clean_up` mapped onto the host's effect primitives, with
//!   async cleanups that survive the unmount race
//! - **Hot reload**: development hosts can swap a live instance's class
//!   definition in place without remounting the subtree
//! - **Host agnostic**: everything is driven through the [`HostScope`] trait;
//!   no renderer, no diffing, no scheduler of its own
//!
//! ## Architecture
//!
//! - [`host`]: the [`HostScope`] contract (cells, effects, identity)
//! - [`state`]: [`StateContainer`] and the `bind_state` entry points
//! - [`logic`]: the [`Logic`] trait and persistent [`LogicInstance`] wrapper
//! - [`lifecycle`]: the [`Lifecycle`] trait and mount/render/unmount machine
//! - [`methods`]: the lighter [`Methods`] binding without an owned container
//! - [`rerender`]: manual re-render triggering
//! - `hmr`: the development-mode hot-reload migrator (`hmr` feature)
//! - [`testing`]: a deterministic host harness for tests
//!
//! ## Example
//!
//! ```no_run
//! use statebind::{bind_instance, EffectReturn, HostScope, InitialState};
//! use statebind::{InstanceContext, Lifecycle, Logic};
//!
//! #[derive(Default)]
//! struct Clock;
//!
//! impl Logic for Clock {
//!     type Props = String;
//!
//!     fn create() -> Self {
//!         Self::default()
//!     }
//!
//!     fn initial_state(&self, _props: &String) -> InitialState {
//!         InitialState::new().with("ticks", 0_u64)
//!     }
//! }
//!
//! impl Lifecycle for Clock {
//!     fn on_mount(&mut self, ctx: InstanceContext<'_, String>) -> EffectReturn {
//!         let ticks = ctx.state.get_as::<u64>("ticks").unwrap_or_default();
//!         let _ = ctx.state.set("ticks", ticks + 1);
//!         EffectReturn::cleanup(|| { /* drop timers, sockets, ... */ })
//!     }
//! }
//!
//! fn view(scope: &mut dyn HostScope) -> Result<(), statebind::BindError> {
//!     let clock = bind_instance::<Clock>(scope, String::from("utc"))?;
//!     let _ticks = clock.borrow().state().get_as::<u64>("ticks");
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

// Core modules
pub mod cleanup;
pub mod error;
pub mod host;
pub mod lifecycle;
pub mod logic;
mod logging;
pub mod methods;
pub mod rerender;
pub mod state;
pub mod value;

// Cross-render persistence (arena + index; internal)
mod registry;

// Development-mode hot reload (dev servers; excluded from production builds)
#[cfg(feature = "hmr")]
mod hmr;

// Testing utilities (deterministic host harness)
pub mod testing;

// Unified prelude for simplified imports
pub mod prelude;

// Re-export commonly used types
pub use cleanup::EffectReturn;
pub use error::{BindError, StateError};
#[cfg(feature = "hmr")]
pub use error::MigrationError;
pub use host::{
	CellInit, CellSlot, CleanupFn, EffectCallback, EffectTiming, HostScope, IdentityToken,
	LocalSpawner,
};
pub use lifecycle::{
	InstanceContext, Lifecycle, Phase, bind_instance, bind_instance_with_def, bind_mounted,
	phase_of,
};
pub use logic::{
	BoundLogic, DefToken, Logic, LogicDef, LogicInstance, bind_logic, bind_logic_with_def,
};
pub use methods::{
	BoundMethods, Methods, MethodsDef, MethodsInstance, bind_methods, bind_methods_with_def,
};
pub use rerender::{Rerender, bind_rerender};
pub use state::{InitialState, RESERVED_KEYS, StateContainer, bind_state, bind_state_with};
pub use value::{HookValues, StateValue};

// Logging macros are exported via #[macro_export]: debug_log!, info_log!,
// warn_log!, error_log!.
