//! Convenience re-exports for component authors.
//!
//! ```
//! use statebind::prelude::*;
//! ```

pub use crate::cleanup::EffectReturn;
pub use crate::error::{BindError, StateError};
pub use crate::host::{CellSlot, EffectTiming, HostScope, IdentityToken, LocalSpawner};
pub use crate::lifecycle::{
	InstanceContext, Lifecycle, Phase, bind_instance, bind_instance_with_def, bind_mounted,
};
pub use crate::logic::{BoundLogic, Logic, LogicDef, LogicInstance, bind_logic, bind_logic_with_def};
pub use crate::methods::{BoundMethods, Methods, MethodsDef, MethodsInstance, bind_methods};
pub use crate::rerender::{Rerender, bind_rerender};
pub use crate::state::{InitialState, StateContainer, bind_state, bind_state_with};
pub use crate::value::{HookValues, StateValue};
