//! Error types for state binding and instance management.
//!
//! Every variant here is an author-side programming error or a development
//! mode migration failure. Nothing is retried or recovered locally; errors
//! propagate unmodified to whatever error surface the host provides.

use thiserror::Error;

use crate::host::IdentityToken;

/// Errors raised by the state container.
#[derive(Debug, Clone, Error)]
pub enum StateError {
	/// A state key collides with a reserved container member name.
	///
	/// Raised synchronously at construction, before any cell is created.
	#[error("state key \"{key}\" is reserved by the state container; rename the key")]
	ReservedKey {
		/// The offending key.
		key: String,
	},

	/// The refreshed key set differs from the one captured at construction,
	/// in cardinality or order. Continuing would desynchronize host cell
	/// identity, so this fails fast instead.
	#[error("state key set changed across refresh cycles: captured [{captured}], current [{current}]")]
	KeyDrift {
		/// Keys captured at construction, in order.
		captured: String,
		/// Keys seen on the current cycle, in order.
		current: String,
	},

	/// A write addressed a key the container was not constructed with.
	#[error("unknown state key \"{key}\"")]
	UnknownKey {
		/// The unrecognized key.
		key: String,
	},

	/// A host cell held a value of an unexpected type. This means reactive
	/// calls were made conditionally or in a different order than on the
	/// previous cycle.
	#[error("host cell holds {found}, expected {expected}; reactive calls must run unconditionally and in a stable order")]
	CellMismatch {
		/// The type that should have been stored at this position.
		expected: &'static str,
		/// The type actually found.
		found: &'static str,
	},
}

/// Errors raised while binding logic or lifecycle instances.
#[derive(Debug, Error)]
pub enum BindError {
	/// A state container error during construction or refresh.
	#[error(transparent)]
	State(#[from] StateError),

	/// The identity finished unmounting; unmount is terminal and no further
	/// binds are legal for it.
	#[error("{identity} was unmounted; binding it again is not allowed")]
	IdentityRetired {
		/// The retired identity.
		identity: IdentityToken,
	},

	/// The identity is bound to a different class definition and no migration
	/// path is available.
	#[error("{identity} is already bound to {bound}; rebinding it as {requested} requires the hot-reload migrator")]
	DefinitionChanged {
		/// The identity being rebound.
		identity: IdentityToken,
		/// Type name of the currently bound class.
		bound: &'static str,
		/// Type name of the class the caller asked for.
		requested: &'static str,
	},

	/// A hot-reload migration failed. Development mode only.
	#[cfg(feature = "hmr")]
	#[error(transparent)]
	Migration(#[from] MigrationError),
}

/// Errors raised by the hot-reload migrator. Development mode only; this
/// surface does not exist in builds without the `hmr` feature.
#[cfg(feature = "hmr")]
#[derive(Debug, Clone, Error)]
pub enum MigrationError {
	/// A key listed in the outgoing instance's preserve list produced no
	/// value when read.
	#[error("preserved member \"{key}\" on {class} returned no value during hot reload")]
	PreservedKeyUnreadable {
		/// The preserve-list key that could not be read.
		key: String,
		/// Type name of the outgoing class.
		class: &'static str,
	},
}
