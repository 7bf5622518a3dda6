//! Logging macros for development diagnostics.
//!
//! All macros compile to no-ops in release builds, so the library adds zero
//! logging overhead in production. `debug_log!` is additionally gated behind
//! the `debug-hooks` feature, since per-cell bookkeeping output is only
//! useful when debugging the binding layer itself.
//!
//! | Macro | Debug assertions | Feature required |
//! |-------|------------------|------------------|
//! | `debug_log!` | Required | `debug-hooks` |
//! | `info_log!` | Required | None |
//! | `warn_log!` | Required | None |
//! | `error_log!` | Required | None |

/// Logs a debug message (requires `debug-hooks` feature + `debug_assertions`).
///
/// # Example
///
/// ```ignore
/// debug_log!("cell {} resynchronized: {:?}", key, value);
/// ```
#[macro_export]
#[cfg(all(debug_assertions, feature = "debug-hooks"))]
macro_rules! debug_log {
	($($arg:tt)*) => {{
		eprintln!("[DEBUG] {}", format!($($arg)*));
	}};
}

/// No-op debug_log when conditions are not met
#[macro_export]
#[cfg(not(all(debug_assertions, feature = "debug-hooks")))]
macro_rules! debug_log {
	($($arg:tt)*) => {{}};
}

/// Logs an info message (requires `debug_assertions`).
///
/// # Example
///
/// ```ignore
/// info_log!("instance migrated for {}", identity);
/// ```
#[macro_export]
#[cfg(debug_assertions)]
macro_rules! info_log {
	($($arg:tt)*) => {{
		eprintln!("[INFO] {}", format!($($arg)*));
	}};
}

/// No-op info_log in release builds
#[macro_export]
#[cfg(not(debug_assertions))]
macro_rules! info_log {
	($($arg:tt)*) => {{}};
}

/// Logs a warning message (requires `debug_assertions`).
#[macro_export]
#[cfg(debug_assertions)]
macro_rules! warn_log {
	($($arg:tt)*) => {{
		eprintln!("[WARN] {}", format!($($arg)*));
	}};
}

/// No-op warn_log in release builds
#[macro_export]
#[cfg(not(debug_assertions))]
macro_rules! warn_log {
	($($arg:tt)*) => {{}};
}

/// Logs an error message (requires `debug_assertions`).
#[macro_export]
#[cfg(debug_assertions)]
macro_rules! error_log {
	($($arg:tt)*) => {{
		eprintln!("[ERROR] {}", format!($($arg)*));
	}};
}

/// No-op error_log in release builds
#[macro_export]
#[cfg(not(debug_assertions))]
macro_rules! error_log {
	($($arg:tt)*) => {{}};
}

#[cfg(test)]
mod tests {
	use rstest::rstest;

	#[rstest]
	fn test_logging_macros_compile() {
		debug_log!("debug message: {}", 42);
		info_log!("info message: {}", "test");
		warn_log!("warning message: {:?}", vec![1, 2, 3]);
		error_log!("error message: {}", "error");
	}

	#[rstest]
	fn test_logging_macros_no_args() {
		debug_log!("simple debug");
		info_log!("simple info");
		warn_log!("simple warning");
		error_log!("simple error");
	}
}
