//! Integration tests for state container binding.
//!
//! These exercise the container through full host cycles:
//! 1. N distinct keys yield exactly N gettable/settable entries
//! 2. Reserved keys fail construction before any cell exists
//! 3. Writes become visible on the next refresh cycle, per-key independent
//! 4. Key-set drift across cycles fails fast

use statebind::testing::TestHost;
use statebind::{
	BindError, IdentityToken, InitialState, StateError, StateValue, bind_state, bind_state_with,
};

fn profile_state() -> InitialState {
	InitialState::new()
		.with("name", String::from("ada"))
		.with("age", 36_u32)
		.with("active", true)
}

#[test]
fn test_container_exposes_exactly_the_given_keys() {
	let host = TestHost::new();
	let id = IdentityToken::from_raw(100);

	let state = host.render(id, |scope| bind_state(scope, profile_state()).unwrap());

	assert_eq!(state.len(), 3);
	assert_eq!(state.keys().collect::<Vec<_>>(), vec!["name", "age", "active"]);
	assert_eq!(state.get_as::<String>("name"), Some(String::from("ada")));
	assert_eq!(state.get_as::<u32>("age"), Some(36));
	assert_eq!(state.get_as::<bool>("active"), Some(true));
	assert!(state.get("missing").is_none());
}

#[test]
fn test_initial_state_deep_equals_input_on_repeated_calls() {
	let host = TestHost::new();
	let id = IdentityToken::from_raw(101);

	let state = host.render(id, |scope| bind_state(scope, profile_state()).unwrap());
	state.set("age", 99_u32).unwrap();

	let state = host.render(id, |scope| bind_state(scope, profile_state()).unwrap());
	for snapshot in [state.initial_state(), state.initial_state()] {
		assert_eq!(snapshot.keys().collect::<Vec<_>>(), vec!["name", "age", "active"]);
		// Still the construction-time values, not the live ones.
		assert_eq!(snapshot.get("age").unwrap().get::<u32>(), Some(36));
	}
}

#[test]
fn test_set_then_cycle_roundtrip() {
	let host = TestHost::new();
	let id = IdentityToken::from_raw(102);

	let state = host.render(id, |scope| bind_state(scope, profile_state()).unwrap());
	state.set("name", String::from("grace")).unwrap();

	let state = host.render(id, |scope| bind_state(scope, profile_state()).unwrap());
	assert_eq!(state.get_as::<String>("name"), Some(String::from("grace")));
	// Untouched keys keep their values.
	assert_eq!(state.get_as::<u32>("age"), Some(36));
}

#[test]
fn test_put_many_is_order_independent() {
	let host = TestHost::new();
	let id_forward = IdentityToken::from_raw(103);
	let id_reverse = IdentityToken::from_raw(104);

	let forward = host.render(id_forward, |scope| bind_state(scope, profile_state()).unwrap());
	forward
		.put_many([
			("age", StateValue::new(1_u32)),
			("active", StateValue::new(false)),
		])
		.unwrap();

	let reverse = host.render(id_reverse, |scope| bind_state(scope, profile_state()).unwrap());
	reverse
		.put_many([
			("active", StateValue::new(false)),
			("age", StateValue::new(1_u32)),
		])
		.unwrap();

	let forward = host.render(id_forward, |scope| bind_state(scope, profile_state()).unwrap());
	let reverse = host.render(id_reverse, |scope| bind_state(scope, profile_state()).unwrap());
	assert_eq!(forward.get_as::<u32>("age"), reverse.get_as::<u32>("age"));
	assert_eq!(forward.get_as::<bool>("active"), reverse.get_as::<bool>("active"));
}

#[test]
fn test_reserved_key_fails_with_zero_cells() {
	let host = TestHost::new();
	let id = IdentityToken::from_raw(105);

	let result = host.render(id, |scope| {
		bind_state(scope, InitialState::new().with("count", 1_i32).with("set", 2_i32))
	});

	assert!(matches!(
		result,
		Err(BindError::State(StateError::ReservedKey { ref key })) if key == "set"
	));
	// Only the persistence cell itself was requested; no per-key cells.
	assert_eq!(host.cell_count(id), 1);
}

#[test]
fn test_setter_schedules_rerender() {
	let host = TestHost::new();
	let id = IdentityToken::from_raw(106);

	let state = host.render(id, |scope| bind_state(scope, profile_state()).unwrap());
	assert!(!host.is_dirty(id));

	state.set("active", false).unwrap();
	assert!(host.is_dirty(id));
}

#[test]
fn test_drift_fails_before_per_key_cells_are_touched() {
	let host = TestHost::new();
	let id = IdentityToken::from_raw(107);

	host.render(id, |scope| bind_state(scope, profile_state()).unwrap());
	let cells_after_first = host.cell_count(id);

	let shrunk = InitialState::new().with("name", String::from("ada"));
	let result = host.render(id, |scope| bind_state(scope, shrunk));

	assert!(matches!(
		result,
		Err(BindError::State(StateError::KeyDrift { .. }))
	));
	assert_eq!(host.cell_count(id), cells_after_first);
}

#[test]
fn test_initializer_form_receives_no_drift_checks() {
	let host = TestHost::new();
	let id = IdentityToken::from_raw(108);

	// The initializer only runs once, so later cycles cannot drift even if
	// the closure would have produced different keys.
	let mut generation = 0_u32;
	for _ in 0..3 {
		generation += 1;
		let state = host.render(id, |scope| {
			bind_state_with(scope, || {
				InitialState::new().with(format!("key_{generation}"), generation)
			})
			.unwrap()
		});
		assert_eq!(state.keys().collect::<Vec<_>>(), vec!["key_1"]);
	}
}

#[test]
fn test_containers_on_distinct_identities_are_independent() {
	let host = TestHost::new();
	let id_a = IdentityToken::from_raw(109);
	let id_b = IdentityToken::from_raw(110);

	let a = host.render(id_a, |scope| bind_state(scope, profile_state()).unwrap());
	host.render(id_b, |scope| bind_state(scope, profile_state()).unwrap());

	a.set("age", 1_u32).unwrap();

	let a = host.render(id_a, |scope| bind_state(scope, profile_state()).unwrap());
	let b = host.render(id_b, |scope| bind_state(scope, profile_state()).unwrap());
	assert_eq!(a.get_as::<u32>("age"), Some(1));
	assert_eq!(b.get_as::<u32>("age"), Some(36));
}
