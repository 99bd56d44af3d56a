//! In-memory history tests
//!
//! Exercises `History<MemoryBackend>`: navigation sequences, traversal,
//! listeners and hooks, readiness, and the async navigation API.

mod utils;

use futures::executor::block_on;
use proptest::prelude::*;
use reinhardt_history::{
	GuardOutcome, History, HistoryBackend, HistoryOptions, MemoryBackend, NavigationFailure,
	Route, RouteRecord, RouteTable, create_memory_history, deferred_guard, guard_fn,
};
use rstest::*;
use std::cell::RefCell;
use std::rc::Rc;
use utils::Outcomes;

fn routes() -> RouteTable {
	RouteTable::new()
		.route(RouteRecord::named("home", "/"))
		.route(RouteRecord::named("user", "/users/{id}"))
		.route(RouteRecord::named("login", "/login"))
}

#[fixture]
fn backend() -> MemoryBackend {
	MemoryBackend::new("/")
}

fn create(backend: &MemoryBackend) -> History<MemoryBackend> {
	History::new(backend.clone(), routes(), HistoryOptions::new())
}

// ============================================================================
// Property-Based Tests: navigation sequences
// ============================================================================

proptest! {
	/// Test: serialized navigations end on the last target
	///
	/// Category: Property
	/// Verifies that after any push/replace sequence the current route and the
	/// backend both show the last requested location.
	#[rstest]
	fn prop_last_navigation_wins(
		steps in prop::collection::vec((any::<bool>(), 0u8..5), 1..20)
	) {
		let backend = MemoryBackend::new("/");
		let history = create(&backend);

		for (push, id) in &steps {
			let target = format!("/users/{}", id);
			if *push {
				history.push(target);
			} else {
				history.replace(target);
			}
		}

		let (_, last) = steps[steps.len() - 1];
		let expected = format!("/users/{}", last);
		let route = history.current_route();
		prop_assert_eq!(route.full_path(), expected.as_str());
		prop_assert_eq!(backend.current_location(), expected);
		prop_assert!(backend.entries().len() <= steps.len() + 1);
	}

	/// Test: traversal stays inside the entry stack
	///
	/// Category: Property
	/// Verifies that arbitrary `go` offsets leave the current route equal to
	/// the backend entry under the cursor.
	#[rstest]
	fn prop_go_tracks_cursor(deltas in prop::collection::vec(-3i32..=3, 0..12)) {
		let backend = MemoryBackend::new("/");
		let history = create(&backend);
		history.replace("/");
		for id in 1..=4 {
			history.push(format!("/users/{}", id));
		}

		for delta in deltas {
			history.go(delta).unwrap();
			let route = history.current_route();
			let entries = backend.entries();
			prop_assert_eq!(
				route.full_path(),
				entries[backend.index()].as_str()
			);
		}
	}
}

// ============================================================================
// Traversal
// ============================================================================

/// Tests back and forward through pushed entries
#[rstest]
fn test_back_and_forward(backend: MemoryBackend) {
	let history = create(&backend);
	history.push("/users/1");
	history.push("/users/2");

	history.back().unwrap();
	assert_eq!(history.current_route().path(), "/users/1");
	history.back().unwrap();
	assert_eq!(history.current_route().path(), "/");
	history.back().unwrap();
	assert_eq!(history.current_route().path(), "/");
	history.forward().unwrap();
	history.forward().unwrap();
	assert_eq!(history.current_route().path(), "/users/2");
	assert_eq!(backend.write_count(), 2);
}

/// Tests that a rejected traversal pushes the current route back
#[rstest]
fn test_rejected_back_re_pushes(backend: MemoryBackend) {
	// Arrange
	let history = create(&backend);
	history.push("/users/1");
	history.push("/users/2");
	history.before_each(guard_fn(|to: &Route, _: &Route| {
		if to.path() == "/users/1" {
			GuardOutcome::Abort
		} else {
			GuardOutcome::Proceed
		}
	}));

	// Act
	history.back().unwrap();

	// Assert
	assert_eq!(history.current_route().path(), "/users/2");
	assert_eq!(backend.entries(), vec!["/", "/users/1", "/users/2"]);
	assert_eq!(backend.index(), 2);
	assert_eq!(backend.write_count(), 3);
}

// ============================================================================
// Hooks and listeners
// ============================================================================

/// Tests that listeners and after hooks see every commit until unsubscribed
#[rstest]
fn test_listen_and_after_each(backend: MemoryBackend) {
	let history = create(&backend);
	let seen = Rc::new(RefCell::new(Vec::new()));
	let sink = Rc::clone(&seen);
	let subscription = history.listen(move |route: &Route| {
		sink.borrow_mut().push(route.full_path().to_string())
	});
	let hops = Rc::new(RefCell::new(Vec::new()));
	let hop_sink = Rc::clone(&hops);
	history.after_each(move |to: &Route, from: &Route| {
		hop_sink
			.borrow_mut()
			.push(format!("{} -> {}", from.full_path(), to.full_path()))
	});

	history.push("/users/1");
	history.push("/login");
	drop(subscription);
	history.push("/users/2");

	assert_eq!(*seen.borrow(), vec!["/users/1", "/login"]);
	assert_eq!(
		*hops.borrow(),
		vec!["/ -> /users/1", "/users/1 -> /login", "/login -> /users/2"]
	);
}

/// Tests that route-level guards can settle later
#[rstest]
fn test_route_guard_settles_later() {
	let parked = Rc::new(RefCell::new(None));
	let slot = Rc::clone(&parked);
	let table = RouteTable::new()
		.route(RouteRecord::named("home", "/"))
		.route(
			RouteRecord::named("admin", "/admin").with_guard(deferred_guard(
				move |_: &Route, _: &Route, next| {
					*slot.borrow_mut() = Some(next);
				},
			)),
		);
	let history = History::new(MemoryBackend::new("/"), table, HistoryOptions::new());
	let outcomes = Outcomes::new();

	history.push_with("/admin", outcomes.on_complete(), outcomes.on_abort());
	assert!(history.engine().is_pending());
	assert!(outcomes.completed().is_empty());

	let next = parked.borrow_mut().take();
	next.expect("guard should have parked").proceed();

	assert_eq!(outcomes.completed(), vec!["/admin"]);
	assert!(!history.engine().is_pending());
}

/// Tests that error handlers see errors but not plain rejections
#[rstest]
fn test_on_error(backend: MemoryBackend) {
	let history = create(&backend);
	let errors = Rc::new(RefCell::new(Vec::new()));
	let sink = Rc::clone(&errors);
	history.on_error(move |failure: &NavigationFailure| sink.borrow_mut().push(failure.clone()));
	history.before_each(guard_fn(|to: &Route, _: &Route| match to.path() {
		"/login" => GuardOutcome::Abort,
		"/users/0" => GuardOutcome::Fail("user zero is reserved".to_string()),
		_ => GuardOutcome::Proceed,
	}));

	history.push("/missing");
	history.push("/login");
	history.push("/users/0");

	let errors = errors.borrow();
	assert_eq!(errors.len(), 2);
	assert_eq!(errors[0], NavigationFailure::NotFound("/missing".to_string()));
	assert!(matches!(errors[1], NavigationFailure::Guard(_)));
}

// ============================================================================
// Readiness
// ============================================================================

/// Tests that ready callbacks run once, on the first commit
#[rstest]
fn test_on_ready(backend: MemoryBackend) {
	let history = create(&backend);
	let ready = Rc::new(RefCell::new(Vec::new()));
	let sink = Rc::clone(&ready);
	history.on_ready(
		move |route: &Route| sink.borrow_mut().push(route.full_path().to_string()),
		None::<fn(&NavigationFailure)>,
	);

	history.push("/users/1");
	history.push("/users/2");
	assert_eq!(*ready.borrow(), vec!["/users/1"]);

	let sink = Rc::clone(&ready);
	history.on_ready(
		move |route: &Route| sink.borrow_mut().push(route.full_path().to_string()),
		None::<fn(&NavigationFailure)>,
	);
	assert_eq!(*ready.borrow(), vec!["/users/1", "/users/2"]);
}

/// Tests that a failing first navigation reports through the ready error
/// callback
#[rstest]
fn test_on_ready_failure(backend: MemoryBackend) {
	let history = create(&backend);
	let failures = Rc::new(RefCell::new(Vec::new()));
	let sink = Rc::clone(&failures);
	history.on_ready(
		|_: &Route| panic!("first navigation must not succeed"),
		Some(move |failure: &NavigationFailure| sink.borrow_mut().push(failure.clone())),
	);

	history.push("/missing");

	assert_eq!(
		*failures.borrow(),
		vec![NavigationFailure::NotFound("/missing".to_string())]
	);
	assert!(history.engine().is_ready());
}

// ============================================================================
// Async API and constructors
// ============================================================================

/// Tests replace_async and the memory history constructor
#[rstest]
fn test_replace_async_with_memory_history() {
	let history = create_memory_history("/users/1", routes());
	block_on(history.replace_async("/users/1")).unwrap();

	let route = block_on(history.replace_async("/login")).unwrap();

	assert_eq!(route.name(), Some("login"));
	assert_eq!(history.backend().entries(), vec!["/login"]);
	assert_eq!(
		block_on(history.push_async("/login")).unwrap_err(),
		NavigationFailure::Duplicated("/login".to_string())
	);
}

/// Tests that an async navigation orphaned by teardown settles as superseded
#[rstest]
fn test_async_navigation_orphaned_by_teardown(backend: MemoryBackend) {
	let history = create(&backend);
	let parked = Rc::new(RefCell::new(None));
	let slot = Rc::clone(&parked);
	history.before_each(deferred_guard(move |_: &Route, _: &Route, next| {
		*slot.borrow_mut() = Some(next);
	}));

	let pending = history.push_async("/users/1");
	history.teardown();
	drop(parked.borrow_mut().take());

	assert!(matches!(
		block_on(pending),
		Err(NavigationFailure::Superseded(_))
	));
	assert!(history.current_route().is_start());
}
