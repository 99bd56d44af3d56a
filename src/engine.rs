//! Transition engine.
//!
//! [`TransitionEngine`] owns the single "current route" pointer. A transition
//! resolves its target, runs the guard queue and, if it is still the pending
//! transition when the last guard proceeds, commits: the current route is
//! swapped, route listeners and after-hooks run, and the completion
//! continuation fires. Every call to [`transition_to`](TransitionEngine::transition_to)
//! settles exactly once, through exactly one of its two continuations.
//!
//! A newer transition supersedes an older one the moment it is marked
//! pending. The older transition keeps running its guards (guards are not
//! preemptible) but can no longer commit; it aborts with
//! [`NavigationFailure::Superseded`] at its next step.

use crate::backend::Subscription;
use crate::error::NavigationFailure;
use crate::guard::{AfterHook, GuardOutcome, NavigationGuard, Next};
use crate::location::Location;
use crate::resolver::RouteResolver;
use crate::route::{Route, RouteRecord};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// Continuation invoked with the committed route.
pub type OnComplete = Box<dyn FnOnce(Route)>;

/// Continuation invoked with the reason a transition did not commit.
pub type OnAbort = Box<dyn FnOnce(NavigationFailure)>;

/// Callback invoked with every committed route.
pub type RouteListener = Rc<dyn Fn(&Route)>;

type ReadyCallback = Box<dyn FnOnce(&Route)>;
type ReadyErrorCallback = Box<dyn FnOnce(&NavigationFailure)>;
type ErrorCallback = Rc<dyn Fn(&NavigationFailure)>;

struct EngineInner {
	resolver: Box<dyn RouteResolver>,
	current: RefCell<Route>,
	pending: Cell<Option<u64>>,
	next_seq: Cell<u64>,
	before_hooks: RefCell<Vec<Rc<dyn NavigationGuard>>>,
	resolve_hooks: RefCell<Vec<Rc<dyn NavigationGuard>>>,
	after_hooks: RefCell<Vec<AfterHook>>,
	listeners: RefCell<Vec<(u64, RouteListener)>>,
	next_listener_id: Cell<u64>,
	ready: Cell<bool>,
	ready_callbacks: RefCell<Vec<ReadyCallback>>,
	ready_error_callbacks: RefCell<Vec<ReadyErrorCallback>>,
	error_callbacks: RefCell<Vec<ErrorCallback>>,
}

/// A transition in flight.
struct Transition {
	seq: u64,
	to: Route,
	from: Route,
	queue: Rc<[Rc<dyn NavigationGuard>]>,
	on_complete: OnComplete,
	on_abort: OnAbort,
}

/// Owner of the current route and the transition protocol.
///
/// Cloning yields another handle to the same engine.
#[derive(Clone)]
pub struct TransitionEngine {
	inner: Rc<EngineInner>,
}

impl std::fmt::Debug for TransitionEngine {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TransitionEngine")
			.field("current", &self.inner.current.borrow().full_path())
			.field("pending", &self.inner.pending.get())
			.field("ready", &self.inner.ready.get())
			.finish()
	}
}

impl TransitionEngine {
	/// Creates an engine whose current route is [`Route::start`].
	pub fn new<R>(resolver: R) -> Self
	where
		R: RouteResolver + 'static,
	{
		Self {
			inner: Rc::new(EngineInner {
				resolver: Box::new(resolver),
				current: RefCell::new(Route::start()),
				pending: Cell::new(None),
				next_seq: Cell::new(0),
				before_hooks: RefCell::new(Vec::new()),
				resolve_hooks: RefCell::new(Vec::new()),
				after_hooks: RefCell::new(Vec::new()),
				listeners: RefCell::new(Vec::new()),
				next_listener_id: Cell::new(0),
				ready: Cell::new(false),
				ready_callbacks: RefCell::new(Vec::new()),
				ready_error_callbacks: RefCell::new(Vec::new()),
				error_callbacks: RefCell::new(Vec::new()),
			}),
		}
	}

	/// Returns the current route.
	pub fn current(&self) -> Route {
		self.inner.current.borrow().clone()
	}

	/// Returns whether a transition is in flight.
	pub fn is_pending(&self) -> bool {
		self.inner.pending.get().is_some()
	}

	/// Returns whether the first transition has settled.
	pub fn is_ready(&self) -> bool {
		self.inner.ready.get()
	}

	/// Resolves `location` against the current route without navigating.
	pub fn resolve(&self, location: &Location) -> Result<Route, NavigationFailure> {
		let current = self.current();
		self.inner.resolver.resolve(location, &current)
	}

	/// Registers a guard run before every transition, ahead of route guards.
	pub fn before_each<G>(&self, guard: G)
	where
		G: NavigationGuard + 'static,
	{
		self.inner.before_hooks.borrow_mut().push(Rc::new(guard));
	}

	/// Registers a guard run after the route guards of every transition.
	pub fn before_resolve<G>(&self, guard: G)
	where
		G: NavigationGuard + 'static,
	{
		self.inner.resolve_hooks.borrow_mut().push(Rc::new(guard));
	}

	/// Registers a hook run after every commit, with `(to, from)`.
	pub fn after_each<F>(&self, hook: F)
	where
		F: Fn(&Route, &Route) + 'static,
	{
		self.inner.after_hooks.borrow_mut().push(Rc::new(hook));
	}

	/// Registers a listener for committed routes.
	pub fn listen<F>(&self, listener: F) -> Subscription
	where
		F: Fn(&Route) + 'static,
	{
		let id = self.inner.next_listener_id.get();
		self.inner.next_listener_id.set(id + 1);
		self.inner
			.listeners
			.borrow_mut()
			.push((id, Rc::new(listener)));

		let weak = Rc::downgrade(&self.inner);
		Subscription::new(move || {
			if let Some(inner) = weak.upgrade() {
				inner.listeners.borrow_mut().retain(|(other, _)| *other != id);
			}
		})
	}

	/// Runs `on_success` once the first transition commits, immediately if
	/// it already has. `on_failure` runs instead if the first transition
	/// fails.
	pub fn on_ready<F, E>(&self, on_success: F, on_failure: Option<E>)
	where
		F: FnOnce(&Route) + 'static,
		E: FnOnce(&NavigationFailure) + 'static,
	{
		if self.inner.ready.get() {
			let current = self.current();
			on_success(&current);
			return;
		}
		self.inner
			.ready_callbacks
			.borrow_mut()
			.push(Box::new(on_success));
		if let Some(on_failure) = on_failure {
			self.inner
				.ready_error_callbacks
				.borrow_mut()
				.push(Box::new(on_failure));
		}
	}

	/// Registers a handler for navigation errors (see
	/// [`NavigationFailure::is_error`]).
	pub fn on_error<F>(&self, handler: F)
	where
		F: Fn(&NavigationFailure) + 'static,
	{
		self.inner.error_callbacks.borrow_mut().push(Rc::new(handler));
	}

	/// Drops the current route back to START and orphans any pending
	/// transition.
	pub(crate) fn reset(&self) {
		self.inner.pending.set(None);
		*self.inner.current.borrow_mut() = Route::start();
	}

	/// Starts a transition to `location`.
	///
	/// Exactly one of `on_complete` and `on_abort` is invoked, exactly once,
	/// possibly before this call returns.
	pub fn transition_to(&self, location: Location, on_complete: OnComplete, on_abort: OnAbort) {
		let from = self.current();

		let to = match self.inner.resolver.resolve(&location, &from) {
			Ok(route) => route,
			Err(failure) => {
				tracing::debug!(location = %location.describe(), error = %failure, "Route resolution failed");
				self.inner.settle_failure(&from, &failure);
				on_abort(failure);
				return;
			}
		};

		if to.is_same(&from) {
			tracing::trace!(to = %to.full_path(), "Skipping redundant navigation");
			let failure = NavigationFailure::Duplicated(to.full_path().to_string());
			self.inner.settle_failure(&from, &failure);
			on_abort(failure);
			return;
		}

		let seq = self.inner.next_seq.get();
		self.inner.next_seq.set(seq + 1);
		if let Some(previous) = self.inner.pending.replace(Some(seq)) {
			tracing::debug!(seq, superseded = previous, "Transition supersedes a pending one");
		}
		tracing::debug!(seq, from = %from.full_path(), to = %to.full_path(), "Transition started");

		let queue = self.inner.guard_queue(&from, &to);
		let transition = Transition {
			seq,
			to,
			from,
			queue,
			on_complete,
			on_abort,
		};
		EngineInner::step(&self.inner, transition, 0);
	}
}

/// Records entered by a transition: the suffix of `to` that differs from
/// `from` by identity.
fn activated<'a>(from: &[Rc<RouteRecord>], to: &'a [Rc<RouteRecord>]) -> &'a [Rc<RouteRecord>] {
	let shared = from
		.iter()
		.zip(to)
		.take_while(|(a, b)| Rc::ptr_eq(a, b))
		.count();
	&to[shared..]
}

impl EngineInner {
	fn is_pending(&self, seq: u64) -> bool {
		self.pending.get() == Some(seq)
	}

	fn guard_queue(&self, from: &Route, to: &Route) -> Rc<[Rc<dyn NavigationGuard>]> {
		let mut queue: Vec<Rc<dyn NavigationGuard>> = self.before_hooks.borrow().clone();
		for record in activated(from.matched(), to.matched()) {
			queue.extend(record.guards().iter().cloned());
		}
		queue.extend(self.resolve_hooks.borrow().iter().cloned());
		queue.into()
	}

	fn step(inner: &Rc<Self>, transition: Transition, index: usize) {
		if !inner.is_pending(transition.seq) {
			let failure = NavigationFailure::Superseded(transition.to.full_path().to_string());
			return inner.abort(transition, failure);
		}

		let Some(guard) = transition.queue.get(index).cloned() else {
			return inner.commit(transition);
		};

		let to = transition.to.clone();
		let from = transition.from.clone();
		let weak = Rc::downgrade(inner);
		let next = Next::new(to.full_path(), move |outcome| {
			Self::on_guard_settled(weak, transition, index, outcome)
		});
		guard.check(&to, &from, next);
	}

	fn on_guard_settled(
		weak: Weak<Self>,
		transition: Transition,
		index: usize,
		outcome: Option<GuardOutcome>,
	) {
		let Some(inner) = weak.upgrade() else {
			let failure = NavigationFailure::Cancelled(transition.to.full_path().to_string());
			return (transition.on_abort)(failure);
		};

		if !inner.is_pending(transition.seq) {
			let failure = NavigationFailure::Superseded(transition.to.full_path().to_string());
			return inner.abort(transition, failure);
		}

		let from = transition.from.full_path().to_string();
		let to = transition.to.full_path().to_string();
		match outcome {
			Some(GuardOutcome::Proceed) => Self::step(&inner, transition, index + 1),
			Some(GuardOutcome::Abort) => {
				inner.abort(transition, NavigationFailure::Aborted { from, to })
			}
			Some(GuardOutcome::Redirect(location)) => inner.abort(
				transition,
				NavigationFailure::Redirected {
					from,
					to,
					location: Box::new(location),
				},
			),
			Some(GuardOutcome::Fail(message)) => {
				tracing::warn!(from = %from, to = %to, error = %message, "Navigation guard failed");
				inner.abort(transition, NavigationFailure::Guard(message))
			}
			None => inner.abort(transition, NavigationFailure::Cancelled(to)),
		}
	}

	fn abort(&self, transition: Transition, failure: NavigationFailure) {
		if self.is_pending(transition.seq) {
			self.pending.set(None);
		}
		tracing::debug!(seq = transition.seq, error = %failure, "Transition aborted");
		self.settle_failure(&transition.from, &failure);
		(transition.on_abort)(failure);
	}

	/// Error handlers and first-navigation bookkeeping for a failed transition.
	fn settle_failure(&self, from: &Route, failure: &NavigationFailure) {
		if failure.is_error() {
			let handlers: Vec<ErrorCallback> = self.error_callbacks.borrow().clone();
			for handler in handlers {
				handler(failure);
			}
		}

		// A redirect or a newer navigation away from START still leads to a
		// first navigation.
		let keeps_waiting = match failure {
			NavigationFailure::Duplicated(_) => true,
			NavigationFailure::Redirected { .. } | NavigationFailure::Superseded(_) => {
				from.is_start()
			}
			_ => false,
		};
		if self.ready.get() || keeps_waiting {
			return;
		}
		self.ready.set(true);
		self.ready_callbacks.borrow_mut().clear();
		let callbacks = std::mem::take(&mut *self.ready_error_callbacks.borrow_mut());
		for callback in callbacks {
			callback(failure);
		}
	}

	fn commit(&self, transition: Transition) {
		let Transition {
			seq,
			to,
			on_complete,
			..
		} = transition;

		self.pending.set(None);
		let from = self.current.replace(to.clone());
		tracing::debug!(seq, from = %from.full_path(), to = %to.full_path(), "Transition committed");

		let listeners: Vec<RouteListener> = self
			.listeners
			.borrow()
			.iter()
			.map(|(_, listener)| Rc::clone(listener))
			.collect();
		for listener in listeners {
			listener(&to);
		}

		let hooks: Vec<AfterHook> = self.after_hooks.borrow().clone();
		for hook in hooks {
			hook(&to, &from);
		}

		on_complete(to.clone());

		if !self.ready.get() {
			self.ready.set(true);
			self.ready_error_callbacks.borrow_mut().clear();
			let callbacks = std::mem::take(&mut *self.ready_callbacks.borrow_mut());
			for callback in callbacks {
				callback(&to);
			}
		}
	}
}
