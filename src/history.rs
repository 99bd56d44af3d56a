//! The history adapter.
//!
//! [`History`] binds one [`TransitionEngine`] to one [`HistoryBackend`]. The
//! engine decides *whether* and *where* the application navigates; the
//! adapter mirrors every committed route into the backend (append or
//! overwrite an entry), applies scroll restoration, and feeds locations the
//! backend changed on its own (back/forward buttons, `go`) back into the
//! engine as transitions.
//!
//! ## Example
//!
//! ```
//! use reinhardt_history::{History, HistoryOptions, MemoryBackend, RouteRecord, RouteTable};
//!
//! let routes = RouteTable::new()
//!     .route(RouteRecord::named("home", "/"))
//!     .route(RouteRecord::named("user", "/users/{id}"));
//! let history = History::new(MemoryBackend::new("/"), routes, HistoryOptions::new());
//!
//! history.push("/users/5");
//! assert_eq!(history.current_route().param("id"), Some("5"));
//! assert_eq!(history.current_location(), "/users/5");
//! ```

use crate::backend::{EntryState, ExternalChange, HistoryBackend, Subscription, WriteKind};
use crate::codec::parse_path;
use crate::config::HistoryOptions;
use crate::engine::{OnAbort, OnComplete, TransitionEngine};
use crate::error::{HistoryError, NavigationFailure};
use crate::guard::NavigationGuard;
use crate::location::{Location, Query};
use crate::resolver::RouteResolver;
use crate::route::Route;
use crate::scroll::ScrollCoordinator;
use futures::channel::oneshot;
use std::cell::RefCell;
use std::future::Future;
use std::rc::{Rc, Weak};

struct HistoryInner<B> {
	engine: TransitionEngine,
	backend: B,
	scroll: Option<ScrollCoordinator>,
	start_location: String,
	subscription: RefCell<Option<Subscription>>,
}

/// A router history: transition engine plus physical backend.
pub struct History<B: HistoryBackend + 'static> {
	inner: Rc<HistoryInner<B>>,
}

impl<B: HistoryBackend + 'static> Clone for History<B> {
	fn clone(&self) -> Self {
		Self {
			inner: Rc::clone(&self.inner),
		}
	}
}

impl<B: HistoryBackend + 'static> std::fmt::Debug for History<B> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("History")
			.field("engine", &self.inner.engine)
			.field("start_location", &self.inner.start_location)
			.field("scroll", &self.inner.scroll.is_some())
			.field("listening", &self.inner.subscription.borrow().is_some())
			.finish()
	}
}

impl<B: HistoryBackend + 'static> History<B> {
	/// Creates a history over `backend`, resolving locations with `resolver`.
	///
	/// # Panics
	///
	/// Panics if the backend refuses the change listener. Use
	/// [`try_new`](Self::try_new) to handle that case.
	pub fn new<R>(backend: B, resolver: R, options: HistoryOptions) -> Self
	where
		R: RouteResolver + 'static,
	{
		Self::try_new(backend, resolver, options)
			.unwrap_or_else(|e| panic!("Failed to create history: {}", e))
	}

	/// Creates a history over `backend`, resolving locations with `resolver`.
	pub fn try_new<R>(backend: B, resolver: R, options: HistoryOptions) -> Result<Self, HistoryError>
	where
		R: RouteResolver + 'static,
	{
		let scroll = match (options.scroll_behavior, options.viewport) {
			(Some(behavior), Some(viewport)) if backend.supports_entry_state() => {
				let scroll = ScrollCoordinator::new(behavior, viewport, options.key_seed);
				scroll.setup(&backend);
				Some(scroll)
			}
			(Some(_), None) => {
				tracing::warn!("Scroll behavior configured without a viewport; scroll restoration disabled");
				None
			}
			(Some(_), Some(_)) => {
				tracing::debug!("Backend cannot attach entry state; scroll restoration disabled");
				None
			}
			(None, _) => None,
		};

		let start_location = backend.current_location();
		let inner = Rc::new(HistoryInner {
			engine: TransitionEngine::new(resolver),
			backend,
			scroll,
			start_location,
			subscription: RefCell::new(None),
		});

		let weak = Rc::downgrade(&inner);
		let subscription = inner.backend.listen(Rc::new(move |change: ExternalChange| {
			if let Some(inner) = weak.upgrade() {
				HistoryInner::on_external_change(&inner, change);
			}
		}))?;
		*inner.subscription.borrow_mut() = Some(subscription);

		tracing::debug!(location = %inner.start_location, "History created");
		Ok(Self { inner })
	}

	/// Returns the transition engine.
	pub fn engine(&self) -> &TransitionEngine {
		&self.inner.engine
	}

	/// Returns the backend.
	pub fn backend(&self) -> &B {
		&self.inner.backend
	}

	/// Returns the current route.
	pub fn current_route(&self) -> Route {
		self.inner.engine.current()
	}

	/// Reads the physical location, base prefix stripped.
	pub fn current_location(&self) -> String {
		self.inner.backend.current_location()
	}

	/// Moves `delta` entries through the session history.
	///
	/// The resulting location change is what drives the transition.
	pub fn go(&self, delta: i32) -> Result<(), HistoryError> {
		self.inner.backend.go(delta)
	}

	/// `go(-1)`.
	pub fn back(&self) -> Result<(), HistoryError> {
		self.go(-1)
	}

	/// `go(1)`.
	pub fn forward(&self) -> Result<(), HistoryError> {
		self.go(1)
	}

	/// Navigates to `location`, appending a history entry.
	pub fn push(&self, location: impl Into<Location>) {
		self.push_with(location, None, None);
	}

	/// Navigates to `location`, appending a history entry, and reports the
	/// outcome through at most one of the continuations.
	pub fn push_with(
		&self,
		location: impl Into<Location>,
		on_complete: Option<OnComplete>,
		on_abort: Option<OnAbort>,
	) {
		HistoryInner::navigate(&self.inner, location.into(), WriteKind::Push, on_complete, on_abort);
	}

	/// Navigates to `location`, appending a history entry, and resolves once
	/// the transition settles.
	///
	/// Dropping the future does not cancel the navigation.
	pub fn push_async(
		&self,
		location: impl Into<Location>,
	) -> impl Future<Output = Result<Route, NavigationFailure>> + 'static {
		self.navigate_async(location.into(), WriteKind::Push)
	}

	/// Navigates to `location`, overwriting the current history entry.
	pub fn replace(&self, location: impl Into<Location>) {
		self.replace_with(location, None, None);
	}

	/// Navigates to `location`, overwriting the current history entry, and
	/// reports the outcome through at most one of the continuations.
	pub fn replace_with(
		&self,
		location: impl Into<Location>,
		on_complete: Option<OnComplete>,
		on_abort: Option<OnAbort>,
	) {
		HistoryInner::navigate(
			&self.inner,
			location.into(),
			WriteKind::Replace,
			on_complete,
			on_abort,
		);
	}

	/// Navigates to `location`, overwriting the current history entry, and
	/// resolves once the transition settles.
	pub fn replace_async(
		&self,
		location: impl Into<Location>,
	) -> impl Future<Output = Result<Route, NavigationFailure>> + 'static {
		self.navigate_async(location.into(), WriteKind::Replace)
	}

	fn navigate_async(
		&self,
		location: Location,
		kind: WriteKind,
	) -> impl Future<Output = Result<Route, NavigationFailure>> + 'static {
		let (sender, receiver) = oneshot::channel();
		let sender = Rc::new(RefCell::new(Some(sender)));
		let on_failure = Rc::clone(&sender);
		let target = location.describe();

		HistoryInner::navigate(
			&self.inner,
			location,
			kind,
			Some(Box::new(move |route: Route| {
				if let Some(sender) = sender.borrow_mut().take() {
					let _ = sender.send(Ok(route));
				}
			})),
			Some(Box::new(move |failure: NavigationFailure| {
				if let Some(sender) = on_failure.borrow_mut().take() {
					let _ = sender.send(Err(failure));
				}
			})),
		);

		async move {
			receiver
				.await
				.unwrap_or_else(|_| Err(NavigationFailure::Cancelled(target)))
		}
	}

	/// Rewrites the physical location if it drifted from the current route.
	///
	/// `push` selects push semantics for the corrective write; otherwise the
	/// current entry is replaced. No write happens when they already match or
	/// before the first navigation has committed.
	pub fn ensure_url(&self, push: bool) {
		self.inner.ensure_url(push);
	}

	/// Registers a guard run before every navigation.
	pub fn before_each<G>(&self, guard: G)
	where
		G: NavigationGuard + 'static,
	{
		self.inner.engine.before_each(guard);
	}

	/// Registers a guard run after the route guards of every navigation.
	pub fn before_resolve<G>(&self, guard: G)
	where
		G: NavigationGuard + 'static,
	{
		self.inner.engine.before_resolve(guard);
	}

	/// Registers a hook run after every committed navigation.
	pub fn after_each<F>(&self, hook: F)
	where
		F: Fn(&Route, &Route) + 'static,
	{
		self.inner.engine.after_each(hook);
	}

	/// Registers a listener for committed routes.
	pub fn listen<F>(&self, listener: F) -> Subscription
	where
		F: Fn(&Route) + 'static,
	{
		self.inner.engine.listen(listener)
	}

	/// See [`TransitionEngine::on_ready`].
	pub fn on_ready<F, E>(&self, on_success: F, on_failure: Option<E>)
	where
		F: FnOnce(&Route) + 'static,
		E: FnOnce(&NavigationFailure) + 'static,
	{
		self.inner.engine.on_ready(on_success, on_failure);
	}

	/// Registers a handler for navigation errors.
	pub fn on_error<F>(&self, handler: F)
	where
		F: Fn(&NavigationFailure) + 'static,
	{
		self.inner.engine.on_error(handler);
	}

	/// Stops listening to the backend, resets the current route to START and
	/// orphans any pending transition.
	pub fn teardown(&self) {
		if let Some(subscription) = self.inner.subscription.borrow_mut().take() {
			subscription.unsubscribe();
		}
		self.inner.engine.reset();
		tracing::debug!("History torn down");
	}
}

impl<B: HistoryBackend + 'static> HistoryInner<B> {
	fn navigate(
		inner: &Rc<Self>,
		location: Location,
		kind: WriteKind,
		on_complete: Option<OnComplete>,
		on_abort: Option<OnAbort>,
	) {
		let from = inner.engine.current();
		let completed = Rc::downgrade(inner);
		let aborted = Rc::downgrade(inner);

		inner.engine.transition_to(
			location,
			Box::new(move |route: Route| {
				if let Some(inner) = completed.upgrade() {
					inner.write(&route, kind);
					if let Some(scroll) = &inner.scroll {
						scroll.compute_and_apply(&route, &from, false);
					}
				}
				if let Some(on_complete) = on_complete {
					on_complete(route);
				}
				if let Some(inner) = completed.upgrade() {
					inner.ensure_url(false);
				}
			}),
			Box::new(move |failure: NavigationFailure| Self::handle_abort(aborted, failure, on_abort)),
		);
	}

	/// Physical reactions to an aborted transition, around the caller's
	/// abort continuation.
	fn handle_abort(weak: Weak<Self>, failure: NavigationFailure, on_abort: Option<OnAbort>) {
		let inner = weak.upgrade();
		match (&failure, &inner) {
			(NavigationFailure::Duplicated(_), Some(inner)) => inner.ensure_url(false),
			(NavigationFailure::Aborted { .. }, Some(inner)) => inner.ensure_url(true),
			_ => {}
		}

		let redirect = match &failure {
			NavigationFailure::Redirected { location, .. } => Some(location.as_ref().clone()),
			_ => None,
		};

		if let Some(on_abort) = on_abort {
			on_abort(failure);
		}

		if let (Some(location), Some(inner)) = (redirect, inner) {
			let kind = if location.replace {
				WriteKind::Replace
			} else {
				WriteKind::Push
			};
			tracing::debug!(location = %location.describe(), "Following guard redirect");
			Self::navigate(&inner, location, kind, None, None);
		}
	}

	fn on_external_change(inner: &Rc<Self>, change: ExternalChange) {
		let ExternalChange { location, state } = change;

		if let Some(scroll) = &inner.scroll {
			scroll.save_position();
			if let Some(key) = state.as_ref().and_then(|state| state.key.clone()) {
				scroll.set_active_key(Some(key));
			}
		}

		let current = inner.engine.current();
		// Some browsers fire popstate once on page load.
		if current.is_start() && location == inner.start_location {
			tracing::trace!(location = %location, "Ignoring initial location change event");
			return;
		}
		tracing::debug!(location = %location, "External location change");

		let mut target = Location::path(&location);
		target.state = state.and_then(|state| state.data);

		let completed = Rc::downgrade(inner);
		let aborted = Rc::downgrade(inner);
		inner.engine.transition_to(
			target,
			Box::new(move |route: Route| {
				if let Some(inner) = completed.upgrade() {
					if let Some(scroll) = &inner.scroll {
						scroll.compute_and_apply(&route, &current, true);
					}
					inner.ensure_url(false);
				}
			}),
			Box::new(move |failure: NavigationFailure| Self::handle_abort(aborted, failure, None)),
		);
	}

	fn write(&self, route: &Route, kind: WriteKind) {
		let data = route.state().cloned();
		let state = match &self.scroll {
			Some(scroll) => scroll.entry_state(kind, data),
			None => EntryState { key: None, data },
		};
		if let Err(err) = self.backend.write_location(route.full_path(), kind, &state) {
			tracing::warn!(location = %route.full_path(), error = %err, "Failed to write history entry");
		}
	}

	/// Whether the physical location already shows `route`. The query is
	/// compared decoded so that `%20` and `+` spellings count as equal.
	fn shows(&self, route: &Route) -> bool {
		let physical = parse_path(&self.backend.current_location());
		physical.path == route.path()
			&& physical.hash == route.hash()
			&& Query::parse(&physical.query) == *route.query()
	}

	fn ensure_url(&self, push: bool) {
		let current = self.engine.current();
		// START has no physical location of its own.
		if current.is_start() || self.shows(&current) {
			return;
		}
		let kind = if push { WriteKind::Push } else { WriteKind::Replace };
		tracing::debug!(location = %current.full_path(), ?kind, "Restoring physical location");
		self.write(&current, kind);
	}
}
