//! Navigation guards.
//!
//! A guard inspects a pending transition and settles it through the [`Next`]
//! continuation it receives. Guards may settle immediately or hold on to
//! `Next` and settle later (after a confirmation dialog, a data fetch driven by
//! `spawn_local`, ...). Dropping `Next` without settling cancels the
//! transition, so every transition reaches exactly one outcome.
//!
//! ```ignore
//! use reinhardt_history::{GuardOutcome, guard_fn};
//!
//! history.before_each(guard_fn(|to, _from| {
//!     if to.meta("requires_auth").is_some() && !logged_in() {
//!         GuardOutcome::Redirect("/login".into())
//!     } else {
//!         GuardOutcome::Proceed
//!     }
//! }));
//! ```

use crate::location::Location;
use crate::route::Route;

/// How a guard settles a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum GuardOutcome {
	/// Continue with the next guard, or commit after the last one.
	Proceed,
	/// Reject the navigation.
	Abort,
	/// Abandon this navigation and navigate to another location.
	Redirect(Location),
	/// Reject the navigation with an error.
	Fail(String),
}

/// A check run before a transition commits.
pub trait NavigationGuard {
	/// Inspects the transition from `from` to `to` and settles it via `next`.
	fn check(&self, to: &Route, from: &Route, next: Next);
}

/// Continuation handed to a [`NavigationGuard`].
pub struct Next {
	target: String,
	settle: Option<Box<dyn FnOnce(Option<GuardOutcome>)>>,
}

impl std::fmt::Debug for Next {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Next")
			.field("target", &self.target)
			.field("settled", &self.settle.is_none())
			.finish()
	}
}

impl Next {
	pub(crate) fn new<F>(target: impl Into<String>, settle: F) -> Self
	where
		F: FnOnce(Option<GuardOutcome>) + 'static,
	{
		Self {
			target: target.into(),
			settle: Some(Box::new(settle)),
		}
	}

	/// Full path of the transition target.
	pub fn target(&self) -> &str {
		&self.target
	}

	/// Settles with an explicit outcome.
	pub fn resolve(mut self, outcome: GuardOutcome) {
		if let Some(settle) = self.settle.take() {
			settle(Some(outcome));
		}
	}

	/// Lets the transition continue.
	pub fn proceed(self) {
		self.resolve(GuardOutcome::Proceed);
	}

	/// Rejects the transition.
	pub fn abort(self) {
		self.resolve(GuardOutcome::Abort);
	}

	/// Redirects to another location.
	pub fn redirect(self, location: impl Into<Location>) {
		self.resolve(GuardOutcome::Redirect(location.into()));
	}

	/// Rejects the transition with an error.
	pub fn fail(self, message: impl Into<String>) {
		self.resolve(GuardOutcome::Fail(message.into()));
	}
}

impl Drop for Next {
	fn drop(&mut self) {
		if let Some(settle) = self.settle.take() {
			settle(None);
		}
	}
}

/// Guard built from a synchronous closure.
pub struct FnGuard<F>(F);

impl<F> NavigationGuard for FnGuard<F>
where
	F: Fn(&Route, &Route) -> GuardOutcome,
{
	fn check(&self, to: &Route, from: &Route, next: Next) {
		next.resolve((self.0)(to, from));
	}
}

/// Wraps a synchronous closure as a guard.
pub fn guard_fn<F>(f: F) -> FnGuard<F>
where
	F: Fn(&Route, &Route) -> GuardOutcome,
{
	FnGuard(f)
}

/// Guard built from a closure that settles through [`Next`] itself.
pub struct DeferredGuard<F>(F);

impl<F> NavigationGuard for DeferredGuard<F>
where
	F: Fn(&Route, &Route, Next),
{
	fn check(&self, to: &Route, from: &Route, next: Next) {
		(self.0)(to, from, next);
	}
}

/// Wraps a closure that settles asynchronously as a guard.
pub fn deferred_guard<F>(f: F) -> DeferredGuard<F>
where
	F: Fn(&Route, &Route, Next),
{
	DeferredGuard(f)
}

/// Hook run after a transition commits, with `(to, from)`.
pub type AfterHook = std::rc::Rc<dyn Fn(&Route, &Route)>;
