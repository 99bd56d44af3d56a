//! Error types for history navigation.
//!
//! Two families exist:
//!
//! - [`NavigationFailure`] describes why a transition did not commit. It is
//!   never raised through `push`/`replace`; it reaches callers only through the
//!   abort continuation or the result of the async variants.
//! - [`HistoryError`] describes failures of the physical backend (a rejected
//!   `pushState`, a missing `window`, an unserializable state payload) and of
//!   route table construction.

use crate::location::Location;
use thiserror::Error;

/// Reason a navigation did not commit.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NavigationFailure {
	/// No route matched the target path.
	#[error("Route not found: {0}")]
	NotFound(String),
	/// A named location referenced an unknown route name.
	#[error("Invalid route name: {0}")]
	InvalidRouteName(String),
	/// A named location lacked a parameter required by the route pattern.
	#[error("Missing parameter: {0}")]
	MissingParameter(String),
	/// The target resolved to the route that is already current.
	#[error("Avoided redundant navigation to current location: {0}")]
	Duplicated(String),
	/// A guard rejected the navigation.
	#[error("Navigation aborted from {from} to {to} by a navigation guard")]
	Aborted {
		/// Full path of the route that was current.
		from: String,
		/// Full path of the rejected target.
		to: String,
	},
	/// A guard redirected the navigation elsewhere.
	#[error("Redirected when going from {from} to {to} via a navigation guard")]
	Redirected {
		/// Full path of the route that was current.
		from: String,
		/// Full path of the target that was redirected.
		to: String,
		/// Where the guard sent the navigation instead.
		location: Box<Location>,
	},
	/// A newer transition started before this one settled.
	#[error("Navigation to {0} was superseded by a newer navigation")]
	Superseded(String),
	/// The guard continuation was dropped or the history was torn down.
	#[error("Navigation to {0} was cancelled")]
	Cancelled(String),
	/// A guard reported an error.
	#[error("Navigation guard failed: {0}")]
	Guard(String),
}

impl NavigationFailure {
	/// Returns `true` for genuine errors as opposed to abort-class outcomes.
	///
	/// Redundant, rejected, redirected, superseded and cancelled navigations
	/// are normal control flow and return `false`.
	pub fn is_error(&self) -> bool {
		matches!(
			self,
			Self::NotFound(_)
				| Self::InvalidRouteName(_)
				| Self::MissingParameter(_)
				| Self::Guard(_)
		)
	}
}

/// Error type for history backends and route table construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
	/// A browser API call threw.
	#[error("History API call failed: {0}")]
	Js(String),
	/// A required browser object is not available.
	#[error("Browser API unavailable: {0}")]
	Unavailable(&'static str),
	/// A history entry state could not be serialized or deserialized.
	#[error("Invalid history state: {0}")]
	State(String),
	/// A route pattern could not be compiled.
	#[error("Invalid route pattern '{pattern}': {reason}")]
	Pattern {
		/// The offending pattern.
		pattern: String,
		/// Why it was rejected.
		reason: String,
	},
}

impl From<serde_json::Error> for HistoryError {
	fn from(err: serde_json::Error) -> Self {
		Self::State(err.to_string())
	}
}
