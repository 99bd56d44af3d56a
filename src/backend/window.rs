//! The slice of `window` the browser backends use.
//!
//! [`Html5Backend`](super::Html5Backend) and
//! [`HashBackend`](super::HashBackend) talk to the browser only through this
//! trait, so the same code runs against `web_sys::Window` in the browser and
//! against a fake window in native tests.

use super::{EntryState, Subscription};
use crate::error::HistoryError;
use std::rc::Rc;

/// Browser events the backends subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
	/// `popstate`: session history traversal.
	PopState,
	/// `hashchange`: the fragment changed without `pushState` support.
	HashChange,
}

impl WindowEvent {
	/// DOM event name.
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::PopState => "popstate",
			Self::HashChange => "hashchange",
		}
	}
}

/// Listener for [`WindowEvent`]s, receiving the state of the active entry.
pub type WindowListener = Rc<dyn Fn(Option<EntryState>)>;

/// `window.location` and `window.history` as the backends need them.
pub trait BrowserWindow {
	/// `location.pathname`.
	fn pathname(&self) -> String;

	/// `location.search`, including `?` when non-empty.
	fn search(&self) -> String;

	/// `location.hash`, including `#` when non-empty.
	fn hash(&self) -> String;

	/// `location.href`.
	fn href(&self) -> String;

	/// Whether `history.pushState` is available.
	fn supports_push_state(&self) -> bool;

	/// `history.pushState(state, "", url)`.
	fn push_state(&self, state: &EntryState, url: &str) -> Result<(), HistoryError>;

	/// `history.replaceState(state, "", url)`.
	fn replace_state(&self, state: &EntryState, url: &str) -> Result<(), HistoryError>;

	/// `history.state`, if it decodes as an [`EntryState`].
	fn history_state(&self) -> Option<EntryState>;

	/// `history.go(delta)`.
	fn go(&self, delta: i32) -> Result<(), HistoryError>;

	/// `location.assign(url)`: a full page navigation.
	fn assign(&self, url: &str) -> Result<(), HistoryError>;

	/// `location.replace(url)`: a full page navigation replacing the entry.
	fn replace_location(&self, url: &str) -> Result<(), HistoryError>;

	/// `location.hash = hash`.
	fn set_hash(&self, hash: &str) -> Result<(), HistoryError>;

	/// Adds an event listener, removed when the subscription drops.
	fn subscribe(
		&self,
		event: WindowEvent,
		listener: WindowListener,
	) -> Result<Subscription, HistoryError>;
}
