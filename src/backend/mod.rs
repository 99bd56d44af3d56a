//! History backends.
//!
//! A backend is the physical side of navigation: something that shows a
//! location (the address bar, a hash fragment, an in-memory stack), can be
//! written with push or replace semantics, can move by a relative offset and
//! reports location changes it did not initiate. [`HistoryBackend`] is the
//! whole capability surface the [`History`](crate::History) adapter needs.

mod hash;
mod html5;
mod memory;
mod window;

pub use hash::HashBackend;
pub use html5::Html5Backend;
pub use memory::MemoryBackend;
pub use window::{BrowserWindow, WindowEvent, WindowListener};

use crate::error::HistoryError;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Key identifying a history entry for scroll restoration.
pub type StateKey = String;

/// How a location is written to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
	/// Append a new entry.
	Push,
	/// Overwrite the current entry.
	Replace,
}

/// State attached to a history entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryState {
	/// Scroll restoration key.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub key: Option<StateKey>,
	/// Caller-supplied payload from [`Location::state`](crate::Location::state).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<serde_json::Value>,
}

impl EntryState {
	/// Creates a state carrying only a key.
	pub fn with_key(key: impl Into<StateKey>) -> Self {
		Self {
			key: Some(key.into()),
			data: None,
		}
	}
}

/// A location change the backend did not initiate (back/forward, `go`).
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalChange {
	/// The new router-space location.
	pub location: String,
	/// State of the entry that became active.
	pub state: Option<EntryState>,
}

/// Callback receiving [`ExternalChange`]s.
pub type ChangeListener = Rc<dyn Fn(ExternalChange)>;

/// Handle for a registered listener. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription {
	cancel: Option<Box<dyn FnOnce()>>,
}

impl std::fmt::Debug for Subscription {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Subscription")
			.field("active", &self.cancel.is_some())
			.finish()
	}
}

impl Subscription {
	/// Creates a subscription that runs `cancel` when dropped.
	pub fn new<F>(cancel: F) -> Self
	where
		F: FnOnce() + 'static,
	{
		Self {
			cancel: Some(Box::new(cancel)),
		}
	}

	/// Creates a subscription with nothing to release.
	pub fn noop() -> Self {
		Self { cancel: None }
	}

	/// Unsubscribes now.
	pub fn unsubscribe(mut self) {
		if let Some(cancel) = self.cancel.take() {
			cancel();
		}
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		if let Some(cancel) = self.cancel.take() {
			cancel();
		}
	}
}

/// The physical navigation capability behind a [`History`](crate::History).
///
/// Locations crossing this interface are router-space strings
/// (`/path?query#hash`); any base prefix or fragment encoding is the
/// backend's business.
pub trait HistoryBackend {
	/// Reads the current location.
	fn current_location(&self) -> String;

	/// Writes `full_path` with push or replace semantics.
	fn write_location(
		&self,
		full_path: &str,
		kind: WriteKind,
		state: &EntryState,
	) -> Result<(), HistoryError>;

	/// Overwrites the state attached to the current entry. The location is
	/// left exactly as shown, and a failure never turns into a page load.
	fn replace_entry_state(&self, state: &EntryState) -> Result<(), HistoryError>;

	/// Moves `delta` entries through the session history.
	fn go(&self, delta: i32) -> Result<(), HistoryError>;

	/// Registers a listener for changes the backend did not initiate.
	fn listen(&self, listener: ChangeListener) -> Result<Subscription, HistoryError>;

	/// Returns the state attached to the current entry.
	fn current_state(&self) -> Option<EntryState> {
		None
	}

	/// Returns whether entries can carry [`EntryState`].
	fn supports_entry_state(&self) -> bool {
		true
	}
}

impl<B: HistoryBackend + ?Sized> HistoryBackend for Box<B> {
	fn current_location(&self) -> String {
		(**self).current_location()
	}

	fn write_location(
		&self,
		full_path: &str,
		kind: WriteKind,
		state: &EntryState,
	) -> Result<(), HistoryError> {
		(**self).write_location(full_path, kind, state)
	}

	fn replace_entry_state(&self, state: &EntryState) -> Result<(), HistoryError> {
		(**self).replace_entry_state(state)
	}

	fn go(&self, delta: i32) -> Result<(), HistoryError> {
		(**self).go(delta)
	}

	fn listen(&self, listener: ChangeListener) -> Result<Subscription, HistoryError> {
		(**self).listen(listener)
	}

	fn current_state(&self) -> Option<EntryState> {
		(**self).current_state()
	}

	fn supports_entry_state(&self) -> bool {
		(**self).supports_entry_state()
	}
}

impl<B: HistoryBackend + ?Sized> HistoryBackend for Rc<B> {
	fn current_location(&self) -> String {
		(**self).current_location()
	}

	fn write_location(
		&self,
		full_path: &str,
		kind: WriteKind,
		state: &EntryState,
	) -> Result<(), HistoryError> {
		(**self).write_location(full_path, kind, state)
	}

	fn replace_entry_state(&self, state: &EntryState) -> Result<(), HistoryError> {
		(**self).replace_entry_state(state)
	}

	fn go(&self, delta: i32) -> Result<(), HistoryError> {
		(**self).go(delta)
	}

	fn listen(&self, listener: ChangeListener) -> Result<Subscription, HistoryError> {
		(**self).listen(listener)
	}

	fn current_state(&self) -> Option<EntryState> {
		(**self).current_state()
	}

	fn supports_entry_state(&self) -> bool {
		(**self).supports_entry_state()
	}
}
