//! Hash fragment backend.
//!
//! The router-space location lives in the URL fragment
//! (`https://host/app/#/users/5`). Entries are written with `pushState` where
//! available and by assigning the fragment otherwise; changes are observed via
//! `popstate` or `hashchange` accordingly.

use super::window::{BrowserWindow, WindowEvent};
use super::{
	ChangeListener, EntryState, ExternalChange, HistoryBackend, Subscription, WriteKind,
};
use crate::codec::{hash_fragment, hash_url};
use crate::error::HistoryError;
use std::rc::Rc;

/// Backend storing the location in the URL fragment.
#[derive(Debug, Clone)]
pub struct HashBackend<W> {
	window: W,
}

impl<W: BrowserWindow + Clone + 'static> HashBackend<W> {
	/// Creates a backend and makes sure the fragment starts with `/`.
	pub fn new(window: W) -> Self {
		let backend = Self { window };
		backend.ensure_slash();
		backend
	}

	/// Returns the wrapped window.
	pub fn window(&self) -> &W {
		&self.window
	}

	/// Rewrites a fragment lacking a leading `/` (`#users` → `#/users`).
	///
	/// Returns `true` if the fragment was already well-formed.
	fn ensure_slash(&self) -> bool {
		Self::ensure_slash_in(&self.window)
	}

	fn ensure_slash_in(window: &W) -> bool {
		let href = window.href();
		let fragment = hash_fragment(&href);
		if fragment.starts_with('/') {
			return true;
		}
		let fixed = format!("/{}", fragment);
		if let Err(err) = Self::replace_fragment(window, &fixed) {
			tracing::warn!(fragment = %fixed, error = %err, "Failed to normalize hash fragment");
		}
		false
	}

	fn replace_fragment(window: &W, path: &str) -> Result<(), HistoryError> {
		let url = hash_url(&window.href(), path);
		if window.supports_push_state() {
			let state = window.history_state().unwrap_or_default();
			window.replace_state(&state, &url)
		} else {
			window.replace_location(&url)
		}
	}
}

impl<W: BrowserWindow + Clone + 'static> HistoryBackend for HashBackend<W> {
	fn current_location(&self) -> String {
		hash_fragment(&self.window.href()).to_string()
	}

	fn write_location(
		&self,
		full_path: &str,
		kind: WriteKind,
		state: &EntryState,
	) -> Result<(), HistoryError> {
		let url = hash_url(&self.window.href(), full_path);
		match (kind, self.window.supports_push_state()) {
			(WriteKind::Push, true) => self.window.push_state(state, &url),
			(WriteKind::Replace, true) => self.window.replace_state(state, &url),
			(WriteKind::Push, false) => self.window.set_hash(full_path),
			(WriteKind::Replace, false) => self.window.replace_location(&url),
		}
	}

	fn replace_entry_state(&self, state: &EntryState) -> Result<(), HistoryError> {
		self.window.replace_state(state, &self.window.href())
	}

	fn go(&self, delta: i32) -> Result<(), HistoryError> {
		self.window.go(delta)
	}

	fn listen(&self, listener: ChangeListener) -> Result<Subscription, HistoryError> {
		let event = if self.window.supports_push_state() {
			WindowEvent::PopState
		} else {
			WindowEvent::HashChange
		};
		let window = self.window.clone();
		self.window.subscribe(
			event,
			Rc::new(move |state| {
				// A malformed fragment is rewritten first; the rewrite itself
				// is not a navigation.
				if !Self::ensure_slash_in(&window) {
					return;
				}
				listener(ExternalChange {
					location: hash_fragment(&window.href()).to_string(),
					state,
				})
			}),
		)
	}

	fn current_state(&self) -> Option<EntryState> {
		self.window.history_state()
	}

	fn supports_entry_state(&self) -> bool {
		self.window.supports_push_state()
	}
}
