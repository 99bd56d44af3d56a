//! HTML5 push-state backend.

use super::window::{BrowserWindow, WindowEvent};
use super::{
	ChangeListener, EntryState, ExternalChange, HistoryBackend, Subscription, WriteKind,
};
use crate::codec::{get_location, join_base, normalize_base};
use crate::error::HistoryError;
use std::rc::Rc;

/// Backend driving the address bar through `pushState`/`replaceState` and
/// listening for `popstate`.
///
/// Locations are mounted under a base prefix: with base `/app/` the physical
/// path `/app/users/5` is the router-space path `/users/5`.
#[derive(Debug, Clone)]
pub struct Html5Backend<W> {
	window: W,
	base: String,
}

impl<W: BrowserWindow + Clone + 'static> Html5Backend<W> {
	/// Creates a backend mounted under `base`.
	pub fn new(window: W, base: Option<&str>) -> Self {
		Self {
			window,
			base: normalize_base(base),
		}
	}

	/// Returns the normalized base prefix.
	pub fn base(&self) -> &str {
		&self.base
	}

	/// Returns the wrapped window.
	pub fn window(&self) -> &W {
		&self.window
	}

	fn read_location(window: &W, base: &str) -> String {
		get_location(base, &window.pathname(), &window.search(), &window.hash())
	}
}

impl<W: BrowserWindow + Clone + 'static> HistoryBackend for Html5Backend<W> {
	fn current_location(&self) -> String {
		Self::read_location(&self.window, &self.base)
	}

	fn write_location(
		&self,
		full_path: &str,
		kind: WriteKind,
		state: &EntryState,
	) -> Result<(), HistoryError> {
		let url = join_base(&self.base, full_path);
		let written = match kind {
			WriteKind::Push => self.window.push_state(state, &url),
			WriteKind::Replace => self.window.replace_state(state, &url),
		};

		// pushState throws on rate limits and in some privacy modes; fall
		// back to a real page load.
		written.or_else(|err| {
			tracing::warn!(url = %url, error = %err, "History write failed, falling back to page navigation");
			match kind {
				WriteKind::Push => self.window.assign(&url),
				WriteKind::Replace => self.window.replace_location(&url),
			}
		})
	}

	fn replace_entry_state(&self, state: &EntryState) -> Result<(), HistoryError> {
		self.window.replace_state(state, &self.window.href())
	}

	fn go(&self, delta: i32) -> Result<(), HistoryError> {
		self.window.go(delta)
	}

	fn listen(&self, listener: ChangeListener) -> Result<Subscription, HistoryError> {
		let window = self.window.clone();
		let base = self.base.clone();
		self.window.subscribe(
			WindowEvent::PopState,
			Rc::new(move |state| {
				listener(ExternalChange {
					location: Self::read_location(&window, &base),
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
