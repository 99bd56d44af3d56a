//! History configuration.
//!
//! [`HistoryConfig`] is the declarative, serializable part (what an
//! application puts in its settings file); [`HistoryOptions`] carries the
//! runtime collaborators a [`History`](crate::History) is built with.

use crate::error::HistoryError;
use crate::scroll::{DefaultScrollBehavior, ScrollBehavior, Viewport};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Which backend a web history uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryMode {
	/// `pushState` URLs under the base prefix. Falls back to [`Hash`](Self::Hash)
	/// where `pushState` is unavailable.
	#[default]
	Html5,
	/// Locations in the URL fragment.
	Hash,
	/// An in-memory stack; the address bar is never touched.
	Memory,
}

/// Declarative history settings.
///
/// ```
/// use reinhardt_history::{HistoryConfig, HistoryMode};
///
/// let config = HistoryConfig::from_json(r#"{"base": "/app/", "mode": "hash"}"#).unwrap();
/// assert_eq!(config.mode, HistoryMode::Hash);
/// assert!(!config.scroll_restoration);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
	/// Prefix the application is mounted under.
	pub base: String,
	/// Backend selection.
	pub mode: HistoryMode,
	/// Save and restore scroll offsets with [`DefaultScrollBehavior`].
	pub scroll_restoration: bool,
}

impl Default for HistoryConfig {
	fn default() -> Self {
		Self {
			base: "/".to_string(),
			mode: HistoryMode::default(),
			scroll_restoration: false,
		}
	}
}

impl HistoryConfig {
	/// Parses a JSON configuration; missing fields take their defaults.
	pub fn from_json(json: &str) -> Result<Self, HistoryError> {
		Ok(serde_json::from_str(json)?)
	}

	/// Sets the base prefix.
	pub fn with_base(mut self, base: impl Into<String>) -> Self {
		self.base = base.into();
		self
	}

	/// Sets the backend mode.
	pub fn with_mode(mut self, mode: HistoryMode) -> Self {
		self.mode = mode;
		self
	}

	/// Enables or disables scroll restoration.
	pub fn with_scroll_restoration(mut self, enabled: bool) -> Self {
		self.scroll_restoration = enabled;
		self
	}

	/// Builds runtime options. The viewport still has to be supplied for
	/// scroll restoration to take effect.
	pub fn options(&self) -> HistoryOptions {
		let options = HistoryOptions::new();
		if self.scroll_restoration {
			options.scroll_behavior(DefaultScrollBehavior)
		} else {
			options
		}
	}
}

/// Runtime collaborators for a [`History`](crate::History).
#[derive(Clone, Default)]
pub struct HistoryOptions {
	pub(crate) scroll_behavior: Option<Rc<dyn ScrollBehavior>>,
	pub(crate) viewport: Option<Rc<dyn Viewport>>,
	pub(crate) key_seed: u64,
}

impl std::fmt::Debug for HistoryOptions {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HistoryOptions")
			.field("scroll_behavior", &self.scroll_behavior.is_some())
			.field("viewport", &self.viewport.is_some())
			.field("key_seed", &self.key_seed)
			.finish()
	}
}

impl HistoryOptions {
	/// Options with scroll restoration disabled.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the scroll policy. Its presence enables scroll restoration.
	pub fn scroll_behavior<S>(mut self, behavior: S) -> Self
	where
		S: ScrollBehavior + 'static,
	{
		self.scroll_behavior = Some(Rc::new(behavior));
		self
	}

	/// Sets the viewport scrolled by the coordinator.
	pub fn viewport<V>(mut self, viewport: Rc<V>) -> Self
	where
		V: Viewport + 'static,
	{
		self.viewport = Some(viewport);
		self
	}

	/// Seeds the generated scroll keys. Use a value that differs between page
	/// loads (a timestamp) so keys from an earlier load are never reused.
	pub fn key_seed(mut self, seed: u64) -> Self {
		self.key_seed = seed;
		self
	}

	/// Returns whether a scroll policy is configured.
	pub fn has_scroll_behavior(&self) -> bool {
		self.scroll_behavior.is_some()
	}
}
