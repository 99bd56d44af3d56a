//! Browser bindings.
//!
//! [`WebWindow`] implements [`BrowserWindow`] over `web_sys::Window`, and
//! [`WindowViewport`] implements [`Viewport`] over the document scroll
//! position. [`create_web_history`] assembles a [`History`] from a
//! [`HistoryConfig`].

use crate::backend::{
	BrowserWindow, EntryState, HashBackend, HistoryBackend, Html5Backend, MemoryBackend,
	Subscription, WindowEvent, WindowListener,
};
use crate::config::{HistoryConfig, HistoryMode};
use crate::error::HistoryError;
use crate::history::History;
use crate::resolver::RouteResolver;
use crate::scroll::{ScrollPosition, Viewport};
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

fn js_error(err: JsValue) -> HistoryError {
	HistoryError::Js(err.as_string().unwrap_or_else(|| format!("{:?}", err)))
}

/// `BrowserWindow` backed by the real `window`.
#[derive(Debug, Clone)]
pub struct WebWindow {
	window: web_sys::Window,
}

impl WebWindow {
	/// Wraps the global `window`.
	pub fn new() -> Result<Self, HistoryError> {
		let window = web_sys::window().ok_or(HistoryError::Unavailable("window"))?;
		Ok(Self { window })
	}

	/// Wraps a specific window object.
	pub fn from_window(window: web_sys::Window) -> Self {
		Self { window }
	}

	fn history(&self) -> Result<web_sys::History, HistoryError> {
		self.window.history().map_err(js_error)
	}

	fn encode_state(state: &EntryState) -> Result<JsValue, HistoryError> {
		let json = serde_json::to_string(state)?;
		js_sys::JSON::parse(&json).map_err(js_error)
	}
}

impl BrowserWindow for WebWindow {
	fn pathname(&self) -> String {
		self.window.location().pathname().unwrap_or_else(|_| "/".to_string())
	}

	fn search(&self) -> String {
		self.window.location().search().unwrap_or_default()
	}

	fn hash(&self) -> String {
		self.window.location().hash().unwrap_or_default()
	}

	fn href(&self) -> String {
		self.window.location().href().unwrap_or_default()
	}

	fn supports_push_state(&self) -> bool {
		self.history()
			.ok()
			.and_then(|history| js_sys::Reflect::has(&history, &JsValue::from_str("pushState")).ok())
			.unwrap_or(false)
	}

	fn push_state(&self, state: &EntryState, url: &str) -> Result<(), HistoryError> {
		let state = Self::encode_state(state)?;
		self.history()?
			.push_state_with_url(&state, "", Some(url))
			.map_err(js_error)
	}

	fn replace_state(&self, state: &EntryState, url: &str) -> Result<(), HistoryError> {
		let state = Self::encode_state(state)?;
		self.history()?
			.replace_state_with_url(&state, "", Some(url))
			.map_err(js_error)
	}

	fn history_state(&self) -> Option<EntryState> {
		let raw = self.history().ok()?.state().ok()?;
		if raw.is_null() || raw.is_undefined() {
			return None;
		}
		let json: String = js_sys::JSON::stringify(&raw).ok()?.into();
		match serde_json::from_str(&json) {
			Ok(state) => Some(state),
			Err(err) => {
				tracing::trace!(error = %err, "Ignoring foreign history state");
				None
			}
		}
	}

	fn go(&self, delta: i32) -> Result<(), HistoryError> {
		self.history()?.go_with_delta(delta).map_err(js_error)
	}

	fn assign(&self, url: &str) -> Result<(), HistoryError> {
		self.window.location().assign(url).map_err(js_error)
	}

	fn replace_location(&self, url: &str) -> Result<(), HistoryError> {
		self.window.location().replace(url).map_err(js_error)
	}

	fn set_hash(&self, hash: &str) -> Result<(), HistoryError> {
		self.window.location().set_hash(hash).map_err(js_error)
	}

	fn subscribe(
		&self,
		event: WindowEvent,
		listener: WindowListener,
	) -> Result<Subscription, HistoryError> {
		let reader = self.clone();
		let callback = Closure::<dyn FnMut(web_sys::Event)>::wrap(Box::new(move |_event| {
			listener(reader.history_state());
		}));
		self.window
			.add_event_listener_with_callback(event.as_str(), callback.as_ref().unchecked_ref())
			.map_err(js_error)?;

		let target = self.window.clone();
		Ok(Subscription::new(move || {
			let _ = target.remove_event_listener_with_callback(
				event.as_str(),
				callback.as_ref().unchecked_ref(),
			);
		}))
	}
}

/// `Viewport` backed by the document of the real `window`.
#[derive(Debug, Clone)]
pub struct WindowViewport {
	window: web_sys::Window,
}

impl WindowViewport {
	/// Wraps the global `window`.
	pub fn new() -> Result<Self, HistoryError> {
		let window = web_sys::window().ok_or(HistoryError::Unavailable("window"))?;
		Ok(Self { window })
	}

	fn find(&self, selector: &str) -> Option<web_sys::Element> {
		let document = self.window.document()?;
		// `#123` is a valid id but not a valid CSS selector.
		match selector.strip_prefix('#') {
			Some(id) if !id.is_empty() && !id.contains([' ', '.', '[', '>', ':']) => {
				document.get_element_by_id(id)
			}
			_ => document.query_selector(selector).ok().flatten(),
		}
	}
}

impl Viewport for WindowViewport {
	fn scroll_offset(&self) -> ScrollPosition {
		ScrollPosition::new(
			self.window.scroll_x().unwrap_or_default(),
			self.window.scroll_y().unwrap_or_default(),
		)
	}

	fn scroll_to(&self, position: ScrollPosition) {
		self.window.scroll_to_with_x_and_y(position.x, position.y);
	}

	fn element_offset(&self, selector: &str) -> Option<ScrollPosition> {
		let element = self.find(selector)?;
		let root = self.window.document()?.document_element()?;
		let element_rect = element.get_bounding_client_rect();
		let root_rect = root.get_bounding_client_rect();
		Some(ScrollPosition::new(
			element_rect.left() - root_rect.left(),
			element_rect.top() - root_rect.top(),
		))
	}

	fn take_scroll_control(&self) {
		if let Ok(history) = self.window.history() {
			if let Err(err) = history.set_scroll_restoration(web_sys::ScrollRestoration::Manual) {
				tracing::debug!(error = ?err, "Could not disable native scroll restoration");
			}
		}
	}
}

/// Builds a browser history for `config`.
///
/// [`HistoryMode::Html5`] falls back to the hash backend when `pushState` is
/// unavailable. [`HistoryMode::Memory`] starts at the current address-bar
/// location but never writes to it.
pub fn create_web_history<R>(
	config: &HistoryConfig,
	resolver: R,
) -> Result<History<Box<dyn HistoryBackend>>, HistoryError>
where
	R: RouteResolver + 'static,
{
	let window = WebWindow::new()?;

	let backend: Box<dyn HistoryBackend> = match config.mode {
		HistoryMode::Html5 if window.supports_push_state() => {
			Box::new(Html5Backend::new(window, Some(&config.base)))
		}
		HistoryMode::Html5 => {
			tracing::warn!("pushState unavailable, falling back to hash history");
			Box::new(HashBackend::new(window))
		}
		HistoryMode::Hash => Box::new(HashBackend::new(window)),
		HistoryMode::Memory => {
			let initial = Html5Backend::new(window, Some(&config.base)).current_location();
			Box::new(MemoryBackend::new(initial))
		}
	};

	let mut options = config.options().key_seed(js_sys::Date::now() as u64);
	if config.scroll_restoration {
		options = options.viewport(Rc::new(WindowViewport::new()?));
	}
	History::try_new(backend, resolver, options)
}
