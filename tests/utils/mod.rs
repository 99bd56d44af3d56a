//! Shared test doubles for history integration tests.
//!
//! - [`FakeWindow`]: an in-process `window` with a session history stack,
//!   a write log and synchronous event dispatch.
//! - [`RecordingViewport`]: a viewport that records every scroll.
//! - [`GuardGate`]: a guard that parks transitions until released.
//! - [`Outcomes`]: continuations recording how navigations settled.

#![allow(dead_code)]

use reinhardt_history::backend::WindowListener;
use reinhardt_history::{
	BrowserWindow, EntryState, HistoryError, NavigationFailure, NavigationGuard, Next, OnAbort,
	OnComplete, Route, ScrollPosition, Subscription, Viewport, WindowEvent, deferred_guard,
};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

const ORIGIN: &str = "https://example.com";

/// Physical operation recorded by [`FakeWindow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
	PushState,
	ReplaceState,
	Assign,
	ReplaceLocation,
	SetHash,
}

struct FakeEntry {
	url: String,
	state: Option<EntryState>,
}

struct FakeInner {
	entries: RefCell<Vec<FakeEntry>>,
	index: Cell<usize>,
	push_state_supported: Cell<bool>,
	push_state_fails: Cell<bool>,
	writes: RefCell<Vec<(WriteOp, String)>>,
	listeners: RefCell<Vec<(u64, WindowEvent, WindowListener)>>,
	next_id: Cell<u64>,
}

/// Fake `window` whose URL is `path?search#hash` under a fixed origin.
#[derive(Clone)]
pub struct FakeWindow {
	inner: Rc<FakeInner>,
}

fn split_url(url: &str) -> (&str, &str, &str) {
	let (before_hash, hash) = match url.find('#') {
		Some(index) => (&url[..index], &url[index..]),
		None => (url, ""),
	};
	let (path, search) = match before_hash.find('?') {
		Some(index) => (&before_hash[..index], &before_hash[index..]),
		None => (before_hash, ""),
	};
	(path, search, hash)
}

fn strip_origin(url: &str) -> String {
	url.strip_prefix(ORIGIN).unwrap_or(url).to_string()
}

impl FakeWindow {
	/// Creates a window showing `url` (origin-relative).
	pub fn new(url: &str) -> Self {
		Self {
			inner: Rc::new(FakeInner {
				entries: RefCell::new(vec![FakeEntry {
					url: url.to_string(),
					state: None,
				}]),
				index: Cell::new(0),
				push_state_supported: Cell::new(true),
				push_state_fails: Cell::new(false),
				writes: RefCell::new(Vec::new()),
				listeners: RefCell::new(Vec::new()),
				next_id: Cell::new(0),
			}),
		}
	}

	/// Creates a window without `pushState` support.
	pub fn legacy(url: &str) -> Self {
		let window = Self::new(url);
		window.inner.push_state_supported.set(false);
		window
	}

	/// Makes `pushState`/`replaceState` throw.
	pub fn set_push_state_fails(&self, fails: bool) {
		self.inner.push_state_fails.set(fails);
	}

	/// Current origin-relative URL.
	pub fn url(&self) -> String {
		let entries = self.inner.entries.borrow();
		entries[self.inner.index.get()].url.clone()
	}

	/// All entry URLs.
	pub fn urls(&self) -> Vec<String> {
		self.inner
			.entries
			.borrow()
			.iter()
			.map(|entry| entry.url.clone())
			.collect()
	}

	/// Cursor position in the entry stack.
	pub fn index(&self) -> usize {
		self.inner.index.get()
	}

	/// Physical writes performed so far.
	pub fn writes(&self) -> Vec<(WriteOp, String)> {
		self.inner.writes.borrow().clone()
	}

	/// Forgets recorded writes.
	pub fn clear_writes(&self) {
		self.inner.writes.borrow_mut().clear();
	}

	/// Number of registered event listeners.
	pub fn listener_count(&self) -> usize {
		self.inner.listeners.borrow().len()
	}

	/// Dispatches `event` to listeners without changing the URL, as browsers
	/// do for the spurious load-time `popstate`.
	pub fn dispatch(&self, event: WindowEvent) {
		let state = self.current_entry_state();
		let listeners: Vec<WindowListener> = self
			.inner
			.listeners
			.borrow()
			.iter()
			.filter(|(_, kind, _)| *kind == event)
			.map(|(_, _, listener)| Rc::clone(listener))
			.collect();
		for listener in listeners {
			listener(state.clone());
		}
	}

	/// Simulates the user typing a new fragment into the address bar.
	pub fn user_sets_hash(&self, fragment: &str) {
		let url = self.url();
		let (path, search, _) = split_url(&url);
		self.push_entry(format!("{}{}#{}", path, search, fragment), None);
		if self.inner.push_state_supported.get() {
			self.dispatch(WindowEvent::PopState);
		}
		self.dispatch(WindowEvent::HashChange);
	}

	fn current_entry_state(&self) -> Option<EntryState> {
		let entries = self.inner.entries.borrow();
		entries[self.inner.index.get()].state.clone()
	}

	fn push_entry(&self, url: String, state: Option<EntryState>) {
		let mut entries = self.inner.entries.borrow_mut();
		entries.truncate(self.inner.index.get() + 1);
		entries.push(FakeEntry { url, state });
		self.inner.index.set(entries.len() - 1);
	}

	fn replace_entry(&self, url: String, state: Option<EntryState>) {
		let mut entries = self.inner.entries.borrow_mut();
		entries[self.inner.index.get()] = FakeEntry { url, state };
	}

	fn record(&self, op: WriteOp, url: &str) {
		self.inner.writes.borrow_mut().push((op, url.to_string()));
	}

	fn check_push_state(&self) -> Result<(), HistoryError> {
		if !self.inner.push_state_supported.get() {
			return Err(HistoryError::Unavailable("pushState"));
		}
		if self.inner.push_state_fails.get() {
			return Err(HistoryError::Js("SecurityError".to_string()));
		}
		Ok(())
	}
}

impl BrowserWindow for FakeWindow {
	fn pathname(&self) -> String {
		let url = self.url();
		split_url(&url).0.to_string()
	}

	fn search(&self) -> String {
		let url = self.url();
		split_url(&url).1.to_string()
	}

	fn hash(&self) -> String {
		let url = self.url();
		split_url(&url).2.to_string()
	}

	fn href(&self) -> String {
		format!("{}{}", ORIGIN, self.url())
	}

	fn supports_push_state(&self) -> bool {
		self.inner.push_state_supported.get()
	}

	fn push_state(&self, state: &EntryState, url: &str) -> Result<(), HistoryError> {
		self.check_push_state()?;
		let url = strip_origin(url);
		self.record(WriteOp::PushState, &url);
		self.push_entry(url, Some(state.clone()));
		Ok(())
	}

	fn replace_state(&self, state: &EntryState, url: &str) -> Result<(), HistoryError> {
		self.check_push_state()?;
		let url = strip_origin(url);
		self.record(WriteOp::ReplaceState, &url);
		self.replace_entry(url, Some(state.clone()));
		Ok(())
	}

	fn history_state(&self) -> Option<EntryState> {
		self.current_entry_state()
	}

	fn go(&self, delta: i32) -> Result<(), HistoryError> {
		let previous = self.url();
		let target = self.inner.index.get() as i64 + i64::from(delta);
		if delta == 0 || target < 0 || target >= self.inner.entries.borrow().len() as i64 {
			return Ok(());
		}
		self.inner.index.set(target as usize);

		if self.inner.push_state_supported.get() {
			self.dispatch(WindowEvent::PopState);
		}
		if split_url(&previous).2 != split_url(&self.url()).2 {
			self.dispatch(WindowEvent::HashChange);
		}
		Ok(())
	}

	fn assign(&self, url: &str) -> Result<(), HistoryError> {
		let url = strip_origin(url);
		self.record(WriteOp::Assign, &url);
		self.push_entry(url, None);
		Ok(())
	}

	fn replace_location(&self, url: &str) -> Result<(), HistoryError> {
		let url = strip_origin(url);
		self.record(WriteOp::ReplaceLocation, &url);
		self.replace_entry(url, None);
		Ok(())
	}

	fn set_hash(&self, hash: &str) -> Result<(), HistoryError> {
		let url = self.url();
		let (path, search, _) = split_url(&url);
		let url = format!("{}{}#{}", path, search, hash.trim_start_matches('#'));
		self.record(WriteOp::SetHash, &url);
		self.push_entry(url, None);
		Ok(())
	}

	fn subscribe(
		&self,
		event: WindowEvent,
		listener: WindowListener,
	) -> Result<Subscription, HistoryError> {
		let id = self.inner.next_id.get();
		self.inner.next_id.set(id + 1);
		self.inner.listeners.borrow_mut().push((id, event, listener));

		let weak = Rc::downgrade(&self.inner);
		Ok(Subscription::new(move || {
			if let Some(inner) = weak.upgrade() {
				inner.listeners.borrow_mut().retain(|(other, _, _)| *other != id);
			}
		}))
	}
}

/// Viewport recording every scroll it is asked to perform.
#[derive(Default)]
pub struct RecordingViewport {
	offset: Cell<ScrollPosition>,
	scrolls: RefCell<Vec<ScrollPosition>>,
	elements: RefCell<HashMap<String, ScrollPosition>>,
	took_control: Cell<bool>,
}

impl RecordingViewport {
	pub fn new() -> Rc<Self> {
		Rc::new(Self::default())
	}

	/// Simulates the user scrolling.
	pub fn user_scrolls_to(&self, x: f64, y: f64) {
		self.offset.set(ScrollPosition::new(x, y));
	}

	/// Places an element matched by `selector` at a document offset.
	pub fn add_element(&self, selector: &str, x: f64, y: f64) {
		self.elements
			.borrow_mut()
			.insert(selector.to_string(), ScrollPosition::new(x, y));
	}

	pub fn scrolls(&self) -> Vec<ScrollPosition> {
		self.scrolls.borrow().clone()
	}

	pub fn last_scroll(&self) -> Option<ScrollPosition> {
		self.scrolls.borrow().last().copied()
	}

	pub fn took_control(&self) -> bool {
		self.took_control.get()
	}
}

impl Viewport for RecordingViewport {
	fn scroll_offset(&self) -> ScrollPosition {
		self.offset.get()
	}

	fn scroll_to(&self, position: ScrollPosition) {
		self.offset.set(position);
		self.scrolls.borrow_mut().push(position);
	}

	fn element_offset(&self, selector: &str) -> Option<ScrollPosition> {
		self.elements.borrow().get(selector).copied()
	}

	fn take_scroll_control(&self) {
		self.took_control.set(true);
	}
}

/// Parks transitions to selected paths until the test releases them.
#[derive(Clone, Default)]
pub struct GuardGate {
	held: Rc<RefCell<Vec<(String, Next)>>>,
}

impl GuardGate {
	pub fn new() -> Self {
		Self::default()
	}

	/// A guard holding transitions whose target path is in `paths` and
	/// letting everything else through.
	pub fn guard(&self, paths: &[&str]) -> impl NavigationGuard + 'static {
		let held = Rc::clone(&self.held);
		let paths: Vec<String> = paths.iter().map(|path| path.to_string()).collect();
		deferred_guard(move |to: &Route, _from: &Route, next: Next| {
			if paths.iter().any(|path| path == to.path()) {
				held.borrow_mut().push((to.path().to_string(), next));
			} else {
				next.proceed();
			}
		})
	}

	/// Number of parked transitions.
	pub fn held(&self) -> usize {
		self.held.borrow().len()
	}

	/// Takes the continuation parked for `path`.
	pub fn take(&self, path: &str) -> Next {
		let mut held = self.held.borrow_mut();
		let index = held
			.iter()
			.position(|(held_path, _)| held_path == path)
			.unwrap_or_else(|| panic!("No transition to {} is parked", path));
		held.remove(index).1
	}
}

/// Records the continuations of navigations.
#[derive(Clone, Default)]
pub struct Outcomes {
	completed: Rc<RefCell<Vec<String>>>,
	aborted: Rc<RefCell<Vec<NavigationFailure>>>,
}

impl Outcomes {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn on_complete(&self) -> Option<OnComplete> {
		let sink = Rc::clone(&self.completed);
		Some(Box::new(move |route: Route| {
			sink.borrow_mut().push(route.full_path().to_string())
		}))
	}

	pub fn on_abort(&self) -> Option<OnAbort> {
		let sink = Rc::clone(&self.aborted);
		Some(Box::new(move |failure: NavigationFailure| {
			sink.borrow_mut().push(failure)
		}))
	}

	/// Full paths of completed navigations.
	pub fn completed(&self) -> Vec<String> {
		self.completed.borrow().clone()
	}

	/// Failures of aborted navigations.
	pub fn aborted(&self) -> Vec<NavigationFailure> {
		self.aborted.borrow().clone()
	}
}
