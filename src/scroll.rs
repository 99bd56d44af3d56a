//! Scroll restoration.
//!
//! Every history entry written while scroll restoration is enabled carries a
//! key ([`EntryState::key`]). Before the active entry is left (push, or a
//! back/forward traversal) its viewport offset is saved under that key. When
//! the user later traverses back to it, the saved offset is offered to the
//! configured [`ScrollBehavior`], which decides where to scroll.

use crate::backend::{EntryState, HistoryBackend, StateKey, WriteKind};
use crate::route::Route;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

/// Maximum number of saved offsets kept; the oldest key is evicted first.
pub const MAX_SAVED_POSITIONS: usize = 256;

/// A document scroll offset in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollPosition {
	/// Horizontal offset.
	pub x: f64,
	/// Vertical offset.
	pub y: f64,
}

impl ScrollPosition {
	/// Creates a position.
	pub fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	/// The top-left corner of the document.
	pub fn top() -> Self {
		Self::default()
	}
}

/// Where to scroll after a navigation.
#[derive(Debug, Clone, PartialEq)]
pub enum ScrollTarget {
	/// An absolute document offset.
	Position(ScrollPosition),
	/// An element, optionally shifted up/left by `offset` (for fixed headers).
	Selector {
		/// CSS selector; `#id` selectors are looked up by id.
		selector: String,
		/// Subtracted from the element's document offset.
		offset: ScrollPosition,
	},
}

/// Scroll policy.
pub trait ScrollBehavior {
	/// Computes where to scroll when navigating from `from` to `to`.
	///
	/// `saved` is the offset stored for the entry being restored and is only
	/// ever `Some` for back/forward navigations. `None` means "do not scroll".
	fn scroll_target(
		&self,
		to: &Route,
		from: &Route,
		saved: Option<ScrollPosition>,
	) -> Option<ScrollTarget>;
}

impl<F> ScrollBehavior for F
where
	F: Fn(&Route, &Route, Option<ScrollPosition>) -> Option<ScrollTarget>,
{
	fn scroll_target(
		&self,
		to: &Route,
		from: &Route,
		saved: Option<ScrollPosition>,
	) -> Option<ScrollTarget> {
		self(to, from, saved)
	}
}

/// Restores saved offsets, otherwise scrolls to the route's anchor, otherwise
/// to the top.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultScrollBehavior;

impl ScrollBehavior for DefaultScrollBehavior {
	fn scroll_target(
		&self,
		to: &Route,
		_from: &Route,
		saved: Option<ScrollPosition>,
	) -> Option<ScrollTarget> {
		if let Some(position) = saved {
			return Some(ScrollTarget::Position(position));
		}
		if !to.hash().is_empty() {
			return Some(ScrollTarget::Selector {
				selector: to.hash().to_string(),
				offset: ScrollPosition::default(),
			});
		}
		Some(ScrollTarget::Position(ScrollPosition::top()))
	}
}

/// The document viewport.
pub trait Viewport {
	/// Current document scroll offset.
	fn scroll_offset(&self) -> ScrollPosition;

	/// Scrolls the document to `position`.
	fn scroll_to(&self, position: ScrollPosition);

	/// Document offset of the element matching `selector`.
	fn element_offset(&self, selector: &str) -> Option<ScrollPosition>;

	/// Disables the browser's own restoration (`history.scrollRestoration`).
	fn take_scroll_control(&self) {}
}

#[derive(Default)]
struct PositionStore {
	positions: HashMap<StateKey, ScrollPosition>,
	order: VecDeque<StateKey>,
}

impl PositionStore {
	fn insert(&mut self, key: StateKey, position: ScrollPosition) {
		if self.positions.insert(key.clone(), position).is_none() {
			self.order.push_back(key);
			while self.order.len() > MAX_SAVED_POSITIONS {
				if let Some(oldest) = self.order.pop_front() {
					self.positions.remove(&oldest);
				}
			}
		}
	}

	fn get(&self, key: &str) -> Option<ScrollPosition> {
		self.positions.get(key).copied()
	}
}

/// Saves offsets per history entry and applies a [`ScrollBehavior`].
pub struct ScrollCoordinator {
	behavior: Rc<dyn ScrollBehavior>,
	viewport: Rc<dyn Viewport>,
	store: RefCell<PositionStore>,
	active_key: RefCell<Option<StateKey>>,
	seed: u64,
	counter: Cell<u64>,
}

impl std::fmt::Debug for ScrollCoordinator {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ScrollCoordinator")
			.field("active_key", &self.active_key.borrow())
			.field("saved", &self.store.borrow().positions.len())
			.finish()
	}
}

impl ScrollCoordinator {
	/// Creates a coordinator. Keys are generated as `"{seed}.{n}"`; the seed
	/// should differ between page loads.
	pub fn new(behavior: Rc<dyn ScrollBehavior>, viewport: Rc<dyn Viewport>, seed: u64) -> Self {
		Self {
			behavior,
			viewport,
			store: RefCell::new(PositionStore::default()),
			active_key: RefCell::new(None),
			seed,
			counter: Cell::new(0),
		}
	}

	/// One-time setup: takes over scroll restoration and keys the current
	/// entry so that returning to it restores its offset.
	pub fn setup<B: HistoryBackend + ?Sized>(&self, backend: &B) {
		self.viewport.take_scroll_control();

		let mut state = backend.current_state().unwrap_or_default();
		let key = match state.key.clone() {
			Some(key) => key,
			None => {
				let key = self.generate_key();
				state.key = Some(key.clone());
				// State only: the URL must stay exactly as loaded.
				if let Err(err) = backend.replace_entry_state(&state) {
					tracing::warn!(error = %err, "Failed to key the initial history entry");
				}
				key
			}
		};
		*self.active_key.borrow_mut() = Some(key);
	}

	fn generate_key(&self) -> StateKey {
		let n = self.counter.get();
		self.counter.set(n + 1);
		format!("{}.{}", self.seed, n)
	}

	/// Returns the key of the active entry.
	pub fn active_key(&self) -> Option<StateKey> {
		self.active_key.borrow().clone()
	}

	/// Makes `key` the active entry key (after a traversal).
	pub fn set_active_key(&self, key: Option<StateKey>) {
		*self.active_key.borrow_mut() = key;
	}

	/// Saves the viewport offset under the active key.
	pub fn save_position(&self) {
		let Some(key) = self.active_key() else {
			return;
		};
		let position = self.viewport.scroll_offset();
		self.store.borrow_mut().insert(key, position);
	}

	/// Returns the offset saved for `key`.
	pub fn saved_position(&self, key: &str) -> Option<ScrollPosition> {
		self.store.borrow().get(key)
	}

	/// Saves the current offset and returns the key for an entry about to be
	/// written: a fresh key for a push, the active key for a replace.
	pub fn key_for_write(&self, kind: WriteKind) -> StateKey {
		self.save_position();
		let reuse = match kind {
			WriteKind::Replace => self.active_key(),
			WriteKind::Push => None,
		};
		let key = reuse.unwrap_or_else(|| self.generate_key());
		*self.active_key.borrow_mut() = Some(key.clone());
		key
	}

	/// Entry state for a write, carrying the scroll key and `data`.
	pub fn entry_state(&self, kind: WriteKind, data: Option<serde_json::Value>) -> EntryState {
		EntryState {
			key: Some(self.key_for_write(kind)),
			data,
		}
	}

	/// Computes the scroll target for `to` and applies it.
	pub fn compute_and_apply(&self, to: &Route, from: &Route, is_pop: bool) {
		let saved = if is_pop {
			self.active_key().and_then(|key| self.saved_position(&key))
		} else {
			None
		};

		let Some(target) = self.behavior.scroll_target(to, from, saved) else {
			return;
		};
		match target {
			ScrollTarget::Position(position) => self.viewport.scroll_to(position),
			ScrollTarget::Selector { selector, offset } => {
				match self.viewport.element_offset(&selector) {
					Some(element) => self.viewport.scroll_to(ScrollPosition::new(
						element.x - offset.x,
						element.y - offset.y,
					)),
					None => {
						tracing::debug!(selector = %selector, "Scroll target element not found");
					}
				}
			}
		}
	}
}
