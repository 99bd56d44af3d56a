//! In-memory history backend.
//!
//! Keeps its own entry stack, for non-browser environments (server-side
//! rendering, tests, embedded webviews without a URL bar). `go` behaves like a
//! browser: it moves the cursor and notifies listeners, and out-of-range
//! offsets are ignored.

use super::{
	ChangeListener, EntryState, ExternalChange, HistoryBackend, Subscription, WriteKind,
};
use crate::error::HistoryError;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

struct MemoryInner {
	entries: RefCell<Vec<(String, EntryState)>>,
	index: Cell<usize>,
	listeners: RefCell<Vec<(u64, ChangeListener)>>,
	next_listener_id: Cell<u64>,
	writes: Cell<usize>,
}

/// History backend holding entries in memory.
#[derive(Clone)]
pub struct MemoryBackend {
	inner: Rc<MemoryInner>,
}

impl std::fmt::Debug for MemoryBackend {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MemoryBackend")
			.field("entries", &self.entries())
			.field("index", &self.index())
			.finish()
	}
}

impl Default for MemoryBackend {
	fn default() -> Self {
		Self::new("/")
	}
}

impl MemoryBackend {
	/// Creates a backend whose single entry is `initial`.
	pub fn new(initial: impl Into<String>) -> Self {
		Self {
			inner: Rc::new(MemoryInner {
				entries: RefCell::new(vec![(initial.into(), EntryState::default())]),
				index: Cell::new(0),
				listeners: RefCell::new(Vec::new()),
				next_listener_id: Cell::new(0),
				writes: Cell::new(0),
			}),
		}
	}

	/// Returns the locations of all entries.
	pub fn entries(&self) -> Vec<String> {
		self.inner
			.entries
			.borrow()
			.iter()
			.map(|(location, _)| location.clone())
			.collect()
	}

	/// Returns the cursor position.
	pub fn index(&self) -> usize {
		self.inner.index.get()
	}

	/// Returns the number of writes performed so far.
	pub fn write_count(&self) -> usize {
		self.inner.writes.get()
	}
}

impl HistoryBackend for MemoryBackend {
	fn current_location(&self) -> String {
		let entries = self.inner.entries.borrow();
		entries
			.get(self.inner.index.get())
			.map(|(location, _)| location.clone())
			.unwrap_or_else(|| "/".to_string())
	}

	fn write_location(
		&self,
		full_path: &str,
		kind: WriteKind,
		state: &EntryState,
	) -> Result<(), HistoryError> {
		let mut entries = self.inner.entries.borrow_mut();
		let index = self.inner.index.get();
		let entry = (full_path.to_string(), state.clone());
		match kind {
			WriteKind::Push => {
				entries.truncate(index + 1);
				entries.push(entry);
				self.inner.index.set(entries.len() - 1);
			}
			WriteKind::Replace => entries[index] = entry,
		}
		self.inner.writes.set(self.inner.writes.get() + 1);
		Ok(())
	}

	fn replace_entry_state(&self, state: &EntryState) -> Result<(), HistoryError> {
		let mut entries = self.inner.entries.borrow_mut();
		if let Some((_, current)) = entries.get_mut(self.inner.index.get()) {
			*current = state.clone();
		}
		Ok(())
	}

	fn go(&self, delta: i32) -> Result<(), HistoryError> {
		let change = {
			let entries = self.inner.entries.borrow();
			let target = self.inner.index.get() as i64 + i64::from(delta);
			if delta == 0 || target < 0 || target >= entries.len() as i64 {
				return Ok(());
			}
			self.inner.index.set(target as usize);
			let (location, state) = &entries[target as usize];
			ExternalChange {
				location: location.clone(),
				state: Some(state.clone()),
			}
		};

		let listeners: Vec<ChangeListener> = self
			.inner
			.listeners
			.borrow()
			.iter()
			.map(|(_, listener)| Rc::clone(listener))
			.collect();
		for listener in listeners {
			listener(change.clone());
		}
		Ok(())
	}

	fn listen(&self, listener: ChangeListener) -> Result<Subscription, HistoryError> {
		let id = self.inner.next_listener_id.get();
		self.inner.next_listener_id.set(id + 1);
		self.inner.listeners.borrow_mut().push((id, listener));

		let weak = Rc::downgrade(&self.inner);
		Ok(Subscription::new(move || {
			if let Some(inner) = weak.upgrade() {
				inner.listeners.borrow_mut().retain(|(other, _)| *other != id);
			}
		}))
	}

	fn current_state(&self) -> Option<EntryState> {
		let entries = self.inner.entries.borrow();
		entries
			.get(self.inner.index.get())
			.map(|(_, state)| state.clone())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_push_truncates_forward_entries() {
		let backend = MemoryBackend::new("/");
		let state = EntryState::default();
		backend.write_location("/a", WriteKind::Push, &state).unwrap();
		backend.write_location("/b", WriteKind::Push, &state).unwrap();
		backend.go(-2).unwrap();
		backend.write_location("/c", WriteKind::Push, &state).unwrap();

		assert_eq!(backend.entries(), vec!["/", "/c"]);
		assert_eq!(backend.current_location(), "/c");
		assert_eq!(backend.write_count(), 3);
	}

	#[rstest]
	fn test_replace_overwrites_current_entry() {
		let backend = MemoryBackend::new("/");
		backend
			.write_location("/a", WriteKind::Replace, &EntryState::with_key("k"))
			.unwrap();
		assert_eq!(backend.entries(), vec!["/a"]);
		assert_eq!(backend.current_state(), Some(EntryState::with_key("k")));
	}

	#[rstest]
	fn test_go_notifies_listeners_and_ignores_out_of_range() {
		let backend = MemoryBackend::new("/");
		backend
			.write_location("/a", WriteKind::Push, &EntryState::default())
			.unwrap();

		let seen = Rc::new(RefCell::new(Vec::new()));
		let sink = seen.clone();
		let subscription = backend
			.listen(Rc::new(move |change: ExternalChange| {
				sink.borrow_mut().push(change.location)
			}))
			.unwrap();

		backend.go(-1).unwrap();
		backend.go(-1).unwrap();
		backend.go(5).unwrap();
		assert_eq!(*seen.borrow(), vec!["/".to_string()]);
		assert_eq!(backend.index(), 0);

		drop(subscription);
		backend.go(1).unwrap();
		assert_eq!(seen.borrow().len(), 1);
		assert_eq!(backend.current_location(), "/a");
	}
}
