//! Route resolution.
//!
//! The transition engine only needs "given a location and the current route,
//! produce a resolved [`Route`] or fail". [`RouteResolver`] is that seam;
//! [`RouteTable`] is the pattern-based implementation used by default.

use crate::codec::{clean_path, resolve_path};
use crate::error::{HistoryError, NavigationFailure};
use crate::location::{Location, LocationTarget};
use crate::pattern::PathPattern;
use crate::route::{Route, RouteRecord};
use std::collections::HashMap;
use std::rc::Rc;

/// Maximum number of record redirects followed for a single resolution.
const MAX_REDIRECTS: usize = 8;

/// Turns a [`Location`] into a [`Route`].
pub trait RouteResolver {
	/// Resolves `location` relative to `current`.
	fn resolve(&self, location: &Location, current: &Route) -> Result<Route, NavigationFailure>;
}

impl<F> RouteResolver for F
where
	F: Fn(&Location, &Route) -> Result<Route, NavigationFailure>,
{
	fn resolve(&self, location: &Location, current: &Route) -> Result<Route, NavigationFailure> {
		self(location, current)
	}
}

struct TableEntry {
	pattern: PathPattern,
	chain: Vec<Rc<RouteRecord>>,
}

/// Pattern-based route table.
///
/// Entries are tried in registration order. Children are registered ahead of
/// their parent so a child with an empty pattern wins over the bare parent.
#[derive(Default)]
pub struct RouteTable {
	entries: Vec<TableEntry>,
	named: HashMap<String, usize>,
}

impl std::fmt::Debug for RouteTable {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RouteTable")
			.field(
				"patterns",
				&self
					.entries
					.iter()
					.map(|entry| entry.pattern.pattern())
					.collect::<Vec<_>>(),
			)
			.field("named", &self.named.keys().collect::<Vec<_>>())
			.finish()
	}
}

impl RouteTable {
	/// Creates an empty table.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a record and its children.
	///
	/// # Panics
	///
	/// Panics if a pattern is invalid. Use [`try_route`](Self::try_route) for
	/// fallible construction.
	pub fn route(self, record: RouteRecord) -> Self {
		self.try_route(record)
			.unwrap_or_else(|e| panic!("Invalid route table: {}", e))
	}

	/// Adds a record and its children.
	pub fn try_route(mut self, record: RouteRecord) -> Result<Self, HistoryError> {
		self.insert(record, "", &[])?;
		Ok(self)
	}

	fn insert(
		&mut self,
		mut record: RouteRecord,
		prefix: &str,
		parents: &[Rc<RouteRecord>],
	) -> Result<(), HistoryError> {
		let full = if prefix.is_empty() || record.path().starts_with('/') {
			record.path().to_string()
		} else if record.path().is_empty() {
			prefix.to_string()
		} else {
			clean_path(&format!("{}/{}", prefix, record.path()))
		};
		let pattern = PathPattern::new(&full)?;

		let children = std::mem::take(&mut record.children);
		let record = Rc::new(record);
		let mut chain = parents.to_vec();
		chain.push(Rc::clone(&record));

		for child in children {
			self.insert(child, &full, &chain)?;
		}

		if let Some(name) = record.name() {
			if self.named.contains_key(name) {
				tracing::warn!(name, path = %full, "Duplicate route name; the later record wins");
			}
			self.named.insert(name.to_string(), self.entries.len());
		}
		self.entries.push(TableEntry { pattern, chain });
		Ok(())
	}

	/// Returns the number of entries, nested records included.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Returns whether the table is empty.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Checks whether a route name exists.
	pub fn has_route(&self, name: &str) -> bool {
		self.named.contains_key(name)
	}

	/// Builds a path for a named route.
	pub fn reverse(
		&self,
		name: &str,
		params: &HashMap<String, String>,
	) -> Result<String, NavigationFailure> {
		let index = self
			.named
			.get(name)
			.ok_or_else(|| NavigationFailure::InvalidRouteName(name.to_string()))?;
		self.entries[*index]
			.pattern
			.reverse(params)
			.map_err(NavigationFailure::MissingParameter)
	}

	fn match_path(&self, path: &str) -> Option<(&TableEntry, HashMap<String, String>)> {
		self.entries
			.iter()
			.find_map(|entry| entry.pattern.matches(path).map(|params| (entry, params)))
	}

	fn resolve_with_depth(
		&self,
		location: &Location,
		current: &Route,
		depth: usize,
	) -> Result<Route, NavigationFailure> {
		let path = match &location.target {
			LocationTarget::Named { name, params } => self.reverse(name, params)?,
			LocationTarget::Path(raw) if raw.is_empty() => current.path().to_string(),
			LocationTarget::Path(raw) => resolve_path(raw, current.path(), location.append),
		};

		let (entry, params) = self
			.match_path(&path)
			.ok_or_else(|| NavigationFailure::NotFound(path.clone()))?;

		let route = Route::new(path.clone())
			.with_name(entry.chain.last().and_then(|r| r.name()).map(str::to_string))
			.with_params(params)
			.with_query(location.query.clone())
			.with_hash(location.hash.clone())
			.with_matched(entry.chain.clone())
			.with_state(location.state.clone());

		let Some(redirect) = entry.chain.last().and_then(|r| r.redirect()) else {
			return Ok(route);
		};
		if depth >= MAX_REDIRECTS {
			tracing::warn!(path = %path, "Too many route redirects");
			return Err(NavigationFailure::NotFound(path));
		}

		let mut target = Location::path(redirect);
		if target.query.is_empty() {
			target.query = location.query.clone();
		}
		if target.hash.is_empty() {
			target.hash = location.hash.clone();
		}
		target.state = location.state.clone();

		let redirected = self.resolve_with_depth(&target, &route, depth + 1)?;
		let origin = route.full_path().to_string();
		Ok(redirected.with_redirected_from(Some(origin)))
	}
}

impl RouteResolver for RouteTable {
	fn resolve(&self, location: &Location, current: &Route) -> Result<Route, NavigationFailure> {
		self.resolve_with_depth(location, current, 0)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};

	#[fixture]
	fn table() -> RouteTable {
		RouteTable::new()
			.route(RouteRecord::named("home", "/"))
			.route(RouteRecord::named("user", "/users/{id}"))
			.route(
				RouteRecord::named("admin", "/admin")
					.with_meta("title", "Admin")
					.with_child(RouteRecord::named("admin_index", ""))
					.with_child(RouteRecord::named("admin_users", "users")),
			)
			.route(RouteRecord::new("/old/{id}").redirect_to("/users/1"))
	}

	#[rstest]
	fn test_resolve_absolute_path(table: RouteTable) {
		let route = table
			.resolve(&Location::from("/users/5?tab=posts#info"), &Route::start())
			.unwrap();
		assert_eq!(route.name(), Some("user"));
		assert_eq!(route.param("id"), Some("5"));
		assert_eq!(route.full_path(), "/users/5?tab=posts#info");
		assert_eq!(route.matched().len(), 1);
	}

	#[rstest]
	fn test_resolve_relative_path(table: RouteTable) {
		let current = table
			.resolve(&Location::from("/users/5"), &Route::start())
			.unwrap();
		let route = table.resolve(&Location::from("6"), &current).unwrap();
		assert_eq!(route.path(), "/users/6");
	}

	#[rstest]
	fn test_resolve_query_only_keeps_path(table: RouteTable) {
		let current = table
			.resolve(&Location::from("/users/5"), &Route::start())
			.unwrap();
		let route = table.resolve(&Location::from("?tab=likes"), &current).unwrap();
		assert_eq!(route.full_path(), "/users/5?tab=likes");
	}

	#[rstest]
	fn test_resolve_named(table: RouteTable) {
		let route = table
			.resolve(&Location::named("user", [("id", "42")]), &Route::start())
			.unwrap();
		assert_eq!(route.path(), "/users/42");
	}

	#[rstest]
	fn test_resolve_named_errors(table: RouteTable) {
		assert_eq!(
			table
				.resolve(&Location::named("nope", Vec::<(String, String)>::new()), &Route::start())
				.unwrap_err(),
			NavigationFailure::InvalidRouteName("nope".to_string())
		);
		assert_eq!(
			table
				.resolve(&Location::named("user", Vec::<(String, String)>::new()), &Route::start())
				.unwrap_err(),
			NavigationFailure::MissingParameter("id".to_string())
		);
	}

	#[rstest]
	fn test_resolve_nested_chain(table: RouteTable) {
		let route = table
			.resolve(&Location::from("/admin/users"), &Route::start())
			.unwrap();
		assert_eq!(route.name(), Some("admin_users"));
		assert_eq!(route.matched().len(), 2);
		assert_eq!(route.meta("title"), Some("Admin"));

		let index = table.resolve(&Location::from("/admin"), &Route::start()).unwrap();
		assert_eq!(index.name(), Some("admin_index"));
	}

	#[rstest]
	fn test_resolve_not_found(table: RouteTable) {
		assert_eq!(
			table
				.resolve(&Location::from("/missing"), &Route::start())
				.unwrap_err(),
			NavigationFailure::NotFound("/missing".to_string())
		);
	}

	#[rstest]
	fn test_record_redirect(table: RouteTable) {
		let route = table
			.resolve(&Location::from("/old/9?x=1"), &Route::start())
			.unwrap();
		assert_eq!(route.full_path(), "/users/1?x=1");
		assert_eq!(route.redirected_from(), Some("/old/9?x=1"));
	}

	#[rstest]
	fn test_redirect_loop_is_bounded() {
		let table = RouteTable::new()
			.route(RouteRecord::new("/a").redirect_to("/b"))
			.route(RouteRecord::new("/b").redirect_to("/a"));
		assert!(matches!(
			table.resolve(&Location::from("/a"), &Route::start()),
			Err(NavigationFailure::NotFound(_))
		));
	}

	#[rstest]
	fn test_closure_resolver() {
		let resolver = |location: &Location, _current: &Route| -> Result<Route, NavigationFailure> {
			Ok(Route::new(location.describe()))
		};
		let route = resolver
			.resolve(&Location::from("/anything"), &Route::start())
			.unwrap();
		assert_eq!(route.path(), "/anything");
	}
}
