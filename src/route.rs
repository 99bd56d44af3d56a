//! Resolved routes and route records.

use crate::guard::NavigationGuard;
use crate::location::Query;
use std::collections::HashMap;
use std::rc::Rc;

/// A route table entry: a path pattern plus the metadata attached to it.
///
/// Records nest: a child's relative pattern is joined onto its parent's, and
/// a match on the child yields the chain `[parent, child]`.
pub struct RouteRecord {
	path: String,
	name: Option<String>,
	redirect: Option<String>,
	meta: HashMap<String, String>,
	guards: Vec<Rc<dyn NavigationGuard>>,
	pub(crate) children: Vec<RouteRecord>,
}

impl std::fmt::Debug for RouteRecord {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RouteRecord")
			.field("path", &self.path)
			.field("name", &self.name)
			.field("redirect", &self.redirect)
			.field("guards", &self.guards.len())
			.field("children", &self.children.len())
			.finish()
	}
}

impl RouteRecord {
	/// Creates a record for `path`.
	pub fn new(path: impl Into<String>) -> Self {
		Self {
			path: path.into(),
			name: None,
			redirect: None,
			meta: HashMap::new(),
			guards: Vec::new(),
			children: Vec::new(),
		}
	}

	/// Creates a named record.
	pub fn named(name: impl Into<String>, path: impl Into<String>) -> Self {
		Self::new(path).with_name(name)
	}

	/// Sets the route name.
	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	/// Redirects every match of this record to `target`.
	pub fn redirect_to(mut self, target: impl Into<String>) -> Self {
		self.redirect = Some(target.into());
		self
	}

	/// Adds a metadata entry.
	pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.meta.insert(key.into(), value.into());
		self
	}

	/// Adds a guard that runs when this record is entered.
	pub fn with_guard<G>(mut self, guard: G) -> Self
	where
		G: NavigationGuard + 'static,
	{
		self.guards.push(Rc::new(guard));
		self
	}

	/// Adds a nested record.
	pub fn with_child(mut self, child: RouteRecord) -> Self {
		self.children.push(child);
		self
	}

	/// Returns the pattern as written (relative for nested records).
	pub fn path(&self) -> &str {
		&self.path
	}

	/// Returns the route name.
	pub fn name(&self) -> Option<&str> {
		self.name.as_deref()
	}

	/// Returns the redirect target.
	pub fn redirect(&self) -> Option<&str> {
		self.redirect.as_deref()
	}

	/// Returns a metadata value.
	pub fn meta(&self, key: &str) -> Option<&str> {
		self.meta.get(key).map(String::as_str)
	}

	/// Returns the enter guards.
	pub fn guards(&self) -> &[Rc<dyn NavigationGuard>] {
		&self.guards
	}
}

#[derive(Debug, Clone, Default)]
struct RouteInner {
	name: Option<String>,
	path: String,
	full_path: String,
	params: HashMap<String, String>,
	query: Query,
	hash: String,
	matched: Vec<Rc<RouteRecord>>,
	state: Option<serde_json::Value>,
	redirected_from: Option<String>,
}

impl RouteInner {
	fn refresh_full_path(&mut self) {
		self.full_path = format!("{}{}{}", self.path, self.query.to_query_string(), self.hash);
	}
}

/// A resolved route. Immutable once built and cheap to clone.
#[derive(Clone)]
pub struct Route(Rc<RouteInner>);

thread_local! {
	static START: Route = Route::new("/");
}

impl std::fmt::Debug for Route {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Route")
			.field("name", &self.0.name)
			.field("full_path", &self.0.full_path)
			.field("params", &self.0.params)
			.field("matched", &self.0.matched.len())
			.field("start", &self.is_start())
			.finish()
	}
}

impl Route {
	/// Creates a route for `path` with nothing matched.
	pub fn new(path: impl Into<String>) -> Self {
		let mut inner = RouteInner {
			path: path.into(),
			..RouteInner::default()
		};
		inner.refresh_full_path();
		Self(Rc::new(inner))
	}

	/// Returns the START sentinel: the current route before any navigation has
	/// completed.
	pub fn start() -> Self {
		START.with(Route::clone)
	}

	/// Returns whether this is the START sentinel.
	///
	/// Compares identity, so a resolved route for `/` is never START.
	pub fn is_start(&self) -> bool {
		START.with(|start| Rc::ptr_eq(&self.0, &start.0))
	}

	fn edit(mut self, f: impl FnOnce(&mut RouteInner)) -> Self {
		let inner = Rc::make_mut(&mut self.0);
		f(inner);
		inner.refresh_full_path();
		self
	}

	/// Sets the route name.
	pub fn with_name(self, name: Option<String>) -> Self {
		self.edit(|inner| inner.name = name)
	}

	/// Sets the path parameters.
	pub fn with_params(self, params: HashMap<String, String>) -> Self {
		self.edit(|inner| inner.params = params)
	}

	/// Sets the query.
	pub fn with_query(self, query: Query) -> Self {
		self.edit(|inner| inner.query = query)
	}

	/// Sets the hash fragment (including `#`).
	pub fn with_hash(self, hash: impl Into<String>) -> Self {
		let hash = hash.into();
		self.edit(|inner| inner.hash = hash)
	}

	/// Sets the matched record chain, outermost first.
	pub fn with_matched(self, matched: Vec<Rc<RouteRecord>>) -> Self {
		self.edit(|inner| inner.matched = matched)
	}

	/// Sets the entry state payload.
	pub fn with_state(self, state: Option<serde_json::Value>) -> Self {
		self.edit(|inner| inner.state = state)
	}

	/// Records the full path this route was redirected from.
	pub fn with_redirected_from(self, from: Option<String>) -> Self {
		self.edit(|inner| inner.redirected_from = from)
	}

	/// Route name of the deepest matched record.
	pub fn name(&self) -> Option<&str> {
		self.0.name.as_deref()
	}

	/// Path without query or hash.
	pub fn path(&self) -> &str {
		&self.0.path
	}

	/// `path` + `?query` + `#hash`.
	pub fn full_path(&self) -> &str {
		&self.0.full_path
	}

	/// Path parameters.
	pub fn params(&self) -> &HashMap<String, String> {
		&self.0.params
	}

	/// Returns one path parameter.
	pub fn param(&self, name: &str) -> Option<&str> {
		self.0.params.get(name).map(String::as_str)
	}

	/// Query parameters.
	pub fn query(&self) -> &Query {
		&self.0.query
	}

	/// Hash fragment including `#`, or empty.
	pub fn hash(&self) -> &str {
		&self.0.hash
	}

	/// Matched record chain, outermost first.
	pub fn matched(&self) -> &[Rc<RouteRecord>] {
		&self.0.matched
	}

	/// Entry state payload.
	pub fn state(&self) -> Option<&serde_json::Value> {
		self.0.state.as_ref()
	}

	/// Full path of the location that redirected here.
	pub fn redirected_from(&self) -> Option<&str> {
		self.0.redirected_from.as_deref()
	}

	/// Looks up `key` in the matched records' metadata, deepest record first.
	pub fn meta(&self, key: &str) -> Option<&str> {
		self.0.matched.iter().rev().find_map(|record| record.meta(key))
	}

	/// Returns whether `other` is the same location: same path, query and
	/// hash, and the same number of matched records.
	pub fn is_same(&self, other: &Route) -> bool {
		self.0.path == other.0.path
			&& self.0.query == other.0.query
			&& self.0.hash == other.0.hash
			&& self.0.matched.len() == other.0.matched.len()
	}
}
