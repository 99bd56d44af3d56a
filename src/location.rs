//! Navigation targets.
//!
//! A [`Location`] is what callers hand to `push`/`replace`: a path (possibly
//! relative, possibly carrying `?query` and `#hash`) or a named route with
//! parameters, plus optional query parameters, hash fragment and a state
//! payload stored with the history entry.

use crate::codec::parse_path;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Query parameters in insertion order.
///
/// Repeated keys are allowed. Two queries are equal when they hold the same
/// pairs regardless of order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Query(Vec<(String, String)>);

impl Query {
	/// Creates an empty query.
	pub fn new() -> Self {
		Self::default()
	}

	/// Parses a url-encoded query string, with or without a leading `?`.
	///
	/// Malformed input yields an empty query.
	pub fn parse(raw: &str) -> Self {
		let raw = raw.strip_prefix('?').unwrap_or(raw);
		if raw.is_empty() {
			return Self::default();
		}
		match serde_urlencoded::from_str::<Vec<(String, String)>>(raw) {
			Ok(pairs) => Self(pairs),
			Err(err) => {
				tracing::warn!(query = raw, error = %err, "Discarding malformed query string");
				Self::default()
			}
		}
	}

	/// Appends a key/value pair.
	pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
		self.0.push((key.into(), value.into()));
	}

	/// Builder-style [`insert`](Self::insert).
	pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.insert(key, value);
		self
	}

	/// Returns the first value for `key`.
	pub fn get(&self, key: &str) -> Option<&str> {
		self.0
			.iter()
			.find(|(k, _)| k == key)
			.map(|(_, v)| v.as_str())
	}

	/// Returns every value for `key` in insertion order.
	pub fn get_all(&self, key: &str) -> Vec<&str> {
		self.0
			.iter()
			.filter(|(k, _)| k == key)
			.map(|(_, v)| v.as_str())
			.collect()
	}

	/// Returns whether the query has no pairs.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Returns the number of pairs.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Iterates over the pairs in insertion order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}

	/// Renders `?k=v&...`, or an empty string for an empty query.
	pub fn to_query_string(&self) -> String {
		if self.0.is_empty() {
			return String::new();
		}
		// Serializing a sequence of string pairs cannot fail.
		let encoded = serde_urlencoded::to_string(&self.0).unwrap_or_default();
		format!("?{}", encoded)
	}

	fn sorted(&self) -> Vec<&(String, String)> {
		let mut pairs: Vec<_> = self.0.iter().collect();
		pairs.sort();
		pairs
	}
}

impl PartialEq for Query {
	fn eq(&self, other: &Self) -> bool {
		self.0.len() == other.0.len() && self.sorted() == other.sorted()
	}
}

impl Eq for Query {}

impl<K, V> FromIterator<(K, V)> for Query
where
	K: Into<String>,
	V: Into<String>,
{
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		Self(
			iter.into_iter()
				.map(|(k, v)| (k.into(), v.into()))
				.collect(),
		)
	}
}

/// What a [`Location`] points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationTarget {
	/// A path, absolute or relative to the current route.
	Path(String),
	/// A named route and the parameters that fill its pattern.
	Named {
		/// Route name.
		name: String,
		/// Pattern parameters.
		params: HashMap<String, String>,
	},
}

/// A navigation target.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
	/// Path or named route.
	pub target: LocationTarget,
	/// Query parameters.
	pub query: Query,
	/// Hash fragment including the leading `#`, or empty.
	pub hash: String,
	/// State payload stored with the history entry.
	pub state: Option<serde_json::Value>,
	/// Resolve a relative path against the current path itself rather than
	/// its parent directory.
	pub append: bool,
	/// Use replace semantics when this location is the target of a guard
	/// redirect.
	pub replace: bool,
}

impl Location {
	/// Creates a location from a raw `path?query#hash` string.
	pub fn path(raw: impl AsRef<str>) -> Self {
		let parsed = parse_path(raw.as_ref());
		Self {
			target: LocationTarget::Path(parsed.path),
			query: Query::parse(&parsed.query),
			hash: parsed.hash,
			state: None,
			append: false,
			replace: false,
		}
	}

	/// Creates a location targeting a named route.
	pub fn named<I, K, V>(name: impl Into<String>, params: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		Self {
			target: LocationTarget::Named {
				name: name.into(),
				params: params
					.into_iter()
					.map(|(k, v)| (k.into(), v.into()))
					.collect(),
			},
			query: Query::new(),
			hash: String::new(),
			state: None,
			append: false,
			replace: false,
		}
	}

	/// Adds a query parameter.
	pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.insert(key, value);
		self
	}

	/// Sets the hash fragment. A missing leading `#` is added.
	pub fn with_hash(mut self, hash: impl AsRef<str>) -> Self {
		let hash = hash.as_ref();
		self.hash = if hash.is_empty() || hash.starts_with('#') {
			hash.to_string()
		} else {
			format!("#{}", hash)
		};
		self
	}

	/// Attaches a state payload.
	pub fn with_state(mut self, state: serde_json::Value) -> Self {
		self.state = Some(state);
		self
	}

	/// Resolves a relative path against the current path itself.
	pub fn appending(mut self) -> Self {
		self.append = true;
		self
	}

	/// Requests replace semantics when used as a guard redirect target.
	pub fn replacing(mut self) -> Self {
		self.replace = true;
		self
	}

	/// Short human-readable form used in logs and failures.
	pub fn describe(&self) -> String {
		match &self.target {
			LocationTarget::Path(path) => {
				format!("{}{}{}", path, self.query.to_query_string(), self.hash)
			}
			LocationTarget::Named { name, .. } => format!("<{}>", name),
		}
	}
}

impl From<&str> for Location {
	fn from(raw: &str) -> Self {
		Self::path(raw)
	}
}

impl From<String> for Location {
	fn from(raw: String) -> Self {
		Self::path(raw)
	}
}

impl From<&String> for Location {
	fn from(raw: &String) -> Self {
		Self::path(raw)
	}
}
