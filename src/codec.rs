//! Location codec.
//!
//! Pure conversions between what the backend physically shows (an address-bar
//! pathname, search string and hash fragment, possibly under an application
//! base prefix) and the router-space location strings the transition engine
//! works with. Nothing in this module touches browser state.

/// Normalizes an application base prefix.
///
/// The result is either empty (application mounted at the root) or starts with
/// `/` and has no trailing `/`. `/app/`, `app` and `/app` all normalize to
/// `/app`; `None`, `""` and `/` normalize to `""`.
pub fn normalize_base(base: Option<&str>) -> String {
	let base = base.unwrap_or("").trim();
	let trimmed = base.trim_end_matches('/');
	if trimmed.is_empty() {
		return String::new();
	}
	if trimmed.starts_with('/') {
		trimmed.to_string()
	} else {
		format!("/{}", trimmed)
	}
}

/// Strips `base` from the front of `path` at a segment boundary.
///
/// The prefix is only removed when `path` equals `base` or continues with a
/// `/` right after it, so base `/app` never turns `/application` into
/// `lication`.
pub fn strip_base<'a>(path: &'a str, base: &str) -> &'a str {
	if base.is_empty() {
		return path;
	}
	match path.strip_prefix(base) {
		Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
		_ => path,
	}
}

/// Builds the router-space location string from physical address-bar parts.
///
/// `search` and `hash` are taken verbatim (including their `?` / `#` markers),
/// as `window.location` reports them.
pub fn get_location(base: &str, pathname: &str, search: &str, hash: &str) -> String {
	let path = strip_base(pathname, base);
	let path = if path.is_empty() { "/" } else { path };
	format!("{}{}{}", path, search, hash)
}

/// Collapses runs of `/` in the path portion of a URL.
///
/// The query string and hash fragment are left untouched.
pub fn clean_path(url: &str) -> String {
	let split = url.find(['?', '#']).unwrap_or(url.len());
	let (path, rest) = url.split_at(split);

	let mut cleaned = String::with_capacity(url.len());
	let mut previous_slash = false;
	for c in path.chars() {
		if c == '/' {
			if previous_slash {
				continue;
			}
			previous_slash = true;
		} else {
			previous_slash = false;
		}
		cleaned.push(c);
	}
	cleaned.push_str(rest);
	cleaned
}

/// Joins the base prefix and a router-space full path into a physical URL.
pub fn join_base(base: &str, full_path: &str) -> String {
	clean_path(&format!("{}{}", base, full_path))
}

/// A raw location string split into its three parts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedPath {
	/// Path portion, possibly empty or relative.
	pub path: String,
	/// Query string without the leading `?`.
	pub query: String,
	/// Hash fragment including the leading `#`, or empty.
	pub hash: String,
}

/// Splits `path?query#hash`.
pub fn parse_path(raw: &str) -> ParsedPath {
	let (before_hash, hash) = match raw.find('#') {
		Some(index) => (&raw[..index], &raw[index..]),
		None => (raw, ""),
	};
	let (path, query) = match before_hash.find('?') {
		Some(index) => (&before_hash[..index], &before_hash[index + 1..]),
		None => (before_hash, ""),
	};

	ParsedPath {
		path: path.to_string(),
		query: query.to_string(),
		hash: hash.to_string(),
	}
}

/// Resolves `relative` against the path `base`.
///
/// - Absolute paths are returned unchanged.
/// - `?...` and `#...` attach to `base`.
/// - Other paths resolve against the directory of `base`, or against `base`
///   itself when `append` is set. `.` and `..` segments are honoured.
pub fn resolve_path(relative: &str, base: &str, append: bool) -> String {
	match relative.chars().next() {
		Some('/') => return relative.to_string(),
		Some('?') | Some('#') => return format!("{}{}", base, relative),
		_ => {}
	}

	let mut stack: Vec<&str> = base.split('/').collect();
	// A trailing slash leaves an empty last segment that must go even when
	// appending.
	if !append || stack.last().is_some_and(|last| last.is_empty()) {
		stack.pop();
	}

	for segment in relative.split('/') {
		match segment {
			".." => {
				stack.pop();
			}
			"." => {}
			segment => stack.push(segment),
		}
	}

	if stack.first() != Some(&"") {
		stack.insert(0, "");
	}
	let resolved = stack.join("/");
	if resolved.is_empty() {
		"/".to_string()
	} else {
		resolved
	}
}

/// Returns the fragment of `href` after the first `#`, or an empty string.
pub fn hash_fragment(href: &str) -> &str {
	match href.find('#') {
		Some(index) => &href[index + 1..],
		None => "",
	}
}

/// Returns `href` with its fragment replaced by `path`.
pub fn hash_url(href: &str, path: &str) -> String {
	let base = match href.find('#') {
		Some(index) => &href[..index],
		None => href,
	};
	format!("{}#{}", base, path)
}
