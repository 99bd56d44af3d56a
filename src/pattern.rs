//! Path pattern matching for route records.
//!
//! Patterns use the Django-style syntax shared with reinhardt-urls:
//!
//! - `/users/` - exact match
//! - `/users/{id}/` - a single segment parameter
//! - `/static/{path:*}` - wildcard capturing the rest of the path, slashes
//!   included
//!
//! Matching is lenient the way browser URLs are typed: a trailing `/` is
//! optional on either side and literal segments ignore ASCII case.

use crate::error::HistoryError;
use std::collections::HashMap;

/// Maximum allowed length for a pattern string in bytes.
const MAX_PATTERN_LENGTH: usize = 1024;

/// Maximum allowed number of path segments in a pattern.
const MAX_PATH_SEGMENTS: usize = 32;

/// Maximum allowed size for a compiled pattern regex (in bytes).
const MAX_REGEX_SIZE: usize = 1 << 20; // 1 MiB

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
	Literal(String),
	Param { name: String, wildcard: bool },
}

/// A compiled path pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
	source: String,
	tokens: Vec<Token>,
	regex: regex::Regex,
}

impl PathPattern {
	/// Compiles a pattern.
	///
	/// # Errors
	///
	/// Returns [`HistoryError::Pattern`] if the pattern exceeds 1024 bytes or
	/// 32 segments, has an unterminated or empty `{}` placeholder, or does not
	/// compile.
	pub fn new(source: &str) -> Result<Self, HistoryError> {
		let invalid = |reason: String| HistoryError::Pattern {
			pattern: source.to_string(),
			reason,
		};

		if source.len() > MAX_PATTERN_LENGTH {
			return Err(invalid(format!(
				"{} bytes exceed the maximum of {}",
				source.len(),
				MAX_PATTERN_LENGTH
			)));
		}
		let segments = source.split('/').filter(|s| !s.is_empty()).count();
		if segments > MAX_PATH_SEGMENTS {
			return Err(invalid(format!(
				"{} segments exceed the maximum of {}",
				segments, MAX_PATH_SEGMENTS
			)));
		}

		let tokens = tokenize(source).map_err(invalid)?;
		let regex = regex::RegexBuilder::new(&to_regex(&tokens))
			.case_insensitive(true)
			.size_limit(MAX_REGEX_SIZE)
			.build()
			.map_err(|e| invalid(e.to_string()))?;

		Ok(Self {
			source: source.to_string(),
			tokens,
			regex,
		})
	}

	/// Returns the pattern as written.
	pub fn pattern(&self) -> &str {
		&self.source
	}

	/// Returns the parameter names in pattern order.
	pub fn param_names(&self) -> Vec<&str> {
		self.tokens
			.iter()
			.filter_map(|token| match token {
				Token::Param { name, .. } => Some(name.as_str()),
				Token::Literal(_) => None,
			})
			.collect()
	}

	/// Matches `path`, returning the captured parameters.
	pub fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
		let captures = self.regex.captures(path)?;
		Some(
			self.param_names()
				.into_iter()
				.filter_map(|name| {
					let value = captures.name(name)?.as_str();
					Some((name.to_string(), value.to_string()))
				})
				.collect(),
		)
	}

	/// Builds a path from the pattern.
	///
	/// # Errors
	///
	/// Returns the name of the first parameter missing from `params`. A
	/// single-segment parameter whose value contains `/` counts as missing,
	/// since the built path would not match the pattern again.
	pub fn reverse(&self, params: &HashMap<String, String>) -> Result<String, String> {
		let mut path = String::with_capacity(self.source.len());
		for token in &self.tokens {
			match token {
				Token::Literal(text) => path.push_str(text),
				Token::Param { name, wildcard } => match params.get(name) {
					Some(value) if *wildcard || !value.contains('/') => path.push_str(value),
					_ => return Err(name.clone()),
				},
			}
		}
		Ok(path)
	}
}

fn tokenize(source: &str) -> Result<Vec<Token>, String> {
	let mut tokens = Vec::new();
	let mut rest = source;

	while let Some(open) = rest.find('{') {
		if open > 0 {
			tokens.push(Token::Literal(rest[..open].to_string()));
		}
		let close = rest[open..]
			.find('}')
			.map(|offset| open + offset)
			.ok_or_else(|| format!("unterminated placeholder at byte {}", source.len() - rest.len() + open))?;

		let inner = &rest[open + 1..close];
		let (name, wildcard) = match inner.strip_suffix(":*") {
			Some(name) => (name, true),
			None => (inner, false),
		};
		if name.is_empty() {
			return Err("empty placeholder name".to_string());
		}
		tokens.push(Token::Param {
			name: name.to_string(),
			wildcard,
		});
		rest = &rest[close + 1..];
	}
	if !rest.is_empty() {
		tokens.push(Token::Literal(rest.to_string()));
	}
	Ok(tokens)
}

fn to_regex(tokens: &[Token]) -> String {
	let mut body = String::new();
	for token in tokens {
		match token {
			Token::Literal(text) => body.push_str(&regex::escape(text)),
			Token::Param { name, wildcard: true } => body.push_str(&format!("(?P<{}>.*)", name)),
			Token::Param { name, wildcard: false } => {
				body.push_str(&format!("(?P<{}>[^/]+)", name))
			}
		}
	}
	// The trailing slash is matched optionally below.
	let body = body.strip_suffix('/').unwrap_or(&body);
	format!("^{}/?$", body)
}

impl PartialEq for PathPattern {
	fn eq(&self, other: &Self) -> bool {
		self.source == other.source
	}
}

impl Eq for PathPattern {}

impl std::fmt::Display for PathPattern {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.source)
	}
}
