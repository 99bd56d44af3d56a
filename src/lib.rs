//! # Reinhardt History
//!
//! Browser history integration for Reinhardt client-side routing.
//!
//! The crate keeps one logical "current route" consistent with an external,
//! event-driven source of truth: the address bar and session history of the
//! browser (`pushState` / `replaceState` / `popstate`), the URL fragment, or an
//! in-memory stack. It also restores scroll positions across back/forward
//! navigations.
//!
//! ## Architecture
//!
//! - [`TransitionEngine`]: owns the current route. Resolves targets, runs
//!   navigation guards and commits at most the most recently started
//!   transition.
//! - [`HistoryBackend`]: the physical side, with [`Html5Backend`],
//!   [`HashBackend`] and [`MemoryBackend`] implementations. The browser-facing
//!   backends reach `window` through the [`BrowserWindow`] trait.
//! - [`History`]: the adapter tying one engine to one backend, with optional
//!   [`ScrollCoordinator`].
//! - [`RouteTable`]: the default [`RouteResolver`], matching Django-style
//!   path patterns such as `/users/{id}/`.
//!
//! ## Quick Example
//!
//! ```
//! use reinhardt_history::{
//!     GuardOutcome, History, HistoryOptions, MemoryBackend, NavigationFailure, RouteRecord,
//!     RouteTable, guard_fn,
//! };
//!
//! let routes = RouteTable::new()
//!     .route(RouteRecord::named("home", "/"))
//!     .route(RouteRecord::named("admin", "/admin").with_meta("requires_auth", "true"));
//! let history = History::new(MemoryBackend::new("/"), routes, HistoryOptions::new());
//!
//! history.before_each(guard_fn(|to, _from| {
//!     if to.meta("requires_auth").is_some() {
//!         GuardOutcome::Abort
//!     } else {
//!         GuardOutcome::Proceed
//!     }
//! }));
//!
//! let result = futures::executor::block_on(history.push_async("/admin"));
//! assert!(matches!(result, Err(NavigationFailure::Aborted { .. })));
//! assert!(history.current_route().is_start());
//! ```
//!
//! In the browser, [`create_web_history`] builds a history from a
//! [`HistoryConfig`].

pub mod backend;
pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod guard;
pub mod history;
pub mod location;
pub mod pattern;
pub mod resolver;
pub mod route;
pub mod scroll;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use backend::{
	BrowserWindow, EntryState, ExternalChange, HashBackend, HistoryBackend, Html5Backend,
	MemoryBackend, Subscription, WindowEvent, WriteKind,
};
pub use config::{HistoryConfig, HistoryMode, HistoryOptions};
pub use engine::{OnAbort, OnComplete, TransitionEngine};
pub use error::{HistoryError, NavigationFailure};
pub use guard::{GuardOutcome, NavigationGuard, Next, deferred_guard, guard_fn};
pub use history::History;
pub use location::{Location, LocationTarget, Query};
pub use pattern::PathPattern;
pub use resolver::{RouteResolver, RouteTable};
pub use route::{Route, RouteRecord};
pub use scroll::{
	DefaultScrollBehavior, ScrollBehavior, ScrollCoordinator, ScrollPosition, ScrollTarget,
	Viewport,
};

#[cfg(target_arch = "wasm32")]
pub use web::{WebWindow, WindowViewport, create_web_history};

/// Creates an in-memory history starting at `initial`.
pub fn create_memory_history<R>(initial: &str, resolver: R) -> History<MemoryBackend>
where
	R: RouteResolver + 'static,
{
	History::new(MemoryBackend::new(initial), resolver, HistoryOptions::new())
}
