//! Completion: the request-level API on top of the caches and the
//! semantic model.
//!
//! ## Usage
//!
//! ```no_run
//! use gocomplete::{Config, Engine};
//!
//! let engine = Engine::new(Config::from_env())?;
//! let completion = engine.complete(b"package p\nfunc f() { s. }", "/tmp/p/a.go", 24);
//! # Ok::<(), gocomplete::Error>(())
//! ```
//!
//! Everything below [`Engine`] is public so hosts with their own request
//! loop can reuse the pieces: [`deduce_cursor_context`] for cursor
//! analysis, [`CandidateCollector`] for filtering and ordering.

mod collector;
mod completion;
mod context;
mod engine;
mod merge;

pub use collector::{Candidate, CandidateCollector, import_candidates, sort_candidates};
pub use completion::Completion;
pub use context::{CompletionMode, CursorContext, deduce_cursor_context};
pub use engine::Engine;
pub use merge::{
    ResolvedImport, fixup_packages, merge_decls, merge_dot_imports, propagate_type_alias_methods,
};
