//! # gocomplete
//!
//! Code completion for Go edit buffers, backed by incremental caches of
//! parsed declarations.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! ide     → Engine, merge engine, cursor context, candidate collection
//!   ↓
//! project → File, package and directory caches; package importer
//!   ↓
//! hir     → Declarations, scopes, type resolution
//!   ↓
//! syntax  → Lexer, tolerant parser, ripper
//!   ↓
//! base    → Primitives (FileId, DeclId, TextRange)
//! ```

/// Foundation types: ids and byte positions
pub mod base;

pub mod config;
pub mod error;

/// Semantic model: declarations, scopes and resolution
pub mod hir;

/// Request-level API: the completion engine
pub mod ide;

/// On-disk state: caches and the package importer
pub mod project;

/// Go lexer, parser and cursor-block isolator
pub mod syntax;

pub use base::{FileId, TextRange, TextSize};
pub use config::Config;
pub use error::{Error, Result};
pub use ide::{Candidate, Completion, Engine};
pub use project::CacheStats;
