//! Semantic model: declarations, scopes and type resolution.
//!
//! ## Pipeline
//!
//! ```text
//! SourceFile ──lower──▶ DeclMap ──merge──▶ Scope (package)
//!                                           │
//!                     universe ◀── parent ──┤
//!                                           ▼
//!                          local_scope(func, cursor)
//!                                           │
//!                                       Resolver ──▶ Decl for `expr.`
//! ```
//!
//! Nothing here touches the filesystem; the `project` layer supplies
//! parsed files and imported packages.

mod decl;
mod locals;
mod lower;
mod render;
mod resolve;
mod scope;
mod universe;

pub use decl::{Decl, DeclKind, Origin, ValueMode, is_exported};
pub use locals::local_scope;
pub use lower::{
    DeclMap, add_members, anonymous_type, lower_file, lower_gen_decl, lower_items,
    receiver_type_name, value_decls,
};
pub use render::{candidate_type, render_type};
pub use resolve::{PackageLookup, Resolver, TypeRef, TypeResolver};
pub use scope::Scope;
pub use universe::universe;
