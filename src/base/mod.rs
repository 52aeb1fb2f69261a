//! Foundation types for the completion engine.
//!
//! - [`FileId`], [`DeclId`] - cheap identities for files and declarations
//! - [`TextRange`], [`TextSize`] - byte positions inside an edit buffer
//!
//! This module has NO dependencies on other crate modules.

mod ids;
mod span;

pub use ids::{DeclId, FileId};
pub use span::{
    TextRange, TextSize, char_to_byte_offset, floor_char_boundary, text_range, text_size,
};
