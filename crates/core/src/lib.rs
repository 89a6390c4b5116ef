//! Core pieces for merging QBR report fields into presentation templates:
//! field coercion, the replacement table, notes assembly and placeholder
//! substitution over any [`TextFrame`].

pub mod catalog;
pub mod error;
pub mod fields;
pub mod notes;
pub mod replacements;
pub mod substitute;
pub mod types;

pub use error::{Error, Result};
pub use fields::FieldMap;
pub use notes::build_notes;
pub use replacements::ReplacementTable;
pub use substitute::{substitute, unresolved_tokens, SubstitutionPolicy, TextFrame};
pub use types::{MergeStats, PresentationFormat};
