//! PPTX (Office Open XML) backend for merging QBR report fields into decks.
//!
//! PPTX files are ZIP archives of XML parts. This crate opens the package,
//! parses slides into an editable element tree, substitutes placeholders in
//! shape text and table cells, and writes the package back out.

pub mod merge;
pub mod package;
pub mod presentation;
pub mod shapes;
pub mod xml;

pub use merge::{MergeOutput, TemplateMerger};
pub use package::Package;
pub use presentation::{Presentation, Slide};
pub use shapes::{Shape, TextBody};
pub use xml::{XmlDocument, XmlElement};
