//! Long-form report sections written to the speaker notes of the last slide.

use crate::fields::{non_empty, FieldMap};

/// Field keys whose text goes into the notes, in output order.
///
/// The key doubles as the section header.
pub const NOTES_SECTIONS: &[&str] = &[
    "Program Analysis (Full Text)",
    "Publisher Analysis (Full Text)",
    "Visibility Analysis (Full Text)",
    "Complete QBR Report",
];

/// Assemble the notes text, or `None` when no section has content.
pub fn build_notes(fields: &FieldMap) -> Option<String> {
    let sections: Vec<String> = NOTES_SECTIONS
        .iter()
        .filter_map(|label| {
            non_empty(fields, label).map(|text| format!("=== {} ===\n{}", label, text))
        })
        .collect();

    if sections.is_empty() {
        None
    } else {
        Some(sections.join("\n\n"))
    }
}
