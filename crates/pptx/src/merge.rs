//! Merging report fields into a presentation template.

use crate::presentation::{Presentation, Slide};
use crate::shapes::{Shape, TextBody};
use crate::xml::XmlElement;
use chrono::NaiveDate;
use qbr_core::{
    build_notes, substitute, unresolved_tokens, FieldMap, MergeStats, ReplacementTable, Result,
    SubstitutionPolicy, TextFrame,
};

/// Result of merging a deck held in memory.
#[derive(Debug, Clone)]
pub struct MergeOutput {
    /// The merged PPTX.
    pub bytes: Vec<u8>,

    /// What the walk did.
    pub stats: MergeStats,

    /// The table the merge used.
    pub table: ReplacementTable,
}

/// Walks every slide of a presentation and substitutes placeholders.
///
/// Shape text frames use the configured [`SubstitutionPolicy`]; table cells
/// always use whole-cell replacement.
#[derive(Debug, Clone, Default)]
pub struct TemplateMerger {
    policy: SubstitutionPolicy,
}

impl TemplateMerger {
    /// Create a merger using whole-text substitution.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the policy used for shape text frames.
    pub fn with_policy(mut self, policy: SubstitutionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> SubstitutionPolicy {
        self.policy
    }

    /// Decode a PPTX, merge `fields` into it and encode the result.
    pub fn merge_bytes(&self, bytes: &[u8], fields: &FieldMap, today: NaiveDate) -> Result<MergeOutput> {
        let mut presentation = Presentation::from_bytes(bytes)?;
        let table = ReplacementTable::build(fields, today);
        let notes = build_notes(fields);

        log::debug!(
            "Built {} replacements from {} fields",
            table.len(),
            fields.len()
        );

        let stats = self.merge(&mut presentation, &table, notes.as_deref())?;
        let bytes = presentation.save()?;

        log::info!("Merged deck: {}", stats);
        Ok(MergeOutput {
            bytes,
            stats,
            table,
        })
    }

    /// Substitute placeholders on every slide and write `notes` to the last one.
    ///
    /// Shapes that cannot be read or rewritten are logged and skipped. A
    /// failure to write the notes fails the merge.
    pub fn merge(
        &self,
        presentation: &mut Presentation,
        table: &ReplacementTable,
        notes: Option<&str>,
    ) -> Result<MergeStats> {
        let mut stats = MergeStats::default();

        for slide in presentation.slides_mut() {
            self.merge_slide(slide, table, &mut stats);
        }

        if let Some(notes) = notes {
            stats.notes_written = presentation.set_last_slide_notes(notes)?;
        }

        Ok(stats)
    }

    fn merge_slide(&self, slide: &mut Slide, table: &ReplacementTable, stats: &mut MergeStats) {
        stats.slides += 1;
        let number = slide.number;
        let changed_before = stats.frames_changed;

        match slide.shape_tree_mut() {
            Some(tree) => self.merge_shapes(tree, number, table, stats),
            None => {
                log::warn!("Slide {} has no shape tree, skipping", number);
                return;
            }
        }

        if stats.frames_changed > changed_before {
            slide.mark_modified();
        }
    }

    fn merge_shapes(
        &self,
        tree: &mut XmlElement,
        slide: usize,
        table: &ReplacementTable,
        stats: &mut MergeStats,
    ) {
        for shape in tree.elements_mut().filter_map(Shape::classify) {
            match shape {
                Shape::Text(text) => {
                    merge_frame(text.body, &text.name, slide, table, self.policy, stats);
                }
                Shape::Table(mut grid) => {
                    let name = grid.name.clone();
                    for body in grid.cell_bodies() {
                        merge_frame(body, &name, slide, table, SubstitutionPolicy::WholeText, stats);
                    }
                }
                Shape::Group(group) => {
                    self.merge_shapes(group.tree, slide, table, stats);
                }
                Shape::Other(name) => {
                    log::trace!("Slide {} shape '{}' carries no text", slide, name);
                }
            }
        }
    }
}

fn merge_frame(
    body: &mut XmlElement,
    shape: &str,
    slide: usize,
    table: &ReplacementTable,
    policy: SubstitutionPolicy,
    stats: &mut MergeStats,
) {
    stats.frames += 1;

    let result = TextBody::new(body).and_then(|mut frame| {
        let changed = substitute(&mut frame, table, policy)?;
        if log::log_enabled!(log::Level::Debug) {
            log_unresolved(&frame, shape, slide);
        }
        Ok(changed)
    });

    match result {
        Ok(true) => stats.frames_changed += 1,
        Ok(false) => {}
        Err(e) => {
            stats.frames_skipped += 1;
            log::warn!("Error processing shape '{}' on slide {}: {}", shape, slide, e);
        }
    }
}

/// Report placeholders the table did not cover. Diagnostic only.
fn log_unresolved<F: TextFrame>(frame: &F, shape: &str, slide: usize) {
    let Ok(text) = frame.text() else {
        return;
    };
    let leftover = unresolved_tokens(&text);
    if !leftover.is_empty() {
        log::debug!(
            "Slide {} shape '{}' keeps unresolved placeholders: {:?}",
            slide,
            shape,
            leftover
        );
    }
}
