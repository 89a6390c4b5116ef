//! Shared result types for a merge pass.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Counters collected while walking a presentation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeStats {
    /// Slides walked.
    pub slides: usize,

    /// Text frames (shape bodies and table cells) inspected.
    pub frames: usize,

    /// Frames whose text changed.
    pub frames_changed: usize,

    /// Frames skipped because they could not be read or rewritten.
    pub frames_skipped: usize,

    /// Whether notes were written to the last slide.
    pub notes_written: bool,
}

impl fmt::Display for MergeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} slides, {} frames, {} changed, {} skipped{}",
            self.slides,
            self.frames,
            self.frames_changed,
            self.frames_skipped,
            if self.notes_written { ", notes written" } else { "" }
        )
    }
}

/// Detected format of an input payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresentationFormat {
    /// Office Open XML (ZIP) presentation.
    Pptx,
    /// Legacy OLE/CFB presentation, recognised only to reject it clearly.
    Ppt,
}

impl PresentationFormat {
    /// Detect format from file magic bytes.
    pub fn from_magic(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 4 {
            return None;
        }

        // PPTX is a ZIP file (PK\x03\x04)
        if bytes.starts_with(&[0x50, 0x4B, 0x03, 0x04]) {
            return Some(Self::Pptx);
        }

        // PPT is an OLE/CFB file (D0 CF 11 E0 A1 B1 1A E1)
        if bytes.len() >= 8
            && bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1])
        {
            return Some(Self::Ppt);
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_magic() {
        assert_eq!(
            PresentationFormat::from_magic(b"PK\x03\x04rest"),
            Some(PresentationFormat::Pptx)
        );
        assert_eq!(
            PresentationFormat::from_magic(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]),
            Some(PresentationFormat::Ppt)
        );
        assert_eq!(PresentationFormat::from_magic(b"hello world"), None);
        assert_eq!(PresentationFormat::from_magic(b"PK"), None);
    }

    #[test]
    fn test_stats_display() {
        let stats = MergeStats {
            slides: 2,
            frames: 5,
            frames_changed: 3,
            frames_skipped: 1,
            notes_written: true,
        };
        assert_eq!(
            stats.to_string(),
            "2 slides, 5 frames, 3 changed, 1 skipped, notes written"
        );
    }
}
