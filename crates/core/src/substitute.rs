//! Placeholder substitution over anything that carries text.

use crate::error::Result;
use crate::replacements::ReplacementTable;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Regex matching a `{{name}}` placeholder.
static TOKEN_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{\{([^{}]+)\}\}").unwrap());

/// A text container whose content can be read and rewritten.
///
/// `text` is the visible text: paragraphs joined by `\n`, line breaks as
/// `\u{000B}`. `runs` are the formatting runs in document order.
pub trait TextFrame {
    /// Full visible text.
    fn text(&self) -> Result<String>;

    /// Overwrite the whole frame with `text`, collapsing runs.
    fn set_text(&mut self, text: &str) -> Result<()>;

    /// Text of each formatting run.
    fn runs(&self) -> Result<Vec<String>>;

    /// Rewrite run texts in place. `runs` has the length returned by [`TextFrame::runs`].
    fn set_runs(&mut self, runs: &[String]) -> Result<()>;
}

/// Granularity at which placeholders are matched in a text frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubstitutionPolicy {
    /// Replace over the frame's full text and write it back as plain runs.
    /// Matches placeholders that span runs; per-run formatting is lost.
    #[default]
    WholeText,
    /// Replace inside each run separately. Formatting survives, but a
    /// placeholder split across runs is left alone.
    PerRun,
}

impl fmt::Display for SubstitutionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubstitutionPolicy::WholeText => write!(f, "whole-text"),
            SubstitutionPolicy::PerRun => write!(f, "per-run"),
        }
    }
}

impl FromStr for SubstitutionPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "whole-text" | "whole" => Ok(SubstitutionPolicy::WholeText),
            "per-run" | "run" => Ok(SubstitutionPolicy::PerRun),
            other => Err(format!(
                "unknown substitution policy '{}' (expected whole-text or per-run)",
                other
            )),
        }
    }
}

/// Apply `table` to one frame. Returns whether anything changed.
///
/// Frames without a matching placeholder are not written to.
pub fn substitute<F: TextFrame + ?Sized>(
    frame: &mut F,
    table: &ReplacementTable,
    policy: SubstitutionPolicy,
) -> Result<bool> {
    match policy {
        SubstitutionPolicy::WholeText => {
            let text = frame.text()?;
            if text.is_empty() {
                return Ok(false);
            }
            let replaced = table.apply(&text);
            if replaced == text {
                return Ok(false);
            }
            frame.set_text(&replaced)?;
            Ok(true)
        }
        SubstitutionPolicy::PerRun => {
            let runs = frame.runs()?;
            let replaced: Vec<String> = runs.iter().map(|run| table.apply(run)).collect();
            if replaced == runs {
                return Ok(false);
            }
            frame.set_runs(&replaced)?;
            Ok(true)
        }
    }
}

/// Names of placeholders still present in `text`, in order of appearance.
pub fn unresolved_tokens(text: &str) -> Vec<String> {
    if !text.contains("{{") {
        return Vec::new();
    }
    TOKEN_REGEX
        .captures_iter(text)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use pretty_assertions::assert_eq;

    /// Paragraph-less frame backed by plain runs.
    #[derive(Default)]
    struct RunFrame {
        runs: Vec<String>,
        writes: usize,
    }

    impl TextFrame for RunFrame {
        fn text(&self) -> Result<String> {
            Ok(self.runs.concat())
        }

        fn set_text(&mut self, text: &str) -> Result<()> {
            self.runs = vec![text.to_string()];
            self.writes += 1;
            Ok(())
        }

        fn runs(&self) -> Result<Vec<String>> {
            Ok(self.runs.clone())
        }

        fn set_runs(&mut self, runs: &[String]) -> Result<()> {
            self.runs = runs.to_vec();
            self.writes += 1;
            Ok(())
        }
    }

    struct BrokenFrame;

    impl TextFrame for BrokenFrame {
        fn text(&self) -> Result<String> {
            Err(Error::MalformedShape("no text".to_string()))
        }
        fn set_text(&mut self, _text: &str) -> Result<()> {
            unreachable!()
        }
        fn runs(&self) -> Result<Vec<String>> {
            Err(Error::MalformedShape("no runs".to_string()))
        }
        fn set_runs(&mut self, _runs: &[String]) -> Result<()> {
            unreachable!()
        }
    }

    fn frame(runs: &[&str]) -> RunFrame {
        RunFrame {
            runs: runs.iter().map(|s| s.to_string()).collect(),
            writes: 0,
        }
    }

    fn table() -> ReplacementTable {
        let mut table = ReplacementTable::new();
        table.insert("{{brand_name}}", "Acme");
        table.insert("{{period}}", "Q3");
        table
    }

    #[test]
    fn test_whole_text_matches_split_tokens() {
        let mut f = frame(&["Prepared for {{brand", "_name}}, {{period}}"]);
        let changed = substitute(&mut f, &table(), SubstitutionPolicy::WholeText).unwrap();
        assert!(changed);
        assert_eq!(f.runs, vec!["Prepared for Acme, Q3"]);
    }

    #[test]
    fn test_per_run_leaves_split_tokens() {
        let mut f = frame(&["Prepared for {{brand", "_name}}, {{period}}"]);
        let changed = substitute(&mut f, &table(), SubstitutionPolicy::PerRun).unwrap();
        assert!(changed);
        assert_eq!(f.runs, vec!["Prepared for {{brand", "_name}}, Q3"]);
    }

    #[test]
    fn test_unchanged_frame_is_not_written() {
        let mut f = frame(&["{{unknown_field}}"]);
        for policy in [SubstitutionPolicy::WholeText, SubstitutionPolicy::PerRun] {
            assert!(!substitute(&mut f, &table(), policy).unwrap());
        }
        assert_eq!(f.writes, 0);
        assert_eq!(f.runs, vec!["{{unknown_field}}"]);
    }

    #[test]
    fn test_repeated_token_replaced_everywhere() {
        let mut f = frame(&["{{period}} / {{period}}"]);
        substitute(&mut f, &table(), SubstitutionPolicy::WholeText).unwrap();
        assert_eq!(f.runs, vec!["Q3 / Q3"]);
    }

    #[test]
    fn test_errors_propagate() {
        let result = substitute(&mut BrokenFrame, &table(), SubstitutionPolicy::WholeText);
        assert!(matches!(result, Err(Error::MalformedShape(_))));
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("whole-text".parse::<SubstitutionPolicy>(), Ok(SubstitutionPolicy::WholeText));
        assert_eq!("per_run".parse::<SubstitutionPolicy>(), Ok(SubstitutionPolicy::PerRun));
        assert!("sideways".parse::<SubstitutionPolicy>().is_err());
        assert_eq!(SubstitutionPolicy::PerRun.to_string(), "per-run");
    }

    #[test]
    fn test_unresolved_tokens() {
        assert_eq!(
            unresolved_tokens("{{a}} text {{Current Clicks}} {b} {{}}"),
            vec!["a", "Current Clicks"]
        );
        assert!(unresolved_tokens("plain").is_empty());
        assert!(unresolved_tokens("half {open} and }} close").is_empty());
        assert_eq!(unresolved_tokens("{{{{x}}}}"), vec!["x"]);
    }
}
