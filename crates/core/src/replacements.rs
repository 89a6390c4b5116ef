//! Token → display string table built from the caller's fields.

use crate::catalog::{FieldSource, KNOWN_FIELDS};
use crate::fields::{display_value, non_empty, token, FieldMap};
use chrono::NaiveDate;
use std::collections::HashSet;

/// Ordered mapping from a delimited token (`{{name}}`) to its replacement.
///
/// Entries keep insertion order; substitution applies them in that order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplacementTable {
    entries: Vec<(String, String)>,
}

impl ReplacementTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the table for one merge.
    ///
    /// Catalog placeholders are resolved first. Every field the catalog did
    /// not read is then passed through as `{{key}}`, unless that token already
    /// has an entry.
    pub fn build(fields: &FieldMap, today: NaiveDate) -> Self {
        let mut table = Self::new();
        let mut consumed: HashSet<&str> = HashSet::new();

        for field in KNOWN_FIELDS {
            consumed.extend(field.source.keys());
            let value = resolve(&field.source, fields, today);
            table.insert(token(field.name), value);
        }

        let known = table.len();
        for (key, value) in fields {
            if consumed.contains(key.as_str()) {
                continue;
            }
            let tok = token(key);
            if table.contains(&tok) {
                continue;
            }
            table.insert(tok, display_value(value).unwrap_or_default());
        }

        log::debug!(
            "Built replacement table: {} known, {} passed through",
            known,
            table.len() - known
        );
        table
    }

    /// Add an entry. An existing token keeps its first value.
    pub fn insert(&mut self, token: impl Into<String>, value: impl Into<String>) -> bool {
        let token = token.into();
        if self.contains(&token) {
            return false;
        }
        self.entries.push((token, value.into()));
        true
    }

    /// Whether `token` has an entry.
    pub fn contains(&self, token: &str) -> bool {
        self.entries.iter().any(|(t, _)| t == token)
    }

    /// Replacement for `token`, if any.
    pub fn get(&self, token: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(t, _)| t == token)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in application order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(t, v)| (t.as_str(), v.as_str()))
    }

    /// Replace every occurrence of every token in `text`.
    pub fn apply(&self, text: &str) -> String {
        let mut out = text.to_string();
        for (token, value) in self.iter() {
            if out.contains(token) {
                out = out.replace(token, value);
            }
        }
        out
    }
}

fn resolve(source: &FieldSource, fields: &FieldMap, today: NaiveDate) -> String {
    match *source {
        FieldSource::Alias { keys, default } => first_present(fields, keys)
            .unwrap_or_else(|| default.to_string()),
        FieldSource::Fixed(text) => text.to_string(),
        FieldSource::Composite {
            publisher,
            amount,
            pct,
        } => {
            let parts = [
                non_empty(fields, publisher),
                non_empty(fields, amount),
                non_empty(fields, pct),
            ];
            if parts.iter().all(Option::is_none) {
                return String::new();
            }
            let [publisher, amount, pct] = parts.map(Option::unwrap_or_default);
            format!("{}: {} ({})", publisher, amount, pct)
        }
        FieldSource::Joined(first, second) => {
            match (non_empty(fields, first), non_empty(fields, second)) {
                (Some(a), Some(b)) => format!("{} {}", a, b),
                (Some(a), None) => a,
                (None, Some(b)) => b,
                (None, None) => String::new(),
            }
        }
        FieldSource::Today { keys } => first_present(fields, keys)
            .unwrap_or_else(|| today.format("%B %d, %Y").to_string()),
    }
}

fn first_present(fields: &FieldMap, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| non_empty(fields, key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SEE_COMPLETE_REPORT;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn fields(value: Value) -> FieldMap {
        value.as_object().cloned().unwrap_or_default()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
    }

    #[test]
    fn test_aliases_resolve_in_priority_order() {
        let table = ReplacementTable::build(
            &fields(json!({"Client": "Acme", "clientName": "", "Period": "Q3"})),
            today(),
        );
        assert_eq!(table.get("{{brand_name}}"), Some("Acme"));
        assert_eq!(table.get("{{period}}"), Some("Q3"));

        let table = ReplacementTable::build(
            &fields(json!({"Client": "Acme", "clientName": "Globex"})),
            today(),
        );
        assert_eq!(table.get("{{brand_name}}"), Some("Globex"));
    }

    #[test]
    fn test_absent_fields_use_defaults() {
        let table = ReplacementTable::build(&FieldMap::new(), today());
        assert_eq!(table.get("{{period}}"), Some(""));
        assert_eq!(table.get("{{findability_score}}"), Some("85"));
        assert_eq!(table.get("{{clicks_recent}}"), Some(SEE_COMPLETE_REPORT));
        assert_eq!(table.get("{{optional_page_refs}}"), Some(""));
        assert_eq!(table.get("{{date}}"), Some("October 17, 2026"));
    }

    #[test]
    fn test_metric_label_beats_snake_name() {
        let table = ReplacementTable::build(
            &fields(json!({"Current Clicks": 1200, "clicks_recent": "999"})),
            today(),
        );
        assert_eq!(table.get("{{clicks_recent}}"), Some("1200"));
    }

    #[test]
    fn test_table_fields_are_always_placeholders() {
        let table = ReplacementTable::build(
            &fields(json!({"yoy_summary_table": "| a | b |"})),
            today(),
        );
        assert_eq!(table.get("{{yoy_summary_table}}"), Some(SEE_COMPLETE_REPORT));
    }

    #[test]
    fn test_composite_only_when_a_part_is_present() {
        let table = ReplacementTable::build(&FieldMap::new(), today());
        assert_eq!(table.get("{{growth_driver_1}}"), Some(""));

        let table = ReplacementTable::build(
            &fields(json!({
                "Growth Driver 1 Publisher": "Acme Deals",
                "Growth Driver 1 Amount": "$12,000",
                "Growth Driver 1 Pct": "+40%",
                "Decline Driver 2 Publisher": "Slowco",
            })),
            today(),
        );
        assert_eq!(
            table.get("{{growth_driver_1}}"),
            Some("Acme Deals: $12,000 (+40%)")
        );
        assert_eq!(table.get("{{decline_driver_2}}"), Some("Slowco:  ()"));
    }

    #[test]
    fn test_joined_field() {
        let both = ReplacementTable::build(&fields(json!({"Quarter": "Q3", "Year": 2026})), today());
        assert_eq!(both.get("{{reporting_period}}"), Some("Q3 2026"));

        let one = ReplacementTable::build(&fields(json!({"Year": "2026"})), today());
        assert_eq!(one.get("{{reporting_period}}"), Some("2026"));

        let none = ReplacementTable::build(&FieldMap::new(), today());
        assert_eq!(none.get("{{reporting_period}}"), Some(""));
    }

    #[test]
    fn test_caller_date_overrides_today() {
        let table = ReplacementTable::build(&fields(json!({"Report Date": "Oct 1"})), today());
        assert_eq!(table.get("{{date}}"), Some("Oct 1"));
    }

    #[test]
    fn test_pass_through_unknown_keys() {
        let table = ReplacementTable::build(
            &fields(json!({"Top Partner": "Acme", "Score": 9.5, "Nothing": null})),
            today(),
        );
        assert_eq!(table.get("{{Top Partner}}"), Some("Acme"));
        assert_eq!(table.get("{{Score}}"), Some("9.5"));
        assert_eq!(table.get("{{Nothing}}"), Some(""));
    }

    #[test]
    fn test_pass_through_never_overwrites_manual_entries() {
        // `findability_score` is read by the catalog, so the caller's raw value
        // only appears through the alias; `Client` is consumed as an alias.
        let table = ReplacementTable::build(
            &fields(json!({"findability_score": "", "Client": "Acme"})),
            today(),
        );
        assert_eq!(table.get("{{findability_score}}"), Some("85"));
        assert!(!table.contains("{{Client}}"));
    }

    #[test]
    fn test_insert_keeps_first_value() {
        let mut table = ReplacementTable::new();
        assert!(table.insert("{{a}}", "1"));
        assert!(!table.insert("{{a}}", "2"));
        assert_eq!(table.get("{{a}}"), Some("1"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_apply_replaces_every_occurrence() {
        let mut table = ReplacementTable::new();
        table.insert("{{a}}", "x");
        assert_eq!(table.apply("{{a}} and {{a}} and {{b}}"), "x and x and {{b}}");
    }

    #[test]
    fn test_scenario_prepared_for() {
        let table = ReplacementTable::build(
            &fields(json!({"Client": "Acme", "Period": "Q3"})),
            today(),
        );
        assert_eq!(
            table.apply("Prepared for {{brand_name}}, {{period}}"),
            "Prepared for Acme, Q3"
        );
    }
}
