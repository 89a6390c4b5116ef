//! Catalog of placeholders the QBR deck templates know about.
//!
//! Each entry names the placeholder and where its value comes from. Anything
//! a caller sends that is not listed here still reaches the deck through the
//! pass-through step of [`crate::ReplacementTable::build`].

/// Text used for bulk tables and metrics that live in the full report instead.
pub const SEE_COMPLETE_REPORT: &str = "See Complete Report";

/// How a known placeholder derives its value from the field map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    /// First non-empty key wins, otherwise `default`.
    Alias {
        keys: &'static [&'static str],
        default: &'static str,
    },
    /// Always this text, whatever the caller sent.
    Fixed(&'static str),
    /// `"{publisher}: {amount} ({pct})"`, only when at least one part is present.
    Composite {
        publisher: &'static str,
        amount: &'static str,
        pct: &'static str,
    },
    /// Both values separated by a space, or whichever one is present.
    Joined(&'static str, &'static str),
    /// First non-empty key, otherwise the merge date as `%B %d, %Y`.
    Today { keys: &'static [&'static str] },
}

impl FieldSource {
    /// Field map keys this source reads.
    pub fn keys(&self) -> Vec<&'static str> {
        match *self {
            FieldSource::Alias { keys, .. } | FieldSource::Today { keys } => keys.to_vec(),
            FieldSource::Fixed(_) => Vec::new(),
            FieldSource::Composite {
                publisher,
                amount,
                pct,
            } => vec![publisher, amount, pct],
            FieldSource::Joined(first, second) => vec![first, second],
        }
    }
}

/// A placeholder name and its value source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownField {
    pub name: &'static str,
    pub source: FieldSource,
}

macro_rules! own {
    ($name:literal) => {
        KnownField {
            name: $name,
            source: FieldSource::Alias {
                keys: &[$name],
                default: "",
            },
        }
    };
}

macro_rules! metric {
    ($name:literal, $label:literal) => {
        KnownField {
            name: $name,
            source: FieldSource::Alias {
                keys: &[$label, $name],
                default: SEE_COMPLETE_REPORT,
            },
        }
    };
}

macro_rules! table {
    ($name:literal) => {
        KnownField {
            name: $name,
            source: FieldSource::Fixed(SEE_COMPLETE_REPORT),
        }
    };
}

macro_rules! driver {
    ($name:literal, $publisher:literal, $amount:literal, $pct:literal) => {
        KnownField {
            name: $name,
            source: FieldSource::Composite {
                publisher: $publisher,
                amount: $amount,
                pct: $pct,
            },
        }
    };
}

/// Every placeholder with a manual derivation, in table order.
pub static KNOWN_FIELDS: &[KnownField] = &[
    // Config / basic info
    KnownField {
        name: "period",
        source: FieldSource::Alias {
            keys: &["period", "Period"],
            default: "",
        },
    },
    KnownField {
        name: "prepared_by",
        source: FieldSource::Alias {
            keys: &["preparedBy", "prepared_by", "Prepared By"],
            default: "",
        },
    },
    KnownField {
        name: "date",
        source: FieldSource::Today {
            keys: &["date", "Report Date"],
        },
    },
    KnownField {
        name: "brand_name",
        source: FieldSource::Alias {
            keys: &["clientName", "brand_name", "Client", "Client Name", "Brand"],
            default: "",
        },
    },
    KnownField {
        name: "optional_page_refs",
        source: FieldSource::Fixed(""),
    },
    KnownField {
        name: "reporting_period",
        source: FieldSource::Joined("Quarter", "Year"),
    },
    // Executive summary & insights
    own!("exec_summary_full"),
    own!("insight_biggest_movers"),
    own!("insight_below_benchmark"),
    own!("insight_efficiency_changes"),
    own!("insight_roi_improvement"),
    // Analysis paragraphs
    own!("traffic_trends"),
    own!("conversion_performance"),
    own!("revenue_economics"),
    // Program recommendations
    own!("rec_1"),
    own!("rec_2"),
    own!("rec_3"),
    own!("rec_4"),
    own!("rec_5"),
    // Publisher performance
    own!("growth_drivers_paragraph"),
    own!("new_partners_paragraph"),
    own!("declines_paragraph"),
    own!("top_performers_paragraph"),
    own!("segment_insights_paragraph"),
    driver!(
        "growth_driver_1",
        "Growth Driver 1 Publisher",
        "Growth Driver 1 Amount",
        "Growth Driver 1 Pct"
    ),
    driver!(
        "growth_driver_2",
        "Growth Driver 2 Publisher",
        "Growth Driver 2 Amount",
        "Growth Driver 2 Pct"
    ),
    driver!(
        "growth_driver_3",
        "Growth Driver 3 Publisher",
        "Growth Driver 3 Amount",
        "Growth Driver 3 Pct"
    ),
    driver!(
        "decline_driver_1",
        "Decline Driver 1 Publisher",
        "Decline Driver 1 Amount",
        "Decline Driver 1 Pct"
    ),
    driver!(
        "decline_driver_2",
        "Decline Driver 2 Publisher",
        "Decline Driver 2 Amount",
        "Decline Driver 2 Pct"
    ),
    driver!(
        "decline_driver_3",
        "Decline Driver 3 Publisher",
        "Decline Driver 3 Amount",
        "Decline Driver 3 Pct"
    ),
    // Publisher recommendations
    own!("pub_rec_1"),
    own!("pub_rec_2"),
    own!("pub_rec_3"),
    own!("pub_rec_4"),
    own!("pub_rec_5"),
    // Visibility analysis
    own!("brand_snapshot"),
    own!("evergreen_content"),
    own!("fresh_content"),
    own!("discount_behavior"),
    own!("category_discovery"),
    own!("trust_legitimacy"),
    own!("competitors_paragraph"),
    own!("aeo_forum_content"),
    own!("aeo_why_forums"),
    own!("aeo_visibility_gap"),
    KnownField {
        name: "findability_score",
        source: FieldSource::Alias {
            keys: &["findability_score", "Findability Score"],
            default: "85",
        },
    },
    // Visibility recommendations
    own!("vis_rec_1"),
    own!("vis_rec_2"),
    own!("vis_rec_3"),
    own!("vis_rec_4"),
    own!("vis_rec_5"),
    own!("vis_rec_6"),
    own!("vis_rec_7"),
    own!("vis_rec_8"),
    // Tables
    table!("yoy_summary_table"),
    table!("top_current_performers_table"),
    table!("segment_overview_table"),
    table!("top_10_growth_table"),
    table!("top_10_decline_table"),
    table!("top_cited_domains_table"),
    table!("visibility_opportunities_table"),
    // Snapshot metrics
    metric!("clicks_recent", "Current Clicks"),
    metric!("clicks_yoy_pct", "YoY Clicks Change"),
    metric!("sales_recent", "Current Sales"),
    metric!("sales_yoy_pct", "YoY Sales Change"),
    metric!("conv_rate_recent", "Current Conv Rate"),
    metric!("conv_rate_yoy_pct", "YoY Conv Rate Change"),
    metric!("order_value_recent", "Current Order Value"),
    metric!("order_value_yoy_pct", "YoY Order Value Change"),
    metric!("aov_recent", "Current AOV"),
    metric!("aov_yoy_pct", "YoY AOV Change"),
    metric!("pub_commission_recent", "Current Commission"),
    metric!("pub_commission_yoy_pct", "YoY Commission Change"),
    metric!("cpa_recent", "Current CPA"),
    metric!("cpa_yoy_pct", "YoY CPA Change"),
    metric!("roi_recent", "Current ROI"),
    metric!("roi_yoy_pct", "YoY ROI Change"),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_names_are_unique() {
        let mut seen = HashSet::new();
        for field in KNOWN_FIELDS {
            assert!(seen.insert(field.name), "duplicate field {}", field.name);
        }
    }

    #[test]
    fn test_catalog_names_have_no_delimiters() {
        for field in KNOWN_FIELDS {
            assert!(!field.name.contains('{') && !field.name.contains('}'));
        }
    }

    #[test]
    fn test_source_keys() {
        let joined = FieldSource::Joined("Quarter", "Year");
        assert_eq!(joined.keys(), vec!["Quarter", "Year"]);
        assert!(FieldSource::Fixed(SEE_COMPLETE_REPORT).keys().is_empty());
    }
}
