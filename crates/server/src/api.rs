use crate::error::{Result, ServiceError};
use crate::state::AppState;
use anyhow::{anyhow, Context};
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use qbr_core::{FieldMap, ReplacementTable};
use qbr_pptx::TemplateMerger;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct MergeRequest {
    /// Base64 PPTX template.
    #[serde(default)]
    pub pptx_binary: Option<String>,

    /// Report fields to merge.
    #[serde(default)]
    pub qbr_data: Option<FieldMap>,

    /// Preferred name for the merged file.
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MergeResponse {
    pub success: bool,
    pub binary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// Merge report fields into a base64 PPTX and return the result as base64.
pub async fn process_pptx(
    State(state): State<AppState>,
    payload: std::result::Result<Json<MergeRequest>, JsonRejection>,
) -> Result<Json<MergeResponse>> {
    let Json(req) = payload.map_err(|e| ServiceError::InvalidRequest(e.body_text()))?;

    let encoded = req
        .pptx_binary
        .filter(|b| !b.trim().is_empty())
        .ok_or(ServiceError::MissingBinary)?;
    let fields = req.qbr_data.unwrap_or_default();

    log::info!(
        "Merge request: {} base64 bytes, {} fields",
        encoded.len(),
        fields.len()
    );

    let merger = state.merger.clone();
    let (binary, table) =
        tokio::task::spawn_blocking(move || merge_payload(&merger, &encoded, &fields))
            .await
            .map_err(|e| ServiceError::Processing(anyhow!("merge task failed: {}", e)))?
            .map_err(ServiceError::Processing)?;

    Ok(Json(MergeResponse {
        success: true,
        binary,
        filename: derive_filename(req.filename.as_deref(), &table),
    }))
}

pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn merge_payload(
    merger: &TemplateMerger,
    encoded: &str,
    fields: &FieldMap,
) -> anyhow::Result<(String, ReplacementTable)> {
    let bytes = decode_binary(encoded).context("Failed to decode pptx_binary")?;
    let today = chrono::Local::now().date_naive();
    let output = merger
        .merge_bytes(&bytes, fields, today)
        .context("Failed to merge presentation")?;
    Ok((STANDARD.encode(&output.bytes), output.table))
}

/// Decode standard base64, tolerating whitespace and a `data:` URL prefix.
fn decode_binary(encoded: &str) -> anyhow::Result<Vec<u8>> {
    let payload = match encoded.trim_start().strip_prefix("data:") {
        Some(rest) => rest
            .split_once(',')
            .map(|(_, data)| data)
            .ok_or_else(|| anyhow!("data URL has no payload"))?,
        None => encoded,
    };
    let cleaned: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    Ok(STANDARD.decode(cleaned)?)
}

/// Name for the merged deck: the caller's choice, else brand and period.
fn derive_filename(requested: Option<&str>, table: &ReplacementTable) -> Option<String> {
    if let Some(name) = requested.map(str::trim).filter(|n| !n.is_empty()) {
        let name = sanitize_filename(name);
        return Some(if name.to_lowercase().ends_with(".pptx") {
            name
        } else {
            format!("{}.pptx", name)
        });
    }

    let brand = table.get("{{brand_name}}").filter(|b| !b.is_empty())?;
    let name = match table.get("{{period}}").filter(|p| !p.is_empty()) {
        Some(period) => format!("{} QBR {}.pptx", brand, period),
        None => format!("{} QBR.pptx", brand),
    };
    Some(sanitize_filename(&name))
}

fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn table(fields: Value) -> ReplacementTable {
        ReplacementTable::build(
            fields.as_object().unwrap(),
            NaiveDate::from_ymd_opt(2026, 10, 17).unwrap(),
        )
    }

    #[test]
    fn test_decode_binary_variants() {
        assert_eq!(decode_binary("UEsDBA==").unwrap(), b"PK\x03\x04");
        assert_eq!(decode_binary(" UEsD\nBA==\r\n").unwrap(), b"PK\x03\x04");
        assert_eq!(
            decode_binary("data:application/vnd.openxmlformats-officedocument.presentationml.presentation;base64,UEsDBA==")
                .unwrap(),
            b"PK\x03\x04"
        );
        assert!(decode_binary("not base64!").is_err());
        assert!(decode_binary("data:nothing").is_err());
    }

    #[test]
    fn test_filename_from_fields() {
        assert_eq!(
            derive_filename(None, &table(json!({"Client": "Acme", "Period": "Q3"}))),
            Some("Acme QBR Q3.pptx".to_string())
        );
        assert_eq!(
            derive_filename(None, &table(json!({"Client": "Acme/West"}))),
            Some("Acme_West QBR.pptx".to_string())
        );
        assert_eq!(derive_filename(None, &table(json!({}))), None);
    }

    #[test]
    fn test_requested_filename_wins() {
        let t = table(json!({"Client": "Acme"}));
        assert_eq!(
            derive_filename(Some("Board deck"), &t),
            Some("Board deck.pptx".to_string())
        );
        assert_eq!(
            derive_filename(Some("q3:final.PPTX"), &t),
            Some("q3_final.PPTX".to_string())
        );
        assert_eq!(
            derive_filename(Some("  "), &t),
            Some("Acme QBR.pptx".to_string())
        );
    }
}
