use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::domain::Workdir;

/// Reply to `POST /api/convert` and `POST /api/retry`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionResult {
    #[serde(default)]
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workdir: Option<Workdir>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Reply to `POST /api/generate_siebel`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationResult {
    #[serde(default)]
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<GeneratedFiles>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratedFiles {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,
    #[serde(default, deserialize_with = "lenient_applets")]
    pub applets: Vec<AppletEntry>,
}

/// One item of the generated applet manifest. The server emits either a bare path or a
/// record describing the written file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AppletEntry {
    Path(String),
    Record(AppletRecord),
}

/// Extra keys the server adds to a record (`name`, `status`) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppletRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safe: Option<String>,
}

/// A non-array `applets` value reads as an empty list, and entries that are neither a
/// string nor an object are dropped.
fn lenient_applets<'de, D>(deserializer: D) -> Result<Vec<AppletEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Array(items) = value else {
        return Ok(Vec::new());
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(_) | Value::Object(_) => serde_json::from_value(item).ok(),
            _ => None,
        })
        .collect())
}

/// Body of `POST /api/client-script/ask`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    pub message: String,
    pub context_type: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AskResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default)]
    pub html: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Reply to `POST /api/pmpr/generate`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PmPrResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
