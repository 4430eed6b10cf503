//! Shot ledger record

use serde::{Deserialize, Serialize};

/// How a shot reached the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadKind {
    Json,
    Multipart,
}

impl UploadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadKind::Json => "json",
            UploadKind::Multipart => "multipart",
        }
    }
}

/// One processed shot, as listed by `GET /api/shots`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShotRecord {
    pub id: i64,
    /// Persisted document name, `shot_<YYYYMMDD_HHMMSS>_<id>.json`
    pub filename: String,
    /// Upload time, `YYYYMMDD_HHMMSS`
    pub timestamp: String,
    pub data_size: usize,
    pub clock: Option<String>,
    pub profile: Option<String>,
    pub upload_type: UploadKind,
    pub machine_id: String,
    pub plugin_version: String,
    pub image_generated: bool,
}

impl ShotRecord {
    /// Receipt image name derived from the document name
    pub fn image_filename(&self) -> String {
        image_filename_for(&self.filename)
    }
}

/// `shot_X.json` -> `shot_X.png`
pub fn image_filename_for(document: &str) -> String {
    match document.strip_suffix(".json") {
        Some(stem) => format!("{}.png", stem),
        None => format!("{}.png", document),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_filename() {
        assert_eq!(
            image_filename_for("shot_20240101_083015_1704097815.json"),
            "shot_20240101_083015_1704097815.png"
        );
        assert_eq!(image_filename_for("odd"), "odd.png");
    }

    #[test]
    fn test_upload_kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&UploadKind::Multipart).unwrap(),
            "\"multipart\""
        );
        assert_eq!(UploadKind::Json.as_str(), "json");
    }
}
