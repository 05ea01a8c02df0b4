use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    pub timestamp: NaiveDateTime,
    /// "persisted", "fetch_failed" or "layout_changed"
    pub outcome: String,
    pub persisted: usize,
}
