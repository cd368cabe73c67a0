use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MAX_LIMIT: usize = 1000;

#[derive(Deserialize)]
pub struct AppendParams {
    pub payload: String, // base64-encoded
}

#[derive(Serialize, Deserialize)]
pub struct AppendResponse {
    pub id: u64,
}

#[derive(Deserialize)]
pub struct RangeParams {
    #[serde(default)]
    pub after: u64,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    100
}

#[derive(Serialize, Deserialize)]
pub struct EventItem {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub payload: String,
}

#[derive(Serialize, Deserialize)]
pub struct RangeResponse {
    pub events: Vec<EventItem>,
    pub has_more: bool,
}
