use diesel::{Insertable, Queryable};
use serde::Deserialize;

use crate::diesel::schema::headers;

/// A block header as written by the upstream header sync.
#[derive(Debug, Clone, PartialEq, Deserialize, Queryable)]
pub struct Header {
    pub id: i64,
    pub block_number: i64,
    pub hash: String,
    pub raw: Option<serde_json::Value>,
    pub block_timestamp: i64,
    pub eth_node_fingerprint: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = headers)]
pub struct UnsavedHeader {
    pub block_number: i64,
    pub hash: String,
    pub raw: Option<serde_json::Value>,
    pub block_timestamp: i64,
    pub eth_node_fingerprint: String,
}

impl UnsavedHeader {
    pub fn new(
        block_number: i64,
        hash: &str,
        block_timestamp: i64,
        eth_node_fingerprint: &str,
    ) -> Self {
        Self {
            block_number,
            hash: hash.to_string(),
            raw: None,
            block_timestamp,
            eth_node_fingerprint: eth_node_fingerprint.to_string(),
        }
    }

    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.raw = Some(raw);

        self
    }
}

/// Keeps the leading run of consecutive block numbers.
///
/// Headers must be sorted by block number. Processing stops at the first gap so a
/// consumer never skips past a header that has not been synced yet.
pub fn continuous_headers(headers: Vec<Header>) -> Vec<Header> {
    let run_length = headers
        .windows(2)
        .position(|pair| pair[1].block_number != pair[0].block_number + 1)
        .map(|gap| gap + 1)
        .unwrap_or(headers.len());

    headers.into_iter().take(run_length).collect()
}
