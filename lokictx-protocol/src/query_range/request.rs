use serde::{Deserialize, Serialize};

use super::EpochNanos;

/// Path of the range query endpoint, relative to the backend base URL.
pub const QUERY_RANGE_PATH: &str = "loki/api/v1/query_range";

/// Scan direction of a range query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Backward,
}

/// Query-string parameters of `GET /loki/api/v1/query_range`.
///
/// Field order is the order parameters appear in the URL. Absent bounds are
/// left for the backend to default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRangeRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<EpochNanos>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<EpochNanos>,
    pub limit: u32,
    pub direction: Direction,
}

impl QueryRangeRequest {
    /// Forward scan over an inclusive `[start, end]` window.
    pub fn window(query: &str, start: EpochNanos, end: EpochNanos, limit: u32) -> Self {
        Self {
            query: query.to_string(),
            start: Some(start),
            end: Some(end),
            limit,
            direction: Direction::Forward,
        }
    }

    /// The `limit` lines at or before `ts`, newest first.
    pub fn before(query: &str, ts: EpochNanos, limit: u32) -> Self {
        Self {
            query: query.to_string(),
            start: None,
            end: Some(ts),
            limit,
            direction: Direction::Backward,
        }
    }

    /// The `limit` lines at or after `ts`, oldest first.
    pub fn after(query: &str, ts: EpochNanos, limit: u32) -> Self {
        Self {
            query: query.to_string(),
            start: Some(ts),
            end: None,
            limit,
            direction: Direction::Forward,
        }
    }
}
