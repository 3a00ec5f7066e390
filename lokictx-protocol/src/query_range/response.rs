use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, IgnoredAny, SeqAccess, Visitor};
use serde::ser::SerializeTuple;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Body of a `query_range` response.
///
/// Only the `streams` result type is consumed. Missing `data` or `result`
/// decode as an empty result set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryRangeResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub data: QueryData,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryData {
    #[serde(rename = "resultType", default)]
    pub result_type: String,
    #[serde(default)]
    pub result: Vec<StreamResult>,
}

/// One log stream: its label set and entries in backend order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamResult {
    #[serde(default)]
    pub stream: BTreeMap<String, String>,
    #[serde(default)]
    pub values: Vec<LogEntry>,
}

/// A `[timestamp, line]` pair. The timestamp stays in its wire form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: String,
    pub line: String,
}

impl LogEntry {
    pub fn new(timestamp: impl Into<String>, line: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            line: line.into(),
        }
    }
}

impl QueryRangeResponse {
    pub fn streams(&self) -> &[StreamResult] {
        &self.data.result
    }

    pub fn into_streams(self) -> Vec<StreamResult> {
        self.data.result
    }

    /// True when the backend returned no streams at all.
    pub fn is_empty(&self) -> bool {
        self.data.result.is_empty()
    }

    /// Number of entries across every stream.
    pub fn entry_count(&self) -> usize {
        self.data.result.iter().map(|stream| stream.values.len()).sum()
    }

    /// Every line, streams in backend order and entries in backend order
    /// within each stream.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.data
            .result
            .iter()
            .flat_map(|stream| stream.values.iter().map(|entry| entry.line.as_str()))
    }
}

impl Serialize for LogEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(&self.timestamp)?;
        tuple.serialize_element(&self.line)?;
        tuple.end()
    }
}

impl<'de> Deserialize<'de> for LogEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_seq(LogEntryVisitor)
    }
}

struct LogEntryVisitor;

impl<'de> Visitor<'de> for LogEntryVisitor {
    type Value = LogEntry;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a [timestamp, line] array")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<LogEntry, A::Error> {
        let timestamp: String = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        let line: String = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(1, &self))?;
        // Newer backends append a structured-metadata object.
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(LogEntry { timestamp, line })
    }
}
