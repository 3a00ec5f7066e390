use std::collections::BTreeMap;
use std::fmt;

use lokictx_core::{ContextConfig, ContextScope};
use lokictx_protocol::query_range::{EpochNanos, QueryRangeRequest, QueryRangeResponse};
use lokictx_protocol::selector::stream_selector;
use tracing::debug;

use crate::client::LogSource;
use crate::error::EngineError;

/// Side of the matched line a context line was found on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextDirection {
    Before,
    After,
}

impl ContextDirection {
    pub fn tag(&self) -> &'static str {
        match self {
            ContextDirection::Before => "[BEFORE]",
            ContextDirection::After => "[AFTER]",
        }
    }
}

/// A surrounding line. Its timestamp is not kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextLine {
    pub direction: ContextDirection,
    pub line: String,
}

impl ContextLine {
    pub fn new(direction: ContextDirection, line: impl Into<String>) -> Self {
        Self {
            direction,
            line: line.into(),
        }
    }
}

impl fmt::Display for ContextLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.direction.tag(), self.line)
    }
}

/// One entry of the primary result, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedLine {
    pub labels: BTreeMap<String, String>,
    pub timestamp: String,
    pub line: String,
}

impl MatchedLine {
    /// Flattens a primary response: streams in backend order, entries in
    /// backend order within each stream.
    pub fn collect(response: QueryRangeResponse) -> Vec<MatchedLine> {
        response
            .into_streams()
            .into_iter()
            .flat_map(|stream| {
                let labels = stream.stream;
                stream.values.into_iter().map(move |entry| MatchedLine {
                    labels: labels.clone(),
                    timestamp: entry.timestamp,
                    line: entry.line,
                })
            })
            .collect()
    }

    pub fn epoch_nanos(&self) -> Result<EpochNanos, EngineError> {
        self.timestamp
            .parse()
            .map_err(|_| EngineError::InvalidTimestamp(self.timestamp.clone()))
    }
}

/// Fetches the lines immediately before and after a matched line.
pub struct ContextFetcher<'a, S: ?Sized> {
    source: &'a S,
    filter: &'a str,
    scope: ContextScope,
    lines: u32,
}

impl<'a, S: LogSource + ?Sized> ContextFetcher<'a, S> {
    pub fn new(source: &'a S, config: &'a ContextConfig) -> Self {
        Self {
            source,
            filter: &config.query,
            scope: config.context_scope,
            lines: config.context_lines,
        }
    }

    /// Query used for the context calls of a line from the given stream.
    ///
    /// `Filter` scope draws context from everything the filter matches,
    /// not only the matched line's stream.
    pub fn selector_for(&self, labels: &BTreeMap<String, String>) -> String {
        match self.scope {
            ContextScope::Stream if !labels.is_empty() => stream_selector(labels),
            _ => self.filter.to_string(),
        }
    }

    /// Runs the backward call then the forward call. Before-lines come
    /// first, each group in the order the backend returned it.
    pub async fn fetch(&self, matched: &MatchedLine) -> Result<Vec<ContextLine>, EngineError> {
        if self.lines == 0 {
            return Ok(Vec::new());
        }

        let ts = matched.epoch_nanos()?;
        let selector = self.selector_for(&matched.labels);

        let before = self
            .source
            .query_range(&QueryRangeRequest::before(&selector, ts, self.lines))
            .await?;
        let after = self
            .source
            .query_range(&QueryRangeRequest::after(&selector, ts, self.lines))
            .await?;

        let mut context = Vec::with_capacity(before.entry_count() + after.entry_count());
        context.extend(
            before
                .lines()
                .map(|line| ContextLine::new(ContextDirection::Before, line)),
        );
        context.extend(
            after
                .lines()
                .map(|line| ContextLine::new(ContextDirection::After, line)),
        );

        debug!(
            %ts,
            before = before.entry_count(),
            after = after.entry_count(),
            "context fetched"
        );
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lokictx_protocol::query_range::{LogEntry, QueryData, StreamResult};

    fn response(streams: Vec<(&str, Vec<(&str, &str)>)>) -> QueryRangeResponse {
        QueryRangeResponse {
            status: "success".into(),
            data: QueryData {
                result_type: "streams".into(),
                result: streams
                    .into_iter()
                    .map(|(app, values)| StreamResult {
                        stream: BTreeMap::from([("app".to_string(), app.to_string())]),
                        values: values
                            .into_iter()
                            .map(|(ts, line)| LogEntry::new(ts, line))
                            .collect(),
                    })
                    .collect(),
            },
        }
    }

    #[test]
    fn collect_preserves_discovery_order() {
        let matched = MatchedLine::collect(response(vec![
            ("b", vec![("3", "third"), ("1", "first")]),
            ("a", vec![("2", "second")]),
        ]));
        let lines: Vec<_> = matched.iter().map(|m| m.line.as_str()).collect();
        assert_eq!(lines, vec!["third", "first", "second"]);
        assert_eq!(matched[2].labels["app"], "a");
    }

    #[test]
    fn context_line_renders_with_tag() {
        assert_eq!(
            ContextLine::new(ContextDirection::Before, "x").to_string(),
            "[BEFORE] x"
        );
        assert_eq!(
            ContextLine::new(ContextDirection::After, "y").to_string(),
            "[AFTER] y"
        );
    }

    #[test]
    fn rejects_non_numeric_timestamp() {
        let matched = MatchedLine {
            labels: BTreeMap::new(),
            timestamp: "2025-10-06T12:00:00Z".into(),
            line: "boom".into(),
        };
        assert!(matches!(
            matched.epoch_nanos(),
            Err(EngineError::InvalidTimestamp(_))
        ));
    }
}
