use std::path::PathBuf;

use futures::{pin_mut, stream, StreamExt};
use lokictx_core::{ContextConfig, ContextErrorPolicy};
use lokictx_protocol::query_range::{EpochNanos, QueryRangeRequest};
use tracing::{info, warn};

use crate::client::LogSource;
use crate::context::{ContextFetcher, MatchedLine};
use crate::error::EngineError;
use crate::report::ReportWriter;

/// What a finished run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub output: PathBuf,
    /// The primary query returned no streams.
    pub no_results: bool,
    pub matched: usize,
    pub context_lines: usize,
    pub skipped_contexts: usize,
    /// The primary query hit its limit; later matches were dropped.
    pub possibly_truncated: bool,
}

/// Runs the whole pipeline: time conversion, primary query, context lookup
/// and report writing.
///
/// The report file is only created once the primary query succeeded.
/// Blocks are written in discovery order even when context lookups run
/// concurrently.
pub async fn run<S: LogSource + ?Sized>(
    config: &ContextConfig,
    source: &S,
) -> Result<RunSummary, EngineError> {
    let window = config.window()?;
    let primary = QueryRangeRequest::window(
        &config.query,
        EpochNanos(window.start),
        EpochNanos(window.end),
        config.limit,
    );

    info!(
        query = %config.query,
        start = window.start,
        end = window.end,
        limit = config.limit,
        "running primary query"
    );
    let response = source.query_range(&primary).await?;

    let mut summary = RunSummary {
        output: config.output.clone(),
        possibly_truncated: response.entry_count() >= config.limit as usize,
        ..RunSummary::default()
    };
    if summary.possibly_truncated {
        warn!(
            limit = config.limit,
            "primary query hit its limit; matches beyond it are not included"
        );
    }

    let output_error = |source: std::io::Error| EngineError::Output {
        path: config.output.clone(),
        source,
    };
    let mut report = ReportWriter::create(&config.output).map_err(output_error)?;

    if response.is_empty() {
        report.write_no_results().map_err(output_error)?;
        summary.no_results = true;
        info!("primary query matched nothing");
        return Ok(summary);
    }

    let matched = MatchedLine::collect(response);
    summary.matched = matched.len();
    info!(
        matched = matched.len(),
        context_lines = config.context_lines,
        "fetching context"
    );

    let fetcher = ContextFetcher::new(source, config);
    let fetcher = &fetcher;
    let outcomes = stream::iter(matched.iter())
        .map(|line| async move { (line, fetcher.fetch(line).await) })
        .buffered(config.context_concurrency.max(1));
    pin_mut!(outcomes);

    while let Some((line, outcome)) = outcomes.next().await {
        match outcome {
            Ok(context) => {
                summary.context_lines += context.len();
                report
                    .write_block(&line.line, &context)
                    .map_err(output_error)?;
            }
            Err(err) if config.on_context_error == ContextErrorPolicy::Skip => {
                warn!(timestamp = %line.timestamp, error = %err, "context lookup failed; skipping");
                summary.skipped_contexts += 1;
                report
                    .write_unavailable_block(&line.line, &err.to_string())
                    .map_err(output_error)?;
            }
            Err(err) => return Err(err),
        }
    }

    info!(
        blocks = report.blocks_written(),
        output = %config.output.display(),
        "report written"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::fs;

    use async_trait::async_trait;
    use lokictx_core::{ContextScope, TimeZoneMode};
    use lokictx_protocol::query_range::{
        Direction, LogEntry, QueryData, QueryRangeResponse, StreamResult,
    };
    use parking_lot::Mutex;
    use tempfile::TempDir;
    use url::Url;

    use super::*;
    use crate::client::ClientError;

    const FILTER: &str = r#"{app="my-app"} |= "exception""#;

    type Responder =
        Box<dyn Fn(&QueryRangeRequest) -> Result<QueryRangeResponse, ClientError> + Send + Sync>;

    /// Records every request and answers from a closure.
    struct ScriptedSource {
        calls: Mutex<Vec<QueryRangeRequest>>,
        respond: Responder,
    }

    impl ScriptedSource {
        fn new(
            respond: impl Fn(&QueryRangeRequest) -> Result<QueryRangeResponse, ClientError>
                + Send
                + Sync
                + 'static,
        ) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                respond: Box::new(respond),
            }
        }

        fn calls(&self) -> Vec<QueryRangeRequest> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl LogSource for ScriptedSource {
        async fn query_range(
            &self,
            request: &QueryRangeRequest,
        ) -> Result<QueryRangeResponse, ClientError> {
            self.calls.lock().push(request.clone());
            (self.respond)(request)
        }
    }

    fn streams(streams: Vec<(Vec<(&str, &str)>, Vec<(&str, &str)>)>) -> QueryRangeResponse {
        QueryRangeResponse {
            status: "success".into(),
            data: QueryData {
                result_type: "streams".into(),
                result: streams
                    .into_iter()
                    .map(|(labels, values)| StreamResult {
                        stream: labels
                            .iter()
                            .map(|(k, v)| (k.to_string(), v.to_string()))
                            .collect::<BTreeMap<_, _>>(),
                        values: values
                            .iter()
                            .map(|(ts, line)| LogEntry::new(*ts, *line))
                            .collect(),
                    })
                    .collect(),
            },
        }
    }

    fn is_primary(request: &QueryRangeRequest) -> bool {
        request.start.is_some() && request.end.is_some()
    }

    fn config(dir: &TempDir) -> ContextConfig {
        let mut config = ContextConfig::new(
            Url::parse("http://loki.test:3100").unwrap(),
            FILTER,
            "2025-10-06 12:00:00",
            "2025-10-06 14:00:00",
        );
        config.timezone = TimeZoneMode::Utc;
        config.output = dir.path().join("report.txt");
        config
    }

    fn server_error() -> ClientError {
        ClientError::UnexpectedStatus {
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            body: "boom".into(),
        }
    }

    #[tokio::test]
    async fn empty_result_writes_marker_and_skips_context() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        let source = ScriptedSource::new(|_| Ok(QueryRangeResponse::default()));

        let summary = run(&config, &source).await.expect("run");

        assert!(summary.no_results);
        assert_eq!(source.calls().len(), 1);
        assert_eq!(
            fs::read_to_string(&config.output).unwrap(),
            "No logs found.\n"
        );
    }

    #[tokio::test]
    async fn primary_request_carries_window_and_limit() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        let source = ScriptedSource::new(|_| Ok(QueryRangeResponse::default()));

        run(&config, &source).await.expect("run");

        let calls = source.calls();
        let primary = &calls[0];
        assert_eq!(primary.query, FILTER);
        assert_eq!(primary.start, Some(EpochNanos(1_759_752_000_000_000_000)));
        assert_eq!(primary.end, Some(EpochNanos(1_759_759_200_000_000_000)));
        assert_eq!(primary.limit, 1000);
        assert_eq!(primary.direction, Direction::Forward);
    }

    #[tokio::test]
    async fn single_match_block_has_before_then_after() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        let source = ScriptedSource::new(|request| {
            Ok(if is_primary(request) {
                streams(vec![(vec![("app", "my-app")], vec![("1759752000000000500", "boom")])])
            } else if request.direction == Direction::Backward {
                streams(vec![(
                    vec![("app", "my-app")],
                    vec![("1759752000000000500", "boom"), ("1759752000000000400", "prep")],
                )])
            } else {
                streams(vec![(vec![("app", "my-app")], vec![("1759752000000000600", "after")])])
            })
        });

        let summary = run(&config, &source).await.expect("run");

        assert_eq!(summary.matched, 1);
        assert_eq!(summary.context_lines, 3);
        assert_eq!(
            fs::read_to_string(&config.output).unwrap(),
            "==== Matched log ====\nboom\n[BEFORE] boom\n[BEFORE] prep\n[AFTER] after\n\n"
        );

        let calls = source.calls();
        assert_eq!(calls.len(), 3);
        let ts = EpochNanos(1_759_752_000_000_000_500);
        assert_eq!(calls[1], QueryRangeRequest::before(FILTER, ts, 5));
        assert_eq!(calls[2], QueryRangeRequest::after(FILTER, ts, 5));
    }

    #[tokio::test]
    async fn two_streams_produce_blocks_in_stream_order() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        let source = ScriptedSource::new(|request| {
            Ok(if is_primary(request) {
                streams(vec![
                    (vec![("pod", "b")], vec![("200", "second-stream")]),
                    (vec![("pod", "a")], vec![("100", "first-stream")]),
                ])
            } else {
                let tag = format!("ctx-{}", request.start.or(request.end).unwrap());
                let mut response = streams(vec![(vec![("pod", "x")], vec![("1", "")])]);
                response.data.result[0].values[0].line = tag;
                response
            })
        });

        run(&config, &source).await.expect("run");

        assert_eq!(
            fs::read_to_string(&config.output).unwrap(),
            "==== Matched log ====\nsecond-stream\n[BEFORE] ctx-200\n[AFTER] ctx-200\n\n\
             ==== Matched log ====\nfirst-stream\n[BEFORE] ctx-100\n[AFTER] ctx-100\n\n"
        );
    }

    #[tokio::test]
    async fn primary_failure_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        let source = ScriptedSource::new(|_| Err(server_error()));

        let err = run(&config, &source).await.unwrap_err();

        assert!(matches!(err, EngineError::Client(_)));
        assert!(!config.output.exists());
    }

    #[tokio::test]
    async fn time_parse_failure_happens_before_any_call() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(&dir);
        config.start = "06/10/2025 12:00".into();
        let source = ScriptedSource::new(|_| Ok(QueryRangeResponse::default()));

        let err = run(&config, &source).await.unwrap_err();

        assert!(matches!(err, EngineError::Core(_)));
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn context_failure_aborts_but_keeps_earlier_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        let source = ScriptedSource::new(|request| {
            if is_primary(request) {
                Ok(streams(vec![(vec![("app", "a")], vec![("1", "ok"), ("2", "broken")])]))
            } else if request.start == Some(EpochNanos(2)) || request.end == Some(EpochNanos(2)) {
                Err(server_error())
            } else {
                Ok(QueryRangeResponse::default())
            }
        });

        let err = run(&config, &source).await.unwrap_err();

        assert!(matches!(err, EngineError::Client(_)));
        assert_eq!(
            fs::read_to_string(&config.output).unwrap(),
            "==== Matched log ====\nok\n\n"
        );
    }

    #[tokio::test]
    async fn skip_policy_continues_after_context_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(&dir);
        config.on_context_error = ContextErrorPolicy::Skip;
        let source = ScriptedSource::new(|request| {
            if is_primary(request) {
                Ok(streams(vec![(vec![("app", "a")], vec![("1", "broken"), ("2", "fine")])]))
            } else if request.end == Some(EpochNanos(1)) {
                Err(server_error())
            } else {
                Ok(QueryRangeResponse::default())
            }
        });

        let summary = run(&config, &source).await.expect("run");

        assert_eq!(summary.skipped_contexts, 1);
        let text = fs::read_to_string(&config.output).unwrap();
        assert!(text.starts_with("==== Matched log ====\nbroken\n[CONTEXT UNAVAILABLE] "));
        assert!(text.ends_with("==== Matched log ====\nfine\n\n"));
    }

    #[tokio::test]
    async fn stream_scope_narrows_context_selector() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(&dir);
        config.context_scope = ContextScope::Stream;
        let source = ScriptedSource::new(|request| {
            Ok(if is_primary(request) {
                streams(vec![(vec![("app", "my-app"), ("pod", "p-1")], vec![("7", "boom")])])
            } else {
                QueryRangeResponse::default()
            })
        });

        run(&config, &source).await.expect("run");

        let calls = source.calls();
        assert_eq!(calls[1].query, r#"{app="my-app",pod="p-1"}"#);
        assert_eq!(calls[2].query, r#"{app="my-app",pod="p-1"}"#);
    }

    #[tokio::test]
    async fn zero_context_lines_skips_context_calls() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(&dir);
        config.context_lines = 0;
        let source = ScriptedSource::new(|request| {
            Ok(if is_primary(request) {
                streams(vec![(vec![("app", "a")], vec![("1", "only")])])
            } else {
                QueryRangeResponse::default()
            })
        });

        run(&config, &source).await.expect("run");

        assert_eq!(source.calls().len(), 1);
        assert_eq!(
            fs::read_to_string(&config.output).unwrap(),
            "==== Matched log ====\nonly\n\n"
        );
    }

    #[tokio::test]
    async fn concurrent_lookups_keep_discovery_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(&dir);
        config.context_concurrency = 4;
        let source = ScriptedSource::new(|request| {
            Ok(if is_primary(request) {
                streams(vec![(
                    vec![("app", "a")],
                    vec![("1", "l1"), ("2", "l2"), ("3", "l3"), ("4", "l4"), ("5", "l5")],
                )])
            } else {
                QueryRangeResponse::default()
            })
        });

        let summary = run(&config, &source).await.expect("run");

        assert_eq!(summary.matched, 5);
        let text = fs::read_to_string(&config.output).unwrap();
        let lines: Vec<&str> = text
            .lines()
            .filter(|line| line.starts_with('l'))
            .collect();
        assert_eq!(lines, vec!["l1", "l2", "l3", "l4", "l5"]);
    }

    #[tokio::test]
    async fn flags_truncation_at_limit() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(&dir);
        config.limit = 2;
        config.context_lines = 0;
        let source = ScriptedSource::new(|_| {
            Ok(streams(vec![(vec![("app", "a")], vec![("1", "x"), ("2", "y")])]))
        });

        let summary = run(&config, &source).await.expect("run");

        assert!(summary.possibly_truncated);
    }
}
