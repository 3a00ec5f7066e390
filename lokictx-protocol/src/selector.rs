use std::collections::BTreeMap;

/// Builds a LogQL stream selector matching exactly `labels`.
///
/// Keys come out sorted; backslashes and double quotes in values are
/// escaped. An empty label set yields `{}`.
pub fn stream_selector(labels: &BTreeMap<String, String>) -> String {
    let matchers = labels
        .iter()
        .map(|(key, value)| format!("{key}=\"{}\"", escape_label_value(value)))
        .collect::<Vec<_>>()
        .join(",");
    format!("{{{matchers}}}")
}

fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            other => escaped.push(other),
        }
    }
    escaped
}
