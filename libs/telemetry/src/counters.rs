/// `turns_processed_total{kind,outcome}`.
pub fn record_turn(kind: &'static str, outcome: &'static str) {
    metrics::counter!(
        "turns_processed_total",
        "kind" => kind,
        "outcome" => outcome
    )
    .increment(1);
}

/// `connector_errors_total{operation}`.
pub fn record_connector_error(operation: &'static str) {
    metrics::counter!("connector_errors_total", "operation" => operation).increment(1);
}
