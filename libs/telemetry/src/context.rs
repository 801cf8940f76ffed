use tracing::Span;

/// Low-cardinality description of one turn, attached to its span.
#[derive(Debug, Clone, Default)]
pub struct TurnLabels {
    pub kind: String,
    pub channel: Option<String>,
    pub conversation: Option<String>,
    pub activity_type: Option<String>,
    pub activity_id: Option<String>,
}

impl TurnLabels {
    /// `kind` is `reactive` for inbound turns and `proactive` for continuations.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Default::default()
        }
    }
}

/// Opens the `turn.process` span for one turn. Missing labels are recorded as empty strings.
pub fn start_turn_span(labels: &TurnLabels) -> Span {
    tracing::info_span!(
        "turn.process",
        kind = %labels.kind,
        channel = %labels.channel.as_deref().unwrap_or(""),
        conversation = %labels.conversation.as_deref().unwrap_or(""),
        activity_type = %labels.activity_type.as_deref().unwrap_or(""),
        activity_id = %labels.activity_id.as_deref().unwrap_or(""),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[tracing_test::traced_test]
    fn span_carries_turn_fields() {
        let mut labels = TurnLabels::new("proactive");
        labels.conversation = Some("19:conv".into());
        let span = start_turn_span(&labels);
        let _guard = span.enter();
        tracing::info!("inside turn");
        assert!(logs_contain("turn.process"));
        assert!(logs_contain("19:conv"));
        assert!(logs_contain("proactive"));
    }
}
