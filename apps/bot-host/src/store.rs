use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use gsm_activity::ConversationReference;
use gsm_bridge::{HandlerError, Middleware, Next, TurnContext};
use tracing::debug;

/// Conversation references keyed by conversation id, for proactive sends.
#[derive(Debug, Default)]
pub struct ConversationReferenceStore {
    references: DashMap<String, ConversationReference>,
}

impl ConversationReferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `reference`, replacing any earlier one for the same conversation. References
    /// without a conversation id are ignored.
    pub fn upsert(&self, reference: ConversationReference) -> bool {
        let Some(id) = reference.conversation_id().map(str::to_string) else {
            return false;
        };
        self.references.insert(id, reference);
        true
    }

    pub fn get(&self, conversation_id: &str) -> Option<ConversationReference> {
        self.references
            .get(conversation_id)
            .map(|entry| entry.value().clone())
    }

    pub fn remove(&self, conversation_id: &str) -> Option<ConversationReference> {
        self.references
            .remove(conversation_id)
            .map(|(_, reference)| reference)
    }

    pub fn conversation_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .references
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }
}

/// Records the conversation reference of every reactive turn before the rest of the pipeline.
pub struct CaptureReferences {
    store: Arc<ConversationReferenceStore>,
}

impl CaptureReferences {
    pub fn new(store: Arc<ConversationReferenceStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Middleware for CaptureReferences {
    async fn on_turn(&self, ctx: &mut TurnContext, next: Next<'_>) -> Result<(), HandlerError> {
        let activity = ctx.activity().activity();
        let reference = activity.conversation_reference();
        if activity.service_url.is_some() && self.store.upsert(reference) {
            debug!(conversation = ?activity.conversation_id(), "conversation reference stored");
        }
        next.run(ctx).await
    }
}
