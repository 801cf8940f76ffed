use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::activity::ActivityKind;
use crate::error::ActivityError;

/// File, card, or media attached to a message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(default)]
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl Attachment {
    pub const ADAPTIVE_CARD_CONTENT_TYPE: &'static str = "application/vnd.microsoft.card.adaptive";

    /// Wraps an Adaptive Card payload; the card itself is opaque here.
    pub fn adaptive_card(card: Value) -> Self {
        Self {
            content_type: Self::ADAPTIVE_CARD_CONTENT_TYPE.into(),
            content: Some(card),
            ..Default::default()
        }
    }
}

/// Metadata entity attached to an activity (mentions, client info, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "type", default)]
    pub entity_type: String,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl Entity {
    pub fn is_mention(&self) -> bool {
        self.entity_type.eq_ignore_ascii_case("mention")
    }

    /// Id of the mentioned account, for mention entities.
    pub fn mentioned_id(&self) -> Option<&str> {
        self.properties
            .get("mentioned")
            .and_then(|m| m.get("id"))
            .and_then(Value::as_str)
    }

    /// Markup the mention occupies in the message text.
    pub fn mention_text(&self) -> Option<&str> {
        self.properties.get("text").and_then(Value::as_str)
    }
}

activity_view!(
    /// `message` activity.
    ///
    /// ```
    /// use gsm_activity::MessageActivity;
    ///
    /// let mut msg = MessageActivity::new();
    /// msg.set_text("hello");
    /// assert_eq!(msg.text(), Some("hello"));
    /// assert_eq!(msg.to_value()["text"], "hello");
    /// ```
    MessageActivity => ActivityKind::Message
);

impl MessageActivity {
    pub fn text(&self) -> Option<&str> {
        self.str_property("text")
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.set_str_property("text", text);
    }

    pub fn text_format(&self) -> Option<&str> {
        self.str_property("textFormat")
    }

    pub fn set_text_format(&mut self, format: impl Into<String>) {
        self.set_str_property("textFormat", format);
    }

    pub fn reply_to_id(&self) -> Option<&str> {
        self.str_property("replyToId")
    }

    pub fn value(&self) -> Option<&Value> {
        self.raw_property("value")
    }

    pub fn attachments(&self) -> Result<Vec<Attachment>, ActivityError> {
        self.list_property("attachments")
    }

    pub fn set_attachments(&mut self, attachments: &[Attachment]) -> Result<(), ActivityError> {
        self.set_property("attachments", attachments)
    }

    pub fn add_attachment(&mut self, attachment: Attachment) -> Result<(), ActivityError> {
        let mut attachments = self.attachments()?;
        attachments.push(attachment);
        self.set_attachments(&attachments)
    }

    pub fn entities(&self) -> Result<Vec<Entity>, ActivityError> {
        self.list_property("entities")
    }

    pub fn mentions(&self) -> Result<Vec<Entity>, ActivityError> {
        Ok(self
            .entities()?
            .into_iter()
            .filter(Entity::is_mention)
            .collect())
    }

    /// Strips mentions of the recipient (usually the bot) from the text and returns the result.
    ///
    /// The stored text is rewritten as well, so later views see the cleaned value.
    pub fn remove_recipient_mention(&mut self) -> Result<Option<String>, ActivityError> {
        let Some(recipient_id) = self
            .recipient
            .as_ref()
            .and_then(|r| r.id())
            .map(str::to_string)
        else {
            return Ok(self.text().map(str::to_string));
        };
        let Some(mut text) = self.text().map(str::to_string) else {
            return Ok(None);
        };
        for mention in self.mentions()? {
            if mention.mentioned_id() != Some(recipient_id.as_str()) {
                continue;
            }
            if let Some(markup) = mention.mention_text() {
                text = text.replace(markup, "");
            }
        }
        let cleaned = text.trim().to_string();
        self.set_text(cleaned.clone());
        Ok(Some(cleaned))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::Activity;
    use serde_json::json;

    fn mentioned_message() -> MessageActivity {
        MessageActivity::from_activity(
            Activity::from_value(json!({
                "type": "message",
                "text": "<at>Helper</at> what's the weather?",
                "recipient": { "id": "28:bot" },
                "entities": [
                    { "type": "mention", "text": "<at>Helper</at>", "mentioned": { "id": "28:bot" } },
                    { "type": "clientInfo", "locale": "en-US" }
                ]
            }))
            .unwrap(),
        )
    }

    #[test]
    fn recipient_mention_is_removed_from_bag() {
        let mut msg = mentioned_message();
        let cleaned = msg.remove_recipient_mention().unwrap();
        assert_eq!(cleaned.as_deref(), Some("what's the weather?"));
        assert_eq!(msg.to_value()["text"], "what's the weather?");
    }

    #[test]
    fn mentions_filter_other_entities() {
        let msg = mentioned_message();
        assert_eq!(msg.entities().unwrap().len(), 2);
        assert_eq!(msg.mentions().unwrap().len(), 1);
    }

    #[test]
    fn added_attachment_lands_in_envelope() {
        let mut msg = MessageActivity::new();
        msg.add_attachment(Attachment::adaptive_card(json!({ "type": "AdaptiveCard" })))
            .unwrap();
        let value = msg.into_activity().to_value();
        assert_eq!(
            value["attachments"][0]["contentType"],
            Attachment::ADAPTIVE_CARD_CONTENT_TYPE
        );
        assert_eq!(value["attachments"][0]["content"]["type"], "AdaptiveCard");
    }
}
