use serde::de::DeserializeOwned;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::account::{ChannelAccount, ConversationAccount, ConversationReference};
use crate::error::ActivityError;
use crate::wire::{bag_entries, hoisted_entry, take_hoisted};

/// Activity type discriminators understood by the built-in typed views.
///
/// ```
/// use gsm_activity::ActivityKind;
///
/// assert_eq!(ActivityKind::from_discriminator("messageReaction"), ActivityKind::MessageReaction);
/// assert_eq!(ActivityKind::InstallationUpdate.as_str(), "installationUpdate");
/// assert_eq!(ActivityKind::from_discriminator("handoff"), ActivityKind::Unknown);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityKind {
    Message,
    ConversationUpdate,
    MessageReaction,
    MessageDelete,
    MessageUpdate,
    InstallationUpdate,
    Invoke,
    EndOfConversation,
    Event,
    Typing,
    /// Generic envelope; no typed view applies.
    Unknown,
}

impl ActivityKind {
    /// Every kind that has a typed view, in registration order.
    pub const KNOWN: [ActivityKind; 10] = [
        ActivityKind::Message,
        ActivityKind::ConversationUpdate,
        ActivityKind::MessageReaction,
        ActivityKind::MessageDelete,
        ActivityKind::MessageUpdate,
        ActivityKind::InstallationUpdate,
        ActivityKind::Invoke,
        ActivityKind::EndOfConversation,
        ActivityKind::Event,
        ActivityKind::Typing,
    ];

    /// Returns the wire discriminator carried in the `type` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Message => "message",
            ActivityKind::ConversationUpdate => "conversationUpdate",
            ActivityKind::MessageReaction => "messageReaction",
            ActivityKind::MessageDelete => "messageDelete",
            ActivityKind::MessageUpdate => "messageUpdate",
            ActivityKind::InstallationUpdate => "installationUpdate",
            ActivityKind::Invoke => "invoke",
            ActivityKind::EndOfConversation => "endOfConversation",
            ActivityKind::Event => "event",
            ActivityKind::Typing => "typing",
            ActivityKind::Unknown => "unknown",
        }
    }

    pub fn from_discriminator(value: &str) -> Self {
        Self::KNOWN
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .unwrap_or(ActivityKind::Unknown)
    }
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generic activity envelope.
///
/// Only the addressing fields are hoisted; everything else stays in `properties` and is written
/// back verbatim on serialization. An explicit `null` on a hoisted field also stays in the bag.
///
/// ```
/// use gsm_activity::Activity;
/// use serde_json::json;
///
/// let activity = Activity::from_value(json!({
///     "type": "message",
///     "id": "1",
///     "text": "hi",
///     "channelData": { "tenant": { "id": "t-1" } }
/// }))
/// .unwrap();
/// assert_eq!(activity.str_property("text"), Some("hi"));
/// assert_eq!(activity.to_value()["channelData"]["tenant"]["id"], "t-1");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Activity {
    /// The `type` discriminator.
    pub activity_type: Option<String>,
    pub id: Option<String>,
    pub channel_id: Option<String>,
    pub service_url: Option<String>,
    pub from: Option<ChannelAccount>,
    pub recipient: Option<ChannelAccount>,
    pub conversation: Option<ConversationAccount>,
    pub properties: Map<String, Value>,
}

impl Serialize for Activity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        let mut written = Vec::with_capacity(7);
        hoisted_entry(&mut map, &mut written, "type", &self.activity_type)?;
        hoisted_entry(&mut map, &mut written, "id", &self.id)?;
        hoisted_entry(&mut map, &mut written, "channelId", &self.channel_id)?;
        hoisted_entry(&mut map, &mut written, "serviceUrl", &self.service_url)?;
        hoisted_entry(&mut map, &mut written, "from", &self.from)?;
        hoisted_entry(&mut map, &mut written, "recipient", &self.recipient)?;
        hoisted_entry(&mut map, &mut written, "conversation", &self.conversation)?;
        bag_entries(&mut map, &written, &self.properties)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for Activity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut bag = Map::deserialize(deserializer)?;
        Ok(Self {
            activity_type: take_hoisted::<_, D::Error>(&mut bag, "type")?,
            id: take_hoisted::<_, D::Error>(&mut bag, "id")?,
            channel_id: take_hoisted::<_, D::Error>(&mut bag, "channelId")?,
            service_url: take_hoisted::<_, D::Error>(&mut bag, "serviceUrl")?,
            from: take_hoisted::<_, D::Error>(&mut bag, "from")?,
            recipient: take_hoisted::<_, D::Error>(&mut bag, "recipient")?,
            conversation: take_hoisted::<_, D::Error>(&mut bag, "conversation")?,
            properties: bag,
        })
    }
}

impl Activity {
    /// Creates an empty activity carrying the discriminator of `kind`.
    pub fn of_kind(kind: ActivityKind) -> Self {
        Self {
            activity_type: Some(kind.as_str().to_string()),
            ..Default::default()
        }
    }

    pub fn from_value(value: Value) -> Result<Self, ActivityError> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, ActivityError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn to_value(&self) -> Value {
        // Every field is a string, a map, or an already-valid `Value`.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Raw `type` value, if present and non-empty.
    pub fn discriminator(&self) -> Option<&str> {
        self.activity_type.as_deref().filter(|t| !t.is_empty())
    }

    pub fn kind(&self) -> ActivityKind {
        self.discriminator()
            .map(ActivityKind::from_discriminator)
            .unwrap_or(ActivityKind::Unknown)
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation.as_ref().and_then(ConversationAccount::id)
    }

    pub fn require_conversation_id(&self) -> Result<&str, ActivityError> {
        self.conversation_id()
            .ok_or(ActivityError::missing("conversation.id"))
    }

    pub fn require_service_url(&self) -> Result<&str, ActivityError> {
        self.service_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or(ActivityError::missing("serviceUrl"))
    }

    pub fn require_id(&self) -> Result<&str, ActivityError> {
        self.id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(ActivityError::missing("id"))
    }

    /// Reads and decodes a bag entry. Absent and `null` entries yield `None`.
    pub fn property<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ActivityError> {
        match self.properties.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|source| ActivityError::Property {
                    key: key.to_string(),
                    source,
                }),
        }
    }

    /// Reads a sequence entry, treating an absent entry as empty.
    pub fn list_property<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, ActivityError> {
        Ok(self.property::<Vec<T>>(key)?.unwrap_or_default())
    }

    pub fn str_property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }

    pub fn raw_property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key).filter(|v| !v.is_null())
    }

    /// Encodes `value` into the bag, replacing any previous entry.
    pub fn set_property<T: Serialize>(&mut self, key: &str, value: T) -> Result<(), ActivityError> {
        let encoded = serde_json::to_value(value).map_err(|source| ActivityError::Property {
            key: key.to_string(),
            source,
        })?;
        self.properties.insert(key.to_string(), encoded);
        Ok(())
    }

    pub fn set_str_property(&mut self, key: &str, value: impl Into<String>) {
        self.properties
            .insert(key.to_string(), Value::String(value.into()));
    }

    pub fn remove_property(&mut self, key: &str) -> Option<Value> {
        self.properties.remove(key)
    }

    /// Reads `channelData.eventType`, used by Teams to qualify update activities.
    pub fn channel_event_type(&self) -> Option<&str> {
        self.properties
            .get("channelData")
            .and_then(|data| data.get("eventType"))
            .and_then(Value::as_str)
    }

    pub fn locale(&self) -> Option<&str> {
        self.str_property("locale")
    }

    /// Captures the reference needed to continue this conversation proactively.
    pub fn conversation_reference(&self) -> ConversationReference {
        ConversationReference {
            activity_id: self.id.clone(),
            user: self.from.clone(),
            bot: self.recipient.clone(),
            conversation: self.conversation.clone(),
            channel_id: self.channel_id.clone(),
            locale: self.locale().map(str::to_string),
            service_url: self.service_url.clone(),
        }
    }

    /// Addresses this activity using `reference`.
    ///
    /// Incoming activities keep the user as sender; outgoing ones are sent by the bot and reply
    /// to the referenced activity.
    pub fn apply_conversation_reference(
        &mut self,
        reference: &ConversationReference,
        incoming: bool,
    ) {
        self.channel_id = reference.channel_id.clone();
        self.service_url = reference.service_url.clone();
        self.conversation = reference.conversation.clone();
        if let Some(locale) = &reference.locale {
            self.set_str_property("locale", locale.clone());
        }
        if incoming {
            self.from = reference.user.clone();
            self.recipient = reference.bot.clone();
            if let Some(id) = &reference.activity_id {
                self.id = Some(id.clone());
            }
        } else {
            self.from = reference.bot.clone();
            self.recipient = reference.user.clone();
            if let Some(id) = &reference.activity_id {
                self.set_str_property("replyToId", id.clone());
            }
        }
    }

    /// Builds a `message` reply addressed back to the sender of this activity.
    pub fn reply(&self, text: impl Into<String>) -> Activity {
        let mut reply = Activity::of_kind(ActivityKind::Message);
        reply.apply_conversation_reference(&self.conversation_reference(), false);
        reply.set_str_property("text", text);
        reply
    }
}
