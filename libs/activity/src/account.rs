use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde::ser::SerializeMap;
use serde_json::{Map, Value};

use crate::activity::{Activity, ActivityKind};
use crate::wire::{bag_entries, hoisted_entry, take_hoisted};

/// Role value carried by accounts that act for an agentic user.
pub const AGENTIC_USER_ROLE: &str = "agenticUser";
/// Role value carried by accounts that act for an agentic application instance.
pub const AGENTIC_APP_INSTANCE_ROLE: &str = "agenticAppInstance";
/// Event name used for proactive continuation activities.
pub const CONTINUE_CONVERSATION_EVENT: &str = "ContinueConversation";

/// Sender or recipient of an activity.
///
/// ```
/// use gsm_activity::ChannelAccount;
///
/// let bot = ChannelAccount::new("28:bot").with_name("Helper");
/// assert_eq!(bot.id.as_deref(), Some("28:bot"));
/// assert!(!bot.is_agentic());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelAccount {
    pub id: Option<String>,
    pub name: Option<String>,
    pub aad_object_id: Option<String>,
    pub role: Option<String>,
    pub agentic_app_id: Option<String>,
    pub agentic_user_id: Option<String>,
    pub properties: Map<String, Value>,
}

impl ChannelAccount {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The id, when present and non-empty.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    /// True when the account represents a delegated, non-human actor.
    pub fn is_agentic(&self) -> bool {
        matches!(
            self.role.as_deref(),
            Some(AGENTIC_USER_ROLE) | Some(AGENTIC_APP_INSTANCE_ROLE)
        )
    }
}

impl Serialize for ChannelAccount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        let mut written = Vec::with_capacity(6);
        hoisted_entry(&mut map, &mut written, "id", &self.id)?;
        hoisted_entry(&mut map, &mut written, "name", &self.name)?;
        hoisted_entry(&mut map, &mut written, "aadObjectId", &self.aad_object_id)?;
        hoisted_entry(&mut map, &mut written, "role", &self.role)?;
        hoisted_entry(&mut map, &mut written, "agenticAppId", &self.agentic_app_id)?;
        hoisted_entry(&mut map, &mut written, "agenticUserId", &self.agentic_user_id)?;
        bag_entries(&mut map, &written, &self.properties)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for ChannelAccount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut bag = Map::deserialize(deserializer)?;
        Ok(Self {
            id: take_hoisted::<_, D::Error>(&mut bag, "id")?,
            name: take_hoisted::<_, D::Error>(&mut bag, "name")?,
            aad_object_id: take_hoisted::<_, D::Error>(&mut bag, "aadObjectId")?,
            role: take_hoisted::<_, D::Error>(&mut bag, "role")?,
            agentic_app_id: take_hoisted::<_, D::Error>(&mut bag, "agenticAppId")?,
            agentic_user_id: take_hoisted::<_, D::Error>(&mut bag, "agenticUserId")?,
            properties: bag,
        })
    }
}

/// Conversation an activity belongs to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationAccount {
    pub id: Option<String>,
    pub name: Option<String>,
    pub conversation_type: Option<String>,
    pub tenant_id: Option<String>,
    pub is_group: Option<bool>,
    pub properties: Map<String, Value>,
}

impl ConversationAccount {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    /// The id, when present and non-empty.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }
}

impl Serialize for ConversationAccount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        let mut written = Vec::with_capacity(5);
        hoisted_entry(&mut map, &mut written, "id", &self.id)?;
        hoisted_entry(&mut map, &mut written, "name", &self.name)?;
        hoisted_entry(&mut map, &mut written, "conversationType", &self.conversation_type)?;
        hoisted_entry(&mut map, &mut written, "tenantId", &self.tenant_id)?;
        hoisted_entry(&mut map, &mut written, "isGroup", &self.is_group)?;
        bag_entries(&mut map, &written, &self.properties)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for ConversationAccount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut bag = Map::deserialize(deserializer)?;
        Ok(Self {
            id: take_hoisted::<_, D::Error>(&mut bag, "id")?,
            name: take_hoisted::<_, D::Error>(&mut bag, "name")?,
            conversation_type: take_hoisted::<_, D::Error>(&mut bag, "conversationType")?,
            tenant_id: take_hoisted::<_, D::Error>(&mut bag, "tenantId")?,
            is_group: take_hoisted::<_, D::Error>(&mut bag, "isGroup")?,
            properties: bag,
        })
    }
}

/// Everything needed to address a conversation again after the inbound turn has ended.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<ChannelAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot: Option<ChannelAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation: Option<ConversationAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_url: Option<String>,
}

impl ConversationReference {
    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation.as_ref().and_then(ConversationAccount::id)
    }

    /// Builds the `event` activity a proactive turn starts from.
    ///
    /// ```
    /// use gsm_activity::{ConversationAccount, ConversationReference, CONTINUE_CONVERSATION_EVENT};
    ///
    /// let reference = ConversationReference {
    ///     conversation: Some(ConversationAccount::new("19:abc")),
    ///     service_url: Some("https://smba.example/amer/".into()),
    ///     ..Default::default()
    /// };
    /// let activity = reference.continuation_activity();
    /// assert_eq!(activity.discriminator(), Some("event"));
    /// assert_eq!(activity.str_property("name"), Some(CONTINUE_CONVERSATION_EVENT));
    /// assert_eq!(activity.conversation_id(), Some("19:abc"));
    /// ```
    pub fn continuation_activity(&self) -> Activity {
        let mut activity = Activity::of_kind(ActivityKind::Event);
        activity.id = Some(uuid::Uuid::new_v4().to_string());
        activity.channel_id = self.channel_id.clone();
        activity.service_url = self.service_url.clone();
        activity.conversation = self.conversation.clone();
        activity.recipient = self.bot.clone();
        activity.from = self.user.clone();
        activity.properties.insert(
            "name".into(),
            Value::String(CONTINUE_CONVERSATION_EVENT.into()),
        );
        if let Some(locale) = &self.locale {
            activity
                .properties
                .insert("locale".into(), Value::String(locale.clone()));
        }
        if let Ok(relates_to) = serde_json::to_value(self) {
            activity.properties.insert("relatesTo".into(), relates_to);
        }
        activity
    }
}
