use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::activity::ActivityKind;
use crate::error::ActivityError;

/// A single reaction entry (`like`, `heart`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageReaction {
    #[serde(rename = "type", default)]
    pub reaction_type: String,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl MessageReaction {
    pub fn new(reaction_type: impl Into<String>) -> Self {
        Self {
            reaction_type: reaction_type.into(),
            properties: Map::new(),
        }
    }
}

activity_view!(
    /// `messageReaction` activity.
    MessageReactionActivity => ActivityKind::MessageReaction
);

impl MessageReactionActivity {
    pub fn reactions_added(&self) -> Result<Vec<MessageReaction>, ActivityError> {
        self.list_property("reactionsAdded")
    }

    pub fn set_reactions_added(
        &mut self,
        reactions: &[MessageReaction],
    ) -> Result<(), ActivityError> {
        self.set_property("reactionsAdded", reactions)
    }

    pub fn reactions_removed(&self) -> Result<Vec<MessageReaction>, ActivityError> {
        self.list_property("reactionsRemoved")
    }

    pub fn set_reactions_removed(
        &mut self,
        reactions: &[MessageReaction],
    ) -> Result<(), ActivityError> {
        self.set_property("reactionsRemoved", reactions)
    }

    pub fn has_reactions_added(&self) -> bool {
        non_empty_array(self.raw_property("reactionsAdded"))
    }

    pub fn has_reactions_removed(&self) -> bool {
        non_empty_array(self.raw_property("reactionsRemoved"))
    }

    /// Id of the message the reaction applies to.
    pub fn reply_to_id(&self) -> Option<&str> {
        self.str_property("replyToId")
    }
}

fn non_empty_array(value: Option<&Value>) -> bool {
    value
        .and_then(Value::as_array)
        .is_some_and(|items| !items.is_empty())
}

activity_view!(
    /// `messageUpdate` activity (edit or undelete).
    MessageUpdateActivity => ActivityKind::MessageUpdate
);

impl MessageUpdateActivity {
    pub fn text(&self) -> Option<&str> {
        self.str_property("text")
    }

    /// `editMessage` or `undeleteMessage` on Teams.
    pub fn event_type(&self) -> Option<&str> {
        self.channel_event_type()
    }
}

activity_view!(
    /// `messageDelete` activity.
    MessageDeleteActivity => ActivityKind::MessageDelete
);

impl MessageDeleteActivity {
    /// `softDeleteMessage` on Teams.
    pub fn event_type(&self) -> Option<&str> {
        self.channel_event_type()
    }
}
