use crate::account::ChannelAccount;
use crate::activity::ActivityKind;
use crate::error::ActivityError;

activity_view!(
    /// `conversationUpdate` activity: membership and metadata changes.
    ConversationUpdateActivity => ActivityKind::ConversationUpdate
);

impl ConversationUpdateActivity {
    pub fn members_added(&self) -> Result<Vec<ChannelAccount>, ActivityError> {
        self.list_property("membersAdded")
    }

    pub fn set_members_added(&mut self, members: &[ChannelAccount]) -> Result<(), ActivityError> {
        self.set_property("membersAdded", members)
    }

    pub fn members_removed(&self) -> Result<Vec<ChannelAccount>, ActivityError> {
        self.list_property("membersRemoved")
    }

    pub fn set_members_removed(
        &mut self,
        members: &[ChannelAccount],
    ) -> Result<(), ActivityError> {
        self.set_property("membersRemoved", members)
    }

    pub fn topic_name(&self) -> Option<&str> {
        self.str_property("topicName")
    }

    pub fn history_disclosed(&self) -> Option<bool> {
        self.raw_property("historyDisclosed")
            .and_then(serde_json::Value::as_bool)
    }

    /// True when the update carries a non-empty `membersAdded` list.
    pub fn has_members_added(&self) -> bool {
        self.raw_property("membersAdded")
            .and_then(serde_json::Value::as_array)
            .is_some_and(|members| !members.is_empty())
    }

    pub fn has_members_removed(&self) -> bool {
        self.raw_property("membersRemoved")
            .and_then(serde_json::Value::as_array)
            .is_some_and(|members| !members.is_empty())
    }
}

activity_view!(
    /// `installationUpdate` activity, sent when the app is added to or removed from a scope.
    InstallationUpdateActivity => ActivityKind::InstallationUpdate
);

impl InstallationUpdateActivity {
    pub fn action(&self) -> Option<&str> {
        self.str_property("action")
    }

    pub fn set_action(&mut self, action: impl Into<String>) {
        self.set_str_property("action", action);
    }

    /// `add` and `add-upgrade` both count as an installation.
    pub fn is_add(&self) -> bool {
        matches!(self.action(), Some("add") | Some("add-upgrade"))
    }

    pub fn is_remove(&self) -> bool {
        matches!(self.action(), Some("remove") | Some("remove-upgrade"))
    }
}

activity_view!(
    /// `endOfConversation` activity.
    EndOfConversationActivity => ActivityKind::EndOfConversation
);

impl EndOfConversationActivity {
    pub fn code(&self) -> Option<&str> {
        self.str_property("code")
    }

    pub fn set_code(&mut self, code: impl Into<String>) {
        self.set_str_property("code", code);
    }

    pub fn text(&self) -> Option<&str> {
        self.str_property("text")
    }
}
