//! Typed views over [`Activity`].
//!
//! Each view is a newtype around the envelope. Accessors decode from, and setters encode into,
//! the envelope's property bag, so there is never a second copy of any field to keep in sync.

use serde::{Serialize, Serializer};

use crate::activity::{Activity, ActivityKind};

macro_rules! activity_view {
    ($(#[$meta:meta])* $name:ident => $kind:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name(crate::activity::Activity);

        impl $name {
            pub const KIND: crate::activity::ActivityKind = $kind;

            /// Creates an empty activity of this kind.
            pub fn new() -> Self {
                Self(crate::activity::Activity::of_kind(Self::KIND))
            }

            /// Wraps an existing envelope without inspecting it.
            pub fn from_activity(activity: crate::activity::Activity) -> Self {
                Self(activity)
            }

            pub fn activity(&self) -> &crate::activity::Activity {
                &self.0
            }

            pub fn activity_mut(&mut self) -> &mut crate::activity::Activity {
                &mut self.0
            }

            pub fn into_activity(self) -> crate::activity::Activity {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::ops::Deref for $name {
            type Target = crate::activity::Activity;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl std::ops::DerefMut for $name {
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.0
            }
        }

        impl From<$name> for crate::activity::Activity {
            fn from(view: $name) -> Self {
                view.0
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                self.0.serialize(serializer)
            }
        }
    };
}

mod conversation;
mod invoke;
mod message;
mod reaction;

pub use conversation::*;
pub use invoke::*;
pub use message::*;
pub use reaction::*;

/// An activity resolved to its most specific known view.
///
/// ```
/// use gsm_activity::{Activity, ActivityKind, ActivityTypeRegistry, TypedActivity};
/// use serde_json::json;
///
/// let registry = ActivityTypeRegistry::with_defaults();
/// let activity = Activity::from_value(json!({ "type": "invoke", "name": "adaptiveCard/action" })).unwrap();
/// let typed = registry.resolve(activity).unwrap();
/// assert_eq!(typed.kind(), ActivityKind::Invoke);
/// if let TypedActivity::Invoke(invoke) = &typed {
///     assert_eq!(invoke.name(), Some("adaptiveCard/action"));
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum TypedActivity {
    Message(MessageActivity),
    ConversationUpdate(ConversationUpdateActivity),
    MessageReaction(MessageReactionActivity),
    MessageDelete(MessageDeleteActivity),
    MessageUpdate(MessageUpdateActivity),
    InstallationUpdate(InstallationUpdateActivity),
    Invoke(InvokeActivity),
    EndOfConversation(EndOfConversationActivity),
    Event(EventActivity),
    Typing(TypingActivity),
    Generic(Activity),
}

impl TypedActivity {
    /// The resolved runtime kind; routes match against this.
    pub fn kind(&self) -> ActivityKind {
        match self {
            TypedActivity::Message(_) => ActivityKind::Message,
            TypedActivity::ConversationUpdate(_) => ActivityKind::ConversationUpdate,
            TypedActivity::MessageReaction(_) => ActivityKind::MessageReaction,
            TypedActivity::MessageDelete(_) => ActivityKind::MessageDelete,
            TypedActivity::MessageUpdate(_) => ActivityKind::MessageUpdate,
            TypedActivity::InstallationUpdate(_) => ActivityKind::InstallationUpdate,
            TypedActivity::Invoke(_) => ActivityKind::Invoke,
            TypedActivity::EndOfConversation(_) => ActivityKind::EndOfConversation,
            TypedActivity::Event(_) => ActivityKind::Event,
            TypedActivity::Typing(_) => ActivityKind::Typing,
            TypedActivity::Generic(_) => ActivityKind::Unknown,
        }
    }

    pub fn activity(&self) -> &Activity {
        match self {
            TypedActivity::Message(v) => v.activity(),
            TypedActivity::ConversationUpdate(v) => v.activity(),
            TypedActivity::MessageReaction(v) => v.activity(),
            TypedActivity::MessageDelete(v) => v.activity(),
            TypedActivity::MessageUpdate(v) => v.activity(),
            TypedActivity::InstallationUpdate(v) => v.activity(),
            TypedActivity::Invoke(v) => v.activity(),
            TypedActivity::EndOfConversation(v) => v.activity(),
            TypedActivity::Event(v) => v.activity(),
            TypedActivity::Typing(v) => v.activity(),
            TypedActivity::Generic(activity) => activity,
        }
    }

    pub fn activity_mut(&mut self) -> &mut Activity {
        match self {
            TypedActivity::Message(v) => v.activity_mut(),
            TypedActivity::ConversationUpdate(v) => v.activity_mut(),
            TypedActivity::MessageReaction(v) => v.activity_mut(),
            TypedActivity::MessageDelete(v) => v.activity_mut(),
            TypedActivity::MessageUpdate(v) => v.activity_mut(),
            TypedActivity::InstallationUpdate(v) => v.activity_mut(),
            TypedActivity::Invoke(v) => v.activity_mut(),
            TypedActivity::EndOfConversation(v) => v.activity_mut(),
            TypedActivity::Event(v) => v.activity_mut(),
            TypedActivity::Typing(v) => v.activity_mut(),
            TypedActivity::Generic(activity) => activity,
        }
    }

    pub fn into_activity(self) -> Activity {
        match self {
            TypedActivity::Message(v) => v.into_activity(),
            TypedActivity::ConversationUpdate(v) => v.into_activity(),
            TypedActivity::MessageReaction(v) => v.into_activity(),
            TypedActivity::MessageDelete(v) => v.into_activity(),
            TypedActivity::MessageUpdate(v) => v.into_activity(),
            TypedActivity::InstallationUpdate(v) => v.into_activity(),
            TypedActivity::Invoke(v) => v.into_activity(),
            TypedActivity::EndOfConversation(v) => v.into_activity(),
            TypedActivity::Event(v) => v.into_activity(),
            TypedActivity::Typing(v) => v.into_activity(),
            TypedActivity::Generic(activity) => activity,
        }
    }

    pub fn as_message(&self) -> Option<&MessageActivity> {
        match self {
            TypedActivity::Message(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_conversation_update(&self) -> Option<&ConversationUpdateActivity> {
        match self {
            TypedActivity::ConversationUpdate(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_message_reaction(&self) -> Option<&MessageReactionActivity> {
        match self {
            TypedActivity::MessageReaction(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_installation_update(&self) -> Option<&InstallationUpdateActivity> {
        match self {
            TypedActivity::InstallationUpdate(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_invoke(&self) -> Option<&InvokeActivity> {
        match self {
            TypedActivity::Invoke(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_event(&self) -> Option<&EventActivity> {
        match self {
            TypedActivity::Event(v) => Some(v),
            _ => None,
        }
    }
}

impl AsRef<Activity> for TypedActivity {
    fn as_ref(&self) -> &Activity {
        self.activity()
    }
}

impl From<TypedActivity> for Activity {
    fn from(typed: TypedActivity) -> Self {
        typed.into_activity()
    }
}

impl Serialize for TypedActivity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.activity().serialize(serializer)
    }
}
