use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::activity::{Activity, ActivityKind};
use crate::error::ActivityError;
use crate::views::*;

type ActivityFactory = Arc<dyn Fn(Activity) -> Result<TypedActivity, ActivityError> + Send + Sync>;

/// Maps `type` discriminators to constructors of typed activity views.
///
/// Registration happens during start-up; afterwards the registry is only read, so it can be
/// shared behind an `Arc` by any number of concurrent turns.
///
/// ```
/// use gsm_activity::{Activity, ActivityKind, ActivityTypeRegistry};
/// use serde_json::json;
///
/// let registry = ActivityTypeRegistry::with_defaults();
/// let typed = registry
///     .resolve(Activity::from_value(json!({ "type": "message", "text": "hi" })).unwrap())
///     .unwrap();
/// assert_eq!(typed.kind(), ActivityKind::Message);
/// assert_eq!(typed.as_message().and_then(|m| m.text()), Some("hi"));
/// ```
#[derive(Clone, Default)]
pub struct ActivityTypeRegistry {
    factories: HashMap<String, ActivityFactory>,
}

impl ActivityTypeRegistry {
    /// Creates an empty registry; every activity resolves to the generic envelope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with a typed view for every [`ActivityKind::KNOWN`] discriminator.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for kind in ActivityKind::KNOWN {
            registry.register(kind.as_str(), move |activity| Ok(builtin_view(kind, activity)));
        }
        registry
    }

    /// Associates `discriminator` with `factory`. The last registration for a discriminator wins.
    pub fn register<F>(&mut self, discriminator: impl Into<String>, factory: F)
    where
        F: Fn(Activity) -> Result<TypedActivity, ActivityError> + Send + Sync + 'static,
    {
        let discriminator = discriminator.into();
        if self
            .factories
            .insert(discriminator.clone(), Arc::new(factory))
            .is_some()
        {
            tracing::debug!(discriminator = %discriminator, "replaced activity factory");
        }
    }

    /// Resolves `activity` to its most specific registered view.
    ///
    /// Absent, empty, or unregistered discriminators yield [`TypedActivity::Generic`] with the
    /// envelope untouched. Errors only come from a registered factory.
    pub fn resolve(&self, activity: Activity) -> Result<TypedActivity, ActivityError> {
        let factory = activity
            .discriminator()
            .and_then(|discriminator| self.factories.get(discriminator))
            .cloned();
        match factory {
            Some(factory) => factory(activity),
            None => Ok(TypedActivity::Generic(activity)),
        }
    }

    pub fn is_registered(&self, discriminator: &str) -> bool {
        self.factories.contains_key(discriminator)
    }

    /// Registered discriminators, sorted.
    pub fn discriminators(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for ActivityTypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivityTypeRegistry")
            .field("discriminators", &self.discriminators())
            .finish()
    }
}

fn builtin_view(kind: ActivityKind, activity: Activity) -> TypedActivity {
    match kind {
        ActivityKind::Message => TypedActivity::Message(MessageActivity::from_activity(activity)),
        ActivityKind::ConversationUpdate => {
            TypedActivity::ConversationUpdate(ConversationUpdateActivity::from_activity(activity))
        }
        ActivityKind::MessageReaction => {
            TypedActivity::MessageReaction(MessageReactionActivity::from_activity(activity))
        }
        ActivityKind::MessageDelete => {
            TypedActivity::MessageDelete(MessageDeleteActivity::from_activity(activity))
        }
        ActivityKind::MessageUpdate => {
            TypedActivity::MessageUpdate(MessageUpdateActivity::from_activity(activity))
        }
        ActivityKind::InstallationUpdate => {
            TypedActivity::InstallationUpdate(InstallationUpdateActivity::from_activity(activity))
        }
        ActivityKind::Invoke => TypedActivity::Invoke(InvokeActivity::from_activity(activity)),
        ActivityKind::EndOfConversation => {
            TypedActivity::EndOfConversation(EndOfConversationActivity::from_activity(activity))
        }
        ActivityKind::Event => TypedActivity::Event(EventActivity::from_activity(activity)),
        ActivityKind::Typing => TypedActivity::Typing(TypingActivity::from_activity(activity)),
        ActivityKind::Unknown => TypedActivity::Generic(activity),
    }
}
