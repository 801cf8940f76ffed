use std::fmt;
use std::sync::Arc;

use gsm_activity::{ActivityKind, TypedActivity};

use crate::handler::RouteHandler;

/// Route family whose sub-kinds are mutually exclusive.
pub const INVOKE_FAMILY: &str = "invoke";

type Selector = Arc<dyn Fn(&TypedActivity) -> bool + Send + Sync>;

/// Family segment of a route name: everything before the first `/`.
///
/// ```
/// assert_eq!(gsm_router::route_family("invoke/adaptiveCard/action"), "invoke");
/// assert_eq!(gsm_router::route_family("message"), "message");
/// ```
pub fn route_family(name: &str) -> &str {
    name.split_once('/').map_or(name, |(family, _)| family)
}

/// A name without a `/` qualifier handles the whole family.
pub fn is_catch_all(name: &str) -> bool {
    !name.contains('/')
}

/// Which side of a reaction change a route listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionChange {
    Added,
    Removed,
}

impl ReactionChange {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionChange::Added => "reactionsAdded",
            ReactionChange::Removed => "reactionsRemoved",
        }
    }
}

/// Installation action a route listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallAction {
    Add,
    Remove,
}

impl InstallAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstallAction::Add => "add",
            InstallAction::Remove => "remove",
        }
    }
}

/// A registered handler: name, target kind, selector, and handler.
pub struct Route<C> {
    name: String,
    kind: ActivityKind,
    selector: Selector,
    handler: Arc<dyn RouteHandler<C>>,
}

impl<C> Route<C> {
    pub fn new<S, H>(name: impl Into<String>, kind: ActivityKind, selector: S, handler: H) -> Self
    where
        S: Fn(&TypedActivity) -> bool + Send + Sync + 'static,
        H: RouteHandler<C> + 'static,
    {
        Self {
            name: name.into(),
            kind,
            selector: Arc::new(selector),
            handler: Arc::new(handler),
        }
    }

    /// Catch-all route for a whole activity family, named after its discriminator.
    pub fn activity<H>(kind: ActivityKind, handler: H) -> Self
    where
        H: RouteHandler<C> + 'static,
    {
        Self::new(kind.as_str(), kind, |_| true, handler)
    }

    /// Message route selected by a predicate over the message text, named `message/<label>`.
    pub fn message_text<P, H>(label: &str, predicate: P, handler: H) -> Self
    where
        P: Fn(&str) -> bool + Send + Sync + 'static,
        H: RouteHandler<C> + 'static,
    {
        Self::new(
            format!("{}/{label}", ActivityKind::Message.as_str()),
            ActivityKind::Message,
            move |activity| {
                activity
                    .as_message()
                    .and_then(|message| message.text())
                    .is_some_and(|text| predicate(text))
            },
            handler,
        )
    }

    /// `conversationUpdate/<event>` route.
    ///
    /// `membersAdded` and `membersRemoved` select on the member lists; any other event is matched
    /// against `channelData.eventType`.
    pub fn conversation_update<H>(event: &str, handler: H) -> Self
    where
        H: RouteHandler<C> + 'static,
    {
        let event_name = event.to_string();
        Self::new(
            format!("{}/{event}", ActivityKind::ConversationUpdate.as_str()),
            ActivityKind::ConversationUpdate,
            move |activity| {
                let Some(update) = activity.as_conversation_update() else {
                    return false;
                };
                match event_name.as_str() {
                    "membersAdded" => update.has_members_added(),
                    "membersRemoved" => update.has_members_removed(),
                    other => update.channel_event_type() == Some(other),
                }
            },
            handler,
        )
    }

    /// `messageReaction/reactionsAdded` or `messageReaction/reactionsRemoved`.
    pub fn message_reaction<H>(change: ReactionChange, handler: H) -> Self
    where
        H: RouteHandler<C> + 'static,
    {
        Self::new(
            format!(
                "{}/{}",
                ActivityKind::MessageReaction.as_str(),
                change.as_str()
            ),
            ActivityKind::MessageReaction,
            move |activity| {
                activity
                    .as_message_reaction()
                    .is_some_and(|reaction| match change {
                        ReactionChange::Added => reaction.has_reactions_added(),
                        ReactionChange::Removed => reaction.has_reactions_removed(),
                    })
            },
            handler,
        )
    }

    /// `installationUpdate/add` or `installationUpdate/remove`.
    pub fn installation_update<H>(action: InstallAction, handler: H) -> Self
    where
        H: RouteHandler<C> + 'static,
    {
        Self::new(
            format!(
                "{}/{}",
                ActivityKind::InstallationUpdate.as_str(),
                action.as_str()
            ),
            ActivityKind::InstallationUpdate,
            move |activity| {
                activity
                    .as_installation_update()
                    .is_some_and(|update| match action {
                        InstallAction::Add => update.is_add(),
                        InstallAction::Remove => update.is_remove(),
                    })
            },
            handler,
        )
    }

    /// `invoke/<name>` route, selected by the invoke activity's `name`.
    pub fn invoke<H>(name: &str, handler: H) -> Self
    where
        H: RouteHandler<C> + 'static,
    {
        let invoke_name = name.to_string();
        Self::new(
            format!("{INVOKE_FAMILY}/{name}"),
            ActivityKind::Invoke,
            move |activity| {
                activity
                    .as_invoke()
                    .and_then(|invoke| invoke.name())
                    .is_some_and(|name| name == invoke_name)
            },
            handler,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ActivityKind {
        self.kind
    }

    pub fn family(&self) -> &str {
        route_family(&self.name)
    }

    pub fn is_catch_all(&self) -> bool {
        is_catch_all(&self.name)
    }

    /// True when the resolved kind matches and the selector accepts the activity.
    pub fn matches(&self, activity: &TypedActivity) -> bool {
        self.kind == activity.kind() && (self.selector)(activity)
    }

    pub(crate) fn handler(&self) -> &Arc<dyn RouteHandler<C>> {
        &self.handler
    }

    pub fn info(&self) -> RouteInfo {
        RouteInfo {
            name: self.name.clone(),
            kind: self.kind,
        }
    }
}

impl<C> Clone for Route<C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            kind: self.kind,
            selector: Arc::clone(&self.selector),
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<C> fmt::Debug for Route<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Owned description of a route, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    pub name: String,
    pub kind: ActivityKind,
}
