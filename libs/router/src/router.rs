use std::fmt;

use gsm_activity::TypedActivity;
use tracing::{debug, info};

use crate::error::{ConfigurationError, DispatchError};
use crate::handler::RoutedTurn;
use crate::route::{INVOKE_FAMILY, Route, RouteInfo};

/// What happened to a dispatched turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Handled { route: String },
    Unhandled,
}

impl DispatchOutcome {
    pub fn is_handled(&self) -> bool {
        matches!(self, DispatchOutcome::Handled { .. })
    }
}

/// Ordered route table.
///
/// Routes are added during start-up through `&mut self`; once the router is moved behind an
/// `Arc` it can only be read, which is what makes concurrent dispatch safe.
pub struct Router<C> {
    routes: Vec<Route<C>>,
}

impl<C> Default for Router<C> {
    fn default() -> Self {
        Self { routes: Vec::new() }
    }
}

impl<C> Router<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `route` to the end of the table.
    ///
    /// Rejected without modifying the table when the name is empty, already taken, or breaks the
    /// `invoke` exclusion: a catch-all `invoke` route cannot live next to any `invoke/<name>`
    /// route, in either registration order.
    pub fn register(&mut self, route: Route<C>) -> Result<&mut Self, ConfigurationError> {
        let name = route.name();
        if name.is_empty() {
            return Err(ConfigurationError::EmptyName);
        }
        if self.routes.iter().any(|existing| existing.name() == name) {
            return Err(ConfigurationError::DuplicateRoute {
                name: name.to_string(),
            });
        }
        if route.family() == INVOKE_FAMILY {
            if route.is_catch_all() {
                if let Some(existing) = self
                    .routes
                    .iter()
                    .find(|existing| existing.family() == INVOKE_FAMILY)
                {
                    return Err(ConfigurationError::InvokeCatchAllConflict {
                        name: name.to_string(),
                        existing: existing.name().to_string(),
                    });
                }
            } else if self.routes.iter().any(|existing| existing.name() == INVOKE_FAMILY) {
                return Err(ConfigurationError::InvokeSpecificConflict {
                    name: name.to_string(),
                });
            }
        }

        info!(route = %name, kind = %route.kind(), "route registered");
        self.routes.push(route);
        Ok(self)
    }

    /// Registered routes in insertion order.
    pub fn routes(&self) -> &[Route<C>] {
        &self.routes
    }

    /// Owned copy of the route listing.
    pub fn snapshot(&self) -> Vec<RouteInfo> {
        self.routes.iter().map(Route::info).collect()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// First route, in registration order, that accepts the turn's activity.
    pub fn find(&self, ctx: &C) -> Option<&Route<C>>
    where
        C: RoutedTurn,
    {
        let activity = ctx.activity();
        self.routes.iter().find(|route| route.matches(activity))
    }

    /// Runs the first matching route's handler.
    pub async fn dispatch(&self, ctx: &mut C) -> Result<DispatchOutcome, DispatchError>
    where
        C: RoutedTurn,
    {
        let Some(route) = self.find(ctx) else {
            let activity = ctx.activity();
            debug!(
                activity_type = activity.activity().discriminator().unwrap_or(""),
                "no route matched"
            );
            metrics::counter!(
                "activities_unhandled_total",
                "activity_type" => unhandled_label(activity)
            )
            .increment(1);
            return Ok(DispatchOutcome::Unhandled);
        };

        let name = route.name().to_string();
        metrics::counter!("routes_dispatched_total", "route" => name.clone()).increment(1);
        debug!(route = %name, "dispatching turn");
        match route.handler().handle(ctx).await {
            Ok(()) => Ok(DispatchOutcome::Handled { route: name }),
            Err(source) => Err(DispatchError {
                route: name,
                source,
            }),
        }
    }
}

/// Counter label for an unmatched activity. Bounded to the known kinds; any other discriminator
/// is reported as `unknown`.
fn unhandled_label(activity: &TypedActivity) -> &'static str {
    activity.kind().as_str()
}

impl<C> fmt::Debug for Router<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler_fn;
    use gsm_activity::ActivityKind;

    struct Noop;

    fn noop() -> impl crate::RouteHandler<Noop> {
        handler_fn(|_: &mut Noop| Box::pin(async { Ok(()) }))
    }

    #[test]
    fn unhandled_label_ignores_caller_supplied_types() {
        let registry = gsm_activity::ActivityTypeRegistry::with_defaults();
        let custom = gsm_activity::Activity::from_value(serde_json::json!({ "type": "x-1f3a9c" }))
            .unwrap();
        let custom = registry.resolve(custom).unwrap();
        assert_eq!(unhandled_label(&custom), ActivityKind::Unknown.as_str());

        let reaction = registry
            .resolve(gsm_activity::Activity::of_kind(ActivityKind::MessageReaction))
            .unwrap();
        assert_eq!(unhandled_label(&reaction), "messageReaction");
    }

    #[test]
    fn empty_name_is_rejected() {
        let mut router = Router::<Noop>::new();
        let err = router
            .register(Route::new("", ActivityKind::Message, |_| true, noop()))
            .unwrap_err();
        assert_eq!(err, ConfigurationError::EmptyName);
        assert!(router.is_empty());
    }

    #[test]
    fn invoke_prefix_is_case_sensitive() {
        let mut router = Router::<Noop>::new();
        router
            .register(Route::invoke("adaptiveCard/action", noop()))
            .unwrap();
        // "Invoke" is a different family, so it does not collide with the specific route.
        router
            .register(Route::new("Invoke", ActivityKind::Invoke, |_| true, noop()))
            .unwrap();
        assert_eq!(router.len(), 2);
    }

    #[test]
    fn failed_registration_leaves_table_intact() {
        let mut router = Router::<Noop>::new();
        router
            .register(Route::activity(ActivityKind::Invoke, noop()))
            .unwrap();
        let err = router
            .register(Route::invoke("task/fetch", noop()))
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvokeSpecificConflict { .. }));
        assert_eq!(router.snapshot().len(), 1);
        assert_eq!(router.routes()[0].name(), "invoke");
    }
}
