use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use gsm_activity::TypedActivity;

/// Turn context a router can dispatch into.
///
/// The router stays independent of any particular turn abstraction; it only needs to see the
/// resolved activity the turn was built from.
pub trait RoutedTurn: Send {
    fn activity(&self) -> &TypedActivity;
}

/// Handler invoked when its route matches.
#[async_trait]
pub trait RouteHandler<C>: Send + Sync {
    async fn handle(&self, ctx: &mut C) -> anyhow::Result<()>;
}

#[async_trait]
impl<C, H> RouteHandler<C> for Arc<H>
where
    C: Send,
    H: RouteHandler<C> + ?Sized,
{
    async fn handle(&self, ctx: &mut C) -> anyhow::Result<()> {
        self.as_ref().handle(ctx).await
    }
}

/// Handler backed by a closure returning a boxed future.
pub struct FnHandler<F> {
    f: F,
}

/// Wraps a closure as a [`RouteHandler`].
///
/// ```
/// use gsm_activity::TypedActivity;
/// use gsm_router::{handler_fn, RoutedTurn, RouteHandler};
///
/// struct Turn {
///     activity: TypedActivity,
///     seen: usize,
/// }
///
/// impl RoutedTurn for Turn {
///     fn activity(&self) -> &TypedActivity {
///         &self.activity
///     }
/// }
///
/// let handler = handler_fn(|turn: &mut Turn| {
///     Box::pin(async move {
///         turn.seen += 1;
///         Ok(())
///     })
/// });
/// # let _: &dyn RouteHandler<Turn> = &handler;
/// ```
pub fn handler_fn<C, F>(f: F) -> FnHandler<F>
where
    C: Send,
    F: for<'a> Fn(&'a mut C) -> BoxFuture<'a, anyhow::Result<()>> + Send + Sync,
{
    FnHandler { f }
}

#[async_trait]
impl<C, F> RouteHandler<C> for FnHandler<F>
where
    C: Send,
    F: for<'a> Fn(&'a mut C) -> BoxFuture<'a, anyhow::Result<()>> + Send + Sync,
{
    async fn handle(&self, ctx: &mut C) -> anyhow::Result<()> {
        (self.f)(ctx).await
    }
}
