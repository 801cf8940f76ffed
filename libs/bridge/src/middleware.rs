use std::sync::Arc;

use async_trait::async_trait;
use gsm_router::Router;
use tracing::debug;

use crate::context::{LegacyTurnContext, TurnContext};
use crate::error::HandlerError;

/// Terminal handler of a turn pipeline.
#[async_trait]
pub trait TurnHandler: Send + Sync {
    async fn on_turn(&self, ctx: &mut TurnContext) -> Result<(), HandlerError>;
}

#[async_trait]
impl<T> TurnHandler for Arc<T>
where
    T: TurnHandler + ?Sized,
{
    async fn on_turn(&self, ctx: &mut TurnContext) -> Result<(), HandlerError> {
        self.as_ref().on_turn(ctx).await
    }
}

/// Middleware in the canonical pipeline.
///
/// Returning without calling `next.run` ends the turn there; nothing downstream runs.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn on_turn(&self, ctx: &mut TurnContext, next: Next<'_>) -> Result<(), HandlerError>;
}

/// Continuation into the rest of the pipeline. Consumed by `run`, so it runs at most once.
pub struct Next<'a> {
    chain: &'a [Arc<dyn Middleware>],
    endpoint: &'a dyn TurnHandler,
}

impl<'a> Next<'a> {
    pub fn new(chain: &'a [Arc<dyn Middleware>], endpoint: &'a dyn TurnHandler) -> Self {
        Self { chain, endpoint }
    }

    pub async fn run(self, ctx: &mut TurnContext) -> Result<(), HandlerError> {
        ctx.ensure_resolved_type()?;
        match self.chain.split_first() {
            Some((head, rest)) => {
                head.on_turn(
                    ctx,
                    Next {
                        chain: rest,
                        endpoint: self.endpoint,
                    },
                )
                .await
            }
            None => self.endpoint.on_turn(ctx).await,
        }
    }
}

/// Middleware written against the legacy turn context.
#[async_trait]
pub trait LegacyMiddleware: Send + Sync {
    async fn on_turn(
        &self,
        ctx: &mut LegacyTurnContext<'_>,
        next: LegacyNext<'_>,
    ) -> anyhow::Result<()>;
}

/// Legacy-facing continuation. Wraps the canonical [`Next`], so a legacy unit that never calls
/// `run` stops the canonical pipeline too.
pub struct LegacyNext<'a> {
    next: Next<'a>,
}

impl LegacyNext<'_> {
    pub async fn run(self, ctx: &mut LegacyTurnContext<'_>) -> anyhow::Result<()> {
        self.next.run(ctx.turn()).await.map_err(anyhow::Error::from)
    }
}

/// Splices a [`LegacyMiddleware`] into the canonical chain.
pub struct LegacyMiddlewareAdapter<M> {
    inner: M,
}

impl<M> LegacyMiddlewareAdapter<M> {
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<M> Middleware for LegacyMiddlewareAdapter<M>
where
    M: LegacyMiddleware,
{
    async fn on_turn(&self, ctx: &mut TurnContext, next: Next<'_>) -> Result<(), HandlerError> {
        let mut legacy = LegacyTurnContext::new(ctx);
        self.inner
            .on_turn(&mut legacy, LegacyNext { next })
            .await
            .map_err(HandlerError::from)
    }
}

/// Bot written against the legacy turn context.
#[async_trait]
pub trait LegacyBot: Send + Sync {
    async fn on_turn(&self, ctx: &mut LegacyTurnContext<'_>) -> anyhow::Result<()>;
}

/// Runs a [`LegacyBot`] as the terminal handler. Its failures carry the turn's activity.
pub struct LegacyBotAdapter<B> {
    bot: B,
}

impl<B> LegacyBotAdapter<B> {
    pub fn new(bot: B) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl<B> TurnHandler for LegacyBotAdapter<B>
where
    B: LegacyBot,
{
    async fn on_turn(&self, ctx: &mut TurnContext) -> Result<(), HandlerError> {
        let result = {
            let mut legacy = LegacyTurnContext::new(ctx);
            self.bot.on_turn(&mut legacy).await
        };
        result.map_err(|err| {
            HandlerError::from(err).or_activity(|| ctx.activity().activity().clone())
        })
    }
}

/// A router is a terminal handler; route failures carry the turn's activity.
#[async_trait]
impl TurnHandler for Router<TurnContext> {
    async fn on_turn(&self, ctx: &mut TurnContext) -> Result<(), HandlerError> {
        match self.dispatch(ctx).await {
            Ok(outcome) => {
                debug!(?outcome, "dispatch finished");
                Ok(())
            }
            Err(err) => {
                debug!(route = %err.route, "route handler failed");
                Err(HandlerError::from(err.into_source())
                    .or_activity(|| ctx.activity().activity().clone()))
            }
        }
    }
}
