use super::{BoxFuture, Handler, HandlerResult, Next};
use crate::context::Context;
use async_trait::async_trait;
use std::sync::Arc;

/// One step of a chain.
///
/// A middleware decides whether and when to call `next`. Work placed before
/// `next.run(ctx)` happens on the way in, work placed after it happens on the
/// way out, in reverse registration order. Not calling `next` short-circuits
/// everything registered after this step.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, ctx: &mut Context, next: Next<'_>) -> HandlerResult;
}

pub type BoxedMiddleware = Arc<dyn Middleware>;

#[async_trait]
impl<M: Middleware + ?Sized> Middleware for Arc<M> {
    async fn handle(&self, ctx: &mut Context, next: Next<'_>) -> HandlerResult {
        (**self).handle(ctx, next).await
    }
}

/// Middleware backed by a closure returning a boxed future.
#[derive(Clone)]
pub struct MiddlewareFn<F> {
    f: F,
}

/// Turns `|ctx, next| Box::pin(async move { .. })` into a [`Middleware`].
pub fn middleware_fn<F>(f: F) -> MiddlewareFn<F>
where
    F: for<'a> Fn(&'a mut Context, Next<'a>) -> BoxFuture<'a, HandlerResult> + Send + Sync,
{
    MiddlewareFn { f }
}

#[async_trait]
impl<F> Middleware for MiddlewareFn<F>
where
    F: for<'a> Fn(&'a mut Context, Next<'a>) -> BoxFuture<'a, HandlerResult> + Send + Sync,
{
    async fn handle(&self, ctx: &mut Context, next: Next<'_>) -> HandlerResult {
        (self.f)(ctx, next).await
    }
}

/// Lifts a plain [`Handler`] into the middleware shape: the handler runs,
/// then the rest of the chain runs unconditionally.
#[derive(Clone)]
pub struct Wrap<H>(pub H);

#[async_trait]
impl<H: Handler> Middleware for Wrap<H> {
    async fn handle(&self, ctx: &mut Context, next: Next<'_>) -> HandlerResult {
        self.0.serve(ctx).await?;
        next.run(ctx).await
    }
}

/// Does nothing and never continues. Safe to place anywhere as a terminator.
#[derive(Debug, Clone, Copy, Default)]
pub struct Noop;

#[async_trait]
impl Middleware for Noop {
    async fn handle(&self, _ctx: &mut Context, _next: Next<'_>) -> HandlerResult {
        Ok(())
    }
}
