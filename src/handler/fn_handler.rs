use super::{BoxFuture, Handler, HandlerResult};
use crate::context::Context;
use async_trait::async_trait;

/// Handler backed by a closure returning a boxed future.
#[derive(Clone)]
pub struct HandlerFn<F> {
    f: F,
}

/// Turns `|ctx| Box::pin(async move { .. })` into a [`Handler`].
pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync,
{
    HandlerFn { f }
}

#[async_trait]
impl<F> Handler for HandlerFn<F>
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync,
{
    async fn serve(&self, ctx: &mut Context) -> HandlerResult {
        (self.f)(ctx).await
    }
}
