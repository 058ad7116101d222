use async_trait::async_trait;
use std::sync::Arc;

mod chain;
mod fn_handler;
pub mod middleware;
mod next;
pub mod request;
pub mod response;

use crate::context::Context;
use crate::error::Error;

pub use chain::Chain;
pub use fn_handler::{HandlerFn, handler_fn};
pub use futures_util::future::BoxFuture;
pub use middleware::{BoxedMiddleware, Middleware, MiddlewareFn, Noop, Wrap, middleware_fn};
pub use next::Next;
pub use request::{Request, RouteParams};
pub use response::Response;

/// Outcome of a single step. An `Err` stops the chain and travels back
/// towards the first middleware.
pub type HandlerResult = Result<(), Error>;

/// A unit of work over a [`Context`] with no continuation.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn serve(&self, ctx: &mut Context) -> HandlerResult;
}

pub type BoxedHandler = Arc<dyn Handler>;

#[async_trait]
impl<H: Handler + ?Sized> Handler for Arc<H> {
    async fn serve(&self, ctx: &mut Context) -> HandlerResult {
        (**self).serve(ctx).await
    }
}
