use super::{BoxFuture, BoxedMiddleware, Handler, HandlerResult, Next};
use crate::context::Context;
use std::fmt;
use std::sync::Arc;

/// A compiled, immutable middleware chain.
///
/// Built once from an ordered handler list and re-derived whenever that list
/// changes. Cloning is cheap, so a request keeps whichever snapshot it
/// started with.
#[derive(Clone, Default)]
pub struct Chain {
    links: Arc<[BoxedMiddleware]>,
}

impl Chain {
    pub fn build(handlers: &[BoxedMiddleware]) -> Self {
        Self {
            links: handlers.iter().cloned().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Runs every link in registration order. The final continuation is a
    /// no-op, so an empty chain does nothing.
    pub fn serve<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
        Next::new(&self.links, None).run(ctx)
    }

    /// Like [`Chain::serve`], with `endpoint` invoked by the last link's `next`.
    pub fn serve_with<'a>(
        &'a self,
        ctx: &'a mut Context,
        endpoint: &'a dyn Handler,
    ) -> BoxFuture<'a, HandlerResult> {
        Next::new(&self.links, Some(endpoint)).run(ctx)
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{Middleware, Noop, Wrap, handler_fn, middleware_fn};
    use crate::test_util::{get, trace, traced};
    use async_trait::async_trait;

    struct Step(&'static str);

    #[async_trait]
    impl Middleware for Step {
        async fn handle(&self, ctx: &mut Context, next: Next<'_>) -> HandlerResult {
            traced(ctx, format!("{} in", self.0));
            next.run(ctx).await?;
            traced(ctx, format!("{} out", self.0));
            Ok(())
        }
    }

    struct Stop(&'static str);

    #[async_trait]
    impl Middleware for Stop {
        async fn handle(&self, ctx: &mut Context, _next: Next<'_>) -> HandlerResult {
            traced(ctx, format!("{} stop", self.0));
            Ok(())
        }
    }

    fn chain(steps: Vec<BoxedMiddleware>) -> Chain {
        Chain::build(&steps)
    }

    fn step(name: &'static str) -> BoxedMiddleware {
        Arc::new(Step(name))
    }

    fn boxed(middleware: impl Middleware + 'static) -> BoxedMiddleware {
        Arc::new(middleware)
    }

    #[tokio::test]
    async fn onion_order() {
        let chain = chain(vec![step("a"), step("b"), step("c")]);
        let mut ctx = get("/");
        chain.serve(&mut ctx).await.unwrap();

        assert_eq!(trace(&ctx), ["a in", "b in", "c in", "c out", "b out", "a out"]);
    }

    #[tokio::test]
    async fn short_circuit_skips_the_rest_but_unwinds_the_prefix() {
        let chain = chain(vec![step("a"), step("b"), boxed(Stop("c")), step("d")]);
        let mut ctx = get("/");
        chain.serve(&mut ctx).await.unwrap();

        assert_eq!(trace(&ctx), ["a in", "b in", "c stop", "b out", "a out"]);
    }

    #[tokio::test]
    async fn empty_chain_is_a_no_op() {
        let chain = Chain::default();
        let mut ctx = get("/");
        chain.serve(&mut ctx).await.unwrap();

        assert!(chain.is_empty());
        assert!(trace(&ctx).is_empty());
        assert!(ctx.response().body().is_empty());
    }

    #[tokio::test]
    async fn next_past_the_end_has_no_effect() {
        let chain = chain(vec![step("only")]);
        let mut ctx = get("/");
        chain.serve(&mut ctx).await.unwrap();

        assert_eq!(trace(&ctx), ["only in", "only out"]);
    }

    #[tokio::test]
    async fn next_can_be_replayed() {
        let twice = middleware_fn(|ctx, next| {
            Box::pin(async move {
                let first = next.run(ctx).await;
                if first.is_err() {
                    return first;
                }
                next.run(ctx).await
            })
        });
        let chain = chain(vec![boxed(twice), step("inner")]);
        let mut ctx = get("/");
        chain.serve(&mut ctx).await.unwrap();

        assert_eq!(trace(&ctx), ["inner in", "inner out", "inner in", "inner out"]);
    }

    #[tokio::test]
    async fn endpoint_runs_after_the_last_link() {
        let endpoint = handler_fn(|ctx| {
            Box::pin(async move {
                traced(ctx, "endpoint");
                Ok(())
            })
        });
        let chain = chain(vec![step("a"), step("b")]);
        let mut ctx = get("/");
        chain.serve_with(&mut ctx, &endpoint).await.unwrap();

        assert_eq!(trace(&ctx), ["a in", "b in", "endpoint", "b out", "a out"]);
    }

    #[tokio::test]
    async fn wrapped_handler_always_continues() {
        let log = Wrap(handler_fn(|ctx| {
            Box::pin(async move {
                traced(ctx, "plain");
                Ok(())
            })
        }));
        let chain = chain(vec![boxed(log), step("b")]);
        let mut ctx = get("/");
        chain.serve(&mut ctx).await.unwrap();

        assert_eq!(trace(&ctx), ["plain", "b in", "b out"]);
    }

    #[tokio::test]
    async fn noop_terminates() {
        let chain = chain(vec![boxed(Noop), step("never")]);
        let mut ctx = get("/");
        chain.serve(&mut ctx).await.unwrap();

        assert!(trace(&ctx).is_empty());
    }

    #[tokio::test]
    async fn errors_skip_post_next_work() {
        let fail = middleware_fn(|_ctx, _next| {
            Box::pin(async move {
                Err::<(), _>(crate::Error::status(hyper::StatusCode::FORBIDDEN, "denied"))
            })
        });
        let chain = chain(vec![step("a"), boxed(fail)]);
        let mut ctx = get("/");
        let err = chain.serve(&mut ctx).await.unwrap_err();

        assert_eq!(err.status_code(), hyper::StatusCode::FORBIDDEN);
        assert_eq!(trace(&ctx), ["a in"]);
    }
}
