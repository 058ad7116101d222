use super::{BoxFuture, BoxedMiddleware, Handler, HandlerResult};
use crate::context::Context;

/// Continuation handed to every middleware.
///
/// `Next` is a cursor into the remainder of a compiled chain plus the
/// optional terminal endpoint (the router step once an application has
/// started). It is `Copy`, so a middleware may call it zero times
/// (short-circuit), once, or several times (replay).
#[derive(Clone, Copy)]
pub struct Next<'a> {
    rest: &'a [BoxedMiddleware],
    endpoint: Option<&'a dyn Handler>,
}

impl<'a> Next<'a> {
    pub(crate) fn new(rest: &'a [BoxedMiddleware], endpoint: Option<&'a dyn Handler>) -> Self {
        Self { rest, endpoint }
    }

    /// Runs the remainder of the chain against `ctx`.
    ///
    /// Past the last middleware and with no endpoint this is a no-op.
    pub fn run<'c>(self, ctx: &'c mut Context) -> BoxFuture<'c, HandlerResult>
    where
        'a: 'c,
    {
        match self.rest.split_first() {
            Some((head, rest)) => head.handle(
                ctx,
                Next {
                    rest,
                    endpoint: self.endpoint,
                },
            ),
            None => match self.endpoint {
                Some(endpoint) => endpoint.serve(ctx),
                None => Box::pin(async { Ok(()) }),
            },
        }
    }

    /// Number of middleware still ahead of this cursor, endpoint excluded.
    pub fn remaining(&self) -> usize {
        self.rest.len()
    }

    pub fn has_endpoint(&self) -> bool {
        self.endpoint.is_some()
    }
}
