use crate::context::Context;
use crate::error::Error;
use crate::handler::{HandlerResult, Middleware, Next};
use async_trait::async_trait;
use futures_util::FutureExt;
use hyper::StatusCode;
use log::{error, warn};
use std::any::Any;
use std::panic::AssertUnwindSafe;

/// Middleware that isolates failures of everything registered after it.
///
/// Panics and errors raised downstream are logged and turned into a response,
/// so one bad request never takes the server down. Register it first.
#[derive(Debug, Clone, Default)]
pub struct Recovery {
    /// Write the failure message into the 500 body instead of the generic text.
    pub expose_errors: bool,
}

impl Recovery {
    pub fn new(expose_errors: bool) -> Self {
        Self { expose_errors }
    }
}

#[async_trait]
impl Middleware for Recovery {
    async fn handle(&self, ctx: &mut Context, next: Next<'_>) -> HandlerResult {
        let outcome = AssertUnwindSafe(next.run(ctx)).catch_unwind().await;

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                let method = ctx.request().method().clone();
                let uri = ctx.request().uri().clone();
                let internal = err.status_code().is_server_error();
                if internal {
                    error!("{method} {uri} failed: {err}");
                } else {
                    warn!("{method} {uri} rejected: {err}");
                }

                ctx.fail(&err);
                if internal && self.expose_errors {
                    ctx.response_mut().send(err.to_string());
                }
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(
                    "PANIC while handling {} {}: {message}",
                    ctx.request().method(),
                    ctx.request().uri()
                );

                ctx.response_mut().reset();
                let body = if self.expose_errors {
                    format!("500 Internal Server Error\n\n{message}")
                } else {
                    "500 Internal Server Error".to_owned()
                };
                ctx.error(body, StatusCode::INTERNAL_SERVER_ERROR);
            }
        }

        Ok(())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}
