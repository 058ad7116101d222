use crate::context::Context;
use crate::handler::{HandlerResult, Middleware, Next};
use async_trait::async_trait;
use log::info;
use std::time::Instant;

/// Middleware that logs each request on the way in and its outcome on the way out.
///
/// Example log output:
/// ```text
/// Started GET /api/items
/// Completed 200 OK in 1.2ms
/// ```
#[derive(Debug, Clone, Default)]
pub struct Logger;

#[async_trait]
impl Middleware for Logger {
    async fn handle(&self, ctx: &mut Context, next: Next<'_>) -> HandlerResult {
        let start = Instant::now();
        info!(
            "Started {} {}",
            ctx.request().method(),
            ctx.request().uri().path()
        );

        let result = next.run(ctx).await;

        // A failed step has not written its response yet.
        let status = match &result {
            Ok(()) => ctx.response().status_code(),
            Err(err) => err.status_code(),
        };
        info!(
            "Completed {} {} in {:?}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown"),
            start.elapsed()
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{BoxedMiddleware, Chain, middleware_fn};
    use crate::builtin::Recovery;
    use crate::test_util::get;
    use hyper::StatusCode;
    use std::sync::{Arc, Mutex, Once};

    fn boxed(middleware: impl Middleware + 'static) -> BoxedMiddleware {
        Arc::new(middleware)
    }

    #[tokio::test]
    async fn passes_outcomes_through() {
        let teapot = middleware_fn(|ctx, _next| {
            Box::pin(async move {
                ctx.error("short and stout", StatusCode::IM_A_TEAPOT);
                Ok(())
            })
        });
        let chain = Chain::build(&[boxed(Logger), boxed(teapot)]);

        let mut ctx = get("/pot");
        chain.serve(&mut ctx).await.unwrap();
        assert_eq!(ctx.response().status_code(), StatusCode::IM_A_TEAPOT);

        let failing = middleware_fn(|_ctx, _next| {
            Box::pin(async move {
                Err::<(), _>(crate::Error::status(StatusCode::CONFLICT, "taken"))
            })
        });
        let chain = Chain::build(&[boxed(Logger), boxed(failing)]);
        let mut ctx = get("/pot");
        assert!(chain.serve(&mut ctx).await.is_err());
    }

    struct Capture;

    static LINES: Mutex<Vec<String>> = Mutex::new(Vec::new());
    static INSTALL: Once = Once::new();

    impl log::Log for Capture {
        fn enabled(&self, _: &log::Metadata<'_>) -> bool {
            true
        }

        fn log(&self, record: &log::Record<'_>) {
            if let Ok(mut lines) = LINES.lock() {
                lines.push(record.args().to_string());
            }
        }

        fn flush(&self) {}
    }

    fn capture_logs() {
        INSTALL.call_once(|| {
            log::set_logger(&Capture).unwrap();
            log::set_max_level(log::LevelFilter::Info);
        });
    }

    #[tokio::test]
    async fn failed_requests_log_the_error_status() {
        capture_logs();

        let locked = middleware_fn(|_ctx, _next| {
            Box::pin(async move {
                Err::<(), _>(crate::Error::status(StatusCode::LOCKED, "held elsewhere"))
            })
        });
        let chain = Chain::build(&[boxed(Recovery::default()), boxed(Logger), boxed(locked)]);
        let mut ctx = get("/locked");
        chain.serve(&mut ctx).await.unwrap();
        assert_eq!(ctx.response().status_code(), StatusCode::LOCKED);

        let lines = LINES.lock().unwrap();
        assert!(lines.iter().any(|line| line == "Started GET /locked"));
        assert!(
            lines
                .iter()
                .any(|line| line.starts_with("Completed 423 Locked in ")),
            "{lines:?}"
        );
    }
}
