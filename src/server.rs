use crate::application::App;
use crate::error::Error;
use crate::handler::{Request, Response};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::StatusCode;
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

pub(crate) struct Server;

impl Server {
    /// Accepts connections until `shutdown` resolves, one task per connection.
    pub async fn serve(
        listener: TcpListener,
        app: Arc<App>,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), Error> {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(err) => {
                            log::warn!("accept failed: {err}");
                            continue;
                        }
                    };

                    let app = Arc::clone(&app);
                    let service = service_fn(move |req| {
                        let app = Arc::clone(&app);
                        async move { Ok::<_, Infallible>(handle(&app, req).await) }
                    });

                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);
                        let conn = http1::Builder::new().serve_connection(io, service);
                        if let Err(err) = conn.await {
                            log::error!("Connection error from {peer}: {err}");
                        }
                    });
                }
                _ = &mut shutdown => {
                    break;
                }
            }
        }

        Ok(())
    }
}

/// Buffers the body and runs the request through the application.
async fn handle(app: &App, req: hyper::Request<Incoming>) -> hyper::Response<Full<Bytes>> {
    let limit = app.config().max_body_bytes;
    let (parts, body) = req.into_parts();

    let body = match Limited::new(body, limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            let err = if err.downcast_ref::<LengthLimitError>().is_some() {
                Error::PayloadTooLarge { limit }
            } else {
                Error::status(StatusCode::BAD_REQUEST, "400 Bad Request")
            };
            log::warn!("{} {} rejected: {err}", parts.method, parts.uri);

            let mut res = Response::new();
            res.status(err.status_code()).send(err.public_message());
            return res.into_hyper();
        }
    };

    app.dispatch(Request::from_parts(parts, body))
        .await
        .into_hyper()
}

pub(crate) async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => log::info!("🛑 Received Ctrl+C, shutting down server..."),
        Err(err) => {
            log::error!("failed to listen for ctrl_c: {err}");
            std::future::pending::<()>().await
        }
    }
}
