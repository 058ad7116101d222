//! Composable middleware chains and mountable sub-applications on top of
//! hyper.
//!
//! An [`App`] runs its middleware in registration order, then hands the
//! request to its router. Sub-applications mounted with [`App::sub_route`]
//! run their own middleware after their parent's.

pub mod application;
pub mod builtin;
pub mod config;
pub mod context;
pub mod error;
pub mod handler;
pub mod render;
pub mod router;
mod server;
pub mod session;

#[cfg(test)]
mod test_util;

pub use application::{App, AppId};
pub use config::Config;
pub use context::Context;
pub use error::Error;
pub use handler::{
    BoxFuture, Handler, HandlerResult, Middleware, Next, Request, Response, handler_fn,
    middleware_fn,
};

/// An application with an empty middleware list.
pub fn app() -> App {
    App::default()
}

/// An application that recovers from failures and logs every request.
pub fn classic() -> App {
    App::classic()
}
