use crate::builtin::{Logger, Recovery};
use crate::config::Config;
use crate::context::Context;
use crate::error::Error;
use crate::handler::{
    BoxFuture, BoxedMiddleware, Chain, Handler, HandlerResult, Middleware, Next, Request, Response,
    Wrap, handler_fn, middleware_fn,
};
use crate::render::{FileRenderer, Renderer};
use crate::router::{Route, Router, RouterAdapter};
use crate::server::{Server, shutdown_signal};
use futures_util::FutureExt;
use log::{error, info};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::TcpListener;

static NEXT_ID: AtomicUsize = AtomicUsize::new(1);

/// Identity of an application node, used for the non-owning parent link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AppId(usize);

impl AppId {
    fn next() -> Self {
        AppId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// An application node: a middleware chain in front of a router.
///
/// Middleware runs in the order it was added. Once the node has started, the
/// router is the final step of the chain and resolves each request to a
/// route handler or to a mounted child application. Children are created
/// with [`App::sub_route`] and own their own middleware.
///
/// Setup (`use_*`, routes, mounts) happens through `&mut self` before
/// serving; dispatch only needs `&self`.
pub struct App {
    id: AppId,
    parent: Option<AppId>,
    children: Vec<App>,
    handlers: Vec<BoxedMiddleware>,
    chain: Chain,
    router: Router,
    renderer: Arc<dyn Renderer>,
    config: Config,
    started: bool,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    /// An application with no middleware.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let renderer = FileRenderer::new(config.views_dir.clone(), config.view_extension.clone());
        Self {
            id: AppId::next(),
            parent: None,
            children: Vec::new(),
            handlers: Vec::new(),
            chain: Chain::default(),
            router: Router::new(),
            renderer: Arc::new(renderer),
            config,
            started: false,
        }
    }

    pub fn with_middleware(handlers: impl IntoIterator<Item = BoxedMiddleware>) -> Self {
        let mut app = Self::new();
        app.handlers.extend(handlers);
        app.chain = Chain::build(&app.handlers);
        app
    }

    /// An application with [`Recovery`] and [`Logger`] already in the chain.
    pub fn classic() -> Self {
        Self::classic_with(Config::default())
    }

    pub fn classic_with(config: Config) -> Self {
        let recovery = Recovery::new(config.expose_errors);
        let mut app = Self::with_config(config);
        app.use_with(recovery).use_with(Logger);
        app
    }

    pub fn id(&self) -> AppId {
        self.id
    }

    pub fn parent(&self) -> Option<AppId> {
        self.parent
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn children(&self) -> &[App] {
        &self.children
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut Router {
        &mut self.router
    }

    pub fn renderer(&self) -> &Arc<dyn Renderer> {
        &self.renderer
    }

    pub fn set_renderer(&mut self, renderer: impl Renderer + 'static) -> &mut Self {
        self.renderer = Arc::new(renderer);
        self
    }

    /// Middleware in registration order.
    pub fn handlers(&self) -> &[BoxedMiddleware] {
        &self.handlers
    }

    /// Appends a middleware and recompiles the chain.
    pub fn use_with(&mut self, middleware: impl Middleware + 'static) -> &mut Self {
        self.use_boxed(Arc::new(middleware))
    }

    pub fn use_boxed(&mut self, middleware: BoxedMiddleware) -> &mut Self {
        self.handlers.push(middleware);
        self.chain = Chain::build(&self.handlers);
        self
    }

    pub fn use_fn<F>(&mut self, f: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Context, Next<'a>) -> BoxFuture<'a, HandlerResult>
            + Send
            + Sync
            + 'static,
    {
        self.use_with(middleware_fn(f))
    }

    /// Appends a plain handler; the rest of the chain runs after it.
    pub fn use_handler(&mut self, handler: impl Handler + 'static) -> &mut Self {
        self.use_with(Wrap(handler))
    }

    pub fn use_handler_fn<F>(&mut self, f: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
    {
        self.use_handler(handler_fn(f))
    }

    pub fn handle(&mut self, path: &str, handler: impl Handler + 'static) -> &mut Route {
        self.router.handle(path, handler)
    }

    pub fn handle_func<F>(&mut self, path: &str, f: F) -> &mut Route
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
    {
        self.router.handle(path, handler_fn(f))
    }

    /// Serves the files below `dir` under `prefix`.
    pub fn file_server(&mut self, prefix: &str, dir: &str) -> &mut Route {
        self.router.file_server(prefix, dir)
    }

    pub fn not_found(&mut self, handler: impl Handler + 'static) -> &mut Self {
        self.router.not_found(handler);
        self
    }

    /// Mounts a new child application at `prefix` and returns it.
    ///
    /// Requests under the prefix run this node's middleware, then the
    /// child's, then the child's router. The child's routes are declared
    /// relative to the prefix.
    pub fn sub_route(&mut self, prefix: &str) -> &mut App {
        let index = self.children.len();
        let prefix = self.router.mount(prefix, index);

        let mut child = App::with_config(self.config.clone());
        child.parent = Some(self.id);
        child.router = Router::with_prefix(&prefix);
        child.renderer = Arc::clone(&self.renderer);
        child.started = self.started;

        self.children.push(child);
        &mut self.children[index]
    }

    /// Appends the router step to this node's chain and to every child's.
    pub fn start(&mut self) {
        for child in &mut self.children {
            child.start();
        }
        self.started = true;
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Runs this node's chain against an existing context.
    ///
    /// While it runs, the context reports this node as its app and renders
    /// views with this node's engine. Both are restored afterwards, also when
    /// the chain panics.
    pub fn serve_context<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            let outer_app = ctx.replace_app(Some(self.id));
            let outer_renderer = ctx.replace_renderer(Arc::clone(&self.renderer));

            let router = RouterAdapter::new(&self.router, &self.children);
            let run = if self.started {
                self.chain.serve_with(ctx, &router)
            } else {
                self.chain.serve(ctx)
            };
            let outcome = AssertUnwindSafe(run).catch_unwind().await;

            ctx.replace_renderer(outer_renderer);
            ctx.replace_app(outer_app);
            outcome.unwrap_or_else(|payload| panic::resume_unwind(payload))
        })
    }

    /// Handles one request with a fresh context.
    ///
    /// Errors that escape the chain are logged and answered here.
    pub async fn dispatch(&self, request: Request) -> Response {
        let mut ctx = Context::new(request, Arc::clone(&self.renderer));
        if let Err(err) = self.serve_context(&mut ctx).await {
            error!(
                "{} {} failed: {err}",
                ctx.request().method(),
                ctx.request().uri()
            );
            ctx.fail(&err);
        }
        ctx.into_response()
    }

    /// Serves on `addr` until Ctrl-C. Any setup failure is fatal.
    pub async fn run(self, addr: &str) {
        if let Err(err) = self.listen(addr).await {
            error!("{err}");
            std::process::exit(1);
        }
    }

    /// Like [`App::run`], returning setup failures instead of exiting.
    pub async fn listen(self, addr: &str) -> Result<(), Error> {
        self.check_routes()?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| Error::Bind {
                addr: addr.to_owned(),
                source,
            })?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serves connections from `listener` until `shutdown` resolves.
    pub async fn serve(
        mut self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), Error> {
        self.check_routes()?;
        self.start();

        if let Ok(addr) = listener.local_addr() {
            info!("listening on {addr}");
        }
        Server::serve(listener, Arc::new(self), shutdown).await
    }

    fn check_routes(&self) -> Result<(), Error> {
        self.router.check()?;
        self.children.iter().try_for_each(App::check_routes)
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("id", &self.id)
            .field("parent", &self.parent)
            .field("prefix", &self.router.prefix())
            .field("middleware", &self.handlers.len())
            .field("children", &self.children)
            .field("started", &self.started)
            .finish()
    }
}

macro_rules! generate_methods {
    (
        methods: [$($method:ident),* $(,)?]
    ) => {
        impl App {
            $(
                pub fn $method<F>(&mut self, path: &str, f: F) -> &mut Route
                where
                    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult>
                        + Send
                        + Sync
                        + 'static,
                {
                    self.handle_func(path, f).$method()
                }
            )*
        }
    };
}

generate_methods! {
    methods: [get, post, put, delete, patch]
}
