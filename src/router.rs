use crate::application::App;
use crate::context::Context;
use crate::error::Error;
use crate::handler::{BoxedHandler, Handler, HandlerResult};
use async_trait::async_trait;
use hyper::{Method, StatusCode};
use log::{debug, warn};
use matchit::Router as MatchitRouter;
use rustc_hash::FxHashMap;
use smallvec::{SmallVec, smallvec};
use std::sync::Arc;

mod route;

pub use route::Route;

/// Path-to-handler table of one application node.
///
/// Patterns use matchit syntax (`/users/{id}`, `/static/{*path}`). Several
/// routes may share a pattern and differ by method. Mounted sub-applications
/// live in the same table as `{prefix}` and `{prefix}/{*rest}`, so the most
/// specific pattern wins whether it belongs to a route or a mount.
#[derive(Default)]
pub struct Router {
    prefix: String,
    routes: Vec<Route>,
    slots: Vec<SmallVec<[usize; 2]>>,
    patterns: FxHashMap<String, usize>,
    matcher: MatchitRouter<Target>,
    mounts: Vec<Mount>,
    mount_errors: Vec<(String, String)>,
    not_found: Option<BoxedHandler>,
}

#[derive(Debug, Clone, Copy)]
enum Target {
    Routes(usize),
    Mount(usize),
}

struct Mount {
    prefix: String,
    child: usize,
}

impl Mount {
    fn matches(&self, path: &str) -> bool {
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

pub(crate) enum Resolution<'r> {
    Route {
        handler: &'r BoxedHandler,
        params: Vec<(String, String)>,
    },
    Mount(usize),
    MethodNotAllowed,
    NotFound,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// A router whose patterns are all registered under `prefix`.
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            prefix: normalize_prefix(prefix),
            ..Self::default()
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn handle(&mut self, path: &str, handler: impl Handler + 'static) -> &mut Route {
        self.handle_boxed(path, Arc::new(handler))
    }

    pub fn handle_boxed(&mut self, path: &str, handler: BoxedHandler) -> &mut Route {
        let full = self.full_path(path);
        let id = self.routes.len();
        let mut route = Route::new(full.clone(), handler);

        match self.patterns.get(&full) {
            Some(&slot) => self.slots[slot].push(id),
            None => {
                let slot = self.slots.len();
                match self.matcher.insert(full.clone(), Target::Routes(slot)) {
                    Ok(()) => {
                        self.patterns.insert(full, slot);
                        self.slots.push(smallvec![id]);
                    }
                    Err(err) => {
                        warn!("route `{full}` was not registered: {err}");
                        route.error = Some(err.to_string());
                    }
                }
            }
        }

        self.routes.push(route);
        &mut self.routes[id]
    }

    /// Serves files below `dir` for `GET {prefix}/{*filepath}`.
    pub fn file_server(&mut self, prefix: &str, dir: &str) -> &mut Route {
        let pattern = format!("{}/{{*filepath}}", prefix.trim_end_matches('/'));
        self.handle(&pattern, crate::builtin::StaticFiles::new(dir))
            .get()
    }

    pub fn not_found(&mut self, handler: impl Handler + 'static) {
        self.not_found = Some(Arc::new(handler));
    }

    /// Forwards everything under `prefix` to the `child`-th mounted application.
    /// Returns the absolute prefix the child registers its routes under.
    pub(crate) fn mount(&mut self, prefix: &str, child: usize) -> String {
        let prefix = format!("{}{}", self.prefix, normalize_prefix(prefix));
        let exact = if prefix.is_empty() {
            "/".to_owned()
        } else {
            prefix.clone()
        };
        let below = format!("{prefix}/{{*rest}}");

        for pattern in [exact, below] {
            if let Err(err) = self.matcher.insert(pattern.clone(), Target::Mount(child)) {
                warn!("mount `{pattern}` was not registered: {err}");
                self.mount_errors.push((pattern, err.to_string()));
            }
        }

        self.mounts.push(Mount {
            prefix: prefix.clone(),
            child,
        });
        prefix
    }

    /// First registration failure, if any.
    pub fn check(&self) -> Result<(), Error> {
        if let Some(route) = self.routes.iter().find(|route| route.error.is_some()) {
            return Err(Error::Route {
                path: route.path().to_owned(),
                message: route.error.clone().unwrap_or_default(),
            });
        }
        match self.mount_errors.first() {
            Some((path, message)) => Err(Error::Route {
                path: path.clone(),
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }

    pub(crate) fn resolve(&self, method: &Method, path: &str) -> Resolution<'_> {
        let matched = match self.matcher.at(path) {
            Ok(matched) => matched,
            // `{*rest}` never matches an empty tail such as `/api/`.
            Err(_) => {
                return self
                    .mounts
                    .iter()
                    .filter(|mount| mount.matches(path))
                    .max_by_key(|mount| mount.prefix.len())
                    .map_or(Resolution::NotFound, |mount| Resolution::Mount(mount.child));
            }
        };

        let slot = match *matched.value {
            Target::Mount(child) => return Resolution::Mount(child),
            Target::Routes(slot) => slot,
        };

        let found = self.slots[slot]
            .iter()
            .map(|&id| &self.routes[id])
            .find(|route| route.allows(method));

        match found {
            Some(route) => Resolution::Route {
                handler: &route.handler,
                params: matched
                    .params
                    .iter()
                    .map(|(k, v)| (k.to_owned(), v.to_owned()))
                    .collect(),
            },
            None => Resolution::MethodNotAllowed,
        }
    }

    /// Resolves the request held by `ctx` and invokes the leaf it resolves to.
    pub async fn serve_context(&self, ctx: &mut Context) -> HandlerResult {
        self.dispatch(ctx, &[]).await
    }

    pub(crate) async fn dispatch(&self, ctx: &mut Context, children: &[App]) -> HandlerResult {
        let method = ctx.request().method().clone();
        let path = ctx.request().uri().path().to_owned();

        match self.resolve(&method, &path) {
            Resolution::Route { handler, params } => {
                ctx.params_mut().extend(params);
                handler.serve(ctx).await
            }
            Resolution::Mount(index) => match children.get(index) {
                Some(child) => child.serve_context(ctx).await,
                None => self.fallback(ctx, &method, &path).await,
            },
            Resolution::MethodNotAllowed => {
                ctx.error("405 method not allowed", StatusCode::METHOD_NOT_ALLOWED);
                Ok(())
            }
            Resolution::NotFound => self.fallback(ctx, &method, &path).await,
        }
    }

    async fn fallback(&self, ctx: &mut Context, method: &Method, path: &str) -> HandlerResult {
        debug!("no route for {method} {path}");
        match &self.not_found {
            Some(handler) => handler.serve(ctx).await,
            None => {
                ctx.error("404 page not found", StatusCode::NOT_FOUND);
                Ok(())
            }
        }
    }

    fn full_path(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.prefix)
        } else {
            format!("{}/{path}", self.prefix)
        }
    }
}

#[async_trait]
impl Handler for Router {
    async fn serve(&self, ctx: &mut Context) -> HandlerResult {
        self.serve_context(ctx).await
    }
}

/// The router step appended to an application's chain once it starts:
/// adapts the router's resolution into a call carrying the live context,
/// with the node's children as mount targets.
pub(crate) struct RouterAdapter<'a> {
    router: &'a Router,
    children: &'a [App],
}

impl<'a> RouterAdapter<'a> {
    pub(crate) fn new(router: &'a Router, children: &'a [App]) -> Self {
        Self { router, children }
    }
}

#[async_trait]
impl Handler for RouterAdapter<'_> {
    async fn serve(&self, ctx: &mut Context) -> HandlerResult {
        self.router.dispatch(ctx, self.children).await
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_owned()
    } else {
        format!("/{trimmed}")
    }
}
