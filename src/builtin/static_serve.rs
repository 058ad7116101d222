use crate::context::Context;
use crate::handler::{Handler, HandlerResult};
use async_trait::async_trait;
use hyper::StatusCode;
use log::warn;
use std::path::{Component, Path, PathBuf};

/// Serves files below a directory for routes carrying a `{*filepath}` parameter.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Joins `relative` below the root, refusing anything that could climb out of it.
    fn locate(&self, relative: &str) -> Option<PathBuf> {
        let relative = Path::new(relative.trim_start_matches('/'));
        let safe = relative.components().next().is_some()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        safe.then(|| self.root.join(relative))
    }
}

#[async_trait]
impl Handler for StaticFiles {
    async fn serve(&self, ctx: &mut Context) -> HandlerResult {
        let requested = ctx.params().get("filepath").unwrap_or_default();

        match self.locate(requested) {
            Some(path) => ctx.serve_file(path).await,
            None => {
                warn!("rejected static path {requested:?}");
                ctx.error("404 page not found", StatusCode::NOT_FOUND);
                Ok(())
            }
        }
    }
}
