use log::warn;
use std::path::PathBuf;
use std::str::FromStr;

/// Application settings.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory the default renderer loads views from.
    pub views_dir: PathBuf,
    /// File extension of view templates, without the dot.
    pub view_extension: String,
    /// Larger request bodies are answered with 413 before the chain runs.
    pub max_body_bytes: usize,
    /// Whether `classic()` applications show failure messages to clients.
    pub expose_errors: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            views_dir: PathBuf::from("./views"),
            view_extension: "html".to_string(),
            max_body_bytes: 10 * 1024 * 1024, // 10 MB
            expose_errors: false,
        }
    }
}

impl Config {
    /// Defaults overlaid with `WEBAPP_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(dir) = lookup("WEBAPP_VIEWS_DIR") {
            config.views_dir = PathBuf::from(dir);
        }
        if let Some(ext) = lookup("WEBAPP_VIEW_EXTENSION") {
            config.view_extension = ext.trim_start_matches('.').to_string();
        }
        if let Some(limit) = parsed(&lookup, "WEBAPP_MAX_BODY_BYTES") {
            config.max_body_bytes = limit;
        }
        if let Some(expose) = parsed(&lookup, "WEBAPP_EXPOSE_ERRORS") {
            config.expose_errors = expose;
        }

        config
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("ignoring {key}={raw:?}: not a valid value");
            None
        }
    }
}
