use crate::context::Context;
use crate::error::Error;
use crate::handler::HandlerResult;
use async_trait::async_trait;
use hyper::header::HeaderValue;
use serde_json::Value;
use std::path::PathBuf;

/// Rendering engine used by [`Context::render_view`].
///
/// Implementations write directly to the response held by the context.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, ctx: &mut Context, view: &str, model: &Value) -> HandlerResult;
}

/// Loads `<dir>/<view>.<extension>` and fills `{{ key }}` placeholders
/// from the top level of the model.
#[derive(Debug, Clone)]
pub struct FileRenderer {
    dir: PathBuf,
    extension: String,
}

impl FileRenderer {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
        }
    }

    fn path_of(&self, view: &str) -> Option<PathBuf> {
        if view.split(['/', '\\']).any(|part| part == "..") {
            return None;
        }
        Some(self.dir.join(format!("{view}.{}", self.extension)))
    }
}

impl Default for FileRenderer {
    fn default() -> Self {
        Self::new("./views", "html")
    }
}

#[async_trait]
impl Renderer for FileRenderer {
    async fn render(&self, ctx: &mut Context, view: &str, model: &Value) -> HandlerResult {
        let failed = |message: String| Error::View {
            view: view.to_owned(),
            message,
        };

        let path = self
            .path_of(view)
            .ok_or_else(|| failed("view name escapes the views directory".into()))?;
        let template = tokio::fs::read_to_string(&path)
            .await
            .map_err(|err| failed(format!("{}: {err}", path.display())))?;

        ctx.response_mut()
            .r#type(HeaderValue::from_static("text/html; charset=utf-8"))
            .send(fill(&template, model));
        Ok(())
    }
}

fn fill(template: &str, model: &Value) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        let Some(len) = rest[start + 2..].find("}}") else {
            break;
        };
        out.push_str(&rest[..start]);

        let key = rest[start + 2..start + 2 + len].trim();
        match model.get(key) {
            Some(Value::String(s)) => escape_into(&mut out, s),
            Some(Value::Null) | None => {}
            Some(other) => escape_into(&mut out, &other.to_string()),
        }
        rest = &rest[start + 2 + len + 2..];
    }

    out.push_str(rest);
    out
}

fn escape_into(out: &mut String, raw: &str) {
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::get;
    use hyper::StatusCode;
    use serde_json::json;
    use std::sync::Arc;

    fn views() -> FileRenderer {
        FileRenderer::new(concat!(env!("CARGO_MANIFEST_DIR"), "/views"), "html")
    }

    #[test]
    fn fill_substitutes_and_escapes() {
        let model = json!({ "name": "<b>ada</b>", "visits": 3, "gone": null });
        assert_eq!(
            fill("hi {{ name }} ({{visits}}){{gone}}{{missing}}!", &model),
            "hi &lt;b&gt;ada&lt;/b&gt; (3)!"
        );
    }

    #[test]
    fn fill_leaves_unterminated_tags() {
        assert_eq!(fill("a {{ b", &json!({})), "a {{ b");
    }

    #[tokio::test]
    async fn renders_a_view_from_disk() {
        let mut ctx = get("/");
        ctx.replace_renderer(Arc::new(views()));
        ctx.render_view("hello", &json!({ "name": "world" }))
            .await
            .unwrap();

        let res = ctx.response();
        assert_eq!(res.status_code(), StatusCode::OK);
        let body = std::str::from_utf8(res.body()).unwrap();
        assert!(body.contains("Hello, world!"));
    }

    #[tokio::test]
    async fn missing_and_escaping_views_fail() {
        let mut ctx = get("/");
        ctx.replace_renderer(Arc::new(views()));

        let err = ctx.render_view("nope", &json!({})).await.unwrap_err();
        assert!(matches!(err, Error::View { .. }));

        let err = ctx.render_view("../Cargo", &json!({})).await.unwrap_err();
        assert!(matches!(err, Error::View { .. }));
    }
}
