use crate::application::AppId;
use crate::error::Error;
use crate::handler::{HandlerResult, Request, Response, RouteParams};
use crate::render::Renderer;
use crate::session::{Session, UserManager};
use hyper::{
    Method, StatusCode,
    header::{self, HeaderValue},
};
use log::warn;
use rustc_hash::FxHashMap;
use serde::{Serialize, de::DeserializeOwned};
use std::any::Any;
use std::path::Path;
use std::sync::Arc;

type Register = FxHashMap<String, Box<dyn Any + Send + Sync>>;

/// Per-request state threaded through the whole chain.
///
/// One instance is created for every inbound request and dropped once the
/// response has been written. It is never shared between requests.
pub struct Context {
    request: Request,
    response: Response,
    params: RouteParams,
    register: Option<Register>,
    app: Option<AppId>,
    renderer: Arc<dyn Renderer>,
    pub session_id: Option<String>,
    pub session: Option<Box<dyn Session>>,
    pub user: Option<Arc<dyn UserManager>>,
}

impl Context {
    pub fn new(request: Request, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            request,
            response: Response::new(),
            params: RouteParams::default(),
            register: None,
            app: None,
            renderer,
            session_id: None,
            session: None,
            user: None,
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }

    /// Both transport handles at once.
    pub fn http(&mut self) -> (&mut Response, &Request) {
        (&mut self.response, &self.request)
    }

    pub fn into_response(self) -> Response {
        self.response
    }

    /// Route parameters extracted by the router.
    pub fn params(&self) -> &RouteParams {
        &self.params
    }

    pub(crate) fn params_mut(&mut self) -> &mut RouteParams {
        &mut self.params
    }

    /// The application node whose chain is running, `None` outside any app.
    pub fn app(&self) -> Option<AppId> {
        self.app
    }

    pub(crate) fn replace_app(&mut self, app: Option<AppId>) -> Option<AppId> {
        std::mem::replace(&mut self.app, app)
    }

    pub fn renderer(&self) -> &Arc<dyn Renderer> {
        &self.renderer
    }

    pub(crate) fn replace_renderer(&mut self, renderer: Arc<dyn Renderer>) -> Arc<dyn Renderer> {
        std::mem::replace(&mut self.renderer, renderer)
    }

    /// Reads a request-scoped value.
    ///
    /// `None` when the key was never set or holds a value of another type.
    /// A key explicitly set to `None::<T>` yields `Some(&None)`.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.register.as_ref()?.get(key)?.downcast_ref()
    }

    pub fn get_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.register.as_mut()?.get_mut(key)?.downcast_mut()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.register
            .as_ref()
            .is_some_and(|register| register.contains_key(key))
    }

    /// Stores a request-scoped value, replacing any previous one.
    pub fn set<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.register
            .get_or_insert_with(Register::default)
            .insert(key.into(), Box::new(value));
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.register
            .as_mut()
            .is_some_and(|register| register.remove(key).is_some())
    }

    /// Keys written on this request so far.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.register
            .iter()
            .flat_map(|register| register.keys().map(String::as_str))
    }

    /// Writes a status and a plain message. Callers stop after this.
    pub fn error(&mut self, message: impl AsRef<str>, status: StatusCode) {
        self.response.status(status).send(message.as_ref());
    }

    /// Answers with the status and public message of `err`.
    pub fn fail(&mut self, err: &Error) {
        self.response.reset();
        self.error(err.public_message(), err.status_code());
    }

    pub fn view_string(&mut self, body: impl AsRef<str>) {
        self.response.status(StatusCode::OK).send(body.as_ref());
    }

    /// Renders `view` with the engine of the application handling the request.
    pub async fn render_view<T>(&mut self, view: &str, model: &T) -> HandlerResult
    where
        T: Serialize + Sync + ?Sized,
    {
        let model = serde_json::to_value(model)?;
        self.response.status(StatusCode::OK);
        let renderer = Arc::clone(&self.renderer);
        renderer.render(self, view, &model).await
    }

    pub fn render_json<T: Serialize + ?Sized>(&mut self, model: &T) -> HandlerResult {
        let body = serde_json::to_vec(model)?;
        self.response
            .status(StatusCode::OK)
            .r#type(HeaderValue::from_static("application/json"))
            .send(body);
        Ok(())
    }

    /// Streams a file from disk. A missing file answers 404.
    pub async fn serve_file(&mut self, path: impl AsRef<Path>) -> HandlerResult {
        let path = path.as_ref();
        let data = match tokio::fs::read(path).await {
            Ok(data) => data,
            Err(err)
                if matches!(
                    err.kind(),
                    std::io::ErrorKind::NotFound | std::io::ErrorKind::IsADirectory
                ) =>
            {
                self.error("404 page not found", StatusCode::NOT_FOUND);
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        let mime = mime_guess::from_path(path).first_or_octet_stream();
        if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
            self.response.r#type(value);
        }

        if let Ok(modified) = tokio::fs::metadata(path).await.and_then(|m| m.modified()) {
            if let Ok(value) = HeaderValue::from_str(&httpdate::fmt_http_date(modified)) {
                self.response.set(header::LAST_MODIFIED, value);
            }
        }

        self.response.status(StatusCode::OK);
        if self.request.method() == Method::HEAD {
            self.response.end();
        } else {
            self.response.send(data);
        }
        Ok(())
    }

    /// 303 See Other to `path`.
    pub fn redirect(&mut self, path: &str) {
        self.response.reset();
        match HeaderValue::from_str(path) {
            Ok(location) => {
                self.response
                    .status(StatusCode::SEE_OTHER)
                    .set(header::LOCATION, location)
                    .end();
            }
            Err(_) => {
                warn!("refusing to redirect to invalid location {path:?}");
                self.error("invalid redirect location", StatusCode::INTERNAL_SERVER_ERROR);
            }
        }
    }

    /// Decodes an urlencoded request body into `T`.
    pub fn bind_form<T: DeserializeOwned>(&self) -> Result<T, Error> {
        let content_type = self.content_type();
        if !content_type.starts_with("application/x-www-form-urlencoded") {
            return Err(Error::UnsupportedContentType(content_type.to_owned()));
        }
        serde_urlencoded::from_bytes(self.request.body()).map_err(Error::BindForm)
    }

    /// Decodes a JSON request body into `T`.
    pub fn bind_json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        serde_json::from_slice(self.request.body()).map_err(Error::BindJson)
    }

    /// Query string pairs followed by urlencoded body pairs.
    pub fn form(&self) -> Vec<(String, String)> {
        let query = self.request.uri().query().unwrap_or_default();
        form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .chain(self.post_form())
            .collect()
    }

    /// Urlencoded body pairs of a POST, PUT or PATCH request.
    pub fn post_form(&self) -> Vec<(String, String)> {
        let has_body = matches!(
            *self.request.method(),
            Method::POST | Method::PUT | Method::PATCH
        );
        if !has_body
            || !self
                .content_type()
                .starts_with("application/x-www-form-urlencoded")
        {
            return Vec::new();
        }
        form_urlencoded::parse(self.request.body())
            .into_owned()
            .collect()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.as_ref().is_some_and(|user| user.authenticated())
    }

    fn content_type(&self) -> &str {
        self.request
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
    }
}
