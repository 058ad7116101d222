use bytes::BytesMut;
use http_body_util::Full;
use hyper::{
    HeaderMap, Response as HyperResponse, StatusCode,
    body::Bytes,
    header::{self, HeaderValue, IntoHeaderName},
};

/// Buffered response writer.
///
/// Status, headers and body accumulate here while the chain runs and are
/// turned into a hyper response once it completes.
#[derive(Debug, Clone, Default)]
pub struct Response {
    status: StatusCode,
    body: BytesMut,
    headers: HeaderMap,
    ended: bool,
}

impl Response {
    pub fn new() -> Self {
        Response {
            status: StatusCode::OK,
            body: BytesMut::with_capacity(512),
            headers: HeaderMap::with_capacity(8),
            ended: false,
        }
    }

    pub fn status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    pub fn status_text(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or("Unknown")
    }

    pub fn set<K: IntoHeaderName, V: Into<HeaderValue>>(&mut self, key: K, val: V) -> &mut Self {
        self.headers.insert(key, val.into());
        self
    }

    pub fn get<K: header::AsHeaderName>(&self, key: K) -> Option<&HeaderValue> {
        self.headers.get(key)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn write(&mut self, data: impl AsRef<[u8]>) -> &mut Self {
        self.body.extend_from_slice(data.as_ref());
        self
    }

    /// Replaces the body and ends the response.
    pub fn send(&mut self, data: impl AsRef<[u8]>) -> &mut Self {
        let data = data.as_ref();

        self.body.clear();
        self.body.reserve(data.len());
        self.body.extend_from_slice(data);

        if self.headers.get(header::CONTENT_TYPE).is_none() {
            // Best guess: plain text if it's utf8
            let guess = if std::str::from_utf8(data).is_ok() {
                HeaderValue::from_static("text/plain; charset=utf-8")
            } else {
                HeaderValue::from_static("application/octet-stream")
            };
            self.set(header::CONTENT_TYPE, guess);
        }

        self.end()
    }

    #[inline]
    pub fn end(&mut self) -> &mut Self {
        self.ended = true;
        self
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn r#type(&mut self, mime: impl Into<HeaderValue>) -> &mut Self {
        self.set(header::CONTENT_TYPE, mime)
    }

    /// Drops everything written so far.
    pub fn reset(&mut self) -> &mut Self {
        self.status = StatusCode::OK;
        self.body.clear();
        self.headers.clear();
        self.ended = false;
        self
    }

    pub fn into_hyper(self) -> HyperResponse<Full<Bytes>> {
        let mut response = HyperResponse::new(Full::new(self.body.freeze()));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

impl From<Response> for HyperResponse<Full<Bytes>> {
    fn from(resp: Response) -> Self {
        resp.into_hyper()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_guesses_a_content_type() {
        let mut res = Response::new();
        res.send("hello");
        assert!(res.is_ended());
        assert_eq!(
            res.get(header::CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );

        let mut res = Response::new();
        res.send([0xff, 0xfe]);
        assert_eq!(
            res.get(header::CONTENT_TYPE).unwrap(),
            "application/octet-stream"
        );
    }

    #[test]
    fn send_keeps_an_explicit_type() {
        let mut res = Response::new();
        res.r#type(HeaderValue::from_static("text/html")).send("<p>");
        assert_eq!(res.get(header::CONTENT_TYPE).unwrap(), "text/html");
        assert_eq!(res.body(), b"<p>");
    }

    #[test]
    fn into_hyper_carries_status_and_headers() {
        let mut res = Response::new();
        res.status(StatusCode::CREATED)
            .set(header::LOCATION, HeaderValue::from_static("/items/1"))
            .write("a")
            .write("b");

        let hyper = res.into_hyper();
        assert_eq!(hyper.status(), StatusCode::CREATED);
        assert_eq!(hyper.headers()[header::LOCATION], "/items/1");
    }

    #[test]
    fn reset_clears_everything() {
        let mut res = Response::new();
        res.status(StatusCode::ACCEPTED).send("partial");
        res.reset();
        assert_eq!(res.status_code(), StatusCode::OK);
        assert!(res.body().is_empty());
        assert!(!res.is_ended());
        assert!(res.headers().is_empty());
    }
}
