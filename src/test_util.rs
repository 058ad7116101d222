use crate::context::Context;
use crate::render::FileRenderer;
use bytes::Bytes;
use hyper::{Method, header};
use std::sync::Arc;

pub fn request(method: Method, uri: &str, content_type: &str, body: &str) -> Context {
    let request = hyper::Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, content_type)
        .body(Bytes::from(body.to_owned()))
        .unwrap();
    Context::new(request, Arc::new(FileRenderer::default()))
}

pub fn get(uri: &str) -> Context {
    let request = hyper::Request::builder()
        .uri(uri)
        .body(Bytes::new())
        .unwrap();
    Context::new(request, Arc::new(FileRenderer::default()))
}

/// Appends `step` to the `"trace"` entry of the register.
pub fn traced(ctx: &mut Context, step: impl Into<String>) {
    match ctx.get_mut::<Vec<String>>("trace") {
        Some(trace) => trace.push(step.into()),
        None => ctx.set("trace", vec![step.into()]),
    }
}

pub fn trace(ctx: &Context) -> Vec<String> {
    ctx.get::<Vec<String>>("trace").cloned().unwrap_or_default()
}
