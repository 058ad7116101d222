use hyper::header::{self, HeaderValue};
use serde::Deserialize;
use serde_json::json;
use webapp::{App, Config, Context, HandlerResult};

#[derive(Deserialize)]
struct Greeting {
    name: String,
}

async fn home(ctx: &mut Context) -> HandlerResult {
    ctx.view_string("Welcome! Try /hello/you, /api/status or POST /api/greet.");
    Ok(())
}

async fn hello(ctx: &mut Context) -> HandlerResult {
    let name = ctx.params().get("name").unwrap_or("stranger").to_owned();
    ctx.render_view("hello", &json!({ "name": name })).await
}

async fn status(ctx: &mut Context) -> HandlerResult {
    ctx.render_json(&json!({ "status": "ok" }))
}

async fn greet(ctx: &mut Context) -> HandlerResult {
    let greeting: Greeting = ctx.bind_json()?;
    ctx.render_json(&json!({ "message": format!("Hello, {}!", greeting.name) }))
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let mut app = App::classic_with(Config::from_env());
    app.get("/", |ctx| Box::pin(home(ctx)));
    app.get("/hello/{name}", |ctx| Box::pin(hello(ctx)));
    app.get("/old-home", |ctx| {
        Box::pin(async move {
            ctx.redirect("/");
            Ok(())
        })
    });
    app.file_server("/static", "./public");

    let api = app.sub_route("/api");
    api.use_fn(|ctx, next| {
        Box::pin(async move {
            ctx.response_mut()
                .set(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
            next.run(ctx).await
        })
    });
    api.get("/status", |ctx| Box::pin(status(ctx)));
    api.post("/greet", |ctx| Box::pin(greet(ctx)));

    app.run("0.0.0.0:8080").await;
}
