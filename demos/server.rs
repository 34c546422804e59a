//! Demo server: wires config, pool, templates, and a few routes.
//!
//! Run with `cargo run --example server` against a local MySQL; see
//! `Configs` for the environment overrides.

use blogkit::models;
use blogkit::orm::{Find, Limit};
use blogkit::{
    AppError, AppState, Bound, Configs, Dal, Record, Reply, RouteSpec, Templates, WebApp,
};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

async fn index(state: AppState, _args: Bound) -> Result<Reply, AppError> {
    let blogs: Vec<_> = models::blogs()
        .find_all(
            &state.dal,
            Find::default()
                .order_by("`created_at` DESC")
                .limit(Limit::Count(10)),
        )
        .await?
        .into_iter()
        .map(Record::into_value)
        .collect();
    Ok(Reply::template("blogs.html", json!({ "blogs": blogs })))
}

async fn api_users(state: AppState, _args: Bound) -> Result<Reply, AppError> {
    let users: Vec<_> = models::users()
        .find_all(&state.dal, Find::default().order_by("`created_at` DESC"))
        .await?
        .into_iter()
        .map(Record::into_value)
        .collect();
    Ok(Reply::Data(json!({ "users": users })))
}

async fn api_get_blog(state: AppState, args: Bound) -> Result<Reply, AppError> {
    let id = args.arg("id").cloned().unwrap_or_default();
    match models::blogs().find_by_id(&state.dal, id).await? {
        Some(blog) => Ok(Reply::Data(blog.into_value())),
        None => Ok(Reply::StatusReason(404, "blog not found".into())),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("blogkit=info".parse()?))
        .init();

    let configs = Configs::from_env();
    let dal = Dal::connect(&configs.db).await?;
    let templates = Arc::new(Templates::from_dir("templates"));
    let state = AppState { dal, templates };

    let app = WebApp::new(state)
        .route(RouteSpec::get("/"), index)?
        .route(RouteSpec::get("/api/users"), api_users)?
        .route(RouteSpec::get("/api/blogs/:id").required("id"), api_get_blog)?
        .into_router();

    let listener = TcpListener::bind((configs.server.host.as_str(), configs.server.port)).await?;
    tracing::info!("server started at http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
