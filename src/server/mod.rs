//! HTTP 接口层，所有路由挂在 `/api` 下

use anyhow::{Context, Result};
use axum::Router;
use axum::http::Method;
use axum::http::header::CONTENT_TYPE;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::app::AppServices;
use crate::store::spawn_sweeper;

pub mod error;
pub mod handlers;
pub mod protocol;

/// 构建完整的路由
pub fn router(services: AppServices) -> Router {
    let api = Router::new()
        .route("/generate_report", post(handlers::generate_report))
        .route("/progress/:key", get(handlers::progress))
        .route("/report/view/:key", get(handlers::view_report))
        .route("/report/:key", get(handlers::report))
        .route("/report/update", post(handlers::update_report))
        .route("/report/rewrite", post(handlers::rewrite))
        .route("/chat/init", post(handlers::chat_init))
        .route("/chat/message", post(handlers::chat_message))
        .route("/health", get(handlers::health));

    let mut app = Router::new().nest("/api", api);

    if services.config.server.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([CONTENT_TYPE]);
        app = app.layer(cors);
    }

    app.layer(TraceLayer::new_for_http()).with_state(services)
}

/// 启动 HTTP 服务，直到进程退出
pub async fn serve(services: AppServices) -> Result<()> {
    let bind = services.config.server.bind.clone();
    let sweeper = spawn_sweeper(services.store.clone(), &services.config.store);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    tracing::info!(address = %bind, "服务已启动");

    let result = axum::serve(listener, router(services))
        .await
        .context("HTTP server stopped unexpectedly");

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    result
}
