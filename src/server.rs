//! HTTPサーバーモード
//!
//! `GET /report` のクエリパラメータで設定を上書きしてレポートを作成し、CSVで返す。
//! キャッシュはサーバープロセスの間ずっと全リクエストで共有する。

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::cache::ResponseCache;
use crate::client::{Auth, JiraClient, JiraConfig};
use crate::config::ReportConfig;
use crate::error::{Error, Result};
use crate::report::TimespentReport;

pub const SERVER_HOST_ENV: &str = "SERVER_HOST";
pub const SERVER_PORT_ENV: &str = "SERVER_PORT";
pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 8080;

const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

/// ハンドラー間で共有する状態
#[derive(Clone)]
pub struct AppState {
    /// クエリパラメータで上書きする前の基本設定
    config: Arc<ReportConfig>,
    auth: Auth,
    cache: Arc<ResponseCache>,
}

impl AppState {
    pub fn new(config: ReportConfig, auth: Auth) -> Self {
        Self {
            config: Arc::new(config),
            auth,
            cache: ResponseCache::new(),
        }
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/report", get(report))
        .with_state(state)
}

/// 指定アドレスで待ち受け、Ctrl-Cで停止する
pub async fn serve(state: AppState, host: &str, port: u16) -> Result<()> {
    let listener = TcpListener::bind((host, port)).await?;
    info!(address = %listener.local_addr()?, "server listening");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => error!(error = %e, "failed to listen for shutdown signal"),
    }
}

async fn report(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let mut config = (*state.config).clone();
    config.apply_query_params(&params);

    if let Err(e) = config.validate() {
        warn!(error = %e, "rejecting report request");
        return error_response(StatusCode::BAD_REQUEST, &[e]);
    }

    let client = match JiraConfig::new(&config.base_url, &config.api_version, state.auth.clone())
        .and_then(JiraClient::new)
    {
        Ok(client) => client,
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, &[e]),
    };

    let report =
        TimespentReport::new(Arc::new(client), config).with_cache(Arc::clone(&state.cache));
    let outcome = report.search().await;
    if !outcome.errors.is_empty() {
        for e in &outcome.errors {
            error!(error = %e, "search error");
        }
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, &outcome.errors);
    }

    let mut body = Vec::new();
    if let Err(e) = report.render(&outcome, &mut body) {
        error!(error = %e, "render error");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, &[e]);
    }

    (StatusCode::OK, [(header::CONTENT_TYPE, CSV_CONTENT_TYPE)], body).into_response()
}

fn error_response(status: StatusCode, errors: &[Error]) -> Response {
    let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    (status, Json(json!({ "message": messages }))).into_response()
}
