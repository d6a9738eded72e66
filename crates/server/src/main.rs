use std::{net::SocketAddr, sync::Arc};

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use shared::{
    error::{ApiError, ApiException, ErrorCode, ErrorEnvelope},
    protocol::{OptionsResponse, PredictResponse, OPTIONS_ROUTE, PREDICT_ROUTE},
};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod api;
mod app_state;
mod config;
mod model;

use app_state::AppState;
use config::load_settings;
use model::Assets;

const MAX_PREDICT_BODY_BYTES: usize = 64 * 1024;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorEnvelope>)>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = load_settings();
    info!("loading prediction assets");
    let assets = Assets::load(&settings);

    let app = build_router(AppState {
        assets: Arc::new(assets),
    });

    let addr: SocketAddr = settings.bind_addr.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown requested");
            }
        })
        .await?;
    Ok(())
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(OPTIONS_ROUTE, get(options))
        .route(
            PREDICT_ROUTE,
            post(predict).layer(RequestBodyLimitLayer::new(MAX_PREDICT_BODY_BYTES)),
        )
        .with_state(state)
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::ModelNotLoaded => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::BadRequestFormat | ErrorCode::MissingFields | ErrorCode::InvalidDataValue => {
            StatusCode::BAD_REQUEST
        }
        ErrorCode::AssetsNotLoaded | ErrorCode::InternalServerError => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(error: ApiException) -> (StatusCode, Json<ErrorEnvelope>) {
    let status = status_for(error.code);
    (status, Json(ErrorEnvelope::from(ApiError::from(error))))
}

async fn healthz() -> &'static str {
    "ok"
}

async fn options(State(state): State<AppState>) -> ApiResult<OptionsResponse> {
    api::list_options(&state.assets)
        .map(Json)
        .map_err(error_response)
}

async fn predict(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<PredictResponse> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());
    api::predict(&state.assets, content_type, &body)
        .map(Json)
        .map_err(error_response)
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
