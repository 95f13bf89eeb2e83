//! HTTP interface of the daemon. The browser extension reports transitions through `/events` and
//! reads or replaces totals through `/data`. The cli uses `/snapshot` and `/reset`.

use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header::CONTENT_TYPE, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use crate::{
    classifier::Classifier,
    tracker::{event::TransitionEvent, Snapshot},
};

use super::{
    api::{
        ClassifyRequest, ClassifyResponse, DataRequest, DataResponse, EventRequest,
        HealthResponse, StatusResponse,
    },
    tracking::TrackerHandle,
};

#[derive(Clone)]
pub struct AppState {
    tracker: TrackerHandle,
    classifier: Arc<Classifier>,
}

impl AppState {
    pub fn new(tracker: TrackerHandle, classifier: Classifier) -> Self {
        Self {
            tracker,
            classifier: Arc::new(classifier),
        }
    }
}

/// Failure of a request, always answered with a [StatusResponse] body.
struct ApiError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(StatusResponse::failed(self.message))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        warn!("Rejected request body {value:?}");
        Self {
            status: StatusCode::BAD_REQUEST,
            message: value.body_text(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        error!("Couldn't reach tracker {value:?}");
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: value.to_string(),
        }
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health))
        .route("/data", get(get_data).post(post_data))
        .route("/events", post(post_event))
        .route("/snapshot", get(get_snapshot))
        .route("/reset", post(post_reset))
        .route("/classify", post(post_classify))
        .fallback(not_found)
        .with_state(state)
        .layer(cors)
}

/// Serves `router` until `shutdown` is cancelled. In-flight requests are allowed to finish.
pub async fn serve(listener: TcpListener, router: Router, shutdown: CancellationToken) -> Result<()> {
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        timestamp: Utc::now(),
    })
}

async fn get_data(State(state): State<AppState>) -> ApiResult<DataResponse> {
    let snapshot = state.tracker.snapshot().await?;
    Ok(Json(DataResponse {
        success: true,
        data: snapshot.sites,
        error: None,
    }))
}

async fn post_data(
    State(state): State<AppState>,
    payload: Result<Json<DataRequest>, JsonRejection>,
) -> ApiResult<StatusResponse> {
    let Json(request) = payload?;
    state.tracker.import(request.data).await?;
    Ok(Json(StatusResponse::ok()))
}

async fn post_event(
    State(state): State<AppState>,
    payload: Result<Json<EventRequest>, JsonRejection>,
) -> ApiResult<StatusResponse> {
    let Json(request) = payload?;
    state
        .tracker
        .send_event(TransitionEvent::from(request))
        .await?;
    Ok(Json(StatusResponse::ok()))
}

async fn get_snapshot(State(state): State<AppState>) -> ApiResult<Snapshot> {
    Ok(Json(state.tracker.snapshot().await?))
}

async fn post_reset(State(state): State<AppState>) -> ApiResult<StatusResponse> {
    state.tracker.reset().await?;
    Ok(Json(StatusResponse::ok()))
}

async fn post_classify(
    State(state): State<AppState>,
    payload: Result<Json<ClassifyRequest>, JsonRejection>,
) -> ApiResult<ClassifyResponse> {
    let Json(request) = payload?;
    Ok(Json(ClassifyResponse {
        success: true,
        analysis: state.classifier.breakdown(&request.sites),
    }))
}

async fn not_found() -> ApiError {
    ApiError {
        status: StatusCode::NOT_FOUND,
        message: "Not found".into(),
    }
}
