//! HTTP and WebSocket surface
//!
//! REST account routes, the `/ws/agentqa` endpoint and the health routes are
//! composed into one warp filter with permissive CORS and JSON rejections.

pub mod rest;
pub mod ws;

use crate::auth::AuthService;
use crate::dispatch::Dispatcher;
use crate::observability::{health_routes, HealthMonitor};
use serde::Serialize;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

/// Shared handles every route needs
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub auth: AuthService,
    pub health: Arc<HealthMonitor>,
}

/// Every route, with CORS and rejection handling applied
pub fn routes(
    state: AppState,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "POST", "OPTIONS"])
        .allow_headers(vec!["content-type", "authorization"]);

    ws::ws_route(state.dispatcher.clone())
        .or(rest::rest_routes(state.auth.clone()))
        .or(health_routes(state.health.clone()))
        .recover(handle_rejection)
        .with(cors)
}

/// Bind `addr` and serve until `shutdown` resolves
pub async fn serve(
    state: AppState,
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), warp::Error> {
    let (bound, server) =
        warp::serve(routes(state)).try_bind_with_graceful_shutdown(addr, shutdown)?;
    info!(addr = %bound, "Gateway listening");
    server.await;
    info!("Gateway stopped");
    Ok(())
}

pub(crate) fn with_state<T: Clone + Send>(
    state: T,
) -> impl Filter<Extract = (T,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorDetail {
    pub detail: String,
}

pub(crate) fn detail_reply(status: StatusCode, detail: impl Into<String>) -> warp::reply::Response {
    warp::reply::with_status(
        warp::reply::json(&ErrorDetail {
            detail: detail.into(),
        }),
        status,
    )
    .into_response()
}

/// Turn warp rejections into `{"detail": ...}` bodies
pub async fn handle_rejection(err: Rejection) -> Result<warp::reply::Response, Infallible> {
    let (status, detail) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not Found".to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            "Request body is required".to_string(),
        )
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Unsupported Media Type".to_string(),
        )
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            "Method Not Allowed".to_string(),
        )
    } else if let Some(e) = err.find::<warp::reject::MissingHeader>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if let Some(e) = err.find::<warp::reject::InvalidHeader>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else {
        warn!(rejection = ?err, "Unhandled rejection");
        (StatusCode::BAD_REQUEST, "Bad Request".to_string())
    };

    Ok(detail_reply(status, detail))
}
