//! Health, readiness, liveness and metrics routes
//!
//! Mounted on the main server rather than a separate port.

use crate::db::UserStore;
use crate::llm::LlmProvider;
use crate::observability::metrics::{current_timestamp, metrics};
use serde::Serialize;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::Filter;

/// Inputs to the health report
#[derive(Clone)]
pub struct HealthMonitor {
    users: UserStore,
    llm: Arc<dyn LlmProvider>,
    started_at: u64,
}

impl HealthMonitor {
    pub fn new(users: UserStore, llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            users,
            llm,
            started_at: current_timestamp(),
        }
    }

    async fn check_database(&self) -> HealthCheck {
        match self.users.ping().await {
            Ok(()) => HealthCheck::healthy(None),
            Err(e) => HealthCheck::unhealthy(format!("Database unreachable: {e}")),
        }
    }

    async fn check_llm(&self) -> HealthCheck {
        match self.llm.health_check().await {
            Ok(()) => HealthCheck::healthy(Some(format!("provider: {}", self.llm.name()))),
            Err(e) => HealthCheck::unhealthy(format!("{} unreachable: {e}", self.llm.name())),
        }
    }

    pub async fn status(&self) -> HealthStatus {
        let mut checks = BTreeMap::new();
        checks.insert("database".to_string(), self.check_database().await);
        checks.insert("llm".to_string(), self.check_llm().await);

        let healthy = checks.values().all(|check| check.status == "healthy");
        let now = current_timestamp();
        HealthStatus {
            status: if healthy { "healthy" } else { "degraded" }.to_string(),
            timestamp: now,
            uptime_seconds: now.saturating_sub(self.started_at),
            checks,
        }
    }

    pub async fn ready(&self) -> bool {
        self.users.ping().await.is_ok()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthCheck {
    pub status: String,
    pub message: Option<String>,
    pub last_check: u64,
}

impl HealthCheck {
    fn healthy(message: Option<String>) -> Self {
        Self {
            status: "healthy".to_string(),
            message,
            last_check: current_timestamp(),
        }
    }

    fn unhealthy(message: String) -> Self {
        Self {
            status: "unhealthy".to_string(),
            message: Some(message),
            last_check: current_timestamp(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: u64,
    pub uptime_seconds: u64,
    pub checks: BTreeMap<String, HealthCheck>,
}

#[derive(Debug, Serialize)]
struct ReadinessResponse {
    ready: bool,
    timestamp: u64,
}

#[derive(Debug, Serialize)]
struct LivenessResponse {
    alive: bool,
    timestamp: u64,
}

/// `GET /health`, `/ready`, `/live` and `/metrics`
pub fn health_routes(
    monitor: Arc<HealthMonitor>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let health_monitor = monitor.clone();
    let health_route = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(move || {
            let monitor = health_monitor.clone();
            async move {
                let status = monitor.status().await;
                let code = if status.status == "healthy" {
                    StatusCode::OK
                } else {
                    StatusCode::SERVICE_UNAVAILABLE
                };
                Ok::<_, Infallible>(warp::reply::with_status(warp::reply::json(&status), code))
            }
        });

    let ready_route = warp::path("ready")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(move || {
            let monitor = monitor.clone();
            async move {
                let ready = monitor.ready().await;
                let code = if ready {
                    StatusCode::OK
                } else {
                    StatusCode::SERVICE_UNAVAILABLE
                };
                let body = ReadinessResponse {
                    ready,
                    timestamp: current_timestamp(),
                };
                Ok::<_, Infallible>(warp::reply::with_status(warp::reply::json(&body), code))
            }
        });

    let live_route = warp::path("live")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| {
            warp::reply::json(&LivenessResponse {
                alive: true,
                timestamp: current_timestamp(),
            })
        });

    let metrics_route = warp::path("metrics")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| warp::reply::json(&metrics().snapshot()));

    health_route
        .or(ready_route)
        .or(live_route)
        .or(metrics_route)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;
    use crate::testing::MockLlmProvider;

    async fn monitor() -> Arc<HealthMonitor> {
        let users = UserStore::new(connect_in_memory().await.unwrap());
        Arc::new(HealthMonitor::new(
            users,
            Arc::new(MockLlmProvider::single_response("ok")),
        ))
    }

    #[tokio::test]
    async fn test_health_reports_database_and_llm() {
        let routes = health_routes(monitor().await);
        let response = warp::test::request().path("/health").reply(&routes).await;
        assert_eq!(response.status(), 200);

        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["checks"]["database"]["status"], "healthy");
        assert_eq!(body["checks"]["llm"]["status"], "healthy");
        assert_eq!(body["checks"]["llm"]["message"], "provider: mock");
    }

    #[tokio::test]
    async fn test_unreachable_llm_degrades_health() {
        let users = UserStore::new(connect_in_memory().await.unwrap());
        let monitor = Arc::new(HealthMonitor::new(
            users,
            Arc::new(MockLlmProvider::with_failure()),
        ));

        let routes = health_routes(monitor);
        let response = warp::test::request().path("/health").reply(&routes).await;
        assert_eq!(response.status(), 503);

        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["checks"]["database"]["status"], "healthy");
        assert_eq!(body["checks"]["llm"]["status"], "unhealthy");

        let ready = warp::test::request().path("/ready").reply(&routes).await;
        assert_eq!(ready.status(), 200);
    }

    #[tokio::test]
    async fn test_ready_and_live() {
        let routes = health_routes(monitor().await);
        let ready = warp::test::request().path("/ready").reply(&routes).await;
        assert_eq!(ready.status(), 200);
        let live = warp::test::request().path("/live").reply(&routes).await;
        assert_eq!(live.status(), 200);
    }

    #[tokio::test]
    async fn test_ready_fails_when_database_closed() {
        let pool = connect_in_memory().await.unwrap();
        let monitor = Arc::new(HealthMonitor::new(
            UserStore::new(pool.clone()),
            Arc::new(MockLlmProvider::single_response("ok")),
        ));
        pool.close().await;

        let routes = health_routes(monitor);
        let ready = warp::test::request().path("/ready").reply(&routes).await;
        assert_eq!(ready.status(), 503);
        let health = warp::test::request().path("/health").reply(&routes).await;
        assert_eq!(health.status(), 503);
    }

    #[tokio::test]
    async fn test_metrics_route() {
        let routes = health_routes(monitor().await);
        let response = warp::test::request().path("/metrics").reply(&routes).await;
        assert_eq!(response.status(), 200);
        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert!(body["turns"].is_object());
        assert!(body["auth"].is_object());
    }
}
