//! scalegrid-api — Auto Scaling query API.
//!
//! Requests carry an `Action` parameter plus the action's own parameters,
//! either form-encoded in a POST body or in the query string of a GET.
//! Responses are JSON.
//!
//! # Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | POST | `/` | Form-encoded action |
//! | GET | `/` | Query-string action |
//!
//! # Actions
//!
//! `CreateLaunchConfiguration`, `DeleteLaunchConfiguration`,
//! `DescribeLaunchConfigurations`, `CreateAutoScalingGroup`,
//! `DeleteAutoScalingGroup`, `DescribeAutoScalingGroups`,
//! `SetDesiredCapacity`.

pub mod dispatch;
pub mod handlers;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::Router;
use axum::routing::get;
use scalegrid_backend::GroupBackend;

pub use dispatch::{Action, ActionOutput, dispatch};

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub backend: Arc<dyn GroupBackend>,
    requests: Arc<AtomicU64>,
}

impl ApiState {
    pub fn new(backend: Arc<dyn GroupBackend>) -> Self {
        Self {
            backend,
            requests: Arc::new(AtomicU64::new(0)),
        }
    }

    fn next_request_id(&self) -> String {
        let n = self.requests.fetch_add(1, Ordering::Relaxed) + 1;
        format!("req-{n:012x}")
    }
}

/// Build the query API router.
pub fn build_router(backend: Arc<dyn GroupBackend>) -> Router {
    Router::new()
        .route("/", get(handlers::query_get).post(handlers::query_post))
        .with_state(ApiState::new(backend))
}
