//! Query API handlers.
//!
//! Both handlers collect the raw parameter pairs in arrival order and run
//! the action on the blocking pool, since backends are synchronous.

use axum::Json;
use axum::extract::rejection::{FormRejection, QueryRejection};
use axum::extract::{Form, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Map, Value, json};
use tracing::{info, warn};

use scalegrid_binder::Params;
use scalegrid_core::{Fault, FaultResult};

use crate::ApiState;
use crate::dispatch::{Action, ActionOutput, dispatch};

/// GET /?Action=...
pub async fn query_get(
    State(state): State<ApiState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Response {
    match query {
        Ok(Query(pairs)) => handle(state, pairs).await,
        Err(rejection) => malformed(&state, rejection.body_text()),
    }
}

/// POST / (application/x-www-form-urlencoded)
pub async fn query_post(
    State(state): State<ApiState>,
    form: Result<Form<Vec<(String, String)>>, FormRejection>,
) -> Response {
    match form {
        Ok(Form(pairs)) => handle(state, pairs).await,
        Err(rejection) => malformed(&state, rejection.body_text()),
    }
}

/// The request never produced a parameter map.
fn malformed(state: &ApiState, detail: String) -> Response {
    let request_id = state.next_request_id();
    let fault = Fault::invalid(format!("malformed request: {detail}"));
    warn!(code = fault.kind().code(), %request_id, error = %fault, "request rejected");
    fault_response(&fault, request_id)
}

async fn handle(state: ApiState, pairs: Vec<(String, String)>) -> Response {
    let request_id = state.next_request_id();
    let params: Params = pairs.into_iter().collect();
    let backend = state.backend.clone();

    let outcome = tokio::task::spawn_blocking(move || -> FaultResult<(Action, ActionOutput)> {
        let action = Action::from_params(&params)?;
        let output = dispatch(backend.as_ref(), action, &params)?;
        Ok((action, output))
    })
    .await
    .unwrap_or_else(|e| Err(Fault::internal(format!("dispatch task failed: {e}"))));

    match outcome {
        Ok((action, output)) => {
            info!(%action, %request_id, "request handled");
            success_response(action, output, request_id)
        }
        Err(fault) => {
            warn!(code = fault.kind().code(), %request_id, error = %fault, "request failed");
            fault_response(&fault, request_id)
        }
    }
}

fn success_response(action: Action, output: ActionOutput, request_id: String) -> Response {
    let result = match serde_json::to_value(&output) {
        Ok(v) => v,
        Err(e) => {
            return fault_response(&Fault::internal(format!("encode result: {e}")), request_id);
        }
    };
    let mut body = Map::new();
    body.insert("RequestId".into(), Value::String(request_id));
    body.insert(format!("{action}Result"), result);
    (StatusCode::OK, Json(Value::Object(body))).into_response()
}

fn fault_response(fault: &Fault, request_id: String) -> Response {
    let status = if fault.kind().is_client_fault() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    let body = json!({
        "Error": {
            "Code": fault.kind().code(),
            "Message": fault.detail(),
        },
        "RequestId": request_id,
    });
    (status, Json(body)).into_response()
}
