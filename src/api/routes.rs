//! Route handlers.
//!
//! Each numeric endpoint answers on both `/name` and `/name/`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::trace::TraceLayer;

use crate::numerics::{self, NumericsError};

use super::types::*;

pub fn router() -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/optimize", post(optimize))
        .route("/optimize/", post(optimize))
        .route("/integrate", post(integrate))
        .route("/integrate/", post(integrate))
        .route("/statistics", post(statistics))
        .route("/statistics/", post(statistics))
        .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn optimize(Json(req): Json<OptimizationRequest>) -> Response {
    match numerics::minimize_scalar(numerics::objective_function, req.initial_value) {
        Ok(min) => {
            tracing::debug!(
                "Minimum f({}) = {} after {} iterations",
                min.x,
                min.fun,
                min.iterations
            );
            Json(OptimizationResponse {
                optimal_value: vec![min.x],
            })
            .into_response()
        }
        Err(e) => numerics_error(e),
    }
}

async fn integrate(Json(req): Json<IntegrationRequest>) -> Response {
    match numerics::integrate(numerics::integrand_function, req.lower_limit, req.upper_limit) {
        Ok(q) => Json(IntegrationResponse {
            area_under_curve: q.value,
            error_estimate: q.error,
        })
        .into_response(),
        Err(e) => numerics_error(e),
    }
}

async fn statistics(Json(req): Json<StatisticsRequest>) -> Response {
    match numerics::describe(&req.data) {
        Ok(summary) => Json(StatisticsResponse {
            mean: summary.mean,
            variance: summary.variance,
        })
        .into_response(),
        Err(e) => numerics_error(e),
    }
}

fn numerics_error(e: NumericsError) -> Response {
    let code = match e {
        NumericsError::EmptyData => "empty_data",
        NumericsError::NonFinite(_) => "non_finite",
        NumericsError::NoMinimum(_) => "no_minimum",
    };
    tracing::debug!("Rejected numeric request: {}", e);
    error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string(), code)
}

fn error_response(status: StatusCode, message: String, code: &str) -> Response {
    let body = ErrorResponse {
        error: ErrorBody {
            message,
            code: code.to_string(),
        },
    };
    (status, Json(body)).into_response()
}
