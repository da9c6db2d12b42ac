//! Request and response bodies of the numeric service.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OptimizationRequest {
    pub initial_value: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OptimizationResponse {
    /// Location of the minimum, one entry per dimension
    pub optimal_value: Vec<f64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IntegrationRequest {
    pub lower_limit: f64,
    pub upper_limit: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IntegrationResponse {
    pub area_under_curve: f64,
    pub error_estimate: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatisticsRequest {
    pub data: Vec<f64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatisticsResponse {
    pub mean: f64,
    /// Sample variance; `null` when fewer than two values were sent
    pub variance: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorBody {
    pub message: String,
    pub code: String,
}
