//! API handlers

#![allow(clippy::disallowed_methods)] // json! macro used in multiple functions

use super::response::{AppError, SuccessResponse};
use crate::bridge::{Gateway, SendReport, StatsSnapshot};
use crate::error::GatewayError;
use crate::logging;
use axum::{body::Bytes, extract::State, response::Json};
use fcu_protocol::{ControlCommand, FeatureVector, MachineSnapshot};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

/// Health check endpoint
///
/// @route GET /health
/// @output Json<SuccessResponse<serde_json::Value>> - Service and bus status
/// @side-effects None (read-only operation)
pub async fn health_check(
    State(gateway): State<Arc<Gateway>>,
) -> Result<Json<SuccessResponse<serde_json::Value>>, AppError> {
    Ok(Json(SuccessResponse::new(json!({
        "status": "healthy",
        "service": logging::SERVICE_NAME,
        "protocol": gateway.protocol(),
        "driver": gateway.driver_name(),
        "connected": gateway.state().is_connected(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))))
}

/// Latest machine snapshot
///
/// @route GET /api/v1/state
/// @output Json<SuccessResponse<MachineSnapshot>>
pub async fn get_state(
    State(gateway): State<Arc<Gateway>>,
) -> Result<Json<SuccessResponse<MachineSnapshot>>, AppError> {
    Ok(Json(SuccessResponse::new(gateway.state().snapshot())))
}

/// Classifier features with their column order
///
/// @route GET /api/v1/features
pub async fn get_features(
    State(gateway): State<Arc<Gateway>>,
) -> Result<Json<SuccessResponse<FeatureVector>>, AppError> {
    let features = gateway.state().snapshot().features();
    Ok(Json(
        SuccessResponse::new(features)
            .with_metadata("columns", json!(FeatureVector::NAMES))
            .with_metadata("values", json!(features.to_array())),
    ))
}

/// @route GET /api/v1/stats
pub async fn get_stats(
    State(gateway): State<Arc<Gateway>>,
) -> Result<Json<SuccessResponse<StatsSnapshot>>, AppError> {
    Ok(Json(SuccessResponse::new(gateway.stats())))
}

/// Operator control request
///
/// Body is the operator JSON (`mode`, `command`, manual overrides and
/// setpoints); missing fields take their defaults. A partial transmission is
/// reported as 503 with the frame count in `details`.
///
/// @route POST /api/v1/control
/// @input Json<ControlCommand>
/// @output Json<SuccessResponse<SendReport>>
/// @side-effects Transmits one or three frames on the bus
pub async fn post_control(
    State(gateway): State<Arc<Gateway>>,
    body: Bytes,
) -> Result<Json<SuccessResponse<SendReport>>, AppError> {
    let value: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|e| AppError::bad_request(format!("Invalid JSON body: {}", e)))?;
    let cmd = ControlCommand::from_json(value).map_err(GatewayError::from)?;
    debug!("Control request: {:?}", cmd);

    let report = gateway.send_command(&cmd).await;
    if report.is_complete() {
        return Ok(Json(SuccessResponse::new(report)));
    }
    let details = format!("{}/{} frames sent", report.sent, report.total);
    let err = match report.error {
        Some(err) => AppError::from(err),
        None => AppError::service_unavailable("Command not sent"),
    };
    Err(err.with_details(details))
}

#[derive(Debug, Deserialize)]
pub struct LogLevelRequest {
    pub level: String,
}

/// @route GET /api/v1/log-level
pub async fn get_log_level() -> Json<SuccessResponse<serde_json::Value>> {
    Json(SuccessResponse::new(json!({ "level": logging::get_log_level() })))
}

/// Replace the active tracing filter
///
/// @route PUT /api/v1/log-level
/// @input Json<LogLevelRequest> - EnvFilter directive, e.g. `debug` or `info,fcugw=trace`
pub async fn set_log_level(
    Json(req): Json<LogLevelRequest>,
) -> Result<Json<SuccessResponse<serde_json::Value>>, AppError> {
    logging::set_log_level(&req.level).map_err(AppError::bad_request)?;
    Ok(Json(SuccessResponse::new(json!({ "level": req.level }))))
}
