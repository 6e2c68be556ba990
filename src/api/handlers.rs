use crate::adapters::{parse_event, InboundEvent};
use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::models::{AlertOutcome, AlertSource, DeployOutcome, Incident};
use crate::processing::SweepReport;
use crate::state::IdempotencyStats;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::str::FromStr;
use uuid::Uuid;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Prometheus text exposition
pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        crate::metrics::gather_metrics(),
    )
}

/// Receive a webhook from `source` for the organization `org_key`
pub async fn receive_webhook(
    State(state): State<AppState>,
    Path((source, org_key)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<InboundResponse>> {
    let source = AlertSource::from_str(&source)
        .map_err(|_| AppError::NotFound(format!("Unknown webhook source '{}'", source)))?;

    let raw: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("Request body is not JSON: {}", e)))?;

    tracing::debug!(source = %source, organization = %org_key, "Webhook received");

    let response = match parse_event(source, raw)? {
        InboundEvent::Alert(alert) => {
            let outcome = state.engine.process_inbound_alert(&org_key, alert).await?;
            InboundResponse::for_alert(source, org_key, outcome)
        }
        InboundEvent::Deploy(deploy) => {
            let outcome = state.engine.process_inbound_deploy(&org_key, deploy).await?;
            InboundResponse::for_deploy(source, org_key, outcome)
        }
    };

    Ok(Json(response))
}

#[derive(Debug, Serialize)]
pub struct InboundResponse {
    pub status: &'static str,
    pub source: AlertSource,
    pub organization: String,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incident_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deploy_id: Option<Uuid>,
}

impl InboundResponse {
    fn for_alert(source: AlertSource, organization: String, outcome: AlertOutcome) -> Self {
        let notified = match &outcome {
            AlertOutcome::Created { notified, .. } => Some(*notified),
            _ => None,
        };
        Self {
            status: "processed",
            source,
            organization,
            outcome: outcome.label(),
            incident_id: outcome.incident_id(),
            notified,
            deploy_id: None,
        }
    }

    fn for_deploy(source: AlertSource, organization: String, outcome: DeployOutcome) -> Self {
        let deploy_id = match &outcome {
            DeployOutcome::Recorded { deploy_id } => Some(*deploy_id),
            DeployOutcome::Dropped => None,
        };
        Self {
            status: "processed",
            source,
            organization,
            outcome: outcome.label(),
            incident_id: None,
            notified: None,
            deploy_id,
        }
    }
}

/// Idempotency store sizes
pub async fn safety_stats(State(state): State<AppState>) -> Result<Json<SafetyStatsResponse>> {
    let idempotency = state.engine.stats().await?;

    Ok(Json(SafetyStatsResponse {
        idempotency,
        status: "healthy",
        timestamp: Utc::now(),
    }))
}

#[derive(Debug, Serialize)]
pub struct SafetyStatsResponse {
    pub idempotency: IdempotencyStats,
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// Run the cleanup sweeper now
pub async fn safety_cleanup(State(state): State<AppState>) -> Result<Json<CleanupResponse>> {
    let report = state.sweeper.sweep_now().await?;
    tracing::info!("Manual idempotency cleanup triggered");

    Ok(Json(CleanupResponse {
        status: "completed",
        report,
    }))
}

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub status: &'static str,
    pub report: SweepReport,
}

/// Get an incident by id
pub async fn get_incident(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Incident>> {
    state
        .engine
        .get_incident(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Incident {} not found", id)))
}
