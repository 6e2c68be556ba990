//! Fixed mapping tables from provider vocabulary to canonical enums.
//!
//! Every table is total: unknown input maps to the documented default and
//! never fails. Matching ignores case and surrounding whitespace.

use crate::models::{AlertSeverity, AlertSource, AlertStatus, DeployStatus};

/// Generic severity: critical, high, warning, info. Default MEDIUM.
pub fn map_severity(raw: &str) -> AlertSeverity {
    match raw.trim().to_lowercase().as_str() {
        "critical" => AlertSeverity::Critical,
        "high" => AlertSeverity::High,
        "warning" => AlertSeverity::Medium,
        "info" => AlertSeverity::Low,
        _ => AlertSeverity::Medium,
    }
}

/// CloudWatch alarm state. Default MEDIUM.
pub fn map_cloudwatch_state(raw: &str) -> AlertSeverity {
    match raw.trim().to_uppercase().as_str() {
        "ALARM" => AlertSeverity::High,
        "OK" => AlertSeverity::Low,
        "INSUFFICIENT_DATA" => AlertSeverity::Medium,
        _ => AlertSeverity::Medium,
    }
}

/// PagerDuty incident status. Default FIRING.
pub fn map_alert_status(raw: &str) -> AlertStatus {
    match raw.trim().to_lowercase().as_str() {
        "triggered" | "acknowledged" => AlertStatus::Firing,
        "resolved" => AlertStatus::Resolved,
        _ => AlertStatus::Firing,
    }
}

/// GitHub deployment state. Default IN_PROGRESS.
pub fn map_github_state(raw: &str) -> DeployStatus {
    match raw.trim().to_lowercase().as_str() {
        "success" => DeployStatus::Success,
        "failure" | "error" => DeployStatus::Failure,
        "pending" => DeployStatus::InProgress,
        _ => DeployStatus::InProgress,
    }
}

/// Jenkins build result. Default IN_PROGRESS.
pub fn map_jenkins_status(raw: &str) -> DeployStatus {
    match raw.trim().to_uppercase().as_str() {
        "SUCCESS" => DeployStatus::Success,
        "FAILURE" | "ABORTED" => DeployStatus::Failure,
        "UNSTABLE" => DeployStatus::Partial,
        _ => DeployStatus::InProgress,
    }
}

/// Severity for an alert from `source`. CloudWatch reports alarm states.
pub fn alert_severity(source: AlertSource, raw: &str) -> AlertSeverity {
    match source {
        AlertSource::CloudWatch => map_cloudwatch_state(raw),
        _ => map_severity(raw),
    }
}

/// Status for an alert from `source`. CloudWatch alarms always fire.
pub fn alert_status(source: AlertSource, raw: &str) -> AlertStatus {
    match source {
        AlertSource::CloudWatch => AlertStatus::Firing,
        _ => map_alert_status(raw),
    }
}

pub fn deploy_status(source: AlertSource, raw: &str) -> DeployStatus {
    match source {
        AlertSource::Jenkins => map_jenkins_status(raw),
        _ => map_github_state(raw),
    }
}

/// Service name from a resource name: first hyphen-delimited token, lowercased.
///
/// `"payment-service-high-cpu"` → `"payment"`. Falls back to the whole name
/// when the first token is empty.
pub fn extract_service_name(name: &str) -> String {
    let trimmed = name.trim();
    match trimmed.split('-').next() {
        Some(token) if !token.trim().is_empty() => token.trim().to_lowercase(),
        _ => trimmed.to_lowercase(),
    }
}
