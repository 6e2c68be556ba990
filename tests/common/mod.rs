//! Shared fixtures for the integration suites.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::{json, Value};
use signalroot::{
    adapters::{parse_event, InboundEvent},
    clock::ManualClock,
    config::{CorrelationConfig, OrganizationSeed},
    correlation::InMemoryHistory,
    directory::InMemoryDirectory,
    error::{AppError, Result},
    models::{AlertSource, InboundAlert, InboundDeploy, Incident},
    notifications::Notifier,
    processing::{CleanupSweeper, CorrelationEngine},
    state::{create_in_memory_stores, IdempotencyStores, Windows},
};
use std::sync::Arc;
use uuid::Uuid;

pub const ORG: &str = "acme-corp";

/// Notifier that remembers every incident it was asked to send
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Uuid>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<Uuid> {
        self.sent.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, incident: &Incident) -> Result<()> {
        self.sent.lock().push(incident.id);
        if self.fail {
            return Err(AppError::integration("recording", "channel unavailable"));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Engine wired to in-memory collaborators and a manual clock
pub struct Harness {
    pub engine: Arc<CorrelationEngine>,
    pub sweeper: Arc<CleanupSweeper>,
    pub stores: IdempotencyStores,
    pub history: Arc<InMemoryHistory>,
    pub notifier: Arc<RecordingNotifier>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(Windows::default(), RecordingNotifier::default())
    }

    pub fn with(windows: Windows, notifier: RecordingNotifier) -> Self {
        let stores = create_in_memory_stores(windows);
        Self::with_stores(stores, notifier)
    }

    pub fn with_stores(stores: IdempotencyStores, notifier: RecordingNotifier) -> Self {
        let directory = Arc::new(InMemoryDirectory::with_organizations(&[
            OrganizationSeed {
                key: ORG.to_string(),
                name: "Acme Corp".to_string(),
            },
            OrganizationSeed {
                key: "dataflow".to_string(),
                name: "DataFlow Systems".to_string(),
            },
        ]));
        let history = Arc::new(InMemoryHistory::new());
        let notifier = Arc::new(notifier);
        let clock = Arc::new(ManualClock::starting_now());

        let engine = Arc::new(CorrelationEngine::new(
            stores.clone(),
            directory,
            history.clone(),
            notifier.clone(),
            clock.clone(),
            CorrelationConfig::default(),
        ));
        let sweeper = Arc::new(CleanupSweeper::new(
            stores.clone(),
            history.clone(),
            clock.clone(),
            chrono::Duration::hours(2),
            &CorrelationConfig::default(),
            std::time::Duration::from_secs(300),
        ));

        Self {
            engine,
            sweeper,
            stores,
            history,
            notifier,
            clock,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        use signalroot::clock::Clock;
        self.clock.now()
    }
}

pub fn alert(source: AlertSource, body: Value) -> InboundAlert {
    match parse_event(source, body) {
        Ok(InboundEvent::Alert(alert)) => alert,
        other => panic!("expected an alert, got {:?}", other),
    }
}

pub fn deploy(source: AlertSource, body: Value) -> InboundDeploy {
    match parse_event(source, body) {
        Ok(InboundEvent::Deploy(deploy)) => deploy,
        other => panic!("expected a deploy, got {:?}", other),
    }
}

pub fn pagerduty_body(incident_id: &str, webhook_id: &str, service: &str, severity: &str) -> Value {
    json!({
        "type": "incident.triggered",
        "webhookId": webhook_id,
        "payload": {
            "incident": {
                "id": incident_id,
                "title": format!("{} error rate above threshold", service),
                "status": "triggered",
                "severity": severity,
                "service": { "name": service }
            }
        }
    })
}

pub fn cloudwatch_body(event_id: &str, alarm_name: &str, state: &str) -> Value {
    json!({
        "id": event_id,
        "detail-type": "CloudWatch Alarm State Change",
        "source": "aws.cloudwatch",
        "region": "us-east-1",
        "detail": {
            "alarmName": alarm_name,
            "state": { "value": state, "reason": "Threshold crossed" }
        }
    })
}

pub fn github_body(deployment_id: u64, repository: &str, version: &str, state: &str) -> Value {
    json!({
        "action": "created",
        "deployment": {
            "id": deployment_id,
            "sha": "9f8e7d6c",
            "ref": version,
            "environment": "production"
        },
        "deployment_status": { "state": state },
        "repository": { "name": repository, "full_name": format!("acme/{}", repository) }
    })
}

pub fn jenkins_body(job: &str, number: u64, status: &str) -> Value {
    json!({
        "name": job,
        "build": { "number": number, "status": status, "phase": "COMPLETED" },
        "job": { "name": job }
    })
}
