use chrono::Utc;
use signalroot::{
    config::NotificationConfig,
    error::AppError,
    models::{AlertKey, AlertSeverity, AlertSource, AlertStatus, Incident, ServiceRef},
    notifications::{build_notifier, Notifier, WebhookNotifier},
};
use uuid::Uuid;

fn incident() -> Incident {
    let now = Utc::now();
    Incident::new(
        Uuid::new_v4(),
        ServiceRef {
            id: Uuid::new_v4(),
            name: "payment".to_string(),
            organization_id: Uuid::new_v4(),
        },
        AlertKey::new(AlertSource::PagerDuty, "INC-1"),
        "Payment error rate above threshold".to_string(),
        AlertSeverity::Critical,
        AlertStatus::Firing,
        now,
        now,
    )
}

#[tokio::test]
async fn test_webhook_notifier_posts_incident() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/hooks/incidents")
        .match_header("content-type", "application/json")
        .match_body(mockito::Matcher::PartialJsonString(
            r#"{"event_type": "incident.created", "incident": {"service": "payment", "severity": "CRITICAL"}}"#
                .to_string(),
        ))
        .with_status(202)
        .create_async()
        .await;

    let notifier = WebhookNotifier::new(format!("{}/hooks/incidents", server.url()), 5).unwrap();
    notifier.send(&incident()).await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_webhook_notifier_surfaces_server_errors() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/hooks/incidents")
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;

    let notifier = WebhookNotifier::new(format!("{}/hooks/incidents", server.url()), 5).unwrap();
    let err = notifier.send(&incident()).await.unwrap_err();

    match err {
        AppError::Integration {
            integration_source,
            message,
        } => {
            assert_eq!(integration_source, "webhook");
            assert!(message.contains("500"));
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_webhook_without_url_falls_back_to_log() {
    let config = NotificationConfig {
        log_enabled: true,
        webhook_enabled: true,
        webhook_url: None,
        webhook_timeout_secs: 5,
    };

    let notifier = build_notifier(&config).unwrap();
    notifier.send(&incident()).await.unwrap();
}
