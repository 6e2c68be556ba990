use chrono::{Duration, Utc};
use signalroot::{
    models::{AlertKey, AlertSource},
    state::{
        AlertIncidentIndex, DedupStore, InMemoryIdempotencyStore, LinkRetention, NotificationGate,
        SledIdempotencyStore, Windows,
    },
};
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

/// Contract suite run against every backend
async fn check_dedup_window<S: DedupStore>(store: &S) {
    let key = AlertKey::new(AlertSource::PagerDuty, "INC-1");
    let t0 = Utc::now();

    assert!(store.should_process(&key, t0).await.unwrap());
    store.mark_processed(&key, "wh-1", t0).await.unwrap();
    assert!(!store.should_process(&key, t0 + Duration::minutes(29)).await.unwrap());

    // Exactly at the window boundary the record is expired
    assert!(store.should_process(&key, t0 + Duration::minutes(30)).await.unwrap());
    assert_eq!(store.len().await.unwrap(), 0);

    assert!(store.try_mark(&key, "wh-2", t0).await.unwrap());
    assert!(!store.try_mark(&key, "wh-3", t0 + Duration::seconds(5)).await.unwrap());
}

async fn check_links<S: AlertIncidentIndex>(store: &S) {
    let key = AlertKey::new(AlertSource::CloudWatch, "evt-1");
    let now = Utc::now();
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();

    assert_eq!(store.incident_for(&key, now).await.unwrap(), None);
    assert_eq!(store.claim(&key, first, now).await.unwrap(), None);
    assert_eq!(store.claim(&key, second, now).await.unwrap(), Some(first));

    store.associate(&key, second, now).await.unwrap();
    assert_eq!(store.incident_for(&key, now).await.unwrap(), Some(second));
    assert!(store.has_incident(&key, now + Duration::days(30)).await.unwrap());
}

async fn check_notifications<S: NotificationGate>(store: &S) {
    let incident = Uuid::new_v4();
    let other = Uuid::new_v4();
    let t0 = Utc::now();

    assert!(store.try_acquire(&incident, t0).await.unwrap());
    assert!(!store.try_acquire(&incident, t0 + Duration::minutes(59)).await.unwrap());
    assert!(store.should_notify(&other, t0).await.unwrap());
    assert!(store.try_acquire(&incident, t0 + Duration::minutes(60)).await.unwrap());

    store.mark_sent(&other, t0).await.unwrap();
    assert_eq!(store.sweep(t0 + Duration::seconds(1)).await.unwrap(), 1);
    assert_eq!(store.len().await.unwrap(), 1);
}

#[tokio::test]
async fn test_in_memory_store_contracts() {
    let store = InMemoryIdempotencyStore::new(Windows::default());
    check_dedup_window(&store).await;
    check_links(&store).await;
    check_notifications(&store).await;
}

#[tokio::test]
async fn test_sled_store_contracts() {
    let dir = TempDir::new().unwrap();
    let store = SledIdempotencyStore::new(dir.path(), Windows::default()).unwrap();
    check_dedup_window(&store).await;
    check_links(&store).await;
    check_notifications(&store).await;
}

#[tokio::test]
async fn test_sled_links_survive_restart() {
    let dir = TempDir::new().unwrap();
    let key = AlertKey::new(AlertSource::PagerDuty, "INC-restart");
    let incident = Uuid::new_v4();
    let now = Utc::now();

    {
        let store = SledIdempotencyStore::new(dir.path(), Windows::default()).unwrap();
        store.associate(&key, incident, now).await.unwrap();
        store.mark_processed(&key, "wh-1", now).await.unwrap();
        store.flush().await.unwrap();
    }

    let store = SledIdempotencyStore::new(dir.path(), Windows::default()).unwrap();
    assert_eq!(store.incident_for(&key, now).await.unwrap(), Some(incident));
    assert!(!store.should_process(&key, now).await.unwrap());
}

#[tokio::test]
async fn test_expiring_links_on_sled() {
    let dir = TempDir::new().unwrap();
    let store = SledIdempotencyStore::new(
        dir.path(),
        Windows {
            link_retention: LinkRetention::Expire {
                ttl: Duration::hours(1),
            },
            ..Windows::default()
        },
    )
    .unwrap();
    let key = AlertKey::new(AlertSource::PagerDuty, "INC-ttl");
    let now = Utc::now();

    store.associate(&key, Uuid::new_v4(), now).await.unwrap();
    assert!(store.has_incident(&key, now + Duration::minutes(59)).await.unwrap());
    assert_eq!(store.sweep_expired(now + Duration::hours(2)).await.unwrap(), 1);
    assert!(!store.has_incident(&key, now).await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_try_mark_admits_one() {
    let store = Arc::new(InMemoryIdempotencyStore::new(Windows::default()));
    let key = AlertKey::new(AlertSource::PagerDuty, "INC-race");
    let now = Utc::now();

    let mut handles = Vec::new();
    for i in 0..32 {
        let store = store.clone();
        let key = key.clone();
        handles.push(tokio::spawn(async move {
            store.try_mark(&key, &format!("wh-{}", i), now).await.unwrap()
        }));
    }

    let mut admitted = 0;
    for handle in handles {
        if handle.await.unwrap() {
            admitted += 1;
        }
    }
    assert_eq!(admitted, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sled_claims_agree_on_one_incident() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(SledIdempotencyStore::new(dir.path(), Windows::default()).unwrap());
    let key = AlertKey::new(AlertSource::CloudWatch, "evt-race");
    let now = Utc::now();

    let mut handles = Vec::new();
    for _ in 0..32 {
        let store = store.clone();
        let key = key.clone();
        let candidate = Uuid::new_v4();
        handles.push(tokio::spawn(async move {
            let existing = store.claim(&key, candidate, now).await.unwrap();
            (candidate, existing)
        }));
    }

    let mut winners = Vec::new();
    let mut reported = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            (candidate, None) => winners.push(candidate),
            (_, Some(existing)) => reported.push(existing),
        }
    }

    assert_eq!(winners.len(), 1);
    assert!(reported.iter().all(|id| *id == winners[0]));
    assert_eq!(store.incident_for(&key, now).await.unwrap(), Some(winners[0]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sled_try_mark_admits_one() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(SledIdempotencyStore::new(dir.path(), Windows::default()).unwrap());
    let key = AlertKey::new(AlertSource::GitHub, "4401");
    let now = Utc::now();

    let mut handles = Vec::new();
    for i in 0..32 {
        let store = store.clone();
        let key = key.clone();
        handles.push(tokio::spawn(async move {
            store.try_mark(&key, &format!("wh-{}", i), now).await.unwrap()
        }));
    }

    let mut admitted = 0;
    for handle in handles {
        if handle.await.unwrap() {
            admitted += 1;
        }
    }
    assert_eq!(admitted, 1);
}

#[test]
fn test_stats_snapshot_from_factory() {
    use signalroot::config::{IdempotencyConfig, StateConfig};
    use signalroot::state::create_stores;

    let stores = create_stores(&StateConfig::default(), &IdempotencyConfig::default()).unwrap();
    let key = AlertKey::new(AlertSource::Jenkins, "inventory-deploy-88");
    let now = Utc::now();

    tokio_test::block_on(async {
        stores.dedup.mark_processed(&key, "inventory-deploy-88", now).await.unwrap();
        stores.links.associate(&key, Uuid::new_v4(), now).await.unwrap();

        let stats = stores.stats().await.unwrap();
        assert_eq!(stats.processed_webhooks, 1);
        assert_eq!(stats.alert_to_incident_mappings, 1);
        assert_eq!(stats.active_notifications, 0);
    });
}
