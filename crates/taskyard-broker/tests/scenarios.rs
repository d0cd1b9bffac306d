//! End-to-end operator scenarios against the in-memory store.

mod common;

use common::{task, TestBroker, T1, T2, T3};
use serde_json::json;
use taskyard_broker::prelude::*;
use taskyard_broker::{score_to_time, ErrorKind};

#[tokio::test]
async fn rescue_dead_task_lands_at_head_of_ready() {
    let broker = TestBroker::new();
    let older = task(T2, "email:send");
    broker.writer.push_ready(&older).await.unwrap();

    let mut dead = task(T1, "email:send").with_retry_limit(25).with_failure("smtp down", 25);
    dead.set_payload("to", "user@example.com").unwrap();
    broker
        .writer
        .add_scored(QueueName::Dead, &dead, 1_700_000_100.0)
        .await
        .unwrap();

    broker.admin.rescue(&dead.id, 1_700_000_100.0).await.unwrap();

    let ready = broker.admin.list_enqueued().await.unwrap();
    assert_eq!(ready.len(), 2);
    assert_eq!(ready[0].id, dead.id);
    assert_eq!(ready[0].payload["to"], json!("user@example.com"));
    assert_eq!(ready[1].id, older.id);
    assert!(broker.admin.list_dead().await.unwrap().is_empty());

    let err = broker.admin.rescue(&dead.id, 1_700_000_100.0).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TaskNotFound);
    assert_eq!(broker.admin.list_enqueued().await.unwrap().len(), 2);
}

#[tokio::test]
async fn retry_listing_on_empty_queue_is_empty() {
    let broker = TestBroker::new();
    assert!(broker.admin.list_retry().await.unwrap().is_empty());
}

#[tokio::test]
async fn corrupt_ready_entry_fails_listing() {
    let broker = TestBroker::new();
    broker.writer.push_ready(&task(T1, "noop")).await.unwrap();
    broker
        .store
        .list_push_head(broker.keys.key(QueueName::Ready), b"{\"ID\":")
        .await
        .unwrap();

    let err = broker.admin.list_enqueued().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);
}

#[tokio::test]
async fn corrupt_active_entry_is_skipped() {
    let broker = TestBroker::new();
    broker.writer.push_active(&task(T1, "noop")).await.unwrap();
    broker
        .store
        .list_push_head(broker.keys.key(QueueName::Active), b"not a task")
        .await
        .unwrap();
    broker.writer.push_active(&task(T2, "noop")).await.unwrap();

    let active = broker.admin.list_in_progress().await.unwrap();
    let ids: Vec<String> = active.iter().map(|t| t.id.to_string()).collect();
    assert_eq!(ids, vec![T2.to_string(), T1.to_string()]);
}

#[tokio::test]
async fn scheduled_score_becomes_utc_time() {
    let broker = TestBroker::new();
    broker
        .writer
        .add_scored(QueueName::Scheduled, &task(T1, "report"), 1_700_000_000.0)
        .await
        .unwrap();

    let scheduled = broker.admin.list_scheduled().await.unwrap();
    assert_eq!(scheduled.len(), 1);
    assert_eq!(scheduled[0].process_at.to_rfc3339(), "2023-11-14T22:13:20+00:00");
    assert_eq!(Some(scheduled[0].process_at), score_to_time(scheduled[0].score));
}

#[tokio::test]
async fn stats_reflect_every_queue() {
    let broker = TestBroker::new();
    let stats = broker.admin.current_stats().await.unwrap();
    assert_eq!(
        (stats.enqueued, stats.in_progress, stats.scheduled, stats.retry, stats.dead),
        (0, 0, 0, 0, 0)
    );

    broker.writer.push_ready(&task(T1, "a")).await.unwrap();
    broker.writer.push_active(&task(T2, "b")).await.unwrap();
    broker
        .writer
        .add_scored(QueueName::Retry, &task(T3, "c"), 10.0)
        .await
        .unwrap();

    let stats = broker.admin.current_stats().await.unwrap();
    assert_eq!(stats.enqueued, 1);
    assert_eq!(stats.in_progress, 1);
    assert_eq!(stats.retry, 1);
    assert_eq!(stats.total(), 3);
}

#[tokio::test]
async fn retry_and_schedule_promotion() {
    let broker = TestBroker::new();
    let retry = task(T1, "sync").with_retry_limit(3).with_failure("timeout", 1);
    let scheduled = task(T2, "digest");
    broker.writer.add_scored(QueueName::Retry, &retry, 500.0).await.unwrap();
    broker
        .writer
        .add_scored(QueueName::Scheduled, &scheduled, 600.0)
        .await
        .unwrap();

    let listed = broker.admin.list_retry().await.unwrap();
    assert_eq!(listed[0].error_msg, "timeout");
    assert_eq!(listed[0].retried, 1);
    broker.admin.retry_now(&listed[0].id, listed[0].score).await.unwrap();

    let listed = broker.admin.list_scheduled().await.unwrap();
    broker.admin.process_now(&listed[0].id, listed[0].score).await.unwrap();

    let ready = broker.admin.list_enqueued().await.unwrap();
    assert_eq!(ready[0].id, scheduled.id);
    assert_eq!(ready[1].id, retry.id);

    let stats = broker.admin.current_stats().await.unwrap();
    assert_eq!((stats.enqueued, stats.scheduled, stats.retry), (2, 0, 0));
}

#[tokio::test]
async fn stale_score_is_not_found() {
    let broker = TestBroker::new();
    let t = task(T1, "noop");
    broker.writer.add_scored(QueueName::Dead, &t, 100.0).await.unwrap();
    // Re-scored after it was listed.
    broker.writer.add_scored(QueueName::Dead, &t, 200.0).await.unwrap();

    let err = broker.admin.rescue(&t.id, 100.0).await.unwrap_err();
    assert!(err.is_not_found());
    broker.admin.rescue(&t.id, 200.0).await.unwrap();
}

#[tokio::test]
async fn closed_store_fails_every_operation() {
    let broker = TestBroker::new();
    broker.admin.close();

    assert!(broker.admin.current_stats().await.unwrap_err().is_backend());
    assert!(broker.admin.list_dead().await.unwrap_err().is_backend());
    assert!(broker
        .admin
        .rescue(&TaskId::parse(T1).unwrap(), 1.0)
        .await
        .unwrap_err()
        .is_backend());
}
