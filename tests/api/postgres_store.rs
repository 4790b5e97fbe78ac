use serde_json::{json, Value};

use crate::helpers::PostgresTestApp;
use digest_registry::{
    domain::{new_subscriber::SubscribeRequest, subscriber_status::SubscriberStatus, topic::Topic},
    registry::{SubscribeOutcome, UnsubscribeOutcome, UnsubscribeRequest},
};

async fn outcome(response: reqwest::Response) -> (u16, String) {
    let status = response.status().as_u16();
    let body: Value = response.json().await.expect("Response body is not JSON.");

    (status, body["outcome"].as_str().unwrap_or_default().to_string())
}

#[tokio::test]
async fn subscriber_lifecycle_is_persisted_in_postgres() {
    let test_app = PostgresTestApp::spawn_app().await;

    let created = test_app
        .post_subscription(json!({ "email": "a@b.com", "fields": ["cs", "physics"] }))
        .await;
    assert_eq!(outcome(created).await, (201, "created".to_string()));

    let repeated = test_app
        .post_subscription(json!({ "email": "a@b.com", "fields": ["math"] }))
        .await;
    assert_eq!(outcome(repeated).await, (409, "already_active".to_string()));
    let subscriber = test_app.stored_subscriber("a@b.com").await.unwrap();
    assert_eq!(subscriber.status, SubscriberStatus::Active);
    assert!(subscriber.preferred_fields.includes(Topic::Cs));
    assert!(subscriber.preferred_fields.includes(Topic::Physics));
    assert!(!subscriber.preferred_fields.includes(Topic::Math));

    let unsubscribed = test_app
        .post_unsubscribe(json!({ "email": "a@b.com" }))
        .await;
    assert_eq!(200, unsubscribed.status().as_u16());
    let subscriber = test_app.stored_subscriber("a@b.com").await.unwrap();
    assert_eq!(subscriber.status, SubscriberStatus::Unsubscribed);

    let reactivated = test_app
        .post_subscription(json!({ "email": "a@b.com", "fields": ["math"] }))
        .await;
    assert_eq!(outcome(reactivated).await, (200, "reactivated".to_string()));
    let subscriber = test_app.stored_subscriber("a@b.com").await.unwrap();
    assert_eq!(subscriber.status, SubscriberStatus::Active);
    assert_eq!(
        subscriber.preferred_fields.topics().collect::<Vec<_>>(),
        vec![Topic::Math]
    );
    assert_eq!(test_app.subscriber_count().await, 1);
}

#[tokio::test]
async fn empty_fields_are_stored_as_null() {
    let test_app = PostgresTestApp::spawn_app().await;

    test_app
        .post_subscription(json!({ "email": "all@b.com" }))
        .await;

    let stored: Option<Vec<String>> =
        sqlx::query_scalar("SELECT preferred_fields FROM subscribers WHERE email = $1")
            .bind("all@b.com")
            .fetch_one(&test_app.db_pool)
            .await
            .expect("Failed to fetch saved subscriber.");
    assert_eq!(stored, None);
    let subscriber = test_app.stored_subscriber("all@b.com").await.unwrap();
    assert!(subscriber.preferred_fields.is_all_topics());
}

#[tokio::test]
async fn unsubscribing_an_unknown_email_writes_nothing() {
    let test_app = PostgresTestApp::spawn_app().await;

    let outcome = test_app
        .registry
        .unsubscribe(UnsubscribeRequest {
            email: "ghost@b.com".to_string(),
        })
        .await;

    assert_eq!(outcome.unwrap(), UnsubscribeOutcome::NotFound);
    assert_eq!(test_app.subscriber_count().await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_subscriptions_insert_a_single_row() {
    let test_app = PostgresTestApp::spawn_app().await;

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let registry = test_app.registry.clone();
            tokio::spawn(async move {
                registry
                    .subscribe(SubscribeRequest::new("race@b.com", &["cs"]))
                    .await
            })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            SubscribeOutcome::Created => created += 1,
            SubscribeOutcome::AlreadyActive => {}
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(test_app.subscriber_count().await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_unsubscriptions_change_the_row_once() {
    let test_app = PostgresTestApp::spawn_app().await;
    test_app
        .registry
        .subscribe(SubscribeRequest::new("race@b.com", &[]))
        .await
        .unwrap();

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let registry = test_app.registry.clone();
            tokio::spawn(async move {
                registry
                    .unsubscribe(UnsubscribeRequest {
                        email: "race@b.com".to_string(),
                    })
                    .await
            })
        })
        .collect();

    let mut unsubscribed = 0;
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            UnsubscribeOutcome::Unsubscribed => unsubscribed += 1,
            UnsubscribeOutcome::AlreadyUnsubscribed => {}
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    assert_eq!(unsubscribed, 1);
}
