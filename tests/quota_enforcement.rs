//! Charge-on-success quota enforcement over a real listener.

use serde_json::json;

mod common;

#[tokio::test]
async fn test_full_quota_drains_to_zero_then_429() {
    let gateway = common::start_gateway(common::test_config()).await;
    let (client, _) = gateway.client_from("203.0.113.1").registered().await.unwrap();

    for expected in (0..100u64).rev() {
        let resp = client.list_items().await.unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.remaining_after(), Some(expected));
    }

    let resp = client.list_items().await.unwrap();
    assert_eq!(resp.status, 429);
    assert_eq!(resp.body["requestsRemaining"], 0);

    let resp = client.list_items().await.unwrap();
    assert_eq!(resp.status, 429);
    assert_eq!(resp.body["requestsRemaining"], 0);
}

#[tokio::test]
async fn test_failed_calls_are_free() {
    let gateway = common::start_gateway(common::test_config()).await;
    let (client, _) = gateway.client_from("203.0.113.2").registered().await.unwrap();

    let resp = client.update_item(999, "ghost").await.unwrap();
    assert_eq!(resp.status, 404);
    assert!(resp.remaining_after().is_none());

    assert_eq!(client.delete_item(999).await.unwrap().status, 404);
    assert_eq!(client.create_item("   ").await.unwrap().status, 400);
    assert_eq!(client.get_item(999).await.unwrap().status, 404);

    let resp = client.create_item("widget").await.unwrap();
    assert_eq!(resp.status, 201);
    assert_eq!(resp.remaining_after(), Some(99));
}

#[tokio::test]
async fn test_crud_round() {
    let gateway = common::start_gateway(common::test_config()).await;
    let (client, _) = gateway.client_from("203.0.113.3").registered().await.unwrap();

    let created = client.create_item("lamp").await.unwrap();
    let id = created.body["id"].as_u64().unwrap();

    let updated = client.update_item(id, "desk lamp").await.unwrap();
    assert_eq!(updated.body["name"], "desk lamp");

    let fetched = client.get_item(id).await.unwrap();
    assert_eq!(fetched.body["name"], "desk lamp");

    let listed = client.list_items().await.unwrap();
    assert_eq!(listed.body["count"], 1);

    let deleted = client.delete_item(id).await.unwrap();
    assert_eq!(deleted.status, 200);
    assert_eq!(deleted.remaining_after(), Some(95));
}

#[tokio::test]
async fn test_recharge_at_zero_reopens_access() {
    let mut config = common::test_config();
    config.quota.initial_requests = 1;
    let gateway = common::start_gateway(config).await;
    let (client, _) = gateway.client_from("203.0.113.4").registered().await.unwrap();

    assert_eq!(client.list_items().await.unwrap().remaining_after(), Some(0));
    assert_eq!(client.list_items().await.unwrap().status, 429);

    let resp = client.recharge(Some(json!(50))).await.unwrap();
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body["newRequestsRemaining"], 50);
    assert_eq!(resp.body["requestsRemainingAfter"], 50);

    assert_eq!(client.list_items().await.unwrap().remaining_after(), Some(49));
}

#[tokio::test]
async fn test_recharge_amount_handling() {
    let gateway = common::start_gateway(common::test_config()).await;
    let (client, _) = gateway.client_from("203.0.113.5").registered().await.unwrap();

    let resp = client.recharge(None).await.unwrap();
    assert_eq!(resp.body["newRequestsRemaining"], 200);

    let resp = client.recharge(Some(json!("not a number"))).await.unwrap();
    assert_eq!(resp.body["newRequestsRemaining"], 300);

    let resp = client.recharge(Some(json!(-40))).await.unwrap();
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body["newRequestsRemaining"], 300);
}

#[tokio::test]
async fn test_authentication_failures_are_identical() {
    let gateway = common::start_gateway(common::test_config()).await;
    let (client, registration) = gateway.client_from("203.0.113.6").registered().await.unwrap();

    let missing = gateway.client().list_items().await.unwrap();
    let malformed = gateway.client().with_token("").list_items().await.unwrap();
    let unknown = gateway
        .client()
        .with_token("00000000-0000-0000-0000-000000000000")
        .list_items()
        .await
        .unwrap();

    for resp in [&missing, &malformed, &unknown] {
        assert_eq!(resp.status, 401);
        assert_eq!(resp.body, missing.body);
    }

    let raw = reqwest::Client::new()
        .get(format!("{}/items", gateway.base_url))
        .header("Authorization", registration.token.as_str())
        .send()
        .await
        .unwrap();
    assert_eq!(raw.status(), 401);
    let raw_body: serde_json::Value = raw.json().await.unwrap();
    assert_eq!(raw_body, missing.body);

    assert!(client.list_items().await.unwrap().is_success());
}

#[tokio::test]
async fn test_hot_reload_changes_new_registrations() {
    let gateway = common::start_gateway(common::test_config()).await;

    let mut reloaded = common::test_config();
    reloaded.quota.initial_requests = 5;
    reloaded.quota.default_recharge = 10;
    gateway.reload(reloaded).await;

    let (client, registration) = gateway.client_from("203.0.113.7").registered().await.unwrap();
    assert_eq!(registration.requests_remaining, 5);
    let resp = client.recharge(None).await.unwrap();
    assert_eq!(resp.body["newRequestsRemaining"], 15);
}

#[tokio::test]
async fn test_ping_is_public() {
    let gateway = common::start_gateway(common::test_config()).await;
    let resp = gateway.client().ping().await.unwrap();
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, json!({ "message": "pong" }));
}
