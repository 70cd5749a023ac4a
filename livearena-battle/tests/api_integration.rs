//! Integration tests for the LiveArena Battle HTTP API
//!
//! Drives the router with `oneshot` requests:
//! - Health and build info
//! - Battle lifecycle, gifts and votes
//! - Structured error bodies
//! - Duet tips and splits

mod support;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use livearena_battle::build_router;
use livearena_battle::error::ResourceError;
use livearena_battle::services::InMemoryMediaCapture;
use serde_json::{json, Value};
use support::{harness, harness_with};
use tower::ServiceExt;
use uuid::Uuid;

/// Send one request and decode the JSON body (if any)
async fn make_request(app: &axum::Router, method: Method, path: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(path);
    let body = match body {
        Some(json_body) => {
            request = request.header("content-type", "application/json");
            Body::from(json_body.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(request.body(body).expect("request"))
        .await
        .expect("response");

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

fn battle_body(entry_fee: u64) -> Value {
    json!({
        "title": "Saturday Showdown",
        "duration_secs": 300,
        "creators": [
            {"id": "alice", "username": "alice", "display_name": "Alice", "is_host": true},
            {"id": "bob", "username": "bob", "display_name": "Bob"}
        ],
        "scoring_method": "hybrid",
        "allow_voting": true,
        "allow_gifts": true,
        "entry_fee": entry_fee
    })
}

async fn create_live_battle(app: &axum::Router) -> String {
    let (status, body) = make_request(app, Method::POST, "/battles", Some(battle_body(10))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "live");
    body["battle_id"].as_str().expect("battle id").to_string()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = build_router(harness().state);

    let (status, body) = make_request(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "livearena-battle");

    let (status, body) = make_request(&app, Method::GET, "/buildinfo", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["git_hash"].is_string());
}

#[tokio::test]
async fn test_gift_catalog_listing() {
    let app = build_router(harness().state);
    let (status, body) = make_request(&app, Method::GET, "/gifts", None).await;
    assert_eq!(status, StatusCode::OK);
    let gifts = body.as_array().expect("array");
    assert_eq!(gifts.len(), 7);
    assert_eq!(gifts[0]["id"], "rose");
}

#[tokio::test]
async fn test_battle_round_trip() {
    let h = harness();
    let app = build_router(h.state);
    let id = create_live_battle(&app).await;

    let (status, gift) = make_request(
        &app,
        Method::POST,
        &format!("/battles/{}/gifts", id),
        Some(json!({"sender_id": "fan", "recipient_id": "alice", "gift_id": "crown", "quantity": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(gift["total_value"], 100);
    assert_eq!(gift["sequence"], 1);

    let (status, _) = make_request(
        &app,
        Method::POST,
        &format!("/battles/{}/votes", id),
        Some(json!({"voter_id": "v1", "creator_id": "bob"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, state) = make_request(&app, Method::GET, &format!("/battles/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state["creators"][0]["score"], 100);
    assert_eq!(state["creators"][1]["score"], 10);
    assert_eq!(state["prize_pot"], 200);

    let (status, log) = make_request(&app, Method::GET, &format!("/battles/{}/log?since=1", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(log.as_array().expect("entries").len(), 1);

    let (status, settlement) = make_request(
        &app,
        Method::POST,
        &format!("/battles/{}/end", id),
        Some(json!({"reason": "stopped"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settlement["distribution"]["winner_share"], 120);
    assert!(settlement["error"].is_null());

    assert_eq!(h.ledger.balance("alice").await, 120);

    let (status, body) = make_request(
        &app,
        Method::POST,
        &format!("/battles/{}/gifts", id),
        Some(json!({"sender_id": "fan", "recipient_id": "bob", "gift_id": "rose"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "STATE_ERROR");
}

#[tokio::test]
async fn test_duplicate_vote_is_conflict() {
    let app = build_router(harness().state);
    let id = create_live_battle(&app).await;
    let path = format!("/battles/{}/votes", id);
    let vote = json!({"voter_id": "v1", "creator_id": "alice"});

    let (status, _) = make_request(&app, Method::POST, &path, Some(vote.clone())).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = make_request(&app, Method::POST, &path, Some(vote)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "ALREADY_VOTED");
    assert!(body["error"]["message"]
        .as_str()
        .expect("message")
        .contains("you already voted in this battle"));
}

#[tokio::test]
async fn test_unknown_gift_is_bad_request() {
    let app = build_router(harness().state);
    let id = create_live_battle(&app).await;

    let (status, body) = make_request(
        &app,
        Method::POST,
        &format!("/battles/{}/gifts", id),
        Some(json!({"sender_id": "fan", "recipient_id": "alice", "gift_id": "unicorn"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_unknown_battle_is_not_found() {
    let app = build_router(harness().state);
    let (status, body) = make_request(&app, Method::GET, &format!("/battles/{}", Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_media_failure_keeps_battle_waiting() {
    let media = InMemoryMediaCapture::new();
    media
        .fail_next(
            "bob",
            ResourceError::DeviceBusy {
                participant_id: "bob".to_string(),
            },
        )
        .await;
    let h = harness_with(
        livearena_battle::config::TimerConfig {
            tick_interval_ms: 1000,
            auto_tick: false,
        },
        media,
    );
    let app = build_router(h.state);

    let id = Uuid::new_v4();
    let mut body = battle_body(10);
    body["battle_id"] = json!(id);
    let (status, err) = make_request(&app, Method::POST, "/battles", Some(body)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(err["error"]["code"], "RESOURCE_ERROR");
    assert_eq!(h.media.active_streams().await, 0);

    let (_, state) = make_request(&app, Method::GET, &format!("/battles/{}", id), None).await;
    assert_eq!(state["status"], "waiting");

    let (status, state) = make_request(&app, Method::POST, &format!("/battles/{}/start", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state["status"], "live");
    assert_eq!(h.media.active_streams().await, 2);
}

#[tokio::test]
async fn test_duet_split_and_tip() {
    let h = harness();
    let app = build_router(h.state);

    let (status, split) = make_request(
        &app,
        Method::POST,
        "/duets/split",
        Some(json!({"amount": 100, "revenue_share_percentage": 50})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(split["platform_fee"], 5);
    assert_eq!(split["original_creator_share"], 48);
    assert_eq!(split["duet_creator_share"], 47);

    let (status, duet) = make_request(
        &app,
        Method::POST,
        "/duets",
        Some(json!({
            "original_creator_id": "orig",
            "duet_creator_id": "remixer",
            "config": {
                "duet_type": "side_by_side",
                "layout_position": "left",
                "audio_mix": "mixed",
                "revenue_share_percentage": 50,
                "allow_tips": true,
                "allow_comments": true
            }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let duet_id = duet["id"].as_str().expect("duet id").to_string();

    let (status, tip) = make_request(
        &app,
        Method::POST,
        &format!("/duets/{}/tips", duet_id),
        Some(json!({"tipper_id": "fan", "amount": 100})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tip["tip"]["settled"], true);
    assert_eq!(h.ledger.balance("orig").await, 48);
    assert_eq!(h.ledger.balance("remixer").await, 47);

    let (status, tips) = make_request(&app, Method::GET, &format!("/duets/{}/tips", duet_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tips.as_array().expect("tips").len(), 1);
}
