//! Generation scenario tests
//!
//! Drive /api/generate against every reply shape the mock backend offers.

use std::time::Duration;

use crate::harness::{mock_image, GatewayTest, MockReply};

async fn generate_ok(gw: &GatewayTest, images: &[String]) -> serde_json::Value {
    let resp = gw.generate("  a banana on the moon  ", images).await.unwrap();
    assert_eq!(resp.status(), 200);
    resp.json().await.unwrap()
}

/// Test: Markdown-embedded image from a chat completion
#[tokio::test]
async fn test_generate_markdown_reply() {
    let gw = GatewayTest::start_logged_in().await.expect("Failed to start gateway");

    let body = generate_ok(&gw, &[]).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["image"], mock_image());
    assert_eq!(body["prompt"], "a banana on the moon");
    assert_eq!(body["inputImages"], serde_json::json!([]));
    assert!(body["timestamp"].is_string());

    // Upstream saw the trimmed prompt as plain text, with bearer auth
    let seen = gw.upstream.last_request().unwrap();
    assert_eq!(seen.authorization.as_deref(), Some("Bearer sk-test"));
    assert_eq!(seen.body["model"], "banana-pro");
    assert_eq!(seen.body["messages"][0]["role"], "user");
    assert_eq!(seen.body["messages"][0]["content"], "a banana on the moon");
}

/// Test: Reference images are sent before the prompt and echoed back
#[tokio::test]
async fn test_generate_with_reference_images() {
    let gw = GatewayTest::start_logged_in().await.expect("Failed to start gateway");

    let refs = vec![
        "data:image/png;base64,MQ==".to_string(),
        "data:image/jpeg;base64,Mg==".to_string(),
    ];
    let body = generate_ok(&gw, &refs).await;
    assert_eq!(body["inputImages"], serde_json::json!(refs));

    let seen = gw.upstream.last_request().unwrap();
    let parts = seen.body["messages"][0]["content"].as_array().unwrap().clone();
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0]["type"], "image_url");
    assert_eq!(parts[0]["image_url"]["url"], refs[0]);
    assert_eq!(parts[1]["image_url"]["url"], refs[1]);
    assert_eq!(parts[2]["type"], "text");
    assert_eq!(parts[2]["text"], "a banana on the moon");
}

/// Test: Bare data URL inside prose is recovered
#[tokio::test]
async fn test_generate_bare_data_url_reply() {
    let gw = GatewayTest::start_logged_in().await.expect("Failed to start gateway");
    gw.upstream.set_reply(MockReply::BareDataUrl);

    let body = generate_ok(&gw, &[]).await;
    assert_eq!(body["image"], mock_image());
}

/// Test: Image API b64_json is wrapped as a PNG data URL
#[tokio::test]
async fn test_generate_b64_json_reply() {
    let gw = GatewayTest::start_logged_in().await.expect("Failed to start gateway");
    gw.upstream.set_reply(MockReply::B64Json);

    let body = generate_ok(&gw, &[]).await;
    assert_eq!(body["image"], mock_image());
}

/// Test: Image API URL is passed through verbatim
#[tokio::test]
async fn test_generate_url_reply() {
    let gw = GatewayTest::start_logged_in().await.expect("Failed to start gateway");
    gw.upstream
        .set_reply(MockReply::Url("https://cdn.example/out.png".to_string()));

    let body = generate_ok(&gw, &[]).await;
    assert_eq!(body["image"], "https://cdn.example/out.png");
}

/// Test: Upstream failures surface as a generic 502
#[tokio::test]
async fn test_generate_upstream_failures() {
    let gw = GatewayTest::start_logged_in().await.expect("Failed to start gateway");

    for reply in [
        MockReply::Status(500),
        MockReply::Status(401),
        MockReply::ErrorPayload("content policy violation".to_string()),
        MockReply::NoImage,
        MockReply::NotJson,
    ] {
        gw.upstream.set_reply(reply.clone());
        let resp = gw.generate("a fox", &[]).await.unwrap();
        assert_eq!(resp.status(), 502, "reply {:?}", reply);

        let text = resp.text().await.unwrap();
        assert!(!text.contains("exploded"), "leaked body for {:?}", reply);
        assert!(!text.contains("content policy"), "leaked detail for {:?}", reply);
        assert!(!text.contains("cannot draw"), "leaked body for {:?}", reply);
        assert!(!text.contains("proxy page"), "leaked body for {:?}", reply);
    }

    // Exactly one upstream call per request, no retries
    assert_eq!(gw.upstream.calls(), 5);
}

/// Test: A backend slower than the timeout is an upstream failure
#[tokio::test]
async fn test_generate_upstream_timeout() {
    let mut gw = GatewayTest::start_with(|c| c.upstream_timeout_secs = 1)
        .await
        .expect("Failed to start gateway");
    gw.login().await.expect("login failed");
    gw.upstream.set_reply(MockReply::Slow(Duration::from_secs(3)));

    let resp = gw.generate("a fox", &[]).await.unwrap();
    assert_eq!(resp.status(), 502);
}

/// Test: Invalid input is rejected before any upstream call
#[tokio::test]
async fn test_generate_validation() {
    let gw = GatewayTest::start_logged_in().await.expect("Failed to start gateway");

    let resp = gw.generate("   ", &[]).await.unwrap();
    assert_eq!(resp.status(), 400);

    let resp = gw.generate(&"x".repeat(32_001), &[]).await.unwrap();
    assert_eq!(resp.status(), 400);

    let too_many: Vec<String> = (0..17).map(|_| mock_image()).collect();
    let resp = gw.generate("a fox", &too_many).await.unwrap();
    assert_eq!(resp.status(), 400);

    let resp = gw
        .generate("a fox", &[mock_image(), "data:image/png;base64,".to_string()])
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["message"].as_str().unwrap().contains("image 2"));

    // Missing prompt field is a validation failure too
    let resp = gw
        .post("/api/generate", &serde_json::json!({"images": null}))
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    assert_eq!(gw.upstream.calls(), 0);
}

/// Test: Malformed bodies get the JSON error shape, not a framework rejection
#[tokio::test]
async fn test_generate_malformed_body() {
    let gw = GatewayTest::start_logged_in().await.expect("Failed to start gateway");

    for body in [
        r#"{"prompt": 5}"#,
        r#"{"prompt": "a fox", "images": "nope"}"#,
        r#"{"prompt": "a fox", "images": [1, 2]}"#,
        "not json",
    ] {
        let resp = gw.post_raw("/api/generate", body).await.unwrap();
        assert_eq!(resp.status(), 400, "body {}", body);
        assert!(resp
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json")));

        let json: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(json["success"], false, "body {}", body);
        assert!(json["message"].is_string());
    }

    assert_eq!(gw.upstream.calls(), 0);
}

/// Test: Concurrent generations do not block each other
#[tokio::test]
async fn test_generate_in_parallel() {
    let gw = GatewayTest::start_logged_in().await.expect("Failed to start gateway");
    gw.upstream.set_reply(MockReply::Slow(Duration::from_millis(800)));

    let started = std::time::Instant::now();
    let (a, b, c) = tokio::join!(
        gw.generate("one", &[]),
        gw.generate("two", &[]),
        gw.generate("three", &[])
    );
    for resp in [a, b, c] {
        assert_eq!(resp.unwrap().status(), 200);
    }
    assert!(started.elapsed() < Duration::from_millis(2400));
}
