//! End-to-end tests for the upload / ask / complete / reset workflow.
//!
//! Requests go through the real router and session store; only the model
//! server is replaced by `MockInferenceEngine`.

use axum::http::StatusCode;
use integration_tests::{
    fixtures,
    setup::{is_within, TestContext},
};
use vqa_core::AnswerResult;

/// Full workflow: upload, ask, read history, complete, reset.
#[tokio::test]
async fn test_full_session_workflow() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let id = ctx.upload(&server).await;
    let image = ctx.image_path(&id).expect("fresh session should hold its image");
    assert!(is_within(&image, &ctx.upload_dir()));
    assert_eq!(std::fs::read(&image).unwrap(), fixtures::png_bytes());

    // Empty history right after upload
    let response = server.get(&format!("/api/vqa/session/{}", id)).await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["session_id"], id.to_string());
    assert_eq!(body["image_released"], false);
    assert_eq!(body["history"].as_array().unwrap().len(), 0);

    // Ask
    let response = server
        .post("/api/vqa/ask")
        .json(&fixtures::ask_body(id, "what color?"))
        .await;
    response.assert_status_ok();
    let answer: AnswerResult = response.json();
    assert_eq!(answer, AnswerResult::new("red", 0.9, true, 0.95));

    let calls = ctx.engine.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].image_path, image);
    assert_eq!(calls[0].question, "what color?");
    assert!(calls[0].image_present);

    // History holds the answer
    let body: serde_json::Value = server
        .get(&format!("/api/vqa/session/{}", id))
        .await
        .json();
    let history = body["history"].as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["question"], "what color?");
    assert_eq!(history[0]["answer"]["answer"], "red");
    assert_eq!(history[0]["answer"]["is_answerable"], true);
    assert!(history[0]["timestamp"].is_string());

    // Complete releases the image but keeps the session
    let response = server
        .post(&format!("/api/vqa/session/{}/complete", id))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert!(body["message"].as_str().unwrap().contains("completed"));
    assert!(!image.exists());

    let body: serde_json::Value = server
        .get(&format!("/api/vqa/session/{}", id))
        .await
        .json();
    assert_eq!(body["image_released"], true);
    assert_eq!(body["history"].as_array().unwrap().len(), 1);

    // Reset removes the session
    let response = server.delete(&format!("/api/vqa/session/{}", id)).await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["message"], "Session reset successfully");

    server
        .get(&format!("/api/vqa/session/{}", id))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

/// History keeps questions in the order they were asked.
#[tokio::test]
async fn test_history_preserves_question_order() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let id = ctx.upload(&server).await;

    let questions = ["what is this?", "is it food?", "what brand?"];
    for (i, question) in questions.iter().enumerate() {
        ctx.engine
            .set_answer(AnswerResult::new(format!("answer {}", i), 0.5, true, 0.8));
        server
            .post("/api/vqa/ask")
            .json(&fixtures::ask_body(id, question))
            .await
            .assert_status_ok();
    }

    let body: serde_json::Value = server
        .get(&format!("/api/vqa/session/{}", id))
        .await
        .json();
    let history = body["history"].as_array().unwrap();
    let asked: Vec<&str> = history
        .iter()
        .map(|h| h["question"].as_str().unwrap())
        .collect();
    assert_eq!(asked, questions);
    assert_eq!(history[2]["answer"]["answer"], "answer 2");
}

/// Questions are trimmed before they reach the engine and the history.
#[tokio::test]
async fn test_question_is_trimmed() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let id = ctx.upload(&server).await;

    server
        .post("/api/vqa/ask")
        .json(&fixtures::ask_body(id, "  what color?  \n"))
        .await
        .assert_status_ok();

    assert_eq!(ctx.engine.calls()[0].question, "what color?");
    let session = ctx.store.get(&id).unwrap();
    assert_eq!(session.history[0].question, "what color?");
}

/// Each upload gets its own session and file.
#[tokio::test]
async fn test_uploads_create_distinct_sessions() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let first = ctx.upload(&server).await;
    let second = ctx.upload(&server).await;

    assert_ne!(first, second);
    assert_ne!(ctx.image_path(&first), ctx.image_path(&second));
    assert_eq!(ctx.stored_files().len(), 2);
    assert_eq!(ctx.store.len(), 2);
}

/// Stored names keep a normalized extension and never the client's path.
#[tokio::test]
async fn test_stored_file_name_is_server_generated() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .post("/api/vqa/upload")
        .multipart(fixtures::upload_form(
            fixtures::png_bytes(),
            "../../Holiday Photo.JPG",
            "image/jpeg",
        ))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let id = uuid::Uuid::parse_str(body["session_id"].as_str().unwrap()).unwrap();

    let image = ctx.image_path(&id).unwrap();
    assert!(is_within(&image, &ctx.upload_dir()));
    let name = image.file_name().unwrap().to_str().unwrap();
    assert!(name.ends_with(&format!("_{}.jpg", id)), "unexpected name {name}");
}

/// An idle session expires on the next access and its file is deleted.
#[tokio::test]
async fn test_idle_session_expires() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let id = ctx.upload(&server).await;
    let image = ctx.image_path(&id).unwrap();

    ctx.expire_all();

    server
        .get(&format!("/api/vqa/session/{}", id))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    assert!(!image.exists());
    assert!(ctx.store.is_empty());
}

/// Activity keeps a session alive past its original deadline.
#[tokio::test]
async fn test_activity_renews_session() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let id = ctx.upload(&server).await;

    for _ in 0..3 {
        ctx.advance_secs(45);
        server
            .post("/api/vqa/ask")
            .json(&fixtures::ask_body(id, "still there?"))
            .await
            .assert_status_ok();
    }

    server
        .get(&format!("/api/vqa/session/{}", id))
        .await
        .assert_status_ok();
}

/// The sweep removes idle sessions nobody touches again.
#[tokio::test]
async fn test_sweep_cleans_abandoned_sessions() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let abandoned = ctx.upload(&server).await;
    let abandoned_image = ctx.image_path(&abandoned).unwrap();

    ctx.advance_secs(40);
    let active = ctx.upload(&server).await;
    ctx.advance_secs(30);

    assert_eq!(ctx.store.sweep(), 1);
    assert!(!abandoned_image.exists());
    assert_eq!(ctx.stored_files().len(), 1);

    server
        .get(&format!("/api/vqa/session/{}", active))
        .await
        .assert_status_ok();
}

/// Completing twice is harmless.
#[tokio::test]
async fn test_complete_is_repeatable() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let id = ctx.upload(&server).await;

    for _ in 0..2 {
        server
            .post(&format!("/api/vqa/session/{}/complete", id))
            .await
            .assert_status_ok();
    }
    assert!(ctx.stored_files().is_empty());
}
