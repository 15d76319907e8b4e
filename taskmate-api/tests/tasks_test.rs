/// Router tests for tasks and their attachments

mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use common::{read_body, read_json, TestContext, TestUser};
use serde_json::{json, Value};

const BOUNDARY: &str = "taskmate-test-boundary";

fn multipart_body(field: &str, file_name: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

async fn upload(ctx: &TestContext, user: &TestUser, task_id: &str, field: &str, data: &[u8]) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/tasks/{}/file", task_id))
        .header(header::AUTHORIZATION, user.bearer())
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(field, "notes.txt", data)))
        .unwrap();

    read_json(ctx.send(request).await).await
}

fn titles(tasks: &Value) -> Vec<&str> {
    tasks
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn test_tasks_require_authentication() {
    let ctx = TestContext::new();

    let (status, _) = ctx
        .request(Method::POST, "/tasks", None, Some(json!({ "title": "x" })))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_and_get_task() {
    let ctx = TestContext::new();
    let user = ctx.verified_user("ada@example.com").await;

    let task = ctx
        .create_task(
            &user,
            json!({
                "title": "Write report",
                "description": "Quarterly numbers",
                "due_date": "2030-01-15T09:00:00Z",
            }),
        )
        .await;

    assert_eq!(task["title"], "Write report");
    assert_eq!(task["user_id"], user.id.as_str());
    assert_eq!(task["is_completed"], false);
    assert!(task["completed_at"].is_null());

    let uri = format!("/tasks/{}", task["id"].as_str().unwrap());
    let (status, fetched) = ctx.request(Method::GET, &uri, Some(&user.bearer()), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, task);
}

#[tokio::test]
async fn test_create_completed_task_sets_completed_at() {
    let ctx = TestContext::new();
    let user = ctx.verified_user("ada@example.com").await;

    let task = ctx
        .create_task(&user, json!({ "title": "Done already", "is_completed": true }))
        .await;

    assert_eq!(task["is_completed"], true);
    assert!(task["completed_at"].is_string());
}

#[tokio::test]
async fn test_create_task_validates_title() {
    let ctx = TestContext::new();
    let user = ctx.verified_user("ada@example.com").await;

    let (status, body) = ctx
        .request(Method::POST, "/tasks", Some(&user.bearer()), Some(json!({ "title": "" })))
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "title");

    let long = "x".repeat(256);
    let (status, _) = ctx
        .request(Method::POST, "/tasks", Some(&user.bearer()), Some(json!({ "title": long })))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_task_limit_is_enforced() {
    let ctx = TestContext::new();
    let user = ctx.verified_user("ada@example.com").await;

    for i in 0..50 {
        ctx.create_task(&user, json!({ "title": format!("task {}", i) })).await;
    }

    let (status, body) = ctx
        .request(Method::POST, "/tasks", Some(&user.bearer()), Some(json!({ "title": "one more" })))
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "max number of tasks reached");
}

#[tokio::test]
async fn test_task_limit_follows_configuration() {
    let ctx = TestContext::with_config(common::test_config(&[("MAX_TASKS", "1")]), true);
    let user = ctx.verified_user("ada@example.com").await;

    ctx.create_task(&user, json!({ "title": "only" })).await;
    let (status, _) = ctx
        .request(Method::POST, "/tasks", Some(&user.bearer()), Some(json!({ "title": "second" })))
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_list_tasks_empty_is_not_found() {
    let ctx = TestContext::new();
    let user = ctx.verified_user("ada@example.com").await;

    let (status, body) = ctx.request(Method::GET, "/tasks", Some(&user.bearer()), None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "there are no tasks");
}

#[tokio::test]
async fn test_list_tasks_sorted_and_searched() {
    let ctx = TestContext::new();
    let ada = ctx.verified_user("ada@example.com").await;
    let bob = ctx.verified_user("bob@example.com").await;

    ctx.create_task(&ada, json!({ "title": "Buy milk", "due_date": "2030-03-01T00:00:00Z" }))
        .await;
    ctx.create_task(&ada, json!({ "title": "Call mom" })).await;
    ctx.create_task(&ada, json!({ "title": "Buy bread", "due_date": "2030-02-01T00:00:00Z" }))
        .await;
    ctx.create_task(&bob, json!({ "title": "Buy nothing" })).await;

    let (status, tasks) = ctx.request(Method::GET, "/tasks", Some(&ada.bearer()), None).await;
    assert_eq!(status, StatusCode::OK);
    // Due date ascending, tasks without one last
    assert_eq!(titles(&tasks), vec!["Buy bread", "Buy milk", "Call mom"]);

    let (_, tasks) = ctx
        .request(Method::GET, "/tasks?sort=title", Some(&ada.bearer()), None)
        .await;
    assert_eq!(titles(&tasks), vec!["Buy bread", "Buy milk", "Call mom"]);

    let (status, tasks) = ctx
        .request(Method::GET, "/tasks?search=Buy&sort=created_at", Some(&ada.bearer()), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(titles(&tasks), vec!["Buy milk", "Buy bread"]);

    // Search is case-sensitive
    let (status, _) = ctx
        .request(Method::GET, "/tasks?search=buy", Some(&ada.bearer()), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_tasks_rejects_unknown_sort() {
    let ctx = TestContext::new();
    let user = ctx.verified_user("ada@example.com").await;
    ctx.create_task(&user, json!({ "title": "a" })).await;

    let (status, body) = ctx
        .request(Method::GET, "/tasks?sort=priority", Some(&user.bearer()), None)
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "sort");
}

#[tokio::test]
async fn test_other_users_task_is_forbidden() {
    let ctx = TestContext::new();
    let ada = ctx.verified_user("ada@example.com").await;
    let bob = ctx.verified_user("bob@example.com").await;
    let task = ctx.create_task(&ada, json!({ "title": "private" })).await;
    let uri = format!("/tasks/{}", task["id"].as_str().unwrap());

    for method in [Method::GET, Method::DELETE] {
        let (status, _) = ctx.request(method, &uri, Some(&bob.bearer()), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    let (status, _) = ctx
        .request(Method::PATCH, &uri, Some(&bob.bearer()), Some(json!({ "title": "mine" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_missing_task_is_not_found() {
    let ctx = TestContext::new();
    let user = ctx.verified_user("ada@example.com").await;
    let missing = uuid::Uuid::new_v4();

    let (status, body) = ctx
        .request(Method::GET, &format!("/tasks/{}", missing), Some(&user.bearer()), None)
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], format!("task with id: {} does not exist", missing));
}

#[tokio::test]
async fn test_update_task_tracks_completion() {
    let ctx = TestContext::new();
    let user = ctx.verified_user("ada@example.com").await;
    let task = ctx.create_task(&user, json!({ "title": "Draft" })).await;
    let uri = format!("/tasks/{}", task["id"].as_str().unwrap());

    let (status, updated) = ctx
        .request(
            Method::PUT,
            &uri,
            Some(&user.bearer()),
            Some(json!({ "title": "Final", "is_completed": true })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Final");
    assert_eq!(updated["is_completed"], true);
    assert!(updated["completed_at"].is_string());

    let (_, reopened) = ctx
        .request(Method::PATCH, &uri, Some(&user.bearer()), Some(json!({ "is_completed": false })))
        .await;
    assert_eq!(reopened["is_completed"], false);
    assert!(reopened["completed_at"].is_null());
    assert_eq!(reopened["title"], "Final");
}

#[tokio::test]
async fn test_delete_task() {
    let ctx = TestContext::new();
    let user = ctx.verified_user("ada@example.com").await;
    let task = ctx.create_task(&user, json!({ "title": "Temporary" })).await;
    let uri = format!("/tasks/{}", task["id"].as_str().unwrap());

    let (status, body) = ctx.request(Method::DELETE, &uri, Some(&user.bearer()), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());

    let (status, _) = ctx.request(Method::GET, &uri, Some(&user.bearer()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_and_download_attachment() {
    let ctx = TestContext::new();
    let user = ctx.verified_user("ada@example.com").await;
    let task = ctx.create_task(&user, json!({ "title": "With file" })).await;
    let task_id = task["id"].as_str().unwrap();

    let (status, body) = upload(&ctx, &user, task_id, "file", b"hello attachment").await;
    assert_eq!(status, StatusCode::CREATED);

    let message = body["message"].as_str().unwrap();
    assert!(message.starts_with("successfully attached file: notes.txt (file_id: "));
    let file_id = message
        .trim_end_matches(')')
        .rsplit("file_id: ")
        .next()
        .unwrap();

    let request = Request::builder()
        .uri(format!("/tasks/{}/file/{}", task_id, file_id))
        .header(header::AUTHORIZATION, user.bearer())
        .body(Body::empty())
        .unwrap();
    let response = ctx.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/octet-stream"
    );
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"notes.txt\""
    );
    assert_eq!(read_body(response).await, b"hello attachment".to_vec());
}

#[tokio::test]
async fn test_upload_requires_file_field() {
    let ctx = TestContext::new();
    let user = ctx.verified_user("ada@example.com").await;
    let task = ctx.create_task(&user, json!({ "title": "With file" })).await;

    let (status, body) = upload(&ctx, &user, task["id"].as_str().unwrap(), "document", b"x").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "missing multipart field: file");
}

#[tokio::test]
async fn test_upload_to_other_users_task_is_forbidden() {
    let ctx = TestContext::new();
    let ada = ctx.verified_user("ada@example.com").await;
    let bob = ctx.verified_user("bob@example.com").await;
    let task = ctx.create_task(&ada, json!({ "title": "Ada's" })).await;

    let (status, _) = upload(&ctx, &bob, task["id"].as_str().unwrap(), "file", b"x").await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(ctx.store.attachment_count(), 0);
}

#[tokio::test]
async fn test_download_missing_file_is_not_found() {
    let ctx = TestContext::new();
    let user = ctx.verified_user("ada@example.com").await;
    let task = ctx.create_task(&user, json!({ "title": "No files" })).await;
    let missing = uuid::Uuid::new_v4();

    let (status, body) = ctx
        .request(
            Method::GET,
            &format!("/tasks/{}/file/{}", task["id"].as_str().unwrap(), missing),
            Some(&user.bearer()),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], format!("file with id: {} not found", missing));
}

#[tokio::test]
async fn test_task_collection_accepts_trailing_slash() {
    let ctx = TestContext::new();
    let user = ctx.verified_user("ada@example.com").await;

    let (status, task) = ctx
        .request(Method::POST, "/tasks/", Some(&user.bearer()), Some(json!({ "title": "slashed" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(task["title"], "slashed");

    let (status, tasks) = ctx.request(Method::GET, "/tasks/", Some(&user.bearer()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(titles(&tasks), vec!["slashed"]);

    let (status, _) = ctx.request(Method::GET, "/tasks/", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
