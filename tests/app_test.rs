#![cfg(all(feature = "web", not(tarpaulin_include)))]

use analyzer::app::{AppState, router};
use analyzer::config::Config;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "analyzer-test-boundary";
const PEOPLE: &str = "id,name,active,score\n1,ann,True,3.5\n1,ann,True,3.5\n2,,False,1.0\n";

fn app() -> Router {
    router(Arc::new(AppState::new(Config::default())))
}

fn multipart(filename: &str, contents: &[u8]) -> Body {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(contents);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    Body::from(body)
}

async fn upload(app: &Router, cookie: Option<&str>, filename: &str, contents: &[u8]) -> Response {
    let mut request = Request::post("/api/upload").header(
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={BOUNDARY}"),
    );
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    app.clone()
        .oneshot(request.body(multipart(filename, contents)).unwrap())
        .await
        .unwrap()
}

async fn get(app: &Router, cookie: &str, uri: &str) -> Response {
    let request = Request::get(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

async fn post_json(app: &Router, cookie: &str, uri: &str, json: Value) -> Response {
    let request = Request::post(uri)
        .header(header::COOKIE, cookie)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json.to_string()))
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

fn session_cookie(response: &Response) -> String {
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("session cookie")
        .to_str()
        .unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Uploads the sample file in a fresh session and returns its cookie.
async fn loaded_session(app: &Router) -> String {
    let response = upload(app, None, "people.csv", PEOPLE.as_bytes()).await;
    assert_eq!(response.status(), StatusCode::OK);
    session_cookie(&response)
}

#[tokio::test]
async fn index_page_is_served() {
    let response = app()
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Data Analyzer"));
}

#[tokio::test]
async fn upload_returns_summary() {
    let app = app();
    let response = upload(&app, None, "people.csv", PEOPLE.as_bytes()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response);
    assert!(cookie.starts_with("session="));

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["filename"], "people.csv");
    assert_eq!(body["summary"]["overview"]["rows"], 3);
    assert_eq!(body["summary"]["overview"]["missing"], 1);
    assert_eq!(body["summary"]["overview"]["duplicates"], 1);
    assert_eq!(body["preview"]["rows"][2][1], Value::Null);

    let summary = body_json(get(&app, &cookie, "/api/summary").await).await;
    assert_eq!(summary["summary"]["overview"]["columns"], 4);
}

#[tokio::test]
async fn bad_uploads_leave_no_file_loaded() {
    let app = app();
    let cookie = loaded_session(&app).await;

    let response = upload(&app, Some(&cookie), "notes.txt", b"hello").await;
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let body = body_json(response).await;
    assert_eq!(body["status"], "error");

    let response = get(&app, &cookie, "/api/summary").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = upload(&app, Some(&cookie), "broken.xlsx", b"garbage").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn column_projection() {
    let app = app();
    let cookie = loaded_session(&app).await;

    let response = post_json(&app, &cookie, "/api/columns", serde_json::json!({"columns": ["score", "id"]})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["columns"], serde_json::json!(["id", "score"]));
    assert_eq!(body["rows"], 3);

    let response = post_json(&app, &cookie, "/api/columns", serde_json::json!({"columns": ["age"]})).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn charts_are_svg_and_errors_are_json() {
    let app = app();
    let cookie = loaded_session(&app).await;

    let response = post_json(
        &app,
        &cookie,
        "/api/chart",
        serde_json::json!({"kind": "bar", "x": "name", "y": "score"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/svg+xml");
    assert!(body_text(response).await.contains("<svg"));

    let response = post_json(
        &app,
        &cookie,
        "/api/chart",
        serde_json::json!({"kind": "histogram", "y": "name"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["status"], "error");

    let response = post_json(
        &app,
        &cookie,
        "/api/chart",
        serde_json::json!({"kind": "heatmap", "columns": ["id", "name"]}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["status"], "warning");

    let response = post_json(&app, &cookie, "/api/chart", serde_json::json!({"kind": "radar"})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn dashboard_and_reset() {
    let app = app();
    let cookie = loaded_session(&app).await;

    let body = body_json(get(&app, &cookie, "/api/dashboard").await).await;
    assert_eq!(body["dashboard"]["metrics"][0]["label"], "Rows");
    assert_eq!(body["dashboard"]["metrics"][0]["value"], 3);
    assert_eq!(body["dashboard"]["metrics"][2]["value"], 1);

    let response = get(&app, &cookie, "/api/dashboard/chart").await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_json(&app, &cookie, "/api/reset", Value::Null).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = get(&app, &cookie, "/api/dashboard").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn dashboard_chart_without_numeric_columns_is_empty() {
    let app = app();
    let response = upload(&app, None, "names.csv", b"name\nann\nbob\n").await;
    let cookie = session_cookie(&response);
    let response = get(&app, &cookie, "/api/dashboard/chart").await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn export_downloads_projection() {
    let app = app();
    let cookie = loaded_session(&app).await;

    let response = post_json(
        &app,
        &cookie,
        "/api/export?format=csv",
        serde_json::json!({"columns": ["name", "id"]}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert!(disposition.contains("people.csv"));
    assert_eq!(body_text(response).await, "id,name\n1,ann\n1,ann\n2,\n");

    let response = post_json(
        &app,
        &cookie,
        "/api/export?format=xlsx",
        serde_json::json!({"columns": []}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_json(
        &app,
        &cookie,
        "/api/export?format=pdf",
        serde_json::json!({"columns": []}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn requests_without_a_file_are_not_found() {
    let response = app()
        .oneshot(Request::get("/api/summary").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.headers().contains_key(header::SET_COOKIE));
}

#[tokio::test]
async fn unplottable_ranges_answer_with_a_json_error() {
    let app = app();
    let response = upload(&app, None, "wide.csv", b"g,v\na,-1e308\nb,1e308\n").await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response);

    let response = post_json(
        &app,
        &cookie,
        "/api/chart",
        serde_json::json!({"kind": "histogram", "y": "v"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["status"], "error");

    // opposite extremes still average to 0
    let response = get(&app, &cookie, "/api/dashboard/chart").await;
    assert_eq!(response.status(), StatusCode::OK);
}
