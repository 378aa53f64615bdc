#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use inventory_admin::{app, AppState, Settings};
use serde_json::Value;
use tower::ServiceExt;

pub async fn test_state() -> AppState {
    let settings = Settings {
        database_url: "sqlite::memory:".into(),
        ..Default::default()
    };
    AppState::init(settings).await.expect("init state")
}

pub async fn test_app() -> (Router, AppState) {
    let state = test_state().await;
    (app(state.clone()), state)
}

/// Send one request; returns status, Location header (if any) and the JSON body (Null when empty).
pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Option<String>, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            builder = builder.header("content-type", "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(builder.body(body).expect("request"))
        .await
        .expect("response");
    let status = response.status();
    let location = response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, location, json)
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, _, body) = send(app, Method::GET, uri, None).await;
    (status, body)
}

pub async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let (status, _, body) = send(app, Method::POST, uri, Some(body)).await;
    (status, body)
}

/// Create a record through the admin form and return its id.
pub async fn create(app: &Router, view: &str, form: Value) -> i64 {
    let (status, body) = post(app, &format!("/admin/{}/new/", view), form).await;
    assert_eq!(status, StatusCode::CREATED, "create {}: {}", view, body);
    body["data"]["id"].as_i64().expect("id")
}
