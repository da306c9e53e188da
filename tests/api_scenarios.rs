//! End-to-end scenarios against the assembled router, using in-memory
//! SQLite and a temp-dir object store.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use trinket::{
    routes::routes::routes,
    services::{market_service::MarketService, object_store::ObjectStore},
};
use uuid::Uuid;

const BOUNDARY: &str = "trinket-test-boundary";
const BASE_URL: &str = "http://localhost:3000";

async fn app() -> (Router, TempDir) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    for stmt in include_str!("../migrations/0001_init.sql")
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        sqlx::query(stmt).execute(&pool).await.unwrap();
    }

    let dir = tempfile::tempdir().unwrap();
    let objects = ObjectStore::new(dir.path(), "test-secret", BASE_URL);
    let service = MarketService::new(Arc::new(pool), objects, 3600);
    (routes().with_state(service), dir)
}

fn form_part(name: &str, value: &str) -> String {
    format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
    )
}

fn file_part(name: &str, filename: &str, content_type: &str, bytes: &str) -> String {
    format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; \
         filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n{bytes}\r\n"
    )
}

fn multipart_request(method: &str, uri: &str, parts: &[String]) -> Request<Body> {
    let mut body = parts.concat();
    body.push_str(&format!("--{BOUNDARY}--\r\n"));
    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn market_crud_scenario() {
    let (app, _dir) = app().await;
    let user = Uuid::new_v4();

    // Create without an image: normal case, null image key.
    let (status, body) = send(
        &app,
        multipart_request(
            "POST",
            &format!("/api/custom_market/{user}"),
            &[
                form_part("name", "Spring Fair"),
                form_part("startdate", "2025-05-01"),
                form_part("enddate", "2025-05-03"),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let market = &body["insertMarket"];
    assert_eq!(market["name"], "Spring Fair");
    assert_eq!(market["img_name"], Value::Null);
    let market_uuid = market["uuid"].as_str().unwrap().to_string();

    // Rename only: dates must survive.
    let (status, body) = send(
        &app,
        multipart_request(
            "PATCH",
            &format!("/api/custom_market/{market_uuid}/{user}"),
            &[form_part("name", "Spring Fair 2")],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let updated = &body["updatedMarket"];
    assert_eq!(updated["name"], "Spring Fair 2");
    assert_eq!(updated["startdate"], "2025-05-01");
    assert_eq!(updated["enddate"], "2025-05-03");

    // Empty update set.
    let (status, _) = send(
        &app,
        multipart_request(
            "PATCH",
            &format!("/api/custom_market/{market_uuid}/{user}"),
            &[],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Unknown market.
    let (status, _) = send(
        &app,
        multipart_request(
            "PATCH",
            &format!("/api/custom_market/{}/{user}", Uuid::new_v4()),
            &[form_part("name", "Ghost Fair")],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Field not on the allow-list.
    let (status, _) = send(
        &app,
        multipart_request(
            "PATCH",
            &format!("/api/custom_market/{market_uuid}/{user}"),
            &[form_part("user_uuid", &Uuid::new_v4().to_string())],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn image_upload_and_signed_url_redemption() {
    let (app, _dir) = app().await;
    let user = Uuid::new_v4();

    let (status, body) = send(
        &app,
        multipart_request(
            "POST",
            &format!("/api/custom_market/{user}"),
            &[
                form_part("name", "Summer Fair"),
                form_part("startdate", "2025-07-01"),
                form_part("enddate", "2025-07-02"),
                file_part("image", "summer.jpg", "image/jpeg", "jpeg bytes"),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let key = body["insertMarket"]["img_name"].as_str().unwrap();
    assert!(key.contains(&user.to_string()));
    assert!(key.ends_with("summer.jpg"));

    // The list carries a signed URL pointing back at this service.
    let (status, body) = send(
        &app,
        Request::builder()
            .uri(format!("/api/custom_market/{user}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let url = body["markets"][0]["img_url"].as_str().unwrap();
    let path = url.strip_prefix(BASE_URL).unwrap();

    let response = app
        .clone()
        .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "image/jpeg"
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"jpeg bytes");

    // Tampering with the signature turns the URL into a 404.
    let tampered = format!("{path}X");
    let (status, _) = send(
        &app,
        Request::builder().uri(tampered).body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn readyz_reports_failures_without_internal_detail() {
    let (app, _dir) = app().await;

    let (status, body) = send(
        &app,
        Request::builder().uri("/readyz").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    // An app whose storage root is gone must degrade to 503 with a fixed
    // check label, not the underlying IO message.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let objects = ObjectStore::new(dir.path().join("missing"), "test-secret", BASE_URL);
    let broken = routes().with_state(MarketService::new(Arc::new(pool), objects, 3600));

    let (status, body) = send(
        &broken,
        Request::builder().uri("/readyz").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["storage"]["ok"], false);
    assert_eq!(body["storage"]["error"], "storage check failed");
    assert!(!body.to_string().contains("No such file"));
}

#[tokio::test]
async fn booth_crud_scenario() {
    let (app, _dir) = app().await;
    let user = Uuid::new_v4();

    let (_, body) = send(
        &app,
        multipart_request(
            "POST",
            &format!("/api/custom_market/{user}"),
            &[
                form_part("name", "Spring Fair"),
                form_part("startdate", "2025-05-01"),
                form_part("enddate", "2025-05-03"),
            ],
        ),
    )
    .await;
    let market_uuid = body["insertMarket"]["uuid"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            &format!("/api/custom_booth/{user}"),
            &json!({
                "boothName": "Honey Stand",
                "boothNumber": "12-A",
                "location": { "lat": 59.33, "lng": 18.07 },
                "market_uuid": market_uuid,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let booth = &body["insertBooth"];
    assert_eq!(booth["number"], "12-A");
    let booth_uuid = booth["uuid"].as_str().unwrap().to_string();

    // Partial JSON update, corrected response field name.
    let (status, body) = send(
        &app,
        json_request(
            "PATCH",
            &format!("/api/custom_booth/{booth_uuid}/{user}"),
            &json!({ "number": "14-B", "latitude": 59.34 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let updated = &body["updatedBooth"];
    assert_eq!(updated["number"], "14-B");
    assert_eq!(updated["name"], "Honey Stand");

    // Empty JSON update.
    let (status, _) = send(
        &app,
        json_request(
            "PATCH",
            &format!("/api/custom_booth/{booth_uuid}/{user}"),
            &json!({}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Listing through a non-owner hides the market entirely.
    let (status, _) = send(
        &app,
        Request::builder()
            .uri(format!("/api/custom_booth/{market_uuid}/{}", Uuid::new_v4()))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        Request::builder()
            .uri(format!("/api/custom_booth/{market_uuid}/{user}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booths"].as_array().unwrap().len(), 1);
}
