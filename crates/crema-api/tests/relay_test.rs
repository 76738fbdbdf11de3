//! Relay API integration tests.
//!
//! Run with: `cargo test -p crema-api --test relay_test`

mod helpers;

use axum_test::multipart::{MultipartForm, Part};
use helpers::{configured, png_bytes, test_server, unconfigured};
use mockito::Matcher;
use serde_json::{json, Value};

#[tokio::test]
async fn test_health() {
    let server = test_server(unconfigured());

    let response = server.get("/health").await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["provider"], "cloudinary");
}

#[tokio::test]
async fn test_openapi_document_lists_relay_routes() {
    let server = test_server(unconfigured());

    let response = server.get("/api/openapi.json").await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert!(body["paths"]["/api/upload-image"].is_object());
    assert!(body["paths"]["/api/cloudinary/destroy"].is_object());
}

#[tokio::test]
async fn test_upload_image_without_key_is_configuration_error() {
    let server = test_server(unconfigured());

    let response = server
        .post("/api/upload-image")
        .json(&json!({ "image": "AAAA" }))
        .await;

    assert_eq!(response.status_code(), 503);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "CONFIGURATION_ERROR");
    assert!(body["error"].as_str().unwrap().contains("IMGBB_API_KEY"));
}

#[tokio::test]
async fn test_upload_image_rejects_empty_payload() {
    let provider = mockito::Server::new_async().await;
    let server = test_server(configured(&provider.url()));

    let response = server
        .post("/api/upload-image")
        .json(&json!({ "image": "  " }))
        .await;
    assert_eq!(response.status_code(), 400);

    let response = server
        .post("/api/upload-image")
        .json(&json!({ "picture": "AAAA" }))
        .await;
    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_upload_image_forwards_with_server_key() {
    let mut provider = mockito::Server::new_async().await;
    let mock = provider
        .mock("POST", "/1/upload")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("key".into(), helpers::IMGBB_KEY.into()),
            Matcher::UrlEncoded("expiration".into(), "0".into()),
            Matcher::UrlEncoded("image".into(), "AAAA".into()),
        ]))
        .with_status(200)
        .with_body(
            r#"{"data":{"url":"https://i.ibb.co/abc/latte.jpg","display_url":"https://i.ibb.co/abc/latte.jpg",
                "width":640,"height":480,"size":2048,"delete_url":"https://ibb.co/abc/del",
                "thumb":{"url":"https://i.ibb.co/t/latte.jpg"}},"success":true}"#,
        )
        .create_async()
        .await;

    let server = test_server(configured(&provider.url()));
    let response = server
        .post("/api/upload-image")
        .json(&json!({ "image": "data:image/jpeg;base64,AAAA" }))
        .await;

    mock.assert_async().await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["url"], "https://i.ibb.co/abc/latte.jpg");
    assert_eq!(body["urls"]["thumb"], "https://i.ibb.co/t/latte.jpg");
    assert_eq!(body["width"], 640);
    // The provider key never appears in a client-facing response
    assert!(!response.text().contains(helpers::IMGBB_KEY));
}

#[tokio::test]
async fn test_upload_image_rejects_url_outside_allow_list() {
    let mut provider = mockito::Server::new_async().await;
    provider
        .mock("POST", "/1/upload")
        .with_status(200)
        .with_body(
            r#"{"data":{"url":"https://files.example.net/abc/latte.jpg","width":640,"height":480},"success":true}"#,
        )
        .create_async()
        .await;

    let server = test_server(configured(&provider.url()));
    let response = server
        .post("/api/upload-image")
        .json(&json!({ "image": "AAAA" }))
        .await;

    assert_eq!(response.status_code(), 502);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("unrecognized host"));
}

#[tokio::test]
async fn test_upload_image_provider_failure_is_bad_gateway() {
    let mut provider = mockito::Server::new_async().await;
    provider
        .mock("POST", "/1/upload")
        .with_status(400)
        .with_body(r#"{"status_code":400,"error":{"message":"Invalid API v1 key."}}"#)
        .create_async()
        .await;

    let server = test_server(configured(&provider.url()));
    let response = server
        .post("/api/upload-image")
        .json(&json!({ "image": "AAAA" }))
        .await;

    assert_eq!(response.status_code(), 502);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("Invalid API v1 key."));
}

#[tokio::test]
async fn test_ping_reports_cloud_name() {
    let mut provider = mockito::Server::new_async().await;
    let mock = provider
        .mock("GET", "/v1_1/cafe/ping")
        // key:abcd
        .match_header("authorization", "Basic a2V5OmFiY2Q=")
        .with_status(200)
        .with_body(r#"{"status":"ok"}"#)
        .create_async()
        .await;

    let server = test_server(configured(&provider.url()));
    let response = server.get("/api/cloudinary/ping").await;

    mock.assert_async().await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["cloudName"], "cafe");
}

#[tokio::test]
async fn test_ping_failure_carries_error() {
    let mut provider = mockito::Server::new_async().await;
    provider
        .mock("GET", "/v1_1/cafe/ping")
        .with_status(401)
        .with_body(r#"{"error":{"message":"Invalid Signature"}}"#)
        .create_async()
        .await;

    let server = test_server(configured(&provider.url()));
    let response = server.get("/api/cloudinary/ping").await;

    assert_eq!(response.status_code(), 502);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("Invalid Signature"));
}

#[tokio::test]
async fn test_ping_without_secret_lists_missing_vars() {
    let server = test_server(unconfigured());
    let response = server.get("/api/cloudinary/ping").await;

    assert_eq!(response.status_code(), 503);
    let body: Value = response.json();
    let error = body["error"].as_str().unwrap();
    assert!(error.contains("CLOUDINARY_API_KEY"));
    assert!(error.contains("CLOUDINARY_API_SECRET"));
}

#[tokio::test]
async fn test_destroy_signs_request() {
    let mut provider = mockito::Server::new_async().await;
    let mock = provider
        .mock("POST", "/v1_1/cafe/image/destroy")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("public_id".into(), "menu/latte".into()),
            Matcher::UrlEncoded("api_key".into(), helpers::API_KEY.into()),
            Matcher::Regex("signature=[0-9a-f]{40}".into()),
            Matcher::Regex("timestamp=[0-9]+".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"result":"ok"}"#)
        .create_async()
        .await;

    let server = test_server(configured(&provider.url()));
    let response = server
        .post("/api/cloudinary/destroy")
        .json(&json!({ "public_id": "menu/latte" }))
        .await;

    mock.assert_async().await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["result"], "ok");
}

#[tokio::test]
async fn test_destroy_requires_public_id() {
    let provider = mockito::Server::new_async().await;
    let server = test_server(configured(&provider.url()));

    let response = server
        .post("/api/cloudinary/destroy")
        .json(&json!({ "public_id": "" }))
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_upload_proxy_passes_provider_response_through() {
    let mut provider = mockito::Server::new_async().await;
    let mock = provider
        .mock("POST", "/v1_1/cafe/image/upload")
        .with_status(200)
        .with_body(
            r#"{"public_id":"menu/latte","secure_url":"https://res.cloudinary.com/cafe/image/upload/v1/menu/latte.png","width":8,"height":8}"#,
        )
        .create_async()
        .await;

    let server = test_server(configured(&provider.url()));
    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(png_bytes(8, 8))
            .file_name("latte.png")
            .mime_type("image/png"),
    );
    let response = server.post("/api/cloudinary/upload").multipart(form).await;

    mock.assert_async().await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["public_id"], "menu/latte");
}

#[tokio::test]
async fn test_upload_proxy_validates_before_forwarding() {
    let mut provider = mockito::Server::new_async().await;
    let mock = provider
        .mock("POST", "/v1_1/cafe/image/upload")
        .expect(0)
        .create_async()
        .await;

    let server = test_server(configured(&provider.url()));
    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(b"hello".to_vec())
            .file_name("notes.txt")
            .mime_type("text/plain"),
    );
    let response = server.post("/api/cloudinary/upload").multipart(form).await;

    mock.assert_async().await;
    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_upload_proxy_without_preset_is_configuration_error() {
    let server = test_server(unconfigured());
    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(png_bytes(8, 8))
            .file_name("latte.png")
            .mime_type("image/png"),
    );
    let response = server.post("/api/cloudinary/upload").multipart(form).await;

    assert_eq!(response.status_code(), 503);
    let body: Value = response.json();
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("CLOUDINARY_UPLOAD_PRESET"));
}
