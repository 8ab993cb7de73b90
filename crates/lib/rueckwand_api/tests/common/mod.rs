//! Shared helpers: an in-memory app, request builders and body decoding.

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use chrono::Duration;
use image::{Rgb, RgbImage};
use jsonwebtoken::Algorithm;
use rueckwand_api::{AppState, config::ApiConfig};
use rueckwand_core::artifact::ArtifactConfig;
use rueckwand_core::auth::AuthConfig;
use rueckwand_core::store::Store;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

pub const SECRET: &str = "test-secret";
pub const SOURCE_W: u32 = 400;
pub const SOURCE_H: u32 = 300;

pub struct TestApp {
    pub router: Router,
    pub store: Store,
    pub dir: TempDir,
}

/// Router over a fresh in-memory store. The artifact source is a solid
/// `SOURCE_W x SOURCE_H` image inside a temp dir.
pub fn app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let source_image = dir.path().join("source.png");
    RgbImage::from_pixel(SOURCE_W, SOURCE_H, Rgb([10, 120, 60]))
        .save(&source_image)
        .unwrap();

    let config = ApiConfig {
        bind_addr: "127.0.0.1:0".into(),
        database_url: "postgres://unused".into(),
        auth: AuthConfig::new(SECRET, Algorithm::HS256, Duration::minutes(30)).unwrap(),
        artifacts: ArtifactConfig {
            source_image,
            output_dir: dir.path().join("cropped"),
        },
    };
    let store = Store::memory();
    let router = rueckwand_api::router(AppState::new(store.clone(), config));
    TestApp { router, store, dir }
}

impl TestApp {
    pub async fn send(&self, req: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(req).await.expect("request")
    }

    /// Register a user through the public endpoint.
    pub async fn register(&self, email: &str, password: &str) -> Value {
        let resp = self
            .send(json_request(
                "POST",
                "/users",
                None,
                serde_json::json!({ "email": email, "password": password }),
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        body_json(resp).await
    }

    /// Log in and return the access token.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let resp = self.send(login_request(email, password)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["tokenType"], "bearer");
        json["accessToken"].as_str().expect("accessToken").to_string()
    }
}

pub fn login_request(username: &str, password: &str) -> Request<Body> {
    let form = format!(
        "username={}&password={}",
        username.replace('@', "%40"),
        password
    );
    Request::builder()
        .method("POST")
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form))
        .unwrap()
}

pub fn request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn body_json(resp: Response<Body>) -> Value {
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("parse JSON")
}

/// Assert status and error message of a failed response.
pub async fn assert_error(resp: Response<Body>, status: StatusCode, message: &str) {
    assert_eq!(resp.status(), status);
    let json = body_json(resp).await;
    assert_eq!(json["message"], message, "unexpected body: {json}");
}
