//! Materials, product types and items through the HTTP router.

mod common;

use axum::http::StatusCode;
use common::*;
use serde_json::{Value, json};

async fn authed() -> (TestApp, String) {
    let app = app();
    app.register("a@b.com", "secret").await;
    let token = app.login("a@b.com", "secret").await;
    (app, token)
}

async fn create(app: &TestApp, token: &str, uri: &str, body: Value) -> Value {
    let resp = app.send(json_request("POST", uri, Some(token), body)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    body_json(resp).await
}

#[tokio::test]
async fn material_crud_and_name_filter() {
    let (app, token) = authed().await;
    let oak = create(
        &app,
        &token,
        "/materials",
        json!({ "name": "Oak", "description": "solid wood" }),
    )
    .await;
    create(&app, &token, "/materials", json!({ "name": "Glass" })).await;

    let resp = app
        .send(request("GET", "/materials?name=oA", Some(&token)))
        .await;
    let found = body_json(resp).await;
    assert_eq!(found.as_array().unwrap().len(), 1);
    assert_eq!(found[0]["name"], "Oak");

    let resp = app.send(request("GET", "/materials", Some(&token))).await;
    assert_eq!(body_json(resp).await.as_array().unwrap().len(), 2);

    let uri = format!("/materials/{}", oak["id"]);
    let resp = app
        .send(json_request(
            "PATCH",
            &uri,
            Some(&token),
            json!({ "description": "oiled" }),
        ))
        .await;
    let patched = body_json(resp).await;
    assert_eq!(patched["name"], "Oak");
    assert_eq!(patched["description"], "oiled");

    let resp = app.send(request("DELETE", &uri, Some(&token))).await;
    assert_eq!(
        body_json(resp).await["detail"],
        format!("Material with id={} was successfully deleted", oak["id"])
    );
    let resp = app.send(request("GET", &uri, Some(&token))).await;
    assert_error(
        resp,
        StatusCode::NOT_FOUND,
        &format!("Material with id={} was not found!", oak["id"]),
    )
    .await;
}

#[tokio::test]
async fn product_type_not_found_message() {
    let (app, token) = authed().await;
    let resp = app
        .send(request("GET", "/product-types/4242", Some(&token)))
        .await;
    assert_error(
        resp,
        StatusCode::NOT_FOUND,
        "Product type with id=4242 was not found!",
    )
    .await;
}

#[tokio::test]
async fn empty_name_is_rejected() {
    let (app, token) = authed().await;
    let resp = app
        .send(json_request(
            "POST",
            "/product-types",
            Some(&token),
            json!({ "name": "" }),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn item_creation_renders_artifact() {
    let (app, token) = authed().await;
    let material = create(&app, &token, "/materials", json!({ "name": "Oak" })).await;
    let product = create(&app, &token, "/product-types", json!({ "name": "Splashback" })).await;

    let item = create(
        &app,
        &token,
        "/items",
        json!({
            "materialId": material["id"],
            "productTypeId": product["id"],
            "width": 200,
            "height": 100,
        }),
    )
    .await;
    let path = item["artifactPath"].as_str().expect("artifactPath");
    assert!(path.ends_with(&format!("item_{}.png", item["id"])));
    let rendered = image::open(path).unwrap();
    assert_eq!((rendered.width(), rendered.height()), (200, 100));

    // Resizing re-renders under the same name.
    let uri = format!("/items/{}", item["id"]);
    let resp = app
        .send(json_request("PATCH", &uri, Some(&token), json!({ "width": 250 })))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated = body_json(resp).await;
    assert_eq!(updated["width"], 250);
    assert_eq!(updated["height"], 100);
    let rendered = image::open(updated["artifactPath"].as_str().unwrap()).unwrap();
    assert_eq!(rendered.width(), 250);

    let resp = app.send(request("DELETE", &uri, Some(&token))).await;
    assert_eq!(body_json(resp).await["detail"], "Item deleted");
    let resp = app.send(request("GET", &uri, Some(&token))).await;
    assert_error(
        resp,
        StatusCode::NOT_FOUND,
        &format!("Item with id={} was not found!", item["id"]),
    )
    .await;
}

#[tokio::test]
async fn item_requires_existing_references() {
    let (app, token) = authed().await;
    let material = create(&app, &token, "/materials", json!({ "name": "Oak" })).await;

    let resp = app
        .send(json_request(
            "POST",
            "/items",
            Some(&token),
            json!({ "materialId": 9999, "productTypeId": 1, "width": 200, "height": 100 }),
        ))
        .await;
    assert_error(
        resp,
        StatusCode::NOT_FOUND,
        "Material with id=9999 was not found!",
    )
    .await;

    let resp = app
        .send(json_request(
            "POST",
            "/items",
            Some(&token),
            json!({
                "materialId": material["id"],
                "productTypeId": 9999,
                "width": 200,
                "height": 100,
            }),
        ))
        .await;
    assert_error(
        resp,
        StatusCode::NOT_FOUND,
        "Product type with id=9999 was not found!",
    )
    .await;
}

#[tokio::test]
async fn failed_render_persists_nothing() {
    let (app, token) = authed().await;
    let material = create(&app, &token, "/materials", json!({ "name": "Oak" })).await;
    let product = create(&app, &token, "/product-types", json!({ "name": "Panel" })).await;

    for (width, height) in [(SOURCE_W as i64 + 1, 100), (0, 100), (30, 30)] {
        let resp = app
            .send(json_request(
                "POST",
                "/items",
                Some(&token),
                json!({
                    "materialId": material["id"],
                    "productTypeId": product["id"],
                    "width": width,
                    "height": height,
                }),
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{width}x{height}");
    }

    let resp = app.send(request("GET", "/items", Some(&token))).await;
    assert!(body_json(resp).await.as_array().unwrap().is_empty());
    assert!(!app.dir.path().join("cropped").exists());
}

#[tokio::test]
async fn deleting_a_material_removes_its_items() {
    let (app, token) = authed().await;
    let material = create(&app, &token, "/materials", json!({ "name": "Oak" })).await;
    let product = create(&app, &token, "/product-types", json!({ "name": "Panel" })).await;
    create(
        &app,
        &token,
        "/items",
        json!({
            "materialId": material["id"],
            "productTypeId": product["id"],
            "width": 200,
            "height": 100,
        }),
    )
    .await;

    let uri = format!("/materials/{}", material["id"]);
    let resp = app.send(request("DELETE", &uri, Some(&token))).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app.send(request("GET", "/items", Some(&token))).await;
    assert!(body_json(resp).await.as_array().unwrap().is_empty());
}
