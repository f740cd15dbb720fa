mod common;

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use common::Fixture;
use foodgram::server::config::ServerConfig;
use foodgram::services::auth_service;
use foodgram::web::create_axum_router;
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestApp {
    fx: Fixture,
    router: Router,
}

impl TestApp {
    async fn new() -> Self {
        Self::with_config(common::test_config()).await
    }

    async fn with_config(config: ServerConfig) -> Self {
        let fx = Fixture::new().await;
        let router = create_axum_router(fx.db.clone(), Arc::new(config));
        Self { fx, router }
    }

    fn token_for(&self, user: &foodgram::db::entities::user::Model) -> String {
        auth_service::create_jwt_for_user(user, common::JWT_SECRET, 1)
            .unwrap()
            .auth_token
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Vec<u8>, axum::http::HeaderMap) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Token {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec(), headers)
    }

    async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, bytes, _) = self.send(method, uri, token, body).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn pancakes_json(&self) -> Value {
        json!({
            "name": "Pancakes",
            "image": "recipes/images/pancakes.png",
            "text": "Mix and fry.",
            "cooking_time": 20,
            "ingredients": [
                {"id": self.fx.flour.id, "amount": 200},
                {"id": self.fx.eggs.id, "amount": 2}
            ],
            "tags": [self.fx.breakfast.id]
        })
    }
}

#[tokio::test]
async fn health_check() {
    let app = TestApp::new().await;
    let (status, body) = app.json(Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn register_login_and_me() {
    let app = TestApp::new().await;
    let (status, body) = app
        .json(
            Method::POST,
            "/api/users",
            None,
            Some(json!({
                "email": "cook@example.com",
                "username": "cook",
                "first_name": "Julia",
                "last_name": "Child",
                "password": "bon-appetit"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["username"], "cook");
    assert!(body.get("password_hash").is_none());

    let (status, _) = app
        .json(
            Method::POST,
            "/api/users",
            None,
            Some(json!({
                "email": "cook@example.com",
                "username": "cook2",
                "first_name": "J",
                "last_name": "C",
                "password": "bon-appetit"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .json(
            Method::POST,
            "/api/auth/token/login",
            None,
            Some(json!({"email": "cook@example.com", "password": "wrong-password"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .json(
            Method::POST,
            "/api/auth/token/login",
            None,
            Some(json!({"email": "cook@example.com", "password": "bon-appetit"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["auth_token"].as_str().unwrap().to_string();

    let (status, me) = app.json(Method::GET, "/api/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "cook@example.com");
    assert_eq!(me["is_subscribed"], false);

    let (status, _) = app.json(Method::GET, "/api/users/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .json(Method::GET, "/api/users/me", Some("not-a-token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn set_password_checks_current_password() {
    let app = TestApp::new().await;
    let token = app.token_for(&app.fx.author);

    let (status, body) = app
        .json(
            Method::POST,
            "/api/users/set_password",
            Some(&token),
            Some(json!({"current_password": "nope", "new_password": "new-password"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "current_password");

    let (status, _) = app
        .json(
            Method::POST,
            "/api/users/set_password",
            Some(&token),
            Some(json!({"current_password": "password123", "new_password": "new-password"})),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .json(
            Method::POST,
            "/api/auth/token/login",
            None,
            Some(json!({"email": "author@example.com", "password": "new-password"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn recipe_lifecycle_over_http() {
    let app = TestApp::new().await;
    let author = app.token_for(&app.fx.author);
    let other = app.token_for(&app.fx.other);

    let (status, _) = app
        .json(Method::POST, "/api/recipes", None, Some(app.pancakes_json()))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, created) = app
        .json(Method::POST, "/api/recipes", Some(&author), Some(app.pancakes_json()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["author"]["username"], "author");
    assert_eq!(created["ingredients"].as_array().unwrap().len(), 2);
    assert_eq!(created["tags"][0]["slug"], "breakfast");
    assert_eq!(created["is_favorited"], false);
    let id = created["id"].as_i64().unwrap();

    let mut invalid = app.pancakes_json();
    invalid["cooking_time"] = json!(0);
    let (status, body) = app
        .json(Method::POST, "/api/recipes", Some(&author), Some(invalid))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "cooking_time");
    assert!(body["errors"]["cooking_time"].is_array());

    let (status, _) = app
        .json(
            Method::PATCH,
            &format!("/api/recipes/{id}"),
            Some(&other),
            Some(app.pancakes_json()),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, detail) = app
        .json(Method::GET, &format!("/api/recipes/{id}"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["name"], "Pancakes");

    let (status, short) = app
        .json(
            Method::POST,
            &format!("/api/recipes/{id}/favorite"),
            Some(&other),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(short["id"], id);
    assert_eq!(short["cooking_time"], 20);

    let (status, _) = app
        .json(
            Method::POST,
            &format!("/api/recipes/{id}/favorite"),
            Some(&other),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, seen) = app
        .json(Method::GET, &format!("/api/recipes/{id}"), Some(&other), None)
        .await;
    assert_eq!(seen["is_favorited"], true);

    let (status, _) = app
        .json(
            Method::DELETE,
            &format!("/api/recipes/{id}/favorite"),
            Some(&other),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .json(Method::DELETE, &format!("/api/recipes/{id}"), Some(&author), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app
        .json(Method::GET, &format!("/api/recipes/{id}"), None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn recipe_list_is_paginated_and_filtered() {
    let app = TestApp::new().await;
    let author = app.token_for(&app.fx.author);
    for i in 0..8 {
        let mut payload = app.pancakes_json();
        payload["name"] = json!(format!("Pancakes #{i}"));
        if i % 2 == 1 {
            payload["tags"] = json!([app.fx.dinner.id]);
        }
        let (status, _) = app
            .json(Method::POST, "/api/recipes", Some(&author), Some(payload))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, page) = app.json(Method::GET, "/api/recipes", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["count"], 8);
    assert_eq!(page["results"].as_array().unwrap().len(), 6);
    assert_eq!(page["results"][0]["name"], "Pancakes #7");
    assert_eq!(page["next"], "/api/recipes?page=2");
    assert!(page["previous"].is_null());

    let (_, page) = app
        .json(Method::GET, "/api/recipes?page=2&limit=3", None, None)
        .await;
    assert_eq!(page["results"].as_array().unwrap().len(), 3);
    assert_eq!(page["results"][0]["name"], "Pancakes #4");

    let (_, dinner) = app
        .json(Method::GET, "/api/recipes?tags=dinner&limit=10", None, None)
        .await;
    assert_eq!(dinner["count"], 4);

    let (_, both) = app
        .json(
            Method::GET,
            "/api/recipes?tags=dinner&tags=breakfast&limit=10",
            None,
            None,
        )
        .await;
    assert_eq!(both["count"], 8);

    let (_, none_favorited) = app
        .json(Method::GET, "/api/recipes?is_favorited=1", Some(&author), None)
        .await;
    assert_eq!(none_favorited["count"], 0);
}

#[tokio::test]
async fn shopping_cart_download() {
    let app = TestApp::new().await;
    let author = app.token_for(&app.fx.author);
    let (_, created) = app
        .json(Method::POST, "/api/recipes", Some(&author), Some(app.pancakes_json()))
        .await;
    let id = created["id"].as_i64().unwrap();

    let (status, _) = app
        .json(
            Method::POST,
            &format!("/api/recipes/{id}/shopping_cart"),
            Some(&author),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, bytes, headers) = app
        .send(
            Method::GET,
            "/api/recipes/download_shopping_cart",
            Some(&author),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    assert!(headers[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .contains("shopping_list.txt"));
    assert_eq!(
        String::from_utf8(bytes).unwrap(),
        "Shopping list:\nEggs (pcs) - 2\nFlour (g) - 200\n"
    );

    let (status, _, _) = app
        .send(Method::GET, "/api/recipes/download_shopping_cart", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn subscriptions_over_http() {
    let app = TestApp::new().await;
    let author = app.token_for(&app.fx.author);
    let other = app.token_for(&app.fx.other);
    app.json(Method::POST, "/api/recipes", Some(&author), Some(app.pancakes_json()))
        .await;

    let author_id = app.fx.author.id;
    let (status, body) = app
        .json(
            Method::POST,
            &format!("/api/users/{author_id}/subscribe?recipes_limit=1"),
            Some(&other),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["is_subscribed"], true);
    assert_eq!(body["recipes_count"], 1);
    assert_eq!(body["recipes"].as_array().unwrap().len(), 1);

    let (status, _) = app
        .json(
            Method::POST,
            &format!("/api/users/{author_id}/subscribe"),
            Some(&author),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, page) = app
        .json(Method::GET, "/api/users/subscriptions", Some(&other), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["count"], 1);
    assert_eq!(page["results"][0]["username"], "author");

    let (_, profile) = app
        .json(Method::GET, &format!("/api/users/{author_id}"), Some(&other), None)
        .await;
    assert_eq!(profile["is_subscribed"], true);

    let (status, _) = app
        .json(
            Method::DELETE,
            &format!("/api/users/{author_id}/subscribe"),
            Some(&other),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app
        .json(
            Method::DELETE,
            &format!("/api/users/{author_id}/subscribe"),
            Some(&other),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn catalog_endpoints() {
    let app = TestApp::new().await;
    let user = app.token_for(&app.fx.author);
    let admin = app.token_for(&app.fx.admin);

    let (status, tags) = app.json(Method::GET, "/api/tags", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tags.as_array().unwrap().len(), 2);

    let (status, found) = app
        .json(Method::GET, "/api/ingredients?name=fl", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found[0]["name"], "Flour");

    let new_tag = json!({"name": "Vegan", "color": "#00FF00", "slug": "vegan"});
    let (status, _) = app
        .json(Method::POST, "/api/tags", Some(&user), Some(new_tag.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app
        .json(Method::POST, "/api/tags", None, Some(new_tag.clone()))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, created) = app
        .json(Method::POST, "/api/tags", Some(&admin), Some(new_tag))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["color"], "#00ff00");

    let (status, _) = app
        .json(
            Method::POST,
            "/api/ingredients",
            Some(&admin),
            Some(json!({"name": "Flour", "measurement_unit": "g"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app.json(Method::GET, "/api/ingredients/9999", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_recipe_body_is_a_field_error() {
    let app = TestApp::new().await;
    let author = app.token_for(&app.fx.author);

    let mut missing = app.pancakes_json();
    missing.as_object_mut().unwrap().remove("ingredients");
    let (status, body) = app
        .json(Method::POST, "/api/recipes", Some(&author), Some(missing))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "ingredients");
    assert!(body["errors"]["ingredients"][0]
        .as_str()
        .unwrap()
        .contains("ingredients"));

    let mut wrong_type = app.pancakes_json();
    wrong_type["cooking_time"] = json!("ten");
    let (status, body) = app
        .json(Method::POST, "/api/recipes", Some(&author), Some(wrong_type))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "cooking_time");
    assert!(body["errors"]["cooking_time"].is_array());

    let (status, bytes, _) = app
        .send(Method::POST, "/api/tags", Some(&author), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["field"], "non_field_errors");
}

#[tokio::test]
async fn malformed_query_is_a_field_error() {
    let app = TestApp::new().await;
    let (status, body) = app
        .json(Method::GET, "/api/recipes?is_favorited=maybe", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    assert!(body["errors"].is_object());
}

async fn login_cookie(app: &TestApp) -> String {
    let (status, _, headers) = app
        .send(
            Method::POST,
            "/api/auth/token/login",
            None,
            Some(json!({"email": "author@example.com", "password": "password123"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    headers[header::SET_COOKIE].to_str().unwrap().to_string()
}

#[tokio::test]
async fn login_cookie_follows_secure_setting() {
    let secure = TestApp::new().await;
    let cookie = login_cookie(&secure).await;
    assert!(cookie.starts_with("token="));
    assert!(cookie.contains("Secure"));
    assert!(cookie.contains("HttpOnly"));

    let mut config = common::test_config();
    config.secure_cookies = false;
    let plain = TestApp::with_config(config).await;
    let cookie = login_cookie(&plain).await;
    assert!(cookie.starts_with("token="));
    assert!(!cookie.contains("Secure"));
}
