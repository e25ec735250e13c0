//! Integration tests for the HTTP surface.
//!
//! The router is driven in-process with `tower::ServiceExt::oneshot`; the
//! session cookie is carried between requests by hand.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use vitrina_admin::backend::{
    BackendCall, Collection, FailPoint, MemoryBackend, SessionEvent, SessionEventKind,
};
use vitrina_admin::build_app;
use vitrina_admin::state::AppState;
use vitrina_integration_tests::{
    ADMIN_EMAIL, PASSWORD, STRANGER_EMAIL, app_state, backend, png_data_url, seed_config,
    seed_product,
};

struct TestApp {
    backend: Arc<MemoryBackend>,
    state: AppState,
    router: Router,
}

impl TestApp {
    fn new() -> Self {
        let backend = backend();
        let state = app_state(&backend);
        let router = build_app(state.clone(), false);
        Self {
            backend,
            state,
            router,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Option<String>, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .map(str::to_string);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, cookie, body)
    }

    async fn request(
        &self,
        method: &str,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Option<String>, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).unwrap()).await
    }

    async fn login(&self, email: &str, password: &str) -> (StatusCode, Option<String>, Value) {
        self.request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"email": email, "password": password})),
        )
        .await
    }

    /// Sign in as the admin and return the session cookie.
    async fn admin_cookie(&self) -> String {
        let (status, cookie, _) = self.login(ADMIN_EMAIL, PASSWORD).await;
        assert_eq!(status, StatusCode::OK);
        cookie.expect("session cookie")
    }
}

// =============================================================================
// Public routes
// =============================================================================

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let (status, _, body) = app.request("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("ok"));
}

#[tokio::test]
async fn test_storefront_lists_visible_products_with_contact_links() {
    let app = TestApp::new();
    let config_id = seed_config(&app.backend);
    for (name, category, status) in [
        ("Chair", "Furniture", "available"),
        ("Lamp", "Lighting", "out-of-stock"),
        ("Vase", "Decor", "sold"),
    ] {
        seed_product(
            &app.backend,
            json!({"name": name, "category": category, "price": 10, "status": status, "store_config_id": config_id}),
        );
    }
    app.state.catalog().refresh().await;

    let (status, _, body) = app.request("GET", "/api/storefront", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["store"]["name"], "Casa Luna");
    assert_eq!(body["categories"], json!(["Lighting", "Furniture"]));
    let names: Vec<&str> = body["products"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|p| p["name"].as_str())
        .collect();
    assert_eq!(names, ["Lamp", "Chair"]);
    assert!(
        body["products"][0]["whatsapp_url"]
            .as_str()
            .unwrap()
            .starts_with("https://wa.me/+34600000000?text=")
    );
    assert_eq!(
        body["social_links"],
        json!([{"network": "instagram", "url": "https://casaluna"}])
    );

    let (_, _, body) = app
        .request("GET", "/api/storefront?category=Furniture", None, None)
        .await;
    assert_eq!(body["products"].as_array().unwrap().len(), 1);

    let (_, _, body) = app
        .request("GET", "/api/storefront?q=LAMP", None, None)
        .await;
    assert_eq!(body["products"][0]["name"], "Lamp");
}

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn test_admin_routes_require_sign_in() {
    let app = TestApp::new();
    for (method, uri) in [
        ("GET", "/api/admin/dashboard"),
        ("GET", "/api/admin/products"),
        ("GET", "/api/admin/store-config"),
        ("POST", "/api/admin/refresh"),
        ("DELETE", "/api/admin/products/1"),
    ] {
        let (status, _, _) = app.request(method, uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
    }
}

#[tokio::test]
async fn test_login_errors() {
    let app = TestApp::new();

    let (status, cookie, body) = app.login(ADMIN_EMAIL, "wrong").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid login credentials");
    assert!(cookie.is_none());

    let (status, _, _) = app.login(STRANGER_EMAIL, PASSWORD).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(!app.state.gate().is_authorized());
}

#[tokio::test]
async fn test_login_session_and_logout() {
    let app = TestApp::new();
    let cookie = app.admin_cookie().await;

    let (status, _, body) = app
        .request("GET", "/api/auth/session", Some(&cookie), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["signed_in"], true);
    assert_eq!(body["gate"]["state"], "authorized");

    let (status, _, _) = app
        .request("GET", "/api/admin/dashboard", Some(&cookie), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, body) = app
        .request("POST", "/api/auth/logout", Some(&cookie), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["signed_out"], true);
    assert!(body.get("warning").is_none());

    let (status, _, _) = app
        .request("GET", "/api/admin/dashboard", Some(&cookie), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_reports_remote_failure() {
    let app = TestApp::new();
    let cookie = app.admin_cookie().await;
    app.backend.set_failure(FailPoint::SignOut, true);

    let (status, _, body) = app
        .request("POST", "/api/auth/logout", Some(&cookie), None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["warning"].is_string());
    assert!(!app.state.gate().is_authorized());
}

#[tokio::test]
async fn test_failed_logins_elsewhere_keep_admin_signed_in() {
    let app = TestApp::new();
    let cookie = app.admin_cookie().await;

    let (status, _, _) = app
        .request("GET", "/api/admin/products", Some(&cookie), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = app.login(ADMIN_EMAIL, "wrong-guess").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _, _) = app
        .request("GET", "/api/admin/products", Some(&cookie), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = app.login(STRANGER_EMAIL, PASSWORD).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _, _) = app
        .request("GET", "/api/admin/products", Some(&cookie), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!app.backend.calls().contains(&BackendCall::SignOut));
}

#[tokio::test]
async fn test_logout_without_admin_cookie_keeps_admin_signed_in() {
    let app = TestApp::new();
    let cookie = app.admin_cookie().await;

    let (status, _, body) = app.request("POST", "/api/auth/logout", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["signed_out"], true);

    assert!(app.state.gate().is_authorized());
    assert!(!app.backend.calls().contains(&BackendCall::SignOut));
    let (status, _, _) = app
        .request("GET", "/api/admin/dashboard", Some(&cookie), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_cookie_rejected_once_gate_loses_authorization() {
    let app = TestApp::new();
    let cookie = app.admin_cookie().await;

    // Signed out from another client
    app.state
        .gate()
        .handle_event(SessionEvent {
            kind: SessionEventKind::SignedOut,
            identity: None,
        })
        .await;

    let (status, _, _) = app
        .request("GET", "/api/admin/products", Some(&cookie), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Catalog management
// =============================================================================

fn settings() -> Value {
    json!({
        "name": "Casa Luna",
        "email": "hola@casaluna.shop",
        "phone": "+34 600 000 000",
        "whatsapp": "+34600000000",
        "instagram": "casaluna",
    })
}

#[tokio::test]
async fn test_product_before_store_config_conflicts() {
    let app = TestApp::new();
    let cookie = app.admin_cookie().await;

    let (status, _, body) = app
        .request(
            "POST",
            "/api/admin/products",
            Some(&cookie),
            Some(json!({"name": "X", "category": "Y", "price": 10})),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_manage_catalog_over_http() {
    let app = TestApp::new();
    let cookie = app.admin_cookie().await;

    let (status, _, config) = app
        .request("GET", "/api/admin/store-config", Some(&cookie), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(config["id"], Value::Null);

    let (status, _, config) = app
        .request("PUT", "/api/admin/store-config", Some(&cookie), Some(settings()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(config["id"].is_i64());

    let (status, _, product) = app
        .request(
            "POST",
            "/api/admin/products",
            Some(&cookie),
            Some(json!({
                "name": "Chair",
                "category": "Furniture",
                "price": 49.99,
                "image": png_data_url(),
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(product["price"], 49.99);
    assert_eq!(product["store_config_id"], config["id"]);
    assert!(
        product["image_url"]
            .as_str()
            .unwrap()
            .starts_with("https://assets.local/product-images/public/")
    );
    let id = product["id"].as_i64().unwrap();

    let (status, _, updated) = app
        .request(
            "PUT",
            &format!("/api/admin/products/{id}"),
            Some(&cookie),
            Some(json!({"name": "Chair", "category": "Furniture", "price": 39, "status": "sold"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "sold");
    assert_eq!(updated["image_url"], product["image_url"]);

    let (status, _, dashboard) = app
        .request("GET", "/api/admin/dashboard", Some(&cookie), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["stats"]["total_products"], 1);
    assert_eq!(dashboard["stats"]["sold_products"], 1);
    assert_eq!(dashboard["store_configured"], true);

    let (status, _, _) = app
        .request("DELETE", &format!("/api/admin/products/{id}"), Some(&cookie), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(app.backend.rows(Collection::Products).is_empty());
    assert!(app.backend.asset_paths().is_empty());

    let (status, _, _) = app
        .request("DELETE", &format!("/api/admin/products/{id}"), Some(&cookie), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_validation_errors_name_the_field() {
    let app = TestApp::new();
    seed_config(&app.backend);
    app.state.catalog().refresh().await;
    let cookie = app.admin_cookie().await;

    let (status, _, body) = app
        .request(
            "POST",
            "/api/admin/products",
            Some(&cookie),
            Some(json!({"name": "Chair", "category": "Furniture", "price": 10, "whatsapp": "0123"})),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "whatsapp");
}

#[tokio::test]
async fn test_mistyped_product_fields_name_the_field() {
    let app = TestApp::new();
    seed_config(&app.backend);
    app.state.catalog().refresh().await;
    let cookie = app.admin_cookie().await;

    for (body, field) in [
        (json!({"name": "Chair", "category": "Furniture", "price": "abc"}), "price"),
        (json!({"name": "Chair", "category": "Furniture"}), "price"),
        (json!({"category": "Furniture", "price": 10}), "name"),
        (json!({"name": "Chair", "price": "12.50"}), "category"),
    ] {
        let (status, _, response) = app
            .request("POST", "/api/admin/products", Some(&cookie), Some(body.clone()))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(response["field"], field, "{body}");
    }

    let (status, _, response) = app
        .request(
            "PUT",
            "/api/admin/store-config",
            Some(&cookie),
            Some(json!({"name": "Casa Luna", "phone": "600"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["field"], "email");
    assert!(app.backend.rows(Collection::Products).is_empty());
}

#[tokio::test]
async fn test_malformed_json_is_a_json_bad_request() {
    let app = TestApp::new();
    let cookie = app.admin_cookie().await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/admin/products")
        .header(header::COOKIE, &cookie)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"name\": \"Chair\","))
        .unwrap();
    let (status, _, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _, body) = app
        .request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"email": ADMIN_EMAIL})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_refresh_reloads_from_record_store() {
    let app = TestApp::new();
    let cookie = app.admin_cookie().await;
    let config_id = seed_config(&app.backend);
    seed_product(
        &app.backend,
        json!({"name": "Lamp", "category": "Lighting", "price": 20, "store_config_id": config_id}),
    );

    let (status, _, snapshot) = app
        .request("POST", "/api/admin/refresh", Some(&cookie), None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["config"]["id"], config_id);
    assert_eq!(snapshot["products"][0]["name"], "Lamp");
}
