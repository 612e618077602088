use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use stockroom::{Item, ItemCache, ItemStore, MemoryCacheBackend, MemoryItemStore};
use stockroom_server::build_state;
use stockroom_server::config::{AuthConfig, Config, HttpConfig, RateLimitConfig, StoreConfig};
use stockroom_server::metrics::Metrics;
use stockroom_server::transport::http::router;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    store: Arc<MemoryItemStore>,
    cache: Arc<MemoryCacheBackend>,
    metrics: Arc<Metrics>,
}

struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
    text: String,
}

fn config(capacity: u32) -> Config {
    Config {
        http: HttpConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        store: StoreConfig {
            path: ":memory:".to_string(),
        },
        cache: None,
        rate_limit: RateLimitConfig {
            capacity,
            // Long enough that no test sees a refill
            refill_interval_ms: 60_000,
        },
        auth: AuthConfig {
            jwt_secret: "test-secret".to_string(),
            token_ttl_secs: 3600,
            admin_username: "admin".to_string(),
            admin_password: "password".to_string(),
        },
        seed: false,
        log_level: "debug".to_string(),
    }
}

impl TestApp {
    fn new() -> Self {
        Self::with_capacity(1_000)
    }

    fn with_capacity(capacity: u32) -> Self {
        let store = Arc::new(MemoryItemStore::new());
        let cache = Arc::new(MemoryCacheBackend::new());
        let metrics = Arc::new(Metrics::new());

        let state = build_state(
            &config(capacity),
            store.clone(),
            ItemCache::new(cache.clone()).with_observer(metrics.clone()),
            metrics.clone(),
        )
        .unwrap();

        TestApp {
            router: router(state),
            store,
            cache,
            metrics,
        }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8_lossy(&bytes).to_string();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
            text,
        }
    }

    async fn login(&self) -> String {
        let response = self
            .send(
                Method::POST,
                "/api/v1/login",
                None,
                Some(json!({"username": "admin", "password": "password"})),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK);
        response.body["token"].as_str().unwrap().to_string()
    }

    async fn insert(&self, id: &str, name: &str, stock: i64, price: f64) {
        self.store
            .create(Item {
                id: id.to_string(),
                name: name.to_string(),
                stock,
                price,
            })
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_login() {
    let app = TestApp::new();

    let token = app.login().await;
    assert!(!token.is_empty());

    let response = app
        .send(
            Method::POST,
            "/api/v1/login",
            None,
            Some(json!({"username": "admin", "password": "wrong"})),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "Invalid credentials");

    let response = app
        .send(Method::POST, "/api/v1/login", None, Some(json!({"user": "admin"})))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "Invalid request");
}

#[tokio::test]
async fn test_create_item() {
    let app = TestApp::new();
    let token = app.login().await;

    let response = app
        .send(
            Method::POST,
            "/api/v1/inventory",
            Some(&token),
            Some(json!({"name": "Test Laptop", "stock": 10, "price": 999.99})),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["message"], "Item created successfully");
    assert_eq!(response.body["data"]["name"], "Test Laptop");
    assert_eq!(response.body["data"]["stock"], 10);

    let id = response.body["data"]["id"].as_str().unwrap();
    assert!(app.store.find(id).await.unwrap().is_some());
    // Creation leaves the cache cold
    assert!(app.cache.is_empty());
}

#[tokio::test]
async fn test_create_item_validation() {
    let app = TestApp::new();
    let token = app.login().await;

    let response = app
        .send(
            Method::POST,
            "/api/v1/inventory",
            Some(&token),
            Some(json!({"name": "Test Item", "stock": -5, "price": 99.99})),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "Stock cannot be negative");

    let response = app
        .send(
            Method::POST,
            "/api/v1/inventory",
            Some(&token),
            Some(json!({"name": "Test Item", "stock": 5, "price": 0})),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "Price must be greater than 0");

    let response = app
        .send(
            Method::POST,
            "/api/v1/inventory",
            Some(&token),
            Some(json!({"name": "Test Item"})),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    assert_eq!(app.store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_mutations_require_token() {
    let app = TestApp::new();
    app.insert("1", "Laptop", 10, 999.99).await;
    let payload = json!({"name": "Laptop", "stock": 1, "price": 1.0});

    let response = app
        .send(Method::POST, "/api/v1/inventory", None, Some(payload.clone()))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "Authorization header required");

    let response = app
        .send(
            Method::PUT,
            "/api/v1/inventory/1",
            Some("not-a-token"),
            Some(payload),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = app
        .send(Method::DELETE, "/api/v1/inventory/1", None, None)
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    // Nothing changed
    assert_eq!(app.store.count().await.unwrap(), 1);

    // Reads stay public
    let response = app.send(Method::GET, "/api/v1/inventory/1", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_get_item_reads_through_cache() {
    let app = TestApp::new();
    app.insert("42", "Router", 6, 89.99).await;

    let response = app.send(Method::GET, "/api/v1/inventory/42", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["name"], "Router");
    assert!(app.cache.contains("item:42"));

    let response = app.send(Method::GET, "/api/v1/inventory/42", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(app.store.find_count(), 1);
    assert_eq!(app.metrics.cache_hits.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn test_get_missing_item() {
    let app = TestApp::new();

    let response = app
        .send(Method::GET, "/api/v1/inventory/nonexistent", None, None)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "Item not found");
    assert!(app.cache.is_empty());
}

#[tokio::test]
async fn test_update_item_invalidates_cache() {
    let app = TestApp::new();
    let token = app.login().await;
    app.insert("7", "Printer", 7, 149.99).await;

    // Warm the cache
    app.send(Method::GET, "/api/v1/inventory/7", None, None).await;
    assert!(app.cache.contains("item:7"));

    let response = app
        .send(
            Method::PUT,
            "/api/v1/inventory/7",
            Some(&token),
            Some(json!({"name": "Laser Printer", "stock": 4, "price": 179.99})),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["message"], "Item updated successfully");
    assert_eq!(response.body["data"]["id"], "7");
    assert!(!app.cache.contains("item:7"));

    let response = app.send(Method::GET, "/api/v1/inventory/7", None, None).await;
    assert_eq!(response.body["data"]["name"], "Laser Printer");
    assert_eq!(response.body["data"]["stock"], 4);
}

#[tokio::test]
async fn test_update_missing_item() {
    let app = TestApp::new();
    let token = app.login().await;

    let response = app
        .send(
            Method::PUT,
            "/api/v1/inventory/ghost",
            Some(&token),
            Some(json!({"name": "Ghost", "stock": 1, "price": 1.0})),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "Item not found");

    // Existence is checked before the body
    let response = app
        .send(
            Method::PUT,
            "/api/v1/inventory/ghost",
            Some(&token),
            Some(json!({"name": "Ghost", "stock": -1, "price": 0.0})),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "Item not found");
}

#[tokio::test]
async fn test_delete_item() {
    let app = TestApp::new();
    let token = app.login().await;
    app.insert("9", "Tablet", 5, 399.99).await;
    app.send(Method::GET, "/api/v1/inventory/9", None, None).await;

    let response = app
        .send(Method::DELETE, "/api/v1/inventory/9", Some(&token), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!({"message": "Item deleted successfully"}));
    assert!(!app.cache.contains("item:9"));

    let response = app.send(Method::GET, "/api/v1/inventory/9", None, None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app
        .send(Method::DELETE, "/api/v1/inventory/9", Some(&token), None)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "Item not found");
}

#[tokio::test]
async fn test_list_items() {
    let app = TestApp::new();
    app.insert("1", "Gaming Laptop", 5, 1500.0).await;
    app.insert("2", "Office Laptop", 25, 800.0).await;
    app.insert("3", "Gaming Mouse", 40, 50.0).await;
    app.insert("4", "Keyboard", 15, 89.99).await;
    app.insert("5", "Monitor", 12, 299.99).await;

    let response = app
        .send(Method::GET, "/api/v1/inventory?page=1&page_size=2", None, None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["total"], 5);
    assert_eq!(response.body["page"], 1);
    assert_eq!(response.body["page_size"], 2);
    assert_eq!(response.body["total_pages"], 3);
    assert_eq!(response.body["has_next"], true);
    assert_eq!(response.body["has_prev"], false);
    assert_eq!(response.body["data"].as_array().unwrap().len(), 2);
    assert_eq!(response.body["data"][0]["name"], "Gaming Laptop");

    let response = app
        .send(
            Method::GET,
            "/api/v1/inventory?name=laptop&min_stock=10",
            None,
            None,
        )
        .await;
    assert_eq!(response.body["total"], 1);
    assert_eq!(response.body["data"][0]["name"], "Office Laptop");

    let response = app
        .send(
            Method::GET,
            "/api/v1/inventory?sort_by=price&sort_order=desc",
            None,
            None,
        )
        .await;
    let names: Vec<_> = response.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        names,
        ["Gaming Laptop", "Office Laptop", "Monitor", "Keyboard", "Gaming Mouse"]
    );

    // Out-of-range parameters fall back to defaults
    let response = app
        .send(
            Method::GET,
            "/api/v1/inventory?page=-3&page_size=500&sort_by=color&min_stock=lots",
            None,
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["page"], 1);
    assert_eq!(response.body["page_size"], 10);
    assert_eq!(response.body["total"], 5);

    // Listing never touches the cache
    assert!(app.cache.is_empty());
}

#[tokio::test]
async fn test_rate_limit() {
    let app = TestApp::with_capacity(3);

    for _ in 0..3 {
        let response = app.send(Method::GET, "/health", None, None).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.text, "OK");
    }

    let response = app.send(Method::GET, "/api/v1/inventory", None, None).await;
    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        response.body,
        json!({
            "error": "Rate limit exceeded. Please try again later.",
            "retry_after": "60 seconds"
        })
    );
    assert_eq!(response.headers[header::RETRY_AFTER], "60");

    // Login is gated too
    let response = app
        .send(
            Method::POST,
            "/api/v1/login",
            None,
            Some(json!({"username": "admin", "password": "password"})),
        )
        .await;
    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);

    assert_eq!(app.metrics.requests_admitted.load(Ordering::Relaxed), 3);
    assert_eq!(app.metrics.requests_rate_limited.load(Ordering::Relaxed), 2);
}

#[tokio::test]
async fn test_rejected_requests_never_reach_the_store() {
    let app = TestApp::with_capacity(1);
    app.insert("1", "Camera", 4, 599.99).await;

    let response = app.send(Method::GET, "/api/v1/inventory/1", None, None).await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app.send(Method::GET, "/api/v1/inventory/1", None, None).await;
    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(app.store.find_count(), 1);
}

#[tokio::test]
async fn test_cors_preflight_skips_admission() {
    let app = TestApp::with_capacity(1);

    let preflight = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/v1/inventory")
        .header(header::ORIGIN, "http://example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(preflight).await.unwrap();
    assert!(response.status().is_success());
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );

    // The single token is still there
    let response = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(app.metrics.requests_rate_limited.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn test_cache_outage_is_invisible() {
    let app = TestApp::new();
    let token = app.login().await;
    app.insert("1", "Drone", 2, 899.99).await;
    app.cache.set_offline(true);

    let response = app.send(Method::GET, "/api/v1/inventory/1", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["name"], "Drone");

    let response = app
        .send(
            Method::PUT,
            "/api/v1/inventory/1",
            Some(&token),
            Some(json!({"name": "Drone", "stock": 1, "price": 899.99})),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app
        .send(Method::DELETE, "/api/v1/inventory/1", Some(&token), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);

    assert!(app.metrics.cache_errors.load(Ordering::Relaxed) >= 3);
}

#[tokio::test]
async fn test_unknown_route() {
    let app = TestApp::new();
    let response = app.send(Method::GET, "/api/v2/anything", None, None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "Not found");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = TestApp::new();
    app.send(Method::GET, "/health", None, None).await;

    let response = app.send(Method::GET, "/metrics", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.text.contains("# TYPE stockroom_requests_total counter"));
    assert!(response.text.contains("stockroom_requests_admitted 1"));
}
