//! Common test utilities for shop-service integration tests.
//!
//! The router runs over a `MemoryStore`; both payment providers are
//! `wiremock` servers.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use secrecy::Secret;
use serde_json::Value;
use shop_core::config::Config as CommonConfig;
use shop_service::config::{
    CheckoutConfig, DatabaseConfig, FlutterwaveConfig, FrontendConfig, JwtConfig, PayPalConfig,
    ShopConfig,
};
use shop_service::models::{Category, Product};
use shop_service::services::{CatalogService, NewProduct};
use shop_service::store::MemoryStore;
use shop_service::{build_router, AppState};
use std::str::FromStr;
use std::sync::{Arc, Once};
use std::time::Duration;
use tower::ServiceExt;
use wiremock::MockServer;

static INIT: Once = Once::new();

pub const FLUTTERWAVE_SECRET: &str = "FLWSECK_TEST-integration";
pub const PASSWORD: &str = "correct horse battery";

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,shop_service=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

fn test_config(flutterwave_url: &str, paypal_url: &str) -> ShopConfig {
    ShopConfig {
        common: CommonConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        service_name: "shop-service-test".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: Secret::new("postgres://unused".to_string()),
            max_connections: 1,
            min_connections: 1,
        },
        jwt: JwtConfig {
            secret: Secret::new("integration-test-secret-0123456789abcdef".to_string()),
            access_token_expiry_minutes: 5,
            refresh_token_expiry_days: 1,
        },
        frontend: FrontendConfig {
            base_url: "http://localhost:5173".to_string(),
        },
        checkout: CheckoutConfig {
            tax: Decimal::from_str("4.00").unwrap(),
            settlement_currency: "KES".to_string(),
        },
        flutterwave: FlutterwaveConfig {
            secret_key: Secret::new(FLUTTERWAVE_SECRET.to_string()),
            api_base_url: flutterwave_url.to_string(),
            currency: "KES".to_string(),
            timeout: Duration::from_secs(5),
        },
        paypal: PayPalConfig {
            client_id: "paypal-client".to_string(),
            client_secret: Secret::new("paypal-secret".to_string()),
            api_base_url: paypal_url.to_string(),
            currency: "USD".to_string(),
            timeout: Duration::from_secs(5),
        },
    }
}

#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub flutterwave: MockServer,
    pub paypal: MockServer,
    /// Priced at 10.00, category Electronics.
    pub product: Product,
}

#[allow(dead_code)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

pub async fn spawn_app() -> TestApp {
    init_tracing();

    let flutterwave = MockServer::start().await;
    let paypal = MockServer::start().await;
    let store = Arc::new(MemoryStore::new());

    let product = CatalogService::new(store.clone())
        .create_product(NewProduct {
            name: "Wireless Headphones".to_string(),
            description: Some("Over-ear".to_string()),
            image: None,
            price: Decimal::from_str("10.00").unwrap(),
            category: Some(Category::Electronics),
        })
        .await
        .expect("Failed to seed product");

    let state = AppState::new(test_config(&flutterwave.uri(), &paypal.uri()), store.clone())
        .expect("Failed to build app state");

    TestApp {
        router: build_router(state),
        store,
        flutterwave,
        paypal,
        product,
    }
}

/// Base URL of a provider that has gone away: the port was bound once and
/// is now closed, so connections are refused. A dropped `MockServer` goes
/// back to wiremock's pool and keeps listening, so a bare listener is used.
#[allow(dead_code)]
pub async fn unreachable_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind listener");
    let addr = listener.local_addr().expect("Failed to read local address");
    drop(listener);
    format!("http://{}", addr)
}

#[allow(dead_code)]
impl TestApp {
    /// Rebuild the router against other provider base URLs, keeping the
    /// same store.
    pub fn point_providers_at(&mut self, flutterwave_url: &str, paypal_url: &str) {
        let state = AppState::new(test_config(flutterwave_url, paypal_url), self.store.clone())
            .expect("Failed to build app state");
        self.router = build_router(state);
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        TestResponse { status, body }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(Method::GET, uri, None, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> TestResponse {
        self.request(Method::POST, uri, Some(body), None).await
    }

    pub async fn add_item(&self, cart_code: &str) -> TestResponse {
        self.post(
            "/add_item/",
            serde_json::json!({
                "cart_code": cart_code,
                "product_id": self.product.product_id,
            }),
        )
        .await
    }

    /// Register `username` and return an access token.
    pub async fn login(&self, username: &str) -> String {
        let registered = self
            .post(
                "/register/",
                serde_json::json!({
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "password": PASSWORD,
                    "first_name": "Test",
                    "last_name": "Buyer",
                }),
            )
            .await;
        assert_eq!(registered.status, StatusCode::CREATED, "{:?}", registered.body);

        let tokens = self
            .post(
                "/api/token/",
                serde_json::json!({ "username": username, "password": PASSWORD }),
            )
            .await;
        assert_eq!(tokens.status, StatusCode::OK, "{:?}", tokens.body);
        tokens.body["access"].as_str().unwrap().to_string()
    }

    /// A cart holding two units of the seeded product (20.00 before tax).
    pub async fn cart_with_two_items(&self, cart_code: &str) {
        for _ in 0..2 {
            let response = self.add_item(cart_code).await;
            assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        }
    }
}
