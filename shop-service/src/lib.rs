pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;
pub mod store;
pub mod utils;

use axum::http::{header, HeaderValue, Method};
use axum::middleware::from_fn;
use axum::{
    routing::{get, patch, post},
    Router,
};
use shop_core::error::AppError;
use shop_core::middleware::{metrics_middleware, request_id_middleware, REQUEST_ID_HEADER};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use config::ShopConfig;
use services::{
    AuthService, CartService, CatalogService, CheckoutLedger, FlutterwaveCheckout,
    FlutterwaveClient, JwtService, PayPalCheckout, PayPalClient,
};
use store::ShopStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ShopConfig>,
    pub store: Arc<dyn ShopStore>,
    pub catalog: CatalogService,
    pub carts: CartService,
    pub auth: AuthService,
    pub flutterwave: FlutterwaveCheckout,
    pub paypal: PayPalCheckout,
}

impl AppState {
    /// Wire the services over `store`. Provider clients are built even
    /// without credentials; their calls then fail with a configuration error.
    pub fn new(config: ShopConfig, store: Arc<dyn ShopStore>) -> Result<Self, AppError> {
        let jwt = JwtService::new(&config.jwt).map_err(AppError::ConfigError)?;
        let flutterwave_client =
            FlutterwaveClient::new(config.flutterwave.clone()).map_err(AppError::ConfigError)?;
        let paypal_client =
            PayPalClient::new(config.paypal.clone()).map_err(AppError::ConfigError)?;

        let ledger = CheckoutLedger::new(store.clone(), config.checkout.clone());

        Ok(Self {
            catalog: CatalogService::new(store.clone()),
            carts: CartService::new(store.clone()),
            auth: AuthService::new(store.clone(), jwt),
            flutterwave: FlutterwaveCheckout::new(
                ledger.clone(),
                flutterwave_client,
                &config.frontend.base_url,
            ),
            paypal: PayPalCheckout::new(ledger, paypal_client, &config.frontend.base_url),
            config: Arc::new(config),
            store,
        })
    }
}

fn cors_layer(frontend_base_url: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    match HeaderValue::from_str(frontend_base_url.trim_end_matches('/')) {
        Ok(origin) => layer.allow_origin(origin),
        Err(_) => {
            tracing::warn!(origin = %frontend_base_url, "Invalid frontend origin, CORS disabled");
            layer
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.frontend.base_url);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics))
        // Catalog
        .route("/products", get(handlers::products::list_products))
        .route(
            "/product_detail/:slug",
            get(handlers::products::product_detail),
        )
        // Cart
        .route("/add_item/", post(handlers::cart::add_item))
        .route("/product_in_cart/", get(handlers::cart::product_in_cart))
        .route("/get_cart_stat/", get(handlers::cart::cart_stat))
        .route("/get_cart/", get(handlers::cart::get_cart))
        .route("/update_quantity/", patch(handlers::cart::update_quantity))
        .route("/delete_cartitem/", post(handlers::cart::delete_cart_item))
        // Accounts
        .route("/register/", post(handlers::user::register))
        .route("/api/token/", post(handlers::user::obtain_token))
        .route("/api/token/refresh/", post(handlers::user::refresh_token))
        .route("/get_username/", get(handlers::user::get_username))
        .route("/user_info/", get(handlers::user::user_info))
        // Checkout
        .route(
            "/initiate_payment/",
            post(handlers::payments::initiate_payment),
        )
        .route(
            "/payment_callback/",
            get(handlers::payments::payment_callback).post(handlers::payments::payment_callback),
        )
        .route(
            "/initiate-paypal-payment/",
            post(handlers::payments::initiate_paypal_payment),
        )
        .route(
            "/capture-paypal-payment/",
            post(handlers::payments::capture_paypal_payment),
        )
        .route_layer(from_fn(metrics_middleware))
        .layer(cors)
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .with_state(state)
}
