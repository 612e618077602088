//! HTTP/JSON transport
//!
//! # API Endpoints
//!
//! | Method | Path | Auth |
//! |--------|------|------|
//! | POST | `/api/v1/login` | none |
//! | GET | `/api/v1/inventory` | none |
//! | GET | `/api/v1/inventory/{id}` | none |
//! | POST | `/api/v1/inventory` | bearer token |
//! | PUT | `/api/v1/inventory/{id}` | bearer token |
//! | DELETE | `/api/v1/inventory/{id}` | bearer token |
//! | GET | `/health` | none |
//! | GET | `/metrics` | none |
//!
//! ## POST /api/v1/inventory
//!
//! ```json
//! { "name": "Laptop", "stock": 10, "price": 999.99 }
//! ```
//!
//! Responds `201` with
//!
//! ```json
//! {
//!   "message": "Item created successfully",
//!   "data": { "id": "…", "name": "Laptop", "stock": 10, "price": 999.99 }
//! }
//! ```
//!
//! ## Rate limiting
//!
//! All routes share one token bucket. Once it is empty every request gets
//!
//! ```json
//! { "error": "Rate limit exceeded. Please try again later.", "retry_after": "1 second" }
//! ```
//!
//! with status `429` and a `Retry-After` header.

pub mod admission;
pub mod handlers;

use super::Transport;
use crate::auth::{Authenticator, Claims};
use crate::error::ApiError;
use crate::metrics::Metrics;
use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{Method, header};
use axum::routing::{get, post};
use axum::{Router, middleware};
use std::net::SocketAddr;
use std::sync::Arc;
use stockroom::{AdmissionGate, ItemAccessor, ItemStore};
use tower_http::cors::{Any, CorsLayer};

/// Item accessor over whichever store the server was started with
pub type Items = ItemAccessor<Arc<dyn ItemStore>>;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<AdmissionGate>,
    pub items: Arc<Items>,
    pub auth: Arc<Authenticator>,
    pub metrics: Arc<Metrics>,
}

/// Claims of a request carrying a valid bearer token
///
/// Handlers that take this extractor answer `401` without a valid
/// `Authorization: Bearer <token>` header.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        match state.auth.verify_bearer(header) {
            Ok(claims) => Ok(AuthUser(claims)),
            Err(e) => {
                tracing::debug!("Rejected {} {}: {}", parts.method, parts.uri.path(), e);
                Err(e.into())
            }
        }
    }
}

/// Build the application router
///
/// CORS runs outermost so preflight requests are answered without spending
/// a token; every other request passes the admission gate first.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/api/v1/login", post(handlers::login))
        .route(
            "/api/v1/inventory",
            get(handlers::list_items).post(handlers::create_item),
        )
        .route(
            "/api/v1/inventory/{id}",
            get(handlers::get_item)
                .put(handlers::update_item)
                .delete(handlers::delete_item),
        )
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .fallback(handlers::not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admission::admit,
        ))
        .layer(cors)
        .with_state(state)
}

/// HTTP transport implementation
pub struct HttpTransport {
    addr: SocketAddr,
}

impl HttpTransport {
    pub fn new(host: &str, port: u16) -> Result<Self> {
        let addr = format!("{host}:{port}")
            .parse()
            .with_context(|| format!("Invalid address: {host}:{port}"))?;
        Ok(Self { addr })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn start(self, state: AppState) -> Result<()> {
        let app = router(state);

        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .with_context(|| format!("Failed to bind to {}", self.addr))?;
        tracing::info!("HTTP server listening on {}", self.addr);

        axum::serve(listener, app).await?;

        Ok(())
    }
}
