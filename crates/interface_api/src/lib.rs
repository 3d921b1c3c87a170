//! HTTP API Layer
//!
//! REST surface over the remittance service using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: configurations, billets, remittances and their files
//! - **Middleware**: JWT authentication, request ids, audit logging
//! - **DTOs**: request/response bodies
//! - **Error Handling**: `{ "error": code, "message": text }` bodies with the
//!   status derived from the domain error code
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::create_router;
//!
//! let app = create_router(service, config);
//! axum::serve(listener, app).await?;
//! ```

pub mod auth;
pub mod config;
pub mod context;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::{
    http::HeaderName,
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use domain_remittance::RemittanceService;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::handlers::{billets, configurations, health, remittances};
use crate::middleware::{audit_middleware, auth_middleware, REQUEST_ID_HEADER};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RemittanceService>,
    pub config: ApiConfig,
}

/// Creates the main API router
pub fn create_router(service: Arc<RemittanceService>, config: ApiConfig) -> Router {
    let state = AppState { service, config };

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let configuration_routes = Router::new()
        .route(
            "/",
            post(configurations::create_configuration).get(configurations::list_configurations),
        )
        .route(
            "/:id",
            get(configurations::get_configuration)
                .put(configurations::update_configuration)
                .delete(configurations::delete_configuration),
        );

    let billet_routes = Router::new()
        .route("/", post(billets::create_billet).get(billets::list_billets))
        .route("/:id", get(billets::get_billet).delete(billets::delete_billet));

    let remittance_routes = Router::new()
        .route(
            "/",
            post(remittances::create_remittance).get(remittances::list_remittances),
        )
        .route(
            "/:id",
            get(remittances::get_remittance).delete(remittances::delete_remittance),
        )
        .route("/:id/billets", post(remittances::add_billets))
        .route("/:id/billets/:billet_id", delete(remittances::remove_billet))
        .route("/:id/submit", post(remittances::submit_remittance))
        .route(
            "/:id/file",
            post(remittances::generate_file).get(remittances::download_file),
        );

    // Protected API routes
    let api_routes = Router::new()
        .nest("/configurations", configuration_routes)
        .nest("/billets", billet_routes)
        .nest("/remittances", remittance_routes)
        .layer(axum_middleware::from_fn(audit_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
