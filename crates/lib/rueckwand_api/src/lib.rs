//! # rueckwand_api
//!
//! HTTP API library for Rueckwand.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use rueckwand_core::artifact::{ArtifactRenderer, TimestampCropRenderer};
use rueckwand_core::auth::Authenticator;
use rueckwand_core::store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::handlers::{auth, items, materials, product_types, sessions, users};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Persistence handles.
    pub store: Store,
    /// Login, token resolution and session management.
    pub authenticator: Authenticator,
    /// Renders item artifacts.
    pub renderer: Arc<dyn ArtifactRenderer>,
    /// API configuration.
    pub config: ApiConfig,
}

impl AppState {
    /// State over `store` with the default timestamp-crop renderer.
    pub fn new(store: Store, config: ApiConfig) -> Self {
        let renderer = Arc::new(TimestampCropRenderer::new(config.artifacts.clone()));
        Self::with_renderer(store, config, renderer)
    }

    pub fn with_renderer(
        store: Store,
        config: ApiConfig,
        renderer: Arc<dyn ArtifactRenderer>,
    ) -> Self {
        Self {
            authenticator: Authenticator::from_store(config.auth.clone(), &store),
            store,
            renderer,
            config,
        }
    }
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required). Logout resolves its own token.
    let public = Router::new()
        .route(routes::POST_LOGIN, post(auth::login_handler))
        .route(routes::POST_LOGOUT, post(auth::logout_handler))
        .route(routes::USERS, post(users::create_user_handler));

    // Protected routes (require auth)
    let protected = Router::new()
        .route(routes::TOKEN_SESSIONS, get(sessions::list_sessions_handler))
        .route(
            routes::TOKEN_SESSIONS_ID,
            get(sessions::get_session_handler).delete(sessions::delete_session_handler),
        )
        .route(routes::USERS, get(users::list_users_handler))
        .route(
            routes::USERS_ID,
            get(users::get_user_handler)
                .patch(users::update_user_handler)
                .delete(users::delete_user_handler),
        )
        .route(
            routes::MATERIALS,
            get(materials::list_materials_handler).post(materials::create_material_handler),
        )
        .route(
            routes::MATERIALS_ID,
            get(materials::get_material_handler)
                .patch(materials::update_material_handler)
                .delete(materials::delete_material_handler),
        )
        .route(
            routes::PRODUCT_TYPES,
            get(product_types::list_product_types_handler)
                .post(product_types::create_product_type_handler),
        )
        .route(
            routes::PRODUCT_TYPES_ID,
            get(product_types::get_product_type_handler)
                .patch(product_types::update_product_type_handler)
                .delete(product_types::delete_product_type_handler),
        )
        .route(
            routes::ITEMS,
            get(items::list_items_handler).post(items::create_item_handler),
        )
        .route(
            routes::ITEMS_ID,
            get(items::get_item_handler)
                .patch(items::update_item_handler)
                .delete(items::delete_item_handler),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
