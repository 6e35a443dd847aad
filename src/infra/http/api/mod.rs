pub mod error;
pub mod handlers;
pub mod middleware;
pub mod state;

pub use state::ApiState;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

use crate::infra::http::middleware::{log_responses, set_request_context};

/// Item routes require an access token; account routes are public.
/// Every path is served with and without the trailing slash.
pub fn build_api_router(state: ApiState) -> Router {
    let collection = || get(handlers::list_items).post(handlers::create_item);
    let member = || {
        get(handlers::get_item)
            .put(handlers::update_item)
            .patch(handlers::patch_item)
            .delete(handlers::delete_item)
    };

    let items = Router::new()
        .route("/api/items", collection())
        .route("/api/items/", collection())
        .route("/api/items/{id}", member())
        .route("/api/items/{id}/", member())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::api_auth,
        ));

    let accounts = Router::new()
        .route("/api/register", post(handlers::register))
        .route("/api/register/", post(handlers::register))
        .route("/api/login", post(handlers::login))
        .route("/api/login/", post(handlers::login))
        .route("/api/token/refresh", post(handlers::refresh_token))
        .route("/api/token/refresh/", post(handlers::refresh_token));

    Router::new()
        .merge(items)
        .merge(accounts)
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
