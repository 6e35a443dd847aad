pub mod api;
mod middleware;

pub use api::{ApiState, build_api_router};
pub use middleware::RequestContext;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Router, middleware as axum_middleware, routing::get};
use sqlx::Error as SqlxError;

use crate::application::error::ErrorReport;
use crate::infra::db::PostgresRepositories;

/// Full application router: the API plus the unauthenticated health probe.
pub fn build_router(api: ApiState, repositories: Arc<PostgresRepositories>) -> Router {
    build_api_router(api).merge(build_health_router(repositories))
}

pub fn build_health_router(repositories: Arc<PostgresRepositories>) -> Router {
    Router::new()
        .route("/health", get(db_health))
        .with_state(repositories)
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}

async fn db_health(State(repositories): State<Arc<PostgresRepositories>>) -> Response {
    db_health_response(repositories.health_check().await)
}

fn db_health_response(result: Result<(), SqlxError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_reports_database_state() {
        assert_eq!(db_health_response(Ok(())).status(), StatusCode::NO_CONTENT);

        let failing = db_health_response(Err(SqlxError::PoolTimedOut));
        assert_eq!(failing.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(failing.extensions().get::<ErrorReport>().is_some());
    }
}
