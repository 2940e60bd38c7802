use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;
use super::AppState;
use crate::middleware::{make_span_with_request_id, request_id_middleware};

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .layer(
            // Request ids are assigned before the trace span is opened
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Catalog
        .route("/search", get(handlers::search_movies))
        .route("/autocomplete", get(handlers::autocomplete))
        .route("/movie/:id", get(handlers::get_movie))
        .route("/movie/:id/providers", get(handlers::get_watch_providers))
        .route("/person/movies", get(handlers::person_movies))
        .route("/trending", get(handlers::trending))
        // Recommendations
        .route(
            "/recommendations/movie/:id",
            get(handlers::movie_recommendations),
        )
        .route("/recommendations/hybrid", get(handlers::hybrid_recommendations))
        // Admin
        .route("/admin/cache", get(handlers::cache_stats))
        .route("/admin/cache/clear", post(handlers::clear_cache))
}
