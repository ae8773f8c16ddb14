pub mod health;
pub mod quiz;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::middleware::{auth::optional_bearer_auth, rate_limit};
use crate::AppState;

pub fn router(state: AppState) -> Router {
    let quiz_api = Router::new()
        .route("/api/quizzes", post(quiz::generate_quiz))
        .route("/api/quizzes/:id", get(quiz::get_quiz))
        .route("/api/quizzes/:id/submit", post(quiz::submit_quiz))
        .route("/api/submissions/:id", get(quiz::get_submission))
        .layer(axum::middleware::from_fn_with_state(
            state.auth.clone(),
            optional_bearer_auth,
        ))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit::RateLimiter::new(state.public_rps),
            rate_limit::rps_middleware,
        ));

    let timeout = state.request_timeout;

    Router::new()
        .route("/health", get(health::health))
        .merge(quiz_api)
        .with_state(state)
        .layer(TimeoutLayer::new(timeout))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
