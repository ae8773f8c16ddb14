pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;
use std::time::Duration;

use crate::database::store::QuizStore;
use crate::middleware::auth::AuthState;
use crate::services::{
    ai_service::QuizProvider,
    cache_service::QuizCache,
    quiz_service::{QuizService, QuizSettings},
    submission_service::SubmissionService,
};

#[derive(Clone)]
pub struct AppState {
    pub quiz_service: QuizService,
    pub submission_service: SubmissionService,
    pub auth: AuthState,
    pub public_rps: u32,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(
        store: Arc<dyn QuizStore>,
        cache: Arc<dyn QuizCache>,
        provider: Arc<dyn QuizProvider>,
        settings: QuizSettings,
        jwt_secret: &str,
    ) -> Self {
        let quiz_service = QuizService::new(store.clone(), cache, provider, settings);
        let submission_service = SubmissionService::new(store);

        Self {
            quiz_service,
            submission_service,
            auth: AuthState::new(jwt_secret),
            public_rps: 20,
            request_timeout: Duration::from_secs(120),
        }
    }

    pub fn with_limits(mut self, public_rps: u32, request_timeout: Duration) -> Self {
        self.public_rps = public_rps;
        self.request_timeout = request_timeout;
        self
    }
}
