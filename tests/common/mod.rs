#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use quiz_backend::{
    database::memory_store::MemoryQuizStore,
    error::Result,
    middleware::auth::Claims,
    routes,
    services::{
        ai_service::{ProviderError, ProviderFamily, QuizProvider},
        cache_service::MemoryQuizCache,
        quiz_service::QuizSettings,
    },
    AppState,
};
use serde_json::Value as JsonValue;
use tower::ServiceExt;

pub const SECRET: &str = "test_secret_key";

/// Correct labels of the questions produced by `quiz_text`.
pub const CORRECT: [&str; 5] = ["A", "B", "C", "D", "A"];

pub fn quiz_text(topic: &str, count: usize) -> String {
    (0..count)
        .map(|i| {
            format!(
                "Q{n}: What is fact {n} about {topic}?\nA) alpha\nB) beta\nC) gamma\nD) delta\nCorrect: {c}\nExplanation: Fact {n} explained.\n",
                n = i + 1,
                topic = topic,
                c = CORRECT[i % CORRECT.len()],
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub enum Reply {
    Questions(usize),
    Empty,
}

pub struct StubProvider {
    reply: Reply,
    calls: AtomicUsize,
}

impl StubProvider {
    pub fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuizProvider for StubProvider {
    async fn generate_raw(&self, topic: &str, _model: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.reply {
            Reply::Questions(n) => Ok(quiz_text(topic, n)),
            Reply::Empty => Err(ProviderError::EmptyResponse {
                family: ProviderFamily::OpenAi,
            }
            .into()),
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryQuizStore>,
    pub provider: Arc<StubProvider>,
}

pub fn app(reply: Reply) -> TestApp {
    app_with(reply, QuizSettings::default())
}

pub fn app_with(reply: Reply, settings: QuizSettings) -> TestApp {
    let store = Arc::new(MemoryQuizStore::new());
    let provider = StubProvider::new(reply);
    let state = AppState::new(
        store.clone(),
        Arc::new(MemoryQuizCache::new()),
        provider.clone(),
        settings,
        SECRET,
    )
    .with_limits(1000, Duration::from_secs(30));

    TestApp {
        router: routes::router(state),
        store,
        provider,
    }
}

pub fn token_for(sub: &str) -> String {
    let claims = Claims {
        sub: sub.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes()))
        .expect("encode token")
}

pub async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    body: Option<JsonValue>,
    token: Option<&str>,
) -> (StatusCode, JsonValue) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null)
    };
    (status, json)
}
