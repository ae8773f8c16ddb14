use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::ai_service::QuizProvider;
use super::cache_service::QuizCache;
use super::fallback_service::FallbackProvider;
use super::parser_service::{parse_quiz_text, ParsedQuestion, QUESTIONS_PER_QUIZ};
use crate::database::store::{NewQuestion, NewQuiz, QuizStore};
use crate::dto::quiz_dto::{GenerateQuizResponse, QuizOrigin, SanitizedQuiz};
use crate::error::{Error, Result};
use crate::models::quiz::{owner_allows, QuizSource, StoredQuiz};
use crate::utils::topic::{cache_key, normalize_topic};
use crate::utils::validation::{validate_model, validate_topic};

#[derive(Debug, Clone)]
pub struct QuizSettings {
    /// How old the most recent stored quiz may be and still be handed out again.
    pub reuse_window: chrono::Duration,
    /// Offset from creation after which a quiz no longer accepts submissions.
    pub quiz_lifetime: chrono::Duration,
    pub cache_ttl: Duration,
    pub cache_timeout: Duration,
    pub candidate_limit: i64,
    pub fallback_enabled: bool,
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            reuse_window: chrono::Duration::hours(24),
            quiz_lifetime: chrono::Duration::hours(24),
            cache_ttl: Duration::from_secs(3600),
            cache_timeout: Duration::from_millis(500),
            candidate_limit: 5,
            fallback_enabled: false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CachedQuiz {
    owner: Option<String>,
    quiz: SanitizedQuiz,
}

#[derive(Clone)]
pub struct QuizService {
    store: Arc<dyn QuizStore>,
    cache: Arc<dyn QuizCache>,
    provider: Arc<dyn QuizProvider>,
    fallback: FallbackProvider,
    settings: QuizSettings,
}

impl QuizService {
    pub fn new(
        store: Arc<dyn QuizStore>,
        cache: Arc<dyn QuizCache>,
        provider: Arc<dyn QuizProvider>,
        settings: QuizSettings,
    ) -> Self {
        Self {
            store,
            cache,
            provider,
            fallback: FallbackProvider,
            settings,
        }
    }

    /// Returns a quiz for (topic, model): the cached one, else the most recent
    /// stored one if it is inside the reuse window, else a newly generated one.
    /// `force_new` skips both lookups.
    pub async fn resolve(
        &self,
        topic: &str,
        model: &str,
        force_new: bool,
        requester_id: Option<&str>,
    ) -> Result<GenerateQuizResponse> {
        validate_topic(topic)
            .map_err(|_| Error::BadRequest("Topic must be a non-empty string of at most 200 characters".to_string()))?;
        validate_model(model)
            .map_err(|_| Error::BadRequest(format!("Unrecognized model identifier '{}'", model.trim())))?;

        let key = cache_key(topic, model);

        if !force_new {
            if let Some(quiz) = self.cached_quiz(&key, requester_id).await {
                tracing::info!(cache_key = %key, quiz_id = %quiz.id, "Serving quiz from cache");
                return Ok(GenerateQuizResponse {
                    origin: QuizOrigin::Cache,
                    quiz,
                });
            }

            if let Some(stored) = self.reusable_quiz(topic, model, requester_id).await? {
                let quiz = SanitizedQuiz::from_stored(&stored);
                self.cache_quiz(&key, stored.quiz.requester_id.clone(), &quiz).await;
                tracing::info!(cache_key = %key, quiz_id = %quiz.id, "Reusing recent quiz from store");
                return Ok(GenerateQuizResponse {
                    origin: QuizOrigin::Store,
                    quiz,
                });
            }
        }

        let quiz = self.generate(topic, model, requester_id).await?;
        Ok(GenerateQuizResponse {
            origin: QuizOrigin::Generated,
            quiz,
        })
    }

    pub async fn get_sanitized(&self, quiz_id: Uuid, requester_id: Option<&str>) -> Result<SanitizedQuiz> {
        let stored = self
            .store
            .find_quiz(quiz_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Quiz {} not found", quiz_id)))?;
        if !stored.quiz.is_accessible_by(requester_id) {
            return Err(Error::Forbidden("This quiz belongs to another user".to_string()));
        }
        Ok(SanitizedQuiz::from_stored(&stored))
    }

    /// Persists five parsed questions as a new quiz and returns its sanitized view.
    /// AI quizzes are also written to the cache.
    pub async fn assemble(
        &self,
        topic: &str,
        model: &str,
        parsed: Vec<ParsedQuestion>,
        requester_id: Option<&str>,
        source: QuizSource,
    ) -> Result<SanitizedQuiz> {
        if parsed.len() != QUESTIONS_PER_QUIZ {
            return Err(Error::Generation(format!(
                "expected {} questions, got {}",
                QUESTIONS_PER_QUIZ,
                parsed.len()
            )));
        }
        if parsed
            .iter()
            .any(|q| q.text.trim().is_empty() || q.options.iter().any(|o| o.trim().is_empty()))
        {
            return Err(Error::Generation("question with empty text or option".to_string()));
        }

        let created_at = Utc::now();
        let questions = parsed
            .into_iter()
            .enumerate()
            .map(|(i, q)| NewQuestion {
                position: i as i32 + 1,
                text: q.text,
                options: q.options,
                correct_answer: q.correct,
                explanation: q.explanation,
            })
            .collect();

        let new_quiz = NewQuiz::new(
            topic,
            model,
            requester_id.map(str::to_string),
            source,
            created_at,
            created_at + self.settings.quiz_lifetime,
            questions,
        );
        let key = new_quiz.cache_key.clone();

        let stored = self.store.create_quiz(new_quiz).await?;
        if stored.questions.len() != QUESTIONS_PER_QUIZ {
            return Err(Error::Internal(format!(
                "quiz {} persisted with {} questions",
                stored.quiz.id,
                stored.questions.len()
            )));
        }

        let quiz = SanitizedQuiz::from_stored(&stored);
        if source == QuizSource::Ai {
            self.cache_quiz(&key, stored.quiz.requester_id.clone(), &quiz).await;
        }
        tracing::info!(quiz_id = %quiz.id, source = %source, cache_key = %key, "Quiz assembled");
        Ok(quiz)
    }

    async fn generate(&self, topic: &str, model: &str, requester_id: Option<&str>) -> Result<SanitizedQuiz> {
        match self
            .generate_from(self.provider.as_ref(), topic, model, requester_id, QuizSource::Ai)
            .await
        {
            Ok(quiz) => Ok(quiz),
            Err(err) if self.settings.fallback_enabled && err.is_generation_failure() => {
                tracing::warn!(error = %err, model = %model, "AI generation failed, serving fallback quiz");
                self.generate_from(&self.fallback, topic, model, requester_id, QuizSource::Fallback)
                    .await
            }
            Err(err) => Err(err),
        }
    }

    async fn generate_from(
        &self,
        provider: &dyn QuizProvider,
        topic: &str,
        model: &str,
        requester_id: Option<&str>,
        source: QuizSource,
    ) -> Result<SanitizedQuiz> {
        let raw = provider.generate_raw(topic.trim(), model.trim()).await?;
        let parsed = parse_quiz_text(&raw);
        if parsed.len() < QUESTIONS_PER_QUIZ {
            return Err(Error::Generation(format!(
                "only {} of {} questions could be parsed",
                parsed.len(),
                QUESTIONS_PER_QUIZ
            )));
        }
        self.assemble(topic, model, parsed, requester_id, source).await
    }

    /// Only the most recent quiz this requester may use is considered; if it
    /// is outside the reuse window, older candidates are not inspected.
    async fn reusable_quiz(
        &self,
        topic: &str,
        model: &str,
        requester_id: Option<&str>,
    ) -> Result<Option<StoredQuiz>> {
        let candidates = self
            .store
            .find_recent_quizzes(
                &normalize_topic(topic),
                model.trim(),
                QuizSource::Ai,
                self.settings.candidate_limit,
            )
            .await?;

        let Some(latest) = candidates.into_iter().find(|q| q.is_accessible_by(requester_id)) else {
            return Ok(None);
        };
        let now = Utc::now();
        if now - latest.created_at > self.settings.reuse_window || latest.is_expired_at(now) {
            tracing::debug!(quiz_id = %latest.id, "Most recent quiz is outside the reuse window");
            return Ok(None);
        }

        self.store.find_quiz(latest.id).await
    }

    async fn cached_quiz(&self, key: &str, requester_id: Option<&str>) -> Option<SanitizedQuiz> {
        let raw = match tokio::time::timeout(self.settings.cache_timeout, self.cache.get(key)).await {
            Ok(Ok(Some(raw))) => raw,
            Ok(Ok(None)) => return None,
            Ok(Err(e)) => {
                tracing::warn!(cache_key = %key, error = %e, "Cache read failed, treating as miss");
                return None;
            }
            Err(_) => {
                tracing::warn!(cache_key = %key, "Cache read timed out, treating as miss");
                return None;
            }
        };

        match serde_json::from_str::<CachedQuiz>(&raw) {
            Ok(entry) if Utc::now() >= self.reuse_deadline(&entry.quiz) => {
                tracing::debug!(cache_key = %key, quiz_id = %entry.quiz.id, "Cached quiz is past its reuse deadline");
                None
            }
            Ok(entry) if owner_allows(entry.owner.as_deref(), requester_id) => Some(entry.quiz),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(cache_key = %key, error = %e, "Dropping undecodable cache entry");
                match tokio::time::timeout(self.settings.cache_timeout, self.cache.delete(key)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => tracing::warn!(cache_key = %key, error = %e, "Cache delete failed"),
                    Err(_) => tracing::warn!(cache_key = %key, "Cache delete timed out"),
                }
                None
            }
        }
    }

    /// A quiz may be handed out until it expires or leaves the reuse window,
    /// whichever comes first.
    fn reuse_deadline(&self, quiz: &SanitizedQuiz) -> DateTime<Utc> {
        quiz.expires_at.min(quiz.created_at + self.settings.reuse_window)
    }

    async fn cache_quiz(&self, key: &str, owner: Option<String>, quiz: &SanitizedQuiz) {
        let remaining = match (self.reuse_deadline(quiz) - Utc::now()).to_std() {
            Ok(left) if !left.is_zero() => left,
            _ => {
                tracing::debug!(cache_key = %key, quiz_id = %quiz.id, "Quiz is past its reuse deadline, not caching");
                return;
            }
        };
        let ttl = self.settings.cache_ttl.min(remaining);

        let entry = CachedQuiz {
            owner,
            quiz: quiz.clone(),
        };
        let value = match serde_json::to_string(&entry) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(cache_key = %key, error = %e, "Could not serialize quiz for cache");
                return;
            }
        };
        match tokio::time::timeout(
            self.settings.cache_timeout,
            self.cache.set(key, value, ttl),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(cache_key = %key, error = %e, "Cache write failed"),
            Err(_) => tracing::warn!(cache_key = %key, "Cache write timed out"),
        }
    }
}
