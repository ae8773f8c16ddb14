use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::question::AnswerLabel;
use crate::models::quiz::{Quiz, QuizSource, StoredQuiz};
use crate::models::submission::{QuizSubmission, UserAnswer};
use crate::utils::topic::{cache_key, normalize_topic};

#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub position: i32,
    pub text: String,
    pub options: [String; 4],
    pub correct_answer: AnswerLabel,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewQuiz {
    pub topic: String,
    pub normalized_topic: String,
    pub model: String,
    pub cache_key: String,
    pub requester_id: Option<String>,
    pub source: QuizSource,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub questions: Vec<NewQuestion>,
}

impl NewQuiz {
    pub fn new(
        topic: &str,
        model: &str,
        requester_id: Option<String>,
        source: QuizSource,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        questions: Vec<NewQuestion>,
    ) -> Self {
        Self {
            topic: topic.trim().to_string(),
            normalized_topic: normalize_topic(topic),
            model: model.trim().to_string(),
            cache_key: cache_key(topic, model),
            requester_id,
            source,
            created_at,
            expires_at,
            questions,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub quiz_id: Uuid,
    pub requester_id: Option<String>,
    pub score: i32,
    pub total: i32,
    pub percentage: i32,
}

#[derive(Debug, Clone)]
pub struct NewUserAnswer {
    pub question_id: Uuid,
    pub selected: AnswerLabel,
    pub is_correct: bool,
}

/// Durable system of record for quizzes and submissions.
///
/// `create_quiz` persists the quiz and all of its questions as one unit.
/// Submission writes are deliberately split so the caller can run the
/// answer batch as a second phase and undo the first with
/// `delete_submission`.
#[async_trait]
pub trait QuizStore: Send + Sync {
    async fn create_quiz(&self, quiz: NewQuiz) -> Result<StoredQuiz>;

    /// Most recent first, restricted to quizzes of the given source.
    async fn find_recent_quizzes(
        &self,
        normalized_topic: &str,
        model: &str,
        source: QuizSource,
        limit: i64,
    ) -> Result<Vec<Quiz>>;

    async fn find_quiz(&self, id: Uuid) -> Result<Option<StoredQuiz>>;

    async fn create_submission(&self, submission: NewSubmission) -> Result<QuizSubmission>;

    async fn create_user_answers(
        &self,
        submission_id: Uuid,
        answers: &[NewUserAnswer],
    ) -> Result<Vec<UserAnswer>>;

    async fn delete_submission(&self, id: Uuid) -> Result<()>;

    async fn find_submission(&self, id: Uuid) -> Result<Option<QuizSubmission>>;

    async fn find_user_answers(&self, submission_id: Uuid) -> Result<Vec<UserAnswer>>;
}
