use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::question::AnswerLabel;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct QuizSubmission {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub requester_id: Option<String>,
    pub score: i32,
    pub total: i32,
    pub percentage: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAnswer {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub question_id: Uuid,
    pub selected: AnswerLabel,
    /// Computed once at submission time and never re-derived.
    pub is_correct: bool,
}
