use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::question::{AnswerLabel, Question};
use crate::models::quiz::StoredQuiz;
use crate::utils::validation::{validate_model, validate_topic};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GenerateQuizRequest {
    #[validate(custom(function = "topic_rule"))]
    pub topic: String,
    #[validate(custom(function = "model_rule"))]
    pub model: String,
    #[serde(default)]
    pub force_new: bool,
}

fn topic_rule(topic: &str) -> Result<(), ValidationError> {
    validate_topic(topic)
}

fn model_rule(model: &str) -> Result<(), ValidationError> {
    validate_model(model)
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitQuizRequest {
    #[validate(length(min = 1, max = 20))]
    pub answers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizedOption {
    pub label: AnswerLabel,
    pub text: String,
}

/// Externally visible question. Carries no correct answer and no explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizedQuestion {
    pub id: Uuid,
    pub position: i32,
    pub text: String,
    pub options: Vec<SanitizedOption>,
}

/// Externally visible quiz; also the value written to the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizedQuiz {
    pub id: Uuid,
    pub topic: String,
    pub model: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub questions: Vec<SanitizedQuestion>,
}

impl SanitizedQuestion {
    pub fn from_question(question: &Question) -> Self {
        Self {
            id: question.id,
            position: question.position,
            text: question.text.clone(),
            options: AnswerLabel::ALL
                .iter()
                .map(|label| SanitizedOption {
                    label: *label,
                    text: question.option(*label).to_string(),
                })
                .collect(),
        }
    }
}

impl SanitizedQuiz {
    pub fn from_stored(stored: &StoredQuiz) -> Self {
        let mut questions: Vec<SanitizedQuestion> =
            stored.questions.iter().map(SanitizedQuestion::from_question).collect();
        questions.sort_by_key(|q| q.position);
        Self {
            id: stored.quiz.id,
            topic: stored.quiz.topic.clone(),
            model: stored.quiz.model.clone(),
            created_at: stored.quiz.created_at,
            expires_at: stored.quiz.expires_at,
            questions,
        }
    }
}

/// Which path of the reuse policy produced a quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizOrigin {
    Cache,
    Store,
    Generated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateQuizResponse {
    pub origin: QuizOrigin,
    pub quiz: SanitizedQuiz,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionResult {
    pub question_id: Uuid,
    pub position: i32,
    pub question: String,
    pub submitted: AnswerLabel,
    pub correct_answer: AnswerLabel,
    pub is_correct: bool,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizResult {
    pub submission_id: Uuid,
    pub quiz_id: Uuid,
    pub score: i32,
    pub total: i32,
    pub percentage: i32,
    pub feedback: String,
    pub submitted_at: DateTime<Utc>,
    pub results: Vec<QuestionResult>,
}
