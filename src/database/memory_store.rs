use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::{NewQuiz, NewSubmission, NewUserAnswer, QuizStore};
use crate::error::{Error, Result};
use crate::models::question::Question;
use crate::models::quiz::{Quiz, QuizSource, StoredQuiz};
use crate::models::submission::{QuizSubmission, UserAnswer};

#[derive(Default)]
struct Tables {
    quizzes: HashMap<Uuid, StoredQuiz>,
    submissions: HashMap<Uuid, QuizSubmission>,
    answers: HashMap<Uuid, Vec<UserAnswer>>,
}

/// Process-local store used when no database is configured and in tests.
/// Mirrors the relational constraints of the Postgres schema.
#[derive(Default)]
pub struct MemoryQuizStore {
    tables: RwLock<Tables>,
}

impl MemoryQuizStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn submission_count(&self) -> usize {
        self.tables.read().await.submissions.len()
    }

    pub async fn user_answer_count(&self) -> usize {
        self.tables.read().await.answers.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl QuizStore for MemoryQuizStore {
    async fn create_quiz(&self, new: NewQuiz) -> Result<StoredQuiz> {
        if new.questions.is_empty() {
            return Err(Error::Internal("Refusing to persist a quiz without questions".to_string()));
        }

        let quiz = Quiz {
            id: Uuid::new_v4(),
            topic: new.topic,
            normalized_topic: new.normalized_topic,
            model: new.model,
            cache_key: new.cache_key,
            requester_id: new.requester_id,
            source: new.source,
            created_at: new.created_at,
            expires_at: new.expires_at,
        };
        let mut questions: Vec<Question> = new
            .questions
            .into_iter()
            .map(|q| Question {
                id: Uuid::new_v4(),
                quiz_id: quiz.id,
                position: q.position,
                text: q.text,
                options: q.options,
                correct_answer: q.correct_answer,
                explanation: q.explanation,
            })
            .collect();
        questions.sort_by_key(|q| q.position);

        let stored = StoredQuiz { quiz, questions };
        self.tables
            .write()
            .await
            .quizzes
            .insert(stored.quiz.id, stored.clone());
        Ok(stored)
    }

    async fn find_recent_quizzes(
        &self,
        normalized_topic: &str,
        model: &str,
        source: QuizSource,
        limit: i64,
    ) -> Result<Vec<Quiz>> {
        let tables = self.tables.read().await;
        let mut matches: Vec<Quiz> = tables
            .quizzes
            .values()
            .map(|s| &s.quiz)
            .filter(|q| q.normalized_topic == normalized_topic && q.model == model && q.source == source)
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matches.truncate(limit.max(0) as usize);
        Ok(matches)
    }

    async fn find_quiz(&self, id: Uuid) -> Result<Option<StoredQuiz>> {
        Ok(self.tables.read().await.quizzes.get(&id).cloned())
    }

    async fn create_submission(&self, submission: NewSubmission) -> Result<QuizSubmission> {
        let mut tables = self.tables.write().await;
        if !tables.quizzes.contains_key(&submission.quiz_id) {
            return Err(Error::Internal(format!(
                "quiz_submissions.quiz_id references missing quiz {}",
                submission.quiz_id
            )));
        }
        let created = QuizSubmission {
            id: Uuid::new_v4(),
            quiz_id: submission.quiz_id,
            requester_id: submission.requester_id,
            score: submission.score,
            total: submission.total,
            percentage: submission.percentage,
            created_at: Utc::now(),
        };
        tables.submissions.insert(created.id, created.clone());
        Ok(created)
    }

    async fn create_user_answers(
        &self,
        submission_id: Uuid,
        answers: &[NewUserAnswer],
    ) -> Result<Vec<UserAnswer>> {
        let mut tables = self.tables.write().await;
        let Some(submission) = tables.submissions.get(&submission_id) else {
            return Err(Error::Internal(format!(
                "user_answers.submission_id references missing submission {}",
                submission_id
            )));
        };
        let quiz_questions = tables
            .quizzes
            .get(&submission.quiz_id)
            .map(|s| s.questions.iter().map(|q| q.id).collect::<Vec<_>>())
            .unwrap_or_default();
        if let Some(orphan) = answers.iter().find(|a| !quiz_questions.contains(&a.question_id)) {
            return Err(Error::Internal(format!(
                "user_answers.question_id references unknown question {}",
                orphan.question_id
            )));
        }

        let created: Vec<UserAnswer> = answers
            .iter()
            .map(|a| UserAnswer {
                id: Uuid::new_v4(),
                submission_id,
                question_id: a.question_id,
                selected: a.selected,
                is_correct: a.is_correct,
            })
            .collect();
        tables
            .answers
            .entry(submission_id)
            .or_default()
            .extend(created.iter().cloned());
        Ok(created)
    }

    async fn delete_submission(&self, id: Uuid) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.submissions.remove(&id);
        tables.answers.remove(&id);
        Ok(())
    }

    async fn find_submission(&self, id: Uuid) -> Result<Option<QuizSubmission>> {
        Ok(self.tables.read().await.submissions.get(&id).cloned())
    }

    async fn find_user_answers(&self, submission_id: Uuid) -> Result<Vec<UserAnswer>> {
        let tables = self.tables.read().await;
        let Some(answers) = tables.answers.get(&submission_id) else {
            return Ok(Vec::new());
        };
        let position_of = |question_id: Uuid| {
            tables
                .submissions
                .get(&submission_id)
                .and_then(|s| tables.quizzes.get(&s.quiz_id))
                .and_then(|stored| stored.questions.iter().find(|q| q.id == question_id))
                .map(|q| q.position)
                .unwrap_or(i32::MAX)
        };
        let mut ordered = answers.clone();
        ordered.sort_by_key(|a| position_of(a.question_id));
        Ok(ordered)
    }
}
