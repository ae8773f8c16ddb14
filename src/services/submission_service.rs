use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::grading_service::{Grade, GradingService};
use super::parser_service::QUESTIONS_PER_QUIZ;
use crate::database::store::{NewSubmission, NewUserAnswer, QuizStore};
use crate::dto::quiz_dto::{QuestionResult, QuizResult};
use crate::error::{Error, Result};
use crate::models::question::{AnswerLabel, Question};
use crate::models::quiz::{owner_allows, StoredQuiz};
use crate::models::submission::{QuizSubmission, UserAnswer};

#[derive(Clone)]
pub struct SubmissionService {
    store: Arc<dyn QuizStore>,
}

impl SubmissionService {
    pub fn new(store: Arc<dyn QuizStore>) -> Self {
        Self { store }
    }

    /// Grades `answers` (one label per question, in ordinal order) against a
    /// stored quiz and records the submission with its answers as one unit.
    pub async fn submit(
        &self,
        quiz_id: Uuid,
        answers: &[String],
        requester_id: Option<&str>,
    ) -> Result<QuizResult> {
        let labels = parse_answers(answers)?;
        if labels.len() != QUESTIONS_PER_QUIZ {
            return Err(Error::BadRequest(format!(
                "Expected {} answers, got {}",
                QUESTIONS_PER_QUIZ,
                labels.len()
            )));
        }

        let stored = self
            .store
            .find_quiz(quiz_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Quiz {} not found", quiz_id)))?;

        if stored.quiz.is_expired_at(Utc::now()) {
            tracing::info!(quiz_id = %quiz_id, expires_at = %stored.quiz.expires_at, "Rejected submission for expired quiz");
            return Err(Error::QuizExpired(quiz_id));
        }
        if !stored.quiz.is_accessible_by(requester_id) {
            return Err(Error::Forbidden("This quiz belongs to another user".to_string()));
        }
        if stored.questions.len() != labels.len() {
            return Err(Error::BadRequest(format!(
                "Quiz has {} questions but {} answers were submitted",
                stored.questions.len(),
                labels.len()
            )));
        }

        let grade = GradingService::grade(&stored.questions, &labels);
        let (submission, saved_answers) = self.record(&stored, requester_id, &grade).await?;

        tracing::info!(
            quiz_id = %quiz_id,
            submission_id = %submission.id,
            score = submission.score,
            total = submission.total,
            "Quiz submitted"
        );
        Ok(build_result(&submission, &stored.questions, &saved_answers))
    }

    pub async fn get_result(&self, submission_id: Uuid, requester_id: Option<&str>) -> Result<QuizResult> {
        let submission = self
            .store
            .find_submission(submission_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Submission {} not found", submission_id)))?;
        if !owner_allows(submission.requester_id.as_deref(), requester_id) {
            return Err(Error::Forbidden("This submission belongs to another user".to_string()));
        }

        let stored = self
            .store
            .find_quiz(submission.quiz_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Quiz {} not found", submission.quiz_id)))?;
        let answers = self.store.find_user_answers(submission_id).await?;

        Ok(build_result(&submission, &stored.questions, &answers))
    }

    /// Phase one writes the submission row, phase two the answer batch. A
    /// failure in phase two undoes phase one before the error is returned.
    async fn record(
        &self,
        stored: &StoredQuiz,
        requester_id: Option<&str>,
        grade: &Grade,
    ) -> Result<(QuizSubmission, Vec<UserAnswer>)> {
        let submission = self
            .store
            .create_submission(NewSubmission {
                quiz_id: stored.quiz.id,
                requester_id: requester_id.map(str::to_string),
                score: grade.score,
                total: grade.total,
                percentage: grade.percentage,
            })
            .await?;

        let new_answers: Vec<NewUserAnswer> = grade
            .answers
            .iter()
            .map(|a| NewUserAnswer {
                question_id: a.question_id,
                selected: a.submitted,
                is_correct: a.is_correct,
            })
            .collect();

        match self.store.create_user_answers(submission.id, &new_answers).await {
            Ok(saved) => Ok((submission, saved)),
            Err(err) => {
                tracing::warn!(submission_id = %submission.id, error = %err, "Saving answers failed, rolling back submission");
                if let Err(undo_err) = self.store.delete_submission(submission.id).await {
                    tracing::error!(
                        submission_id = %submission.id,
                        error = %undo_err,
                        "Rollback of submission failed"
                    );
                }
                Err(err)
            }
        }
    }
}

fn parse_answers(answers: &[String]) -> Result<Vec<AnswerLabel>> {
    answers
        .iter()
        .enumerate()
        .map(|(i, raw)| {
            raw.parse::<AnswerLabel>().map_err(|_| {
                Error::BadRequest(format!(
                    "Answer {} must be one of A, B, C or D (got '{}')",
                    i + 1,
                    raw.trim()
                ))
            })
        })
        .collect()
}

fn build_result(submission: &QuizSubmission, questions: &[Question], answers: &[UserAnswer]) -> QuizResult {
    let mut results: Vec<QuestionResult> = answers
        .iter()
        .filter_map(|answer| {
            let question = questions.iter().find(|q| q.id == answer.question_id)?;
            Some(QuestionResult {
                question_id: question.id,
                position: question.position,
                question: question.text.clone(),
                submitted: answer.selected,
                correct_answer: question.correct_answer,
                is_correct: answer.is_correct,
                explanation: question.explanation.clone(),
            })
        })
        .collect();
    results.sort_by_key(|r| r.position);

    QuizResult {
        submission_id: submission.id,
        quiz_id: submission.quiz_id,
        score: submission.score,
        total: submission.total,
        percentage: submission.percentage,
        feedback: GradingService::feedback(submission.percentage).to_string(),
        submitted_at: submission.created_at,
        results,
    }
}
