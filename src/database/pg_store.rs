use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::store::{NewQuiz, NewSubmission, NewUserAnswer, QuizStore};
use crate::error::{Error, Result};
use crate::models::question::{AnswerLabel, Question};
use crate::models::quiz::{Quiz, QuizSource, StoredQuiz};
use crate::models::submission::{QuizSubmission, UserAnswer};

#[derive(sqlx::FromRow)]
struct QuizRow {
    id: Uuid,
    topic: String,
    normalized_topic: String,
    model: String,
    cache_key: String,
    requester_id: Option<String>,
    source: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl TryFrom<QuizRow> for Quiz {
    type Error = Error;

    fn try_from(row: QuizRow) -> Result<Self> {
        Ok(Quiz {
            id: row.id,
            topic: row.topic,
            normalized_topic: row.normalized_topic,
            model: row.model,
            cache_key: row.cache_key,
            requester_id: row.requester_id,
            source: row.source.parse().map_err(Error::Internal)?,
            created_at: row.created_at,
            expires_at: row.expires_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct QuestionRow {
    id: Uuid,
    quiz_id: Uuid,
    position: i32,
    text: String,
    option_a: String,
    option_b: String,
    option_c: String,
    option_d: String,
    correct_answer: String,
    explanation: Option<String>,
}

impl TryFrom<QuestionRow> for Question {
    type Error = Error;

    fn try_from(row: QuestionRow) -> Result<Self> {
        Ok(Question {
            id: row.id,
            quiz_id: row.quiz_id,
            position: row.position,
            text: row.text,
            options: [row.option_a, row.option_b, row.option_c, row.option_d],
            correct_answer: parse_label(&row.correct_answer)?,
            explanation: row.explanation,
        })
    }
}

#[derive(sqlx::FromRow)]
struct UserAnswerRow {
    id: Uuid,
    submission_id: Uuid,
    question_id: Uuid,
    selected: String,
    is_correct: bool,
}

impl TryFrom<UserAnswerRow> for UserAnswer {
    type Error = Error;

    fn try_from(row: UserAnswerRow) -> Result<Self> {
        Ok(UserAnswer {
            id: row.id,
            submission_id: row.submission_id,
            question_id: row.question_id,
            selected: parse_label(&row.selected)?,
            is_correct: row.is_correct,
        })
    }
}

fn parse_label(raw: &str) -> Result<AnswerLabel> {
    raw.parse()
        .map_err(|e: String| Error::Internal(format!("Corrupt answer label in store: {}", e)))
}

fn collect<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = Error>,
{
    rows.into_iter().map(T::try_from).collect()
}

#[derive(Clone)]
pub struct PgQuizStore {
    pool: PgPool,
}

impl PgQuizStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuizStore for PgQuizStore {
    async fn create_quiz(&self, new: NewQuiz) -> Result<StoredQuiz> {
        if new.questions.is_empty() {
            return Err(Error::Internal("Refusing to persist a quiz without questions".to_string()));
        }

        // Quiz row and question rows commit together or not at all.
        let mut tx = self.pool.begin().await?;

        let quiz_row = sqlx::query_as::<_, QuizRow>(
            r#"
            INSERT INTO quizzes (
                id, topic, normalized_topic, model, cache_key, requester_id, source, created_at, expires_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.topic)
        .bind(&new.normalized_topic)
        .bind(&new.model)
        .bind(&new.cache_key)
        .bind(&new.requester_id)
        .bind(new.source.as_str())
        .bind(new.created_at)
        .bind(new.expires_at)
        .fetch_one(&mut *tx)
        .await?;

        let quiz_id = quiz_row.id;
        let mut builder = QueryBuilder::<Postgres>::new(
            "INSERT INTO questions (id, quiz_id, position, text, option_a, option_b, option_c, option_d, correct_answer, explanation) ",
        );
        builder.push_values(new.questions.iter(), |mut b, q| {
            b.push_bind(Uuid::new_v4())
                .push_bind(quiz_id)
                .push_bind(q.position)
                .push_bind(q.text.clone())
                .push_bind(q.options[0].clone())
                .push_bind(q.options[1].clone())
                .push_bind(q.options[2].clone())
                .push_bind(q.options[3].clone())
                .push_bind(q.correct_answer.as_str())
                .push_bind(q.explanation.clone());
        });
        builder.push(" RETURNING *");

        let question_rows: Vec<QuestionRow> =
            builder.build_query_as().fetch_all(&mut *tx).await?;

        tx.commit().await?;

        let mut questions: Vec<Question> = collect(question_rows)?;
        questions.sort_by_key(|q| q.position);

        Ok(StoredQuiz {
            quiz: quiz_row.try_into()?,
            questions,
        })
    }

    async fn find_recent_quizzes(
        &self,
        normalized_topic: &str,
        model: &str,
        source: QuizSource,
        limit: i64,
    ) -> Result<Vec<Quiz>> {
        let rows = sqlx::query_as::<_, QuizRow>(
            r#"
            SELECT * FROM quizzes
            WHERE normalized_topic = $1 AND model = $2 AND source = $3
            ORDER BY created_at DESC
            LIMIT $4
            "#,
        )
        .bind(normalized_topic)
        .bind(model)
        .bind(source.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        collect(rows)
    }

    async fn find_quiz(&self, id: Uuid) -> Result<Option<StoredQuiz>> {
        let Some(quiz_row) =
            sqlx::query_as::<_, QuizRow>(r#"SELECT * FROM quizzes WHERE id = $1"#)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
        else {
            return Ok(None);
        };

        let question_rows = sqlx::query_as::<_, QuestionRow>(
            r#"SELECT * FROM questions WHERE quiz_id = $1 ORDER BY position ASC"#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(StoredQuiz {
            quiz: quiz_row.try_into()?,
            questions: collect(question_rows)?,
        }))
    }

    async fn create_submission(&self, submission: NewSubmission) -> Result<QuizSubmission> {
        let created = sqlx::query_as::<_, QuizSubmission>(
            r#"
            INSERT INTO quiz_submissions (id, quiz_id, requester_id, score, total, percentage, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(submission.quiz_id)
        .bind(&submission.requester_id)
        .bind(submission.score)
        .bind(submission.total)
        .bind(submission.percentage)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn create_user_answers(
        &self,
        submission_id: Uuid,
        answers: &[NewUserAnswer],
    ) -> Result<Vec<UserAnswer>> {
        if answers.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Postgres>::new(
            "INSERT INTO user_answers (id, submission_id, question_id, selected, is_correct) ",
        );
        builder.push_values(answers.iter(), |mut b, a| {
            b.push_bind(Uuid::new_v4())
                .push_bind(submission_id)
                .push_bind(a.question_id)
                .push_bind(a.selected.as_str())
                .push_bind(a.is_correct);
        });
        builder.push(" RETURNING *");

        let rows: Vec<UserAnswerRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        collect(rows)
    }

    async fn delete_submission(&self, id: Uuid) -> Result<()> {
        sqlx::query(r#"DELETE FROM quiz_submissions WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_submission(&self, id: Uuid) -> Result<Option<QuizSubmission>> {
        let row = sqlx::query_as::<_, QuizSubmission>(
            r#"SELECT * FROM quiz_submissions WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_user_answers(&self, submission_id: Uuid) -> Result<Vec<UserAnswer>> {
        let rows = sqlx::query_as::<_, UserAnswerRow>(
            r#"
            SELECT ua.* FROM user_answers ua
            JOIN questions q ON q.id = ua.question_id
            WHERE ua.submission_id = $1
            ORDER BY q.position ASC
            "#,
        )
        .bind(submission_id)
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }
}
