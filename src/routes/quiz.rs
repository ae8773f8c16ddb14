use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::quiz_dto::{GenerateQuizRequest, QuizOrigin, SubmitQuizRequest};
use crate::error::Result;
use crate::middleware::auth::Requester;
use crate::AppState;

#[axum::debug_handler]
pub async fn generate_quiz(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Json(req): Json<GenerateQuizRequest>,
) -> Result<Response> {
    req.validate()?;
    let response = state
        .quiz_service
        .resolve(&req.topic, &req.model, req.force_new, requester.id())
        .await?;

    let status = match response.origin {
        QuizOrigin::Generated => StatusCode::CREATED,
        QuizOrigin::Cache | QuizOrigin::Store => StatusCode::OK,
    };
    Ok((status, Json(response)).into_response())
}

#[axum::debug_handler]
pub async fn get_quiz(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let quiz = state.quiz_service.get_sanitized(id, requester.id()).await?;
    Ok(Json(quiz).into_response())
}

#[axum::debug_handler]
pub async fn submit_quiz(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Path(id): Path<Uuid>,
    Json(req): Json<SubmitQuizRequest>,
) -> Result<Response> {
    req.validate()?;
    let result = state
        .submission_service
        .submit(id, &req.answers, requester.id())
        .await?;
    Ok((StatusCode::CREATED, Json(result)).into_response())
}

#[axum::debug_handler]
pub async fn get_submission(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let result = state
        .submission_service
        .get_result(id, requester.id())
        .await?;
    Ok(Json(result).into_response())
}
