use actix_web::{get, post, web, HttpResponse};
use validator::Validate;

use crate::{
    app_state::AppState,
    auth::AuthenticatedUser,
    errors::AppError,
    models::dto::request::{TimeSpentRequest, VideoProgressRequest},
    models::dto::response::SubjectProgressResponse,
};

#[post("/api/progress/lessons/{lesson_id}/access")]
async fn record_lesson_access(
    state: web::Data<AppState>,
    lesson_id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    state
        .progress_service
        .record_lesson_access(&auth.user_id, &lesson_id)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

#[post("/api/progress/lessons/{lesson_id}/video")]
async fn record_video_progress(
    state: web::Data<AppState>,
    lesson_id: web::Path<String>,
    request: web::Json<VideoProgressRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    request.validate()?;
    state
        .progress_service
        .record_video_progress(&auth.user_id, &lesson_id, request.current_time_seconds)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

#[post("/api/progress/lessons/{lesson_id}/time")]
async fn record_time_spent(
    state: web::Data<AppState>,
    lesson_id: web::Path<String>,
    request: web::Json<TimeSpentRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    request.validate()?;
    state
        .progress_service
        .record_time_spent(&auth.user_id, &lesson_id, request.seconds_spent)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

#[get("/api/progress/subjects/{subject_id}")]
async fn get_subject_progress(
    state: web::Data<AppState>,
    subject_id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let overview = state
        .progress_service
        .get_subject_overview(&auth.user_id, &subject_id)
        .await?;
    Ok(HttpResponse::Ok().json(SubjectProgressResponse::from_overview(
        &subject_id,
        overview,
    )))
}
