use actix_web::{get, post, web, HttpResponse};
use validator::Validate;

use crate::{
    app_state::AppState,
    auth::AuthenticatedUser,
    errors::AppError,
    models::dto::request::{FailSimulationRequest, QuestionIndexQuery, SubmitAnswerRequest},
    models::dto::response::{
        FinishSimulationResponse, QuestionViewResponse, StartSimulationResponse,
        SubmitAnswerResponse,
    },
};

#[post("/api/simulations")]
async fn start_simulation(
    state: web::Data<AppState>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let started = state.simulation_service.start(&auth.user_id).await?;
    Ok(HttpResponse::Created().json(StartSimulationResponse::from(started)))
}

#[post("/api/simulations/{simulation_id}/answers")]
async fn submit_answer(
    state: web::Data<AppState>,
    simulation_id: web::Path<String>,
    request: web::Json<SubmitAnswerRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    request.validate()?;
    let submitted = state
        .simulation_service
        .submit_answer(
            &auth.user_id,
            &simulation_id,
            &request.question_id,
            &request.answer_text,
            &request.timer_id,
            request.current_question_index,
        )
        .await?;
    Ok(HttpResponse::Created().json(SubmitAnswerResponse::from(submitted)))
}

#[get("/api/simulations/{simulation_id}/questions/{question_id}")]
async fn get_question(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    query: web::Query<QuestionIndexQuery>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let (simulation_id, question_id) = path.into_inner();
    let view = state
        .simulation_service
        .get_question(&auth.user_id, &simulation_id, &question_id, query.index)
        .await?;
    Ok(HttpResponse::Ok().json(QuestionViewResponse::from(view)))
}

#[post("/api/simulations/{simulation_id}/finish")]
async fn finish_simulation(
    state: web::Data<AppState>,
    simulation_id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let finished = state
        .simulation_service
        .finish(&auth.user_id, &simulation_id)
        .await?;
    Ok(HttpResponse::Ok().json(FinishSimulationResponse::from(finished)))
}

#[post("/api/simulations/{simulation_id}/fail")]
async fn fail_simulation(
    state: web::Data<AppState>,
    simulation_id: web::Path<String>,
    request: web::Json<FailSimulationRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    request.validate()?;
    state
        .simulation_service
        .fail(&auth.user_id, &simulation_id, &request.reason)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}
