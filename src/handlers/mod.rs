pub mod progress_handler;
pub mod simulation_handler;

use actix_web::{get, HttpResponse};

use crate::app_state::AppState;

#[get("/health")]
async fn health_check(state: actix_web::web::Data<AppState>) -> HttpResponse {
    match state.db.health_check().await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({ "status": "ok" })),
        Err(err) => {
            log::error!("Health check failed: {}", err);
            HttpResponse::ServiceUnavailable()
                .json(serde_json::json!({ "status": "degraded" }))
        }
    }
}

pub fn configure(cfg: &mut actix_web::web::ServiceConfig) {
    cfg.service(health_check)
        .service(progress_handler::record_lesson_access)
        .service(progress_handler::record_video_progress)
        .service(progress_handler::record_time_spent)
        .service(progress_handler::get_subject_progress)
        .service(simulation_handler::start_simulation)
        .service(simulation_handler::submit_answer)
        .service(simulation_handler::get_question)
        .service(simulation_handler::finish_simulation)
        .service(simulation_handler::fail_simulation);
}
