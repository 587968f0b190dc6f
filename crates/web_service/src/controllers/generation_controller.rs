use actix_web::{web, HttpResponse};
use trip_core::Task;

use crate::auth::Credentials;
use crate::dto::{
    trip_idea_from_body, ChecklistRequest, CommCardRequest, ReshuffleDayRequest, ScriptRequest,
    SensoryProfileRequest,
};
use crate::error::Result;
use crate::server::AppState;
use crate::services::{policies, OperationPolicy};

async fn run(
    state: &AppState,
    policy: &OperationPolicy,
    credentials: &Credentials,
    task: Task,
) -> Result<HttpResponse> {
    // The background save, if any, outlives the response.
    let generated = state.pipeline.generate(policy, credentials, task).await?;
    Ok(HttpResponse::Ok().json(generated.result))
}

/// POST /api/generate - body is the trip idea as plain text.
pub async fn generate(
    state: web::Data<AppState>,
    credentials: Credentials,
    body: String,
) -> Result<HttpResponse> {
    let task = Task::Itinerary {
        idea: trip_idea_from_body(&body),
    };
    run(&state, &policies::GENERATE, &credentials, task).await
}

pub async fn generate_checklist(
    state: web::Data<AppState>,
    req: web::Json<ChecklistRequest>,
) -> Result<HttpResponse> {
    let task = req.into_inner().into();
    run(&state, &policies::CHECKLIST, &Credentials::anonymous(), task).await
}

pub async fn generate_comm_card(
    state: web::Data<AppState>,
    req: web::Json<CommCardRequest>,
) -> Result<HttpResponse> {
    let task = req.into_inner().into();
    run(&state, &policies::COMM_CARD, &Credentials::anonymous(), task).await
}

pub async fn sensory_profile(
    state: web::Data<AppState>,
    req: web::Json<SensoryProfileRequest>,
) -> Result<HttpResponse> {
    let task = req.into_inner().into();
    run(
        &state,
        &policies::SENSORY_PROFILE,
        &Credentials::anonymous(),
        task,
    )
    .await
}

pub async fn reshuffle_day(
    state: web::Data<AppState>,
    req: web::Json<ReshuffleDayRequest>,
) -> Result<HttpResponse> {
    let task = req.into_inner().into();
    run(&state, &policies::RESHUFFLE_DAY, &Credentials::anonymous(), task).await
}

pub async fn generate_script(
    state: web::Data<AppState>,
    req: web::Json<ScriptRequest>,
) -> Result<HttpResponse> {
    let task = req.into_inner().into();
    run(&state, &policies::SCRIPT, &Credentials::anonymous(), task).await
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/generate").route(web::post().to(generate)))
        .service(web::resource("/generate-checklist").route(web::post().to(generate_checklist)))
        .service(web::resource("/generate-comm-card").route(web::post().to(generate_comm_card)))
        .service(web::resource("/sensory-profile").route(web::post().to(sensory_profile)))
        .service(web::resource("/reshuffle-day").route(web::post().to(reshuffle_day)))
        .service(web::resource("/generate-script").route(web::post().to(generate_script)));
}
