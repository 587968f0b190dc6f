use actix_web::{web, HttpResponse};

use crate::auth::Credentials;
use crate::dto::{OnboardingStatus, SaveProfileRequest};
use crate::error::Result;
use crate::server::AppState;

pub async fn save_profile(
    state: web::Data<AppState>,
    credentials: Credentials,
    req: web::Json<SaveProfileRequest>,
) -> Result<HttpResponse> {
    let constraints = req.into_inner().into_constraints();
    state
        .pipeline
        .save_profile(&credentials, constraints)
        .await?;
    Ok(HttpResponse::Ok().json(OnboardingStatus { onboarded: true }))
}

pub async fn check_onboarding(
    state: web::Data<AppState>,
    credentials: Credentials,
) -> Result<HttpResponse> {
    let onboarded = state.pipeline.check_onboarding(&credentials).await?;
    Ok(HttpResponse::Ok().json(OnboardingStatus { onboarded }))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/save-profile").route(web::post().to(save_profile)))
        .service(web::resource("/check-onboarding").route(web::get().to(check_onboarding)));
}
