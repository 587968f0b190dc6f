use actix_web::{web, HttpResponse};

use crate::auth::Credentials;
use crate::dto::{SaveTripRequest, TripsResponse};
use crate::error::Result;
use crate::server::AppState;

/// POST /api/save-trip - requires a verified bearer credential.
pub async fn save_trip(
    state: web::Data<AppState>,
    credentials: Credentials,
    req: web::Json<SaveTripRequest>,
) -> Result<HttpResponse> {
    let req = req.into_inner();
    state
        .pipeline
        .save_trip(&credentials, req.itinerary, req.is_public)
        .await?;
    Ok(HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body("Saved"))
}

pub async fn public_trips(state: web::Data<AppState>) -> Result<HttpResponse> {
    let trips = state.pipeline.public_trips().await?;
    Ok(HttpResponse::Ok().json(trips))
}

pub async fn my_trips(
    state: web::Data<AppState>,
    credentials: Credentials,
) -> Result<HttpResponse> {
    let trips = state.pipeline.my_trips(&credentials).await?;
    Ok(HttpResponse::Ok().json(TripsResponse { trips }))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/save-trip").route(web::post().to(save_trip)))
        .service(web::resource("/public-trips").route(web::get().to(public_trips)))
        .service(web::resource("/my-trips").route(web::get().to(my_trips)));
}
