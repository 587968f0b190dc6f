use actix_web::{web, HttpResponse};

use crate::dto::MockPricesRequest;
use crate::services::mock_prices;

/// POST /api/mock-prices - demo prices, freshly drawn on every call.
pub async fn mock_prices(req: web::Json<MockPricesRequest>) -> HttpResponse {
    let quote = mock_prices::quote(&mut rand::thread_rng());
    tracing::debug!(
        destination = %req.destination,
        flight_price = quote.flights.price,
        hotel_price = quote.hotels.price_per_night,
        "Mock prices drawn"
    );
    HttpResponse::Ok().json(quote)
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/mock-prices").route(web::post().to(mock_prices)));
}
