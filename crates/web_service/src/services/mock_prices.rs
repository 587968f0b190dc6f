use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

const AIRLINES: &[&str] = &["IndiGo", "Air India", "SpiceJet", "Vistara"];
const HOTELS: &[&str] = &["Taj Palace", "Leela", "Oberoi", "ITC Grand"];

/// Flight price range, upper bound exclusive.
pub const FLIGHT_PRICE: std::ops::Range<u32> = 7000..15000;
pub const HOTEL_PRICE_PER_NIGHT: std::ops::Range<u32> = 6000..10000;

#[derive(Debug, Clone, Serialize)]
pub struct FlightQuote {
    pub airline: String,
    pub price: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct HotelQuote {
    pub name: String,
    pub price_per_night: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceQuote {
    pub flights: FlightQuote,
    pub hotels: HotelQuote,
}

/// Demo prices. The destination does not influence them.
pub fn quote<R: Rng>(rng: &mut R) -> PriceQuote {
    PriceQuote {
        flights: FlightQuote {
            airline: AIRLINES.choose(rng).copied().unwrap_or(AIRLINES[0]).to_string(),
            price: rng.gen_range(FLIGHT_PRICE),
        },
        hotels: HotelQuote {
            name: HOTELS.choose(rng).copied().unwrap_or(HOTELS[0]).to_string(),
            price_per_night: rng.gen_range(HOTEL_PRICE_PER_NIGHT),
        },
    }
}
