use actix_web::{dev::Payload, http::header, http::header::HeaderMap, FromRequest, HttpRequest};
use std::future::{ready, Ready};

use super::user_id::{InvalidUserId, UserId};

pub const USER_ID_HEADER: &str = "X-User-Id";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BearerCredential {
    Absent,
    /// An `Authorization` header that is not `Bearer <token>`.
    Malformed,
    Token(String),
}

/// Identity material carried by a request, not yet checked.
///
/// Extraction never fails; which of these an operation honors is decided by
/// its identity policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub bearer: BearerCredential,
    pub asserted: Option<Result<UserId, InvalidUserId>>,
}

impl Credentials {
    pub fn anonymous() -> Self {
        Self {
            bearer: BearerCredential::Absent,
            asserted: None,
        }
    }

    pub fn from_headers(headers: &HeaderMap) -> Self {
        let bearer = match headers.get(header::AUTHORIZATION) {
            None => BearerCredential::Absent,
            Some(value) => value
                .to_str()
                .ok()
                .and_then(parse_bearer)
                .map_or(BearerCredential::Malformed, |token| {
                    BearerCredential::Token(token.to_string())
                }),
        };

        let asserted = headers.get(USER_ID_HEADER).map(|value| {
            value
                .to_str()
                .map_err(|_| InvalidUserId)
                .and_then(UserId::parse)
        });

        Self { bearer, asserted }
    }
}

fn parse_bearer(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    let well_formed = scheme.eq_ignore_ascii_case("bearer")
        && !token.is_empty()
        && !token.contains(char::is_whitespace);
    well_formed.then_some(token)
}

impl FromRequest for Credentials {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(Credentials::from_headers(req.headers())))
    }
}
