use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rocket::http::Status;
use rocket::request::{self, FromRequest, Request};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::util::date_time_as_unix_seconds;
use crate::error::TokenError;
use crate::resp::problem::{problems, Problem};
use crate::security::Security;
use rocket::outcome::Outcome::{Error as Failure, Success};

/// Claims carried by every bearer token. The caller-supplied identity
/// payload is stored next to the registered claims and returned unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityClaims {
    #[serde(with = "date_time_as_unix_seconds")]
    iat: DateTime<Utc>,
    #[serde(with = "date_time_as_unix_seconds")]
    exp: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl IdentityClaims {
    pub fn new(payload: Map<String, Value>) -> IdentityClaims {
        Self::issued_at(payload, Utc::now())
    }

    pub(crate) fn issued_at(mut payload: Map<String, Value>, now: DateTime<Utc>) -> IdentityClaims {
        // registered claims are owned by the issuer
        payload.remove("iat");
        payload.remove("exp");

        IdentityClaims {
            iat: now,
            exp: now + Duration::days(1),
            payload,
        }
    }

    pub fn email(&self) -> Option<&str> {
        self.payload.get("email").and_then(Value::as_str)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.exp
    }

    pub fn encode_jwt(&self, secret: impl AsRef<[u8]>) -> Result<String, TokenError> {
        encode(
            &Header::new(Algorithm::HS256),
            &self,
            &EncodingKey::from_secret(secret.as_ref()),
        )
        .map_err(TokenError::Encode)
    }

    pub fn verify(token: &str, secret: impl AsRef<[u8]>) -> Result<IdentityClaims, TokenError> {
        decode::<IdentityClaims>(
            token,
            &DecodingKey::from_secret(secret.as_ref()),
            &Validation::new(Algorithm::HS256),
        )
        .map(|data| data.claims)
        .map_err(TokenError::Invalid)
    }
}

/// Reads the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(authorization: &str) -> Option<&str> {
    authorization
        .split(' ')
        .nth(1)
        .filter(|token| !token.is_empty())
}

pub fn extract_claims(
    authorization: Option<&str>,
    secret: impl AsRef<[u8]>,
) -> Result<IdentityClaims, Problem> {
    let token = authorization
        .and_then(bearer_token)
        .ok_or_else(|| problems::unauthorized("No bearer token in Authorization header."))?;

    match IdentityClaims::verify(token, secret) {
        Ok(it) => {
            tracing::debug!("decoded identity token for: {:?}", it.email());
            Ok(it)
        }
        Err(e) => {
            tracing::debug!("rejected bearer token: {}", e);
            Err(problems::unauthorized("Bearer token is invalid or expired."))
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for IdentityClaims {
    type Error = Problem;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let security: &Security = match req.rocket().state() {
            Some(it) => it,
            None => {
                tracing::error!("security state isn't managed");
                let problem = Problem::new_untyped(
                    Status::InternalServerError,
                    "Server security isn't configured.",
                );
                return Failure((Status::InternalServerError, problem));
            }
        };

        tracing::trace!("extracting identity token from authorization header");
        let authorization = req.headers().get_one("Authorization");
        match extract_claims(authorization, &security.jwt_secret) {
            Ok(claims) => Success(claims),
            Err(e) => Failure((Status::Unauthorized, e)),
        }
    }
}

pub mod doc {
    use utoipa::openapi::security::*;

    #[derive(Clone, Copy)]
    pub struct JWTAuth;

    impl Into<SecurityScheme> for JWTAuth {
        fn into(self) -> SecurityScheme {
            let mut http = Http::new(HttpAuthScheme::Bearer);
            http.bearer_format = Some("JWT".to_string());
            SecurityScheme::Http(http)
        }
    }

    impl utoipa::Modify for JWTAuth {
        fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
            if let Some(c) = openapi.components.as_mut() {
                c.add_security_scheme("jwt", *self)
            }
        }
    }
}
