use rocket::serde::json::Json;
use rocket::State;
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::resp::jwt::IdentityClaims;
use crate::resp::problem::Problem;
use crate::security::Security;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
}

#[utoipa::path(responses((status = 200, description = "Server is up", body = String)))]
#[get("/")]
pub fn root() -> &'static str {
    "artZone server is running"
}

/// Signs whatever identity the client sends. Authentication happens on the
/// client, this only turns the identity into a bearer token valid for a day.
#[utoipa::path(responses(
    (status = 200, description = "Signed bearer token", body = TokenResponse)
))]
#[post("/jwt", format = "application/json", data = "<payload>")]
#[tracing::instrument(skip(security))]
pub fn issue_token(
    payload: Json<Map<String, Value>>,
    security: &State<Security>,
) -> Result<Json<TokenResponse>, Problem> {
    let claims = IdentityClaims::new(payload.into_inner());
    let token = claims.encode_jwt(&security.jwt_secret)?;

    Ok(Json(TokenResponse { token }))
}
