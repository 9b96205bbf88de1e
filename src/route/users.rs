use rocket::serde::json::Json;
use rocket::State;

use crate::data::store::Store;
use crate::data::user::{RoleUpdate, UserProfile};
use crate::data::UpdateResult;
use crate::resp::document::DocJson;
use crate::resp::jwt::IdentityClaims;
use crate::resp::problem::Problem;

async fn upsert(store: &Store, profile: UserProfile) -> Result<DocJson<UpdateResult>, Problem> {
    tracing::debug!("saving profile of {}", profile.email);
    Ok(DocJson(store.upsert_user(profile).await?))
}

async fn find(store: &Store, email: &str) -> Result<DocJson<Option<UserProfile>>, Problem> {
    Ok(DocJson(store.find_user(email).await?))
}

/// Creates the student profile or merges the sent fields into it.
#[utoipa::path(
    request_body = UserProfile,
    responses((status = 200, description = "Upsert outcome", body = UpdateResult))
)]
#[put("/students", format = "application/json", data = "<profile>")]
#[tracing::instrument]
pub async fn student_upsert(
    profile: Json<UserProfile>,
    store: &State<Store>,
) -> Result<DocJson<UpdateResult>, Problem> {
    upsert(store, profile.into_inner()).await
}

#[utoipa::path(
    params(("email", description = "Student email")),
    responses((status = 200, description = "Profile, or null", body = Option<UserProfile>))
)]
#[get("/students/<email>")]
#[tracing::instrument]
pub async fn student_get(
    email: &str,
    store: &State<Store>,
) -> Result<DocJson<Option<UserProfile>>, Problem> {
    find(store, email).await
}

#[utoipa::path(
    request_body = UserProfile,
    responses((status = 200, description = "Upsert outcome", body = UpdateResult))
)]
#[put("/users", format = "application/json", data = "<profile>")]
#[tracing::instrument]
pub async fn user_upsert(
    profile: Json<UserProfile>,
    store: &State<Store>,
) -> Result<DocJson<UpdateResult>, Problem> {
    upsert(store, profile.into_inner()).await
}

#[utoipa::path(
    params(("email", description = "User email")),
    responses((status = 200, description = "Profile, or null", body = Option<UserProfile>))
)]
#[get("/users/<email>")]
#[tracing::instrument]
pub async fn user_get(
    email: &str,
    store: &State<Store>,
) -> Result<DocJson<Option<UserProfile>>, Problem> {
    find(store, email).await
}

#[utoipa::path(
    responses(
        (status = 200, description = "Every user profile", body = Vec<UserProfile>),
        (status = 401, description = "Missing or invalid bearer token", body = Problem)
    ),
    security(("jwt" = []))
)]
#[get("/users")]
#[tracing::instrument]
pub async fn user_list(
    auth: Result<IdentityClaims, Problem>,
    store: &State<Store>,
) -> Result<DocJson<Vec<UserProfile>>, Problem> {
    let identity = auth?;
    tracing::debug!("{:?} listing users", identity.email());

    Ok(DocJson(store.list_users().await?))
}

#[utoipa::path(
    request_body = RoleUpdate,
    params(("email", description = "User email")),
    responses(
        (status = 200, description = "Update outcome", body = UpdateResult),
        (status = 401, description = "Missing or invalid bearer token", body = Problem)
    ),
    security(("jwt" = []))
)]
#[patch("/users/<email>", format = "application/json", data = "<update>")]
#[tracing::instrument]
pub async fn user_set_role(
    email: &str,
    update: Json<RoleUpdate>,
    auth: Result<IdentityClaims, Problem>,
    store: &State<Store>,
) -> Result<DocJson<UpdateResult>, Problem> {
    let identity = auth?;
    tracing::info!("{:?} set role of {} to {}", identity.email(), email, update.role);

    Ok(DocJson(store.set_role(email, update.role).await?))
}
