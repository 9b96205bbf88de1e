use rocket::State;

use crate::data::class::Class;
use crate::data::store::Store;
use crate::data::teacher::Teacher;
use crate::middleware::limit::ListLimit;
use crate::resp::document::DocJson;
use crate::resp::problem::Problem;

#[utoipa::path(
    params(
        ("limit" = Option<i64>, Query, description = "Top N by students, all when 0")
    ),
    responses((status = 200, description = "Teachers", body = Vec<Teacher>))
)]
#[get("/teachers")]
#[tracing::instrument]
pub async fn teacher_list(
    limit: ListLimit,
    store: &State<Store>,
) -> Result<DocJson<Vec<Teacher>>, Problem> {
    Ok(DocJson(store.list_teachers(limit.0).await?))
}

#[utoipa::path(
    params(
        ("limit" = Option<i64>, Query, description = "Top N by enroled, all when 0")
    ),
    responses((status = 200, description = "Classes", body = Vec<Class>))
)]
#[get("/classes")]
#[tracing::instrument]
pub async fn class_list(
    limit: ListLimit,
    store: &State<Store>,
) -> Result<DocJson<Vec<Class>>, Problem> {
    Ok(DocJson(store.list_classes(limit.0).await?))
}
