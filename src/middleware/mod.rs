use rocket::fairing::AdHoc;

pub mod limit;

/// Logs every handled request with its response status.
pub fn request_logger() -> AdHoc {
    AdHoc::on_response("Request logger", |req, res| {
        Box::pin(async move {
            tracing::info!(
                method = %req.method(),
                uri = %req.uri(),
                status = res.status().code,
                "handled request"
            );
        })
    })
}
