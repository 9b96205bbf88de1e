use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use rocket::Request;
use serde::Serialize;

use crate::resp::problem::Problem;
use crate::util::bson_to_json;

/// Responds with stored records rendered as plain JSON.
///
/// Records go through BSON first so object ids reach the client as hex
/// strings, the same way they're written in request bodies and paths.
#[derive(Debug)]
pub struct DocJson<T>(pub T);

impl<'r, T: Serialize> Responder<'r, 'static> for DocJson<T> {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        match bson::to_bson(&self.0) {
            Ok(value) => Json(bson_to_json(value)).respond_to(req),
            Err(e) => Problem::from(e).respond_to(req),
        }
    }
}
