use std::io::Cursor;

use rocket::http::hyper::header::CONTENT_LANGUAGE;
use rocket::http::ContentType;
use rocket::http::Status;
use rocket::response::Responder;
use rocket::{response, Request, Response};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};
use utoipa::ToSchema;

use crate::error::{StoreError, TokenError};

/// Implements [RFC7807](https://tools.ietf.org/html/rfc7807).
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Problem {
    #[serde(skip)]
    pub status: Status,
    pub type_uri: String,
    pub title: String,

    pub detail: Option<String>,

    /// Extension members, flattened into the top level of the response.
    #[schema(value_type = Object)]
    pub body: Map<String, Value>,
}

impl Default for Problem {
    fn default() -> Self {
        Problem {
            status: Status::InternalServerError,
            type_uri: "about:blank".to_string(),
            title: "Problem".to_string(),
            detail: None,
            body: Map::new(),
        }
    }
}

impl Problem {
    pub fn new_untyped(status: Status, title: impl ToString) -> Problem {
        Problem {
            status,
            title: title.to_string(),
            ..Default::default()
        }
    }

    pub fn detail(&mut self, value: impl ToString) -> &mut Problem {
        self.detail = Some(value.to_string());
        self
    }

    pub fn insert<V: Serialize>(&mut self, key: impl ToString, value: V) -> &mut Problem {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.body.insert(key.to_string(), value);
        self
    }

    pub fn insert_str(&mut self, key: impl ToString, value: impl ToString) -> &mut Problem {
        self.body
            .insert(key.to_string(), Value::String(value.to_string()));
        self
    }

    /// Body members as they are sent to the client.
    pub fn to_json(&self) -> Map<String, Value> {
        let mut body = self.body.clone();

        // Following are required by rfc7807
        body.insert(String::from("type"), Value::from(self.type_uri.clone()));
        body.insert(String::from("title"), Value::from(self.title.clone()));

        // Optional parameters as specified by rfc7807
        if let Some(detail) = &self.detail {
            body.insert(String::from("detail"), Value::from(detail.clone()));
        }
        body.insert(String::from("status"), Value::from(self.status.code));

        body
    }
}

impl Display for Problem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.title)
    }
}

impl std::error::Error for Problem {}

impl<'r> Responder<'r, 'static> for Problem {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let body_string = Value::Object(self.to_json()).to_string();

        Response::build()
            .status(self.status)
            .header(ContentType::new("application", "problem+json"))
            .raw_header(CONTENT_LANGUAGE.as_str(), "en")
            .sized_body(body_string.len(), Cursor::new(body_string))
            .ok()
    }
}

pub mod problems {
    use crate::resp::problem::Problem;
    use rocket::http::Status;

    /// Shape shared with every client of the access guard.
    #[inline]
    pub fn unauthorized(detail: impl ToString) -> Problem {
        Problem::new_untyped(Status::Unauthorized, "Unable to authorize user.")
            .insert("error", true)
            .insert_str("message", "unauthorized access")
            .detail(detail)
            .to_owned()
    }

    #[inline]
    pub fn forbidden(detail: impl ToString) -> Problem {
        Problem::new_untyped(Status::Forbidden, "Forbidden.")
            .insert("error", true)
            .insert_str("message", "forbidden access")
            .detail(detail)
            .to_owned()
    }

    #[inline]
    pub fn bad_id(id: impl ToString) -> Problem {
        Problem::new_untyped(Status::BadRequest, "Malformed record identifier.")
            .insert_str("id", id)
            .to_owned()
    }

    #[inline]
    pub fn parse_problem() -> Problem {
        Problem::new_untyped(
            Status::BadRequest,
            "There was a problem parsing part of the request.",
        )
    }
}

impl From<mongodb::error::Error> for Problem {
    fn from(e: mongodb::error::Error) -> Self {
        use mongodb::error::ErrorKind;

        tracing::error!("MongoDB error: {}", e);

        let title = match e.kind.as_ref() {
            ErrorKind::Authentication { .. }
            | ErrorKind::DnsResolve { .. }
            | ErrorKind::ServerSelection { .. }
            | ErrorKind::InvalidTlsConfig { .. }
            | ErrorKind::IncompatibleServer { .. } => "Server was unable to access MongoDB.",
            ErrorKind::InvalidArgument { .. }
            | ErrorKind::BulkWrite(_)
            | ErrorKind::Command(_) => "MongoDB was unable to process bad server request.",
            ErrorKind::BsonDeserialization(_) | ErrorKind::BsonSerialization(_) => {
                "There was a problem with handling MongoDB bson."
            }
            _ => "MongoDB failed while processing request.",
        };
        let mut problem = Problem::new_untyped(Status::InternalServerError, title);

        if matches!(e.kind.as_ref(), ErrorKind::Io(_) | ErrorKind::Write(_)) {
            problem.detail("A write error occurred. Submitted data might not be properly stored.");
        }

        problem
    }
}

impl From<StoreError> for Problem {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Database(e) => Problem::from(e),
            StoreError::Serialize(_) | StoreError::Deserialize(_) => Problem::new_untyped(
                Status::InternalServerError,
                "An error occurred while processing BSON data.",
            ),
            StoreError::Unavailable(reason) => {
                tracing::error!("document store unavailable: {}", reason);
                Problem::new_untyped(Status::InternalServerError, "Document store unavailable.")
                    .detail(reason)
                    .to_owned()
            }
        }
    }
}

impl From<bson::ser::Error> for Problem {
    fn from(e: bson::ser::Error) -> Self {
        StoreError::from(e).into()
    }
}

impl From<TokenError> for Problem {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Invalid(_) => problems::unauthorized("Token is invalid or expired."),
            TokenError::Encode(e) => {
                tracing::error!("unable to sign token: {}", e);
                Problem::new_untyped(Status::InternalServerError, "Unable to issue token.")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_carries_guard_shape() {
        let body = problems::unauthorized("No bearer token.").to_json();

        assert_eq!(body.get("error"), Some(&Value::Bool(true)));
        assert_eq!(
            body.get("message"),
            Some(&Value::from("unauthorized access"))
        );
        assert_eq!(body.get("status"), Some(&Value::from(401)));
    }
}
