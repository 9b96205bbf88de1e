use std::convert::Infallible;

use rocket::request::{FromRequest, Outcome, Request};

use crate::util::parse_leading_int;

/// `limit` query parameter of catalog listings. Anything that isn't a
/// number reads as `0`, which lists every record.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct ListLimit(pub i64);

impl ListLimit {
    pub fn parse(value: Option<&str>) -> ListLimit {
        ListLimit(value.and_then(parse_leading_int).unwrap_or(0))
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ListLimit {
    type Error = Infallible;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let value: Option<&str> = request
            .query_value::<&str>("limit")
            .and_then(|it| it.ok());

        Outcome::Success(ListLimit::parse(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_defaults_to_everything() {
        assert_eq!(ListLimit::parse(None), ListLimit(0));
        assert_eq!(ListLimit::parse(Some("many")), ListLimit(0));
        assert_eq!(ListLimit::parse(Some("6")), ListLimit(6));
    }

    #[test]
    fn huge_limit_sorts_everything() {
        assert_eq!(
            ListLimit::parse(Some("99999999999999999999")),
            ListLimit(i64::MAX)
        );
    }
}
