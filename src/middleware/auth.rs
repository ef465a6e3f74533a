//! Caller identity
//!
//! Credentials are checked by the gateway in front of this service, which forwards
//! the authenticated account as `X-User-Id` and `X-User-Role`.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{Actor, UserRole};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header_value(parts, USER_ID_HEADER)?
            .parse::<Uuid>()
            .map_err(|_| ApiError::Unauthenticated(format!("{USER_ID_HEADER} is not a valid UUID")))?;
        let role = header_value(parts, USER_ROLE_HEADER)?
            .parse::<UserRole>()
            .map_err(ApiError::Unauthenticated)?;

        Ok(Actor::new(id, role))
    }
}

fn header_value<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, ApiError> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::Unauthenticated(format!("missing {name} header")))
}
