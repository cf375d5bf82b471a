//! Request extractors
//!
//! Handlers list [`Bearer`] before any body extractor so a missing
//! credential is answered with 401 regardless of the body.

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::auth::BearerToken;
use crate::shared::error::ApiError;

/// Bearer credential from the `Authorization` header. Not yet verified.
pub struct Bearer(pub BearerToken);

#[async_trait]
impl<S> FromRequestParts<S> for Bearer
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        Ok(Bearer(BearerToken::from_header(header)?))
    }
}

/// JSON body whose rejection is a 400 in the API error shape.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

/// Query string whose rejection is a 400 in the API error shape.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct AppQuery<T>(pub T);
