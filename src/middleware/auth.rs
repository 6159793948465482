use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::auth::decode_credential;
use crate::error::ApiError;
use crate::views::identity::bearer_token;

/// Caller identity for routes that require a credential
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| ApiError::unauthorized("Missing or non-Bearer Authorization header"))?;
        let claims = decode_credential(token)?;
        Ok(AuthUser { user_id: claims.user_id })
    }
}
