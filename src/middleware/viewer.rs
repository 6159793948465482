use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use std::convert::Infallible;

use crate::views::identity::{resolve_viewer, ViewerIdentity};

/// Viewer identity for public reads. Never rejects: bad credentials resolve
/// to an anonymous viewer.
#[derive(Clone, Debug)]
pub struct Viewer(pub ViewerIdentity);

#[async_trait]
impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Viewer(resolve_viewer(&parts.headers)))
    }
}
