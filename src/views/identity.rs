use axum::http::{header::AUTHORIZATION, HeaderMap};
use std::fmt;

use crate::auth::decode_credential;

/// Address used when a request carries no origin headers at all.
pub const ANONYMOUS: &str = "anonymous";

/// Who is reading a portfolio.
///
/// Equality is kind-sensitive: an authenticated id never equals an anonymous
/// address, even when the strings match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ViewerIdentity {
    Authenticated { user_id: String },
    Anonymous { network_address: String },
}

impl ViewerIdentity {
    pub fn authenticated(user_id: impl Into<String>) -> Self {
        ViewerIdentity::Authenticated { user_id: user_id.into() }
    }

    pub fn anonymous(network_address: impl Into<String>) -> Self {
        ViewerIdentity::Anonymous { network_address: network_address.into() }
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            ViewerIdentity::Authenticated { user_id } => Some(user_id),
            ViewerIdentity::Anonymous { .. } => None,
        }
    }
}

impl fmt::Display for ViewerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewerIdentity::Authenticated { user_id } => write!(f, "user:{}", user_id),
            ViewerIdentity::Anonymous { network_address } => write!(f, "anon:{}", network_address),
        }
    }
}

/// Resolve the viewer from request headers.
///
/// A usable bearer credential wins. Anything else (no header, wrong scheme,
/// undecodable payload, empty user id) falls through to the origin address:
/// first `x-forwarded-for` entry, then `x-real-ip`, then [`ANONYMOUS`].
pub fn resolve_viewer(headers: &HeaderMap) -> ViewerIdentity {
    if let Some(user_id) = bearer_user_id(headers) {
        return ViewerIdentity::Authenticated { user_id };
    }
    ViewerIdentity::Anonymous { network_address: origin_address(headers) }
}

/// User id from `Authorization: Bearer <credential>`, if it decodes
pub fn bearer_user_id(headers: &HeaderMap) -> Option<String> {
    let token = bearer_token(headers)?;
    match decode_credential(token) {
        Ok(claims) => Some(claims.user_id),
        Err(e) => {
            tracing::debug!("Ignoring malformed credential: {}", e);
            None
        }
    }
}

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

fn origin_address(headers: &HeaderMap) -> String {
    let forwarded = header_str(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let real_ip = || {
        header_str(headers, "x-real-ip")
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    forwarded
        .or_else(real_ip)
        .unwrap_or(ANONYMOUS)
        .to_string()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
