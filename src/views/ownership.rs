use super::identity::ViewerIdentity;

/// True when the viewer owns the portfolio and must not be counted.
/// Anonymous viewers are never exempt.
pub fn is_owner_exempt(viewer: &ViewerIdentity, owner_id: &str) -> bool {
    viewer.user_id() == Some(owner_id)
}
