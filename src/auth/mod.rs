use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Payload carried inside a bearer credential.
///
/// The encoding is plain base64 JSON: it identifies a caller, it does not
/// authenticate one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialClaims {
    pub user_id: String,
    #[serde(default)]
    pub issued_at: i64,
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credential is not valid base64")]
    Encoding(#[from] base64::DecodeError),

    #[error("credential payload is not valid JSON: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("credential has an empty user id")]
    EmptyUserId,
}

/// Encode a bearer credential for `user_id`
pub fn encode_credential(user_id: &str) -> String {
    let claims = CredentialClaims {
        user_id: user_id.to_string(),
        issued_at: Utc::now().timestamp(),
    };
    // Serializing a struct of a String and an i64 cannot fail
    let payload = serde_json::to_vec(&claims).unwrap_or_default();
    general_purpose::STANDARD.encode(payload)
}

/// Decode a bearer credential into its claims
pub fn decode_credential(token: &str) -> Result<CredentialClaims, CredentialError> {
    let bytes = general_purpose::STANDARD.decode(token.trim())?;
    let mut claims: CredentialClaims = serde_json::from_slice(&bytes)?;
    let user_id = claims.user_id.trim();
    if user_id.is_empty() {
        return Err(CredentialError::EmptyUserId);
    }
    claims.user_id = user_id.to_string();
    Ok(claims)
}
