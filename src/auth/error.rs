use thiserror::Error;

use crate::protocol::ErrorCode;

/// Authentication errors produced by the identity gate.
///
/// The gate distinguishes "no credential at all" from "credential present
/// but bad" because the wire error codes differ (`auth_required` vs
/// `auth_invalid`).
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no credential supplied")]
    MissingCredential,
    #[error("invalid token format")]
    InvalidFormat,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("invalid issuer")]
    InvalidIssuer,
    #[error("invalid audience")]
    InvalidAudience,
    #[error("missing required claim: {0}")]
    MissingClaim(String),
    #[error("unknown user {0}")]
    UnknownUser(String),
    #[error("malformed wallet address")]
    InvalidWallet,
    #[error("verifier not configured")]
    NotConfigured,
    #[error("decode error: {0}")]
    DecodeError(String),
    #[error("user lookup failed: {0}")]
    StoreError(String),
}

impl AuthError {
    /// Wire error code for this failure.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            AuthError::MissingCredential => ErrorCode::AuthRequired,
            AuthError::StoreError(_) => ErrorCode::InternalError,
            _ => ErrorCode::AuthInvalid,
        }
    }
}
