//! Identity gate.
//!
//! Validates bearer credentials minted by an external auth flow (the SIWE
//! signature + JWT issuance lives outside this server) and resolves them to
//! a [`Principal`]. The server never issues tokens, it only verifies them.

pub mod error;

pub use error::AuthError;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::protocol::{validation, Principal};
use crate::store::UserRepo;

/// Outcome of verifying a raw credential, before user resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub user_id: String,
    /// Wallet claim carried by the token, if present. Falls back to the
    /// stored user record when absent.
    pub wallet_address: Option<String>,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Pluggable credential verifier. The shipped implementation is
/// [`JwtVerifier`]; tests inject trivial ones.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<VerifiedToken, AuthError>;
}

/// Verifier configuration.
#[derive(Debug, Clone, Default)]
pub struct JwtVerifierConfig {
    /// Expected issuer claim ("iss"). If None, any issuer accepted.
    pub issuer: Option<String>,
    /// Expected audience claim ("aud"). If None, any audience accepted.
    pub audience: Option<String>,
    /// RS256 public key in PEM format (preferred for external providers).
    pub public_key_pem: Option<String>,
    /// HS256 secret (fallback for simple setups).
    pub secret: Option<String>,
    /// Whether to skip expiry validation (for testing only).
    pub skip_expiry: bool,
}

impl JwtVerifierConfig {
    pub fn is_configured(&self) -> bool {
        self.public_key_pem.is_some() || self.secret.is_some()
    }
}

/// Claims we expect from the external auth provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: the stable user id.
    pub sub: String,
    /// Wallet address bound to the identity at sign-in time.
    #[serde(default, alias = "walletAddress")]
    pub wallet: Option<String>,
    /// Expiry timestamp (Unix seconds).
    #[serde(default)]
    pub exp: u64,
    /// Issued at timestamp.
    #[serde(default)]
    pub iat: u64,
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub aud: Option<serde_json::Value>,
}

/// JWT validator over `jsonwebtoken`: HS256 via shared secret or RS256 via
/// provider public key.
pub struct JwtVerifier {
    config: JwtVerifierConfig,
}

impl JwtVerifier {
    pub fn new(config: JwtVerifierConfig) -> Self {
        Self { config }
    }
}

impl TokenVerifier for JwtVerifier {
    fn verify(&self, token: &str) -> Result<VerifiedToken, AuthError> {
        use jsonwebtoken::{decode, Algorithm, DecodingKey, TokenData, Validation};

        if !self.config.is_configured() {
            return Err(AuthError::NotConfigured);
        }

        let algorithm = if self.config.public_key_pem.is_some() {
            Algorithm::RS256
        } else {
            Algorithm::HS256
        };

        let mut validation = Validation::new(algorithm);
        validation.required_spec_claims = std::collections::HashSet::new();

        if let Some(ref issuer) = self.config.issuer {
            validation.set_issuer(&[issuer]);
        }
        if let Some(ref audience) = self.config.audience {
            validation.set_audience(&[audience]);
        } else {
            validation.validate_aud = false;
        }
        if self.config.skip_expiry {
            validation.validate_exp = false;
        }

        let token_data: TokenData<TokenClaims> = if let Some(ref pem) = self.config.public_key_pem {
            let key = DecodingKey::from_rsa_pem(pem.as_bytes())
                .map_err(|e| AuthError::DecodeError(format!("invalid public key: {e}")))?;
            decode(token, &key, &validation).map_err(map_jwt_error)?
        } else if let Some(ref secret) = self.config.secret {
            let key = DecodingKey::from_secret(secret.as_bytes());
            decode(token, &key, &validation).map_err(map_jwt_error)?
        } else {
            return Err(AuthError::NotConfigured);
        };

        let claims = token_data.claims;
        if claims.sub.is_empty() {
            return Err(AuthError::MissingClaim("sub".into()));
        }

        let expires_at = (claims.exp > 0)
            .then(|| chrono::DateTime::from_timestamp(claims.exp as i64, 0))
            .flatten();

        Ok(VerifiedToken {
            user_id: claims.sub,
            wallet_address: claims.wallet,
            expires_at,
        })
    }
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    use jsonwebtoken::errors::ErrorKind;
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
        ErrorKind::InvalidAudience => AuthError::InvalidAudience,
        ErrorKind::InvalidToken | ErrorKind::Base64(_) => AuthError::InvalidFormat,
        _ => AuthError::DecodeError(err.to_string()),
    }
}

/// Verifies a raw credential and resolves it to a [`Principal`].
///
/// Both collaborators are injected: the verifier checks the signature, the
/// user repo confirms the identity exists.
pub struct IdentityGate {
    verifier: Arc<dyn TokenVerifier>,
    users: Arc<dyn UserRepo>,
}

impl IdentityGate {
    pub fn new(verifier: Arc<dyn TokenVerifier>, users: Arc<dyn UserRepo>) -> Self {
        Self { verifier, users }
    }

    /// Run the full gate: verify the token, resolve the user, and check the
    /// wallet address shape.
    pub async fn authenticate(&self, token: Option<&str>) -> Result<Principal, AuthError> {
        let token = token.ok_or(AuthError::MissingCredential)?;
        let verified = self.verifier.verify(token)?;

        let user = self
            .users
            .get_user(&verified.user_id)
            .await
            .map_err(|e| AuthError::StoreError(e.to_string()))?
            .ok_or_else(|| AuthError::UnknownUser(verified.user_id.clone()))?;

        let wallet_address = verified
            .wallet_address
            .unwrap_or_else(|| user.wallet_address.clone());
        validation::validate_wallet_address(&wallet_address)
            .map_err(|_| AuthError::InvalidWallet)?;

        Ok(Principal {
            user_id: verified.user_id,
            wallet_address,
        })
    }
}
