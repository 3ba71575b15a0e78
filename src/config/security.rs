//! Security and authentication configuration types.

use super::defaults::default_cors_origins;
use serde::{Deserialize, Serialize};

/// Token verification settings for the identity gate.
///
/// The server only validates externally-minted JWTs; it never issues them.
/// Configure either `public_key_pem` (RS256, preferred for external auth
/// providers) or `secret` (HS256, simple setups).
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AuthConfig {
    /// Expected issuer claim ("iss"); any issuer accepted when unset
    #[serde(default)]
    pub issuer: Option<String>,
    /// Expected audience claim ("aud"); any audience accepted when unset
    #[serde(default)]
    pub audience: Option<String>,
    /// RS256 public key in PEM format
    #[serde(default)]
    pub public_key_pem: Option<String>,
    /// HS256 shared secret
    #[serde(default)]
    pub secret: Option<String>,
    /// Skip expiry validation (for testing only)
    #[serde(default)]
    pub skip_expiry: bool,
}

impl AuthConfig {
    pub fn is_configured(&self) -> bool {
        self.public_key_pem.is_some() || self.secret.is_some()
    }
}

/// Security configuration.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SecurityConfig {
    /// Comma-separated allowed CORS origins, or "*" for permissive
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,
    #[serde(default)]
    pub auth: AuthConfig,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            cors_origins: default_cors_origins(),
            auth: AuthConfig::default(),
        }
    }
}
