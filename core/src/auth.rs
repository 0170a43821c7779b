//! Credential providers.

use std::fmt;

/// Error raised by an `AuthProvider` that cannot produce a credential.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct AuthError(pub String);

/// Supplies the bearer token attached to every request.
///
/// Called once per request; implementations must not assume the token is
/// cached by the client.
pub trait AuthProvider: Send + Sync {
    fn auth(&self) -> Result<String, AuthError>;
}

/// Static API key issued by the service. Never fails.
#[derive(Clone)]
pub struct ApiKeyAuth {
    api_key: String,
}

impl ApiKeyAuth {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }
}

impl AuthProvider for ApiKeyAuth {
    fn auth(&self) -> Result<String, AuthError> {
        Ok(self.api_key.clone())
    }
}

impl fmt::Debug for ApiKeyAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyAuth").field("api_key", &"<redacted>").finish()
    }
}
