use async_trait::async_trait;
use streamsign_core::time::{now, DateTime};
use streamsign_core::utils::Redact;
use streamsign_core::{Context, ProvideCredential, Result, SigningCredential};
use std::fmt::{Debug, Formatter};

/// Credential that holds the access_key and secret_key.
///
/// Credentials are immutable: a provider constructs one, callers read it,
/// and a fresh one replaces it when refreshed.
#[derive(Default, Clone)]
pub struct Credential {
    /// Access key id for aws services.
    pub access_key_id: String,
    /// Secret access key for aws services.
    pub secret_access_key: String,
    /// Session token for aws services.
    pub session_token: Option<String>,
    /// Expiration time for this credential.
    pub expires_in: Option<DateTime>,
}

impl Credential {
    /// Create a credential from a key pair.
    pub fn new(access_key_id: &str, secret_access_key: &str) -> Self {
        Self {
            access_key_id: access_key_id.to_string(),
            secret_access_key: secret_access_key.to_string(),
            session_token: None,
            expires_in: None,
        }
    }

    /// Set the session token.
    pub fn with_session_token(mut self, token: &str) -> Self {
        self.session_token = Some(token.to_string());
        self
    }

    /// Set the expiration time.
    pub fn with_expires_in(mut self, expires_in: DateTime) -> Self {
        self.expires_in = Some(expires_in);
        self
    }

    /// Check whether this credential is past its expiry.
    ///
    /// A credential without an expiry never expires.
    pub fn is_expired(&self) -> bool {
        match self.expires_in {
            Some(expires_in) => expires_in <= now(),
            None => false,
        }
    }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_key_id", &Redact::from(&self.access_key_id))
            .field("secret_access_key", &Redact::from(&self.secret_access_key))
            .field("session_token", &Redact::from(&self.session_token))
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

impl SigningCredential for Credential {
    fn is_valid(&self) -> bool {
        if self.access_key_id.is_empty() || self.secret_access_key.is_empty() {
            return false;
        }
        // Take 120s as buffer to avoid edge cases.
        if let Some(valid) = self
            .expires_in
            .map(|v| v > now() + chrono::TimeDelta::try_minutes(2).expect("in bounds"))
        {
            return valid;
        }

        true
    }
}

/// A credential can serve as its own provider: it yields itself while
/// fresh and `None` once expired, letting a chain fall through to the next
/// source.
#[async_trait]
impl ProvideCredential for Credential {
    type Credential = Credential;

    async fn provide_credential(&self, _: &Context) -> Result<Option<Self::Credential>> {
        if self.is_expired() {
            return Ok(None);
        }
        Ok(Some(self.clone()))
    }
}
