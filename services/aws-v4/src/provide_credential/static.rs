use crate::Credential;
use async_trait::async_trait;
use streamsign_core::{Context, ProvideCredential, Result};

/// A provider that always hands out the same fixed key pair.
///
/// Useful when the keys are already at hand and nothing should be loaded
/// from the environment.
#[derive(Debug, Clone)]
pub struct StaticCredentialProvider {
    credential: Credential,
}

impl StaticCredentialProvider {
    /// Wrap an access key ID and secret access key.
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            credential: Credential {
                access_key_id: access_key_id.into(),
                secret_access_key: secret_access_key.into(),
                session_token: None,
                expires_in: None,
            },
        }
    }

    /// Attach a session token for temporary credentials.
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.credential.session_token = Some(token.into());
        self
    }
}

#[async_trait]
impl ProvideCredential for StaticCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, _: &Context) -> Result<Option<Self::Credential>> {
        Ok(Some(self.credential.clone()))
    }
}
