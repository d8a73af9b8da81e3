use crate::provide_credential::{
    EnvCredentialProvider, InstanceMetadataCredentialProvider, ProfileCredentialProvider,
    ProvideCredentialChain,
};
use crate::Credential;
use async_trait::async_trait;
use streamsign_core::{Context, ProvideCredential, Result};

/// DefaultCredentialProvider resolves credentials via the default chain.
///
/// Resolution order:
///
/// 1. Environment variables
/// 2. Shared config (`~/.aws/credentials`, `~/.aws/config`)
/// 3. EC2 instance metadata
#[derive(Debug)]
pub struct DefaultCredentialProvider {
    chain: ProvideCredentialChain,
}

impl Default for DefaultCredentialProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultCredentialProvider {
    /// Create a new `DefaultCredentialProvider` instance.
    pub fn new() -> Self {
        let chain = ProvideCredentialChain::new()
            .push(EnvCredentialProvider::new())
            .push(ProfileCredentialProvider::new())
            .push(InstanceMetadataCredentialProvider::new());

        Self { chain }
    }

    /// Create with a custom credential chain.
    pub fn with_chain(chain: ProvideCredentialChain) -> Self {
        Self { chain }
    }

    /// Forget the remembered provider so the next resolution probes the
    /// whole chain again.
    pub fn reset(&self) {
        self.chain.reset()
    }
}

#[async_trait]
impl ProvideCredential for DefaultCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        self.chain.provide_credential(ctx).await
    }
}
