use crate::Credential;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::sync::Mutex;
use streamsign_core::{Context, ProvideCredential, Result};

/// A chain of credential providers that will be tried in order.
///
/// Per context (keyed by [`Context::id`]), the chain remembers which
/// provider produced credentials and routes later calls straight to it, so
/// a slow provider early in the chain (for example one probing the
/// instance metadata endpoint) is only consulted during the first
/// resolution. A call with a different context probes from the top; a
/// remembered provider that later returns `None` makes `None` the chain's
/// answer for that context. Call [`reset`] to forget every remembered
/// provider.
///
/// [`reset`]: ProvideCredentialChain::reset
pub struct ProvideCredentialChain {
    providers: Vec<Box<dyn ProvideCredential<Credential = Credential>>>,
    hits: Mutex<HashMap<u64, usize>>,
}

impl ProvideCredentialChain {
    /// Create a new empty credential provider chain.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// Add a credential provider to the chain.
    pub fn push(
        mut self,
        provider: impl ProvideCredential<Credential = Credential> + 'static,
    ) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    /// Create a credential provider chain from a vector of providers.
    pub fn from_vec(providers: Vec<Box<dyn ProvideCredential<Credential = Credential>>>) -> Self {
        Self {
            providers,
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// Forget every remembered provider so the next call probes the whole
    /// chain again, whatever context it arrives with.
    pub fn reset(&self) {
        self.hits.lock().expect("lock poisoned").clear();
    }
}

impl Default for ProvideCredentialChain {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for ProvideCredentialChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvideCredentialChain")
            .field("providers_count", &self.providers.len())
            .field("hits", &*self.hits.lock().expect("lock poisoned"))
            .finish()
    }
}

#[async_trait]
impl ProvideCredential for ProvideCredentialChain {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let remembered = {
            let hits = self.hits.lock().expect("lock poisoned");
            hits.get(&ctx.id()).copied()
        };
        if let Some(idx) = remembered {
            let provider = &self.providers[idx];
            log::debug!("reusing remembered credential provider: {:?}", provider);

            return match provider.provide_credential(ctx).await {
                Ok(cred) => Ok(cred),
                Err(e) => {
                    log::warn!(
                        "error loading credential from remembered provider {:?}: {:?}",
                        provider,
                        e
                    );
                    Ok(None)
                }
            };
        }

        for (idx, provider) in self.providers.iter().enumerate() {
            log::debug!("trying credential provider: {:?}", provider);

            match provider.provide_credential(ctx).await {
                Ok(Some(cred)) => {
                    log::debug!("loaded credential from provider: {:?}", provider);
                    self.hits
                        .lock()
                        .expect("lock poisoned")
                        .insert(ctx.id(), idx);
                    return Ok(Some(cred));
                }
                Ok(None) => continue,
                Err(e) => {
                    log::warn!(
                        "error loading credential from provider {:?}: {:?}",
                        provider,
                        e
                    );
                    continue;
                }
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamsign_core::{Error, StaticEnv};
    use streamsign_file_read_tokio::TokioFileRead;
    use streamsign_http_send_reqwest::ReqwestHttpSend;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn test_context() -> Context {
        Context::new(TokioFileRead, ReqwestHttpSend::default()).with_env(StaticEnv {
            home_dir: None,
            envs: HashMap::new(),
        })
    }

    /// Counts invocations and yields a fixed answer.
    #[derive(Debug)]
    struct CountingProvider {
        calls: Arc<AtomicUsize>,
        answer: Option<&'static str>,
    }

    impl CountingProvider {
        fn new(answer: Option<&'static str>) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    calls: calls.clone(),
                    answer,
                },
                calls,
            )
        }
    }

    #[async_trait]
    impl ProvideCredential for CountingProvider {
        type Credential = Credential;

        async fn provide_credential(&self, _: &Context) -> Result<Option<Self::Credential>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.answer.map(|ak| Credential::new(ak, "secret")))
        }
    }

    #[derive(Debug)]
    struct FailingProvider;

    #[async_trait]
    impl ProvideCredential for FailingProvider {
        type Credential = Credential;

        async fn provide_credential(&self, _: &Context) -> Result<Option<Self::Credential>> {
            Err(Error::unexpected("provider is broken"))
        }
    }

    #[tokio::test]
    async fn test_chain_returns_first_success() {
        let ctx = test_context();
        let (first, _) = CountingProvider::new(None);
        let (second, _) = CountingProvider::new(Some("second_key"));
        let (third, third_calls) = CountingProvider::new(Some("third_key"));

        let chain = ProvideCredentialChain::new()
            .push(FailingProvider)
            .push(first)
            .push(second)
            .push(third);

        let cred = chain
            .provide_credential(&ctx)
            .await
            .expect("must succeed")
            .expect("must be some");
        assert_eq!(cred.access_key_id, "second_key");
        assert_eq!(third_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_chain_memoizes_successful_provider() {
        let ctx = test_context();
        let (first, first_calls) = CountingProvider::new(None);
        let (second, second_calls) = CountingProvider::new(Some("second_key"));

        let chain = ProvideCredentialChain::new().push(first).push(second);

        for _ in 0..3 {
            let cred = chain
                .provide_credential(&ctx)
                .await
                .expect("must succeed")
                .expect("must be some");
            assert_eq!(cred.access_key_id, "second_key");
        }

        // Only the first resolution probed the leading provider.
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 3);

        chain.reset();
        chain
            .provide_credential(&ctx)
            .await
            .expect("must succeed")
            .expect("must be some");
        assert_eq!(first_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_chain_memoizes_per_context() {
        let ctx_a = test_context();
        let ctx_b = test_context();
        let (first, first_calls) = CountingProvider::new(None);
        let (second, _) = CountingProvider::new(Some("second_key"));

        let chain = ProvideCredentialChain::new().push(first).push(second);

        // Resolve with A twice: the leading provider is probed once.
        for _ in 0..2 {
            chain
                .provide_credential(&ctx_a)
                .await
                .expect("must succeed")
                .expect("must be some");
        }
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);

        // A different context must not reuse A's remembered provider.
        chain
            .provide_credential(&ctx_b)
            .await
            .expect("must succeed")
            .expect("must be some");
        assert_eq!(first_calls.load(Ordering::SeqCst), 2);

        // Each context now has its own memo; neither re-probes.
        chain.provide_credential(&ctx_a).await.expect("must succeed");
        chain.provide_credential(&ctx_b).await.expect("must succeed");
        assert_eq!(first_calls.load(Ordering::SeqCst), 2);

        // Clones keep the configuration identity.
        chain
            .provide_credential(&ctx_a.clone())
            .await
            .expect("must succeed");
        assert_eq!(first_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_chain_returns_none_when_all_fail() {
        let ctx = test_context();
        let (empty, _) = CountingProvider::new(None);

        let chain = ProvideCredentialChain::new()
            .push(FailingProvider)
            .push(empty)
            .push(FailingProvider);

        let cred = chain.provide_credential(&ctx).await.expect("must succeed");
        assert!(cred.is_none());
    }

    #[tokio::test]
    async fn test_empty_chain_returns_none() {
        let ctx = test_context();
        let chain = ProvideCredentialChain::new();

        let cred = chain.provide_credential(&ctx).await.expect("must succeed");
        assert!(cred.is_none());
    }
}
