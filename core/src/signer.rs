use crate::{Body, Context, ProvideCredential, Result, SignRequest, SigningCredential};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Signer is the main entry point: it resolves a credential and signs
/// requests with it.
///
/// The last resolved credential is cached and reused until it stops being
/// valid (for example, a session credential nearing its expiry).
#[derive(Clone, Debug)]
pub struct Signer<K: SigningCredential> {
    ctx: Context,
    loader: Arc<dyn ProvideCredential<Credential = K>>,
    builder: Arc<dyn SignRequest<Credential = K>>,
    credential: Arc<Mutex<Option<K>>>,
}

impl<K: SigningCredential> Signer<K> {
    /// Create a new signer.
    pub fn new(
        ctx: Context,
        loader: impl ProvideCredential<Credential = K>,
        builder: impl SignRequest<Credential = K>,
    ) -> Self {
        Self {
            ctx,

            loader: Arc::new(loader),
            builder: Arc::new(builder),
            credential: Arc::new(Mutex::new(None)),
        }
    }

    /// Sign the request, presigning when `expires_in` is set.
    pub async fn sign(
        &self,
        req: &mut http::Request<Body>,
        expires_in: Option<Duration>,
    ) -> Result<()> {
        let cred = self.credential.lock().expect("lock poisoned").clone();
        let cred = if cred.is_valid() {
            cred
        } else {
            let cred = self.loader.provide_credential(&self.ctx).await?;
            *self.credential.lock().expect("lock poisoned") = cred.clone();
            cred
        };

        self.builder
            .sign_request(&self.ctx, req, cred.as_ref(), expires_in)
            .await
    }
}
