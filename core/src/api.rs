use crate::{Body, Context, Result};
use std::fmt::Debug;
use std::time::Duration;

/// SigningCredential is implemented by every credential type a signer can
/// consume.
pub trait SigningCredential: Clone + Debug + Send + Sync + Unpin + 'static {
    /// Check if the credential is still usable for signing.
    fn is_valid(&self) -> bool;
}

impl<T: SigningCredential> SigningCredential for Option<T> {
    fn is_valid(&self) -> bool {
        let Some(cred) = self else {
            return false;
        };

        cred.is_valid()
    }
}

/// ProvideCredential loads a credential from the environment.
///
/// Returning `Ok(None)` is the normal "nothing here, try elsewhere" signal.
/// Errors are reserved for genuinely broken sources (I/O failure, malformed
/// response) and are treated as fallthrough by provider chains.
#[async_trait::async_trait]
pub trait ProvideCredential: Debug + Send + Sync + 'static {
    /// Credential returned by this provider.
    type Credential: Send + Sync + Unpin + 'static;

    /// Load a credential from the current environment.
    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>>;
}

/// SignRequest mutates a request so it carries a valid signature.
#[async_trait::async_trait]
pub trait SignRequest: Debug + Send + Sync + 'static {
    /// Credential consumed by this signer.
    type Credential: Send + Sync + Unpin + 'static;

    /// Sign the request in place.
    ///
    /// ## Credential
    ///
    /// `None` means no credential could be resolved; implementations decide
    /// whether an unsigned request is acceptable (anonymous access) or an
    /// error.
    ///
    /// ## Expires In
    ///
    /// `Some(duration)` requests a presigned result (signature carried in
    /// the query string) valid for that long; `None` requests header
    /// signing.
    async fn sign_request(
        &self,
        ctx: &Context,
        req: &mut http::Request<Body>,
        credential: Option<&Self::Credential>,
        expires_in: Option<Duration>,
    ) -> Result<()>;
}
