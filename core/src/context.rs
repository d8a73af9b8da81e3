use crate::{Env, FileRead, HttpSend, Result};
use bytes::Bytes;
use std::collections::HashMap;
use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(0);

/// Context carries the ambient capabilities used while resolving
/// credentials and signing requests: file reading, HTTP sending, and
/// environment access.
///
/// Every capability is injected, so a test can pin the environment (and the
/// clock, via the signer) and get byte-identical signatures.
#[derive(Clone)]
pub struct Context {
    id: u64,
    fs: Arc<dyn FileRead>,
    http: Arc<dyn HttpSend>,
    env: Arc<dyn Env>,
}

impl Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.id)
            .field("fs", &self.fs)
            .field("http", &self.http)
            .field("env", &self.env)
            .finish()
    }
}

impl Context {
    /// Create a new context with the given file reader and http client.
    ///
    /// The environment defaults to the OS environment; use [`Context::with_env`]
    /// to replace it.
    pub fn new(fs: impl FileRead, http: impl HttpSend) -> Self {
        Self {
            id: NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed),
            fs: Arc::new(fs),
            http: Arc::new(http),
            env: Arc::new(crate::OsEnv),
        }
    }

    /// Replace the environment implementation.
    ///
    /// The result is a distinct configuration, so it gets a fresh
    /// [`Context::id`]. Plain clones keep the id of the original.
    pub fn with_env(mut self, env: impl Env) -> Self {
        self.id = NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed);
        self.env = Arc::new(env);
        self
    }

    /// An opaque token identifying this configuration.
    ///
    /// Two contexts share an id only when one is a clone of the other.
    /// Caches keyed by it never bleed state across configurations.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Read the file content entirely in `Vec<u8>`.
    #[inline]
    pub async fn file_read(&self, path: &str) -> Result<Vec<u8>> {
        self.fs.file_read(path).await
    }

    /// Read the file content entirely in `String`.
    pub async fn file_read_as_string(&self, path: &str) -> Result<String> {
        let bytes = self.file_read(path).await?;
        Ok(String::from_utf8_lossy(&bytes).to_string())
    }

    /// Send http request and return the response.
    #[inline]
    pub async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        self.http.http_send(req).await
    }

    /// Send http request and return the response body as string.
    pub async fn http_send_as_string(
        &self,
        req: http::Request<Bytes>,
    ) -> Result<http::Response<String>> {
        let (parts, body) = self.http.http_send(req).await?.into_parts();
        let body = String::from_utf8_lossy(&body).to_string();
        Ok(http::Response::from_parts(parts, body))
    }

    /// Get the home directory of the current user.
    #[inline]
    pub fn home_dir(&self) -> Option<PathBuf> {
        self.env.home_dir()
    }

    /// Expand `~` in input path.
    ///
    /// - If path not starts with `~/` or `~\\`, returns `Some(path)` directly.
    /// - Otherwise, replace `~` with home dir instead.
    /// - If home_dir is not found, returns `None`.
    pub fn expand_home_dir(&self, path: &str) -> Option<String> {
        if !path.starts_with("~/") && !path.starts_with("~\\") {
            Some(path.to_string())
        } else {
            self.home_dir()
                .map(|home| path.replace('~', &home.to_string_lossy()))
        }
    }

    /// Get the environment variable.
    #[inline]
    pub fn env_var(&self, key: &str) -> Option<String> {
        self.env.var(key)
    }

    /// Returns a hashmap of (variable, value) pairs for all the environment
    /// variables visible to this context.
    #[inline]
    pub fn env_vars(&self) -> HashMap<String, String> {
        self.env.vars()
    }
}
