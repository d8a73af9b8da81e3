//! Core components for signing API requests over streaming bodies.
//!
//! This crate provides the foundational types for the streamsign workspace:
//!
//! - **Body**: a lazy byte-stream abstraction ([`Body`] and the [`body`]
//!   variants) used as the request body type, so signers can hash, measure,
//!   or re-frame payloads without assuming they fit in memory.
//! - **Context**: a container holding the file-reading, HTTP-sending, and
//!   environment implementations credential providers need.
//! - **Traits**: [`ProvideCredential`] for loading credentials and
//!   [`SignRequest`] for service-specific signing.
//! - **Signer**: the orchestrator that caches a credential and signs
//!   requests with it.
//!
//! ## Example
//!
//! ```no_run
//! use streamsign_core::{Body, Context, ProvideCredential, SignRequest, Signer, SigningCredential};
//! use async_trait::async_trait;
//! use std::time::Duration;
//!
//! #[derive(Clone, Debug)]
//! struct MyCredential {
//!     key: String,
//!     secret: String,
//! }
//!
//! impl SigningCredential for MyCredential {
//!     fn is_valid(&self) -> bool {
//!         !self.key.is_empty() && !self.secret.is_empty()
//!     }
//! }
//!
//! #[derive(Debug)]
//! struct MyLoader;
//!
//! #[async_trait]
//! impl ProvideCredential for MyLoader {
//!     type Credential = MyCredential;
//!
//!     async fn provide_credential(
//!         &self,
//!         _: &Context,
//!     ) -> streamsign_core::Result<Option<Self::Credential>> {
//!         Ok(Some(MyCredential {
//!             key: "my-access-key".to_string(),
//!             secret: "my-secret-key".to_string(),
//!         }))
//!     }
//! }
//!
//! #[derive(Debug)]
//! struct MySigner;
//!
//! #[async_trait]
//! impl SignRequest for MySigner {
//!     type Credential = MyCredential;
//!
//!     async fn sign_request(
//!         &self,
//!         _ctx: &Context,
//!         _req: &mut http::Request<Body>,
//!         _cred: Option<&Self::Credential>,
//!         _expires_in: Option<Duration>,
//!     ) -> streamsign_core::Result<()> {
//!         todo!()
//!     }
//! }
//! ```

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod hash;
pub mod time;
pub mod utils;

pub mod body;
pub use body::{Body, Stream};

mod context;
pub use context::Context;
mod fs;
pub use fs::FileRead;
mod http;
pub use crate::http::HttpSend;
mod env;
pub use env::{Env, OsEnv, StaticEnv};

mod error;
pub use error::{Error, ErrorKind, Result};

mod api;
pub use api::{ProvideCredential, SignRequest, SigningCredential};
mod request;
pub use request::SigningRequest;
mod signer;
pub use signer::Signer;
