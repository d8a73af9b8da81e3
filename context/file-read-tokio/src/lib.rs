//! Tokio-based file reading for streamsign.
//!
//! Provides [`TokioFileRead`], an async implementation of the
//! `FileRead` trait from `streamsign_core` backed by Tokio's file system
//! operations. Credential providers use it to load shared config files.
//!
//! ```no_run
//! use streamsign_core::Context;
//! use streamsign_file_read_tokio::TokioFileRead;
//!
//! # async fn example(http: impl streamsign_core::HttpSend) {
//! let ctx = Context::new(TokioFileRead, http);
//! let content = ctx.file_read("/path/to/credentials").await;
//! # }
//! ```

use async_trait::async_trait;
use streamsign_core::{Error, FileRead, Result};

/// Tokio-based implementation of the `FileRead` trait.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFileRead;

#[async_trait]
impl FileRead for TokioFileRead {
    async fn file_read(&self, path: &str) -> Result<Vec<u8>> {
        tokio::fs::read(path).await.map_err(|e| {
            Error::unexpected("failed to read file")
                .with_source(e)
                .with_context(format!("path: {path}"))
        })
    }
}
