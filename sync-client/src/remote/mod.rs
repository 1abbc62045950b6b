//! Remote device abstraction for ordsync.
//!
//! This module provides a pluggable client layer that abstracts the device
//! API (an XML API client in production, an in-memory mock for testing).
//!
//! # Design
//!
//! The client trait is async and location-oriented:
//! - `list_entries()` / `list_names()` run one filtered listing query
//! - `multi_config()` submits an ordered batch of deletes and edits
//! - `move_group()` applies a list of single-entry moves
//! - `import_to_location()` / `unimport_from_location()` maintain a
//!   secondary owner's member list
//!
//! Retries, backoff and wire encoding all live behind this trait.
//!
//! # Example
//!
//! ```ignore
//! let remote = MockRemote::new();
//! remote.seed(&location, vec![rule("allow-dns")]);
//! let names = remote.list_names(&location, &Filter::All).await?;
//! ```

mod mock;

pub use mock::{MockRemote, RemoteCall};

use async_trait::async_trait;
use ordsync_types::{ConfigOp, Entry, Filter, ImportLocation, Location, MoveAction};
use thiserror::Error;

/// Remote client errors.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The query matched nothing.
    #[error("object not found")]
    ObjectNotFound,

    /// The device could not be reached.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The device refused the request.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The device did not answer in time.
    #[error("request timeout")]
    Timeout,

    /// The caller cancelled before the request was sent.
    #[error("operation cancelled")]
    Cancelled,
}

impl RemoteError {
    /// Whether this error only signals absence.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::ObjectNotFound)
    }
}

/// Client trait for the device's configuration API.
///
/// Implementations handle transport, authentication and encoding. A query
/// that matches nothing returns [`RemoteError::ObjectNotFound`].
#[async_trait]
pub trait RemoteClient<E: Entry + 'static>: Send + Sync {
    /// Fetch the entries at `location` matching `filter`, in device order.
    async fn list_entries(&self, location: &Location, filter: &Filter)
        -> Result<Vec<E>, RemoteError>;

    /// Fetch only the names of entries matching `filter`, in device order.
    async fn list_names(
        &self,
        location: &Location,
        filter: &Filter,
    ) -> Result<Vec<String>, RemoteError>;

    /// Submit a batch of operations, applied in list order.
    async fn multi_config(&self, location: &Location, ops: &[ConfigOp<E>])
        -> Result<(), RemoteError>;

    /// Apply single-entry moves in sequence.
    async fn move_group(&self, location: &Location, actions: &[MoveAction])
        -> Result<(), RemoteError>;

    /// Register `names` with a secondary owning object.
    async fn import_to_location(
        &self,
        location: &Location,
        import: &ImportLocation,
        names: &[String],
    ) -> Result<(), RemoteError>;

    /// Remove `names` from a secondary owning object.
    async fn unimport_from_location(
        &self,
        location: &Location,
        import: &ImportLocation,
        names: &[String],
    ) -> Result<(), RemoteError>;
}
