//! # sync-client
//!
//! Async reconciliation of ordered remote collections.
//!
//! This is the crate applications use to push a planned set of entries
//! (security rules, NAT rules, address objects) onto a device and keep their
//! relative order right.
//!
//! ## Features
//!
//! - **Exhaustive and non-exhaustive plans**: own the whole collection or
//!   just a slice of it
//! - **Minimal moves**: ordering goes through the LCS-based diff in
//!   ordsync-core
//! - **Batched reads**: sharded name listings and chunked fetches for large
//!   collections
//! - **Write-through cache**: one device read per location until something
//!   fails
//! - **Remote abstraction**: pluggable client (device API, mock)
//!
//! ## Example
//!
//! ```ignore
//! use ordsync_client::{BatchingConfig, EntryManager, MockRemote, Mode, Position};
//!
//! let manager = EntryManager::new(MockRemote::new(), BatchingConfig::default());
//! let cancel = CancellationToken::new();
//!
//! // Place two rules at the head of the rulebase
//! let created = manager
//!     .create_many(&location, &rules, Mode::NonExhaustive, &Position::Top, &cancel)
//!     .await?;
//!
//! // Check whether they drifted
//! let (current, move_required) = manager
//!     .read_many(&location, &created, Mode::NonExhaustive, &Position::Top, &cancel)
//!     .await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod manager;
pub mod reader;
pub mod remote;

#[cfg(test)]
mod test_support;

pub use ordsync_core::Position;

pub use config::{BatchingConfig, CacheStrategy, ConfigError, ListStrategy, ShardingStrategy};
pub use manager::{EntryManager, ManagerError, Mode};
pub use reader::BatchReader;
pub use remote::{MockRemote, RemoteCall, RemoteClient, RemoteError};
