//! Batch reader for large remote collections.
//!
//! Listing or fetching thousands of entries in one query trips device
//! limits. [`BatchReader`] splits the work according to [`BatchingConfig`]:
//! - name listings are optionally sharded by leading character
//! - entry fetches go out in chunks of `read_batch_size` names
//!
//! A "not found" answer from the device means "nothing there" and is turned
//! into an empty result wherever the caller only asked what exists.

use std::collections::HashMap;
use std::marker::PhantomData;

use ordsync_core::{chunk_names, Shard};
use ordsync_types::{Entry, Filter, Location};
use tokio_util::sync::CancellationToken;

use crate::config::{BatchingConfig, ListStrategy, ShardingStrategy};
use crate::remote::{RemoteClient, RemoteError};

/// Reads names and entries from a remote in bounded queries.
pub struct BatchReader<'a, E, C> {
    client: &'a C,
    config: &'a BatchingConfig,
    _entry: PhantomData<fn() -> E>,
}

impl<'a, E, C> BatchReader<'a, E, C>
where
    E: Entry + 'static,
    C: RemoteClient<E>,
{
    /// Create a reader over `client` using `config`.
    pub fn new(client: &'a C, config: &'a BatchingConfig) -> Self {
        Self {
            client,
            config,
            _entry: PhantomData,
        }
    }

    /// List every name at `location`, sharded when the config says so.
    ///
    /// Sharded results are grouped by shard, so device order only holds
    /// within each shard.
    pub async fn list_names(
        &self,
        location: &Location,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, RemoteError> {
        match self.config.sharding_strategy {
            ShardingStrategy::Disabled => self.list_names_unsharded(location, cancel).await,
            ShardingStrategy::Enabled => self.list_names_sharded(location, cancel).await,
        }
    }

    /// List every name at `location` in one query, in device order.
    pub async fn list_names_unsharded(
        &self,
        location: &Location,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, RemoteError> {
        check(cancel)?;
        match self.client.list_names(location, &Filter::All).await {
            Ok(names) => Ok(names),
            Err(e) if e.is_not_found() => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    /// List every name at `location`, one query per [`Shard`].
    pub async fn list_names_sharded(
        &self,
        location: &Location,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, RemoteError> {
        let mut names = Vec::new();
        for shard in Shard::ALL {
            check(cancel)?;
            match self.client.list_names(location, &shard.filter()).await {
                Ok(found) => names.extend(found),
                Err(e) if e.is_not_found() => {
                    tracing::debug!("No names in shard {:?} at {}", shard, location);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(names)
    }

    /// Fetch the entries named in `names` with a single query.
    ///
    /// Names the device does not know are silently absent from the result.
    pub async fn read_entries_by_names(
        &self,
        location: &Location,
        names: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<E>, RemoteError> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        check(cancel)?;
        let filter = Filter::NameIn(names.to_vec());
        match self.client.list_entries(location, &filter).await {
            Ok(entries) => Ok(entries),
            Err(e) if e.is_not_found() => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    /// Fetch the entries named in `names`, `read_batch_size` names per query.
    ///
    /// Results are concatenated in chunk order. Cancellation stops before the
    /// next chunk; chunks already read are discarded with the error.
    pub async fn batch_read_entries(
        &self,
        location: &Location,
        names: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<E>, RemoteError> {
        let chunks = chunk_names(names, self.config.effective_batch_size());
        tracing::debug!(
            "Reading {} names from {} in {} batches",
            names.len(),
            location,
            chunks.len()
        );

        let mut entries = Vec::with_capacity(names.len());
        for chunk in chunks {
            entries.extend(self.read_entries_by_names(location, chunk, cancel).await?);
        }
        Ok(entries)
    }

    /// List names, then fetch every entry in batches.
    ///
    /// An empty location is [`RemoteError::ObjectNotFound`], matching what a
    /// single eager listing would report.
    pub async fn read_many_lazy(
        &self,
        location: &Location,
        cancel: &CancellationToken,
    ) -> Result<Vec<E>, RemoteError> {
        let names = self.list_names(location, cancel).await?;
        if names.is_empty() {
            return Err(RemoteError::ObjectNotFound);
        }
        self.batch_read_entries(location, &names, cancel).await
    }

    /// Read the whole collection at `location` in device order.
    ///
    /// Eager reads issue one query. Lazy reads list names unsharded (so the
    /// order survives), fetch in batches, and restore listing order. An empty
    /// location yields an empty list.
    pub async fn read_ordered(
        &self,
        location: &Location,
        cancel: &CancellationToken,
    ) -> Result<Vec<E>, RemoteError> {
        match self.config.list_strategy {
            ListStrategy::Eager => {
                check(cancel)?;
                match self.client.list_entries(location, &Filter::All).await {
                    Ok(entries) => Ok(entries),
                    Err(e) if e.is_not_found() => Ok(Vec::new()),
                    Err(e) => Err(e),
                }
            }
            ListStrategy::Lazy => {
                let names = self.list_names_unsharded(location, cancel).await?;
                if names.is_empty() {
                    return Ok(Vec::new());
                }
                let mut entries = self.batch_read_entries(location, &names, cancel).await?;
                let order: HashMap<&str, usize> = names
                    .iter()
                    .enumerate()
                    .map(|(i, n)| (n.as_str(), i))
                    .collect();
                entries.sort_by_key(|e| order.get(e.name()).copied().unwrap_or(usize::MAX));
                Ok(entries)
            }
        }
    }
}

fn check(cancel: &CancellationToken) -> Result<(), RemoteError> {
    if cancel.is_cancelled() {
        return Err(RemoteError::Cancelled);
    }
    Ok(())
}
