//! EntryManager - reconciles a planned set of entries with a remote
//! ordered collection.
//!
//! # Architecture
//!
//! The manager owns the remote client, the batching config and the cache.
//! Every operation follows the same shape:
//!
//! ```text
//! validate plan → read (cache or device) → multi-config → read back
//!               → order diff (ordsync-core) → move-group → cache update
//! ```
//!
//! Validation errors surface before any remote write. Remote failures in the
//! middle of an operation are returned as-is; nothing is rolled back, but the
//! cached state for the location is dropped.
//!
//! # Modes
//!
//! - [`Mode::Exhaustive`]: the plan is the complete desired collection.
//!   Anything else on the device is removed.
//! - [`Mode::NonExhaustive`]: the plan is a subset the caller owns. Entries
//!   the caller does not own are never touched, and colliding with one is a
//!   [`ManagerError::Conflict`].
//!
//! # Example
//!
//! ```ignore
//! let manager = EntryManager::new(client, BatchingConfig::default());
//! let created = manager
//!     .create_many(&location, &rules, Mode::NonExhaustive, &Position::Top, &cancel)
//!     .await?;
//! ```

use std::collections::{HashMap, HashSet};

use ordsync_core::{
    apply_moves, CacheError, CacheManager, LocationCache, MovementError, NoOpCache, Position,
};
use ordsync_types::{ConfigOp, Entry, ImportLocation, Location};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::config::{BatchingConfig, CacheStrategy};
use crate::reader::BatchReader;
use crate::remote::{RemoteClient, RemoteError};

/// How a plan relates to the remote collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// The plan is the whole collection.
    Exhaustive,
    /// The plan is a caller-owned subset of the collection.
    NonExhaustive,
}

/// Manager errors.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// The plan names the same entry twice.
    #[error("entry {name} appears more than once in the plan")]
    PlanConflict {
        /// Duplicated name.
        name: String,
    },

    /// Planned entries collide with entries already on the device.
    #[error("entries already exist: {}", names.join(", "))]
    Conflict {
        /// Colliding names, in plan order.
        names: Vec<String>,
    },

    /// The pivot of a before/after position does not exist.
    #[error("pivot point not found: {pivot}")]
    MissingPivot {
        /// Pivot name.
        pivot: String,
    },

    /// The position cannot be satisfied for this plan.
    #[error("invalid position: {0}")]
    InvalidPosition(String),

    /// Nothing matching the plan exists on the device.
    #[error("object not found")]
    ObjectNotFound,

    /// The cache could not produce an independent copy of an entry.
    #[error("cache deep copy of {name} failed: {reason}")]
    CacheDeepCopyFailed {
        /// Entry name.
        name: String,
        /// What went wrong.
        reason: String,
    },

    /// An internal invariant was broken.
    #[error("internal error: {0}")]
    Internal(String),

    /// The remote failed.
    #[error("{context}: {source}")]
    Remote {
        /// What the manager was doing.
        context: String,
        /// Underlying remote error.
        #[source]
        source: RemoteError,
    },

    /// The cancellation token fired.
    #[error("operation cancelled")]
    Cancelled,
}

impl ManagerError {
    /// Whether this error only signals absence.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ManagerError::ObjectNotFound)
    }
}

impl From<MovementError> for ManagerError {
    fn from(e: MovementError) -> Self {
        match e {
            MovementError::MissingPivot(pivot) => ManagerError::MissingPivot { pivot },
            MovementError::InvalidPosition(reason) => ManagerError::InvalidPosition(reason),
            other => ManagerError::Internal(other.to_string()),
        }
    }
}

impl From<CacheError> for ManagerError {
    fn from(e: CacheError) -> Self {
        match e {
            CacheError::DeepCopyFailed { name, produced } => ManagerError::CacheDeepCopyFailed {
                name,
                reason: format!("normalizer produced {} entries", produced),
            },
            CacheError::Normalization { name, reason } => {
                ManagerError::CacheDeepCopyFailed { name, reason }
            }
        }
    }
}

/// Wrap a remote error with context, keeping the sentinel kinds distinct.
fn remote_error(context: &'static str) -> impl FnOnce(RemoteError) -> ManagerError {
    move |e| match e {
        RemoteError::ObjectNotFound => ManagerError::ObjectNotFound,
        RemoteError::Cancelled => ManagerError::Cancelled,
        source => ManagerError::Remote {
            context: context.to_string(),
            source,
        },
    }
}

/// Wrap an error from a write. Absence reported by a write is a failed
/// write, never the not-found sentinel.
fn remote_write_error(context: &'static str) -> impl FnOnce(RemoteError) -> ManagerError {
    move |e| match e {
        RemoteError::Cancelled => ManagerError::Cancelled,
        source => ManagerError::Remote {
            context: context.to_string(),
            source,
        },
    }
}

/// Reconciliation manager for one entry type.
///
/// The cache sits behind a single async mutex held for the whole of each
/// operation, so concurrent calls on one manager are serialized.
pub struct EntryManager<E, C> {
    client: C,
    config: BatchingConfig,
    cache: Mutex<Box<dyn CacheManager<E>>>,
}

impl<E, C> EntryManager<E, C>
where
    E: Entry + 'static,
    C: RemoteClient<E>,
{
    /// Create a manager, picking the cache from `config.cache_strategy`.
    pub fn new(client: C, config: BatchingConfig) -> Self {
        let cache: Box<dyn CacheManager<E>> = match config.cache_strategy {
            CacheStrategy::Enabled => Box::new(LocationCache::<E>::new()),
            CacheStrategy::Disabled => Box::new(NoOpCache::<E>::new()),
        };
        Self::with_cache(client, config, cache)
    }

    /// Create a manager with an explicit cache implementation.
    pub fn with_cache(client: C, config: BatchingConfig, cache: Box<dyn CacheManager<E>>) -> Self {
        Self {
            client,
            config,
            cache: Mutex::new(cache),
        }
    }

    /// The remote client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// The batching config.
    pub fn config(&self) -> &BatchingConfig {
        &self.config
    }

    fn reader(&self) -> BatchReader<'_, E, C> {
        BatchReader::new(&self.client, &self.config)
    }

    // =========================================================================
    // Public operations
    // =========================================================================

    /// Create `entries` at `location` and place them per `position`.
    ///
    /// Returns copies of the planned entries in final device order, carrying
    /// any identifiers the device assigned.
    pub async fn create_many(
        &self,
        location: &Location,
        entries: &[E],
        mode: Mode,
        position: &Position,
        cancel: &CancellationToken,
    ) -> Result<Vec<E>, ManagerError> {
        let mut cache = self.cache.lock().await;
        let result = self
            .create_locked(&mut **cache, location, entries, mode, position, cancel)
            .await;
        settle(&mut **cache, location, result)
    }

    /// Read the remote counterparts of `entries`.
    ///
    /// Returns the entries found (all of them in exhaustive mode, only the
    /// planned names otherwise) in device order, and whether `position`
    /// would need any move to hold. Nothing is written.
    pub async fn read_many(
        &self,
        location: &Location,
        entries: &[E],
        mode: Mode,
        position: &Position,
        cancel: &CancellationToken,
    ) -> Result<(Vec<E>, bool), ManagerError> {
        let mut cache = self.cache.lock().await;
        let result = self
            .read_locked(&mut **cache, location, entries, mode, position, cancel)
            .await;
        settle(&mut **cache, location, result)
    }

    /// Bring the remote collection from `prior` to `planned`.
    ///
    /// `prior` is the state the caller last applied; in non-exhaustive mode
    /// it decides which entries the caller owns and may delete.
    pub async fn update_many(
        &self,
        location: &Location,
        prior: &[E],
        planned: &[E],
        mode: Mode,
        position: &Position,
        cancel: &CancellationToken,
    ) -> Result<Vec<E>, ManagerError> {
        let mut cache = self.cache.lock().await;
        let result = self
            .update_locked(&mut **cache, location, prior, planned, mode, position, cancel)
            .await;
        settle(&mut **cache, location, result)
    }

    /// Delete the named entries. Names that do not exist are ignored.
    pub async fn delete(
        &self,
        location: &Location,
        names: &[String],
        cancel: &CancellationToken,
    ) -> Result<(), ManagerError> {
        let mut cache = self.cache.lock().await;
        let result = self
            .delete_locked(&mut **cache, location, names, cancel)
            .await;
        settle(&mut **cache, location, result)
    }

    /// List every name at `location`, sharded per config.
    pub async fn list_names(
        &self,
        location: &Location,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, ManagerError> {
        self.reader()
            .list_names(location, cancel)
            .await
            .map_err(remote_error("listing names"))
    }

    /// Register `names` with a secondary owning object.
    pub async fn import_to_location(
        &self,
        location: &Location,
        import: &ImportLocation,
        names: &[String],
        cancel: &CancellationToken,
    ) -> Result<(), ManagerError> {
        check(cancel)?;
        self.client
            .import_to_location(location, import, names)
            .await
            .map_err(remote_write_error("importing entries"))
    }

    /// Remove `names` from a secondary owning object.
    pub async fn unimport_from_location(
        &self,
        location: &Location,
        import: &ImportLocation,
        names: &[String],
        cancel: &CancellationToken,
    ) -> Result<(), ManagerError> {
        check(cancel)?;
        self.client
            .unimport_from_location(location, import, names)
            .await
            .map_err(remote_write_error("unimporting entries"))
    }

    /// Drop cached state for `location`.
    pub async fn invalidate(&self, location: &Location) {
        self.cache.lock().await.invalidate(&location.key());
    }

    /// Drop all cached state.
    pub async fn clear_cache(&self) {
        self.cache.lock().await.clear();
    }

    // =========================================================================
    // Operation bodies (cache lock held)
    // =========================================================================

    async fn create_locked(
        &self,
        cache: &mut dyn CacheManager<E>,
        location: &Location,
        entries: &[E],
        mode: Mode,
        position: &Position,
        cancel: &CancellationToken,
    ) -> Result<Vec<E>, ManagerError> {
        ensure_unique(entries)?;
        position.validate(entries, mode == Mode::Exhaustive)?;

        let existing = self.read_existing(cache, location, cancel).await?;

        let mut ops: Vec<ConfigOp<E>> = Vec::new();
        match mode {
            Mode::Exhaustive => {
                ops.extend(existing.iter().map(|e| ConfigOp::delete(e.name())));
            }
            Mode::NonExhaustive => {
                let present: HashSet<&str> = existing.iter().map(|e| e.name()).collect();
                let conflicts: Vec<String> = entries
                    .iter()
                    .map(|e| e.name())
                    .filter(|n| present.contains(n))
                    .map(String::from)
                    .collect();
                if !conflicts.is_empty() {
                    tracing::warn!(
                        "Refusing to create {} entries at {}: {} already exist",
                        entries.len(),
                        location,
                        conflicts.len()
                    );
                    return Err(ManagerError::Conflict { names: conflicts });
                }
                require_pivot(position, |p| present.contains(p))?;
            }
        }
        ops.extend(entries.iter().cloned().map(ConfigOp::edit));

        tracing::info!(
            "Creating {} entries at {} ({:?}, {} deletes)",
            entries.len(),
            location,
            mode,
            ops.len() - entries.len()
        );
        self.submit(location, &ops, cancel).await?;
        self.converge(cache, location, entries, position, cancel)
            .await
    }

    async fn read_locked(
        &self,
        cache: &mut dyn CacheManager<E>,
        location: &Location,
        entries: &[E],
        mode: Mode,
        position: &Position,
        cancel: &CancellationToken,
    ) -> Result<(Vec<E>, bool), ManagerError> {
        ensure_unique(entries)?;
        position.validate(entries, mode == Mode::Exhaustive)?;

        let existing = self.read_existing(cache, location, cancel).await?;

        let wanted: HashSet<&str> = entries.iter().map(|e| e.name()).collect();
        let found: Vec<E> = match mode {
            Mode::Exhaustive => existing.clone(),
            Mode::NonExhaustive => existing
                .iter()
                .filter(|e| wanted.contains(e.name()))
                .cloned()
                .collect(),
        };
        if found.is_empty() {
            return Err(ManagerError::ObjectNotFound);
        }

        let present: HashSet<&str> = existing.iter().map(|e| e.name()).collect();
        let placed: Vec<&str> = entries
            .iter()
            .map(|e| e.name())
            .filter(|n| present.contains(n))
            .collect();
        let move_required = match position.move_actions(&placed, &existing) {
            Ok(actions) => !actions.is_empty(),
            Err(MovementError::MissingPivot(pivot)) => {
                tracing::debug!("Pivot {} missing at {}, entries need placing", pivot, location);
                true
            }
            Err(e) => return Err(e.into()),
        };

        Ok((found, move_required))
    }

    #[allow(clippy::too_many_arguments)]
    async fn update_locked(
        &self,
        cache: &mut dyn CacheManager<E>,
        location: &Location,
        prior: &[E],
        planned: &[E],
        mode: Mode,
        position: &Position,
        cancel: &CancellationToken,
    ) -> Result<Vec<E>, ManagerError> {
        ensure_unique(planned)?;
        position.validate(planned, mode == Mode::Exhaustive)?;

        let existing = self.read_existing(cache, location, cancel).await?;
        let remote: HashMap<&str, &E> = existing.iter().map(|e| (e.name(), e)).collect();
        let planned_names: HashSet<&str> = planned.iter().map(|e| e.name()).collect();

        let stale: Vec<&str> = match mode {
            Mode::Exhaustive => existing
                .iter()
                .map(|e| e.name())
                .filter(|n| !planned_names.contains(n))
                .collect(),
            Mode::NonExhaustive => {
                let owned: HashSet<&str> = prior.iter().map(|e| e.name()).collect();
                let conflicts: Vec<String> = planned
                    .iter()
                    .map(|e| e.name())
                    .filter(|n| !owned.contains(n) && remote.contains_key(n))
                    .map(String::from)
                    .collect();
                if !conflicts.is_empty() {
                    tracing::warn!(
                        "Refusing to update {}: {} planned entries owned elsewhere",
                        location,
                        conflicts.len()
                    );
                    return Err(ManagerError::Conflict { names: conflicts });
                }
                prior
                    .iter()
                    .map(|e| e.name())
                    .filter(|n| !planned_names.contains(n) && remote.contains_key(n))
                    .collect()
            }
        };
        if mode == Mode::NonExhaustive {
            require_pivot(position, |p| {
                remote.contains_key(p) && !stale.iter().any(|s| *s == p)
            })?;
        }

        let mut ops: Vec<ConfigOp<E>> = stale.iter().map(|n| ConfigOp::delete(*n)).collect();
        for entry in planned {
            match remote.get(entry.name()) {
                Some(current) if current.entry_equals(entry) => {}
                _ => ops.push(ConfigOp::edit(entry.clone())),
            }
        }

        tracing::info!(
            "Updating {} at {} ({:?}): {} deletes, {} edits",
            planned.len(),
            location,
            mode,
            stale.len(),
            ops.len() - stale.len()
        );
        self.submit(location, &ops, cancel).await?;
        self.converge(cache, location, planned, position, cancel)
            .await
    }

    async fn delete_locked(
        &self,
        cache: &mut dyn CacheManager<E>,
        location: &Location,
        names: &[String],
        cancel: &CancellationToken,
    ) -> Result<(), ManagerError> {
        let present: HashSet<String> = self
            .reader()
            .list_names(location, cancel)
            .await
            .map_err(remote_error("listing names"))?
            .into_iter()
            .collect();

        let mut seen: HashSet<&str> = HashSet::new();
        let targets: Vec<&str> = names
            .iter()
            .map(String::as_str)
            .filter(|n| present.contains(*n) && seen.insert(*n))
            .collect();
        if targets.is_empty() {
            tracing::debug!("Nothing to delete at {}", location);
            return Ok(());
        }

        let ops: Vec<ConfigOp<E>> = targets.iter().map(|n| ConfigOp::delete(*n)).collect();
        tracing::info!("Deleting {} entries at {}", ops.len(), location);
        self.submit(location, &ops, cancel).await?;

        let key = location.key();
        for name in targets {
            cache.delete(&key, name);
        }
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Current collection, from the cache when it holds the location.
    async fn read_existing(
        &self,
        cache: &mut dyn CacheManager<E>,
        location: &Location,
        cancel: &CancellationToken,
    ) -> Result<Vec<E>, ManagerError> {
        let key = location.key();
        if let Some(entries) = cache.get_all(&key)? {
            tracing::debug!("Cache hit for {} ({} entries)", location, entries.len());
            return Ok(entries);
        }

        let entries = self
            .reader()
            .read_ordered(location, cancel)
            .await
            .map_err(remote_error("reading entries"))?;
        if cache.is_caching_enabled() {
            cache.set_initialized(&key, entries.clone())?;
        }
        Ok(entries)
    }

    async fn submit(
        &self,
        location: &Location,
        ops: &[ConfigOp<E>],
        cancel: &CancellationToken,
    ) -> Result<(), ManagerError> {
        if ops.is_empty() {
            return Ok(());
        }
        check(cancel)?;
        self.client
            .multi_config(location, ops)
            .await
            .map_err(remote_write_error("submitting changes"))
    }

    /// Read back after writes, move `planned` into place and refresh the
    /// cache with the resulting order.
    async fn converge(
        &self,
        cache: &mut dyn CacheManager<E>,
        location: &Location,
        planned: &[E],
        position: &Position,
        cancel: &CancellationToken,
    ) -> Result<Vec<E>, ManagerError> {
        let current = self
            .reader()
            .read_ordered(location, cancel)
            .await
            .map_err(remote_error("reading back entries"))?;

        let actions = position.move_actions(planned, &current)?;
        let current = if actions.is_empty() {
            current
        } else {
            check(cancel)?;
            tracing::info!("Moving {} entries at {}", actions.len(), location);
            for action in &actions {
                tracing::debug!("Move {} at {}", action, location);
            }
            self.client
                .move_group(location, &actions)
                .await
                .map_err(remote_write_error("moving entries"))?;
            let order = apply_moves(&current, &actions)?;
            reorder(current, &order)
        };

        let processed = processed(planned, &current);
        if cache.is_caching_enabled() {
            cache.set_initialized(&location.key(), current)?;
        }
        Ok(processed)
    }
}

fn check(cancel: &CancellationToken) -> Result<(), ManagerError> {
    if cancel.is_cancelled() {
        return Err(ManagerError::Cancelled);
    }
    Ok(())
}

fn settle<E, T>(
    cache: &mut dyn CacheManager<E>,
    location: &Location,
    result: Result<T, ManagerError>,
) -> Result<T, ManagerError> {
    if let Err(e) = &result {
        tracing::debug!("Dropping cached state for {}: {}", location, e);
        cache.invalidate(&location.key());
    }
    result
}

fn ensure_unique<E: Entry>(entries: &[E]) -> Result<(), ManagerError> {
    let mut seen = HashSet::with_capacity(entries.len());
    for entry in entries {
        if !seen.insert(entry.name()) {
            return Err(ManagerError::PlanConflict {
                name: entry.name().to_string(),
            });
        }
    }
    Ok(())
}

fn require_pivot(
    position: &Position,
    exists: impl Fn(&str) -> bool,
) -> Result<(), ManagerError> {
    match position.pivot() {
        Some(pivot) if !exists(pivot) => Err(ManagerError::MissingPivot {
            pivot: pivot.to_string(),
        }),
        _ => Ok(()),
    }
}

/// Rearrange `entries` to follow `order` (a permutation of their names).
fn reorder<E: Entry>(entries: Vec<E>, order: &[String]) -> Vec<E> {
    let mut by_name: HashMap<String, E> = entries
        .into_iter()
        .map(|e| (e.name().to_string(), e))
        .collect();
    order.iter().filter_map(|n| by_name.remove(n)).collect()
}

/// Fresh copies of `planned` in `remote` order, with remote identifiers.
fn processed<E: Entry>(planned: &[E], remote: &[E]) -> Vec<E> {
    let index: HashMap<&str, (usize, Option<&str>)> = remote
        .iter()
        .enumerate()
        .map(|(i, e)| (e.name(), (i, e.uuid())))
        .collect();

    let mut out: Vec<E> = planned
        .iter()
        .map(|entry| {
            let mut copy = entry.clone();
            if let Some((_, Some(uuid))) = index.get(entry.name()) {
                copy.set_uuid(Some(uuid.to_string()));
            }
            copy
        })
        .collect();
    out.sort_by_key(|e| index.get(e.name()).map_or(usize::MAX, |(i, _)| *i));
    out
}
