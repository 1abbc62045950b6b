//! # sync-core
//!
//! Pure logic for ordsync (no I/O, instant tests).
//!
//! This crate implements the algorithms behind ordered-collection
//! reconciliation without any network access, enabling fast unit tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about ordering math
//!
//! The actual I/O (listing, multi-config submission, moves) is performed by
//! `sync-client`, which interprets the decisions made here.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod batch;
pub mod cache;
pub mod movement;

pub use batch::{chunk_names, effective_batch_size, Shard, DEFAULT_READ_BATCH_SIZE};
pub use cache::{
    CacheError, CacheManager, CachedEntry, CloneNormalizer, JsonNormalizer, LocationCache,
    LocationCacheEntry, NoOpCache, Normalizer,
};
pub use movement::{
    apply_moves, generate_movements, longest_common_subsequence, MovementError, Position,
};
