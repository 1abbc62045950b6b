//! Operations submitted in a single multi-config batch.

use serde::{Deserialize, Serialize};

use crate::NamedEntity;

/// Discriminator for [`ConfigOp`], handy for logging and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    /// Remove an entry.
    Delete,
    /// Create or overwrite an entry.
    Edit,
}

/// One operation inside a multi-config submission.
///
/// The remote applies operations in list order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum ConfigOp<E> {
    /// Delete the entry with this name.
    Delete {
        /// Entry name.
        name: String,
    },
    /// Create the entry, or replace it in place when the name exists.
    ///
    /// New entries are appended at the bottom of the collection.
    Edit {
        /// Full entry payload.
        entry: E,
    },
}

impl<E: NamedEntity> ConfigOp<E> {
    /// Build a delete for `name`.
    pub fn delete(name: impl Into<String>) -> Self {
        ConfigOp::Delete { name: name.into() }
    }

    /// Build an edit for `entry`.
    pub fn edit(entry: E) -> Self {
        ConfigOp::Edit { entry }
    }

    /// Name of the entry this operation targets.
    pub fn target(&self) -> &str {
        match self {
            ConfigOp::Delete { name } => name,
            ConfigOp::Edit { entry } => entry.name(),
        }
    }

    /// The operation kind.
    pub fn kind(&self) -> OpKind {
        match self {
            ConfigOp::Delete { .. } => OpKind::Delete,
            ConfigOp::Edit { .. } => OpKind::Edit,
        }
    }
}
