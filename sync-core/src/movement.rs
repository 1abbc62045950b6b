//! Order diff engine for ordsync.
//!
//! This module computes the move actions that bring an existing remote order
//! in line with a [`Position`] directive:
//! - Build the expected final order for the directive
//! - Align existing and expected order with a longest common subsequence
//! - Hang every move off the unmoved "anchor" so the remote needs as few
//!   single-entry moves as possible
//!
//! Everything here works on names only and performs no I/O. The manager in
//! sync-client sends the resulting actions through the remote move primitive.

use ordsync_types::{MoveAction, MoveWhere, NamedEntity};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Errors produced while computing or applying movements.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MovementError {
    /// The pivot of a before/after directive is not in the existing order.
    #[error("pivot point not found: {0}")]
    MissingPivot(String),

    /// The directive is malformed or contradicts the entries being placed.
    #[error("invalid position: {0}")]
    InvalidPosition(String),

    /// An entry being placed is not part of the existing order.
    #[error("entry not found in existing order: {0}")]
    EntryNotFound(String),

    /// Existing and expected order must be permutations of each other.
    #[error("existing and expected order differ in length ({existing} vs {expected})")]
    LengthMismatch {
        /// Length of the existing order.
        existing: usize,
        /// Length of the expected order.
        expected: usize,
    },
}

/// Where a group of entries should sit in the remote order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Position {
    /// At the head of the collection, in the given order.
    Top,
    /// At the tail of the collection, in the given order.
    #[default]
    Bottom,
    /// Before the pivot entry.
    Before {
        /// Name of the pivot entry.
        pivot: String,
        /// Require the group to touch the pivot with nothing in between.
        directly: bool,
    },
    /// After the pivot entry.
    After {
        /// Name of the pivot entry.
        pivot: String,
        /// Require the group to touch the pivot with nothing in between.
        directly: bool,
    },
}

impl Position {
    /// Place entries before `pivot`.
    pub fn before(pivot: impl Into<String>, directly: bool) -> Self {
        Position::Before {
            pivot: pivot.into(),
            directly,
        }
    }

    /// Place entries after `pivot`.
    pub fn after(pivot: impl Into<String>, directly: bool) -> Self {
        Position::After {
            pivot: pivot.into(),
            directly,
        }
    }

    /// The pivot name for before/after directives.
    pub fn pivot(&self) -> Option<&str> {
        match self {
            Position::Top | Position::Bottom => None,
            Position::Before { pivot, .. } | Position::After { pivot, .. } => Some(pivot),
        }
    }

    /// Check that the directive makes sense for `entries`.
    ///
    /// In exhaustive mode the placed entries are the whole collection, so a
    /// pivot outside of them cannot exist afterwards.
    pub fn validate<N: NamedEntity>(
        &self,
        entries: &[N],
        exhaustive: bool,
    ) -> Result<(), MovementError> {
        let Some(pivot) = self.pivot() else {
            return Ok(());
        };
        if pivot.is_empty() {
            return Err(MovementError::InvalidPosition(
                "pivot name must not be empty".into(),
            ));
        }
        if exhaustive {
            return Err(MovementError::InvalidPosition(format!(
                "relative placement around {} is not possible in exhaustive mode",
                pivot
            )));
        }
        if entries.iter().any(|e| e.name() == pivot) {
            return Err(MovementError::InvalidPosition(format!(
                "pivot {} is one of the entries being placed",
                pivot
            )));
        }
        Ok(())
    }

    /// Compute the move actions that place `entries` according to this
    /// directive, given the `existing` remote order.
    ///
    /// Returns an empty list when nothing has to move. Every entry must
    /// already be part of `existing`.
    pub fn move_actions<N: NamedEntity, M: NamedEntity>(
        &self,
        entries: &[N],
        existing: &[M],
    ) -> Result<Vec<MoveAction>, MovementError> {
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let entries: Vec<&str> = entries.iter().map(|e| e.name()).collect();
        let existing: Vec<&str> = existing.iter().map(|e| e.name()).collect();
        let existing_idx = index_of(&existing);

        for name in &entries {
            if !existing_idx.contains_key(name) {
                return Err(MovementError::EntryNotFound(name.to_string()));
            }
        }

        let expected = match self {
            Position::Top => {
                let moved: HashSet<&str> = entries.iter().copied().collect();
                let mut expected = entries.clone();
                expected.extend(existing.iter().filter(|n| !moved.contains(*n)));
                expected
            }
            Position::Bottom => {
                let moved: HashSet<&str> = entries.iter().copied().collect();
                let mut expected: Vec<&str> = existing
                    .iter()
                    .copied()
                    .filter(|n| !moved.contains(n))
                    .collect();
                expected.extend(entries.iter().copied());
                expected
            }
            Position::Before { pivot, directly } | Position::After { pivot, directly } => {
                let before = matches!(self, Position::Before { .. });
                let pivot_idx = *existing_idx
                    .get(pivot.as_str())
                    .ok_or_else(|| MovementError::MissingPivot(pivot.clone()))?;
                if entries.contains(&pivot.as_str()) {
                    return Err(MovementError::InvalidPosition(format!(
                        "pivot {} is one of the entries being placed",
                        pivot
                    )));
                }
                if !directly
                    && !relative_movement_required(&entries, &existing_idx, pivot_idx, before)
                {
                    return Ok(Vec::new());
                }
                splice_around_pivot(&entries, &existing, pivot, before)?
            }
        };

        generate_movements(&existing, &expected, &entries)
    }
}

/// Whether a soft (not directly adjacent) placement needs any movement.
///
/// The first entry is still checked against the pivot bound; only the
/// comparison with the previous entry is skipped for it.
fn relative_movement_required(
    entries: &[&str],
    existing_idx: &HashMap<&str, usize>,
    pivot_idx: usize,
    before: bool,
) -> bool {
    let mut previous: Option<usize> = None;
    for (i, name) in entries.iter().enumerate() {
        let idx = existing_idx[name];
        let out_of_bounds = if before {
            idx >= pivot_idx
        } else {
            idx <= pivot_idx
        };
        if out_of_bounds {
            return true;
        }
        if i > 0 && previous.is_some_and(|prev| idx < prev) {
            return true;
        }
        previous = Some(idx);
    }
    false
}

/// Remove `entries` from `existing` and reinsert them, in order, right
/// before or right after the pivot.
fn splice_around_pivot<'a>(
    entries: &[&'a str],
    existing: &[&'a str],
    pivot: &str,
    before: bool,
) -> Result<Vec<&'a str>, MovementError> {
    let moved: HashSet<&str> = entries.iter().copied().collect();
    let mut expected: Vec<&str> = existing
        .iter()
        .copied()
        .filter(|n| !moved.contains(n))
        .collect();
    let pivot_idx = expected
        .iter()
        .position(|n| *n == pivot)
        .ok_or_else(|| MovementError::MissingPivot(pivot.to_string()))?;
    let at = if before { pivot_idx } else { pivot_idx + 1 };
    expected.splice(at..at, entries.iter().copied());
    Ok(expected)
}

/// Derive the move actions that turn `existing` into `expected`.
///
/// `entries` is the set being placed. The longest common subsequence of the
/// entries that are *not* being placed forms the anchor; entries already at
/// their expected index stay put when that keeps the anchor consistent.
/// Everything else is moved, in expected order, to follow its expected
/// predecessor (or to the top for index 0).
pub fn generate_movements<A: NamedEntity, B: NamedEntity, C: NamedEntity>(
    existing: &[A],
    expected: &[B],
    entries: &[C],
) -> Result<Vec<MoveAction>, MovementError> {
    if existing.len() != expected.len() {
        return Err(MovementError::LengthMismatch {
            existing: existing.len(),
            expected: expected.len(),
        });
    }

    let existing: Vec<&str> = existing.iter().map(|e| e.name()).collect();
    let expected: Vec<&str> = expected.iter().map(|e| e.name()).collect();
    let entries: Vec<&str> = entries.iter().map(|e| e.name()).collect();

    let existing_idx = index_of(&existing);
    let expected_idx = index_of(&expected);
    for name in &expected {
        if !existing_idx.contains_key(name) {
            return Err(MovementError::EntryNotFound(name.to_string()));
        }
    }
    for name in &entries {
        if !expected_idx.contains_key(name) {
            return Err(MovementError::EntryNotFound(name.to_string()));
        }
    }

    let moved: HashSet<&str> = entries.iter().copied().collect();
    let unmoved_existing: Vec<&str> = existing
        .iter()
        .copied()
        .filter(|n| !moved.contains(n))
        .collect();
    let unmoved_expected: Vec<&str> = expected
        .iter()
        .copied()
        .filter(|n| !moved.contains(n))
        .collect();

    let mut stable = longest_common_subsequence(&unmoved_existing, &unmoved_expected);

    // A placed entry already sitting at its final index can stay, as long as
    // it keeps the same relative order against every stable entry.
    for name in &entries {
        let (ex, exp) = (existing_idx[name], expected_idx[name]);
        if ex != exp {
            continue;
        }
        let consistent = stable.iter().all(|s| {
            let (s_ex, s_exp) = (existing_idx[s], expected_idx[s]);
            (s_ex < ex) == (s_exp < exp)
        });
        if consistent {
            stable.push(*name);
        }
    }
    let stable: HashSet<&str> = stable.into_iter().collect();

    let mut actions = Vec::new();
    for (idx, name) in expected.iter().enumerate() {
        if stable.contains(name) {
            continue;
        }
        if idx == 0 {
            actions.push(MoveAction::top(*name));
        } else {
            actions.push(MoveAction::after(*name, expected[idx - 1]));
        }
    }
    Ok(actions)
}

/// Longest common subsequence of two name sequences.
///
/// Ties are broken towards earlier elements of `a`.
pub fn longest_common_subsequence<'a>(a: &[&'a str], b: &[&str]) -> Vec<&'a str> {
    if a == b {
        return a.to_vec();
    }
    let (n, m) = (a.len(), b.len());
    // lengths[i][j] = LCS length of a[i..] and b[j..]
    let mut lengths = vec![vec![0u32; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lengths[i][j] = if a[i] == b[j] {
                lengths[i + 1][j + 1] + 1
            } else {
                lengths[i + 1][j].max(lengths[i][j + 1])
            };
        }
    }

    let mut result = Vec::with_capacity(lengths[0][0] as usize);
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if a[i] == b[j] {
            result.push(a[i]);
            i += 1;
            j += 1;
        } else if lengths[i + 1][j] >= lengths[i][j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }
    result
}

/// Apply `actions` to `order` and return the resulting order.
///
/// The input is left untouched; a failing action leaves no partial result.
pub fn apply_moves<N: NamedEntity>(
    order: &[N],
    actions: &[MoveAction],
) -> Result<Vec<String>, MovementError> {
    let mut current: Vec<String> = order.iter().map(|e| e.name().to_string()).collect();
    for action in actions {
        let from = current
            .iter()
            .position(|n| *n == action.entry_name)
            .ok_or_else(|| MovementError::EntryNotFound(action.entry_name.clone()))?;
        let name = current.remove(from);
        match &action.placement {
            MoveWhere::Top => current.insert(0, name),
            MoveWhere::After(dest) => {
                if *dest == name {
                    return Err(MovementError::InvalidPosition(format!(
                        "{} cannot be moved after itself",
                        name
                    )));
                }
                let to = current
                    .iter()
                    .position(|n| n == dest)
                    .ok_or_else(|| MovementError::EntryNotFound(dest.clone()))?;
                current.insert(to + 1, name);
            }
        }
    }
    Ok(current)
}

fn index_of<'a>(names: &[&'a str]) -> HashMap<&'a str, usize> {
    names.iter().enumerate().map(|(i, n)| (*n, i)).collect()
}
