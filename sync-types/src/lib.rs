//! # sync-types
//!
//! Wire-level types for ordsync, the ordered-collection reconciliation engine.
//!
//! This crate provides the foundational types used across all ordsync crates:
//! - [`NamedEntity`], [`Entry`] - The capabilities every reconciled entry exposes
//! - [`MoveAction`], [`MoveWhere`] - Single-entry move instructions
//! - [`Location`], [`ImportLocation`] - Addressing for remote collections
//! - [`Filter`] - Name predicates rendered as XPath
//! - [`ConfigOp`] - Operations submitted in one multi-config batch

#![warn(missing_docs)]
#![warn(clippy::all)]

mod action;
mod entry;
mod filter;
mod location;
mod ops;

pub use action::{MoveAction, MoveWhere};
pub use entry::{Entry, NamedEntity};
pub use filter::Filter;
pub use location::{ImportLocation, Location};
pub use ops::{ConfigOp, OpKind};
