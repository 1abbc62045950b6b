//! Move actions - the instructions sent to the remote "move group" primitive.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a moved entry lands.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "where", content = "destination", rename_all = "lowercase")]
pub enum MoveWhere {
    /// Insert at the head of the collection.
    Top,
    /// Insert directly after the named entry.
    After(String),
}

impl MoveWhere {
    /// The wire keyword for this placement ("top" or "after").
    pub fn keyword(&self) -> &'static str {
        match self {
            MoveWhere::Top => "top",
            MoveWhere::After(_) => "after",
        }
    }

    /// The destination entry name, or the literal "top" marker.
    pub fn destination(&self) -> &str {
        match self {
            MoveWhere::Top => "top",
            MoveWhere::After(name) => name,
        }
    }
}

/// A single-entry move, applied in sequence.
///
/// Each action assumes every earlier action in the same list has already
/// been applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MoveAction {
    /// The entry being moved.
    pub entry_name: String,
    /// Where it goes.
    #[serde(flatten)]
    pub placement: MoveWhere,
}

impl MoveAction {
    /// Move `entry_name` to the head of the collection.
    pub fn top(entry_name: impl Into<String>) -> Self {
        Self {
            entry_name: entry_name.into(),
            placement: MoveWhere::Top,
        }
    }

    /// Move `entry_name` directly after `destination`.
    pub fn after(entry_name: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            entry_name: entry_name.into(),
            placement: MoveWhere::After(destination.into()),
        }
    }
}

impl fmt::Display for MoveAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = self.placement.keyword();
        match &self.placement {
            MoveWhere::Top => write!(f, "{} -> {}", self.entry_name, keyword),
            MoveWhere::After(_) => write!(
                f,
                "{} -> {} {}",
                self.entry_name,
                keyword,
                self.placement.destination()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_match_wire_form() {
        assert_eq!(MoveAction::top("a").placement.keyword(), "top");
        assert_eq!(MoveAction::after("b", "a").placement.keyword(), "after");
        assert_eq!(MoveAction::after("b", "a").placement.destination(), "a");
    }

    #[test]
    fn display_is_readable() {
        assert_eq!(MoveAction::top("a").to_string(), "a -> top");
        assert_eq!(MoveAction::after("b", "a").to_string(), "b -> after a");
    }

    #[test]
    fn serializes_flat() {
        let json = serde_json::to_value(MoveAction::after("b", "a")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"entry_name": "b", "where": "after", "destination": "a"})
        );

        let json = serde_json::to_value(MoveAction::top("a")).unwrap();
        assert_eq!(json, serde_json::json!({"entry_name": "a", "where": "top"}));
    }
}
