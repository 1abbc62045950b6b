//! Shared fixtures for the async layer's tests.

use ordsync_types::{Entry, Location, NamedEntity};
use serde::{Deserialize, Serialize};

/// A minimal security-rule-like entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    pub uuid: Option<String>,
    pub action: String,
}

impl NamedEntity for Rule {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Entry for Rule {
    fn uuid(&self) -> Option<&str> {
        self.uuid.as_deref()
    }

    fn set_uuid(&mut self, uuid: Option<String>) {
        self.uuid = uuid;
    }

    fn entry_equals(&self, other: &Self) -> bool {
        self.name == other.name && self.action == other.action
    }
}

pub fn rule(name: &str) -> Rule {
    Rule {
        name: name.to_string(),
        uuid: None,
        action: "allow".to_string(),
    }
}

pub fn rules(names: &[&str]) -> Vec<Rule> {
    names.iter().map(|n| rule(n)).collect()
}

pub fn loc() -> Location {
    Location::new("fw1", "/config/devices/entry/vsys/entry/rulebase/security/rules")
}
