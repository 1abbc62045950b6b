//! Addressing for remote collections.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An addressable remote container holding one ordered entry collection.
///
/// The location doubles as the cache partition key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// Target device (serial number or hostname).
    pub device: String,
    /// Virtual system scope, when the device has several.
    pub vsys: Option<String>,
    /// XPath of the collection root, e.g. `/config/.../rulebase/security/rules`.
    pub xpath: String,
}

impl Location {
    /// Create a location on `device` rooted at `xpath`.
    pub fn new(device: impl Into<String>, xpath: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            vsys: None,
            xpath: xpath.into(),
        }
    }

    /// Scope the location to a virtual system.
    pub fn with_vsys(mut self, vsys: impl Into<String>) -> Self {
        self.vsys = Some(vsys.into());
        self
    }

    /// Stable key identifying this location in caches and logs.
    pub fn key(&self) -> String {
        match &self.vsys {
            Some(vsys) => format!("{}:{}:{}", self.device, vsys, self.xpath),
            None => format!("{}:{}", self.device, self.xpath),
        }
    }

    /// XPath of the collection root, with an optional name predicate.
    pub fn xpath_with(&self, predicate: Option<&str>) -> String {
        match predicate {
            Some(p) => format!("{}/entry[{}]", self.xpath, p),
            None => format!("{}/entry", self.xpath),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// A secondary owning object entries must also be registered against.
///
/// Some collections (interfaces, zones) only take effect once their names are
/// imported into a vsys or virtual router; this addresses that import list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImportLocation {
    /// XPath of the import member list.
    pub xpath: String,
}

impl ImportLocation {
    /// Create an import location.
    pub fn new(xpath: impl Into<String>) -> Self {
        Self {
            xpath: xpath.into(),
        }
    }
}
