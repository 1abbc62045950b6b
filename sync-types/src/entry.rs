//! Entry capabilities shared by every reconciled collection.

/// Anything identified by a unique, stable name.
///
/// The ordering algorithms only ever look at names; entry payloads stay
/// opaque to them.
pub trait NamedEntity {
    /// The entry name, unique within one location.
    fn name(&self) -> &str;
}

impl NamedEntity for String {
    fn name(&self) -> &str {
        self.as_str()
    }
}

impl NamedEntity for &str {
    fn name(&self) -> &str {
        self
    }
}

impl<T: NamedEntity + ?Sized> NamedEntity for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }
}

/// A configuration entry the manager can create, read, update and move.
///
/// Implementors supply the two pieces of knowledge the manager cannot infer:
/// how to carry a remote-assigned identifier, and whether two versions of an
/// entry are equivalent.
pub trait Entry: NamedEntity + Clone + Send + Sync {
    /// Opaque identifier assigned by the remote device, if any.
    fn uuid(&self) -> Option<&str> {
        None
    }

    /// Store the remote-assigned identifier.
    ///
    /// Entries without identifiers can ignore this.
    fn set_uuid(&mut self, _uuid: Option<String>) {}

    /// Whether `self` and `other` describe the same configuration.
    ///
    /// Identifiers must not take part in the comparison.
    fn entry_equals(&self, other: &Self) -> bool;
}
