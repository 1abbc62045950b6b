//! Name predicates for listing queries.
//!
//! The reader and manager decide *which* names or prefixes to ask for; this
//! module turns that decision into an XPath predicate the remote understands:
//! - `name='x' or name='y'` for batched reads
//! - `starts-with(name,'p')` for sharded listings

use serde::{Deserialize, Serialize};

/// A predicate over entry names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Filter {
    /// Every entry at the location.
    All,
    /// Entries whose name is one of the given names.
    NameIn(Vec<String>),
    /// Entries whose name starts with any of the given prefixes.
    NameStartsWith(Vec<String>),
    /// Entries whose name starts with none of the given prefixes.
    NameStartsWithNone(Vec<String>),
}

impl Filter {
    /// Check whether `name` satisfies this predicate.
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Filter::All => true,
            Filter::NameIn(names) => names.iter().any(|n| n == name),
            Filter::NameStartsWith(prefixes) => {
                prefixes.iter().any(|p| name.starts_with(p.as_str()))
            }
            Filter::NameStartsWithNone(prefixes) => {
                !prefixes.iter().any(|p| name.starts_with(p.as_str()))
            }
        }
    }

    /// Render the XPath predicate body, without the surrounding brackets.
    ///
    /// Returns `None` for [`Filter::All`], which needs no predicate.
    pub fn to_xpath(&self) -> Option<String> {
        match self {
            Filter::All => None,
            Filter::NameIn(names) => Some(join_or(
                names.iter().map(|n| format!("name={}", quote(n))),
            )),
            Filter::NameStartsWith(prefixes) => Some(join_or(
                prefixes
                    .iter()
                    .map(|p| format!("starts-with(name,{})", quote(p))),
            )),
            Filter::NameStartsWithNone(prefixes) => {
                let inner = join_or(
                    prefixes
                        .iter()
                        .map(|p| format!("starts-with(name,{})", quote(p))),
                );
                Some(format!("not({})", inner))
            }
        }
    }
}

fn join_or(parts: impl Iterator<Item = String>) -> String {
    parts.collect::<Vec<_>>().join(" or ")
}

/// Quote an XPath string literal.
///
/// XPath 1.0 has no escape sequences, so values holding both quote kinds go
/// through `concat()`.
fn quote(value: &str) -> String {
    if !value.contains('\'') {
        return format!("'{}'", value);
    }
    if !value.contains('"') {
        return format!("\"{}\"", value);
    }
    let pieces: Vec<String> = value
        .split('\'')
        .map(|piece| format!("'{}'", piece))
        .collect();
    format!("concat({})", pieces.join(", \"'\", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn all_has_no_predicate() {
        assert_eq!(Filter::All.to_xpath(), None);
        assert!(Filter::All.matches("anything"));
    }

    #[test]
    fn name_in_renders_or_chain() {
        let filter = Filter::NameIn(names(&["a", "b"]));
        assert_eq!(filter.to_xpath().unwrap(), "name='a' or name='b'");
        assert!(filter.matches("b"));
        assert!(!filter.matches("c"));
    }

    #[test]
    fn starts_with_renders_prefixes() {
        let filter = Filter::NameStartsWith(names(&["a", "b"]));
        assert_eq!(
            filter.to_xpath().unwrap(),
            "starts-with(name,'a') or starts-with(name,'b')"
        );
        assert!(filter.matches("allow"));
        assert!(!filter.matches("deny"));
    }

    #[test]
    fn starts_with_none_negates() {
        let filter = Filter::NameStartsWithNone(names(&["a"]));
        assert_eq!(filter.to_xpath().unwrap(), "not(starts-with(name,'a'))");
        assert!(filter.matches("_internal"));
        assert!(!filter.matches("allow"));
    }

    #[test]
    fn quoting_handles_apostrophes() {
        assert_eq!(quote("it's"), "\"it's\"");
        assert_eq!(quote("a'b\"c"), "concat('a', \"'\", 'b\"c')");
    }
}
