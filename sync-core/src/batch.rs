//! Batching arithmetic for remote reads.
//!
//! Large collections cannot be listed or fetched in one query without
//! hitting payload and XPath complexity limits. This module decides how to
//! split the work:
//! - [`Shard`] buckets the name space by first character for listings
//! - [`chunk_names`] splits a name list into fixed-size fetch batches
//!
//! The reader in sync-client turns these decisions into remote queries.

use ordsync_types::Filter;

/// Batch size used when the configured one is missing or not positive.
pub const DEFAULT_READ_BATCH_SIZE: usize = 50;

/// Resolve a configured batch size, falling back to
/// [`DEFAULT_READ_BATCH_SIZE`] for zero or negative values.
pub fn effective_batch_size(configured: i64) -> usize {
    if configured <= 0 {
        DEFAULT_READ_BATCH_SIZE
    } else {
        usize::try_from(configured).unwrap_or(DEFAULT_READ_BATCH_SIZE)
    }
}

/// Split `names` into consecutive chunks of at most `batch_size` names.
///
/// Order is preserved within and across chunks.
pub fn chunk_names(names: &[String], batch_size: usize) -> Vec<&[String]> {
    names.chunks(batch_size.max(1)).collect()
}

/// A name-prefix bucket used to split one listing into several queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shard {
    /// Names starting with a digit.
    Digits,
    /// Names starting with a-f (either case).
    AToF,
    /// Names starting with g-l (either case).
    GToL,
    /// Names starting with m-r (either case).
    MToR,
    /// Names starting with s-z (either case).
    SToZ,
    /// Names starting with anything else.
    Special,
}

impl Shard {
    /// Every shard, in query order.
    pub const ALL: [Shard; 6] = [
        Shard::Digits,
        Shard::AToF,
        Shard::GToL,
        Shard::MToR,
        Shard::SToZ,
        Shard::Special,
    ];

    /// Leading characters covered by this shard.
    ///
    /// [`Shard::Special`] covers whatever the other shards do not, so it has
    /// no characters of its own.
    pub fn leading_chars(&self) -> Vec<char> {
        let letters = |from: char, to: char| -> Vec<char> {
            (from..=to)
                .chain(from.to_ascii_uppercase()..=to.to_ascii_uppercase())
                .collect()
        };
        match self {
            Shard::Digits => ('0'..='9').collect(),
            Shard::AToF => letters('a', 'f'),
            Shard::GToL => letters('g', 'l'),
            Shard::MToR => letters('m', 'r'),
            Shard::SToZ => letters('s', 'z'),
            Shard::Special => Vec::new(),
        }
    }

    /// The listing predicate for this shard.
    pub fn filter(&self) -> Filter {
        match self {
            Shard::Special => {
                let covered = Shard::ALL
                    .iter()
                    .filter(|s| **s != Shard::Special)
                    .flat_map(|s| s.leading_chars())
                    .map(String::from)
                    .collect();
                Filter::NameStartsWithNone(covered)
            }
            other => Filter::NameStartsWith(
                other.leading_chars().into_iter().map(String::from).collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn batch_size_defaults_when_not_positive() {
        assert_eq!(effective_batch_size(0), DEFAULT_READ_BATCH_SIZE);
        assert_eq!(effective_batch_size(-5), DEFAULT_READ_BATCH_SIZE);
        assert_eq!(effective_batch_size(7), 7);
    }

    #[test]
    fn chunks_preserve_order() {
        let names = owned(&["a", "b", "c", "d", "e"]);
        let chunks = chunk_names(&names, 2);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], &names[0..2]);
        assert_eq!(chunks[2], &names[4..5]);
    }

    #[test]
    fn chunking_empty_list_yields_nothing() {
        assert!(chunk_names(&[], 10).is_empty());
    }

    #[test]
    fn every_name_lands_in_exactly_one_shard() {
        let names = [
            ("0-day", Shard::Digits),
            ("9lives", Shard::Digits),
            ("allow", Shard::AToF),
            ("Finance", Shard::AToF),
            ("guest", Shard::GToL),
            ("Lab", Shard::GToL),
            ("mail", Shard::MToR),
            ("Rdp", Shard::MToR),
            ("ssh", Shard::SToZ),
            ("Zone", Shard::SToZ),
            ("_hidden", Shard::Special),
            ("-dash", Shard::Special),
            (".dot", Shard::Special),
            (" space", Shard::Special),
            ("éclair", Shard::Special),
        ];
        for (name, shard) in names {
            let matching: Vec<Shard> = Shard::ALL
                .iter()
                .copied()
                .filter(|s| s.filter().matches(name))
                .collect();
            assert_eq!(matching, vec![shard], "name {:?}", name);
        }
    }

    #[test]
    fn shard_filters_render_xpath() {
        let digits = Shard::Digits.filter().to_xpath().unwrap();
        assert!(digits.starts_with("starts-with(name,'0') or "));

        let special = Shard::Special.filter().to_xpath().unwrap();
        assert!(special.starts_with("not("));
        assert!(special.contains("starts-with(name,'Z')"));
    }
}
