//! Mock remote for testing.
//!
//! Keeps an in-memory ordered collection per location and records every
//! call for verification.

use super::{RemoteClient, RemoteError};
use async_trait::async_trait;
use ordsync_core::apply_moves;
use ordsync_types::{ConfigOp, Entry, Filter, ImportLocation, Location, MoveAction, OpKind};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A call observed by [`MockRemote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    /// `list_entries` with the given filter.
    ListEntries {
        /// Location key.
        location: String,
        /// Filter used.
        filter: Filter,
        /// XPath the device would be queried with.
        xpath: String,
    },
    /// `list_names` with the given filter.
    ListNames {
        /// Location key.
        location: String,
        /// Filter used.
        filter: Filter,
        /// XPath the device would be queried with.
        xpath: String,
    },
    /// `multi_config` with the given operations.
    MultiConfig {
        /// Location key.
        location: String,
        /// Kind and target of every operation, in order.
        ops: Vec<(OpKind, String)>,
    },
    /// `move_group` with the given actions.
    MoveGroup {
        /// Location key.
        location: String,
        /// Actions, in order.
        actions: Vec<MoveAction>,
    },
    /// `import_to_location`.
    Import {
        /// Import list XPath.
        import: String,
        /// Imported names.
        names: Vec<String>,
    },
    /// `unimport_from_location`.
    Unimport {
        /// Import list XPath.
        import: String,
        /// Removed names.
        names: Vec<String>,
    },
}

impl RemoteCall {
    /// Whether this call changes remote state.
    pub fn is_write(&self) -> bool {
        !matches!(
            self,
            RemoteCall::ListEntries { .. } | RemoteCall::ListNames { .. }
        )
    }
}

/// Mock remote for testing.
///
/// Behaves like a device: listings honour [`Filter`], multi-config batches
/// are all-or-nothing, new entries land at the bottom, and moves follow
/// [`MoveAction`] semantics exactly.
#[derive(Debug)]
pub struct MockRemote<E> {
    inner: Arc<Mutex<MockRemoteInner<E>>>,
}

#[derive(Debug)]
struct MockRemoteInner<E> {
    collections: HashMap<String, Vec<E>>,
    imports: HashMap<String, Vec<String>>,
    calls: Vec<RemoteCall>,
    assign_uuids: bool,
    fail_next_list: Option<String>,
    fail_next_multi_config: Option<String>,
    fail_next_move: Option<String>,
}

impl<E> Default for MockRemoteInner<E> {
    fn default() -> Self {
        Self {
            collections: HashMap::new(),
            imports: HashMap::new(),
            calls: Vec::new(),
            assign_uuids: false,
            fail_next_list: None,
            fail_next_multi_config: None,
            fail_next_move: None,
        }
    }
}

impl<E: Entry> MockRemote<E> {
    /// Create an empty mock remote.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockRemoteInner::default())),
        }
    }

    /// Assign a random UUID to every entry created without one.
    pub fn with_uuids(self) -> Self {
        self.inner.lock().unwrap().assign_uuids = true;
        self
    }

    /// Replace the collection at `location`.
    pub fn seed(&self, location: &Location, entries: Vec<E>) {
        let mut inner = self.inner.lock().unwrap();
        inner.collections.insert(location.key(), entries);
    }

    /// Current entries at `location`, in device order.
    pub fn entries(&self, location: &Location) -> Vec<E> {
        let inner = self.inner.lock().unwrap();
        inner
            .collections
            .get(&location.key())
            .cloned()
            .unwrap_or_default()
    }

    /// Current entry names at `location`, in device order.
    pub fn names(&self, location: &Location) -> Vec<String> {
        self.entries(location)
            .iter()
            .map(|e| e.name().to_string())
            .collect()
    }

    /// Names currently imported into `import`.
    pub fn imported(&self, import: &ImportLocation) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner.imports.get(&import.xpath).cloned().unwrap_or_default()
    }

    /// Every call made so far.
    pub fn calls(&self) -> Vec<RemoteCall> {
        let inner = self.inner.lock().unwrap();
        inner.calls.clone()
    }

    /// Only the calls that changed remote state.
    pub fn write_calls(&self) -> Vec<RemoteCall> {
        self.calls().into_iter().filter(|c| c.is_write()).collect()
    }

    /// Forget recorded calls, keeping remote state.
    pub fn clear_calls(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.clear();
    }

    /// Cause the next listing (entries or names) to fail.
    pub fn fail_next_list(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_list = Some(error.to_string());
    }

    /// Cause the next multi-config submission to fail.
    pub fn fail_next_multi_config(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_multi_config = Some(error.to_string());
    }

    /// Cause the next move-group call to fail.
    pub fn fail_next_move(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_move = Some(error.to_string());
    }
}

impl<E: Entry> Default for MockRemote<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for MockRemote<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Entry> MockRemoteInner<E> {
    fn matching(&mut self, location: &Location, filter: &Filter) -> Result<Vec<E>, RemoteError> {
        if let Some(error) = self.fail_next_list.take() {
            return Err(RemoteError::ConnectionFailed(error));
        }
        let found: Vec<E> = self
            .collections
            .get(&location.key())
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| filter.matches(e.name()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        if found.is_empty() {
            return Err(RemoteError::ObjectNotFound);
        }
        Ok(found)
    }
}

fn query_xpath(location: &Location, filter: &Filter) -> String {
    location.xpath_with(filter.to_xpath().as_deref())
}

#[async_trait]
impl<E: Entry + 'static> RemoteClient<E> for MockRemote<E> {
    async fn list_entries(
        &self,
        location: &Location,
        filter: &Filter,
    ) -> Result<Vec<E>, RemoteError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(RemoteCall::ListEntries {
            location: location.key(),
            filter: filter.clone(),
            xpath: query_xpath(location, filter),
        });
        inner.matching(location, filter)
    }

    async fn list_names(
        &self,
        location: &Location,
        filter: &Filter,
    ) -> Result<Vec<String>, RemoteError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(RemoteCall::ListNames {
            location: location.key(),
            filter: filter.clone(),
            xpath: query_xpath(location, filter),
        });
        inner
            .matching(location, filter)
            .map(|entries| entries.iter().map(|e| e.name().to_string()).collect())
    }

    async fn multi_config(
        &self,
        location: &Location,
        ops: &[ConfigOp<E>],
    ) -> Result<(), RemoteError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(RemoteCall::MultiConfig {
            location: location.key(),
            ops: ops
                .iter()
                .map(|op| (op.kind(), op.target().to_string()))
                .collect(),
        });

        if let Some(error) = inner.fail_next_multi_config.take() {
            return Err(RemoteError::Rejected(error));
        }

        // Work on a copy so a failing op leaves the device untouched.
        let mut entries = inner
            .collections
            .get(&location.key())
            .cloned()
            .unwrap_or_default();
        for op in ops {
            match op {
                ConfigOp::Delete { name } => {
                    let idx = entries
                        .iter()
                        .position(|e| e.name() == name)
                        .ok_or(RemoteError::ObjectNotFound)?;
                    entries.remove(idx);
                }
                ConfigOp::Edit { entry } => {
                    let mut entry = entry.clone();
                    match entries.iter().position(|e| e.name() == entry.name()) {
                        Some(idx) => {
                            if entry.uuid().is_none() {
                                entry.set_uuid(entries[idx].uuid().map(String::from));
                            }
                            entries[idx] = entry;
                        }
                        None => {
                            if inner.assign_uuids && entry.uuid().is_none() {
                                entry.set_uuid(Some(uuid::Uuid::new_v4().to_string()));
                            }
                            entries.push(entry);
                        }
                    }
                }
            }
        }
        inner.collections.insert(location.key(), entries);
        Ok(())
    }

    async fn move_group(
        &self,
        location: &Location,
        actions: &[MoveAction],
    ) -> Result<(), RemoteError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(RemoteCall::MoveGroup {
            location: location.key(),
            actions: actions.to_vec(),
        });

        if let Some(error) = inner.fail_next_move.take() {
            return Err(RemoteError::Rejected(error));
        }

        let entries = inner
            .collections
            .remove(&location.key())
            .unwrap_or_default();
        let order = match apply_moves(&entries, actions) {
            Ok(order) => order,
            Err(e) => {
                inner.collections.insert(location.key(), entries);
                return Err(RemoteError::Rejected(e.to_string()));
            }
        };
        let mut by_name: HashMap<String, E> = entries
            .into_iter()
            .map(|e| (e.name().to_string(), e))
            .collect();
        let reordered = order
            .iter()
            .filter_map(|name| by_name.remove(name))
            .collect();
        inner.collections.insert(location.key(), reordered);
        Ok(())
    }

    async fn import_to_location(
        &self,
        _location: &Location,
        import: &ImportLocation,
        names: &[String],
    ) -> Result<(), RemoteError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(RemoteCall::Import {
            import: import.xpath.clone(),
            names: names.to_vec(),
        });
        let members = inner.imports.entry(import.xpath.clone()).or_default();
        for name in names {
            if !members.contains(name) {
                members.push(name.clone());
            }
        }
        Ok(())
    }

    async fn unimport_from_location(
        &self,
        _location: &Location,
        import: &ImportLocation,
        names: &[String],
    ) -> Result<(), RemoteError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(RemoteCall::Unimport {
            import: import.xpath.clone(),
            names: names.to_vec(),
        });
        if let Some(members) = inner.imports.get_mut(&import.xpath) {
            members.retain(|m| !names.contains(m));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordsync_types::NamedEntity;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        name: String,
        uuid: Option<String>,
        value: u32,
    }

    impl NamedEntity for Item {
        fn name(&self) -> &str {
            &self.name
        }
    }

    impl Entry for Item {
        fn uuid(&self) -> Option<&str> {
            self.uuid.as_deref()
        }

        fn set_uuid(&mut self, uuid: Option<String>) {
            self.uuid = uuid;
        }

        fn entry_equals(&self, other: &Self) -> bool {
            self.name == other.name && self.value == other.value
        }
    }

    fn item(name: &str, value: u32) -> Item {
        Item {
            name: name.into(),
            uuid: None,
            value,
        }
    }

    fn loc() -> Location {
        Location::new("fw1", "/config/items")
    }

    // ===========================================
    // Listing
    // ===========================================

    #[tokio::test]
    async fn listing_honours_filter_and_order() {
        let remote = MockRemote::new();
        remote.seed(&loc(), vec![item("c", 1), item("a", 2), item("b", 3)]);

        let names = remote
            .list_names(&loc(), &Filter::NameIn(vec!["b".into(), "c".into()]))
            .await
            .unwrap();
        assert_eq!(names, vec!["c", "b"]);

        match &remote.calls()[0] {
            RemoteCall::ListNames { xpath, .. } => {
                assert_eq!(xpath, "/config/items/entry[name='b' or name='c']");
            }
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[tokio::test]
    async fn unfiltered_listing_queries_bare_entry_path() {
        let remote = MockRemote::new();
        remote.seed(&loc(), vec![item("a", 1)]);
        remote.list_entries(&loc(), &Filter::All).await.unwrap();

        assert!(matches!(
            &remote.calls()[0],
            RemoteCall::ListEntries { xpath, .. } if xpath == "/config/items/entry"
        ));
    }

    #[tokio::test]
    async fn empty_listing_is_not_found() {
        let remote: MockRemote<Item> = MockRemote::new();
        let result = remote.list_entries(&loc(), &Filter::All).await;
        assert!(matches!(result, Err(RemoteError::ObjectNotFound)));
    }

    #[tokio::test]
    async fn forced_list_failure_is_one_shot() {
        let remote = MockRemote::new();
        remote.seed(&loc(), vec![item("a", 1)]);
        remote.fail_next_list("device busy");

        let result = remote.list_entries(&loc(), &Filter::All).await;
        assert!(matches!(result, Err(RemoteError::ConnectionFailed(_))));
        assert!(remote.list_entries(&loc(), &Filter::All).await.is_ok());
    }

    // ===========================================
    // Multi-config
    // ===========================================

    #[tokio::test]
    async fn edits_append_and_replace_in_place() {
        let remote = MockRemote::new();
        remote.seed(&loc(), vec![item("a", 1), item("b", 2)]);

        remote
            .multi_config(
                &loc(),
                &[ConfigOp::edit(item("c", 3)), ConfigOp::edit(item("a", 10))],
            )
            .await
            .unwrap();

        let entries = remote.entries(&loc());
        assert_eq!(entries, vec![item("a", 10), item("b", 2), item("c", 3)]);
    }

    #[tokio::test]
    async fn failing_batch_changes_nothing() {
        let remote = MockRemote::new();
        remote.seed(&loc(), vec![item("a", 1)]);

        let result = remote
            .multi_config(
                &loc(),
                &[ConfigOp::delete("a"), ConfigOp::delete("missing")],
            )
            .await;
        assert!(matches!(result, Err(RemoteError::ObjectNotFound)));
        assert_eq!(remote.names(&loc()), vec!["a"]);
    }

    #[tokio::test]
    async fn uuids_assigned_on_create_and_kept_on_edit() {
        let remote = MockRemote::new().with_uuids();
        remote
            .multi_config(&loc(), &[ConfigOp::edit(item("a", 1))])
            .await
            .unwrap();
        let uuid = remote.entries(&loc())[0].uuid.clone();
        assert!(uuid.is_some());

        remote
            .multi_config(&loc(), &[ConfigOp::edit(item("a", 2))])
            .await
            .unwrap();
        assert_eq!(remote.entries(&loc())[0].uuid, uuid);
    }

    // ===========================================
    // Moves and imports
    // ===========================================

    #[tokio::test]
    async fn moves_reorder_collection() {
        let remote = MockRemote::new();
        remote.seed(&loc(), vec![item("a", 1), item("b", 2), item("c", 3)]);

        remote
            .move_group(
                &loc(),
                &[MoveAction::top("c"), MoveAction::after("a", "c")],
            )
            .await
            .unwrap();
        assert_eq!(remote.names(&loc()), vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn bad_move_is_rejected_without_change() {
        let remote = MockRemote::new();
        remote.seed(&loc(), vec![item("a", 1), item("b", 2)]);

        let result = remote
            .move_group(&loc(), &[MoveAction::after("a", "zzz")])
            .await;
        assert!(matches!(result, Err(RemoteError::Rejected(_))));
        assert_eq!(remote.names(&loc()), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn import_and_unimport_members() {
        let remote: MockRemote<Item> = MockRemote::new();
        let import = ImportLocation::new("/config/vsys/import/network/interface");
        let names = vec!["eth1".to_string(), "eth2".to_string()];

        remote
            .import_to_location(&loc(), &import, &names)
            .await
            .unwrap();
        remote
            .import_to_location(&loc(), &import, &names[..1])
            .await
            .unwrap();
        assert_eq!(remote.imported(&import), names);

        remote
            .unimport_from_location(&loc(), &import, &names[..1])
            .await
            .unwrap();
        assert_eq!(remote.imported(&import), vec!["eth2"]);
    }

    #[tokio::test]
    async fn clone_shares_state() {
        let remote1 = MockRemote::new();
        let remote2 = remote1.clone();

        remote1.seed(&loc(), vec![item("a", 1)]);
        assert_eq!(remote2.names(&loc()), vec!["a"]);

        remote2.list_entries(&loc(), &Filter::All).await.unwrap();
        assert_eq!(remote1.calls().len(), 1);
        assert!(remote1.write_calls().is_empty());
    }
}
