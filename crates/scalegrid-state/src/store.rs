//! StateStore — redb-backed persistence for scalegrid.
//!
//! Provides typed operations over launch configurations and auto-scaling
//! groups. Each mutating call is one write transaction, so concurrent
//! readers never observe a partial write. The store supports both on-disk
//! and in-memory backends (the latter for testing).

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Filter and window for a listing, in store (name) order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Only these names; `None` means every record.
    pub names: Option<BTreeSet<String>>,
    /// Exclusive lower bound on the name.
    pub start_after: Option<String>,
    /// At most this many records; `None` means unbounded.
    pub limit: Option<usize>,
}

/// One window of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPage<T> {
    pub items: Vec<T>,
    /// Whether matching records remain past the last item.
    pub more: bool,
}

fn encode<T: Serialize>(value: &T) -> StateResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(map_err!(Serialize))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StateResult<T> {
    serde_json::from_slice(bytes).map_err(map_err!(Deserialize))
}

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(LAUNCH_CONFIGURATIONS).map_err(map_err!(Table))?;
        txn.open_table(GROUPS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    fn get<T: DeserializeOwned>(
        &self,
        def: NamedTable,
        key: &str,
    ) -> StateResult<Option<T>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(def).map_err(map_err!(Table))?;
        match table.get(key).map_err(map_err!(Read))? {
            Some(guard) => Ok(Some(decode(guard.value())?)),
            None => Ok(None),
        }
    }

    fn delete(&self, def: NamedTable, key: &str) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut table = txn.open_table(def).map_err(map_err!(Table))?;
            existed = table.remove(key).map_err(map_err!(Write))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(existed)
    }

    fn scan<T: DeserializeOwned>(
        &self,
        def: NamedTable,
        query: &ListQuery,
    ) -> StateResult<StoredPage<T>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(def).map_err(map_err!(Table))?;
        let mut items = Vec::new();
        let mut more = false;
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            let key = key.value();
            if let Some(after) = query.start_after.as_deref()
                && key <= after
            {
                continue;
            }
            if let Some(names) = &query.names
                && !names.contains(key)
            {
                continue;
            }
            if query.limit.is_some_and(|limit| items.len() >= limit) {
                more = true;
                break;
            }
            items.push(decode(value.value())?);
        }
        Ok(StoredPage { items, more })
    }

    // ── Launch configurations ──────────────────────────────────────

    /// Insert a launch configuration; fails if the name is taken.
    pub fn insert_launch_configuration(&self, lc: &LaunchConfiguration) -> StateResult<()> {
        let value = encode(lc)?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(LAUNCH_CONFIGURATIONS).map_err(map_err!(Table))?;
            if table.get(lc.name.as_str()).map_err(map_err!(Read))?.is_some() {
                return Err(StateError::AlreadyExists(format!(
                    "launch configuration {} already exists",
                    lc.name
                )));
            }
            table
                .insert(lc.name.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(name = %lc.name, "launch configuration stored");
        Ok(())
    }

    pub fn get_launch_configuration(&self, name: &str) -> StateResult<Option<LaunchConfiguration>> {
        self.get(LAUNCH_CONFIGURATIONS, name)
    }

    /// Delete a launch configuration by name. Returns true if it existed.
    ///
    /// Groups referencing it are left as they are.
    pub fn delete_launch_configuration(&self, name: &str) -> StateResult<bool> {
        let existed = self.delete(LAUNCH_CONFIGURATIONS, name)?;
        debug!(%name, existed, "launch configuration deleted");
        Ok(existed)
    }

    pub fn list_launch_configurations(
        &self,
        query: &ListQuery,
    ) -> StateResult<StoredPage<LaunchConfiguration>> {
        self.scan(LAUNCH_CONFIGURATIONS, query)
    }

    // ── Groups ─────────────────────────────────────────────────────

    /// Insert a group.
    ///
    /// In one transaction: the referenced launch configuration must exist
    /// and the group name must be free. `instances` is never written.
    pub fn insert_group(&self, group: &AutoScalingGroup) -> StateResult<()> {
        let mut row = group.clone();
        row.instances = None;
        let value = encode(&row)?;

        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let configs = txn.open_table(LAUNCH_CONFIGURATIONS).map_err(map_err!(Table))?;
            if configs
                .get(group.launch_configuration_name.as_str())
                .map_err(map_err!(Read))?
                .is_none()
            {
                return Err(StateError::NotFound(format!(
                    "launch configuration {} does not exist",
                    group.launch_configuration_name
                )));
            }
        }
        {
            let mut table = txn.open_table(GROUPS).map_err(map_err!(Table))?;
            if table.get(group.name.as_str()).map_err(map_err!(Read))?.is_some() {
                return Err(StateError::AlreadyExists(format!(
                    "auto scaling group {} already exists",
                    group.name
                )));
            }
            table
                .insert(group.name.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(name = %group.name, "group stored");
        Ok(())
    }

    pub fn get_group(&self, name: &str) -> StateResult<Option<AutoScalingGroup>> {
        self.get(GROUPS, name)
    }

    /// Update a group's desired capacity. Returns false if the group is absent.
    pub fn set_desired_capacity(&self, name: &str, desired: u32) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let updated;
        {
            let mut table = txn.open_table(GROUPS).map_err(map_err!(Table))?;
            let current: Option<AutoScalingGroup> = match table.get(name).map_err(map_err!(Read))? {
                Some(guard) => Some(decode(guard.value())?),
                None => None,
            };
            updated = match current {
                Some(mut group) => {
                    group.desired_capacity = desired;
                    let value = encode(&group)?;
                    table.insert(name, value.as_slice()).map_err(map_err!(Write))?;
                    true
                }
                None => false,
            };
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%name, desired, updated, "group capacity updated");
        Ok(updated)
    }

    /// Delete a group by name. Returns true if it existed.
    pub fn delete_group(&self, name: &str) -> StateResult<bool> {
        let existed = self.delete(GROUPS, name)?;
        debug!(%name, existed, "group deleted");
        Ok(existed)
    }

    pub fn list_groups(&self, query: &ListQuery) -> StateResult<StoredPage<AutoScalingGroup>> {
        self.scan(GROUPS, query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_launch_config(name: &str) -> LaunchConfiguration {
        LaunchConfiguration {
            name: name.to_string(),
            image_id: "ami-2b9b5842".to_string(),
            instance_type: "m1.small".to_string(),
            key_name: Some("ooi".to_string()),
            kernel_id: None,
            ramdisk_id: None,
            user_data: Some("XXXUSERDATAYYY".to_string()),
            security_groups: vec!["default".to_string()],
            block_device_mappings: Vec::new(),
            created_at: 1000,
        }
    }

    fn test_group(name: &str, lc: &str) -> AutoScalingGroup {
        AutoScalingGroup {
            name: name.to_string(),
            launch_configuration_name: lc.to_string(),
            min_size: 1,
            max_size: 5,
            desired_capacity: 1,
            availability_zones: vec!["us-east-1".to_string()],
            tags: Vec::new(),
            load_balancer_names: Vec::new(),
            created_at: 1000,
            instances: None,
        }
    }

    fn store_with_lc() -> StateStore {
        let store = StateStore::open_in_memory().unwrap();
        store.insert_launch_configuration(&test_launch_config("lc")).unwrap();
        store
    }

    fn names(page: &StoredPage<AutoScalingGroup>) -> Vec<&str> {
        page.items.iter().map(|g| g.name.as_str()).collect()
    }

    // ── Launch configurations ──────────────────────────────────────

    #[test]
    fn launch_config_insert_and_get() {
        let store = StateStore::open_in_memory().unwrap();
        let lc = test_launch_config("lc1");

        store.insert_launch_configuration(&lc).unwrap();
        assert_eq!(store.get_launch_configuration("lc1").unwrap(), Some(lc));
    }

    #[test]
    fn launch_config_duplicate_rejected() {
        let store = StateStore::open_in_memory().unwrap();
        store.insert_launch_configuration(&test_launch_config("lc1")).unwrap();

        let err = store
            .insert_launch_configuration(&test_launch_config("lc1"))
            .unwrap_err();
        assert!(matches!(err, StateError::AlreadyExists(_)));
    }

    #[test]
    fn launch_config_delete() {
        let store = StateStore::open_in_memory().unwrap();
        store.insert_launch_configuration(&test_launch_config("lc1")).unwrap();

        assert!(store.delete_launch_configuration("lc1").unwrap());
        assert!(!store.delete_launch_configuration("lc1").unwrap());
        assert!(store.get_launch_configuration("lc1").unwrap().is_none());
    }

    #[test]
    fn launch_config_delete_leaves_groups() {
        let store = store_with_lc();
        store.insert_group(&test_group("g1", "lc")).unwrap();

        assert!(store.delete_launch_configuration("lc").unwrap());
        assert!(store.get_group("g1").unwrap().is_some());
    }

    // ── Groups ─────────────────────────────────────────────────────

    #[test]
    fn group_insert_requires_launch_config() {
        let store = StateStore::open_in_memory().unwrap();
        let err = store.insert_group(&test_group("g1", "missing")).unwrap_err();
        assert!(matches!(err, StateError::NotFound(_)));
        assert!(store.get_group("g1").unwrap().is_none());
    }

    #[test]
    fn group_duplicate_rejected() {
        let store = store_with_lc();
        store.insert_group(&test_group("g1", "lc")).unwrap();

        let err = store.insert_group(&test_group("g1", "lc")).unwrap_err();
        assert!(matches!(err, StateError::AlreadyExists(_)));
    }

    #[test]
    fn group_instances_are_not_persisted() {
        let store = store_with_lc();
        let mut group = test_group("g1", "lc");
        group.instances = Some(vec![Instance {
            instance_id: "i-1".to_string(),
            availability_zone: "site".to_string(),
            health_status: "running".to_string(),
            lifecycle_state: "running".to_string(),
            auto_scaling_group_name: "g1".to_string(),
            launch_configuration_name: "lc".to_string(),
        }]);
        store.insert_group(&group).unwrap();

        let stored = store.get_group("g1").unwrap().unwrap();
        assert_eq!(stored.instances, None);
    }

    #[test]
    fn group_set_desired_capacity() {
        let store = store_with_lc();
        store.insert_group(&test_group("g1", "lc")).unwrap();

        assert!(store.set_desired_capacity("g1", 10).unwrap());
        assert_eq!(store.get_group("g1").unwrap().unwrap().desired_capacity, 10);
        assert!(!store.set_desired_capacity("nope", 3).unwrap());
    }

    #[test]
    fn group_delete() {
        let store = store_with_lc();
        store.insert_group(&test_group("g1", "lc")).unwrap();

        assert!(store.delete_group("g1").unwrap());
        assert!(!store.delete_group("g1").unwrap());
    }

    // ── Listing ────────────────────────────────────────────────────

    #[test]
    fn list_is_in_name_order() {
        let store = store_with_lc();
        for name in ["g3", "g1", "g2"] {
            store.insert_group(&test_group(name, "lc")).unwrap();
        }
        let page = store.list_groups(&ListQuery::default()).unwrap();
        assert_eq!(names(&page), vec!["g1", "g2", "g3"]);
        assert!(!page.more);
    }

    #[test]
    fn list_filters_by_name() {
        let store = store_with_lc();
        for i in 0..5 {
            store.insert_group(&test_group(&format!("g{i}"), "lc")).unwrap();
        }
        let query = ListQuery {
            names: Some(["g4", "g1", "nope"].iter().map(|s| s.to_string()).collect()),
            ..Default::default()
        };
        let page = store.list_groups(&query).unwrap();
        assert_eq!(names(&page), vec!["g1", "g4"]);
    }

    #[test]
    fn list_pages_with_start_after() {
        let store = store_with_lc();
        for i in 0..5 {
            store.insert_group(&test_group(&format!("g{i}"), "lc")).unwrap();
        }
        let first = store
            .list_groups(&ListQuery {
                limit: Some(2),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(names(&first), vec!["g0", "g1"]);
        assert!(first.more);

        let last = store
            .list_groups(&ListQuery {
                start_after: Some("g3".to_string()),
                limit: Some(2),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(names(&last), vec!["g4"]);
        assert!(!last.more);
    }

    #[test]
    fn list_exact_fit_has_no_more() {
        let store = store_with_lc();
        store.insert_group(&test_group("g0", "lc")).unwrap();
        store.insert_group(&test_group("g1", "lc")).unwrap();
        let page = store
            .list_groups(&ListQuery {
                limit: Some(2),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(page.items.len(), 2);
        assert!(!page.more);
    }

    // ── Persistence (on-disk) ──────────────────────────────────────

    #[test]
    fn persistence_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.redb");

        {
            let store = StateStore::open(&db_path).unwrap();
            store.insert_launch_configuration(&test_launch_config("lc")).unwrap();
            store.insert_group(&test_group("g1", "lc")).unwrap();
        }

        // Reopen the same database file.
        let store = StateStore::open(&db_path).unwrap();
        let group = store.get_group("g1").unwrap();
        assert!(group.is_some());
        assert_eq!(group.unwrap().launch_configuration_name, "lc");
    }

    // ── Edge cases ─────────────────────────────────────────────────

    #[test]
    fn empty_store_operations() {
        let store = StateStore::open_in_memory().unwrap();

        assert!(store.list_groups(&ListQuery::default()).unwrap().items.is_empty());
        assert!(
            store
                .list_launch_configurations(&ListQuery::default())
                .unwrap()
                .items
                .is_empty()
        );
        assert!(!store.delete_group("nope").unwrap());
        assert!(!store.delete_launch_configuration("nope").unwrap());
        assert!(store.get_group("nope").unwrap().is_none());
    }
}
