use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use polars::prelude::DataFrame;

use crate::services::profile::{self, TableProfile};
use crate::services::workbook::Workbook;

/// Session-scoped memoization, owned by the HTTP state. Workbooks are
/// keyed by their source string, profiles by the table's content
/// fingerprint. The profiling engine itself never sees this store.
pub struct WorkbookStore {
    workbooks: Cache<String, Arc<Workbook>>,
    profiles: Cache<u64, Arc<TableProfile>>,
}

impl WorkbookStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            workbooks: Cache::builder().time_to_live(ttl).build(),
            profiles: Cache::builder().time_to_live(ttl).build(),
        }
    }

    pub fn get(&self, source: &str) -> Option<Arc<Workbook>> {
        self.workbooks.get(source)
    }

    pub fn insert(&self, workbook: Workbook) -> Arc<Workbook> {
        let workbook = Arc::new(workbook);
        self.workbooks
            .insert(workbook.source().to_string(), workbook.clone());
        workbook
    }

    /// Memoized profile lookup keyed by the table's fingerprint.
    pub fn profile_for(&self, table: &DataFrame) -> Arc<TableProfile> {
        let key = profile::fingerprint(table);
        if let Some(hit) = self.profiles.get(&key) {
            return hit;
        }
        let computed = Arc::new(profile::profile(table));
        self.profiles.insert(key, computed.clone());
        computed
    }

    /// Explicit invalidation: drops the workbook and every profile derived
    /// from its sheets. The next request reloads from the source.
    pub fn invalidate(&self, source: &str) {
        if let Some(workbook) = self.workbooks.get(source) {
            for sheet in workbook.sheets() {
                self.profiles.invalidate(&profile::fingerprint(&sheet.table));
            }
        }
        self.workbooks.invalidate(source);
        tracing::info!("Invalidated cached workbook for {}", source);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::workbook::Sheet;
    use polars::prelude::*;

    fn store() -> WorkbookStore {
        WorkbookStore::new(Duration::from_secs(3600))
    }

    fn sample_workbook() -> Workbook {
        let table = DataFrame::new(vec![Series::new("a", vec![1.0, 2.0])]).unwrap();
        Workbook::new(
            "memory://test",
            vec![Sheet {
                name: "Projects".to_string(),
                table,
            }],
        )
    }

    #[test]
    fn profiles_are_memoized_by_fingerprint() {
        let store = store();
        let df = DataFrame::new(vec![Series::new("a", vec![1.0, 2.0, 3.0])]).unwrap();

        let first = store.profile_for(&df);
        let second = store.profile_for(&df);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn invalidation_forces_a_reload() {
        let store = store();
        store.insert(sample_workbook());
        assert!(store.get("memory://test").is_some());

        store.invalidate("memory://test");
        assert!(store.get("memory://test").is_none());
    }

    #[test]
    fn invalidation_drops_dependent_profiles() {
        let store = store();
        let workbook = store.insert(sample_workbook());
        let table = &workbook.sheets()[0].table;

        let before = store.profile_for(table);
        store.invalidate("memory://test");
        let after = store.profile_for(table);
        assert!(!Arc::ptr_eq(&before, &after));
    }
}
