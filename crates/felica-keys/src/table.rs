//! Per-system key maps and the caching key table.

use crate::error::KeyTableResult;
use crate::source::{KeyRow, KeySource};
use felica_core::{Area, KeyRecord, ServiceCode, SystemCode, constants::SYSTEM_KEY_NODE_ID};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Keys of one system, indexed by node id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyMap {
    records: BTreeMap<u16, KeyRecord>,
}

impl KeyMap {
    /// Build a map from records. A later record for the same node replaces
    /// an earlier one.
    pub fn from_records(records: impl IntoIterator<Item = KeyRecord>) -> Self {
        Self {
            records: records
                .into_iter()
                .map(|record| (record.node_id, record))
                .collect(),
        }
    }

    pub fn get(&self, node_id: u16) -> Option<&KeyRecord> {
        self.records.get(&node_id)
    }

    pub fn system_key(&self) -> Option<&KeyRecord> {
        self.get(SYSTEM_KEY_NODE_ID)
    }

    pub fn has_system_key(&self) -> bool {
        self.system_key().is_some()
    }

    pub fn service_key(&self, code: ServiceCode) -> Option<&KeyRecord> {
        self.get(code.as_u16())
    }

    /// Key of the area starting at `area.start`, if any.
    pub fn area_key(&self, area: &Area) -> Option<&KeyRecord> {
        self.get(area.start)
    }

    /// Keys of the areas in `areas` that contain `code`, in the given
    /// order. Areas without a key are skipped.
    pub fn area_keys_for_service(&self, code: ServiceCode, areas: &[Area]) -> Vec<&KeyRecord> {
        areas
            .iter()
            .filter(|area| area.contains_code(code.as_u16()))
            .filter_map(|area| self.area_key(area))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in ascending node order.
    pub fn iter(&self) -> impl Iterator<Item = &KeyRecord> {
        self.records.values()
    }
}

/// Key table that loads each system's keys once per session.
///
/// # Examples
///
/// ```
/// use felica_core::SystemCode;
/// use felica_keys::{KeyTable, MemoryKeySource};
/// use std::sync::Arc;
///
/// let source = MemoryKeySource::new("system_code,node,key,version\n0003,FFFF,0011,1\n");
/// let mut table = KeyTable::new(source);
///
/// let first = table.load(SystemCode::new(0x0003));
/// let second = table.load(SystemCode::new(0x0003));
///
/// assert!(first.has_system_key());
/// assert!(Arc::ptr_eq(&first, &second));
/// assert_eq!(table.source().reads(), 1);
/// ```
#[derive(Debug)]
pub struct KeyTable<S> {
    source: S,
    cache: HashMap<SystemCode, Arc<KeyMap>>,
}

impl<S: KeySource> KeyTable<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cache: HashMap::new(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Keys for `system_code`, read from the source on first use.
    ///
    /// A missing source or a malformed row yields an empty map and a
    /// warning. Failed loads are not cached, so the next call reads the
    /// source again.
    pub fn load(&mut self, system_code: SystemCode) -> Arc<KeyMap> {
        match self.try_load(system_code) {
            Ok(keys) => keys,
            Err(e) => {
                warn!(
                    "Failed to load keys for system {} from {}: {}",
                    system_code,
                    self.source.describe(),
                    e
                );
                Arc::new(KeyMap::default())
            }
        }
    }

    /// Like [`load`](Self::load), but reports the failure.
    pub fn try_load(&mut self, system_code: SystemCode) -> KeyTableResult<Arc<KeyMap>> {
        if let Some(keys) = self.cache.get(&system_code) {
            debug!("Key cache hit for system {}", system_code);
            return Ok(Arc::clone(keys));
        }

        let rows = self.source.read_rows()?;
        let keys = Arc::new(KeyMap::from_records(
            rows.into_iter()
                .filter(|row| row.system_code == system_code)
                .map(|KeyRow { record, .. }| record),
        ));

        info!(
            "Loaded {} keys for system {} from {}",
            keys.len(),
            system_code,
            self.source.describe()
        );
        self.cache.insert(system_code, Arc::clone(&keys));
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{CsvKeySource, MemoryKeySource};
    use felica_core::{KeyMaterial, KeyType};
    use std::io::Write;

    const KEYS: &str = "\
system_code,node,key,version
0003,FFFF,00112233445566778899AABBCCDDEEFF,1
0003,0000,0123456789ABCDEF,1
0003,0040,1111111111111111,1
0003,1008,FEDCBA9876543210,2
FE00,FFFF,FFFFFFFFFFFFFFFF,3
";

    const SYSTEM: SystemCode = SystemCode::new(0x0003);

    #[test]
    fn test_load_filters_by_system() {
        let mut table = KeyTable::new(MemoryKeySource::new(KEYS));

        let keys = table.load(SYSTEM);
        assert_eq!(keys.len(), 4);
        assert_eq!(keys.system_key().unwrap().version, 1);

        let other = table.load(SystemCode::new(0xFE00));
        assert_eq!(other.len(), 1);
        assert_eq!(other.system_key().unwrap().version, 3);

        assert!(table.load(SystemCode::new(0x8008)).is_empty());
    }

    #[test]
    fn test_cached_load_is_shared() {
        let mut table = KeyTable::new(MemoryKeySource::new(KEYS));

        let first = table.load(SYSTEM);
        let second = table.load(SYSTEM);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(table.source().reads(), 1);

        let other = table.load(SystemCode::new(0xFE00));
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(table.source().reads(), 2);
    }

    #[test]
    fn test_missing_file_yields_empty_map() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = KeyTable::new(CsvKeySource::new(dir.path().join("keys.csv")));

        assert!(table.load(SYSTEM).is_empty());
        assert!(table.try_load(SYSTEM).is_err());
    }

    #[test]
    fn test_malformed_row_rejects_whole_batch() {
        // One bad row empties the table for every system, not just its own.
        let text = format!("{KEYS}0003,2008,not-hex,1\n");
        let mut table = KeyTable::new(MemoryKeySource::new(text));

        assert!(table.load(SYSTEM).is_empty());
        assert!(table.load(SystemCode::new(0xFE00)).is_empty());
    }

    #[test]
    fn test_quoted_key_file_loads() {
        let text = concat!(
            "\"system_code\",\"node\",\"key\",\"version\"\n",
            "\"0003\",\"FFFF\",\"00112233\",\"1\"\n",
        );
        let mut table = KeyTable::new(MemoryKeySource::new(text));

        let keys = table.load(SYSTEM);
        assert!(keys.has_system_key());
        assert_eq!(keys.system_key().unwrap().key.len(), 4);
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let mut table = KeyTable::new(MemoryKeySource::new("system_code,node\n"));
        table.load(SYSTEM);
        table.load(SYSTEM);
        assert_eq!(table.source().reads(), 2);
    }

    #[test]
    fn test_duplicate_rows_have_deterministic_winner() {
        let text = format!("{KEYS}0003,1008,0000000000000000,9\n");
        let mut first = KeyTable::new(MemoryKeySource::new(text.clone()));
        let mut second = KeyTable::new(MemoryKeySource::new(text));

        let a = first.load(SYSTEM);
        let b = second.load(SYSTEM);
        assert_eq!(a.get(0x1008), b.get(0x1008));
        assert_eq!(first.load(SYSTEM).len(), 4);
    }

    #[test]
    fn test_csv_file_lookups() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(KEYS.as_bytes()).unwrap();

        let mut table = KeyTable::new(CsvKeySource::new(file.path()));
        let keys = table.load(SYSTEM);
        assert!(keys.has_system_key());
        assert!(keys.service_key(ServiceCode::new(0x1008)).is_some());
        assert!(keys.service_key(ServiceCode::new(0x100C)).is_none());
    }

    #[test]
    fn test_area_keys_for_service() {
        let keys = KeyMap::from_records([
            KeyRecord::new(0x0000, 1, KeyMaterial::new(vec![0; 8])),
            KeyRecord::new(0x0040, 1, KeyMaterial::new(vec![1; 8])),
        ]);
        let areas = [
            Area::new(0x0000, 0xFFFE),
            Area::new(0x0040, 0x07FF),
            Area::new(0x0400, 0x04FF),
            Area::new(0x2000, 0x20FF),
        ];

        let found: Vec<u16> = keys
            .area_keys_for_service(ServiceCode::new(0x0408), &areas)
            .iter()
            .map(|k| k.node_id)
            .collect();
        assert_eq!(found, vec![0x0000, 0x0040]);
        assert!(keys.iter().all(|k| k.key_type == KeyType::Area));
    }
}
