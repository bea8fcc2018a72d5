//! In-memory backend with optional JSON file persistence.
//!
//! Record families live in maps guarded by an `RwLock`; when a file path is
//! configured, every write transaction rewrites the store file through a
//! temp-file-and-rename so a crash mid-write can never leave a half-written
//! store behind. Secondary indexes are derived maps, rebuilt on load and
//! maintained incrementally on every mutation.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    path::{Path, PathBuf},
    sync::RwLock,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Backend, FamilySpec};
use crate::{Result, store::errors::StoreError};

/// One record family: rows keyed by string, plus derived index maps
/// `field -> encoded value -> keys`.
#[derive(Debug, Default)]
struct Family {
    auto_key: bool,
    indexes: Vec<String>,
    next_key: u64,
    rows: BTreeMap<String, Value>,
    index_data: HashMap<String, HashMap<String, BTreeSet<String>>>,
}

impl Family {
    fn from_spec(spec: &FamilySpec) -> Self {
        Self {
            auto_key: spec.auto_key,
            indexes: spec.indexes.clone(),
            next_key: 1,
            rows: BTreeMap::new(),
            index_data: spec
                .indexes
                .iter()
                .map(|i| (i.clone(), HashMap::new()))
                .collect(),
        }
    }

    /// Encoded index token for a row's field value. Missing fields index
    /// under `null`.
    fn index_token(row: &Value, field: &str) -> String {
        row.get(field).unwrap_or(&Value::Null).to_string()
    }

    fn index_insert(&mut self, key: &str, row: &Value) {
        for field in &self.indexes {
            let token = Self::index_token(row, field);
            self.index_data
                .entry(field.clone())
                .or_default()
                .entry(token)
                .or_default()
                .insert(key.to_string());
        }
    }

    fn index_remove(&mut self, key: &str, row: &Value) {
        for field in &self.indexes {
            let token = Self::index_token(row, field);
            if let Some(buckets) = self.index_data.get_mut(field)
                && let Some(keys) = buckets.get_mut(&token)
            {
                keys.remove(key);
                if keys.is_empty() {
                    buckets.remove(&token);
                }
            }
        }
    }

    fn upsert(&mut self, key: String, row: Value) {
        if let Some(old) = self.rows.get(&key) {
            let old = old.clone();
            self.index_remove(&key, &old);
        }
        self.index_insert(&key, &row);
        self.rows.insert(key, row);
    }

    fn remove(&mut self, key: &str) -> bool {
        match self.rows.remove(key) {
            Some(old) => {
                self.index_remove(key, &old);
                true
            }
            None => false,
        }
    }

    fn clear(&mut self) {
        self.rows.clear();
        for buckets in self.index_data.values_mut() {
            buckets.clear();
        }
    }
}

#[derive(Debug)]
struct Inner {
    version: u32,
    families: BTreeMap<String, Family>,
}

/// Serializable form of the store. Index maps are derived state and are
/// rebuilt on load rather than persisted.
#[derive(Serialize, Deserialize)]
struct PersistedStore {
    version: u32,
    families: BTreeMap<String, PersistedFamily>,
}

#[derive(Serialize, Deserialize)]
struct PersistedFamily {
    auto_key: bool,
    indexes: Vec<String>,
    next_key: u64,
    rows: BTreeMap<String, Value>,
}

/// In-memory storage backend with optional JSON file persistence.
#[derive(Debug)]
pub struct Memory {
    inner: RwLock<Inner>,
    path: Option<PathBuf>,
    created_version: u32,
}

impl Memory {
    /// Creates a new, empty backend with no persistence target.
    pub fn new(version: u32) -> Self {
        Self {
            inner: RwLock::new(Inner {
                version,
                families: BTreeMap::new(),
            }),
            path: None,
            created_version: version,
        }
    }

    /// Loads a backend from a store file, or creates an empty one if the
    /// file does not exist. A file that cannot be read or parsed is the
    /// failed-open corruption class and surfaces as `OpenFailed`.
    pub async fn load_from_file(path: impl AsRef<Path>, version: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let json = match tokio::fs::read_to_string(&path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self {
                    inner: RwLock::new(Inner {
                        version,
                        families: BTreeMap::new(),
                    }),
                    path: Some(path),
                    created_version: version,
                });
            }
            Err(e) => {
                return Err(StoreError::OpenFailed {
                    reason: format!("cannot read {}: {e}", path.display()),
                }
                .into());
            }
        };

        let persisted: PersistedStore =
            serde_json::from_str(&json).map_err(|e| StoreError::OpenFailed {
                reason: format!("cannot parse {}: {e}", path.display()),
            })?;

        let families = persisted
            .families
            .into_iter()
            .map(|(name, pf)| {
                let mut family = Family {
                    auto_key: pf.auto_key,
                    indexes: pf.indexes.clone(),
                    next_key: pf.next_key,
                    rows: BTreeMap::new(),
                    index_data: pf
                        .indexes
                        .iter()
                        .map(|i| (i.clone(), HashMap::new()))
                        .collect(),
                };
                for (key, row) in pf.rows {
                    family.index_insert(&key, &row);
                    family.rows.insert(key, row);
                }
                (name, family)
            })
            .collect();

        Ok(Self {
            inner: RwLock::new(Inner {
                version: persisted.version,
                families,
            }),
            path: Some(path),
            created_version: version,
        })
    }

    /// The configured persistence target, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Serialize the store under the lock; the file write happens after the
    /// lock is released.
    fn snapshot(&self, inner: &Inner) -> Result<Option<String>> {
        if self.path.is_none() {
            return Ok(None);
        }
        let persisted = PersistedStore {
            version: inner.version,
            families: inner
                .families
                .iter()
                .map(|(name, f)| {
                    (
                        name.clone(),
                        PersistedFamily {
                            auto_key: f.auto_key,
                            indexes: f.indexes.clone(),
                            next_key: f.next_key,
                            rows: f.rows.clone(),
                        },
                    )
                })
                .collect(),
        };
        let json = serde_json::to_string_pretty(&persisted).map_err(|e| {
            StoreError::DecodeFailed {
                family: "<store>".to_string(),
                reason: format!("failed to serialize store: {e}"),
            }
        })?;
        Ok(Some(json))
    }

    /// Write the serialized store to disk via temp file and rename.
    async fn flush(&self, json: Option<String>) -> Result<()> {
        let (Some(json), Some(path)) = (json, &self.path) else {
            return Ok(());
        };
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| StoreError::FileIo { source: e })?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| StoreError::FileIo { source: e })?;
        Ok(())
    }

    fn family_err(family: &str) -> crate::Error {
        StoreError::UnknownFamily {
            family: family.to_string(),
        }
        .into()
    }
}

#[async_trait]
impl Backend for Memory {
    fn stored_version(&self) -> u32 {
        self.inner.read().unwrap().version
    }

    fn has_family(&self, family: &str) -> bool {
        self.inner.read().unwrap().families.contains_key(family)
    }

    async fn create_family(&self, spec: FamilySpec) -> Result<()> {
        let json = {
            let mut inner = self.inner.write().unwrap();
            if inner.families.contains_key(&spec.name) {
                return Ok(());
            }
            inner
                .families
                .insert(spec.name.clone(), Family::from_spec(&spec));
            self.snapshot(&inner)?
        };
        self.flush(json).await
    }

    async fn get(&self, family: &str, key: &str) -> Result<Option<Value>> {
        let inner = self.inner.read().unwrap();
        let f = inner
            .families
            .get(family)
            .ok_or_else(|| Self::family_err(family))?;
        Ok(f.rows.get(key).cloned())
    }

    async fn get_many(&self, family: &str, keys: &[&str]) -> Result<Vec<Option<Value>>> {
        let inner = self.inner.read().unwrap();
        let f = inner
            .families
            .get(family)
            .ok_or_else(|| Self::family_err(family))?;
        Ok(keys.iter().map(|k| f.rows.get(*k).cloned()).collect())
    }

    async fn get_all(&self, family: &str) -> Result<Vec<(String, Value)>> {
        let inner = self.inner.read().unwrap();
        let f = inner
            .families
            .get(family)
            .ok_or_else(|| Self::family_err(family))?;
        Ok(f.rows
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn put(&self, family: &str, key: &str, value: Value) -> Result<()> {
        self.put_many(family, vec![(key.to_string(), value)]).await
    }

    async fn put_many(&self, family: &str, entries: Vec<(String, Value)>) -> Result<()> {
        let json = {
            let mut inner = self.inner.write().unwrap();
            let f = inner
                .families
                .get_mut(family)
                .ok_or_else(|| Self::family_err(family))?;
            for (key, value) in entries {
                f.upsert(key, value);
            }
            self.snapshot(&inner)?
        };
        self.flush(json).await
    }

    async fn insert_auto(&self, family: &str, mut value: Value) -> Result<u64> {
        let (key, json) = {
            let mut inner = self.inner.write().unwrap();
            let f = inner
                .families
                .get_mut(family)
                .ok_or_else(|| Self::family_err(family))?;
            if !f.auto_key {
                return Err(StoreError::DecodeFailed {
                    family: family.to_string(),
                    reason: "family does not assign keys".to_string(),
                }
                .into());
            }
            let key = f.next_key;
            f.next_key += 1;
            if let Some(obj) = value.as_object_mut() {
                obj.insert("id".to_string(), Value::from(key));
            }
            f.upsert(key.to_string(), value);
            (key, self.snapshot(&inner)?)
        };
        self.flush(json).await?;
        Ok(key)
    }

    async fn delete(&self, family: &str, key: &str) -> Result<bool> {
        Ok(self.delete_many(family, &[key.to_string()]).await? > 0)
    }

    async fn delete_many(&self, family: &str, keys: &[String]) -> Result<usize> {
        let (removed, json) = {
            let mut inner = self.inner.write().unwrap();
            let f = inner
                .families
                .get_mut(family)
                .ok_or_else(|| Self::family_err(family))?;
            let removed = keys.iter().filter(|k| f.remove(k)).count();
            (removed, self.snapshot(&inner)?)
        };
        self.flush(json).await?;
        Ok(removed)
    }

    async fn scan_index(
        &self,
        family: &str,
        index: &str,
        value: &Value,
    ) -> Result<Vec<(String, Value)>> {
        let inner = self.inner.read().unwrap();
        let f = inner
            .families
            .get(family)
            .ok_or_else(|| Self::family_err(family))?;
        let buckets = f
            .index_data
            .get(index)
            .ok_or_else(|| crate::Error::from(StoreError::UnknownIndex {
                family: family.to_string(),
                index: index.to_string(),
            }))?;
        let Some(keys) = buckets.get(&value.to_string()) else {
            return Ok(Vec::new());
        };
        Ok(keys
            .iter()
            .filter_map(|k| f.rows.get(k).map(|v| (k.clone(), v.clone())))
            .collect())
    }

    async fn clear_family(&self, family: &str) -> Result<()> {
        let json = {
            let mut inner = self.inner.write().unwrap();
            let f = inner
                .families
                .get_mut(family)
                .ok_or_else(|| Self::family_err(family))?;
            f.clear();
            self.snapshot(&inner)?
        };
        self.flush(json).await
    }

    async fn destroy(&self) -> Result<()> {
        {
            let mut inner = self.inner.write().unwrap();
            inner.version = self.created_version;
            inner.families.clear();
        }
        if let Some(path) = &self.path {
            match tokio::fs::remove_file(path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(StoreError::DeleteBlocked {
                        reason: format!("cannot remove {}: {e}", path.display()),
                    }
                    .into());
                }
            }
        }
        Ok(())
    }
}
