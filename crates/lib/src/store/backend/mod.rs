//! Pluggable persistence layer for the store engine.
//!
//! The [`Backend`] trait is the narrow interface the engine is written
//! against: keyed get/put/delete, a transactional multi-put, one
//! secondary-index scan, auto-key insertion, and whole-store destruction.
//! One implementation ships: [`Memory`], an in-process map with optional
//! JSON file persistence.

mod memory;

pub use memory::Memory;

use async_trait::async_trait;
use serde_json::Value;

use crate::Result;

/// Declaration of a record family, applied by `create_family` if the family
/// does not already exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilySpec {
    pub name: String,
    /// Auto-increment integer keys, assigned by the store and injected into
    /// the record's `id` field.
    pub auto_key: bool,
    /// Field names to maintain derived secondary indexes over.
    pub indexes: Vec<String>,
}

impl FamilySpec {
    /// A plain keyed family with no auto keys and no indexes.
    pub fn keyed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            auto_key: false,
            indexes: Vec::new(),
        }
    }

    /// An auto-keyed family with the given secondary indexes.
    pub fn auto_keyed(name: impl Into<String>, indexes: &[&str]) -> Self {
        Self {
            name: name.into(),
            auto_key: true,
            indexes: indexes.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Storage backend for the carrier's record families.
///
/// All mutating calls are durable when they return: an implementation with a
/// persistence target must have flushed before reporting success. `put_many`
/// is atomic (either every entry lands or none do) and reads taken during
/// a `put_many` never observe a partial write.
#[async_trait]
pub trait Backend: Send + Sync + std::fmt::Debug {
    /// The schema version recorded in the persisted store.
    fn stored_version(&self) -> u32;

    /// Whether the named record family exists.
    fn has_family(&self, family: &str) -> bool;

    /// Create a record family if absent. Existing families are left alone,
    /// including their rows; this is the additive-schema-change path.
    async fn create_family(&self, spec: FamilySpec) -> Result<()>;

    /// Read a single value.
    async fn get(&self, family: &str, key: &str) -> Result<Option<Value>>;

    /// Read several keys under one consistent view. The result aligns with
    /// `keys`; a missing key yields `None` at its position.
    async fn get_many(&self, family: &str, keys: &[&str]) -> Result<Vec<Option<Value>>>;

    /// All rows of a family as `(key, value)` pairs, in key order.
    async fn get_all(&self, family: &str) -> Result<Vec<(String, Value)>>;

    /// Upsert a single value.
    async fn put(&self, family: &str, key: &str, value: Value) -> Result<()>;

    /// Atomically upsert several values in one transaction.
    async fn put_many(&self, family: &str, entries: Vec<(String, Value)>) -> Result<()>;

    /// Insert into an auto-keyed family. Returns the assigned key, which is
    /// also injected into the record's `id` field.
    async fn insert_auto(&self, family: &str, value: Value) -> Result<u64>;

    /// Delete a single key. Returns whether a record existed.
    async fn delete(&self, family: &str, key: &str) -> Result<bool>;

    /// Delete several keys in one transaction. Returns how many existed.
    async fn delete_many(&self, family: &str, keys: &[String]) -> Result<usize>;

    /// Scan a secondary index for rows whose indexed field equals `value`.
    /// Never a full-family scan-and-filter.
    async fn scan_index(&self, family: &str, index: &str, value: &Value)
    -> Result<Vec<(String, Value)>>;

    /// Remove every row of a family, keeping the family itself.
    async fn clear_family(&self, family: &str) -> Result<()>;

    /// Forced delete of the entire persisted store: all families, all rows,
    /// and any on-disk state. The backend returns to its freshly-created,
    /// family-less condition.
    async fn destroy(&self) -> Result<()>;
}
