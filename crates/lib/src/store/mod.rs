//! Local store engine: durable, versioned persistence for the four record
//! families (content, registrations, settings, session).
//!
//! The engine owns the only copy of record state. It opens idempotently,
//! creating missing families on the way in, and recovers deterministically
//! from the three corruption classes: a stored schema version ahead of this
//! build, a required family missing after creation, and an open call that
//! fails outright. Recovery is forced deletion of the persisted store, a
//! bounded settle delay, and recreation from scratch; only if recreation
//! itself fails does the fatal `Unavailable` error escape to the caller.
//!
//! The schema version is intentionally held constant across releases that
//! only add record families. Additive change happens by
//! check-and-create-if-absent inside `open`; version bumps have caused
//! repeated data loss in practice, so the version field acts as the
//! corruption trigger, not the evolution mechanism.

pub mod backend;
pub mod errors;

pub use backend::{Backend, FamilySpec, Memory};
pub use errors::StoreError;

use std::{path::PathBuf, time::Duration};

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::{info, warn};

use crate::{
    Result,
    model::{ContentSnapshot, PendingRegistration, Session, SyncInfo},
};

/// Constant across additive schema changes; see the module docs.
pub const SCHEMA_VERSION: u32 = 1;

/// The four record families.
pub const FAMILY_CONTENT: &str = "content";
pub const FAMILY_REGISTRATIONS: &str = "registrations";
pub const FAMILY_SETTINGS: &str = "settings";
pub const FAMILY_SESSION: &str = "session";

const REQUIRED_FAMILIES: [&str; 4] = [
    FAMILY_CONTENT,
    FAMILY_REGISTRATIONS,
    FAMILY_SETTINGS,
    FAMILY_SESSION,
];

/// Fixed keys inside the content family. The five are always written
/// together in one transaction.
const KEY_DEPARTMENTS: &str = "departments";
const KEY_COURSES: &str = "courses";
const KEY_TOPICS: &str = "topics";
const KEY_PREMIUM_USERS: &str = "premium_users";
const KEY_SYNC_INFO: &str = "sync_info";

/// The single session slot.
const KEY_SESSION: &str = "current";

/// Secondary indexes on the registrations family.
pub const INDEX_SYNCED: &str = "synced";
pub const INDEX_CODE: &str = "code";

/// Settings keys used by the retention sweep.
pub const SETTING_AUTO_DELETE: &str = "auto_delete";
pub const SETTING_DELETE_AFTER_DAYS: &str = "delete_after_days";

const DEFAULT_DELETE_AFTER_DAYS: u64 = 7;

/// How long to wait after a forced delete before recreating. The underlying
/// primitive does not reliably report deletion completion across all failure
/// modes, so a bounded delay stands in for a completion event.
const RECOVERY_SETTLE: Duration = Duration::from_millis(300);

fn required_family_specs() -> Vec<FamilySpec> {
    vec![
        FamilySpec::keyed(FAMILY_CONTENT),
        FamilySpec::auto_keyed(FAMILY_REGISTRATIONS, &[INDEX_SYNCED, INDEX_CODE]),
        FamilySpec::keyed(FAMILY_SETTINGS),
        FamilySpec::keyed(FAMILY_SESSION),
    ]
}

/// Durable store for the carrier's record families.
#[derive(Debug)]
pub struct StoreEngine {
    backend: Box<dyn Backend>,
}

impl StoreEngine {
    /// Open the store, creating families as needed and recovering from
    /// corruption. With `None` the store is purely in-memory.
    pub async fn open(path: Option<PathBuf>) -> Result<Self> {
        let backend: Box<dyn Backend> = match &path {
            Some(p) => match Memory::load_from_file(p, SCHEMA_VERSION).await {
                Ok(b) => Box::new(b),
                Err(e) => {
                    warn!(error = %e, path = %p.display(), "store open failed, recreating");
                    return Self::recover_file(p.clone()).await;
                }
            },
            None => Box::new(Memory::new(SCHEMA_VERSION)),
        };
        Self::open_with_backend(backend).await
    }

    /// Open over an already-constructed backend. Used by `open` and by tests
    /// substituting their own backend.
    pub async fn open_with_backend(backend: Box<dyn Backend>) -> Result<Self> {
        match Self::prepare(&*backend).await {
            Ok(()) => Ok(Self { backend }),
            Err(e) => {
                warn!(error = %e, "store schema invalid, recreating");
                Self::recover_backend(backend).await
            }
        }
    }

    /// Version check plus create-if-absent for every required family, then a
    /// final existence check. Any error here is the corruption case.
    async fn prepare(backend: &dyn Backend) -> Result<()> {
        let stored = backend.stored_version();
        if stored > SCHEMA_VERSION {
            return Err(StoreError::VersionAhead {
                stored,
                expected: SCHEMA_VERSION,
            }
            .into());
        }
        for spec in required_family_specs() {
            backend.create_family(spec).await?;
        }
        for name in REQUIRED_FAMILIES {
            if !backend.has_family(name) {
                return Err(StoreError::MissingFamily {
                    family: name.to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Recovery over a live backend: forced delete, settle, recreate.
    async fn recover_backend(backend: Box<dyn Backend>) -> Result<Self> {
        backend
            .destroy()
            .await
            .map_err(|e| StoreError::Unavailable {
                reason: format!("forced delete failed: {e}"),
            })?;
        tokio::time::sleep(RECOVERY_SETTLE).await;
        Self::prepare(&*backend)
            .await
            .map_err(|e| StoreError::Unavailable {
                reason: format!("recreation failed: {e}"),
            })?;
        info!("store recreated after corruption");
        Ok(Self { backend })
    }

    /// Recovery when the store file could not even be loaded: delete the
    /// file, settle, then open fresh.
    async fn recover_file(path: PathBuf) -> Result<Self> {
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(StoreError::Unavailable {
                    reason: format!("forced delete failed: {e}"),
                }
                .into());
            }
        }
        tokio::time::sleep(RECOVERY_SETTLE).await;
        let backend = Memory::load_from_file(&path, SCHEMA_VERSION)
            .await
            .map_err(|e| StoreError::Unavailable {
                reason: format!("recreation failed: {e}"),
            })?;
        Self::prepare(&backend)
            .await
            .map_err(|e| StoreError::Unavailable {
                reason: format!("recreation failed: {e}"),
            })?;
        info!("store recreated after corruption");
        Ok(Self {
            backend: Box::new(backend),
        })
    }

    fn decode<T: DeserializeOwned>(family: &str, value: Value) -> Result<T> {
        serde_json::from_value(value).map_err(|e| {
            StoreError::DecodeFailed {
                family: family.to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    fn encode<T: Serialize>(family: &str, value: &T) -> Result<Value> {
        serde_json::to_value(value).map_err(|e| {
            StoreError::DecodeFailed {
                family: family.to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    // ===== Content =====

    /// Replace the whole content snapshot in one atomic transaction. A
    /// reader must never observe a new `sync_info` paired with stale topics.
    pub async fn replace_content(&self, snapshot: &ContentSnapshot) -> Result<()> {
        let entries = vec![
            (
                KEY_DEPARTMENTS.to_string(),
                Self::encode(FAMILY_CONTENT, &snapshot.departments)?,
            ),
            (
                KEY_COURSES.to_string(),
                Self::encode(FAMILY_CONTENT, &snapshot.courses)?,
            ),
            (
                KEY_TOPICS.to_string(),
                Self::encode(FAMILY_CONTENT, &snapshot.topics)?,
            ),
            (
                KEY_PREMIUM_USERS.to_string(),
                Self::encode(FAMILY_CONTENT, &snapshot.premium_users)?,
            ),
            (
                KEY_SYNC_INFO.to_string(),
                Self::encode(FAMILY_CONTENT, &snapshot.sync_info)?,
            ),
        ];
        self.backend.put_many(FAMILY_CONTENT, entries).await
    }

    /// Read the full snapshot under one consistent view.
    ///
    /// Snapshot validity is gated by `sync_info`: if it is absent, every
    /// collection reads as empty regardless of the stored keys.
    pub async fn get_all_content(&self) -> Result<ContentSnapshot> {
        let values = self
            .backend
            .get_many(
                FAMILY_CONTENT,
                &[
                    KEY_DEPARTMENTS,
                    KEY_COURSES,
                    KEY_TOPICS,
                    KEY_PREMIUM_USERS,
                    KEY_SYNC_INFO,
                ],
            )
            .await?;
        let mut values = values.into_iter();
        let departments = values.next().flatten();
        let courses = values.next().flatten();
        let topics = values.next().flatten();
        let premium_users = values.next().flatten();
        let sync_info = values.next().flatten().filter(|v| !v.is_null());

        let Some(sync_info) = sync_info else {
            return Ok(ContentSnapshot::default());
        };
        let sync_info: SyncInfo = Self::decode(FAMILY_CONTENT, sync_info)?;

        fn collection<T: DeserializeOwned>(value: Option<Value>) -> Result<Vec<T>> {
            match value {
                Some(v) if !v.is_null() => StoreEngine::decode(FAMILY_CONTENT, v),
                _ => Ok(Vec::new()),
            }
        }

        Ok(ContentSnapshot {
            departments: collection(departments)?,
            courses: collection(courses)?,
            topics: collection(topics)?,
            premium_users: collection(premium_users)?,
            sync_info: Some(sync_info),
        })
    }

    /// Drop all cached content, keeping the family.
    pub async fn clear_content(&self) -> Result<()> {
        self.backend.clear_family(FAMILY_CONTENT).await
    }

    // ===== Registrations =====

    /// Insert a registration; the store assigns and returns the id.
    pub async fn insert_registration(&self, registration: &PendingRegistration) -> Result<u64> {
        let value = Self::encode(FAMILY_REGISTRATIONS, registration)?;
        self.backend.insert_auto(FAMILY_REGISTRATIONS, value).await
    }

    /// All registrations still awaiting upload, via the `synced` index.
    pub async fn unsynced_registrations(&self) -> Result<Vec<PendingRegistration>> {
        let rows = self
            .backend
            .scan_index(FAMILY_REGISTRATIONS, INDEX_SYNCED, &Value::Bool(false))
            .await?;
        Self::decode_registrations(rows)
    }

    /// All registrations already acknowledged by the backend.
    pub async fn synced_registrations(&self) -> Result<Vec<PendingRegistration>> {
        let rows = self
            .backend
            .scan_index(FAMILY_REGISTRATIONS, INDEX_SYNCED, &Value::Bool(true))
            .await?;
        Self::decode_registrations(rows)
    }

    /// Every registration, synced or not.
    pub async fn all_registrations(&self) -> Result<Vec<PendingRegistration>> {
        let rows = self.backend.get_all(FAMILY_REGISTRATIONS).await?;
        Self::decode_registrations(rows)
    }

    fn decode_registrations(rows: Vec<(String, Value)>) -> Result<Vec<PendingRegistration>> {
        let mut registrations = rows
            .into_iter()
            .map(|(_, v)| Self::decode(FAMILY_REGISTRATIONS, v))
            .collect::<Result<Vec<PendingRegistration>>>()?;
        registrations.sort_by_key(|r| r.id);
        Ok(registrations)
    }

    /// Flip `synced` to true for exactly the given ids, in one transaction.
    /// Ids that no longer exist are skipped. Never reverses a true flag.
    pub async fn mark_registrations_synced(&self, ids: &[u64], synced_at: u64) -> Result<()> {
        let mut entries = Vec::with_capacity(ids.len());
        for id in ids {
            let key = id.to_string();
            let Some(value) = self.backend.get(FAMILY_REGISTRATIONS, &key).await? else {
                continue;
            };
            let mut registration: PendingRegistration =
                Self::decode(FAMILY_REGISTRATIONS, value)?;
            registration.synced = true;
            registration.synced_at = Some(synced_at);
            entries.push((key, Self::encode(FAMILY_REGISTRATIONS, &registration)?));
        }
        if entries.is_empty() {
            return Ok(());
        }
        self.backend.put_many(FAMILY_REGISTRATIONS, entries).await
    }

    /// Delete the given registrations. Returns how many existed.
    pub async fn delete_registrations(&self, ids: &[u64]) -> Result<usize> {
        let keys: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        self.backend.delete_many(FAMILY_REGISTRATIONS, &keys).await
    }

    // ===== Settings =====

    /// Upsert an arbitrary setting.
    pub async fn set_setting(&self, key: &str, value: Value) -> Result<()> {
        self.backend.put(FAMILY_SETTINGS, key, value).await
    }

    /// Read an arbitrary setting.
    pub async fn get_setting(&self, key: &str) -> Result<Option<Value>> {
        self.backend.get(FAMILY_SETTINGS, key).await
    }

    /// Whether the auto-delete retention policy is enabled. Defaults to off.
    pub async fn auto_delete_enabled(&self) -> Result<bool> {
        Ok(self
            .get_setting(SETTING_AUTO_DELETE)
            .await?
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }

    /// Retention window for synced registrations, in days.
    pub async fn delete_after_days(&self) -> Result<u64> {
        Ok(self
            .get_setting(SETTING_DELETE_AFTER_DAYS)
            .await?
            .and_then(|v| v.as_u64())
            .unwrap_or(DEFAULT_DELETE_AFTER_DAYS))
    }

    // ===== Session =====

    /// Persist the single session record atomically.
    pub async fn put_session(&self, session: &Session) -> Result<()> {
        let value = Self::encode(FAMILY_SESSION, session)?;
        self.backend.put(FAMILY_SESSION, KEY_SESSION, value).await
    }

    /// Read the stored session record without applying expiry; the session
    /// manager owns the expiry contract.
    pub async fn get_session_record(&self) -> Result<Option<Session>> {
        match self.backend.get(FAMILY_SESSION, KEY_SESSION).await? {
            Some(value) => Ok(Some(Self::decode(FAMILY_SESSION, value)?)),
            None => Ok(None),
        }
    }

    /// Remove the stored session record, if any.
    pub async fn clear_session(&self) -> Result<()> {
        self.backend.delete(FAMILY_SESSION, KEY_SESSION).await?;
        Ok(())
    }

    // ===== Cleanup =====

    /// Forced delete of the entire persisted store.
    pub async fn destroy(&self) -> Result<()> {
        self.backend.destroy().await
    }
}
