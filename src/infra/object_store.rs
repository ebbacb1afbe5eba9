//! Versioned key-value object store persisted as a single JSON file.
//!
//! A database holds named object stores; each store keys its records by an
//! auto-incremented integer kept inline under the `id` field. Every operation
//! runs as its own transaction against a copy of the database and only commits
//! to memory once the copy has been written to disk.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::{AppError, AppResult};

pub type Record = Map<String, Value>;

pub const KEY_PATH: &str = "id";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreState {
    Closed,
    Opening,
    Ready,
    Failed(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct DatabaseFile {
    version: u32,
    #[serde(default)]
    stores: BTreeMap<String, StoreFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreFile {
    next_key: u64,
    #[serde(default)]
    records: BTreeMap<u64, Record>,
}

impl StoreFile {
    fn new() -> Self {
        Self {
            next_key: 1,
            records: BTreeMap::new(),
        }
    }
}

pub struct ObjectStore {
    database: String,
    store: String,
    version: u32,
    location: Option<PathBuf>,
    state: RwLock<StoreState>,
    db: Mutex<Option<DatabaseFile>>,
}

impl ObjectStore {
    /// File-backed store living at `<data_dir>/<database>.json`.
    pub fn new(data_dir: impl AsRef<Path>, database: &str, store: &str, version: u32) -> Self {
        let location = data_dir.as_ref().join(format!("{database}.json"));
        Self::build(database, store, version, Some(location))
    }

    /// Store whose contents only live as long as this value. Data survives
    /// `close` and a later `open`, like a remount within one process.
    pub fn in_memory(database: &str, store: &str, version: u32) -> Self {
        Self::build(database, store, version, None)
    }

    fn build(database: &str, store: &str, version: u32, location: Option<PathBuf>) -> Self {
        Self {
            database: database.to_string(),
            store: store.to_string(),
            version,
            location,
            state: RwLock::new(StoreState::Closed),
            db: Mutex::new(None),
        }
    }

    pub fn state(&self) -> StoreState {
        self.state.read().clone()
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.state.read(), StoreState::Ready)
    }

    pub async fn open(&self) -> AppResult<()> {
        {
            let mut state = self.state.write();
            match &*state {
                StoreState::Ready => return Ok(()),
                StoreState::Opening => {
                    return Err(AppError::StoreOpen(format!(
                        "database {} is already being opened",
                        self.database
                    )));
                }
                StoreState::Closed | StoreState::Failed(_) => {}
            }
            *state = StoreState::Opening;
        }

        let mut attempt = OpenAttempt {
            state: &self.state,
            database: &self.database,
            pending: true,
        };
        let result = self.open_database().await;
        attempt.pending = false;

        let mut state = self.state.write();
        match result {
            Ok(()) => {
                *state = StoreState::Ready;
                info!(
                    database = %self.database,
                    store = %self.store,
                    version = self.version,
                    "database opened"
                );
                Ok(())
            }
            Err(err) => {
                error!(database = %self.database, error = %err, "failed to open database");
                *state = StoreState::Failed(err.to_string());
                Err(err)
            }
        }
    }

    pub async fn close(&self) {
        *self.state.write() = StoreState::Closed;
        if self.location.is_some() {
            *self.db.lock().await = None;
        }
        info!(database = %self.database, "database closed");
    }

    async fn open_database(&self) -> AppResult<()> {
        if self.version == 0 {
            return Err(AppError::StoreOpen(
                "database version must be at least 1".to_string(),
            ));
        }

        let mut db = self.db.lock().await;
        let persisted = match &self.location {
            Some(path) => load_database(path).await?,
            None => db.clone(),
        };
        let mut current = persisted.unwrap_or_default();

        if current.version > self.version {
            return Err(AppError::StoreOpen(format!(
                "requested version {} is lower than existing version {}",
                self.version, current.version
            )));
        }

        if current.version < self.version {
            info!(
                database = %self.database,
                from = current.version,
                to = self.version,
                "upgrading database"
            );
            if !current.stores.contains_key(&self.store) {
                current.stores.insert(self.store.clone(), StoreFile::new());
                info!(store = %self.store, "created object store");
            }
            current.version = self.version;
            self.persist(&current).await.map_err(|err| {
                AppError::StoreOpen(format!("failed to write database: {err}"))
            })?;
        }

        *db = Some(current);
        Ok(())
    }

    fn ensure_ready(&self, operation: &str) -> AppResult<()> {
        if self.is_ready() {
            Ok(())
        } else {
            warn!(database = %self.database, operation, "database is not ready");
            Err(AppError::NotReady)
        }
    }

    fn missing_store(&self) -> AppError {
        AppError::Transaction(format!("object store {} not found", self.store))
    }

    async fn read<T, F>(&self, operation: &str, f: F) -> AppResult<T>
    where
        F: FnOnce(&StoreFile) -> T + Send,
    {
        self.ensure_ready(operation)?;
        let db = self.db.lock().await;
        let database = db.as_ref().ok_or(AppError::NotReady)?;
        let store = database
            .stores
            .get(&self.store)
            .ok_or_else(|| self.missing_store())?;
        Ok(f(store))
    }

    async fn write<T, F>(&self, operation: &str, f: F) -> AppResult<T>
    where
        F: FnOnce(&mut StoreFile) -> AppResult<T> + Send,
    {
        self.ensure_ready(operation)?;
        let mut db = self.db.lock().await;
        let database = db.as_mut().ok_or(AppError::NotReady)?;

        let mut next = database.clone();
        let store = next
            .stores
            .get_mut(&self.store)
            .ok_or_else(|| self.missing_store())?;
        let value = f(store)?;

        self.persist(&next)
            .await
            .map_err(|err| AppError::Transaction(format!("failed to write database: {err}")))?;
        *database = next;
        Ok(value)
    }

    async fn persist(&self, database: &DatabaseFile) -> io::Result<()> {
        let Some(path) = &self.location else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let data = serde_json::to_vec_pretty(database)?;
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, data).await?;
        fs::rename(&staging, path).await
    }

    /// Adds a record and returns its key. A record carrying its own integer
    /// `id` keeps it; otherwise the next generated key is assigned.
    pub async fn create(&self, mut record: Record) -> AppResult<u64> {
        let id = self
            .write("create", move |store| {
                let key = match record.get(KEY_PATH) {
                    Some(value) => value.as_u64().ok_or_else(|| {
                        AppError::Transaction(format!(
                            "key {value} is not a non-negative integer"
                        ))
                    })?,
                    None => store.next_key,
                };
                if store.records.contains_key(&key) {
                    return Err(AppError::Transaction(format!("key {key} already exists")));
                }
                let following = key.checked_add(1).ok_or_else(|| {
                    AppError::Transaction("key generator exhausted".to_string())
                })?;
                record.insert(KEY_PATH.to_string(), Value::from(key));
                store.next_key = store.next_key.max(following);
                store.records.insert(key, record);
                Ok(key)
            })
            .await?;
        debug!(store = %self.store, id, "record created");
        Ok(id)
    }

    /// All records in ascending key order.
    pub async fn read_all(&self) -> AppResult<Vec<Record>> {
        self.read("read_all", |store| store.records.values().cloned().collect())
            .await
    }

    pub async fn read_by_id(&self, id: u64) -> AppResult<Option<Record>> {
        self.read("read_by_id", |store| store.records.get(&id).cloned())
            .await
    }

    /// Shallow-merges `partial` over the stored record and returns the result.
    /// The key field itself is never overwritten.
    pub async fn update(&self, id: u64, partial: Record) -> AppResult<Record> {
        let merged = self
            .write("update", move |store| {
                let existing = store.records.get_mut(&id).ok_or(AppError::NotFound(id))?;
                for (field, value) in partial {
                    if field != KEY_PATH {
                        existing.insert(field, value);
                    }
                }
                Ok(existing.clone())
            })
            .await?;
        debug!(store = %self.store, id, "record updated");
        Ok(merged)
    }

    /// Removes a record; a missing key is not an error.
    pub async fn delete(&self, id: u64) -> AppResult<()> {
        self.write("delete", move |store| {
            store.records.remove(&id);
            Ok(())
        })
        .await?;
        debug!(store = %self.store, id, "record deleted");
        Ok(())
    }
}

/// Resets the state to `Closed` if an `open` future is dropped before it
/// settles, so a cancelled open can be retried.
struct OpenAttempt<'a> {
    state: &'a RwLock<StoreState>,
    database: &'a str,
    pending: bool,
}

impl Drop for OpenAttempt<'_> {
    fn drop(&mut self) {
        if self.pending {
            *self.state.write() = StoreState::Closed;
            warn!(database = %self.database, "database open was cancelled");
        }
    }
}

async fn load_database(path: &Path) -> AppResult<Option<DatabaseFile>> {
    match fs::read_to_string(path).await {
        Ok(contents) => serde_json::from_str::<DatabaseFile>(&contents)
            .map(Some)
            .map_err(|err| AppError::StoreOpen(format!("invalid database file: {err}"))),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(AppError::StoreOpen(format!(
            "failed to read {}: {err}",
            path.display()
        ))),
    }
}
