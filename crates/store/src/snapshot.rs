use crate::error::{Result, StoreError};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use town_graph::{FlowEdge, InMemoryFlowGraphStore};
use town_milestones::InMemoryMembershipStore;
use town_protocol::{TownId, TownMembership, SNAPSHOT_SCHEMA_VERSION};
use town_season::{InMemoryOverrideStore, SeasonOverride};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TownRecord {
    #[serde(default)]
    pub memberships: Vec<TownMembership>,
    #[serde(default)]
    pub overrides: Vec<SeasonOverride>,
    #[serde(default)]
    pub edges: Vec<FlowEdge>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TownSnapshot {
    pub schema_version: u32,
    #[serde(default)]
    pub towns: BTreeMap<TownId, TownRecord>,
}

impl Default for TownSnapshot {
    fn default() -> Self {
        Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            towns: BTreeMap::new(),
        }
    }
}

async fn read_snapshot(path: &Path) -> Result<TownSnapshot> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            log::info!("No snapshot at {:?}, starting empty", path);
            Ok(TownSnapshot::default())
        }
        Err(err) => Err(err.into()),
    }
}

fn check_filed_under<'a>(
    key: &TownId,
    kind: &'static str,
    mut row_towns: impl Iterator<Item = &'a TownId>,
) -> Result<()> {
    match row_towns.find(|row_town| *row_town != key) {
        Some(row_town) => Err(StoreError::MisfiledRow {
            key: key.to_string(),
            kind,
            row_town: row_town.to_string(),
        }),
        None => Ok(()),
    }
}

/// Advisory lock on `<snapshot>.lock`, released on drop.
struct SnapshotLock {
    file: std::fs::File,
}

impl Drop for SnapshotLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

fn lock_path_for(path: &Path) -> PathBuf {
    let mut lock = path.as_os_str().to_os_string();
    lock.push(".lock");
    PathBuf::from(lock)
}

async fn acquire_lock(path: &Path) -> Result<SnapshotLock> {
    let lock_path = lock_path_for(path);
    if let Some(parent) = lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let display = lock_path.display().to_string();

    tokio::task::spawn_blocking(move || -> Result<SnapshotLock> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)?;
        file.lock_exclusive().map_err(|err| StoreError::Lock {
            path: lock_path.display().to_string(),
            message: err.to_string(),
        })?;
        log::debug!("Acquired snapshot lock {:?}", lock_path);
        Ok(SnapshotLock { file })
    })
    .await
    .map_err(|err| StoreError::Task(format!("lock {display}: {err}")))?
}

/// The three in-memory stores, loaded from and saved to one JSON file.
pub struct SnapshotStore {
    path: PathBuf,
    graph: Arc<InMemoryFlowGraphStore>,
    memberships: Arc<InMemoryMembershipStore>,
    overrides: Arc<InMemoryOverrideStore>,
    _lock: Option<SnapshotLock>,
}

impl SnapshotStore {
    /// Load `path`, or start empty if it does not exist yet.
    ///
    /// No lock is taken; use [`SnapshotStore::open_exclusive`] when the
    /// store will be saved while other writers may be running.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let snapshot = read_snapshot(&path).await?;
        Self::from_snapshot(path, snapshot)
    }

    /// Lock the snapshot, then load it. The lock is held until the store
    /// is dropped, so increments made here and written with
    /// [`SnapshotStore::save`] are never lost to a concurrent writer.
    pub async fn open_exclusive(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let lock = acquire_lock(&path).await?;
        let snapshot = read_snapshot(&path).await?;
        let mut store = Self::from_snapshot(path, snapshot)?;
        store._lock = Some(lock);
        Ok(store)
    }

    pub fn from_snapshot(path: PathBuf, snapshot: TownSnapshot) -> Result<Self> {
        if snapshot.schema_version != SNAPSHOT_SCHEMA_VERSION {
            return Err(StoreError::UnsupportedSchema {
                found: snapshot.schema_version,
                expected: SNAPSHOT_SCHEMA_VERSION,
            });
        }

        let store = Self {
            path,
            graph: Arc::new(InMemoryFlowGraphStore::new()),
            memberships: Arc::new(InMemoryMembershipStore::new()),
            overrides: Arc::new(InMemoryOverrideStore::new()),
            _lock: None,
        };

        for (town, record) in snapshot.towns {
            check_filed_under(&town, "membership", record.memberships.iter().map(|m| &m.town_id))?;
            check_filed_under(&town, "override", record.overrides.iter().map(|o| &o.town_id))?;

            store.add_town(&town)?;
            store.graph.import_edges(town.clone(), &record.edges)?;
            for membership in record.memberships {
                store.memberships.upsert(membership)?;
            }
            for row in record.overrides {
                store.overrides.upsert(row)?;
            }
        }
        log::debug!("Loaded snapshot from {:?}", store.path);
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Make `town` known to all three stores.
    pub fn add_town(&self, town: &TownId) -> Result<()> {
        self.graph.register_town(town.clone())?;
        self.memberships.register_town(town.clone())?;
        self.overrides.register_town(town.clone())?;
        Ok(())
    }

    pub fn towns(&self) -> Result<BTreeSet<TownId>> {
        let mut towns: BTreeSet<TownId> = self.graph.export()?.into_keys().collect();
        towns.extend(self.memberships.export()?.into_keys());
        towns.extend(self.overrides.export()?.into_keys());
        Ok(towns)
    }

    pub fn graph(&self) -> Arc<InMemoryFlowGraphStore> {
        Arc::clone(&self.graph)
    }

    pub fn memberships(&self) -> Arc<InMemoryMembershipStore> {
        Arc::clone(&self.memberships)
    }

    pub fn overrides(&self) -> Arc<InMemoryOverrideStore> {
        Arc::clone(&self.overrides)
    }

    pub fn snapshot(&self) -> Result<TownSnapshot> {
        let mut towns: BTreeMap<TownId, TownRecord> = BTreeMap::new();
        for (town, edges) in self.graph.export()? {
            towns.entry(town).or_default().edges = edges;
        }
        for (town, memberships) in self.memberships.export()? {
            towns.entry(town).or_default().memberships = memberships;
        }
        for (town, overrides) in self.overrides.export()? {
            towns.entry(town).or_default().overrides = overrides;
        }
        Ok(TownSnapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            towns,
        })
    }

    /// Write the snapshot to a fresh temp file beside `path` and rename
    /// it over the target.
    pub async fn save(&self) -> Result<()> {
        let data = serde_json::to_vec_pretty(&self.snapshot()?)?;
        let parent = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => parent.to_path_buf(),
            None => PathBuf::from("."),
        };
        tokio::fs::create_dir_all(&parent).await?;

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut tmp = tempfile::NamedTempFile::new_in(&parent)?;
            tmp.write_all(&data)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&path).map_err(|err| StoreError::IoError(err.error))?;
            Ok(())
        })
        .await
        .map_err(|err| StoreError::Task(format!("save {}: {err}", self.path.display())))??;
        log::info!("Saved town snapshot to {:?}", self.path);
        Ok(())
    }
}
