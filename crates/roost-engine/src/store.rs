//! People/tasks/assignment persistence
//!
//! The engine only needs row-level operations: read everything, upsert a person or
//! an assignment, append the new week, and archive the old one. [`MemoryStore`]
//! backs tests; [`JsonFileStore`] keeps a single JSON document on disk.

use async_trait::async_trait;
use roost_core::{Assignment, Person, Result, RoostError, Task};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// Everything the store holds
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub people: Vec<Person>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    /// Assignments of the current cycle
    #[serde(default)]
    pub upcoming: Vec<Assignment>,
    /// Assignments of previous cycles
    #[serde(default)]
    pub archive: Vec<Assignment>,
}

impl Snapshot {
    pub fn person(&self, name: &str) -> Option<&Person> {
        self.people.iter().find(|p| p.name == name)
    }

    pub fn task(&self, name: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.name == name)
    }

    pub fn with_person(mut self, person: Person) -> Self {
        self.people.push(person);
        self
    }

    pub fn with_task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn with_upcoming(mut self, assignment: Assignment) -> Self {
        self.upcoming.push(assignment);
        self
    }

    fn upsert_person(&mut self, person: &Person) {
        match self.people.iter_mut().find(|p| p.name == person.name) {
            Some(existing) => *existing = person.clone(),
            None => self.people.push(person.clone()),
        }
    }

    /// Update the upcoming row with the same id, or append one
    fn upsert_assignment(&mut self, assignment: &Assignment) {
        let id = assignment.id();
        match self.upcoming.iter_mut().find(|a| a.id() == id) {
            Some(existing) => *existing = assignment.clone(),
            None => self.upcoming.push(assignment.clone()),
        }
    }

    /// Move every upcoming row to the archive, keeping unfinished ones upcoming
    fn archive_upcoming(&mut self, keep_unfinished: bool) -> usize {
        let rows = std::mem::take(&mut self.upcoming);
        let moved = rows.len();
        if keep_unfinished {
            self.upcoming = rows
                .iter()
                .filter(|a| !a.status.is_finished())
                .cloned()
                .collect();
        }
        self.archive.extend(rows);
        moved
    }
}

/// Backing store for people, tasks and assignments
#[async_trait]
pub trait Store: Send + Sync {
    async fn load(&self) -> Result<Snapshot>;

    async fn save_person(&self, person: &Person) -> Result<()>;

    /// Upsert keyed by assignment id
    async fn save_assignment(&self, assignment: &Assignment) -> Result<()>;

    async fn append_upcoming(&self, assignments: &[Assignment]) -> Result<()>;

    /// Archive the current cycle; returns how many rows were moved
    async fn archive_upcoming(&self, keep_unfinished: bool) -> Result<usize>;
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshot: RwLock<Snapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot: RwLock::new(snapshot),
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn load(&self) -> Result<Snapshot> {
        Ok(self.snapshot.read().await.clone())
    }

    async fn save_person(&self, person: &Person) -> Result<()> {
        self.snapshot.write().await.upsert_person(person);
        Ok(())
    }

    async fn save_assignment(&self, assignment: &Assignment) -> Result<()> {
        self.snapshot.write().await.upsert_assignment(assignment);
        Ok(())
    }

    async fn append_upcoming(&self, assignments: &[Assignment]) -> Result<()> {
        self.snapshot
            .write()
            .await
            .upcoming
            .extend_from_slice(assignments);
        Ok(())
    }

    async fn archive_upcoming(&self, keep_unfinished: bool) -> Result<usize> {
        Ok(self.snapshot.write().await.archive_upcoming(keep_unfinished))
    }
}

/// Single JSON document on disk
///
/// Every write rewrites the whole document through a temp file and a rename, so a
/// crash mid-write leaves the previous version intact.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write a full snapshot, replacing whatever is on disk
    pub async fn seed(&self, snapshot: &Snapshot) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.write(snapshot).await
    }

    async fn read(&self) -> Result<Snapshot> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                RoostError::Store(format!("Corrupt store {}: {}", self.path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Snapshot::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, snapshot: &Snapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let content = serde_json::to_string_pretty(snapshot)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &self.path).await?;
        debug!("Wrote store {:?}", self.path);
        Ok(())
    }

    async fn update<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Snapshot) -> T + Send,
        T: Send,
    {
        let _guard = self.lock.lock().await;
        let mut snapshot = self.read().await?;
        let out = f(&mut snapshot);
        self.write(&snapshot).await?;
        Ok(out)
    }
}

#[async_trait]
impl Store for JsonFileStore {
    async fn load(&self) -> Result<Snapshot> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    async fn save_person(&self, person: &Person) -> Result<()> {
        self.update(|s| s.upsert_person(person)).await
    }

    async fn save_assignment(&self, assignment: &Assignment) -> Result<()> {
        self.update(|s| s.upsert_assignment(assignment)).await
    }

    async fn append_upcoming(&self, assignments: &[Assignment]) -> Result<()> {
        self.update(|s| s.upcoming.extend_from_slice(assignments))
            .await
    }

    async fn archive_upcoming(&self, keep_unfinished: bool) -> Result<usize> {
        self.update(|s| s.archive_upcoming(keep_unfinished)).await
    }
}
