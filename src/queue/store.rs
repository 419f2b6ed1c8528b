//! Task store — the map of live tasks owned by the queue.
//!
//! Locking is two-level. A structural `RwLock` guards the map itself and is
//! only held long enough to look up, insert, or remove an entry. Each task
//! lives in its own `Mutex` slot which a lifecycle command holds for the
//! whole delegated call, so commands against one task are serialized while
//! commands against different tasks proceed independently.
//!
//! A slot is marked `retired` under its own lock before it leaves the map.
//! Any command that was queued on that slot sees the flag and reports the
//! task as absent instead of touching a terminated task.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::job::TaskId;
use crate::tools::Task;

/// One task plus its retirement flag.
pub struct TaskSlot {
    pub task: Box<dyn Task>,
    retired: bool,
}

type SlotHandle = Arc<Mutex<TaskSlot>>;

/// Exclusive access to one task for the duration of a lifecycle command.
pub struct SlotLease {
    pub id: TaskId,
    handle: SlotHandle,
    guard: OwnedMutexGuard<TaskSlot>,
}

impl SlotLease {
    pub fn task(&mut self) -> &mut dyn Task {
        self.guard.task.as_mut()
    }
}

/// Concurrency-safe mapping from task identifier to live task.
#[derive(Default)]
pub struct TaskStore {
    tasks: RwLock<HashMap<TaskId, SlotHandle>>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, id: &TaskId) -> bool {
        self.tasks.read().await.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }

    /// Identifiers currently in the store.
    pub async fn ids(&self) -> Vec<TaskId> {
        self.tasks.read().await.keys().cloned().collect()
    }

    /// Insert a new task and return it already leased, so nothing else can
    /// observe it before the caller has started it.
    ///
    /// Hands the task back if the identifier is taken.
    pub async fn insert_leased(
        &self,
        id: TaskId,
        task: Box<dyn Task>,
    ) -> Result<SlotLease, Box<dyn Task>> {
        let mut tasks = self.tasks.write().await;
        if tasks.contains_key(&id) {
            return Err(task);
        }

        let handle = Arc::new(Mutex::new(TaskSlot {
            task,
            retired: false,
        }));
        // Fresh slot, nobody else can hold it yet.
        let guard = handle.clone().lock_owned().await;
        tasks.insert(id.clone(), handle.clone());

        Ok(SlotLease { id, handle, guard })
    }

    /// Lease an existing task, waiting for any in-flight command on it.
    ///
    /// Returns `None` if the task is absent or was retired while waiting.
    pub async fn lease(&self, id: &TaskId) -> Option<SlotLease> {
        let handle = self.tasks.read().await.get(id).cloned()?;
        let guard = handle.clone().lock_owned().await;
        if guard.retired {
            return None;
        }
        Some(SlotLease {
            id: id.clone(),
            handle,
            guard,
        })
    }

    /// Retire a leased task and remove it from the map.
    pub async fn retire(&self, mut lease: SlotLease) {
        lease.guard.retired = true;
        let mut tasks = self.tasks.write().await;
        // Only remove the entry if it is still this slot.
        if tasks
            .get(&lease.id)
            .is_some_and(|current| Arc::ptr_eq(current, &lease.handle))
        {
            tasks.remove(&lease.id);
        }
    }
}
