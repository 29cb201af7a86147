//! Task store
//!
//! An arena of task records: a dense table of slots plus two secondary
//! indexes (task id → slot, context id → slots in insertion order). Each
//! slot is an async mutex, which is the per-task serialization point for
//! message processing. Tasks are never removed.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use tokio::sync::Mutex;

use crate::protocol::{error::A2AError, task::Task};

/// Shared, lockable reference to one task slot
pub type TaskHandle = Arc<Mutex<Task>>;

#[derive(Debug, Default)]
struct Arena {
    slots: Vec<TaskHandle>,
    by_id: HashMap<String, usize>,
    by_context: HashMap<String, Vec<usize>>,
}

#[derive(Debug, Default)]
pub struct TaskStore {
    arena: RwLock<Arena>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new task, indexing it under its id and context
    pub fn insert(&self, task: Task) -> Result<TaskHandle, A2AError> {
        let mut arena = self.write();
        if arena.by_id.contains_key(&task.id) {
            return Err(A2AError::Internal(format!("task {} already exists", task.id)));
        }

        let index = arena.slots.len();
        let id = task.id.clone();
        let context_id = task.context_id.clone();
        let handle = Arc::new(Mutex::new(task));

        arena.slots.push(Arc::clone(&handle));
        arena.by_id.insert(id, index);
        arena.by_context.entry(context_id).or_default().push(index);

        Ok(handle)
    }

    pub fn get(&self, task_id: &str) -> Option<TaskHandle> {
        let arena = self.read();
        arena
            .by_id
            .get(task_id)
            .map(|&index| Arc::clone(&arena.slots[index]))
    }

    /// Current copy of a task, waiting for any in-flight mutation to finish
    pub async fn snapshot(&self, task_id: &str) -> Option<Task> {
        let handle = self.get(task_id)?;
        let task = handle.lock().await;
        Some(task.clone())
    }

    /// Tasks sharing a context, in creation order
    pub fn tasks_in_context(&self, context_id: &str) -> Vec<TaskHandle> {
        let arena = self.read();
        arena
            .by_context
            .get(context_id)
            .map(|indices| {
                indices
                    .iter()
                    .map(|&index| Arc::clone(&arena.slots[index]))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn contains(&self, task_id: &str) -> bool {
        self.read().by_id.contains_key(task_id)
    }

    pub fn len(&self) -> usize {
        self.read().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> RwLockReadGuard<'_, Arena> {
        self.arena.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Arena> {
        self.arena.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
