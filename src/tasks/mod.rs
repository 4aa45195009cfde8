//! Cooperative cancellation for long-running paste jobs.
//!
//! A [`CancelToken`] is handed by reference into every recursive copy step and
//! polled there. Jobs that should be cancellable from the outside register a
//! token in [`CancelState`] under an id and hold the returned [`CancelGuard`]
//! for as long as they run.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};
use tracing::{debug, warn};

mod error;

pub use error::{TaskError, TaskErrorCode, TaskResult};

#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

#[derive(Clone, Default)]
pub struct CancelState {
    inner: Arc<Mutex<HashMap<String, CancelToken>>>,
}

pub struct CancelGuard {
    id: String,
    token: CancelToken,
    state: CancelState,
}

impl CancelState {
    pub fn register(&self, id: impl Into<String>) -> TaskResult<CancelGuard> {
        let id = id.into();
        let token = CancelToken::new();
        let mut map = self.inner.lock().map_err(|_| {
            TaskError::new(
                TaskErrorCode::RegistryLockFailed,
                "Failed to lock cancel registry",
            )
        })?;
        if map.contains_key(&id) {
            return Err(TaskError::new(
                TaskErrorCode::DuplicateTask,
                format!("Task '{id}' is already running"),
            ));
        }
        map.insert(id.clone(), token.clone());
        debug!(task_id = %id, "registered cancellable task");
        Ok(CancelGuard {
            id,
            token,
            state: self.clone(),
        })
    }

    pub fn cancel(&self, id: &str) -> TaskResult<bool> {
        let map = self.inner.lock().map_err(|_| {
            TaskError::new(
                TaskErrorCode::RegistryLockFailed,
                "Failed to lock cancel registry",
            )
        })?;
        match map.get(id) {
            Some(token) => {
                token.cancel();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn cancel_all(&self) -> TaskResult<usize> {
        let map = self.inner.lock().map_err(|_| {
            TaskError::new(
                TaskErrorCode::RegistryLockFailed,
                "Failed to lock cancel registry",
            )
        })?;
        for token in map.values() {
            token.cancel();
        }
        Ok(map.len())
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.inner
            .lock()
            .map(|map| map.contains_key(id))
            .unwrap_or(false)
    }

    fn remove(&self, id: &str) {
        match self.inner.lock() {
            Ok(mut map) => {
                map.remove(id);
            }
            Err(_) => {
                // The task is already ending; leave a trace instead of panicking in drop.
                warn!(task_id = id, "failed to remove task from cancel registry");
            }
        }
    }
}

impl CancelGuard {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        self.state.remove(&self.id);
    }
}
