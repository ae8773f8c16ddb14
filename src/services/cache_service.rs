use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// Ephemeral key/value cache holding serialized quizzes.
///
/// Callers treat every error as a miss; the cache is never the system of record.
#[async_trait]
pub trait QuizCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
}

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Instant,
}

#[derive(Clone, Debug, Default)]
pub struct MemoryQuizCache {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl MemoryQuizCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Entry>>> {
        self.entries
            .lock()
            .map_err(|_| Error::Internal("quiz cache mutex poisoned".to_string()))
    }
}

#[async_trait]
impl QuizCache for MemoryQuizCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut guard = self.lock()?;
        let now = Instant::now();
        match guard.get(key) {
            Some(entry) if entry.expires_at > now => Ok(Some(entry.value.clone())),
            Some(_) => {
                guard.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let mut guard = self.lock()?;
        let now = Instant::now();
        guard.retain(|_, e| e.expires_at > now);
        guard.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}
