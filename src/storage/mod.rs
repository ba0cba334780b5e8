//! Storage Module
//!
//! 문자열 키 기반 동기 key/value 저장소.
//!
//! - 영구(durable) 스코프: 재시작 후에도 유지 (`SqliteStorage`)
//! - 휘발성(ephemeral) 스코프: 프로세스 종료 시 사라짐 (`MemoryStorage`)

mod schema;
mod sqlite;

pub use sqlite::SqliteStorage;

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::VaultError;

/// 볼트가 의존하는 저장소 인터페이스
///
/// `set`은 값 전체를 한 번에 교체해야 합니다 (부분 쓰기 없음).
pub trait StorageBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, VaultError>;
    fn set(&self, key: &str, value: &str) -> Result<(), VaultError>;
    fn remove(&self, key: &str) -> Result<(), VaultError>;
}

/// 메모리 저장소 (세션 스코프 / 테스트 더블)
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, VaultError> {
        self.entries
            .lock()
            .map_err(|e| VaultError::Storage(format!("Failed to acquire storage lock: {}", e)))
    }

    pub fn len(&self) -> usize {
        self.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StorageBackend for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, VaultError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), VaultError> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), VaultError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

impl<T: StorageBackend + ?Sized> StorageBackend for std::sync::Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, VaultError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), VaultError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), VaultError> {
        (**self).remove(key)
    }
}
