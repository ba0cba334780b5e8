//! SQLite Storage
//!
//! 영구 스코프 key/value 저장소 (rusqlite)

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension};

use super::schema;
use super::StorageBackend;
use crate::error::VaultError;

/// SQLite 기반 영구 저장소
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// 파일 DB 열기 (부모 디렉토리와 스키마를 함께 생성)
    pub fn open(path: &Path) -> Result<Self, VaultError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        log::debug!("[SqliteStorage] Opened {}", path.display());
        Self::with_connection(conn)
    }

    /// 메모리 DB 열기 (테스트용)
    pub fn open_in_memory() -> Result<Self, VaultError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, VaultError> {
        conn.execute_batch(schema::CREATE_SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, VaultError> {
        self.conn
            .lock()
            .map_err(|e| VaultError::Storage(format!("Failed to acquire database lock: {}", e)))
    }

    /// 저장된 키 목록
    pub fn keys(&self) -> Result<Vec<String>, VaultError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT key FROM kv_store ORDER BY key")?;
        let iter = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut keys = Vec::new();
        for key in iter {
            keys.push(key?);
        }
        Ok(keys)
    }
}

impl StorageBackend for SqliteStorage {
    fn get(&self, key: &str) -> Result<Option<String>, VaultError> {
        let conn = self.conn()?;
        let value = conn
            .query_row("SELECT value FROM kv_store WHERE key = ?1", [key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), VaultError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)",
            (key, value, chrono::Utc::now().timestamp_millis()),
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), VaultError> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM kv_store WHERE key = ?1", [key])?;
        Ok(())
    }
}
