//! Session Manager
//!
//! 잠금 해제 성공 시 휘발성 저장소에 세션 자격 증명을 기록합니다.
//!
//! - 저장 내용: 생성 시각 + PIN에서 유도한 노트 키 (PIN 원문은 저장하지 않음)
//! - 만료는 접근 시점에만 판단 (백그라운드 타이머 없음)
//! - 만료/손상된 세션은 읽는 순간 삭제 = 암묵적 잠금

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::clock::Clock;
use crate::error::VaultError;
use crate::models::SessionInfo;
use crate::storage::StorageBackend;
use crate::vault::crypto::NoteKey;

/// 휘발성 저장소에 기록되는 세션 토큰
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionCredential {
    created_at: i64,
    key: String,
}

impl Drop for SessionCredential {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

pub struct SessionManager {
    storage: Box<dyn StorageBackend>,
    storage_key: String,
    lifetime_millis: i64,
    clock: Arc<dyn Clock>,
}

impl SessionManager {
    pub fn new(
        storage: Box<dyn StorageBackend>,
        storage_key: impl Into<String>,
        lifetime_millis: i64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            storage,
            storage_key: storage_key.into(),
            lifetime_millis,
            clock,
        }
    }

    /// 새 세션 시작 (기존 세션은 덮어씀)
    pub fn start(&self, key: &NoteKey) -> Result<SessionInfo, VaultError> {
        let created_at = self.clock.now_millis();
        let credential = SessionCredential {
            created_at,
            key: key.to_base64().to_string(),
        };

        let mut json = serde_json::to_string(&credential)?;
        let result = self.storage.set(&self.storage_key, &json);
        json.zeroize();
        result?;

        log::debug!("[VaultSession] Session started");
        Ok(SessionInfo {
            created_at,
            expires_at: created_at + self.lifetime_millis,
        })
    }

    /// 유효한 세션의 노트 키. 없거나 만료되면 `None` (만료 시 세션 삭제)
    pub fn active_key(&self) -> Result<Option<NoteKey>, VaultError> {
        let Some(credential) = self.read_valid()? else {
            return Ok(None);
        };

        match NoteKey::from_base64(&credential.key) {
            Some(key) => Ok(Some(key)),
            None => {
                log::warn!("[VaultSession] Session key material is malformed, locking");
                self.lock()?;
                Ok(None)
            }
        }
    }

    pub fn is_active(&self) -> Result<bool, VaultError> {
        Ok(self.active_key()?.is_some())
    }

    pub fn info(&self) -> Result<Option<SessionInfo>, VaultError> {
        Ok(self.read_valid()?.map(|c| SessionInfo {
            created_at: c.created_at,
            expires_at: c.created_at + self.lifetime_millis,
        }))
    }

    /// 남은 세션 시간 (초, 내림)
    pub fn seconds_remaining(&self) -> Result<u64, VaultError> {
        let now = self.clock.now_millis();
        Ok(self
            .info()?
            .map(|info| ((info.expires_at - now).max(0) / 1000) as u64)
            .unwrap_or(0))
    }

    /// 세션 삭제 (멱등)
    pub fn lock(&self) -> Result<(), VaultError> {
        self.storage.remove(&self.storage_key)
    }

    fn read_valid(&self) -> Result<Option<SessionCredential>, VaultError> {
        let Some(mut raw) = self.storage.get(&self.storage_key)? else {
            return Ok(None);
        };

        let parsed = serde_json::from_str::<SessionCredential>(&raw);
        raw.zeroize();

        let credential = match parsed {
            Ok(credential) => credential,
            Err(e) => {
                log::warn!("[VaultSession] Unreadable session token, locking: {}", e);
                self.lock()?;
                return Ok(None);
            }
        };

        let now = self.clock.now_millis();
        if now - credential.created_at >= self.lifetime_millis {
            log::info!("[VaultSession] Session expired, locking");
            self.lock()?;
            return Ok(None);
        }

        Ok(Some(credential))
    }
}
