//! Secure Vault - PIN 인증, 세션, 암호화 노트 CRUD
//!
//! - 영구 저장소에는 볼트 레코드 1개만 저장 (`secureVault`)
//! - 세션은 휘발성 저장소에 저장 (`vaultSession`), 30분 후 만료
//! - 레코드 변경은 항상 읽기 → 메모리에서 수정 → 전체 쓰기

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::config::VaultConfig;
use crate::error::VaultError;
use crate::models::{Note, NoteCategory, SessionInfo, VaultExport, VaultStats};
use crate::storage::{MemoryStorage, SqliteStorage, StorageBackend};
use crate::vault::crypto::{
    derive_note_key, derive_verifier, generate_salt, verifiers_match, NoteKey,
};
use crate::vault::lockout::{FailureOutcome, LockoutPolicy, UnlockState};
use crate::vault::notes::{decrypt_all, find_note, open_note, seal_note, NoteIndex};
use crate::vault::record::VaultRecord;
use crate::vault::session::SessionManager;

/// Secure Vault 서비스 (호스트 앱이 호출하는 유일한 진입점)
pub struct SecureVault {
    /// 영구 저장소 (볼트 레코드)
    durable: Box<dyn StorageBackend>,
    /// 세션 관리 (휘발성 저장소)
    sessions: SessionManager,
    lockout: LockoutPolicy,
    config: VaultConfig,
    clock: Arc<dyn Clock>,
    /// 노트 id → blob 위치
    index: Mutex<NoteIndex>,
}

impl SecureVault {
    pub fn new(
        durable: Box<dyn StorageBackend>,
        ephemeral: Box<dyn StorageBackend>,
        config: VaultConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let sessions = SessionManager::new(
            ephemeral,
            config.session_key.clone(),
            config.session_lifetime_millis(),
            clock.clone(),
        );

        Self {
            durable,
            sessions,
            lockout: LockoutPolicy::new(&config),
            config,
            clock,
            index: Mutex::new(NoteIndex::default()),
        }
    }

    /// SQLite(영구) + 메모리(세션) 조합으로 열기
    pub fn open(config: VaultConfig) -> Result<Self, VaultError> {
        let db_path = config.db_path.clone().ok_or_else(|| {
            VaultError::Storage("Vault database path is not configured".to_string())
        })?;

        let durable = SqliteStorage::open(&db_path)?;
        log::info!("[SecureVault] Opened vault storage at {}", db_path.display());

        Ok(Self::new(
            Box::new(durable),
            Box::new(MemoryStorage::new()),
            config,
            Arc::new(SystemClock),
        ))
    }

    /// 전부 메모리에 두는 볼트 (테스트/임베딩용)
    pub fn in_memory(config: VaultConfig) -> Self {
        Self::new(
            Box::new(MemoryStorage::new()),
            Box::new(MemoryStorage::new()),
            config,
            Arc::new(SystemClock),
        )
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    // =====================================
    // 초기화 / PIN 검증
    // =====================================

    /// 새 볼트 생성 (이미 있으면 거부)
    pub fn initialize_vault(&self, pin: &str) -> Result<(), VaultError> {
        if self.record_exists()? {
            return Err(VaultError::AlreadyInitialized);
        }
        if pin.is_empty() {
            return Err(VaultError::InvalidPinFormat);
        }

        let salt = generate_salt();
        let verifier = derive_verifier(pin, &salt);
        let record = VaultRecord::new(salt, verifier, self.clock.now_millis());
        self.save_record(&record)?;
        self.index().clear();

        log::info!("[SecureVault] Vault initialized");
        Ok(())
    }

    pub fn is_vault_initialized(&self) -> bool {
        match self.load_record() {
            Ok(record) => record.is_some_and(|r| r.initialized),
            Err(e) => {
                log::error!("[SecureVault] Failed to read vault record: {}", e);
                false
            }
        }
    }

    /// 저장된 salt로 verifier를 다시 계산해 비교 (부수 효과 없음)
    pub fn verify_pin(&self, pin: &str) -> Result<bool, VaultError> {
        let record = self.require_record()?;
        Ok(Self::pin_matches(&record, pin))
    }

    fn pin_matches(record: &VaultRecord, pin: &str) -> bool {
        let verifier = derive_verifier(pin, &record.salt);
        verifiers_match(&record.pin_verifier, &verifier)
    }

    // =====================================
    // 잠금 상태
    // =====================================

    /// 실패 누적으로 잠금 중인지
    pub fn is_vault_locked(&self) -> bool {
        let now = self.clock.now_millis();
        self.read_record_for_status()
            .is_some_and(|record| self.lockout.is_locked_out(&record, now))
    }

    /// 남은 잠금 시간 (초)
    pub fn get_lockout_time_remaining(&self) -> u64 {
        let now = self.clock.now_millis();
        self.read_record_for_status()
            .map(|record| self.lockout.seconds_remaining(&record, now))
            .unwrap_or(0)
    }

    pub fn unlock_state(&self) -> UnlockState {
        let Some(record) = self.read_record_for_status().filter(|r| r.initialized) else {
            return UnlockState::Uninitialized;
        };

        let now = self.clock.now_millis();
        match record.lockout_until {
            Some(until) if self.lockout.is_locked_out(&record, now) => {
                UnlockState::LockedOut { until }
            }
            _ if self.is_session_active() => UnlockState::Unlocked,
            _ => UnlockState::Locked,
        }
    }

    /// PIN으로 잠금 해제
    ///
    /// 1. 볼트 없음 → `NotInitialized`
    /// 2. 잠금 중 → `LockedOut` (시도 횟수 소모 없음)
    /// 3. 불일치 → 실패 누적, 임계값 도달 시 `LockedOutNow`
    /// 4. 일치 → 카운터 리셋 후 새 세션 시작
    pub fn unlock_vault(&self, pin: &str) -> Result<SessionInfo, VaultError> {
        let mut record = self.require_record()?;
        self.check_pin(&mut record, pin)?;
        self.save_record(&record)?;

        let key = derive_note_key(pin, &record.salt)?;
        self.index().clear();
        let session = self.sessions.start(&key)?;

        log::info!("[SecureVault] Vault unlocked");
        Ok(session)
    }

    /// 잠금/실패 처리를 포함한 PIN 확인. 실패 시 레코드를 저장하고 에러 반환,
    /// 성공 시 메모리의 레코드만 리셋 (저장은 호출자)
    fn check_pin(&self, record: &mut VaultRecord, pin: &str) -> Result<(), VaultError> {
        let now = self.clock.now_millis();
        if self.lockout.is_locked_out(record, now) {
            return Err(VaultError::LockedOut {
                seconds_remaining: self.lockout.seconds_remaining(record, now),
            });
        }

        if !Self::pin_matches(record, pin) {
            let outcome = self.lockout.register_failure(record, now);
            self.save_record(record)?;

            return Err(match outcome {
                FailureOutcome::Retry { attempts_remaining } => {
                    log::warn!(
                        "[SecureVault] Invalid PIN, {} attempts remaining",
                        attempts_remaining
                    );
                    VaultError::InvalidPin { attempts_remaining }
                }
                FailureOutcome::LockedOut { duration_seconds } => {
                    log::warn!(
                        "[SecureVault] Too many failed attempts, locked for {}s",
                        duration_seconds
                    );
                    VaultError::LockedOutNow { duration_seconds }
                }
            });
        }

        self.lockout.register_success(record);
        Ok(())
    }

    // =====================================
    // 세션
    // =====================================

    pub fn is_session_active(&self) -> bool {
        match self.sessions.is_active() {
            Ok(true) => true,
            Ok(false) => {
                self.index().clear();
                false
            }
            Err(e) => {
                log::error!("[SecureVault] Failed to read session: {}", e);
                false
            }
        }
    }

    /// 남은 세션 시간 (초)
    pub fn get_session_time_remaining(&self) -> u64 {
        self.sessions.seconds_remaining().unwrap_or_else(|e| {
            log::error!("[SecureVault] Failed to read session: {}", e);
            0
        })
    }

    /// 세션 삭제 (멱등, 항상 성공)
    pub fn lock_vault(&self) {
        if let Err(e) = self.sessions.lock() {
            log::error!("[SecureVault] Failed to clear session: {}", e);
        }
        self.index().clear();
        log::info!("[SecureVault] Vault locked");
    }

    // =====================================
    // 노트 CRUD (활성 세션 필요)
    // =====================================

    /// 노트 추가, 새 노트 id 반환
    pub fn add_secure_note(
        &self,
        title: &str,
        content: &str,
        category: &str,
    ) -> Result<String, VaultError> {
        let key = self.require_key()?;
        let title = Self::validate_title(title)?;
        let mut record = self.require_record()?;

        let now = self.clock.now_millis();
        let note = Note {
            id: Uuid::new_v4().to_string(),
            title,
            content: content.to_string(),
            category: NoteCategory::normalize(category).to_string(),
            created_at: now,
            updated_at: now,
        };

        record.notes.push(seal_note(&key, &note)?);
        self.save_record(&record)?;
        self.index().insert(&note.id, record.notes.len() - 1);

        log::info!("[SecureVault] Note added: {}", note.id);
        Ok(note.id)
    }

    /// 모든 노트 복호화 (손상된 노트는 건너뜀), `updatedAt` 내림차순
    pub fn get_all_secure_notes(&self) -> Result<Vec<Note>, VaultError> {
        let key = self.require_key()?;
        let record = self.require_record()?;
        Ok(self.decrypt_notes(&key, &record))
    }

    pub fn get_secure_note(&self, id: &str) -> Result<Note, VaultError> {
        let key = self.require_key()?;
        let record = self.require_record()?;
        let hint = self.index().position(id);

        let (position, note) = find_note(&key, &record.notes, id, hint)
            .ok_or_else(|| VaultError::NoteNotFound(id.to_string()))?;
        self.index().insert(id, position);
        Ok(note)
    }

    /// 노트 수정 (`createdAt` 유지, `updatedAt` 갱신)
    pub fn update_secure_note(
        &self,
        id: &str,
        title: &str,
        content: &str,
        category: &str,
    ) -> Result<(), VaultError> {
        let key = self.require_key()?;
        let title = Self::validate_title(title)?;
        let mut record = self.require_record()?;
        let hint = self.index().position(id);

        let (position, mut note) = find_note(&key, &record.notes, id, hint)
            .ok_or_else(|| VaultError::NoteNotFound(id.to_string()))?;

        note.title = title;
        note.content = content.to_string();
        note.category = NoteCategory::normalize(category).to_string();
        note.updated_at = self.clock.now_millis();

        record.notes[position] = seal_note(&key, &note)?;
        self.save_record(&record)?;
        self.index().insert(id, position);

        log::info!("[SecureVault] Note updated: {}", id);
        Ok(())
    }

    pub fn delete_secure_note(&self, id: &str) -> Result<(), VaultError> {
        let key = self.require_key()?;
        let mut record = self.require_record()?;
        let hint = self.index().position(id);

        let (position, _) = find_note(&key, &record.notes, id, hint)
            .ok_or_else(|| VaultError::NoteNotFound(id.to_string()))?;

        record.notes.remove(position);
        self.save_record(&record)?;
        self.index().remove_at(id, position);

        log::info!("[SecureVault] Note deleted: {}", id);
        Ok(())
    }

    /// 노트 수/카테고리별 개수 (복호화가 필요하므로 세션 필요)
    pub fn get_vault_stats(&self) -> Result<VaultStats, VaultError> {
        let key = self.require_key()?;
        let record = self.require_record()?;
        let notes = self.decrypt_notes(&key, &record);

        let mut category_counts = BTreeMap::new();
        for note in &notes {
            *category_counts.entry(note.category.clone()).or_insert(0) += 1;
        }

        Ok(VaultStats {
            total_notes: notes.len(),
            category_counts,
            created_at: record.created_at,
        })
    }

    // =====================================
    // 백업 / 복원 / 리셋
    // =====================================

    /// 레코드 전체를 그대로 직렬화 (노트는 암호문 그대로)
    pub fn export_vault_data(&self) -> Result<VaultExport, VaultError> {
        let record = self.require_record()?;
        let date = chrono::DateTime::<chrono::Utc>::from_timestamp_millis(self.clock.now_millis())
            .unwrap_or_default()
            .format("%Y-%m-%d")
            .to_string();

        Ok(VaultExport {
            data: record.to_json_pretty()?,
            filename: format!("secure-vault-backup-{}.json", date),
        })
    }

    /// 백업 복원. 포맷 검증과 기존 볼트 확인이 끝나기 전에는 아무것도 쓰지 않음
    pub fn import_vault_data(&self, serialized: &str) -> Result<(), VaultError> {
        let mut record = Self::parse_backup(serialized)?;

        if self.record_exists()? {
            return Err(VaultError::VaultAlreadyExists);
        }

        if record.created_at == 0 {
            record.created_at = self.clock.now_millis();
        }

        self.lock_vault();
        self.save_record(&record)?;

        log::info!(
            "[SecureVault] Vault imported, {} encrypted notes",
            record.notes.len()
        );
        Ok(())
    }

    fn parse_backup(serialized: &str) -> Result<VaultRecord, VaultError> {
        let value: serde_json::Value = serde_json::from_str(serialized)
            .map_err(|e| VaultError::InvalidBackupFormat(format!("not valid JSON: {}", e)))?;

        let object = value
            .as_object()
            .ok_or_else(|| VaultError::InvalidBackupFormat("expected a JSON object".to_string()))?;
        for field in ["initialized", "salt", "pinVerifier"] {
            if !object.contains_key(field) {
                return Err(VaultError::InvalidBackupFormat(format!(
                    "missing field `{}`",
                    field
                )));
            }
        }

        let record: VaultRecord = serde_json::from_value(value)
            .map_err(|e| VaultError::InvalidBackupFormat(e.to_string()))?;
        record
            .check_consistency()
            .map_err(VaultError::InvalidBackupFormat)?;
        Ok(record)
    }

    /// 볼트 완전 삭제. PIN 없이 가능 (PIN 분실 시 탈출구, 데이터는 복구 불가)
    pub fn reset_vault(&self) -> Result<(), VaultError> {
        self.lock_vault();
        self.durable.remove(&self.config.vault_key)?;
        log::warn!("[SecureVault] Vault reset, all data removed");
        Ok(())
    }

    /// PIN 변경. 기존 salt로 새 verifier를 만들고 복호화 가능한 노트를 새 키로 재암호화
    ///
    /// 복호화되지 않는 blob은 그대로 보존합니다.
    pub fn change_pin(&self, current_pin: &str, new_pin: &str) -> Result<SessionInfo, VaultError> {
        let old_key = self.require_key()?;
        if new_pin.is_empty() {
            return Err(VaultError::InvalidPinFormat);
        }

        let mut record = self.require_record()?;
        if let Err(e) = self.check_pin(&mut record, current_pin) {
            if matches!(e, VaultError::LockedOutNow { .. }) {
                self.lock_vault();
            }
            return Err(e);
        }

        // salt는 초기화 때 한 번만 생성, PIN 변경 시에도 유지
        let new_key = derive_note_key(new_pin, &record.salt)?;

        let mut notes = Vec::with_capacity(record.notes.len());
        for (position, blob) in record.notes.iter().enumerate() {
            match open_note(&old_key, blob) {
                Ok(note) => notes.push(seal_note(&new_key, &note)?),
                Err(e) => {
                    log::warn!(
                        "[SecureVault] Keeping undecryptable note at position {} as-is: {}",
                        position,
                        e
                    );
                    notes.push(blob.clone());
                }
            }
        }

        record.pin_verifier = derive_verifier(new_pin, &record.salt);
        record.notes = notes;
        self.save_record(&record)?;

        self.index().clear();
        let session = self.sessions.start(&new_key)?;

        log::info!("[SecureVault] PIN changed");
        Ok(session)
    }

    // =====================================
    // 내부 헬퍼
    // =====================================

    fn load_record(&self) -> Result<Option<VaultRecord>, VaultError> {
        match self.durable.get(&self.config.vault_key)? {
            Some(json) => Ok(Some(VaultRecord::from_json(&json)?)),
            None => Ok(None),
        }
    }

    /// 파싱하지 않고 저장 키 존재 여부만 확인 (손상된 레코드도 "있음")
    fn record_exists(&self) -> Result<bool, VaultError> {
        Ok(self.durable.get(&self.config.vault_key)?.is_some())
    }

    fn require_record(&self) -> Result<VaultRecord, VaultError> {
        self.load_record()?
            .filter(|record| record.initialized)
            .ok_or(VaultError::NotInitialized)
    }

    fn read_record_for_status(&self) -> Option<VaultRecord> {
        self.load_record().unwrap_or_else(|e| {
            log::error!("[SecureVault] Failed to read vault record: {}", e);
            None
        })
    }

    fn save_record(&self, record: &VaultRecord) -> Result<(), VaultError> {
        self.durable.set(&self.config.vault_key, &record.to_json()?)
    }

    fn require_key(&self) -> Result<NoteKey, VaultError> {
        match self.sessions.active_key()? {
            Some(key) => Ok(key),
            None => {
                self.index().clear();
                Err(VaultError::NotUnlocked)
            }
        }
    }

    fn decrypt_notes(&self, key: &NoteKey, record: &VaultRecord) -> Vec<Note> {
        let decrypted = decrypt_all(key, &record.notes);
        self.index()
            .rebuild(decrypted.iter().map(|(position, note)| (*position, note.id.as_str())));

        let mut notes: Vec<Note> = decrypted.into_iter().map(|(_, note)| note).collect();
        notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        notes
    }

    fn validate_title(title: &str) -> Result<String, VaultError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(VaultError::InvalidNote("Title is required".to_string()));
        }
        Ok(title.to_string())
    }

    fn index(&self) -> MutexGuard<'_, NoteIndex> {
        self.index.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
