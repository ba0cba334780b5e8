//! Secure Vault 호스트 명령어
//!
//! UI 레이어가 호출하는 얇은 경계. 모든 명령은 `CommandResult`를 반환하며
//! 에러는 고정 코드 + 사람이 읽을 메시지 + 카운트다운 값으로 직렬화됩니다.
//! 비활성 자동 잠금 같은 UI 정책은 이 위에서 `vault_lock`을 호출하면 됩니다.

use serde::{Deserialize, Serialize};

use crate::error::{CommandError, CommandResult};
use crate::models::{Note, SessionInfo, VaultExport, VaultStats};
use crate::vault::SecureVault;

/// 노트 작성/수정 요청
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteArgs {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub category: String,
}

/// PIN 변경 요청
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePinArgs {
    pub current_pin: String,
    pub new_pin: String,
}

/// 잠금 화면 렌더링용 상태
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultStatus {
    pub initialized: bool,
    pub locked_out: bool,
    pub lockout_seconds_remaining: u64,
    pub session_active: bool,
    pub session_seconds_remaining: u64,
}

/// 볼트 상태 조회 (실패하지 않음)
pub fn vault_status(vault: &SecureVault) -> VaultStatus {
    VaultStatus {
        initialized: vault.is_vault_initialized(),
        locked_out: vault.is_vault_locked(),
        lockout_seconds_remaining: vault.get_lockout_time_remaining(),
        session_active: vault.is_session_active(),
        session_seconds_remaining: vault.get_session_time_remaining(),
    }
}

pub fn vault_initialize(vault: &SecureVault, pin: String) -> CommandResult<()> {
    vault.initialize_vault(&pin).map_err(CommandError::from)
}

pub fn vault_unlock(vault: &SecureVault, pin: String) -> CommandResult<SessionInfo> {
    vault.unlock_vault(&pin).map_err(CommandError::from)
}

/// 세션 종료 (항상 성공)
pub fn vault_lock(vault: &SecureVault) -> CommandResult<()> {
    vault.lock_vault();
    Ok(())
}

pub fn vault_add_note(vault: &SecureVault, args: NoteArgs) -> CommandResult<String> {
    vault
        .add_secure_note(&args.title, &args.content, &args.category)
        .map_err(CommandError::from)
}

pub fn vault_list_notes(vault: &SecureVault) -> CommandResult<Vec<Note>> {
    vault.get_all_secure_notes().map_err(CommandError::from)
}

pub fn vault_get_note(vault: &SecureVault, id: String) -> CommandResult<Note> {
    vault.get_secure_note(&id).map_err(CommandError::from)
}

pub fn vault_update_note(vault: &SecureVault, id: String, args: NoteArgs) -> CommandResult<()> {
    vault
        .update_secure_note(&id, &args.title, &args.content, &args.category)
        .map_err(CommandError::from)
}

pub fn vault_delete_note(vault: &SecureVault, id: String) -> CommandResult<()> {
    vault.delete_secure_note(&id).map_err(CommandError::from)
}

pub fn vault_stats(vault: &SecureVault) -> CommandResult<VaultStats> {
    vault.get_vault_stats().map_err(CommandError::from)
}

/// 백업 내보내기 (노트는 암호문 그대로)
pub fn vault_export(vault: &SecureVault) -> CommandResult<VaultExport> {
    vault.export_vault_data().map_err(CommandError::from)
}

pub fn vault_import(vault: &SecureVault, data: String) -> CommandResult<()> {
    vault.import_vault_data(&data).map_err(CommandError::from)
}

/// 볼트 전체 삭제 (PIN 불필요, 복구 불가)
pub fn vault_reset(vault: &SecureVault) -> CommandResult<()> {
    vault.reset_vault().map_err(CommandError::from)
}

pub fn vault_change_pin(vault: &SecureVault, args: ChangePinArgs) -> CommandResult<SessionInfo> {
    vault
        .change_pin(&args.current_pin, &args.new_pin)
        .map_err(CommandError::from)
}
