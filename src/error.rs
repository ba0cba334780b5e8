//! Secure Vault Error Types
//!
//! 볼트 전역 에러 타입 정의

use serde::Serialize;
use thiserror::Error;

/// Secure Vault 도메인 에러
///
/// 인증/잠금 관련 에러는 UI가 상태를 그릴 수 있도록 남은 횟수와 남은 시간을 함께 담습니다.
/// salt나 verifier 같은 내부 값은 절대 포함하지 않습니다.
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Vault is not initialized")]
    NotInitialized,

    #[error("Vault is already initialized")]
    AlreadyInitialized,

    #[error("Too many failed attempts. Try again in {seconds_remaining} seconds")]
    LockedOut { seconds_remaining: u64 },

    #[error("Invalid PIN. {attempts_remaining} attempts remaining")]
    InvalidPin { attempts_remaining: u32 },

    #[error("Too many failed attempts. Vault locked for {duration_seconds} seconds")]
    LockedOutNow { duration_seconds: u64 },

    #[error("Vault is locked. Please unlock first")]
    NotUnlocked,

    #[error("Note not found: {0}")]
    NoteNotFound(String),

    /// 개별 노트 복호화 실패 (스캔 중에는 건너뛰고 외부로 전파하지 않음)
    #[error("Corrupt note: {0}")]
    CorruptNote(String),

    #[error("Invalid backup format: {0}")]
    InvalidBackupFormat(String),

    #[error("A vault already exists. Reset it before importing")]
    VaultAlreadyExists,

    #[error("Invalid note: {0}")]
    InvalidNote(String),

    #[error("PIN must not be empty")]
    InvalidPinFormat,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Crypto error: {0}")]
    Crypto(String),
}

impl VaultError {
    /// 호스트 앱이 분기할 수 있는 고정 에러 코드
    pub fn code(&self) -> &'static str {
        match self {
            VaultError::NotInitialized => "NOT_INITIALIZED",
            VaultError::AlreadyInitialized => "ALREADY_INITIALIZED",
            VaultError::LockedOut { .. } => "LOCKED_OUT",
            VaultError::InvalidPin { .. } => "INVALID_PIN",
            VaultError::LockedOutNow { .. } => "LOCKED_OUT_NOW",
            VaultError::NotUnlocked => "NOT_UNLOCKED",
            VaultError::NoteNotFound(_) => "NOTE_NOT_FOUND",
            VaultError::CorruptNote(_) => "CORRUPT_NOTE",
            VaultError::InvalidBackupFormat(_) => "INVALID_BACKUP_FORMAT",
            VaultError::VaultAlreadyExists => "VAULT_ALREADY_EXISTS",
            VaultError::InvalidNote(_) => "INVALID_NOTE",
            VaultError::InvalidPinFormat => "INVALID_PIN_FORMAT",
            VaultError::Storage(_) => "STORAGE_ERROR",
            VaultError::Serialization(_) => "SERIALIZATION_ERROR",
            VaultError::Crypto(_) => "CRYPTO_ERROR",
        }
    }
}

impl From<rusqlite::Error> for VaultError {
    fn from(err: rusqlite::Error) -> Self {
        VaultError::Storage(err.to_string())
    }
}

impl From<std::io::Error> for VaultError {
    fn from(err: std::io::Error) -> Self {
        VaultError::Storage(err.to_string())
    }
}

/// 에러와 함께 전달되는 기계 판독용 값
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts_remaining: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seconds_remaining: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u64>,
}

/// 호스트 명령 응답용 직렬화 가능한 에러
#[derive(Debug, Serialize)]
pub struct CommandError {
    pub code: String,
    pub message: String,
    pub details: Option<ErrorDetails>,
}

impl From<VaultError> for CommandError {
    fn from(error: VaultError) -> Self {
        let details = match &error {
            VaultError::LockedOut { seconds_remaining } => Some(ErrorDetails {
                seconds_remaining: Some(*seconds_remaining),
                ..Default::default()
            }),
            VaultError::InvalidPin { attempts_remaining } => Some(ErrorDetails {
                attempts_remaining: Some(*attempts_remaining),
                ..Default::default()
            }),
            VaultError::LockedOutNow { duration_seconds } => Some(ErrorDetails {
                duration_seconds: Some(*duration_seconds),
                seconds_remaining: Some(*duration_seconds),
                ..Default::default()
            }),
            _ => None,
        };

        CommandError {
            code: error.code().to_string(),
            message: error.to_string(),
            details,
        }
    }
}

/// 호스트 명령 결과 타입
pub type CommandResult<T> = Result<T, CommandError>;
