//! Vault Configuration
//!
//! 잠금 정책/세션 수명/스토리지 키 설정.
//! 기본값이 곧 볼트의 보안 상수이며, 환경 변수로는 경로와 키 이름만 바꿀 수 있습니다.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// 연속 실패 허용 횟수
pub const MAX_FAILED_ATTEMPTS: u32 = 5;
/// 잠금 시간 (5분)
pub const LOCKOUT_DURATION: Duration = Duration::from_secs(5 * 60);
/// 세션 수명 (30분)
pub const SESSION_LIFETIME: Duration = Duration::from_secs(30 * 60);
/// 영구 저장소의 볼트 레코드 키
pub const VAULT_STORAGE_KEY: &str = "secureVault";
/// 휘발성 저장소의 세션 키
pub const SESSION_STORAGE_KEY: &str = "vaultSession";

const ENV_DB_PATH: &str = "SECURE_VAULT_DB_PATH";
const ENV_VAULT_KEY: &str = "SECURE_VAULT_KEY";
const ENV_SESSION_KEY: &str = "SECURE_VAULT_SESSION_KEY";

/// 볼트 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultConfig {
    pub max_failed_attempts: u32,
    pub lockout_duration: Duration,
    pub session_lifetime: Duration,
    pub vault_key: String,
    pub session_key: String,
    /// SQLite 파일 경로 (`SecureVault::open`에서 사용)
    pub db_path: Option<PathBuf>,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            max_failed_attempts: MAX_FAILED_ATTEMPTS,
            lockout_duration: LOCKOUT_DURATION,
            session_lifetime: SESSION_LIFETIME,
            vault_key: VAULT_STORAGE_KEY.to_string(),
            session_key: SESSION_STORAGE_KEY.to_string(),
            db_path: None,
        }
    }
}

impl VaultConfig {
    /// `.env.local` / `.env`를 로드한 뒤 환경 변수로 기본값을 덮어씀
    pub fn from_env() -> Self {
        load_env_files();
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(path) = non_empty(ENV_DB_PATH) {
            self.db_path = Some(PathBuf::from(path));
        }
        if let Some(key) = non_empty(ENV_VAULT_KEY) {
            self.vault_key = key;
        }
        if let Some(key) = non_empty(ENV_SESSION_KEY) {
            self.session_key = key;
        }
        self
    }

    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = Some(path.into());
        self
    }

    pub fn lockout_duration_millis(&self) -> i64 {
        self.lockout_duration.as_millis() as i64
    }

    pub fn session_lifetime_millis(&self) -> i64 {
        self.session_lifetime.as_millis() as i64
    }
}

/// 환경 파일 하나 로드. 파싱 실패는 로그만 남기고 무시
fn load_env_file(path: &Path) -> bool {
    match dotenvy::from_path(path) {
        Ok(()) => {
            log::debug!("[VaultConfig] Loaded {}", path.display());
            true
        }
        Err(e) if e.not_found() => false,
        Err(e) => {
            log::warn!("[VaultConfig] Ignoring unreadable {}: {}", path.display(), e);
            false
        }
    }
}

/// `.env.local`을 현재 디렉터리부터 상위로 최대 4단계까지 탐색, 없으면 `.env`
fn load_env_files() {
    if let Ok(cwd) = std::env::current_dir() {
        let found = cwd
            .ancestors()
            .take(5)
            .map(|dir| dir.join(".env.local"))
            .find(|candidate| candidate.is_file());
        if let Some(path) = found {
            if load_env_file(&path) {
                return;
            }
        }
    }

    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            log::warn!("[VaultConfig] Ignoring unreadable .env: {}", e);
        }
    }
}
