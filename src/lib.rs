//! Secure Vault - PIN 보호 로컬 암호화 노트 저장소
//!
//! 개인용 생산성 앱의 보안 볼트 코어 라이브러리입니다.
//! 저장소(key/value)는 주입받고, PIN 검증/잠금 정책/세션/노트 암호화를 담당합니다.
//!
//! ```no_run
//! use secure_vault::{SecureVault, VaultConfig};
//!
//! let vault = SecureVault::open(VaultConfig::from_env().with_db_path("vault.db"))?;
//! vault.initialize_vault("1234")?;
//! vault.unlock_vault("1234")?;
//! let id = vault.add_secure_note("Wifi", "hunter2", "Passwords")?;
//! vault.lock_vault();
//! # let _ = id;
//! # Ok::<(), secure_vault::VaultError>(())
//! ```

pub mod clock;
pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod storage;
pub mod vault;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::VaultConfig;
pub use error::{CommandError, CommandResult, VaultError};
pub use models::{Note, NoteCategory, SessionInfo, VaultExport, VaultStats};
pub use storage::{MemoryStorage, SqliteStorage, StorageBackend};
pub use vault::{SecureVault, UnlockState, VaultRecord};
