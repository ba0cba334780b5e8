//! Secure Vault 모듈
//!
//! PIN 기반 verifier + 세션 키 아키텍처로 노트를 암호화하여 관리합니다.
//!
//! - PIN은 어디에도 저장하지 않음 (salt + PBKDF2 verifier만 저장)
//! - 노트 키는 잠금 해제 시 PBKDF2 + HKDF로 유도하여 세션 저장소에만 보관
//! - 노트마다 독립된 AEAD blob으로 저장

pub mod crypto;
pub mod lockout;
pub mod manager;
pub mod notes;
pub mod record;
pub mod session;

#[cfg(test)]
mod tests;

pub use lockout::UnlockState;
pub use manager::SecureVault;
pub use record::VaultRecord;
