//! Vault 암호화 프리미티브
//!
//! - PIN verifier: PBKDF2-HMAC-SHA256 (10,000회, 256-bit), salt 32 bytes
//! - 노트 키: PBKDF2 출력의 두 번째 블록을 HKDF-SHA256으로 확장, verifier와 독립
//!   (노트 키 하나를 추측하는 비용도 verifier와 같은 반복 횟수)
//! - 노트 blob: base64(nonce(24) || XChaCha20-Poly1305 암호문+태그)
//!
//! AAD: 포맷 태그를 AAD로 사용 (포맷 바인딩)

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    XChaCha20Poly1305, XNonce,
};
use hkdf::Hkdf;
use rand::Rng;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, Zeroizing};

use crate::error::VaultError;

/// salt 길이
pub const SALT_LEN: usize = 32;

/// verifier 길이 (256-bit)
pub const VERIFIER_LEN: usize = 32;

/// PBKDF2 반복 횟수 (저장된 verifier와 호환되어야 하므로 고정)
pub const PBKDF2_ITERATIONS: u32 = 10_000;

/// 노트 키 길이 (256-bit)
pub const NOTE_KEY_LEN: usize = 32;

/// Nonce 길이 (XChaCha20-Poly1305용 24 bytes)
pub const NONCE_LEN: usize = 24;

/// 노트 blob 포맷 태그
const NOTE_AAD: &[u8] = b"SVNOTE01";

/// HKDF info (노트 키 용도 분리)
const NOTE_KEY_INFO: &[u8] = b"secure-vault/note-key/v1";

/// Zeroize가 적용된 노트 키 래퍼
#[derive(Clone)]
pub struct NoteKey {
    bytes: [u8; NOTE_KEY_LEN],
}

impl NoteKey {
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != NOTE_KEY_LEN {
            return None;
        }
        let mut key = [0u8; NOTE_KEY_LEN];
        key.copy_from_slice(bytes);
        Some(Self { bytes: key })
    }

    pub fn as_bytes(&self) -> &[u8; NOTE_KEY_LEN] {
        &self.bytes
    }

    pub fn to_base64(&self) -> Zeroizing<String> {
        Zeroizing::new(BASE64.encode(self.bytes))
    }

    pub fn from_base64(encoded: &str) -> Option<Self> {
        let bytes = Zeroizing::new(BASE64.decode(encoded).ok()?);
        Self::from_slice(&bytes)
    }
}

impl Drop for NoteKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for NoteKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("NoteKey(..)")
    }
}

/// 새 salt 생성 (CSPRNG)
pub fn generate_salt() -> Vec<u8> {
    let mut salt = vec![0u8; SALT_LEN];
    rand::thread_rng().fill(salt.as_mut_slice());
    salt
}

/// PIN verifier 계산 (결정적, 느린 KDF)
pub fn derive_verifier(pin: &str, salt: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; VERIFIER_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(pin.as_bytes(), salt, PBKDF2_ITERATIONS, &mut out);
    out
}

/// 상수 시간 바이트 비교 (길이가 다르면 false)
pub fn verifiers_match(expected: &[u8], actual: &[u8]) -> bool {
    expected.ct_eq(actual).into()
}

/// 검증된 PIN에서 노트 키 유도
///
/// PBKDF2 출력의 첫 블록은 verifier이므로 두 번째 블록만 키 재료로 사용합니다.
pub fn derive_note_key(pin: &str, salt: &[u8]) -> Result<NoteKey, VaultError> {
    let mut stretched = Zeroizing::new([0u8; VERIFIER_LEN * 2]);
    pbkdf2::pbkdf2_hmac::<Sha256>(pin.as_bytes(), salt, PBKDF2_ITERATIONS, &mut *stretched);

    let hkdf = Hkdf::<Sha256>::new(Some(salt), &stretched[VERIFIER_LEN..]);
    let mut okm = [0u8; NOTE_KEY_LEN];
    hkdf.expand(NOTE_KEY_INFO, &mut okm)
        .map_err(|e| VaultError::Crypto(e.to_string()))?;
    let key = NoteKey { bytes: okm };
    okm.zeroize();
    Ok(key)
}

/// 평문을 노트 키로 암호화하여 blob 문자열 생성
pub fn seal(key: &NoteKey, plaintext: &[u8]) -> Result<String, VaultError> {
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill(&mut nonce);

    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());
    let ciphertext = cipher
        .encrypt(
            XNonce::from_slice(&nonce),
            Payload {
                msg: plaintext,
                aad: NOTE_AAD,
            },
        )
        .map_err(|e| VaultError::Crypto(format!("Encryption failed: {}", e)))?;

    let mut framed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    framed.extend_from_slice(&nonce);
    framed.extend_from_slice(&ciphertext);
    Ok(BASE64.encode(framed))
}

/// blob을 복호화 (인증 실패/포맷 오류는 `CorruptNote`)
pub fn open(key: &NoteKey, blob: &str) -> Result<Zeroizing<Vec<u8>>, VaultError> {
    let framed = BASE64
        .decode(blob)
        .map_err(|e| VaultError::CorruptNote(format!("invalid encoding: {}", e)))?;
    if framed.len() <= NONCE_LEN {
        return Err(VaultError::CorruptNote("blob too short".to_string()));
    }

    let (nonce, ciphertext) = framed.split_at(NONCE_LEN);
    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());
    let plaintext = cipher
        .decrypt(
            XNonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad: NOTE_AAD,
            },
        )
        .map_err(|_| VaultError::CorruptNote("authentication failed".to_string()))?;

    Ok(Zeroizing::new(plaintext))
}
