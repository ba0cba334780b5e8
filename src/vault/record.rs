//! Vault Record
//!
//! 영구 저장소에 하나만 존재하는 볼트 레코드. JSON 필드명은 외부 포맷과 동일하게 유지합니다.
//! 노트는 암호문 blob으로만 저장됩니다.

use serde::{Deserialize, Serialize};

use crate::error::VaultError;
use crate::vault::crypto::VERIFIER_LEN;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultRecord {
    pub initialized: bool,
    #[serde(with = "b64")]
    pub salt: Vec<u8>,
    #[serde(with = "b64")]
    pub pin_verifier: Vec<u8>,
    #[serde(default)]
    pub failed_attempts: u32,
    #[serde(default)]
    pub lockout_until: Option<i64>,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub created_at: i64,
}

impl VaultRecord {
    pub fn new(salt: Vec<u8>, pin_verifier: Vec<u8>, now: i64) -> Self {
        Self {
            initialized: true,
            salt,
            pin_verifier,
            failed_attempts: 0,
            lockout_until: None,
            notes: Vec::new(),
            created_at: now,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, VaultError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, VaultError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, VaultError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// 초기화된 레코드라면 salt/verifier가 비어있지 않아야 함
    pub fn check_consistency(&self) -> Result<(), String> {
        if !self.initialized {
            return Err("vault is not marked as initialized".to_string());
        }
        if self.salt.is_empty() {
            return Err("salt is empty".to_string());
        }
        if self.pin_verifier.len() != VERIFIER_LEN {
            return Err(format!(
                "pinVerifier must be {} bytes, got {}",
                VERIFIER_LEN,
                self.pin_verifier.len()
            ));
        }
        Ok(())
    }
}

/// 바이트 필드를 base64 문자열로 직렬화
mod b64 {
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        BASE64.decode(encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> VaultRecord {
        VaultRecord::new(vec![7u8; 32], vec![9u8; VERIFIER_LEN], 1_700_000_000_000)
    }

    #[test]
    fn test_json_field_names() {
        let json = serde_json::to_value(sample()).unwrap();
        let obj = json.as_object().unwrap();
        for field in [
            "initialized",
            "salt",
            "pinVerifier",
            "failedAttempts",
            "lockoutUntil",
            "notes",
            "createdAt",
        ] {
            assert!(obj.contains_key(field), "missing {}", field);
        }
        assert_eq!(obj.len(), 7);
        assert!(json["lockoutUntil"].is_null());
        assert!(json["salt"].is_string());
    }

    #[test]
    fn test_optional_fields_default() {
        let record = sample();
        let json = format!(
            r#"{{"initialized":true,"salt":"{}","pinVerifier":"{}"}}"#,
            serde_json::to_value(&record).unwrap()["salt"].as_str().unwrap(),
            serde_json::to_value(&record).unwrap()["pinVerifier"].as_str().unwrap(),
        );
        let parsed = VaultRecord::from_json(&json).unwrap();
        assert_eq!(parsed.salt, record.salt);
        assert_eq!(parsed.failed_attempts, 0);
        assert_eq!(parsed.lockout_until, None);
        assert!(parsed.notes.is_empty());
        assert!(parsed.check_consistency().is_ok());
    }

    #[test]
    fn test_consistency_rejects_bad_verifier() {
        let mut record = sample();
        record.pin_verifier.truncate(4);
        assert!(record.check_consistency().is_err());

        let mut record = sample();
        record.initialized = false;
        assert!(record.check_consistency().is_err());
    }

    #[test]
    fn test_invalid_base64_fails_to_parse() {
        let json = r#"{"initialized":true,"salt":"@@@","pinVerifier":"AAAA"}"#;
        assert!(matches!(VaultRecord::from_json(json), Err(VaultError::Serialization(_))));
    }
}
