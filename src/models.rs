//! Secure Vault Data Models
//!
//! 호스트 앱(UI)과 주고받는 데이터 모델. JSON 필드명은 camelCase.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// 복호화된 노트 (메모리에서만 존재, 캐시하지 않음)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// 노트 카테고리 (고정 목록)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum NoteCategory {
    #[default]
    General,
    Personal,
    Work,
    Finance,
    Health,
    Passwords,
    Ideas,
}

impl NoteCategory {
    pub const ALL: [NoteCategory; 7] = [
        NoteCategory::General,
        NoteCategory::Personal,
        NoteCategory::Work,
        NoteCategory::Finance,
        NoteCategory::Health,
        NoteCategory::Passwords,
        NoteCategory::Ideas,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NoteCategory::General => "General",
            NoteCategory::Personal => "Personal",
            NoteCategory::Work => "Work",
            NoteCategory::Finance => "Finance",
            NoteCategory::Health => "Health",
            NoteCategory::Passwords => "Passwords",
            NoteCategory::Ideas => "Ideas",
        }
    }

    /// 대소문자 무시 매칭, 알 수 없는 값/빈 값은 `General`
    pub fn normalize(raw: &str) -> Self {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(raw))
            .unwrap_or_default()
    }
}

impl fmt::Display for NoteCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 잠금 해제 성공 시 반환되는 세션 정보 (키 자료는 포함하지 않음)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub created_at: i64,
    pub expires_at: i64,
}

/// 볼트 통계
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultStats {
    pub total_notes: usize,
    pub category_counts: BTreeMap<String, usize>,
    pub created_at: i64,
}

/// 백업 내보내기 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultExport {
    pub data: String,
    pub filename: String,
}
