//! Note Store 헬퍼
//!
//! 노트 하나 = blob 하나. 노트마다 독립적으로 암호화되므로 손상된 blob 하나가
//! 나머지 노트 접근을 막지 않습니다.

use std::collections::HashMap;

use crate::error::VaultError;
use crate::models::Note;
use crate::vault::crypto::{self, NoteKey};

/// 노트를 JSON으로 직렬화해 암호화
pub fn seal_note(key: &NoteKey, note: &Note) -> Result<String, VaultError> {
    let plaintext = zeroize::Zeroizing::new(serde_json::to_vec(note)?);
    crypto::seal(key, &plaintext)
}

/// blob을 복호화해 노트로 복원 (실패는 모두 `CorruptNote`)
pub fn open_note(key: &NoteKey, blob: &str) -> Result<Note, VaultError> {
    let plaintext = crypto::open(key, blob)?;
    let note: Note = serde_json::from_slice(&plaintext)
        .map_err(|e| VaultError::CorruptNote(format!("invalid note payload: {}", e)))?;

    if note.id.is_empty() {
        return Err(VaultError::CorruptNote("note has no id".to_string()));
    }
    Ok(note)
}

/// 복호화 가능한 노트만 (위치, 노트)로 반환. 손상된 blob은 로그 후 건너뜀
pub fn decrypt_all(key: &NoteKey, blobs: &[String]) -> Vec<(usize, Note)> {
    blobs
        .iter()
        .enumerate()
        .filter_map(|(position, blob)| match open_note(key, blob) {
            Ok(note) => Some((position, note)),
            Err(e) => {
                log::warn!("[SecureVault] Skipping note at position {}: {}", position, e);
                None
            }
        })
        .collect()
}

/// id로 노트 찾기. 인덱스 힌트를 먼저 확인하고, 빗나가면 선형 스캔
pub fn find_note(
    key: &NoteKey,
    blobs: &[String],
    id: &str,
    hint: Option<usize>,
) -> Option<(usize, Note)> {
    if let Some(position) = hint {
        if let Some(Ok(note)) = blobs.get(position).map(|blob| open_note(key, blob)) {
            if note.id == id {
                return Some((position, note));
            }
        }
        log::debug!("[SecureVault] Stale index entry for note {}, rescanning", id);
    }

    for (position, blob) in blobs.iter().enumerate() {
        if Some(position) == hint {
            continue;
        }
        match open_note(key, blob) {
            Ok(note) if note.id == id => return Some((position, note)),
            Ok(_) => {}
            Err(e) => log::warn!("[SecureVault] Skipping note at position {}: {}", position, e),
        }
    }
    None
}

/// 노트 id → blob 위치 인덱스 (메모리 전용, 평문은 id만 보관)
#[derive(Debug, Default)]
pub struct NoteIndex {
    positions: HashMap<String, usize>,
}

impl NoteIndex {
    pub fn rebuild<'a>(&mut self, entries: impl IntoIterator<Item = (usize, &'a str)>) {
        self.positions.clear();
        for (position, id) in entries {
            self.positions.insert(id.to_string(), position);
        }
    }

    pub fn clear(&mut self) {
        self.positions.clear();
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn insert(&mut self, id: &str, position: usize) {
        self.positions.insert(id.to_string(), position);
    }

    /// 삭제된 위치 뒤의 항목을 한 칸씩 당김
    pub fn remove_at(&mut self, id: &str, position: usize) {
        self.positions.remove(id);
        for value in self.positions.values_mut() {
            if *value > position {
                *value -= 1;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
