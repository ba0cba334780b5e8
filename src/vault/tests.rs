use std::sync::Arc;

use crate::clock::ManualClock;
use crate::config::VaultConfig;
use crate::error::VaultError;
use crate::models::Note;
use crate::storage::{MemoryStorage, StorageBackend};
use crate::vault::crypto::{derive_note_key, generate_salt};
use crate::vault::notes::seal_note;
use crate::vault::{SecureVault, UnlockState, VaultRecord};

const T0: i64 = 1_700_000_000_000;

struct Harness {
    vault: SecureVault,
    clock: Arc<ManualClock>,
    durable: Arc<MemoryStorage>,
    ephemeral: Arc<MemoryStorage>,
}

impl Harness {
    fn new() -> Self {
        let durable = Arc::new(MemoryStorage::new());
        let ephemeral = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::new(T0));
        let vault = SecureVault::new(
            Box::new(durable.clone()),
            Box::new(ephemeral.clone()),
            VaultConfig::default(),
            clock.clone(),
        );
        Self {
            vault,
            clock,
            durable,
            ephemeral,
        }
    }

    fn unlocked(pin: &str) -> Self {
        let h = Self::new();
        h.vault.initialize_vault(pin).unwrap();
        h.vault.unlock_vault(pin).unwrap();
        h
    }

    /// 같은 저장소를 보는 두 번째 볼트 인스턴스
    fn sibling(&self) -> SecureVault {
        SecureVault::new(
            Box::new(self.durable.clone()),
            Box::new(self.ephemeral.clone()),
            VaultConfig::default(),
            self.clock.clone(),
        )
    }

    fn record(&self) -> VaultRecord {
        VaultRecord::from_json(&self.durable.get("secureVault").unwrap().unwrap()).unwrap()
    }

    fn write_record(&self, record: &VaultRecord) {
        self.durable
            .set("secureVault", &record.to_json().unwrap())
            .unwrap();
    }
}

fn foreign_blob(id: &str) -> String {
    let key = derive_note_key("not-the-pin", &generate_salt()).unwrap();
    let note = Note {
        id: id.to_string(),
        title: "foreign".to_string(),
        content: String::new(),
        category: "General".to_string(),
        created_at: 0,
        updated_at: 0,
    };
    seal_note(&key, &note).unwrap()
}

#[test]
fn test_lockout_scenario() {
    let h = Harness::new();
    h.vault.initialize_vault("1234").unwrap();

    assert!(matches!(
        h.vault.unlock_vault("0000"),
        Err(VaultError::InvalidPin { attempts_remaining: 4 })
    ));
    for expected in [3, 2, 1] {
        match h.vault.unlock_vault("0000") {
            Err(VaultError::InvalidPin { attempts_remaining }) => {
                assert_eq!(attempts_remaining, expected)
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
    assert!(matches!(
        h.vault.unlock_vault("0000"),
        Err(VaultError::LockedOutNow { duration_seconds: 300 })
    ));

    // 올바른 PIN이라도 잠금 시간 내에는 거부
    assert!(matches!(
        h.vault.unlock_vault("1234"),
        Err(VaultError::LockedOut { seconds_remaining: 300 })
    ));
    assert!(h.vault.is_vault_locked());
    assert!(h.vault.get_lockout_time_remaining() > 0);
    assert!(!h.vault.is_session_active());
    assert_eq!(
        h.vault.unlock_state(),
        UnlockState::LockedOut { until: T0 + 300_000 }
    );
}

#[test]
fn test_locked_out_attempts_are_not_consumed() {
    let h = Harness::new();
    h.vault.initialize_vault("1234").unwrap();
    for _ in 0..5 {
        let _ = h.vault.unlock_vault("0000");
    }
    assert_eq!(h.record().failed_attempts, 5);

    h.clock.advance_secs(10);
    assert!(matches!(
        h.vault.unlock_vault("0000"),
        Err(VaultError::LockedOut { seconds_remaining: 290 })
    ));
    assert_eq!(h.record().failed_attempts, 5);
    assert_eq!(h.record().lockout_until, Some(T0 + 300_000));
}

#[test]
fn test_lockout_expiry_allows_correct_pin() {
    let h = Harness::new();
    h.vault.initialize_vault("1234").unwrap();
    for _ in 0..5 {
        let _ = h.vault.unlock_vault("0000");
    }

    h.clock.advance_secs(300);
    assert!(!h.vault.is_vault_locked());
    assert_eq!(h.vault.get_lockout_time_remaining(), 0);

    h.vault.unlock_vault("1234").unwrap();
    let record = h.record();
    assert_eq!(record.failed_attempts, 0);
    assert_eq!(record.lockout_until, None);
    assert!(h.vault.is_session_active());
    assert_eq!(h.vault.unlock_state(), UnlockState::Unlocked);
}

#[test]
fn test_wrong_pin_after_expired_lockout_relocks() {
    let h = Harness::new();
    h.vault.initialize_vault("1234").unwrap();
    for _ in 0..5 {
        let _ = h.vault.unlock_vault("0000");
    }

    h.clock.advance_secs(301);
    assert!(matches!(
        h.vault.unlock_vault("0000"),
        Err(VaultError::LockedOutNow { duration_seconds: 300 })
    ));
}

#[test]
fn test_success_resets_failed_attempts() {
    let h = Harness::new();
    h.vault.initialize_vault("1234").unwrap();
    let _ = h.vault.unlock_vault("1111");
    let _ = h.vault.unlock_vault("2222");
    assert_eq!(h.record().failed_attempts, 2);

    h.vault.unlock_vault("1234").unwrap();
    assert_eq!(h.record().failed_attempts, 0);

    h.vault.lock_vault();
    assert!(matches!(
        h.vault.unlock_vault("0000"),
        Err(VaultError::InvalidPin { attempts_remaining: 4 })
    ));
}

#[test]
fn test_session_expiry_boundaries() {
    let h = Harness::unlocked("1234");
    let lifetime = 30 * 60;

    h.clock.advance_secs(lifetime - 1);
    assert!(h.vault.add_secure_note("still valid", "", "General").is_ok());
    assert_eq!(h.vault.get_session_time_remaining(), 1);

    h.clock.advance_secs(2);
    assert!(matches!(
        h.vault.add_secure_note("too late", "", "General"),
        Err(VaultError::NotUnlocked)
    ));
    assert!(!h.vault.is_session_active());
    assert!(h.ephemeral.is_empty());
    assert_eq!(h.vault.unlock_state(), UnlockState::Locked);
}

#[test]
fn test_lock_is_idempotent() {
    let h = Harness::unlocked("1234");
    h.vault.lock_vault();
    h.vault.lock_vault();
    assert!(!h.vault.is_session_active());
    assert!(matches!(h.vault.get_all_secure_notes(), Err(VaultError::NotUnlocked)));
}

#[test]
fn test_note_crud_flow() {
    let h = Harness::unlocked("1234");

    let first = h.vault.add_secure_note("Bank", "acct 42", "finance").unwrap();
    h.clock.advance_secs(5);
    let second = h.vault.add_secure_note("  Wifi  ", "hunter2", "Unknown").unwrap();

    let notes = h.vault.get_all_secure_notes().unwrap();
    assert_eq!(notes.len(), 2);
    assert_eq!(notes[0].id, second);
    assert_eq!(notes[0].title, "Wifi");
    assert_eq!(notes[0].category, "General");
    assert_eq!(notes[1].id, first);
    assert_eq!(notes[1].category, "Finance");

    h.clock.advance_secs(5);
    h.vault
        .update_secure_note(&first, "Bank (new)", "acct 43", "Finance")
        .unwrap();

    let notes = h.vault.get_all_secure_notes().unwrap();
    assert_eq!(notes[0].id, first);
    assert_eq!(notes[0].title, "Bank (new)");
    assert_eq!(notes[0].content, "acct 43");
    assert_eq!(notes[0].created_at, T0);
    assert_eq!(notes[0].updated_at, T0 + 10_000);

    assert_eq!(h.vault.get_secure_note(&second).unwrap().content, "hunter2");

    h.vault.delete_secure_note(&second).unwrap();
    let notes = h.vault.get_all_secure_notes().unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].id, first);
    assert_eq!(h.record().notes.len(), 1);
}

#[test]
fn test_notes_are_stored_encrypted() {
    let h = Harness::unlocked("482916");
    h.vault
        .add_secure_note("Diary", "very secret content", "Personal")
        .unwrap();

    let durable = h.durable.get("secureVault").unwrap().unwrap();
    assert!(!durable.contains("very secret content"));
    assert!(!durable.contains("Diary"));
    assert!(!durable.contains("482916"));

    let session = h.ephemeral.get("vaultSession").unwrap().unwrap();
    assert!(!session.contains("482916"));
}

#[test]
fn test_empty_title_is_rejected() {
    let h = Harness::unlocked("1234");
    assert!(matches!(
        h.vault.add_secure_note("   ", "body", "General"),
        Err(VaultError::InvalidNote(_))
    ));
    let id = h.vault.add_secure_note("ok", "body", "General").unwrap();
    assert!(matches!(
        h.vault.update_secure_note(&id, "", "body", "General"),
        Err(VaultError::InvalidNote(_))
    ));
    assert!(h.record().notes.len() == 1);
}

#[test]
fn test_note_operations_require_session() {
    let h = Harness::new();
    h.vault.initialize_vault("1234").unwrap();

    assert!(matches!(h.vault.add_secure_note("t", "", ""), Err(VaultError::NotUnlocked)));
    assert!(matches!(h.vault.get_all_secure_notes(), Err(VaultError::NotUnlocked)));
    assert!(matches!(
        h.vault.update_secure_note("x", "t", "", ""),
        Err(VaultError::NotUnlocked)
    ));
    assert!(matches!(h.vault.delete_secure_note("x"), Err(VaultError::NotUnlocked)));
    assert!(matches!(h.vault.get_vault_stats(), Err(VaultError::NotUnlocked)));
}

#[test]
fn test_corrupt_note_is_skipped() {
    let h = Harness::unlocked("1234");
    let id = h.vault.add_secure_note("valid", "body", "Work").unwrap();

    let mut record = h.record();
    record.notes.insert(0, foreign_blob("intruder"));
    record.notes.push("definitely not ciphertext".to_string());
    h.write_record(&record);

    let notes = h.vault.get_all_secure_notes().unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].id, id);

    // 손상된 blob이 앞에 있어도 수정/삭제는 정상 동작
    h.vault.update_secure_note(&id, "renamed", "body", "Work").unwrap();
    assert_eq!(h.vault.get_all_secure_notes().unwrap()[0].title, "renamed");
    h.vault.delete_secure_note(&id).unwrap();

    assert!(h.vault.get_all_secure_notes().unwrap().is_empty());
    assert_eq!(h.record().notes.len(), 2);
}

#[test]
fn test_update_and_delete_missing_note() {
    let h = Harness::unlocked("1234");
    h.vault.add_secure_note("a", "", "").unwrap();

    assert!(matches!(
        h.vault.update_secure_note("nope", "t", "", ""),
        Err(VaultError::NoteNotFound(id)) if id == "nope"
    ));
    assert!(matches!(
        h.vault.delete_secure_note("nope"),
        Err(VaultError::NoteNotFound(_))
    ));
    assert!(matches!(
        h.vault.get_secure_note("intruder"),
        Err(VaultError::NoteNotFound(_))
    ));
}

#[test]
fn test_stale_index_falls_back_to_scan() {
    let h = Harness::unlocked("1234");
    let a = h.vault.add_secure_note("a", "", "").unwrap();
    let b = h.vault.add_secure_note("b", "", "").unwrap();
    let c = h.vault.add_secure_note("c", "", "").unwrap();

    // 다른 인스턴스가 앞쪽 노트를 지워 위치가 밀림
    let other = h.sibling();
    other.delete_secure_note(&a).unwrap();

    h.vault.update_secure_note(&c, "c2", "", "").unwrap();
    h.vault.delete_secure_note(&b).unwrap();

    let notes = h.vault.get_all_secure_notes().unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].id, c);
    assert_eq!(notes[0].title, "c2");
}

#[test]
fn test_vault_stats() {
    let h = Harness::unlocked("1234");
    h.vault.add_secure_note("a", "", "Work").unwrap();
    h.vault.add_secure_note("b", "", "work").unwrap();
    h.vault.add_secure_note("c", "", "Ideas").unwrap();

    let stats = h.vault.get_vault_stats().unwrap();
    assert_eq!(stats.total_notes, 3);
    assert_eq!(stats.category_counts.get("Work"), Some(&2));
    assert_eq!(stats.category_counts.get("Ideas"), Some(&1));
    assert_eq!(stats.category_counts.get("General"), None);
    assert_eq!(stats.created_at, T0);
}

#[test]
fn test_not_initialized_errors() {
    let h = Harness::new();
    assert!(!h.vault.is_vault_initialized());
    assert!(!h.vault.is_vault_locked());
    assert_eq!(h.vault.get_lockout_time_remaining(), 0);
    assert_eq!(h.vault.unlock_state(), UnlockState::Uninitialized);
    assert!(matches!(h.vault.unlock_vault("1234"), Err(VaultError::NotInitialized)));
    assert!(matches!(h.vault.verify_pin("1234"), Err(VaultError::NotInitialized)));
    assert!(matches!(h.vault.export_vault_data(), Err(VaultError::NotInitialized)));
}

#[test]
fn test_initialize_rules() {
    let h = Harness::new();
    assert!(matches!(h.vault.initialize_vault(""), Err(VaultError::InvalidPinFormat)));
    h.vault.initialize_vault("1234").unwrap();
    assert!(matches!(
        h.vault.initialize_vault("5678"),
        Err(VaultError::AlreadyInitialized)
    ));

    let record = h.record();
    assert!(record.initialized);
    assert_eq!(record.salt.len(), 32);
    assert_eq!(record.pin_verifier.len(), 32);
    assert_eq!(record.created_at, T0);
    assert!(h.vault.verify_pin("1234").unwrap());
    assert!(!h.vault.verify_pin("5678").unwrap());
    assert_eq!(h.vault.unlock_state(), UnlockState::Locked);
}

#[test]
fn test_verify_pin_has_no_side_effects() {
    let h = Harness::new();
    h.vault.initialize_vault("1234").unwrap();
    for _ in 0..10 {
        assert!(!h.vault.verify_pin("0000").unwrap());
    }
    assert_eq!(h.record().failed_attempts, 0);
    assert!(!h.vault.is_session_active());
}

#[test]
fn test_reset_is_total() {
    let h = Harness::unlocked("1234");
    h.vault.add_secure_note("a", "", "").unwrap();

    h.vault.reset_vault().unwrap();
    assert!(!h.vault.is_vault_initialized());
    assert!(!h.vault.is_session_active());
    assert!(h.durable.is_empty());

    h.vault.initialize_vault("9999").unwrap();
    h.vault.unlock_vault("9999").unwrap();
    assert!(h.vault.get_all_secure_notes().unwrap().is_empty());
}

#[test]
fn test_reset_without_pin_clears_lockout() {
    let h = Harness::new();
    h.vault.initialize_vault("1234").unwrap();
    for _ in 0..5 {
        let _ = h.vault.unlock_vault("0000");
    }
    assert!(h.vault.is_vault_locked());

    h.vault.reset_vault().unwrap();
    h.vault.reset_vault().unwrap();
    assert!(!h.vault.is_vault_locked());
    h.vault.initialize_vault("4321").unwrap();
    h.vault.unlock_vault("4321").unwrap();
}

#[test]
fn test_export_import_roundtrip() {
    let h = Harness::unlocked("1234");
    h.vault.add_secure_note("keep me", "safe", "Personal").unwrap();

    let export = h.vault.export_vault_data().unwrap();
    assert_eq!(export.filename, "secure-vault-backup-2023-11-14.json");
    assert!(!export.data.contains("keep me"));

    assert!(matches!(
        h.vault.import_vault_data(&export.data),
        Err(VaultError::VaultAlreadyExists)
    ));

    h.vault.reset_vault().unwrap();
    h.vault.import_vault_data(&export.data).unwrap();
    assert!(h.vault.is_vault_initialized());
    assert!(!h.vault.is_session_active());

    h.vault.unlock_vault("1234").unwrap();
    let notes = h.vault.get_all_secure_notes().unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].title, "keep me");
    assert_eq!(h.record().created_at, T0);
}

#[test]
fn test_import_rejects_malformed_backup() {
    let h = Harness::new();

    for payload in [
        "not json",
        "[1, 2, 3]",
        r#"{"initialized":true,"salt":"AAAA"}"#,
        r#"{"salt":"AAAA","pinVerifier":"AAAA"}"#,
        r#"{"initialized":true,"salt":"AAAA","pinVerifier":"AAAA"}"#,
        r#"{"initialized":false,"salt":"AAAA","pinVerifier":"AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA="}"#,
        r#"{"initialized":true,"salt":"AAAA","pinVerifier":"AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=","notes":"oops"}"#,
    ] {
        assert!(
            matches!(
                h.vault.import_vault_data(payload),
                Err(VaultError::InvalidBackupFormat(_))
            ),
            "payload accepted: {}",
            payload
        );
    }
    assert!(h.durable.is_empty());
}

#[test]
fn test_change_pin_reencrypts_notes() {
    let h = Harness::unlocked("1234");
    let id = h.vault.add_secure_note("note", "body", "").unwrap();
    let mut record = h.record();
    record.notes.push(foreign_blob("orphan"));
    h.write_record(&record);
    let old_salt = record.salt.clone();
    let old_verifier = record.pin_verifier.clone();

    assert!(matches!(
        h.vault.change_pin("0000", "5678"),
        Err(VaultError::InvalidPin { attempts_remaining: 4 })
    ));
    assert!(matches!(h.vault.change_pin("1234", ""), Err(VaultError::InvalidPinFormat)));

    h.vault.change_pin("1234", "5678").unwrap();
    let record = h.record();
    assert_eq!(record.salt, old_salt);
    assert_ne!(record.pin_verifier, old_verifier);
    assert_eq!(record.failed_attempts, 0);
    assert_eq!(record.notes.len(), 2);

    assert_eq!(h.vault.get_all_secure_notes().unwrap()[0].id, id);

    h.vault.lock_vault();
    assert!(matches!(
        h.vault.unlock_vault("1234"),
        Err(VaultError::InvalidPin { .. })
    ));
    h.vault.unlock_vault("5678").unwrap();
    assert_eq!(h.vault.get_secure_note(&id).unwrap().content, "body");
}

#[test]
fn test_unreadable_record_still_counts_as_existing() {
    let h = Harness::new();
    h.durable.set("secureVault", "{corrupted").unwrap();

    assert!(matches!(
        h.vault.initialize_vault("1234"),
        Err(VaultError::AlreadyInitialized)
    ));

    let donor = Harness::new();
    donor.vault.initialize_vault("1234").unwrap();
    let backup = donor.vault.export_vault_data().unwrap();
    assert!(matches!(
        h.vault.import_vault_data(&backup.data),
        Err(VaultError::VaultAlreadyExists)
    ));
    assert_eq!(h.durable.get("secureVault").unwrap().unwrap(), "{corrupted");

    h.vault.reset_vault().unwrap();
    h.vault.import_vault_data(&backup.data).unwrap();
    h.vault.unlock_vault("1234").unwrap();
}

#[test]
fn test_change_pin_lockout_ends_session() {
    let h = Harness::unlocked("1234");
    for _ in 0..4 {
        let _ = h.vault.change_pin("0000", "5678");
    }
    assert!(matches!(
        h.vault.change_pin("0000", "5678"),
        Err(VaultError::LockedOutNow { .. })
    ));
    assert!(!h.vault.is_session_active());
    assert!(matches!(h.vault.unlock_vault("1234"), Err(VaultError::LockedOut { .. })));
}

#[test]
fn test_sqlite_backed_vault_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = VaultConfig::default().with_db_path(dir.path().join("vault.db"));

    let id = {
        let vault = SecureVault::open(config.clone()).unwrap();
        vault.initialize_vault("2468").unwrap();
        vault.unlock_vault("2468").unwrap();
        vault.add_secure_note("persisted", "on disk", "Work").unwrap()
    };

    // 세션은 프로세스 스코프라 새 인스턴스에서는 잠겨 있어야 함
    let vault = SecureVault::open(config).unwrap();
    assert!(vault.is_vault_initialized());
    assert!(!vault.is_session_active());

    vault.unlock_vault("2468").unwrap();
    let notes = vault.get_all_secure_notes().unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].id, id);
}

#[test]
fn test_open_requires_db_path() {
    assert!(matches!(
        SecureVault::open(VaultConfig::default()),
        Err(VaultError::Storage(_))
    ));
}
