//! Storage Schema
//!
//! SQLite key/value 테이블 스키마 정의

/// 저장소 스키마 생성 SQL
pub const CREATE_SCHEMA: &str = r#"
-- key/value 테이블 (값은 JSON 문자열 전체)
CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);
"#;
