//! Lockout Policy
//!
//! 연속 실패 횟수와 잠금 만료 시각은 볼트 레코드 안에 영구 저장됩니다.
//! 잠금 시간이 지나도 실패 카운터는 성공 전까지 유지됩니다.

use crate::config::VaultConfig;
use crate::vault::record::VaultRecord;

/// 잠금 해제 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockState {
    /// 볼트 없음
    Uninitialized,
    Locked,
    LockedOut { until: i64 },
    Unlocked,
}

/// PIN 불일치 처리 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    Retry { attempts_remaining: u32 },
    LockedOut { duration_seconds: u64 },
}

#[derive(Debug, Clone, Copy)]
pub struct LockoutPolicy {
    max_failed_attempts: u32,
    lockout_duration_millis: i64,
}

impl LockoutPolicy {
    pub fn new(config: &VaultConfig) -> Self {
        Self {
            max_failed_attempts: config.max_failed_attempts,
            lockout_duration_millis: config.lockout_duration_millis(),
        }
    }

    /// 남은 잠금 시간 (초, 올림). 잠겨있지 않으면 0
    pub fn seconds_remaining(&self, record: &VaultRecord, now: i64) -> u64 {
        match record.lockout_until {
            Some(until) if until > now => ((until - now) as u64).div_ceil(1000),
            _ => 0,
        }
    }

    pub fn is_locked_out(&self, record: &VaultRecord, now: i64) -> bool {
        matches!(record.lockout_until, Some(until) if until > now)
    }

    /// 실패 1회 기록. 임계값에 도달하면 잠금 시작
    pub fn register_failure(&self, record: &mut VaultRecord, now: i64) -> FailureOutcome {
        record.failed_attempts = record.failed_attempts.saturating_add(1);

        if record.failed_attempts >= self.max_failed_attempts {
            record.lockout_until = Some(now + self.lockout_duration_millis);
            FailureOutcome::LockedOut {
                duration_seconds: (self.lockout_duration_millis / 1000) as u64,
            }
        } else {
            FailureOutcome::Retry {
                attempts_remaining: self.max_failed_attempts - record.failed_attempts,
            }
        }
    }

    pub fn register_success(&self, record: &mut VaultRecord) {
        record.failed_attempts = 0;
        record.lockout_until = None;
    }
}
