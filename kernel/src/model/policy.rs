use chrono::{DateTime, Duration, Utc};
use shared::error::{AppError, AppResult};

/// 予約ポリシー。呼び出しごとに明示的に渡される設定値であり、
/// プロセスグローバルな状態からは読まない。
/// 未設定の項目は「制限なし」を意味する。
#[derive(Debug, Clone, Copy, Default)]
pub struct BookingPolicy {
    pub min_lead_time_hours: Option<i64>,
    pub max_duration_hours: Option<i64>,
    pub buffer_minutes: i64,
}

impl BookingPolicy {
    /// 予約リクエストがポリシーを満たしているか検査する。
    /// 違反した場合は、どのルールに反したかが分かるエラーを返す。
    pub fn check(
        &self,
        now: DateTime<Utc>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<()> {
        if let Some(hours) = self.min_lead_time_hours {
            if start < now + Duration::hours(hours) {
                return Err(AppError::PolicyViolation(format!(
                    "予約は開始時刻の{hours}時間前までに行う必要があります。"
                )));
            }
        }
        if let Some(hours) = self.max_duration_hours {
            if end - start > Duration::hours(hours) {
                return Err(AppError::PolicyViolation(format!(
                    "予約時間は最大{hours}時間までです。"
                )));
            }
        }
        Ok(())
    }

    pub fn buffer(&self) -> Duration {
        Duration::minutes(self.buffer_minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 基準時刻を 1 回だけ取り、すべての時刻をそこから導出する。
    // 呼び出しごとに Utc::now() を取り直すと、区間長がマイクロ秒単位で
    // ずれて上限ちょうどの境界判定が狂う
    fn at(now: DateTime<Utc>, hours_from_now: i64) -> DateTime<Utc> {
        now + Duration::hours(hours_from_now)
    }

    #[test]
    fn default_policy_allows_anything() {
        let policy = BookingPolicy::default();
        let now = Utc::now();
        assert!(policy.check(now, at(now, 0), at(now, 100)).is_ok());
        assert_eq!(policy.buffer(), Duration::zero());
    }

    #[test]
    fn min_lead_time_is_enforced() {
        let policy = BookingPolicy {
            min_lead_time_hours: Some(2),
            ..Default::default()
        };
        let now = Utc::now();
        assert!(matches!(
            policy.check(now, at(now, 1), at(now, 3)),
            Err(AppError::PolicyViolation(_))
        ));
        // リードタイムちょうどは許可される
        assert!(policy.check(now, at(now, 2), at(now, 4)).is_ok());
        assert!(policy.check(now, at(now, 3), at(now, 5)).is_ok());
    }

    #[test]
    fn max_duration_is_enforced() {
        let policy = BookingPolicy {
            max_duration_hours: Some(12),
            ..Default::default()
        };
        let now = Utc::now();
        assert!(matches!(
            policy.check(now, at(now, 1), at(now, 14)),
            Err(AppError::PolicyViolation(_))
        ));
        // ちょうど上限（12 時間ぴったり）はポリシー違反にならない
        assert!(policy.check(now, at(now, 1), at(now, 13)).is_ok());
    }
}
