use chrono::{DateTime, Duration, Utc};

/// 半開区間 [s1, e1) と [s2, e2) の重なり判定。
/// 前の予約の終了時刻ちょうどに始まる予約は重ならない扱いとする。
pub fn overlaps(
    s1: DateTime<Utc>,
    e1: DateTime<Utc>,
    s2: DateTime<Utc>,
    e2: DateTime<Utc>,
) -> bool {
    s1 < e2 && s2 < e1
}

/// 問い合わせ区間をバッファ分だけ前後に広げる。
/// 保存される予約区間自体は広げず、空き確認の問い合わせ側だけを広げることで
/// 予約間の転換時間を確保する。
pub fn buffered_interval(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    buffer: Duration,
) -> (DateTime<Utc>, DateTime<Utc>) {
    (start - buffer, end + buffer)
}
