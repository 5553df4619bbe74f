use crate::model::booking::Booking;
use async_trait::async_trait;
use shared::error::AppResult;

/// 予約イベントの通知先。
/// 送信は best-effort であり、失敗しても予約処理自体には影響させない
/// （呼び出し側はエラーをログに残すだけで伝播しない）。
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn booking_created(&self, booking: &Booking, venue_name: &str) -> AppResult<()>;
    async fn booking_confirmed(&self, booking: &Booking, venue_name: &str) -> AppResult<()>;
}
