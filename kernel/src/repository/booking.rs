use crate::model::{
    booking::{
        event::{CreateBooking, RecordPayment, UpdateBookingStatus},
        Booking, BookingConflict, BookingFilter,
    },
    id::{BookingId, VenueId},
    policy::BookingPolicy,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::error::AppResult;

#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// 予約を作成する。
    /// 空き確認と INSERT は、同一ヴェニューに対する他の予約リクエストから見て
    /// 単一のアトミックな操作として実行されなければならない。
    /// ポリシーは呼び出しごとに明示的に渡す。
    async fn create(&self, event: CreateBooking, policy: &BookingPolicy) -> AppResult<BookingId>;

    /// 予約を支払い・履歴込みで取得する。
    async fn find_by_id(&self, booking_id: BookingId) -> AppResult<Booking>;

    /// 絞り込み条件付きの予約一覧。開始時刻の新しい順に返す。
    async fn find_filtered(&self, filter: BookingFilter) -> AppResult<Vec<Booking>>;

    /// 指定区間と重なる、枠を占有する予約（pending / confirmed）を返す。
    /// exclude に自身の予約 ID を渡すことで、予約変更時に自分自身を無視できる。
    async fn find_overlapping(
        &self,
        venue_id: VenueId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude: Option<BookingId>,
    ) -> AppResult<Vec<BookingConflict>>;

    /// ステータス遷移を実行する。
    /// 権限チェック・状態機械の検査・履歴追記は同一予約に対して直列化される。
    async fn update_status(&self, event: UpdateBookingStatus) -> AppResult<Booking>;

    /// 支払いを記録する。台帳の不変条件（支払い合計 = total_paid など）は
    /// この操作の前後で常に保たれる。
    async fn record_payment(&self, event: RecordPayment) -> AppResult<Booking>;
}
