use crate::model::{
    auth::Actor,
    booking::BookingAction,
    id::{AmenityId, BookingId, FacilityId, UserId, VenueId},
};
use chrono::{DateTime, Utc};
use derive_new::new;
use rust_decimal::Decimal;

/// 予約作成コマンド。requested_by が None の場合はゲスト予約。
#[derive(Debug, new)]
pub struct CreateBooking {
    pub facility_id: FacilityId,
    pub venue_id: VenueId,
    pub requested_by: Option<UserId>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub amenity_ids: Vec<AmenityId>,
    pub contact_name: String,
    pub contact_email: String,
    pub purpose: Option<String>,
    pub attendees: Option<i32>,
    pub notes: Option<String>,
}

/// ステータス遷移コマンド。権限チェックに使う操作主体を含む。
#[derive(Debug, new)]
pub struct UpdateBookingStatus {
    pub booking_id: BookingId,
    pub action: BookingAction,
    pub actor: Actor,
    pub reason: Option<String>,
}

/// 支払い記録コマンド。amount が None の場合は残額全額の支払いとして扱う。
#[derive(Debug, new)]
pub struct RecordPayment {
    pub booking_id: BookingId,
    pub actor: Actor,
    pub amount: Option<Decimal>,
    pub method: String,
    pub note: Option<String>,
    pub reason: Option<String>,
    pub recorded_by: Option<UserId>,
    pub transaction_id: Option<String>,
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use crate::model::role::Role;
    use chrono::Duration;

    pub fn create_booking_event() -> CreateBooking {
        let start = Utc::now() + Duration::hours(24);
        CreateBooking::new(
            FacilityId::new(),
            VenueId::new(),
            Some(UserId::new()),
            start,
            start + Duration::hours(2),
            vec![],
            "山田 太郎".into(),
            "taro@example.com".into(),
            None,
            Some(10),
            None,
        )
    }

    pub fn payment_event(amount: Option<Decimal>, recorded_by: UserId) -> RecordPayment {
        RecordPayment::new(
            BookingId::new(),
            Actor {
                user_id: recorded_by,
                role: Role::Admin,
            },
            amount,
            "cash".into(),
            None,
            None,
            Some(recorded_by),
            None,
        )
    }
}
