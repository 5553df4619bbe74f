use chrono::{DateTime, Utc};
use kernel::model::{
    booking::{
        Booking, BookingConflict, ContactInfo, Payment, PricingSnapshot, StatusHistoryEntry,
    },
    id::{AmenityId, BookingId, FacilityId, PaymentId, UserId, VenueId},
};
use rust_decimal::Decimal;
use shared::error::{AppError, AppResult};

// bookings テーブルの 1 行。ステータスは TEXT で保存されているため
// ドメイン型への変換時に検証する
#[derive(Debug, sqlx::FromRow)]
pub struct BookingRow {
    pub booking_id: BookingId,
    pub booking_ref: String,
    pub invoice_id: String,
    pub facility_id: FacilityId,
    pub venue_id: VenueId,
    pub requested_by: Option<UserId>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: String,
    pub payment_status: String,
    pub hours: Decimal,
    pub base_price: Decimal,
    pub amenity_surcharge: Decimal,
    pub total_price: Decimal,
    pub total_paid: Decimal,
    pub amenity_ids: Vec<AmenityId>,
    pub contact_name: String,
    pub contact_email: String,
    pub purpose: Option<String>,
    pub attendees: Option<i32>,
    pub notes: Option<String>,
    pub reserved_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct PaymentRow {
    pub payment_id: PaymentId,
    pub booking_id: BookingId,
    pub amount: Decimal,
    pub method: String,
    pub note: Option<String>,
    pub recorded_by: Option<UserId>,
    pub transaction_id: Option<String>,
    pub paid_at: DateTime<Utc>,
}

impl From<PaymentRow> for Payment {
    fn from(value: PaymentRow) -> Self {
        let PaymentRow {
            payment_id,
            booking_id: _,
            amount,
            method,
            note,
            recorded_by,
            transaction_id,
            paid_at,
        } = value;
        Self {
            payment_id,
            amount,
            method,
            paid_at,
            note,
            recorded_by,
            transaction_id,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct StatusHistoryRow {
    pub booking_id: BookingId,
    pub status: String,
    pub changed_by: Option<UserId>,
    pub reason: Option<String>,
    pub changed_at: DateTime<Utc>,
}

impl TryFrom<StatusHistoryRow> for StatusHistoryEntry {
    type Error = AppError;

    fn try_from(value: StatusHistoryRow) -> Result<Self, Self::Error> {
        let StatusHistoryRow {
            booking_id: _,
            status,
            changed_by,
            reason,
            changed_at,
        } = value;
        Ok(Self {
            status: status.parse()?,
            changed_by,
            changed_at,
            reason,
        })
    }
}

impl BookingRow {
    /// 子テーブル（支払い・履歴）の行と合わせてドメインの Booking に組み立てる。
    /// payments / history は記録順に並んでいることを前提とする。
    pub fn into_booking(
        self,
        payments: Vec<PaymentRow>,
        history: Vec<StatusHistoryRow>,
    ) -> AppResult<Booking> {
        let BookingRow {
            booking_id,
            booking_ref,
            invoice_id,
            facility_id,
            venue_id,
            requested_by,
            start_time,
            end_time,
            status,
            payment_status,
            hours,
            base_price,
            amenity_surcharge,
            total_price,
            total_paid,
            amenity_ids,
            contact_name,
            contact_email,
            purpose,
            attendees,
            notes,
            reserved_at,
        } = self;
        Ok(Booking {
            booking_id,
            booking_ref,
            invoice_id,
            facility_id,
            venue_id,
            requested_by,
            start_time,
            end_time,
            status: status.parse()?,
            pricing: PricingSnapshot {
                hours,
                base_price,
                amenity_surcharge,
                total_price,
                amenity_ids,
            },
            payment_status: payment_status.parse()?,
            total_paid,
            payments: payments.into_iter().map(Payment::from).collect(),
            status_history: history
                .into_iter()
                .map(StatusHistoryEntry::try_from)
                .collect::<AppResult<Vec<_>>>()?,
            contact: ContactInfo {
                contact_name,
                contact_email,
                purpose,
                attendees,
                notes,
            },
            reserved_at,
        })
    }
}

// 空き確認で返す重複予約の要約行
#[derive(Debug, sqlx::FromRow)]
pub struct BookingConflictRow {
    pub booking_id: BookingId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: String,
}

impl TryFrom<BookingConflictRow> for BookingConflict {
    type Error = AppError;

    fn try_from(value: BookingConflictRow) -> Result<Self, Self::Error> {
        let BookingConflictRow {
            booking_id,
            start_time,
            end_time,
            status,
        } = value;
        Ok(Self {
            booking_id,
            start_time,
            end_time,
            status: status.parse()?,
        })
    }
}
