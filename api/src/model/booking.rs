use chrono::{DateTime, Utc};
use garde::Validate;
use kernel::model::{
    booking::{
        Booking, BookingAction, BookingConflict, BookingStatus, Payment, PaymentStatus,
        PricingSnapshot, StatusHistoryEntry,
    },
    id::{AmenityId, BookingId, FacilityId, PaymentId, UserId, VenueId},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    #[garde(skip)]
    pub facility_id: FacilityId,
    #[garde(skip)]
    pub venue_id: VenueId,
    #[garde(skip)]
    pub start_time: DateTime<Utc>,
    #[garde(skip)]
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    #[garde(skip)]
    pub amenities: Vec<AmenityId>,
    #[garde(length(min = 1))]
    pub contact_name: String,
    #[garde(email)]
    pub contact_email: String,
    #[garde(skip)]
    pub purpose: Option<String>,
    #[garde(range(min = 1))]
    pub attendees: Option<i32>,
    #[garde(skip)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookingStatusRequest {
    pub action: BookingAction,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPaymentRequest {
    /// 省略時は残額全額の支払い（全額消込）として扱う
    pub amount: Option<Decimal>,
    pub method: Option<String>,
    pub note: Option<String>,
    pub reason: Option<String>,
    pub transaction_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    pub venue_id: VenueId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub exclude_booking_id: Option<BookingId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingResponse {
    pub booking_id: BookingId,
    pub booking_ref: String,
    pub message: String,
    pub pricing: PricingResponse,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingResponse {
    pub hours: Decimal,
    pub base_price: Decimal,
    pub amenity_surcharge: Decimal,
    pub total_price: Decimal,
    pub amenity_ids: Vec<AmenityId>,
}

impl From<PricingSnapshot> for PricingResponse {
    fn from(value: PricingSnapshot) -> Self {
        let PricingSnapshot {
            hours,
            base_price,
            amenity_surcharge,
            total_price,
            amenity_ids,
        } = value;
        PricingResponse {
            hours,
            base_price,
            amenity_surcharge,
            total_price,
            amenity_ids,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub payment_id: PaymentId,
    pub amount: Decimal,
    pub method: String,
    pub paid_at: DateTime<Utc>,
    pub note: Option<String>,
    pub recorded_by: Option<UserId>,
    pub transaction_id: Option<String>,
}

impl From<Payment> for PaymentResponse {
    fn from(value: Payment) -> Self {
        let Payment {
            payment_id,
            amount,
            method,
            paid_at,
            note,
            recorded_by,
            transaction_id,
        } = value;
        PaymentResponse {
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

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusHistoryEntryResponse {
    pub status: BookingStatus,
    pub changed_by: Option<UserId>,
    pub changed_at: DateTime<Utc>,
    pub reason: Option<String>,
}

impl From<StatusHistoryEntry> for StatusHistoryEntryResponse {
    fn from(value: StatusHistoryEntry) -> Self {
        let StatusHistoryEntry {
            status,
            changed_by,
            changed_at,
            reason,
        } = value;
        StatusHistoryEntryResponse {
            status,
            changed_by,
            changed_at,
            reason,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub booking_id: BookingId,
    pub booking_ref: String,
    pub invoice_id: String,
    pub facility_id: FacilityId,
    pub venue_id: VenueId,
    pub requested_by: Option<UserId>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: BookingStatus,
    pub pricing: PricingResponse,
    pub payment_status: PaymentStatus,
    pub total_paid: Decimal,
    pub remaining_balance: Decimal,
    pub payments: Vec<PaymentResponse>,
    pub status_history: Vec<StatusHistoryEntryResponse>,
    pub contact_name: String,
    pub contact_email: String,
    pub purpose: Option<String>,
    pub attendees: Option<i32>,
    pub notes: Option<String>,
    pub reserved_at: DateTime<Utc>,
}

impl From<Booking> for BookingResponse {
    fn from(value: Booking) -> Self {
        let remaining_balance = value.remaining_balance();
        let Booking {
            booking_id,
            booking_ref,
            invoice_id,
            facility_id,
            venue_id,
            requested_by,
            start_time,
            end_time,
            status,
            pricing,
            payment_status,
            total_paid,
            payments,
            status_history,
            contact,
            reserved_at,
        } = value;
        BookingResponse {
            booking_id,
            booking_ref,
            invoice_id,
            facility_id,
            venue_id,
            requested_by,
            start_time,
            end_time,
            status,
            pricing: pricing.into(),
            payment_status,
            total_paid,
            remaining_balance,
            payments: payments.into_iter().map(PaymentResponse::from).collect(),
            status_history: status_history
                .into_iter()
                .map(StatusHistoryEntryResponse::from)
                .collect(),
            contact_name: contact.contact_name,
            contact_email: contact.contact_email,
            purpose: contact.purpose,
            attendees: contact.attendees,
            notes: contact.notes,
            reserved_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingsResponse {
    pub bookings: Vec<BookingResponse>,
}

impl From<Vec<Booking>> for BookingsResponse {
    fn from(value: Vec<Booking>) -> Self {
        BookingsResponse {
            bookings: value.into_iter().map(BookingResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingConflictResponse {
    pub booking_id: BookingId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: BookingStatus,
}

impl From<BookingConflict> for BookingConflictResponse {
    fn from(value: BookingConflict) -> Self {
        let BookingConflict {
            booking_id,
            start_time,
            end_time,
            status,
        } = value;
        BookingConflictResponse {
            booking_id,
            start_time,
            end_time,
            status,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityResponse {
    pub available: bool,
    pub conflicts: Vec<BookingConflictResponse>,
}
