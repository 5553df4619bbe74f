use crate::model::{
    auth::Actor,
    id::{AmenityId, BookingId, FacilityId, PaymentId, UserId, VenueId},
};
use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::error::{AppError, AppResult};
use std::str::FromStr;

pub mod availability;
pub mod event;
pub mod pricing;

use event::RecordPayment;
use pricing::PriceQuote;

/// 支払い記録の履歴エントリにつける既定の事由
pub const PAYMENT_RECEIVED_REASON: &str = "Payment received";

/// 予約のライフサイクルステータス。
/// rejected と cancelled は終端であり、confirmed はキャンセル可能なので終端ではない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Rejected,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Rejected => "rejected",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Rejected | BookingStatus::Cancelled)
    }

    /// このステータスの予約が時間枠を占有するか。
    /// pending と confirmed のみが空き確認の対象になる。
    pub fn occupies_slot(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }
}

impl FromStr for BookingStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "rejected" => Ok(BookingStatus::Rejected),
            "cancelled" => Ok(BookingStatus::Cancelled),
            _ => Err(AppError::ConversionEntityError(format!(
                "不正な予約ステータスです: {s}"
            ))),
        }
    }
}

/// 支払いステータス。failed / refunded は読み取り時に受理されるが、
/// 本コアの操作では設定されない（返金は予約ステータス側でモデル化する）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "failed" => Ok(PaymentStatus::Failed),
            "refunded" => Ok(PaymentStatus::Refunded),
            _ => Err(AppError::ConversionEntityError(format!(
                "不正な支払いステータスです: {s}"
            ))),
        }
    }
}

/// ステータスに対する操作。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingAction {
    Confirm,
    Reject,
    Cancel,
}

impl BookingAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingAction::Confirm => "confirm",
            BookingAction::Reject => "reject",
            BookingAction::Cancel => "cancel",
        }
    }
}

/// 監査証跡のエントリ。追記専用であり、編集・削除はされない。
#[derive(Debug, Clone)]
pub struct StatusHistoryEntry {
    pub status: BookingStatus,
    pub changed_by: Option<UserId>,
    pub changed_at: DateTime<Utc>,
    pub reason: Option<String>,
}

/// 部分支払いの記録。一度追記された支払いは不変であり、
/// 訂正は新しい支払い（マイナスの手動調整）として表現する。
#[derive(Debug, Clone)]
pub struct Payment {
    pub payment_id: PaymentId,
    pub amount: Decimal,
    pub method: String,
    pub paid_at: DateTime<Utc>,
    pub note: Option<String>,
    pub recorded_by: Option<UserId>,
    pub transaction_id: Option<String>,
}

/// 作成時点の料金スナップショット。
/// 後からヴェニューの単価が変わっても再計算されない。
#[derive(Debug, Clone)]
pub struct PricingSnapshot {
    pub hours: Decimal,
    pub base_price: Decimal,
    pub amenity_surcharge: Decimal,
    pub total_price: Decimal,
    pub amenity_ids: Vec<AmenityId>,
}

impl From<PriceQuote> for PricingSnapshot {
    fn from(value: PriceQuote) -> Self {
        let PriceQuote {
            hours,
            base_price,
            amenity_surcharge,
            total_price,
            amenity_ids,
        } = value;
        Self {
            hours,
            base_price,
            amenity_surcharge,
            total_price,
            amenity_ids,
        }
    }
}

/// 通知・問い合わせ用の連絡先情報。コアの不変条件には関与しない。
#[derive(Debug, Clone)]
pub struct ContactInfo {
    pub contact_name: String,
    pub contact_email: String,
    pub purpose: Option<String>,
    pub attendees: Option<i32>,
    pub notes: Option<String>,
}

/// 空き確認の結果として返す、重複している予約の要約。
#[derive(Debug, Clone)]
pub struct BookingConflict {
    pub booking_id: BookingId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: BookingStatus,
}

/// 予約一覧の絞り込み条件。
/// admin は全件、manager は自身の管理施設、一般ユーザーは自身の予約のみ。
#[derive(Debug, Clone, Copy)]
pub enum BookingFilter {
    All,
    Facility(FacilityId),
    RequestedBy(UserId),
}

/// 予約。
/// 時間区間は半開区間 [start_time, end_time) として扱い、作成後は不変。
/// 予約し直す場合は新しい Booking を作る。
#[derive(Debug, Clone)]
pub struct Booking {
    pub booking_id: BookingId,
    pub booking_ref: String,
    pub invoice_id: String,
    pub facility_id: FacilityId,
    pub venue_id: VenueId,
    // ゲスト予約を許すため None になり得る
    pub requested_by: Option<UserId>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: BookingStatus,
    pub pricing: PricingSnapshot,
    pub payment_status: PaymentStatus,
    pub total_paid: Decimal,
    pub payments: Vec<Payment>,
    pub status_history: Vec<StatusHistoryEntry>,
    pub contact: ContactInfo,
    pub reserved_at: DateTime<Utc>,
}

impl Booking {
    /// 予約リクエストと料金見積もりから pending 状態の予約を組み立てる。
    /// 監査証跡は作成時点から 1 件目（pending）が入る。
    pub fn new_pending(event: event::CreateBooking, quote: PriceQuote, now: DateTime<Utc>) -> Self {
        let requested_by = event.requested_by;
        Self {
            booking_id: BookingId::new(),
            booking_ref: generate_booking_ref(now),
            invoice_id: generate_invoice_id(now),
            facility_id: event.facility_id,
            venue_id: event.venue_id,
            requested_by,
            start_time: event.start_time,
            end_time: event.end_time,
            status: BookingStatus::Pending,
            pricing: quote.into(),
            payment_status: PaymentStatus::Pending,
            total_paid: Decimal::ZERO,
            payments: Vec::new(),
            status_history: vec![StatusHistoryEntry {
                status: BookingStatus::Pending,
                changed_by: requested_by,
                changed_at: now,
                reason: None,
            }],
            contact: ContactInfo {
                contact_name: event.contact_name,
                contact_email: event.contact_email,
                purpose: event.purpose,
                attendees: event.attendees,
                notes: event.notes,
            },
            reserved_at: now,
        }
    }

    pub fn remaining_balance(&self) -> Decimal {
        self.pricing.total_price - self.total_paid
    }

    /// ステータス遷移を適用する。許可される遷移は
    /// pending -> confirmed / rejected、pending・confirmed -> cancelled のみで、
    /// それ以外はエラーになる（キャンセル済みの再キャンセルも含む）。
    /// 成功時は履歴を 1 件追記し、そのエントリを返す。
    pub fn apply_action(
        &mut self,
        action: BookingAction,
        actor: &Actor,
        now: DateTime<Utc>,
        reason: Option<String>,
    ) -> AppResult<StatusHistoryEntry> {
        let next = match (self.status, action) {
            (BookingStatus::Pending, BookingAction::Confirm) => BookingStatus::Confirmed,
            (BookingStatus::Pending, BookingAction::Reject) => BookingStatus::Rejected,
            (BookingStatus::Pending | BookingStatus::Confirmed, BookingAction::Cancel) => {
                BookingStatus::Cancelled
            }
            (status, action) => {
                return Err(AppError::InvalidStateTransition(format!(
                    "現在のステータス（{}）では操作（{}）は実行できません。",
                    status.as_str(),
                    action.as_str(),
                )))
            }
        };
        let entry = StatusHistoryEntry {
            status: next,
            changed_by: Some(actor.user_id),
            changed_at: now,
            reason,
        };
        self.status = next;
        self.status_history.push(entry.clone());
        Ok(entry)
    }

    /// 部分支払いを記録する。amount が None の場合は残額全額の支払い
    /// （手動消し込みの「全額支払い済みにする」操作）として扱う。
    /// 超過支払いは丸めずにエラーにする。
    /// 成功時は支払い 1 件と、情報エントリとして履歴 1 件を追記し、両方を返す。
    pub fn record_payment(
        &mut self,
        event: &RecordPayment,
        now: DateTime<Utc>,
    ) -> AppResult<(Payment, StatusHistoryEntry)> {
        if self.status.is_terminal() {
            return Err(AppError::PaymentInvalid(format!(
                "この予約（ステータス: {}）には支払いを記録できません。",
                self.status.as_str()
            )));
        }

        let remaining = self.remaining_balance();
        let amount = event.amount.unwrap_or(remaining);
        if amount <= Decimal::ZERO {
            return Err(AppError::PaymentInvalid(
                "支払額は 0 より大きい必要があります。".into(),
            ));
        }
        if amount > remaining {
            return Err(AppError::PaymentInvalid(
                "支払額が残額を超えています。".into(),
            ));
        }

        let payment = Payment {
            payment_id: PaymentId::new(),
            amount,
            method: event.method.clone(),
            paid_at: now,
            note: event.note.clone(),
            recorded_by: event.recorded_by,
            transaction_id: event.transaction_id.clone(),
        };
        self.payments.push(payment.clone());
        self.total_paid += amount;
        if self.remaining_balance() <= Decimal::ZERO {
            self.payment_status = PaymentStatus::Paid;
        }

        // 支払いはステータス変更ではないが、監査証跡として
        // 現在のステータスのまま情報エントリを追記する
        let entry = StatusHistoryEntry {
            status: self.status,
            changed_by: event.recorded_by,
            changed_at: now,
            reason: Some(
                event
                    .reason
                    .clone()
                    .unwrap_or_else(|| PAYMENT_RECEIVED_REASON.into()),
            ),
        };
        self.status_history.push(entry.clone());
        Ok((payment, entry))
    }
}

/// 人間可読な予約参照番号を生成する。
/// タイムスタンプの base36 表記に乱数サフィックスを付け、
/// 同時刻の生成でも衝突しないようにしている。
pub fn generate_booking_ref(now: DateTime<Utc>) -> String {
    format!(
        "BK-{}{}",
        to_base36(now.timestamp_millis().max(0) as u64),
        random_suffix(4)
    )
}

pub fn generate_invoice_id(now: DateTime<Utc>) -> String {
    format!(
        "INV-{}{}",
        to_base36(now.timestamp_millis().max(0) as u64),
        random_suffix(4)
    )
}

const BASE36: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".into();
    }
    let mut buf = Vec::new();
    while n > 0 {
        buf.push(BASE36[(n % 36) as usize]);
        n /= 36;
    }
    buf.reverse();
    String::from_utf8(buf).unwrap_or_default()
}

fn random_suffix(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| BASE36[rng.gen_range(0..36)] as char)
        .collect()
}
