use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use garde::Validate;
use kernel::model::{
    booking::{
        event::{CreateBooking, RecordPayment, UpdateBookingStatus},
        Booking, BookingAction, BookingFilter,
    },
    id::BookingId,
    role::Role,
};
use registry::AppRegistry;
use shared::error::{AppError, AppResult};

use crate::{
    extractor::{AuthorizedUser, OptionalAuthorizedUser},
    model::booking::{
        AvailabilityQuery, AvailabilityResponse, BookingConflictResponse, BookingResponse,
        BookingsResponse, CreateBookingRequest, CreateBookingResponse, RecordPaymentRequest,
        UpdateBookingStatusRequest,
    },
};

/// 予約を作成する。認証は任意（未認証ならゲスト予約になる）
pub async fn create_booking(
    OptionalAuthorizedUser(user): OptionalAuthorizedUser,
    State(registry): State<AppRegistry>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate(&())?;

    let event = CreateBooking::new(
        req.facility_id,
        req.venue_id,
        user.map(|u| u.id()),
        req.start_time,
        req.end_time,
        req.amenities,
        req.contact_name,
        req.contact_email,
        req.purpose,
        req.attendees,
        req.notes,
    );

    let policy = registry.booking_policy();
    let booking_id = registry
        .booking_repository()
        .create(event, &policy)
        .await?;

    let booking = registry.booking_repository().find_by_id(booking_id).await?;

    // 通知は best-effort。失敗しても予約自体は成立している
    spawn_notification(&registry, booking.clone(), NotificationKind::Created);

    Ok((
        StatusCode::CREATED,
        Json(CreateBookingResponse {
            booking_id: booking.booking_id,
            booking_ref: booking.booking_ref.clone(),
            message: "予約リクエストを受け付けました（承認待ち）。".into(),
            pricing: booking.pricing.clone().into(),
        }),
    ))
}

/// 指定区間の空き確認。予約せずにチェックだけ行う
pub async fn check_availability(
    Query(query): Query<AvailabilityQuery>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<AvailabilityResponse>> {
    if query.end_time <= query.start_time {
        return Err(AppError::UnprocessableEntity(
            "終了時刻は開始時刻より後である必要があります。".into(),
        ));
    }

    let conflicts = registry
        .booking_repository()
        .find_overlapping(
            query.venue_id,
            query.start_time,
            query.end_time,
            query.exclude_booking_id,
        )
        .await?;

    Ok(Json(AvailabilityResponse {
        available: conflicts.is_empty(),
        conflicts: conflicts
            .into_iter()
            .map(BookingConflictResponse::from)
            .collect(),
    }))
}

/// 予約一覧。ロールによって見える範囲が変わる。
/// admin は全件、manager は自身の管理施設の予約、一般ユーザーは自身の予約のみ
pub async fn show_booking_list(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<BookingsResponse>> {
    let filter = match user.role() {
        Role::Admin => BookingFilter::All,
        Role::Manager => {
            match registry
                .facility_repository()
                .find_managed_by(user.id())
                .await?
            {
                Some(facility) => BookingFilter::Facility(facility.facility_id),
                // 管理施設がなければ自身の予約のみ
                None => BookingFilter::RequestedBy(user.id()),
            }
        }
        Role::User => BookingFilter::RequestedBy(user.id()),
    };

    registry
        .booking_repository()
        .find_filtered(filter)
        .await
        .map(BookingsResponse::from)
        .map(Json)
}

pub async fn show_booking(
    user: AuthorizedUser,
    Path(booking_id): Path<BookingId>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<BookingResponse>> {
    let booking = registry.booking_repository().find_by_id(booking_id).await?;

    // 閲覧できるのは予約者本人・admin・当該施設の manager のみ
    let can_view = match user.role() {
        Role::Admin => true,
        Role::Manager => {
            let managed = registry
                .facility_repository()
                .find_managed_by(user.id())
                .await?;
            managed.map(|f| f.facility_id) == Some(booking.facility_id)
                || booking.requested_by == Some(user.id())
        }
        Role::User => booking.requested_by == Some(user.id()),
    };
    if !can_view {
        return Err(AppError::Forbidden(
            "この予約を閲覧する権限がありません。".into(),
        ));
    }

    Ok(Json(BookingResponse::from(booking)))
}

/// ステータス遷移（confirm / reject / cancel）。
/// 権限チェックと状態機械の検査はリポジトリとドメイン側で行う
pub async fn update_booking_status(
    user: AuthorizedUser,
    Path(booking_id): Path<BookingId>,
    State(registry): State<AppRegistry>,
    Json(req): Json<UpdateBookingStatusRequest>,
) -> AppResult<Json<BookingResponse>> {
    let action = req.action;
    let event = UpdateBookingStatus::new(booking_id, action, user.actor(), req.reason);

    let booking = registry.booking_repository().update_status(event).await?;

    if action == BookingAction::Confirm {
        spawn_notification(&registry, booking.clone(), NotificationKind::Confirmed);
    }

    Ok(Json(BookingResponse::from(booking)))
}

pub async fn record_payment(
    user: AuthorizedUser,
    Path(booking_id): Path<BookingId>,
    State(registry): State<AppRegistry>,
    Json(req): Json<RecordPaymentRequest>,
) -> AppResult<Json<BookingResponse>> {
    let event = RecordPayment::new(
        booking_id,
        user.actor(),
        req.amount,
        req.method.unwrap_or_else(|| "cash".into()),
        req.note,
        req.reason,
        Some(user.id()),
        req.transaction_id,
    );

    registry
        .booking_repository()
        .record_payment(event)
        .await
        .map(BookingResponse::from)
        .map(Json)
}

enum NotificationKind {
    Created,
    Confirmed,
}

// ヴェニュー名を引いて通知を送るバックグラウンドタスクを起こす
fn spawn_notification(registry: &AppRegistry, booking: Booking, kind: NotificationKind) {
    let facility_repository = registry.facility_repository();
    let notification_sink = registry.notification_sink();
    tokio::spawn(async move {
        let venue_name = match facility_repository.find_by_id(booking.facility_id).await {
            Ok(Some(facility)) => facility
                .find_venue(booking.venue_id)
                .map(|v| v.venue_name.clone())
                .unwrap_or_default(),
            _ => String::new(),
        };
        let result = match kind {
            NotificationKind::Created => {
                notification_sink
                    .booking_created(&booking, &venue_name)
                    .await
            }
            NotificationKind::Confirmed => {
                notification_sink
                    .booking_confirmed(&booking, &venue_name)
                    .await
            }
        };
        if let Err(e) = result {
            tracing::warn!(
                booking_ref = %booking.booking_ref,
                error = %e,
                "予約通知の送信に失敗しました"
            );
        }
    });
}
