use crate::database::{
    model::booking::{BookingConflictRow, BookingRow, PaymentRow, StatusHistoryRow},
    model::facility::{AmenityRow, VenueRow},
    ConnectionPool,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use derive_new::new;
use kernel::model::{
    auth::ensure_facility_operator,
    booking::{
        availability::buffered_interval,
        event::{CreateBooking, RecordPayment, UpdateBookingStatus},
        pricing::compute_price,
        Booking, BookingConflict, BookingFilter, Payment, StatusHistoryEntry,
    },
    id::{BookingId, UserId, VenueId},
    policy::BookingPolicy,
};
use kernel::repository::booking::BookingRepository;
use shared::error::{AppError, AppResult};
use std::collections::HashMap;

#[derive(new)]
pub struct BookingRepositoryImpl {
    db: ConnectionPool,
}

#[async_trait]
impl BookingRepository for BookingRepositoryImpl {
    // 予約作成操作を行う
    async fn create(&self, event: CreateBooking, policy: &BookingPolicy) -> AppResult<BookingId> {
        if event.end_time <= event.start_time {
            return Err(AppError::UnprocessableEntity(
                "終了時刻は開始時刻より後である必要があります。".into(),
            ));
        }

        let now = Utc::now();

        let mut tx = self.db.begin().await?;

        // トランザクション分離レベルを SERIALIZABLE に設定する。
        // 空き確認と INSERT を同一トランザクションで行うことで、
        // 同じヴェニューへの並行予約がどちらも成功する事態を防ぐ
        self.set_transaction_serializable(&mut tx).await?;

        // 事前のチェックとして、以下を順に調べる（最初の違反で失敗する）。
        // - 指定のヴェニューが指定の施設に存在するか
        // - 存在した場合、予約受け付け中（is_bookable）か
        // - 予約ポリシー（リードタイム・最大予約時間）を満たすか
        // - バッファを含めた時間帯に既存予約と重なりがないか
        let venue = {
            //
            // ① ヴェニューの存在確認 ＋ is_bookable チェック
            //
            let venue_row: Option<VenueRow> = sqlx::query_as(
                r#"
                SELECT venue_id, facility_id, venue_name, price_per_hour, is_bookable
                FROM venues
                WHERE venue_id = $1 AND facility_id = $2
                "#,
            )
            .bind(event.venue_id)
            .bind(event.facility_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(AppError::SpecificOperationError)?;

            let venue_row = match venue_row {
                None => {
                    return Err(AppError::EntityNotFound(format!(
                        "ヴェニュー（{}）が見つかりませんでした。",
                        event.venue_id
                    )))
                }
                Some(v) => v,
            };

            if !venue_row.is_bookable {
                return Err(AppError::ResourceConflict(format!(
                    "ヴェニュー（{}）は現在予約を受け付けていません。",
                    event.venue_id
                )));
            }

            //
            // ② 予約ポリシーの検査
            //
            policy.check(now, event.start_time, event.end_time)?;

            //
            // ③ バッファを含めた時間帯の重複確認
            //    重複条件（半開区間）：
            //        existing.start < query.end AND query.start < existing.end
            //
            let (buffered_start, buffered_end) =
                buffered_interval(event.start_time, event.end_time, policy.buffer());
            let overlap: Option<(BookingId,)> = sqlx::query_as(
                r#"
                SELECT booking_id
                FROM bookings
                WHERE venue_id = $1
                  AND status IN ('pending', 'confirmed')
                  AND start_time < $3
                  AND $2 < end_time
                LIMIT 1
                "#,
            )
            .bind(event.venue_id)
            .bind(buffered_start)
            .bind(buffered_end)
            .fetch_optional(&mut *tx)
            .await
            .map_err(AppError::SpecificOperationError)?;

            if overlap.is_some() {
                return Err(AppError::ResourceConflict(format!(
                    "ヴェニュー（{}）は指定時間帯にすでに予約が存在します。",
                    event.venue_id
                )));
            }

            let amenity_rows: Vec<AmenityRow> = sqlx::query_as(
                r#"
                SELECT amenity_id, venue_id, amenity_name, surcharge
                FROM amenities
                WHERE venue_id = $1
                "#,
            )
            .bind(event.venue_id)
            .fetch_all(&mut *tx)
            .await
            .map_err(AppError::SpecificOperationError)?;

            venue_row.into_venue(amenity_rows)
        };

        // ここまでのチェックを通過したので、料金スナップショットを確定して
        // 予約を作成する。料金は作成時点の値で固定され、以後再計算されない
        let quote = compute_price(&venue, event.start_time, event.end_time, &event.amenity_ids);
        let booking = Booking::new_pending(event, quote, now);

        let res = sqlx::query(
            r#"
                INSERT INTO bookings
                (booking_id, booking_ref, invoice_id, facility_id, venue_id, requested_by,
                start_time, end_time, status, payment_status,
                hours, base_price, amenity_surcharge, total_price, total_paid, amenity_ids,
                contact_name, contact_email, purpose, attendees, notes, reserved_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22)
            "#,
        )
        .bind(booking.booking_id)
        .bind(&booking.booking_ref)
        .bind(&booking.invoice_id)
        .bind(booking.facility_id)
        .bind(booking.venue_id)
        .bind(booking.requested_by)
        .bind(booking.start_time)
        .bind(booking.end_time)
        .bind(booking.status.as_str())
        .bind(booking.payment_status.as_str())
        .bind(booking.pricing.hours)
        .bind(booking.pricing.base_price)
        .bind(booking.pricing.amenity_surcharge)
        .bind(booking.pricing.total_price)
        .bind(booking.total_paid)
        .bind(&booking.pricing.amenity_ids)
        .bind(&booking.contact.contact_name)
        .bind(&booking.contact.contact_email)
        .bind(&booking.contact.purpose)
        .bind(booking.contact.attendees)
        .bind(&booking.contact.notes)
        .bind(booking.reserved_at)
        .execute(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No booking record has been created".into(),
            ));
        }

        // 監査証跡の 1 件目（pending）を追記する
        for entry in &booking.status_history {
            self.insert_history_entry(&mut tx, booking.booking_id, entry)
                .await?;
        }

        tx.commit().await.map_err(AppError::TransactionError)?;

        Ok(booking.booking_id)
    }

    async fn find_by_id(&self, booking_id: BookingId) -> AppResult<Booking> {
        let row: Option<BookingRow> = sqlx::query_as(
            r#"
                SELECT
                booking_id, booking_ref, invoice_id, facility_id, venue_id, requested_by,
                start_time, end_time, status, payment_status,
                hours, base_price, amenity_surcharge, total_price, total_paid, amenity_ids,
                contact_name, contact_email, purpose, attendees, notes, reserved_at
                FROM bookings
                WHERE booking_id = $1
            "#,
        )
        .bind(booking_id)
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        let row = match row {
            None => {
                return Err(AppError::EntityNotFound(format!(
                    "予約（{booking_id}）が見つかりませんでした。"
                )))
            }
            Some(row) => row,
        };

        let payments: Vec<PaymentRow> = sqlx::query_as(
            r#"
                SELECT payment_id, booking_id, amount, method, note, recorded_by,
                       transaction_id, paid_at
                FROM payments
                WHERE booking_id = $1
                ORDER BY history_seq ASC
            "#,
        )
        .bind(booking_id)
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        let history: Vec<StatusHistoryRow> = sqlx::query_as(
            r#"
                SELECT booking_id, status, changed_by, reason, changed_at
                FROM booking_status_history
                WHERE booking_id = $1
                ORDER BY history_seq ASC
            "#,
        )
        .bind(booking_id)
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        row.into_booking(payments, history)
    }

    // 絞り込み条件付きの予約一覧を取得する。開始時刻の新しい順に並べる
    async fn find_filtered(&self, filter: BookingFilter) -> AppResult<Vec<Booking>> {
        const BASE_QUERY: &str = r#"
            SELECT
            booking_id, booking_ref, invoice_id, facility_id, venue_id, requested_by,
            start_time, end_time, status, payment_status,
            hours, base_price, amenity_surcharge, total_price, total_paid, amenity_ids,
            contact_name, contact_email, purpose, attendees, notes, reserved_at
            FROM bookings
        "#;

        let rows: Vec<BookingRow> = match filter {
            BookingFilter::All => {
                sqlx::query_as(&format!("{BASE_QUERY} ORDER BY start_time DESC"))
                    .fetch_all(self.db.inner_ref())
                    .await
            }
            BookingFilter::Facility(facility_id) => sqlx::query_as(&format!(
                "{BASE_QUERY} WHERE facility_id = $1 ORDER BY start_time DESC"
            ))
            .bind(facility_id)
            .fetch_all(self.db.inner_ref())
            .await,
            BookingFilter::RequestedBy(user_id) => sqlx::query_as(&format!(
                "{BASE_QUERY} WHERE requested_by = $1 ORDER BY start_time DESC"
            ))
            .bind(user_id)
            .fetch_all(self.db.inner_ref())
            .await,
        }
        .map_err(AppError::SpecificOperationError)?;

        self.assemble_many(rows).await
    }

    async fn find_overlapping(
        &self,
        venue_id: VenueId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude: Option<BookingId>,
    ) -> AppResult<Vec<BookingConflict>> {
        let rows: Vec<BookingConflictRow> = sqlx::query_as(
            r#"
                SELECT booking_id, start_time, end_time, status
                FROM bookings
                WHERE venue_id = $1
                  AND status IN ('pending', 'confirmed')
                  AND start_time < $3
                  AND $2 < end_time
                  AND ($4::uuid IS NULL OR booking_id <> $4)
                ORDER BY start_time ASC
            "#,
        )
        .bind(venue_id)
        .bind(start)
        .bind(end)
        .bind(exclude)
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        rows.into_iter().map(BookingConflict::try_from).collect()
    }

    // ステータス遷移操作を行う
    async fn update_status(&self, event: UpdateBookingStatus) -> AppResult<Booking> {
        let now = Utc::now();

        let mut tx = self.db.begin().await?;

        // 同一予約に対する read-modify-write を直列化する
        self.set_transaction_serializable(&mut tx).await?;

        let mut booking = self.load_booking_in_tx(&mut tx, event.booking_id).await?;

        // 権限チェック：admin または対象施設の manager のみ
        let manager_ids = self.load_manager_ids(&mut tx, &booking).await?;
        ensure_facility_operator(&event.actor, booking.facility_id, &manager_ids)?;

        // 状態機械の検査と履歴の追記はドメイン側で行う
        let entry = booking.apply_action(event.action, &event.actor, now, event.reason)?;

        let res = sqlx::query("UPDATE bookings SET status = $1 WHERE booking_id = $2")
            .bind(booking.status.as_str())
            .bind(booking.booking_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No booking record has been updated".into(),
            ));
        }

        self.insert_history_entry(&mut tx, booking.booking_id, &entry)
            .await?;

        tx.commit().await.map_err(AppError::TransactionError)?;

        Ok(booking)
    }

    // 支払い記録操作を行う
    async fn record_payment(&self, event: RecordPayment) -> AppResult<Booking> {
        let now = Utc::now();

        let mut tx = self.db.begin().await?;

        // total_paid / payment_status の read-modify-write を直列化する
        self.set_transaction_serializable(&mut tx).await?;

        let mut booking = self.load_booking_in_tx(&mut tx, event.booking_id).await?;

        // 支払い記録も施設の管理操作として権限チェックを行う
        let manager_ids = self.load_manager_ids(&mut tx, &booking).await?;
        ensure_facility_operator(&event.actor, booking.facility_id, &manager_ids)?;

        // 金額の検査・台帳の更新・履歴の追記はドメイン側で行う
        let (payment, entry) = booking.record_payment(&event, now)?;

        self.insert_payment(&mut tx, booking.booking_id, &payment)
            .await?;

        let res = sqlx::query(
            "UPDATE bookings SET total_paid = $1, payment_status = $2 WHERE booking_id = $3",
        )
        .bind(booking.total_paid)
        .bind(booking.payment_status.as_str())
        .bind(booking.booking_id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No booking record has been updated".into(),
            ));
        }

        self.insert_history_entry(&mut tx, booking.booking_id, &entry)
            .await?;

        tx.commit().await.map_err(AppError::TransactionError)?;

        Ok(booking)
    }
}

impl BookingRepositoryImpl {
    // create, update_status, record_payment のトランザクションで
    // トランザクション分離レベルを SERIALIZABLE にするために内部的に使うメソッド
    async fn set_transaction_serializable(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    ) -> AppResult<()> {
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut **tx)
            .await
            .map_err(AppError::SpecificOperationError)?;
        Ok(())
    }

    // トランザクション内で予約を支払い・履歴込みで取得する
    async fn load_booking_in_tx(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        booking_id: BookingId,
    ) -> AppResult<Booking> {
        let row: Option<BookingRow> = sqlx::query_as(
            r#"
                SELECT
                booking_id, booking_ref, invoice_id, facility_id, venue_id, requested_by,
                start_time, end_time, status, payment_status,
                hours, base_price, amenity_surcharge, total_price, total_paid, amenity_ids,
                contact_name, contact_email, purpose, attendees, notes, reserved_at
                FROM bookings
                WHERE booking_id = $1
            "#,
        )
        .bind(booking_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        let row = match row {
            None => {
                return Err(AppError::EntityNotFound(format!(
                    "予約（{booking_id}）が見つかりませんでした。"
                )))
            }
            Some(row) => row,
        };

        let payments: Vec<PaymentRow> = sqlx::query_as(
            r#"
                SELECT payment_id, booking_id, amount, method, note, recorded_by,
                       transaction_id, paid_at
                FROM payments
                WHERE booking_id = $1
                ORDER BY history_seq ASC
            "#,
        )
        .bind(booking_id)
        .fetch_all(&mut **tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        let history: Vec<StatusHistoryRow> = sqlx::query_as(
            r#"
                SELECT booking_id, status, changed_by, reason, changed_at
                FROM booking_status_history
                WHERE booking_id = $1
                ORDER BY history_seq ASC
            "#,
        )
        .bind(booking_id)
        .fetch_all(&mut **tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        row.into_booking(payments, history)
    }

    async fn load_manager_ids(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        booking: &Booking,
    ) -> AppResult<Vec<UserId>> {
        sqlx::query_scalar("SELECT user_id FROM facility_managers WHERE facility_id = $1")
            .bind(booking.facility_id)
            .fetch_all(&mut **tx)
            .await
            .map_err(AppError::SpecificOperationError)
    }

    async fn insert_history_entry(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        booking_id: BookingId,
        entry: &StatusHistoryEntry,
    ) -> AppResult<()> {
        let res = sqlx::query(
            r#"
                INSERT INTO booking_status_history
                (booking_id, status, changed_by, reason, changed_at)
                VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(booking_id)
        .bind(entry.status.as_str())
        .bind(entry.changed_by)
        .bind(&entry.reason)
        .bind(entry.changed_at)
        .execute(&mut **tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No status history record has been created".into(),
            ));
        }
        Ok(())
    }

    async fn insert_payment(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        booking_id: BookingId,
        payment: &Payment,
    ) -> AppResult<()> {
        let res = sqlx::query(
            r#"
                INSERT INTO payments
                (payment_id, booking_id, amount, method, note, recorded_by,
                transaction_id, paid_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(payment.payment_id)
        .bind(booking_id)
        .bind(payment.amount)
        .bind(&payment.method)
        .bind(&payment.note)
        .bind(payment.recorded_by)
        .bind(&payment.transaction_id)
        .bind(payment.paid_at)
        .execute(&mut **tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No payment record has been created".into(),
            ));
        }
        Ok(())
    }

    // 一覧取得用：子テーブルをまとめて引いて予約ごとに組み立てる
    async fn assemble_many(&self, rows: Vec<BookingRow>) -> AppResult<Vec<Booking>> {
        let ids: Vec<BookingId> = rows.iter().map(|r| r.booking_id).collect();

        let payment_rows: Vec<PaymentRow> = sqlx::query_as(
            r#"
                SELECT payment_id, booking_id, amount, method, note, recorded_by,
                       transaction_id, paid_at
                FROM payments
                WHERE booking_id = ANY($1)
                ORDER BY history_seq ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        let history_rows: Vec<StatusHistoryRow> = sqlx::query_as(
            r#"
                SELECT booking_id, status, changed_by, reason, changed_at
                FROM booking_status_history
                WHERE booking_id = ANY($1)
                ORDER BY history_seq ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        let mut payments_by_booking: HashMap<BookingId, Vec<PaymentRow>> = HashMap::new();
        for row in payment_rows {
            payments_by_booking
                .entry(row.booking_id)
                .or_default()
                .push(row);
        }
        let mut history_by_booking: HashMap<BookingId, Vec<StatusHistoryRow>> = HashMap::new();
        for row in history_rows {
            history_by_booking
                .entry(row.booking_id)
                .or_default()
                .push(row);
        }

        rows.into_iter()
            .map(|row| {
                let booking_id = row.booking_id;
                row.into_booking(
                    payments_by_booking.remove(&booking_id).unwrap_or_default(),
                    history_by_booking.remove(&booking_id).unwrap_or_default(),
                )
            })
            .collect()
    }
}
