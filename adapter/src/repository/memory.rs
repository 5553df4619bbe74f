//! テスト用のインメモリ実装。
//!
//! Postgres 実装は SERIALIZABLE トランザクションで
//! 「空き確認 → INSERT」を直列化するが、こちらは予約マップ全体を
//! 単一の Mutex で守ることで同じ直列化を実現する。
//! ドメイン側の検査ロジック（ポリシー・状態機械・台帳）は
//! Postgres 実装と完全に共有している。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kernel::model::{
    auth::ensure_facility_operator,
    booking::{
        availability::{buffered_interval, overlaps},
        event::{CreateBooking, RecordPayment, UpdateBookingStatus},
        pricing::compute_price,
        Booking, BookingConflict, BookingFilter,
    },
    facility::Facility,
    id::{BookingId, FacilityId, UserId, VenueId},
    policy::BookingPolicy,
};
use kernel::repository::{booking::BookingRepository, facility::FacilityRepository};
use shared::error::{AppError, AppResult};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{Mutex, RwLock};

/// 施設・ヴェニューのマスターデータを保持するカタログ
#[derive(Default)]
pub struct InMemoryCatalog {
    facilities: RwLock<HashMap<FacilityId, Facility>>,
}

impl InMemoryCatalog {
    pub async fn insert_facility(&self, facility: Facility) {
        self.facilities
            .write()
            .await
            .insert(facility.facility_id, facility);
    }

    async fn find(&self, facility_id: FacilityId) -> Option<Facility> {
        self.facilities.read().await.get(&facility_id).cloned()
    }
}

pub struct InMemoryFacilityRepository {
    catalog: Arc<InMemoryCatalog>,
}

impl InMemoryFacilityRepository {
    pub fn new(catalog: Arc<InMemoryCatalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl FacilityRepository for InMemoryFacilityRepository {
    async fn find_all(&self) -> AppResult<Vec<Facility>> {
        let mut facilities: Vec<Facility> =
            self.catalog.facilities.read().await.values().cloned().collect();
        facilities.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(facilities)
    }

    async fn find_by_id(&self, facility_id: FacilityId) -> AppResult<Option<Facility>> {
        Ok(self.catalog.find(facility_id).await)
    }

    async fn find_managed_by(&self, user_id: UserId) -> AppResult<Option<Facility>> {
        Ok(self
            .catalog
            .facilities
            .read()
            .await
            .values()
            .find(|f| f.manager_ids.contains(&user_id))
            .cloned())
    }
}

pub struct InMemoryBookingRepository {
    catalog: Arc<InMemoryCatalog>,
    bookings: Mutex<HashMap<BookingId, Booking>>,
}

impl InMemoryBookingRepository {
    pub fn new(catalog: Arc<InMemoryCatalog>) -> Self {
        Self {
            catalog,
            bookings: Mutex::new(HashMap::new()),
        }
    }

    async fn manager_ids_of(&self, facility_id: FacilityId) -> AppResult<Vec<UserId>> {
        let facility = self.catalog.find(facility_id).await.ok_or_else(|| {
            AppError::EntityNotFound(format!("施設（{facility_id}）が見つかりませんでした。"))
        })?;
        Ok(facility.manager_ids)
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn create(&self, event: CreateBooking, policy: &BookingPolicy) -> AppResult<BookingId> {
        if event.end_time <= event.start_time {
            return Err(AppError::UnprocessableEntity(
                "終了時刻は開始時刻より後である必要があります。".into(),
            ));
        }

        let now = Utc::now();

        // ロックの取得からマップへの挿入までが Postgres 実装の
        // SERIALIZABLE トランザクションに相当する
        let mut bookings = self.bookings.lock().await;

        let facility = self.catalog.find(event.facility_id).await.ok_or_else(|| {
            AppError::EntityNotFound(format!(
                "ヴェニュー（{}）が見つかりませんでした。",
                event.venue_id
            ))
        })?;
        let venue = facility.find_venue(event.venue_id).cloned().ok_or_else(|| {
            AppError::EntityNotFound(format!(
                "ヴェニュー（{}）が見つかりませんでした。",
                event.venue_id
            ))
        })?;

        if !venue.is_bookable {
            return Err(AppError::ResourceConflict(format!(
                "ヴェニュー（{}）は現在予約を受け付けていません。",
                event.venue_id
            )));
        }

        policy.check(now, event.start_time, event.end_time)?;

        let (buffered_start, buffered_end) =
            buffered_interval(event.start_time, event.end_time, policy.buffer());
        let conflict = bookings.values().any(|b| {
            b.venue_id == event.venue_id
                && b.status.occupies_slot()
                && overlaps(b.start_time, b.end_time, buffered_start, buffered_end)
        });
        if conflict {
            return Err(AppError::ResourceConflict(format!(
                "ヴェニュー（{}）は指定時間帯にすでに予約が存在します。",
                event.venue_id
            )));
        }

        let quote = compute_price(&venue, event.start_time, event.end_time, &event.amenity_ids);
        let booking = Booking::new_pending(event, quote, now);
        let booking_id = booking.booking_id;
        bookings.insert(booking_id, booking);

        Ok(booking_id)
    }

    async fn find_by_id(&self, booking_id: BookingId) -> AppResult<Booking> {
        self.bookings
            .lock()
            .await
            .get(&booking_id)
            .cloned()
            .ok_or_else(|| {
                AppError::EntityNotFound(format!("予約（{booking_id}）が見つかりませんでした。"))
            })
    }

    async fn find_filtered(&self, filter: BookingFilter) -> AppResult<Vec<Booking>> {
        let bookings = self.bookings.lock().await;
        let mut result: Vec<Booking> = bookings
            .values()
            .filter(|b| match filter {
                BookingFilter::All => true,
                BookingFilter::Facility(facility_id) => b.facility_id == facility_id,
                BookingFilter::RequestedBy(user_id) => b.requested_by == Some(user_id),
            })
            .cloned()
            .collect();
        result.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(result)
    }

    async fn find_overlapping(
        &self,
        venue_id: VenueId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude: Option<BookingId>,
    ) -> AppResult<Vec<BookingConflict>> {
        let bookings = self.bookings.lock().await;
        let mut conflicts: Vec<BookingConflict> = bookings
            .values()
            .filter(|b| {
                b.venue_id == venue_id
                    && b.status.occupies_slot()
                    && overlaps(b.start_time, b.end_time, start, end)
                    && exclude != Some(b.booking_id)
            })
            .map(|b| BookingConflict {
                booking_id: b.booking_id,
                start_time: b.start_time,
                end_time: b.end_time,
                status: b.status,
            })
            .collect();
        conflicts.sort_by_key(|c| c.start_time);
        Ok(conflicts)
    }

    async fn update_status(&self, event: UpdateBookingStatus) -> AppResult<Booking> {
        let now = Utc::now();

        let mut bookings = self.bookings.lock().await;
        let booking = bookings.get_mut(&event.booking_id).ok_or_else(|| {
            AppError::EntityNotFound(format!(
                "予約（{}）が見つかりませんでした。",
                event.booking_id
            ))
        })?;

        let manager_ids = self.manager_ids_of(booking.facility_id).await?;
        ensure_facility_operator(&event.actor, booking.facility_id, &manager_ids)?;

        booking.apply_action(event.action, &event.actor, now, event.reason)?;

        Ok(booking.clone())
    }

    async fn record_payment(&self, event: RecordPayment) -> AppResult<Booking> {
        let now = Utc::now();

        let mut bookings = self.bookings.lock().await;
        let booking = bookings.get_mut(&event.booking_id).ok_or_else(|| {
            AppError::EntityNotFound(format!(
                "予約（{}）が見つかりませんでした。",
                event.booking_id
            ))
        })?;

        let manager_ids = self.manager_ids_of(booking.facility_id).await?;
        ensure_facility_operator(&event.actor, booking.facility_id, &manager_ids)?;

        booking.record_payment(&event, now)?;

        Ok(booking.clone())
    }
}
