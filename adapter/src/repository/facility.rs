use crate::database::{
    model::facility::{AmenityRow, FacilityManagerRow, FacilityRow, VenueRow},
    ConnectionPool,
};
use async_trait::async_trait;
use derive_new::new;
use kernel::model::{
    facility::{Facility, Venue},
    id::{FacilityId, UserId, VenueId},
};
use kernel::repository::facility::FacilityRepository;
use shared::error::{AppError, AppResult};
use std::collections::HashMap;

#[derive(new)]
pub struct FacilityRepositoryImpl {
    db: ConnectionPool,
}

#[async_trait]
impl FacilityRepository for FacilityRepositoryImpl {
    async fn find_all(&self) -> AppResult<Vec<Facility>> {
        let facility_rows: Vec<FacilityRow> = sqlx::query_as(
            r#"
                SELECT facility_id, name, location
                FROM facilities
                ORDER BY created_at DESC
            "#,
        )
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        // 施設・ヴェニュー・アメニティ・管理者を個別に取得して
        // メモリ上でまとめる（件数は読み取り中心のカタログ規模を想定）
        let manager_rows: Vec<FacilityManagerRow> =
            sqlx::query_as("SELECT facility_id, user_id FROM facility_managers")
                .fetch_all(self.db.inner_ref())
                .await
                .map_err(AppError::SpecificOperationError)?;
        let venue_rows: Vec<VenueRow> = sqlx::query_as(
            r#"
                SELECT venue_id, facility_id, venue_name, price_per_hour, is_bookable
                FROM venues
            "#,
        )
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;
        let amenity_rows: Vec<AmenityRow> = sqlx::query_as(
            r#"
                SELECT amenity_id, venue_id, amenity_name, surcharge
                FROM amenities
            "#,
        )
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        let mut amenities_by_venue: HashMap<VenueId, Vec<AmenityRow>> = HashMap::new();
        for row in amenity_rows {
            amenities_by_venue.entry(row.venue_id).or_default().push(row);
        }
        let mut venues_by_facility: HashMap<FacilityId, Vec<Venue>> = HashMap::new();
        for row in venue_rows {
            let amenities = amenities_by_venue.remove(&row.venue_id).unwrap_or_default();
            venues_by_facility
                .entry(row.facility_id)
                .or_default()
                .push(row.into_venue(amenities));
        }
        let mut managers_by_facility: HashMap<FacilityId, Vec<UserId>> = HashMap::new();
        for row in manager_rows {
            managers_by_facility
                .entry(row.facility_id)
                .or_default()
                .push(row.user_id);
        }

        Ok(facility_rows
            .into_iter()
            .map(|row| {
                let facility_id = row.facility_id;
                row.into_facility(
                    managers_by_facility.remove(&facility_id).unwrap_or_default(),
                    venues_by_facility.remove(&facility_id).unwrap_or_default(),
                )
            })
            .collect())
    }

    async fn find_by_id(&self, facility_id: FacilityId) -> AppResult<Option<Facility>> {
        let row: Option<FacilityRow> = sqlx::query_as(
            r#"
                SELECT facility_id, name, location
                FROM facilities
                WHERE facility_id = $1
            "#,
        )
        .bind(facility_id)
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        match row {
            None => Ok(None),
            Some(row) => Ok(Some(self.load_children(row).await?)),
        }
    }

    async fn find_managed_by(&self, user_id: UserId) -> AppResult<Option<Facility>> {
        let row: Option<FacilityRow> = sqlx::query_as(
            r#"
                SELECT f.facility_id, f.name, f.location
                FROM facilities AS f
                INNER JOIN facility_managers AS m ON f.facility_id = m.facility_id
                WHERE m.user_id = $1
                LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        match row {
            None => Ok(None),
            Some(row) => Ok(Some(self.load_children(row).await?)),
        }
    }
}

impl FacilityRepositoryImpl {
    // 施設 1 件分のヴェニュー・アメニティ・管理者を取得して組み立てる
    async fn load_children(&self, row: FacilityRow) -> AppResult<Facility> {
        let manager_ids: Vec<UserId> = sqlx::query_scalar(
            "SELECT user_id FROM facility_managers WHERE facility_id = $1",
        )
        .bind(row.facility_id)
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        let venue_rows: Vec<VenueRow> = sqlx::query_as(
            r#"
                SELECT venue_id, facility_id, venue_name, price_per_hour, is_bookable
                FROM venues
                WHERE facility_id = $1
            "#,
        )
        .bind(row.facility_id)
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        let mut venues = Vec::with_capacity(venue_rows.len());
        for venue_row in venue_rows {
            let amenities: Vec<AmenityRow> = sqlx::query_as(
                r#"
                    SELECT amenity_id, venue_id, amenity_name, surcharge
                    FROM amenities
                    WHERE venue_id = $1
                "#,
            )
            .bind(venue_row.venue_id)
            .fetch_all(self.db.inner_ref())
            .await
            .map_err(AppError::SpecificOperationError)?;
            venues.push(venue_row.into_venue(amenities));
        }

        Ok(row.into_facility(manager_ids, venues))
    }
}
