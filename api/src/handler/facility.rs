use axum::{
    extract::{Path, State},
    Json,
};
use kernel::model::id::FacilityId;
use registry::AppRegistry;
use shared::error::{AppError, AppResult};

use crate::model::facility::{FacilitiesResponse, FacilityResponse};

/// 施設一覧。認証不要（ゲストも予約前に閲覧できる）
pub async fn show_facility_list(
    State(registry): State<AppRegistry>,
) -> AppResult<Json<FacilitiesResponse>> {
    registry
        .facility_repository()
        .find_all()
        .await
        .map(FacilitiesResponse::from)
        .map(Json)
}

pub async fn show_facility(
    Path(facility_id): Path<FacilityId>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<FacilityResponse>> {
    let facility = registry
        .facility_repository()
        .find_by_id(facility_id)
        .await?
        .ok_or_else(|| {
            AppError::EntityNotFound(format!("施設（{facility_id}）が見つかりませんでした。"))
        })?;
    Ok(Json(FacilityResponse::from(facility)))
}
