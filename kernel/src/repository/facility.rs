use crate::model::{
    facility::Facility,
    id::{FacilityId, UserId},
};
use async_trait::async_trait;
use shared::error::AppResult;

/// カタログの読み取り。編集は本コアの外の管理フローで行われる。
#[async_trait]
pub trait FacilityRepository: Send + Sync {
    async fn find_all(&self) -> AppResult<Vec<Facility>>;
    async fn find_by_id(&self, facility_id: FacilityId) -> AppResult<Option<Facility>>;
    /// 指定ユーザーが manager として登録されている施設を返す。
    async fn find_managed_by(&self, user_id: UserId) -> AppResult<Option<Facility>>;
}
