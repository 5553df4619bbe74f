use crate::model::id::{AmenityId, FacilityId, UserId, VenueId};
use rust_decimal::Decimal;

/// 施設。1 つ以上のヴェニューを所有し、manager_ids のユーザーが管理する。
/// カタログは読み取り中心であり、編集は本コアの外の管理フローで行われる。
#[derive(Debug, Clone)]
pub struct Facility {
    pub facility_id: FacilityId,
    pub name: String,
    pub location: String,
    pub manager_ids: Vec<UserId>,
    pub venues: Vec<Venue>,
}

impl Facility {
    pub fn find_venue(&self, venue_id: VenueId) -> Option<&Venue> {
        self.venues.iter().find(|v| v.venue_id == venue_id)
    }
}

/// 予約可能なスペース。時間単価とアメニティを持つ。
/// is_bookable が false のヴェニューは予約エンジンに受け付けられない。
#[derive(Debug, Clone)]
pub struct Venue {
    pub venue_id: VenueId,
    pub facility_id: FacilityId,
    pub venue_name: String,
    // 非負。カタログ編集側で検証済みの値が入る
    pub price_per_hour: Decimal,
    pub is_bookable: bool,
    pub amenities: Vec<Amenity>,
}

impl Venue {
    pub fn find_amenity(&self, amenity_id: AmenityId) -> Option<&Amenity> {
        self.amenities.iter().find(|a| a.amenity_id == amenity_id)
    }
}

/// ヴェニューのオプション設備。サーチャージは 1 予約あたりの定額で、
/// 利用時間には比例しない。
#[derive(Debug, Clone)]
pub struct Amenity {
    pub amenity_id: AmenityId,
    pub venue_id: VenueId,
    pub amenity_name: String,
    pub surcharge: Decimal,
}
