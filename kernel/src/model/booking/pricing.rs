use crate::model::{facility::Venue, id::AmenityId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// 料金見積もり。hours は丸めず実数のまま保持する（表示側でのみ丸める）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceQuote {
    pub hours: Decimal,
    pub base_price: Decimal,
    pub amenity_surcharge: Decimal,
    pub total_price: Decimal,
    pub amenity_ids: Vec<AmenityId>,
}

/// 料金計算。基本料金は利用時間 × 時間単価、
/// サーチャージは選択されたアメニティの定額の合計。
/// ヴェニューに存在しない ID や重複 ID は黙って除外され、
/// サーチャージにも保存される選択リストにも含まれない。
pub fn compute_price(
    venue: &Venue,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    selected: &[AmenityId],
) -> PriceQuote {
    let hours = Decimal::from((end - start).num_seconds()) / Decimal::from(3600);
    let base_price = hours * venue.price_per_hour;

    let mut amenity_surcharge = Decimal::ZERO;
    let mut amenity_ids: Vec<AmenityId> = Vec::new();
    for amenity_id in selected {
        if amenity_ids.contains(amenity_id) {
            continue;
        }
        if let Some(amenity) = venue.find_amenity(*amenity_id) {
            amenity_surcharge += amenity.surcharge;
            amenity_ids.push(*amenity_id);
        }
    }

    PriceQuote {
        hours,
        base_price,
        amenity_surcharge,
        total_price: base_price + amenity_surcharge,
        amenity_ids,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        facility::Amenity,
        id::{FacilityId, VenueId},
    };
    use chrono::Duration;

    fn venue_with_amenity() -> (Venue, AmenityId) {
        let venue_id = VenueId::new();
        let amenity_id = AmenityId::new();
        let venue = Venue {
            venue_id,
            facility_id: FacilityId::new(),
            venue_name: "会議室A".into(),
            price_per_hour: Decimal::from(100),
            is_bookable: true,
            amenities: vec![Amenity {
                amenity_id,
                venue_id,
                amenity_name: "プロジェクター".into(),
                surcharge: Decimal::from(25),
            }],
        };
        (venue, amenity_id)
    }

    #[test]
    fn base_plus_surcharge() {
        let (venue, amenity_id) = venue_with_amenity();
        let start = Utc::now();
        let quote = compute_price(&venue, start, start + Duration::hours(2), &[amenity_id]);
        assert_eq!(quote.hours, Decimal::from(2));
        assert_eq!(quote.base_price, Decimal::from(200));
        assert_eq!(quote.amenity_surcharge, Decimal::from(25));
        assert_eq!(quote.total_price, Decimal::from(225));
        assert_eq!(quote.amenity_ids, vec![amenity_id]);
    }

    #[test]
    fn unknown_amenity_is_silently_dropped() {
        let (venue, amenity_id) = venue_with_amenity();
        let start = Utc::now();
        let quote = compute_price(
            &venue,
            start,
            start + Duration::hours(2),
            &[AmenityId::new(), amenity_id],
        );
        // 不明な ID は合計にも選択リストにも影響しない
        assert_eq!(quote.total_price, Decimal::from(225));
        assert_eq!(quote.amenity_ids, vec![amenity_id]);
    }

    #[test]
    fn duplicate_amenity_is_counted_once() {
        let (venue, amenity_id) = venue_with_amenity();
        let start = Utc::now();
        let quote = compute_price(
            &venue,
            start,
            start + Duration::hours(2),
            &[amenity_id, amenity_id],
        );
        assert_eq!(quote.amenity_surcharge, Decimal::from(25));
        assert_eq!(quote.amenity_ids, vec![amenity_id]);
    }

    #[test]
    fn fractional_hours_are_not_rounded() {
        let (venue, _) = venue_with_amenity();
        let start = Utc::now();
        let quote = compute_price(&venue, start, start + Duration::minutes(90), &[]);
        assert_eq!(quote.hours, Decimal::new(15, 1)); // 1.5
        assert_eq!(quote.base_price, Decimal::from(150));
    }
}
