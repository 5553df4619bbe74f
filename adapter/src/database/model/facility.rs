use kernel::model::{
    facility::{Amenity, Facility, Venue},
    id::{AmenityId, FacilityId, UserId, VenueId},
};
use rust_decimal::Decimal;

#[derive(Debug, sqlx::FromRow)]
pub struct FacilityRow {
    pub facility_id: FacilityId,
    pub name: String,
    pub location: String,
}

#[derive(Debug, sqlx::FromRow)]
pub struct FacilityManagerRow {
    pub facility_id: FacilityId,
    pub user_id: UserId,
}

#[derive(Debug, sqlx::FromRow)]
pub struct VenueRow {
    pub venue_id: VenueId,
    pub facility_id: FacilityId,
    pub venue_name: String,
    pub price_per_hour: Decimal,
    pub is_bookable: bool,
}

#[derive(Debug, sqlx::FromRow)]
pub struct AmenityRow {
    pub amenity_id: AmenityId,
    pub venue_id: VenueId,
    pub amenity_name: String,
    pub surcharge: Decimal,
}

impl From<AmenityRow> for Amenity {
    fn from(value: AmenityRow) -> Self {
        let AmenityRow {
            amenity_id,
            venue_id,
            amenity_name,
            surcharge,
        } = value;
        Self {
            amenity_id,
            venue_id,
            amenity_name,
            surcharge,
        }
    }
}

impl VenueRow {
    pub fn into_venue(self, amenities: Vec<AmenityRow>) -> Venue {
        let VenueRow {
            venue_id,
            facility_id,
            venue_name,
            price_per_hour,
            is_bookable,
        } = self;
        Venue {
            venue_id,
            facility_id,
            venue_name,
            price_per_hour,
            is_bookable,
            amenities: amenities.into_iter().map(Amenity::from).collect(),
        }
    }
}

impl FacilityRow {
    pub fn into_facility(self, manager_ids: Vec<UserId>, venues: Vec<Venue>) -> Facility {
        let FacilityRow {
            facility_id,
            name,
            location,
        } = self;
        Facility {
            facility_id,
            name,
            location,
            manager_ids,
            venues,
        }
    }
}
