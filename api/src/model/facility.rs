use kernel::model::{
    facility::{Amenity, Facility, Venue},
    id::{AmenityId, FacilityId, UserId, VenueId},
};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityResponse {
    pub facility_id: FacilityId,
    pub name: String,
    pub location: String,
    pub manager_ids: Vec<UserId>,
    pub venues: Vec<VenueResponse>,
}

impl From<Facility> for FacilityResponse {
    fn from(value: Facility) -> Self {
        let Facility {
            facility_id,
            name,
            location,
            manager_ids,
            venues,
        } = value;
        FacilityResponse {
            facility_id,
            name,
            location,
            manager_ids,
            venues: venues.into_iter().map(VenueResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VenueResponse {
    pub venue_id: VenueId,
    pub venue_name: String,
    pub price_per_hour: Decimal,
    pub is_bookable: bool,
    pub amenities: Vec<AmenityResponse>,
}

impl From<Venue> for VenueResponse {
    fn from(value: Venue) -> Self {
        let Venue {
            venue_id,
            facility_id: _,
            venue_name,
            price_per_hour,
            is_bookable,
            amenities,
        } = value;
        VenueResponse {
            venue_id,
            venue_name,
            price_per_hour,
            is_bookable,
            amenities: amenities.into_iter().map(AmenityResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmenityResponse {
    pub amenity_id: AmenityId,
    pub amenity_name: String,
    pub surcharge: Decimal,
}

impl From<Amenity> for AmenityResponse {
    fn from(value: Amenity) -> Self {
        let Amenity {
            amenity_id,
            venue_id: _,
            amenity_name,
            surcharge,
        } = value;
        AmenityResponse {
            amenity_id,
            amenity_name,
            surcharge,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilitiesResponse {
    pub facilities: Vec<FacilityResponse>,
}

impl From<Vec<Facility>> for FacilitiesResponse {
    fn from(value: Vec<Facility>) -> Self {
        FacilitiesResponse {
            facilities: value.into_iter().map(FacilityResponse::from).collect(),
        }
    }
}
