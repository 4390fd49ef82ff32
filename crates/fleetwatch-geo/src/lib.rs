pub mod filter;
pub mod haversine;
pub mod region;

pub use filter::{
    BLEND_NEW_WEIGHT, BLEND_PREVIOUS_WEIGHT, DEFAULT_MAX_JUMP_KM, FilterOutcome, PositionFilter,
    PositionFilterConfig, RejectReason,
};
pub use haversine::{EARTH_RADIUS_KM, haversine_km};
pub use region::BoundingRegion;

use serde::{Deserialize, Serialize};

/// A single reported geographic position, in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    pub latitude: f64,
    pub longitude: f64,
}

impl PositionFix {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}
