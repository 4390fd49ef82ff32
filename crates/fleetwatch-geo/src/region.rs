use crate::PositionFix;
use serde::{Deserialize, Serialize};

/// Rectangular latitude/longitude envelope over the deployment's operating
/// territory. Fixes outside it are never trusted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingRegion {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

impl BoundingRegion {
    /// Builds the envelope from two opposite corners, normalizing their order.
    pub fn new(lat_a: f64, lon_a: f64, lat_b: f64, lon_b: f64) -> Self {
        Self {
            min_latitude: lat_a.min(lat_b),
            max_latitude: lat_a.max(lat_b),
            min_longitude: lon_a.min(lon_b),
            max_longitude: lon_a.max(lon_b),
        }
    }

    pub fn contains(&self, fix: &PositionFix) -> bool {
        (self.min_latitude..=self.max_latitude).contains(&fix.latitude)
            && (self.min_longitude..=self.max_longitude).contains(&fix.longitude)
    }
}
