use crate::{BoundingRegion, PositionFix, haversine_km};
use serde::{Deserialize, Serialize};

// Fixed blend weights: an accepted fix is smoothed 70/30 against the
// previous accepted (already-smoothed) fix.
pub const BLEND_NEW_WEIGHT: f64 = 0.7;
pub const BLEND_PREVIOUS_WEIGHT: f64 = 0.3;

/// Default ceiling on plausible movement between consecutive accepted fixes.
pub const DEFAULT_MAX_JUMP_KM: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionFilterConfig {
    pub region: BoundingRegion,
    pub max_jump_km: f64,
}

/// Why a candidate fix was not trusted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RejectReason {
    OutsideRegion,
    ErraticJump { distance_km: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterOutcome {
    /// The fix passed both gates; carries the smoothed coordinate to store.
    Accepted(PositionFix),
    /// The fix was dropped; the previous accepted fix stays authoritative.
    Rejected(RejectReason),
}

impl FilterOutcome {
    pub fn accepted_fix(&self) -> Option<PositionFix> {
        match self {
            FilterOutcome::Accepted(fix) => Some(*fix),
            FilterOutcome::Rejected(_) => None,
        }
    }
}

/// Validates and smooths raw fixes before anything downstream trusts them.
///
/// Pure: the single piece of history it needs, the previous accepted fix,
/// is threaded in by the caller and handed back inside the outcome.
#[derive(Debug, Clone)]
pub struct PositionFilter {
    config: PositionFilterConfig,
}

impl PositionFilter {
    pub fn new(config: PositionFilterConfig) -> Self {
        Self { config }
    }

    pub fn filter(&self, previous: Option<&PositionFix>, candidate: &PositionFix) -> FilterOutcome {
        if !self.config.region.contains(candidate) {
            return FilterOutcome::Rejected(RejectReason::OutsideRegion);
        }

        let Some(previous) = previous else {
            // First fix for the device: nothing to compare or blend against.
            return FilterOutcome::Accepted(*candidate);
        };

        let distance_km = haversine_km(previous, candidate);
        if distance_km > self.config.max_jump_km {
            return FilterOutcome::Rejected(RejectReason::ErraticJump { distance_km });
        }

        FilterOutcome::Accepted(PositionFix {
            latitude: blend(candidate.latitude, previous.latitude),
            longitude: blend(candidate.longitude, previous.longitude),
        })
    }
}

fn blend(new: f64, previous: f64) -> f64 {
    BLEND_NEW_WEIGHT * new + BLEND_PREVIOUS_WEIGHT * previous
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_filter() -> PositionFilter {
        PositionFilter::new(PositionFilterConfig {
            region: BoundingRegion::new(5.8, 79.4, 9.9, 82.0),
            max_jump_km: DEFAULT_MAX_JUMP_KM,
        })
    }

    #[test]
    fn test_first_fix_accepted_unblended() {
        let candidate = PositionFix::new(6.9271, 79.8612);

        let outcome = test_filter().filter(None, &candidate);

        assert_eq!(outcome, FilterOutcome::Accepted(candidate));
    }

    #[test]
    fn test_fix_outside_region_rejected() {
        let previous = PositionFix::new(6.9271, 79.8612);
        let candidate = PositionFix::new(13.0847, 80.2705);

        let outcome = test_filter().filter(Some(&previous), &candidate);

        assert_eq!(
            outcome,
            FilterOutcome::Rejected(RejectReason::OutsideRegion)
        );
    }

    #[test]
    fn test_region_gate_applies_to_first_fix_too() {
        let outcome = test_filter().filter(None, &PositionFix::new(0.0, 0.0));

        assert_eq!(
            outcome,
            FilterOutcome::Rejected(RejectReason::OutsideRegion)
        );
    }

    #[test]
    fn test_jump_over_threshold_rejected_as_erratic() {
        // 0.0108 degrees of latitude is roughly 1.2 km, over the 1.0 km cap
        // for a single sampling interval.
        let previous = PositionFix::new(6.9271, 79.8612);
        let candidate = PositionFix::new(6.9379, 79.8612);

        let outcome = test_filter().filter(Some(&previous), &candidate);

        match outcome {
            FilterOutcome::Rejected(RejectReason::ErraticJump { distance_km }) => {
                assert!(distance_km > 1.15 && distance_km < 1.25, "got {distance_km}");
            }
            other => panic!("expected erratic rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_jump_under_threshold_accepted() {
        // About 0.89 km, inside the cap.
        let previous = PositionFix::new(6.9271, 79.8612);
        let candidate = PositionFix::new(6.9351, 79.8612);

        let outcome = test_filter().filter(Some(&previous), &candidate);

        assert!(outcome.accepted_fix().is_some());
    }

    #[test]
    fn test_accepted_fix_is_blended_70_30() {
        let previous = PositionFix::new(6.9000, 79.8500);
        let candidate = PositionFix::new(6.9010, 79.8510);

        let outcome = test_filter().filter(Some(&previous), &candidate);

        let smoothed = outcome.accepted_fix().unwrap();
        assert!((smoothed.latitude - (0.7 * 6.9010 + 0.3 * 6.9000)).abs() < 1e-12);
        assert!((smoothed.longitude - (0.7 * 79.8510 + 0.3 * 79.8500)).abs() < 1e-12);
    }

    #[test]
    fn test_smoothing_is_order_dependent_and_deterministic() {
        // Threading each smoothed fix back in as the next call's previous
        // gives F2' = 0.7*F2 + 0.3*F1 and F3' = 0.7*F3 + 0.3*F2'.
        let filter = test_filter();
        let f1 = PositionFix::new(6.9000, 79.8500);
        let f2 = PositionFix::new(6.9010, 79.8510);
        let f3 = PositionFix::new(6.9020, 79.8520);

        let f2_smoothed = filter.filter(Some(&f1), &f2).accepted_fix().unwrap();
        let f3_smoothed = filter
            .filter(Some(&f2_smoothed), &f3)
            .accepted_fix()
            .unwrap();

        let expected_f2_lat = 0.7 * f2.latitude + 0.3 * f1.latitude;
        let expected_f3_lat = 0.7 * f3.latitude + 0.3 * expected_f2_lat;
        assert!((f2_smoothed.latitude - expected_f2_lat).abs() < 1e-12);
        assert!((f3_smoothed.latitude - expected_f3_lat).abs() < 1e-12);

        let expected_f2_lon = 0.7 * f2.longitude + 0.3 * f1.longitude;
        let expected_f3_lon = 0.7 * f3.longitude + 0.3 * expected_f2_lon;
        assert!((f2_smoothed.longitude - expected_f2_lon).abs() < 1e-12);
        assert!((f3_smoothed.longitude - expected_f3_lon).abs() < 1e-12);
    }

    #[test]
    fn test_region_gate_wins_over_erratic_gate() {
        // An out-of-region fix is classified as such even when it is also
        // implausibly far away.
        let previous = PositionFix::new(6.9271, 79.8612);
        let candidate = PositionFix::new(48.8566, 2.3522);

        let outcome = test_filter().filter(Some(&previous), &candidate);

        assert_eq!(
            outcome,
            FilterOutcome::Rejected(RejectReason::OutsideRegion)
        );
    }
}
