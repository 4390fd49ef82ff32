use crate::types::{
    DeviceProfile, DeviceState, IgnitionStatus, TelemetryEvent, TransitionEvent, TransitionKind,
};

/// Strict lower bound for the moving classification, km/h.
pub const MOVING_SPEED_THRESHOLD_KMH: u32 = 5;

/// Result of classifying one sample against a device's prior state.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub events: Vec<TransitionEvent>,
    pub state: DeviceState,
    pub last_ignition: Option<IgnitionStatus>,
}

/// Classifies one sample and returns the edges that fired together with the
/// advanced state. Pure; the caller commits the returned state and ignition
/// under the store lock.
///
/// A sample yields at most one ignition-class and one speed-class event.
/// When the overspeed and moving edges rise on the same sample, only the
/// overspeed event fires; both flags are still set.
pub fn detect(
    state: &DeviceState,
    last_ignition: Option<IgnitionStatus>,
    report: &TelemetryEvent,
    profile: &DeviceProfile,
) -> Detection {
    let mut events = Vec::new();
    let mut next_state = state.clone();
    let mut next_ignition = last_ignition;

    // Ignition edges compare against the last known non-unknown value.
    if report.ignition != IgnitionStatus::Unknown {
        match (last_ignition, report.ignition) {
            (Some(IgnitionStatus::Off) | None, IgnitionStatus::On) => {
                events.push(transition(report, TransitionKind::IgnitionOn));
            }
            (Some(IgnitionStatus::On), IgnitionStatus::Off) => {
                events.push(transition(report, TransitionKind::IgnitionOff));
            }
            // First-ever OFF, or no change: recorded without an event.
            _ => {}
        }
        next_ignition = Some(report.ignition);
    }

    // Speed classes run only on samples that carry a speed. Falling edges
    // clear the flags without an event.
    if let Some(speed) = report.speed {
        let overspeeding = speed > profile.overspeed_threshold;
        let moving = speed > MOVING_SPEED_THRESHOLD_KMH;

        if overspeeding && !state.is_overspeeding {
            events.push(transition(report, TransitionKind::OverspeedStarted));
        } else if moving && !state.is_moving {
            events.push(transition(report, TransitionKind::StartedMoving));
        }

        next_state.is_overspeeding = overspeeding;
        next_state.is_moving = moving;
        next_state.last_speed = speed;
        next_state.last_update = report.timestamp;
    }

    Detection {
        events,
        state: next_state,
        last_ignition: next_ignition,
    }
}

fn transition(report: &TelemetryEvent, kind: TransitionKind) -> TransitionEvent {
    TransitionEvent {
        device_id: report.device_id.clone(),
        kind,
        speed: report.speed,
        ignition: match report.ignition {
            IgnitionStatus::Unknown => None,
            known => Some(known),
        },
        timestamp: report.timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DEFAULT_OVERSPEED_THRESHOLD_KMH;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 14, 8, 0, 0).unwrap()
    }

    fn test_profile() -> DeviceProfile {
        DeviceProfile {
            device_id: "device-1".to_string(),
            display_name: "Demo Lorry".to_string(),
            registration_number: "CAB-1234".to_string(),
            overspeed_threshold: DEFAULT_OVERSPEED_THRESHOLD_KMH,
        }
    }

    fn test_report(speed: Option<u32>, ignition: IgnitionStatus) -> TelemetryEvent {
        TelemetryEvent {
            device_id: "device-1".to_string(),
            timestamp: base_time() + Duration::seconds(30),
            position: None,
            speed,
            ignition,
        }
    }

    fn kinds(detection: &Detection) -> Vec<TransitionKind> {
        detection.events.iter().map(|event| event.kind).collect()
    }

    /// Folds a sample sequence through `detect`, threading state and prior
    /// ignition the way the store does, and collects every fired kind.
    fn fold(
        samples: &[(Option<u32>, IgnitionStatus)],
        mut state: DeviceState,
        mut last_ignition: Option<IgnitionStatus>,
    ) -> (Vec<TransitionKind>, DeviceState, Option<IgnitionStatus>) {
        let profile = test_profile();
        let mut fired = Vec::new();
        for (index, (speed, ignition)) in samples.iter().enumerate() {
            let report = TelemetryEvent {
                device_id: "device-1".to_string(),
                timestamp: base_time() + Duration::seconds(30 * (index as i64 + 1)),
                position: None,
                speed: *speed,
                ignition: *ignition,
            };
            let detection = detect(&state, last_ignition, &report, &profile);
            fired.extend(detection.events.iter().map(|event| event.kind));
            state = detection.state;
            last_ignition = detection.last_ignition;
        }
        (fired, state, last_ignition)
    }

    #[test]
    fn test_first_ignition_on_fires_exactly_one_event() {
        let state = DeviceState::new("device-1", base_time());
        let report = test_report(None, IgnitionStatus::On);

        let detection = detect(&state, None, &report, &test_profile());

        assert_eq!(kinds(&detection), vec![TransitionKind::IgnitionOn]);
        assert_eq!(detection.last_ignition, Some(IgnitionStatus::On));
        // Motion bookkeeping is untouched by an ignition-only sample.
        assert_eq!(detection.state, state);
    }

    #[test]
    fn test_first_ignition_off_is_recorded_silently() {
        let state = DeviceState::new("device-1", base_time());
        let report = test_report(None, IgnitionStatus::Off);

        let detection = detect(&state, None, &report, &test_profile());

        assert!(detection.events.is_empty());
        assert_eq!(detection.last_ignition, Some(IgnitionStatus::Off));
    }

    #[test]
    fn test_ignition_on_to_off_fires_ignition_off() {
        let state = DeviceState::new("device-1", base_time());
        let report = test_report(None, IgnitionStatus::Off);

        let detection = detect(&state, Some(IgnitionStatus::On), &report, &test_profile());

        assert_eq!(kinds(&detection), vec![TransitionKind::IgnitionOff]);
        assert_eq!(detection.last_ignition, Some(IgnitionStatus::Off));
    }

    #[test]
    fn test_unchanged_ignition_fires_nothing() {
        let state = DeviceState::new("device-1", base_time());
        let report = test_report(None, IgnitionStatus::On);

        let detection = detect(&state, Some(IgnitionStatus::On), &report, &test_profile());

        assert!(detection.events.is_empty());
    }

    #[test]
    fn test_unknown_ignition_is_skipped_and_prior_kept() {
        let state = DeviceState::new("device-1", base_time());
        let report = test_report(Some(20), IgnitionStatus::Unknown);

        let detection = detect(&state, Some(IgnitionStatus::On), &report, &test_profile());

        assert_eq!(kinds(&detection), vec![TransitionKind::StartedMoving]);
        assert_eq!(detection.last_ignition, Some(IgnitionStatus::On));
        assert_eq!(detection.events[0].ignition, None);
    }

    #[test]
    fn test_moving_boundary_is_strict() {
        let state = DeviceState::new("device-1", base_time());
        let profile = test_profile();

        let at_threshold = detect(
            &state,
            None,
            &test_report(Some(5), IgnitionStatus::Unknown),
            &profile,
        );
        assert!(at_threshold.events.is_empty());
        assert!(!at_threshold.state.is_moving);

        let above_threshold = detect(
            &state,
            None,
            &test_report(Some(6), IgnitionStatus::Unknown),
            &profile,
        );
        assert_eq!(kinds(&above_threshold), vec![TransitionKind::StartedMoving]);
        assert!(above_threshold.state.is_moving);
    }

    #[test]
    fn test_overspeed_boundary_is_strict() {
        let mut state = DeviceState::new("device-1", base_time());
        state.is_moving = true;
        let profile = test_profile();

        let at_threshold = detect(
            &state,
            None,
            &test_report(Some(profile.overspeed_threshold), IgnitionStatus::Unknown),
            &profile,
        );
        assert!(at_threshold.events.is_empty());
        assert!(!at_threshold.state.is_overspeeding);

        let above_threshold = detect(
            &state,
            None,
            &test_report(Some(profile.overspeed_threshold + 1), IgnitionStatus::Unknown),
            &profile,
        );
        assert_eq!(
            kinds(&above_threshold),
            vec![TransitionKind::OverspeedStarted]
        );
        assert!(above_threshold.state.is_overspeeding);
    }

    #[test]
    fn test_held_moving_fires_nothing_but_advances_bookkeeping() {
        let mut state = DeviceState::new("device-1", base_time());
        state.is_moving = true;
        state.last_speed = 20;
        let report = test_report(Some(33), IgnitionStatus::Unknown);

        let detection = detect(&state, None, &report, &test_profile());

        assert!(detection.events.is_empty());
        assert_eq!(detection.state.last_speed, 33);
        assert_eq!(detection.state.last_update, report.timestamp);
    }

    #[test]
    fn test_falling_edges_clear_flags_silently() {
        let mut state = DeviceState::new("device-1", base_time());
        state.is_moving = true;
        state.is_overspeeding = true;

        let detection = detect(
            &state,
            None,
            &test_report(Some(0), IgnitionStatus::Unknown),
            &test_profile(),
        );

        assert!(detection.events.is_empty());
        assert!(!detection.state.is_moving);
        assert!(!detection.state.is_overspeeding);
    }

    #[test]
    fn test_stop_then_restart_fires_started_moving_once_each_trip() {
        let start = DeviceState::new("device-1", base_time());

        let (fired, _, _) = fold(
            &[
                (Some(12), IgnitionStatus::Unknown),
                (Some(30), IgnitionStatus::Unknown),
                (Some(0), IgnitionStatus::Unknown),
                (Some(0), IgnitionStatus::Unknown),
                (Some(12), IgnitionStatus::Unknown),
            ],
            start,
            None,
        );

        assert_eq!(
            fired,
            vec![TransitionKind::StartedMoving, TransitionKind::StartedMoving]
        );
    }

    #[test]
    fn test_sample_without_speed_leaves_motion_state_untouched() {
        let mut state = DeviceState::new("device-1", base_time());
        state.is_moving = true;
        state.last_speed = 20;
        let report = test_report(None, IgnitionStatus::Unknown);

        let detection = detect(&state, None, &report, &test_profile());

        assert!(detection.events.is_empty());
        assert_eq!(detection.state, state);
    }

    #[test]
    fn test_ignition_and_speed_edges_fire_together() {
        let state = DeviceState::new("device-1", base_time());
        let report = test_report(Some(25), IgnitionStatus::On);

        let detection = detect(&state, Some(IgnitionStatus::Off), &report, &test_profile());

        assert_eq!(
            kinds(&detection),
            vec![TransitionKind::IgnitionOn, TransitionKind::StartedMoving]
        );
    }

    #[test]
    fn test_simultaneous_speed_edges_yield_only_overspeed() {
        let state = DeviceState::new("device-1", base_time());
        let report = test_report(Some(70), IgnitionStatus::Unknown);

        let detection = detect(&state, None, &report, &test_profile());

        assert_eq!(
            kinds(&detection),
            vec![TransitionKind::OverspeedStarted]
        );
        assert!(detection.state.is_moving);
        assert!(detection.state.is_overspeeding);
    }

    #[test]
    fn test_commute_sequence_fires_documented_kinds_in_order() {
        // Prime the prior ignition outside the measured window, then replay
        // a commute: pull away, speed up past the limit, settle back down,
        // ignition cycled near the end, and a fresh pull-away after the stop.
        let start = DeviceState::new("device-1", base_time());
        let (_, primed_state, primed_ignition) =
            fold(&[(None, IgnitionStatus::On)], start, None);

        let commute = [
            (Some(0), IgnitionStatus::On),
            (Some(0), IgnitionStatus::On),
            (Some(3), IgnitionStatus::On),
            (Some(8), IgnitionStatus::On),
            (Some(15), IgnitionStatus::On),
            (Some(25), IgnitionStatus::On),
            (Some(65), IgnitionStatus::On),
            (Some(70), IgnitionStatus::On),
            (Some(45), IgnitionStatus::Off),
            (Some(2), IgnitionStatus::On),
            (Some(0), IgnitionStatus::Unknown),
            (Some(8), IgnitionStatus::On),
        ];
        let (fired, _, _) = fold(&commute, primed_state, primed_ignition);

        assert_eq!(
            fired,
            vec![
                TransitionKind::StartedMoving,
                TransitionKind::OverspeedStarted,
                TransitionKind::IgnitionOff,
                TransitionKind::IgnitionOn,
                TransitionKind::StartedMoving,
            ]
        );
    }

    #[test]
    fn test_identical_sequences_from_clean_state_fire_identically() {
        let samples = [
            (Some(0), IgnitionStatus::On),
            (Some(8), IgnitionStatus::On),
            (Some(70), IgnitionStatus::On),
            (Some(40), IgnitionStatus::Off),
            (None, IgnitionStatus::Unknown),
            (Some(0), IgnitionStatus::On),
        ];

        let (first_run, _, _) = fold(&samples, DeviceState::new("device-1", base_time()), None);
        let (second_run, _, _) = fold(&samples, DeviceState::new("device-1", base_time()), None);

        assert!(!first_run.is_empty());
        assert_eq!(first_run, second_run);
    }

    #[test]
    fn test_event_carries_sample_speed_ignition_and_timestamp() {
        let state = DeviceState::new("device-1", base_time());
        let report = test_report(Some(72), IgnitionStatus::On);

        let detection = detect(&state, Some(IgnitionStatus::On), &report, &test_profile());

        let event = &detection.events[0];
        assert_eq!(event.kind, TransitionKind::OverspeedStarted);
        assert_eq!(event.device_id, "device-1");
        assert_eq!(event.speed, Some(72));
        assert_eq!(event.ignition, Some(IgnitionStatus::On));
        assert_eq!(event.timestamp, report.timestamp);
    }
}
