use crate::types::{
    DeviceProfile, Notification, NotificationCategory, TransitionEvent, TransitionKind,
};
use chrono::Local;

/// Renders a fired transition into user-facing push content. Bodies carry
/// the sample's local date and 12-hour time; speed-class bodies also carry
/// the numeric speed.
pub fn compose(event: &TransitionEvent, profile: &DeviceProfile) -> Notification {
    let label = match event.kind {
        TransitionKind::IgnitionOn => "Ignition On",
        TransitionKind::IgnitionOff => "Ignition Off",
        TransitionKind::StartedMoving => "Vehicle is Running",
        TransitionKind::StoppedMoving => "Vehicle Stopped",
        TransitionKind::OverspeedStarted => "Vehicle is Overspeed",
        TransitionKind::OverspeedEnded => "Overspeed Ended",
    };

    let at = event
        .timestamp
        .with_timezone(&Local)
        .format("%d/%m/%Y %I:%M %p")
        .to_string();
    let name = &profile.display_name;
    let speed = event.speed.unwrap_or_default();

    let body = match event.kind {
        TransitionKind::IgnitionOn => format!("Ignition of {name} turned on at {at}"),
        TransitionKind::IgnitionOff => format!("Ignition of {name} turned off at {at}"),
        TransitionKind::StartedMoving => format!("{name} is running at {speed} km/h, {at}"),
        TransitionKind::StoppedMoving => format!("{name} stopped at {at}"),
        TransitionKind::OverspeedStarted => format!("{name} is overspeeding at {speed} km/h, {at}"),
        TransitionKind::OverspeedEnded => format!("{name} speed back to normal at {at}"),
    };

    Notification {
        title: format!("{}: {label}", profile.registration_number),
        body,
        category: NotificationCategory::Alert,
    }
}
