use fleet_common::FleetResult;

use super::{keycode, model, quirks_for, Point};
use crate::bridge::Bridge;
use crate::exec::ExecResult;

/// Gesture length appended to `input swipe` on models that accept it
pub const SWIPE_DURATION_MS: u32 = 500;

/// Shell arguments for a tap
pub fn tap_args(location: Point) -> Vec<String> {
    vec![
        "input".to_string(),
        "tap".to_string(),
        location.0.to_string(),
        location.1.to_string(),
    ]
}

/// Shell arguments for a swipe, with or without the trailing duration
pub fn swipe_args(start: Point, end: Point, with_duration: bool) -> Vec<String> {
    let mut args = vec![
        "input".to_string(),
        "swipe".to_string(),
        start.0.to_string(),
        start.1.to_string(),
        end.0.to_string(),
        end.1.to_string(),
    ];

    if with_duration {
        args.push(SWIPE_DURATION_MS.to_string());
    }

    args
}

/// Shell arguments for pressing a named button
pub fn press_args(button: &str) -> FleetResult<Vec<String>> {
    let code = keycode(button)?;
    Ok(vec![
        "input".to_string(),
        "keyevent".to_string(),
        code.to_string(),
    ])
}

pub async fn tap(bridge: &Bridge, handle: &str, location: Point) -> ExecResult {
    bridge.shell(handle, &tap_args(location)).await
}

/// Swipe between two points; the device model decides whether a duration is sent
pub async fn swipe(bridge: &Bridge, handle: &str, start: Point, end: Point) -> ExecResult {
    let quirks = quirks_for(&model(bridge, handle).await);
    bridge
        .shell(handle, &swipe_args(start, end, quirks.swipe_duration))
        .await
}

pub async fn press(bridge: &Bridge, handle: &str, button: &str) -> FleetResult<ExecResult> {
    let args = press_args(button)?;
    Ok(bridge.shell(handle, &args).await)
}
