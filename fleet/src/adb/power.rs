use fleet_common::FleetResult;
use tracing::debug;

use super::{is_off, is_screen_on, model, orientation, press, quirks_for, swipe, UnlockPolicy};
use crate::bridge::Bridge;
use crate::exec::ExecResult;

pub async fn shutdown(bridge: &Bridge, handle: &str) -> ExecResult {
    bridge.shell(handle, &["reboot", "-p"]).await
}

pub async fn reboot(bridge: &Bridge, handle: &str) -> ExecResult {
    bridge.shell(handle, &["reboot"]).await
}

/// Reboot units sitting powered off on the charging screen.
///
/// Returns whether a reboot was issued.
pub async fn turn_on(bridge: &Bridge, handle: &str) -> bool {
    if is_off(bridge, handle).await {
        reboot(bridge, handle).await;
        return true;
    }
    false
}

/// Toggle the screen with the power button when it is not already in `on` state.
///
/// Returns whether the button was pressed.
pub async fn turn_screen(bridge: &Bridge, handle: &str, on: bool) -> FleetResult<bool> {
    if is_screen_on(bridge, handle).await == on {
        return Ok(false);
    }
    press(bridge, handle, "power").await?;
    Ok(true)
}

/// Wake the screen and apply the model's unlock gesture
pub async fn unlock(bridge: &Bridge, handle: &str) -> FleetResult<UnlockPolicy> {
    turn_screen(bridge, handle, true).await?;

    let policy = quirks_for(&model(bridge, handle).await).unlock;
    debug!(device = handle, ?policy, "Unlocking");

    match policy {
        UnlockPolicy::Swipe { from, to } => {
            swipe(bridge, handle, from, to).await;
        }
        UnlockPolicy::OrientedSwipe {
            portrait,
            landscape,
        } => {
            let (from, to) = if orientation(bridge, handle).await.is_portrait() {
                portrait
            } else {
                landscape
            };
            swipe(bridge, handle, from, to).await;
        }
        UnlockPolicy::MenuButton => {
            press(bridge, handle, "menu").await?;
        }
    }

    Ok(policy)
}
