//! Per-model behaviour differences
//!
//! Unlocking is done with hard-coded gestures for the handful of models
//! that have been seen in the field; anything else falls back to pressing
//! `menu`. Supporting a new model means adding a row to [`MODEL_QUIRKS`].

use serde::Serialize;

pub type Point = (i32, i32);

/// How to get past the lock screen on a given model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnlockPolicy {
    /// A single swipe between two points
    Swipe { from: Point, to: Point },
    /// The gesture depends on the current display orientation
    OrientedSwipe {
        portrait: (Point, Point),
        landscape: (Point, Point),
    },
    /// Press the menu button
    MenuButton,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelQuirks {
    /// Whether `input swipe` accepts a trailing duration argument
    pub swipe_duration: bool,
    pub unlock: UnlockPolicy,
}

impl Default for ModelQuirks {
    fn default() -> Self {
        Self {
            swipe_duration: true,
            unlock: UnlockPolicy::MenuButton,
        }
    }
}

const SIDE_SWIPE: UnlockPolicy = UnlockPolicy::Swipe {
    from: (100, 400),
    to: (300, 400),
};

pub const MODEL_QUIRKS: &[(&str, ModelQuirks)] = &[
    (
        "LG-E460",
        ModelQuirks {
            swipe_duration: false,
            unlock: SIDE_SWIPE,
        },
    ),
    (
        "SM-T555",
        ModelQuirks {
            swipe_duration: true,
            unlock: SIDE_SWIPE,
        },
    ),
    (
        "T1-A21L",
        ModelQuirks {
            swipe_duration: true,
            unlock: UnlockPolicy::OrientedSwipe {
                portrait: ((400, 640), (800, 640)),
                landscape: ((100, 400), (1270, 400)),
            },
        },
    ),
    (
        "Nexus 4",
        ModelQuirks {
            swipe_duration: true,
            unlock: UnlockPolicy::Swipe {
                from: (300, 700),
                to: (300, 300),
            },
        },
    ),
];

/// Quirks for a model string as reported by `ro.product.model`
pub fn quirks_for(model: &str) -> ModelQuirks {
    MODEL_QUIRKS
        .iter()
        .find(|(name, _)| *name == model)
        .map(|(_, quirks)| *quirks)
        .unwrap_or_default()
}
