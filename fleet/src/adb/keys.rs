use fleet_common::{FleetError, FleetResult};

/// Button names accepted by `press`, with their Android keyevent codes
pub const BUTTONS: &[(&str, u32)] = &[
    ("soft_right", 2),
    ("home", 3),
    ("back", 4),
    ("call", 5),
    ("endcall", 6),
    ("0", 7),
    ("1", 8),
    ("2", 9),
    ("3", 10),
    ("4", 11),
    ("5", 12),
    ("6", 13),
    ("7", 14),
    ("8", 15),
    ("9", 16),
    ("star", 17),
    ("pound", 18),
    ("dpad_up", 19),
    ("dpad_down", 20),
    ("dpad_left", 21),
    ("dpad_right", 22),
    ("dpad_center", 23),
    ("volume_up", 24),
    ("volume_down", 25),
    ("power", 26),
    ("camera", 27),
    ("clear", 28),
    ("a", 29),
    ("b", 30),
    ("c", 31),
    ("d", 32),
    ("e", 33),
    ("f", 34),
    ("g", 35),
    ("h", 36),
    ("i", 37),
    ("j", 38),
    ("k", 39),
    ("l", 40),
    ("m", 41),
    ("n", 42),
    ("o", 43),
    ("p", 44),
    ("q", 45),
    ("r", 46),
    ("s", 47),
    ("t", 48),
    ("u", 49),
    ("v", 50),
    ("w", 51),
    ("x", 52),
    ("y", 53),
    ("z", 54),
    ("comma", 55),
    ("period", 56),
    ("alt_left", 57),
    ("alt_right", 58),
    ("shift_left", 59),
    ("shift_right", 60),
    ("tab", 61),
    ("space", 62),
    ("sym", 63),
    ("explorer", 64),
    ("envelope", 65),
    ("enter", 66),
    ("del", 67),
    ("grave", 68),
    ("minus", 69),
    ("equals", 70),
    ("left_bracket", 71),
    ("right_bracket", 72),
    ("backslash", 73),
    ("semicolon", 74),
    ("apostrophe", 75),
    ("slash", 76),
    ("at", 77),
    ("num", 78),
    ("headsethook", 79),
    ("focus", 80),
    ("plus", 81),
    ("menu", 82),
    ("notification", 83),
    ("search", 84),
];

/// Keyevent code for a button name
pub fn keycode(button: &str) -> FleetResult<u32> {
    BUTTONS
        .iter()
        .find(|(name, _)| *name == button)
        .map(|(_, code)| *code)
        .ok_or_else(|| FleetError::UnknownButton(button.to_string()))
}

/// All button names, in keycode order
pub fn button_names() -> impl Iterator<Item = &'static str> {
    BUTTONS.iter().map(|(name, _)| *name)
}
