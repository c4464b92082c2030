//! Translation between semantic values and the amplifier's ASCII arguments.
//!
//! Pure functions only. Callers validate ranges before encoding.

use crate::protocol_constants::VOLUME_WIRE_OFFSET;

/// Encodes a 0.0–1.0 volume as the device's offset hex value.
///
/// `round(v * 100) + 160`, lowercase, no `0x` prefix, no padding.
pub fn encode_volume(volume: f64) -> String {
    let level = (volume * 100.0).round().max(0.0) as u32;
    format!("{:x}", level + VOLUME_WIRE_OFFSET)
}

/// Two-character decimal used for ports, outputs and signed levels.
///
/// The sign counts toward the width, so `-6` stays `-6` while `5` becomes `05`.
pub fn encode_index(n: i32) -> String {
    format!("{:02}", n)
}

/// `01` for set, `00` for clear.
pub fn encode_flag(set: bool) -> &'static str {
    if set {
        "01"
    } else {
        "00"
    }
}
