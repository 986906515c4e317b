//! Enumerated status code labels. Unknown codes are expected (newer firmware
//! grows these lists) and must never take down the poll loop, so lookups are
//! lenient and fall back to a sentinel label.

use crate::prelude::*;

pub const INVALID: &str = "invalid";

pub static GENERATOR_REASON: &[&str] = &[
    "not running",
    "front panel",
    "remote run request",
    "run schedule",
    "high inverter temp",
    "impending inverter shutdown",
    "synchronisation fault",
    "state of charge",
    "low battery volts",
    "battery midpoint voltage error",
    "equalising battery",
    "high AC load",
    "generator exercise",
    "generator available",
    "generator fault",
    "generator lockout active",
    "battery float",
    "cooling down",
    "confirmed start",
    "manual",
    "AC source present",
    "disabled",
    "support mode",
    "equalise",
    "battery load",
    "warming up",
];

pub static CHARGING_MODE: &[&str] = &[
    "initial",
    "bulk",
    "absorb",
    "float",
    "long float",
    "equalise",
];

pub static SOURCE_STATUS: &[&str] = &[
    "not present",
    "waiting to synchronise",
    "synchronising",
    "synchronised",
    "disconnecting",
];

/// Bounds-checked label lookup. Out-of-range codes log a warning and resolve
/// to [`INVALID`].
pub fn lookup(table: &'static [&'static str], code: i32) -> &'static str {
    match usize::try_from(code).ok().and_then(|i| table.get(i).copied()) {
        Some(label) => label,
        None => {
            warn!("received invalid status code {}", code);
            INVALID
        }
    }
}
