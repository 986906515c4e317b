//! Raw register decoding: byte assembly plus fixed linear scaling into
//! physical units. Scale constants derive from the device calibration values
//! and must match the firmware exactly.
//!
//! Energy and hour registers are monotonic counters on the device; they are
//! reported as scaled absolute values, never as deltas.

/// Device calibration constants.
pub const CAL_AC_VOLTS: f64 = 4798.0;
pub const CAL_AC_AMPS: f64 = 2000.0;
pub const CAL_DC_VOLTS: f64 = 1200.0;
pub const CAL_DC_AMPS: f64 = 15000.0;
pub const CAL_TEMPERATURE: f64 = 1500.0;

pub const SCALE_AC_VOLTS: f64 = CAL_AC_VOLTS / 327_680.0;
pub const SCALE_AC_AMPS: f64 = CAL_AC_AMPS / 327_680.0;
pub const SCALE_DC_VOLTS: f64 = CAL_DC_VOLTS / 327_680.0;
pub const SCALE_DC_AMPS: f64 = CAL_DC_AMPS / 327_680.0;
pub const SCALE_TEMPERATURE: f64 = CAL_TEMPERATURE / 327_680.0;

/// Watts per count for 16-bit power registers.
pub const SCALE_POWER: f64 = CAL_AC_VOLTS * CAL_AC_AMPS / 3_276_800.0;
/// 32-bit power registers carry 3 extra fractional bits.
pub const SCALE_POWER32: f64 = SCALE_POWER / 8.0;
/// Accumulated energy counters, in watt-hours.
pub const SCALE_WH: f64 = 24.0 * SCALE_POWER;

pub fn u16_le(b: &[u8]) -> u16 {
    u16::from_le_bytes([b[0], b[1]])
}

pub fn i16_le(b: &[u8]) -> i16 {
    i16::from_le_bytes([b[0], b[1]])
}

pub fn i32_le(b: &[u8]) -> i32 {
    i32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

pub fn u32_le(b: &[u8]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

/// Some status registers pack two 8-bit codes into one word.
pub fn low_byte(word: u16) -> u8 {
    (word & 0xFF) as u8
}

pub fn high_byte(word: u16) -> u8 {
    (word >> 8) as u8
}

pub fn ac_volts(raw: u16) -> f64 {
    f64::from(raw) * SCALE_AC_VOLTS
}

pub fn ac_amps(raw: i16) -> f64 {
    f64::from(raw) * SCALE_AC_AMPS
}

pub fn dc_volts(raw: u16) -> f64 {
    f64::from(raw) * SCALE_DC_VOLTS
}

pub fn dc_amps(raw: i16) -> f64 {
    f64::from(raw) * SCALE_DC_AMPS
}

pub fn temperature(raw: i16) -> f64 {
    f64::from(raw) * SCALE_TEMPERATURE
}

pub fn watts(raw: i16) -> f64 {
    f64::from(raw) * SCALE_POWER
}

pub fn watts32(raw: i32) -> f64 {
    f64::from(raw) * SCALE_POWER32
}

pub fn watt_hours(raw: u32) -> f64 {
    f64::from(raw) * SCALE_WH
}

/// Hour counters are not calibrated; the raw count is the value.
pub fn hours(raw: u32) -> f64 {
    f64::from(raw)
}
