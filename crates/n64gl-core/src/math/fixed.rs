//! Fixed-point conversion helpers for RSP command encodings and RDP state.
//!
//! Converts f32 values to the formats the vertex microcode expects:
//! - s10.5 object-space positions
//! - s7.8 texture coordinates
//! - 1.15 signed colors
//! - 1.7 signed normal components
//! - s15.16 matrix and state words
//!
//! NaN inputs encode as zero; out-of-range values saturate.

use ::fixed::types::{I11F5, I16F16, I1F15, I1F7, I8F8};

/// Fractional bits of RSP object-space positions.
pub const VTX_SHIFT: u32 = 5;
/// Fractional bits of RSP texture coordinates.
pub const TEX_SHIFT: u32 = 8;

/// Convert f32 to s10.5 fixed-point.
pub fn f32_to_vtx(val: f32) -> i16 {
    if val.is_nan() {
        return 0;
    }
    I11F5::saturating_from_num(val).to_bits()
}

/// Convert f32 to s7.8 fixed-point.
pub fn f32_to_texcoord(val: f32) -> i16 {
    if val.is_nan() {
        return 0;
    }
    I8F8::saturating_from_num(val).to_bits()
}

/// Convert f32 to 1.15 signed fixed-point.
///
/// Range: -1.0 to +0.99997 (resolution 1/32768).
pub fn f32_to_1_15(val: f32) -> i16 {
    if val.is_nan() {
        return 0;
    }
    I1F15::saturating_from_num(val).to_bits()
}

/// Convert f32 to 1.7 signed fixed-point.
pub fn f32_to_1_7(val: f32) -> i8 {
    if val.is_nan() {
        return 0;
    }
    I1F7::saturating_from_num(val).to_bits()
}

/// Convert f32 to s15.16 fixed-point.
pub fn f32_to_s15_16(val: f32) -> i32 {
    if val.is_nan() {
        return 0;
    }
    I16F16::saturating_from_num(val).to_bits()
}

/// Convert a 0.0-1.0 channel to an 8-bit unsigned value (truncating).
pub fn f32_to_u8(val: f32) -> u8 {
    (val.clamp(0.0, 1.0) * 255.0) as u8
}

/// Convert a 0.0-1.0 depth to the RDP primitive depth range (0..=0x7FFF).
pub fn f32_to_prim_depth(val: f32) -> u16 {
    (val.clamp(0.0, 1.0) * 0x7FFF as f32) as u16
}
