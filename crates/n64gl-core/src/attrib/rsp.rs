//! Fixed-point readers for the RSP pipeline.
//!
//! Positions are s10.5, colors 1.15, texture coordinates s7.8 and normals
//! 1.7 bytes. Integer sources shift into place; float sources convert with
//! saturation. Half-fixed sources shift by the difference between their
//! configured precision and the target format.

use super::{AttribKind, AttribType, HalfFixedPrecision, ReadContext, ATTRIB_COUNT, ATTRIB_TYPE_COUNT};
use crate::gpu::commands::CommandStream;
use crate::math::fixed::{self, TEX_SHIFT, VTX_SHIFT};

/// Appends `count` converted components of `src` to the stream.
pub type RspReadFn = fn(stream: &mut CommandStream, src: &[u8], count: usize, ctx: &ReadContext);

macro_rules! half_fn {
    ($name:ident, $t:ty, |$v:ident| $convert:expr) => {
        fn $name(stream: &mut CommandStream, src: &[u8], count: usize, _ctx: &ReadContext) {
            const N: usize = core::mem::size_of::<$t>();
            for chunk in src.chunks_exact(N).take(count) {
                let mut raw = [0u8; N];
                raw.copy_from_slice(chunk);
                let $v = <$t>::from_ne_bytes(raw);
                let half: i16 = $convert;
                stream.put_half(half as u16);
            }
        }
    };
}

macro_rules! byte_fn {
    ($name:ident, $t:ty, |$v:ident| $convert:expr) => {
        fn $name(stream: &mut CommandStream, src: &[u8], count: usize, _ctx: &ReadContext) {
            const N: usize = core::mem::size_of::<$t>();
            for chunk in src.chunks_exact(N).take(count) {
                let mut raw = [0u8; N];
                raw.copy_from_slice(chunk);
                let $v = <$t>::from_ne_bytes(raw);
                let byte: u8 = $convert;
                stream.put_byte(byte);
            }
        }
    };
}

half_fn!(vtx_read_i16, i16, |v| v.wrapping_shl(VTX_SHIFT));
half_fn!(vtx_read_i32, i32, |v| v.wrapping_shl(VTX_SHIFT) as i16);
half_fn!(vtx_read_f32, f32, |v| fixed::f32_to_vtx(v));
half_fn!(vtx_read_f64, f64, |v| fixed::f32_to_vtx(v as f32));

half_fn!(col_read_i8, i8, |v| (v as i16) << 8);
half_fn!(col_read_u8, u8, |v| ((v as u16) << 7) as i16);
half_fn!(col_read_i16, i16, |v| v);
half_fn!(col_read_u16, u16, |v| (v >> 1) as i16);
half_fn!(col_read_i32, i32, |v| (v >> 16) as i16);
half_fn!(col_read_u32, u32, |v| (v >> 17) as i16);
half_fn!(col_read_f32, f32, |v| fixed::f32_to_1_15(v));
half_fn!(col_read_f64, f64, |v| fixed::f32_to_1_15(v as f32));

half_fn!(tex_read_i16, i16, |v| v.wrapping_shl(TEX_SHIFT));
half_fn!(tex_read_i32, i32, |v| v.wrapping_shl(TEX_SHIFT) as i16);
half_fn!(tex_read_f32, f32, |v| fixed::f32_to_texcoord(v));
half_fn!(tex_read_f64, f64, |v| fixed::f32_to_texcoord(v as f32));

byte_fn!(nrm_read_i8, i8, |v| v as u8);
byte_fn!(nrm_read_i16, i16, |v| (v >> 8) as u8);
byte_fn!(nrm_read_i32, i32, |v| (v >> 24) as u8);
byte_fn!(nrm_read_f32, f32, |v| fixed::f32_to_1_7(v) as u8);
byte_fn!(nrm_read_f64, f64, |v| fixed::f32_to_1_7(v as f32) as u8);

byte_fn!(mtx_read_u8, u8, |v| v);
byte_fn!(mtx_read_u16, u16, |v| v as u8);
byte_fn!(mtx_read_u32, u32, |v| v as u8);

fn read_half_fixed(stream: &mut CommandStream, src: &[u8], count: usize, precision: &HalfFixedPrecision) {
    let shift = precision.shift_amount;
    for chunk in src.chunks_exact(2).take(count) {
        let value = i16::from_ne_bytes([chunk[0], chunk[1]]);
        let converted = if shift >= 0 {
            debug_assert!(
                value <= i16::MAX >> shift && value >= i16::MIN >> shift,
                "fixed point overflow: {value} << {shift}"
            );
            value.wrapping_shl(shift as u32)
        } else {
            value >> -shift
        };
        stream.put_half(converted as u16);
    }
}

fn vtx_read_halfx(stream: &mut CommandStream, src: &[u8], count: usize, ctx: &ReadContext) {
    read_half_fixed(stream, src, count, &ctx.vertex_precision);
}

fn tex_read_halfx(stream: &mut CommandStream, src: &[u8], count: usize, ctx: &ReadContext) {
    read_half_fixed(stream, src, count, &ctx.texcoord_precision);
}

// Columns: Byte, UnsignedByte, Short, UnsignedShort, Int, UnsignedInt, Float, Double, HalfFixed
static RSP_READ_FUNCS: [[Option<RspReadFn>; ATTRIB_TYPE_COUNT]; ATTRIB_COUNT] = [
    // Vertex
    [
        None,
        None,
        Some(vtx_read_i16),
        None,
        Some(vtx_read_i32),
        None,
        Some(vtx_read_f32),
        Some(vtx_read_f64),
        Some(vtx_read_halfx),
    ],
    // Color
    [
        Some(col_read_i8),
        Some(col_read_u8),
        Some(col_read_i16),
        Some(col_read_u16),
        Some(col_read_i32),
        Some(col_read_u32),
        Some(col_read_f32),
        Some(col_read_f64),
        None,
    ],
    // TexCoord
    [
        None,
        None,
        Some(tex_read_i16),
        None,
        Some(tex_read_i32),
        None,
        Some(tex_read_f32),
        Some(tex_read_f64),
        Some(tex_read_halfx),
    ],
    // Normal
    [
        Some(nrm_read_i8),
        None,
        Some(nrm_read_i16),
        None,
        Some(nrm_read_i32),
        None,
        Some(nrm_read_f32),
        Some(nrm_read_f64),
        None,
    ],
    // MatrixIndex
    [
        None,
        Some(mtx_read_u8),
        None,
        Some(mtx_read_u16),
        None,
        Some(mtx_read_u32),
        None,
        None,
        None,
    ],
];

/// Look up the fixed-point reader for a source format.
pub fn rsp_reader(kind: AttribKind, ty: AttribType) -> Option<RspReadFn> {
    RSP_READ_FUNCS[kind.index()][ty.index()]
}
