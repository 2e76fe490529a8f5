//! Float readers for the CPU pipeline.
//!
//! Colors and normals are range-normalized: unsigned sources map to 0.0-1.0,
//! signed sources to -1.0-1.0. Positions and texture coordinates convert
//! without normalization.

use super::{AttribKind, AttribType, ReadContext, ATTRIB_COUNT, ATTRIB_TYPE_COUNT};

/// Reads `dst.len()` components from `src` (native byte order).
pub type CpuReadFn = fn(dst: &mut [f32], src: &[u8], ctx: &ReadContext);

macro_rules! read_fn {
    ($name:ident, $t:ty, |$v:ident, $ctx:ident| $convert:expr) => {
        fn $name(dst: &mut [f32], src: &[u8], $ctx: &ReadContext) {
            const N: usize = core::mem::size_of::<$t>();
            for (out, chunk) in dst.iter_mut().zip(src.chunks_exact(N)) {
                let mut raw = [0u8; N];
                raw.copy_from_slice(chunk);
                let $v = <$t>::from_ne_bytes(raw);
                *out = $convert;
            }
        }
    };
}

read_fn!(read_u8, u8, |v, _ctx| v as f32);
read_fn!(read_u16, u16, |v, _ctx| v as f32);
read_fn!(read_u32, u32, |v, _ctx| v as f32);
read_fn!(read_i16, i16, |v, _ctx| v as f32);
read_fn!(read_i32, i32, |v, _ctx| v as f32);
read_fn!(read_f32, f32, |v, _ctx| v);
read_fn!(read_f64, f64, |v, _ctx| v as f32);

read_fn!(read_u8n, u8, |v, _ctx| v as f32 / u8::MAX as f32);
read_fn!(read_u16n, u16, |v, _ctx| v as f32 / u16::MAX as f32);
read_fn!(read_u32n, u32, |v, _ctx| v as f32 / u32::MAX as f32);
read_fn!(read_i8n, i8, |v, _ctx| (v as f32 / i8::MAX as f32).max(-1.0));
read_fn!(read_i16n, i16, |v, _ctx| (v as f32 / i16::MAX as f32).max(-1.0));
read_fn!(read_i32n, i32, |v, _ctx| (v as f32 / i32::MAX as f32).max(-1.0));

read_fn!(read_vtx_halfx, i16, |v, ctx| v as f32
    * ctx.vertex_precision.to_float_factor);
read_fn!(read_tex_halfx, i16, |v, ctx| v as f32
    * ctx.texcoord_precision.to_float_factor);

// Columns: Byte, UnsignedByte, Short, UnsignedShort, Int, UnsignedInt, Float, Double, HalfFixed
static CPU_READ_FUNCS: [[Option<CpuReadFn>; ATTRIB_TYPE_COUNT]; ATTRIB_COUNT] = [
    // Vertex
    [
        None,
        None,
        Some(read_i16),
        None,
        Some(read_i32),
        None,
        Some(read_f32),
        Some(read_f64),
        Some(read_vtx_halfx),
    ],
    // Color
    [
        Some(read_i8n),
        Some(read_u8n),
        Some(read_i16n),
        Some(read_u16n),
        Some(read_i32n),
        Some(read_u32n),
        Some(read_f32),
        Some(read_f64),
        None,
    ],
    // TexCoord
    [
        None,
        None,
        Some(read_i16),
        None,
        Some(read_i32),
        None,
        Some(read_f32),
        Some(read_f64),
        Some(read_tex_halfx),
    ],
    // Normal
    [
        Some(read_i8n),
        None,
        Some(read_i16n),
        None,
        Some(read_i32n),
        None,
        Some(read_f32),
        Some(read_f64),
        None,
    ],
    // MatrixIndex
    [
        None,
        Some(read_u8),
        None,
        Some(read_u16),
        None,
        Some(read_u32),
        None,
        None,
        None,
    ],
];

/// Look up the float reader for a source format.
pub fn cpu_reader(kind: AttribKind, ty: AttribType) -> Option<CpuReadFn> {
    CPU_READ_FUNCS[kind.index()][ty.index()]
}
