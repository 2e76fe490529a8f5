//! Attribute reader tables.
//!
//! Every (attribute kind, source type) pair maps to a conversion function:
//! [`cpu`] produces floats for the host pipeline, [`rsp`] appends fixed-point
//! encodings to a command stream. A missing table entry means the pair is not
//! a legal source format; callers check for it before reading.

pub mod cpu;
pub mod rsp;

use crate::math::fixed::{TEX_SHIFT, VTX_SHIFT};

/// Number of per-vertex attribute channels.
pub const ATTRIB_COUNT: usize = 5;
/// Number of source numeric types.
pub const ATTRIB_TYPE_COUNT: usize = 9;
/// Palette matrix indices carried per vertex.
pub const VERTEX_UNIT_COUNT: usize = 1;
/// Values used for components a source does not supply.
pub const ATTRIB_DEFAULTS: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// Per-vertex attribute channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttribKind {
    Vertex,
    Color,
    TexCoord,
    Normal,
    MatrixIndex,
}

impl AttribKind {
    pub const ALL: [AttribKind; ATTRIB_COUNT] = [
        AttribKind::Vertex,
        AttribKind::Color,
        AttribKind::TexCoord,
        AttribKind::Normal,
        AttribKind::MatrixIndex,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Inclusive range of legal component counts.
    pub const fn size_range(self) -> (usize, usize) {
        match self {
            AttribKind::Vertex => (2, 4),
            AttribKind::Color => (3, 4),
            AttribKind::TexCoord => (1, 4),
            AttribKind::Normal => (3, 3),
            AttribKind::MatrixIndex => (1, VERTEX_UNIT_COUNT),
        }
    }

    /// Check a component count and source type against the reader tables.
    pub fn validate(self, size: usize, ty: AttribType) -> Result<(), crate::GlError> {
        let (min, max) = self.size_range();
        if size < min || size > max {
            return Err(crate::GlError::InvalidValue("attribute size out of range"));
        }
        if cpu::cpu_reader(self, ty).is_none() {
            return Err(crate::GlError::InvalidEnum("unsupported attribute type"));
        }
        Ok(())
    }
}

/// Numeric type of an attribute source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttribType {
    Byte,
    UnsignedByte,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Float,
    Double,
    /// 16-bit signed fixed-point with a configurable number of fractional bits.
    HalfFixed,
}

impl AttribType {
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Size of one component in bytes.
    pub const fn size_bytes(self) -> usize {
        match self {
            AttribType::Byte | AttribType::UnsignedByte => 1,
            AttribType::Short | AttribType::UnsignedShort | AttribType::HalfFixed => 2,
            AttribType::Int | AttribType::UnsignedInt | AttribType::Float => 4,
            AttribType::Double => 8,
        }
    }
}

/// Precision of a half-fixed source format.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HalfFixedPrecision {
    /// Fractional bits of the source values.
    pub precision: u32,
    /// Left shift converting source values to the RSP format (negative shifts right).
    pub shift_amount: i32,
    /// Multiplier converting source values to floats.
    pub to_float_factor: f32,
}

impl HalfFixedPrecision {
    /// Maximum fractional bits of a half-fixed value.
    pub const MAX_BITS: u32 = 15;

    /// Precision for sources with `bits` fractional bits feeding an RSP
    /// format with `target_bits` fractional bits.
    pub fn new(bits: u32, target_bits: u32) -> Self {
        Self {
            precision: bits,
            shift_amount: target_bits as i32 - bits as i32,
            to_float_factor: 1.0 / (1u32 << bits) as f32,
        }
    }
}

/// Configuration shared by every reader call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReadContext {
    pub vertex_precision: HalfFixedPrecision,
    pub texcoord_precision: HalfFixedPrecision,
}

impl Default for ReadContext {
    fn default() -> Self {
        Self {
            vertex_precision: HalfFixedPrecision::new(VTX_SHIFT, VTX_SHIFT),
            texcoord_precision: HalfFixedPrecision::new(TEX_SHIFT, TEX_SHIFT),
        }
    }
}

/// Half-fixed source component (see [`HalfFixedPrecision`]).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HalfFixed(pub i16);

/// Host value types accepted by the immediate-mode entry points.
pub trait Component: Copy {
    const TYPE: AttribType;

    /// Write the value in native byte order into `dst[..size_bytes]`.
    fn write_ne(self, dst: &mut [u8]);
}

macro_rules! impl_component {
    ($t:ty, $ty:expr) => {
        impl Component for $t {
            const TYPE: AttribType = $ty;

            fn write_ne(self, dst: &mut [u8]) {
                dst.copy_from_slice(&self.to_ne_bytes());
            }
        }
    };
}

impl_component!(i8, AttribType::Byte);
impl_component!(u8, AttribType::UnsignedByte);
impl_component!(i16, AttribType::Short);
impl_component!(u16, AttribType::UnsignedShort);
impl_component!(i32, AttribType::Int);
impl_component!(u32, AttribType::UnsignedInt);
impl_component!(f32, AttribType::Float);
impl_component!(f64, AttribType::Double);

impl Component for HalfFixed {
    const TYPE: AttribType = AttribType::HalfFixed;

    fn write_ne(self, dst: &mut [u8]) {
        dst.copy_from_slice(&self.0.to_ne_bytes());
    }
}

/// An immediate-mode attribute value of up to four components, stored as
/// raw bytes so it can go through the same reader tables as array data.
#[derive(Clone, Copy, Debug)]
pub struct AttribValue {
    pub ty: AttribType,
    pub size: usize,
    bytes: [u8; 32],
}

impl AttribValue {
    /// Pack up to four components. Extra components are ignored.
    pub fn from_components<T: Component>(values: &[T]) -> Self {
        let stride = T::TYPE.size_bytes();
        let mut bytes = [0u8; 32];
        let size = values.len().min(4);
        for (chunk, value) in bytes.chunks_exact_mut(stride).zip(&values[..size]) {
            value.write_ne(chunk);
        }
        Self {
            ty: T::TYPE,
            size,
            bytes,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes[..self.size * self.ty.size_bytes()]
    }
}

/// Overwrite components at and beyond `size` with [`ATTRIB_DEFAULTS`].
pub fn fill_defaults(dst: &mut [f32], size: usize) {
    for (i, out) in dst.iter_mut().enumerate().skip(size) {
        *out = ATTRIB_DEFAULTS[i];
    }
}
