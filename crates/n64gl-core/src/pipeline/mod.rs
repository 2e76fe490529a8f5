//! Pipeline strategies.
//!
//! Both strategies implement [`Pipeline`] and share the vertex cache and the
//! primitive assembler held by the context. [`cpu::CpuPipeline`] transforms,
//! lights, clips and rasterizes on the host; [`rsp::RspPipeline`] streams raw
//! attributes to the RSP microcode, which runs the same stages itself.

pub mod cpu;
pub mod rsp;

use n64gl_hal::{CommandQueue, Rasterizer};

use crate::assembly::{PrimitiveAssembler, PrimitiveMode};
use crate::attrib::cpu::cpu_reader;
use crate::attrib::{fill_defaults, AttribKind, AttribType, AttribValue, ReadContext};
use crate::cache::VertexCache;
use crate::render::ObjAttributes;
use crate::state::arrays::ResolvedArrays;
use crate::state::texture::TextureInfo;
use crate::state::GlState;

/// Which strategy runs the current draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineKind {
    Cpu,
    Rsp,
}

/// Element indices of an indexed draw.
#[derive(Clone, Copy, Debug)]
pub enum Indices<'a> {
    U8(&'a [u8]),
    U16(&'a [u16]),
    U32(&'a [u32]),
}

impl Indices<'_> {
    pub fn len(&self) -> usize {
        match self {
            Indices::U8(i) => i.len(),
            Indices::U16(i) => i.len(),
            Indices::U32(i) => i.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, i: usize) -> u32 {
        match self {
            Indices::U8(v) => v[i] as u32,
            Indices::U16(v) => v[i] as u32,
            Indices::U32(v) => v[i],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.len()).map(move |i| self.get(i))
    }

    /// Largest referenced element, or `None` when empty.
    pub fn max(&self) -> Option<u32> {
        self.iter().max()
    }

    /// Last referenced element, or `None` when empty.
    pub fn last(&self) -> Option<u32> {
        self.len().checked_sub(1).map(|i| self.get(i))
    }
}

/// Everything a pipeline call may touch, borrowed from the context.
pub struct PipelineContext<'a> {
    pub state: &'a mut GlState,
    pub cache: &'a mut VertexCache,
    pub assembler: &'a mut PrimitiveAssembler,
    pub rdp: &'a mut dyn Rasterizer,
    pub rsp: &'a mut dyn CommandQueue,
    /// Active texture sampled at `begin`.
    pub texture: Option<TextureInfo>,
}

impl PipelineContext<'_> {
    /// Cache slot for `id`, pinning it when the assembler asked for a lock.
    /// Returns the slot and whether it missed.
    pub fn cache_slot(&mut self, id: u32) -> (u8, bool) {
        let lock = self.assembler.take_lock_request();
        let (slot, hit) = if lock {
            self.cache.get_locked_cache_slot(id)
        } else {
            self.cache.get_cache_slot(id)
        };
        let slot = slot as u8;
        if lock {
            self.assembler.set_locked_vertex(slot);
        }
        if !hit {
            log::trace!("vertex cache miss for {id:#x}, slot {slot}");
        }
        (slot, !hit)
    }
}

/// The operations every pipeline strategy provides. Calls between `begin`
/// and `end` belong to one draw in `mode`.
pub trait Pipeline {
    fn begin(&mut self, cx: &mut PipelineContext<'_>);
    fn end(&mut self, cx: &mut PipelineContext<'_>);
    fn vertex(&mut self, cx: &mut PipelineContext<'_>, value: &AttribValue);
    fn color(&mut self, cx: &mut PipelineContext<'_>, value: &AttribValue);
    fn tex_coord(&mut self, cx: &mut PipelineContext<'_>, value: &AttribValue);
    fn normal(&mut self, cx: &mut PipelineContext<'_>, value: &AttribValue);
    fn matrix_index(&mut self, cx: &mut PipelineContext<'_>, value: &AttribValue);
    fn array_element(&mut self, cx: &mut PipelineContext<'_>, arrays: &ResolvedArrays, index: u32);
    fn draw_arrays(&mut self, cx: &mut PipelineContext<'_>, arrays: &ResolvedArrays, first: u32, count: u32);
    fn draw_elements(&mut self, cx: &mut PipelineContext<'_>, arrays: &ResolvedArrays, indices: Indices<'_>);
}

/// Current value of `kind` as four floats.
pub fn attrib_components(current: &ObjAttributes, kind: AttribKind) -> [f32; 4] {
    match kind {
        AttribKind::Vertex => current.position.to_array(),
        AttribKind::Color => current.color.to_array(),
        AttribKind::TexCoord => current.texcoord.to_array(),
        AttribKind::Normal => current.normal.extend(0.0).to_array(),
        AttribKind::MatrixIndex => [current.mtx_index[0] as f32, 0.0, 0.0, 0.0],
    }
}

fn store_components(current: &mut ObjAttributes, kind: AttribKind, c: [f32; 4]) {
    match kind {
        AttribKind::Vertex => current.position = c.into(),
        AttribKind::Color => current.color = c.into(),
        AttribKind::TexCoord => current.texcoord = c.into(),
        AttribKind::Normal => current.normal = glam::Vec3::new(c[0], c[1], c[2]),
        AttribKind::MatrixIndex => current.mtx_index[0] = c[0] as u8,
    }
}

/// Convert `size` components of `src` into the current value of `kind`.
/// Position, color and texture coordinate components beyond `size` take
/// their defaults.
pub fn read_attrib(
    current: &mut ObjAttributes,
    kind: AttribKind,
    ty: AttribType,
    size: usize,
    src: &[u8],
    ctx: &ReadContext,
) {
    let Some(read) = cpu_reader(kind, ty) else {
        debug_assert!(false, "no reader for {ty:?} {kind:?}");
        return;
    };
    let mut c = attrib_components(current, kind);
    read(&mut c[..size], src, ctx);
    if matches!(kind, AttribKind::Vertex | AttribKind::Color | AttribKind::TexCoord) {
        fill_defaults(&mut c, size);
    }
    store_components(current, kind, c);
}

/// Read an immediate-mode value into the current attributes.
pub fn read_value(current: &mut ObjAttributes, kind: AttribKind, value: &AttribValue, ctx: &ReadContext) {
    read_attrib(current, kind, value.ty, value.size, value.bytes(), ctx);
}

/// Load element `index` of every enabled array into the current attributes.
pub fn load_attribs(current: &mut ObjAttributes, arrays: &ResolvedArrays, index: u32, ctx: &ReadContext) {
    for kind in AttribKind::ALL {
        if let Some(view) = arrays.get(kind) {
            read_attrib(current, kind, view.ty, view.size, view.element(index), ctx);
        }
    }
}

/// Chooses the strategy for each draw.
#[derive(Debug, Default)]
pub struct PipelineSelector {
    force_cpu: bool,
    warned: heapless::Vec<&'static str, 8>,
}

impl PipelineSelector {
    pub fn new(force_cpu: bool) -> Self {
        Self {
            force_cpu,
            warned: heapless::Vec::new(),
        }
    }

    /// The RSP runs triangle modes when it supports the active feature set;
    /// everything else falls back to the CPU.
    pub fn select(&mut self, state: &mut GlState, mode: PrimitiveMode) -> PipelineKind {
        if self.force_cpu || mode.prim_size() != 3 {
            return PipelineKind::Cpu;
        }
        match state.rsp_support() {
            Ok(()) => PipelineKind::Rsp,
            Err(reason) => {
                if !self.warned.contains(&reason) {
                    log::warn!("using the CPU pipeline, RSP does not support {reason}");
                    let _ = self.warned.push(reason);
                }
                PipelineKind::Cpu
            }
        }
    }
}
