//! The GL context: owns all pipeline state and the two hardware
//! collaborators, and exposes the immediate-mode, vertex-array and state
//! setting entry points.
//!
//! Recoverable errors are recorded in a sticky error slot and the offending
//! call does nothing. Query and clear it with [`GlContext::get_error`].

use glam::{Mat4, Vec3};
use n64gl_hal::{CommandQueue, Rasterizer};

use crate::assembly::{PrimitiveAssembler, PrimitiveMode};
use crate::attrib::{AttribKind, AttribType, AttribValue, Component, HalfFixedPrecision};
use crate::cache::VertexCache;
use crate::error::{ErrorState, GlError};
use crate::math::fixed::{TEX_SHIFT, VTX_SHIFT};
use crate::pipeline::cpu::{CpuPipeline, PipelineStats};
use crate::pipeline::rsp::{RspPipeline, RspStats};
use crate::pipeline::{
    load_attribs, read_value, Indices, Pipeline, PipelineContext, PipelineKind, PipelineSelector,
};
use crate::render::lighting::ColorMaterialTarget;
use crate::state::arrays::{ArrayPointer, BufferHandle, ResolvedArrays};
use crate::state::matrix::{self, MatrixMode};
use crate::state::texture::{NoTexture, TextureInfo, TextureSource};
use crate::state::{
    Capability, Face, FogParam, FrontFace, GlState, LightModelParam, LightParam, MaterialParam,
    PolygonMode, RenderMode, ShadeModel, TexCoord, TexGenParam,
};

/// Construction-time parameters of a [`GlContext`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContextConfig {
    pub framebuffer_width: u32,
    pub framebuffer_height: u32,
    /// Never use the RSP pipeline.
    pub force_cpu_pipeline: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            framebuffer_width: 320,
            framebuffer_height: 240,
            force_cpu_pipeline: false,
        }
    }
}

const IN_BLOCK: GlError = GlError::InvalidOperation("not allowed between begin and end");

pub struct GlContext<R: Rasterizer, Q: CommandQueue> {
    config: ContextConfig,
    state: GlState,
    errors: ErrorState,
    cache: VertexCache,
    assembler: PrimitiveAssembler,
    cpu: CpuPipeline,
    rsp: RspPipeline,
    selector: PipelineSelector,
    /// Strategy running the open `begin`/`end` block, if any.
    active: Option<PipelineKind>,
    last_pipeline: Option<PipelineKind>,
    texture: Option<TextureInfo>,
    texture_source: Box<dyn TextureSource>,
    rasterizer: R,
    queue: Q,
}

impl<R: Rasterizer, Q: CommandQueue> GlContext<R, Q> {
    pub fn new(config: ContextConfig, rasterizer: R, queue: Q) -> Self {
        log::debug!(
            "GL context for a {}x{} framebuffer",
            config.framebuffer_width,
            config.framebuffer_height
        );
        Self {
            config,
            state: GlState::new(config.framebuffer_width, config.framebuffer_height),
            errors: ErrorState::default(),
            cache: VertexCache::default(),
            assembler: PrimitiveAssembler::default(),
            cpu: CpuPipeline::default(),
            rsp: RspPipeline::default(),
            selector: PipelineSelector::new(config.force_cpu_pipeline),
            active: None,
            last_pipeline: None,
            texture: None,
            texture_source: Box::new(NoTexture),
            rasterizer,
            queue,
        }
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Install the collaborator that reports the active texture.
    pub fn set_texture_source(&mut self, source: Box<dyn TextureSource>) {
        self.texture_source = source;
    }

    /// Return and clear the pending error.
    pub fn get_error(&mut self) -> Option<GlError> {
        self.errors.take()
    }

    pub fn state(&self) -> &GlState {
        &self.state
    }

    pub fn rasterizer(&self) -> &R {
        &self.rasterizer
    }

    pub fn rasterizer_mut(&mut self) -> &mut R {
        &mut self.rasterizer
    }

    pub fn queue(&self) -> &Q {
        &self.queue
    }

    pub fn queue_mut(&mut self) -> &mut Q {
        &mut self.queue
    }

    pub fn vertex_cache(&self) -> &VertexCache {
        &self.cache
    }

    pub fn cpu_pipeline(&self) -> &CpuPipeline {
        &self.cpu
    }

    pub fn cpu_stats(&self) -> &PipelineStats {
        self.cpu.stats()
    }

    pub fn rsp_stats(&self) -> &RspStats {
        self.rsp.stats()
    }

    /// Strategy that ran the most recent draw.
    pub fn last_pipeline(&self) -> Option<PipelineKind> {
        self.last_pipeline
    }

    fn check(&mut self, result: Result<(), GlError>) {
        self.errors.check(result);
    }

    /// Run a state change, rejecting it inside a `begin`/`end` block.
    fn update(&mut self, f: impl FnOnce(&mut GlState) -> Result<(), GlError>) {
        let result = if self.active.is_some() {
            Err(IN_BLOCK)
        } else {
            f(&mut self.state)
        };
        self.check(result);
    }

    fn update_matrices(&mut self, f: impl FnOnce(&mut matrix::MatrixState) -> Result<(), GlError>) {
        self.update(|state| {
            f(&mut state.matrices)?;
            state.matrices_changed();
            Ok(())
        });
    }

    fn run<T>(&mut self, kind: PipelineKind, f: impl FnOnce(&mut dyn Pipeline, &mut PipelineContext<'_>) -> T) -> T {
        let mut cx = PipelineContext {
            state: &mut self.state,
            cache: &mut self.cache,
            assembler: &mut self.assembler,
            rdp: &mut self.rasterizer,
            rsp: &mut self.queue,
            texture: self.texture,
        };
        let pipeline: &mut dyn Pipeline = match kind {
            PipelineKind::Cpu => &mut self.cpu,
            PipelineKind::Rsp => &mut self.rsp,
        };
        f(pipeline, &mut cx)
    }

    fn begin_internal(&mut self, mode: PrimitiveMode) -> PipelineKind {
        self.texture = self.texture_source.active_texture();
        let kind = self.selector.select(&mut self.state, mode);
        self.assembler.init(mode);
        self.cache.reset();
        log::debug!("begin {mode:?} on the {kind:?} pipeline");

        self.active = Some(kind);
        self.last_pipeline = Some(kind);
        self.run(kind, |pipeline, cx| pipeline.begin(cx));
        kind
    }

    fn end_internal(&mut self, kind: PipelineKind) {
        self.run(kind, |pipeline, cx| pipeline.end(cx));
        self.active = None;
    }

    /// Snapshot the enabled arrays and check they cover `max_index`.
    fn resolve_arrays(&mut self, max_index: u32) -> Option<ResolvedArrays> {
        let result = self.state.arrays.resolve().and_then(|arrays| {
            arrays.check_bounds(max_index)?;
            Ok(arrays)
        });
        match result {
            Ok(arrays) => Some(arrays),
            Err(error) => {
                self.errors.record(error);
                None
            }
        }
    }

    pub fn enable(&mut self, cap: Capability) {
        self.update(|state| state.set_capability(cap, true));
    }

    pub fn disable(&mut self, cap: Capability) {
        self.update(|state| state.set_capability(cap, false));
    }

    pub fn is_enabled(&mut self, cap: Capability) -> bool {
        match self.state.is_enabled(cap) {
            Ok(enabled) => enabled,
            Err(error) => {
                self.errors.record(error);
                false
            }
        }
    }

    pub fn matrix_mode(&mut self, mode: MatrixMode) {
        self.update(|state| {
            state.matrices.mode = mode;
            Ok(())
        });
    }

    pub fn load_identity(&mut self) {
        self.load_matrix(&Mat4::IDENTITY);
    }

    pub fn load_matrix(&mut self, m: &Mat4) {
        self.update_matrices(|matrices| {
            matrices.load(*m);
            Ok(())
        });
    }

    pub fn mult_matrix(&mut self, m: &Mat4) {
        self.update_matrices(|matrices| {
            matrices.mult(m);
            Ok(())
        });
    }

    pub fn push_matrix(&mut self) {
        self.update_matrices(|matrices| matrices.push());
    }

    pub fn pop_matrix(&mut self) {
        self.update_matrices(|matrices| matrices.pop());
    }

    /// Select the palette entry targeted in [`MatrixMode::Palette`].
    pub fn current_palette_matrix(&mut self, index: usize) {
        self.update_matrices(|matrices| matrices.set_current_palette(index));
    }

    pub fn translate(&mut self, x: f32, y: f32, z: f32) {
        self.mult_matrix(&Mat4::from_translation(Vec3::new(x, y, z)));
    }

    /// Rotate by `angle` degrees around the axis `(x, y, z)`.
    pub fn rotate(&mut self, angle: f32, x: f32, y: f32, z: f32) {
        let axis = Vec3::new(x, y, z).normalize_or_zero();
        self.update(|state| {
            if axis != Vec3::ZERO {
                state.matrices.mult(&Mat4::from_axis_angle(axis, angle.to_radians()));
                state.matrices_changed();
            }
            Ok(())
        });
    }

    pub fn scale(&mut self, x: f32, y: f32, z: f32) {
        self.mult_matrix(&Mat4::from_scale(Vec3::new(x, y, z)));
    }

    pub fn frustum(&mut self, l: f32, r: f32, b: f32, t: f32, n: f32, f: f32) {
        self.update_matrices(|matrices| {
            if n <= 0.0 || f <= 0.0 || l == r || b == t || n == f {
                return Err(GlError::InvalidValue("degenerate frustum"));
            }
            matrices.mult(&matrix::frustum(l, r, b, t, n, f));
            Ok(())
        });
    }

    pub fn ortho(&mut self, l: f32, r: f32, b: f32, t: f32, n: f32, f: f32) {
        self.update_matrices(|matrices| {
            if l == r || b == t || n == f {
                return Err(GlError::InvalidValue("degenerate ortho volume"));
            }
            matrices.mult(&matrix::ortho(l, r, b, t, n, f));
            Ok(())
        });
    }

    pub fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.update(|state| {
            state.set_viewport(x, y, width, height);
            Ok(())
        });
    }

    pub fn depth_range(&mut self, near: f32, far: f32) {
        self.update(|state| {
            state.set_depth_range(near, far);
            Ok(())
        });
    }

    pub fn light(&mut self, index: u8, param: LightParam) {
        self.update(|state| state.set_light(index, param));
    }

    pub fn light_model(&mut self, param: LightModelParam) {
        self.update(|state| {
            state.set_light_model(param);
            Ok(())
        });
    }

    pub fn material(&mut self, face: Face, param: MaterialParam) {
        self.update(|state| state.set_material(face, param));
    }

    pub fn color_material(&mut self, face: Face, target: ColorMaterialTarget) {
        self.update(|state| {
            state.set_color_material(face, target);
            Ok(())
        });
    }

    pub fn fog(&mut self, param: FogParam) {
        self.update(|state| {
            state.set_fog(param);
            Ok(())
        });
    }

    pub fn tex_gen(&mut self, coord: TexCoord, param: TexGenParam) {
        self.update(|state| state.set_tex_gen(coord, param));
    }

    pub fn cull_face(&mut self, face: Face) {
        self.update(|state| {
            state.set_cull_face(face);
            Ok(())
        });
    }

    pub fn front_face(&mut self, front_face: FrontFace) {
        self.update(|state| {
            state.set_front_face(front_face);
            Ok(())
        });
    }

    pub fn shade_model(&mut self, model: ShadeModel) {
        self.update(|state| {
            state.set_shade_model(model);
            Ok(())
        });
    }

    pub fn polygon_mode(&mut self, face: Face, mode: PolygonMode) {
        self.update(|state| {
            state.set_polygon_mode(face, mode);
            Ok(())
        });
    }

    /// Selection and feedback are not implemented; requesting them is fatal.
    pub fn render_mode(&mut self, mode: RenderMode) {
        if mode != RenderMode::Render {
            panic!("{mode:?} render mode is not supported");
        }
    }

    pub fn point_size(&mut self, size: f32) {
        self.update(|state| state.set_point_size(size));
    }

    pub fn line_width(&mut self, width: f32) {
        self.update(|state| state.set_line_width(width));
    }

    /// Fractional bits of half-fixed vertex positions.
    pub fn vertex_half_fixed_precision(&mut self, bits: u32) {
        self.update(|state| {
            if bits > HalfFixedPrecision::MAX_BITS {
                return Err(GlError::InvalidValue("half-fixed precision above 15 bits"));
            }
            state.read_ctx.vertex_precision = HalfFixedPrecision::new(bits, VTX_SHIFT);
            Ok(())
        });
    }

    /// Fractional bits of half-fixed texture coordinates.
    pub fn tex_coord_half_fixed_precision(&mut self, bits: u32) {
        self.update(|state| {
            if bits > HalfFixedPrecision::MAX_BITS {
                return Err(GlError::InvalidValue("half-fixed precision above 15 bits"));
            }
            state.read_ctx.texcoord_precision = HalfFixedPrecision::new(bits, TEX_SHIFT);
            Ok(())
        });
    }

    pub fn begin(&mut self, mode: PrimitiveMode) {
        if self.active.is_some() {
            self.errors.record(GlError::InvalidOperation("begin inside begin/end"));
            return;
        }
        self.begin_internal(mode);
    }

    pub fn end(&mut self) {
        match self.active {
            Some(kind) => self.end_internal(kind),
            None => self.errors.record(GlError::InvalidOperation("end without begin")),
        }
    }

    fn attrib_value<T: Component>(&mut self, kind: AttribKind, values: &[T]) -> Option<AttribValue> {
        match kind.validate(values.len(), T::TYPE) {
            Ok(()) => Some(AttribValue::from_components(values)),
            Err(error) => {
                self.errors.record(error);
                None
            }
        }
    }

    /// Set a current attribute, or inside a block forward it to the pipeline.
    fn set_current<T: Component>(&mut self, kind: AttribKind, values: &[T]) {
        let Some(value) = self.attrib_value(kind, values) else {
            return;
        };
        match self.active {
            Some(pipeline) => self.run(pipeline, |p, cx| match kind {
                AttribKind::Color => p.color(cx, &value),
                AttribKind::TexCoord => p.tex_coord(cx, &value),
                AttribKind::Normal => p.normal(cx, &value),
                AttribKind::MatrixIndex => p.matrix_index(cx, &value),
                AttribKind::Vertex => p.vertex(cx, &value),
            }),
            None => {
                let ctx = self.state.read_ctx;
                read_value(&mut self.state.current, kind, &value, &ctx);
                self.state.current_changed();
            }
        }
    }

    /// Submit a vertex with the current attributes. Two to four components.
    pub fn vertex<T: Component>(&mut self, values: &[T]) {
        if self.active.is_none() {
            self.errors.record(GlError::InvalidOperation("vertex outside begin/end"));
            return;
        }
        self.set_current(AttribKind::Vertex, values);
    }

    pub fn color<T: Component>(&mut self, values: &[T]) {
        self.set_current(AttribKind::Color, values);
    }

    pub fn tex_coord<T: Component>(&mut self, values: &[T]) {
        self.set_current(AttribKind::TexCoord, values);
    }

    pub fn normal<T: Component>(&mut self, values: &[T]) {
        self.set_current(AttribKind::Normal, values);
    }

    pub fn matrix_index<T: Component>(&mut self, values: &[T]) {
        self.set_current(AttribKind::MatrixIndex, values);
    }

    fn attrib_pointer(&mut self, kind: AttribKind, size: usize, ty: AttribType, stride: usize, pointer: ArrayPointer) {
        self.update(|state| state.arrays.set_pointer(kind, size, ty, stride, pointer));
    }

    pub fn vertex_pointer(&mut self, size: usize, ty: AttribType, stride: usize, pointer: ArrayPointer) {
        self.attrib_pointer(AttribKind::Vertex, size, ty, stride, pointer);
    }

    pub fn color_pointer(&mut self, size: usize, ty: AttribType, stride: usize, pointer: ArrayPointer) {
        self.attrib_pointer(AttribKind::Color, size, ty, stride, pointer);
    }

    pub fn tex_coord_pointer(&mut self, size: usize, ty: AttribType, stride: usize, pointer: ArrayPointer) {
        self.attrib_pointer(AttribKind::TexCoord, size, ty, stride, pointer);
    }

    pub fn normal_pointer(&mut self, ty: AttribType, stride: usize, pointer: ArrayPointer) {
        self.attrib_pointer(AttribKind::Normal, 3, ty, stride, pointer);
    }

    pub fn matrix_index_pointer(&mut self, size: usize, ty: AttribType, stride: usize, pointer: ArrayPointer) {
        self.attrib_pointer(AttribKind::MatrixIndex, size, ty, stride, pointer);
    }

    pub fn enable_client_state(&mut self, kind: AttribKind) {
        self.update(|state| {
            state.arrays.set_enabled(kind, true);
            Ok(())
        });
    }

    pub fn disable_client_state(&mut self, kind: AttribKind) {
        self.update(|state| {
            state.arrays.set_enabled(kind, false);
            Ok(())
        });
    }

    pub fn gen_buffer(&mut self) -> BufferHandle {
        self.state.arrays.gen_buffer()
    }

    pub fn buffer_data(&mut self, handle: BufferHandle, data: Vec<u8>) {
        self.update(|state| state.arrays.buffer_data(handle, data));
    }

    pub fn delete_buffer(&mut self, handle: BufferHandle) {
        self.update(|state| state.arrays.delete_buffer(handle));
    }

    pub fn bind_array_buffer(&mut self, handle: Option<BufferHandle>) {
        self.update(|state| state.arrays.bind_array_buffer(handle));
    }

    /// Submit element `index` of the enabled arrays as a vertex. Outside a
    /// block this only loads the element into the current attributes, and
    /// only while the vertex array is disabled.
    pub fn array_element(&mut self, index: u32) {
        let Some(arrays) = self.resolve_arrays(index) else {
            return;
        };
        match self.active {
            Some(kind) => self.run(kind, |p, cx| p.array_element(cx, &arrays, index)),
            None => {
                if arrays.is_enabled(AttribKind::Vertex) {
                    self.errors
                        .record(GlError::InvalidOperation("array element outside begin/end"));
                    return;
                }
                let ctx = self.state.read_ctx;
                load_attribs(&mut self.state.current, &arrays, index, &ctx);
                self.state.current_changed();
            }
        }
    }

    /// Draw `count` consecutive elements starting at `first`.
    pub fn draw_arrays(&mut self, mode: PrimitiveMode, first: u32, count: u32) {
        if self.active.is_some() {
            self.errors.record(IN_BLOCK);
            return;
        }
        if count == 0 {
            return;
        }
        let Some(last) = first.checked_add(count - 1) else {
            self.errors.record(GlError::InvalidValue("element range overflows"));
            return;
        };
        let Some(arrays) = self.resolve_arrays(last) else {
            return;
        };

        let kind = self.begin_internal(mode);
        self.run(kind, |p, cx| p.draw_arrays(cx, &arrays, first, count));
        self.end_internal(kind);
    }

    /// Draw the elements listed in `indices`.
    pub fn draw_elements(&mut self, mode: PrimitiveMode, indices: Indices<'_>) {
        if self.active.is_some() {
            self.errors.record(IN_BLOCK);
            return;
        }
        let Some(max) = indices.max() else {
            return;
        };
        let Some(arrays) = self.resolve_arrays(max) else {
            return;
        };

        let kind = self.begin_internal(mode);
        self.run(kind, |p, cx| p.draw_elements(cx, &arrays, indices));
        self.end_internal(kind);
    }
}
