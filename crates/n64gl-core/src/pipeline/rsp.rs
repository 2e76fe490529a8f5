//! RSP pipeline: vertices are streamed as raw fixed-point attributes and the
//! microcode transforms, lights, clips and rasterizes them.
//!
//! The host still runs the vertex cache and primitive assembly so that only
//! cache misses upload vertex data and each triangle is a three-slot
//! `DrawTri`. Render state is mirrored to the microcode lazily: at `begin`,
//! every state group whose generation changed since the last upload is sent.

use glam::Mat4;
use n64gl_hal::CommandQueue;

use crate::attrib::rsp::rsp_reader;
use crate::attrib::{AttribKind, AttribType, AttribValue, ATTRIB_COUNT, ATTRIB_DEFAULTS};
use crate::gpu::commands::*;
use crate::math::fixed::{f32_to_1_15, f32_to_s15_16, VTX_SHIFT};
use crate::render::lighting::ColorMaterialTarget;
use crate::render::transform::PrimEnv;
use crate::state::arrays::ResolvedArrays;
use crate::state::matrix::MATRIX_PALETTE_SIZE;
use crate::state::texture::TextureInfo;
use crate::state::{Face, FrontFace, Generations, GlState};

use super::{attrib_components, load_attribs, read_value, Indices, Pipeline, PipelineContext};

/// Attributes carried by each `SetPrimVtx`: the component count of every
/// channel read from the command, 0 where the microcode uses the current
/// value instead.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VertexLayout {
    sizes: [u8; ATTRIB_COUNT],
}

impl VertexLayout {
    /// Layout of immediate-mode vertices: a full position only.
    pub fn immediate() -> Self {
        let mut sizes = [0; ATTRIB_COUNT];
        sizes[AttribKind::Vertex.index()] = 4;
        Self { sizes }
    }

    pub fn from_arrays(arrays: &ResolvedArrays) -> Self {
        let mut sizes = [0; ATTRIB_COUNT];
        for kind in AttribKind::ALL {
            if let Some(view) = arrays.get(kind) {
                sizes[kind.index()] = view.size as u8;
            }
        }
        Self { sizes }
    }

    pub fn size(&self, kind: AttribKind) -> usize {
        self.sizes[kind.index()] as usize
    }

    /// Byte size of one `SetPrimVtx` command with this layout.
    pub fn cmd_size(&self) -> u16 {
        let mut size = 4;
        for kind in [AttribKind::Vertex, AttribKind::Color, AttribKind::TexCoord] {
            size += 2 * self.size(kind);
        }
        if self.size(AttribKind::Normal) > 0 {
            size += 3;
        }
        if self.size(AttribKind::MatrixIndex) > 0 {
            size += 1;
        }
        size.next_multiple_of(4) as u16
    }
}

/// Counters of work streamed to the RSP.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RspStats {
    pub vertices_loaded: u64,
    pub triangles: u64,
    /// State groups uploaded at `begin`.
    pub state_uploads: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum BeginEndType {
    #[default]
    Indeterminate,
    Vertex,
    ArrayElement,
}

#[derive(Debug, Default)]
pub struct RspPipeline {
    begin_end_type: BeginEndType,
    layout: Option<VertexLayout>,
    /// Element whose non-position attributes still have to reach the
    /// microcode's current values.
    last_array_element: Option<(ResolvedArrays, u32)>,
    synced: Option<Generations>,
    synced_texture: Option<Option<TextureInfo>>,
    stats: RspStats,
}

fn slot_offset(slot: u8) -> u16 {
    slot as u16 * PRIM_VTX_SIZE
}

fn group_changed(prev: Option<Generations>, now: &Generations, pick: fn(&Generations) -> u32) -> bool {
    prev.map_or(true, |prev| pick(&prev) != pick(now))
}

fn put_color(s: &mut CommandStream, c: glam::Vec4) {
    for v in c.to_array() {
        s.put_half(f32_to_1_15(v) as u16);
    }
}

fn put_s15_16(s: &mut CommandStream, v: f32) {
    s.put_word(f32_to_s15_16(v) as u32);
}

fn matrix_load(queue: &mut dyn CommandQueue, target: u8, m: &Mat4) {
    let mut s = CommandStream::new(GlpCommand::MatrixLoad);
    s.put_byte(target);
    for v in m.to_cols_array() {
        put_s15_16(&mut s, v);
    }
    s.submit(queue);
}

fn color_target_id(target: Option<ColorMaterialTarget>) -> u8 {
    match target {
        None => 0,
        Some(ColorMaterialTarget::Emission) => 1,
        Some(ColorMaterialTarget::Ambient) => 2,
        Some(ColorMaterialTarget::Diffuse) => 3,
        Some(ColorMaterialTarget::AmbientAndDiffuse) => 4,
        Some(ColorMaterialTarget::Specular) => 5,
    }
}

/// Send `size` components of `src` to the microcode's current value of
/// `kind`.
fn upload_attrib(cx: &mut PipelineContext<'_>, kind: AttribKind, ty: AttribType, size: usize, src: &[u8]) {
    let Some(read) = rsp_reader(kind, ty) else {
        debug_assert!(false, "no RSP reader for {ty:?} {kind:?}");
        return;
    };
    let (cmd, offset) = match kind {
        AttribKind::Color => (GlpCommand::SetLong, SERVER_COLOR_OFFSET),
        AttribKind::TexCoord => (GlpCommand::SetLong, SERVER_TEX_COORDS_OFFSET),
        AttribKind::Normal => (GlpCommand::SetWord, SERVER_NORMAL_OFFSET),
        AttribKind::MatrixIndex => (GlpCommand::SetByte, SERVER_MTX_INDEX_OFFSET),
        AttribKind::Vertex => return,
    };
    let ctx = cx.state.read_ctx;

    let mut s = CommandStream::new(cmd);
    s.put_half(offset);
    match kind {
        AttribKind::Color | AttribKind::TexCoord => {
            read(&mut s, src, size, &ctx);
            let defaults: [i16; 4] = if kind == AttribKind::Color {
                [0, 0, 0, 0x7FFF]
            } else {
                [0, 0, 0, 1]
            };
            let mut raw = [0u8; 8];
            for (chunk, v) in raw.chunks_exact_mut(2).zip(defaults) {
                chunk.copy_from_slice(&v.to_ne_bytes());
            }
            if let Some(read_short) = rsp_reader(kind, AttribType::Short) {
                read_short(&mut s, &raw[size * 2..], 4 - size, &ctx);
            }
        }
        AttribKind::Normal => read(&mut s, src, size, &ctx),
        _ => {
            for _ in 0..3 {
                s.put_byte(0);
            }
            read(&mut s, src, size, &ctx);
        }
    }
    s.submit(cx.rsp);
}

/// Send every current attribute value except the position.
fn upload_current(cx: &mut PipelineContext<'_>) {
    for (kind, size) in [
        (AttribKind::Color, 4),
        (AttribKind::TexCoord, 4),
        (AttribKind::Normal, 3),
    ] {
        let components = attrib_components(&cx.state.current, kind);
        let mut raw = [0u8; 16];
        for (chunk, v) in raw.chunks_exact_mut(4).zip(components) {
            chunk.copy_from_slice(&v.to_ne_bytes());
        }
        upload_attrib(cx, kind, AttribType::Float, size, &raw[..size * 4]);
    }
    let mtx_index = cx.state.current.mtx_index;
    upload_attrib(cx, AttribKind::MatrixIndex, AttribType::UnsignedByte, 1, &mtx_index);
}

impl RspPipeline {
    pub fn stats(&self) -> &RspStats {
        &self.stats
    }

    fn upload_matrices(&mut self, cx: &mut PipelineContext<'_>) {
        cx.state.matrices.update_targets();
        let matrices = &cx.state.matrices;
        if matrices.palette_enabled {
            for i in 0..MATRIX_PALETTE_SIZE as u8 {
                matrix_load(cx.rsp, MATRIX_TARGET_PALETTE_MVP + i, matrices.mvp_for(i));
                matrix_load(cx.rsp, MATRIX_TARGET_PALETTE_MODELVIEW + i, matrices.modelview_for(i));
            }
        } else {
            matrix_load(cx.rsp, MATRIX_TARGET_MVP, matrices.mvp_for(0));
            matrix_load(cx.rsp, MATRIX_TARGET_MODELVIEW, matrices.modelview());
        }
        matrix_load(cx.rsp, MATRIX_TARGET_TEXTURE, matrices.texture());
    }

    fn upload_viewport(&mut self, cx: &mut PipelineContext<'_>) {
        let viewport = &cx.state.viewport;
        let mut s = CommandStream::new(GlpCommand::SetViewport);
        for v in viewport.scale.to_array().into_iter().chain(viewport.offset.to_array()) {
            put_s15_16(&mut s, v);
        }
        s.submit(cx.rsp);
    }

    fn upload_flags(&mut self, cx: &mut PipelineContext<'_>) {
        let state: &GlState = &*cx.state;
        let env = PrimEnv::new(state, cx.texture);
        let f = &state.flags;

        let mut flags = 0;
        let mut set = |cond: bool, bit: u32| {
            if cond {
                flags |= bit;
            }
        };
        set(f.lighting, FLAG_LIGHTING);
        set(f.fog, FLAG_FOG);
        set(f.normalize, FLAG_NORMALIZE);
        set(f.color_material, FLAG_COLOR_MATERIAL);
        set(env.texture.is_some(), FLAG_TEXTURE_ACTIVE);
        set(env.texture.is_some_and(|t| t.is_bilinear()), FLAG_TEXTURE_BILINEAR);
        set(
            f.cull_face && matches!(state.raster.cull_face, Face::Front | Face::FrontAndBack),
            FLAG_CULL_FRONT,
        );
        set(
            f.cull_face && matches!(state.raster.cull_face, Face::Back | Face::FrontAndBack),
            FLAG_CULL_BACK,
        );
        set(state.raster.front_face == FrontFace::Clockwise, FLAG_FRONT_CW);
        set(f.depth_test, FLAG_DEPTH_TEST);
        set(state.matrices.palette_enabled, FLAG_MATRIX_PALETTE);
        for (i, tex_gen) in state.tex_gen.iter().enumerate() {
            set(tex_gen.enabled, 1 << (FLAG_TEX_GEN_SHIFT + i as u32));
        }

        let (width, height) = env.texture.map_or((0, 0), |t| (t.width, t.height));
        let mut s = CommandStream::new(GlpCommand::SetFlags);
        s.put_word(flags);
        s.put_half(width as u16);
        s.put_half(height as u16);
        s.put_byte(env.format.mipmaps);
        s.submit(cx.rsp);
    }

    fn upload_lighting(&mut self, cx: &mut PipelineContext<'_>) {
        let lighting = &cx.state.lighting;
        for (i, light) in lighting.lights.iter().enumerate() {
            let mut s = CommandStream::new(GlpCommand::SetLight);
            s.put_byte(i as u8);
            s.put_byte(light.enabled as u8);
            put_color(&mut s, light.ambient);
            put_color(&mut s, light.diffuse);
            for v in light.position.to_array() {
                put_s15_16(&mut s, v);
            }
            put_s15_16(&mut s, light.constant_attenuation);
            put_s15_16(&mut s, light.linear_attenuation);
            put_s15_16(&mut s, light.quadratic_attenuation);
            s.submit(cx.rsp);
        }

        let material = &lighting.material;
        let mut s = CommandStream::new(GlpCommand::SetMaterial);
        put_color(&mut s, material.ambient);
        put_color(&mut s, material.diffuse);
        put_color(&mut s, material.emissive);
        put_color(&mut s, lighting.model_ambient);
        s.put_byte(color_target_id(lighting.color_target));
        s.put_byte(lighting.local_viewer as u8);
        s.submit(cx.rsp);
    }

    fn upload_fog(&mut self, cx: &mut PipelineContext<'_>) {
        let mut s = CommandStream::new(GlpCommand::SetFog);
        put_s15_16(&mut s, cx.state.fog.factor);
        put_s15_16(&mut s, cx.state.fog.offset);
        s.submit(cx.rsp);
    }

    /// Upload every state group changed since the last draw.
    fn sync_state(&mut self, cx: &mut PipelineContext<'_>) {
        let now = cx.state.generations;
        let prev = self.synced;
        let mut uploads = 0;

        if group_changed(prev, &now, |g| g.matrices) {
            self.upload_matrices(cx);
            uploads += 1;
        }
        if group_changed(prev, &now, |g| g.viewport) {
            self.upload_viewport(cx);
            uploads += 1;
        }
        if group_changed(prev, &now, |g| g.flags) || self.synced_texture != Some(cx.texture) {
            self.upload_flags(cx);
            uploads += 1;
        }
        if group_changed(prev, &now, |g| g.lighting) {
            self.upload_lighting(cx);
            uploads += 1;
        }
        if group_changed(prev, &now, |g| g.fog) {
            self.upload_fog(cx);
            uploads += 1;
        }
        if group_changed(prev, &now, |g| g.current) {
            upload_current(cx);
            uploads += 1;
        }

        if uploads > 0 {
            log::debug!("uploaded {uploads} state groups to the RSP");
        }
        self.stats.state_uploads += uploads;
        self.synced = Some(now);
        self.synced_texture = Some(cx.texture);
    }

    fn prepare_vtx_cmd(&mut self, cx: &mut PipelineContext<'_>, layout: VertexLayout) {
        if self.layout == Some(layout) {
            return;
        }

        let mut s = CommandStream::new(GlpCommand::SetVtxLoader);
        for size in layout.sizes {
            s.put_byte(size);
        }
        s.submit(cx.rsp);

        let mut s = CommandStream::new(GlpCommand::SetVtxCmdSize);
        s.put_half(layout.cmd_size());
        s.submit(cx.rsp);

        self.layout = Some(layout);
    }

    /// Flush the attributes of a preceding `array_element` to the microcode.
    fn require_array_element(&mut self, cx: &mut PipelineContext<'_>) {
        let Some((arrays, index)) = self.last_array_element.take() else {
            return;
        };
        let ctx = cx.state.read_ctx;
        for kind in [
            AttribKind::Color,
            AttribKind::TexCoord,
            AttribKind::Normal,
            AttribKind::MatrixIndex,
        ] {
            if let Some(view) = arrays.get(kind) {
                upload_attrib(cx, kind, view.ty, view.size, view.element(index));
            }
        }
        load_attribs(&mut cx.state.current, &arrays, index, &ctx);
    }

    fn submit(&mut self, cx: &mut PipelineContext<'_>, slot: u8) {
        let Some(prim) = cx.assembler.submit(slot) else {
            return;
        };
        let mut s = CommandStream::new(GlpCommand::DrawTri);
        for &i in prim.indices() {
            s.put_half(slot_offset(i));
        }
        s.submit(cx.rsp);
        self.stats.triangles += 1;
    }

    fn write_vertex_from_arrays(&mut self, cx: &mut PipelineContext<'_>, arrays: &ResolvedArrays, index: u32, slot: u8) {
        let ctx = cx.state.read_ctx;
        let mut s = CommandStream::new(GlpCommand::SetPrimVtx);
        s.put_half(slot_offset(slot));
        for kind in AttribKind::ALL {
            let Some(view) = arrays.get(kind) else {
                continue;
            };
            if let Some(read) = rsp_reader(kind, view.ty) {
                read(&mut s, view.element(index), view.size, &ctx);
            }
        }
        s.submit(cx.rsp);
        self.stats.vertices_loaded += 1;
    }

    fn draw_vertex_from_arrays(&mut self, cx: &mut PipelineContext<'_>, arrays: &ResolvedArrays, id: u32, index: u32) {
        let (slot, miss) = cx.cache_slot(id);
        if miss {
            self.write_vertex_from_arrays(cx, arrays, index, slot);
        }
        self.submit(cx, slot);
    }

    fn set_attrib(&mut self, cx: &mut PipelineContext<'_>, kind: AttribKind, value: &AttribValue) {
        upload_attrib(cx, kind, value.ty, value.size, value.bytes());
        let ctx = cx.state.read_ctx;
        read_value(&mut cx.state.current, kind, value, &ctx);
    }
}

impl Pipeline for RspPipeline {
    fn begin(&mut self, cx: &mut PipelineContext<'_>) {
        self.sync_state(cx);
        CommandStream::new(GlpCommand::InitPipe).submit(cx.rsp);
        self.begin_end_type = BeginEndType::Indeterminate;
        self.last_array_element = None;
    }

    fn end(&mut self, cx: &mut PipelineContext<'_>) {
        if let Some((arrays, index)) = self.last_array_element.take() {
            let ctx = cx.state.read_ctx;
            load_attribs(&mut cx.state.current, &arrays, index, &ctx);
        }
        upload_current(cx);
        if let Some(synced) = self.synced.as_mut() {
            synced.current = cx.state.generations.current;
        }
    }

    fn vertex(&mut self, cx: &mut PipelineContext<'_>, value: &AttribValue) {
        if self.begin_end_type != BeginEndType::Vertex {
            self.prepare_vtx_cmd(cx, VertexLayout::immediate());
            self.begin_end_type = BeginEndType::Vertex;
        }

        let id = cx.assembler.next_id();
        let (slot, miss) = cx.cache_slot(id);
        if miss {
            self.require_array_element(cx);

            let ctx = cx.state.read_ctx;
            let mut s = CommandStream::new(GlpCommand::SetPrimVtx);
            s.put_half(slot_offset(slot));
            if let Some(read) = rsp_reader(AttribKind::Vertex, value.ty) {
                read(&mut s, value.bytes(), value.size, &ctx);
            }
            for &default in &ATTRIB_DEFAULTS[value.size..] {
                s.put_half(((default as i16) << VTX_SHIFT) as u16);
            }
            s.submit(cx.rsp);
            self.stats.vertices_loaded += 1;

            read_value(&mut cx.state.current, AttribKind::Vertex, value, &ctx);
        }
        self.submit(cx, slot);
    }

    fn color(&mut self, cx: &mut PipelineContext<'_>, value: &AttribValue) {
        self.set_attrib(cx, AttribKind::Color, value);
    }

    fn tex_coord(&mut self, cx: &mut PipelineContext<'_>, value: &AttribValue) {
        self.set_attrib(cx, AttribKind::TexCoord, value);
    }

    fn normal(&mut self, cx: &mut PipelineContext<'_>, value: &AttribValue) {
        self.set_attrib(cx, AttribKind::Normal, value);
    }

    fn matrix_index(&mut self, cx: &mut PipelineContext<'_>, value: &AttribValue) {
        self.set_attrib(cx, AttribKind::MatrixIndex, value);
    }

    fn array_element(&mut self, cx: &mut PipelineContext<'_>, arrays: &ResolvedArrays, index: u32) {
        if arrays.is_enabled(AttribKind::Vertex) {
            if self.begin_end_type != BeginEndType::ArrayElement {
                self.prepare_vtx_cmd(cx, VertexLayout::from_arrays(arrays));
                self.begin_end_type = BeginEndType::ArrayElement;
            }
            self.draw_vertex_from_arrays(cx, arrays, index, index);
        }
        self.last_array_element = Some((arrays.clone(), index));
    }

    fn draw_arrays(&mut self, cx: &mut PipelineContext<'_>, arrays: &ResolvedArrays, first: u32, count: u32) {
        if arrays.is_enabled(AttribKind::Vertex) {
            self.prepare_vtx_cmd(cx, VertexLayout::from_arrays(arrays));
            for i in 0..count {
                let id = cx.assembler.next_id();
                self.draw_vertex_from_arrays(cx, arrays, id, first + i);
            }
        }
        if count > 0 {
            let ctx = cx.state.read_ctx;
            load_attribs(&mut cx.state.current, arrays, first + count - 1, &ctx);
        }
    }

    fn draw_elements(&mut self, cx: &mut PipelineContext<'_>, arrays: &ResolvedArrays, indices: Indices<'_>) {
        if arrays.is_enabled(AttribKind::Vertex) {
            self.prepare_vtx_cmd(cx, VertexLayout::from_arrays(arrays));
            for index in indices.iter() {
                self.draw_vertex_from_arrays(cx, arrays, index, index);
            }
        }
        if let Some(last) = indices.last() {
            let ctx = cx.state.read_ctx;
            load_attribs(&mut cx.state.current, arrays, last, &ctx);
        }
    }
}
