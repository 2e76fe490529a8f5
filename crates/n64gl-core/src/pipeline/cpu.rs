//! Host-side pipeline: transform, lighting, clipping and rasterizer hand-off
//! all run on the CPU.

use crate::assembly::Primitive;
use crate::attrib::{AttribKind, AttribValue};
use crate::cache::VERTEX_CACHE_SIZE;
use crate::render::clip::{clip_line, clip_triangle, fan_triangles, ClipScratch};
use crate::render::raster::RasterTarget;
use crate::render::transform::{pre_transform, transform_and_light, PrimEnv};
use crate::render::Vertex;
use crate::state::arrays::ResolvedArrays;
use crate::state::{GlState, ShadeModel};

use super::{load_attribs, read_value, Indices, Pipeline, PipelineContext};

/// Counters of work done by the CPU pipeline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Vertices loaded into the cache and pre-transformed.
    pub vertices_loaded: u64,
    /// Vertices that went through the full transform and lighting step.
    pub vertices_transformed: u64,
    pub lighting_evaluations: u64,
    pub trivially_rejected: u64,
    pub culled: u64,
    /// Triangles handed to the rasterizer stage (before polygon mode).
    pub triangles_emitted: u64,
    pub clip_vertices_allocated: u64,
}

pub struct CpuPipeline {
    vertices: Box<[Vertex; VERTEX_CACHE_SIZE]>,
    env: PrimEnv,
    scratch: ClipScratch,
    stats: PipelineStats,
}

impl Default for CpuPipeline {
    fn default() -> Self {
        Self {
            vertices: Box::new([Vertex::default(); VERTEX_CACHE_SIZE]),
            env: PrimEnv::default(),
            scratch: ClipScratch::default(),
            stats: PipelineStats::default(),
        }
    }
}

impl CpuPipeline {
    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    fn load_vertex(&mut self, state: &GlState, slot: u8) {
        let obj = state.current;
        let mvp = *state.matrices.mvp_for(obj.mtx_index[0]);
        pre_transform(&mut self.vertices[slot as usize], &obj, &mvp);
        self.stats.vertices_loaded += 1;
    }

    fn submit(&mut self, cx: &mut PipelineContext<'_>, slot: u8) {
        if let Some(prim) = cx.assembler.submit(slot) {
            self.draw_primitive(cx, prim);
        }
    }

    fn draw_vertex_from_arrays(
        &mut self,
        cx: &mut PipelineContext<'_>,
        arrays: &ResolvedArrays,
        id: u32,
        index: u32,
    ) {
        let (slot, miss) = cx.cache_slot(id);
        if miss {
            let ctx = cx.state.read_ctx;
            load_attribs(&mut cx.state.current, arrays, index, &ctx);
            self.load_vertex(cx.state, slot);
        }
        self.submit(cx, slot);
    }

    fn ensure_t_l(&mut self, state: &GlState, slot: u8) {
        let v = &mut self.vertices[slot as usize];
        if v.t_l_applied {
            return;
        }
        self.stats.vertices_transformed += 1;
        if transform_and_light(v, state, &self.env) {
            self.stats.lighting_evaluations += 1;
        }
    }

    fn draw_primitive(&mut self, cx: &mut PipelineContext<'_>, prim: Primitive) {
        let indices = prim.indices();

        let tr_codes = indices
            .iter()
            .fold(0xFFu8, |acc, &i| acc & self.vertices[i as usize].tr_code);
        if tr_codes != 0 {
            self.stats.trivially_rejected += 1;
            return;
        }

        for &slot in indices {
            self.ensure_t_l(cx.state, slot);
        }

        let state: &GlState = &*cx.state;
        let last = indices[indices.len() - 1] as usize;
        let flat = (state.raster.shade_model == ShadeModel::Flat).then(|| self.vertices[last].shade);

        let mut target = RasterTarget {
            rdp: &mut *cx.rdp,
            raster: &state.raster,
            env: &self.env,
            cull_enabled: state.flags.cull_face,
        };

        match *indices {
            [a] => target.draw_point(&self.vertices[a as usize], flat),
            [a, b] => {
                if let Some((v0, v1)) = clip_line(
                    &self.vertices[a as usize],
                    &self.vertices[b as usize],
                    &state.viewport,
                ) {
                    target.draw_line(&v0, &v1, flat);
                }
            }
            [a, b, c] => {
                let input = [
                    self.vertices[a as usize],
                    self.vertices[b as usize],
                    self.vertices[c as usize],
                ];
                let before = self.scratch.allocations();
                let polygon = clip_triangle(&input, &mut self.scratch, &state.viewport);
                self.stats.clip_vertices_allocated += self.scratch.allocations() - before;

                for tri in fan_triangles(&polygon) {
                    let [v0, v1, v2] = tri.map(|v| self.scratch.resolve(&input, v));
                    if target.cull_and_draw(v0, v1, v2, flat) {
                        self.stats.triangles_emitted += 1;
                    } else {
                        self.stats.culled += 1;
                    }
                }
            }
            _ => unreachable!("primitives have 1 to 3 vertices"),
        }
    }
}

impl Pipeline for CpuPipeline {
    fn begin(&mut self, cx: &mut PipelineContext<'_>) {
        self.env = PrimEnv::new(cx.state, cx.texture);
        cx.state.matrices.update_targets();
    }

    fn end(&mut self, cx: &mut PipelineContext<'_>) {
        if let Some(prim) = cx.assembler.closing_edge() {
            self.draw_primitive(cx, prim);
        }
        cx.state.current_changed();
    }

    fn vertex(&mut self, cx: &mut PipelineContext<'_>, value: &AttribValue) {
        let id = cx.assembler.next_id();
        let (slot, miss) = cx.cache_slot(id);
        if miss {
            let ctx = cx.state.read_ctx;
            read_value(&mut cx.state.current, AttribKind::Vertex, value, &ctx);
            self.load_vertex(cx.state, slot);
        }
        self.submit(cx, slot);
    }

    fn color(&mut self, cx: &mut PipelineContext<'_>, value: &AttribValue) {
        let ctx = cx.state.read_ctx;
        read_value(&mut cx.state.current, AttribKind::Color, value, &ctx);
    }

    fn tex_coord(&mut self, cx: &mut PipelineContext<'_>, value: &AttribValue) {
        let ctx = cx.state.read_ctx;
        read_value(&mut cx.state.current, AttribKind::TexCoord, value, &ctx);
    }

    fn normal(&mut self, cx: &mut PipelineContext<'_>, value: &AttribValue) {
        let ctx = cx.state.read_ctx;
        read_value(&mut cx.state.current, AttribKind::Normal, value, &ctx);
    }

    fn matrix_index(&mut self, cx: &mut PipelineContext<'_>, value: &AttribValue) {
        let ctx = cx.state.read_ctx;
        read_value(&mut cx.state.current, AttribKind::MatrixIndex, value, &ctx);
    }

    fn array_element(&mut self, cx: &mut PipelineContext<'_>, arrays: &ResolvedArrays, index: u32) {
        self.draw_vertex_from_arrays(cx, arrays, index, index);
    }

    fn draw_arrays(&mut self, cx: &mut PipelineContext<'_>, arrays: &ResolvedArrays, first: u32, count: u32) {
        if arrays.is_enabled(AttribKind::Vertex) {
            for i in 0..count {
                let id = cx.assembler.next_id();
                self.draw_vertex_from_arrays(cx, arrays, id, first + i);
            }
        } else if count > 0 {
            // Nothing is drawn, but the last element's attributes still apply.
            let ctx = cx.state.read_ctx;
            load_attribs(&mut cx.state.current, arrays, first + count - 1, &ctx);
        }
    }

    fn draw_elements(&mut self, cx: &mut PipelineContext<'_>, arrays: &ResolvedArrays, indices: Indices<'_>) {
        if arrays.is_enabled(AttribKind::Vertex) {
            for index in indices.iter() {
                self.draw_vertex_from_arrays(cx, arrays, index, index);
            }
        } else if let Some(last) = indices.last() {
            let ctx = cx.state.read_ctx;
            load_attribs(&mut cx.state.current, arrays, last, &ctx);
        }
    }
}
