//! Per-vertex transform and lighting.
//!
//! Pre-transform computes the clip-space position and the trivial-reject code
//! as soon as a vertex enters the cache. The full T&L step (eye space,
//! lighting, fog, texture coordinates, screen space, guard-band clip code)
//! runs lazily, once per cache slot, when a primitive first needs the vertex.

use glam::{Mat4, Vec2, Vec3, Vec4};
use n64gl_hal::TriangleFormat;

use super::lighting::perform_lighting;
use super::{ObjAttributes, Vertex};
use crate::math::clamp01;
use crate::state::texture::TextureInfo;
use crate::state::{GlState, TexGen, TexGenMode, Viewport};

/// Side planes of the clipping frustum sit at this multiple of W.
pub const GUARD_BAND_FACTOR: f32 = 2.0;

/// Per-draw settings derived at `begin`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PrimEnv {
    /// Active and complete texture while texturing is enabled.
    pub texture: Option<TextureInfo>,
    pub format: TriangleFormat,
}

impl PrimEnv {
    pub fn new(state: &GlState, texture: Option<TextureInfo>) -> Self {
        let texture = texture.filter(|_| state.flags.texture_2d);
        let format = TriangleFormat {
            shade_flat: state.raster.shade_model == crate::state::ShadeModel::Flat,
            textured: texture.is_some(),
            mipmaps: texture.map_or(0, |t| t.mipmaps),
            z_buffered: state.flags.depth_test,
        };
        Self { texture, format }
    }
}

/// Clip code of `pos` against the box `[-reference, reference]`: bit `i` is
/// set below the box on axis `i`, bit `i + 3` above it.
pub fn clip_codes(pos: Vec4, reference: Vec3) -> u8 {
    let mut code = 0u8;
    for i in 0..3 {
        if pos[i] < -reference[i] {
            code |= 1 << i;
        } else if pos[i] > reference[i] {
            code |= 1 << (i + 3);
        }
    }
    code
}

/// Load object attributes and compute the clip-space position.
pub fn pre_transform(v: &mut Vertex, obj: &ObjAttributes, mvp: &Mat4) {
    v.obj = *obj;
    v.cs_pos = *mvp * obj.position;
    let w = v.cs_pos.w;
    v.tr_code = clip_codes(v.cs_pos, Vec3::splat(w));
    v.t_l_applied = false;
}

/// Compute the guard-band clip code from the clip-space position.
pub fn calc_clip_code(v: &mut Vertex) {
    let w = v.cs_pos.w;
    let reference = Vec3::new(w * GUARD_BAND_FACTOR, w * GUARD_BAND_FACTOR, w);
    v.clip_code = clip_codes(v.cs_pos, reference);
}

/// Perspective divide and viewport mapping.
pub fn calc_screenspace(v: &mut Vertex, viewport: &Viewport) {
    v.inv_w = if v.cs_pos.w != 0.0 {
        1.0 / v.cs_pos.w
    } else {
        0x7FFF as f32
    };
    let ndc = v.cs_pos.truncate() * v.inv_w;
    v.screen_pos = Vec2::new(
        ndc.x * viewport.scale.x + viewport.offset.x,
        ndc.y * viewport.scale.y + viewport.offset.y,
    );
    v.depth = ndc.z * viewport.scale.z + viewport.offset.z;
}

fn tex_gen_coord(
    index: usize,
    input: Vec4,
    tex_gen: &TexGen,
    obj_pos: Vec4,
    eye_pos: Vec4,
    eye_normal: Vec3,
) -> f32 {
    if !tex_gen.enabled {
        return input[index];
    }
    match tex_gen.mode {
        TexGenMode::EyeLinear => eye_pos.dot(tex_gen.eye_plane),
        TexGenMode::ObjectLinear => obj_pos.dot(tex_gen.object_plane),
        TexGenMode::SphereMap => {
            let u = eye_pos.truncate().normalize_or_zero();
            let d2 = 2.0 * u.dot(eye_normal);
            let r = u - eye_normal * d2 + Vec3::Z;
            let m = 1.0 / (2.0 * r.length());
            r[index] * m + 0.5
        }
    }
}

/// Generated and texture-matrix transformed coordinates, divided by q.
pub fn calc_texture_coords(
    state: &GlState,
    input: Vec4,
    obj_pos: Vec4,
    eye_pos: Vec4,
    eye_normal: Vec3,
) -> Vec2 {
    let generated = Vec4::from_array(core::array::from_fn(|i| {
        tex_gen_coord(i, input, &state.tex_gen[i], obj_pos, eye_pos, eye_normal)
    }));
    let result = *state.matrices.texture() * generated;
    let inv_q = 1.0 / result.w;
    Vec2::new(result.x * inv_q, result.y * inv_q)
}

/// Full transform and lighting of a pre-transformed vertex.
///
/// Returns whether the lighting equation was evaluated.
pub fn transform_and_light(v: &mut Vertex, state: &GlState, env: &PrimEnv) -> bool {
    let mv = state.matrices.modelview_for(v.obj.mtx_index[0]);
    let textured = env.texture.is_some();
    let lighting = state.flags.lighting;

    let mut eye_pos = Vec4::ZERO;
    let mut eye_normal = Vec3::ZERO;

    if lighting || state.flags.fog || textured {
        eye_pos = *mv * v.obj.position;
    }

    if lighting || textured {
        eye_normal = mv.transform_vector3(v.obj.normal);
        if state.flags.normalize {
            eye_normal = eye_normal.normalize_or_zero();
        }
    }

    v.shade = if lighting {
        perform_lighting(v.obj.color, eye_pos, eye_normal, &state.lighting)
    } else {
        v.obj.color
    };

    if state.flags.fog {
        v.shade.w = state.fog.factor_at(eye_pos.z);
    }

    v.shade = clamp01(v.shade);

    if let Some(texture) = env.texture {
        let tc = calc_texture_coords(state, v.obj.texcoord, v.obj.position, eye_pos, eye_normal);
        let mut texcoord = tc * Vec2::new(texture.width as f32, texture.height as f32);
        if texture.is_bilinear() {
            texcoord -= Vec2::splat(0.5);
        }
        v.texcoord = texcoord;
    }

    calc_screenspace(v, &state.viewport);
    calc_clip_code(v);
    v.t_l_applied = true;

    lighting
}
