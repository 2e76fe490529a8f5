//! Conversion of pipeline vertices into rasterizer hand-off records.

use glam::Vec4;
use n64gl_hal::ScreenVertex;

use crate::math::fixed::f32_to_u8;
use crate::render::Vertex;

/// Screen-space record of `v`, with `shade` replacing its own color.
pub fn screen_vertex(v: &Vertex, shade: Vec4) -> ScreenVertex {
    ScreenVertex {
        position: v.screen_pos.to_array(),
        depth: v.depth,
        shade: shade.to_array(),
        texcoord: v.texcoord.to_array(),
        inv_w: v.inv_w,
    }
}

/// RGBA8 primitive color from a 0.0-1.0 shade.
pub fn pack_color(shade: Vec4) -> [u8; 4] {
    shade.to_array().map(f32_to_u8)
}
