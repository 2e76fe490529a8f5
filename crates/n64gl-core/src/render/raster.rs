//! Rasterizer hand-off: face culling, flat color and polygon-mode emission.

use glam::{Vec2, Vec4};
use n64gl_hal::{Rasterizer, Rect, TexRect};

use super::transform::PrimEnv;
use super::Vertex;
use crate::gpu::vertex::{pack_color, screen_vertex};
use crate::math::fixed::f32_to_prim_depth;
use crate::state::{Face, FrontFace, PolygonMode, RasterState};

/// Everything the hand-off reads for one primitive.
pub struct RasterTarget<'a> {
    pub rdp: &'a mut dyn Rasterizer,
    pub raster: &'a RasterState,
    pub env: &'a PrimEnv,
    pub cull_enabled: bool,
}

/// Twice the signed screen-space area of the triangle.
pub fn winding(v0: Vec2, v1: Vec2, v2: Vec2) -> f32 {
    v0.x * (v1.y - v2.y) + v1.x * (v2.y - v0.y) + v2.x * (v0.y - v1.y)
}

/// Whether face culling discards the triangle.
pub fn is_culled(raster: &RasterState, v0: &Vertex, v1: &Vertex, v2: &Vertex) -> bool {
    if raster.cull_face == Face::FrontAndBack {
        return true;
    }
    let w = winding(v0.screen_pos, v1.screen_pos, v2.screen_pos);
    // Screen Y points down, so counter-clockwise in GL is negative area here.
    let is_front = (raster.front_face == FrontFace::CounterClockwise) ^ (w > 0.0);
    let face = if is_front { Face::Front } else { Face::Back };
    raster.cull_face == face
}

impl RasterTarget<'_> {
    fn shade_of(&self, v: &Vertex, flat: Option<Vec4>) -> Vec4 {
        flat.unwrap_or(v.shade)
    }

    /// Draw a point as a `point_size` square around the vertex.
    pub fn draw_point(&mut self, v: &Vertex, flat: Option<Vec4>) {
        let half = self.raster.point_size * 0.5;
        let rect = Rect {
            x0: v.screen_pos.x - half,
            y0: v.screen_pos.y - half,
            x1: v.screen_pos.x - half + self.raster.point_size,
            y1: v.screen_pos.y - half + self.raster.point_size,
        };

        self.rdp.set_prim_color(pack_color(self.shade_of(v, flat)));
        if self.env.format.z_buffered {
            self.rdp.set_prim_depth(f32_to_prim_depth(v.depth));
        }

        if self.env.texture.is_some() {
            let tex = TexRect {
                s0: v.texcoord.x,
                t0: v.texcoord.y,
                s1: v.texcoord.x + 1.0,
                t1: v.texcoord.y + 1.0,
            };
            self.rdp.texture_rectangle(&rect, &tex);
        } else {
            self.rdp.fill_rectangle(&rect);
        }
    }

    /// Draw a line as a `line_width` wide quad made of two triangles.
    pub fn draw_line(&mut self, v0: &Vertex, v1: &Vertex, flat: Option<Vec4>) {
        let d = v1.screen_pos - v0.screen_pos;
        let perp = Vec2::new(-d.y, d.x);
        let mag = perp.length();
        if mag == 0.0 {
            return;
        }
        let offset = perp * (self.raster.line_width * 0.5 / mag);

        let mut corners = [
            screen_vertex(v0, self.shade_of(v0, flat)),
            screen_vertex(v0, self.shade_of(v0, flat)),
            screen_vertex(v1, self.shade_of(v1, flat)),
            screen_vertex(v1, self.shade_of(v1, flat)),
        ];
        for (i, corner) in corners.iter_mut().enumerate() {
            let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
            let base = Vec2::from_array(corner.position);
            corner.position = (base + offset * sign).to_array();
        }

        let format = &self.env.format;
        self.rdp.draw_triangle(format, &corners[0], &corners[1], &corners[2]);
        self.rdp.draw_triangle(format, &corners[1], &corners[2], &corners[3]);
    }

    /// Emit a culled-and-clipped triangle according to the polygon mode.
    pub fn draw_triangle(&mut self, v0: &Vertex, v1: &Vertex, v2: &Vertex, flat: Option<Vec4>) {
        match self.raster.polygon_mode {
            PolygonMode::Point => {
                self.draw_point(v0, flat);
                self.draw_point(v1, flat);
                self.draw_point(v2, flat);
            }
            PolygonMode::Line => {
                self.draw_line(v0, v1, flat);
                self.draw_line(v1, v2, flat);
                self.draw_line(v2, v0, flat);
            }
            PolygonMode::Fill => {
                let s0 = screen_vertex(v0, self.shade_of(v0, flat));
                let s1 = screen_vertex(v1, self.shade_of(v1, flat));
                let s2 = screen_vertex(v2, self.shade_of(v2, flat));
                self.rdp.draw_triangle(&self.env.format, &s2, &s0, &s1);
            }
        }
    }

    /// Cull test followed by [`RasterTarget::draw_triangle`]. Returns whether
    /// the triangle was drawn.
    pub fn cull_and_draw(&mut self, v0: &Vertex, v1: &Vertex, v2: &Vertex, flat: Option<Vec4>) -> bool {
        if self.cull_enabled && is_culled(self.raster, v0, v1, v2) {
            return false;
        }
        self.draw_triangle(v0, v1, v2, flat);
        true
    }
}
