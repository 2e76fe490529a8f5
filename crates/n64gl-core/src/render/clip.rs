//! Clipping against the guard-band frustum in homogeneous clip space.
//!
//! Triangles go through Sutherland-Hodgman, one pass per plane that any of
//! the three vertices violates. Intersection points live in a small scratch
//! pool; the resulting convex polygon is re-triangulated as a fan rooted at
//! its first vertex. Lines replace their outside endpoint plane by plane.

use glam::Vec4;

use super::transform::{calc_clip_code, calc_screenspace, GUARD_BAND_FACTOR};
use super::Vertex;
use crate::state::Viewport;

pub const CLIPPING_PLANE_COUNT: usize = 6;
/// Scratch vertices available to one triangle clip.
pub const CLIPPING_CACHE_SIZE: usize = 9;
const CLIPPING_LIST_SIZE: usize = CLIPPING_PLANE_COUNT + 3;

/// Plane `i` corresponds to clip code bit `i`.
const CLIP_PLANES: [Vec4; CLIPPING_PLANE_COUNT] = [
    Vec4::new(1.0, 0.0, 0.0, GUARD_BAND_FACTOR),
    Vec4::new(0.0, 1.0, 0.0, GUARD_BAND_FACTOR),
    Vec4::new(0.0, 0.0, 1.0, 1.0),
    Vec4::new(1.0, 0.0, 0.0, -GUARD_BAND_FACTOR),
    Vec4::new(0.0, 1.0, 0.0, -GUARD_BAND_FACTOR),
    Vec4::new(0.0, 0.0, 1.0, -1.0),
];

/// A vertex of a clipped polygon: one of the three input vertices or a
/// scratch pool entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClipVertex {
    Input(u8),
    Scratch(u8),
}

/// Vertices of a clipped polygon, in winding order.
pub type ClipList = heapless::Vec<ClipVertex, CLIPPING_LIST_SIZE>;

/// Bounded pool of clip-generated vertices.
#[derive(Clone, Debug)]
pub struct ClipScratch {
    vertices: [Vertex; CLIPPING_CACHE_SIZE],
    used: u16,
    allocations: u64,
}

impl Default for ClipScratch {
    fn default() -> Self {
        Self {
            vertices: [Vertex::default(); CLIPPING_CACHE_SIZE],
            used: 0,
            allocations: 0,
        }
    }
}

impl ClipScratch {
    fn alloc(&mut self) -> u8 {
        let free = (!self.used).trailing_zeros() as usize;
        assert!(free < CLIPPING_CACHE_SIZE, "clipping cache full");
        self.used |= 1 << free;
        self.allocations += 1;
        free as u8
    }

    fn release(&mut self, index: u8) {
        self.used &= !(1 << index);
    }

    /// Release every entry; called before each triangle.
    pub fn clear(&mut self) {
        self.used = 0;
    }

    /// Total scratch vertices ever allocated.
    pub fn allocations(&self) -> u64 {
        self.allocations
    }

    /// Resolve a polygon vertex against the triangle it was clipped from.
    pub fn resolve<'a>(&'a self, input: &'a [Vertex; 3], v: ClipVertex) -> &'a Vertex {
        match v {
            ClipVertex::Input(i) => &input[i as usize],
            ClipVertex::Scratch(i) => &self.vertices[i as usize],
        }
    }
}

/// Intersection of the edge `inside`-`outside` with `plane`, with clip-space
/// position, shade and texture coordinate interpolated.
fn intersect_line_plane(inside: &Vertex, outside: &Vertex, plane: Vec4) -> Vertex {
    let d0 = inside.cs_pos.dot(plane);
    let d1 = outside.cs_pos.dot(plane);
    let a = d0 / (d0 - d1);
    debug_assert!((0.0..=1.0).contains(&a), "invalid intersection ratio {a}");

    let mut v = Vertex {
        cs_pos: inside.cs_pos.lerp(outside.cs_pos, a),
        shade: inside.shade.lerp(outside.shade, a),
        texcoord: inside.texcoord.lerp(outside.texcoord, a),
        obj: inside.obj,
        t_l_applied: true,
        ..Vertex::default()
    };
    calc_clip_code(&mut v);
    v
}

fn push(list: &mut ClipList, v: ClipVertex) {
    if list.push(v).is_err() {
        panic!("clipping list overflow");
    }
}

/// Clip a transformed triangle. Returns the polygon in winding order; every
/// scratch vertex in it has its screen-space position computed.
///
/// A triangle with no clip code bits set comes back as its three inputs
/// without touching the scratch pool.
pub fn clip_triangle(input: &[Vertex; 3], scratch: &mut ClipScratch, viewport: &Viewport) -> ClipList {
    let mut out = ClipList::new();
    for i in 0..3 {
        push(&mut out, ClipVertex::Input(i));
    }

    let any_clip = input[0].clip_code | input[1].clip_code | input[2].clip_code;
    if any_clip == 0 {
        return out;
    }

    scratch.clear();

    for (c, plane) in CLIP_PLANES.iter().enumerate() {
        let bit = 1u8 << c;
        if any_clip & bit == 0 {
            continue;
        }

        let in_list = core::mem::take(&mut out);
        let n = in_list.len();
        for i in 0..n {
            let cur = in_list[i];
            let prev = in_list[(i + n - 1) % n];

            let cur_inside = scratch.resolve(input, cur).clip_code & bit == 0;
            let prev_inside = scratch.resolve(input, prev).clip_code & bit == 0;

            if cur_inside != prev_inside {
                let (inside, outside) = if prev_inside { (prev, cur) } else { (cur, prev) };
                let intersection = intersect_line_plane(
                    scratch.resolve(input, inside),
                    scratch.resolve(input, outside),
                    *plane,
                );
                let slot = scratch.alloc();
                scratch.vertices[slot as usize] = intersection;
                push(&mut out, ClipVertex::Scratch(slot));
            }

            if cur_inside {
                push(&mut out, cur);
            } else if let ClipVertex::Scratch(slot) = cur {
                scratch.release(slot);
            }
        }
    }

    for v in &out {
        if let ClipVertex::Scratch(slot) = *v {
            calc_screenspace(&mut scratch.vertices[slot as usize], viewport);
        }
    }

    log::trace!("clipped triangle against {any_clip:#08b} into {} vertices", out.len());
    out
}

/// Triangles of a fan rooted at the first polygon vertex.
pub fn fan_triangles(polygon: &ClipList) -> impl Iterator<Item = [ClipVertex; 3]> + '_ {
    (2..polygon.len()).map(move |i| [polygon[0], polygon[i - 1], polygon[i]])
}

/// Clip a transformed line, returning the (possibly moved) endpoints, or
/// `None` when no part of it lies inside the guard band.
pub fn clip_line(v0: &Vertex, v1: &Vertex, viewport: &Viewport) -> Option<(Vertex, Vertex)> {
    let mut a = *v0;
    let mut b = *v1;
    let any_clip = a.clip_code | b.clip_code;
    if any_clip == 0 {
        return Some((a, b));
    }

    for (c, plane) in CLIP_PLANES.iter().enumerate() {
        let bit = 1u8 << c;
        if any_clip & bit == 0 {
            continue;
        }
        let a_inside = a.clip_code & bit == 0;
        let b_inside = b.clip_code & bit == 0;
        if !a_inside && !b_inside {
            return None;
        }
        if a_inside == b_inside {
            continue;
        }
        if a_inside {
            b = intersect_line_plane(&a, &b, *plane);
            calc_screenspace(&mut b, viewport);
        } else {
            a = intersect_line_plane(&b, &a, *plane);
            calc_screenspace(&mut a, viewport);
        }
    }

    Some((a, b))
}
