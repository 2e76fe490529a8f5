//! Vertex processing stages of the CPU pipeline.
//!
//! [`transform`] runs per cache slot, [`clip`] and [`raster`] per assembled
//! primitive. [`lighting`] holds the light/material model evaluated by the
//! transform stage.

pub mod clip;
pub mod lighting;
pub mod raster;
pub mod transform;

use crate::attrib::VERTEX_UNIT_COUNT;
use glam::{Vec2, Vec3, Vec4};

/// Object-space attributes of a vertex, as supplied by the application.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObjAttributes {
    pub position: Vec4,
    pub color: Vec4,
    pub texcoord: Vec4,
    pub normal: Vec3,
    pub mtx_index: [u8; VERTEX_UNIT_COUNT],
}

impl Default for ObjAttributes {
    /// Initial GL current values: white, (0,0,0,1) texcoord, +Z normal.
    fn default() -> Self {
        Self {
            position: Vec4::new(0.0, 0.0, 0.0, 1.0),
            color: Vec4::ONE,
            texcoord: Vec4::new(0.0, 0.0, 0.0, 1.0),
            normal: Vec3::Z,
            mtx_index: [0; VERTEX_UNIT_COUNT],
        }
    }
}

/// A cache-resident vertex with its derived pipeline attributes.
///
/// `cs_pos` and `tr_code` are valid after pre-transform. Everything else is
/// valid only once `t_l_applied` is set.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vertex {
    pub obj: ObjAttributes,
    /// Clip-space position.
    pub cs_pos: Vec4,
    /// Screen-space position in pixels.
    pub screen_pos: Vec2,
    pub depth: f32,
    pub inv_w: f32,
    /// Shading color after lighting and fog.
    pub shade: Vec4,
    /// Final texture coordinate in texels.
    pub texcoord: Vec2,
    /// Six-bit mask against the guard-band frustum.
    pub clip_code: u8,
    /// Six-bit mask against the +-w frustum.
    pub tr_code: u8,
    pub t_l_applied: bool,
}
