#![no_std]

/// A vertex in screen space, ready for triangle setup on the rasterizer.
///
/// Positions are in framebuffer pixels, depth is already mapped through the
/// depth range, shade channels are 0.0-1.0 and texture coordinates are in
/// texel units.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScreenVertex {
    pub position: [f32; 2],
    pub depth: f32,
    pub shade: [f32; 4],
    pub texcoord: [f32; 2],
    /// Reciprocal of the clip-space W, for perspective-correct texturing.
    pub inv_w: f32,
}

/// Which attributes the rasterizer should interpolate for a triangle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TriangleFormat {
    /// Use a single shade color for the whole triangle.
    pub shade_flat: bool,
    /// Interpolate texture coordinates.
    pub textured: bool,
    /// Number of mipmap levels of the active texture (0 if untextured).
    pub mipmaps: u8,
    /// Interpolate depth for the Z buffer.
    pub z_buffered: bool,
}

/// Axis-aligned screen rectangle, in pixels. `x1`/`y1` are exclusive.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

/// Texture coordinates (texels) mapped onto the corners of a [`Rect`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TexRect {
    pub s0: f32,
    pub t0: f32,
    pub s1: f32,
    pub t1: f32,
}

/// Abstracts the RDP rasterizer.
///
/// All calls are fire-and-forget and must be executed in submission order.
pub trait Rasterizer {
    /// Rasterize one triangle.
    fn draw_triangle(
        &mut self,
        format: &TriangleFormat,
        v0: &ScreenVertex,
        v1: &ScreenVertex,
        v2: &ScreenVertex,
    );

    /// Fill a rectangle with the current primitive color.
    fn fill_rectangle(&mut self, rect: &Rect);

    /// Draw a rectangle sampling the active texture.
    fn texture_rectangle(&mut self, rect: &Rect, tex: &TexRect);

    /// Set the constant depth used by rectangles (0..=0x7FFF).
    fn set_prim_depth(&mut self, depth: u16);

    /// Set the primitive color as RGBA8.
    fn set_prim_color(&mut self, rgba: [u8; 4]);
}

/// Abstracts the append-only command stream consumed by the RSP microcode.
///
/// The host never reads anything back; synchronization (flush/finish) is the
/// implementation's concern.
pub trait CommandQueue {
    /// Append one encoded command. `words[0]` carries the command id in its
    /// most significant byte.
    fn push(&mut self, words: &[u32]);
}
