//! Texture-state collaborator interface.

/// Magnification filter of the active texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureFilter {
    Nearest,
    Linear,
}

/// What the pipeline needs to know about the active texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureInfo {
    pub width: u32,
    pub height: u32,
    /// Number of mipmap levels (1 for a non-mipmapped texture).
    pub mipmaps: u8,
    pub filter: TextureFilter,
}

impl TextureInfo {
    pub fn is_bilinear(&self) -> bool {
        self.filter == TextureFilter::Linear
    }
}

/// Supplies the currently bound texture, if it is complete.
///
/// Texture image management lives outside the vertex pipeline; the pipeline
/// only queries this at `begin`.
pub trait TextureSource {
    /// The active and complete texture, or `None` if texturing cannot apply.
    fn active_texture(&self) -> Option<TextureInfo>;
}

/// Texture source that never has a texture bound.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoTexture;

impl TextureSource for NoTexture {
    fn active_texture(&self) -> Option<TextureInfo> {
        None
    }
}

impl TextureSource for Option<TextureInfo> {
    fn active_texture(&self) -> Option<TextureInfo> {
        *self
    }
}
