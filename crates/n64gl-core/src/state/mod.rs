//! Render state read by the pipelines.
//!
//! All state lives in one [`GlState`] owned by the context. Groups the RSP
//! mirrors carry generation counters so uploads happen only after a change,
//! and the RSP capability check is memoized until a relevant setter runs.

pub mod arrays;
pub mod handles;
pub mod matrix;
pub mod texture;

use glam::{Vec3, Vec4};

use crate::attrib::ReadContext;
use crate::error::GlError;
use crate::render::lighting::{ColorMaterialTarget, LightingState, LIGHT_COUNT};
use crate::render::ObjAttributes;
use arrays::ArrayState;
use matrix::MatrixState;

/// Number of texture coordinate channels.
pub const TEX_COORD_COUNT: usize = 4;

/// Texture coordinate channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TexCoord {
    S,
    T,
    R,
    Q,
}

impl TexCoord {
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Toggleable server state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capability {
    Lighting,
    Light(u8),
    Fog,
    Normalize,
    ColorMaterial,
    Texture2D,
    CullFace,
    DepthTest,
    MatrixPalette,
    TextureGen(TexCoord),
    /// Not implemented by the hardware pipeline; enabling is fatal.
    StencilTest,
    /// Evaluators are not implemented; enabling is fatal.
    AutoNormal,
    Map1Vertex3,
    Map2Vertex3,
}

/// Rasterization mode. Only rendering is implemented.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderMode {
    Render,
    Select,
    Feedback,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Face {
    Front,
    Back,
    FrontAndBack,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrontFace {
    Clockwise,
    CounterClockwise,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShadeModel {
    Flat,
    Smooth,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolygonMode {
    Point,
    Line,
    Fill,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TexGenMode {
    EyeLinear,
    ObjectLinear,
    SphereMap,
}

/// Texture coordinate generation for one channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TexGen {
    pub enabled: bool,
    pub mode: TexGenMode,
    pub eye_plane: Vec4,
    pub object_plane: Vec4,
}

impl TexGen {
    fn initial(coord: usize) -> Self {
        let plane = match coord {
            0 => Vec4::X,
            1 => Vec4::Y,
            _ => Vec4::ZERO,
        };
        Self {
            enabled: false,
            mode: TexGenMode::EyeLinear,
            eye_plane: plane,
            object_plane: plane,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LightParam {
    Ambient(Vec4),
    Diffuse(Vec4),
    Specular(Vec4),
    /// Object-space position, transformed by the current model-view.
    Position(Vec4),
    /// Object-space direction, transformed by the current model-view.
    SpotDirection(Vec3),
    SpotExponent(f32),
    /// Cutoff angle in degrees: 0..=90, or 180 to disable the cone.
    SpotCutoff(f32),
    ConstantAttenuation(f32),
    LinearAttenuation(f32),
    QuadraticAttenuation(f32),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LightModelParam {
    Ambient(Vec4),
    LocalViewer(bool),
    /// Two-sided lighting is not implemented; `true` is fatal.
    TwoSide(bool),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MaterialParam {
    Ambient(Vec4),
    Diffuse(Vec4),
    AmbientAndDiffuse(Vec4),
    Specular(Vec4),
    Emission(Vec4),
    Shininess(f32),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FogParam {
    Start(f32),
    End(f32),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TexGenParam {
    Mode(TexGenMode),
    ObjectPlane(Vec4),
    EyePlane(Vec4),
}

/// Viewport and depth range, with the derived NDC-to-screen transform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub near: f32,
    pub far: f32,
    pub scale: Vec3,
    pub offset: Vec3,
}

impl Viewport {
    pub fn new(width: u32, height: u32, framebuffer_height: u32) -> Self {
        let mut viewport = Self {
            x: 0,
            y: 0,
            width,
            height,
            near: 0.0,
            far: 1.0,
            scale: Vec3::ZERO,
            offset: Vec3::ZERO,
        };
        viewport.update(framebuffer_height);
        viewport
    }

    /// Recompute scale and offset. Y is flipped so that window row 0 is the
    /// bottom of the framebuffer.
    pub fn update(&mut self, framebuffer_height: u32) {
        let w = self.width as f32;
        let h = self.height as f32;
        self.scale = Vec3::new(w * 0.5, -h * 0.5, (self.far - self.near) * 0.5);
        self.offset = Vec3::new(
            self.x as f32 + w * 0.5,
            framebuffer_height as f32 - self.y as f32 - h * 0.5,
            self.near + (self.far - self.near) * 0.5,
        );
    }
}

/// Linear fog ramp.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fog {
    pub start: f32,
    pub end: f32,
    /// `1 / (end - start)`, or 0 for an empty ramp.
    pub factor: f32,
    pub offset: f32,
}

impl Default for Fog {
    fn default() -> Self {
        let mut fog = Self {
            start: 0.0,
            end: 1.0,
            factor: 0.0,
            offset: 0.0,
        };
        fog.update();
        fog
    }
}

impl Fog {
    pub fn update(&mut self) {
        let diff = self.end - self.start;
        self.factor = if diff.abs() < f32::MIN_POSITIVE {
            0.0
        } else {
            1.0 / diff
        };
        self.offset = self.end;
    }

    /// Fog blend factor at eye-space depth `eye_z`.
    pub fn factor_at(&self, eye_z: f32) -> f32 {
        (self.offset - eye_z.abs()) * self.factor
    }
}

/// Primitive rasterization settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RasterState {
    pub cull_face: Face,
    pub front_face: FrontFace,
    pub shade_model: ShadeModel,
    pub polygon_mode: PolygonMode,
    pub point_size: f32,
    pub line_width: f32,
}

impl Default for RasterState {
    fn default() -> Self {
        Self {
            cull_face: Face::Back,
            front_face: FrontFace::CounterClockwise,
            shade_model: ShadeModel::Smooth,
            polygon_mode: PolygonMode::Fill,
            point_size: 1.0,
            line_width: 1.0,
        }
    }
}

/// Enable flags not owned by a more specific state group.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Flags {
    pub lighting: bool,
    pub fog: bool,
    pub normalize: bool,
    pub color_material: bool,
    pub texture_2d: bool,
    pub cull_face: bool,
    pub depth_test: bool,
}

/// Change counters for the state groups mirrored to the RSP.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Generations {
    pub matrices: u32,
    pub viewport: u32,
    pub lighting: u32,
    pub fog: u32,
    pub flags: u32,
    pub current: u32,
}

fn bump(counter: &mut u32) {
    *counter = counter.wrapping_add(1);
}

/// Complete pipeline state.
#[derive(Debug)]
pub struct GlState {
    pub flags: Flags,
    pub matrices: MatrixState,
    pub lighting: LightingState,
    pub color_material_target: ColorMaterialTarget,
    pub fog: Fog,
    pub tex_gen: [TexGen; TEX_COORD_COUNT],
    pub viewport: Viewport,
    pub raster: RasterState,
    pub arrays: ArrayState,
    /// Current attribute values.
    pub current: ObjAttributes,
    pub read_ctx: ReadContext,
    pub generations: Generations,
    framebuffer_height: u32,
    rsp_support: Option<Result<(), &'static str>>,
}

impl GlState {
    pub fn new(framebuffer_width: u32, framebuffer_height: u32) -> Self {
        Self {
            flags: Flags::default(),
            matrices: MatrixState::default(),
            lighting: LightingState::default(),
            color_material_target: ColorMaterialTarget::AmbientAndDiffuse,
            fog: Fog::default(),
            tex_gen: core::array::from_fn(TexGen::initial),
            viewport: Viewport::new(framebuffer_width, framebuffer_height, framebuffer_height),
            raster: RasterState::default(),
            arrays: ArrayState::default(),
            current: ObjAttributes::default(),
            read_ctx: ReadContext::default(),
            generations: Generations::default(),
            framebuffer_height,
            rsp_support: None,
        }
    }

    /// Whether the RSP microcode implements the current feature combination.
    /// The error names the first unsupported feature.
    pub fn rsp_support(&mut self) -> Result<(), &'static str> {
        if let Some(cached) = self.rsp_support {
            return cached;
        }
        let support = self.compute_rsp_support();
        self.rsp_support = Some(support);
        support
    }

    fn compute_rsp_support(&self) -> Result<(), &'static str> {
        if self.raster.polygon_mode != PolygonMode::Fill {
            return Err("polygon mode is not fill");
        }
        if self.flags.lighting {
            if self.raster.shade_model == ShadeModel::Flat {
                return Err("flat shading with lighting");
            }
            if self
                .lighting
                .lights
                .iter()
                .any(|light| light.enabled && light.is_spotlight())
            {
                return Err("spotlights");
            }
            if self.lighting.material.specular.truncate() != Vec3::ZERO {
                return Err("specular material");
            }
        }
        Ok(())
    }

    fn invalidate_rsp_support(&mut self) {
        self.rsp_support = None;
    }

    pub fn is_enabled(&self, cap: Capability) -> Result<bool, GlError> {
        Ok(match cap {
            Capability::Lighting => self.flags.lighting,
            Capability::Light(i) => self.light_index(i).map(|i| self.lighting.lights[i].enabled)?,
            Capability::Fog => self.flags.fog,
            Capability::Normalize => self.flags.normalize,
            Capability::ColorMaterial => self.flags.color_material,
            Capability::Texture2D => self.flags.texture_2d,
            Capability::CullFace => self.flags.cull_face,
            Capability::DepthTest => self.flags.depth_test,
            Capability::MatrixPalette => self.matrices.palette_enabled,
            Capability::TextureGen(coord) => self.tex_gen[coord.index()].enabled,
            Capability::StencilTest
            | Capability::AutoNormal
            | Capability::Map1Vertex3
            | Capability::Map2Vertex3 => false,
        })
    }

    pub fn set_capability(&mut self, cap: Capability, enabled: bool) -> Result<(), GlError> {
        match cap {
            Capability::Lighting => {
                self.flags.lighting = enabled;
                self.invalidate_rsp_support();
            }
            Capability::Light(i) => {
                let i = self.light_index(i)?;
                self.lighting.lights[i].enabled = enabled;
                self.invalidate_rsp_support();
                bump(&mut self.generations.lighting);
            }
            Capability::Fog => self.flags.fog = enabled,
            Capability::Normalize => self.flags.normalize = enabled,
            Capability::ColorMaterial => {
                self.flags.color_material = enabled;
                self.sync_color_material();
            }
            Capability::Texture2D => self.flags.texture_2d = enabled,
            Capability::CullFace => self.flags.cull_face = enabled,
            Capability::DepthTest => self.flags.depth_test = enabled,
            Capability::MatrixPalette => {
                self.matrices.palette_enabled = enabled;
                bump(&mut self.generations.matrices);
            }
            Capability::TextureGen(coord) => self.tex_gen[coord.index()].enabled = enabled,
            Capability::StencilTest => {
                if enabled {
                    panic!("stencil test is not supported");
                }
            }
            Capability::AutoNormal | Capability::Map1Vertex3 | Capability::Map2Vertex3 => {
                if enabled {
                    panic!("evaluators are not supported ({cap:?})");
                }
            }
        }
        bump(&mut self.generations.flags);
        Ok(())
    }

    fn light_index(&self, index: u8) -> Result<usize, GlError> {
        let index = index as usize;
        if index >= LIGHT_COUNT {
            return Err(GlError::InvalidEnum("light index out of range"));
        }
        Ok(index)
    }

    fn sync_color_material(&mut self) {
        self.lighting.color_target = self
            .flags
            .color_material
            .then_some(self.color_material_target);
        bump(&mut self.generations.lighting);
    }

    /// Mark the matrix group changed after a matrix operation.
    pub fn matrices_changed(&mut self) {
        bump(&mut self.generations.matrices);
    }

    pub fn current_changed(&mut self) {
        bump(&mut self.generations.current);
    }

    pub fn set_viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.viewport.x = x;
        self.viewport.y = y;
        self.viewport.width = width;
        self.viewport.height = height;
        self.viewport.update(self.framebuffer_height);
        bump(&mut self.generations.viewport);
    }

    pub fn set_depth_range(&mut self, near: f32, far: f32) {
        self.viewport.near = near.clamp(0.0, 1.0);
        self.viewport.far = far.clamp(0.0, 1.0);
        self.viewport.update(self.framebuffer_height);
        bump(&mut self.generations.viewport);
    }

    pub fn set_light(&mut self, index: u8, param: LightParam) -> Result<(), GlError> {
        let i = self.light_index(index)?;
        let modelview = *self.matrices.modelview();
        let light = &mut self.lighting.lights[i];
        match param {
            LightParam::Ambient(c) => light.ambient = c,
            LightParam::Diffuse(c) => light.diffuse = c,
            LightParam::Specular(c) => light.specular = c,
            LightParam::Position(p) => light.position = modelview * p,
            LightParam::SpotDirection(d) => light.direction = modelview.transform_vector3(d),
            LightParam::SpotExponent(e) => {
                if !(0.0..=128.0).contains(&e) {
                    return Err(GlError::InvalidValue("spot exponent must be in 0..=128"));
                }
                light.spot_exponent = e;
            }
            LightParam::SpotCutoff(angle) => {
                light.spot_cutoff_cos = if angle == 180.0 {
                    -1.0
                } else if (0.0..=90.0).contains(&angle) {
                    libm::cosf(angle.to_radians())
                } else {
                    return Err(GlError::InvalidValue("spot cutoff must be in 0..=90 or 180"));
                };
                self.invalidate_rsp_support();
            }
            LightParam::ConstantAttenuation(a)
            | LightParam::LinearAttenuation(a)
            | LightParam::QuadraticAttenuation(a)
                if a < 0.0 =>
            {
                return Err(GlError::InvalidValue("attenuation must not be negative"));
            }
            LightParam::ConstantAttenuation(a) => light.constant_attenuation = a,
            LightParam::LinearAttenuation(a) => light.linear_attenuation = a,
            LightParam::QuadraticAttenuation(a) => light.quadratic_attenuation = a,
        }
        bump(&mut self.generations.lighting);
        Ok(())
    }

    pub fn set_light_model(&mut self, param: LightModelParam) {
        match param {
            LightModelParam::Ambient(c) => self.lighting.model_ambient = c,
            LightModelParam::LocalViewer(v) => self.lighting.local_viewer = v,
            LightModelParam::TwoSide(two_side) => {
                if two_side {
                    panic!("two-sided lighting is not supported");
                }
            }
        }
        bump(&mut self.generations.lighting);
    }

    pub fn set_material(&mut self, face: Face, param: MaterialParam) -> Result<(), GlError> {
        if face != Face::Front {
            panic!("only front materials are supported, got {face:?}");
        }
        let material = &mut self.lighting.material;
        match param {
            MaterialParam::Ambient(c) => material.ambient = c,
            MaterialParam::Diffuse(c) => material.diffuse = c,
            MaterialParam::AmbientAndDiffuse(c) => {
                material.ambient = c;
                material.diffuse = c;
            }
            MaterialParam::Specular(c) => {
                material.specular = c;
                self.invalidate_rsp_support();
            }
            MaterialParam::Emission(c) => material.emissive = c,
            MaterialParam::Shininess(s) => {
                if !(0.0..=128.0).contains(&s) {
                    return Err(GlError::InvalidValue("shininess must be in 0..=128"));
                }
                material.shininess = s;
            }
        }
        bump(&mut self.generations.lighting);
        Ok(())
    }

    pub fn set_color_material(&mut self, face: Face, target: ColorMaterialTarget) {
        if face != Face::Front {
            panic!("only front materials are supported, got {face:?}");
        }
        self.color_material_target = target;
        self.sync_color_material();
    }

    pub fn set_fog(&mut self, param: FogParam) {
        match param {
            FogParam::Start(s) => self.fog.start = s,
            FogParam::End(e) => self.fog.end = e,
        }
        self.fog.update();
        bump(&mut self.generations.fog);
    }

    pub fn set_tex_gen(&mut self, coord: TexCoord, param: TexGenParam) -> Result<(), GlError> {
        let tex_gen = &mut self.tex_gen[coord.index()];
        match param {
            TexGenParam::Mode(TexGenMode::SphereMap)
                if matches!(coord, TexCoord::R | TexCoord::Q) =>
            {
                return Err(GlError::InvalidEnum("sphere map is only valid for S and T"));
            }
            TexGenParam::Mode(mode) => tex_gen.mode = mode,
            TexGenParam::ObjectPlane(p) => tex_gen.object_plane = p,
            TexGenParam::EyePlane(p) => tex_gen.eye_plane = p,
        }
        bump(&mut self.generations.flags);
        Ok(())
    }

    pub fn set_polygon_mode(&mut self, face: Face, mode: PolygonMode) {
        if face != Face::FrontAndBack {
            panic!("separate front and back polygon modes are not supported");
        }
        self.raster.polygon_mode = mode;
        self.invalidate_rsp_support();
        bump(&mut self.generations.flags);
    }

    pub fn set_shade_model(&mut self, model: ShadeModel) {
        self.raster.shade_model = model;
        self.invalidate_rsp_support();
        bump(&mut self.generations.flags);
    }

    pub fn set_cull_face(&mut self, face: Face) {
        self.raster.cull_face = face;
        bump(&mut self.generations.flags);
    }

    pub fn set_front_face(&mut self, front_face: FrontFace) {
        self.raster.front_face = front_face;
        bump(&mut self.generations.flags);
    }

    pub fn set_point_size(&mut self, size: f32) -> Result<(), GlError> {
        if size <= 0.0 {
            return Err(GlError::InvalidValue("point size must be positive"));
        }
        self.raster.point_size = size;
        Ok(())
    }

    pub fn set_line_width(&mut self, width: f32) -> Result<(), GlError> {
        if width <= 0.0 {
            return Err(GlError::InvalidValue("line width must be positive"));
        }
        self.raster.line_width = width;
        Ok(())
    }
}
