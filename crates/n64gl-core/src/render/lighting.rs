//! Fixed-function Phong lighting evaluated per vertex.

use crate::math::{clamped_dot, homogeneous_unit_diff};
use glam::{Vec3, Vec4};

/// Number of light sources.
pub const LIGHT_COUNT: usize = 8;

/// Which material color tracks the vertex color while color material is enabled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorMaterialTarget {
    Emission,
    Ambient,
    Diffuse,
    AmbientAndDiffuse,
    Specular,
}

/// Front-face material.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    pub ambient: Vec4,
    pub diffuse: Vec4,
    pub specular: Vec4,
    pub emissive: Vec4,
    pub shininess: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            ambient: Vec4::new(0.2, 0.2, 0.2, 1.0),
            diffuse: Vec4::new(0.8, 0.8, 0.8, 1.0),
            specular: Vec4::new(0.0, 0.0, 0.0, 1.0),
            emissive: Vec4::new(0.0, 0.0, 0.0, 1.0),
            shininess: 0.0,
        }
    }
}

/// A light source. Position and direction are stored in eye space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Light {
    pub ambient: Vec4,
    pub diffuse: Vec4,
    pub specular: Vec4,
    /// Eye-space position; w = 0 makes the light directional.
    pub position: Vec4,
    /// Eye-space spot direction (not normalized).
    pub direction: Vec3,
    pub spot_exponent: f32,
    /// Cosine of the spot cutoff angle; -1 disables the cone.
    pub spot_cutoff_cos: f32,
    pub constant_attenuation: f32,
    pub linear_attenuation: f32,
    pub quadratic_attenuation: f32,
    pub enabled: bool,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            ambient: Vec4::new(0.0, 0.0, 0.0, 1.0),
            diffuse: Vec4::new(0.0, 0.0, 0.0, 1.0),
            specular: Vec4::new(0.0, 0.0, 0.0, 1.0),
            position: Vec4::new(0.0, 0.0, 1.0, 0.0),
            direction: Vec3::new(0.0, 0.0, -1.0),
            spot_exponent: 0.0,
            spot_cutoff_cos: -1.0,
            constant_attenuation: 1.0,
            linear_attenuation: 0.0,
            quadratic_attenuation: 0.0,
            enabled: false,
        }
    }
}

impl Light {
    /// Initial state of light `index`: light 0 is white, the rest are black.
    pub fn initial(index: usize) -> Self {
        let mut light = Self::default();
        if index == 0 {
            light.diffuse = Vec4::ONE;
            light.specular = Vec4::ONE;
        }
        light
    }

    pub fn is_spotlight(&self) -> bool {
        self.spot_cutoff_cos >= 0.0
    }
}

/// Everything the lighting equation reads.
#[derive(Clone, Debug, PartialEq)]
pub struct LightingState {
    pub material: Material,
    pub lights: [Light; LIGHT_COUNT],
    pub model_ambient: Vec4,
    pub local_viewer: bool,
    /// Set while color material is enabled.
    pub color_target: Option<ColorMaterialTarget>,
}

impl Default for LightingState {
    fn default() -> Self {
        Self {
            material: Material::default(),
            lights: core::array::from_fn(Light::initial),
            model_ambient: Vec4::new(0.2, 0.2, 0.2, 1.0),
            local_viewer: false,
            color_target: None,
        }
    }
}

impl LightingState {
    /// Material colors with color material substitution applied:
    /// (emissive, ambient, diffuse, specular).
    fn material_colors(&self, input: Vec4) -> (Vec4, Vec4, Vec4, Vec4) {
        let m = &self.material;
        let pick = |own: Vec4, matches: bool| if matches { input } else { own };
        let target = self.color_target;
        (
            pick(m.emissive, target == Some(ColorMaterialTarget::Emission)),
            pick(
                m.ambient,
                matches!(
                    target,
                    Some(ColorMaterialTarget::Ambient | ColorMaterialTarget::AmbientAndDiffuse)
                ),
            ),
            pick(
                m.diffuse,
                matches!(
                    target,
                    Some(ColorMaterialTarget::Diffuse | ColorMaterialTarget::AmbientAndDiffuse)
                ),
            ),
            pick(m.specular, target == Some(ColorMaterialTarget::Specular)),
        )
    }
}

/// Evaluate the lighting equation for one vertex.
///
/// `input` is the vertex color (used for color material), `v` the eye-space
/// position and `n` the eye-space normal. Returns the unclamped color with
/// alpha taken from the diffuse material.
pub fn perform_lighting(input: Vec4, v: Vec4, n: Vec3, lighting: &LightingState) -> Vec4 {
    let (emissive, ambient, diffuse, specular) = lighting.material_colors(input);

    let mut color = emissive.truncate() + ambient.truncate() * lighting.model_ambient.truncate();

    for light in lighting.lights.iter().filter(|l| l.enabled) {
        let mut spot = 1.0;
        if light.is_spotlight() {
            let plv = homogeneous_unit_diff(light.position, v);
            let s = light.direction.normalize_or_zero();
            let plvds = clamped_dot(plv, s);
            if plvds < light.spot_cutoff_cos {
                continue;
            }
            spot = libm::powf(plvds, light.spot_exponent);
        }

        let mut att = 1.0;
        if light.position.w != 0.0 {
            let dsq = (v.truncate() - light.position.truncate()).length_squared();
            let d = libm::sqrtf(dsq);
            att = 1.0
                / (light.constant_attenuation
                    + light.linear_attenuation * d
                    + light.quadratic_attenuation * dsq);
        }

        let mut col = ambient.truncate() * light.ambient.truncate();

        let vpl = homogeneous_unit_diff(v, light.position);
        let ndvp = clamped_dot(n, vpl);

        col += diffuse.truncate() * light.diffuse.truncate() * ndvp;

        let spec_mix = specular.truncate() * light.specular.truncate();
        if ndvp != 0.0 && spec_mix != Vec3::ZERO {
            let eye = if lighting.local_viewer {
                homogeneous_unit_diff(v, Vec4::new(0.0, 0.0, 0.0, 1.0))
            } else {
                Vec3::Z
            };
            let h = (vpl + eye).normalize_or_zero();
            let ndh = clamped_dot(n, h);
            col += spec_mix * libm::powf(ndh, lighting.material.shininess);
        }

        color += col * (att * spot);
    }

    color.extend(diffuse.w)
}
