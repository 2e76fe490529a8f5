//! Matrix stacks and transform targets.
//!
//! Each transform target pairs a model-view stack (the default one, or one of
//! the palette stacks) with a lazily recomputed MVP product.

use crate::error::GlError;
use glam::Mat4;

pub const MODELVIEW_STACK_SIZE: usize = 32;
pub const PROJECTION_STACK_SIZE: usize = 2;
pub const TEXTURE_STACK_SIZE: usize = 2;
pub const PALETTE_STACK_SIZE: usize = 2;
/// Number of palette model-view matrices.
pub const MATRIX_PALETTE_SIZE: usize = 16;

/// Which stack the matrix operations act on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatrixMode {
    ModelView,
    Projection,
    Texture,
    /// The palette stack selected by `current_palette_matrix`.
    Palette,
}

/// Fixed-depth matrix stack.
#[derive(Clone, Debug)]
pub struct MatrixStack {
    storage: Vec<Mat4>,
    depth: usize,
}

impl MatrixStack {
    pub fn new(capacity: usize) -> Self {
        Self {
            storage: vec![Mat4::IDENTITY; capacity],
            depth: 0,
        }
    }

    pub fn top(&self) -> &Mat4 {
        &self.storage[self.depth]
    }

    pub fn load(&mut self, m: Mat4) {
        self.storage[self.depth] = m;
    }

    /// Post-multiply the top of the stack (`top = top * m`).
    pub fn mult(&mut self, m: &Mat4) {
        self.storage[self.depth] *= *m;
    }

    /// Duplicate the top matrix.
    pub fn push(&mut self) -> Result<(), GlError> {
        if self.depth + 1 >= self.storage.len() {
            return Err(GlError::StackOverflow);
        }
        self.storage[self.depth + 1] = self.storage[self.depth];
        self.depth += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Result<(), GlError> {
        if self.depth == 0 {
            return Err(GlError::StackUnderflow);
        }
        self.depth -= 1;
        Ok(())
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// Cached model-view-projection product of one model-view stack.
#[derive(Clone, Copy, Debug)]
pub struct MatrixTarget {
    mvp: Mat4,
    dirty: bool,
}

impl Default for MatrixTarget {
    fn default() -> Self {
        Self {
            mvp: Mat4::IDENTITY,
            dirty: true,
        }
    }
}

impl MatrixTarget {
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

/// All matrix stacks plus the per-stack MVP memo.
#[derive(Clone, Debug)]
pub struct MatrixState {
    pub mode: MatrixMode,
    modelview: MatrixStack,
    projection: MatrixStack,
    texture: MatrixStack,
    palette: Vec<MatrixStack>,
    default_target: MatrixTarget,
    palette_targets: [MatrixTarget; MATRIX_PALETTE_SIZE],
    current_palette: usize,
    /// Select targets by per-vertex matrix index.
    pub palette_enabled: bool,
    mvp_updates: u64,
}

impl Default for MatrixState {
    fn default() -> Self {
        Self {
            mode: MatrixMode::ModelView,
            modelview: MatrixStack::new(MODELVIEW_STACK_SIZE),
            projection: MatrixStack::new(PROJECTION_STACK_SIZE),
            texture: MatrixStack::new(TEXTURE_STACK_SIZE),
            palette: vec![MatrixStack::new(PALETTE_STACK_SIZE); MATRIX_PALETTE_SIZE],
            default_target: MatrixTarget::default(),
            palette_targets: [MatrixTarget::default(); MATRIX_PALETTE_SIZE],
            current_palette: 0,
            palette_enabled: false,
            mvp_updates: 0,
        }
    }
}

impl MatrixState {
    fn current_stack(&mut self) -> &mut MatrixStack {
        match self.mode {
            MatrixMode::ModelView => &mut self.modelview,
            MatrixMode::Projection => &mut self.projection,
            MatrixMode::Texture => &mut self.texture,
            MatrixMode::Palette => &mut self.palette[self.current_palette],
        }
    }

    /// Flag the targets whose product depends on the current stack.
    fn invalidate_current(&mut self) {
        match self.mode {
            MatrixMode::ModelView => self.default_target.dirty = true,
            MatrixMode::Projection => {
                self.default_target.dirty = true;
                for target in self.palette_targets.iter_mut() {
                    target.dirty = true;
                }
            }
            MatrixMode::Texture => {}
            MatrixMode::Palette => self.palette_targets[self.current_palette].dirty = true,
        }
    }

    pub fn load(&mut self, m: Mat4) {
        self.current_stack().load(m);
        self.invalidate_current();
    }

    pub fn mult(&mut self, m: &Mat4) {
        self.current_stack().mult(m);
        self.invalidate_current();
    }

    pub fn push(&mut self) -> Result<(), GlError> {
        self.current_stack().push()
    }

    pub fn pop(&mut self) -> Result<(), GlError> {
        self.current_stack().pop()?;
        self.invalidate_current();
        Ok(())
    }

    pub fn set_current_palette(&mut self, index: usize) -> Result<(), GlError> {
        if index >= MATRIX_PALETTE_SIZE {
            return Err(GlError::InvalidValue("palette index out of range"));
        }
        self.current_palette = index;
        Ok(())
    }

    pub fn current_palette(&self) -> usize {
        self.current_palette
    }

    pub fn modelview(&self) -> &Mat4 {
        self.modelview.top()
    }

    pub fn projection(&self) -> &Mat4 {
        self.projection.top()
    }

    pub fn texture(&self) -> &Mat4 {
        self.texture.top()
    }

    /// Model-view matrix applied to a vertex with palette index `mtx_index`.
    pub fn modelview_for(&self, mtx_index: u8) -> &Mat4 {
        if self.palette_enabled {
            self.palette[mtx_index as usize % MATRIX_PALETTE_SIZE].top()
        } else {
            self.modelview.top()
        }
    }

    /// Cached MVP for a vertex with palette index `mtx_index`.
    ///
    /// Only valid after [`MatrixState::update_targets`].
    pub fn mvp_for(&self, mtx_index: u8) -> &Mat4 {
        if self.palette_enabled {
            &self.palette_targets[mtx_index as usize % MATRIX_PALETTE_SIZE].mvp
        } else {
            &self.default_target.mvp
        }
    }

    /// Recompute every dirty MVP product that may be read by the next draw.
    pub fn update_targets(&mut self) {
        let proj = *self.projection.top();
        if self.palette_enabled {
            for (target, stack) in self.palette_targets.iter_mut().zip(&self.palette) {
                if target.dirty {
                    target.mvp = proj * *stack.top();
                    target.dirty = false;
                    self.mvp_updates += 1;
                }
            }
        } else if self.default_target.dirty {
            self.default_target.mvp = proj * *self.modelview.top();
            self.default_target.dirty = false;
            self.mvp_updates += 1;
        }
    }

    pub fn default_target(&self) -> &MatrixTarget {
        &self.default_target
    }

    /// Number of MVP products computed so far.
    pub fn mvp_updates(&self) -> u64 {
        self.mvp_updates
    }
}

/// GL `glFrustum` projection.
pub fn frustum(l: f32, r: f32, b: f32, t: f32, n: f32, f: f32) -> Mat4 {
    Mat4::from_cols_array(&[
        2.0 * n / (r - l),
        0.0,
        0.0,
        0.0,
        0.0,
        2.0 * n / (t - b),
        0.0,
        0.0,
        (r + l) / (r - l),
        (t + b) / (t - b),
        -(f + n) / (f - n),
        -1.0,
        0.0,
        0.0,
        -(2.0 * f * n) / (f - n),
        0.0,
    ])
}

/// GL `glOrtho` projection.
pub fn ortho(l: f32, r: f32, b: f32, t: f32, n: f32, f: f32) -> Mat4 {
    Mat4::from_cols_array(&[
        2.0 / (r - l),
        0.0,
        0.0,
        0.0,
        0.0,
        2.0 / (t - b),
        0.0,
        0.0,
        0.0,
        0.0,
        -2.0 / (f - n),
        0.0,
        -(r + l) / (r - l),
        -(t + b) / (t - b),
        -(f + n) / (f - n),
        1.0,
    ])
}
