//! Fixed-function GL 1.1 vertex pipeline for the N64.
//!
//! Immediate-mode and vertex-array draws flow through the attribute readers,
//! the vertex cache and the primitive assembler, then either through the
//! host-side transform/lighting/clipping stages into a [`n64gl_hal::Rasterizer`]
//! or, when the active state allows it, as raw attribute commands into the
//! RSP [`n64gl_hal::CommandQueue`].

pub mod assembly;
pub mod attrib;
pub mod cache;
pub mod context;
pub mod error;
pub mod gpu;
pub mod math;
pub mod pipeline;
pub mod render;
pub mod state;

pub use assembly::PrimitiveMode;
pub use attrib::{AttribKind, AttribType, Component, HalfFixed};
pub use context::{ContextConfig, GlContext};
pub use error::GlError;
pub use pipeline::{Indices, PipelineKind};
