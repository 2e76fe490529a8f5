//! Vertex array bindings and buffer objects.

use std::sync::Arc;

use super::handles::{Handle, HandleTable};
use crate::attrib::{AttribKind, AttribType, ATTRIB_COUNT};
use crate::error::GlError;

pub type BufferHandle = Handle;

/// Server-side vertex data.
#[derive(Clone, Debug)]
pub struct BufferObject {
    pub data: Arc<[u8]>,
}

impl Default for BufferObject {
    fn default() -> Self {
        Self {
            data: Arc::from(Vec::new()),
        }
    }
}

/// Where an attribute array reads from.
#[derive(Clone, Debug)]
pub enum ArrayPointer {
    /// Application memory, starting at the first element.
    Client(Arc<[u8]>),
    /// Byte offset into the currently bound array buffer.
    Offset(usize),
}

#[derive(Clone, Debug)]
enum ArraySource {
    Client(Arc<[u8]>),
    Buffer { handle: BufferHandle, offset: usize },
}

/// One attribute channel's array binding.
#[derive(Clone, Debug)]
pub struct AttribArray {
    pub size: usize,
    pub ty: AttribType,
    /// Distance between elements in bytes (never zero once bound).
    pub stride: usize,
    pub normalize: bool,
    pub enabled: bool,
    source: Option<ArraySource>,
}

impl AttribArray {
    fn new(kind: AttribKind) -> Self {
        let (size, ty) = match kind {
            AttribKind::Vertex | AttribKind::TexCoord | AttribKind::Color => (4, AttribType::Float),
            AttribKind::Normal => (3, AttribType::Float),
            AttribKind::MatrixIndex => (0, AttribType::UnsignedByte),
        };
        Self {
            size,
            ty,
            stride: 0,
            normalize: matches!(kind, AttribKind::Color | AttribKind::Normal),
            enabled: false,
            source: None,
        }
    }
}

/// A resolved, enabled array ready for element reads.
#[derive(Clone, Debug)]
pub struct ArrayView {
    data: Arc<[u8]>,
    offset: usize,
    pub size: usize,
    pub ty: AttribType,
    pub stride: usize,
}

impl ArrayView {
    fn element_bytes(&self) -> usize {
        self.size * self.ty.size_bytes()
    }

    /// Raw bytes of element `index`; empty if it lies outside the data.
    pub fn element(&self, index: u32) -> &[u8] {
        let start = self.offset + index as usize * self.stride;
        self.data
            .get(start..start + self.element_bytes())
            .unwrap_or(&[])
    }

    /// Whether every element up to and including `max_index` is in range.
    pub fn covers(&self, max_index: u32) -> bool {
        self.offset + max_index as usize * self.stride + self.element_bytes() <= self.data.len()
    }
}

/// Snapshot of all enabled arrays for one draw call.
#[derive(Clone, Debug, Default)]
pub struct ResolvedArrays {
    views: [Option<ArrayView>; ATTRIB_COUNT],
}

impl ResolvedArrays {
    pub fn get(&self, kind: AttribKind) -> Option<&ArrayView> {
        self.views[kind.index()].as_ref()
    }

    pub fn is_enabled(&self, kind: AttribKind) -> bool {
        self.views[kind.index()].is_some()
    }

    /// Fail if any enabled array is too short for `max_index`.
    pub fn check_bounds(&self, max_index: u32) -> Result<(), GlError> {
        if self.views.iter().flatten().all(|view| view.covers(max_index)) {
            Ok(())
        } else {
            Err(GlError::InvalidOperation("vertex array too short for draw"))
        }
    }
}

/// Array bindings plus the buffer objects they may reference.
#[derive(Debug)]
pub struct ArrayState {
    arrays: [AttribArray; ATTRIB_COUNT],
    buffers: HandleTable<BufferObject>,
    bound_buffer: Option<BufferHandle>,
}

impl Default for ArrayState {
    fn default() -> Self {
        Self {
            arrays: AttribKind::ALL.map(AttribArray::new),
            buffers: HandleTable::default(),
            bound_buffer: None,
        }
    }
}

impl ArrayState {
    pub fn array(&self, kind: AttribKind) -> &AttribArray {
        &self.arrays[kind.index()]
    }

    pub fn set_enabled(&mut self, kind: AttribKind, enabled: bool) {
        self.arrays[kind.index()].enabled = enabled;
    }

    /// Bind an attribute array. A zero stride means tightly packed.
    pub fn set_pointer(
        &mut self,
        kind: AttribKind,
        size: usize,
        ty: AttribType,
        stride: usize,
        pointer: ArrayPointer,
    ) -> Result<(), GlError> {
        kind.validate(size, ty)?;

        let source = match pointer {
            ArrayPointer::Client(data) => ArraySource::Client(data),
            ArrayPointer::Offset(offset) => {
                let handle = self
                    .bound_buffer
                    .ok_or(GlError::InvalidOperation("no array buffer bound"))?;
                ArraySource::Buffer { handle, offset }
            }
        };

        let array = &mut self.arrays[kind.index()];
        array.size = size;
        array.ty = ty;
        array.stride = if stride == 0 {
            size * ty.size_bytes()
        } else {
            stride
        };
        array.source = Some(source);
        Ok(())
    }

    pub fn gen_buffer(&mut self) -> BufferHandle {
        self.buffers.insert(BufferObject::default())
    }

    pub fn buffer_data(&mut self, handle: BufferHandle, data: Vec<u8>) -> Result<(), GlError> {
        let buffer = self
            .buffers
            .get_mut(handle)
            .ok_or(GlError::InvalidOperation("stale buffer handle"))?;
        buffer.data = data.into();
        Ok(())
    }

    pub fn delete_buffer(&mut self, handle: BufferHandle) -> Result<(), GlError> {
        self.buffers
            .remove(handle)
            .ok_or(GlError::InvalidOperation("stale buffer handle"))?;
        if self.bound_buffer == Some(handle) {
            self.bound_buffer = None;
        }
        Ok(())
    }

    pub fn bind_array_buffer(&mut self, handle: Option<BufferHandle>) -> Result<(), GlError> {
        if let Some(h) = handle {
            if !self.buffers.contains(h) {
                return Err(GlError::InvalidOperation("stale buffer handle"));
            }
        }
        self.bound_buffer = handle;
        Ok(())
    }

    /// Snapshot the enabled arrays. Enabled arrays without data, or backed by
    /// a deleted buffer, are an error.
    pub fn resolve(&self) -> Result<ResolvedArrays, GlError> {
        let mut resolved = ResolvedArrays::default();
        for (view, array) in resolved.views.iter_mut().zip(&self.arrays) {
            if !array.enabled {
                continue;
            }
            let (data, offset) = match &array.source {
                Some(ArraySource::Client(data)) => (data.clone(), 0),
                Some(ArraySource::Buffer { handle, offset }) => {
                    let buffer = self
                        .buffers
                        .get(*handle)
                        .ok_or(GlError::InvalidOperation("array buffer was deleted"))?;
                    (buffer.data.clone(), *offset)
                }
                None => return Err(GlError::InvalidOperation("enabled array has no data")),
            };
            *view = Some(ArrayView {
                data,
                offset,
                size: array.size,
                ty: array.ty,
                stride: array.stride,
            });
        }
        Ok(resolved)
    }
}
