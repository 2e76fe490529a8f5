//! Primitive assembly.
//!
//! Accumulates cache slot indices and emits points, lines or triangles
//! according to the draw mode, carrying vertices over between primitives for
//! the strip, fan and loop topologies.

use crate::error::GlError;

/// Draw mode of a `begin`/`end` block or array draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrimitiveMode {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
    Quads,
    QuadStrip,
    Polygon,
}

impl PrimitiveMode {
    /// Vertices per emitted primitive.
    pub const fn prim_size(self) -> usize {
        match self {
            PrimitiveMode::Points => 1,
            PrimitiveMode::Lines | PrimitiveMode::LineLoop | PrimitiveMode::LineStrip => 2,
            _ => 3,
        }
    }

    /// Decode a GL primitive enum value.
    pub fn from_gl(mode: u32) -> Result<Self, GlError> {
        Ok(match mode {
            0x0000 => PrimitiveMode::Points,
            0x0001 => PrimitiveMode::Lines,
            0x0002 => PrimitiveMode::LineLoop,
            0x0003 => PrimitiveMode::LineStrip,
            0x0004 => PrimitiveMode::Triangles,
            0x0005 => PrimitiveMode::TriangleStrip,
            0x0006 => PrimitiveMode::TriangleFan,
            0x0007 => PrimitiveMode::Quads,
            0x0008 => PrimitiveMode::QuadStrip,
            0x0009 => PrimitiveMode::Polygon,
            _ => return Err(GlError::InvalidEnum("not a primitive mode")),
        })
    }
}

/// Continuation rule applied after a primitive is emitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Continuation {
    /// Nothing carried over.
    Independent,
    LineStrip,
    TriangleStrip,
    TriangleFan,
    Quads,
}

/// A complete primitive: 1, 2 or 3 cache slot indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Primitive {
    indices: [u8; 3],
    len: u8,
}

impl Primitive {
    pub fn new(indices: &[u8]) -> Self {
        assert!(
            (1..=3).contains(&indices.len()),
            "primitive must have 1 to 3 vertices"
        );
        let mut prim = Self {
            indices: [0; 3],
            len: indices.len() as u8,
        };
        prim.indices[..indices.len()].copy_from_slice(indices);
        prim
    }

    pub fn indices(&self) -> &[u8] {
        &self.indices[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Primitive assembly state machine.
#[derive(Clone, Debug)]
pub struct PrimitiveAssembler {
    mode: PrimitiveMode,
    continuation: Continuation,
    prim_size: u8,
    indices: [u8; 3],
    progress: u8,
    counter: u8,
    lock_next_vertex: bool,
    locked_vertex: Option<u8>,
    vertex_count: u32,
    next_id: u32,
}

/// First identity handed out for immediate-mode vertices. Keeps them apart
/// from element indices used by array draws.
pub const IMMEDIATE_ID_BASE: u32 = 0x8000_0000;

impl Default for PrimitiveAssembler {
    fn default() -> Self {
        Self::new(PrimitiveMode::Points)
    }
}

impl PrimitiveAssembler {
    pub fn new(mode: PrimitiveMode) -> Self {
        let mut assembler = Self {
            mode,
            continuation: Continuation::Independent,
            prim_size: 1,
            indices: [0; 3],
            progress: 0,
            counter: 0,
            lock_next_vertex: false,
            locked_vertex: None,
            vertex_count: 0,
            next_id: IMMEDIATE_ID_BASE,
        };
        assembler.init(mode);
        assembler
    }

    /// Start a new block in `mode`.
    pub fn init(&mut self, mode: PrimitiveMode) {
        self.mode = mode;
        self.prim_size = mode.prim_size() as u8;
        self.continuation = match mode {
            PrimitiveMode::Points | PrimitiveMode::Lines | PrimitiveMode::Triangles => {
                Continuation::Independent
            }
            PrimitiveMode::LineStrip | PrimitiveMode::LineLoop => Continuation::LineStrip,
            PrimitiveMode::TriangleStrip | PrimitiveMode::QuadStrip => {
                Continuation::TriangleStrip
            }
            PrimitiveMode::TriangleFan | PrimitiveMode::Polygon => Continuation::TriangleFan,
            PrimitiveMode::Quads => Continuation::Quads,
        };
        self.lock_next_vertex = matches!(
            mode,
            PrimitiveMode::LineLoop | PrimitiveMode::TriangleFan | PrimitiveMode::Polygon
        );
        self.indices = [0; 3];
        self.progress = 0;
        self.counter = 0;
        self.locked_vertex = None;
        self.vertex_count = 0;
        self.next_id = IMMEDIATE_ID_BASE;
    }

    pub fn mode(&self) -> PrimitiveMode {
        self.mode
    }

    pub fn prim_size(&self) -> usize {
        self.prim_size as usize
    }

    /// Next internal identity for an immediate-mode vertex.
    pub fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        id
    }

    /// Whether the next vertex must be pinned in the cache. Consumes the
    /// request.
    pub fn take_lock_request(&mut self) -> bool {
        core::mem::take(&mut self.lock_next_vertex)
    }

    /// Record the slot pinned for the first vertex of a loop or fan.
    pub fn set_locked_vertex(&mut self, slot: u8) {
        self.locked_vertex = Some(slot);
    }

    /// Feed one vertex. Returns a primitive when one is complete.
    pub fn submit(&mut self, slot: u8) -> Option<Primitive> {
        assert!(
            self.progress < self.prim_size,
            "primitive assembly queue overflow"
        );
        self.indices[self.progress as usize] = slot;
        self.progress += 1;
        self.vertex_count += 1;

        if self.progress < self.prim_size {
            return None;
        }

        let prim = Primitive::new(&self.indices[..self.prim_size as usize]);
        self.progress = self.advance();
        Some(prim)
    }

    /// Apply the continuation rule and return the new progress.
    fn advance(&mut self) -> u8 {
        match self.continuation {
            Continuation::Independent => 0,
            Continuation::LineStrip => {
                self.indices[0] = self.indices[1];
                1
            }
            Continuation::TriangleStrip => {
                self.indices[self.counter as usize] = self.indices[2];
                self.counter ^= 1;
                2
            }
            Continuation::TriangleFan => {
                self.indices[1] = self.indices[2];
                2
            }
            Continuation::Quads => {
                self.indices[1] = self.indices[2];
                self.counter ^= 1;
                self.counter << 1
            }
        }
    }

    /// Closing edge of a line loop, emitted at `end`. `None` for other modes
    /// or when fewer than two vertices were submitted.
    pub fn closing_edge(&mut self) -> Option<Primitive> {
        if self.mode != PrimitiveMode::LineLoop || self.vertex_count < 2 {
            return None;
        }
        let first = self.locked_vertex?;
        self.indices[0] = self.indices[1];
        self.indices[1] = first;
        Some(Primitive::new(&self.indices[..2]))
    }
}
