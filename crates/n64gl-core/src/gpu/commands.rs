//! RSP pipeline command encoding.
//!
//! A command is a byte stream whose first byte is the command id, padded with
//! zeroes to whole big-endian 32-bit words before it is appended to the
//! [`CommandQueue`].

use n64gl_hal::CommandQueue;

/// Bytes of one vertex record in RSP DMEM.
pub const PRIM_VTX_SIZE: u16 = 45;
/// Largest encoded command, in bytes.
pub const MAX_COMMAND_BYTES: usize = 128;
const MAX_COMMAND_WORDS: usize = MAX_COMMAND_BYTES / 4;

/// Server-state offsets of the current attribute values.
pub const SERVER_COLOR_OFFSET: u16 = 0x00;
pub const SERVER_TEX_COORDS_OFFSET: u16 = 0x08;
pub const SERVER_NORMAL_OFFSET: u16 = 0x10;
pub const SERVER_MTX_INDEX_OFFSET: u16 = 0x14;

/// `SetFlags` bits.
pub const FLAG_LIGHTING: u32 = 1 << 0;
pub const FLAG_FOG: u32 = 1 << 1;
pub const FLAG_NORMALIZE: u32 = 1 << 2;
pub const FLAG_COLOR_MATERIAL: u32 = 1 << 3;
pub const FLAG_TEXTURE_ACTIVE: u32 = 1 << 4;
pub const FLAG_CULL_FRONT: u32 = 1 << 5;
pub const FLAG_CULL_BACK: u32 = 1 << 6;
pub const FLAG_FRONT_CW: u32 = 1 << 7;
pub const FLAG_DEPTH_TEST: u32 = 1 << 8;
pub const FLAG_MATRIX_PALETTE: u32 = 1 << 9;
pub const FLAG_TEXTURE_BILINEAR: u32 = 1 << 10;
/// Texture generation enable for S, T, R and Q occupies four bits from here.
pub const FLAG_TEX_GEN_SHIFT: u32 = 11;

/// `MatrixLoad` targets. Palette entries add their index to the base.
pub const MATRIX_TARGET_MVP: u8 = 0x00;
pub const MATRIX_TARGET_MODELVIEW: u8 = 0x01;
pub const MATRIX_TARGET_TEXTURE: u8 = 0x02;
pub const MATRIX_TARGET_PALETTE_MVP: u8 = 0x10;
pub const MATRIX_TARGET_PALETTE_MODELVIEW: u8 = 0x20;

/// Commands understood by the vertex pipeline microcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum GlpCommand {
    /// Reset per-draw microcode state (vertex cache, primitive assembly).
    InitPipe = 0x00,
    /// Describe which attributes follow in each `SetPrimVtx`.
    SetVtxLoader = 0x01,
    /// Byte size of each `SetPrimVtx` command.
    SetVtxCmdSize = 0x02,
    /// Draw a triangle from three vertex records.
    DrawTri = 0x03,
    /// Load, transform and light one vertex into a DMEM record.
    SetPrimVtx = 0x04,
    SetByte = 0x05,
    SetWord = 0x06,
    SetLong = 0x07,
    /// Load a s15.16 matrix into a transform target.
    MatrixLoad = 0x08,
    SetViewport = 0x09,
    SetFlags = 0x0A,
    SetFog = 0x0B,
    SetLight = 0x0C,
    SetMaterial = 0x0D,
}

impl GlpCommand {
    pub fn from_id(id: u8) -> Option<Self> {
        Some(match id {
            0x00 => GlpCommand::InitPipe,
            0x01 => GlpCommand::SetVtxLoader,
            0x02 => GlpCommand::SetVtxCmdSize,
            0x03 => GlpCommand::DrawTri,
            0x04 => GlpCommand::SetPrimVtx,
            0x05 => GlpCommand::SetByte,
            0x06 => GlpCommand::SetWord,
            0x07 => GlpCommand::SetLong,
            0x08 => GlpCommand::MatrixLoad,
            0x09 => GlpCommand::SetViewport,
            0x0A => GlpCommand::SetFlags,
            0x0B => GlpCommand::SetFog,
            0x0C => GlpCommand::SetLight,
            0x0D => GlpCommand::SetMaterial,
            _ => return None,
        })
    }
}

/// Builder for a single command.
#[derive(Clone, Debug)]
pub struct CommandStream {
    bytes: heapless::Vec<u8, MAX_COMMAND_BYTES>,
}

impl CommandStream {
    pub fn new(cmd: GlpCommand) -> Self {
        let mut stream = Self {
            bytes: heapless::Vec::new(),
        };
        stream.put_byte(cmd as u8);
        stream
    }

    pub fn put_byte(&mut self, value: u8) {
        if self.bytes.push(value).is_err() {
            panic!("RSP command exceeds {MAX_COMMAND_BYTES} bytes");
        }
    }

    pub fn put_half(&mut self, value: u16) {
        for b in value.to_be_bytes() {
            self.put_byte(b);
        }
    }

    pub fn put_word(&mut self, value: u32) {
        for b in value.to_be_bytes() {
            self.put_byte(b);
        }
    }

    /// Encoded length in bytes, before padding.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Pad to whole words and append to `queue`.
    pub fn submit(self, queue: &mut dyn CommandQueue) {
        let mut words: heapless::Vec<u32, MAX_COMMAND_WORDS> = heapless::Vec::new();
        for chunk in self.bytes.chunks(4) {
            let mut raw = [0u8; 4];
            raw[..chunk.len()].copy_from_slice(chunk);
            // Capacity matches MAX_COMMAND_BYTES, so this cannot fail.
            let _ = words.push(u32::from_be_bytes(raw));
        }
        queue.push(&words);
    }
}
