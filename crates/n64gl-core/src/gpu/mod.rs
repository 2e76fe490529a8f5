//! Encodings handed to the hardware collaborators: RSP commands and
//! rasterizer vertex records.

pub mod commands;
pub mod vertex;
