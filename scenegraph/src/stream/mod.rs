//! Endian-aware binary cursors
//!
//! J3D containers declare their byte order up front (GameCube and Wii files
//! are big-endian), so every read and write goes through the [`Endian`] the
//! cursor was created with rather than a fixed order.
//!
//! The write side is seekable: the encoder inspects and rewinds over records
//! it has already written. See [`ByteWriter::undo_last_command`].

mod reader;
mod writer;

pub use reader::ByteReader;
pub use writer::ByteWriter;

use serde::{Deserialize, Serialize};

/// Byte order of a stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endian {
    /// Big-endian (GameCube / Wii)
    #[default]
    Big,
    /// Little-endian
    Little,
}

impl Endian {
    /// Parse `"big"`/`"be"` or `"little"`/`"le"` (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "big" | "be" => Some(Self::Big),
            "little" | "le" => Some(Self::Little),
            _ => None,
        }
    }
}

impl std::fmt::Display for Endian {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Big => write!(f, "big"),
            Self::Little => write!(f, "little"),
        }
    }
}
