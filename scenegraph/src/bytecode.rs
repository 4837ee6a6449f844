//! Scene-graph opcode vocabulary
//!
//! # Layout
//! ```text
//! 0x00: opcode i16
//! 0x02: index  i16
//! ```
//!
//! Records are read until a `Terminate`. `Open`/`Close` bracket the scope
//! introduced by the preceding `Joint`, `Material` or `Shape` record.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SceneGraphError};
use crate::stream::{ByteReader, ByteWriter};

/// Size of one command record in bytes
pub const RECORD_SIZE: usize = 4;

/// Scene-graph opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i16)]
pub enum ByteCodeOp {
    Terminate = 0x00,
    Open = 0x01,
    Close = 0x02,

    Joint = 0x10,
    Material = 0x11,
    Shape = 0x12,
}

impl ByteCodeOp {
    pub fn from_i16(v: i16) -> Option<Self> {
        match v {
            0x00 => Some(Self::Terminate),
            0x01 => Some(Self::Open),
            0x02 => Some(Self::Close),
            0x10 => Some(Self::Joint),
            0x11 => Some(Self::Material),
            0x12 => Some(Self::Shape),
            _ => None,
        }
    }

    pub fn as_i16(self) -> i16 {
        self as i16
    }

    /// Mnemonic used in listings
    pub fn name(self) -> &'static str {
        match self {
            Self::Terminate => "TERMINATE",
            Self::Open => "OPEN",
            Self::Close => "CLOSE",
            Self::Joint => "JOINT",
            Self::Material => "MATERIAL",
            Self::Shape => "SHAPE",
        }
    }

    /// Inverse of [`ByteCodeOp::name`] (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        [
            Self::Terminate,
            Self::Open,
            Self::Close,
            Self::Joint,
            Self::Material,
            Self::Shape,
        ]
        .into_iter()
        .find(|op| op.name().eq_ignore_ascii_case(name))
    }

    /// `Open` and `Close` only shape scopes; they never become the scope kind.
    pub fn is_bracket(self) -> bool {
        matches!(self, Self::Open | Self::Close)
    }

    /// Whether the index field refers to a table entry
    pub fn table(self) -> Option<Table> {
        match self {
            Self::Joint => Some(Table::Joint),
            Self::Material => Some(Table::Material),
            Self::Shape => Some(Table::Shape),
            _ => None,
        }
    }
}

impl std::fmt::Display for ByteCodeOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Table referenced by a command's index field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Table {
    Joint,
    Material,
    Shape,
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Joint => write!(f, "joint"),
            Self::Material => write!(f, "material"),
            Self::Shape => write!(f, "shape"),
        }
    }
}

/// One command record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteCodeCmd {
    pub op: ByteCodeOp,
    pub idx: i16,
}

impl ByteCodeCmd {
    pub const fn new(op: ByteCodeOp, idx: i16) -> Self {
        Self { op, idx }
    }

    pub const fn open() -> Self {
        Self::new(ByteCodeOp::Open, 0)
    }

    pub const fn close() -> Self {
        Self::new(ByteCodeOp::Close, 0)
    }

    pub const fn terminate() -> Self {
        Self::new(ByteCodeOp::Terminate, 0)
    }

    /// Read one record, rejecting opcodes outside the vocabulary.
    pub fn read(reader: &mut ByteReader<'_>) -> Result<Self> {
        let offset = reader.position();
        let opcode = reader.read_i16()?;
        let idx = reader.read_i16()?;
        let op = ByteCodeOp::from_i16(opcode)
            .ok_or(SceneGraphError::MalformedOpcode { offset, opcode })?;
        Ok(Self { op, idx })
    }

    pub fn write(&self, writer: &mut ByteWriter) {
        writer.write_i16(self.op.as_i16());
        writer.write_i16(self.idx);
    }
}

impl std::fmt::Display for ByteCodeCmd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.op.table() {
            Some(_) => write!(f, "{} {}", self.op, self.idx),
            None => write!(f, "{}", self.op),
        }
    }
}

/// Read every record up to and including the terminator.
pub fn read_commands(reader: &mut ByteReader<'_>) -> Result<Vec<ByteCodeCmd>> {
    let mut commands = Vec::new();
    loop {
        let cmd = ByteCodeCmd::read(reader)?;
        commands.push(cmd);
        if cmd.op == ByteCodeOp::Terminate {
            return Ok(commands);
        }
    }
}

/// Serialize records verbatim (no terminator is appended).
pub fn write_commands(writer: &mut ByteWriter, commands: &[ByteCodeCmd]) {
    for cmd in commands {
        cmd.write(writer);
    }
}
