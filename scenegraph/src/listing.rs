//! Human-readable listings of command streams
//!
//! A listing has one record per line: an optional hex offset, the mnemonic,
//! and the index for `JOINT`, `MATERIAL` and `SHAPE`. Text after `#` is a
//! comment.
//!
//! ```text
//! 0x0000  JOINT 0
//! 0x0004  OPEN
//! 0x0008    JOINT 1
//! 0x000c  CLOSE
//! 0x0010  TERMINATE
//! ```

use crate::bytecode::{ByteCodeCmd, ByteCodeOp, Table};
use crate::error::{Result, SceneGraphError};
use crate::hierarchy::TableBounds;
use crate::stream::ByteReader;

/// A raw record as found in the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListedCommand {
    pub offset: usize,
    /// Open scopes enclosing the record
    pub depth: usize,
    pub opcode: i16,
    pub index: i16,
}

impl ListedCommand {
    pub fn op(&self) -> Option<ByteCodeOp> {
        ByteCodeOp::from_i16(self.opcode)
    }
}

/// Read records up to and including the terminator.
///
/// Unlike the decoder this does not interpret the records, so unknown opcodes
/// and unbalanced brackets are listed rather than rejected.
pub fn disassemble(reader: &mut ByteReader<'_>) -> Result<Vec<ListedCommand>> {
    let mut listed = Vec::new();
    let mut depth = 0usize;
    loop {
        let offset = reader.position();
        let opcode = reader.read_i16()?;
        let index = reader.read_i16()?;
        let op = ByteCodeOp::from_i16(opcode);

        if op == Some(ByteCodeOp::Close) {
            depth = depth.saturating_sub(1);
        }
        listed.push(ListedCommand {
            offset,
            depth,
            opcode,
            index,
        });
        match op {
            Some(ByteCodeOp::Open) => depth += 1,
            Some(ByteCodeOp::Terminate) => break,
            None => tracing::warn!(offset, opcode, "unknown scene graph opcode"),
            _ => {}
        }
    }
    Ok(listed)
}

/// Smallest tables that every non-negative index in `commands` fits.
pub fn required_bounds(commands: &[ListedCommand]) -> TableBounds {
    let mut bounds = TableBounds::default();
    for cmd in commands {
        let (Some(table), Ok(index)) = (
            cmd.op().and_then(ByteCodeOp::table),
            usize::try_from(cmd.index),
        ) else {
            continue;
        };
        let len = match table {
            Table::Joint => &mut bounds.joints,
            Table::Material => &mut bounds.materials,
            Table::Shape => &mut bounds.shapes,
        };
        *len = (*len).max(index + 1);
        // A shape draws with the current joint and material, which start at 0
        if table == Table::Shape {
            bounds.joints = bounds.joints.max(1);
            bounds.materials = bounds.materials.max(1);
        }
    }
    bounds
}

pub fn render_listing(commands: &[ListedCommand]) -> String {
    let mut out = String::new();
    for cmd in commands {
        let indent = "  ".repeat(cmd.depth);
        let line = match cmd.op() {
            Some(op) if op.table().is_some() => {
                format!("{:#06x}  {indent}{op} {}\n", cmd.offset, cmd.index)
            }
            Some(op) => format!("{:#06x}  {indent}{op}\n", cmd.offset),
            None => format!(
                "{:#06x}  {indent}? {:#06x} {}\n",
                cmd.offset, cmd.opcode, cmd.index
            ),
        };
        out.push_str(&line);
    }
    out
}

/// Parse a listing back into records.
///
/// Lines holding unknown opcodes (`?`) are rejected.
pub fn parse_listing(text: &str) -> Result<Vec<ByteCodeCmd>> {
    let mut commands = Vec::new();
    for (n, raw) in text.lines().enumerate() {
        let line_no = n + 1;
        let err = |message: String| SceneGraphError::Listing {
            line: line_no,
            message,
        };

        let line = raw.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }

        let mut tokens = line.split_whitespace().peekable();
        if tokens
            .peek()
            .is_some_and(|t| t.starts_with("0x") || t.starts_with("0X"))
        {
            tokens.next();
        }

        let name = tokens
            .next()
            .ok_or_else(|| err("missing mnemonic".to_string()))?;
        let op = ByteCodeOp::from_name(name)
            .ok_or_else(|| err(format!("unknown mnemonic `{name}`")))?;

        let idx = match tokens.next() {
            Some(token) => {
                parse_index(token).ok_or_else(|| err(format!("invalid index `{token}`")))?
            }
            None if op.table().is_some() => return Err(err(format!("{op} needs an index"))),
            None => 0,
        };
        if let Some(extra) = tokens.next() {
            return Err(err(format!("unexpected `{extra}`")));
        }

        commands.push(ByteCodeCmd::new(op, idx));
    }
    Ok(commands)
}

fn parse_index(token: &str) -> Option<i16> {
    match token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
    {
        Some(hex) => u16::from_str_radix(hex, 16).ok().map(|v| v as i16),
        None => token.parse().ok(),
    }
}
