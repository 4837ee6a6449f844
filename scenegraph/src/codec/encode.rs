//! Hierarchy → bytecode
//!
//! Joints are written depth-first from the root. Draw calls are grouped: a
//! material or shape command is emitted only when it differs from the previous
//! display of the same joint, and each one opens a scope that stays open until
//! the joint's subtree is done.
//!
//! When a subtree finishes and the last record written is an `Open`, that
//! record is taken back and one fewer `Close` is written. The scope it would
//! have opened is empty, so the decoded structure is unchanged. Streams
//! taken from existing models re-encode byte for byte.

use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;

use crate::bytecode::{ByteCodeCmd, ByteCodeOp, Table};
use crate::error::{Result, SceneGraphError};
use crate::hierarchy::{Display, Hierarchy, JointId, TableBounds};
use crate::stream::{ByteWriter, Endian};

/// Counters gathered while encoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeStats {
    /// Records in the output, including the terminator
    pub commands: usize,
    /// `Open`/`Close` pairs removed
    pub elided: usize,
    /// Bytes written
    pub bytes: usize,
}

/// Depth-first writer for a validated [`Hierarchy`]
pub struct Encoder<'a> {
    hierarchy: &'a Hierarchy,
    bounds: TableBounds,
    positions: HashMap<JointId, usize>,
}

/// Output state for one encode
struct Walk<'w> {
    writer: &'w mut ByteWriter,
    depth: u32,
    visited: HashSet<JointId>,
    stats: EncodeStats,
}

impl Walk<'_> {
    fn emit(&mut self, cmd: ByteCodeCmd) {
        tracing::trace!(op = %cmd.op, idx = cmd.idx, "scene graph command");
        cmd.write(self.writer);
        self.stats.commands += 1;
    }

    /// Close everything a finished joint opened, taking back a trailing `Open`
    fn close_scopes(&mut self, joint: JointId, start_depth: u32) -> Result<()> {
        if self.depth == start_depth {
            return Ok(());
        }
        if self.writer.peek_last_command().map(|cmd| cmd.op) == Some(ByteCodeOp::Open) {
            self.writer.undo_last_command()?;
            self.stats.commands -= 1;
            self.stats.elided += 1;
            self.depth -= 1;
            tracing::trace!(joint, "elided trailing open");
        }
        for _ in start_depth..self.depth {
            self.emit(ByteCodeCmd::close());
        }
        self.depth = start_depth;
        Ok(())
    }

    /// Emit `cmd` followed by the `Open` of its scope
    fn emit_scoped(&mut self, cmd: ByteCodeCmd) {
        self.emit(cmd);
        self.emit(ByteCodeCmd::open());
        self.depth += 1;
    }
}

/// A joint whose subtree is being written
struct Frame {
    pos: usize,
    /// Scope depth before the joint's own `Open`
    start_depth: u32,
    next_child: usize,
}

impl<'a> Encoder<'a> {
    /// Prepare to encode `hierarchy`.
    ///
    /// Fails if joint 0 is missing or has a parent, or if two joints share an id.
    pub fn new(hierarchy: &'a Hierarchy, bounds: TableBounds) -> Result<Self> {
        let root = hierarchy.joint(0).ok_or(SceneGraphError::MissingRoot {
            reason: "hierarchy has no joints",
        })?;
        if root.parent.is_some() {
            return Err(SceneGraphError::MissingRoot {
                reason: "joint 0 has a parent",
            });
        }
        Ok(Self {
            hierarchy,
            bounds,
            positions: hierarchy.id_map()?,
        })
    }

    /// Encode into a fresh buffer.
    pub fn encode(&self, endian: Endian) -> Result<Vec<u8>> {
        let mut writer = ByteWriter::new(endian);
        self.encode_into(&mut writer)?;
        Ok(writer.into_bytes())
    }

    /// Encode at the writer's position, returning after the terminator.
    pub fn encode_into(&self, writer: &mut ByteWriter) -> Result<EncodeStats> {
        let start = writer.position();
        let mut walk = Walk {
            writer,
            depth: 0,
            visited: HashSet::with_capacity(self.hierarchy.len()),
            stats: EncodeStats::default(),
        };

        let mut stack: SmallVec<[Frame; 16]> = SmallVec::new();
        stack.push(self.enter_joint(&mut walk, 0)?);
        while let Some(frame) = stack.last_mut() {
            let joint = &self.hierarchy.joints()[frame.pos];
            match joint.children.get(frame.next_child) {
                Some(&child) => {
                    frame.next_child += 1;
                    let child_pos = *self
                        .positions
                        .get(&child)
                        .ok_or(SceneGraphError::UnknownJoint { id: child })?;
                    let entered = self.enter_joint(&mut walk, child_pos)?;
                    stack.push(entered);
                }
                None => {
                    let start_depth = frame.start_depth;
                    stack.pop();
                    walk.close_scopes(joint.id, start_depth)?;
                }
            }
        }
        walk.emit(ByteCodeCmd::terminate());

        let mut stats = walk.stats;
        stats.bytes = walk.writer.position() - start;
        tracing::debug!(
            commands = stats.commands,
            elided = stats.elided,
            bytes = stats.bytes,
            "encoded scene graph"
        );
        Ok(stats)
    }

    /// Write a joint and its draw calls, leaving their scopes open
    fn enter_joint(&self, walk: &mut Walk<'_>, pos: usize) -> Result<Frame> {
        let joint = &self.hierarchy.joints()[pos];
        if !walk.visited.insert(joint.id) {
            return Err(SceneGraphError::JointRevisited { id: joint.id });
        }
        let start_depth = walk.depth;

        walk.emit_scoped(ByteCodeCmd::new(
            ByteCodeOp::Joint,
            self.index(Table::Joint, pos)?,
        ));

        let mut last: Option<Display> = None;
        for display in &joint.displays {
            if last.map(|l| l.material) != Some(display.material) {
                walk.emit_scoped(ByteCodeCmd::new(
                    ByteCodeOp::Material,
                    self.index(Table::Material, display.material as usize)?,
                ));
            }
            if last.map(|l| l.shape) != Some(display.shape) {
                walk.emit_scoped(ByteCodeCmd::new(
                    ByteCodeOp::Shape,
                    self.index(Table::Shape, display.shape as usize)?,
                ));
            }
            last = Some(*display);
        }

        Ok(Frame {
            pos,
            start_depth,
            next_child: 0,
        })
    }

    /// Bounds-check a table index and narrow it to the record's field width
    fn index(&self, table: Table, value: usize) -> Result<i16> {
        let len = self.bounds.len(table);
        if value >= len {
            return Err(SceneGraphError::DanglingIndex {
                offset: None,
                table,
                index: i32::try_from(value).unwrap_or(i32::MAX),
                len,
            });
        }
        i16::try_from(value).map_err(|_| SceneGraphError::IndexOverflow { table, value })
    }
}

/// Encode `hierarchy` into a fresh buffer.
pub fn encode(hierarchy: &Hierarchy, bounds: TableBounds, endian: Endian) -> Result<Vec<u8>> {
    Encoder::new(hierarchy, bounds)?.encode(endian)
}
