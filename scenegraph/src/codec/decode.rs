//! Bytecode → hierarchy

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::bytecode::{ByteCodeCmd, ByteCodeOp, RECORD_SIZE, Table};
use crate::error::{Result, SceneGraphError};
use crate::hierarchy::{Display, Hierarchy, JointId, TableBounds};
use crate::stream::{ByteReader, Endian};

/// Decoder behaviour switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// Reject a terminator reached while scopes are still open.
    /// When false the open scopes are dropped with a warning.
    ///
    /// On by default, which is stricter than the tools that write these
    /// files: they stop at the terminator whatever the nesting depth.
    /// Turn it off to read such streams.
    pub strict_scopes: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            strict_scopes: true,
        }
    }
}

/// Counters gathered while decoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    /// Records read, including the terminator
    pub commands: usize,
    /// Deepest scope nesting seen
    pub max_depth: usize,
    /// Bytes consumed
    pub bytes: usize,
}

/// Stack machine that rebuilds a [`Hierarchy`] from a command stream
#[derive(Debug, Clone)]
pub struct Decoder {
    bounds: TableBounds,
    options: DecodeOptions,
}

enum Step {
    Continue,
    Terminate,
}

/// Registers and stacks of the machine. Lives only for one decode.
#[derive(Default)]
struct State {
    /// Most recent non-bracket command
    last: Option<ByteCodeOp>,
    /// Command kind that opened each live scope
    scopes: SmallVec<[Option<ByteCodeOp>; 16]>,
    /// Joints whose scope is live, innermost last
    joints: SmallVec<[JointId; 16]>,
    joint: JointId,
    material: u16,
}

impl State {
    fn step(
        &mut self,
        cmd: ByteCodeCmd,
        offset: usize,
        bounds: &TableBounds,
        hierarchy: &mut Hierarchy,
    ) -> Result<Step> {
        match cmd.op {
            ByteCodeOp::Terminate => return Ok(Step::Terminate),
            ByteCodeOp::Open => {
                if self.last == Some(ByteCodeOp::Joint) {
                    self.joints.push(self.joint);
                }
                self.scopes.push(self.last);
            }
            ByteCodeOp::Close => {
                let kind = self
                    .scopes
                    .pop()
                    .ok_or(SceneGraphError::ScopeUnderflow { offset })?;
                if kind == Some(ByteCodeOp::Joint) {
                    self.joints.pop();
                }
            }
            ByteCodeOp::Joint => {
                let id = bounds.check(Table::Joint, cmd.idx as i32, Some(offset))?;
                if let Some(&parent) = self.joints.last() {
                    link(hierarchy, parent, id, offset)?;
                }
                self.joint = id;
            }
            ByteCodeOp::Material => {
                self.material = bounds.check(Table::Material, cmd.idx as i32, Some(offset))?;
            }
            ByteCodeOp::Shape => {
                let shape = bounds.check(Table::Shape, cmd.idx as i32, Some(offset))?;
                // No joint or material record yet means index 0, which may not exist
                let joint = bounds.check(Table::Joint, self.joint as i32, Some(offset))?;
                let material = bounds.check(Table::Material, self.material as i32, Some(offset))?;
                if let Some(joint) = hierarchy.joint_mut(joint as usize) {
                    joint.displays.push(Display::new(material, shape));
                }
            }
        }

        if !cmd.op.is_bracket() {
            self.last = Some(cmd.op);
        }
        Ok(Step::Continue)
    }
}

fn link(hierarchy: &mut Hierarchy, parent: JointId, child: JointId, offset: usize) -> Result<()> {
    if parent == child {
        return Err(SceneGraphError::SelfParent {
            offset,
            joint: child,
        });
    }
    // Decoded hierarchies are built with ids equal to positions
    if let Some(existing) = hierarchy.joint(child as usize).and_then(|j| j.parent) {
        return Err(SceneGraphError::JointReparented {
            offset,
            joint: child,
            parent: existing,
            new_parent: parent,
        });
    }
    if let Some(joint) = hierarchy.joint_mut(parent as usize) {
        joint.children.push(child);
    }
    if let Some(joint) = hierarchy.joint_mut(child as usize) {
        joint.parent = Some(parent);
    }
    Ok(())
}

impl Decoder {
    pub fn new(bounds: TableBounds, options: DecodeOptions) -> Self {
        Self { bounds, options }
    }

    pub fn bounds(&self) -> &TableBounds {
        &self.bounds
    }

    /// Decode the program starting at the reader's position.
    ///
    /// On success the reader is left just past the terminator.
    pub fn decode(&self, reader: &mut ByteReader<'_>) -> Result<Hierarchy> {
        self.decode_with_stats(reader).map(|(hierarchy, _)| hierarchy)
    }

    pub fn decode_with_stats(&self, reader: &mut ByteReader<'_>) -> Result<(Hierarchy, DecodeStats)> {
        let start = reader.position();
        let mut hierarchy = Hierarchy::with_joints(self.bounds.joints);
        let mut state = State::default();
        let mut stats = DecodeStats::default();

        loop {
            let offset = reader.position();
            let cmd = ByteCodeCmd::read(reader)?;
            stats.commands += 1;
            tracing::trace!(offset, op = %cmd.op, idx = cmd.idx, "scene graph command");

            match state.step(cmd, offset, &self.bounds, &mut hierarchy)? {
                Step::Continue => {
                    stats.max_depth = stats.max_depth.max(state.scopes.len());
                }
                Step::Terminate => {
                    if !state.scopes.is_empty() {
                        if self.options.strict_scopes {
                            return Err(SceneGraphError::UnclosedScopes {
                                offset,
                                depth: state.scopes.len(),
                            });
                        }
                        tracing::warn!(
                            offset,
                            depth = state.scopes.len(),
                            "scene graph terminated with open scopes"
                        );
                    }
                    break;
                }
            }
        }

        stats.bytes = reader.position() - start;
        debug_assert_eq!(stats.bytes, stats.commands * RECORD_SIZE);
        tracing::debug!(
            commands = stats.commands,
            max_depth = stats.max_depth,
            joints = hierarchy.len(),
            "decoded scene graph"
        );
        Ok((hierarchy, stats))
    }
}

/// Decode a scene graph from the start of `data` with default options.
pub fn decode(data: &[u8], endian: Endian, bounds: TableBounds) -> Result<Hierarchy> {
    let mut reader = ByteReader::new(data, endian);
    Decoder::new(bounds, DecodeOptions::default()).decode(&mut reader)
}
