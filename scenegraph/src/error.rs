//! Error type for the scene-graph codec.

use crate::bytecode::Table;
use crate::hierarchy::JointId;

/// Failure while reading, writing or validating a scene graph.
///
/// Offsets are byte positions of the offending record, relative to the start
/// of the buffer the cursor was created over.
#[derive(Debug, thiserror::Error)]
pub enum SceneGraphError {
    #[error("unexpected end of data at offset {offset:#x} (need {need} bytes, have {have})")]
    UnexpectedEof {
        offset: usize,
        need: usize,
        have: usize,
    },

    #[error("malformed opcode {opcode:#06x} at offset {offset:#x}")]
    MalformedOpcode { offset: usize, opcode: i16 },

    #[error("close at offset {offset:#x} has no open scope")]
    ScopeUnderflow { offset: usize },

    #[error("terminator at offset {offset:#x} reached with {depth} scope(s) still open")]
    UnclosedScopes { offset: usize, depth: usize },

    #[error("{table} index {index} out of range (table has {len} entries){}", fmt_offset(.offset))]
    DanglingIndex {
        offset: Option<usize>,
        table: Table,
        index: i32,
        len: usize,
    },

    #[error(
        "joint {joint} at offset {offset:#x} linked under joint {new_parent} but already belongs to joint {parent}"
    )]
    JointReparented {
        offset: usize,
        joint: JointId,
        parent: JointId,
        new_parent: JointId,
    },

    #[error("joint {joint} at offset {offset:#x} is linked under itself")]
    SelfParent { offset: usize, joint: JointId },

    #[error("missing root joint: {reason}")]
    MissingRoot { reason: &'static str },

    #[error("no joint carries id {id}")]
    UnknownJoint { id: JointId },

    #[error("joint {id} is reached more than once from the root")]
    JointRevisited { id: JointId },

    #[error("joint {id} is not reachable from the root")]
    Unreachable { id: JointId },

    #[error("joint {joint} is listed as a child of joint {expected} but records parent {parent:?}")]
    ParentMismatch {
        joint: JointId,
        parent: Option<JointId>,
        expected: JointId,
    },

    #[error("joint id {id} is used by more than one joint")]
    DuplicateJoint { id: JointId },

    #[error("{table} index {value} does not fit a 16-bit record")]
    IndexOverflow { table: Table, value: usize },

    #[error("listing line {line}: {message}")]
    Listing { line: usize, message: String },

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn fmt_offset(offset: &Option<usize>) -> String {
    match offset {
        Some(offset) => format!(" at offset {offset:#x}"),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, SceneGraphError>;
