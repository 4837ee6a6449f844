//! Scene-graph bytecode codec for J3D models
//!
//! BMD/BDL files describe their joint tree as a flat program of 4-byte
//! records. This crate converts between that program and an in-memory
//! [`Hierarchy`] of joints with per-joint draw calls.
//!
//! # Modules
//!
//! - [`stream`] - Endian-aware byte cursors
//! - [`bytecode`] - Opcodes and command records
//! - [`hierarchy`] - Joint tree model
//! - [`codec`] - Decoder and encoder
//! - [`listing`] - Text listings for inspection and hand-written streams
//! - [`config`] - TOML settings for the `j3d` tool

pub mod bytecode;
pub mod codec;
pub mod config;
pub mod error;
pub mod hierarchy;
pub mod listing;
pub mod stream;

pub use bytecode::{ByteCodeCmd, ByteCodeOp, RECORD_SIZE, Table};
pub use codec::{DecodeOptions, DecodeStats, Decoder, EncodeStats, Encoder, decode, encode};
pub use config::SceneGraphConfig;
pub use error::{Result, SceneGraphError};
pub use hierarchy::{Display, Hierarchy, Joint, JointId, TableBounds, canonical_displays};
pub use listing::{ListedCommand, disassemble, parse_listing, render_listing, required_bounds};
pub use stream::{ByteReader, ByteWriter, Endian};
