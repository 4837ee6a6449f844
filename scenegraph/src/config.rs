//! TOML configuration for decoding and encoding
//!
//! ```toml
//! endian = "big"
//! offset = 0x40
//!
//! [tables]
//! joints = 12
//! materials = 3
//! shapes = 5
//!
//! [decode]
//! strict_scopes = true
//! ```
//!
//! Every key is optional.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::codec::{DecodeOptions, Decoder};
use crate::error::Result;
use crate::hierarchy::TableBounds;
use crate::stream::Endian;

/// Where the scene graph lives in a buffer and what its indices may reference
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneGraphConfig {
    /// Byte order of the command records
    pub endian: Endian,
    /// Byte offset of the first record
    pub offset: usize,
    pub tables: TableBounds,
    pub decode: DecodeOptions,
}

impl SceneGraphConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), ?config, "loaded scene graph config");
        Ok(config)
    }

    pub fn decoder(&self) -> Decoder {
        Decoder::new(self.tables, self.decode)
    }
}
