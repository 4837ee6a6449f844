//! Conversion between command streams and [`Hierarchy`](crate::Hierarchy)

mod decode;
mod encode;


pub use decode::{DecodeOptions, DecodeStats, Decoder, decode};
pub use encode::{EncodeStats, Encoder, encode};
