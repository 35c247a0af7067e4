#![warn(rust_2018_idioms)]

/// Reading and writing of binary data.
pub mod binary;
pub mod error;
pub mod gpos;
pub mod layout;
pub mod size;
pub mod tag;

pub use crate::gpos::{decode_gpos, decode_gpos_with_options, DecodeOptions, GposTable};
