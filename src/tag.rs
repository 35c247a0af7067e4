//! OpenType tags used by the layout tables.
//!
//! Tags are stored as big-endian `u32` values, so `b"kern"` is `0x6B65726E`.

use crate::error::DecodeError;
use std::fmt;

/// Generate a 4-byte OpenType tag from a byte string
macro_rules! tag {
    ($w:expr) => {
        tag(*$w)
    };
}

/// Wrapper that formats a tag as its four characters, or as hex if it is not printable.
#[derive(PartialEq, Eq, Clone, Copy)]
pub struct DisplayTag(pub u32);

const fn tag(chars: [u8; 4]) -> u32 {
    u32::from_be_bytes(chars)
}

/// Convert a string of up to four ASCII characters to a tag, padding with spaces.
///
/// ```
/// use gpos_tables::tag;
///
/// assert_eq!(tag::from_string("kern"), Ok(tag::KERN));
/// assert_eq!(tag::from_string("DFLT"), Ok(tag::DFLT));
/// assert_eq!(tag::from_string("ab"), Ok(0x61622020));
/// ```
pub fn from_string(s: &str) -> Result<u32, DecodeError> {
    if s.len() > 4 {
        return Err(DecodeError::BadValue);
    }

    let mut tag: u32 = 0;
    let mut count = 0;

    for c in s.chars() {
        if !c.is_ascii() || c.is_ascii_control() {
            return Err(DecodeError::BadValue);
        }

        tag = (tag << 8) | (c as u32);
        count += 1;
    }

    while count < 4 {
        tag = (tag << 8) | (' ' as u32);
        count += 1;
    }

    Ok(tag)
}

impl fmt::Display for DisplayTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.0.to_be_bytes();
        if bytes.iter().all(|b| b.is_ascii() && !b.is_ascii_control()) {
            let s: String = bytes.iter().map(|&b| char::from(b)).collect();
            s.fmt(f)
        } else {
            write!(f, "0x{:08x}", self.0)
        }
    }
}

impl fmt::Debug for DisplayTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_string().fmt(f)
    }
}

pub const GPOS: u32 = tag!(b"GPOS");

// Scripts and languages
pub const ARAB: u32 = tag!(b"arab");
pub const DFLT: u32 = tag!(b"DFLT");
pub const LATN: u32 = tag!(b"latn");
pub const DEU: u32 = tag!(b"DEU ");
pub const TRK: u32 = tag!(b"TRK ");

// Positioning features
pub const ABVM: u32 = tag!(b"abvm");
pub const BLWM: u32 = tag!(b"blwm");
pub const CPSP: u32 = tag!(b"cpsp");
pub const CURS: u32 = tag!(b"curs");
pub const DIST: u32 = tag!(b"dist");
pub const KERN: u32 = tag!(b"kern");
pub const MARK: u32 = tag!(b"mark");
pub const MKMK: u32 = tag!(b"mkmk");
pub const PALT: u32 = tag!(b"palt");
pub const VKRN: u32 = tag!(b"vkrn");
