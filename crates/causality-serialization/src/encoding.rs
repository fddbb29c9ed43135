// Wire-level format identifiers
//
// The format header every serialized payload starts with, and the
// compression encodings a context may select.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Compression applied to a serialized payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    Deflate,
    Snappy,
}

impl Encoding {
    /// Single-byte tag used by schemes that record the encoding on the wire
    pub fn tag(self) -> u8 {
        match self {
            Encoding::Deflate => 1,
            Encoding::Snappy => 2,
        }
    }

    /// Reverse of [`Encoding::tag`]
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Encoding::Deflate),
            2 => Some(Encoding::Snappy),
            _ => None,
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::Deflate => write!(f, "DEFLATE"),
            Encoding::Snappy => write!(f, "SNAPPY"),
        }
    }
}

/// Format header at the start of every serialized payload.
///
/// Five prefix bytes followed by a major and a minor version byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SerializationMagic([u8; SerializationMagic::SIZE]);

impl SerializationMagic {
    /// Length of the header in bytes
    pub const SIZE: usize = 7;

    /// Prefix shared by every platform header
    pub const PREFIX: [u8; 5] = *b"cslty";

    /// Default platform format, version 1.0
    pub const AMQP_V1: SerializationMagic = SerializationMagic::versioned(1, 0);

    /// Header with the platform prefix and the given version
    pub const fn versioned(major: u8, minor: u8) -> Self {
        let p = Self::PREFIX;
        Self([p[0], p[1], p[2], p[3], p[4], major, minor])
    }

    /// Wrap raw header bytes
    pub const fn from_bytes(bytes: [u8; Self::SIZE]) -> Self {
        Self(bytes)
    }

    /// Read the header from the start of a payload, if it is long enough
    pub fn peek(payload: &[u8]) -> Option<Self> {
        let head = payload.get(..Self::SIZE)?;
        let mut bytes = [0u8; Self::SIZE];
        bytes.copy_from_slice(head);
        Some(Self(bytes))
    }

    /// Raw header bytes
    pub fn as_bytes(&self) -> &[u8; Self::SIZE] {
        &self.0
    }

    /// Whether the header carries the platform prefix
    pub fn has_platform_prefix(&self) -> bool {
        self.0[..Self::PREFIX.len()] == Self::PREFIX
    }
}

impl fmt::Display for SerializationMagic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_platform_prefix() {
            write!(f, "{}/{}.{}", String::from_utf8_lossy(&Self::PREFIX), self.0[5], self.0[6])
        } else {
            write!(f, "0x{}", hex::encode(self.0))
        }
    }
}
