//! Little-endian integer wrappers for fields inside `#[repr(C, packed)]`-free,
//! naturally-aligned PE/COFF structures.
//!
//! The PE format is defined to be little-endian regardless of host byte
//! order, and its structures are laid out so that every multi-byte field
//! is naturally aligned. Storing fields as these wrapper types instead of
//! plain `u16`/`u32` means a `Pod`-cast struct reads correctly on any host,
//! including big-endian ones, without per-field byte swaps scattered through
//! the decoders.

use std::fmt;

use crate::pod::Pod;

/// A 16-bit little-endian integer.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
#[repr(transparent)]
pub struct U16LE(pub [u8; 2]);

/// A 32-bit little-endian integer.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
#[repr(transparent)]
pub struct U32LE(pub [u8; 4]);

// Safety: both types are `repr(transparent)` over a byte array with no
// invalid bit patterns and no padding.
unsafe impl Pod for U16LE {}
unsafe impl Pod for U32LE {}

impl U16LE {
    #[inline]
    pub fn get(self) -> u16 {
        u16::from_le_bytes(self.0)
    }

    #[inline]
    pub fn new(value: u16) -> Self {
        Self(value.to_le_bytes())
    }
}

impl U32LE {
    #[inline]
    pub fn get(self) -> u32 {
        u32::from_le_bytes(self.0)
    }

    #[inline]
    pub fn new(value: u32) -> Self {
        Self(value.to_le_bytes())
    }
}

impl From<u16> for U16LE {
    fn from(value: u16) -> Self {
        Self::new(value)
    }
}

impl From<u32> for U32LE {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for U16LE {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.get(), f)
    }
}

impl fmt::Debug for U32LE {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.get(), f)
    }
}
