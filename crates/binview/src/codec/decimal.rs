//! 128-bit fixed-point decimal value
//!
//! A 96-bit unsigned magnitude, a sign and a power-of-ten scale (0-28).
//! The 16-byte wire layout is four little-endian `u32` words in the order
//! `flags, hi, lo, mid`, where `flags` carries the scale in bits 16-23 and
//! the sign in bit 31.

use crate::error::{BinViewError, BinViewResult};
use binrw::{BinRead, BinWrite};
use std::fmt;

const SCALE_SHIFT: u32 = 16;
const SCALE_MASK: u32 = 0x00FF_0000;
const SIGN_MASK: u32 = 0x8000_0000;
const FLAGS_RESERVED: u32 = !(SCALE_MASK | SIGN_MASK);

/// Largest supported scale
pub const MAX_SCALE: u8 = 28;

/// Largest representable magnitude (2^96 - 1)
const MAX_MAGNITUDE: u128 = (1u128 << 96) - 1;

/// Fixed-point decimal stored in 16 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, BinRead, BinWrite)]
#[brw(little)]
pub struct Decimal128 {
    #[br(assert(flags & FLAGS_RESERVED == 0 && (flags & SCALE_MASK) >> SCALE_SHIFT <= u32::from(MAX_SCALE), "invalid decimal flags 0x{:08X}", flags))]
    flags: u32,
    hi: u32,
    lo: u32,
    mid: u32,
}

impl Decimal128 {
    /// Zero with scale 0
    pub const ZERO: Self = Self {
        flags: 0,
        hi: 0,
        lo: 0,
        mid: 0,
    };

    /// Largest value (2^96 - 1)
    pub const MAX: Self = Self {
        flags: 0,
        hi: u32::MAX,
        lo: u32::MAX,
        mid: u32::MAX,
    };

    /// Smallest value (-(2^96 - 1))
    pub const MIN: Self = Self {
        flags: SIGN_MASK,
        hi: u32::MAX,
        lo: u32::MAX,
        mid: u32::MAX,
    };

    /// Build from a signed mantissa and a scale, value = mantissa / 10^scale
    pub fn new(mantissa: i128, scale: u8) -> BinViewResult<Self> {
        if scale > MAX_SCALE {
            return Err(BinViewError::corrupt(format!(
                "decimal scale {scale} exceeds {MAX_SCALE}"
            )));
        }
        let magnitude = mantissa.unsigned_abs();
        if magnitude > MAX_MAGNITUDE {
            return Err(BinViewError::corrupt(format!(
                "decimal mantissa {mantissa} exceeds 96 bits"
            )));
        }
        let mut flags = u32::from(scale) << SCALE_SHIFT;
        if mantissa < 0 {
            flags |= SIGN_MASK;
        }
        Ok(Self {
            flags,
            hi: (magnitude >> 64) as u32,
            lo: magnitude as u32,
            mid: (magnitude >> 32) as u32,
        })
    }

    /// Unsigned 96-bit magnitude
    pub fn magnitude(&self) -> u128 {
        (u128::from(self.hi) << 64) | (u128::from(self.mid) << 32) | u128::from(self.lo)
    }

    /// Signed mantissa
    pub fn mantissa(&self) -> i128 {
        let magnitude = self.magnitude() as i128;
        if self.is_negative() {
            -magnitude
        } else {
            magnitude
        }
    }

    /// Power-of-ten divisor exponent
    pub fn scale(&self) -> u8 {
        ((self.flags & SCALE_MASK) >> SCALE_SHIFT) as u8
    }

    /// Whether the sign bit is set
    pub fn is_negative(&self) -> bool {
        self.flags & SIGN_MASK != 0
    }
}

impl Default for Decimal128 {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Decimal128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.magnitude().to_string();
        let scale = usize::from(self.scale());
        let sign = if self.is_negative() { "-" } else { "" };
        if scale == 0 {
            return write!(f, "{sign}{digits}");
        }
        let padded = format!("{digits:0>width$}", width = scale + 1);
        let (whole, fraction) = padded.split_at(padded.len() - scale);
        write!(f, "{sign}{whole}.{fraction}")
    }
}
