//! Running XOR checksum used on both directions of the wire.
//!
//! The accumulator is seeded with the opcode and the two header bytes, then
//! folds in every payload byte. The trailing checksum byte itself is never
//! folded in.

/// XOR accumulator over a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct XorCrc(u8);

impl XorCrc {
    /// Start a checksum for a frame introduced by `opcode`.
    #[inline(always)]
    pub const fn seeded(opcode: u8) -> Self {
        Self(opcode)
    }

    /// Fold one byte into the accumulator
    #[inline(always)]
    pub fn push(&mut self, byte: u8) {
        self.0 ^= byte;
    }

    /// Fold a slice into the accumulator
    #[inline]
    pub fn extend(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b;
        }
    }

    /// Current checksum value
    #[inline(always)]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Compute the checksum of a whole frame in one go.
    pub fn of(opcode: u8, header: [u8; 2], payload: &[u8]) -> u8 {
        let mut crc = Self::seeded(opcode);
        crc.extend(&header);
        crc.extend(payload);
        crc.value()
    }
}
