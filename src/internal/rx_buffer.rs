//! Incoming byte buffer with monotonic cursors.
//!
//! Bytes are appended at `write_index` and drained from `read_index`. There
//! is no wraparound: both cursors return to zero only when the buffer has
//! been fully drained, so undrained bytes can never exceed `N`.

use crate::driver::error::{ProtocolError, ProtocolResult};

/// Outcome of a read request against the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReadOutcome {
    /// The requested bytes were copied out
    Complete,
    /// Not enough bytes yet; nothing was consumed
    Pending,
}

/// Fixed-capacity incoming byte buffer.
pub struct RxBuffer<const N: usize> {
    /// Backing storage
    data: [u8; N],
    /// Next byte to be written
    write_index: usize,
    /// Next byte to be read
    read_index: usize,
}

impl<const N: usize> RxBuffer<N> {
    /// Create an empty buffer. Const-compatible.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            data: [0u8; N],
            write_index: 0,
            read_index: 0,
        }
    }

    /// Buffer capacity in bytes
    #[inline(always)]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Unread bytes
    #[inline(always)]
    #[must_use]
    pub const fn available(&self) -> usize {
        self.write_index - self.read_index
    }

    /// Check if every appended byte has been drained
    #[inline(always)]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.write_index == self.read_index
    }

    /// Current write cursor
    #[inline(always)]
    pub const fn write_index(&self) -> usize {
        self.write_index
    }

    /// Current read cursor
    #[inline(always)]
    pub const fn read_index(&self) -> usize {
        self.read_index
    }

    /// Free space left before the buffer must be drained
    #[inline(always)]
    pub const fn free(&self) -> usize {
        N - self.write_index
    }

    /// Append received bytes.
    ///
    /// Fails without storing anything if the bytes do not fit behind the
    /// write cursor.
    pub fn append(&mut self, bytes: &[u8]) -> ProtocolResult<()> {
        if bytes.len() > self.free() {
            return Err(ProtocolError::RxBufferOverflow);
        }
        let end = self.write_index + bytes.len();
        self.data[self.write_index..end].copy_from_slice(bytes);
        self.write_index = end;
        Ok(())
    }

    /// Copy `target.len()` bytes out, or report that they are not all here yet.
    pub fn read(&mut self, target: &mut [u8]) -> ReadOutcome {
        let len = target.len();
        if self.available() < len {
            return ReadOutcome::Pending;
        }
        target.copy_from_slice(&self.data[self.read_index..self.read_index + len]);
        self.read_index += len;
        self.compact();
        ReadOutcome::Complete
    }

    /// Drop all buffered bytes
    pub fn reset(&mut self) {
        self.write_index = 0;
        self.read_index = 0;
    }

    fn compact(&mut self) {
        if self.read_index == self.write_index {
            self.reset();
        }
    }
}

impl<const N: usize> Default for RxBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_cursors<const N: usize>(buf: &RxBuffer<N>) {
        assert!(buf.write_index() >= buf.read_index());
        if buf.write_index() == buf.read_index() {
            assert_eq!(buf.write_index(), 0);
        }
    }

    #[test]
    fn new_buffer_is_empty() {
        let buf: RxBuffer<16> = RxBuffer::new();
        assert!(buf.is_empty());
        assert_eq!(buf.available(), 0);
        assert_eq!(buf.capacity(), 16);
    }

    #[test]
    fn append_then_read_all_resets_cursors() {
        let mut buf: RxBuffer<16> = RxBuffer::new();
        buf.append(&[1, 2, 3, 4]).unwrap();
        assert_eq!(buf.write_index(), 4);

        let mut out = [0u8; 4];
        assert_eq!(buf.read(&mut out), ReadOutcome::Complete);
        assert_eq!(out, [1, 2, 3, 4]);
        assert_eq!(buf.write_index(), 0);
        assert_eq!(buf.read_index(), 0);
    }

    #[test]
    fn partial_read_keeps_remainder() {
        let mut buf: RxBuffer<16> = RxBuffer::new();
        buf.append(&[1, 2, 3, 4, 5]).unwrap();

        let mut out = [0u8; 2];
        assert_eq!(buf.read(&mut out), ReadOutcome::Complete);
        assert_eq!(out, [1, 2]);
        assert_eq!(buf.available(), 3);
        assert_eq!(buf.read_index(), 2);
    }

    #[test]
    fn short_read_is_pending_and_consumes_nothing() {
        let mut buf: RxBuffer<16> = RxBuffer::new();
        buf.append(&[9, 8]).unwrap();

        let mut out = [0u8; 3];
        assert_eq!(buf.read(&mut out), ReadOutcome::Pending);
        assert_eq!(buf.available(), 2);
        assert_eq!(out, [0, 0, 0]);
    }

    #[test]
    fn overflow_is_rejected_without_partial_write() {
        let mut buf: RxBuffer<4> = RxBuffer::new();
        buf.append(&[1, 2, 3]).unwrap();
        assert_eq!(buf.append(&[4, 5]), Err(ProtocolError::RxBufferOverflow));
        assert_eq!(buf.write_index(), 3);
    }

    #[test]
    fn space_is_reclaimed_only_after_full_drain() {
        let mut buf: RxBuffer<4> = RxBuffer::new();
        buf.append(&[1, 2, 3, 4]).unwrap();

        let mut out = [0u8; 3];
        buf.read(&mut out);
        // One byte undrained: the three read bytes are not reusable yet
        assert_eq!(buf.free(), 0);
        assert!(buf.append(&[5]).is_err());

        let mut last = [0u8; 1];
        buf.read(&mut last);
        assert_eq!(buf.free(), 4);
        buf.append(&[5, 6, 7, 8]).unwrap();
    }

    #[test]
    fn cursor_invariant_holds_over_mixed_sequence() {
        let mut buf: RxBuffer<32> = RxBuffer::new();
        let chunks: [&[u8]; 5] = [&[1, 2, 3], &[4], &[5, 6, 7, 8, 9], &[], &[10, 11]];
        let reads = [2usize, 5, 1, 4, 3, 0, 7];

        let mut next_expected = 1u8;
        for (i, chunk) in chunks.iter().enumerate() {
            buf.append(chunk).unwrap();
            assert_cursors(&buf);

            let mut out = [0u8; 8];
            let len = reads[i];
            if buf.read(&mut out[..len]) == ReadOutcome::Complete {
                for &b in &out[..len] {
                    assert_eq!(b, next_expected);
                    next_expected += 1;
                }
            }
            assert_cursors(&buf);
        }
    }

    #[test]
    fn zero_length_read_completes() {
        let mut buf: RxBuffer<8> = RxBuffer::new();
        assert_eq!(buf.read(&mut []), ReadOutcome::Complete);
        assert_cursors(&buf);
    }
}
