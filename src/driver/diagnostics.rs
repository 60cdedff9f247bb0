//! Diagnostic counters for both transport roles.
//!
//! Soft failures (checksum mismatches, runt frames, aborted handshakes) never
//! surface as errors. They are counted here and can be inspected by debug
//! tooling.
//!
//! # Example
//!
//! ```ignore
//! let diag = slave.diagnostics();
//! if diag.has_error() {
//!     log::warn!("spi-hddr: {} crc errors", diag.master_tx_crc_errors);
//! }
//! ```

// =============================================================================
// Slave Diagnostics
// =============================================================================

/// Counters kept by the slave driver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlaveDiagnostics {
    /// Master-to-slave frames whose checksum did not match
    pub master_tx_crc_errors: u32,
    /// Master-to-slave frames appended to the incoming buffer
    pub frames_received: u32,
    /// Slave-to-master frames carrying a payload
    pub frames_sent: u32,
    /// Read requests answered with `00 00` because nothing was queued
    pub empty_responses: u32,
    /// Master writes too short to contain the control bytes
    pub runt_frames: u32,
    /// Master writes longer than the largest frame, dropped
    pub oversize_frames: u32,
    /// CS released before an opcode was received
    pub aborted_handshakes: u32,
    /// Opcode waits abandoned after the configured poll count
    pub opcode_timeouts: u32,
    /// Events that made no sense in the current state
    pub spurious_events: u32,
}

impl SlaveDiagnostics {
    /// Check if any soft failure has been counted
    #[inline]
    pub fn has_error(&self) -> bool {
        self.master_tx_crc_errors != 0
            || self.runt_frames != 0
            || self.oversize_frames != 0
            || self.aborted_handshakes != 0
            || self.opcode_timeouts != 0
    }

    /// Zero every counter
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

// =============================================================================
// Master Diagnostics
// =============================================================================

/// Counters kept by the master driver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MasterDiagnostics {
    /// Slave-to-master frames whose checksum did not match
    pub rx_crc_errors: u32,
    /// Frames read from the slave with a non-zero length
    pub frames_received: u32,
    /// Frames written to the slave
    pub frames_sent: u32,
    /// Reads answered with a zero-length frame
    pub empty_frames: u32,
    /// Frames whose inner length disagreed with their header
    pub framing_errors: u32,
    /// Well-formed frames of a type this role does not consume
    pub dropped_frames: u32,
    /// Kernel messages lost because the incoming list was full
    pub queue_overflows: u32,
    /// Data-ready waits that ran out of spins
    pub timeouts: u32,
}

impl MasterDiagnostics {
    /// Check if any failure has been counted
    #[inline]
    pub fn has_error(&self) -> bool {
        self.rx_crc_errors != 0
            || self.framing_errors != 0
            || self.queue_overflows != 0
            || self.timeouts != 0
    }

    /// Zero every counter
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
