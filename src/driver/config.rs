//! Configuration types for the SPI-HDDR transport

use crate::internal::constants::{
    DEFAULT_AVAILABLE_BUFFERS, DEFAULT_DUMMY_BYTE, DEFAULT_SPIN_LIMIT,
};

// =============================================================================
// Slave Configuration
// =============================================================================

/// Slave-side transport configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlaveConfig {
    /// Append and verify the trailing XOR checksum byte
    pub crc_enabled: bool,
    /// Buffer count advertised to the master when it announces a write
    pub available_buffers: u16,
    /// Re-arm the opcode receive after this many foreground polls spent
    /// waiting for an opcode with CS asserted. `None` waits forever.
    pub opcode_timeout_polls: Option<u32>,
}

impl Default for SlaveConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SlaveConfig {
    /// Create a new configuration with defaults
    #[must_use]
    pub const fn new() -> Self {
        Self {
            crc_enabled: false,
            available_buffers: DEFAULT_AVAILABLE_BUFFERS,
            opcode_timeout_polls: None,
        }
    }

    // =========================================================================
    // Builder Methods
    // =========================================================================

    /// Enable or disable the trailing checksum byte
    #[must_use]
    pub const fn with_crc(mut self, enabled: bool) -> Self {
        self.crc_enabled = enabled;
        self
    }

    /// Set the advertised available-buffers count
    #[must_use]
    pub const fn with_available_buffers(mut self, count: u16) -> Self {
        self.available_buffers = count;
        self
    }

    /// Set the opcode stall timeout in foreground polls
    #[must_use]
    pub const fn with_opcode_timeout_polls(mut self, polls: Option<u32>) -> Self {
        self.opcode_timeout_polls = polls;
        self
    }

    /// Bytes of framing around each payload
    #[inline(always)]
    pub const fn frame_overhead(&self) -> usize {
        2 + self.crc_len()
    }

    /// Length of the trailing checksum (0 or 1)
    #[inline(always)]
    pub const fn crc_len(&self) -> usize {
        if self.crc_enabled { 1 } else { 0 }
    }
}

// =============================================================================
// Master Configuration
// =============================================================================

/// Master-side transport configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MasterConfig {
    /// Append and verify the trailing XOR checksum byte
    pub crc_enabled: bool,
    /// Iterations to spin on the data-ready line before giving up
    pub spin_limit: u32,
    /// Byte clocked out while only reading
    pub dummy_byte: u8,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl MasterConfig {
    /// Create a new configuration with defaults
    #[must_use]
    pub const fn new() -> Self {
        Self {
            crc_enabled: false,
            spin_limit: DEFAULT_SPIN_LIMIT,
            dummy_byte: DEFAULT_DUMMY_BYTE,
        }
    }

    /// Enable or disable the trailing checksum byte
    #[must_use]
    pub const fn with_crc(mut self, enabled: bool) -> Self {
        self.crc_enabled = enabled;
        self
    }

    /// Set the data-ready busy-wait bound
    #[must_use]
    pub const fn with_spin_limit(mut self, limit: u32) -> Self {
        self.spin_limit = limit;
        self
    }

    /// Set the filler byte clocked during reads
    #[must_use]
    pub const fn with_dummy_byte(mut self, byte: u8) -> Self {
        self.dummy_byte = byte;
        self
    }
}

// =============================================================================
// States and Modes
// =============================================================================

/// Slave protocol state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SlaveState {
    /// Waiting for CS, nothing to announce
    #[default]
    Idle,
    /// Waiting for CS, data-ready raised to announce an outgoing message
    ReadRequestedInIdle,
    /// CS asserted, waiting for the opcode byte
    CsReceivedOpcodeExpected,
    /// Master is writing to the slave
    MasterTransmission,
    /// Master is reading from the slave
    MasterReception,
}

impl SlaveState {
    /// Whether no transaction is in progress
    #[inline(always)]
    pub const fn is_idle(self) -> bool {
        matches!(self, SlaveState::Idle | SlaveState::ReadRequestedInIdle)
    }
}

/// Master protocol state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MasterState {
    /// No transaction in progress
    #[default]
    Idle,
    /// Reading a frame from the slave
    Receiving,
    /// Writing a frame to the slave
    Transmitting,
}

/// Foreground verdict after a main-loop iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerMode {
    /// Transport has work in flight; stay awake
    KeepPowered,
    /// Transport is quiescent
    GotoSleep,
}

/// System sleep modes the power manager may request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SleepMode {
    /// CPU running
    Active,
    /// CPU halted, clocks running
    Idle,
    /// Extended sleep, RAM retained
    ExtendedSleep,
    /// Deep sleep
    DeepSleep,
}

// =============================================================================
// Unit Tests
// =============================================================================
