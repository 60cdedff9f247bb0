//! Error types for the SPI-HDDR transport
//!
//! Errors are organized by domain for better diagnostics:
//! - [`ConfigError`]: Configuration and table setup failures
//! - [`ProtocolError`]: Wire protocol violations (fatal for the slave)
//! - [`UsageError`]: Caller contract violations
//! - [`IoError`]: Pin, bus and timing failures
//!
//! The unified [`Error`] enum wraps all domain errors and is returned
//! by most driver methods.
//!
//! Checksum mismatches are deliberately absent: they are counted in the
//! driver diagnostics and never abort a transaction.

// =============================================================================
// Configuration Errors
// =============================================================================

/// Configuration and setup errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Invalid configuration parameter
    InvalidConfig,
    /// A fixed-size table cannot hold the requested entries
    TableCapacityExceeded,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ConfigError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConfigError::InvalidConfig => "invalid configuration",
            ConfigError::TableCapacityExceeded => "table capacity exceeded",
        }
    }
}

// =============================================================================
// Protocol Errors
// =============================================================================

/// Wire protocol violations
///
/// On the slave these are unrecoverable: the protocol has no byte
/// resynchronisation, so the application is expected to halt or call
/// `reset()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProtocolError {
    /// Opcode other than TX (0x9E) or RX (0x61) while awaiting one
    UnknownOpcode,
    /// Incoming ring buffer capacity exceeded
    RxBufferOverflow,
    /// Deferred event queue is full
    EventQueueOverflow,
    /// Frame shorter than its mandatory header
    FrameTooShort,
    /// Frame length disagrees with the length encoded in its header
    FrameLengthMismatch,
    /// Frame carries a message-type tag other than the one expected
    UnexpectedMessageType,
}

impl core::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ProtocolError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ProtocolError::UnknownOpcode => "unknown opcode",
            ProtocolError::RxBufferOverflow => "rx buffer overflow",
            ProtocolError::EventQueueOverflow => "event queue overflow",
            ProtocolError::FrameTooShort => "frame too short",
            ProtocolError::FrameLengthMismatch => "frame length mismatch",
            ProtocolError::UnexpectedMessageType => "unexpected message type",
        }
    }
}

// =============================================================================
// Usage Errors
// =============================================================================

/// Caller contract violations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UsageError {
    /// Driver used before `init()`
    NotInitialized,
    /// Write issued while the previous write has not completed
    WriteInProgress,
    /// Read issued while another read is pending
    ReadAlreadyPending,
    /// Requested length is zero or exceeds the buffer capacity
    InvalidLength,
    /// No free outgoing packet slot
    QueueFull,
}

impl core::fmt::Display for UsageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl UsageError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            UsageError::NotInitialized => "driver not initialized",
            UsageError::WriteInProgress => "write already in progress",
            UsageError::ReadAlreadyPending => "read already pending",
            UsageError::InvalidLength => "invalid length",
            UsageError::QueueFull => "outgoing queue full",
        }
    }
}

// =============================================================================
// I/O Errors
// =============================================================================

/// Pin, bus and timing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IoError {
    /// Busy-wait on the data-ready line timed out
    Timeout,
    /// GPIO access failed
    Pin,
    /// SPI bus transfer failed
    Bus,
    /// Slave advertised zero available buffers
    NoBuffersAvailable,
    /// Operation not valid in the current state
    InvalidState,
}

impl core::fmt::Display for IoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl IoError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            IoError::Timeout => "operation timed out",
            IoError::Pin => "pin access failed",
            IoError::Bus => "bus transfer failed",
            IoError::NoBuffersAvailable => "no buffers available",
            IoError::InvalidState => "invalid state for operation",
        }
    }
}

// =============================================================================
// Unified Error Type
// =============================================================================

/// This enum wraps all domain-specific errors for unified error handling.
///
/// ```ignore
/// match slave.on_rx_dma_complete() {
///     Err(e) if e.is_fatal() => halt(),
///     Err(Error::Usage(UsageError::NotInitialized)) => { /* ... */ }
///     _ => {}
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Configuration error
    Config(ConfigError),
    /// Protocol error
    Protocol(ProtocolError),
    /// Usage error
    Usage(UsageError),
    /// I/O error
    Io(IoError),
}

impl Error {
    /// Whether the error leaves the transport unusable until reset
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Protocol(
                ProtocolError::UnknownOpcode
                    | ProtocolError::RxBufferOverflow
                    | ProtocolError::EventQueueOverflow
            )
        )
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Config(e) => write!(f, "config: {}", e.as_str()),
            Error::Protocol(e) => write!(f, "protocol: {}", e.as_str()),
            Error::Usage(e) => write!(f, "usage: {}", e.as_str()),
            Error::Io(e) => write!(f, "io: {}", e.as_str()),
        }
    }
}

// From impls for automatic conversion
impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Error::Protocol(e)
    }
}

impl From<UsageError> for Error {
    fn from(e: UsageError) -> Self {
        Error::Usage(e)
    }
}

impl From<IoError> for Error {
    fn from(e: IoError) -> Self {
        Error::Io(e)
    }
}

/// Result type alias for transport operations
pub type Result<T> = core::result::Result<T, Error>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = core::result::Result<T, ConfigError>;

/// Result type alias for protocol-level operations
pub type ProtocolResult<T> = core::result::Result<T, ProtocolError>;

/// Result type alias for I/O operations
pub type IoResult<T> = core::result::Result<T, IoError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    extern crate std;
    use std::format;

    use super::*;

    #[test]
    fn protocol_error_as_str_non_empty() {
        let variants = [
            ProtocolError::UnknownOpcode,
            ProtocolError::RxBufferOverflow,
            ProtocolError::EventQueueOverflow,
            ProtocolError::FrameTooShort,
            ProtocolError::FrameLengthMismatch,
            ProtocolError::UnexpectedMessageType,
        ];

        for variant in variants {
            assert!(!variant.as_str().is_empty(), "{variant:?} has empty string");
        }
    }

    #[test]
    fn usage_error_display() {
        let display = format!("{}", UsageError::ReadAlreadyPending);
        assert_eq!(display, "read already pending");
    }

    #[test]
    fn io_error_display() {
        assert_eq!(format!("{}", IoError::Timeout), "operation timed out");
    }

    #[test]
    fn error_from_domain_errors() {
        assert_eq!(
            Error::from(ConfigError::InvalidConfig),
            Error::Config(ConfigError::InvalidConfig)
        );
        assert_eq!(
            Error::from(ProtocolError::UnknownOpcode),
            Error::Protocol(ProtocolError::UnknownOpcode)
        );
        assert_eq!(
            Error::from(UsageError::QueueFull),
            Error::Usage(UsageError::QueueFull)
        );
        assert_eq!(Error::from(IoError::Bus), Error::Io(IoError::Bus));
    }

    #[test]
    fn error_display_prefixes_domain() {
        let display = format!("{}", Error::Protocol(ProtocolError::RxBufferOverflow));
        assert!(display.contains("protocol"));
        assert!(display.contains("overflow"));

        let display = format!("{}", Error::Usage(UsageError::WriteInProgress));
        assert!(display.contains("usage"));
    }

    #[test]
    fn fatal_errors() {
        assert!(Error::from(ProtocolError::UnknownOpcode).is_fatal());
        assert!(Error::from(ProtocolError::RxBufferOverflow).is_fatal());
        assert!(Error::from(ProtocolError::EventQueueOverflow).is_fatal());
        assert!(!Error::from(ProtocolError::FrameTooShort).is_fatal());
        assert!(!Error::from(UsageError::ReadAlreadyPending).is_fatal());
        assert!(!Error::from(IoError::Timeout).is_fatal());
    }
}
