//! Core driver components for the SPI-HDDR transport.
//!
//! This module contains both protocol roles and their shared building blocks:
//!
//! - [`config`] - Configuration types, states and power modes
//! - [`error`] - Error types and result aliases
//! - [`event`] - Deferred event queue with a re-entrancy guard
//! - [`diagnostics`] - Per-role error and traffic counters
//! - [`slave`] - The slave state machine
//! - [`interface`] - Consumer read/write API of the slave
//! - [`flow`] - Foreground poll, flow control and sleep hooks of the slave
//! - [`master`] - The blocking master
//!
//! # Example
//!
//! ```ignore
//! use ph_spi_hddr::driver::{SlaveConfig, SpiHddrSlaveDefault, SpiHddrSlave};
//!
//! let config = SlaveConfig::new()
//!     .with_crc(true)
//!     .with_available_buffers(2);
//! let mut slave: SpiHddrSlaveDefault<_, _> = SpiHddrSlave::new(spi, dready, config);
//! slave.init()?;
//! ```

// Submodules
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod event;
pub mod flow;
pub mod interface;
pub mod master;
pub mod slave;


// Re-exports for convenience
pub use config::{MasterConfig, MasterState, PowerMode, SleepMode, SlaveConfig, SlaveState};
pub use diagnostics::{MasterDiagnostics, SlaveDiagnostics};
pub use error::{
    ConfigError, ConfigResult, Error, IoError, IoResult, ProtocolError, ProtocolResult, Result,
    UsageError,
};
pub use event::{Event, EventHandler, EventQueue};
pub use interface::{ReadStatus, TransportClient};
pub use master::{
    MasterEvent, MessageType, SpiHddrMaster, SpiHddrMasterDefault, SpiHddrMasterSmall,
};
pub use slave::{SpiHddrSlave, SpiHddrSlaveDefault, SpiHddrSlaveLarge, SpiHddrSlaveSmall};
