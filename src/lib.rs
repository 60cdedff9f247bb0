//! SPI-HDDR Transport
//!
//! A `no_std`, `no_alloc` Rust implementation of the SPI-HDDR transport: a
//! half-duplex, data-ready driven SPI link between a BLE SoC acting as SPI
//! slave and an external host acting as SPI master.
//!
//! Every transaction starts with the master asserting CS and clocking a
//! single opcode byte. `0x9E` announces a master write; the slave answers
//! with its available-buffers count and captures the frame. `0x61` requests
//! a master read; the slave answers with a two-byte big-endian length, the
//! payload and, when enabled, a trailing XOR checksum. The slave raises its
//! data-ready line to ask for service.
//!
//! # Architecture
//!
//! The crate is organized into these layers:
//!
//! 1. **Transport** ([`driver`]): slave state machine, consumer interface,
//!    flow control, and the blocking master
//! 2. **HAL** ([`hal`]): the DMA-backed SPI slave capability the platform
//!    implements
//! 3. **Kernel** ([`kernel`]): message envelope, GTL framing and a state-aware
//!    task dispatcher
//! 4. **Services** ([`hci`], [`profile`]): vendor command dispatch and the
//!    CGMS profile task
//!
//! # Features
//!
//! - `defmt`: Enable defmt logging and formatting for protocol types
//! - `log`: Route log statements through the `log` facade
//! - `critical-section`: Enable the ISR-safe `SharedSlave` wrapper
//!
//! # Example
//!
//! ```ignore
//! use ph_spi_hddr::{PowerMode, SlaveConfig, SpiHddrSlave, SpiHddrSlaveDefault};
//!
//! let config = SlaveConfig::new().with_crc(true);
//! let mut slave: SpiHddrSlaveDefault<_, _> = SpiHddrSlave::new(spi, dready, config);
//! slave.init()?;
//!
//! // CS edge and DMA interrupts call slave.on_cs_asserted() etc.
//!
//! loop {
//!     if slave.on_system_powered(&mut app)? == PowerMode::GotoSleep {
//!         let mode = slave.validate_sleep(SleepMode::ExtendedSleep);
//!         sleep(mode);
//!     }
//! }
//! ```
//!
//! # Memory Requirements
//!
//! With the default sizes (512 byte incoming buffer, 263 byte frames, four
//! outgoing slots) a slave needs a little over 2 KB of RAM.

#![no_std]
#![deny(missing_docs)]
#![allow(unsafe_code)]
#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::correctness)]
#![warn(
    clippy::suspicious,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::cloned_instead_of_copied,
    clippy::explicit_iter_loop,
    clippy::implicit_clone,
    clippy::inconsistent_struct_constructor,
    clippy::manual_assert,
    clippy::manual_let_else,
    clippy::match_same_arms,
    clippy::needless_pass_by_value,
    clippy::semicolon_if_nothing_returned,
    clippy::uninlined_format_args,
    clippy::unnested_or_patterns,
    clippy::std_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::alloc_instead_of_core
)]
#![allow(
    clippy::mod_module_files,
    clippy::self_named_module_files,
    clippy::similar_names,
    clippy::too_many_arguments,
    clippy::struct_excessive_bools,
    clippy::fn_params_excessive_bools,
    clippy::type_complexity,
    clippy::must_use_candidate,
    clippy::assertions_on_constants,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_lossless,
    clippy::panic_in_result_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::module_name_repetitions,
    clippy::wildcard_imports,
    clippy::items_after_statements,
    clippy::let_underscore_future
)]

// =============================================================================
// Modules
// =============================================================================

// Logging macros, declared first so every module sees them
mod fmt;

pub mod driver;
pub mod hal;
pub mod hci;
pub mod kernel;
pub mod profile;

// Internal implementation details (pub(crate) only)
mod internal;

#[cfg(feature = "critical-section")]
#[cfg_attr(docsrs, doc(cfg(feature = "critical-section")))]
pub mod sync;

// Test utilities (only available during testing)
#[cfg(test)]
pub mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use driver::config::{
    MasterConfig, MasterState, PowerMode, SleepMode, SlaveConfig, SlaveState,
};
pub use driver::diagnostics::{MasterDiagnostics, SlaveDiagnostics};
pub use driver::error::{
    ConfigError, ConfigResult, Error, IoError, IoResult, ProtocolError, ProtocolResult, Result,
    UsageError,
};
pub use driver::interface::{ReadStatus, TransportClient};
pub use driver::master::{
    MasterEvent, MessageType, SpiHddrMaster, SpiHddrMasterDefault, SpiHddrMasterSmall,
};
pub use driver::slave::{
    SpiHddrSlave, SpiHddrSlaveDefault, SpiHddrSlaveLarge, SpiHddrSlaveSmall,
};
pub use hal::SlaveTransport;
pub use internal::crc::XorCrc;
pub use kernel::{KernelMessage, MessageSink, MsgStatus, OwnedMessage};

// Re-export sync types when critical-section is enabled
#[cfg(feature = "critical-section")]
pub use sync::{CriticalSectionCell, SharedSlave};

/// Shared transport constants.
///
/// These are grouped into a dedicated module to keep the top-level facade
/// focused on driver types.
pub mod constants {
    pub use crate::internal::constants::{
        // Sizes
        DEFAULT_AVAILABLE_BUFFERS,
        DEFAULT_FRAME_LEN,
        DEFAULT_MASTER_QUEUE_LEN,
        DEFAULT_RX_BUFFER_LEN,
        DEFAULT_TX_SLOTS,
        EVENT_QUEUE_LEN,
        // Framing
        FRAME_CRC_LEN,
        FRAME_HEADER_LEN,
        FRAME_OVERHEAD,
        GTL_HEADER_LEN,
        GTL_KE_MSG_TYPE,
        HCI_ACL_MSG_TYPE,
        HCI_CMD_MSG_TYPE,
        HCI_EVT_HEADER_LEN,
        HCI_EVT_MSG_TYPE,
        // Opcodes
        OPCODE_MASTER_RX,
        OPCODE_MASTER_TX,
        // Timing
        DEFAULT_DUMMY_BYTE,
        DEFAULT_SPIN_LIMIT,
    };
}

// =============================================================================
// Macro Helpers
// =============================================================================

/// Declare a static, ISR-safe slave slot.
///
/// Expands to an empty `SharedSlave` static; install the slave once its
/// peripherals are available.
///
/// # Examples
///
/// ```ignore
/// ph_spi_hddr::spi_hddr_static!(SLAVE, Da14531Spi, GpioPin);
///
/// SLAVE.install(SpiHddrSlave::new(spi, dready, SlaveConfig::new()));
/// SLAVE.with(|slave| slave.init());
/// ```
#[cfg(feature = "critical-section")]
#[macro_export]
macro_rules! spi_hddr_static {
    ($name:ident, $transport:ty, $dready:ty) => {
        static $name: $crate::sync::SharedSlave<$transport, $dready> =
            $crate::sync::SharedSlave::new();
    };
    ($name:ident, $transport:ty, $dready:ty, $rx:expr, $frame:expr, $slots:expr) => {
        static $name: $crate::sync::SharedSlave<$transport, $dready, $rx, $frame, $slots> =
            $crate::sync::SharedSlave::new();
    };
}
