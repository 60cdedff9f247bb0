//! Synchronization and Concurrency Support
//!
//! This module provides synchronization primitives and concurrency-safe wrappers
//! for the slave driver. It includes:
//!
//! - **Primitives** (`primitives`): Low-level synchronization types
//!   - [`CriticalSectionCell`] - ISR-safe interior mutability
//!
//! - **Shared Wrappers** (`shared`): ISR-safe slave wrapper
//!   - [`SharedSlave`] - Critical-section protected slave with ISR trampolines
//!
//! # Feature Flags
//!
//! - `critical-section`: Enables this module
//!
//! # Example
//!
//! ```ignore
//! use ph_spi_hddr::sync::SharedSlave;
//!
//! static SLAVE: SharedSlave<Da14531Spi, GpioPin> = SharedSlave::new();
//!
//! fn main() {
//!     SLAVE.install(SpiHddrSlave::new(spi, dready, SlaveConfig::new()));
//!     SLAVE.with(|slave| slave.init());
//!
//!     loop {
//!         SLAVE.on_system_powered(&mut app).ok();
//!     }
//! }
//!
//! #[interrupt]
//! fn SPI_DMA_RX() {
//!     SLAVE.on_rx_dma_complete().ok();
//! }
//! ```

mod primitives;

pub use primitives::CriticalSectionCell;

mod shared;

pub use shared::SharedSlave;
