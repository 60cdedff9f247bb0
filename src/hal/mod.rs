//! Hardware Abstraction Layer
//!
//! The transport never touches registers. Platform code supplies the
//! capabilities below and forwards its interrupts to the driver.
//!
//! # Modules
//!
//! - [`transport`]: DMA-backed SPI slave capability trait
//!
//! # Pins
//!
//! The data-ready output is any [`embedded_hal::digital::OutputPin`]. The
//! master role uses [`embedded_hal::spi::SpiBus`] with a CS
//! [`OutputPin`](embedded_hal::digital::OutputPin) and a data-ready
//! [`InputPin`](embedded_hal::digital::InputPin).

pub mod transport;

// Re-export commonly used types
pub use transport::SlaveTransport;
