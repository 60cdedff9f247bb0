//! ISR-safe slave wrapper using critical sections.
//!
//! The slave is driven from three interrupt handlers and the main loop.
//! [`SharedSlave`] puts it behind a [`CriticalSectionCell`] so all of them
//! can reach it through a `static`.

use embedded_hal::digital::OutputPin;

use super::primitives::CriticalSectionCell;
use crate::driver::config::PowerMode;
use crate::driver::error::{Result, UsageError};
use crate::driver::interface::TransportClient;
use crate::driver::slave::SpiHddrSlave;
use crate::hal::transport::SlaveTransport;
use crate::internal::constants::{DEFAULT_FRAME_LEN, DEFAULT_RX_BUFFER_LEN, DEFAULT_TX_SLOTS};

/// ISR-safe slave wrapper using critical sections.
///
/// Starts empty so it can live in a `static`; the application installs the
/// slave once its peripherals exist. All access goes through
/// `critical_section::with()`, disabling interrupts for the duration of the
/// closure.
///
/// # Example
///
/// ```ignore
/// static SLAVE: SharedSlave<Da14531Spi, GpioPin> = SharedSlave::new();
///
/// SLAVE.install(SpiHddrSlave::new(spi, dready, SlaveConfig::new()));
/// SLAVE.with(|slave| slave.init()).unwrap()?;
///
/// #[interrupt]
/// fn SPI_CS() {
///     if cs_is_low() {
///         SLAVE.on_cs_asserted().ok();
///     } else {
///         SLAVE.on_cs_deasserted().ok();
///     }
/// }
/// ```
pub struct SharedSlave<
    T,
    DR,
    const RX_LEN: usize = DEFAULT_RX_BUFFER_LEN,
    const FRAME_LEN: usize = DEFAULT_FRAME_LEN,
    const TX_SLOTS: usize = DEFAULT_TX_SLOTS,
> {
    inner: CriticalSectionCell<Option<SpiHddrSlave<T, DR, RX_LEN, FRAME_LEN, TX_SLOTS>>>,
}

impl<T, DR, const RX_LEN: usize, const FRAME_LEN: usize, const TX_SLOTS: usize>
    SharedSlave<T, DR, RX_LEN, FRAME_LEN, TX_SLOTS>
where
    T: SlaveTransport,
    DR: OutputPin,
{
    /// Create an empty wrapper (const, suitable for static initialization).
    pub const fn new() -> Self {
        Self {
            inner: CriticalSectionCell::new(None),
        }
    }

    /// Install the slave, returning any previously installed one.
    pub fn install(
        &self,
        slave: SpiHddrSlave<T, DR, RX_LEN, FRAME_LEN, TX_SLOTS>,
    ) -> Option<SpiHddrSlave<T, DR, RX_LEN, FRAME_LEN, TX_SLOTS>> {
        self.inner.replace(Some(slave))
    }

    /// Remove the slave
    pub fn take(&self) -> Option<SpiHddrSlave<T, DR, RX_LEN, FRAME_LEN, TX_SLOTS>> {
        self.inner.replace(None)
    }

    /// Execute a closure with exclusive access to the slave.
    ///
    /// Returns `None` if no slave is installed.
    #[inline]
    pub fn with<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut SpiHddrSlave<T, DR, RX_LEN, FRAME_LEN, TX_SLOTS>) -> R,
    {
        self.inner.with(|slot| slot.as_mut().map(f))
    }

    /// Try to execute a closure, returning `None` if already borrowed or empty.
    #[inline]
    pub fn try_with<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut SpiHddrSlave<T, DR, RX_LEN, FRAME_LEN, TX_SLOTS>) -> R,
    {
        self.inner.try_with(|slot| slot.as_mut().map(f)).flatten()
    }

    fn call<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut SpiHddrSlave<T, DR, RX_LEN, FRAME_LEN, TX_SLOTS>) -> Result<()>,
    {
        self.with(f).unwrap_or(Err(UsageError::NotInitialized.into()))
    }

    // =========================================================================
    // ISR Trampolines
    // =========================================================================

    /// Forward a CS falling edge
    #[inline]
    pub fn on_cs_asserted(&self) -> Result<()> {
        self.call(|slave| slave.on_cs_asserted())
    }

    /// Forward a CS rising edge
    #[inline]
    pub fn on_cs_deasserted(&self) -> Result<()> {
        self.call(|slave| slave.on_cs_deasserted())
    }

    /// Forward an RX DMA completion
    #[inline]
    pub fn on_rx_dma_complete(&self) -> Result<()> {
        self.call(|slave| slave.on_rx_dma_complete())
    }

    /// Run the foreground poll inside a critical section
    pub fn on_system_powered<C: TransportClient>(&self, client: &mut C) -> Result<PowerMode> {
        self.with(|slave| slave.on_system_powered(client))
            .unwrap_or(Err(UsageError::NotInitialized.into()))
    }
}

impl<T, DR, const RX_LEN: usize, const FRAME_LEN: usize, const TX_SLOTS: usize> Default
    for SharedSlave<T, DR, RX_LEN, FRAME_LEN, TX_SLOTS>
where
    T: SlaveTransport,
    DR: OutputPin,
{
    fn default() -> Self {
        Self::new()
    }
}
