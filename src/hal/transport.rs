//! SPI slave transfer capability.
//!
//! Models the SPI block plus its DMA channels as an asynchronous byte
//! transfer engine. The driver starts transfers; completion is reported back
//! by the platform's interrupt handlers:
//!
//! | Hardware event           | Driver entry point                  |
//! |--------------------------|-------------------------------------|
//! | CS falling edge          | `SpiHddrSlave::on_cs_asserted`      |
//! | CS rising edge           | `SpiHddrSlave::on_cs_deasserted`    |
//! | RX DMA count reached     | `SpiHddrSlave::on_rx_dma_complete`  |
//!
//! Only a receive started with [`SlaveTransport::start_rx`] raises the RX
//! DMA completion. Transfers started with
//! [`SlaveTransport::start_transfer`] run until the master releases CS.
//!
//! # Example
//!
//! ```ignore
//! struct Da14531Spi { /* SPI + two DMA channels */ }
//!
//! impl SlaveTransport for Da14531Spi {
//!     fn start_rx(&mut self, len: usize) {
//!         self.rx_dma.start(&mut RX_STAGE[..len]);
//!     }
//!     fn start_transfer(&mut self, tx: &[u8], rx_capacity: usize) {
//!         TX_STAGE[..tx.len()].copy_from_slice(tx);
//!         self.tx_dma.start(&TX_STAGE[..tx.len()]);
//!         self.rx_dma.start(&mut RX_STAGE[..rx_capacity]);
//!     }
//!     fn finish(&mut self, buf: &mut [u8]) -> usize {
//!         let n = self.rx_dma.stop().min(buf.len());
//!         self.tx_dma.stop();
//!         buf[..n].copy_from_slice(&RX_STAGE[..n]);
//!         n
//!     }
//!     fn cs_asserted(&self) -> bool {
//!         self.cs_pin.is_low()
//!     }
//! }
//! ```

/// DMA-backed SPI slave
pub trait SlaveTransport {
    /// Arm a receive of exactly `len` bytes.
    ///
    /// When the count is reached the platform must call the driver's RX DMA
    /// completion entry point.
    fn start_rx(&mut self, len: usize);

    /// Start a full-duplex transfer.
    ///
    /// `tx` is clocked out to the master (zeros once it runs out) while up
    /// to `rx_capacity` bytes from the master are captured. The transfer
    /// keeps running until [`finish`](Self::finish) is called.
    fn start_transfer(&mut self, tx: &[u8], rx_capacity: usize);

    /// Stop whatever is in flight and copy the captured bytes into `buf`.
    ///
    /// Returns the number of bytes captured since the last start, truncated
    /// to `buf.len()`.
    fn finish(&mut self, buf: &mut [u8]) -> usize;

    /// Current level of the chip-select line
    fn cs_asserted(&self) -> bool;
}

impl<T: SlaveTransport + ?Sized> SlaveTransport for &mut T {
    fn start_rx(&mut self, len: usize) {
        T::start_rx(self, len);
    }

    fn start_transfer(&mut self, tx: &[u8], rx_capacity: usize) {
        T::start_transfer(self, tx, rx_capacity);
    }

    fn finish(&mut self, buf: &mut [u8]) -> usize {
        T::finish(self, buf)
    }

    fn cs_asserted(&self) -> bool {
        T::cs_asserted(self)
    }
}
