//! Consumer-facing transport interface.
//!
//! This module extends [`SpiHddrSlave`] with the byte-stream API used by the
//! layer above the transport:
//!
//! - [`read`](SpiHddrSlave::read): request exactly `len` incoming bytes
//! - [`write`](SpiHddrSlave::write): queue one outgoing message (single slot)
//! - [`queue_message`](SpiHddrSlave::queue_message): internal producers that
//!   bypass the single write slot
//!
//! Completions are never reported from interrupt context. Both are delivered
//! through a [`TransportClient`] passed to
//! [`on_system_powered`](SpiHddrSlave::on_system_powered).
//!
//! # Example
//!
//! ```ignore
//! struct Host { pending: bool }
//!
//! impl TransportClient for Host {
//!     fn read_complete(&mut self, data: &[u8]) { /* parse */ }
//!     fn write_complete(&mut self) { self.pending = false; }
//! }
//!
//! slave.read(4)?;               // header
//! slave.on_system_powered(&mut host)?;
//! ```

use embedded_hal::digital::OutputPin;

use super::error::{Error, Result, UsageError};
use super::slave::SpiHddrSlave;
use crate::hal::transport::SlaveTransport;
use crate::internal::rx_buffer::ReadOutcome;
use crate::kernel::{KernelMessage, MessageSink, gtl};

/// Receiver of deferred transport completions
pub trait TransportClient {
    /// A read requested with [`SpiHddrSlave::read`] completed
    fn read_complete(&mut self, data: &[u8]);

    /// A message queued with [`SpiHddrSlave::write`] was sent to the master
    fn write_complete(&mut self);
}

impl<C: TransportClient + ?Sized> TransportClient for &mut C {
    fn read_complete(&mut self, data: &[u8]) {
        C::read_complete(self, data);
    }

    fn write_complete(&mut self) {
        C::write_complete(self);
    }
}

/// Immediate outcome of a read request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReadStatus {
    /// The bytes were available and have been copied; the callback follows
    /// on the next foreground poll
    Ready,
    /// Not enough bytes yet; the request completes on a later poll
    Pending,
}

// =============================================================================
// Interface Implementation
// =============================================================================

impl<T, DR, const RX_LEN: usize, const FRAME_LEN: usize, const TX_SLOTS: usize>
    SpiHddrSlave<T, DR, RX_LEN, FRAME_LEN, TX_SLOTS>
where
    T: SlaveTransport,
    DR: OutputPin,
{
    /// Request exactly `len` incoming bytes.
    ///
    /// Only one read may be outstanding; it stays outstanding until its
    /// `read_complete` callback has been delivered.
    ///
    /// # Errors
    /// * [`UsageError::ReadAlreadyPending`] - previous read not yet delivered
    /// * [`UsageError::InvalidLength`] - `len` is zero or exceeds `RX_LEN`
    pub fn read(&mut self, len: usize) -> Result<ReadStatus> {
        let core = &mut self.core;
        core.ensure_initialized()?;
        if core.pending_read.is_some() || core.rx_done.is_some() {
            return Err(UsageError::ReadAlreadyPending.into());
        }
        if len == 0 || len > RX_LEN {
            return Err(UsageError::InvalidLength.into());
        }

        match core.rx.read(&mut core.read_stage[..len]) {
            ReadOutcome::Complete => {
                core.rx_done = Some(len);
                Ok(ReadStatus::Ready)
            }
            ReadOutcome::Pending => {
                core.pending_read = Some(len);
                trace!("spi-hddr: read {} pending, {} buffered", len, core.rx.available());
                Ok(ReadStatus::Pending)
            }
        }
    }

    /// Whether a read is outstanding
    #[inline(always)]
    pub fn read_pending(&self) -> bool {
        self.core.pending_read.is_some() || self.core.rx_done.is_some()
    }

    /// Queue one message for the master through the single write slot.
    ///
    /// The slot is freed when `write_complete` is delivered, after the
    /// master has read the message.
    ///
    /// # Errors
    /// * [`UsageError::WriteInProgress`] - previous write not yet completed
    /// * [`UsageError::InvalidLength`] - payload larger than a frame
    /// * [`UsageError::QueueFull`] - no free packet slot
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        self.core.ensure_initialized()?;
        if self.core.write_in_flight {
            return Err(UsageError::WriteInProgress.into());
        }
        self.enqueue(data, true)?;
        self.core.write_in_flight = true;
        Ok(())
    }

    /// Whether the write slot is occupied
    #[inline(always)]
    pub fn write_pending(&self) -> bool {
        self.core.write_in_flight
    }

    /// Queue a message for the master without using the write slot.
    ///
    /// No completion is reported for these messages.
    pub fn queue_message(&mut self, data: &[u8]) -> Result<()> {
        self.core.ensure_initialized()?;
        self.enqueue(data, false)
    }

    fn enqueue(&mut self, data: &[u8], from_interface: bool) -> Result<()> {
        if data.len() > self.max_payload() {
            return Err(UsageError::InvalidLength.into());
        }

        let core = &mut self.core;
        let handle = core.pool.alloc(data, from_interface)?;
        if core.outgoing.push_back(handle).is_err() {
            core.pool.release(handle);
            return Err(UsageError::QueueFull.into());
        }
        trace!("spi-hddr: queued {} bytes, {} pending", data.len(), core.outgoing.len());

        self.notify_master_data_is_available()?;
        Ok(())
    }
}

impl<T, DR, const RX_LEN: usize, const FRAME_LEN: usize, const TX_SLOTS: usize> MessageSink
    for SpiHddrSlave<T, DR, RX_LEN, FRAME_LEN, TX_SLOTS>
where
    T: SlaveTransport,
    DR: OutputPin,
{
    /// Forward a kernel message to the master as a GTL frame
    fn send(&mut self, msg: &KernelMessage<'_>) -> Result<()> {
        let mut frame = [0u8; FRAME_LEN];
        let len = gtl::encode(msg, &mut frame).map_err(Error::from)?;
        self.queue_message(&frame[..len])
    }
}
