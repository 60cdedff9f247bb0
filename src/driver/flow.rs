//! Foreground poll, flow control and sleep arbitration.
//!
//! This module extends [`SpiHddrSlave`] with the hooks called from the
//! device main loop and the power manager.
//!
//! # Overview
//!
//! Every main-loop iteration calls
//! [`on_system_powered`](SpiHddrSlave::on_system_powered), which:
//!
//! 1. Drains events posted from interrupt context
//! 2. Abandons a stalled opcode wait (if a timeout is configured)
//! 3. Retries a pending read
//! 4. Delivers read/write completions to the [`TransportClient`]
//! 5. Announces queued outgoing messages on the data-ready line
//!
//! The power manager may only sleep when
//! [`flow_off`](SpiHddrSlave::flow_off) reports the transport quiescent.
//!
//! # Example
//!
//! ```ignore
//! loop {
//!     match slave.on_system_powered(&mut host) {
//!         Ok(PowerMode::GotoSleep) => {
//!             let mode = slave.validate_sleep(SleepMode::ExtendedSleep);
//!             enter(mode);
//!         }
//!         Ok(PowerMode::KeepPowered) => {}
//!         Err(e) if e.is_fatal() => slave.reset()?,
//!         Err(e) => log::warn!("spi-hddr: {}", e),
//!     }
//! }
//! ```

use embedded_hal::digital::OutputPin;

use super::config::{PowerMode, SleepMode, SlaveState};
use super::error::Result;
use super::event::Event;
use super::interface::TransportClient;
use super::slave::SpiHddrSlave;
use crate::hal::transport::SlaveTransport;
use crate::internal::rx_buffer::ReadOutcome;

// =============================================================================
// Flow Control Implementation
// =============================================================================

impl<T, DR, const RX_LEN: usize, const FRAME_LEN: usize, const TX_SLOTS: usize>
    SpiHddrSlave<T, DR, RX_LEN, FRAME_LEN, TX_SLOTS>
where
    T: SlaveTransport,
    DR: OutputPin,
{
    /// Raise data-ready if messages are queued and the bus is idle.
    ///
    /// # Returns
    /// `true` if any outgoing message is queued
    pub fn notify_master_data_is_available(&mut self) -> Result<bool> {
        let pending = !self.core.outgoing.is_empty();
        if pending && self.core.state == SlaveState::Idle {
            self.post(Event::MessageAdded)?;
        }
        Ok(pending)
    }

    /// Check whether the transport is fully quiescent
    ///
    /// True only if no transaction is in progress, no read is pending, every
    /// received byte has been consumed, CS is released and no event waits
    /// for dispatch.
    pub fn flow_off(&self) -> bool {
        let core = &self.core;
        core.state.is_idle()
            && core.pending_read.is_none()
            && core.rx.is_empty()
            && !core.transport.cs_asserted()
            && self.events.is_empty()
    }

    /// Resume flow. The protocol has no receive gating, so this does nothing.
    #[inline(always)]
    pub fn flow_on(&mut self) {}

    /// Veto a requested sleep mode while work is pending
    ///
    /// # Returns
    /// `mode` if the transport can sleep, [`SleepMode::Active`] otherwise
    pub fn validate_sleep(&self, mode: SleepMode) -> SleepMode {
        let core = &self.core;
        let busy = !self.flow_off()
            || !core.outgoing.is_empty()
            || core.rx_done.is_some()
            || core.tx_done_pending;
        if busy { SleepMode::Active } else { mode }
    }

    /// Main-loop hook
    ///
    /// Completion callbacks run here, never in interrupt context.
    ///
    /// # Returns
    /// [`PowerMode::KeepPowered`] while any message is queued or the
    /// transport is not quiescent
    pub fn on_system_powered<C: TransportClient>(&mut self, client: &mut C) -> Result<PowerMode> {
        self.core.ensure_initialized()?;

        {
            let Self { events, core } = self;
            events.drain(core)?;
        }

        self.core.check_opcode_timeout()?;
        self.retry_pending_read();

        let core = &mut self.core;
        if let Some(len) = core.rx_done.take() {
            client.read_complete(&core.read_stage[..len]);
        }
        if core.tx_done_pending {
            core.tx_done_pending = false;
            core.write_in_flight = false;
            client.write_complete();
        }

        let queued = self.notify_master_data_is_available()?;
        if queued || !self.flow_off() {
            Ok(PowerMode::KeepPowered)
        } else {
            Ok(PowerMode::GotoSleep)
        }
    }

    fn retry_pending_read(&mut self) {
        let core = &mut self.core;
        let Some(len) = core.pending_read else {
            return;
        };
        if core.rx.read(&mut core.read_stage[..len]) == ReadOutcome::Complete {
            core.pending_read = None;
            core.rx_done = Some(len);
            trace!("spi-hddr: pending read of {} completed", len);
        }
    }
}
