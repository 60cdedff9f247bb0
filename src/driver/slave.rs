//! SPI-HDDR slave driver.
//!
//! This module contains the main [`SpiHddrSlave`] structure and its protocol
//! state machine:
//!
//! - Initialization, reset and release
//! - Interrupt entry points (CS edges, RX DMA completion)
//! - Opcode handling and frame staging for both transfer directions
//!
//! The consumer-facing read/write API lives in [`interface`](super::interface),
//! the foreground poll and sleep hooks in [`flow`](super::flow).
//!
//! # Transaction sequence
//!
//! ```text
//! master                          slave
//!   CS low  ───────────────────▶  data-ready HIGH, expect opcode
//!   opcode  ───────────────────▶  RX DMA complete
//!     0x9E: ◀── avail lo, hi ──   data-ready LOW, capture payload
//!           ─── payload, crc ──▶
//!     0x61: ◀── len hi, lo, payload, crc ── data-ready LOW
//!   CS high ───────────────────▶  strip/verify/append, re-arm opcode
//! ```

use embedded_hal::digital::OutputPin;
use heapless::Deque;

use super::config::{SlaveConfig, SlaveState};
use super::diagnostics::SlaveDiagnostics;
use super::error::{ConfigError, Error, IoError, ProtocolError, Result, UsageError};
use super::event::{Event, EventHandler, EventQueue};
use crate::hal::transport::SlaveTransport;
use crate::internal::constants::{
    DEFAULT_FRAME_LEN, DEFAULT_RX_BUFFER_LEN, DEFAULT_TX_SLOTS, EVENT_QUEUE_LEN, FRAME_HEADER_LEN,
    FRAME_OVERHEAD, OPCODE_MASTER_RX, OPCODE_MASTER_TX,
};
use crate::internal::crc::XorCrc;
use crate::internal::packet_pool::{PacketHandle, PacketPool};
use crate::internal::rx_buffer::RxBuffer;

// =============================================================================
// Protocol Core
// =============================================================================

/// Everything the state machine touches.
///
/// Kept apart from the event queue so a handler can post follow-up events
/// while it holds `&mut self`.
pub(super) struct SlaveCore<T, DR, const RX_LEN: usize, const FRAME_LEN: usize, const TX_SLOTS: usize>
{
    pub(super) transport: T,
    pub(super) dready: DR,
    pub(super) config: SlaveConfig,
    pub(super) state: SlaveState,
    pub(super) initialized: bool,

    /// Incoming bytes waiting for the consumer
    pub(super) rx: RxBuffer<RX_LEN>,
    /// Outgoing packet storage
    pub(super) pool: PacketPool<TX_SLOTS, FRAME_LEN>,
    /// Outgoing FIFO of pool handles
    pub(super) outgoing: Deque<PacketHandle, TX_SLOTS>,

    /// Opcode landing byte
    opcode: [u8; 1],
    /// Frame handed to the transport during a master read
    tx_stage: [u8; FRAME_LEN],
    /// Bytes captured during a master write
    rx_stage: [u8; FRAME_LEN],
    /// Advertised buffer count, as sent, for the checksum
    avail_sent: [u8; 2],
    /// Packet in the current master read came from `write`
    pub(super) sending_interface_packet: bool,

    /// Destination of the consumer read
    pub(super) read_stage: [u8; RX_LEN],
    /// Length of a read waiting for more bytes
    pub(super) pending_read: Option<usize>,
    /// Length of a completed read whose callback is due
    pub(super) rx_done: Option<usize>,
    /// Interface write slot occupied until its completion is delivered
    pub(super) write_in_flight: bool,
    /// Interface write went out on the wire; callback is due
    pub(super) tx_done_pending: bool,
    /// Foreground polls spent waiting for an opcode
    pub(super) opcode_wait_polls: u32,

    pub(super) diagnostics: SlaveDiagnostics,
}

impl<T, DR, const RX_LEN: usize, const FRAME_LEN: usize, const TX_SLOTS: usize>
    SlaveCore<T, DR, RX_LEN, FRAME_LEN, TX_SLOTS>
where
    T: SlaveTransport,
    DR: OutputPin,
{
    const fn new(transport: T, dready: DR, config: SlaveConfig) -> Self {
        Self {
            transport,
            dready,
            config,
            state: SlaveState::Idle,
            initialized: false,
            rx: RxBuffer::new(),
            pool: PacketPool::new(),
            outgoing: Deque::new(),
            opcode: [0u8; 1],
            tx_stage: [0u8; FRAME_LEN],
            rx_stage: [0u8; FRAME_LEN],
            avail_sent: [0u8; 2],
            sending_interface_packet: false,
            read_stage: [0u8; RX_LEN],
            pending_read: None,
            rx_done: None,
            write_in_flight: false,
            tx_done_pending: false,
            opcode_wait_polls: 0,
            diagnostics: SlaveDiagnostics {
                master_tx_crc_errors: 0,
                frames_received: 0,
                frames_sent: 0,
                empty_responses: 0,
                runt_frames: 0,
                oversize_frames: 0,
                aborted_handshakes: 0,
                opcode_timeouts: 0,
                spurious_events: 0,
            },
        }
    }

    #[inline(always)]
    pub(super) fn ensure_initialized(&self) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(UsageError::NotInitialized.into())
        }
    }

    /// Largest payload a single frame can carry
    #[inline(always)]
    pub(super) const fn max_payload() -> usize {
        FRAME_LEN - FRAME_OVERHEAD
    }

    pub(super) fn set_dready(&mut self, high: bool) -> Result<()> {
        let result = if high {
            self.dready.set_high()
        } else {
            self.dready.set_low()
        };
        result.map_err(|_| Error::Io(IoError::Pin))
    }

    /// Arm the one-byte opcode receive
    pub(super) fn arm_opcode(&mut self) {
        self.opcode_wait_polls = 0;
        self.transport.start_rx(1);
    }

    /// Close the current transaction and wait for the next opcode
    pub(super) fn end_transaction(&mut self) {
        self.state = SlaveState::Idle;
        self.arm_opcode();
    }

    fn spurious(&mut self, event: Event) {
        self.diagnostics.spurious_events = self.diagnostics.spurious_events.wrapping_add(1);
        debug!("spi-hddr: {:?} ignored in {:?}", event, self.state);
    }

    // =========================================================================
    // Event Handlers
    // =========================================================================

    fn on_cs_asserted(&mut self) -> Result<()> {
        self.state = SlaveState::CsReceivedOpcodeExpected;
        self.arm_opcode();
        self.set_dready(true)
    }

    fn on_opcode(&mut self) -> Result<()> {
        let received = self.transport.finish(&mut self.opcode);
        if received == 0 {
            self.spurious(Event::RxDmaComplete);
            return Ok(());
        }

        match self.opcode[0] {
            OPCODE_MASTER_TX => {
                self.avail_sent = self.config.available_buffers.to_le_bytes();
                self.transport.start_transfer(&self.avail_sent, FRAME_LEN);
                self.state = SlaveState::MasterTransmission;
                self.set_dready(false)?;
                trace!("spi-hddr: master tx, {} buffers", self.config.available_buffers);
            }
            OPCODE_MASTER_RX => {
                let len = self.stage_response();
                self.transport.start_transfer(&self.tx_stage[..len], 0);
                self.state = SlaveState::MasterReception;
                self.set_dready(false)?;
                trace!("spi-hddr: master rx, {} bytes staged", len);
            }
            other => {
                error!("spi-hddr: unknown opcode {}", other);
                return Err(ProtocolError::UnknownOpcode.into());
            }
        }
        Ok(())
    }

    /// Copy the next outgoing packet into the TX stage and frame it.
    ///
    /// The packet slot is released as soon as it is copied.
    fn stage_response(&mut self) -> usize {
        let payload_len = match self.outgoing.pop_front() {
            Some(handle) => {
                let payload = self.pool.payload(handle);
                let len = payload.len();
                self.tx_stage[FRAME_HEADER_LEN..FRAME_HEADER_LEN + len].copy_from_slice(payload);
                self.sending_interface_packet = self.pool.is_from_interface(handle);
                self.pool.release(handle);
                self.diagnostics.frames_sent = self.diagnostics.frames_sent.wrapping_add(1);
                len
            }
            None => {
                self.sending_interface_packet = false;
                self.diagnostics.empty_responses = self.diagnostics.empty_responses.wrapping_add(1);
                0
            }
        };

        let header = (payload_len as u16).to_be_bytes();
        self.tx_stage[..FRAME_HEADER_LEN].copy_from_slice(&header);
        let mut len = FRAME_HEADER_LEN + payload_len;

        if self.config.crc_enabled {
            let crc = XorCrc::of(OPCODE_MASTER_RX, header, &self.tx_stage[FRAME_HEADER_LEN..len]);
            self.tx_stage[len] = crc;
            len += 1;
        }
        len
    }

    fn on_master_write_done(&mut self) -> Result<()> {
        let captured = self.transport.finish(&mut self.rx_stage);
        let crc_len = self.config.crc_len();

        if captured < FRAME_HEADER_LEN + crc_len {
            self.diagnostics.runt_frames = self.diagnostics.runt_frames.wrapping_add(1);
            warn!("spi-hddr: runt master write ({} bytes)", captured);
            self.end_transaction();
            return Ok(());
        }

        let payload_end = captured - crc_len;
        if payload_end - FRAME_HEADER_LEN > Self::max_payload() {
            // Capture stopped at FRAME_LEN, the tail of the write is gone
            self.diagnostics.oversize_frames = self.diagnostics.oversize_frames.wrapping_add(1);
            warn!("spi-hddr: master write overran the {} byte frame", FRAME_LEN);
            self.end_transaction();
            return Ok(());
        }
        let payload = &self.rx_stage[FRAME_HEADER_LEN..payload_end];

        if self.config.crc_enabled {
            let expected = XorCrc::of(OPCODE_MASTER_TX, self.avail_sent, payload);
            let actual = self.rx_stage[payload_end];
            if expected != actual {
                self.diagnostics.master_tx_crc_errors =
                    self.diagnostics.master_tx_crc_errors.wrapping_add(1);
                warn!("spi-hddr: master tx crc {} != {}", actual, expected);
            }
        }

        let appended = self.rx.append(payload);
        self.end_transaction();

        if let Err(e) = appended {
            error!("spi-hddr: rx buffer overflow ({} bytes)", payload_end - FRAME_HEADER_LEN);
            return Err(e.into());
        }
        self.diagnostics.frames_received = self.diagnostics.frames_received.wrapping_add(1);
        Ok(())
    }

    fn on_master_read_done(&mut self) {
        self.transport.finish(&mut []);
        if self.sending_interface_packet {
            self.sending_interface_packet = false;
            self.tx_done_pending = true;
        }
        self.end_transaction();
    }

    fn on_handshake_aborted(&mut self) -> Result<()> {
        self.diagnostics.aborted_handshakes = self.diagnostics.aborted_handshakes.wrapping_add(1);
        debug!("spi-hddr: CS released before opcode");
        self.transport.finish(&mut []);
        self.end_transaction();
        self.set_dready(false)
    }

    fn on_message_added(&mut self) -> Result<()> {
        if self.state == SlaveState::Idle && !self.outgoing.is_empty() {
            self.state = SlaveState::ReadRequestedInIdle;
            self.set_dready(true)?;
        }
        Ok(())
    }

    /// Abandon an opcode wait that exceeded the configured poll budget
    pub(super) fn check_opcode_timeout(&mut self) -> Result<()> {
        let Some(limit) = self.config.opcode_timeout_polls else {
            return Ok(());
        };
        if self.state != SlaveState::CsReceivedOpcodeExpected {
            return Ok(());
        }

        self.opcode_wait_polls = self.opcode_wait_polls.saturating_add(1);
        if self.opcode_wait_polls >= limit {
            self.diagnostics.opcode_timeouts = self.diagnostics.opcode_timeouts.wrapping_add(1);
            warn!("spi-hddr: no opcode after {} polls, re-arming", limit);
            self.transport.finish(&mut []);
            self.end_transaction();
            self.set_dready(false)?;
        }
        Ok(())
    }
}

impl<T, DR, const RX_LEN: usize, const FRAME_LEN: usize, const TX_SLOTS: usize>
    EventHandler<Event, EVENT_QUEUE_LEN> for SlaveCore<T, DR, RX_LEN, FRAME_LEN, TX_SLOTS>
where
    T: SlaveTransport,
    DR: OutputPin,
{
    type Error = Error;

    fn handle(&mut self, event: Event, _queue: &mut EventQueue<Event, EVENT_QUEUE_LEN>) -> Result<()> {
        use SlaveState::*;

        match (self.state, event) {
            (Idle | ReadRequestedInIdle | CsReceivedOpcodeExpected, Event::CsAsserted) => {
                self.on_cs_asserted()
            }
            (CsReceivedOpcodeExpected, Event::RxDmaComplete) => self.on_opcode(),
            (CsReceivedOpcodeExpected, Event::CsDeasserted) => self.on_handshake_aborted(),
            (MasterTransmission, Event::CsDeasserted) => self.on_master_write_done(),
            (MasterReception, Event::CsDeasserted) => {
                self.on_master_read_done();
                Ok(())
            }
            (_, Event::MessageAdded) => self.on_message_added(),
            (_, event) => {
                self.spurious(event);
                Ok(())
            }
        }
    }
}

// =============================================================================
// Slave Driver
// =============================================================================

/// SPI-HDDR slave driver
///
/// Owns the transport, the data-ready pin, the incoming byte buffer and the
/// outgoing packet queue. Interrupt handlers call the `on_*` entry points;
/// the main loop calls [`on_system_powered`](Self::on_system_powered).
///
/// # Type Parameters
/// * `T` - DMA-backed SPI slave ([`SlaveTransport`])
/// * `DR` - Data-ready output pin
/// * `RX_LEN` - Incoming buffer capacity in bytes
/// * `FRAME_LEN` - Largest frame on the wire, framing included
/// * `TX_SLOTS` - Outgoing packets that can be queued
///
/// # Example
/// ```ignore
/// let mut slave: SpiHddrSlaveDefault<_, _> =
///     SpiHddrSlave::new(spi, dready, SlaveConfig::new().with_crc(true));
/// slave.init()?;
///
/// loop {
///     if slave.on_system_powered(&mut app)? == PowerMode::GotoSleep {
///         sleep();
///     }
/// }
/// ```
///
/// # Module Organization
///
/// - Core state machine and lifecycle (this module)
/// - [`interface`](super::interface): consumer read/write, kernel message sink
/// - [`flow`](super::flow): foreground poll, flow control and sleep hooks
pub struct SpiHddrSlave<
    T,
    DR,
    const RX_LEN: usize,
    const FRAME_LEN: usize,
    const TX_SLOTS: usize,
> {
    pub(super) events: EventQueue<Event, EVENT_QUEUE_LEN>,
    pub(super) core: SlaveCore<T, DR, RX_LEN, FRAME_LEN, TX_SLOTS>,
}

impl<T, DR, const RX_LEN: usize, const FRAME_LEN: usize, const TX_SLOTS: usize>
    SpiHddrSlave<T, DR, RX_LEN, FRAME_LEN, TX_SLOTS>
where
    T: SlaveTransport,
    DR: OutputPin,
{
    /// Create a new slave
    ///
    /// This is a const function suitable for static initialization.
    /// The slave does nothing until [`init`](Self::init) is called.
    pub const fn new(transport: T, dready: DR, config: SlaveConfig) -> Self {
        Self {
            events: EventQueue::new(),
            core: SlaveCore::new(transport, dready, config),
        }
    }

    /// Bring the protocol up: data-ready low, state idle, opcode armed.
    pub fn init(&mut self) -> Result<()> {
        if FRAME_LEN <= FRAME_OVERHEAD || FRAME_LEN > u16::MAX as usize || TX_SLOTS > u8::MAX as usize {
            return Err(ConfigError::InvalidConfig.into());
        }
        self.core.set_dready(false)?;
        self.core.state = SlaveState::Idle;
        self.core.arm_opcode();
        self.core.initialized = true;
        info!(
            "spi-hddr: slave up, crc {}, {} buffers",
            self.core.config.crc_enabled,
            self.core.config.available_buffers
        );
        Ok(())
    }

    /// Drop all queued data and pending requests, then re-initialize.
    ///
    /// This is the recovery path after a fatal protocol error. Diagnostic
    /// counters are kept.
    pub fn reset(&mut self) -> Result<()> {
        self.events.clear();
        let core = &mut self.core;
        core.transport.finish(&mut []);
        core.rx.reset();
        core.pool.clear();
        core.outgoing.clear();
        core.sending_interface_packet = false;
        core.pending_read = None;
        core.rx_done = None;
        core.write_in_flight = false;
        core.tx_done_pending = false;
        self.init()
    }

    /// Tear down and hand back the hardware resources
    pub fn release(mut self) -> (T, DR) {
        self.core.transport.finish(&mut []);
        // Pin errors on teardown have nowhere to go
        let _ = self.core.set_dready(false);
        (self.core.transport, self.core.dready)
    }

    // =========================================================================
    // Interrupt Entry Points
    // =========================================================================

    /// CS falling edge
    pub fn on_cs_asserted(&mut self) -> Result<()> {
        self.post(Event::CsAsserted)
    }

    /// CS rising edge
    pub fn on_cs_deasserted(&mut self) -> Result<()> {
        self.post(Event::CsDeasserted)
    }

    /// RX DMA reached the armed count
    pub fn on_rx_dma_complete(&mut self) -> Result<()> {
        self.post(Event::RxDmaComplete)
    }

    pub(super) fn post(&mut self, event: Event) -> Result<()> {
        self.core.ensure_initialized()?;
        let Self { events, core } = self;
        events.update(core, event)
    }

    // =========================================================================
    // State Accessors
    // =========================================================================

    /// Current protocol state
    #[inline(always)]
    pub fn state(&self) -> SlaveState {
        self.core.state
    }

    /// Whether [`init`](Self::init) has run
    #[inline(always)]
    pub fn is_initialized(&self) -> bool {
        self.core.initialized
    }

    /// Active configuration
    #[inline(always)]
    pub fn config(&self) -> &SlaveConfig {
        &self.core.config
    }

    /// Diagnostic counters
    #[inline(always)]
    pub fn diagnostics(&self) -> &SlaveDiagnostics {
        &self.core.diagnostics
    }

    /// Zero the diagnostic counters
    pub fn clear_diagnostics(&mut self) {
        self.core.diagnostics.clear();
    }

    /// Packets queued for the master
    #[inline(always)]
    pub fn pending_outgoing(&self) -> usize {
        self.core.outgoing.len()
    }

    /// Received bytes not yet read by the consumer
    #[inline(always)]
    pub fn rx_buffered(&self) -> usize {
        self.core.rx.available()
    }

    /// Events waiting for dispatch
    #[inline(always)]
    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// Largest payload accepted by `write` and `queue_message`
    #[inline(always)]
    pub const fn max_payload(&self) -> usize {
        SlaveCore::<T, DR, RX_LEN, FRAME_LEN, TX_SLOTS>::max_payload()
    }

    /// Borrow the transport
    #[inline(always)]
    pub fn transport(&self) -> &T {
        &self.core.transport
    }

    /// Mutably borrow the transport
    #[inline(always)]
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.core.transport
    }
}

// =============================================================================
// Type Aliases
// =============================================================================

/// Slave with the default sizes (512 B incoming, 260 B payloads, 4 packets)
pub type SpiHddrSlaveDefault<T, DR> =
    SpiHddrSlave<T, DR, DEFAULT_RX_BUFFER_LEN, DEFAULT_FRAME_LEN, DEFAULT_TX_SLOTS>;

/// Slave for memory-constrained parts (128 B incoming, 64 B payloads, 2 packets)
pub type SpiHddrSlaveSmall<T, DR> = SpiHddrSlave<T, DR, 128, 67, 2>;

/// Slave for bulk transfers (2 KiB incoming, 1 KiB payloads, 8 packets)
pub type SpiHddrSlaveLarge<T, DR> = SpiHddrSlave<T, DR, 2048, 1027, 8>;
