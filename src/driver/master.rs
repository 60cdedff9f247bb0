//! SPI-HDDR master driver.
//!
//! The master role runs on an always-on host MCU, so it is strictly
//! blocking: every transaction busy-waits on the data-ready line and clocks
//! the frame with ordinary [`SpiBus`] transfers. It is driven by explicit
//! [`MasterEvent`]s or by [`SpiHddrMaster::poll`].
//!
//! Frames read from the slave are classified by their first byte. Kernel
//! messages (GTL) are kept in a bounded incoming list for the application;
//! HCI traffic is counted and dropped.

use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiBus;
use heapless::Deque;

use super::config::{MasterConfig, MasterState};
use super::diagnostics::MasterDiagnostics;
use super::error::{Error, IoError, IoResult, ProtocolError, Result, UsageError};
use crate::internal::constants::{
    DEFAULT_FRAME_LEN, DEFAULT_MASTER_QUEUE_LEN, FRAME_HEADER_LEN, FRAME_OVERHEAD, GTL_KE_MSG_TYPE,
    HCI_ACL_MSG_TYPE, HCI_CMD_MSG_TYPE, HCI_EVT_HEADER_LEN, HCI_EVT_MSG_TYPE, OPCODE_MASTER_RX,
    OPCODE_MASTER_TX,
};
use crate::internal::crc::XorCrc;
use crate::kernel::{KernelMessage, MessageSink, OwnedMessage, gtl};

// =============================================================================
// Frame Classification
// =============================================================================

/// Message-type tag carried in the first payload byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MessageType {
    /// HCI command packet (0x01)
    HciCommand,
    /// HCI ACL data packet (0x02)
    HciAcl,
    /// HCI event packet (0x04)
    HciEvent,
    /// GTL kernel message (0x05)
    GtlKernelMessage,
    /// Any other tag
    Unknown(u8),
}

impl MessageType {
    /// Classify a tag byte
    pub const fn from_tag(tag: u8) -> Self {
        match tag {
            HCI_CMD_MSG_TYPE => MessageType::HciCommand,
            HCI_ACL_MSG_TYPE => MessageType::HciAcl,
            HCI_EVT_MSG_TYPE => MessageType::HciEvent,
            GTL_KE_MSG_TYPE => MessageType::GtlKernelMessage,
            other => MessageType::Unknown(other),
        }
    }
}

/// Check an HCI event frame against its parameter total length
fn check_hci_event(frame: &[u8]) -> Result<()> {
    let header_end = 1 + HCI_EVT_HEADER_LEN;
    if frame.len() < header_end {
        return Err(ProtocolError::FrameTooShort.into());
    }
    if frame.len() != header_end + frame[2] as usize {
        return Err(ProtocolError::FrameLengthMismatch.into());
    }
    Ok(())
}

/// Request handed to [`SpiHddrMaster::handle_event`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasterEvent<'a> {
    /// The slave raised data-ready while the master was idle
    DataReady,
    /// Send a frame to the slave
    Transmit(&'a [u8]),
}

// =============================================================================
// Master Driver
// =============================================================================

/// SPI-HDDR master driver
///
/// # Type Parameters
/// * `SPI` - SPI bus, CS managed by the driver
/// * `CS` - Chip-select output (active low)
/// * `DR` - Data-ready input from the slave
/// * `FRAME_LEN` - Largest frame on the wire, framing included
/// * `QUEUE_LEN` - Received kernel messages kept until popped
///
/// # Example
/// ```ignore
/// let mut master: SpiHddrMasterDefault<_, _, _> =
///     SpiHddrMaster::new(spi, cs, dready, MasterConfig::new());
///
/// master.handle_event(MasterEvent::Transmit(&frame))?;
/// while master.poll()? {}
/// while let Some(msg) = master.pop_message() {
///     dispatch(msg.as_message());
/// }
/// ```
pub struct SpiHddrMaster<SPI, CS, DR, const FRAME_LEN: usize, const QUEUE_LEN: usize> {
    spi: SPI,
    cs: CS,
    dready: DR,
    config: MasterConfig,
    state: MasterState,
    incoming: Deque<OwnedMessage<FRAME_LEN>, QUEUE_LEN>,
    diagnostics: MasterDiagnostics,
}

impl<SPI, CS, DR, const FRAME_LEN: usize, const QUEUE_LEN: usize>
    SpiHddrMaster<SPI, CS, DR, FRAME_LEN, QUEUE_LEN>
where
    SPI: SpiBus<u8>,
    CS: OutputPin,
    DR: InputPin,
{
    /// Create a new master. CS is not touched until the first transaction.
    pub const fn new(spi: SPI, cs: CS, dready: DR, config: MasterConfig) -> Self {
        Self {
            spi,
            cs,
            dready,
            config,
            state: MasterState::Idle,
            incoming: Deque::new(),
            diagnostics: MasterDiagnostics {
                rx_crc_errors: 0,
                frames_received: 0,
                frames_sent: 0,
                empty_frames: 0,
                framing_errors: 0,
                dropped_frames: 0,
                queue_overflows: 0,
                timeouts: 0,
            },
        }
    }

    /// Release CS and make sure the bus is idle
    pub fn init(&mut self) -> Result<()> {
        self.cs.set_high().map_err(|_| IoError::Pin)?;
        self.state = MasterState::Idle;
        Ok(())
    }

    /// Tear down and hand back the hardware resources
    pub fn release(self) -> (SPI, CS, DR) {
        (self.spi, self.cs, self.dready)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Current state
    #[inline(always)]
    pub fn state(&self) -> MasterState {
        self.state
    }

    /// Active configuration
    #[inline(always)]
    pub fn config(&self) -> &MasterConfig {
        &self.config
    }

    /// Diagnostic counters
    #[inline(always)]
    pub fn diagnostics(&self) -> &MasterDiagnostics {
        &self.diagnostics
    }

    /// Received kernel messages not yet popped
    #[inline(always)]
    pub fn pending_messages(&self) -> usize {
        self.incoming.len()
    }

    /// Take the oldest received kernel message
    pub fn pop_message(&mut self) -> Option<OwnedMessage<FRAME_LEN>> {
        self.incoming.pop_front()
    }

    /// Mutably borrow the SPI bus
    #[inline(always)]
    pub fn spi_mut(&mut self) -> &mut SPI {
        &mut self.spi
    }

    // =========================================================================
    // Event Handling
    // =========================================================================

    /// Run one master transaction
    pub fn handle_event(&mut self, event: MasterEvent<'_>) -> Result<()> {
        match event {
            MasterEvent::DataReady => {
                let mut frame = [0u8; FRAME_LEN];
                let len = self.receive_frame(&mut frame)?;
                self.accept_frame(&frame[..len]);
                Ok(())
            }
            MasterEvent::Transmit(payload) => self.transmit(payload).map(|_| ()),
        }
    }

    /// Read from the slave if it is signalling data
    ///
    /// # Returns
    /// `true` if a read was performed
    pub fn poll(&mut self) -> Result<bool> {
        if self.state != MasterState::Idle {
            return Ok(false);
        }
        if self.dready.is_high().map_err(|_| IoError::Pin)? {
            self.handle_event(MasterEvent::DataReady)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Send one frame to the slave.
    ///
    /// # Returns
    /// The buffer count advertised by the slave
    ///
    /// # Errors
    /// * [`IoError::NoBuffersAvailable`] - slave advertised zero buffers
    /// * [`IoError::Timeout`] - data-ready never reached the expected level
    pub fn transmit(&mut self, payload: &[u8]) -> Result<u16> {
        if self.state != MasterState::Idle {
            return Err(IoError::InvalidState.into());
        }
        if payload.len() > FRAME_LEN - FRAME_OVERHEAD {
            return Err(UsageError::InvalidLength.into());
        }

        self.state = MasterState::Transmitting;
        let result = self.transmit_inner(payload);
        let released = self.end_transaction();
        let available = result?;
        released?;

        self.diagnostics.frames_sent = self.diagnostics.frames_sent.wrapping_add(1);
        Ok(available)
    }

    fn transmit_inner(&mut self, payload: &[u8]) -> Result<u16> {
        self.begin(OPCODE_MASTER_TX)?;

        let mut header = [self.config.dummy_byte; FRAME_HEADER_LEN];
        self.spi.transfer_in_place(&mut header).map_err(|_| IoError::Bus)?;
        let available = u16::from_le_bytes(header);
        if available == 0 {
            warn!("spi-hddr master: slave has no buffers");
            return Err(IoError::NoBuffersAvailable.into());
        }

        self.spi.write(payload).map_err(|_| IoError::Bus)?;
        if self.config.crc_enabled {
            let crc = XorCrc::of(OPCODE_MASTER_TX, header, payload);
            self.spi.write(&[crc]).map_err(|_| IoError::Bus)?;
        }
        self.spi.flush().map_err(|_| IoError::Bus)?;
        trace!("spi-hddr master: sent {} bytes", payload.len());
        Ok(available)
    }

    /// Read one frame from the slave into `buf`.
    ///
    /// A checksum mismatch is counted but the frame is still returned.
    ///
    /// # Returns
    /// Payload length (0 if the slave had nothing queued)
    pub fn receive_frame(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.state != MasterState::Idle {
            return Err(IoError::InvalidState.into());
        }

        self.state = MasterState::Receiving;
        let result = self.receive_inner(buf);
        let released = self.end_transaction();
        let len = result?;
        released?;

        if len == 0 {
            self.diagnostics.empty_frames = self.diagnostics.empty_frames.wrapping_add(1);
        } else {
            self.diagnostics.frames_received = self.diagnostics.frames_received.wrapping_add(1);
        }
        Ok(len)
    }

    fn receive_inner(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.begin(OPCODE_MASTER_RX)?;

        let mut header = [self.config.dummy_byte; FRAME_HEADER_LEN];
        self.spi.transfer_in_place(&mut header).map_err(|_| IoError::Bus)?;
        let len = u16::from_be_bytes(header) as usize;
        if len > buf.len() {
            self.diagnostics.framing_errors = self.diagnostics.framing_errors.wrapping_add(1);
            warn!("spi-hddr master: {} byte frame exceeds buffer", len);
            return Err(UsageError::InvalidLength.into());
        }

        let payload = &mut buf[..len];
        payload.fill(self.config.dummy_byte);
        self.spi.transfer_in_place(payload).map_err(|_| IoError::Bus)?;

        if self.config.crc_enabled {
            let mut crc = [self.config.dummy_byte];
            self.spi.transfer_in_place(&mut crc).map_err(|_| IoError::Bus)?;
            let expected = XorCrc::of(OPCODE_MASTER_RX, header, payload);
            if crc[0] != expected {
                self.diagnostics.rx_crc_errors = self.diagnostics.rx_crc_errors.wrapping_add(1);
                warn!("spi-hddr master: rx crc {} != {}", crc[0], expected);
            }
        }
        self.spi.flush().map_err(|_| IoError::Bus)?;
        Ok(len)
    }

    /// Assert CS, hand over the opcode once the slave is listening
    fn begin(&mut self, opcode: u8) -> Result<()> {
        self.cs.set_low().map_err(|_| IoError::Pin)?;
        self.wait_dready(true)?;
        self.spi.write(&[opcode]).map_err(|_| IoError::Bus)?;
        self.spi.flush().map_err(|_| IoError::Bus)?;
        self.wait_dready(false)?;
        Ok(())
    }

    fn end_transaction(&mut self) -> Result<()> {
        self.state = MasterState::Idle;
        self.cs.set_high().map_err(|_| Error::Io(IoError::Pin))
    }

    fn wait_dready(&mut self, high: bool) -> IoResult<()> {
        for _ in 0..self.config.spin_limit {
            if self.dready.is_high().map_err(|_| IoError::Pin)? == high {
                return Ok(());
            }
            core::hint::spin_loop();
        }
        self.diagnostics.timeouts = self.diagnostics.timeouts.wrapping_add(1);
        warn!("spi-hddr master: data-ready stuck, wanted {}", high);
        Err(IoError::Timeout)
    }

    // =========================================================================
    // Incoming Classification
    // =========================================================================

    fn accept_frame(&mut self, frame: &[u8]) {
        let Some(&tag) = frame.first() else {
            return;
        };

        match MessageType::from_tag(tag) {
            MessageType::GtlKernelMessage => match gtl::decode(frame) {
                Ok(msg) => self.store(&msg),
                Err(e) => {
                    self.diagnostics.framing_errors = self.diagnostics.framing_errors.wrapping_add(1);
                    warn!("spi-hddr master: bad gtl frame: {}", e.as_str());
                }
            },
            MessageType::HciEvent => {
                if check_hci_event(frame).is_err() {
                    self.diagnostics.framing_errors = self.diagnostics.framing_errors.wrapping_add(1);
                } else {
                    self.diagnostics.dropped_frames = self.diagnostics.dropped_frames.wrapping_add(1);
                }
            }
            other => {
                self.diagnostics.dropped_frames = self.diagnostics.dropped_frames.wrapping_add(1);
                debug!("spi-hddr master: dropped {:?} frame", other);
            }
        }
    }

    fn store(&mut self, msg: &KernelMessage<'_>) {
        let stored = OwnedMessage::from_message(msg)
            .ok()
            .and_then(|owned| self.incoming.push_back(owned).ok());
        if stored.is_none() {
            self.diagnostics.queue_overflows = self.diagnostics.queue_overflows.wrapping_add(1);
            warn!("spi-hddr master: incoming list full, msg {} lost", msg.id);
        }
    }
}

impl<SPI, CS, DR, const FRAME_LEN: usize, const QUEUE_LEN: usize> MessageSink
    for SpiHddrMaster<SPI, CS, DR, FRAME_LEN, QUEUE_LEN>
where
    SPI: SpiBus<u8>,
    CS: OutputPin,
    DR: InputPin,
{
    /// Send a kernel message to the slave as a GTL frame
    fn send(&mut self, msg: &KernelMessage<'_>) -> Result<()> {
        let mut frame = [0u8; FRAME_LEN];
        let len = gtl::encode(msg, &mut frame)?;
        self.transmit(&frame[..len]).map(|_| ())
    }
}

// =============================================================================
// Type Aliases
// =============================================================================

/// Master with the default frame size and a 4-message incoming list
pub type SpiHddrMasterDefault<SPI, CS, DR> =
    SpiHddrMaster<SPI, CS, DR, DEFAULT_FRAME_LEN, DEFAULT_MASTER_QUEUE_LEN>;

/// Master for small frames (64 B payloads, 2 messages)
pub type SpiHddrMasterSmall<SPI, CS, DR> = SpiHddrMaster<SPI, CS, DR, 67, 2>;
