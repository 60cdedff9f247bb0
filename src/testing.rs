//! Testing utilities and mock implementations
//!
//! This module provides mock implementations for exercising both transport
//! roles on the host without hardware access.
//!
//! Only available when running `cargo test`.

// Note: The #[cfg(test)] attribute is applied in lib.rs where this module is declared
#![allow(missing_docs)]
#![allow(clippy::std_instead_of_core, clippy::std_instead_of_alloc)]

extern crate std;

use core::cell::{Cell, RefCell};
use core::convert::Infallible;
use std::rc::Rc;
use std::vec::Vec;

use embedded_hal::digital::{ErrorKind, ErrorType as PinErrorType, InputPin, OutputPin};
use embedded_hal::spi::{ErrorType as SpiErrorType, SpiBus};

use crate::driver::error::{Error, Result};
use crate::driver::interface::TransportClient;
use crate::driver::slave::SpiHddrSlave;
use crate::hal::transport::SlaveTransport;
use crate::kernel::{KernelMessage, MessageSink, OwnedMessage};

// =============================================================================
// Recording Sink
// =============================================================================

/// Message sink that keeps a copy of everything sent to it
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub messages: Vec<OwnedMessage<64>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MessageSink for RecordingSink {
    fn send(&mut self, msg: &KernelMessage<'_>) -> Result<()> {
        self.messages.push(OwnedMessage::from_message(msg)?);
        Ok(())
    }
}

// =============================================================================
// Recording Client
// =============================================================================

/// Transport client that records the completions it receives
#[derive(Debug, Default)]
pub struct RecordingClient {
    pub reads: Vec<Vec<u8>>,
    pub writes: usize,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransportClient for RecordingClient {
    fn read_complete(&mut self, data: &[u8]) {
        self.reads.push(data.to_vec());
    }

    fn write_complete(&mut self) {
        self.writes += 1;
    }
}

// =============================================================================
// Shared Pin
// =============================================================================

/// GPIO whose level is visible through every clone
///
/// The slave drives one clone as its data-ready output while the master
/// samples another as its data-ready input. Writes can be made to fail with
/// [`fail_writes`](Self::fail_writes).
#[derive(Debug, Clone, Default)]
pub struct SharedPin {
    level: Rc<Cell<bool>>,
    failing: Rc<Cell<bool>>,
}

impl SharedPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self) -> bool {
        self.level.get()
    }

    /// Make every following write return an error (the level is untouched)
    pub fn fail_writes(&self, failing: bool) {
        self.failing.set(failing);
    }

    fn drive(&self, high: bool) -> core::result::Result<(), ErrorKind> {
        if self.failing.get() {
            return Err(ErrorKind::Other);
        }
        self.level.set(high);
        Ok(())
    }
}

impl PinErrorType for SharedPin {
    type Error = ErrorKind;
}

impl OutputPin for SharedPin {
    fn set_low(&mut self) -> core::result::Result<(), ErrorKind> {
        self.drive(false)
    }

    fn set_high(&mut self) -> core::result::Result<(), ErrorKind> {
        self.drive(true)
    }
}

impl InputPin for SharedPin {
    fn is_high(&mut self) -> core::result::Result<bool, ErrorKind> {
        Ok(self.level.get())
    }

    fn is_low(&mut self) -> core::result::Result<bool, ErrorKind> {
        Ok(!self.level.get())
    }
}

// =============================================================================
// Mock Slave Transport
// =============================================================================

/// What the mock transport was last asked to do
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Armed {
    #[default]
    Stopped,
    Rx { len: usize },
    Transfer { tx: Vec<u8>, rx_capacity: usize },
}

/// Byte-clocked stand-in for an SPI slave block with DMA
///
/// # Example
///
/// ```ignore
/// let (miso, complete) = transport.clock(0x61);
/// if complete {
///     slave.on_rx_dma_complete()?;
/// }
/// ```
#[derive(Debug, Default)]
pub struct MockSlaveTransport {
    cs: bool,
    armed: Armed,
    captured: Vec<u8>,
    tx_pos: usize,
    /// Number of `start_rx` calls, for checking re-arms
    pub rx_arms: usize,
}

impl MockSlaveTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn armed(&self) -> &Armed {
        &self.armed
    }

    pub fn set_cs(&mut self, asserted: bool) {
        self.cs = asserted;
    }

    /// Exchange one byte.
    ///
    /// Returns the byte clocked out and whether an armed receive just
    /// reached its count.
    pub fn clock(&mut self, mosi: u8) -> (u8, bool) {
        match &self.armed {
            Armed::Stopped => (0, false),
            Armed::Rx { len } => {
                let len = *len;
                if self.captured.len() < len {
                    self.captured.push(mosi);
                    (0, self.captured.len() == len)
                } else {
                    (0, false)
                }
            }
            Armed::Transfer { tx, rx_capacity } => {
                let miso = tx.get(self.tx_pos).copied().unwrap_or(0);
                self.tx_pos += 1;
                if self.captured.len() < *rx_capacity {
                    self.captured.push(mosi);
                }
                (miso, false)
            }
        }
    }
}

impl SlaveTransport for MockSlaveTransport {
    fn start_rx(&mut self, len: usize) {
        self.rx_arms += 1;
        self.captured.clear();
        self.tx_pos = 0;
        self.armed = Armed::Rx { len };
    }

    fn start_transfer(&mut self, tx: &[u8], rx_capacity: usize) {
        self.captured.clear();
        self.tx_pos = 0;
        self.armed = Armed::Transfer {
            tx: tx.to_vec(),
            rx_capacity,
        };
    }

    fn finish(&mut self, buf: &mut [u8]) -> usize {
        let n = self.captured.len().min(buf.len());
        buf[..n].copy_from_slice(&self.captured[..n]);
        self.captured.clear();
        self.armed = Armed::Stopped;
        n
    }

    fn cs_asserted(&self) -> bool {
        self.cs
    }
}

/// Slave wired to the mocks
pub type MockSlave<const RX_LEN: usize, const FRAME_LEN: usize, const TX_SLOTS: usize> =
    SpiHddrSlave<MockSlaveTransport, SharedPin, RX_LEN, FRAME_LEN, TX_SLOTS>;

/// Clock `mosi` into an asserted slave, firing RX DMA completions
///
/// Returns the bytes the slave clocked out.
pub fn clock_bytes<const RX_LEN: usize, const FRAME_LEN: usize, const TX_SLOTS: usize>(
    slave: &mut MockSlave<RX_LEN, FRAME_LEN, TX_SLOTS>,
    mosi: &[u8],
) -> Result<Vec<u8>> {
    let mut miso = Vec::with_capacity(mosi.len());
    for &byte in mosi {
        let (out, complete) = slave.transport_mut().clock(byte);
        miso.push(out);
        if complete {
            slave.on_rx_dma_complete()?;
        }
    }
    Ok(miso)
}

/// Drive the slave CS line
pub fn set_cs<const RX_LEN: usize, const FRAME_LEN: usize, const TX_SLOTS: usize>(
    slave: &mut MockSlave<RX_LEN, FRAME_LEN, TX_SLOTS>,
    asserted: bool,
) -> Result<()> {
    slave.transport_mut().set_cs(asserted);
    if asserted {
        slave.on_cs_asserted()
    } else {
        slave.on_cs_deasserted()
    }
}

// =============================================================================
// Loopback Link
// =============================================================================

/// Master-side view of a mock slave: an SPI bus plus its CS line
///
/// Every byte the master clocks goes straight into the slave; CS edges and
/// RX DMA completions are delivered to the slave as they happen. Errors the
/// slave reports from those entry points are kept in `fault`.
pub struct LoopbackLink<const RX_LEN: usize, const FRAME_LEN: usize, const TX_SLOTS: usize> {
    pub slave: Rc<RefCell<MockSlave<RX_LEN, FRAME_LEN, TX_SLOTS>>>,
    pub fault: Rc<Cell<Option<Error>>>,
    cs_low: Rc<Cell<bool>>,
}

impl<const RX_LEN: usize, const FRAME_LEN: usize, const TX_SLOTS: usize> Clone
    for LoopbackLink<RX_LEN, FRAME_LEN, TX_SLOTS>
{
    fn clone(&self) -> Self {
        Self {
            slave: Rc::clone(&self.slave),
            fault: Rc::clone(&self.fault),
            cs_low: Rc::clone(&self.cs_low),
        }
    }
}

impl<const RX_LEN: usize, const FRAME_LEN: usize, const TX_SLOTS: usize>
    LoopbackLink<RX_LEN, FRAME_LEN, TX_SLOTS>
{
    pub fn new(slave: MockSlave<RX_LEN, FRAME_LEN, TX_SLOTS>) -> Self {
        Self {
            slave: Rc::new(RefCell::new(slave)),
            fault: Rc::new(Cell::new(None)),
            cs_low: Rc::new(Cell::new(false)),
        }
    }

    fn record(&self, result: Result<()>) {
        if let Err(e) = result {
            self.fault.set(Some(e));
        }
    }

    fn exchange(&self, mosi: u8) -> u8 {
        let mut slave = self.slave.borrow_mut();
        let (miso, complete) = slave.transport_mut().clock(mosi);
        if complete {
            let result = slave.on_rx_dma_complete();
            drop(slave);
            self.record(result);
        }
        miso
    }

    fn drive_cs(&self, low: bool) {
        if self.cs_low.get() == low {
            return;
        }
        self.cs_low.set(low);
        let result = set_cs(&mut *self.slave.borrow_mut(), low);
        self.record(result);
    }
}

impl<const RX_LEN: usize, const FRAME_LEN: usize, const TX_SLOTS: usize> SpiErrorType
    for LoopbackLink<RX_LEN, FRAME_LEN, TX_SLOTS>
{
    type Error = Infallible;
}

impl<const RX_LEN: usize, const FRAME_LEN: usize, const TX_SLOTS: usize> SpiBus<u8>
    for LoopbackLink<RX_LEN, FRAME_LEN, TX_SLOTS>
{
    fn read(&mut self, words: &mut [u8]) -> core::result::Result<(), Infallible> {
        for word in words.iter_mut() {
            *word = self.exchange(0);
        }
        Ok(())
    }

    fn write(&mut self, words: &[u8]) -> core::result::Result<(), Infallible> {
        for &word in words {
            self.exchange(word);
        }
        Ok(())
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> core::result::Result<(), Infallible> {
        for i in 0..read.len().max(write.len()) {
            let miso = self.exchange(write.get(i).copied().unwrap_or(0));
            if let Some(slot) = read.get_mut(i) {
                *slot = miso;
            }
        }
        Ok(())
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> core::result::Result<(), Infallible> {
        for word in words.iter_mut() {
            *word = self.exchange(*word);
        }
        Ok(())
    }

    fn flush(&mut self) -> core::result::Result<(), Infallible> {
        Ok(())
    }
}

/// Chip-select output of a [`LoopbackLink`]
pub struct LoopbackCs<const RX_LEN: usize, const FRAME_LEN: usize, const TX_SLOTS: usize>(
    pub LoopbackLink<RX_LEN, FRAME_LEN, TX_SLOTS>,
);

impl<const RX_LEN: usize, const FRAME_LEN: usize, const TX_SLOTS: usize> PinErrorType
    for LoopbackCs<RX_LEN, FRAME_LEN, TX_SLOTS>
{
    type Error = Infallible;
}

impl<const RX_LEN: usize, const FRAME_LEN: usize, const TX_SLOTS: usize> OutputPin
    for LoopbackCs<RX_LEN, FRAME_LEN, TX_SLOTS>
{
    fn set_low(&mut self) -> core::result::Result<(), Infallible> {
        self.0.drive_cs(true);
        Ok(())
    }

    fn set_high(&mut self) -> core::result::Result<(), Infallible> {
        self.0.drive_cs(false);
        Ok(())
    }
}
