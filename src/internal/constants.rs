//! Centralized Constants
//!
//! This module provides a single source of truth for the wire-format values
//! and default sizes used throughout the SPI-HDDR transport.
//!
//! # Organization
//!
//! Constants are grouped by category:
//! - **Opcodes**: the single byte the master clocks after asserting CS
//! - **Framing**: header, checksum and message-type tag sizes
//! - **Default sizes**: ring buffer, message and queue capacities
//! - **Timing**: busy-wait bounds for the master role

// =============================================================================
// Opcodes
// =============================================================================

/// Master announces a write (master transmits, slave receives)
pub const OPCODE_MASTER_TX: u8 = 0x9E;

/// Master requests a read (slave transmits, master receives)
pub const OPCODE_MASTER_RX: u8 = 0x61;

// =============================================================================
// Framing
// =============================================================================

/// Size of the slave's response header (available buffers or payload length)
pub const FRAME_HEADER_LEN: usize = 2;

/// Size of the optional trailing XOR checksum
pub const FRAME_CRC_LEN: usize = 1;

/// Worst-case framing overhead around a payload
pub const FRAME_OVERHEAD: usize = FRAME_HEADER_LEN + FRAME_CRC_LEN;

/// Available-buffers count advertised to the master on a write announcement
pub const DEFAULT_AVAILABLE_BUFFERS: u16 = 100;

/// Message-type tag: HCI command packet
pub const HCI_CMD_MSG_TYPE: u8 = 0x01;

/// Message-type tag: HCI ACL data packet
pub const HCI_ACL_MSG_TYPE: u8 = 0x02;

/// Message-type tag: HCI event packet
pub const HCI_EVT_MSG_TYPE: u8 = 0x04;

/// Message-type tag: GTL kernel message
pub const GTL_KE_MSG_TYPE: u8 = 0x05;

/// GTL kernel message header (id, dest, src, param length; 2 bytes each)
pub const GTL_HEADER_LEN: usize = 8;

/// HCI event header (event code, parameter total length)
pub const HCI_EVT_HEADER_LEN: usize = 2;

// =============================================================================
// Default Sizes
// =============================================================================

/// Default capacity of the incoming byte ring buffer
pub const DEFAULT_RX_BUFFER_LEN: usize = 512;

/// Default size of one framed message (header + payload + checksum)
pub const DEFAULT_FRAME_LEN: usize = 263;

/// Default number of outgoing packet slots
pub const DEFAULT_TX_SLOTS: usize = 4;

/// Capacity of the deferred event queue
pub const EVENT_QUEUE_LEN: usize = 8;

/// Default number of received kernel messages the master keeps
pub const DEFAULT_MASTER_QUEUE_LEN: usize = 4;

// =============================================================================
// Timing
// =============================================================================

/// Maximum iterations the master spends waiting on the data-ready line
pub const DEFAULT_SPIN_LIMIT: u32 = 100_000;

/// Filler byte the master clocks when it has nothing to send
pub const DEFAULT_DUMMY_BYTE: u8 = 0x00;
