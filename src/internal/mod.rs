//! Internal Implementation Details
//!
//! This module contains implementation details that are not part of the public API.
//! Types in this module may change without notice between minor versions.
//!
//! # Contents
//!
//! - [`constants`]: Wire-format values and default sizes
//! - [`crc`]: XOR checksum shared by both transfer directions
//! - [`rx_buffer`]: Linear incoming byte buffer with partial-read support
//! - [`packet_pool`]: Fixed slots backing the outgoing message queue
//!
//! # Stability
//!
//! **WARNING:** This module is `pub(crate)` only. Do not depend on any types
//! or functions in this module from external code. They are subject to change
//! without notice.

pub(crate) mod constants;
pub(crate) mod crc;
pub(crate) mod packet_pool;
pub(crate) mod rx_buffer;
