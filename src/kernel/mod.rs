//! Kernel message envelope and task dispatch.
//!
//! The BLE kernel that normally surrounds the transport is modelled only at
//! its interface: messages carry an id, a destination task, a source task and
//! an opaque parameter block. Anything able to accept such a message
//! implements [`MessageSink`]; the SPI-HDDR slave is one, forwarding messages
//! to the master as GTL frames.
//!
//! - [`gtl`] - GTL frame encoding and decoding
//! - [`task`] - State-aware message dispatcher with save/replay

pub mod gtl;
pub mod task;

use heapless::Vec;

use crate::driver::error::{Result, UsageError};

pub use task::{MessageHandler, StateHandlers, Task, TaskContext, TaskHandlers};

/// Kernel task identifier
pub type TaskId = u16;

/// Kernel message identifier
pub type MessageId = u16;

// =============================================================================
// Message Types
// =============================================================================

/// Borrowed view of a kernel message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KernelMessage<'a> {
    /// Message identifier
    pub id: MessageId,
    /// Destination task
    pub dest: TaskId,
    /// Source task
    pub src: TaskId,
    /// Parameter block
    pub param: &'a [u8],
}

impl<'a> KernelMessage<'a> {
    /// Create a message view
    #[must_use]
    pub const fn new(id: MessageId, dest: TaskId, src: TaskId, param: &'a [u8]) -> Self {
        Self {
            id,
            dest,
            src,
            param,
        }
    }
}

/// Kernel message with inline parameter storage of up to `N` bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedMessage<const N: usize> {
    /// Message identifier
    pub id: MessageId,
    /// Destination task
    pub dest: TaskId,
    /// Source task
    pub src: TaskId,
    /// Parameter block
    pub param: Vec<u8, N>,
}

impl<const N: usize> OwnedMessage<N> {
    /// Copy a borrowed message.
    ///
    /// Fails with [`UsageError::InvalidLength`] if the parameters exceed `N`.
    pub fn from_message(msg: &KernelMessage<'_>) -> core::result::Result<Self, UsageError> {
        let param = Vec::from_slice(msg.param).map_err(|_| UsageError::InvalidLength)?;
        Ok(Self {
            id: msg.id,
            dest: msg.dest,
            src: msg.src,
            param,
        })
    }

    /// Borrow as a message view
    pub fn as_message(&self) -> KernelMessage<'_> {
        KernelMessage {
            id: self.id,
            dest: self.dest,
            src: self.src,
            param: &self.param,
        }
    }
}

/// Outcome reported by a message handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MsgStatus {
    /// Message handled; it may be freed
    Consumed,
    /// Message cannot be handled in the current state; keep it for later
    Saved,
}

/// Destination for outgoing kernel messages.
pub trait MessageSink {
    /// Deliver one message
    fn send(&mut self, msg: &KernelMessage<'_>) -> Result<()>;
}

impl<T: MessageSink + ?Sized> MessageSink for &mut T {
    fn send(&mut self, msg: &KernelMessage<'_>) -> Result<()> {
        T::send(self, msg)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owned_message_round_trips_view() {
        let msg = KernelMessage::new(0x0A01, 3, 7, &[1, 2, 3]);
        let owned: OwnedMessage<8> = OwnedMessage::from_message(&msg).unwrap();
        assert_eq!(owned.as_message(), msg);
    }

    #[test]
    fn owned_message_rejects_oversized_param() {
        let msg = KernelMessage::new(1, 2, 3, &[0; 5]);
        let owned: core::result::Result<OwnedMessage<4>, _> = OwnedMessage::from_message(&msg);
        assert_eq!(owned, Err(UsageError::InvalidLength));
    }
}
