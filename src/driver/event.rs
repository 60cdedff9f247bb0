//! Deferred event queue with a re-entrancy guard.
//!
//! Every event that drives the slave state machine goes through
//! [`EventQueue::update`]. The event is always queued first. If a dispatch
//! is already running the call returns immediately; otherwise the queue is
//! drained in FIFO order, including anything raised while handling it. A handler therefore never runs nested
//! inside another handler, and events are processed in the order they were
//! raised.

use heapless::Deque;

use super::error::ProtocolError;
use crate::internal::constants::EVENT_QUEUE_LEN;

/// Events consumed by the slave state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// Master pulled CS low
    CsAsserted,
    /// Master released CS
    CsDeasserted,
    /// The armed RX DMA count was reached
    RxDmaComplete,
    /// An outgoing message was queued while idle
    MessageAdded,
}

/// Consumer of dispatched events.
///
/// Handlers receive the queue so they can raise follow-up events; those are
/// queued behind the current one, never dispatched recursively.
pub trait EventHandler<E: Copy, const N: usize> {
    /// Error produced by the handler
    type Error: From<ProtocolError>;

    /// Process one event
    fn handle(&mut self, event: E, queue: &mut EventQueue<E, N>) -> Result<(), Self::Error>;
}

/// FIFO of deferred events plus the in-progress flag.
pub struct EventQueue<E, const N: usize = EVENT_QUEUE_LEN> {
    pending: Deque<E, N>,
    draining: bool,
}

impl<E: Copy, const N: usize> EventQueue<E, N> {
    /// Create an empty queue
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: Deque::new(),
            draining: false,
        }
    }

    /// Whether a dispatch is currently running
    #[inline(always)]
    pub fn is_draining(&self) -> bool {
        self.draining
    }

    /// Whether events are waiting
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of waiting events
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Queue an event without dispatching it.
    pub fn post(&mut self, event: E) -> Result<(), ProtocolError> {
        self.pending
            .push_back(event)
            .map_err(|_| ProtocolError::EventQueueOverflow)
    }

    /// Dispatch `event`, or queue it if a dispatch is already running.
    ///
    /// `event` joins the back of the queue before anything is dispatched, so
    /// a full queue reports `EventQueueOverflow`. On a handler error the
    /// dispatch stops; events not yet handled stay queued and the guard is
    /// released.
    pub fn update<H>(&mut self, handler: &mut H, event: E) -> Result<(), H::Error>
    where
        H: EventHandler<E, N>,
    {
        self.post(event).map_err(H::Error::from)?;
        if self.draining {
            return Ok(());
        }

        self.draining = true;
        let result = self.dispatch(handler);
        self.draining = false;
        result
    }

    /// Dispatch whatever is queued.
    pub fn drain<H>(&mut self, handler: &mut H) -> Result<(), H::Error>
    where
        H: EventHandler<E, N>,
    {
        if self.draining {
            return Ok(());
        }

        self.draining = true;
        let result = self.dispatch(handler);
        self.draining = false;
        result
    }

    /// Drop every queued event
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    fn dispatch<H>(&mut self, handler: &mut H) -> Result<(), H::Error>
    where
        H: EventHandler<E, N>,
    {
        while let Some(event) = self.pending.pop_front() {
            handler.handle(event, self)?;
        }
        Ok(())
    }
}

impl<E: Copy, const N: usize> Default for EventQueue<E, N> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
