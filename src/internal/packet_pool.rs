//! Fixed-slot pool for outgoing packets.
//!
//! Each slot holds one copied-in message. Slots are addressed by a small
//! integer handle; the outgoing FIFO stores handles, not packets. A slot is
//! owned by the queue from `alloc` until the packet is copied into the TX
//! staging buffer and released.

use crate::driver::error::UsageError;

/// Handle to an allocated pool slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PacketHandle(u8);

impl PacketHandle {
    /// Slot index
    #[inline(always)]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy)]
struct Slot<const LEN: usize> {
    data: [u8; LEN],
    len: usize,
    /// Written through the single-slot interface API
    from_interface: bool,
    in_use: bool,
}

impl<const LEN: usize> Slot<LEN> {
    const EMPTY: Self = Self {
        data: [0u8; LEN],
        len: 0,
        from_interface: false,
        in_use: false,
    };
}

/// Pool of `SLOTS` packets of up to `LEN` bytes each.
pub struct PacketPool<const SLOTS: usize, const LEN: usize> {
    slots: [Slot<LEN>; SLOTS],
}

impl<const SLOTS: usize, const LEN: usize> PacketPool<SLOTS, LEN> {
    /// Create a pool with every slot free
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: [Slot::EMPTY; SLOTS],
        }
    }

    /// Copy `data` into a free slot.
    pub fn alloc(&mut self, data: &[u8], from_interface: bool) -> Result<PacketHandle, UsageError> {
        if data.len() > LEN {
            return Err(UsageError::InvalidLength);
        }
        let index = self
            .slots
            .iter()
            .position(|s| !s.in_use)
            .ok_or(UsageError::QueueFull)?;

        let slot = &mut self.slots[index];
        slot.data[..data.len()].copy_from_slice(data);
        slot.len = data.len();
        slot.from_interface = from_interface;
        slot.in_use = true;
        Ok(PacketHandle(index as u8))
    }

    /// Payload of an allocated packet
    pub fn payload(&self, handle: PacketHandle) -> &[u8] {
        let slot = &self.slots[handle.index()];
        &slot.data[..slot.len]
    }

    /// Whether the packet was written through the interface API
    pub fn is_from_interface(&self, handle: PacketHandle) -> bool {
        self.slots[handle.index()].from_interface
    }

    /// Return a slot to the pool
    pub fn release(&mut self, handle: PacketHandle) {
        let slot = &mut self.slots[handle.index()];
        slot.in_use = false;
        slot.len = 0;
        slot.from_interface = false;
    }

    /// Number of slots currently allocated
    pub fn in_use(&self) -> usize {
        self.slots.iter().filter(|s| s.in_use).count()
    }

    /// Free every slot
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            slot.in_use = false;
            slot.len = 0;
            slot.from_interface = false;
        }
    }
}

impl<const SLOTS: usize, const LEN: usize> Default for PacketPool<SLOTS, LEN> {
    fn default() -> Self {
        Self::new()
    }
}
