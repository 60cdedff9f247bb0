//! HCI vendor command tables and debug command dispatch.
//!
//! Two independent mechanisms live here:
//!
//! - [`VendorCommandTable`] concatenates the built-in vendor command
//!   descriptors with the user and dialog debug descriptors, and
//!   [`CommandRoot`] points its vendor group slot at the result so that
//!   opcode lookups see all three.
//! - [`RestDispatcher`] routes debug command messages to the first matching
//!   handler of the user table, then of the dialog table.
//!
//! The concrete tables shipped with the crate are in [`commands`].

pub mod commands;

use heapless::Vec;

use crate::driver::error::{ConfigError, ConfigResult};
use crate::kernel::{KernelMessage, MessageId, MessageSink, MsgStatus, TaskId};

/// Number of HCI command groups in the root table
pub const HCI_GROUP_COUNT: usize = 6;

/// Slot of the vendor-specific group in the root table
pub const VENDOR_GROUP_INDEX: usize = 5;

/// OGF of vendor-specific commands
pub const VENDOR_OGF: u8 = 0x3F;

/// Build a 16-bit HCI opcode from group and command fields
#[inline(always)]
pub const fn opcode(ogf: u8, ocf: u16) -> u16 {
    ((ogf as u16) << 10) | (ocf & 0x03FF)
}

// =============================================================================
// Command Descriptors
// =============================================================================

/// Static description of one HCI command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CommandDesc {
    /// Command field of the opcode
    pub ocf: u16,
    /// Task the unpacked command is forwarded to
    pub dest: TaskId,
    /// Largest accepted parameter block
    pub max_param_len: u8,
}

impl CommandDesc {
    /// Create a descriptor
    pub const fn new(ocf: u16, dest: TaskId, max_param_len: u8) -> Self {
        Self {
            ocf,
            dest,
            max_param_len,
        }
    }
}

/// RAM copy of every vendor command descriptor, built once at start-up.
#[derive(Debug, Default)]
pub struct VendorCommandTable<const N: usize> {
    entries: Vec<CommandDesc, N>,
}

impl<const N: usize> VendorCommandTable<N> {
    /// Create an empty table
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Replace the contents with `rom`, then `user`, then `dialog`.
    ///
    /// On overflow the table is left empty.
    pub fn initialize(
        &mut self,
        rom: &[CommandDesc],
        user: &[CommandDesc],
        dialog: &[CommandDesc],
    ) -> ConfigResult<()> {
        self.entries.clear();
        let result = [rom, user, dialog]
            .into_iter()
            .try_for_each(|part| self.entries.extend_from_slice(part));
        if result.is_err() {
            self.entries.clear();
            return Err(ConfigError::TableCapacityExceeded);
        }
        debug!(
            "hci: vendor table {} rom + {} user + {} dialog",
            rom.len(),
            user.len(),
            dialog.len()
        );
        Ok(())
    }

    /// All descriptors in lookup order
    #[inline(always)]
    pub fn entries(&self) -> &[CommandDesc] {
        &self.entries
    }

    /// First descriptor with the given command field
    pub fn find(&self, ocf: u16) -> Option<&CommandDesc> {
        self.entries.iter().find(|d| d.ocf == ocf)
    }
}

/// One group of the root table
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandGroup<'a> {
    /// Opcode group field
    pub ogf: u8,
    /// Commands of the group
    pub commands: &'a [CommandDesc],
}

/// Root of the command-descriptor lookup.
#[derive(Debug, Clone, Copy)]
pub struct CommandRoot<'a> {
    groups: [CommandGroup<'a>; HCI_GROUP_COUNT],
}

impl<'a> CommandRoot<'a> {
    /// Create a root from its groups
    pub const fn new(groups: [CommandGroup<'a>; HCI_GROUP_COUNT]) -> Self {
        Self { groups }
    }

    /// Point the vendor slot at a concatenated vendor table
    pub fn install_vendor<const N: usize>(&mut self, table: &'a VendorCommandTable<N>) {
        self.groups[VENDOR_GROUP_INDEX] = CommandGroup {
            ogf: VENDOR_OGF,
            commands: table.entries(),
        };
    }

    /// Group stored in a slot
    pub fn group(&self, index: usize) -> Option<&CommandGroup<'a>> {
        self.groups.get(index)
    }

    /// Descriptor for an opcode, if any group knows it
    pub fn find(&self, ogf: u8, ocf: u16) -> Option<&CommandDesc> {
        self.groups
            .iter()
            .filter(|g| g.ogf == ogf)
            .flat_map(|g| g.commands.iter())
            .find(|d| d.ocf == ocf)
    }

    /// Descriptor for a packed 16-bit opcode
    pub fn find_opcode(&self, opcode: u16) -> Option<&CommandDesc> {
        self.find((opcode >> 10) as u8, opcode & 0x03FF)
    }
}

// =============================================================================
// Debug Command Dispatch
// =============================================================================

/// Debug command handler
pub type CommandHandler = fn(&KernelMessage<'_>, &mut dyn MessageSink) -> MsgStatus;

/// Entry of a debug handler table
#[derive(Clone, Copy)]
pub struct RestHandler {
    /// Message id served
    pub id: MessageId,
    /// Handler, or `None` for a reserved slot
    pub handler: Option<CommandHandler>,
}

impl RestHandler {
    /// Create a table entry
    pub const fn new(id: MessageId, handler: CommandHandler) -> Self {
        Self {
            id,
            handler: Some(handler),
        }
    }

    /// Reserved slot that never matches
    pub const fn reserved(id: MessageId) -> Self {
        Self { id, handler: None }
    }
}

/// Two-level static dispatcher for debug commands.
///
/// Entries are keyed on the message id of the command, not on the sending
/// task. The source and destination task ids are passed through untouched
/// so a handler can address its reply back to the sender.
#[derive(Clone, Copy)]
pub struct RestDispatcher<'a> {
    user: &'a [RestHandler],
    dialog: &'a [RestHandler],
}

impl RestDispatcher<'static> {
    /// Dispatcher over the tables in [`commands`]
    pub fn builtin() -> Self {
        Self::new(&commands::USER_HANDLERS, &commands::DIALOG_HANDLERS)
    }
}

impl<'a> RestDispatcher<'a> {
    /// Create a dispatcher over the user and dialog tables
    pub const fn new(user: &'a [RestHandler], dialog: &'a [RestHandler]) -> Self {
        Self { user, dialog }
    }

    /// Run the first matching handler; unmatched messages are consumed.
    pub fn handle(&self, msg: &KernelMessage<'_>, sink: &mut dyn MessageSink) -> MsgStatus {
        let handler = self
            .user
            .iter()
            .chain(self.dialog.iter())
            .filter(|entry| entry.id == msg.id)
            .find_map(|entry| entry.handler);

        match handler {
            Some(handler) => handler(msg, sink),
            None => {
                trace!("hci: no debug handler for msg {}", msg.id);
                MsgStatus::Consumed
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
