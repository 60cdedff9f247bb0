//! Built-in vendor command descriptors and debug command handlers.
//!
//! Debug command messages carry the packed HCI opcode as their message id.
//! Every handler answers with a command-complete message addressed back to
//! the sender, whose parameters start with the opcode (little endian) and a
//! status byte.

use heapless::Vec;

use super::{CommandDesc, RestHandler, VENDOR_OGF, opcode};
use crate::kernel::{KernelMessage, MessageId, MessageSink, MsgStatus, TaskId};

/// Task receiving unpacked debug commands
pub const TASK_DBG: TaskId = 0x000A;

/// Task receiving application-level debug commands
pub const TASK_APP: TaskId = 0x0020;

/// Command-complete event message id
pub const HCI_CMD_CMP_EVT: MessageId = 0x0801;

/// Command-complete status: success
pub const STATUS_OK: u8 = 0x00;

/// Command-complete status: invalid parameters
pub const STATUS_INVALID_PARAM: u8 = 0x12;

// Command fields
/// Read memory
pub const OCF_RD_MEM: u16 = 0x001;
/// Write memory
pub const OCF_WR_MEM: u16 = 0x002;
/// Platform reset
pub const OCF_PLF_RESET: u16 = 0x011;
/// Kernel statistics
pub const OCF_RD_KE_STATS: u16 = 0x021;
/// Echo test (user)
pub const OCF_USER_ECHO: u16 = 0x0F0;
/// Firmware version (dialog)
pub const OCF_GET_FW_VERSION: u16 = 0x0F8;
/// Transport loopback toggle (dialog, reserved)
pub const OCF_LOOPBACK: u16 = 0x0F9;

/// Message id of the user echo command
pub const USER_ECHO_CMD: MessageId = opcode(VENDOR_OGF, OCF_USER_ECHO);

/// Message id of the firmware version command
pub const GET_FW_VERSION_CMD: MessageId = opcode(VENDOR_OGF, OCF_GET_FW_VERSION);

/// Message id of the loopback command
pub const LOOPBACK_CMD: MessageId = opcode(VENDOR_OGF, OCF_LOOPBACK);

/// Largest echo payload
pub const ECHO_MAX_LEN: usize = 32;

// =============================================================================
// Descriptor Tables
// =============================================================================

/// Vendor commands served by the stack itself
pub static ROM_VENDOR_COMMANDS: [CommandDesc; 4] = [
    CommandDesc::new(OCF_RD_MEM, TASK_DBG, 6),
    CommandDesc::new(OCF_WR_MEM, TASK_DBG, 134),
    CommandDesc::new(OCF_PLF_RESET, TASK_DBG, 1),
    CommandDesc::new(OCF_RD_KE_STATS, TASK_DBG, 0),
];

/// Vendor commands added by the application
pub static USER_VENDOR_COMMANDS: [CommandDesc; 1] =
    [CommandDesc::new(OCF_USER_ECHO, TASK_APP, ECHO_MAX_LEN as u8)];

/// Vendor commands added by the SDK debug layer
pub static DIALOG_VENDOR_COMMANDS: [CommandDesc; 2] = [
    CommandDesc::new(OCF_GET_FW_VERSION, TASK_APP, 0),
    CommandDesc::new(OCF_LOOPBACK, TASK_APP, 1),
];

/// Handlers for the user commands
pub static USER_HANDLERS: [RestHandler; 1] = [RestHandler::new(USER_ECHO_CMD, user_echo)];

/// Handlers for the dialog commands
pub static DIALOG_HANDLERS: [RestHandler; 2] = [
    RestHandler::new(GET_FW_VERSION_CMD, get_fw_version),
    RestHandler::reserved(LOOPBACK_CMD),
];

// =============================================================================
// Handlers
// =============================================================================

fn complete(msg: &KernelMessage<'_>, status: u8, data: &[u8], sink: &mut dyn MessageSink) {
    let mut param: Vec<u8, { 3 + ECHO_MAX_LEN }> = Vec::new();
    let header = msg.id.to_le_bytes();
    // Header always fits; data is bounded by the callers
    let _ = param.extend_from_slice(&[header[0], header[1], status]);
    let _ = param.extend_from_slice(data);

    let reply = KernelMessage::new(HCI_CMD_CMP_EVT, msg.src, msg.dest, &param);
    if sink.send(&reply).is_err() {
        warn!("hci: completion for {} dropped", msg.id);
    }
}

/// Echo the parameters back to the sender
fn user_echo(msg: &KernelMessage<'_>, sink: &mut dyn MessageSink) -> MsgStatus {
    if msg.param.len() > ECHO_MAX_LEN {
        complete(msg, STATUS_INVALID_PARAM, &[], sink);
    } else {
        complete(msg, STATUS_OK, msg.param, sink);
    }
    MsgStatus::Consumed
}

/// Report the crate version as ASCII
fn get_fw_version(msg: &KernelMessage<'_>, sink: &mut dyn MessageSink) -> MsgStatus {
    let version = env!("CARGO_PKG_VERSION").as_bytes();
    let len = version.len().min(ECHO_MAX_LEN);
    complete(msg, STATUS_OK, &version[..len], sink);
    MsgStatus::Consumed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hci::{CommandRoot, CommandGroup, HCI_GROUP_COUNT, RestDispatcher, VendorCommandTable};
    use crate::testing::RecordingSink;

    #[test]
    fn builtin_tables_fit_default_vendor_table() {
        let mut table: VendorCommandTable<8> = VendorCommandTable::new();
        table
            .initialize(&ROM_VENDOR_COMMANDS, &USER_VENDOR_COMMANDS, &DIALOG_VENDOR_COMMANDS)
            .unwrap();
        assert_eq!(table.entries().len(), 7);

        let mut root = CommandRoot::new([CommandGroup::default(); HCI_GROUP_COUNT]);
        root.install_vendor(&table);
        assert_eq!(root.find_opcode(USER_ECHO_CMD).unwrap().dest, TASK_APP);
        assert_eq!(root.find(VENDOR_OGF, OCF_RD_MEM).unwrap().dest, TASK_DBG);
    }

    #[test]
    fn echo_replies_to_sender() {
        let mut sink = RecordingSink::new();
        let msg = KernelMessage::new(USER_ECHO_CMD, TASK_APP, 0x0033, &[1, 2, 3]);
        let status = RestDispatcher::builtin().handle(&msg, &mut sink);

        assert_eq!(status, MsgStatus::Consumed);
        let reply = &sink.messages[0];
        assert_eq!(reply.id, HCI_CMD_CMP_EVT);
        assert_eq!(reply.dest, 0x0033);
        assert_eq!(reply.src, TASK_APP);
        let [lo, hi] = USER_ECHO_CMD.to_le_bytes();
        assert_eq!(&reply.param[..], &[lo, hi, STATUS_OK, 1, 2, 3]);
    }

    #[test]
    fn oversized_echo_is_rejected() {
        let mut sink = RecordingSink::new();
        let big = [0u8; ECHO_MAX_LEN + 1];
        let msg = KernelMessage::new(USER_ECHO_CMD, TASK_APP, 1, &big);
        RestDispatcher::builtin().handle(&msg, &mut sink);
        assert_eq!(sink.messages[0].param[2], STATUS_INVALID_PARAM);
        assert_eq!(sink.messages[0].param.len(), 3);
    }

    #[test]
    fn version_command_reports_crate_version() {
        let mut sink = RecordingSink::new();
        let msg = KernelMessage::new(GET_FW_VERSION_CMD, TASK_APP, 1, &[]);
        RestDispatcher::builtin().handle(&msg, &mut sink);
        assert_eq!(&sink.messages[0].param[3..], env!("CARGO_PKG_VERSION").as_bytes());
    }

    #[test]
    fn reserved_loopback_is_noop() {
        let mut sink = RecordingSink::new();
        let msg = KernelMessage::new(LOOPBACK_CMD, TASK_APP, 1, &[1]);
        assert_eq!(
            RestDispatcher::builtin().handle(&msg, &mut sink),
            MsgStatus::Consumed
        );
        assert!(sink.messages.is_empty());
    }
}
