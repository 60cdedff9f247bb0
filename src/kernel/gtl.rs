//! GTL (generic transport layer) framing of kernel messages.
//!
//! ```text
//! +------+--------+--------+--------+-----------+-----------------+
//! | 0x05 | id     | dest   | src    | param len | param           |
//! | 1 B  | u16 LE | u16 LE | u16 LE | u16 LE    | param len bytes |
//! +------+--------+--------+--------+-----------+-----------------+
//! ```

use super::KernelMessage;
use crate::driver::error::{ProtocolError, ProtocolResult, UsageError};
use crate::internal::constants::{GTL_HEADER_LEN, GTL_KE_MSG_TYPE};

/// Bytes in front of the parameter block, tag included
pub const GTL_PREFIX_LEN: usize = 1 + GTL_HEADER_LEN;

/// Encoded size of `msg`
#[inline]
pub const fn encoded_len(msg: &KernelMessage<'_>) -> usize {
    GTL_PREFIX_LEN + msg.param.len()
}

/// Encode `msg` into `out`, returning the frame length.
pub fn encode(msg: &KernelMessage<'_>, out: &mut [u8]) -> Result<usize, UsageError> {
    let len = encoded_len(msg);
    if len > out.len() || msg.param.len() > u16::MAX as usize {
        return Err(UsageError::InvalidLength);
    }

    out[0] = GTL_KE_MSG_TYPE;
    out[1..3].copy_from_slice(&msg.id.to_le_bytes());
    out[3..5].copy_from_slice(&msg.dest.to_le_bytes());
    out[5..7].copy_from_slice(&msg.src.to_le_bytes());
    out[7..9].copy_from_slice(&(msg.param.len() as u16).to_le_bytes());
    out[GTL_PREFIX_LEN..len].copy_from_slice(msg.param);
    Ok(len)
}

/// Decode a complete GTL frame.
pub fn decode(frame: &[u8]) -> ProtocolResult<KernelMessage<'_>> {
    if frame.len() < GTL_PREFIX_LEN {
        return Err(ProtocolError::FrameTooShort);
    }
    if frame[0] != GTL_KE_MSG_TYPE {
        return Err(ProtocolError::UnexpectedMessageType);
    }

    let field = |at: usize| u16::from_le_bytes([frame[at], frame[at + 1]]);
    let param_len = field(7) as usize;
    if frame.len() != GTL_PREFIX_LEN + param_len {
        return Err(ProtocolError::FrameLengthMismatch);
    }

    Ok(KernelMessage {
        id: field(1),
        dest: field(3),
        src: field(5),
        param: &frame[GTL_PREFIX_LEN..],
    })
}
