//! Continuous Glucose Monitoring server task.
//!
//! The task sits between the application and the GATT controller:
//!
//! ```text
//!   app ── ENABLE_REQ ─────────────▶ cgms (Disabled → Idle)
//!   app ── MEAS_SEND_CMD ──────────▶ cgms ── GATTC_SEND_EVT_CMD ──▶ gattc  (Idle → Busy)
//!   app ◀─ CMP_EVT ──────────────── cgms ◀─ GATTC_CMP_EVT ──────── gattc  (Busy → Idle)
//! ```
//!
//! Only one GATT operation is in flight at a time. Commands arriving while
//! Busy are saved and replayed once the task returns to Idle.

use heapless::Vec;

use crate::kernel::{
    KernelMessage, MessageHandler, MessageId, MsgStatus, StateHandlers, Task, TaskContext, TaskHandlers,
    TaskId,
};

/// Task id of the CGMS server
pub const TASK_CGMS: TaskId = 0x0031;

/// Task id of the GATT controller
pub const TASK_GATTC: TaskId = 0x000C;

const CGMS_FIRST_MSG: MessageId = TASK_CGMS << 8;

/// Enable the service for a connection. Param: `[conn_idx, cfg]`
pub const CGMS_ENABLE_REQ: MessageId = CGMS_FIRST_MSG;
/// Enable response. Param: `[conn_idx, status]`
pub const CGMS_ENABLE_RSP: MessageId = CGMS_FIRST_MSG + 1;
/// Notify a measurement record. Param: encoded record
pub const CGMS_MEAS_SEND_CMD: MessageId = CGMS_FIRST_MSG + 2;
/// Indicate a record access control point response. Param: encoded response
pub const CGMS_RACP_RSP_SEND_CMD: MessageId = CGMS_FIRST_MSG + 3;
/// Operation completed. Param: `[operation, status]`
pub const CGMS_CMP_EVT: MessageId = CGMS_FIRST_MSG + 4;

/// Send notification/indication. Param: `[kind, handle lo, handle hi, value..]`
pub const GATTC_SEND_EVT_CMD: MessageId = 0x0C10;
/// GATT operation completed. Param: `[kind, status]`
pub const GATTC_CMP_EVT: MessageId = 0x0C00;
/// Link lost. Param: `[conn_idx, reason]`
pub const GAPC_DISCONNECT_IND: MessageId = 0x0E01;

/// Measurement notifications enabled in the client configuration
pub const CFG_MEAS_NTF: u8 = 0x01;
/// RACP indications enabled in the client configuration
pub const CFG_RACP_IND: u8 = 0x02;

/// Success
pub const STATUS_OK: u8 = 0x00;
/// Request not allowed in the current state
pub const STATUS_REQUEST_DISALLOWED: u8 = 0x43;
/// Client configuration forbids the operation
pub const STATUS_CCC_DISABLED: u8 = 0x44;
/// Malformed request
pub const STATUS_INVALID_PARAM: u8 = 0x12;

/// GATT event kind: notification
pub const GATT_NOTIFY: u8 = 0x12;
/// GATT event kind: indication
pub const GATT_INDICATE: u8 = 0x13;

/// Attribute handle of the measurement characteristic value
pub const MEAS_VALUE_HANDLE: u16 = 0x0012;
/// Attribute handle of the RACP characteristic value
pub const RACP_VALUE_HANDLE: u16 = 0x0018;

/// Largest measurement or RACP value forwarded to GATT
pub const CGMS_MAX_VALUE_LEN: usize = 20;

/// Postponed-command slots
pub const CGMS_SAVED_MSGS: usize = 4;

// =============================================================================
// State and Environment
// =============================================================================

/// CGMS task states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CgmsState {
    /// No connection has enabled the service
    Disabled,
    /// Ready to send
    Idle,
    /// A GATT operation is in flight
    Busy,
}

/// GATT operation owned by the task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CgmsOperation {
    /// Measurement notification
    MeasurementNotify = 1,
    /// RACP response indication
    RacpIndicate = 2,
}

/// Task environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CgmsEnv {
    /// Task notified of completions
    pub app_task: TaskId,
    /// Connection the service is enabled on
    pub conn_idx: u8,
    /// Client configuration bits (`CFG_*`)
    pub cfg: u8,
    /// Operation in flight
    pub operation: Option<CgmsOperation>,
}

impl CgmsEnv {
    /// Environment reporting to `app_task`
    pub const fn new(app_task: TaskId) -> Self {
        Self {
            app_task,
            conn_idx: 0,
            cfg: 0,
            operation: None,
        }
    }
}

/// CGMS server task
pub type CgmsTask = Task<CgmsState, CgmsEnv, CGMS_SAVED_MSGS, CGMS_MAX_VALUE_LEN>;

/// Create a disabled CGMS task reporting to `app_task`
pub fn cgms_task(app_task: TaskId) -> CgmsTask {
    Task::new(TASK_CGMS, CgmsState::Disabled, CgmsEnv::new(app_task), &CGMS_HANDLERS)
}

type Ctx<'a> = TaskContext<'a, CgmsState, CgmsEnv>;

// =============================================================================
// Handlers
// =============================================================================

fn reply(ctx: &mut Ctx<'_>, id: MessageId, dest: TaskId, param: &[u8]) {
    let src = ctx.task_id();
    if ctx.send(&KernelMessage::new(id, dest, src, param)).is_err() {
        warn!("cgms: msg {} to {} dropped", id, dest);
    }
}

fn complete(ctx: &mut Ctx<'_>, operation: u8, status: u8) {
    let app = ctx.env.app_task;
    reply(ctx, CGMS_CMP_EVT, app, &[operation, status]);
}

fn enable_req(ctx: &mut Ctx<'_>, msg: &KernelMessage<'_>) -> MsgStatus {
    let &[conn_idx, cfg] = msg.param else {
        reply(ctx, CGMS_ENABLE_RSP, msg.src, &[0, STATUS_INVALID_PARAM]);
        return MsgStatus::Consumed;
    };

    ctx.env.conn_idx = conn_idx;
    ctx.env.cfg = cfg;
    ctx.env.app_task = msg.src;
    reply(ctx, CGMS_ENABLE_RSP, msg.src, &[conn_idx, STATUS_OK]);
    ctx.set_state(CgmsState::Idle);
    info!("cgms: enabled on conn {} cfg {}", conn_idx, cfg);
    MsgStatus::Consumed
}

fn enable_disallowed(ctx: &mut Ctx<'_>, msg: &KernelMessage<'_>) -> MsgStatus {
    let conn_idx = msg.param.first().copied().unwrap_or(0);
    reply(ctx, CGMS_ENABLE_RSP, msg.src, &[conn_idx, STATUS_REQUEST_DISALLOWED]);
    MsgStatus::Consumed
}

fn send_disallowed(ctx: &mut Ctx<'_>, msg: &KernelMessage<'_>) -> MsgStatus {
    let operation = operation_for(msg.id);
    complete(ctx, operation as u8, STATUS_REQUEST_DISALLOWED);
    MsgStatus::Consumed
}

fn operation_for(id: MessageId) -> CgmsOperation {
    if id == CGMS_RACP_RSP_SEND_CMD {
        CgmsOperation::RacpIndicate
    } else {
        CgmsOperation::MeasurementNotify
    }
}

fn send_value(ctx: &mut Ctx<'_>, msg: &KernelMessage<'_>) -> MsgStatus {
    let operation = operation_for(msg.id);
    let (required, kind, handle) = match operation {
        CgmsOperation::MeasurementNotify => (CFG_MEAS_NTF, GATT_NOTIFY, MEAS_VALUE_HANDLE),
        CgmsOperation::RacpIndicate => (CFG_RACP_IND, GATT_INDICATE, RACP_VALUE_HANDLE),
    };

    if ctx.env.cfg & required == 0 {
        complete(ctx, operation as u8, STATUS_CCC_DISABLED);
        return MsgStatus::Consumed;
    }

    let mut param: Vec<u8, { 3 + CGMS_MAX_VALUE_LEN }> = Vec::new();
    let [lo, hi] = handle.to_le_bytes();
    if param.extend_from_slice(&[kind, lo, hi]).is_err() || param.extend_from_slice(msg.param).is_err() {
        complete(ctx, operation as u8, STATUS_INVALID_PARAM);
        return MsgStatus::Consumed;
    }

    reply(ctx, GATTC_SEND_EVT_CMD, TASK_GATTC, &param);
    ctx.env.operation = Some(operation);
    ctx.set_state(CgmsState::Busy);
    MsgStatus::Consumed
}

fn postpone(_ctx: &mut Ctx<'_>, _msg: &KernelMessage<'_>) -> MsgStatus {
    MsgStatus::Saved
}

fn gattc_cmp(ctx: &mut Ctx<'_>, msg: &KernelMessage<'_>) -> MsgStatus {
    let status = msg.param.get(1).copied().unwrap_or(STATUS_OK);
    if let Some(operation) = ctx.env.operation.take() {
        complete(ctx, operation as u8, status);
    }
    ctx.set_state(CgmsState::Idle);
    MsgStatus::Consumed
}

fn disconnected(ctx: &mut Ctx<'_>, msg: &KernelMessage<'_>) -> MsgStatus {
    if msg.param.first() == Some(&ctx.env.conn_idx) {
        ctx.env.cfg = 0;
        ctx.env.operation = None;
        ctx.set_state(CgmsState::Disabled);
        debug!("cgms: conn {} lost", ctx.env.conn_idx);
    }
    MsgStatus::Consumed
}

fn ignore(_ctx: &mut Ctx<'_>, _msg: &KernelMessage<'_>) -> MsgStatus {
    MsgStatus::Consumed
}

// =============================================================================
// Handler Tables
// =============================================================================

static DISABLED_HANDLERS: [MessageHandler<CgmsState, CgmsEnv>; 1] =
    [MessageHandler::new(CGMS_ENABLE_REQ, enable_req)];

static IDLE_HANDLERS: [MessageHandler<CgmsState, CgmsEnv>; 2] = [
    MessageHandler::new(CGMS_MEAS_SEND_CMD, send_value),
    MessageHandler::new(CGMS_RACP_RSP_SEND_CMD, send_value),
];

static BUSY_HANDLERS: [MessageHandler<CgmsState, CgmsEnv>; 3] = [
    MessageHandler::new(CGMS_MEAS_SEND_CMD, postpone),
    MessageHandler::new(CGMS_RACP_RSP_SEND_CMD, postpone),
    MessageHandler::new(GATTC_CMP_EVT, gattc_cmp),
];

static STATE_HANDLERS: [StateHandlers<CgmsState, CgmsEnv>; 3] = [
    StateHandlers::new(CgmsState::Disabled, &DISABLED_HANDLERS),
    StateHandlers::new(CgmsState::Idle, &IDLE_HANDLERS),
    StateHandlers::new(CgmsState::Busy, &BUSY_HANDLERS),
];

static DEFAULT_HANDLERS: [MessageHandler<CgmsState, CgmsEnv>; 5] = [
    MessageHandler::new(CGMS_ENABLE_REQ, enable_disallowed),
    MessageHandler::new(CGMS_MEAS_SEND_CMD, send_disallowed),
    MessageHandler::new(CGMS_RACP_RSP_SEND_CMD, send_disallowed),
    MessageHandler::new(GATTC_CMP_EVT, ignore),
    MessageHandler::new(GAPC_DISCONNECT_IND, disconnected),
];

static CGMS_HANDLERS: TaskHandlers<CgmsState, CgmsEnv> =
    TaskHandlers::new(&STATE_HANDLERS, &DEFAULT_HANDLERS);

// =============================================================================
// Unit Tests
// =============================================================================
