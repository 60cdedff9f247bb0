//! State-aware kernel task dispatcher.
//!
//! A task owns a state value, an environment and two handler tables: one per
//! state and one default table consulted when the state table has no entry
//! for a message id. A handler may answer [`MsgStatus::Saved`] to postpone a
//! message; saved messages are replayed in arrival order whenever the task
//! changes state.
//!
//! # Example
//!
//! ```ignore
//! static IDLE: [MessageHandler<State, Env>; 1] = [MessageHandler::new(START_CMD, on_start)];
//! static STATES: [StateHandlers<State, Env>; 1] = [StateHandlers::new(State::Idle, &IDLE)];
//! static HANDLERS: TaskHandlers<State, Env> = TaskHandlers::new(&STATES, &[]);
//!
//! let mut task: Task<State, Env, 4, 32> = Task::new(MY_TASK, State::Idle, Env::new(), &HANDLERS);
//! task.dispatch(&msg, &mut slave)?;
//! ```

use heapless::Deque;

use super::{KernelMessage, MessageId, MessageSink, MsgStatus, OwnedMessage, TaskId};
use crate::driver::error::{Result, UsageError};

/// Handler signature
pub type HandlerFn<S, C> = fn(&mut TaskContext<'_, S, C>, &KernelMessage<'_>) -> MsgStatus;

/// One entry of a handler table
pub struct MessageHandler<S: 'static, C: 'static> {
    /// Message id served by this entry
    pub id: MessageId,
    /// Handler function
    pub func: HandlerFn<S, C>,
}

impl<S, C> MessageHandler<S, C> {
    /// Create a table entry
    pub const fn new(id: MessageId, func: HandlerFn<S, C>) -> Self {
        Self { id, func }
    }
}

/// Handler table bound to one task state
pub struct StateHandlers<S: 'static, C: 'static> {
    /// State the table applies to
    pub state: S,
    /// Handlers active in that state
    pub handlers: &'static [MessageHandler<S, C>],
}

impl<S, C> StateHandlers<S, C> {
    /// Create a per-state table
    pub const fn new(state: S, handlers: &'static [MessageHandler<S, C>]) -> Self {
        Self { state, handlers }
    }
}

/// Complete handler description of a task
pub struct TaskHandlers<S: 'static, C: 'static> {
    /// Per-state tables
    pub states: &'static [StateHandlers<S, C>],
    /// Fallback table, valid in every state
    pub default: &'static [MessageHandler<S, C>],
}

impl<S, C> TaskHandlers<S, C> {
    /// Create a task description
    pub const fn new(
        states: &'static [StateHandlers<S, C>],
        default: &'static [MessageHandler<S, C>],
    ) -> Self {
        Self { states, default }
    }
}

// =============================================================================
// Handler Context
// =============================================================================

/// View of the task handed to a handler.
pub struct TaskContext<'a, S, C> {
    task_id: TaskId,
    state: S,
    next_state: Option<S>,
    /// Task environment
    pub env: &'a mut C,
    sink: &'a mut dyn MessageSink,
}

impl<S: Copy, C> TaskContext<'_, S, C> {
    /// Id of the running task
    #[inline(always)]
    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// State the message was dispatched in
    #[inline(always)]
    pub fn state(&self) -> S {
        self.state
    }

    /// Request a state change once the handler returns
    pub fn set_state(&mut self, state: S) {
        self.next_state = Some(state);
    }

    /// Send a message on behalf of the task
    pub fn send(&mut self, msg: &KernelMessage<'_>) -> Result<()> {
        self.sink.send(msg)
    }
}

// =============================================================================
// Task
// =============================================================================

/// Kernel task with `SAVED` slots for postponed messages of up to `PARAM`
/// parameter bytes.
pub struct Task<S: 'static, C: 'static, const SAVED: usize, const PARAM: usize> {
    id: TaskId,
    state: S,
    env: C,
    handlers: &'static TaskHandlers<S, C>,
    saved: Deque<OwnedMessage<PARAM>, SAVED>,
    state_changed: bool,
}

impl<S, C, const SAVED: usize, const PARAM: usize> Task<S, C, SAVED, PARAM>
where
    S: Copy + PartialEq,
{
    /// Create a task in its initial state
    pub const fn new(id: TaskId, state: S, env: C, handlers: &'static TaskHandlers<S, C>) -> Self {
        Self {
            id,
            state,
            env,
            handlers,
            saved: Deque::new(),
            state_changed: false,
        }
    }

    /// Task id
    #[inline(always)]
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Current state
    #[inline(always)]
    pub fn state(&self) -> S {
        self.state
    }

    /// Task environment
    #[inline(always)]
    pub fn env(&self) -> &C {
        &self.env
    }

    /// Mutable task environment
    #[inline(always)]
    pub fn env_mut(&mut self) -> &mut C {
        &mut self.env
    }

    /// Number of postponed messages
    #[inline(always)]
    pub fn saved_count(&self) -> usize {
        self.saved.len()
    }

    /// Force a state change from outside a handler, replaying saved messages.
    pub fn set_state(&mut self, state: S, sink: &mut dyn MessageSink) -> Result<()> {
        if state != self.state {
            self.state = state;
            self.state_changed = true;
        }
        self.replay_saved(sink)
    }

    /// Deliver a message to the task.
    ///
    /// Messages without a handler in either table are consumed silently.
    pub fn dispatch(&mut self, msg: &KernelMessage<'_>, sink: &mut dyn MessageSink) -> Result<MsgStatus> {
        let status = self.handle_one(msg, &mut *sink)?;
        self.replay_saved(sink)?;
        Ok(status)
    }

    fn find_handler(&self, id: MessageId) -> Option<HandlerFn<S, C>> {
        let state = self.state;
        self.handlers
            .states
            .iter()
            .filter(|table| table.state == state)
            .flat_map(|table| table.handlers.iter())
            .chain(self.handlers.default.iter())
            .find(|h| h.id == id)
            .map(|h| h.func)
    }

    fn handle_one(&mut self, msg: &KernelMessage<'_>, sink: &mut dyn MessageSink) -> Result<MsgStatus> {
        let Some(func) = self.find_handler(msg.id) else {
            debug!("task {}: no handler for msg {}", self.id, msg.id);
            return Ok(MsgStatus::Consumed);
        };

        let mut ctx = TaskContext {
            task_id: self.id,
            state: self.state,
            next_state: None,
            env: &mut self.env,
            sink,
        };
        let status = func(&mut ctx, msg);
        let next_state = ctx.next_state;

        if status == MsgStatus::Saved {
            let owned = OwnedMessage::from_message(msg)?;
            self.saved
                .push_back(owned)
                .map_err(|_| UsageError::QueueFull)?;
            trace!("task {}: msg {} saved", self.id, msg.id);
        }

        if let Some(next) = next_state
            && next != self.state
        {
            self.state = next;
            self.state_changed = true;
        }
        Ok(status)
    }

    fn replay_saved(&mut self, sink: &mut dyn MessageSink) -> Result<()> {
        while self.state_changed {
            self.state_changed = false;
            for _ in 0..self.saved.len() {
                let Some(msg) = self.saved.pop_front() else {
                    break;
                };
                self.handle_one(&msg.as_message(), &mut *sink)?;
            }
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
