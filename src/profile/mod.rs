//! Profile tasks layered on the kernel dispatcher.
//!
//! - [`cgms`] - Continuous Glucose Monitoring server task

pub mod cgms;

pub use cgms::{CgmsEnv, CgmsOperation, CgmsState, CgmsTask, cgms_task};
