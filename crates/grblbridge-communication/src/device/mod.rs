//! Device session
//!
//! The command pipeline to the motion controller: the pending-command
//! queue, jog target arithmetic, and the session that owns the serial link
//! and drives dispatch from decoded replies.

pub mod jog;
pub mod queue;
pub mod session;

pub use jog::{plan_jog, JogPlan};
pub use queue::CommandQueue;
pub use session::{DeviceOptions, DeviceSession, GrblDevice};
