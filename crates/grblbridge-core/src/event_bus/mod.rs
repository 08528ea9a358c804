//! Device event bus
//!
//! Broadcasts decoded and derived device events identically to every
//! registered subscriber. There is no per-subscriber filtering or
//! differencing, and the bus does not detect subscriber liveness;
//! unregistering on disconnect is the subscriber's responsibility.

mod bus;
mod events;

pub use bus::{EventBus, SubscriptionId};
pub use events::{ConsoleMode, DeviceEvent, MachineStateEvent};
