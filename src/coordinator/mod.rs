//! Outbound call session coordination
//!
//! The coordinator module is organized into:
//!
//! - **`manager`** - the [`SessionCoordinator`] owning the active slot,
//!   terminal transitions, and the event channel
//! - **`calls`** - call placement and hangup operations
//! - **`poller`** - the recurring status poll task
//! - **`watchdog`** - the session lifetime watchdog
//! - **`timers`** - idempotent stop handles for the two tasks

pub mod calls;
pub mod manager;

mod poller;
mod timers;
mod watchdog;

pub use manager::SessionCoordinator;
