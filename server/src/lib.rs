//! Shared Minesweeper sessions: many connections, one board each.
//!
//! [`SessionController`] owns the read-validate-write cycle for every action
//! and fans results out through a [`Broadcaster`]. Durable state lives behind
//! a [`SessionStore`]; [`MemoryStore`] and [`ChannelBroadcaster`] are the
//! in-process implementations.

pub use broadcast::*;
pub use config::*;
pub use controller::*;
pub use error::*;
pub use router::*;
pub use session::*;
pub use store::*;

mod broadcast;
mod config;
mod controller;
mod error;
mod router;
mod session;
mod store;

#[cfg(test)]
mod test_support;
