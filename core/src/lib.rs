//! Board engine for shared Minesweeper sessions.
//!
//! Everything here is pure data and pure functions: layouts come out of a
//! [`BoardGenerator`], [`reveal`] and [`toggle_flag`] compute what changes for a
//! single action, and [`BoardState`] validates an action and commits the result.
#![no_std]

extern crate alloc;

#[cfg(test)]
extern crate std;

pub use board::*;
pub use error::*;
pub use flag::*;
pub use generator::*;
pub use reveal::*;
pub use state::*;
pub use types::*;

mod board;
mod error;
mod flag;
mod generator;
mod reveal;
mod state;
mod types;
