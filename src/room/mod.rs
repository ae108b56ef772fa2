//! The game-room runtime: the state record (C3), the countdown (C4), and
//! the single-threaded actor that owns both and drives the protocol state
//! machine (C5).

pub mod actor;
pub mod outbound;
pub mod state;
pub mod timer;

pub use actor::{RoomCommand, RoomHandle};
pub use outbound::{OutboundRx, OutboundTx};
