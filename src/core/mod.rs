//! Process control, log tailing, and cycle timing.
//!
//! - `process`: owns the single external client process.
//! - `tailer`: background workers publishing bounded log tails.
//! - `timer`: the rotation countdown.

pub mod process;
pub mod tailer;
pub mod timer;
