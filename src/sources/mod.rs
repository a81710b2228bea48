//! Concrete byte sources
//!
//! - [`open_device`] reads a serial TTY, FIFO or capture file as it arrives,
//!   without parking reads in a blocking pool
//! - [`ReplaySource`] replays a capture at the pace of the diagnostic line
//! - [`TeeSource`] records every byte another source yields

mod file;
mod replay;
mod tee;

pub use file::{DeviceSource, open_device};
pub use replay::{ReplaySource, XR25_LINE_RATE};
pub use tee::TeeSource;
