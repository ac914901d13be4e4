//! Single-connection TCP channel carrying lifecycle markers from the device
//! under test to the observer.
//!
//! There is no length prefix and no acknowledgement. With the default
//! `Framing::PerRead` every socket read is taken to be exactly one marker,
//! so markers that the network splits or coalesces are decoded as free text.

pub mod marker;
pub mod receiver;
pub mod run_log;
pub mod sender;

pub use marker::{Marker, Receipt};
pub use receiver::{Receiver, Session};
pub use run_log::{load_receipts, RunLog};
pub use sender::Sender;
