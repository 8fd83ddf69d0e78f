#![warn(missing_docs)]

//! riptide-transport: the reliable byte-stream transport.
//!
//! The pieces compose bottom-up: `Wrap32` translates between the 32-bit
//! wire sequence space and 64-bit stream indices, the `Reassembler` orders
//! arriving substrings into a `ByteStream`, and the `TcpReceiver` /
//! `TcpSender` state machines speak the segment protocol on top of both.
//! Everything is driven by the host: frame arrival, stream reads/writes,
//! and a logical millisecond clock advanced through `tick`.

/// Sender and receiver message types.
pub mod message;
/// Ordering and coalescing of out-of-order substrings.
pub mod reassembler;
/// The receiving half of a connection.
pub mod receiver;
/// The sending half of a connection.
pub mod sender;
/// 32-bit wrapping sequence numbers.
pub mod wrap32;

pub use message::{TcpReceiverMessage, TcpSenderMessage};
pub use reassembler::Reassembler;
pub use receiver::TcpReceiver;
pub use sender::TcpSender;
pub use wrap32::Wrap32;
