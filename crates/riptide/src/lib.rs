#![warn(missing_docs)]

//! Riptide: a small public API facade for the workspace.
//!
//! This crate provides a clean, stable surface that re-exports the pieces
//! a host needs to drive the stack:
//!
//! - Streams and reassembly (`ByteStream`, `Reassembler`)
//! - The transport state machines (`TcpSender`, `TcpReceiver`, messages)
//! - The link layer and routing (`NetworkInterface`, `Router`)
//! - Wire formats (`EthernetFrame`, `ArpMessage`, `InternetDatagram`)
//! - Core configuration (`Config`)
//!
//! The stack never blocks and never consults a wall clock: the host feeds
//! it frames, moves application bytes through the streams, and advances a
//! logical millisecond clock with `tick`.
//!
//! Example
//! ```
//! use riptide::{ByteStream, Reassembler, TcpReceiver, TcpSender, Wrap32};
//!
//! let mut sender = TcpSender::new(1000, Wrap32::new(0));
//! let mut outbound = ByteStream::new(4096);
//! let mut receiver = TcpReceiver::new();
//! let mut reassembler = Reassembler::new();
//! let mut inbound = ByteStream::new(4096);
//!
//! outbound.push(b"hello");
//! outbound.close();
//!
//! // One host-driven exchange: push, drain, deliver, ack.
//! loop {
//!     sender.push(&mut outbound);
//!     let mut quiet = true;
//!     while let Some(segment) = sender.maybe_send() {
//!         quiet = false;
//!         receiver.receive(segment, &mut reassembler, &mut inbound);
//!         sender.receive(&receiver.send(&inbound));
//!     }
//!     if quiet {
//!         break;
//!     }
//! }
//!
//! assert_eq!(inbound.read(5), b"hello");
//! assert!(inbound.is_finished());
//! ```

// Core: configuration, errors, and the byte stream.
pub use riptide_core::{ByteStream, Config, DecodingErrorKind, ErrorKind};
// Transport: sequence numbers, reassembly, and the connection halves.
pub use riptide_transport::{
    Reassembler, TcpReceiver, TcpReceiverMessage, TcpSender, TcpSenderMessage, Wrap32,
};
// Net: the link layer and the router.
pub use riptide_net::{AsyncNetworkInterface, NetworkInterface, Router};
// Wire: the formats the link layer speaks.
pub use riptide_wire::{ArpMessage, EthernetFrame, EthernetHeader, InternetDatagram, Ipv4Header};

/// Convenience prelude with the most commonly used items.
pub mod prelude {
    pub use crate::{
        ByteStream, Config, NetworkInterface, Reassembler, Router, TcpReceiver,
        TcpReceiverMessage, TcpSender, TcpSenderMessage, Wrap32,
    };
}
