#![warn(missing_docs)]

//! riptide-net: the link layer and the router.
//!
//! A `NetworkInterface` turns outgoing IPv4 datagrams into Ethernet frames,
//! resolving next-hop hardware addresses over ARP and parking datagrams
//! until a reply arrives. A `Router` owns several such interfaces and
//! forwards datagrams between them by longest-prefix match.

/// The Ethernet/ARP interface around an IPv4-capable device.
pub mod interface;
/// Longest-prefix-match forwarding between interfaces.
pub mod router;

pub use interface::{AsyncNetworkInterface, NetworkInterface};
pub use router::Router;
