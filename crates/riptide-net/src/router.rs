//! Longest-prefix-match forwarding between interfaces.

use std::net::Ipv4Addr;

use riptide_wire::InternetDatagram;

use crate::interface::AsyncNetworkInterface;

/// One forwarding rule.
///
/// The low `32 - prefix_length` bits of `prefix` are don't-care; a zero
/// `prefix_length` matches every destination.
#[derive(Debug, Clone, Copy)]
struct Route {
    prefix: Ipv4Addr,
    prefix_length: u8,
    /// Address of the next router, or `None` when the network is directly
    /// attached and the datagram's own destination is the next hop.
    next_hop: Option<Ipv4Addr>,
    interface_index: usize,
}

impl Route {
    fn matches(&self, address: Ipv4Addr) -> bool {
        if self.prefix_length == 0 {
            return true;
        }
        let shift = 32 - u32::from(self.prefix_length);
        u32::from(address) >> shift == u32::from(self.prefix) >> shift
    }
}

/// Forwards datagrams between its interfaces by longest-prefix match.
///
/// The route table is an ordered list scanned linearly; among routes of
/// equal prefix length the one added first wins, so forwarding is
/// deterministic for any table.
#[derive(Debug, Default)]
pub struct Router {
    interfaces: Vec<AsyncNetworkInterface>,
    routes: Vec<Route>,
}

impl Router {
    /// Creates a router with no interfaces and no routes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an interface, returning its index for use in routes.
    pub fn add_interface(&mut self, interface: AsyncNetworkInterface) -> usize {
        self.interfaces.push(interface);
        self.interfaces.len() - 1
    }

    /// Access an interface by index.
    pub fn interface(&mut self, index: usize) -> &mut AsyncNetworkInterface {
        &mut self.interfaces[index]
    }

    /// Appends a forwarding rule.
    pub fn add_route(
        &mut self,
        prefix: Ipv4Addr,
        prefix_length: u8,
        next_hop: Option<Ipv4Addr>,
        interface_index: usize,
    ) {
        tracing::debug!(
            %prefix,
            prefix_length,
            ?next_hop,
            interface_index,
            "adding route"
        );
        self.routes.push(Route { prefix, prefix_length, next_hop, interface_index });
    }

    /// Drains every interface's received datagrams and forwards each one.
    pub fn route(&mut self) {
        let mut received = Vec::new();
        for interface in &mut self.interfaces {
            while let Some(dgram) = interface.maybe_receive() {
                received.push(dgram);
            }
        }
        for dgram in received {
            self.route_datagram(dgram);
        }
    }

    fn route_datagram(&mut self, mut dgram: InternetDatagram) {
        // A hop count of one means this hop is the last allowed.
        if dgram.header.ttl <= 1 {
            tracing::debug!(dst = %dgram.header.dst, "dropping datagram with expired TTL");
            return;
        }
        dgram.header.ttl -= 1;
        dgram.header.compute_checksum();

        let dst = dgram.header.dst;
        let mut best: Option<&Route> = None;
        for route in &self.routes {
            if route.matches(dst) && best.map_or(true, |b| route.prefix_length > b.prefix_length) {
                best = Some(route);
            }
        }
        let Some(route) = best else {
            tracing::debug!(%dst, "no matching route, dropping datagram");
            return;
        };

        let next_hop = route.next_hop.unwrap_or(dst);
        let interface_index = route.interface_index;
        self.interfaces[interface_index].send_datagram(dgram, next_hop);
    }
}
