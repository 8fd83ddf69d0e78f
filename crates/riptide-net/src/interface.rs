//! The Ethernet/ARP interface around an IPv4-capable device.

use std::collections::{HashMap, VecDeque};
use std::net::Ipv4Addr;

use riptide_core::Config;
use riptide_wire::{
    ArpMessage, EthernetAddress, EthernetFrame, EthernetHeader, InternetDatagram,
    ETHERNET_BROADCAST, ETHERTYPE_ARP, ETHERTYPE_IPV4, OPCODE_REQUEST,
};

/// A learned IPv4-to-Ethernet mapping and when it stops being trusted.
#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    ethernet_address: EthernetAddress,
    expires_at_ms: u64,
}

/// Connects the internet layer to an Ethernet link.
///
/// Outgoing datagrams whose next hop is not yet in the address cache are
/// parked per target, and a single broadcast ARP request goes out; further
/// sends to the same target stay quiet until that request expires, so a
/// burst of traffic to an unresolved neighbor cannot become an ARP storm.
/// Arriving frames are filtered by destination, then dispatched by
/// EtherType: IPv4 payloads go up the stack, ARP payloads teach the cache
/// and flush whatever was parked.
///
/// Time is a millisecond counter advanced through [`tick`](Self::tick);
/// expiries are absolute values of that counter.
#[derive(Debug)]
pub struct NetworkInterface {
    ethernet_address: EthernetAddress,
    ip_address: Ipv4Addr,
    /// Milliseconds since the interface came up.
    clock_ms: u64,
    address_cache: HashMap<Ipv4Addr, CacheEntry>,
    /// Expiry of the one in-flight ARP request per target.
    arp_requests_in_flight: HashMap<Ipv4Addr, u64>,
    /// Datagrams parked until their next hop resolves.
    pending_datagrams: HashMap<Ipv4Addr, VecDeque<InternetDatagram>>,
    frames_out: VecDeque<EthernetFrame>,
    arp_request_timeout_ms: u64,
    address_cache_ttl_ms: u64,
    pending_queue_limit: usize,
}

impl NetworkInterface {
    /// Creates an interface with the given hardware and protocol addresses.
    pub fn new(ethernet_address: EthernetAddress, ip_address: Ipv4Addr) -> Self {
        Self::with_config(ethernet_address, ip_address, &Config::default())
    }

    /// Creates an interface with timeouts and limits taken from `config`.
    pub fn with_config(
        ethernet_address: EthernetAddress,
        ip_address: Ipv4Addr,
        config: &Config,
    ) -> Self {
        // The interface always knows its own mapping.
        let mut address_cache = HashMap::new();
        address_cache
            .insert(ip_address, CacheEntry { ethernet_address, expires_at_ms: u64::MAX });

        Self {
            ethernet_address,
            ip_address,
            clock_ms: 0,
            address_cache,
            arp_requests_in_flight: HashMap::new(),
            pending_datagrams: HashMap::new(),
            frames_out: VecDeque::new(),
            arp_request_timeout_ms: config.arp_request_timeout_ms,
            address_cache_ttl_ms: config.address_cache_ttl_ms,
            pending_queue_limit: config.pending_queue_limit,
        }
    }

    /// The interface's Ethernet address.
    pub fn ethernet_address(&self) -> EthernetAddress {
        self.ethernet_address
    }

    /// The interface's IPv4 address.
    pub fn ip_address(&self) -> Ipv4Addr {
        self.ip_address
    }

    fn push_frame(&mut self, ethertype: u16, payload: Vec<u8>, dst: EthernetAddress) {
        self.frames_out.push_back(EthernetFrame {
            header: EthernetHeader { dst, src: self.ethernet_address, ethertype },
            payload,
        });
    }

    fn push_datagram_frame(&mut self, dgram: &InternetDatagram, dst: EthernetAddress) {
        self.push_frame(ETHERTYPE_IPV4, dgram.encode(), dst);
    }

    fn push_arp_request(&mut self, target: Ipv4Addr) {
        let message = ArpMessage::request(self.ethernet_address, self.ip_address, target);
        self.arp_requests_in_flight
            .insert(target, self.clock_ms + self.arp_request_timeout_ms);
        self.push_frame(ETHERTYPE_ARP, message.encode(), ETHERNET_BROADCAST);
    }

    /// Sends `dgram` toward `next_hop`, resolving its Ethernet address first
    /// if necessary.
    pub fn send_datagram(&mut self, dgram: InternetDatagram, next_hop: Ipv4Addr) {
        if let Some(entry) = self.address_cache.get(&next_hop) {
            let dst = entry.ethernet_address;
            self.push_datagram_frame(&dgram, dst);
            return;
        }

        let queue = self.pending_datagrams.entry(next_hop).or_default();
        if queue.len() < self.pending_queue_limit {
            queue.push_back(dgram);
        } else {
            tracing::warn!(%next_hop, "pending queue full, dropping datagram");
        }

        let request_due = match self.arp_requests_in_flight.get(&next_hop) {
            Some(&expires_at_ms) => self.clock_ms >= expires_at_ms,
            None => true,
        };
        if request_due {
            self.push_arp_request(next_hop);
        }
    }

    /// Accepts one Ethernet frame, returning the IPv4 datagram it carried,
    /// if any.
    ///
    /// Frames addressed to neither this interface nor the broadcast address
    /// are dropped, as is anything that fails to parse.
    pub fn recv_frame(&mut self, frame: EthernetFrame) -> Option<InternetDatagram> {
        if frame.header.dst != self.ethernet_address && frame.header.dst != ETHERNET_BROADCAST {
            return None;
        }

        match frame.header.ethertype {
            ETHERTYPE_IPV4 => match InternetDatagram::parse(&frame.payload) {
                Ok(dgram) => Some(dgram),
                Err(error) => {
                    tracing::debug!(%error, "dropping unparsable IPv4 payload");
                    None
                }
            },
            ETHERTYPE_ARP => {
                self.handle_arp(&frame.payload);
                None
            }
            _ => None,
        }
    }

    fn handle_arp(&mut self, payload: &[u8]) {
        let message = match ArpMessage::parse(payload) {
            Ok(message) => message,
            Err(error) => {
                tracing::debug!(%error, "dropping unparsable ARP payload");
                return;
            }
        };

        // Requests and replies both teach us the sender's mapping.
        let sender_ip = message.sender_ip_address;
        let sender_ethernet = message.sender_ethernet_address;
        self.address_cache.insert(
            sender_ip,
            CacheEntry {
                ethernet_address: sender_ethernet,
                expires_at_ms: self.clock_ms + self.address_cache_ttl_ms,
            },
        );
        self.arp_requests_in_flight.remove(&sender_ip);

        if let Some(mut queue) = self.pending_datagrams.remove(&sender_ip) {
            while let Some(dgram) = queue.pop_front() {
                self.push_datagram_frame(&dgram, sender_ethernet);
            }
        }

        // Answer only for our own address; the cache speaks for nobody else.
        if message.opcode == OPCODE_REQUEST && message.target_ip_address == self.ip_address {
            let reply =
                ArpMessage::reply(self.ethernet_address, self.ip_address, sender_ethernet, sender_ip);
            self.push_frame(ETHERTYPE_ARP, reply.encode(), sender_ethernet);
        }
    }

    /// Advances the interface clock by `ms` milliseconds, evicting expired
    /// cache entries and request markers.
    pub fn tick(&mut self, ms: u64) {
        self.clock_ms += ms;
        let now = self.clock_ms;
        self.address_cache.retain(|_, entry| now < entry.expires_at_ms);
        self.arp_requests_in_flight.retain(|_, expires_at_ms| now < *expires_at_ms);
    }

    /// Pops the next Ethernet frame awaiting transmission.
    pub fn maybe_send(&mut self) -> Option<EthernetFrame> {
        self.frames_out.pop_front()
    }
}

/// A `NetworkInterface` whose received datagrams are held for later.
///
/// Instead of handing each arriving datagram back from `recv_frame`, this
/// wrapper parks them in an inbound queue that the owner drains with
/// [`maybe_receive`](Self::maybe_receive). A router wants this shape when
/// it services many interfaces in one pass.
#[derive(Debug)]
pub struct AsyncNetworkInterface {
    interface: NetworkInterface,
    datagrams_in: VecDeque<InternetDatagram>,
}

impl AsyncNetworkInterface {
    /// Wraps an already-constructed interface.
    pub fn new(interface: NetworkInterface) -> Self {
        Self { interface, datagrams_in: VecDeque::new() }
    }

    /// The wrapped interface's Ethernet address.
    pub fn ethernet_address(&self) -> EthernetAddress {
        self.interface.ethernet_address()
    }

    /// The wrapped interface's IPv4 address.
    pub fn ip_address(&self) -> Ipv4Addr {
        self.interface.ip_address()
    }

    /// See [`NetworkInterface::send_datagram`].
    pub fn send_datagram(&mut self, dgram: InternetDatagram, next_hop: Ipv4Addr) {
        self.interface.send_datagram(dgram, next_hop);
    }

    /// Accepts one Ethernet frame; any datagram it carried joins the
    /// inbound queue.
    pub fn recv_frame(&mut self, frame: EthernetFrame) {
        if let Some(dgram) = self.interface.recv_frame(frame) {
            self.datagrams_in.push_back(dgram);
        }
    }

    /// Pops the next received datagram.
    pub fn maybe_receive(&mut self) -> Option<InternetDatagram> {
        self.datagrams_in.pop_front()
    }

    /// See [`NetworkInterface::maybe_send`].
    pub fn maybe_send(&mut self) -> Option<EthernetFrame> {
        self.interface.maybe_send()
    }

    /// See [`NetworkInterface::tick`].
    pub fn tick(&mut self, ms: u64) {
        self.interface.tick(ms);
    }
}

impl From<NetworkInterface> for AsyncNetworkInterface {
    fn from(interface: NetworkInterface) -> Self {
        Self::new(interface)
    }
}
