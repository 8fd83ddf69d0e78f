//! Drives the whole stack over an in-memory wire.
//!
//! Two hosts, each with a sender, a receiver, and a network interface, are
//! connected by handing frames straight across. The left host streams a
//! message to the right one; the segments with piggybacked acks, the IPv4
//! datagrams, the ARP resolution, and the Ethernet frames all happen
//! exactly as they would on a real link.
//!
//! - cargo run -p riptide --example loopback

use std::net::Ipv4Addr;

use riptide::prelude::*;
use riptide::{EthernetFrame, InternetDatagram};

const TCP_PROTOCOL: u8 = 6;

struct Host {
    ip: Ipv4Addr,
    interface: NetworkInterface,
    sender: TcpSender,
    outbound: ByteStream,
    receiver: TcpReceiver,
    reassembler: Reassembler,
    inbound: ByteStream,
    last_ack_sent: Option<TcpReceiverMessage>,
}

impl Host {
    fn new(ethernet: [u8; 6], ip: Ipv4Addr, isn: u32) -> Self {
        Self {
            ip,
            interface: NetworkInterface::new(ethernet, ip),
            sender: TcpSender::new(1000, Wrap32::new(isn)),
            outbound: ByteStream::new(4096),
            receiver: TcpReceiver::new(),
            reassembler: Reassembler::new(),
            inbound: ByteStream::new(4096),
            last_ack_sent: None,
        }
    }

    /// Wraps pending segments (plus the current ack) into datagrams
    /// addressed to `peer`. When there is no data but the peer is owed a
    /// fresh ack, an empty segment carries it.
    fn pump_outgoing(&mut self, peer: Ipv4Addr) {
        self.sender.push(&mut self.outbound);

        let ack = self.receiver.send(&self.inbound);
        let mut segments = Vec::new();
        while let Some(segment) = self.sender.maybe_send() {
            segments.push(segment);
        }
        if segments.is_empty() && ack.ackno.is_some() && self.last_ack_sent != Some(ack) {
            segments.push(self.sender.send_empty_message());
        }
        if !segments.is_empty() {
            self.last_ack_sent = Some(ack);
        }

        for segment in segments {
            let payload = encode(&ack, &segment);
            let dgram = InternetDatagram::new(self.ip, peer, TCP_PROTOCOL, payload);
            self.interface.send_datagram(dgram, peer);
        }
    }

    /// Handles one frame off the wire.
    fn handle_frame(&mut self, frame: EthernetFrame) {
        let Some(dgram) = self.interface.recv_frame(frame) else {
            return;
        };
        let (ack, segment) = decode(&dgram.payload);
        self.sender.receive(&ack);
        self.receiver
            .receive(segment, &mut self.reassembler, &mut self.inbound);
    }
}

// The wire layout here is a toy: fixed header, no checksum. The stack
// treats transport payloads as opaque, so the demo keeps them trivially
// decodable: ack flag, ackno, window, seqno, syn, fin, then the data.
fn encode(ack: &TcpReceiverMessage, segment: &TcpSenderMessage) -> Vec<u8> {
    let mut out = Vec::with_capacity(13 + segment.payload.len());
    out.push(u8::from(ack.ackno.is_some()));
    out.extend_from_slice(&ack.ackno.unwrap_or_default().raw().to_be_bytes());
    out.extend_from_slice(&ack.window_size.to_be_bytes());
    out.extend_from_slice(&segment.seqno.raw().to_be_bytes());
    out.push(u8::from(segment.syn));
    out.push(u8::from(segment.fin));
    out.extend_from_slice(&segment.payload);
    out
}

fn decode(bytes: &[u8]) -> (TcpReceiverMessage, TcpSenderMessage) {
    let ack = TcpReceiverMessage {
        ackno: (bytes[0] != 0)
            .then(|| Wrap32::new(u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]))),
        window_size: u16::from_be_bytes([bytes[5], bytes[6]]),
    };
    let segment = TcpSenderMessage {
        seqno: Wrap32::new(u32::from_be_bytes([bytes[7], bytes[8], bytes[9], bytes[10]])),
        syn: bytes[11] != 0,
        fin: bytes[12] != 0,
        payload: bytes[13..].to_vec(),
    };
    (ack, segment)
}

fn main() {
    let mut left = Host::new([0x02, 0, 0, 0, 0, 1], Ipv4Addr::new(10, 0, 0, 1), 7);
    let mut right = Host::new([0x02, 0, 0, 0, 0, 2], Ipv4Addr::new(10, 0, 0, 2), 99);

    left.outbound.push(b"riptide says hello across the wire");
    left.outbound.close();

    // Alternate the two hosts until the wire goes quiet. The first round
    // trip is consumed by ARP; after that the segments flow.
    loop {
        let mut quiet = true;
        left.pump_outgoing(right.ip);
        while let Some(frame) = left.interface.maybe_send() {
            quiet = false;
            right.handle_frame(frame);
        }
        right.pump_outgoing(left.ip);
        while let Some(frame) = right.interface.maybe_send() {
            quiet = false;
            left.handle_frame(frame);
        }
        if quiet {
            break;
        }
    }

    let buffered = right.inbound.bytes_buffered();
    let received = right.inbound.read(buffered);
    println!("right host received: {}", String::from_utf8_lossy(&received));
    println!("stream finished: {}", right.inbound.is_finished());
}
