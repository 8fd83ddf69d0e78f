//! The sending half of a connection.

use std::collections::{BTreeMap, VecDeque};

use riptide_core::{constants::MAX_PAYLOAD_SIZE, ByteStream, Config};

use crate::{
    message::{TcpReceiverMessage, TcpSenderMessage},
    wrap32::Wrap32,
};

/// Elapsed-time alarm covering the oldest outstanding segment.
///
/// The alarm knows nothing about wall clocks; it accumulates the
/// milliseconds handed to `elapse` and fires once they reach the timeout it
/// was restarted with.
#[derive(Debug)]
struct RetransmissionTimer {
    elapsed: u64,
    timeout: u64,
    running: bool,
}

impl RetransmissionTimer {
    fn new() -> Self {
        Self { elapsed: 0, timeout: u64::MAX, running: false }
    }

    fn restart(&mut self, timeout_ms: u64) {
        self.elapsed = 0;
        self.timeout = timeout_ms;
        self.running = true;
    }

    fn stop(&mut self) {
        self.elapsed = 0;
        self.timeout = u64::MAX;
        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn elapse(&mut self, ms: u64) {
        if self.running {
            self.elapsed += ms;
        }
    }

    fn is_expired(&self) -> bool {
        self.running && self.elapsed >= self.timeout
    }
}

/// Reads from an outbound stream and emits segments the peer's window allows.
///
/// Every emitted segment stays in the outstanding map until an
/// acknowledgment covers its tail. A single timer guards the oldest of
/// them: on expiry that segment is queued again and, unless the peer
/// advertised a zero window, the timeout doubles. Any acknowledgment that
/// makes progress resets the timeout to its initial value.
#[derive(Debug)]
pub struct TcpSender {
    isn: Wrap32,
    initial_rto_ms: u64,
    rto_ms: u64,
    max_payload_size: usize,
    consecutive_retransmissions: u64,
    /// Absolute sequence number of the first byte not yet acknowledged.
    window_left: u64,
    /// Window most recently advertised by the peer. Starts at 1 so the SYN
    /// can go out before any acknowledgment has arrived.
    window_size: u16,
    syn_sent: bool,
    fin_sent: bool,
    /// Unacknowledged segments, keyed by absolute sequence number.
    outstanding: BTreeMap<u64, TcpSenderMessage>,
    send_queue: VecDeque<TcpSenderMessage>,
    timer: RetransmissionTimer,
}

impl TcpSender {
    /// Creates a sender with the given initial timeout and sequence zero point.
    pub fn new(initial_rto_ms: u64, isn: Wrap32) -> Self {
        Self {
            isn,
            initial_rto_ms,
            rto_ms: initial_rto_ms,
            max_payload_size: MAX_PAYLOAD_SIZE,
            consecutive_retransmissions: 0,
            window_left: 0,
            window_size: 1,
            syn_sent: false,
            fin_sent: false,
            outstanding: BTreeMap::new(),
            send_queue: VecDeque::new(),
            timer: RetransmissionTimer::new(),
        }
    }

    /// Creates a sender configured from `config`.
    pub fn with_config(config: &Config, isn: Wrap32) -> Self {
        let mut sender = Self::new(config.initial_rto_ms, isn);
        sender.max_payload_size = config.max_payload_size;
        sender
    }

    /// Absolute sequence number of the next fresh byte (or flag) to send.
    fn next_seqno(&self) -> u64 {
        match self.outstanding.last_key_value() {
            Some((&seqno, message)) => seqno + message.sequence_length(),
            None => self.window_left,
        }
    }

    /// Stamps a segment, records it as outstanding, and queues it for sending.
    fn queue_segment(&mut self, payload: Vec<u8>, syn: bool, fin: bool) {
        let absolute_seqno = self.next_seqno();
        let message = TcpSenderMessage {
            seqno: Wrap32::wrap(absolute_seqno, self.isn),
            syn,
            payload,
            fin,
        };
        self.outstanding.insert(absolute_seqno, message.clone());
        self.send_queue.push_back(message);
    }

    /// Fills the peer's window with bytes drawn from `stream`.
    ///
    /// The first call emits the SYN. A zero advertised window is treated as
    /// one byte so the peer keeps getting probed; the FIN is emitted only
    /// when the stream is finished and the flag itself still fits strictly
    /// inside the window.
    pub fn push(&mut self, stream: &mut ByteStream) {
        if !self.syn_sent {
            self.syn_sent = true;
            let fin = stream.is_finished();
            self.fin_sent = fin;
            self.queue_segment(Vec::new(), true, fin);
        }

        let window_right = self.window_left + u64::from(self.window_size).max(1);
        while !self.fin_sent && self.next_seqno() < window_right {
            let limit = (window_right - self.next_seqno()).min(self.max_payload_size as u64);
            let payload = stream.read(limit as usize);

            let fin = stream.is_finished()
                && self.next_seqno() + payload.len() as u64 + 1 <= window_right;
            if payload.is_empty() && !fin {
                break;
            }

            self.fin_sent = fin;
            self.queue_segment(payload, false, fin);
        }
    }

    /// Pops the next segment awaiting transmission, starting the timer on
    /// the first one out while it is stopped.
    pub fn maybe_send(&mut self) -> Option<TcpSenderMessage> {
        let message = self.send_queue.pop_front()?;
        if !self.timer.is_running() {
            self.timer.restart(self.rto_ms);
        }
        Some(message)
    }

    /// An unsequenced, flagless, empty segment for carrying acknowledgments.
    ///
    /// Not recorded as outstanding and never retransmitted.
    pub fn send_empty_message(&self) -> TcpSenderMessage {
        TcpSenderMessage {
            seqno: Wrap32::wrap(self.next_seqno(), self.isn),
            ..TcpSenderMessage::default()
        }
    }

    /// Acts on an acknowledgment and window update from the peer.
    pub fn receive(&mut self, message: &TcpReceiverMessage) {
        if let Some(ackno) = message.ackno {
            let absolute_ackno = ackno.unwrap(self.isn, self.window_left);

            // Acknowledgments for bytes never sent are ignored.
            if absolute_ackno <= self.next_seqno() {
                let mut progressed = false;
                while let Some((&seqno, segment)) = self.outstanding.first_key_value() {
                    if seqno + segment.sequence_length() > absolute_ackno {
                        break;
                    }
                    self.outstanding.pop_first();
                    progressed = true;
                }

                if progressed {
                    self.window_left = absolute_ackno;
                    self.rto_ms = self.initial_rto_ms;
                    self.consecutive_retransmissions = 0;
                    if self.outstanding.is_empty() {
                        self.timer.stop();
                    } else {
                        self.timer.restart(self.rto_ms);
                    }
                }
            }
        }

        self.window_size = message.window_size;
    }

    /// Advances the logical clock by `ms` milliseconds.
    ///
    /// On expiry the oldest outstanding segment is queued again. The
    /// timeout doubles only when the peer's window is open; a zero-window
    /// probe that goes unanswered is not the network's fault.
    pub fn tick(&mut self, ms: u64) {
        self.timer.elapse(ms);
        if !self.timer.is_expired() {
            return;
        }

        if let Some((&seqno, segment)) = self.outstanding.first_key_value() {
            tracing::debug!(seqno, "retransmission timeout, re-queueing oldest segment");
            self.send_queue.push_back(segment.clone());

            if self.window_size > 0 {
                self.rto_ms *= 2;
                self.consecutive_retransmissions += 1;
            }
        }
        self.timer.restart(self.rto_ms);
    }

    /// How many sequence numbers are outstanding.
    pub fn sequence_numbers_in_flight(&self) -> u64 {
        self.next_seqno() - self.window_left
    }

    /// How many consecutive retransmissions have happened.
    pub fn consecutive_retransmissions(&self) -> u64 {
        self.consecutive_retransmissions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RTO: u64 = 1000;

    fn sender() -> TcpSender {
        TcpSender::new(RTO, Wrap32::new(0))
    }

    fn ack(absolute: u64, window_size: u16) -> TcpReceiverMessage {
        TcpReceiverMessage { ackno: Some(Wrap32::wrap(absolute, Wrap32::new(0))), window_size }
    }

    #[test]
    fn test_first_push_sends_syn() {
        let mut sender = sender();
        let mut stream = ByteStream::new(16);
        stream.push(b"data waits for the window");

        sender.push(&mut stream);
        let message = sender.maybe_send().unwrap();
        assert!(message.syn);
        assert!(!message.fin);
        assert!(message.payload.is_empty());
        assert_eq!(message.seqno, Wrap32::new(0));
        assert_eq!(sender.sequence_numbers_in_flight(), 1);

        // Window of one is consumed by the SYN; nothing else goes out.
        assert!(sender.maybe_send().is_none());
    }

    #[test]
    fn test_syn_fin_on_empty_finished_stream() {
        let mut sender = sender();
        let mut stream = ByteStream::new(16);
        stream.close();

        sender.push(&mut stream);
        let message = sender.maybe_send().unwrap();
        assert!(message.syn && message.fin);
        assert!(message.payload.is_empty());
        assert_eq!(message.seqno, Wrap32::new(0));
        assert_eq!(message.sequence_length(), 2);

        sender.receive(&ack(2, 1));
        assert_eq!(sender.sequence_numbers_in_flight(), 0);

        // Timer is stopped: no amount of time triggers a retransmission.
        sender.tick(100 * RTO);
        assert!(sender.maybe_send().is_none());
        assert_eq!(sender.consecutive_retransmissions(), 0);
    }

    #[test]
    fn test_push_fills_window() {
        let mut sender = sender();
        let mut stream = ByteStream::new(16);
        stream.push(b"abcdefghij");

        sender.push(&mut stream);
        assert!(sender.maybe_send().unwrap().syn);
        sender.receive(&ack(1, 4));

        sender.push(&mut stream);
        let message = sender.maybe_send().unwrap();
        assert_eq!(message.payload, b"abcd");
        assert!(sender.maybe_send().is_none());
        assert_eq!(sender.sequence_numbers_in_flight(), 4);

        sender.receive(&ack(5, 6));
        sender.push(&mut stream);
        assert_eq!(sender.maybe_send().unwrap().payload, b"efghij");
    }

    #[test]
    fn test_payload_split_at_max_segment_size() {
        let mut sender = sender();
        let mut stream = ByteStream::new(4000);
        stream.push(&vec![b'x'; 3000]);

        sender.push(&mut stream);
        assert!(sender.maybe_send().unwrap().syn);
        sender.receive(&ack(1, 65535));

        sender.push(&mut stream);
        assert_eq!(sender.maybe_send().unwrap().payload.len(), MAX_PAYLOAD_SIZE);
        assert_eq!(sender.maybe_send().unwrap().payload.len(), MAX_PAYLOAD_SIZE);
        assert_eq!(
            sender.maybe_send().unwrap().payload.len(),
            3000 - 2 * MAX_PAYLOAD_SIZE
        );
        assert!(sender.maybe_send().is_none());
    }

    #[test]
    fn test_fin_needs_strict_room() {
        let mut sender = sender();
        let mut stream = ByteStream::new(16);
        stream.push(b"abc");
        stream.close();

        sender.push(&mut stream);
        sender.maybe_send();
        // Window exactly covers the payload: FIN must wait.
        sender.receive(&ack(1, 3));
        sender.push(&mut stream);
        let message = sender.maybe_send().unwrap();
        assert_eq!(message.payload, b"abc");
        assert!(!message.fin);

        // One more sequence number makes room for the FIN alone.
        sender.receive(&ack(4, 1));
        sender.push(&mut stream);
        let message = sender.maybe_send().unwrap();
        assert!(message.fin);
        assert!(message.payload.is_empty());
    }

    #[test]
    fn test_fin_rides_last_payload_when_it_fits() {
        let mut sender = sender();
        let mut stream = ByteStream::new(16);
        stream.push(b"abc");
        stream.close();

        sender.push(&mut stream);
        sender.maybe_send();
        sender.receive(&ack(1, 8));

        sender.push(&mut stream);
        let message = sender.maybe_send().unwrap();
        assert_eq!(message.payload, b"abc");
        assert!(message.fin);

        // The stream is spent; nothing further is produced.
        sender.push(&mut stream);
        assert!(sender.maybe_send().is_none());
    }

    #[test]
    fn test_retransmission_backoff_and_reset() {
        let mut sender = sender();
        let mut stream = ByteStream::new(16);

        sender.push(&mut stream);
        assert!(sender.maybe_send().unwrap().syn);

        sender.tick(RTO);
        let retransmit = sender.maybe_send().unwrap();
        assert!(retransmit.syn);
        assert_eq!(sender.consecutive_retransmissions(), 1);

        // Backed off: the doubled timeout has not elapsed yet.
        sender.tick(RTO);
        assert!(sender.maybe_send().is_none());
        sender.tick(RTO);
        assert!(sender.maybe_send().unwrap().syn);
        assert_eq!(sender.consecutive_retransmissions(), 2);

        // Progress resets the timeout to its initial value.
        sender.receive(&ack(1, 4));
        assert_eq!(sender.consecutive_retransmissions(), 0);

        stream.push(b"ab");
        sender.push(&mut stream);
        sender.maybe_send();
        sender.tick(RTO - 1);
        assert!(sender.maybe_send().is_none());
        sender.tick(1);
        assert_eq!(sender.maybe_send().unwrap().payload, b"ab");
    }

    #[test]
    fn test_zero_window_probe_without_backoff() {
        let mut sender = sender();
        let mut stream = ByteStream::new(16);
        stream.push(b"abc");

        sender.push(&mut stream);
        sender.maybe_send();
        sender.receive(&ack(1, 0));

        // Zero window is probed with a single byte.
        sender.push(&mut stream);
        let probe = sender.maybe_send().unwrap();
        assert_eq!(probe.payload, b"a");
        assert_eq!(sender.sequence_numbers_in_flight(), 1);

        // An unanswered probe retransmits without doubling or counting.
        sender.tick(RTO);
        assert_eq!(sender.maybe_send().unwrap().payload, b"a");
        assert_eq!(sender.consecutive_retransmissions(), 0);
        sender.tick(RTO);
        assert_eq!(sender.maybe_send().unwrap().payload, b"a");
    }

    #[test]
    fn test_impossible_ackno_ignored() {
        let mut sender = sender();
        let mut stream = ByteStream::new(16);

        sender.push(&mut stream);
        sender.maybe_send();

        // Acknowledges a byte that was never sent.
        sender.receive(&ack(2, 10));
        assert_eq!(sender.sequence_numbers_in_flight(), 1);

        // The window update is still honored.
        stream.push(b"ab");
        sender.receive(&ack(1, 10));
        sender.push(&mut stream);
        assert_eq!(sender.maybe_send().unwrap().payload, b"ab");
    }

    #[test]
    fn test_partial_ack_keeps_segment_outstanding() {
        let mut sender = sender();
        let mut stream = ByteStream::new(16);
        stream.push(b"abcdef");

        sender.push(&mut stream);
        sender.maybe_send();
        sender.receive(&ack(1, 6));
        sender.push(&mut stream);
        assert_eq!(sender.maybe_send().unwrap().payload, b"abcdef");

        // Covers only part of the segment: nothing is retired.
        sender.receive(&ack(4, 6));
        assert_eq!(sender.sequence_numbers_in_flight(), 6);

        sender.receive(&ack(7, 6));
        assert_eq!(sender.sequence_numbers_in_flight(), 0);
    }

    #[test]
    fn test_in_flight_bounded_by_window() {
        let mut sender = sender();
        let mut stream = ByteStream::new(64);
        stream.push(&[b'z'; 64]);

        sender.push(&mut stream);
        sender.maybe_send();
        sender.receive(&ack(1, 5));

        sender.push(&mut stream);
        sender.push(&mut stream);
        while sender.maybe_send().is_some() {}
        assert!(sender.sequence_numbers_in_flight() <= 5);
    }

    #[test]
    fn test_empty_message_consumes_nothing() {
        let mut sender = sender();
        let mut stream = ByteStream::new(16);

        sender.push(&mut stream);
        sender.maybe_send();

        let before = sender.sequence_numbers_in_flight();
        let empty = sender.send_empty_message();
        assert_eq!(empty.sequence_length(), 0);
        assert_eq!(empty.seqno, Wrap32::new(1));
        assert_eq!(sender.sequence_numbers_in_flight(), before);
    }
}
