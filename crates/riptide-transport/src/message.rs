//! The two logical message types exchanged by the connection halves.

use crate::wrap32::Wrap32;

/// A segment from the sending half: sequence number, flags, payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TcpSenderMessage {
    /// Sequence number of the first byte (or of the SYN flag itself).
    pub seqno: Wrap32,
    /// Begins the stream; occupies one sequence number.
    pub syn: bool,
    /// The data bytes.
    pub payload: Vec<u8>,
    /// Ends the stream; occupies one sequence number.
    pub fin: bool,
}

impl TcpSenderMessage {
    /// How many sequence numbers the segment occupies.
    pub fn sequence_length(&self) -> u64 {
        self.payload.len() as u64 + u64::from(self.syn) + u64::from(self.fin)
    }
}

/// The receiving half's answer: acknowledgment and flow-control window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TcpReceiverMessage {
    /// Sequence number of the next byte expected; absent before the SYN.
    pub ackno: Option<Wrap32>,
    /// How many more bytes the receiver is willing to buffer.
    pub window_size: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_length_counts_flags() {
        let mut message = TcpSenderMessage {
            seqno: Wrap32::new(0),
            syn: true,
            payload: b"abc".to_vec(),
            fin: true,
        };
        assert_eq!(message.sequence_length(), 5);

        message.syn = false;
        message.fin = false;
        assert_eq!(message.sequence_length(), 3);

        message.payload.clear();
        assert_eq!(message.sequence_length(), 0);
    }
}
