//! The receiving half of a connection.

use riptide_core::{constants::MAX_WINDOW_SIZE, ByteStream};

use crate::{
    message::{TcpReceiverMessage, TcpSenderMessage},
    reassembler::Reassembler,
    wrap32::Wrap32,
};

/// Turns sender segments into stream bytes and answers with ack/window.
///
/// Listens until the first SYN fixes the zero point of the sequence space;
/// everything before that is dropped. The receiver holds no stream of its
/// own: the reassembler and output stream are passed in per call, so one
/// receiver can't outlive or entangle the connection that owns it.
#[derive(Debug, Default)]
pub struct TcpReceiver {
    zero_point: Option<Wrap32>,
}

impl TcpReceiver {
    /// Creates a receiver in the listening state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes one segment from the peer's sender.
    pub fn receive(
        &mut self,
        message: TcpSenderMessage,
        reassembler: &mut Reassembler,
        stream: &mut ByteStream,
    ) {
        if message.syn {
            self.zero_point = Some(message.seqno);
        }
        let Some(zero_point) = self.zero_point else {
            return;
        };

        let absolute = message.seqno.unwrap(zero_point, stream.bytes_pushed());
        if absolute == 0 && !message.syn {
            // Claims the SYN's sequence number without carrying it.
            return;
        }
        let first_index = absolute + u64::from(message.syn) - 1;
        reassembler.insert(first_index, message.payload, message.fin, stream);
    }

    /// Produces the message to send back to the peer's sender.
    pub fn send(&self, stream: &ByteStream) -> TcpReceiverMessage {
        let ackno = self.zero_point.map(|zero_point| {
            // One past the data: the SYN, plus the FIN once the stream ends.
            let absolute = stream.bytes_pushed() + 1 + u64::from(stream.is_closed());
            Wrap32::wrap(absolute, zero_point)
        });

        TcpReceiverMessage {
            ackno,
            window_size: stream.available_capacity().min(MAX_WINDOW_SIZE as usize) as u16,
        }
    }
}
