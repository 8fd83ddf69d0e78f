//! Ordering and coalescing of out-of-order substrings.

use std::collections::BTreeMap;

use riptide_core::ByteStream;

/// Reassembles substrings arriving at arbitrary stream offsets.
///
/// Pending segments are kept pairwise disjoint in an ordered map keyed by
/// stream index. When two arrivals overlap, the bytes that got there first
/// win; the transport guarantees identical bytes at identical offsets, so
/// the choice is only about avoiding copies. Everything already written to
/// the output stream or outside its acceptance window is discarded on
/// arrival, which bounds pending memory by the stream's spare capacity.
#[derive(Debug, Default)]
pub struct Reassembler {
    /// Disjoint pending segments, keyed by the stream index of their first byte.
    buffer: BTreeMap<u64, Vec<u8>>,
    /// Stream index one past the final byte, once the last substring is seen.
    stream_end: Option<u64>,
    bytes_pending: u64,
}

impl Reassembler {
    /// Creates an empty reassembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts the substring `data` starting at stream index `first_index`.
    ///
    /// Bytes that extend the contiguous prefix are pushed into `output`
    /// immediately; the rest wait in the pending map. When `is_last` is set
    /// the stream length is recorded (even if the data itself is clipped or
    /// already written), and `output` is closed once it has received every
    /// byte up to that length.
    pub fn insert(&mut self, first_index: u64, data: Vec<u8>, is_last: bool, output: &mut ByteStream) {
        if is_last {
            self.stream_end = Some(first_index + data.len() as u64);
        }

        self.buffer_segment(
            output.bytes_pushed(),
            output.available_capacity() as u64,
            first_index,
            data,
        );
        self.flush(output);

        if self.stream_end == Some(output.bytes_pushed()) && !output.is_closed() {
            output.close();
        }
    }

    /// Number of bytes held in the pending map.
    pub fn bytes_pending(&self) -> u64 {
        self.bytes_pending
    }

    /// Clips `data` to the acceptance window and the gaps between existing
    /// segments, then stores whatever is left.
    fn buffer_segment(&mut self, accept_begin: u64, window: u64, first_index: u64, mut data: Vec<u8>) {
        let accept_end = accept_begin + window;
        let end_index = first_index + data.len() as u64;
        if first_index >= accept_end || end_index <= accept_begin {
            return;
        }

        let mut begin = first_index.max(accept_begin);
        let mut end = end_index.min(accept_end);

        // The last stored segment beginning below `end`: if it runs to or
        // past `end`, the tail of the new data is already buffered.
        if let Some((&start, segment)) = self.buffer.range(..end).next_back() {
            if start + segment.len() as u64 >= end {
                end = end.min(start);
            }
        }
        // The last stored segment beginning at or below `begin` may cover
        // the front of the new data.
        if let Some((&start, segment)) = self.buffer.range(..=begin).next_back() {
            begin = begin.max(start + segment.len() as u64);
        }
        if begin >= end {
            return;
        }

        data.truncate((end - first_index) as usize);
        let kept = data.split_off((begin - first_index) as usize);

        // Segments now fully covered by [begin, end) give way to the new one.
        let covered: Vec<u64> = self
            .buffer
            .range(begin + 1..)
            .take_while(|(&start, segment)| start + segment.len() as u64 <= end)
            .map(|(&start, _)| start)
            .collect();
        for start in covered {
            if let Some(segment) = self.buffer.remove(&start) {
                self.bytes_pending -= segment.len() as u64;
            }
        }

        self.bytes_pending += kept.len() as u64;
        self.buffer.insert(begin, kept);
    }

    /// Moves the contiguous prefix starting at the output's write position
    /// out of the pending map and into the stream.
    fn flush(&mut self, output: &mut ByteStream) {
        while let Some(entry) = self.buffer.first_entry() {
            if *entry.key() != output.bytes_pushed() {
                break;
            }
            let segment = entry.remove();
            self.bytes_pending -= segment.len() as u64;
            output.push(&segment);
        }
    }
}
