//! Incremental UTF-8 decoding across chunk boundaries.
//!
//! Network chunks split multi-byte scalars wherever they like. The
//! accumulator decodes every complete sequence as soon as it arrives and
//! holds back at most three trailing bytes that might be the start of a
//! sequence the next chunk finishes. Invalid bytes become U+FFFD rather
//! than failing the whole document.

/// Streaming UTF-8 decoder.
///
/// Feed raw chunks with [`push`](Self::push); take the full text with
/// [`finish`](Self::finish). Between pushes, [`decoded`](Self::decoded)
/// exposes everything decoded so far.
#[derive(Debug, Default)]
pub struct Utf8Accumulator {
    text: String,
    pending: Vec<u8>,
}

impl Utf8Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk, decoding every complete scalar value in it.
    pub fn push(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
        let bytes = std::mem::take(&mut self.pending);
        let boundary = complete_prefix_len(&bytes);
        let (complete, tail) = bytes.split_at(boundary);
        self.text.push_str(&String::from_utf8_lossy(complete));
        self.pending = tail.to_vec();
    }

    /// Text decoded so far, excluding any held-back partial sequence.
    pub fn decoded(&self) -> &str {
        &self.text
    }

    /// Finish the stream. A sequence still in flight at end of input can
    /// never complete, so it decodes to a single U+FFFD.
    pub fn finish(mut self) -> String {
        if !self.pending.is_empty() {
            self.text.push('\u{FFFD}');
        }
        self.text
    }
}

/// Length of the longest prefix ending on a UTF-8 sequence boundary.
///
/// Only the last three bytes can hold the lead of a sequence that is
/// still in flight; anything further back is either complete or invalid,
/// and invalid bytes are decoded (lossily) right away rather than held.
fn complete_prefix_len(bytes: &[u8]) -> usize {
    let len = bytes.len();
    let window = len.min(3);

    for back in 1..=window {
        let idx = len - back;
        let byte = bytes[idx];
        if byte & 0b1100_0000 == 0b1000_0000 {
            // continuation byte, keep scanning backward for its lead
            continue;
        }
        let needed = match byte.leading_ones() {
            0 => 1,
            n @ 2..=4 => n as usize,
            // 0xF8..=0xFF never lead a valid sequence; decode it now and
            // let the lossy pass replace it.
            _ => 1,
        };
        return if needed > back { idx } else { len };
    }

    // No lead in the window: either the tail is orphan continuation
    // bytes (nothing in a later chunk can rescue those) or a complete
    // four-byte sequence ends here. Decode everything.
    len
}
