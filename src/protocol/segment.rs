//! Splitting message text into header-sized segments.
//!
//! Segments are zero-copy slices of the message (`bytes::Bytes`). A cut
//! never lands inside a UTF-8 sequence: it backs off to the previous
//! character boundary, so a segment may be a few bytes short of the budget.

use std::borrow::Cow;

use bytes::Bytes;

use super::wire_format::{CONTINUATION, SEPARATOR};

/// One segment of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    chunk: Bytes,
    /// Byte length of the whole message, carried by the first segment.
    total: Option<usize>,
    /// Whether more segments follow.
    continued: bool,
}

impl Segment {
    /// The message bytes in this segment.
    #[inline]
    pub fn chunk(&self) -> &[u8] {
        &self.chunk
    }

    #[inline]
    pub fn is_continued(&self) -> bool {
        self.continued
    }

    /// Header value for this segment.
    ///
    /// | Position        | Value                  |
    /// |-----------------|------------------------|
    /// | only            | `<len>\|<chunk>\|`     |
    /// | first of many   | `<total>\|<chunk>\|\`  |
    /// | middle          | `\|<chunk>\|\`         |
    /// | last            | `\|<chunk>\|`          |
    pub fn header_value(&self) -> String {
        let text: Cow<'_, str> = String::from_utf8_lossy(&self.chunk);
        let mut out = String::with_capacity(text.len() + 8);
        if let Some(total) = self.total {
            out.push_str(&total.to_string());
        }
        out.push(SEPARATOR);
        out.push_str(&text);
        out.push(SEPARATOR);
        if self.continued {
            out.push(CONTINUATION);
        }
        out
    }
}

/// Split `message` into segments of at most `budget` bytes.
///
/// An empty message yields a single empty segment.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use wildfire_client::protocol::split;
///
/// let segments = split(Bytes::from_static(b"abcdefg"), 3);
/// let values: Vec<String> = segments.iter().map(|s| s.header_value()).collect();
/// assert_eq!(values, vec!["7|abc|\\", "|def|\\", "|g|"]);
/// ```
pub fn split(message: Bytes, budget: usize) -> Vec<Segment> {
    let total = message.len();
    let budget = budget.max(1);

    let mut bounds = Vec::with_capacity(total / budget + 1);
    let mut start = 0;
    while start < total {
        let mut end = (start + budget).min(total);
        while end < total && end > start && is_continuation(message[end]) {
            end -= 1;
        }
        if end == start {
            // budget narrower than one character
            end = start + 1;
            while end < total && is_continuation(message[end]) {
                end += 1;
            }
        }
        bounds.push((start, end));
        start = end;
    }

    if bounds.is_empty() {
        return vec![Segment {
            chunk: message,
            total: Some(0),
            continued: false,
        }];
    }

    let count = bounds.len();
    bounds
        .into_iter()
        .enumerate()
        .map(|(i, (from, to))| Segment {
            chunk: message.slice(from..to),
            total: (i == 0).then_some(total),
            continued: i + 1 < count,
        })
        .collect()
}

#[inline]
fn is_continuation(b: u8) -> bool {
    b & 0xC0 == 0x80
}
