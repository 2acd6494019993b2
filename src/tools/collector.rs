/// Byte sink with a hard capacity.
///
/// Bytes past the capacity are dropped and the collector remembers that it
/// dropped something. Nothing is ever retained beyond `capacity`.
#[derive(Debug)]
pub struct BoundedCollector {
    buf: Vec<u8>,
    capacity: usize,
    truncated: bool,
}

impl BoundedCollector {
    pub fn new(capacity: usize) -> Self {
        Self { buf: Vec::with_capacity(capacity.min(8192)), capacity, truncated: false }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        if chunk.is_empty() {
            return;
        }
        let room = self.capacity - self.buf.len();
        if room == 0 {
            self.truncated = true;
            return;
        }
        if chunk.len() <= room {
            self.buf.extend_from_slice(chunk);
        } else {
            self.buf.extend_from_slice(&chunk[..room]);
            self.truncated = true;
        }
    }

    pub fn truncated(&self) -> bool {
        self.truncated
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Decodes the retained bytes as UTF-8.
    ///
    /// A truncated buffer is cut back to the last complete codepoint first, so
    /// the cap never manufactures a replacement character. Invalid sequences
    /// produced by the child itself are still replaced lossily.
    pub fn text(&self) -> String {
        let bytes = if self.truncated { trim_partial_tail(&self.buf) } else { &self.buf[..] };
        String::from_utf8_lossy(bytes).into_owned()
    }
}

fn trim_partial_tail(bytes: &[u8]) -> &[u8] {
    match std::str::from_utf8(bytes) {
        Ok(_) => bytes,
        // `error_len() == None` means the input ended inside a codepoint.
        Err(e) if e.error_len().is_none() => &bytes[..e.valid_up_to()],
        Err(_) => {
            // Invalid bytes earlier on; only look at the last (at most 3) bytes.
            let tail_start = bytes.len().saturating_sub(3);
            for cut in (tail_start..bytes.len()).rev() {
                if is_lead_byte(bytes[cut]) {
                    let width = utf8_width(bytes[cut]);
                    if cut + width > bytes.len() {
                        return &bytes[..cut];
                    }
                    break;
                }
            }
            bytes
        }
    }
}

fn is_lead_byte(b: u8) -> bool {
    b & 0xC0 != 0x80
}

fn utf8_width(lead: u8) -> usize {
    match lead {
        0x00..=0x7F => 1,
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        _ => 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_capacity_is_not_truncated() {
        let mut c = BoundedCollector::new(6);
        c.push(b"abc");
        c.push(b"def");
        assert_eq!(c.text(), "abcdef");
        assert!(!c.truncated());
    }

    #[test]
    fn overflow_keeps_leading_bytes() {
        let mut c = BoundedCollector::new(5);
        c.push(b"abc");
        c.push(b"defgh");
        assert_eq!(c.len(), 5);
        assert_eq!(c.text(), "abcde");
        assert!(c.truncated());
    }

    #[test]
    fn push_at_capacity_marks_truncated() {
        let mut c = BoundedCollector::new(2);
        c.push(b"ab");
        assert!(!c.truncated());
        c.push(b"c");
        assert!(c.truncated());
        assert_eq!(c.text(), "ab");
    }

    #[test]
    fn truncation_is_sticky() {
        let mut c = BoundedCollector::new(1);
        c.push(b"xy");
        c.push(b"");
        assert!(c.truncated());
    }

    #[test]
    fn zero_capacity_retains_nothing() {
        let mut c = BoundedCollector::new(0);
        c.push(b"a");
        assert_eq!(c.len(), 0);
        assert!(c.truncated());
    }

    #[test]
    fn cut_codepoint_is_dropped() {
        // "é" is two bytes; the cap lands between them.
        let mut c = BoundedCollector::new(2);
        c.push("aé".as_bytes());
        assert!(c.truncated());
        assert_eq!(c.text(), "a");
    }

    #[test]
    fn cut_codepoint_after_invalid_bytes_is_dropped() {
        let mut c = BoundedCollector::new(4);
        c.push(&[0xFF, b'a', 0xE2, 0x82, 0xAC]);
        assert!(c.truncated());
        assert_eq!(c.text(), "\u{FFFD}a");
    }

    #[test]
    fn untruncated_invalid_bytes_are_replaced() {
        let mut c = BoundedCollector::new(8);
        c.push(&[b'o', b'k', 0xFF]);
        assert_eq!(c.text(), "ok\u{FFFD}");
    }
}
