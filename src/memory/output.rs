//! Capped output accumulator
//!
//! Every byte a program writes to `stdout` or `stderr` goes through an
//! [`OutputSink`]. The cap is checked on every write, so a program that
//! floods output is stopped at the write that crosses the limit. The
//! retained prefix is clipped on a UTF-8 boundary.

#[derive(Debug, Clone)]
pub struct OutputSink {
    buf: Vec<u8>,
    cap: usize,
    truncated: bool,
}

/// The write that crossed the cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitExceeded;

impl OutputSink {
    pub fn new(cap: usize) -> Self {
        OutputSink {
            buf: Vec::new(),
            cap,
            truncated: false,
        }
    }

    pub fn write(&mut self, bytes: &[u8]) -> Result<(), LimitExceeded> {
        if self.truncated {
            return Err(LimitExceeded);
        }
        let room = self.cap.saturating_sub(self.buf.len());
        if bytes.len() <= room {
            self.buf.extend_from_slice(bytes);
            return Ok(());
        }

        let mut keep = room;
        // Never end on a partial UTF-8 sequence
        while keep > 0 && keep < bytes.len() && is_continuation(bytes[keep]) {
            keep -= 1;
        }
        self.buf.extend_from_slice(&bytes[..keep]);
        self.truncated = true;
        Err(LimitExceeded)
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn truncated(&self) -> bool {
        self.truncated
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn to_text(&self) -> String {
        String::from_utf8_lossy(&self.buf).into_owned()
    }
}

fn is_continuation(byte: u8) -> bool {
    byte & 0b1100_0000 == 0b1000_0000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_under_cap() {
        let mut sink = OutputSink::new(10);
        sink.write(b"hello").unwrap();
        sink.write(b" you").unwrap();
        assert_eq!(sink.to_text(), "hello you");
        assert!(!sink.truncated());
    }

    #[test]
    fn test_cap_clips_and_fails() {
        let mut sink = OutputSink::new(4);
        assert_eq!(sink.write(b"abcdef"), Err(LimitExceeded));
        assert_eq!(sink.to_text(), "abcd");
        assert!(sink.truncated());
        assert_eq!(sink.write(b"x"), Err(LimitExceeded));
    }

    #[test]
    fn test_clip_respects_utf8_boundary() {
        let mut sink = OutputSink::new(4);
        // "aé" is 3 bytes, "é" again would straddle the cap
        assert!(sink.write("aéé".as_bytes()).is_err());
        assert_eq!(sink.to_text(), "aé");
        assert_eq!(sink.len(), 3);
    }
}
