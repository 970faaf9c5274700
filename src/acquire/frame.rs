use bytes::{BufMut, BytesMut};

/// The ranger terminates each frame with a carriage return.
pub const FRAME_DELIMITER: u8 = b'\r';

/// Accumulates raw serial bytes and splits them into candidate lines.
///
/// Bytes after the last delimiter stay buffered until a later feed
/// completes the frame.
pub struct FrameAssembler {
    buffer: BytesMut,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
        }
    }

    /// Appends `data` and drains every completed frame, decoding each as
    /// UTF-8 with lossy replacement and trimming surrounding whitespace.
    pub fn feed(&mut self, data: &[u8]) -> Vec<String> {
        self.buffer.put_slice(data);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == FRAME_DELIMITER) {
            // Consume the frame and its delimiter exactly once
            let frame = self.buffer.split_to(pos + 1);
            let line = String::from_utf8_lossy(&frame[..pos]).trim().to_string();
            lines.push(line);
        }
        lines
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_without_delimiter_grows_buffer() {
        let mut assembler = FrameAssembler::new();
        let lines = assembler.feed(b"R01");
        assert!(lines.is_empty());
        assert_eq!(assembler.buffered(), 3);

        let lines = assembler.feed(b"23");
        assert!(lines.is_empty());
        assert_eq!(assembler.buffered(), 5);
    }

    #[test]
    fn single_delimiter_yields_one_line_and_keeps_suffix() {
        let mut assembler = FrameAssembler::new();
        let lines = assembler.feed(b"R0123\rR45");
        assert_eq!(lines, vec!["R0123".to_string()]);
        assert_eq!(assembler.buffered(), 3);
    }

    #[test]
    fn multiple_delimiters_yield_lines_in_order() {
        let mut assembler = FrameAssembler::new();
        let lines = assembler.feed(b"garbage\rR0123\r");
        assert_eq!(lines, vec!["garbage".to_string(), "R0123".to_string()]);
        assert_eq!(assembler.buffered(), 0);
    }

    #[test]
    fn split_frame_completes_on_later_feed() {
        let mut assembler = FrameAssembler::new();
        assert!(assembler.feed(b"R01").is_empty());
        let lines = assembler.feed(b"23\r");
        assert_eq!(lines, vec!["R0123".to_string()]);
    }

    #[test]
    fn decoding_is_deterministic_from_fresh_state() {
        let bytes = b"R0001\rnoise\rR0002\r";

        let mut first = FrameAssembler::new();
        let mut second = FrameAssembler::new();
        assert_eq!(first.feed(bytes), second.feed(bytes));
    }

    #[test]
    fn invalid_utf8_is_replaced_not_dropped() {
        let mut assembler = FrameAssembler::new();
        let lines = assembler.feed(b"R0\xff12\r");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0], "R0\u{fffd}12");
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let mut assembler = FrameAssembler::new();
        let lines = assembler.feed(b"  R0123 \n\r");
        assert_eq!(lines, vec!["R0123".to_string()]);
    }
}
