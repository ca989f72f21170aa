//! SSE block reassembly
//!
//! A `data:` line can arrive split across network reads; this buffer only
//! hands out complete blocks, delimited by a blank line.

/// Accumulates raw bytes and yields the `data` payload of each complete SSE
/// event block.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    buf: Vec<u8>,
}

impl SseLineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes from one read; returns the payloads of every block that is
    /// now complete. Blocks without a `data:` line are dropped.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);

        let mut payloads = Vec::new();
        while let Some(end) = block_end(&self.buf) {
            let block: Vec<u8> = self.buf.drain(..end).collect();
            if let Some(payload) = block_payload(&block) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Drain whatever is left at end of stream as a final block.
    pub fn flush(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let block = std::mem::take(&mut self.buf);
        block_payload(&block)
    }
}

/// Index one past the blank-line delimiter of the first complete block, if
/// any. Carriage returns are ignored so `\r\n\r\n` also delimits.
fn block_end(buf: &[u8]) -> Option<usize> {
    let mut at_line_start = false;
    for (i, byte) in buf.iter().enumerate() {
        match byte {
            b'\n' => {
                if at_line_start {
                    return Some(i + 1);
                }
                at_line_start = true;
            }
            b'\r' => {}
            _ => at_line_start = false,
        }
    }
    None
}

/// Join the `data:` lines of a block, per the SSE field rules.
fn block_payload(block: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(block);
    let mut lines = Vec::new();

    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("data:") {
            lines.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_block() {
        let mut buffer = SseLineBuffer::new();
        let payloads = buffer.push(b"data: {\"x\":1}\n\n");
        assert_eq!(payloads, vec!["{\"x\":1}"]);
    }

    #[test]
    fn test_block_split_across_reads() {
        let mut buffer = SseLineBuffer::new();
        assert!(buffer.push(b"data: {\"content\":").is_empty());
        assert!(buffer.push(b" \"Hi\"}").is_empty());
        let payloads = buffer.push(b"\n\n");
        assert_eq!(payloads, vec!["{\"content\": \"Hi\"}"]);
    }

    #[test]
    fn test_multiple_blocks_in_one_read() {
        let mut buffer = SseLineBuffer::new();
        let payloads = buffer.push(b"data: one\n\ndata: two\n\n");
        assert_eq!(payloads, vec!["one", "two"]);
    }

    #[test]
    fn test_crlf_delimiters() {
        let mut buffer = SseLineBuffer::new();
        let payloads = buffer.push(b"data: one\r\n\r\n");
        assert_eq!(payloads, vec!["one"]);
    }

    #[test]
    fn test_comment_only_block_dropped() {
        let mut buffer = SseLineBuffer::new();
        let payloads = buffer.push(b": keep-alive\n\ndata: real\n\n");
        assert_eq!(payloads, vec!["real"]);
    }

    #[test]
    fn test_flush_trailing_block() {
        let mut buffer = SseLineBuffer::new();
        assert!(buffer.push(b"data: [DONE]\n").is_empty());
        assert_eq!(buffer.flush().as_deref(), Some("[DONE]"));
        assert_eq!(buffer.flush(), None);
    }

    #[test]
    fn test_multi_data_lines_joined() {
        let mut buffer = SseLineBuffer::new();
        let payloads = buffer.push(b"data: a\ndata: b\n\n");
        assert_eq!(payloads, vec!["a\nb"]);
    }
}
