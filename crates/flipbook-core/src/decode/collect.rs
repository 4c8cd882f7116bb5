//! Source stream collection.
//!
//! Decoding does not operate on a still-arriving stream: the whole input is
//! buffered up front, then handed to the header parser and frame decoder as
//! one contiguous byte sequence. There are no partial-result semantics.

use std::io::{ErrorKind, Read};

use super::DecodeError;

/// Chunk size for draining the source stream (16 KiB).
const CHUNK_SIZE: usize = 16 * 1024;

/// Drain `source` to end-of-stream into a single contiguous buffer.
///
/// # Errors
///
/// Returns `DecodeError::Io` if the underlying read fails. Callers at the
/// decode boundary treat that identically to an unparsable header: the decode
/// yields no result.
pub fn collect_bytes<R: Read>(mut source: R) -> Result<Vec<u8>, DecodeError> {
    let mut data = Vec::with_capacity(CHUNK_SIZE);
    let mut chunk = [0u8; CHUNK_SIZE];
    loop {
        match source.read(&mut chunk) {
            Ok(0) => break,
            Ok(read) => data.extend_from_slice(&chunk[..read]),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        }
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use std::io::{self, Cursor, Read};

    use super::*;

    /// Reader that fails partway through, after yielding some bytes.
    struct FlakyReader {
        yielded: bool,
    }

    impl Read for FlakyReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.yielded {
                Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            } else {
                self.yielded = true;
                buf[..4].copy_from_slice(b"GIF8");
                Ok(4)
            }
        }
    }

    /// Reader that hands out data one byte at a time.
    struct TrickleReader {
        data: Vec<u8>,
        pos: usize,
    }

    impl Read for TrickleReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.pos >= self.data.len() {
                return Ok(0);
            }
            buf[0] = self.data[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    #[test]
    fn test_collect_small_source() {
        let collected = collect_bytes(Cursor::new(b"GIF89a".to_vec())).unwrap();
        assert_eq!(collected, b"GIF89a");
    }

    #[test]
    fn test_collect_empty_source() {
        let collected = collect_bytes(Cursor::new(Vec::new())).unwrap();
        assert!(collected.is_empty());
    }

    #[test]
    fn test_collect_spans_multiple_chunks() {
        let source: Vec<u8> = (0..CHUNK_SIZE * 3 + 17).map(|i| (i % 251) as u8).collect();
        let collected = collect_bytes(Cursor::new(source.clone())).unwrap();
        assert_eq!(collected, source);
    }

    #[test]
    fn test_collect_short_reads() {
        let data = b"animated".to_vec();
        let reader = TrickleReader {
            data: data.clone(),
            pos: 0,
        };
        assert_eq!(collect_bytes(reader).unwrap(), data);
    }

    #[test]
    fn test_collect_io_failure_is_error_not_partial() {
        let result = collect_bytes(FlakyReader { yielded: false });
        assert!(matches!(result, Err(DecodeError::Io(_))));
    }
}
