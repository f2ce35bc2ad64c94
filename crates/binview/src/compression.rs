//! Raw deflate compression and bounded decompression

use crate::error::{BinViewError, BinViewResult};
use flate2::write::DeflateEncoder;
use flate2::{Compression, Decompress, FlushDecompress, Status};
use std::io::{Read, Write};

/// Default maximum inflated size (1 GB)
///
/// Limits decompression output so a small compressed section cannot expand
/// without bound.
pub const MAX_DECOMPRESSION_SIZE: usize = 1024 * 1024 * 1024;

const CHUNK_SIZE: usize = 8192;

/// Compress `data` as a raw deflate stream
pub fn deflate(data: &[u8], level: u32) -> BinViewResult<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::new(level.min(9)));
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Inflate one raw deflate stream read from `source`
///
/// `source` is read to its end at most; a bounded source guarantees no byte
/// past its bound is consumed. Input that ends before the final deflate block
/// is reported as corrupt, never returned as partial output.
pub fn inflate<R: Read + ?Sized>(source: &mut R, limit: usize) -> BinViewResult<Vec<u8>> {
    let mut inflater = Decompress::new(false);
    let mut input = vec![0u8; CHUNK_SIZE];
    let mut chunk = vec![0u8; CHUNK_SIZE];
    let mut output = Vec::new();
    let mut start = 0usize;
    let mut filled = 0usize;
    let mut eof = false;

    loop {
        if start == filled && !eof {
            filled = source.read(&mut input)?;
            start = 0;
            eof = filled == 0;
        }

        let before_in = inflater.total_in();
        let before_out = inflater.total_out();
        let flush = if eof {
            FlushDecompress::Finish
        } else {
            FlushDecompress::None
        };
        let status = inflater
            .decompress(&input[start..filled], &mut chunk, flush)
            .map_err(|e| BinViewError::corrupt(format!("deflate decompression failed: {e}")))?;
        start += (inflater.total_in() - before_in) as usize;
        let produced = (inflater.total_out() - before_out) as usize;

        // Output never holds more than `limit` bytes
        if output.len().saturating_add(produced) > limit {
            return Err(BinViewError::DecompressionLimit { limit });
        }
        output.extend_from_slice(&chunk[..produced]);

        match status {
            Status::StreamEnd => return Ok(output),
            Status::Ok | Status::BufError => {
                let stalled = inflater.total_in() == before_in && produced == 0;
                if eof && start == filled && stalled {
                    return Err(BinViewError::corrupt(
                        "deflate stream ended before its final block",
                    ));
                }
            }
        }
    }
}

/// Inflate an in-memory raw deflate stream
pub fn inflate_slice(data: &[u8], limit: usize) -> BinViewResult<Vec<u8>> {
    let mut source = data;
    inflate(&mut source, limit)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::stream::{MemoryStream, SubRange};

    #[test]
    fn test_round_trip() {
        let data = b"Hello, deflate! Hello, deflate! Hello, deflate!".repeat(20);
        let compressed = deflate(&data, 6).expect("Operation should succeed");
        assert!(compressed.len() < data.len());
        let restored =
            inflate_slice(&compressed, MAX_DECOMPRESSION_SIZE).expect("Operation should succeed");
        assert_eq!(restored, data);
    }

    #[test]
    fn test_empty_payload() {
        let compressed = deflate(&[], 6).expect("Operation should succeed");
        assert!(!compressed.is_empty());
        let restored =
            inflate_slice(&compressed, MAX_DECOMPRESSION_SIZE).expect("Operation should succeed");
        assert!(restored.is_empty());
    }

    #[test]
    fn test_large_random_payload() {
        let mut rng = fastrand::Rng::with_seed(7);
        let mut data = vec![0u8; 200 * 1024];
        rng.fill(&mut data);
        let compressed = deflate(&data, 9).expect("Operation should succeed");
        let restored =
            inflate_slice(&compressed, MAX_DECOMPRESSION_SIZE).expect("Operation should succeed");
        assert_eq!(restored, data);
    }

    #[test]
    fn test_truncated_stream_is_corrupt() {
        let data = vec![42u8; 10_000];
        let mut rng = fastrand::Rng::with_seed(3);
        let mut noisy = data.clone();
        rng.fill(&mut noisy[5000..]);
        let compressed = deflate(&noisy, 6).expect("Operation should succeed");
        let cut = &compressed[..compressed.len() / 2];
        let result = inflate_slice(cut, MAX_DECOMPRESSION_SIZE);
        assert!(matches!(result, Err(BinViewError::CorruptData(_))));
    }

    #[test]
    fn test_garbage_is_corrupt() {
        let result = inflate_slice(&[0xFF; 64], MAX_DECOMPRESSION_SIZE);
        assert!(matches!(result, Err(BinViewError::CorruptData(_))));
    }

    #[test]
    fn test_limit_enforced() {
        let data = vec![0u8; 100_000];
        let compressed = deflate(&data, 6).expect("Operation should succeed");
        let result = inflate_slice(&compressed, 1000);
        assert!(matches!(
            result,
            Err(BinViewError::DecompressionLimit { limit: 1000 })
        ));
    }

    #[test]
    fn test_limit_is_inclusive() {
        let data = vec![9u8; 20_000];
        let compressed = deflate(&data, 6).expect("Operation should succeed");
        let restored = inflate_slice(&compressed, data.len()).expect("Operation should succeed");
        assert_eq!(restored.len(), data.len());

        let result = inflate_slice(&compressed, data.len() - 1);
        assert!(matches!(
            result,
            Err(BinViewError::DecompressionLimit { limit: 19_999 })
        ));
    }

    #[test]
    fn test_bounded_source_stops_at_bound() {
        let compressed = deflate(b"section", 6).expect("Operation should succeed");
        let mut bytes = compressed.clone();
        bytes.extend_from_slice(b"trailing sibling data");
        let mut parent = MemoryStream::from(bytes);
        let mut range = SubRange::new(&mut parent, 0, compressed.len() as u64)
            .expect("Operation should succeed");
        let restored = inflate(&mut range, MAX_DECOMPRESSION_SIZE).expect("Operation should succeed");
        assert_eq!(restored, b"section");
        assert!(range.local_position() <= compressed.len() as u64);
    }
}
