//! Shared helpers for round-trip tests

use crate::ViewFormat;
use crate::error::BinViewResult;
use crate::reader::BinaryViewReader;
use crate::stream::MemoryStream;
use crate::writer::BinaryViewWriter;
use std::fmt::Debug;

/// Deterministic pseudo-random bytes
pub fn seeded_bytes(seed: u64, len: usize) -> Vec<u8> {
    let mut rng = fastrand::Rng::with_seed(seed);
    let mut data = vec![0u8; len];
    rng.fill(&mut data);
    data
}

/// Write with `write`, read the bytes back with `read`
///
/// Returns what `read` produced along with the written bytes.
pub fn round_trip<T, W, R>(write: W, read: R) -> BinViewResult<(T, Vec<u8>)>
where
    W: FnOnce(&mut BinaryViewWriter<MemoryStream>) -> BinViewResult<()>,
    R: FnOnce(&mut BinaryViewReader<MemoryStream>) -> BinViewResult<T>,
{
    let mut writer = BinaryViewWriter::in_memory();
    write(&mut writer)?;
    let bytes = writer.into_bytes()?;

    let mut reader = BinaryViewReader::from_bytes(bytes.clone());
    let value = read(&mut reader)?;
    Ok((value, bytes))
}

/// Encode a record, decode it again and compare
pub fn test_round_trip<T>(original: &T) -> Result<(), Box<dyn std::error::Error>>
where
    T: ViewFormat + PartialEq + Debug,
{
    let data = original.to_bytes()?;
    let parsed = T::from_bytes(&data)?;

    if original != &parsed {
        return Err(format!(
            "Round-trip verification failed:\nOriginal: {:?}\nParsed: {:?}",
            original, parsed
        )
        .into());
    }

    T::verify_round_trip(&data)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::PayloadSerializer;
    use crate::error::BinViewError;
    use std::io::{Read, Seek, Write};

    #[derive(Debug, PartialEq)]
    struct Tagged {
        id: u32,
        name: String,
    }

    impl ViewFormat for Tagged {
        fn write_to<S: Write + Seek, Z: PayloadSerializer>(
            &self,
            writer: &mut BinaryViewWriter<S, Z>,
        ) -> BinViewResult<()> {
            writer.write_u32(self.id)?;
            writer.write_string(&self.name)
        }

        fn read_from<S: Read + Seek, Z: PayloadSerializer>(
            reader: &mut BinaryViewReader<S, Z>,
        ) -> BinViewResult<Self> {
            Ok(Self {
                id: reader.read_u32()?,
                name: reader.read_string()?,
            })
        }
    }

    #[test]
    fn test_round_trip_utility() {
        let record = Tagged {
            id: 42,
            name: "forty-two".to_string(),
        };
        test_round_trip(&record).expect("Round-trip should succeed");
    }

    #[test]
    fn test_verify_round_trip_rejects_trailing_bytes() {
        let mut data = Tagged {
            id: 1,
            name: "x".to_string(),
        }
        .to_bytes()
        .expect("Operation should succeed");
        data.push(0xFF);
        assert!(matches!(
            Tagged::verify_round_trip(&data),
            Err(BinViewError::CorruptData(_))
        ));
    }

    #[test]
    fn test_seeded_bytes_are_deterministic() {
        assert_eq!(seeded_bytes(7, 64), seeded_bytes(7, 64));
        assert_ne!(seeded_bytes(7, 64), seeded_bytes(8, 64));
    }
}
