//! Opaque object serialization
//!
//! Readers and writers hand whole typed values to an injected
//! [`PayloadSerializer`] instead of encoding them field by field. The view
//! stores the produced blob as `[u64 length][blob]`, so any serializer output
//! is self-delimiting on the wire.

use crate::error::BinViewResult;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Encoder/decoder for opaque typed payloads
pub trait PayloadSerializer {
    /// Encode `value` into a blob
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> BinViewResult<Vec<u8>>;

    /// Rebuild a value from a blob produced by [`Self::encode`]
    fn decode<T: DeserializeOwned>(&self, blob: &[u8]) -> BinViewResult<T>;
}

/// JSON payloads via `serde_json`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonSerializer {
    pretty: bool,
}

impl JsonSerializer {
    /// Compact JSON
    pub const fn new() -> Self {
        Self { pretty: false }
    }

    /// Indented JSON, easier to inspect in hex dumps
    pub const fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl PayloadSerializer for JsonSerializer {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> BinViewResult<Vec<u8>> {
        let blob = if self.pretty {
            serde_json::to_vec_pretty(value)?
        } else {
            serde_json::to_vec(value)?
        };
        Ok(blob)
    }

    fn decode<T: DeserializeOwned>(&self, blob: &[u8]) -> BinViewResult<T> {
        Ok(serde_json::from_slice(blob)?)
    }
}
