use crate::types::{AssemblerError, Result, SourceLocation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Largest raw block any codec is handed.
pub const MAX_UNCOMPRESSED_SIZE: usize = 65536;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Compression {
    #[default]
    None,
    Zx7,
    Zx0,
    Zx0Quick,
    Lzsa2,
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Compression::None => "none",
            Compression::Zx7 => "zx7",
            Compression::Zx0 => "zx0",
            Compression::Zx0Quick => "zx0-quick",
            Compression::Lzsa2 => "lzsa2",
        })
    }
}

/// A codec. Implementations are pure byte transforms.
pub trait Compressor {
    fn compression(&self) -> Compression;
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// Codecs available to the linker, keyed by mode.
#[derive(Default)]
pub struct CompressorRegistry {
    compressors: HashMap<Compression, Box<dyn Compressor>>,
}

impl CompressorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, compressor: Box<dyn Compressor>) {
        self.compressors.insert(compressor.compression(), compressor);
    }

    pub fn get(&self, compression: Compression, location: Option<&SourceLocation>) -> Result<&dyn Compressor> {
        self.compressors
            .get(&compression)
            .map(|c| c.as_ref())
            .ok_or_else(|| {
                AssemblerError::compression(location, format!("compression \"{}\" is not available.", compression))
            })
    }

    /// Compresses the raw bytes of `section`.
    pub fn compress(
        &self,
        compression: Compression,
        section: &str,
        data: &[u8],
        location: Option<&SourceLocation>,
    ) -> Result<Vec<u8>> {
        let compressor = self.get(compression, location)?;
        if data.len() > MAX_UNCOMPRESSED_SIZE {
            return Err(AssemblerError::compression(
                location,
                format!("section \"{}\" is too large to compress ({} bytes).", section, data.len()),
            ));
        }
        let compressed = compressor.compress(data)?;
        tracing::debug!(
            section,
            %compression,
            raw = data.len(),
            compressed = compressed.len(),
            "compressed section"
        );
        Ok(compressed)
    }
}

impl fmt::Debug for CompressorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.compressors.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Reverse;

    impl Compressor for Reverse {
        fn compression(&self) -> Compression {
            Compression::Zx0
        }

        fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
            Ok(data.iter().rev().copied().collect())
        }
    }

    #[test]
    fn names_round_trip_through_serde() {
        let parsed: Compression = serde_json::from_str("\"zx0-quick\"").unwrap();
        assert_eq!(parsed, Compression::Zx0Quick);
        assert_eq!(serde_json::to_string(&Compression::Lzsa2).unwrap(), "\"lzsa2\"");
    }

    #[test]
    fn missing_codec() {
        let registry = CompressorRegistry::new();
        let err = registry.compress(Compression::Zx7, "code", &[1, 2], None).unwrap_err();
        assert_eq!(err.message(), "compression \"zx7\" is not available.");
    }

    #[test]
    fn oversized_input() {
        let mut registry = CompressorRegistry::new();
        registry.register(Box::new(Reverse));
        let data = vec![0u8; MAX_UNCOMPRESSED_SIZE + 1];
        let err = registry.compress(Compression::Zx0, "big", &data, None).unwrap_err();
        assert_eq!(err.message(), "section \"big\" is too large to compress (65537 bytes).");
        assert_eq!(registry.compress(Compression::Zx0, "ok", &[1, 2, 3], None).unwrap(), vec![3, 2, 1]);
    }
}
