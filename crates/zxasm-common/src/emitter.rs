//! Byte sinks the instructions emit into.

use crate::{
    compression::{Compression, CompressorRegistry},
    output::{DebugSection, WriteProtectionRange},
    types::{AssemblerError, Result, SourceLocation},
};

pub trait CodeEmitter {
    fn emit_bytes(&mut self, location: Option<&SourceLocation>, bytes: &[u8]) -> Result<()>;
    fn add_section_debug_info(&mut self, section: DebugSection) -> Result<()>;
    fn add_write_protection(&mut self, range: WriteProtectionRange) -> Result<()>;
}

/// Growable uncompressed buffer remembering the source of every byte.
#[derive(Debug, Clone, Default)]
pub struct CodeBuffer {
    bytes: Vec<u8>,
    locations: Vec<Option<SourceLocation>>,
    sections: Vec<DebugSection>,
    write_protection: Vec<WriteProtectionRange>,
}

impl CodeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn location_of(&self, offset: usize) -> Option<&SourceLocation> {
        self.locations.get(offset).and_then(|l| l.as_ref())
    }

    pub(crate) fn push(&mut self, location: Option<&SourceLocation>, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
        self.locations
            .extend(std::iter::repeat(location.cloned()).take(bytes.len()));
    }

    pub fn copy_to(&self, target: &mut dyn CodeEmitter) -> Result<()> {
        // keep per-byte locations: emit runs of equal origin
        let mut start = 0;
        while start < self.bytes.len() {
            let location = &self.locations[start];
            let mut end = start + 1;
            while end < self.bytes.len() && self.locations[end] == *location {
                end += 1;
            }
            target.emit_bytes(location.as_ref(), &self.bytes[start..end])?;
            start = end;
        }
        for section in &self.sections {
            target.add_section_debug_info(section.clone())?;
        }
        for range in &self.write_protection {
            target.add_write_protection(range.clone())?;
        }
        Ok(())
    }
}

impl CodeEmitter for CodeBuffer {
    fn emit_bytes(&mut self, location: Option<&SourceLocation>, bytes: &[u8]) -> Result<()> {
        self.push(location, bytes);
        Ok(())
    }

    fn add_section_debug_info(&mut self, section: DebugSection) -> Result<()> {
        self.sections.push(section);
        Ok(())
    }

    fn add_write_protection(&mut self, range: WriteProtectionRange) -> Result<()> {
        self.write_protection.push(range);
        Ok(())
    }
}

/// Collects one section's raw bytes and compresses them once.
#[derive(Debug, Default)]
pub struct CompressedCode {
    location: Option<SourceLocation>,
    raw: Vec<u8>,
    compressed: Option<Vec<u8>>,
    section: Option<DebugSection>,
    write_protection: Vec<WriteProtectionRange>,
}

impl CompressedCode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn uncompressed_size(&self) -> usize {
        self.raw.len()
    }

    pub fn compressed_size(&self) -> Result<usize> {
        self.compressed_bytes().map(|bytes| bytes.len())
    }

    pub fn compressed_bytes(&self) -> Result<&[u8]> {
        self.compressed.as_deref().ok_or_else(|| {
            AssemblerError::internal(self.location.as_ref(), "compressed data is not available at this point.")
        })
    }

    pub fn compress(&mut self, registry: &CompressorRegistry, compression: Compression, section: &str) -> Result<()> {
        if self.compressed.is_some() {
            return Err(AssemblerError::internal(self.location.as_ref(), "data is already compressed."));
        }
        let compressed = registry.compress(compression, section, &self.raw, self.location.as_ref())?;
        self.compressed = Some(compressed);
        Ok(())
    }

    pub fn copy_to(&self, target: &mut dyn CodeEmitter) -> Result<()> {
        let bytes = self.compressed_bytes()?;
        target.emit_bytes(self.location.as_ref(), bytes)?;
        if let Some(section) = &self.section {
            target.add_section_debug_info(DebugSection {
                compressed_size: Some(bytes.len() as u64),
                ..section.clone()
            })?;
        }
        for range in &self.write_protection {
            target.add_write_protection(range.clone())?;
        }
        Ok(())
    }
}

impl CodeEmitter for CompressedCode {
    fn emit_bytes(&mut self, location: Option<&SourceLocation>, bytes: &[u8]) -> Result<()> {
        if self.compressed.is_some() {
            return Err(AssemblerError::internal(
                self.location.as_ref(),
                "attempted to write more data after compression.",
            ));
        }
        if self.location.is_none() {
            self.location = location.cloned();
        }
        self.raw.extend_from_slice(bytes);
        Ok(())
    }

    fn add_section_debug_info(&mut self, section: DebugSection) -> Result<()> {
        if self.section.is_some() {
            return Err(AssemblerError::internal(
                self.location.as_ref(),
                "only one section is allowed in compressed code emitter.",
            ));
        }
        if section.compressed_size.is_some() {
            return Err(AssemblerError::internal(
                self.location.as_ref(),
                "attempted to write already compressed data to compressed code emitter.",
            ));
        }
        self.section = Some(section);
        Ok(())
    }

    fn add_write_protection(&mut self, range: WriteProtectionRange) -> Result<()> {
        self.write_protection.push(range);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::Compressor;
    use crate::output::CompiledFile;

    struct Halve;

    impl Compressor for Halve {
        fn compression(&self) -> Compression {
            Compression::Zx7
        }

        fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
            Ok(data.iter().step_by(2).copied().collect())
        }
    }

    fn section(compression: Compression) -> DebugSection {
        DebugSection {
            name: "packed".to_string(),
            start: 0,
            base: 0x4000,
            compression,
            uncompressed_size: 4,
            compressed_size: None,
        }
    }

    #[test]
    fn buffer_copies_bytes_and_locations() {
        let a = SourceLocation::new("f", 1);
        let b = SourceLocation::new("f", 2);
        let mut buffer = CodeBuffer::new();
        buffer.emit_bytes(Some(&a), &[1, 2]).unwrap();
        buffer.emit_bytes(Some(&b), &[3]).unwrap();
        let mut file = CompiledFile::new("MAIN");
        buffer.copy_to(&mut file).unwrap();
        assert_eq!(file.bytes(), &[1, 2, 3]);
        assert_eq!(file.location_of(1), Some(&a));
        assert_eq!(file.location_of(2), Some(&b));
    }

    #[test]
    fn compressed_code_lifecycle() {
        let mut registry = CompressorRegistry::new();
        registry.register(Box::new(Halve));

        let mut code = CompressedCode::new();
        code.add_section_debug_info(section(Compression::Zx7)).unwrap();
        assert!(code.add_section_debug_info(section(Compression::Zx7)).is_err());
        code.emit_bytes(None, &[1, 2, 3, 4]).unwrap();
        assert!(code.compressed_bytes().is_err());

        code.compress(&registry, Compression::Zx7, "packed").unwrap();
        assert_eq!(code.compressed_bytes().unwrap(), &[1, 3]);
        assert!(code.emit_bytes(None, &[5]).is_err());
        let err = code.compress(&registry, Compression::Zx7, "packed").unwrap_err();
        assert_eq!(err.message(), "internal compiler error: data is already compressed.");

        let mut file = CompiledFile::new("MAIN");
        code.copy_to(&mut file).unwrap();
        let recorded = file.debug_info().sections().next().unwrap().clone();
        assert_eq!(recorded.compressed_size, Some(2));
        assert_eq!(recorded.uncompressed_size, 4);
    }
}
