//! Linked files and their debug information.

use crate::{
    compression::Compression,
    emitter::{CodeBuffer, CodeEmitter},
    types::{AssemblerError, Result, SourceLocation},
};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WriteProtectionKind {
    AllowWrite,
    DisallowWrite,
    PushAllowWrite,
    PushDisallowWrite,
    PopAllowWrite,
    PopAllowWriteAfter,
    AssertBank,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteProtectionRange {
    pub kind: WriteProtectionKind,
    pub start: u16,
    pub size: Option<u16>,
    #[serde(skip)]
    pub location: Option<SourceLocation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DebugSection {
    pub name: String,
    /// Offset of the section's bytes within the file.
    pub start: u64,
    /// Address the section is resolved for.
    pub base: u64,
    pub compression: Compression,
    pub uncompressed_size: u64,
    pub compressed_size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DebugEntry {
    Section(DebugSection),
    EmptySpace { start: u64, size: u64 },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DebugInformation {
    pub entries: Vec<DebugEntry>,
    pub write_protection: Vec<WriteProtectionRange>,
}

impl DebugInformation {
    pub fn sections(&self) -> impl Iterator<Item = &DebugSection> {
        self.entries.iter().filter_map(|entry| match entry {
            DebugEntry::Section(section) => Some(section),
            DebugEntry::EmptySpace { .. } => None,
        })
    }
}

/// A finished output file.
#[derive(Debug, Clone, Default)]
pub struct CompiledFile {
    name: String,
    load_address: u64,
    code: CodeBuffer,
    debug_info: DebugInformation,
}

impl CompiledFile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn load_address(&self) -> u64 {
        self.load_address
    }

    pub fn set_load_address(&mut self, address: u64) {
        self.load_address = address;
    }

    pub fn bytes(&self) -> &[u8] {
        self.code.bytes()
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Source line that produced the byte at `offset`, if any.
    pub fn location_of(&self, offset: usize) -> Option<&SourceLocation> {
        self.code.location_of(offset)
    }

    pub fn debug_info(&self) -> &DebugInformation {
        &self.debug_info
    }

    pub fn add_empty_space(&mut self, start: u64, size: u64) {
        self.debug_info.entries.push(DebugEntry::EmptySpace { start, size });
    }

    /// Pads with zeros up to `size` bytes.
    pub fn pad_to(&mut self, size: usize) {
        if self.code.len() < size {
            let start = self.code.len() as u64;
            let gap = vec![0u8; size - self.code.len()];
            self.code.push(None, &gap);
            self.add_empty_space(start, gap.len() as u64);
        }
    }
}

impl CodeEmitter for CompiledFile {
    fn emit_bytes(&mut self, location: Option<&SourceLocation>, bytes: &[u8]) -> Result<()> {
        self.code.push(location, bytes);
        Ok(())
    }

    fn add_section_debug_info(&mut self, section: DebugSection) -> Result<()> {
        self.debug_info.entries.push(DebugEntry::Section(section));
        Ok(())
    }

    fn add_write_protection(&mut self, range: WriteProtectionRange) -> Result<()> {
        self.debug_info.write_protection.push(range);
        Ok(())
    }
}

/// All files produced by one build, in creation order.
#[derive(Debug, Default)]
pub struct CompiledOutput {
    files: Vec<CompiledFile>,
}

impl CompiledOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, file: CompiledFile) -> Result<()> {
        if self.get(file.name()).is_some() {
            return Err(AssemblerError::internal(
                None,
                format!("duplicate output file name \"{}\".", file.name()),
            ));
        }
        self.files.push(file);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&CompiledFile> {
        self.files.iter().find(|file| file.name() == name)
    }

    pub fn files(&self) -> &[CompiledFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_file_names_are_rejected() {
        let mut output = CompiledOutput::new();
        output.add_file(CompiledFile::new("MAIN")).unwrap();
        let err = output.add_file(CompiledFile::new("MAIN")).unwrap_err();
        assert!(matches!(err, AssemblerError::Internal(_)));
        assert_eq!(
            err.message(),
            "internal compiler error: duplicate output file name \"MAIN\"."
        );
    }

    #[test]
    fn padding_is_recorded_as_empty_space() {
        let mut file = CompiledFile::new("MAIN");
        file.emit_bytes(None, &[1, 2]).unwrap();
        file.pad_to(5);
        assert_eq!(file.bytes(), &[1, 2, 0, 0, 0]);
        assert_eq!(file.debug_info().entries, vec![DebugEntry::EmptySpace { start: 2, size: 3 }]);
    }

    #[test]
    fn debug_info_serializes() {
        let mut file = CompiledFile::new("MAIN");
        file.add_section_debug_info(DebugSection {
            name: "code".to_string(),
            start: 0,
            base: 0x8000,
            compression: Compression::None,
            uncompressed_size: 3,
            compressed_size: None,
        })
        .unwrap();
        let json = serde_json::to_value(file.debug_info()).unwrap();
        assert_eq!(json["entries"][0]["type"], "section");
        assert_eq!(json["entries"][0]["base"], 0x8000);
    }
}
