//! Project file: which sections go into which output file, and where.

use crate::{compression::Compression, program::Program, types::Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Origin used for the first section when nothing else places it.
pub const DEFAULT_BASE: u64 = 0x1234;

/// Name of the file the default project puts every section into.
pub const DEFAULT_FILE_NAME: &str = "MAIN";

/// An expression written either as a JSON number or as source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExprText {
    Number(i64),
    Text(String),
}

impl ExprText {
    pub fn is_auto(&self) -> bool {
        matches!(self, ExprText::Text(text) if text.trim() == "auto")
    }
}

impl fmt::Display for ExprText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprText::Number(n) => write!(f, "{}", n),
            ExprText::Text(text) => f.write_str(text),
        }
    }
}

impl From<u64> for ExprText {
    fn from(value: u64) -> Self {
        ExprText::Number(value as i64)
    }
}

impl From<&str> for ExprText {
    fn from(text: &str) -> Self {
        ExprText::Text(text.to_string())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Attachment {
    #[default]
    Lower,
    Upper,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSection {
    pub name: String,
    #[serde(default)]
    pub base: Option<ExprText>,
    #[serde(default)]
    pub alignment: Option<ExprText>,
    /// Offset in the file, or `"auto"`.
    #[serde(default)]
    pub file_offset: Option<ExprText>,
    #[serde(default)]
    pub compression: Compression,
    #[serde(default)]
    pub attachment: Attachment,
}

impl ProjectSection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_base(mut self, base: impl Into<ExprText>) -> Self {
        self.base = Some(base.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFile {
    pub name: String,
    #[serde(default)]
    pub start: Option<ExprText>,
    #[serde(default)]
    pub until: Option<ExprText>,
    #[serde(default)]
    pub sections: Vec<ProjectSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub files: Vec<ProjectFile>,
}

impl Project {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// One `MAIN` file holding every section in declaration order. A name
    /// ending in `_0x<hex>` fixes that section's base.
    pub fn default_for(program: &Program) -> Self {
        let sections = program
            .sections()
            .iter()
            .enumerate()
            .map(|(index, section)| {
                let name = section.name();
                match base_from_name(name) {
                    Some(base) => ProjectSection::new(name).with_base(base),
                    None if index == 0 => ProjectSection::new(name).with_base(DEFAULT_BASE),
                    None => ProjectSection::new(name),
                }
            })
            .collect();

        Project {
            files: vec![ProjectFile {
                name: DEFAULT_FILE_NAME.to_string(),
                sections,
                ..ProjectFile::default()
            }],
        }
    }
}

fn base_from_name(name: &str) -> Option<u64> {
    let index = name.rfind("_0x")?;
    let digits = &name[index + 3..];
    if digits.is_empty() {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numbers_strings_and_defaults() {
        let project = Project::from_json(
            r#"{
                "files": [{
                    "name": "MAIN",
                    "start": "0x8000",
                    "sections": [
                        { "name": "code", "base": 32768, "compression": "zx0-quick" },
                        { "name": "data", "file_offset": "auto", "attachment": "upper" }
                    ]
                }]
            }"#,
        )
        .unwrap();
        let file = &project.files[0];
        assert_eq!(file.start, Some(ExprText::Text("0x8000".to_string())));
        assert_eq!(file.until, None);
        assert_eq!(file.sections[0].base, Some(ExprText::Number(32768)));
        assert_eq!(file.sections[0].compression, Compression::Zx0Quick);
        assert_eq!(file.sections[0].attachment, Attachment::Lower);
        assert!(file.sections[1].file_offset.as_ref().unwrap().is_auto());
        assert_eq!(file.sections[1].attachment, Attachment::Upper);
    }

    #[test]
    fn malformed_project_is_reported() {
        let err = Project::from_json(r#"{ "files": [ { "sections": [] } ] }"#).unwrap_err();
        assert!(err.to_string().starts_with("Invalid project file:"));
    }

    #[test]
    fn default_project_uses_name_suffix() {
        let mut program = Program::new();
        program.get_or_add_section("code", None);
        program.get_or_add_section("screen_0x4000", None);
        program.get_or_add_section("tail", None);
        let project = Project::default_for(&program);
        let sections = &project.files[0].sections;
        assert_eq!(project.files[0].name, "MAIN");
        assert_eq!(sections[0].base, Some(ExprText::Number(0x1234)));
        assert_eq!(sections[1].base, Some(ExprText::Number(0x4000)));
        assert_eq!(sections[2].base, None);
    }

    #[test]
    fn suffix_needs_hex_digits() {
        assert_eq!(base_from_name("a_0x"), None);
        assert_eq!(base_from_name("a_0xzz"), None);
        assert_eq!(base_from_name("a_0xC000"), Some(0xc000));
    }
}
