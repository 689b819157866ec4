use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A point in the assembler input: file name and 1-based line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub file: Arc<str>,
    pub line: usize,
}

impl SourceLocation {
    pub fn new(file: impl Into<Arc<str>>, line: usize) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Message plus the location it refers to, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub location: Option<SourceLocation>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(location: Option<&SourceLocation>, message: impl Into<String>) -> Self {
        Self {
            location: location.cloned(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{}: {}", location, self.message),
            None => f.write_str(&self.message),
        }
    }
}

#[derive(Debug, Error)]
pub enum AssemblerError {
    #[error("{0}")]
    Syntax(Diagnostic),

    #[error("{0}")]
    Evaluation(Diagnostic),

    /// Something referenced is not known yet. The resolution driver retries
    /// on this and never hands it to callers.
    #[error("{0}")]
    Pending(Diagnostic),

    #[error("{0}")]
    Unresolved(Diagnostic),

    #[error("{0}")]
    Internal(Diagnostic),

    #[error("{0}")]
    Compression(Diagnostic),

    #[error("Invalid project file: {0}")]
    Project(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AssemblerError {
    pub fn syntax(location: Option<&SourceLocation>, message: impl Into<String>) -> Self {
        AssemblerError::Syntax(Diagnostic::new(location, message))
    }

    pub fn evaluation(location: Option<&SourceLocation>, message: impl Into<String>) -> Self {
        AssemblerError::Evaluation(Diagnostic::new(location, message))
    }

    pub fn pending(location: Option<&SourceLocation>, message: impl Into<String>) -> Self {
        AssemblerError::Pending(Diagnostic::new(location, message))
    }

    pub fn internal(location: Option<&SourceLocation>, message: impl AsRef<str>) -> Self {
        AssemblerError::Internal(Diagnostic::new(
            location,
            format!("internal compiler error: {}", message.as_ref()),
        ))
    }

    pub fn compression(location: Option<&SourceLocation>, message: impl Into<String>) -> Self {
        AssemblerError::Compression(Diagnostic::new(location, message))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, AssemblerError::Pending(_))
    }

    /// Turns a leftover retry signal into the user-facing unresolved error.
    pub fn into_unresolved(self) -> Self {
        match self {
            AssemblerError::Pending(diagnostic) => AssemblerError::Unresolved(diagnostic),
            other => other,
        }
    }

    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            AssemblerError::Syntax(d)
            | AssemblerError::Evaluation(d)
            | AssemblerError::Pending(d)
            | AssemblerError::Unresolved(d)
            | AssemblerError::Internal(d)
            | AssemblerError::Compression(d) => Some(d),
            AssemblerError::Project(_) | AssemblerError::Io(_) => None,
        }
    }

    pub fn location(&self) -> Option<&SourceLocation> {
        self.diagnostic().and_then(|d| d.location.as_ref())
    }

    pub fn message(&self) -> String {
        match self.diagnostic() {
            Some(d) => d.message.clone(),
            None => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AssemblerError>;
