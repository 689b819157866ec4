pub mod assembler;
pub mod compression;
pub mod emitter;
pub mod expr;
pub mod instruction;
pub mod label;
pub mod lexer;
pub mod linker;
pub mod opcodes;
pub mod output;
pub mod parser;
pub mod program;
pub mod project;
pub mod symbol;
pub mod types;
pub mod value;

pub use assembler::Assembler;
pub use compression::{Compression, Compressor, CompressorRegistry};
pub use linker::Linker;
pub use output::{CompiledFile, CompiledOutput, DebugEntry, DebugInformation, DebugSection};
pub use program::Program;
pub use project::{Attachment, ExprText, Project, ProjectFile, ProjectSection};
pub use types::*;
