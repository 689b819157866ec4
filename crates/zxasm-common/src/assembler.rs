use crate::{
    compression::{Compressor, CompressorRegistry},
    linker::Linker,
    output::CompiledOutput,
    parser::parse_source,
    program::Program,
    project::{Project, DEFAULT_FILE_NAME},
    types::{AssemblerError, Result},
};

/// Parses, links and emits Z80 sources.
pub struct Assembler {
    project: Option<Project>,
    compressors: CompressorRegistry,
    pass_limit: Option<usize>,
}

impl Assembler {
    pub fn new() -> Self {
        Self {
            project: None,
            compressors: CompressorRegistry::new(),
            pass_limit: None,
        }
    }

    /// Uses `project` instead of the default single-file layout.
    pub fn with_project(mut self, project: Project) -> Self {
        self.project = Some(project);
        self
    }

    pub fn with_pass_limit(mut self, passes: usize) -> Self {
        self.pass_limit = Some(passes);
        self
    }

    pub fn register_compressor(&mut self, compressor: Box<dyn Compressor>) -> &mut Self {
        self.compressors.register(compressor);
        self
    }

    pub fn assemble(&self, file_name: &str, source: &str) -> Result<CompiledOutput> {
        self.assemble_files(&[(file_name, source)])
    }

    /// Parses every `(file name, source)` pair into one program and links it.
    pub fn assemble_files(&self, sources: &[(&str, &str)]) -> Result<CompiledOutput> {
        let mut program = Program::new();
        for (file_name, source) in sources {
            parse_source(&mut program, file_name, source)?;
        }
        self.link(&mut program)
    }

    pub fn link(&self, program: &mut Program) -> Result<CompiledOutput> {
        let default_project;
        let project = match &self.project {
            Some(project) => project,
            None => {
                default_project = Project::default_for(program);
                &default_project
            }
        };
        tracing::debug!(
            sections = program.sections().len(),
            files = project.files.len(),
            "linking program"
        );
        let mut linker = Linker::new(&self.compressors);
        if let Some(passes) = self.pass_limit {
            linker = linker.with_pass_limit(passes);
        }
        linker.link(program, project)
    }

    /// Bytes of the `MAIN` file, or of the only file produced.
    pub fn assemble_bytes(&self, file_name: &str, source: &str) -> Result<Vec<u8>> {
        let output = self.assemble(file_name, source)?;
        let file = match output.get(DEFAULT_FILE_NAME) {
            Some(file) => file,
            None if output.len() == 1 => &output.files()[0],
            None => {
                return Err(AssemblerError::syntax(
                    None,
                    format!("project does not produce a single \"{}\" file.", DEFAULT_FILE_NAME),
                ))
            }
        };
        Ok(file.bytes().to_vec())
    }
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}
