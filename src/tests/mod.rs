use crate::*;

mod compression;
mod error_catalogue;
mod if_blocks;
mod label_resolution;
mod section_placement;

pub(crate) fn assemble(source: &str) -> Vec<u8> {
    let bytes = Assembler::new()
        .assemble_bytes("test.asm", source)
        .unwrap_or_else(|e| panic!("assembly failed: {}", e));
    eprintln!("{}", hex::encode(&bytes));
    bytes
}

pub(crate) fn assemble_err(source: &str) -> AssemblerError {
    match Assembler::new().assemble_bytes("test.asm", source) {
        Ok(bytes) => panic!("expected an error, got {}", hex::encode(bytes)),
        Err(e) => {
            eprintln!("{}", e);
            e
        }
    }
}

pub(crate) fn link_with(project: &str, source: &str) -> Result<CompiledOutput> {
    let project = Project::from_json(project)?;
    Assembler::new().with_project(project).assemble("test.asm", source)
}
