//! Places sections into files and drives address resolution to a fixed point.
//!
//! Every pass walks the files and their sections in project order and tries
//! to learn something new about each section: its size, the addresses of its
//! labels, its code, and where it lands in the file. A pass that learns
//! nothing while work remains means the remaining references can never be
//! satisfied.

use crate::{
    compression::{Compression, CompressorRegistry},
    emitter::{CodeBuffer, CodeEmitter, CompressedCode},
    expr::{EvalContext, ExprId, ExprKind, LoopBindings, SectionResolver},
    instruction::Walk,
    output::{CompiledFile, CompiledOutput, DebugSection},
    parser::parse_expression,
    program::{Program, ProgramSection},
    project::{Attachment, ExprText, Project, ProjectFile},
    symbol::Symbol,
    types::{AssemblerError, Diagnostic, Result, SourceLocation},
};
use std::collections::{HashMap, HashSet};

/// Pseudo file name used for locations inside the project description.
pub const PROJECT_FILE_NAME: &str = "<project>";

enum SectionCode {
    Plain(CodeBuffer),
    Compressed(CompressedCode),
}

impl SectionCode {
    fn copy_to(&mut self, debug: DebugSection, target: &mut dyn CodeEmitter) -> Result<()> {
        match self {
            SectionCode::Plain(buffer) => {
                buffer.add_section_debug_info(debug)?;
                buffer.copy_to(target)
            }
            SectionCode::Compressed(code) => {
                code.add_section_debug_info(debug)?;
                code.copy_to(target)
            }
        }
    }
}

struct LinkerSection {
    name: String,
    file: String,
    program_index: usize,
    location: SourceLocation,
    attachment: Attachment,
    compression: Compression,
    base: Option<ExprId>,
    file_offset: Option<ExprId>,
    auto_file_offset: bool,
    alignment: Option<u64>,
    resolved_size: Option<u64>,
    resolved_base: Option<u64>,
    resolved_file_offset: Option<u64>,
    labels_resolved: bool,
    code: Option<SectionCode>,
}

impl LinkerSection {
    fn is_complete(&self) -> bool {
        self.resolved_file_offset.is_some() && self.resolved_size.is_some() && self.labels_resolved && self.code.is_some()
    }

    fn known_facts(&self) -> usize {
        [
            self.resolved_size.is_some(),
            self.resolved_base.is_some(),
            self.resolved_file_offset.is_some(),
            self.labels_resolved,
            self.code.is_some(),
        ]
        .iter()
        .filter(|known| **known)
        .count()
    }
}

/// All linked sections, by name. Answers section queries in expressions.
#[derive(Default)]
struct SectionTable {
    sections: Vec<LinkerSection>,
    by_name: HashMap<String, usize>,
}

impl SectionTable {
    fn find(&self, name: &str) -> Option<&LinkerSection> {
        self.by_name.get(name).map(|&index| &self.sections[index])
    }
}

impl SectionResolver for SectionTable {
    fn section_address(&self, name: &str) -> Option<u64> {
        self.find(name).and_then(|s| s.resolved_file_offset)
    }

    fn section_base(&self, name: &str) -> Option<u64> {
        self.find(name).and_then(|s| s.resolved_base)
    }

    fn section_size(&self, name: &str) -> Option<u64> {
        self.find(name).and_then(|s| s.resolved_size)
    }

    fn is_valid_section_name(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }
}

struct LinkerFile {
    name: String,
    location: SourceLocation,
    start_expr: Option<ExprId>,
    until_expr: Option<ExprId>,
    start: Option<u64>,
    until: Option<u64>,
    /// Section whose base doubles as its file offset when nothing else
    /// anchors the file.
    anchor: Option<usize>,
    sections: Vec<usize>,
    resolved: bool,
}

impl LinkerFile {
    fn known_facts(&self, table: &SectionTable) -> usize {
        let bounds = usize::from(self.start.is_some()) + usize::from(self.until.is_some());
        bounds + self.sections.iter().map(|&i| table.sections[i].known_facts()).sum::<usize>()
    }
}

/// What one pass learned, plus the first retry signal it saw.
#[derive(Default)]
struct Progress {
    did_resolve: bool,
    pending: Option<AssemblerError>,
}

impl Progress {
    fn attempt<T>(&mut self, result: Result<T>) -> Result<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_pending() => {
                if self.pending.is_none() {
                    self.pending = Some(err);
                }
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

pub struct Linker<'a> {
    compressors: &'a CompressorRegistry,
    pass_limit: Option<usize>,
}

impl<'a> Linker<'a> {
    pub fn new(compressors: &'a CompressorRegistry) -> Self {
        Self {
            compressors,
            pass_limit: None,
        }
    }

    /// Caps the number of resolution passes below the bound derived from
    /// the program.
    pub fn with_pass_limit(mut self, passes: usize) -> Self {
        self.pass_limit = Some(passes);
        self
    }

    /// Resolves every section of `project` and generates the output files.
    pub fn link(&self, program: &mut Program, project: &Project) -> Result<CompiledOutput> {
        let mut table = SectionTable::default();
        let mut files = Vec::with_capacity(project.files.len());
        let mut file_names = HashSet::new();
        for file in &project.files {
            if !file_names.insert(file.name.as_str()) {
                return Err(AssemblerError::syntax(
                    Some(&project_location()),
                    format!("duplicate file name \"{}\".", file.name),
                ));
            }
            files.push(add_file(program, &mut table, file)?);
        }

        for section in program.sections() {
            if !table.is_valid_section_name(section.name()) && !section.is_empty() {
                tracing::debug!(section = section.name(), "section is not part of any file");
            }
        }

        let mut max_passes = program.count_forward_references() + 5 * table.sections.len() + 2 * files.len() + 1;
        if let Some(limit) = self.pass_limit {
            max_passes = max_passes.min(limit);
        }
        let mut pass = 0;
        loop {
            pass += 1;
            let mut progress = Progress::default();
            let mut resolved_all = true;
            for file in files.iter_mut() {
                if !self.try_resolve(program, &mut table, file, &mut progress)? {
                    resolved_all = false;
                }
            }
            tracing::trace!(pass, resolved_all, did_resolve = progress.did_resolve, "link pass");
            if resolved_all {
                break;
            }
            if !progress.did_resolve || pass >= max_passes {
                tracing::debug!(pass, max_passes, "giving up on unresolved sections");
                return Err(unresolved_error(&table, &files, progress.pending));
            }
        }
        tracing::debug!(passes = pass, files = files.len(), "resolved all sections");

        let mut output = CompiledOutput::new();
        for file in &files {
            output.add_file(generate_code(&mut table, file)?)?;
        }

        validate_constants(program, &table)?;
        Ok(output)
    }

    fn try_resolve(
        &self,
        program: &mut Program,
        table: &mut SectionTable,
        file: &mut LinkerFile,
        progress: &mut Progress,
    ) -> Result<bool> {
        if file.resolved {
            return Ok(true);
        }
        let before = file.known_facts(table);
        let mut has_unresolved = false;

        resolve_configured_placement(program, table, file, progress)?;
        if (file.start_expr.is_some() && file.start.is_none()) || (file.until_expr.is_some() && file.until.is_none()) {
            has_unresolved = true;
        }

        // sizes and labels
        for &index in &file.sections {
            let section = &table.sections[index];
            let program_index = section.program_index;
            tracing::trace!(section = %section.name, file = %file.name, "resolving section");

            if section.compression == Compression::None && section.resolved_size.is_none() {
                let mut size = None;
                if let Some(base) = section.resolved_base {
                    let result = with_walk(program, table, program_index, |s, walk| s.resolve_labels(base, walk));
                    match progress.attempt(result)? {
                        Some(resolved) => {
                            table.sections[index].labels_resolved = true;
                            size = Some(resolved);
                        }
                        None => unresolve(program, program_index),
                    }
                }
                if size.is_none() {
                    let result = with_walk(program, table, program_index, |s, walk| s.calculate_size_in_bytes(walk));
                    size = progress.attempt(result)?;
                }
                match size {
                    Some(size) => {
                        tracing::debug!(section = %table.sections[index].name, size, "resolved section size");
                        table.sections[index].resolved_size = Some(size);
                    }
                    None => has_unresolved = true,
                }
            }

            let section = &table.sections[index];
            if !section.labels_resolved {
                if let Some(base) = section.resolved_base {
                    let result = with_walk(program, table, program_index, |s, walk| s.resolve_labels(base, walk));
                    match progress.attempt(result)? {
                        Some(_) => table.sections[index].labels_resolved = true,
                        None => {
                            unresolve(program, program_index);
                            has_unresolved = true;
                        }
                    }
                }
            }
        }

        place_from_bounds(table, file)?;

        // compressed sections are emitted at their base, then compressed
        for &index in &file.sections {
            let section = &table.sections[index];
            if section.compression == Compression::None || section.resolved_size.is_some() || !section.labels_resolved {
                continue;
            }
            let Some(base) = section.resolved_base else {
                continue;
            };
            let program_index = section.program_index;
            let mut code = CompressedCode::new();
            let result = with_walk(program, table, program_index, |s, walk| s.emit_code(&mut code, base, walk));
            if progress.attempt(result)?.is_some() {
                let section = &mut table.sections[index];
                code.compress(self.compressors, section.compression, &section.name)?;
                let size = code.compressed_size()? as u64;
                section.resolved_size = Some(size);
                section.code = Some(SectionCode::Compressed(code));
            }
        }

        // emit what is placed and propagate placement to neighbours
        for position in 0..file.sections.len() {
            let index = file.sections[position];
            let section = &table.sections[index];
            let (Some(offset), true) = (section.resolved_file_offset, section.labels_resolved) else {
                has_unresolved = true;
                continue;
            };

            if section.code.is_none() && section.compression == Compression::None {
                let program_index = section.program_index;
                let base = section.resolved_base.unwrap_or(offset);
                let mut buffer = CodeBuffer::new();
                let result = with_walk(program, table, program_index, |s, walk| s.emit_code(&mut buffer, base, walk));
                match progress.attempt(result)? {
                    Some(size) => {
                        let section = &mut table.sections[index];
                        match section.resolved_size {
                            None => section.resolved_size = Some(size),
                            Some(resolved) if resolved != size => {
                                return Err(AssemblerError::internal(
                                    Some(&section.location),
                                    format!(
                                        "size of generated code for section \"{}\" in file \"{}\" differs from resolved size ({} != {}).",
                                        section.name, file.name, resolved, size
                                    ),
                                ));
                            }
                            Some(_) => {}
                        }
                        section.code = Some(SectionCode::Plain(buffer));
                    }
                    None => has_unresolved = true,
                }
            }

            resolve_sections_to(table, file, offset, position)?;
            match table.sections[index].resolved_size {
                Some(size) => resolve_sections_from(table, file, offset + size, position + 1),
                None => has_unresolved = true,
            }
        }

        let after = file.known_facts(table);
        if after > before {
            progress.did_resolve = true;
        }
        if !has_unresolved && file.sections.iter().all(|&i| table.sections[i].is_complete()) {
            file.resolved = true;
        }
        Ok(file.resolved)
    }
}

fn project_location() -> SourceLocation {
    SourceLocation::new(PROJECT_FILE_NAME, 1)
}

fn project_expr(program: &mut Program, text: &Option<ExprText>) -> Result<Option<ExprId>> {
    let location = project_location();
    match text {
        None => Ok(None),
        Some(ExprText::Number(n)) => Ok(Some(program.exprs.alloc(ExprKind::Number(*n), location))),
        Some(ExprText::Text(text)) => parse_expression(program, text, &location).map(Some),
    }
}

fn evaluate_word(program: &Program, table: &SectionTable, expr: ExprId) -> Result<u64> {
    let bindings = LoopBindings::new();
    let ctx = EvalContext {
        exprs: &program.exprs,
        symbols: &program.symbols,
        labels: &program.labels,
        sections: table,
        bindings: &bindings,
        current_address: None,
    };
    ctx.unsigned_word(expr).map(u64::from)
}

fn with_walk<T>(
    program: &mut Program,
    table: &SectionTable,
    program_index: usize,
    f: impl FnOnce(&ProgramSection, &mut Walk<'_>) -> Result<T>,
) -> Result<T> {
    let (sections, exprs, symbols, labels) = program.parts();
    let mut walk = Walk::new(exprs, symbols, labels, table);
    f(&sections[program_index], &mut walk)
}

fn unresolve(program: &mut Program, program_index: usize) {
    let (sections, _, _, labels) = program.parts();
    sections[program_index].unresolve_labels(labels);
}

fn add_file(program: &mut Program, table: &mut SectionTable, file: &ProjectFile) -> Result<LinkerFile> {
    let location = project_location();
    let mut linker_file = LinkerFile {
        name: file.name.clone(),
        location: location.clone(),
        start_expr: project_expr(program, &file.start)?,
        until_expr: project_expr(program, &file.until)?,
        start: None,
        until: None,
        anchor: None,
        sections: Vec::with_capacity(file.sections.len()),
        resolved: false,
    };

    let mut seen = HashSet::new();
    for info in &file.sections {
        if !seen.insert(info.name.as_str()) {
            return Err(AssemblerError::syntax(
                Some(&location),
                format!(
                    "section \"{}\" is referenced multiple times for file \"{}\".",
                    info.name, file.name
                ),
            ));
        }
        if table.by_name.contains_key(&info.name) {
            return Err(AssemblerError::syntax(
                Some(&location),
                format!("section \"{}\" is used by more than one file.", info.name),
            ));
        }
        if program.section(&info.name).is_none() {
            tracing::warn!(section = %info.name, file = %file.name, "project references a section the program does not declare");
        }
        let program_index = program.get_or_add_section(&info.name, None);
        let section_location = program
            .section_at(program_index)
            .location()
            .cloned()
            .unwrap_or_else(|| location.clone());

        let auto_file_offset = info.file_offset.as_ref().is_some_and(ExprText::is_auto);
        let file_offset = if auto_file_offset {
            None
        } else {
            project_expr(program, &info.file_offset)?
        };
        let base = project_expr(program, &info.base)?;
        if file_offset.is_some() && base.is_none() {
            return Err(AssemblerError::syntax(
                Some(&section_location),
                format!("section \"{}\" has file offset without base address.", info.name),
            ));
        }
        let alignment = match project_expr(program, &info.alignment)? {
            Some(expr) => {
                let alignment = evaluate_word(program, table, expr).map_err(AssemblerError::into_unresolved)?;
                if alignment == 0 {
                    return Err(AssemblerError::syntax(
                        Some(&section_location),
                        format!("section \"{}\" has invalid alignment in file \"{}\".", info.name, file.name),
                    ));
                }
                Some(alignment)
            }
            None => None,
        };

        table.sections.push(LinkerSection {
            name: info.name.clone(),
            file: file.name.clone(),
            program_index,
            location: section_location,
            attachment: info.attachment,
            compression: info.compression,
            base,
            file_offset,
            auto_file_offset,
            alignment,
            resolved_size: None,
            resolved_base: None,
            resolved_file_offset: None,
            labels_resolved: false,
            code: None,
        });
        let index = table.sections.len() - 1;
        table.by_name.insert(info.name.clone(), index);
        linker_file.sections.push(index);
    }

    let has_fixed_offset = linker_file
        .sections
        .iter()
        .any(|&i| table.sections[i].file_offset.is_some());
    if linker_file.start_expr.is_none() && linker_file.until_expr.is_none() && !has_fixed_offset {
        let sections = &table.sections;
        let anchor = linker_file
            .sections
            .iter()
            .copied()
            .find(|&i| sections[i].base.is_some() && !sections[i].auto_file_offset)
            .or_else(|| {
                linker_file
                    .sections
                    .iter()
                    .copied()
                    .find(|&i| sections[i].base.is_some() && sections[i].auto_file_offset)
            });
        match anchor {
            Some(anchor) => linker_file.anchor = Some(anchor),
            None if linker_file.sections.is_empty() => {}
            None => {
                return Err(AssemblerError::syntax(
                    Some(&location),
                    format!(
                        "unable to resolve addresses in file \"{}\": there is no section with known base and neither start, nor end addresses for file were specified.",
                        file.name
                    ),
                ))
            }
        }
    }

    // without a file start, sections before the first placed one hang below
    // it; without an end, sections after the last placed one follow it
    let anchor = linker_file.anchor;
    let is_placed = |index: usize, section: &LinkerSection| section.file_offset.is_some() || anchor == Some(index);
    if linker_file.start_expr.is_none() {
        for &index in &linker_file.sections {
            let section = &mut table.sections[index];
            if is_placed(index, section) || section.attachment == Attachment::Upper {
                break;
            }
            section.attachment = Attachment::Upper;
        }
    }
    if linker_file.until_expr.is_none() {
        for &index in linker_file.sections.iter().rev() {
            let section = &mut table.sections[index];
            if is_placed(index, section) || section.attachment == Attachment::Lower {
                break;
            }
            section.attachment = Attachment::Lower;
        }
    }

    Ok(linker_file)
}

/// Evaluates the configured file bounds, bases and file offsets that are not
/// known yet.
fn resolve_configured_placement(
    program: &Program,
    table: &mut SectionTable,
    file: &mut LinkerFile,
    progress: &mut Progress,
) -> Result<()> {
    for &index in &file.sections {
        let section = &table.sections[index];
        if let (Some(expr), None) = (section.base, section.resolved_base) {
            let Some(base) = progress.attempt(evaluate_word(program, table, expr))? else {
                continue;
            };
            let section = &mut table.sections[index];
            if let Some(alignment) = section.alignment {
                if base % alignment != 0 {
                    return Err(AssemblerError::syntax(
                        Some(&section.location),
                        format!(
                            "conflicting base and alignment for section \"{}\" in file \"{}\".",
                            section.name, file.name
                        ),
                    ));
                }
            }
            tracing::debug!(section = %section.name, base = format_args!("0x{:x}", base), "resolved base");
            section.resolved_base = Some(base);
            if file.anchor == Some(index) && section.resolved_file_offset.is_none() {
                section.resolved_file_offset = Some(base);
            }
        }

        let section = &table.sections[index];
        if let (Some(expr), None, Some(_)) = (section.file_offset, section.resolved_file_offset, section.resolved_base) {
            if let Some(offset) = progress.attempt(evaluate_word(program, table, expr))? {
                let section = &mut table.sections[index];
                tracing::debug!(section = %section.name, offset = format_args!("0x{:x}", offset), "resolved file offset");
                section.resolved_file_offset = Some(offset);
            }
        }
    }

    if let (Some(expr), None) = (file.start_expr, file.start) {
        file.start = progress.attempt(evaluate_word(program, table, expr))?;
    }
    if let (Some(expr), None) = (file.until_expr, file.until) {
        file.until = progress.attempt(evaluate_word(program, table, expr))?;
    }
    place_from_bounds(table, file)?;
    Ok(())
}

/// Places sections hanging off the file start or end. Sizes learned in
/// later passes let placement run further, so this is repeated.
fn place_from_bounds(table: &mut SectionTable, file: &LinkerFile) -> Result<()> {
    if let Some(start) = file.start {
        resolve_sections_from(table, file, start, 0);
    }
    if let Some(until) = file.until {
        resolve_sections_to(table, file, until, file.sections.len())?;
    }
    Ok(())
}

/// Places lower sections upward from `address`, starting at `position`.
fn resolve_sections_from(table: &mut SectionTable, file: &LinkerFile, mut address: u64, position: usize) {
    for &index in &file.sections[position..] {
        let section = &mut table.sections[index];
        if section.attachment == Attachment::Upper || section.resolved_file_offset.is_some() {
            break;
        }
        if let Some(alignment) = section.alignment {
            address = address.div_ceil(alignment) * alignment;
        }
        place(section, address);
        match section.resolved_size {
            Some(size) => address += size,
            None => break,
        }
    }
}

/// Places upper sections downward from `address`, ending before `position`.
fn resolve_sections_to(table: &mut SectionTable, file: &LinkerFile, mut address: u64, position: usize) -> Result<()> {
    for &index in file.sections[..position].iter().rev() {
        let section = &mut table.sections[index];
        if section.attachment == Attachment::Lower || section.resolved_file_offset.is_some() {
            break;
        }
        let Some(size) = section.resolved_size else {
            break;
        };
        address = match address.checked_sub(size) {
            Some(address) => address,
            None => return Err(out_of_bounds(section, file)),
        };
        if let Some(alignment) = section.alignment {
            address -= address % alignment;
        }
        place(section, address);
    }
    Ok(())
}

fn place(section: &mut LinkerSection, offset: u64) {
    tracing::debug!(
        section = %section.name,
        file = %section.file,
        offset = format_args!("0x{:x}", offset),
        "placed section"
    );
    section.resolved_file_offset = Some(offset);
    if section.base.is_none() && section.resolved_base.is_none() {
        section.resolved_base = Some(offset);
    }
}

fn unresolved_error(table: &SectionTable, files: &[LinkerFile], pending: Option<AssemblerError>) -> AssemblerError {
    if let Some(err) = pending {
        return err.into_unresolved();
    }
    for file in files {
        if let Some(&index) = file.sections.iter().find(|&&i| !table.sections[i].is_complete()) {
            let section = &table.sections[index];
            return AssemblerError::Unresolved(Diagnostic::new(
                Some(&section.location),
                format!("unable to resolve section \"{}\" in file \"{}\".", section.name, file.name),
            ));
        }
    }
    AssemblerError::Unresolved(Diagnostic::new(
        Some(&project_location()),
        "unable to resolve sections.",
    ))
}

fn generate_code(table: &mut SectionTable, file: &LinkerFile) -> Result<CompiledFile> {
    let mut output = CompiledFile::new(file.name.clone());
    if let (Some(start), Some(until)) = (file.start, file.until) {
        if start >= until {
            return Err(AssemblerError::syntax(
                Some(&file.location),
                format!("file \"{}\" has invalid bounds.", file.name),
            ));
        }
    }
    if file.sections.is_empty() {
        output.set_load_address(file.start.unwrap_or(0));
        return Ok(output);
    }

    let mut order = file.sections.clone();
    order.sort_by_key(|&i| table.sections[i].resolved_file_offset);

    let start = match file.start {
        Some(start) => start,
        None => table.sections[order[0]].resolved_file_offset.unwrap_or(0),
    };

    let mut offset = start;
    for index in order {
        let section = &mut table.sections[index];
        let target = section.resolved_file_offset.unwrap_or(offset);
        if target < start {
            return Err(out_of_bounds(section, file));
        }
        if target < offset {
            return Err(AssemblerError::syntax(
                Some(&section.location),
                format!(
                    "section \"{}\" is overlapping with previous section in file \"{}\".",
                    section.name, file.name
                ),
            ));
        }
        output.pad_to((target - start) as usize);
        offset = target;

        let size = section.resolved_size.unwrap_or(0);
        let debug = DebugSection {
            name: section.name.clone(),
            start: target,
            base: section.resolved_base.unwrap_or(target),
            compression: section.compression,
            uncompressed_size: size,
            compressed_size: None,
        };
        match section.code.as_mut() {
            Some(code) => {
                let debug = match &*code {
                    SectionCode::Compressed(compressed) => DebugSection {
                        uncompressed_size: compressed.uncompressed_size() as u64,
                        ..debug
                    },
                    SectionCode::Plain(_) => debug,
                };
                code.copy_to(debug, &mut output)?;
            }
            None => {
                return Err(AssemblerError::internal(
                    Some(&section.location),
                    format!(
                        "no code was generated for section \"{}\" in file \"{}\".",
                        section.name, file.name
                    ),
                ))
            }
        }

        offset += size;
        if let Some(until) = file.until {
            if size > 0 && offset > until {
                return Err(out_of_bounds(section, file));
            }
        }
    }

    output.set_load_address(start);
    tracing::debug!(file = %file.name, size = output.len(), load_address = start, "generated file");
    Ok(output)
}

fn out_of_bounds(section: &LinkerSection, file: &LinkerFile) -> AssemblerError {
    AssemblerError::syntax(
        Some(&section.location),
        format!("section \"{}\" is out of bounds in file \"{}\".", section.name, file.name),
    )
}

/// Evaluates every global constant once so cycles and undeclared names in
/// constants nothing uses still surface.
fn validate_constants(program: &Program, table: &SectionTable) -> Result<()> {
    let bindings = LoopBindings::new();
    let ctx = EvalContext {
        exprs: &program.exprs,
        symbols: &program.symbols,
        labels: &program.labels,
        sections: table,
        bindings: &bindings,
        current_address: Some(0),
    };
    for entry in program.symbols.globals() {
        let result = match &entry.symbol {
            Symbol::Constant(expr) => ctx.value(*expr).map(|_| ()),
            Symbol::ConditionalConstant(entries) => match ctx.select(entries, &entry.name) {
                Ok(Some(expr)) => ctx.value(expr).map(|_| ()),
                Ok(None) => Ok(()),
                Err(err) => Err(err),
            },
            _ => Ok(()),
        };
        match result {
            Err(err) if !err.is_pending() => return Err(err),
            _ => {}
        }
    }
    Ok(())
}
