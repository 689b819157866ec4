use crate::{
    emitter::CodeEmitter,
    expr::ExprArena,
    instruction::{emit_all, resolve_labels, size_of, Instruction, Walk},
    label::LabelArena,
    symbol::{LoopId, SymbolTable},
    types::{Result, SourceLocation},
};
use std::cell::Cell;
use std::collections::HashMap;

/// Named, ordered list of instructions.
#[derive(Debug)]
pub struct ProgramSection {
    name: String,
    location: Option<SourceLocation>,
    instructions: Vec<Instruction>,
    cached_size: Cell<Option<u64>>,
}

impl ProgramSection {
    pub fn new(name: impl Into<String>, location: Option<SourceLocation>) -> Self {
        Self {
            name: name.into(),
            location,
            instructions: Vec::new(),
            cached_size: Cell::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Where the section was first mentioned.
    pub fn location(&self) -> Option<&SourceLocation> {
        self.location.as_ref()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn add_instruction(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn unresolve_labels(&self, labels: &mut LabelArena) {
        for instruction in &self.instructions {
            instruction.unresolve_label(labels);
        }
        self.cached_size.set(None);
    }

    /// Assigns addresses starting at `base`. Returns the size in bytes.
    pub fn resolve_labels(&self, base: u64, walk: &mut Walk<'_>) -> Result<u64> {
        walk.labels.reset_counters();
        let mut address = base;
        resolve_labels(&self.instructions, &mut address, walk)?;
        let size = address - base;
        self.cached_size.set(Some(size));
        Ok(size)
    }

    pub fn calculate_size_in_bytes(&self, walk: &mut Walk<'_>) -> Result<u64> {
        if let Some(size) = self.cached_size.get() {
            return Ok(size);
        }
        walk.labels.reset_counters();
        let size = size_of(&self.instructions, walk)?;
        self.cached_size.set(Some(size));
        Ok(size)
    }

    /// Emits the section as placed at `base`. Returns the number of bytes.
    pub fn emit_code(&self, emitter: &mut dyn CodeEmitter, base: u64, walk: &mut Walk<'_>) -> Result<u64> {
        walk.labels.reset_counters();
        let mut address = base;
        emit_all(&self.instructions, emitter, &mut address, walk)?;
        Ok(address - base)
    }

    pub fn count_forward_references(&self, exprs: &ExprArena) -> usize {
        self.instructions
            .iter()
            .map(|i| i.count_forward_references(exprs))
            .sum()
    }
}

/// Everything one build parsed: expressions, labels, symbols and sections.
#[derive(Debug, Default)]
pub struct Program {
    pub exprs: ExprArena,
    pub labels: LabelArena,
    pub symbols: SymbolTable,
    sections: Vec<ProgramSection>,
    section_index: HashMap<String, usize>,
    loops: usize,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_add_section(&mut self, name: &str, location: Option<&SourceLocation>) -> usize {
        if let Some(&index) = self.section_index.get(name) {
            return index;
        }
        self.sections.push(ProgramSection::new(name, location.cloned()));
        let index = self.sections.len() - 1;
        self.section_index.insert(name.to_string(), index);
        index
    }

    pub fn section_index(&self, name: &str) -> Option<usize> {
        self.section_index.get(name).copied()
    }

    pub fn section(&self, name: &str) -> Option<&ProgramSection> {
        self.section_index(name).map(|index| &self.sections[index])
    }

    pub fn section_at(&self, index: usize) -> &ProgramSection {
        &self.sections[index]
    }

    pub fn section_at_mut(&mut self, index: usize) -> &mut ProgramSection {
        &mut self.sections[index]
    }

    /// Sections in declaration order.
    pub fn sections(&self) -> &[ProgramSection] {
        &self.sections
    }

    /// Sections next to the state a walk needs, borrowed separately.
    pub fn parts(&mut self) -> (&[ProgramSection], &ExprArena, &SymbolTable, &mut LabelArena) {
        (&self.sections, &self.exprs, &self.symbols, &mut self.labels)
    }

    pub fn new_loop_id(&mut self) -> LoopId {
        self.loops += 1;
        LoopId(self.loops - 1)
    }

    pub fn count_forward_references(&self) -> usize {
        self.sections
            .iter()
            .map(|s| s.count_forward_references(&self.exprs))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{ExprKind, NoSections};
    use crate::instruction::{DataDirective, DataItem, InstructionKind};
    use crate::label::Label;

    fn loc() -> SourceLocation {
        SourceLocation::new("program", 1)
    }

    #[test]
    fn sections_keep_declaration_order() {
        let mut program = Program::new();
        assert_eq!(program.get_or_add_section("b", None), 0);
        assert_eq!(program.get_or_add_section("a", None), 1);
        assert_eq!(program.get_or_add_section("b", None), 0);
        let names: Vec<&str> = program.sections().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn resolving_twice_keeps_addresses() {
        let mut program = Program::new();
        let one = program.exprs.alloc(ExprKind::Number(1), loc());
        let first = program.labels.alloc(Label::new("first", loc()));
        let second = program.labels.alloc(Label::new("second", loc()));
        let index = program.get_or_add_section("code", None);
        let section = program.section_at_mut(index);
        section.add_instruction(Instruction::new(loc(), InstructionKind::Label(first)));
        section.add_instruction(Instruction::new(
            loc(),
            InstructionKind::Data(DataDirective::Bytes(vec![DataItem::Expr(one), DataItem::Bytes(vec![2, 3])])),
        ));
        section.add_instruction(Instruction::new(loc(), InstructionKind::Label(second)));

        let Program {
            exprs,
            labels,
            symbols,
            sections,
            ..
        } = &mut program;
        for _ in 0..2 {
            let mut walk = Walk::new(exprs, symbols, labels, &NoSections);
            assert_eq!(sections[0].resolve_labels(0x8000, &mut walk).unwrap(), 3);
        }
        assert_eq!(program.labels.get(first).address(), Some(0x8000));
        assert_eq!(program.labels.get(second).address(), Some(0x8003));
    }
}
