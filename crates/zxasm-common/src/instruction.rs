//! Program units and the four operations every pass drives over them:
//! label resolution, unresolution, size calculation and emission.

use crate::{
    emitter::CodeEmitter,
    expr::{EvalContext, ExprArena, ExprId, LoopBindings, SectionResolver},
    label::{LabelArena, LabelId},
    opcodes::{OpcodeEntry, Operand},
    output::{WriteProtectionKind, WriteProtectionRange},
    symbol::{LoopId, SymbolTable},
    types::{AssemblerError, Result, SourceLocation},
};
use std::cell::Cell;

/// Highest address plus one an instruction may occupy.
pub const ADDRESS_SPACE: u64 = 0x10000;

/// Upper bound (exclusive) for `#repeat` counts.
pub const MAX_REPEAT_COUNT: i64 = 0x10000;

/// State threaded through one traversal of a section.
pub struct Walk<'a> {
    pub exprs: &'a ExprArena,
    pub symbols: &'a SymbolTable,
    pub labels: &'a mut LabelArena,
    pub sections: &'a dyn SectionResolver,
    pub bindings: LoopBindings,
}

impl<'a> Walk<'a> {
    pub fn new(
        exprs: &'a ExprArena,
        symbols: &'a SymbolTable,
        labels: &'a mut LabelArena,
        sections: &'a dyn SectionResolver,
    ) -> Self {
        Self {
            exprs,
            symbols,
            labels,
            sections,
            bindings: LoopBindings::new(),
        }
    }

    pub fn ctx(&self, current_address: Option<u64>) -> EvalContext<'_> {
        EvalContext {
            exprs: self.exprs,
            symbols: self.symbols,
            labels: &*self.labels,
            sections: self.sections,
            bindings: &self.bindings,
            current_address: current_address.map(|a| a as i64),
        }
    }
}

#[derive(Debug, Clone)]
pub enum DataItem {
    Expr(ExprId),
    Bytes(Vec<u8>),
}

#[derive(Debug)]
pub enum DataDirective {
    Bytes(Vec<DataItem>),
    Words(Vec<ExprId>),
    DWords(Vec<ExprId>),
    Space {
        count: ExprId,
        fill: Option<ExprId>,
        cached_size: Cell<Option<u64>>,
    },
}

impl DataDirective {
    pub fn space(count: ExprId, fill: Option<ExprId>) -> Self {
        DataDirective::Space {
            count,
            fill,
            cached_size: Cell::new(None),
        }
    }
}

#[derive(Debug)]
pub struct MacroIf {
    pub condition: ExprId,
    pub then_branch: Vec<Instruction>,
    pub else_branch: Vec<Instruction>,
}

#[derive(Debug)]
pub struct MacroRepeat {
    pub loop_id: LoopId,
    pub count: ExprId,
    pub body: Vec<Instruction>,
}

#[derive(Debug)]
pub struct WriteProtection {
    pub kind: WriteProtectionKind,
    pub start: ExprId,
    pub size: Option<ExprId>,
}

#[derive(Debug)]
pub enum InstructionKind {
    Label(LabelId),
    Opcode {
        entry: &'static OpcodeEntry,
        operands: Vec<Operand>,
    },
    Data(DataDirective),
    If(MacroIf),
    Repeat(MacroRepeat),
    WriteProtection(WriteProtection),
    /// `#ensure`: checked at emission.
    Ensure(ExprId),
}

#[derive(Debug)]
pub struct Instruction {
    pub location: SourceLocation,
    pub kind: InstructionKind,
}

impl Instruction {
    pub fn new(location: SourceLocation, kind: InstructionKind) -> Self {
        Self { location, kind }
    }

    /// Assigns addresses to labels, moving `address` past the instruction.
    pub fn resolve_label(&self, address: &mut u64, walk: &mut Walk<'_>) -> Result<()> {
        match &self.kind {
            InstructionKind::Label(label) => {
                if *address >= ADDRESS_SPACE {
                    return Err(self.over_64k());
                }
                walk.labels.get_mut(*label).set_address(*address)
            }
            InstructionKind::If(block) => match self.branch(block, walk)? {
                Some(branch) => resolve_labels(branch, address, walk),
                None => Ok(()),
            },
            InstructionKind::Repeat(block) => {
                self.repeat(block, walk, |body, walk| resolve_labels(body, &mut *address, walk))
            }
            _ => {
                let size = self.calculate_size_in_bytes(walk)?;
                self.advance(address, size)
            }
        }
    }

    /// Clears every label address in this instruction, in both branches of
    /// conditionals.
    pub fn unresolve_label(&self, labels: &mut LabelArena) {
        match &self.kind {
            InstructionKind::Label(label) => labels.get_mut(*label).unset_addresses(),
            InstructionKind::If(block) => {
                block.then_branch.iter().for_each(|i| i.unresolve_label(labels));
                block.else_branch.iter().for_each(|i| i.unresolve_label(labels));
            }
            InstructionKind::Repeat(block) => block.body.iter().for_each(|i| i.unresolve_label(labels)),
            _ => {}
        }
    }

    pub fn calculate_size_in_bytes(&self, walk: &mut Walk<'_>) -> Result<u64> {
        match &self.kind {
            InstructionKind::Label(_) | InstructionKind::WriteProtection(_) | InstructionKind::Ensure(_) => Ok(0),
            InstructionKind::Opcode { entry, .. } => Ok(entry.size() as u64),
            InstructionKind::Data(data) => self.data_size(data, walk),
            InstructionKind::If(block) => match self.branch(block, walk)? {
                Some(branch) => size_of(branch, walk),
                None => Ok(0),
            },
            InstructionKind::Repeat(block) => {
                let mut total = 0u64;
                self.repeat(block, walk, |body, walk| {
                    total += size_of(body, walk)?;
                    Ok(())
                })?;
                Ok(total)
            }
        }
    }

    pub fn emit_code(&self, emitter: &mut dyn CodeEmitter, address: &mut u64, walk: &mut Walk<'_>) -> Result<()> {
        let location = Some(&self.location);
        match &self.kind {
            InstructionKind::Label(_) => Ok(()),
            InstructionKind::Opcode { entry, operands } => {
                let bytes = entry.encode(operands, &walk.ctx(Some(*address)), *address)?;
                emitter.emit_bytes(location, &bytes)?;
                self.advance(address, bytes.len() as u64)
            }
            InstructionKind::Data(data) => {
                let bytes = self.data_bytes(data, *address, walk)?;
                emitter.emit_bytes(location, &bytes)?;
                self.advance(address, bytes.len() as u64)
            }
            InstructionKind::If(block) => match self.branch(block, walk)? {
                Some(branch) => emit_all(branch, emitter, address, walk),
                None => Ok(()),
            },
            InstructionKind::Repeat(block) => {
                self.repeat(block, walk, |body, walk| emit_all(body, &mut *emitter, &mut *address, walk))
            }
            InstructionKind::WriteProtection(wp) => {
                let ctx = walk.ctx(Some(*address));
                let start = ctx.unsigned_word(wp.start)?;
                let size = match wp.size {
                    Some(size) => Some(ctx.unsigned_word(size)?),
                    None => None,
                };
                emitter.add_write_protection(WriteProtectionRange {
                    kind: wp.kind,
                    start,
                    size,
                    location: Some(self.location.clone()),
                })
            }
            InstructionKind::Ensure(condition) => {
                if walk.ctx(Some(*address)).value(*condition)?.is_true() {
                    Ok(())
                } else {
                    Err(AssemblerError::evaluation(
                        location,
                        format!("expression is false: {}.", walk.exprs.to_source(*condition)),
                    ))
                }
            }
        }
    }

    /// Moves to the next loop iteration. Labels of nested loops only catch up
    /// their read cursor, since the nested loop moved their write cursor.
    pub fn advance_counters(&self, labels: &mut LabelArena) {
        match &self.kind {
            InstructionKind::Label(label) => labels.get_mut(*label).advance_counters(),
            InstructionKind::If(block) => {
                block.then_branch.iter().for_each(|i| i.advance_counters(labels));
                block.else_branch.iter().for_each(|i| i.advance_counters(labels));
            }
            InstructionKind::Repeat(_) => self.for_each_label(labels, &mut |label| label.sync_read_counter()),
            _ => {}
        }
    }

    pub fn save_read_counter(&self, labels: &mut LabelArena) {
        self.for_each_label(labels, &mut |label| label.save_read_counter());
    }

    pub fn restore_read_counter(&self, labels: &mut LabelArena) -> Result<()> {
        let mut result = Ok(());
        self.for_each_label(labels, &mut |label| {
            if let Err(err) = label.restore_read_counter() {
                result = Err(err);
            }
        });
        result
    }

    /// Number of instructions whose value may depend on something not yet
    /// known when the walk reaches them.
    pub fn count_forward_references(&self, exprs: &ExprArena) -> usize {
        let refs = |ids: &[ExprId]| ids.iter().any(|id| exprs.has_references(*id)) as usize;
        match &self.kind {
            InstructionKind::Label(_) => 0,
            InstructionKind::Opcode { operands, .. } => {
                let ids: Vec<ExprId> = operands.iter().filter_map(Operand::expr).collect();
                refs(&ids)
            }
            InstructionKind::Data(DataDirective::Bytes(items)) => {
                let ids: Vec<ExprId> = items
                    .iter()
                    .filter_map(|item| match item {
                        DataItem::Expr(e) => Some(*e),
                        DataItem::Bytes(_) => None,
                    })
                    .collect();
                refs(&ids)
            }
            InstructionKind::Data(DataDirective::Words(ids) | DataDirective::DWords(ids)) => refs(ids),
            InstructionKind::Data(DataDirective::Space { count, fill, .. }) => {
                refs(&[*count]) + fill.map_or(0, |f| refs(&[f]))
            }
            InstructionKind::If(block) => {
                refs(&[block.condition])
                    + block
                        .then_branch
                        .iter()
                        .chain(&block.else_branch)
                        .map(|i| i.count_forward_references(exprs))
                        .sum::<usize>()
            }
            InstructionKind::Repeat(block) => {
                refs(&[block.count])
                    + block
                        .body
                        .iter()
                        .map(|i| i.count_forward_references(exprs))
                        .sum::<usize>()
            }
            InstructionKind::WriteProtection(wp) => refs(&[wp.start]) + wp.size.map_or(0, |s| refs(&[s])),
            InstructionKind::Ensure(condition) => refs(&[*condition]),
        }
    }

    fn for_each_label(&self, labels: &mut LabelArena, f: &mut dyn FnMut(&mut crate::label::Label)) {
        match &self.kind {
            InstructionKind::Label(label) => f(labels.get_mut(*label)),
            InstructionKind::If(block) => {
                for i in block.then_branch.iter().chain(&block.else_branch) {
                    i.for_each_label(labels, f);
                }
            }
            InstructionKind::Repeat(block) => {
                for i in &block.body {
                    i.for_each_label(labels, f);
                }
            }
            _ => {}
        }
    }

    fn advance(&self, address: &mut u64, size: u64) -> Result<()> {
        *address += size;
        if *address > ADDRESS_SPACE {
            return Err(self.over_64k());
        }
        Ok(())
    }

    fn over_64k(&self) -> AssemblerError {
        AssemblerError::evaluation(Some(&self.location), "address is over 64K.")
    }

    fn branch<'b>(&self, block: &'b MacroIf, walk: &Walk<'_>) -> Result<Option<&'b [Instruction]>> {
        let taken = if walk.ctx(None).value(block.condition)?.is_true() {
            &block.then_branch
        } else {
            &block.else_branch
        };
        Ok(if taken.is_empty() { None } else { Some(taken) })
    }

    fn repeat_count(&self, block: &MacroRepeat, walk: &Walk<'_>) -> Result<i64> {
        let count = walk.ctx(None).value(block.count)?.number;
        if count < 0 {
            return Err(AssemblerError::evaluation(Some(&self.location), "repeat counter is negative."));
        }
        if count >= MAX_REPEAT_COUNT {
            return Err(AssemblerError::evaluation(Some(&self.location), "repeat counter is too large."));
        }
        Ok(count)
    }

    /// Runs `phase` over the body once per iteration with the loop variable
    /// bound, keeping label cursors in step.
    fn repeat(
        &self,
        block: &MacroRepeat,
        walk: &mut Walk<'_>,
        mut phase: impl FnMut(&[Instruction], &mut Walk<'_>) -> Result<()>,
    ) -> Result<()> {
        let count = self.repeat_count(block, walk)?;
        if count == 0 {
            return Ok(());
        }

        block.body.iter().for_each(|i| i.save_read_counter(walk.labels));
        walk.bindings.push(block.loop_id, 0);
        let mut result = Ok(());
        for index in 0..count {
            walk.bindings.set_top(index);
            result = phase(&block.body, walk);
            if result.is_err() {
                break;
            }
            block.body.iter().for_each(|i| i.advance_counters(walk.labels));
        }
        walk.bindings.pop();

        // cursors go back to the first instance even when an iteration failed
        let restored = block.body.iter().try_for_each(|i| i.restore_read_counter(walk.labels));
        result.and(restored)
    }

    fn data_size(&self, data: &DataDirective, walk: &Walk<'_>) -> Result<u64> {
        match data {
            DataDirective::Bytes(items) => Ok(items
                .iter()
                .map(|item| match item {
                    DataItem::Expr(_) => 1,
                    DataItem::Bytes(bytes) => bytes.len() as u64,
                })
                .sum()),
            DataDirective::Words(ids) => Ok(ids.len() as u64 * 2),
            DataDirective::DWords(ids) => Ok(ids.len() as u64 * 4),
            DataDirective::Space { count, cached_size, .. } => {
                let size = u64::from(walk.ctx(None).unsigned_word(*count)?);
                // inside a loop the count may legitimately vary per iteration
                if walk.bindings.is_empty() {
                    match cached_size.get() {
                        Some(cached) if cached != size => {
                            return Err(AssemblerError::internal(
                                Some(&self.location),
                                format!("size of data directive changed between passes ({} != {}).", cached, size),
                            ))
                        }
                        _ => cached_size.set(Some(size)),
                    }
                }
                Ok(size)
            }
        }
    }

    fn data_bytes(&self, data: &DataDirective, address: u64, walk: &Walk<'_>) -> Result<Vec<u8>> {
        let ctx = walk.ctx(Some(address));
        let mut bytes = Vec::new();
        match data {
            DataDirective::Bytes(items) => {
                for item in items {
                    match item {
                        DataItem::Expr(e) => bytes.push(ctx.byte(*e)?),
                        DataItem::Bytes(raw) => bytes.extend_from_slice(raw),
                    }
                }
            }
            DataDirective::Words(ids) => {
                for e in ids {
                    bytes.extend_from_slice(&ctx.word(*e)?.to_le_bytes());
                }
            }
            DataDirective::DWords(ids) => {
                for e in ids {
                    bytes.extend_from_slice(&ctx.dword(*e)?.to_le_bytes());
                }
            }
            DataDirective::Space { fill, .. } => {
                let size = self.data_size(data, walk)? as usize;
                let fill = match fill {
                    Some(e) => ctx.byte(*e)?,
                    None => 0,
                };
                bytes.resize(size, fill);
            }
        }
        Ok(bytes)
    }
}

pub fn resolve_labels(instructions: &[Instruction], address: &mut u64, walk: &mut Walk<'_>) -> Result<()> {
    for instruction in instructions {
        instruction.resolve_label(address, walk)?;
    }
    Ok(())
}

pub fn size_of(instructions: &[Instruction], walk: &mut Walk<'_>) -> Result<u64> {
    let mut total = 0;
    for instruction in instructions {
        total += instruction.calculate_size_in_bytes(walk)?;
    }
    Ok(total)
}

pub fn emit_all(
    instructions: &[Instruction],
    emitter: &mut dyn CodeEmitter,
    address: &mut u64,
    walk: &mut Walk<'_>,
) -> Result<()> {
    for instruction in instructions {
        instruction.emit_code(emitter, address, walk)?;
    }
    Ok(())
}
