//! Builds the program model from tokens.

use crate::{
    expr::{BinaryOp, ExprId, ExprKind, UnaryOp},
    instruction::{DataDirective, DataItem, Instruction, InstructionKind, MacroIf, MacroRepeat, WriteProtection},
    label::{Label, LabelId},
    lexer::{tokenize, Token, TokenKind},
    opcodes::{find_opcode, is_mnemonic, Operand, Register},
    output::WriteProtectionKind,
    program::Program,
    symbol::{ConditionalTarget, LoopId, ScopeId, Symbol},
    types::{AssemblerError, Result, SourceLocation},
};

/// Parses `source` into `program`. Sections, labels and symbols accumulate,
/// so several files may be parsed into one program.
pub fn parse_source(program: &mut Program, file: &str, source: &str) -> Result<()> {
    let tokens = tokenize(file, source)?;
    let mut parser = Parser::new(program, tokens);
    parser.parse()
}

/// Parses a standalone expression, as written in a project file, in the
/// global scope.
pub fn parse_expression(program: &mut Program, text: &str, location: &SourceLocation) -> Result<ExprId> {
    let mut tokens = tokenize(&location.file, text)?;
    for token in &mut tokens {
        token.location = location.clone();
        token.first_on_line = false;
    }
    let mut parser = Parser::new(program, tokens);
    let expr = parser.expression()?;
    if !parser.at(&TokenKind::Eof) {
        return Err(parser.unexpected());
    }
    Ok(expr)
}

enum BlockKind {
    If {
        condition: ExprId,
        in_else: bool,
    },
    Repeat {
        loop_id: LoopId,
        count: ExprId,
        outer_scope: ScopeId,
    },
}

struct Block {
    location: SourceLocation,
    kind: BlockKind,
    body: Vec<Instruction>,
    else_body: Vec<Instruction>,
}

enum DataKind {
    Bytes,
    Words,
    DWords,
    Space,
}

fn data_kind(name: &str) -> Option<DataKind> {
    match name.to_ascii_lowercase().as_str() {
        "db" | "defb" | "defm" => Some(DataKind::Bytes),
        "dw" | "defw" => Some(DataKind::Words),
        "dd" => Some(DataKind::DWords),
        "ds" | "defs" => Some(DataKind::Space),
        _ => None,
    }
}

fn binary_op(kind: &TokenKind) -> Option<(u8, BinaryOp)> {
    let op = match kind {
        TokenKind::DoubleBar => (1, BinaryOp::LogicOr),
        TokenKind::DoubleAmpersand => (2, BinaryOp::LogicAnd),
        TokenKind::Bar => (3, BinaryOp::BitwiseOr),
        TokenKind::Caret => (4, BinaryOp::BitwiseXor),
        TokenKind::Ampersand => (5, BinaryOp::BitwiseAnd),
        TokenKind::Equal => (6, BinaryOp::Equal),
        TokenKind::NotEqual => (6, BinaryOp::NotEqual),
        TokenKind::Less => (7, BinaryOp::Less),
        TokenKind::LessEqual => (7, BinaryOp::LessEqual),
        TokenKind::Greater => (7, BinaryOp::Greater),
        TokenKind::GreaterEqual => (7, BinaryOp::GreaterEqual),
        TokenKind::Shl => (8, BinaryOp::ShiftLeft),
        TokenKind::Shr => (8, BinaryOp::ShiftRight),
        TokenKind::Plus => (9, BinaryOp::Add),
        TokenKind::Minus => (9, BinaryOp::Subtract),
        TokenKind::Star => (10, BinaryOp::Multiply),
        TokenKind::Slash => (10, BinaryOp::Divide),
        TokenKind::Percent => (10, BinaryOp::Modulo),
        _ => return None,
    };
    Some(op)
}

struct Parser<'p> {
    program: &'p mut Program,
    tokens: Vec<Token>,
    pos: usize,
    scope: ScopeId,
    section: Option<usize>,
    local_prefix: Option<String>,
    blocks: Vec<Block>,
    /// Set while an EQU expression is parsed; holds the label `$` binds to.
    equ_label: Option<Option<LabelId>>,
}

impl<'p> Parser<'p> {
    fn new(program: &'p mut Program, tokens: Vec<Token>) -> Self {
        let scope = program.symbols.global();
        Self {
            program,
            tokens,
            pos: 0,
            scope,
            section: None,
            local_prefix: None,
            blocks: Vec::new(),
            equ_label: None,
        }
    }

    fn parse(&mut self) -> Result<()> {
        while !self.at(&TokenKind::Eof) {
            self.line()?;
        }
        if let Some(block) = self.blocks.last() {
            let message = match block.kind {
                BlockKind::If { .. } => "missing 'endif'.",
                BlockKind::Repeat { .. } => "missing 'endrepeat'.",
            };
            return Err(AssemblerError::syntax(Some(&block.location), message));
        }
        Ok(())
    }

    // token access

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let index = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[index]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn at(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    /// End of statement: end of input or a token starting the next line.
    fn at_eol_at(&self, offset: usize) -> bool {
        let token = self.peek_at(offset);
        token.kind == TokenKind::Eof || (token.first_on_line && self.pos + offset > 0)
    }

    fn at_eol(&self) -> bool {
        self.at_eol_at(0)
    }

    fn location(&self) -> SourceLocation {
        if self.at_eol() && self.pos > 0 {
            self.tokens[self.pos - 1].location.clone()
        } else {
            self.peek().location.clone()
        }
    }

    fn unexpected(&self) -> AssemblerError {
        let token = self.peek();
        let what = if self.at_eol() && token.kind != TokenKind::Eof {
            "end of line".to_string()
        } else {
            token.describe()
        };
        AssemblerError::syntax(Some(&self.location()), format!("unexpected {}.", what))
    }

    fn expect_eol(&self) -> Result<()> {
        if self.at_eol() {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<()> {
        if !self.at_eol() && self.at(&kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn identifier(&mut self) -> Result<String> {
        match &self.peek().kind {
            TokenKind::Identifier(name) if !self.at_eol() => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected()),
        }
    }

    // statements

    fn line(&mut self) -> Result<()> {
        if self.at(&TokenKind::Hash) {
            self.advance();
            return self.directive();
        }

        let start = self.pos;
        let token = self.peek().clone();
        match &token.kind {
            TokenKind::GlobalLabel(name) => {
                self.local_prefix = Some(name.clone());
                self.advance();
                self.define_label(name, &token.location)?;
            }
            TokenKind::FullLabel(name) => {
                self.advance();
                self.define_label(name, &token.location)?;
            }
            TokenKind::LocalLabel(name) => {
                let name = self.local_name(name, &token.location)?;
                self.advance();
                self.define_label(&name, &token.location)?;
            }
            _ => {}
        }
        if self.pos > start && self.at_eol() {
            return Ok(());
        }

        let token = self.peek().clone();
        match &token.kind {
            TokenKind::Identifier(name) if is_mnemonic(name) => {
                self.advance();
                self.opcode(name, &token.location)
            }
            TokenKind::Identifier(name) => {
                self.advance();
                if let Some(kind) = data_kind(name) {
                    return self.data(kind, &token.location);
                }
                self.named_statement(name.clone(), false, &token)
            }
            TokenKind::LocalName(name) => {
                let name = self.local_name(name, &token.location)?;
                self.advance();
                self.named_statement(name, true, &token)
            }
            _ => Err(AssemblerError::syntax(Some(&token.location), "expected opcode or directive.")),
        }
    }

    /// `name equ expr`, `name = expr` or `name db ...`.
    fn named_statement(&mut self, name: String, local: bool, token: &Token) -> Result<()> {
        let next = self.peek().clone();
        let is_equ = !self.at_eol()
            && match &next.kind {
                TokenKind::Identifier(word) => word.eq_ignore_ascii_case("equ"),
                TokenKind::Assign => true,
                _ => false,
            };
        if is_equ {
            self.advance();
            return self.constant(&name, &token.location);
        }

        if let TokenKind::Identifier(word) = &next.kind {
            if let (false, Some(kind)) = (self.at_eol(), data_kind(word)) {
                self.advance();
                if !local {
                    self.local_prefix = Some(name.clone());
                }
                self.define_label(&name, &token.location)?;
                return self.data(kind, &next.location);
            }
        }

        if local {
            return Err(AssemblerError::syntax(
                Some(&token.location),
                "missing ':' after local label name.",
            ));
        }
        if self.at_eol() {
            return Err(AssemblerError::syntax(
                Some(&token.location),
                format!("unknown opcode \"{}\".", name),
            ));
        }
        Err(self.unexpected())
    }

    fn local_name(&self, name: &str, location: &SourceLocation) -> Result<String> {
        match &self.local_prefix {
            Some(prefix) => Ok(format!("{}@@{}", prefix, name)),
            None => Err(AssemblerError::syntax(
                Some(location),
                "local label name without preceding global label.",
            )),
        }
    }

    /// Conjunction of the conditions guarding the current position, if any.
    fn guard(&mut self, location: &SourceLocation) -> Option<ExprId> {
        let conditions: Vec<(ExprId, bool)> = self
            .blocks
            .iter()
            .filter_map(|block| match block.kind {
                BlockKind::If { condition, in_else } => Some((condition, in_else)),
                BlockKind::Repeat { .. } => None,
            })
            .collect();

        let exprs = &mut self.program.exprs;
        conditions.into_iter().fold(None, |guard, (condition, in_else)| {
            let condition = if in_else {
                exprs.alloc(ExprKind::Unary(UnaryOp::LogicNot, condition), location.clone())
            } else {
                condition
            };
            Some(match guard {
                Some(guard) => exprs.alloc(ExprKind::Binary(BinaryOp::LogicAnd, guard, condition), location.clone()),
                None => condition,
            })
        })
    }

    fn define_symbol(&mut self, name: &str, location: &SourceLocation, target: ConditionalTarget) -> Result<()> {
        let added = match self.guard(location) {
            Some(condition) => self
                .program
                .symbols
                .add_conditional(self.scope, name, location.clone(), condition, target),
            None => {
                let symbol = match target {
                    ConditionalTarget::Constant(expr) => Symbol::Constant(expr),
                    ConditionalTarget::Label(label) => Symbol::Label(label),
                };
                self.program.symbols.add_symbol(self.scope, name, location.clone(), symbol)
            }
        };
        if added {
            Ok(())
        } else {
            Err(AssemblerError::syntax(
                Some(location),
                format!("duplicate identifier \"{}\".", name),
            ))
        }
    }

    fn define_label(&mut self, name: &str, location: &SourceLocation) -> Result<()> {
        self.require_section(location, "label not in a section.")?;
        let label = self.program.labels.alloc(Label::new(name, location.clone()));
        self.define_symbol(name, location, ConditionalTarget::Label(label))?;
        self.add_instruction(Instruction::new(location.clone(), InstructionKind::Label(label)))
    }

    fn constant(&mut self, name: &str, location: &SourceLocation) -> Result<()> {
        self.equ_label = Some(None);
        let expr = self.expression();
        let label = self.equ_label.take().flatten();
        let expr = expr?;
        self.expect_eol()?;
        if let Some(label) = label {
            self.require_section(location, "'$' in EQU is not allowed outside of a section.")?;
            self.add_instruction(Instruction::new(location.clone(), InstructionKind::Label(label)))?;
        }
        self.define_symbol(name, location, ConditionalTarget::Constant(expr))
    }

    fn require_section(&self, location: &SourceLocation, message: &str) -> Result<()> {
        match self.section {
            Some(_) => Ok(()),
            None => Err(AssemblerError::syntax(Some(location), message)),
        }
    }

    fn add_instruction(&mut self, instruction: Instruction) -> Result<()> {
        let Some(section) = self.section else {
            return Err(AssemblerError::syntax(
                Some(&instruction.location),
                "code or data not in a section.",
            ));
        };
        match self.blocks.last_mut() {
            Some(Block {
                kind: BlockKind::If { in_else: true, .. },
                else_body,
                ..
            }) => else_body.push(instruction),
            Some(block) => block.body.push(instruction),
            None => self.program.section_at_mut(section).add_instruction(instruction),
        }
        Ok(())
    }

    fn data(&mut self, kind: DataKind, location: &SourceLocation) -> Result<()> {
        let directive = match kind {
            DataKind::Bytes => {
                let mut items = Vec::new();
                loop {
                    let string = match &self.peek().kind {
                        TokenKind::Str(bytes) if !self.at_eol() => Some(bytes.clone()),
                        _ => None,
                    };
                    match string {
                        Some(bytes) if self.at_eol_at(1) || self.peek_at(1).kind == TokenKind::Comma => {
                            self.advance();
                            if !bytes.is_empty() {
                                items.push(DataItem::Bytes(bytes));
                            }
                        }
                        _ => items.push(DataItem::Expr(self.expression()?)),
                    }
                    if !self.comma() {
                        break;
                    }
                }
                DataDirective::Bytes(items)
            }
            DataKind::Words => DataDirective::Words(self.expression_list()?),
            DataKind::DWords => DataDirective::DWords(self.expression_list()?),
            DataKind::Space => {
                let count = self.expression()?;
                let fill = if self.comma() { Some(self.expression()?) } else { None };
                DataDirective::space(count, fill)
            }
        };
        self.expect_eol()?;
        self.add_instruction(Instruction::new(location.clone(), InstructionKind::Data(directive)))
    }

    fn comma(&mut self) -> bool {
        if !self.at_eol() && self.at(&TokenKind::Comma) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expression_list(&mut self) -> Result<Vec<ExprId>> {
        let mut list = vec![self.expression()?];
        while self.comma() {
            list.push(self.expression()?);
        }
        Ok(list)
    }

    fn opcode(&mut self, mnemonic: &str, location: &SourceLocation) -> Result<()> {
        let mut operands = Vec::new();
        if !self.at_eol() {
            operands.push(self.operand()?);
            while self.comma() {
                operands.push(self.operand()?);
            }
        }
        self.expect_eol()?;
        let entry = find_opcode(mnemonic, &operands, location)?;
        self.add_instruction(Instruction::new(
            location.clone(),
            InstructionKind::Opcode { entry, operands },
        ))
    }

    fn ends_operand_at(&self, offset: usize) -> bool {
        self.at_eol_at(offset) || self.peek_at(offset).kind == TokenKind::Comma
    }

    fn register_at(&self, offset: usize) -> Option<Register> {
        match &self.peek_at(offset).kind {
            TokenKind::Identifier(name) if !self.at_eol_at(offset) => Register::from_name(name),
            _ => None,
        }
    }

    /// Offset of the `)` matching the `(` under the cursor, if it is on the
    /// same line.
    fn matching_paren(&self) -> Option<usize> {
        let mut depth = 0usize;
        let mut offset = 0;
        loop {
            if offset > 0 && self.at_eol_at(offset) {
                return None;
            }
            match self.peek_at(offset).kind {
                TokenKind::OpenParen => depth += 1,
                TokenKind::CloseParen => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(offset);
                    }
                }
                _ => {}
            }
            offset += 1;
        }
    }

    fn operand(&mut self) -> Result<Operand> {
        if let Some(register) = self.register_at(0) {
            if self.ends_operand_at(1) {
                self.advance();
                return Ok(Operand::Name(register));
            }
        }

        if self.at(&TokenKind::OpenParen) {
            if let Some(close) = self.matching_paren().filter(|&close| self.ends_operand_at(close + 1)) {
                if let (Some(register), 2) = (self.register_at(1), close) {
                    self.pos += 3;
                    return Ok(Operand::Indirect(register));
                }
                if let Some(register) = self.register_at(1).filter(|r| r.is_index()) {
                    if matches!(self.peek_at(2).kind, TokenKind::Plus | TokenKind::Minus) {
                        self.pos += 2;
                        let displacement = self.expression()?;
                        self.expect(TokenKind::CloseParen)?;
                        return Ok(Operand::Indexed(register, displacement));
                    }
                }
                self.advance();
                let address = self.expression()?;
                self.expect(TokenKind::CloseParen)?;
                return Ok(Operand::Memory(address));
            }
        }

        Ok(Operand::Immediate(self.expression()?))
    }

    // directives

    fn directive(&mut self) -> Result<()> {
        let location = self.location();
        let name = self.identifier()?;
        match name.to_ascii_lowercase().as_str() {
            "section" => self.section_directive(&location),
            "repeat" => self.repeat(location),
            "endrepeat" => self.end_repeat(&location),
            "if" => self.if_directive(location),
            "else" => self.else_directive(&location),
            "endif" => self.end_if(&location),
            "allowwrite" => self.write_protection(WriteProtectionKind::AllowWrite, &location),
            "disallowwrite" => self.write_protection(WriteProtectionKind::DisallowWrite, &location),
            "pushallowwrite" => self.write_protection(WriteProtectionKind::PushAllowWrite, &location),
            "pushdisallowwrite" => self.write_protection(WriteProtectionKind::PushDisallowWrite, &location),
            "popallowwrite" => self.write_protection(WriteProtectionKind::PopAllowWrite, &location),
            "popallowwriteafter" => self.write_protection(WriteProtectionKind::PopAllowWriteAfter, &location),
            "assertbank" => {
                let start = self.expression()?;
                self.expect_eol()?;
                self.add_instruction(Instruction::new(
                    location,
                    InstructionKind::WriteProtection(WriteProtection {
                        kind: WriteProtectionKind::AssertBank,
                        start,
                        size: None,
                    }),
                ))
            }
            "ensure" => {
                let condition = self.expression()?;
                self.expect_eol()?;
                self.add_instruction(Instruction::new(location, InstructionKind::Ensure(condition)))
            }
            _ => Err(AssemblerError::syntax(
                Some(&location),
                format!("unknown directive \"#{}\".", name),
            )),
        }
    }

    fn section_directive(&mut self, location: &SourceLocation) -> Result<()> {
        let name = self.identifier()?;
        self.expect_eol()?;
        if !self.blocks.is_empty() {
            return Err(AssemblerError::syntax(
                Some(location),
                "'section' directive is not allowed in this context.",
            ));
        }
        self.section = Some(self.program.get_or_add_section(&name, Some(location)));
        Ok(())
    }

    fn open_block(&mut self, location: SourceLocation, kind: BlockKind) -> Result<()> {
        self.require_section(&location, "code or data not in a section.")?;
        self.blocks.push(Block {
            location,
            kind,
            body: Vec::new(),
            else_body: Vec::new(),
        });
        Ok(())
    }

    fn repeat(&mut self, location: SourceLocation) -> Result<()> {
        let count = self.expression()?;
        let variable = if self.comma() {
            let variable_location = self.location();
            Some((self.identifier()?, variable_location))
        } else {
            None
        };
        self.expect_eol()?;

        let loop_id = self.program.new_loop_id();
        let outer_scope = self.scope;
        let scope = self.program.symbols.push_scope(outer_scope, true);
        if let Some((name, variable_location)) = variable {
            let symbol = Symbol::RepeatVariable(loop_id);
            if !self.program.symbols.add_local_symbol(scope, &name, variable_location.clone(), symbol) {
                return Err(AssemblerError::syntax(
                    Some(&variable_location),
                    format!("duplicate identifier \"{}\".", name),
                ));
            }
        }
        self.open_block(
            location,
            BlockKind::Repeat {
                loop_id,
                count,
                outer_scope,
            },
        )?;
        self.scope = scope;
        Ok(())
    }

    fn end_repeat(&mut self, location: &SourceLocation) -> Result<()> {
        self.expect_eol()?;
        match self.blocks.pop() {
            Some(Block {
                location: block_location,
                kind: BlockKind::Repeat {
                    loop_id,
                    count,
                    outer_scope,
                },
                body,
                ..
            }) => {
                self.scope = outer_scope;
                self.add_instruction(Instruction::new(
                    block_location,
                    InstructionKind::Repeat(MacroRepeat { loop_id, count, body }),
                ))
            }
            other => {
                self.blocks.extend(other);
                Err(AssemblerError::syntax(Some(location), "mismatched 'endrepeat'."))
            }
        }
    }

    fn if_directive(&mut self, location: SourceLocation) -> Result<()> {
        let condition = self.expression()?;
        self.expect_eol()?;
        self.open_block(
            location,
            BlockKind::If {
                condition,
                in_else: false,
            },
        )
    }

    fn else_directive(&mut self, location: &SourceLocation) -> Result<()> {
        self.expect_eol()?;
        match self.blocks.last_mut() {
            Some(Block {
                kind: BlockKind::If { in_else, .. },
                ..
            }) if !*in_else => {
                *in_else = true;
                Ok(())
            }
            _ => Err(AssemblerError::syntax(Some(location), "unexpected 'else'.")),
        }
    }

    fn end_if(&mut self, location: &SourceLocation) -> Result<()> {
        self.expect_eol()?;
        match self.blocks.pop() {
            Some(Block {
                location: block_location,
                kind: BlockKind::If { condition, .. },
                body,
                else_body,
            }) => self.add_instruction(Instruction::new(
                block_location,
                InstructionKind::If(MacroIf {
                    condition,
                    then_branch: body,
                    else_branch: else_body,
                }),
            )),
            other => {
                self.blocks.extend(other);
                Err(AssemblerError::syntax(Some(location), "mismatched 'endif'."))
            }
        }
    }

    fn write_protection(&mut self, kind: WriteProtectionKind, location: &SourceLocation) -> Result<()> {
        let start = self.expression()?;
        self.expect(TokenKind::Comma)?;
        let size = self.expression()?;
        self.expect_eol()?;
        self.add_instruction(Instruction::new(
            location.clone(),
            InstructionKind::WriteProtection(WriteProtection {
                kind,
                start,
                size: Some(size),
            }),
        ))
    }

    // expressions

    fn expression(&mut self) -> Result<ExprId> {
        let condition = self.binary(1)?;
        if self.at_eol() || !self.at(&TokenKind::Question) {
            return Ok(condition);
        }
        let location = self.advance().location;
        let then_value = self.expression()?;
        self.expect(TokenKind::Colon)?;
        let else_value = self.expression()?;
        Ok(self.alloc(
            ExprKind::Conditional(condition, then_value, else_value),
            location,
        ))
    }

    fn binary(&mut self, min_precedence: u8) -> Result<ExprId> {
        let mut left = self.unary()?;
        loop {
            if self.at_eol() {
                return Ok(left);
            }
            let Some((precedence, op)) = binary_op(&self.peek().kind) else {
                return Ok(left);
            };
            if precedence < min_precedence {
                return Ok(left);
            }
            let location = self.advance().location;
            let right = self.binary(precedence + 1)?;
            left = self.alloc(ExprKind::Binary(op, left, right), location);
        }
    }

    fn unary(&mut self) -> Result<ExprId> {
        if self.at_eol() {
            return Err(self.expected_expression());
        }
        let op = match self.peek().kind {
            TokenKind::Minus => Some(UnaryOp::Negate),
            TokenKind::Tilde => Some(UnaryOp::BitwiseNot),
            TokenKind::Exclamation => Some(UnaryOp::LogicNot),
            TokenKind::Plus => {
                self.advance();
                return self.unary();
            }
            _ => None,
        };
        match op {
            Some(op) => {
                let location = self.advance().location;
                let operand = self.unary()?;
                Ok(self.alloc(ExprKind::Unary(op, operand), location))
            }
            None => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<ExprId> {
        if self.at_eol() {
            return Err(self.expected_expression());
        }
        let token = self.peek().clone();
        let kind = match &token.kind {
            TokenKind::Number(value) => ExprKind::Number(*value),
            TokenKind::Dollar => ExprKind::CurrentAddress(self.equ_dollar(&token.location)),
            TokenKind::OpenParen => {
                self.advance();
                let expr = self.expression()?;
                self.expect(TokenKind::CloseParen)?;
                return Ok(expr);
            }
            TokenKind::LocalName(name) => ExprKind::Identifier {
                name: self.local_name(name, &token.location)?,
                scope: self.scope,
            },
            TokenKind::Identifier(name) => {
                let query = name.to_ascii_lowercase();
                if matches!(query.as_str(), "addressof" | "baseof" | "sizeof")
                    && self.peek_at(1).kind == TokenKind::OpenParen
                    && !self.at_eol_at(1)
                {
                    self.pos += 2;
                    let section = self.identifier()?;
                    self.expect(TokenKind::CloseParen)?;
                    let kind = match query.as_str() {
                        "addressof" => ExprKind::AddressOf(section),
                        "baseof" => ExprKind::BaseOf(section),
                        _ => ExprKind::SizeOf(section),
                    };
                    return Ok(self.alloc(kind, token.location));
                }
                ExprKind::Identifier {
                    name: name.clone(),
                    scope: self.scope,
                }
            }
            _ => return Err(self.expected_expression()),
        };
        self.advance();
        Ok(self.alloc(kind, token.location))
    }

    fn equ_dollar(&mut self, location: &SourceLocation) -> Option<LabelId> {
        match self.equ_label {
            Some(Some(label)) => Some(label),
            Some(None) => {
                let label = self.program.labels.alloc(Label::new("$", location.clone()));
                self.equ_label = Some(Some(label));
                Some(label)
            }
            None => None,
        }
    }

    fn expected_expression(&self) -> AssemblerError {
        AssemblerError::syntax(Some(&self.location()), "expected expression.")
    }

    fn alloc(&mut self, kind: ExprKind, location: SourceLocation) -> ExprId {
        self.program.exprs.alloc(kind, location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::InstructionKind;

    fn parse(source: &str) -> Result<Program> {
        let mut program = Program::new();
        parse_source(&mut program, "test.asm", source)?;
        Ok(program)
    }

    fn error(source: &str) -> String {
        parse(source).unwrap_err().message()
    }

    #[test]
    fn opcodes_and_labels_land_in_sections() {
        let program = parse("#section code\nstart: ld a,1\n@@loop: djnz @@loop\n ret\n").unwrap();
        let section = program.section("code").unwrap();
        assert_eq!(section.instructions().len(), 5);
        assert!(program.symbols.find_symbol(program.symbols.global(), "start@@loop").is_some());
    }

    #[test]
    fn operand_classification() {
        let program = parse("#section code\n ld a,(ix-5+2)\n ld hl,(1234)\n ld a,(1+2)*3\n out (c),a\n").unwrap();
        let kinds: Vec<&Vec<Operand>> = program
            .section("code")
            .unwrap()
            .instructions()
            .iter()
            .filter_map(|i| match &i.kind {
                InstructionKind::Opcode { operands, .. } => Some(operands),
                _ => None,
            })
            .collect();
        assert!(matches!(kinds[0][1], Operand::Indexed(Register::Ix, _)));
        assert!(matches!(kinds[1][1], Operand::Memory(_)));
        assert!(matches!(kinds[2][1], Operand::Immediate(_)));
        assert!(matches!(kinds[3][0], Operand::Indirect(Register::C)));
    }

    #[test]
    fn structure_errors() {
        assert_eq!(error("#section a\n#repeat 2\n nop\n"), "missing 'endrepeat'.");
        assert_eq!(error("#section a\n#if 1\n nop\n"), "missing 'endif'.");
        assert_eq!(error("#section a\n#endrepeat\n"), "mismatched 'endrepeat'.");
        assert_eq!(error("#section a\n#repeat 1\n#endif\n"), "mismatched 'endif'.");
        assert_eq!(error("#section a\n#if 1\n#else\n#else\n"), "unexpected 'else'.");
        assert_eq!(error(" nop\n"), "code or data not in a section.");
        assert_eq!(error("x:\n"), "label not in a section.");
        assert_eq!(error("#section a\n 5\n"), "expected opcode or directive.");
        assert_eq!(error("#section a\n db\n"), "expected expression.");
        assert_eq!(error("#section a\n foo\n"), "unknown opcode \"foo\".");
        assert_eq!(error("#section a\n@@x nop\n"), "local label name without preceding global label.");
        assert_eq!(error("#section a\ng:\n@@x nop\n"), "missing ':' after local label name.");
        assert_eq!(error("#section a\n ld q,1\n"), "invalid operands for opcode 'LD'.");
    }

    #[test]
    fn duplicate_identifiers() {
        assert_eq!(error("#section a\nx: nop\nx: nop\n"), "duplicate identifier \"x\".");
        assert_eq!(error("#section a\nx equ 1\n#if 1\nx: nop\n#endif\n"), "duplicate identifier \"x\".");
        parse("#section a\n#if 1\nx: nop\n#else\nx: halt\n#endif\n").unwrap();
    }

    #[test]
    fn equ_dollar_adds_marker_label() {
        let program = parse("#section a\n nop\nhere equ $\n").unwrap();
        let instructions = program.section("a").unwrap().instructions();
        assert_eq!(instructions.len(), 2);
        assert!(matches!(instructions[1].kind, InstructionKind::Label(_)));
    }

    #[test]
    fn project_expression() {
        let mut program = Program::new();
        let location = SourceLocation::new("<project>", 1);
        let expr = parse_expression(&mut program, "sizeof(code) + 0x10", &location).unwrap();
        assert_eq!(program.exprs.to_source(expr), "sizeof(code) + 16");
        let err = parse_expression(&mut program, "1 2", &location).unwrap_err();
        assert_eq!(err.message(), "unexpected number.");
    }
}
