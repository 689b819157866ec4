//! Expression trees and their evaluation.

use crate::{
    label::{LabelArena, LabelId},
    symbol::{ConditionalEntry, LoopId, ScopeId, Symbol, SymbolTable},
    types::{AssemblerError, Result, SourceLocation},
    value::{smart_evaluate, Sign, SignificantBits, Value},
};
use std::cell::Cell;
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    BitwiseNot,
    LogicNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    ShiftLeft,
    ShiftRight,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    LogicAnd,
    LogicOr,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::ShiftLeft => "<<",
            BinaryOp::ShiftRight => ">>",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::BitwiseAnd => "&",
            BinaryOp::BitwiseOr => "|",
            BinaryOp::BitwiseXor => "^",
            BinaryOp::LogicAnd => "&&",
            BinaryOp::LogicOr => "||",
        }
    }
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Number(i64),
    Identifier { name: String, scope: ScopeId },
    /// `$`. Inside an EQU it is bound to an ephemeral label placed where the
    /// EQU was written.
    CurrentAddress(Option<LabelId>),
    AddressOf(String),
    BaseOf(String),
    SizeOf(String),
    Unary(UnaryOp, ExprId),
    Binary(BinaryOp, ExprId, ExprId),
    Conditional(ExprId, ExprId, ExprId),
}

#[derive(Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub location: SourceLocation,
    evaluating: Cell<bool>,
}

/// Owner of every expression node of a program.
#[derive(Debug, Default)]
pub struct ExprArena {
    nodes: Vec<Expr>,
}

impl ExprArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, kind: ExprKind, location: SourceLocation) -> ExprId {
        self.nodes.push(Expr {
            kind,
            location,
            evaluating: Cell::new(false),
        });
        ExprId(self.nodes.len() - 1)
    }

    pub fn get(&self, id: ExprId) -> &Expr {
        &self.nodes[id.0]
    }

    pub fn location(&self, id: ExprId) -> &SourceLocation {
        &self.nodes[id.0].location
    }

    /// True if the value may depend on symbols, addresses or sections.
    pub fn has_references(&self, id: ExprId) -> bool {
        match &self.get(id).kind {
            ExprKind::Number(_) => false,
            ExprKind::Identifier { .. }
            | ExprKind::CurrentAddress(_)
            | ExprKind::AddressOf(_)
            | ExprKind::BaseOf(_)
            | ExprKind::SizeOf(_) => true,
            ExprKind::Unary(_, a) => self.has_references(*a),
            ExprKind::Binary(_, a, b) => self.has_references(*a) || self.has_references(*b),
            ExprKind::Conditional(c, a, b) => {
                self.has_references(*c) || self.has_references(*a) || self.has_references(*b)
            }
        }
    }

    /// Source-like rendering used in diagnostics.
    pub fn to_source(&self, id: ExprId) -> String {
        let mut out = String::new();
        self.write_source(id, &mut out);
        out
    }

    fn write_source(&self, id: ExprId, out: &mut String) {
        match &self.get(id).kind {
            ExprKind::Number(n) => {
                let _ = write!(out, "{}", n);
            }
            ExprKind::Identifier { name, .. } => out.push_str(name),
            ExprKind::CurrentAddress(_) => out.push('$'),
            ExprKind::AddressOf(name) => {
                let _ = write!(out, "addressof({})", name);
            }
            ExprKind::BaseOf(name) => {
                let _ = write!(out, "baseof({})", name);
            }
            ExprKind::SizeOf(name) => {
                let _ = write!(out, "sizeof({})", name);
            }
            ExprKind::Unary(op, a) => {
                out.push(match op {
                    UnaryOp::Negate => '-',
                    UnaryOp::BitwiseNot => '~',
                    UnaryOp::LogicNot => '!',
                });
                self.write_source(*a, out);
            }
            ExprKind::Binary(op, a, b) => {
                self.write_source(*a, out);
                let _ = write!(out, " {} ", op.symbol());
                self.write_source(*b, out);
            }
            ExprKind::Conditional(c, a, b) => {
                self.write_source(*c, out);
                out.push_str(" ? ");
                self.write_source(*a, out);
                out.push_str(" : ");
                self.write_source(*b, out);
            }
        }
    }
}

/// Answers section queries (`addressof`, `baseof`, `sizeof`) during
/// evaluation. Implemented by the linker.
pub trait SectionResolver {
    fn section_address(&self, name: &str) -> Option<u64>;
    fn section_base(&self, name: &str) -> Option<u64>;
    fn section_size(&self, name: &str) -> Option<u64>;
    fn is_valid_section_name(&self, name: &str) -> bool;
}

/// Resolver for contexts where no section is known.
pub struct NoSections;

impl SectionResolver for NoSections {
    fn section_address(&self, _: &str) -> Option<u64> {
        None
    }

    fn section_base(&self, _: &str) -> Option<u64> {
        None
    }

    fn section_size(&self, _: &str) -> Option<u64> {
        None
    }

    fn is_valid_section_name(&self, _: &str) -> bool {
        false
    }
}

/// Current value of each enclosing `#repeat` loop variable, innermost last.
#[derive(Debug, Clone, Default)]
pub struct LoopBindings {
    stack: Vec<(LoopId, i64)>,
}

impl LoopBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, id: LoopId, value: i64) {
        self.stack.push((id, value));
    }

    pub fn set_top(&mut self, value: i64) {
        if let Some(top) = self.stack.last_mut() {
            top.1 = value;
        }
    }

    pub fn pop(&mut self) {
        self.stack.pop();
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Outside its loop a loop variable reads as zero.
    pub fn get(&self, id: LoopId) -> i64 {
        self.stack
            .iter()
            .rev()
            .find(|(loop_id, _)| *loop_id == id)
            .map(|(_, value)| *value)
            .unwrap_or(0)
    }
}

struct Evaluating<'a>(&'a Cell<bool>);

impl<'a> Evaluating<'a> {
    fn mark(expr: &'a Expr) -> Result<Self> {
        if expr.evaluating.get() {
            return Err(AssemblerError::evaluation(
                Some(&expr.location),
                "hit circular dependency while evaluating expression.",
            ));
        }
        expr.evaluating.set(true);
        Ok(Evaluating(&expr.evaluating))
    }
}

impl Drop for Evaluating<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Everything an expression may look at while being evaluated.
pub struct EvalContext<'a> {
    pub exprs: &'a ExprArena,
    pub symbols: &'a SymbolTable,
    pub labels: &'a LabelArena,
    pub sections: &'a dyn SectionResolver,
    pub bindings: &'a LoopBindings,
    pub current_address: Option<i64>,
}

impl<'a> EvalContext<'a> {
    pub fn value(&self, id: ExprId) -> Result<Value> {
        let expr = self.exprs.get(id);
        let _guard = Evaluating::mark(expr)?;
        self.evaluate(expr)
    }

    pub fn byte(&self, id: ExprId) -> Result<u8> {
        let mut value = self.value(id)?;
        if value.bits == SignificantBits::NoMoreThan8 {
            value.truncate_to_8_bit();
        } else if value.number < -128 || value.number > 255 {
            return Err(self.does_not_fit(id, value.number, "byte"));
        }
        Ok(value.number as u8)
    }

    /// Relative offset from `next_address` to the value, for `JR`/`DJNZ`.
    pub fn byte_offset(&self, id: ExprId, next_address: i64) -> Result<u8> {
        if self.current_address.is_none() {
            return Err(AssemblerError::evaluation(
                Some(self.exprs.location(id)),
                "byte offset cannot be evaluated in this context.",
            ));
        }
        let mut value = self.value(id)?;
        if value.bits != SignificantBits::All {
            value.truncate_to_16_bit();
        }
        let offset = value.number.wrapping_sub(next_address);
        if !(-128..=127).contains(&offset) {
            return Err(self.does_not_fit(id, offset, "byte"));
        }
        Ok(offset as u8)
    }

    pub fn word(&self, id: ExprId) -> Result<u16> {
        let mut value = self.value(id)?;
        if value.bits != SignificantBits::All {
            value.truncate_to_16_bit();
        } else if value.number < -32768 || value.number > 65535 {
            return Err(self.does_not_fit(id, value.number, "word"));
        }
        Ok(value.number as u16)
    }

    pub fn unsigned_word(&self, id: ExprId) -> Result<u16> {
        let mut value = self.value(id)?;
        if value.bits != SignificantBits::All {
            value.truncate_to_16_bit();
        } else if value.number > 65535 {
            return Err(self.does_not_fit(id, value.number, "word"));
        }
        if value.number < 0 {
            return Err(AssemblerError::evaluation(
                Some(self.exprs.location(id)),
                "negative value is not allowed in this context.",
            ));
        }
        Ok(value.number as u16)
    }

    pub fn dword(&self, id: ExprId) -> Result<u32> {
        let mut value = self.value(id)?;
        if value.bits != SignificantBits::All {
            value.truncate_to_32_bit();
        } else if value.number < -0x8000_0000 || value.number > 0xffff_ffff {
            return Err(self.does_not_fit(id, value.number, "dword"));
        }
        Ok(value.number as u32)
    }

    fn does_not_fit(&self, id: ExprId, number: i64, what: &str) -> AssemblerError {
        AssemblerError::evaluation(
            Some(self.exprs.location(id)),
            format!("value {} (0x{:x}) does not fit into a {}.", number, number, what),
        )
    }

    fn evaluate(&self, expr: &Expr) -> Result<Value> {
        let location = &expr.location;
        match &expr.kind {
            ExprKind::Number(n) => Ok(Value::new(*n)),
            ExprKind::Identifier { name, scope } => self.identifier(name, *scope, location),
            ExprKind::CurrentAddress(Some(label)) => match self.labels.get(*label).address() {
                Some(address) => Ok(address_value(address)),
                None => Err(AssemblerError::pending(
                    Some(location),
                    "value of '$' in EQU is not available in this context.",
                )),
            },
            ExprKind::CurrentAddress(None) => match self.current_address {
                Some(address) => Ok(Value::new(address)),
                None => Err(AssemblerError::pending(
                    Some(location),
                    "current address is not available in this context.",
                )),
            },
            ExprKind::AddressOf(name) => {
                self.section_query(name, location, "address", |s, n| s.section_address(n))
            }
            ExprKind::BaseOf(name) => self.section_query(name, location, "base", |s, n| s.section_base(n)),
            ExprKind::SizeOf(name) => self.section_query(name, location, "size", |s, n| s.section_size(n)),
            ExprKind::Unary(op, operand) => {
                let value = self.value(*operand)?;
                Ok(unary(*op, value))
            }
            ExprKind::Binary(op, a, b) => {
                let a = self.value(*a)?;
                let b = self.value(*b)?;
                binary(*op, a, b, location)
            }
            ExprKind::Conditional(condition, then, otherwise) => {
                if self.value(*condition)?.is_true() {
                    self.value(*then)
                } else {
                    self.value(*otherwise)
                }
            }
        }
    }

    fn identifier(&self, name: &str, scope: ScopeId, location: &SourceLocation) -> Result<Value> {
        let entry = self.symbols.find_symbol(scope, name).ok_or_else(|| {
            AssemblerError::evaluation(Some(location), format!("use of undeclared identifier '{}'.", name))
        })?;

        match &entry.symbol {
            Symbol::Constant(expr) => self.value(*expr),
            Symbol::RepeatVariable(id) => Ok(Value::new(self.bindings.get(*id))),
            Symbol::Label(label) => self.label_value(*label, name, location),
            Symbol::ConditionalConstant(entries) => match self.select(entries, name)? {
                Some(expr) => self.value(expr),
                None => Err(AssemblerError::pending(
                    Some(location),
                    format!("unable to resolve symbol \"{}\".", name),
                )),
            },
            Symbol::ConditionalLabel(entries) => match self.select(entries, name)? {
                Some(label) => self.label_value(label, name, location),
                None => Err(AssemblerError::pending(
                    Some(location),
                    format!("unable to resolve label \"{}\".", name),
                )),
            },
        }
    }

    fn label_value(&self, label: LabelId, name: &str, location: &SourceLocation) -> Result<Value> {
        match self.labels.get(label).address() {
            Some(address) => Ok(address_value(address)),
            None => Err(AssemblerError::pending(
                Some(location),
                format!("unable to resolve address for label \"{}\".", name),
            )),
        }
    }

    /// Picks the alternative whose guard holds. Two holding guards are a
    /// conflict.
    pub fn select<T: Copy>(&self, entries: &[ConditionalEntry<T>], name: &str) -> Result<Option<T>> {
        let mut selected: Option<&ConditionalEntry<T>> = None;
        for entry in entries {
            if !self.value(entry.condition)?.is_true() {
                continue;
            }
            if selected.is_some() {
                return Err(AssemblerError::evaluation(
                    Some(self.exprs.location(entry.condition)),
                    format!("conflicting definitions for symbol \"{}\".", name),
                ));
            }
            selected = Some(entry);
        }
        Ok(selected.map(|entry| entry.target))
    }

    fn section_query(
        &self,
        name: &str,
        location: &SourceLocation,
        what: &str,
        query: impl Fn(&dyn SectionResolver, &str) -> Option<u64>,
    ) -> Result<Value> {
        if !self.sections.is_valid_section_name(name) {
            return Err(AssemblerError::evaluation(
                Some(location),
                format!("use of undeclared section \"{}\".", name),
            ));
        }
        match query(self.sections, name) {
            Some(value) => Ok(Value::new(value as i64)),
            None => Err(AssemblerError::pending(
                Some(location),
                format!("section {} is not available in this context.", what),
            )),
        }
    }
}

fn address_value(address: u64) -> Value {
    Value::with_bits(address as i64, Sign::Unsigned, SignificantBits::NoMoreThan16)
}

fn unary(op: UnaryOp, value: Value) -> Value {
    match op {
        UnaryOp::Negate => negate(value),
        UnaryOp::BitwiseNot => {
            if value.sign == Sign::Unsigned {
                Value::with_bits(!value.number & 0x7fff_ffff_ffff_ffff, value.sign, value.bits)
            } else {
                Value::with_bits(!value.number, value.sign, value.bits)
            }
        }
        UnaryOp::LogicNot => Value::boolean(!value.is_true()),
    }
}

fn negate(value: Value) -> Value {
    let negated = value.number.wrapping_neg();
    match value.bits {
        SignificantBits::NoMoreThan8 => {
            let fits = match value.sign {
                Sign::Unsigned => (value.number as u8) <= 0x80,
                Sign::Signed => (value.number as u8 as i8) != i8::MIN,
            };
            let bits = if fits {
                SignificantBits::NoMoreThan8
            } else {
                SignificantBits::NoMoreThan16
            };
            Value::with_bits(negated, Sign::Signed, bits)
        }
        SignificantBits::NoMoreThan16 => {
            let fits = match value.sign {
                Sign::Unsigned => (value.number as u16) <= 0x8000,
                Sign::Signed => (value.number as u16 as i16) != i16::MIN,
            };
            if fits {
                Value::with_bits(negated, Sign::Signed, SignificantBits::NoMoreThan16)
            } else {
                Value::with_sign(negated, Sign::Signed)
            }
        }
        SignificantBits::All => Value::with_sign(negated, Sign::Signed),
    }
}

fn overflow(location: &SourceLocation) -> AssemblerError {
    AssemblerError::evaluation(Some(location), "integer overflow in expression.")
}

fn shift_count(mut count: Value, op: BinaryOp, location: &SourceLocation) -> Result<Value> {
    if count.number < 0 {
        count.truncate_to_significant_bits();
        if count.number < 0 {
            return Err(AssemblerError::evaluation(
                Some(location),
                format!("negative shift count for operator '{}'.", op.symbol()),
            ));
        }
    }
    if count.number > 64 {
        count.truncate_to_significant_bits();
        if count.number > 64 {
            return Err(AssemblerError::evaluation(
                Some(location),
                format!("shift count is too large for operator '{}'.", op.symbol()),
            ));
        }
    }
    Ok(count)
}

fn shl(a: i64, b: i64) -> i64 {
    if (0..64).contains(&b) {
        a.wrapping_shl(b as u32)
    } else {
        0
    }
}

fn shr(a: i64, b: i64) -> i64 {
    if (0..64).contains(&b) {
        a >> b
    } else if a < 0 {
        -1
    } else {
        0
    }
}

fn binary(op: BinaryOp, a: Value, b: Value, location: &SourceLocation) -> Result<Value> {
    let value = match op {
        BinaryOp::Add => {
            a.number.checked_add(b.number).ok_or_else(|| overflow(location))?;
            smart_evaluate(i64::wrapping_add, a, b, false)
        }
        BinaryOp::Subtract => {
            a.number.checked_sub(b.number).ok_or_else(|| overflow(location))?;
            smart_evaluate(i64::wrapping_sub, a, b, true)
        }
        BinaryOp::Multiply => {
            a.number.checked_mul(b.number).ok_or_else(|| overflow(location))?;
            smart_evaluate(i64::wrapping_mul, a, b, false)
        }
        BinaryOp::Divide | BinaryOp::Modulo => {
            if b.number == 0 {
                return Err(AssemblerError::evaluation(Some(location), "division by zero."));
            }
            let divide = op == BinaryOp::Divide;
            smart_evaluate(
                move |x, y| match (divide, y) {
                    (_, 0) => 0,
                    (true, y) => x.wrapping_div(y),
                    (false, y) => x.wrapping_rem(y),
                },
                a,
                b,
                false,
            )
        }
        BinaryOp::ShiftLeft => {
            let b = shift_count(b, op, location)?;
            smart_evaluate(shl, a, b, false)
        }
        BinaryOp::ShiftRight => {
            let b = shift_count(b, op, location)?;
            smart_evaluate(shr, a, b, false)
        }
        BinaryOp::Less => Value::boolean(a.number < b.number),
        BinaryOp::LessEqual => Value::boolean(a.number <= b.number),
        BinaryOp::Greater => Value::boolean(a.number > b.number),
        BinaryOp::GreaterEqual => Value::boolean(a.number >= b.number),
        BinaryOp::Equal => Value::boolean(a.number == b.number),
        BinaryOp::NotEqual => Value::boolean(a.number != b.number),
        BinaryOp::BitwiseAnd | BinaryOp::BitwiseOr | BinaryOp::BitwiseXor => {
            let bits = a.bits.max(b.bits);
            let sign = if a.sign == Sign::Signed || b.sign == Sign::Signed {
                Sign::Signed
            } else {
                Sign::Unsigned
            };
            let number = match op {
                BinaryOp::BitwiseAnd => a.number & b.number,
                BinaryOp::BitwiseOr => a.number | b.number,
                _ => a.number ^ b.number,
            };
            Value::with_bits(number, sign, bits)
        }
        BinaryOp::LogicAnd => Value::boolean(a.is_true() && b.is_true()),
        BinaryOp::LogicOr => Value::boolean(a.is_true() || b.is_true()),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::Symbol;
    use proptest::prelude::*;

    struct Fixture {
        exprs: ExprArena,
        symbols: SymbolTable,
        labels: LabelArena,
        bindings: LoopBindings,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                exprs: ExprArena::new(),
                symbols: SymbolTable::new(),
                labels: LabelArena::new(),
                bindings: LoopBindings::new(),
            }
        }

        fn loc() -> SourceLocation {
            SourceLocation::new("expr", 1)
        }

        fn num(&mut self, n: i64) -> ExprId {
            self.exprs.alloc(ExprKind::Number(n), Self::loc())
        }

        fn ident(&mut self, name: &str) -> ExprId {
            let scope = self.symbols.global();
            self.exprs.alloc(
                ExprKind::Identifier {
                    name: name.to_string(),
                    scope,
                },
                Self::loc(),
            )
        }

        fn bin(&mut self, op: BinaryOp, a: ExprId, b: ExprId) -> ExprId {
            self.exprs.alloc(ExprKind::Binary(op, a, b), Self::loc())
        }

        fn ctx(&self) -> EvalContext<'_> {
            EvalContext {
                exprs: &self.exprs,
                symbols: &self.symbols,
                labels: &self.labels,
                sections: &NoSections,
                bindings: &self.bindings,
                current_address: Some(0x8000),
            }
        }
    }

    #[test]
    fn byte_overflow_reports_value() {
        let mut f = Fixture::new();
        let a = f.num(0x80);
        let b = f.num(0x80);
        let sum = f.bin(BinaryOp::Add, a, b);
        let err = f.ctx().byte(sum).unwrap_err();
        assert_eq!(err.message(), "value 256 (0x100) does not fit into a byte.");
    }

    #[test]
    fn negative_byte_is_accepted() {
        let mut f = Fixture::new();
        let a = f.num(0x80);
        let b = f.num(0x81);
        let diff = f.bin(BinaryOp::Subtract, a, b);
        assert_eq!(f.ctx().byte(diff).unwrap(), 0xff);
    }

    #[test]
    fn self_reference_is_circular() {
        let mut f = Fixture::new();
        let x = f.ident("x");
        let one = f.num(1);
        let body = f.bin(BinaryOp::Add, x, one);
        let g = f.symbols.global();
        f.symbols.add_symbol(g, "x", Fixture::loc(), Symbol::Constant(body));
        let err = f.ctx().value(x).unwrap_err();
        assert_eq!(err.message(), "hit circular dependency while evaluating expression.");
        // the guard is released on the error path
        assert!(!f.exprs.get(body).evaluating.get());
    }

    #[test]
    fn undeclared_identifier_is_fatal() {
        let mut f = Fixture::new();
        let y = f.ident("y");
        let err = f.ctx().value(y).unwrap_err();
        assert!(!err.is_pending());
        assert_eq!(err.message(), "use of undeclared identifier 'y'.");
    }

    #[test]
    fn unresolved_label_is_pending() {
        let mut f = Fixture::new();
        let id = f.labels.alloc(crate::label::Label::new("later", Fixture::loc()));
        let g = f.symbols.global();
        f.symbols.add_symbol(g, "later", Fixture::loc(), Symbol::Label(id));
        let e = f.ident("later");
        let err = f.ctx().value(e).unwrap_err();
        assert!(err.is_pending());
        f.labels.get_mut(id).set_address(0x1234).unwrap();
        assert_eq!(f.ctx().word(e).unwrap(), 0x1234);
    }

    #[test]
    fn shift_count_checks() {
        let mut f = Fixture::new();
        let one = f.num(1);
        let big = f.num(65);
        let shifted = f.bin(BinaryOp::ShiftLeft, one, big);
        let err = f.ctx().value(shifted).unwrap_err();
        assert_eq!(err.message(), "shift count is too large for operator '<<'.");

        let minus = f.num(-1);
        let one2 = f.num(1);
        let neg = f.bin(BinaryOp::ShiftRight, one2, minus);
        // -1 narrows to 0xff as a byte and is still too large
        let err = f.ctx().value(neg).unwrap_err();
        assert_eq!(err.message(), "shift count is too large for operator '>>'.");
    }

    #[test]
    fn division_by_zero() {
        let mut f = Fixture::new();
        let a = f.num(1);
        let z = f.num(0);
        let d = f.bin(BinaryOp::Divide, a, z);
        assert_eq!(f.ctx().value(d).unwrap_err().message(), "division by zero.");
    }

    #[test]
    fn relative_offset_range() {
        let mut f = Fixture::new();
        let target = f.num(0x8000);
        assert_eq!(f.ctx().byte_offset(target, 0x8002).unwrap(), 0xfe);
        let far = f.num(0x8100);
        let err = f.ctx().byte_offset(far, 0x8002).unwrap_err();
        assert_eq!(err.message(), "value 254 (0xfe) does not fit into a byte.");
    }

    #[test]
    fn negate_width() {
        assert_eq!(negate(Value::new(0x80)).bits, SignificantBits::NoMoreThan8);
        assert_eq!(negate(Value::new(0x81)).bits, SignificantBits::NoMoreThan16);
        assert_eq!(negate(Value::new(-128)).bits, SignificantBits::NoMoreThan16);
    }

    proptest! {
        #[test]
        fn byte_accepts_exactly_representable_results(
            a in -128i64..256,
            b in -128i64..256,
            subtract in any::<bool>(),
        ) {
            let mut f = Fixture::new();
            let (x, y) = (f.num(a), f.num(b));
            let (op, exact) = if subtract { (BinaryOp::Subtract, a - b) } else { (BinaryOp::Add, a + b) };
            let e = f.bin(op, x, y);
            match f.ctx().byte(e) {
                Ok(byte) => {
                    prop_assert!((-128..=255).contains(&exact), "{} accepted", exact);
                    prop_assert_eq!(byte, exact as u8);
                }
                Err(err) => {
                    prop_assert!(!(-128..=255).contains(&exact), "{} rejected", exact);
                    prop_assert!(err.message().contains("does not fit into a byte"));
                }
            }
        }
    }
}
