//! Tokenizer for assembler source.

use crate::{
    opcodes::is_mnemonic,
    types::{AssemblerError, Result, SourceLocation},
};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Identifier(String),
    /// `name:` at the start of a line.
    GlobalLabel(String),
    /// `global@@name:` at the start of a line.
    FullLabel(String),
    /// `@@name:` at the start of a line.
    LocalLabel(String),
    /// `@@name` anywhere else.
    LocalName(String),
    Number(i64),
    Str(Vec<u8>),
    Dollar,
    Hash,
    Comma,
    Colon,
    Question,
    OpenParen,
    CloseParen,
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Shl,
    Shr,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
    Ampersand,
    DoubleAmpersand,
    Bar,
    DoubleBar,
    Caret,
    Tilde,
    Exclamation,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub location: SourceLocation,
    pub first_on_line: bool,
}

impl Token {
    /// Name used in "unexpected ..." diagnostics.
    pub fn describe(&self) -> String {
        let text = match &self.kind {
            TokenKind::Identifier(name) => return format!("identifier \"{}\"", name),
            TokenKind::GlobalLabel(_) | TokenKind::FullLabel(_) | TokenKind::LocalLabel(_) => "label",
            TokenKind::LocalName(_) => "label name",
            TokenKind::Number(_) => "number",
            TokenKind::Str(_) => "string",
            TokenKind::Dollar => "'$'",
            TokenKind::Hash => "'#'",
            TokenKind::Comma => "','",
            TokenKind::Colon => "':'",
            TokenKind::Question => "'?'",
            TokenKind::OpenParen => "'('",
            TokenKind::CloseParen => "')'",
            TokenKind::Assign => "'='",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::Slash => "'/'",
            TokenKind::Percent => "'%'",
            TokenKind::Shl => "'<<'",
            TokenKind::Shr => "'>>'",
            TokenKind::Less => "'<'",
            TokenKind::LessEqual => "'<='",
            TokenKind::Greater => "'>'",
            TokenKind::GreaterEqual => "'>='",
            TokenKind::Equal => "'=='",
            TokenKind::NotEqual => "'!='",
            TokenKind::Ampersand => "'&'",
            TokenKind::DoubleAmpersand => "'&&'",
            TokenKind::Bar => "'|'",
            TokenKind::DoubleBar => "'||'",
            TokenKind::Caret => "'^'",
            TokenKind::Tilde => "'~'",
            TokenKind::Exclamation => "'!'",
            TokenKind::Eof => "end of file",
        };
        text.to_string()
    }

    /// True if an operand may end with this token, so a following `%` is
    /// the modulo operator rather than a binary prefix.
    fn ends_operand(&self) -> bool {
        match &self.kind {
            TokenKind::Number(_) | TokenKind::CloseParen | TokenKind::Dollar | TokenKind::LocalName(_) => true,
            TokenKind::Identifier(name) => !is_keyword(name),
            _ => false,
        }
    }
}

/// Words after which an expression starts.
fn is_keyword(name: &str) -> bool {
    is_mnemonic(name)
        || matches!(
            name.to_ascii_lowercase().as_str(),
            "db" | "defb" | "defm" | "dw" | "defw" | "dd" | "ds" | "defs" | "equ"
        )
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_' || c == b'.'
}

fn is_ident_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c == b'.' || c == b'@'
}

pub struct Lexer<'s> {
    src: &'s [u8],
    pos: usize,
    file: Arc<str>,
    line: usize,
    line_start: bool,
    tokens: Vec<Token>,
}

impl<'s> Lexer<'s> {
    pub fn new(file: impl Into<Arc<str>>, src: &'s str) -> Self {
        Self {
            src: src.as_bytes(),
            pos: 0,
            file: file.into(),
            line: 1,
            line_start: true,
            tokens: Vec::new(),
        }
    }

    /// Tokenizes the whole input. The last token is always `Eof`.
    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        loop {
            let Some(c) = self.peek(0) else {
                self.push(TokenKind::Eof);
                return Ok(self.tokens);
            };
            match c {
                b'\n' => {
                    self.pos += 1;
                    self.line += 1;
                    self.line_start = true;
                }
                b' ' | b'\t' | b'\r' | 0x0b | 0x0c => self.pos += 1,
                b';' => {
                    while self.peek(0).is_some_and(|c| c != b'\n') {
                        self.pos += 1;
                    }
                }
                b'"' => {
                    let bytes = self.string()?;
                    self.push(TokenKind::Str(bytes));
                }
                b'\'' => {
                    let value = self.char_literal()?;
                    self.push(TokenKind::Number(value));
                }
                b'0'..=b'9' => {
                    let value = self.number()?;
                    self.push(TokenKind::Number(value));
                }
                b'$' => {
                    self.pos += 1;
                    if self.peek(0).is_some_and(|c| c.is_ascii_hexdigit()) {
                        let value = self.digits(16, "hexadecimal")?;
                        self.push(TokenKind::Number(value));
                    } else {
                        self.push(TokenKind::Dollar);
                    }
                }
                b'#' => {
                    self.pos += 1;
                    if !self.line_start && self.peek(0).is_some_and(|c| c.is_ascii_hexdigit()) {
                        let value = self.digits(16, "hexadecimal")?;
                        self.push(TokenKind::Number(value));
                    } else {
                        self.push(TokenKind::Hash);
                    }
                }
                b'%' => {
                    self.pos += 1;
                    let after_operand = self.tokens.last().is_some_and(|t| !self.line_start && t.ends_operand());
                    if !after_operand && self.peek(0).is_some_and(|c| c == b'0' || c == b'1') {
                        let value = self.digits(2, "binary")?;
                        self.push(TokenKind::Number(value));
                    } else {
                        self.push(TokenKind::Percent);
                    }
                }
                b'@' if self.peek(1) == Some(b'@') => self.local_label()?,
                c if is_ident_start(c) => self.identifier(),
                _ => self.operator(c)?,
            }
        }
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn location(&self) -> SourceLocation {
        SourceLocation {
            file: self.file.clone(),
            line: self.line,
        }
    }

    fn error(&self, message: impl Into<String>) -> AssemblerError {
        AssemblerError::syntax(Some(&self.location()), message)
    }

    fn push(&mut self, kind: TokenKind) {
        let location = self.location();
        self.tokens.push(Token {
            kind,
            location,
            first_on_line: self.line_start,
        });
        self.line_start = false;
    }

    fn digits(&mut self, radix: u32, what: &str) -> Result<i64> {
        let start = self.pos;
        while self.peek(0).is_some_and(|c| c.is_ascii_alphanumeric()) {
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap_or_default();
        parse_digits(text, radix).ok_or_else(|| self.error(format!("syntax error in {} number.", what)))
    }

    fn number(&mut self) -> Result<i64> {
        let start = self.pos;
        while self.peek(0).is_some_and(|c| c.is_ascii_alphanumeric()) {
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap_or_default();
        let lower = text.to_ascii_lowercase();

        let (digits, radix, what) = if let Some(hex) = lower.strip_prefix("0x") {
            (hex, 16, "hexadecimal")
        } else if let Some(hex) = lower.strip_suffix('h') {
            (hex, 16, "hexadecimal")
        } else if let Some(bin) = lower.strip_prefix("0b").filter(|b| !b.is_empty()) {
            (bin, 2, "binary")
        } else if let Some(bin) = lower.strip_suffix('b').filter(|b| b.bytes().all(|c| c == b'0' || c == b'1')) {
            (bin, 2, "binary")
        } else {
            (lower.as_str(), 10, "decimal")
        };
        parse_digits(digits, radix).ok_or_else(|| self.error(format!("syntax error in {} number.", what)))
    }

    fn escape(&mut self) -> Result<u8> {
        let c = self.peek(0).ok_or_else(|| self.error("unterminated string literal."))?;
        self.pos += 1;
        Ok(match c {
            b'n' => b'\n',
            b'r' => b'\r',
            b't' => b'\t',
            b'0' => 0,
            b'\\' | b'"' | b'\'' => c,
            _ => return Err(self.error("invalid escape sequence.")),
        })
    }

    fn string(&mut self) -> Result<Vec<u8>> {
        self.pos += 1;
        let mut bytes = Vec::new();
        loop {
            match self.peek(0) {
                None | Some(b'\n') => return Err(self.error("unterminated string literal.")),
                Some(b'"') => {
                    self.pos += 1;
                    return Ok(bytes);
                }
                Some(b'\\') => {
                    self.pos += 1;
                    bytes.push(self.escape()?);
                }
                Some(c) => {
                    self.pos += 1;
                    bytes.push(c);
                }
            }
        }
    }

    fn char_literal(&mut self) -> Result<i64> {
        self.pos += 1;
        let value = match self.peek(0) {
            None | Some(b'\n') | Some(b'\'') => return Err(self.error("invalid character literal.")),
            Some(b'\\') => {
                self.pos += 1;
                self.escape()?
            }
            Some(c) => {
                self.pos += 1;
                c
            }
        };
        if self.peek(0) != Some(b'\'') {
            return Err(self.error("invalid character literal."));
        }
        self.pos += 1;
        Ok(i64::from(value))
    }

    fn local_label(&mut self) -> Result<()> {
        self.pos += 2;
        let start = self.pos;
        while self.peek(0).is_some_and(|c| is_ident_char(c) && c != b'@') {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("expected label name after '@@'."));
        }
        let name = String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
        if self.line_start && self.peek(0) == Some(b':') {
            self.pos += 1;
            self.push(TokenKind::LocalLabel(name));
        } else {
            self.push(TokenKind::LocalName(name));
        }
        Ok(())
    }

    fn identifier(&mut self) {
        let start = self.pos;
        while self.peek(0).is_some_and(is_ident_char) {
            self.pos += 1;
        }
        let mut name = String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
        if name.eq_ignore_ascii_case("af") && self.peek(0) == Some(b'\'') {
            self.pos += 1;
            name.push('\'');
            self.push(TokenKind::Identifier(name));
            return;
        }
        if self.line_start && self.peek(0) == Some(b':') {
            self.pos += 1;
            let kind = if name.contains("@@") {
                TokenKind::FullLabel(name)
            } else {
                TokenKind::GlobalLabel(name)
            };
            self.push(kind);
            return;
        }
        self.push(TokenKind::Identifier(name));
    }

    fn operator(&mut self, c: u8) -> Result<()> {
        let next = self.peek(1);
        let (kind, len) = match (c, next) {
            (b'<', Some(b'<')) => (TokenKind::Shl, 2),
            (b'>', Some(b'>')) => (TokenKind::Shr, 2),
            (b'<', Some(b'=')) => (TokenKind::LessEqual, 2),
            (b'>', Some(b'=')) => (TokenKind::GreaterEqual, 2),
            (b'=', Some(b'=')) => (TokenKind::Equal, 2),
            (b'!', Some(b'=')) => (TokenKind::NotEqual, 2),
            (b'&', Some(b'&')) => (TokenKind::DoubleAmpersand, 2),
            (b'|', Some(b'|')) => (TokenKind::DoubleBar, 2),
            (b'<', _) => (TokenKind::Less, 1),
            (b'>', _) => (TokenKind::Greater, 1),
            (b'=', _) => (TokenKind::Assign, 1),
            (b'!', _) => (TokenKind::Exclamation, 1),
            (b'&', _) => (TokenKind::Ampersand, 1),
            (b'|', _) => (TokenKind::Bar, 1),
            (b',', _) => (TokenKind::Comma, 1),
            (b':', _) => (TokenKind::Colon, 1),
            (b'?', _) => (TokenKind::Question, 1),
            (b'(', _) => (TokenKind::OpenParen, 1),
            (b')', _) => (TokenKind::CloseParen, 1),
            (b'+', _) => (TokenKind::Plus, 1),
            (b'-', _) => (TokenKind::Minus, 1),
            (b'*', _) => (TokenKind::Star, 1),
            (b'/', _) => (TokenKind::Slash, 1),
            (b'^', _) => (TokenKind::Caret, 1),
            (b'~', _) => (TokenKind::Tilde, 1),
            _ => return Err(self.error(format!("unexpected character '{}'.", char::from(c).escape_default()))),
        };
        self.pos += len;
        self.push(kind);
        Ok(())
    }
}

fn parse_digits(text: &str, radix: u32) -> Option<i64> {
    if text.is_empty() {
        return None;
    }
    let value = u32::from_str_radix(text, radix).ok()?;
    Some(i64::from(value))
}

/// Convenience wrapper around [`Lexer::tokenize`].
pub fn tokenize(file: &str, source: &str) -> Result<Vec<Token>> {
    Lexer::new(file, source).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize("test", source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn number_formats() {
        assert_eq!(
            kinds("10 0x1F $ff #10 0a0h 0b101 101b 'A'"),
            vec![
                TokenKind::Number(10),
                TokenKind::Number(0x1f),
                TokenKind::Number(0xff),
                TokenKind::Number(0x10),
                TokenKind::Number(0xa0),
                TokenKind::Number(5),
                TokenKind::Number(65),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn dollar_alone_is_current_address() {
        assert_eq!(
            kinds("jr $"),
            vec![TokenKind::Identifier("jr".into()), TokenKind::Dollar, TokenKind::Eof]
        );
    }

    #[test]
    fn percent_after_operand_is_modulo() {
        assert_eq!(
            kinds("db 7 %10"),
            vec![
                TokenKind::Identifier("db".into()),
                TokenKind::Number(7),
                TokenKind::Percent,
                TokenKind::Number(10),
                TokenKind::Eof,
            ]
        );
        assert_eq!(kinds("db %10")[1], TokenKind::Number(2));
    }

    #[test]
    fn labels_only_at_line_start() {
        assert_eq!(
            kinds("start: @@loop:\n@@loop:\nstart@@x: a?b:c"),
            vec![
                TokenKind::GlobalLabel("start".into()),
                TokenKind::LocalName("loop".into()),
                TokenKind::Colon,
                TokenKind::LocalLabel("loop".into()),
                TokenKind::FullLabel("start@@x".into()),
                TokenKind::Identifier("a".into()),
                TokenKind::Question,
                TokenKind::Identifier("b".into()),
                TokenKind::Colon,
                TokenKind::Identifier("c".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn alternate_af_is_one_token() {
        assert_eq!(
            kinds("ex af,af'"),
            vec![
                TokenKind::Identifier("ex".into()),
                TokenKind::Identifier("af".into()),
                TokenKind::Comma,
                TokenKind::Identifier("af'".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn strings_and_comments() {
        let tokens = tokenize("test", "db \"a\\n\" ; comment\n nop").unwrap();
        assert_eq!(tokens[1].kind, TokenKind::Str(vec![b'a', b'\n']));
        assert_eq!(tokens[2].kind, TokenKind::Identifier("nop".into()));
        assert!(tokens[2].first_on_line);
        assert_eq!(tokens[2].location.line, 2);
    }

    #[test]
    fn directive_hash_versus_hex() {
        assert_eq!(kinds("#if 1")[0], TokenKind::Hash);
        assert_eq!(kinds("ld a,#ff")[3], TokenKind::Number(0xff));
    }

    #[test]
    fn malformed_input() {
        let err = tokenize("test", "db \"abc").unwrap_err();
        assert_eq!(err.message(), "unterminated string literal.");
        let err = tokenize("test", "ld a,0xzz").unwrap_err();
        assert_eq!(err.message(), "syntax error in hexadecimal number.");
        let err = tokenize("test", "\n  `").unwrap_err();
        assert_eq!(err.to_string(), "test:2: unexpected character '`'.");
    }
}
