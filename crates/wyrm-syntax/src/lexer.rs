//! Indentation-aware tokenizer for alias scripts.
//!
//! Follows the usual rules for an offside-rule language: INDENT/DEDENT
//! tokens from a column stack, implicit line joining inside brackets,
//! backslash continuations, and comment/blank-line elision.

use wyrm_core::{TextRange, TextSize};

use crate::token::{Token, TokenKind};
use crate::ParseError;

const TAB_STOP: u32 = 8;

pub(crate) fn tokenize(src: &str) -> Result<Vec<Token>, ParseError> {
    Lexer {
        src,
        bytes: src.as_bytes(),
        pos: 0,
        tokens: Vec::new(),
        indents: vec![0],
        depth: 0,
    }
    .run()
}

struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    tokens: Vec<Token>,
    indents: Vec<u32>,
    depth: usize,
}

impl<'a> Lexer<'a> {
    fn run(mut self) -> Result<Vec<Token>, ParseError> {
        let mut at_line_start = true;
        loop {
            if at_line_start && self.depth == 0 {
                if !self.handle_line_start()? {
                    break;
                }
                at_line_start = false;
            }

            self.skip_spaces();
            let start = self.pos;
            let Some(ch) = self.peek_char() else {
                break;
            };

            match ch {
                '#' => {
                    while !matches!(self.peek_byte(), None | Some(b'\n') | Some(b'\r')) {
                        self.pos += 1;
                    }
                }
                '\\' if self.is_newline_at(self.pos + 1) => {
                    self.pos += 1;
                    self.eat_newline();
                }
                '\n' | '\r' => {
                    self.eat_newline();
                    if self.depth == 0 {
                        self.push(TokenKind::Newline, start, self.pos);
                        at_line_start = true;
                    }
                }
                c if is_ident_start(c) => self.lex_name_or_string()?,
                c if c.is_ascii_digit() => self.lex_number(start)?,
                '.' if self
                    .bytes
                    .get(self.pos + 1)
                    .is_some_and(|b| b.is_ascii_digit()) =>
                {
                    self.lex_number(start)?
                }
                '\'' | '"' => self.lex_string(start, false, false)?,
                _ => self.lex_operator(start, ch)?,
            }
        }

        // Close out the final logical line and any open blocks.
        let end = self.src.len();
        if !matches!(
            self.tokens.last().map(|t| &t.kind),
            None | Some(TokenKind::Newline)
        ) {
            self.push(TokenKind::Newline, end, end);
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.push(TokenKind::Dedent, end, end);
        }
        self.push(TokenKind::Eof, end, end);
        Ok(self.tokens)
    }

    /// Measure indentation at a physical line start, skipping blank and
    /// comment-only lines. Returns false at end of input.
    fn handle_line_start(&mut self) -> Result<bool, ParseError> {
        loop {
            let mut col = 0u32;
            loop {
                match self.peek_byte() {
                    Some(b' ') => {
                        col += 1;
                        self.pos += 1;
                    }
                    Some(b'\t') => {
                        col = col / TAB_STOP * TAB_STOP + TAB_STOP;
                        self.pos += 1;
                    }
                    _ => break,
                }
            }
            match self.peek_byte() {
                None => return Ok(false),
                Some(b'\n') | Some(b'\r') => {
                    self.eat_newline();
                    continue;
                }
                Some(b'#') => {
                    while !matches!(self.peek_byte(), None | Some(b'\n') | Some(b'\r')) {
                        self.pos += 1;
                    }
                    continue;
                }
                _ => {
                    let here = self.pos;
                    let current = *self.indents.last().unwrap_or(&0);
                    if col > current {
                        self.indents.push(col);
                        self.push(TokenKind::Indent, here, here);
                    } else if col < current {
                        while col < *self.indents.last().unwrap_or(&0) {
                            self.indents.pop();
                            self.push(TokenKind::Dedent, here, here);
                        }
                        if col != *self.indents.last().unwrap_or(&0) {
                            return Err(self.error(
                                "unindent does not match any outer indentation level",
                                here,
                                here,
                            ));
                        }
                    }
                    return Ok(true);
                }
            }
        }
    }

    fn lex_name_or_string(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        let ident_end = self.scan_ident();
        let ident = &self.src[start..ident_end];

        // A short identifier immediately followed by a quote is a string
        // prefix (r"...", f'...', rb"...", ...).
        if ident.len() <= 2 && matches!(self.bytes.get(ident_end), Some(b'\'') | Some(b'"')) {
            let lower = ident.to_ascii_lowercase();
            let raw = lower.contains('r');
            let formatted = lower.contains('f');
            let known = lower.chars().all(|c| matches!(c, 'r' | 'f' | 'b' | 'u'));
            if known {
                self.pos = ident_end;
                return self.lex_string(start, raw, formatted);
            }
        }

        self.pos = ident_end;
        let kind = TokenKind::keyword(ident).unwrap_or_else(|| TokenKind::Name(ident.to_string()));
        self.push(kind, start, ident_end);
        Ok(())
    }

    fn scan_ident(&self) -> usize {
        let mut end = self.pos;
        for (i, c) in self.src[self.pos..].char_indices() {
            let ok = if i == 0 {
                is_ident_start(c)
            } else {
                is_ident_continue(c)
            };
            if !ok {
                break;
            }
            end = self.pos + i + c.len_utf8();
        }
        end
    }

    fn lex_string(&mut self, start: usize, raw: bool, formatted: bool) -> Result<(), ParseError> {
        let quote = self.bytes[self.pos];
        let triple = self.bytes.get(self.pos + 1) == Some(&quote)
            && self.bytes.get(self.pos + 2) == Some(&quote);
        self.pos += if triple { 3 } else { 1 };

        let mut value = String::new();
        loop {
            let Some(&b) = self.bytes.get(self.pos) else {
                return Err(self.error("unterminated string literal", start, self.pos));
            };
            if b == quote {
                if !triple {
                    self.pos += 1;
                    break;
                }
                if self.bytes.get(self.pos + 1) == Some(&quote)
                    && self.bytes.get(self.pos + 2) == Some(&quote)
                {
                    self.pos += 3;
                    break;
                }
                value.push(b as char);
                self.pos += 1;
            } else if b == b'\\' && !raw {
                self.pos += 1;
                let Some(esc) = self.peek_char() else {
                    return Err(self.error("unterminated string literal", start, self.pos));
                };
                self.pos += esc.len_utf8();
                match esc {
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    'r' => value.push('\r'),
                    '0' => value.push('\0'),
                    '\\' => value.push('\\'),
                    '\'' => value.push('\''),
                    '"' => value.push('"'),
                    '\n' => {}
                    other => {
                        value.push('\\');
                        value.push(other);
                    }
                }
            } else if (b == b'\n' || b == b'\r') && !triple {
                return Err(self.error("unterminated string literal", start, self.pos));
            } else {
                let c = self.src[self.pos..].chars().next().unwrap_or('\u{fffd}');
                value.push(c);
                self.pos += c.len_utf8();
            }
        }
        self.push(TokenKind::Str { value, formatted }, start, self.pos);
        Ok(())
    }

    fn lex_number(&mut self, start: usize) -> Result<(), ParseError> {
        if self.bytes[self.pos] == b'0'
            && matches!(
                self.bytes.get(self.pos + 1),
                Some(b'x') | Some(b'X') | Some(b'o') | Some(b'O') | Some(b'b') | Some(b'B')
            )
        {
            let radix = match self.bytes[self.pos + 1] {
                b'x' | b'X' => 16,
                b'o' | b'O' => 8,
                _ => 2,
            };
            self.pos += 2;
            let digits_start = self.pos;
            while self
                .peek_byte()
                .is_some_and(|b| (b as char).is_digit(radix) || b == b'_')
            {
                self.pos += 1;
            }
            let digits: String = self.src[digits_start..self.pos]
                .chars()
                .filter(|c| *c != '_')
                .collect();
            let value = i64::from_str_radix(&digits, radix)
                .map_err(|_| self.error("invalid numeric literal", start, self.pos))?;
            self.push(TokenKind::Int(value), start, self.pos);
            return Ok(());
        }

        let mut is_float = false;
        while self
            .peek_byte()
            .is_some_and(|b| b.is_ascii_digit() || b == b'_')
        {
            self.pos += 1;
        }
        if self.peek_byte() == Some(b'.')
            && self
                .bytes
                .get(self.pos + 1)
                .is_none_or(|b| !is_ident_start(*b as char))
        {
            is_float = true;
            self.pos += 1;
            while self
                .peek_byte()
                .is_some_and(|b| b.is_ascii_digit() || b == b'_')
            {
                self.pos += 1;
            }
        }
        if matches!(self.peek_byte(), Some(b'e') | Some(b'E')) {
            let mut lookahead = self.pos + 1;
            if matches!(self.bytes.get(lookahead), Some(b'+') | Some(b'-')) {
                lookahead += 1;
            }
            if self.bytes.get(lookahead).is_some_and(|b| b.is_ascii_digit()) {
                is_float = true;
                self.pos = lookahead;
                while self.peek_byte().is_some_and(|b| b.is_ascii_digit()) {
                    self.pos += 1;
                }
            }
        }

        let text: String = self.src[start..self.pos]
            .chars()
            .filter(|c| *c != '_')
            .collect();
        if is_float {
            let value: f64 = text
                .parse()
                .map_err(|_| self.error("invalid numeric literal", start, self.pos))?;
            self.push(TokenKind::Float(value), start, self.pos);
        } else {
            // Integers too large for i64 degrade to floats.
            match text.parse::<i64>() {
                Ok(value) => self.push(TokenKind::Int(value), start, self.pos),
                Err(_) => {
                    let value: f64 = text
                        .parse()
                        .map_err(|_| self.error("invalid numeric literal", start, self.pos))?;
                    self.push(TokenKind::Float(value), start, self.pos);
                }
            }
        }
        Ok(())
    }

    fn lex_operator(&mut self, start: usize, ch: char) -> Result<(), ParseError> {
        use TokenKind::*;
        let rest = &self.bytes[self.pos..];
        let two = |a: u8, b: u8| rest.len() >= 2 && rest[0] == a && rest[1] == b;
        let three = |a: u8, b: u8, c: u8| {
            rest.len() >= 3 && rest[0] == a && rest[1] == b && rest[2] == c
        };

        let (kind, len) = match ch {
            '(' | '[' | '{' => {
                self.depth += 1;
                (
                    match ch {
                        '(' => LParen,
                        '[' => LBracket,
                        _ => LBrace,
                    },
                    1,
                )
            }
            ')' | ']' | '}' => {
                self.depth = self.depth.saturating_sub(1);
                (
                    match ch {
                        ')' => RParen,
                        ']' => RBracket,
                        _ => RBrace,
                    },
                    1,
                )
            }
            ',' => (Comma, 1),
            ':' => (Colon, 1),
            ';' => (Semicolon, 1),
            '.' => (Dot, 1),
            '=' if two(b'=', b'=') => (EqEq, 2),
            '=' => (Assign, 1),
            '!' if two(b'!', b'=') => (NotEq, 2),
            '+' if two(b'+', b'=') => (PlusEq, 2),
            '+' => (Plus, 1),
            '-' if two(b'-', b'=') => (MinusEq, 2),
            '-' if two(b'-', b'>') => (Arrow, 2),
            '-' => (Minus, 1),
            '*' if three(b'*', b'*', b'=') => (DoubleStarEq, 3),
            '*' if two(b'*', b'*') => (DoubleStar, 2),
            '*' if two(b'*', b'=') => (StarEq, 2),
            '*' => (Star, 1),
            '/' if three(b'/', b'/', b'=') => (DoubleSlashEq, 3),
            '/' if two(b'/', b'/') => (DoubleSlash, 2),
            '/' if two(b'/', b'=') => (SlashEq, 2),
            '/' => (Slash, 1),
            '%' if two(b'%', b'=') => (PercentEq, 2),
            '%' => (Percent, 1),
            '&' if two(b'&', b'=') => (AmpEq, 2),
            '&' => (Amp, 1),
            '|' if two(b'|', b'=') => (PipeEq, 2),
            '|' => (Pipe, 1),
            '^' if two(b'^', b'=') => (CaretEq, 2),
            '^' => (Caret, 1),
            '~' => (Tilde, 1),
            '<' if three(b'<', b'<', b'=') => (ShlEq, 3),
            '<' if two(b'<', b'<') => (Shl, 2),
            '<' if two(b'<', b'=') => (Le, 2),
            '<' => (Lt, 1),
            '>' if three(b'>', b'>', b'=') => (ShrEq, 3),
            '>' if two(b'>', b'>') => (Shr, 2),
            '>' if two(b'>', b'=') => (Ge, 2),
            '>' => (Gt, 1),
            other => {
                return Err(self.error(
                    format!("unexpected character {other:?}"),
                    start,
                    start + other.len_utf8(),
                ))
            }
        };
        self.pos += len;
        self.push(kind, start, self.pos);
        Ok(())
    }

    fn skip_spaces(&mut self) {
        while matches!(self.peek_byte(), Some(b' ') | Some(b'\t')) {
            self.pos += 1;
        }
    }

    fn is_newline_at(&self, pos: usize) -> bool {
        matches!(self.bytes.get(pos), Some(b'\n') | Some(b'\r'))
    }

    fn eat_newline(&mut self) {
        match self.peek_byte() {
            Some(b'\r') => {
                self.pos += 1;
                if self.peek_byte() == Some(b'\n') {
                    self.pos += 1;
                }
            }
            Some(b'\n') => self.pos += 1,
            _ => {}
        }
    }

    fn peek_byte(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_char(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn push(&mut self, kind: TokenKind, start: usize, end: usize) {
        self.tokens.push(Token {
            kind,
            range: TextRange::new(TextSize::from(start as u32), TextSize::from(end as u32)),
        });
    }

    fn error(&self, message: impl Into<String>, start: usize, end: usize) -> ParseError {
        ParseError {
            message: message.into(),
            range: TextRange::new(TextSize::from(start as u32), TextSize::from(end as u32)),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c == '_' || unicode_ident::is_xid_start(c)
}

fn is_ident_continue(c: char) -> bool {
    c == '_' || unicode_ident::is_xid_continue(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn indent_dedent_pairing() {
        let toks = kinds("if x:\n    y = 1\nz = 2\n");
        let indents = toks
            .iter()
            .filter(|k| matches!(k, TokenKind::Indent))
            .count();
        let dedents = toks
            .iter()
            .filter(|k| matches!(k, TokenKind::Dedent))
            .count();
        assert_eq!(indents, 1);
        assert_eq!(dedents, 1);
    }

    #[test]
    fn brackets_join_lines() {
        let toks = kinds("x = [1,\n     2]\n");
        let newlines = toks
            .iter()
            .filter(|k| matches!(k, TokenKind::Newline))
            .count();
        assert_eq!(newlines, 1);
    }

    #[test]
    fn string_prefixes() {
        let toks = kinds("f'hi {x}' r'\\d+'\n");
        assert!(matches!(
            &toks[0],
            TokenKind::Str { formatted: true, .. }
        ));
        assert!(matches!(
            &toks[1],
            TokenKind::Str { value, formatted: false } if value == "\\d+"
        ));
    }

    #[test]
    fn comment_only_lines_are_skipped() {
        let toks = kinds("# leading\nx = 1\n  # trailing comment line\ny = 2\n");
        assert!(!toks.iter().any(|k| matches!(k, TokenKind::Indent)));
    }

    #[test]
    fn numbers() {
        assert_eq!(
            kinds("1 2.5 0x1f 1_000 1e3\n")[..5],
            [
                TokenKind::Int(1),
                TokenKind::Float(2.5),
                TokenKind::Int(31),
                TokenKind::Int(1000),
                TokenKind::Float(1000.0),
            ]
        );
    }

    #[test]
    fn unterminated_string_errors() {
        assert!(tokenize("x = 'oops\n").is_err());
    }
}
