// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::diagnostic::{Path, Position};
use crate::error::DocumentError;
use crate::Rc;

use core::fmt::{self, Debug, Formatter};
use core::iter::Peekable;
use core::str::CharIndices;

use anyhow::{bail, Result};

#[derive(Clone)]
struct SourceInternal {
    pub file: String,
    pub contents: String,
    pub lines: Vec<(u32, u32)>,
}

/// The text of one document together with its name and line table.
#[derive(Clone)]
pub struct Source {
    src: Rc<SourceInternal>,
}

impl PartialEq for Source {
    fn eq(&self, other: &Source) -> bool {
        Rc::ptr_eq(&self.src, &other.src)
    }
}

impl Eq for Source {}

impl Debug for Source {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        self.src.file.fmt(f)
    }
}

impl Source {
    pub fn from_contents(file: String, contents: String) -> Result<Source> {
        let max_size = u32::MAX as usize - 2; // Account for rows, cols possibly starting at 1, EOF etc.
        if contents.len() > max_size {
            bail!("{file} exceeds maximum allowed document size {max_size}");
        }
        let mut lines = vec![];
        let mut prev_ch = ' ';
        let mut prev_pos = 0u32;
        let mut start = 0u32;
        for (i, ch) in contents.char_indices() {
            if ch == '\n' {
                let end = match prev_ch {
                    '\r' => prev_pos,
                    _ => i as u32,
                };
                lines.push((start, end));
                start = i as u32 + 1;
            }
            prev_ch = ch;
            prev_pos = i as u32;
        }

        if (start as usize) < contents.len() {
            lines.push((start, contents.len() as u32));
        } else if contents.is_empty() {
            lines.push((0, 0));
        } else {
            let s = (contents.len() - 1) as u32;
            lines.push((s, s));
        }
        Ok(Self {
            src: Rc::new(SourceInternal {
                file,
                contents,
                lines,
            }),
        })
    }

    pub fn file(&self) -> &String {
        &self.src.file
    }

    pub fn contents(&self) -> &String {
        &self.src.contents
    }

    pub fn line(&self, idx: u32) -> &str {
        let idx = idx as usize;
        if idx < self.src.lines.len() {
            let (start, end) = self.src.lines[idx];
            &self.src.contents[start as usize..end as usize]
        } else {
            ""
        }
    }

    pub fn message(&self, line: u32, col: u32, kind: &str, msg: &str) -> String {
        if line == 0 || line as usize > self.src.lines.len() {
            return format!("{}: invalid line {} specified", self.src.file, line);
        }

        let line_str = format!("{line}");
        let line_num_width = line_str.len() + 1;
        let col_spaces = (col as usize).saturating_sub(1);

        format!(
            "\n--> {}:{}:{}\n{:<line_num_width$}|\n\
		{:<line_num_width$}| {}\n\
		{:<line_num_width$}| {:<col_spaces$}^\n\
		{}: {}",
            self.src.file,
            line,
            col,
            "",
            line,
            self.line(line - 1),
            "",
            "",
            kind,
            msg
        )
    }

    fn lex_error(&self, line: u32, col: u32, offset: usize, reason: &str) -> DocumentError {
        DocumentError::Lex {
            file: self.src.file.as_str().into(),
            path: Path::root(),
            position: Position {
                line,
                col,
                offset: offset as u32,
            },
            reason: reason.into(),
        }
    }
}

#[derive(Clone)]
pub struct Span {
    pub source: Source,
    pub line: u32,
    pub col: u32,
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn text(&self) -> &str {
        &self.source.contents()[self.start as usize..self.end as usize]
    }

    pub fn position(&self) -> Position {
        Position {
            line: self.line,
            col: self.col,
            offset: self.start,
        }
    }

    pub fn message(&self, kind: &str, msg: &str) -> String {
        self.source.message(self.line, self.col, kind, msg)
    }
}

impl Debug for Span {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        let t = self.text().escape_debug().to_string();
        let max = 32;
        let (txt, trailer) = if t.len() > max {
            let mut cut = max;
            while !t.is_char_boundary(cut) {
                cut -= 1;
            }
            (&t[0..cut], "...")
        } else {
            (t.as_str(), "")
        };

        f.write_fmt(format_args!(
            "{}:{}:{}:{}, \"{}{}\"",
            self.line, self.col, self.start, self.end, txt, trailer
        ))
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TokenKind {
    /// One of `{ } [ ] : ,`.
    Symbol,
    /// Single or double quoted string. The span includes the quotes.
    String,
    Number,
    /// Bare word other than the keyword literals.
    Ident,
    /// `true`, `false` or `null`.
    Keyword,
    /// A whole `function (...) { ... }` literal, body uninterpreted.
    Function,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token(pub TokenKind, pub Span);

#[derive(Clone)]
pub struct Lexer<'source> {
    source: Source,
    iter: Peekable<CharIndices<'source>>,
    line: u32,
    col: u32,
}

fn is_ident_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || ch == '$'
}

// `function` starts a literal only when a parameter list or a name follows it.
// Elsewhere, e.g. as an object key, it is a plain identifier.
fn begins_function(mut rest: &str) -> bool {
    loop {
        rest = rest.trim_start();
        if let Some(line) = rest.strip_prefix("//") {
            rest = line.find('\n').map_or("", |idx| &line[idx..]);
        } else if let Some(block) = rest.strip_prefix("/*") {
            match block.find("*/") {
                Some(idx) => rest = &block[idx + 2..],
                // An unterminated comment is reported by the function scanner.
                None => return true,
            }
        } else {
            return rest
                .chars()
                .next()
                .is_some_and(|ch| ch == '(' || is_ident_start(ch));
        }
    }
}

fn is_ident_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source Source) -> Self {
        Self {
            source: source.clone(),
            iter: source.contents().char_indices().peekable(),
            line: 1,
            col: 1,
        }
    }

    fn peek(&mut self) -> (usize, char) {
        match self.iter.peek() {
            Some((index, chr)) => (*index, *chr),
            _ => (self.source.contents().len(), '\x00'),
        }
    }

    fn peekahead(&mut self, n: usize) -> (usize, char) {
        match self.iter.clone().nth(n) {
            Some((index, chr)) => (index, chr),
            _ => (self.source.contents().len(), '\x00'),
        }
    }

    fn at_eof(&mut self) -> bool {
        self.iter.peek().is_none()
    }

    // Advance one character, keeping line and column current.
    fn bump(&mut self) -> char {
        match self.iter.next() {
            Some((_, '\n')) => {
                self.line += 1;
                self.col = 1;
                '\n'
            }
            Some((_, ch)) => {
                self.col += 1;
                ch
            }
            None => '\x00',
        }
    }

    fn make_token(&mut self, kind: TokenKind, start: usize, line: u32, col: u32) -> Token {
        let end = self.peek().0;
        Token(
            kind,
            Span {
                source: self.source.clone(),
                line,
                col,
                start: start as u32,
                end: end as u32,
            },
        )
    }

    fn error_here(&mut self, reason: &str) -> DocumentError {
        let offset = self.peek().0;
        self.source.lex_error(self.line, self.col, offset, reason)
    }

    fn read_ident(&mut self) -> Result<Token, DocumentError> {
        let (start, _) = self.peek();
        let (line, col) = (self.line, self.col);
        while is_ident_char(self.peek().1) && !self.at_eof() {
            self.bump();
        }
        let end = self.peek().0;
        match &self.source.contents()[start..end] {
            "function" if begins_function(&self.source.contents()[end..]) => {
                self.read_function(start, line, col)
            }
            "true" | "false" | "null" => Ok(self.make_token(TokenKind::Keyword, start, line, col)),
            _ => Ok(self.make_token(TokenKind::Ident, start, line, col)),
        }
    }

    fn read_digits(&mut self) -> usize {
        let mut count = 0;
        while self.peek().1.is_ascii_digit() {
            self.bump();
            count += 1;
        }
        count
    }

    fn read_number(&mut self) -> Result<Token, DocumentError> {
        let (start, _) = self.peek();
        let (line, col) = (self.line, self.col);

        if self.peek().1 == '-' {
            self.bump();
        }

        if self.peek().1 == '0' && matches!(self.peekahead(1).1, 'x' | 'X') {
            self.bump();
            self.bump();
            let mut count = 0;
            while self.peek().1.is_ascii_hexdigit() {
                self.bump();
                count += 1;
            }
            if count == 0 {
                return Err(self.source.lex_error(line, col, start, "invalid number"));
            }
        } else {
            let mut digits = self.read_digits();
            if self.peek().1 == '.' {
                self.bump();
                digits += self.read_digits();
            }
            if digits == 0 {
                return Err(self.source.lex_error(line, col, start, "invalid number"));
            }

            // Exponent must be followed by an optional sign and at least one digit.
            if matches!(self.peek().1, 'e' | 'E') {
                self.bump();
                if matches!(self.peek().1, '+' | '-') {
                    self.bump();
                }
                if self.read_digits() == 0 {
                    return Err(self.source.lex_error(line, col, start, "invalid number"));
                }
            }
        }

        // A valid number cannot run straight into an identifier or another dot.
        let ch = self.peek().1;
        if ch == '.' || is_ident_char(ch) {
            return Err(self.error_here("invalid number"));
        }

        let tok = self.make_token(TokenKind::Number, start, line, col);
        match parse_number(tok.1.text()) {
            Some(_) => Ok(tok),
            None => Err(self
                .source
                .lex_error(line, col, start, "number out of range")),
        }
    }

    fn read_hex_digits(&mut self, count: usize, reason: &str) -> Result<(), DocumentError> {
        for _ in 0..count {
            if !self.peek().1.is_ascii_hexdigit() {
                return Err(self.error_here(reason));
            }
            self.bump();
        }
        Ok(())
    }

    fn read_string(&mut self) -> Result<Token, DocumentError> {
        let (start, quote) = self.peek();
        let (line, col) = (self.line, self.col);
        self.bump();
        loop {
            let ch = self.peek().1;
            match ch {
                _ if self.at_eof() => {
                    return Err(self.source.lex_error(line, col, start, "unterminated string"));
                }
                '\n' => {
                    return Err(self.source.lex_error(line, col, start, "unterminated string"));
                }
                '\\' => {
                    self.bump();
                    if self.at_eof() {
                        return Err(self.source.lex_error(line, col, start, "unterminated string"));
                    }
                    match self.bump() {
                        'x' => self.read_hex_digits(2, "invalid hex escape sequence")?,
                        'u' if self.peek().1 == '{' => {
                            self.bump();
                            let mut count = 0;
                            while self.peek().1.is_ascii_hexdigit() {
                                self.bump();
                                count += 1;
                            }
                            if count == 0 || count > 6 || self.peek().1 != '}' {
                                return Err(self.error_here("invalid unicode escape sequence"));
                            }
                            self.bump();
                        }
                        'u' => self.read_hex_digits(4, "invalid unicode escape sequence")?,
                        '\r' if self.peek().1 == '\n' => {
                            self.bump();
                        }
                        // Any other escaped character stands for itself.
                        _ => (),
                    }
                }
                _ if ch == quote => {
                    self.bump();
                    break;
                }
                _ => {
                    self.bump();
                }
            }
        }
        Ok(self.make_token(TokenKind::String, start, line, col))
    }

    // Skip a string literal inside a function body. Only termination matters.
    fn skip_body_string(&mut self) -> bool {
        let quote = self.bump();
        loop {
            match self.peek().1 {
                _ if self.at_eof() => return false,
                '\\' => {
                    self.bump();
                    self.bump();
                }
                ch if ch == quote => {
                    self.bump();
                    return true;
                }
                _ => {
                    self.bump();
                }
            }
        }
    }

    // Skip a `//` or `/* */` comment if one starts here.
    fn skip_comment(&mut self) -> Result<bool, DocumentError> {
        if self.peek().1 != '/' {
            return Ok(false);
        }
        match self.peekahead(1).1 {
            '/' => {
                while !self.at_eof() && self.peek().1 != '\n' {
                    self.bump();
                }
                Ok(true)
            }
            '*' => {
                let (offset, _) = self.peek();
                let (line, col) = (self.line, self.col);
                self.bump();
                self.bump();
                loop {
                    if self.at_eof() {
                        return Err(self
                            .source
                            .lex_error(line, col, offset, "unterminated comment"));
                    }
                    if self.peek().1 == '*' && self.peekahead(1).1 == '/' {
                        self.bump();
                        self.bump();
                        return Ok(true);
                    }
                    self.bump();
                }
            }
            _ => Ok(false),
        }
    }

    // Scan a balanced `open ... close` group, stepping over strings and comments.
    fn skip_balanced(&mut self, open: char, close: char) -> Result<bool, DocumentError> {
        let mut depth = 0usize;
        loop {
            if self.at_eof() {
                return Ok(false);
            }
            if self.skip_comment()? {
                continue;
            }
            match self.peek().1 {
                '"' | '\'' | '`' => {
                    if !self.skip_body_string() {
                        return Ok(false);
                    }
                    continue;
                }
                ch if ch == open => depth += 1,
                ch if ch == close => {
                    depth -= 1;
                    if depth == 0 {
                        self.bump();
                        return Ok(true);
                    }
                }
                _ => (),
            }
            self.bump();
        }
    }

    // The `function` keyword has been consumed. Read the optional name, the
    // parameter list and the brace-balanced body as one opaque token.
    fn read_function(&mut self, start: usize, line: u32, col: u32) -> Result<Token, DocumentError> {
        let malformed = |lexer: &mut Self, reason: &str| lexer.source.lex_error(line, col, start, reason);

        self.skip_ws()?;
        if is_ident_start(self.peek().1) {
            while is_ident_char(self.peek().1) && !self.at_eof() {
                self.bump();
            }
            self.skip_ws()?;
        }

        if self.peek().1 != '(' {
            return Err(malformed(self, "malformed function literal: expecting `(`"));
        }
        if !self.skip_balanced('(', ')')? {
            return Err(malformed(self, "unbalanced parentheses in function literal"));
        }

        self.skip_ws()?;
        if self.peek().1 != '{' {
            return Err(malformed(self, "malformed function literal: expecting `{`"));
        }
        if !self.skip_balanced('{', '}')? {
            return Err(malformed(self, "unbalanced braces in function literal"));
        }

        Ok(self.make_token(TokenKind::Function, start, line, col))
    }

    fn skip_ws(&mut self) -> Result<(), DocumentError> {
        loop {
            match self.peek().1 {
                _ if self.at_eof() => break,
                ch if ch.is_whitespace() || ch == '\u{feff}' => {
                    self.bump();
                }
                '/' => {
                    if !self.skip_comment()? {
                        break;
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    pub fn next_token(&mut self) -> Result<Token, DocumentError> {
        self.skip_ws()?;

        let (start, chr) = self.peek();
        let (line, col) = (self.line, self.col);

        if self.at_eof() {
            return Ok(self.make_token(TokenKind::Eof, start, line, col));
        }

        match chr {
            '{' | '}' | '[' | ']' | ':' | ',' => {
                self.bump();
                Ok(self.make_token(TokenKind::Symbol, start, line, col))
            }
            '"' | '\'' => self.read_string(),
            '-' | '.' if matches!(self.peekahead(1).1, '0'..='9' | '.') => self.read_number(),
            '0'..='9' => self.read_number(),
            _ if is_ident_start(chr) => self.read_ident(),
            _ => Err(self.error_here(&format!("invalid character `{}`", chr.escape_debug()))),
        }
    }

    /// Lex the whole document. The returned stream always ends with an `Eof` token.
    pub fn tokenize(mut self) -> Result<Vec<Token>, DocumentError> {
        let mut tokens = vec![];
        loop {
            let tok = self.next_token()?;
            let done = tok.0 == TokenKind::Eof;
            tokens.push(tok);
            if done {
                return Ok(tokens);
            }
        }
    }
}

/// Numeric value of a number token. `None` for values that do not fit an f64.
pub fn parse_number(text: &str) -> Option<f64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let value = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16).ok()? as f64,
        None => digits.parse::<f64>().ok()?,
    };
    if !value.is_finite() {
        return None;
    }
    Some(if negative { -value } else { value })
}

fn hex_value(digits: &str) -> Option<u32> {
    u32::from_str_radix(digits, 16).ok()
}

/// Decode a string token (quotes included) into its value.
pub fn unescape(text: &str) -> Result<String, &'static str> {
    let mut chars = text.chars();
    let quote = chars.next().ok_or("empty string token")?;
    let body = chars.as_str();
    let body = body.strip_suffix(quote).ok_or("unterminated string")?;

    let mut out = String::with_capacity(body.len());
    let mut iter = body.chars().peekable();
    let mut pending_high: Option<u32> = None;

    let push_unit = |out: &mut String, pending: &mut Option<u32>, unit: u32| {
        if (0xD800..0xDC00).contains(&unit) {
            if pending.is_some() {
                out.push('\u{fffd}');
            }
            *pending = Some(unit);
            return;
        }
        if (0xDC00..0xE000).contains(&unit) {
            match pending.take() {
                Some(high) => {
                    let c = 0x10000 + ((high - 0xD800) << 10) + (unit - 0xDC00);
                    out.push(char::from_u32(c).unwrap_or('\u{fffd}'));
                }
                None => out.push('\u{fffd}'),
            }
            return;
        }
        if pending.take().is_some() {
            out.push('\u{fffd}');
        }
        out.push(char::from_u32(unit).unwrap_or('\u{fffd}'));
    };

    while let Some(ch) = iter.next() {
        if ch != '\\' {
            if pending_high.take().is_some() {
                out.push('\u{fffd}');
            }
            out.push(ch);
            continue;
        }
        let esc = iter.next().ok_or("unterminated escape sequence")?;
        match esc {
            'u' => {
                let unit = if iter.peek() == Some(&'{') {
                    iter.next();
                    let digits: String = iter.by_ref().take_while(|c| *c != '}').collect();
                    hex_value(&digits).ok_or("invalid unicode escape sequence")?
                } else {
                    let digits: String = iter.by_ref().take(4).collect();
                    if digits.len() != 4 {
                        return Err("invalid unicode escape sequence");
                    }
                    hex_value(&digits).ok_or("invalid unicode escape sequence")?
                };
                push_unit(&mut out, &mut pending_high, unit);
                continue;
            }
            'x' => {
                let digits: String = iter.by_ref().take(2).collect();
                if digits.len() != 2 {
                    return Err("invalid hex escape sequence");
                }
                let unit = hex_value(&digits).ok_or("invalid hex escape sequence")?;
                push_unit(&mut out, &mut pending_high, unit);
                continue;
            }
            _ => (),
        }
        if pending_high.take().is_some() {
            out.push('\u{fffd}');
        }
        match esc {
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' => out.push('\0'),
            // Line continuation.
            '\n' => (),
            '\r' => {
                if iter.peek() == Some(&'\n') {
                    iter.next();
                }
            }
            other => out.push(other),
        }
    }
    if pending_high.is_some() {
        out.push('\u{fffd}');
    }
    Ok(out)
}
