use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use thiserror::Error;

use crate::source::SourceReader;
use crate::symbol::{Symbol, SymbolTable};
use crate::token::{Token, TokenKind};

#[derive(Debug, Error)]
pub enum LexError {
    #[error("I/O error while reading source: {0}")]
    Io(#[from] io::Error),
    #[error("illegal token '{text}' at line {line}, columns {left}-{right}: {source_line}")]
    IllegalCharacter {
        text: String,
        left: usize,
        right: usize,
        line: usize,
        source_line: String,
    },
    #[error("integer literal '{text}' out of range at line {line}, columns {left}-{right}: {source_line}")]
    IntegerOutOfRange {
        text: String,
        left: usize,
        right: usize,
        line: usize,
        source_line: String,
    },
    #[error("malformed number literal '{text}' at line {line}, columns {left}-{right}: {source_line}")]
    MalformedNumber {
        text: String,
        left: usize,
        right: usize,
        line: usize,
        source_line: String,
    },
    #[error("malformed date literal '{text}' at line {line}, columns {left}-{right}: {source_line}")]
    MalformedDate {
        text: String,
        left: usize,
        right: usize,
        line: usize,
        source_line: String,
    },
}

pub type LexResult<T> = Result<T, LexError>;

/// Hand-written scanner over a [`SourceReader`]. Each call to
/// [`Lexer::next_token`] yields the next token, then `Ok(None)` once the
/// source is exhausted. Every scan failure is fatal; there is no recovery.
pub struct Lexer<R = BufReader<File>> {
    source: SourceReader<R>,
    symbols: SymbolTable,
    ch: Option<char>,
    line: usize,
    start: usize,
    end: usize,
}

impl Lexer<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> LexResult<Self> {
        Self::new(SourceReader::open(path)?)
    }
}

impl<R: BufRead> Lexer<R> {
    pub fn new(mut source: SourceReader<R>) -> LexResult<Self> {
        let ch = source.read()?;
        Ok(Self {
            source,
            symbols: SymbolTable::new(),
            ch,
            line: 0,
            start: 0,
            end: 0,
        })
    }

    pub fn next_token(&mut self) -> LexResult<Option<Token>> {
        loop {
            while matches!(self.ch, Some(c) if c.is_whitespace()) {
                self.ch = self.source.read()?;
            }
            let Some(c) = self.ch else {
                return Ok(None);
            };

            self.start = self.source.column();
            self.end = self.start;
            self.line = self.source.line_number();

            if c.is_alphabetic() || c == '_' {
                return Ok(Some(self.identifier_or_keyword(c)?));
            }
            if c.is_ascii_digit() {
                return Ok(Some(self.numeric_literal()?));
            }
            if let Some(token) = self.operator(c)? {
                return Ok(Some(token));
            }
            // A line comment was skipped; rescan from the next line.
        }
    }

    fn identifier_or_keyword(&mut self, first: char) -> LexResult<Token> {
        let mut lexeme = String::new();
        lexeme.push(first);
        loop {
            self.ch = self.source.read()?;
            match self.ch {
                Some(c) if c.is_alphanumeric() || c == '_' => {
                    lexeme.push(c);
                    self.end = self.source.column();
                }
                _ => break,
            }
        }
        let symbol = self.symbols.intern(&lexeme, TokenKind::Identifier);
        Ok(self.token(symbol))
    }

    fn numeric_literal(&mut self) -> LexResult<Token> {
        let (mut lexeme, value) = self.leading_digits()?;
        let mut kind = TokenKind::IntLit;

        if let Some(sep @ ('.' | '~')) = self.ch {
            // The digits before a '.' or '~' double as the month field of a
            // candidate date, so they are range-checked either way.
            if value > 12 {
                return Err(self.malformed(sep, lexeme));
            }
            let lead_len = lexeme.len();
            lexeme.push(sep);
            self.end = self.source.column();
            self.ch = self.source.read()?;

            let second = self.trailing_digits()?;
            if second.is_empty() {
                return Err(self.malformed(sep, lexeme));
            }
            lexeme.push_str(&second);

            if sep == '.' {
                kind = TokenKind::NumberLit;
            } else {
                if lead_len > 2 || second.len() > 2 {
                    return Err(self.malformed_date(lexeme));
                }
                if self.ch != Some('~') {
                    return Err(self.malformed_date(lexeme));
                }
                lexeme.push('~');
                self.end = self.source.column();
                self.ch = self.source.read()?;

                let last = self.trailing_digits()?;
                lexeme.push_str(&last);
                if last.len() != 2 && last.len() != 4 {
                    return Err(self.malformed_date(lexeme));
                }
                kind = TokenKind::DateLit;
            }
        }

        let symbol = self.symbols.intern(&lexeme, kind);
        Ok(self.token(symbol))
    }

    /// Maximal digit run starting at the current character, which the caller
    /// has already checked to be a digit. Must parse as a host `i32`.
    fn leading_digits(&mut self) -> LexResult<(String, i32)> {
        let run = self.digit_run()?;
        match run.parse::<i32>() {
            Ok(value) => Ok((run, value)),
            Err(_) => Err(self.integer_out_of_range(run)),
        }
    }

    /// Digit run after a literal separator; may be empty, and the caller
    /// decides what an empty run means.
    fn trailing_digits(&mut self) -> LexResult<String> {
        let run = self.digit_run()?;
        if !run.is_empty() && run.parse::<i32>().is_err() {
            return Err(self.integer_out_of_range(run));
        }
        Ok(run)
    }

    fn digit_run(&mut self) -> LexResult<String> {
        let mut run = String::new();
        while let Some(c) = self.ch {
            if !c.is_ascii_digit() {
                break;
            }
            run.push(c);
            self.end = self.source.column();
            self.ch = self.source.read()?;
        }
        Ok(run)
    }

    /// One- or two-character operator, decided by probing the symbol table
    /// with the two-character spelling first. `//` is not an operator: it
    /// discards the rest of the line and the caller rescans, signalled by
    /// `Ok(None)`.
    fn operator(&mut self, first: char) -> LexResult<Option<Token>> {
        self.ch = self.source.read()?;

        if let Some(second) = self.ch {
            let mut pair = String::new();
            pair.push(first);
            pair.push(second);
            if pair == "//" {
                self.skip_line_comment()?;
                return Ok(None);
            }
            if let Some(symbol) = self.symbols.lookup(&pair) {
                self.end = self.source.column();
                self.ch = self.source.read()?;
                return Ok(Some(self.token(symbol)));
            }
        }

        let single = first.to_string();
        match self.symbols.lookup(&single) {
            Some(symbol) => Ok(Some(self.token(symbol))),
            None => Err(self.illegal(single)),
        }
    }

    fn skip_line_comment(&mut self) -> LexResult<()> {
        let line = self.source.line_number();
        loop {
            self.ch = self.source.read()?;
            match self.ch {
                None => return Ok(()),
                Some(_) if self.source.line_number() != line => return Ok(()),
                Some(_) => {}
            }
        }
    }

    fn token(&self, symbol: Symbol) -> Token {
        Token::new(self.start, self.end, self.line, symbol)
    }

    fn malformed(&self, sep: char, text: String) -> LexError {
        if sep == '.' {
            self.malformed_number(text)
        } else {
            self.malformed_date(text)
        }
    }

    fn illegal(&self, text: String) -> LexError {
        LexError::IllegalCharacter {
            text,
            left: self.start,
            right: self.end,
            line: self.line,
            source_line: self.source.line_text().to_string(),
        }
    }

    fn integer_out_of_range(&self, text: String) -> LexError {
        LexError::IntegerOutOfRange {
            text,
            left: self.start,
            right: self.end,
            line: self.line,
            source_line: self.source.line_text().to_string(),
        }
    }

    fn malformed_number(&self, text: String) -> LexError {
        LexError::MalformedNumber {
            text,
            left: self.start,
            right: self.end,
            line: self.line,
            source_line: self.source.line_text().to_string(),
        }
    }

    fn malformed_date(&self, text: String) -> LexError {
        LexError::MalformedDate {
            text,
            left: self.start,
            right: self.end,
            line: self.line,
            source_line: self.source.line_text().to_string(),
        }
    }
}

impl<R: BufRead> Iterator for Lexer<R> {
    type Item = LexResult<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token().transpose()
    }
}

/// Collect every token of an in-memory source program.
pub fn tokenize(source: &str) -> LexResult<Vec<Token>> {
    Lexer::new(SourceReader::new(io::Cursor::new(source.to_string())))?.collect()
}
