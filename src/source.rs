use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Serves the source program one character at a time, reading lines lazily.
/// The end of every line comes back as a single space, so the scanner never
/// sees a newline; the line number and the column of the character just
/// served are tracked separately, and the current line text is retained for
/// diagnostics.
pub struct SourceReader<R = BufReader<File>> {
    input: R,
    line_text: String,
    chars: Vec<char>,
    line_number: usize,
    column: usize,
    next: usize,
    need_line: bool,
}

impl SourceReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> SourceReader<R> {
    pub fn new(input: R) -> Self {
        Self {
            input,
            line_text: String::new(),
            chars: Vec::new(),
            line_number: 0,
            column: 0,
            next: 0,
            need_line: true,
        }
    }

    /// The next usable character, or `None` once the file is exhausted.
    pub fn read(&mut self) -> io::Result<Option<char>> {
        if self.need_line {
            self.line_text.clear();
            if self.input.read_line(&mut self.line_text)? == 0 {
                return Ok(None);
            }
            while self.line_text.ends_with('\n') || self.line_text.ends_with('\r') {
                self.line_text.pop();
            }
            self.chars = self.line_text.chars().collect();
            self.line_number += 1;
            self.next = 0;
            self.need_line = false;
        }

        if self.next >= self.chars.len() {
            self.need_line = true;
            self.column = self.chars.len();
            return Ok(Some(' '));
        }

        let ch = self.chars[self.next];
        self.column = self.next;
        self.next += 1;
        Ok(Some(ch))
    }

    /// Column (0-based) of the character most recently served.
    pub fn column(&self) -> usize {
        self.column
    }

    /// Line number (1-based) of the character most recently served.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Text of the line currently being served, for diagnostics.
    pub fn line_text(&self) -> &str {
        &self.line_text
    }
}
