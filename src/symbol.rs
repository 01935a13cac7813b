use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::token::TokenKind;

/// An interned `(lexeme, kind)` pair. Cloning a `Symbol` shares the lexeme
/// storage, so tokens and AST leaves referring to the same lexeme all point
/// at one canonical string.
#[derive(Debug, Clone)]
pub struct Symbol {
    lexeme: Arc<str>,
    kind: TokenKind,
}

impl Symbol {
    pub fn lexeme(&self) -> &str {
        &self.lexeme
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && (Arc::ptr_eq(&self.lexeme, &other.lexeme) || self.lexeme == other.lexeme)
    }
}

impl Eq for Symbol {}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.lexeme)
    }
}

/// Interning table keyed by lexeme. Reserved words and operator spellings are
/// seeded up front with their fixed kinds; an existing entry always wins over
/// the kind proposed at intern time, which is how a keyword lexeme scanned as
/// a candidate identifier comes back with its reserved kind.
pub struct SymbolTable {
    entries: HashMap<Arc<str>, Symbol>,
}

const RESERVED: [(&str, TokenKind); 34] = [
    ("program", TokenKind::Program),
    ("if", TokenKind::If),
    ("then", TokenKind::Then),
    ("else", TokenKind::Else),
    ("while", TokenKind::While),
    ("for", TokenKind::For),
    ("in", TokenKind::In),
    ("do", TokenKind::Do),
    ("until", TokenKind::Until),
    ("return", TokenKind::Return),
    ("int", TokenKind::Int),
    ("boolean", TokenKind::Boolean),
    ("number", TokenKind::Number),
    ("date", TokenKind::Date),
    ("{", TokenKind::LeftBrace),
    ("}", TokenKind::RightBrace),
    ("(", TokenKind::LeftParen),
    (")", TokenKind::RightParen),
    ("[", TokenKind::LeftBracket),
    ("]", TokenKind::RightBracket),
    (",", TokenKind::Comma),
    ("=", TokenKind::Assign),
    ("==", TokenKind::Equal),
    ("!=", TokenKind::NotEqual),
    ("<", TokenKind::Less),
    ("<=", TokenKind::LessEqual),
    (">", TokenKind::Greater),
    (">=", TokenKind::GreaterEqual),
    ("+", TokenKind::Plus),
    ("-", TokenKind::Minus),
    ("|", TokenKind::Or),
    ("*", TokenKind::Multiply),
    ("/", TokenKind::Divide),
    ("&", TokenKind::And),
];

impl SymbolTable {
    pub fn new() -> Self {
        let mut table = Self {
            entries: HashMap::with_capacity(RESERVED.len() * 2),
        };
        for (lexeme, kind) in RESERVED {
            table.intern(lexeme, kind);
        }
        table
    }

    /// Return the canonical symbol for `lexeme`, inserting it with `kind` if
    /// it has not been seen before.
    pub fn intern(&mut self, lexeme: &str, kind: TokenKind) -> Symbol {
        if let Some(symbol) = self.entries.get(lexeme) {
            return symbol.clone();
        }
        let lexeme: Arc<str> = Arc::from(lexeme);
        let symbol = Symbol {
            lexeme: Arc::clone(&lexeme),
            kind,
        };
        self.entries.insert(lexeme, symbol.clone());
        symbol
    }

    /// Probe for an existing symbol without creating one. The scanner uses
    /// this to decide whether a two-character operator spelling exists.
    pub fn lookup(&self, lexeme: &str) -> Option<Symbol> {
        self.entries.get(lexeme).cloned()
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
