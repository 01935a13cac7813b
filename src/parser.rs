//! Recursive-descent parser for the "X" grammar, one routine per
//! non-terminal. Builds the AST arena as a side effect of a successful walk;
//! the first mismatch raises a [`SyntaxError`] and parsing halts.

pub mod ast;

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::Path;

use thiserror::Error;

use crate::lexer::{LexError, Lexer};
use crate::source::SourceReader;
use crate::token::{Token, TokenKind};

use self::ast::{Ast, NodeId, NodeKind};

/// The token the parser found and the kind it needed.
#[derive(Debug)]
pub struct SyntaxError {
    pub found: Option<Token>,
    pub expected: TokenKind,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.found {
            Some(token) => write!(
                f,
                "syntax error at line {}, columns {}-{}: found '{}', Expected: {}",
                token.line,
                token.left,
                token.right,
                token.lexeme(),
                self.expected
            ),
            None => write!(f, "syntax error at end of input, Expected: {}", self.expected),
        }
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("{0}")]
    Syntax(SyntaxError),
    #[error(transparent)]
    Lex(#[from] LexError),
}

const RELATIONAL_OPS: [TokenKind; 6] = [
    TokenKind::Equal,
    TokenKind::NotEqual,
    TokenKind::Less,
    TokenKind::LessEqual,
    TokenKind::Greater,
    TokenKind::GreaterEqual,
];
const ADDING_OPS: [TokenKind; 3] = [TokenKind::Plus, TokenKind::Minus, TokenKind::Or];
const MULTIPLYING_OPS: [TokenKind; 3] = [TokenKind::Multiply, TokenKind::Divide, TokenKind::And];

pub struct Parser<R: BufRead = BufReader<File>> {
    lexer: Lexer<R>,
    current: Option<Token>,
    ast: Ast,
}

impl Parser<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ParseError> {
        Self::new(Lexer::open(path)?)
    }
}

impl<R: BufRead> Parser<R> {
    pub fn new(mut lexer: Lexer<R>) -> Result<Self, ParseError> {
        let current = lexer.next_token()?;
        Ok(Self {
            lexer,
            current,
            ast: Ast::new(),
        })
    }

    pub fn parse(mut self) -> Result<Ast, ParseError> {
        let root = self.parse_program()?;
        self.ast.set_root(root);
        Ok(self.ast)
    }

    // PROGRAM -> 'program' BLOCK
    fn parse_program(&mut self) -> Result<NodeId, ParseError> {
        let t = self.ast.new_node(NodeKind::Program);
        self.expect(TokenKind::Program)?;
        let block = self.parse_block()?;
        self.ast.add_kid(t, block);
        Ok(t)
    }

    // BLOCK -> '{' D* S* '}'
    fn parse_block(&mut self) -> Result<NodeId, ParseError> {
        self.expect(TokenKind::LeftBrace)?;
        let t = self.ast.new_node(NodeKind::Block);
        while self.starting_decl() {
            let decl = self.parse_decl()?;
            self.ast.add_kid(t, decl);
        }
        while self.starting_statement() {
            let statement = self.parse_statement()?;
            self.ast.add_kid(t, statement);
        }
        self.expect(TokenKind::RightBrace)?;
        Ok(t)
    }

    fn starting_decl(&self) -> bool {
        self.at_any(&[
            TokenKind::Int,
            TokenKind::Boolean,
            TokenKind::Number,
            TokenKind::Date,
        ])
    }

    fn starting_statement(&self) -> bool {
        // 'else' cannot legally begin a statement, but admitting it here lets
        // a stray 'else' fail inside parse_statement instead of being taken
        // as the end of the enclosing block.
        self.at_any(&[
            TokenKind::If,
            TokenKind::Else,
            TokenKind::Do,
            TokenKind::For,
            TokenKind::While,
            TokenKind::Return,
            TokenKind::LeftBrace,
            TokenKind::Identifier,
        ])
    }

    // D -> TYPE NAME | TYPE NAME FUNHEAD BLOCK
    fn parse_decl(&mut self) -> Result<NodeId, ParseError> {
        let ty = self.parse_type()?;
        let name = self.parse_name()?;
        if self.at(TokenKind::LeftParen) {
            let t = self.ast.new_node(NodeKind::FunctionDecl);
            self.ast.add_kid(t, ty);
            self.ast.add_kid(t, name);
            let formals = self.parse_fun_head()?;
            self.ast.add_kid(t, formals);
            let body = self.parse_block()?;
            self.ast.add_kid(t, body);
            return Ok(t);
        }
        let t = self.ast.new_node(NodeKind::Decl);
        self.ast.add_kid(t, ty);
        self.ast.add_kid(t, name);
        Ok(t)
    }

    // TYPE -> 'int' | 'boolean' | 'number' | 'date'
    fn parse_type(&mut self) -> Result<NodeId, ParseError> {
        if self.at(TokenKind::Int) {
            self.scan()?;
            return Ok(self.ast.new_node(NodeKind::IntType));
        }
        if self.at(TokenKind::Number) {
            self.scan()?;
            return Ok(self.ast.new_node(NodeKind::NumberType));
        }
        if self.at(TokenKind::Date) {
            self.scan()?;
            return Ok(self.ast.new_node(NodeKind::DateType));
        }
        self.expect(TokenKind::Boolean)?;
        Ok(self.ast.new_node(NodeKind::BoolType))
    }

    // FUNHEAD -> '(' (D list ',')? ')'
    fn parse_fun_head(&mut self) -> Result<NodeId, ParseError> {
        let t = self.ast.new_node(NodeKind::Formals);
        self.expect(TokenKind::LeftParen)?;
        if !self.at(TokenKind::RightParen) {
            loop {
                let decl = self.parse_decl()?;
                self.ast.add_kid(t, decl);
                if self.at(TokenKind::Comma) {
                    self.scan()?;
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightParen)?;
        Ok(t)
    }

    // S -> 'if' E 'then' BLOCK ('else' BLOCK)?
    //   -> 'while' E BLOCK
    //   -> 'for' NAME 'in' LIST BLOCK 'else' BLOCK
    //   -> 'do' BLOCK 'until' E
    //   -> 'return' E
    //   -> BLOCK
    //   -> NAME '=' E
    fn parse_statement(&mut self) -> Result<NodeId, ParseError> {
        if self.at(TokenKind::If) {
            self.scan()?;
            let t = self.ast.new_node(NodeKind::If);
            let condition = self.parse_expr()?;
            self.ast.add_kid(t, condition);
            self.expect(TokenKind::Then)?;
            let then_block = self.parse_block()?;
            self.ast.add_kid(t, then_block);
            if self.at(TokenKind::Else) {
                self.scan()?;
                let else_block = self.parse_block()?;
                self.ast.add_kid(t, else_block);
            }
            return Ok(t);
        }

        if self.at(TokenKind::While) {
            self.scan()?;
            let t = self.ast.new_node(NodeKind::While);
            let condition = self.parse_expr()?;
            self.ast.add_kid(t, condition);
            let body = self.parse_block()?;
            self.ast.add_kid(t, body);
            return Ok(t);
        }

        if self.at(TokenKind::For) {
            self.scan()?;
            let t = self.ast.new_node(NodeKind::For);
            let variable = self.parse_name()?;
            self.ast.add_kid(t, variable);
            self.expect(TokenKind::In)?;
            let iterable = self.parse_list()?;
            self.ast.add_kid(t, iterable);
            let body = self.parse_block()?;
            self.ast.add_kid(t, body);
            self.expect(TokenKind::Else)?;
            let else_block = self.parse_block()?;
            self.ast.add_kid(t, else_block);
            return Ok(t);
        }

        if self.at(TokenKind::Do) {
            self.scan()?;
            let t = self.ast.new_node(NodeKind::Doloop);
            let body = self.parse_block()?;
            self.ast.add_kid(t, body);
            self.expect(TokenKind::Until)?;
            let until = self.parse_expr()?;
            self.ast.add_kid(t, until);
            return Ok(t);
        }

        if self.at(TokenKind::Return) {
            self.scan()?;
            let t = self.ast.new_node(NodeKind::Return);
            let value = self.parse_expr()?;
            self.ast.add_kid(t, value);
            return Ok(t);
        }

        if self.at(TokenKind::LeftBrace) {
            return self.parse_block();
        }

        // Assignment by default.
        let name = self.parse_name()?;
        let t = self.ast.new_node(NodeKind::Assign);
        self.ast.add_kid(t, name);
        self.expect(TokenKind::Assign)?;
        let value = self.parse_expr()?;
        self.ast.add_kid(t, value);
        Ok(t)
    }

    // E -> SE (relop SE)?
    fn parse_expr(&mut self) -> Result<NodeId, ParseError> {
        let kid = self.parse_simple_expr()?;
        match self.operator_leaf(&RELATIONAL_OPS, NodeKind::RelOp)? {
            Some(t) => {
                self.ast.add_kid(t, kid);
                let right = self.parse_simple_expr()?;
                self.ast.add_kid(t, right);
                Ok(t)
            }
            None => Ok(kid),
        }
    }

    // SE -> T (addop T)*, left associative
    fn parse_simple_expr(&mut self) -> Result<NodeId, ParseError> {
        let mut kid = self.parse_term()?;
        while let Some(t) = self.operator_leaf(&ADDING_OPS, NodeKind::AddOp)? {
            self.ast.add_kid(t, kid);
            let right = self.parse_term()?;
            self.ast.add_kid(t, right);
            kid = t;
        }
        Ok(kid)
    }

    // T -> F (multop F)*, left associative
    fn parse_term(&mut self) -> Result<NodeId, ParseError> {
        let mut kid = self.parse_factor()?;
        while let Some(t) = self.operator_leaf(&MULTIPLYING_OPS, NodeKind::MultOp)? {
            self.ast.add_kid(t, kid);
            let right = self.parse_factor()?;
            self.ast.add_kid(t, right);
            kid = t;
        }
        Ok(kid)
    }

    // F -> '(' E ')' | NAME | <int> | <number> | <date>
    //   | NAME '(' (E list ',')? ')'
    fn parse_factor(&mut self) -> Result<NodeId, ParseError> {
        if self.at(TokenKind::LeftParen) {
            self.scan()?;
            let t = self.parse_expr()?;
            self.expect(TokenKind::RightParen)?;
            return Ok(t);
        }
        if self.at(TokenKind::IntLit) {
            return self.leaf_from_current(NodeKind::Int, TokenKind::IntLit);
        }
        if self.at(TokenKind::NumberLit) {
            return self.leaf_from_current(NodeKind::Number, TokenKind::NumberLit);
        }
        if self.at(TokenKind::DateLit) {
            return self.leaf_from_current(NodeKind::Date, TokenKind::DateLit);
        }

        let name = self.parse_name()?;
        if !self.at(TokenKind::LeftParen) {
            return Ok(name);
        }
        self.scan()?;
        let t = self.ast.new_node(NodeKind::Call);
        self.ast.add_kid(t, name);
        if !self.at(TokenKind::RightParen) {
            loop {
                let argument = self.parse_expr()?;
                self.ast.add_kid(t, argument);
                if self.at(TokenKind::Comma) {
                    self.scan()?;
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightParen)?;
        Ok(t)
    }

    // LIST -> '[' (F list ',')? ']'
    fn parse_list(&mut self) -> Result<NodeId, ParseError> {
        self.expect(TokenKind::LeftBracket)?;
        let t = self.ast.new_node(NodeKind::List);
        if !self.at(TokenKind::RightBracket) {
            let factor = self.parse_factor()?;
            self.ast.add_kid(t, factor);
            while self.at(TokenKind::Comma) {
                self.scan()?;
                let factor = self.parse_factor()?;
                self.ast.add_kid(t, factor);
            }
        }
        self.expect(TokenKind::RightBracket)?;
        Ok(t)
    }

    // NAME -> <id>
    fn parse_name(&mut self) -> Result<NodeId, ParseError> {
        self.leaf_from_current(NodeKind::Id, TokenKind::Identifier)
    }

    /// If the current token matches one of `ops`, make a symbol-carrying
    /// operator node from it and scan past; otherwise leave the token alone.
    fn operator_leaf(
        &mut self,
        ops: &[TokenKind],
        kind: NodeKind,
    ) -> Result<Option<NodeId>, ParseError> {
        match &self.current {
            Some(token) if ops.contains(&token.kind()) => {
                let t = self.ast.new_leaf(kind, token.symbol.clone());
                self.scan()?;
                Ok(Some(t))
            }
            _ => Ok(None),
        }
    }

    fn leaf_from_current(
        &mut self,
        kind: NodeKind,
        expected: TokenKind,
    ) -> Result<NodeId, ParseError> {
        match &self.current {
            Some(token) if token.kind() == expected => {
                let t = self.ast.new_leaf(kind, token.symbol.clone());
                self.scan()?;
                Ok(t)
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn at(&self, kind: TokenKind) -> bool {
        matches!(&self.current, Some(token) if token.kind() == kind)
    }

    fn at_any(&self, kinds: &[TokenKind]) -> bool {
        kinds.iter().any(|&kind| self.at(kind))
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), ParseError> {
        if self.at(kind) {
            self.scan()
        } else {
            Err(self.unexpected(kind))
        }
    }

    fn scan(&mut self) -> Result<(), ParseError> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    fn unexpected(&self, expected: TokenKind) -> ParseError {
        ParseError::Syntax(SyntaxError {
            found: self.current.clone(),
            expected,
        })
    }
}

/// Parse a source file into its AST.
pub fn parse_file(path: impl AsRef<Path>) -> Result<Ast, ParseError> {
    Parser::open(path)?.parse()
}

/// Parse an in-memory source program into its AST.
pub fn parse_str(source: &str) -> Result<Ast, ParseError> {
    let reader = SourceReader::new(Cursor::new(source.to_string()));
    Parser::new(Lexer::new(reader)?)?.parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;
    use indoc::indoc;

    fn dump(source: &str) -> String {
        parse_str(source).expect("parse should succeed").dump()
    }

    fn parse_err(source: &str) -> ParseError {
        match parse_str(source) {
            Err(err) => err,
            Ok(ast) => panic!("expected failure, parsed:\n{}", ast.dump()),
        }
    }

    #[test]
    fn parses_declaration_and_assignment() {
        expect![[r#"
            Program
              Block
                Decl
                  IntType
                  Id: x
                Assign
                  Id: x
                  Int: 3
        "#]]
        .assert_eq(&dump("program { int x x = 3 }"));
    }

    #[test]
    fn parses_empty_body() {
        expect![[r#"
            Program
              Block
        "#]]
        .assert_eq(&dump("program { }"));
    }

    #[test]
    fn parses_if_with_else() {
        expect![[r#"
            Program
              Block
                Decl
                  BoolType
                  Id: y
                If
                  Id: y
                  Block
                    Return
                      Int: 1
                  Block
                    Return
                      Int: 0
        "#]]
        .assert_eq(&dump(
            "program { boolean y if y then { return 1 } else { return 0 } }",
        ));
    }

    #[test]
    fn parses_if_without_else() {
        expect![[r#"
            Program
              Block
                If
                  Id: y
                  Block
                    Assign
                      Id: x
                      Int: 1
        "#]]
        .assert_eq(&dump("program { if y then { x = 1 } }"));
    }

    #[test]
    fn parses_function_declaration() {
        expect![[r#"
            Program
              Block
                FunctionDecl
                  IntType
                  Id: f
                  Formals
                    Decl
                      IntType
                      Id: a
                    Decl
                      IntType
                      Id: b
                  Block
                    Return
                      AddOp: +
                        Id: a
                        Id: b
        "#]]
        .assert_eq(&dump("program { int f(int a, int b) { return a + b } }"));
    }

    #[test]
    fn parses_number_literal() {
        expect![[r#"
            Program
              Block
                Decl
                  NumberType
                  Id: pi
                Assign
                  Id: pi
                  Number: 3.14
        "#]]
        .assert_eq(&dump("program { number pi pi = 3.14 }"));
    }

    #[test]
    fn parses_date_literal() {
        expect![[r#"
            Program
              Block
                Decl
                  DateType
                  Id: d
                Assign
                  Id: d
                  Date: 12~31~2024
        "#]]
        .assert_eq(&dump("program { date d d = 12~31~2024 }"));
    }

    #[test]
    fn parses_doloop() {
        expect![[r#"
            Program
              Block
                Doloop
                  Block
                    Assign
                      Id: x
                      AddOp: -
                        Id: x
                        Int: 1
                  RelOp: ==
                    Id: x
                    Int: 0
        "#]]
        .assert_eq(&dump("program { do { x = x - 1 } until x == 0 }"));
    }

    #[test]
    fn parses_for_with_required_else() {
        expect![[r#"
            Program
              Block
                For
                  Id: i
                  List
                    Int: 1
                    Int: 2
                    Int: 3
                  Block
                    Assign
                      Id: x
                      Id: i
                  Block
        "#]]
        .assert_eq(&dump("program { for i in [1, 2, 3] { x = i } else { } }"));
    }

    #[test]
    fn parses_empty_list() {
        expect![[r#"
            Program
              Block
                For
                  Id: i
                  List
                  Block
                  Block
        "#]]
        .assert_eq(&dump("program { for i in [] { } else { } }"));
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        expect![[r#"
            Program
              Block
                Assign
                  Id: x
                  AddOp: +
                    Int: 1
                    MultOp: *
                      Int: 2
                      Int: 3
        "#]]
        .assert_eq(&dump("program { x = 1 + 2 * 3 }"));
    }

    #[test]
    fn parentheses_override_precedence() {
        expect![[r#"
            Program
              Block
                Assign
                  Id: x
                  MultOp: *
                    AddOp: +
                      Int: 1
                      Int: 2
                    Int: 3
        "#]]
        .assert_eq(&dump("program { x = (1 + 2) * 3 }"));
    }

    #[test]
    fn adding_operators_are_left_associative() {
        expect![[r#"
            Program
              Block
                Assign
                  Id: x
                  AddOp: -
                    AddOp: -
                      Id: a
                      Id: b
                    Id: c
        "#]]
        .assert_eq(&dump("program { x = a - b - c }"));
    }

    #[test]
    fn parses_call_with_arguments() {
        expect![[r#"
            Program
              Block
                Assign
                  Id: x
                  Call
                    Id: f
                    Id: a
                    AddOp: +
                      Id: b
                      Int: 1
        "#]]
        .assert_eq(&dump("program { x = f(a, b + 1) }"));
    }

    #[test]
    fn parses_call_without_arguments() {
        expect![[r#"
            Program
              Block
                Assign
                  Id: x
                  Call
                    Id: f
        "#]]
        .assert_eq(&dump("program { x = f() }"));
    }

    #[test]
    fn parses_nested_blocks() {
        expect![[r#"
            Program
              Block
                Block
                  Block
        "#]]
        .assert_eq(&dump("program { { { } } }"));
    }

    #[test]
    fn boolean_operators_parse_as_add_and_mult() {
        expect![[r#"
            Program
              Block
                Assign
                  Id: x
                  AddOp: |
                    Id: a
                    MultOp: &
                      Id: b
                      Id: c
        "#]]
        .assert_eq(&dump("program { x = a | b & c }"));
    }

    #[test]
    fn relation_is_not_associative() {
        // A second relational operator is left for the block to reject.
        let err = parse_err("program { x = a < b < c }");
        let message = err.to_string();
        assert!(message.contains("Expected: RightBrace"), "{message}");
    }

    #[test]
    fn stray_else_is_a_syntax_error() {
        let err = parse_err("program { else }");
        match err {
            ParseError::Syntax(syntax) => {
                assert_eq!(syntax.expected, TokenKind::Identifier);
                assert_eq!(
                    syntax.found.map(|token| token.lexeme().to_string()),
                    Some("else".to_string())
                );
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn for_without_else_is_a_syntax_error() {
        let err = parse_err("program { for i in [1] { } }");
        let message = err.to_string();
        assert!(message.contains("Expected: Else"), "{message}");
    }

    #[test]
    fn missing_program_keyword_is_reported() {
        let err = parse_err("{ }");
        let message = err.to_string();
        assert!(message.contains("Expected: Program"), "{message}");
    }

    #[test]
    fn empty_input_is_reported_at_end_of_input() {
        let err = parse_err("");
        match err {
            ParseError::Syntax(syntax) => {
                assert!(syntax.found.is_none());
                assert_eq!(syntax.expected, TokenKind::Program);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn declaration_without_name_is_reported() {
        let err = parse_err("program { int }");
        let message = err.to_string();
        assert!(message.contains("Expected: Identifier"), "{message}");
    }

    #[test]
    fn formal_without_type_reports_boolean() {
        // The type routine's fallback arm expects 'boolean'.
        let err = parse_err("program { int f(x) { } }");
        let message = err.to_string();
        assert!(message.contains("Expected: Boolean"), "{message}");
    }

    #[test]
    fn lexer_failures_pass_through() {
        let err = parse_err("program { date d d = 13~01~2024 }");
        assert!(matches!(err, ParseError::Lex(LexError::MalformedDate { .. })), "{err}");
    }

    #[test]
    fn declarations_must_precede_statements() {
        // Once statements begin, a later declaration keyword ends the
        // declaration loop for good: 'int' cannot start a statement.
        let err = parse_err(indoc! {"
            program {
                int x
                x = 1
                int y
            }
        "});
        let message = err.to_string();
        assert!(message.contains("Expected: RightBrace"), "{message}");
    }
}
