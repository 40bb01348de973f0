//! A minimal recursive-descent parser from [`xvr_lex::Token`] to
//! [`xvr_compiler::ast::Node`].
//!
//! Like `xvr-lex`, this crate is a thin stand-in for an external
//! collaborator — the compiler/VM core only cares that *some* AST
//! reaches it, not how it was produced. Grammar:
//!
//! ```text
//! program    := statement* EOF
//! statement  := block | varDecl | ifStmt | whileStmt | "break" ";"
//!             | "continue" ";" | "print" expr ";" | assertStmt
//!             | assignOrExprStmt
//! block      := "{" statement* "}"
//! varDecl    := ("var"|"const") TYPE IDENT "=" expr ";"
//! ifStmt     := "if" "(" expr ")" statement ("else" statement)?
//! whileStmt  := "while" "(" expr ")" statement
//! assertStmt := "assert" expr ("," expr)? ";"
//! expr       := or
//! or         := and ("||" and)*
//! and        := equality ("&&" equality)*
//! equality   := relational (("=="|"!=") relational)*
//! relational := concat (("<"|"<="|">"|">=") concat)*
//! concat     := additive (".." additive)*
//! additive   := multiplicative (("+"|"-") multiplicative)*
//! multiplicative := unary (("*"|"/"|"%") unary)*
//! unary      := ("!"|"-"|"++"|"--") unary | postfix
//! postfix    := primary (("++"|"--") | "[" expr (":" expr)? "]")*
//! primary    := INT | FLOAT | STRING | "true" | "false" | "null" | IDENT
//!             | "(" expr ")" | "[" (expr ("," expr)*)? "]"
//!             | "{" (expr ":" expr ("," expr ":" expr)*)? "}"
//! ```

use std::fmt;

use xvr_compiler::ast::{AssignOp, BinaryOp, CompareOp, CompoundKind, Literal, Node};
use xvr_core::{Bucket, ValueType};
use xvr_lex::Token;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseError {}

fn error(message: impl Into<String>) -> ParseError {
    ParseError { message: message.into() }
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    bucket: &'a Bucket,
    remove_assert: bool,
}

/// Parse a full program into a single top-level block.
pub fn parse<'a>(tokens: Vec<Token>, bucket: &'a Bucket, remove_assert: bool) -> Result<&'a Node<'a>, ParseError> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        bucket,
        remove_assert,
    };
    let mut statements = Vec::new();
    while !parser.check(&Token::Eof) {
        statements.push(parser.statement()?);
    }
    Ok(bucket.alloc(Node::Block {
        statements,
        inner_scope: false,
    }))
}

fn assign_op_for(token: &Token) -> Option<AssignOp> {
    match token {
        Token::Equal => Some(AssignOp::Assign),
        Token::PlusEqual => Some(AssignOp::AddAssign),
        Token::MinusEqual => Some(AssignOp::SubtractAssign),
        Token::StarEqual => Some(AssignOp::MultiplyAssign),
        Token::SlashEqual => Some(AssignOp::DivideAssign),
        Token::PercentEqual => Some(AssignOp::ModuloAssign),
        Token::DotDotEqual => Some(AssignOp::ConcatAssign),
        _ => None,
    }
}

fn type_name_to_value_type(name: &str) -> Option<ValueType> {
    match name {
        "int" => Some(ValueType::Integer),
        "float" => Some(ValueType::Float),
        "string" => Some(ValueType::String),
        "bool" => Some(ValueType::Boolean),
        "array" => Some(ValueType::Array),
        "table" => Some(ValueType::Table),
        "any" => Some(ValueType::Any),
        _ => None,
    }
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens.get(self.pos).cloned().unwrap_or(Token::Eof);
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, token: &Token) -> bool {
        self.peek() == token
    }

    fn match_token(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> Result<(), ParseError> {
        if self.match_token(&token) {
            Ok(())
        } else {
            Err(error(format!("expected {token}, found {}", self.peek())))
        }
    }

    // -- statements --------------------------------------------------------

    fn statement(&mut self) -> Result<&'a Node<'a>, ParseError> {
        match self.peek() {
            Token::LBrace => self.block(),
            Token::Var | Token::Const => self.var_decl(),
            Token::If => self.if_stmt(),
            Token::While => self.while_stmt(),
            Token::Break => {
                self.advance();
                self.expect(Token::Semicolon)?;
                Ok(self.bucket.alloc(Node::Break))
            }
            Token::Continue => {
                self.advance();
                self.expect(Token::Semicolon)?;
                Ok(self.bucket.alloc(Node::Continue))
            }
            Token::Print => {
                self.advance();
                let expr = self.expr()?;
                self.expect(Token::Semicolon)?;
                Ok(self.bucket.alloc(Node::Print(expr)))
            }
            Token::Assert => self.assert_stmt(),
            _ => self.assign_or_expr_stmt(),
        }
    }

    fn block(&mut self) -> Result<&'a Node<'a>, ParseError> {
        self.expect(Token::LBrace)?;
        let mut statements = Vec::new();
        while !self.check(&Token::RBrace) && !self.check(&Token::Eof) {
            statements.push(self.statement()?);
        }
        self.expect(Token::RBrace)?;
        Ok(self.bucket.alloc(Node::Block {
            statements,
            inner_scope: true,
        }))
    }

    fn var_decl(&mut self) -> Result<&'a Node<'a>, ParseError> {
        let constant = match self.advance() {
            Token::Var => false,
            Token::Const => true,
            other => return Err(error(format!("expected `var`/`const`, found {other}"))),
        };
        let declared_type = match self.advance() {
            Token::TypeName(t) => type_name_to_value_type(&t).ok_or_else(|| error(format!("unknown type `{t}`")))?,
            other => return Err(error(format!("expected a type name, found {other}"))),
        };
        let name = match self.advance() {
            Token::Identifier(name) => name,
            other => return Err(error(format!("expected an identifier, found {other}"))),
        };
        self.expect(Token::Equal)?;
        let initializer = self.expr()?;
        self.expect(Token::Semicolon)?;
        Ok(self.bucket.alloc(Node::VarDeclare {
            name: self.bucket.alloc_str(&name),
            declared_type,
            constant,
            initializer,
        }))
    }

    fn if_stmt(&mut self) -> Result<&'a Node<'a>, ParseError> {
        self.expect(Token::If)?;
        self.expect(Token::LParen)?;
        let condition = self.expr()?;
        self.expect(Token::RParen)?;
        let then_branch = self.statement()?;
        let else_branch = if self.match_token(&Token::Else) {
            Some(self.statement()?)
        } else {
            None
        };
        Ok(self.bucket.alloc(Node::If {
            condition,
            then_branch,
            else_branch,
        }))
    }

    fn while_stmt(&mut self) -> Result<&'a Node<'a>, ParseError> {
        self.expect(Token::While)?;
        self.expect(Token::LParen)?;
        let condition = self.expr()?;
        self.expect(Token::RParen)?;
        let body = self.statement()?;
        Ok(self.bucket.alloc(Node::While { condition, body }))
    }

    fn assert_stmt(&mut self) -> Result<&'a Node<'a>, ParseError> {
        self.expect(Token::Assert)?;
        let condition = self.expr()?;
        let message = if self.match_token(&Token::Comma) {
            Some(self.expr()?)
        } else {
            None
        };
        self.expect(Token::Semicolon)?;
        if self.remove_assert {
            Ok(self.bucket.alloc(Node::Pass))
        } else {
            Ok(self.bucket.alloc(Node::Assert { condition, message }))
        }
    }

    /// Parses a full expression, then checks whether an assignment operator
    /// follows — `=`/`+=`/etc. never appear inside `expr`'s own grammar, so
    /// `expr()` always stops right before one. The already-parsed node is
    /// then reinterpreted as an lvalue: a bare name, or an index expression
    /// with no slice length (`a[i] = v`, never `a[i:n] = v`). Anything else
    /// followed by an assignment operator is a malformed assignment target.
    fn assign_or_expr_stmt(&mut self) -> Result<&'a Node<'a>, ParseError> {
        let expr = self.expr()?;
        if let Some(op) = assign_op_for(self.peek()) {
            self.advance();
            let value = self.expr()?;
            self.expect(Token::Semicolon)?;
            let assign_node = match *expr {
                Node::VarAccess { name } => Node::VarAssign { name, op, value },
                Node::Index { value: target, index, length: None } => {
                    Node::IndexAssign { target, index, op, value }
                }
                _ => Node::Error,
            };
            return Ok(self.bucket.alloc(assign_node));
        }
        self.expect(Token::Semicolon)?;
        Ok(expr)
    }

    // -- expressions, by precedence ------------------------------------

    fn expr(&mut self) -> Result<&'a Node<'a>, ParseError> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> Result<&'a Node<'a>, ParseError> {
        let mut left = self.and_expr()?;
        while self.match_token(&Token::PipePipe) {
            let right = self.and_expr()?;
            left = self.bucket.alloc(Node::Binary {
                op: BinaryOp::Or,
                left,
                right,
            });
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<&'a Node<'a>, ParseError> {
        let mut left = self.equality()?;
        while self.match_token(&Token::AmpAmp) {
            let right = self.equality()?;
            left = self.bucket.alloc(Node::Binary {
                op: BinaryOp::And,
                left,
                right,
            });
        }
        Ok(left)
    }

    fn equality(&mut self) -> Result<&'a Node<'a>, ParseError> {
        let mut left = self.relational()?;
        loop {
            let op = match self.peek() {
                Token::EqualEqual => CompareOp::Equal,
                Token::BangEqual => CompareOp::NotEqual,
                _ => break,
            };
            self.advance();
            let right = self.relational()?;
            left = self.bucket.alloc(Node::Compare { op, left, right });
        }
        Ok(left)
    }

    fn relational(&mut self) -> Result<&'a Node<'a>, ParseError> {
        let mut left = self.concat()?;
        loop {
            let op = match self.peek() {
                Token::Less => CompareOp::Less,
                Token::LessEqual => CompareOp::LessEqual,
                Token::Greater => CompareOp::Greater,
                Token::GreaterEqual => CompareOp::GreaterEqual,
                _ => break,
            };
            self.advance();
            let right = self.concat()?;
            left = self.bucket.alloc(Node::Compare { op, left, right });
        }
        Ok(left)
    }

    fn concat(&mut self) -> Result<&'a Node<'a>, ParseError> {
        let mut left = self.additive()?;
        while self.match_token(&Token::DotDot) {
            let right = self.additive()?;
            left = self.bucket.alloc(Node::Binary {
                op: BinaryOp::Concat,
                left,
                right,
            });
        }
        Ok(left)
    }

    fn additive(&mut self) -> Result<&'a Node<'a>, ParseError> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.multiplicative()?;
            left = self.bucket.alloc(Node::Binary { op, left, right });
        }
        Ok(left)
    }

    fn multiplicative(&mut self) -> Result<&'a Node<'a>, ParseError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinaryOp::Multiply,
                Token::Slash => BinaryOp::Divide,
                Token::Percent => BinaryOp::Modulo,
                _ => break,
            };
            self.advance();
            let right = self.unary()?;
            left = self.bucket.alloc(Node::Binary { op, left, right });
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<&'a Node<'a>, ParseError> {
        use xvr_compiler::ast::UnaryOp;
        match self.peek() {
            Token::Bang => {
                self.advance();
                let expr = self.unary()?;
                Ok(self.bucket.alloc(Node::Unary { op: UnaryOp::Not, expr }))
            }
            Token::Minus => {
                self.advance();
                let expr = self.unary()?;
                Ok(self.bucket.alloc(Node::Unary {
                    op: UnaryOp::Negate,
                    expr,
                }))
            }
            Token::PlusPlus => {
                self.advance();
                let expr = self.unary()?;
                Ok(self.bucket.alloc(Node::Unary {
                    op: UnaryOp::PrefixIncrement,
                    expr,
                }))
            }
            Token::MinusMinus => {
                self.advance();
                let expr = self.unary()?;
                Ok(self.bucket.alloc(Node::Unary {
                    op: UnaryOp::PrefixDecrement,
                    expr,
                }))
            }
            _ => self.postfix(),
        }
    }

    fn postfix(&mut self) -> Result<&'a Node<'a>, ParseError> {
        use xvr_compiler::ast::UnaryOp;
        let mut expr = self.primary()?;
        loop {
            match self.peek() {
                Token::PlusPlus => {
                    self.advance();
                    expr = self.bucket.alloc(Node::Unary {
                        op: UnaryOp::PostfixIncrement,
                        expr,
                    });
                }
                Token::MinusMinus => {
                    self.advance();
                    expr = self.bucket.alloc(Node::Unary {
                        op: UnaryOp::PostfixDecrement,
                        expr,
                    });
                }
                Token::LBracket => {
                    self.advance();
                    let index = self.expr()?;
                    let length = if self.match_token(&Token::Colon) { Some(self.expr()?) } else { None };
                    self.expect(Token::RBracket)?;
                    expr = self.bucket.alloc(Node::Index {
                        value: expr,
                        index,
                        length,
                    });
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<&'a Node<'a>, ParseError> {
        match self.advance() {
            Token::Integer(i) => Ok(self.bucket.alloc(Node::Literal(Literal::Integer(i)))),
            Token::Float(f) => Ok(self.bucket.alloc(Node::Literal(Literal::Float(f)))),
            Token::String(s) => Ok(self.bucket.alloc(Node::Literal(Literal::String(s)))),
            Token::True => Ok(self.bucket.alloc(Node::Literal(Literal::Boolean(true)))),
            Token::False => Ok(self.bucket.alloc(Node::Literal(Literal::Boolean(false)))),
            Token::Null => Ok(self.bucket.alloc(Node::Literal(Literal::Null))),
            Token::Identifier(name) => Ok(self.bucket.alloc(Node::VarAccess {
                name: self.bucket.alloc_str(&name),
            })),
            Token::LParen => {
                let inner = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(self.bucket.alloc(Node::Group(inner)))
            }
            Token::LBracket => {
                let mut elements = Vec::new();
                if !self.check(&Token::RBracket) {
                    loop {
                        elements.push(self.expr()?);
                        if !self.match_token(&Token::Comma) {
                            break;
                        }
                    }
                }
                self.expect(Token::RBracket)?;
                Ok(self.bucket.alloc(Node::Compound {
                    kind: CompoundKind::Array,
                    elements,
                }))
            }
            Token::LBrace => {
                let mut elements = Vec::new();
                if !self.check(&Token::RBrace) {
                    loop {
                        let key = self.expr()?;
                        self.expect(Token::Colon)?;
                        let value = self.expr()?;
                        elements.push(self.bucket.alloc(Node::Pair { key, value }));
                        if !self.match_token(&Token::Comma) {
                            break;
                        }
                    }
                }
                self.expect(Token::RBrace)?;
                Ok(self.bucket.alloc(Node::Compound {
                    kind: CompoundKind::Table,
                    elements,
                }))
            }
            other => Err(error(format!("unexpected token {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xvr_compiler::ast::{BinaryOp as B, Node as N};
    use xvr_lex::tokenize;

    fn parse_src(src: &str) -> String {
        let bucket = Bucket::new(1 << 16);
        let tokens = tokenize(src).unwrap();
        let ast = parse(tokens, &bucket, false).unwrap();
        format!("{ast:?}")
    }

    #[test]
    fn arithmetic_precedence_nests_multiplication_inside_addition() {
        let bucket = Bucket::new(1 << 16);
        let tokens = tokenize("1 + 2 * 3;").unwrap();
        let ast = parse(tokens, &bucket, false).unwrap();
        let N::Block { statements, .. } = ast else { panic!() };
        let N::Binary { op: B::Add, left, right } = statements[0] else {
            panic!("expected a top-level addition");
        };
        assert!(matches!(left, N::Literal(_)));
        assert!(matches!(right, N::Binary { op: B::Multiply, .. }));
    }

    #[test]
    fn var_decl_with_compound_assign_round_trips() {
        let out = parse_src("var int x = 5; x += 3; print x;");
        assert!(out.contains("VarDeclare"));
        assert!(out.contains("AddAssign"));
    }

    #[test]
    fn assert_is_suppressed_when_remove_assert_is_set() {
        let bucket = Bucket::new(1 << 16);
        let tokens = tokenize("assert false, \"nope\";").unwrap();
        let ast = parse(tokens, &bucket, true).unwrap();
        let N::Block { statements, .. } = ast else { panic!() };
        assert!(matches!(statements[0], N::Pass));
    }

    #[test]
    fn slice_and_array_literal_parse() {
        let out = parse_src("var array xs = [1, 2, 3]; xs[0:2];");
        assert!(out.contains("Compound"));
        assert!(out.contains("Index"));
    }

    #[test]
    fn index_assignment_targets_the_indexed_collection() {
        let bucket = Bucket::new(1 << 16);
        let tokens = tokenize("a[1] = 99;").unwrap();
        let ast = parse(tokens, &bucket, false).unwrap();
        let N::Block { statements, .. } = ast else { panic!() };
        assert!(matches!(statements[0], N::IndexAssign { op: AssignOp::Assign, .. }));
    }

    #[test]
    fn compound_index_assignment_parses() {
        let out = parse_src("a[1] += 2;");
        assert!(out.contains("IndexAssign"));
        assert!(out.contains("AddAssign"));
    }

    #[test]
    fn assigning_a_binary_expression_is_a_malformed_target() {
        let bucket = Bucket::new(1 << 16);
        let tokens = tokenize("1 + 2 = 3;").unwrap();
        let ast = parse(tokens, &bucket, false).unwrap();
        let N::Block { statements, .. } = ast else { panic!() };
        assert!(matches!(statements[0], N::Error));
    }
}
