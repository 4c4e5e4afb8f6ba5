use crate::{
    ast::{BinaryOp, Expr, ExprKind, Literal, Program, Stmt, StmtKind, UnaryOp},
    diagnostics::{Diagnostic, SourceSpan},
    lexer::{Keyword, Lexer, Token, TokenKind},
};

/// Result of compiling source that may still be mid-entry, as an
/// interactive console sees it line by line.
#[derive(Debug)]
pub enum ParseOutcome {
    /// The text is a complete, valid program.
    Complete(Program),
    /// The text is valid so far but ends inside an unfinished construct;
    /// the caller should gather more input.
    Pending,
    /// The text is malformed in a way more input cannot repair.
    Invalid(Diagnostic),
}

/// Compile a whole program. Atomic: any syntax error anywhere yields `Err`
/// and nothing is executable. Truncated input is an ordinary error here.
pub fn compile(source: &str) -> Result<Program, Diagnostic> {
    let tokens = Lexer::new(source)
        .tokenize()
        .map_err(|err| err.diagnostic)?;
    Parser::new(tokens)
        .parse_program()
        .map_err(|failure| failure.diagnostic)
}

/// Compile source for the incremental path, distinguishing "needs more
/// input" from "genuinely malformed". The whole boundary between those two
/// outcomes lives here: a failure whose offending position is the end of
/// the input is treated as pending, everything else as invalid.
pub fn compile_interactive(source: &str) -> ParseOutcome {
    let tokens = match Lexer::new(source).tokenize() {
        Ok(tokens) => tokens,
        Err(err) if err.truncated => return ParseOutcome::Pending,
        Err(err) => return ParseOutcome::Invalid(err.diagnostic),
    };
    match Parser::new(tokens).parse_program() {
        Ok(program) => ParseOutcome::Complete(program),
        Err(failure) if failure.at_eof => ParseOutcome::Pending,
        Err(failure) => ParseOutcome::Invalid(failure.diagnostic),
    }
}

struct SyntaxFailure {
    diagnostic: Diagnostic,
    at_eof: bool,
}

type ParseResult<T> = Result<T, SyntaxFailure>;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn parse_program(&mut self) -> ParseResult<Program> {
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::Eof) {
            stmts.push(self.parse_statement()?);
        }
        Ok(Program { stmts })
    }

    // ---- statements ----

    fn parse_statement(&mut self) -> ParseResult<Stmt> {
        match self.peek().kind.clone() {
            // `fn name(...)` declares; a bare `fn (...)` is an expression.
            TokenKind::Keyword(Keyword::Fn)
                if self.peek_ahead(1).kind == TokenKind::Identifier =>
            {
                self.parse_function_decl()
            }
            TokenKind::Keyword(Keyword::If) => self.parse_if(),
            TokenKind::Keyword(Keyword::While) => self.parse_while(),
            TokenKind::Keyword(Keyword::For) => self.parse_for(),
            TokenKind::Keyword(Keyword::Return) => self.parse_return(),
            TokenKind::Keyword(Keyword::Break) => {
                let token = self.advance();
                self.matches(&TokenKind::Semicolon);
                Ok(Stmt {
                    kind: StmtKind::Break,
                    span: token.span,
                })
            }
            TokenKind::Keyword(Keyword::Continue) => {
                let token = self.advance();
                self.matches(&TokenKind::Semicolon);
                Ok(Stmt {
                    kind: StmtKind::Continue,
                    span: token.span,
                })
            }
            _ => {
                let expr = self.parse_expr()?;
                self.matches(&TokenKind::Semicolon);
                let span = expr.span;
                Ok(Stmt {
                    kind: StmtKind::Expr(expr),
                    span,
                })
            }
        }
    }

    fn parse_function_decl(&mut self) -> ParseResult<Stmt> {
        let fn_token = self.advance();
        let name = self
            .consume(&TokenKind::Identifier, "expected function name")?
            .lexeme;
        let params = self.parse_params()?;
        let body = self.parse_block()?;
        Ok(Stmt {
            kind: StmtKind::Function { name, params, body },
            span: SourceSpan::new(fn_token.span.start, self.prev_end()),
        })
    }

    fn parse_params(&mut self) -> ParseResult<Vec<String>> {
        self.consume(&TokenKind::LParen, "expected `(` before parameters")?;
        let mut params = Vec::new();
        while !self.check(&TokenKind::RParen) {
            let param = self.consume(&TokenKind::Identifier, "expected parameter name")?;
            params.push(param.lexeme);
            if !self.matches(&TokenKind::Comma) {
                break;
            }
        }
        self.consume(&TokenKind::RParen, "expected `)` after parameters")?;
        Ok(params)
    }

    fn parse_if(&mut self) -> ParseResult<Stmt> {
        let if_token = self.advance();
        let condition = self.parse_expr()?;
        let then_branch = self.parse_block()?;
        let else_branch = if self.matches_keyword(Keyword::Else) {
            if self.check(&TokenKind::Keyword(Keyword::If)) {
                Some(vec![self.parse_if()?])
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };
        Ok(Stmt {
            kind: StmtKind::If {
                condition,
                then_branch,
                else_branch,
            },
            span: SourceSpan::new(if_token.span.start, self.prev_end()),
        })
    }

    fn parse_while(&mut self) -> ParseResult<Stmt> {
        let while_token = self.advance();
        let condition = self.parse_expr()?;
        let body = self.parse_block()?;
        Ok(Stmt {
            kind: StmtKind::While { condition, body },
            span: SourceSpan::new(while_token.span.start, self.prev_end()),
        })
    }

    fn parse_for(&mut self) -> ParseResult<Stmt> {
        let for_token = self.advance();
        let binding = self
            .consume(&TokenKind::Identifier, "expected loop variable after `for`")?
            .lexeme;
        self.consume_keyword(Keyword::In, "expected `in` after loop variable")?;
        let iterable = self.parse_expr()?;
        let body = self.parse_block()?;
        Ok(Stmt {
            kind: StmtKind::For {
                binding,
                iterable,
                body,
            },
            span: SourceSpan::new(for_token.span.start, self.prev_end()),
        })
    }

    fn parse_return(&mut self) -> ParseResult<Stmt> {
        let return_token = self.advance();
        let value = match self.peek().kind.clone() {
            TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof => None,
            _ => Some(self.parse_expr()?),
        };
        self.matches(&TokenKind::Semicolon);
        Ok(Stmt {
            kind: StmtKind::Return(value),
            span: SourceSpan::new(return_token.span.start, self.prev_end()),
        })
    }

    fn parse_block(&mut self) -> ParseResult<Vec<Stmt>> {
        self.consume(&TokenKind::LBrace, "expected `{` to start block")?;
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.check(&TokenKind::Eof) {
            stmts.push(self.parse_statement()?);
        }
        self.consume(&TokenKind::RBrace, "expected `}` to close block")?;
        Ok(stmts)
    }

    // ---- expressions, lowest precedence first ----

    fn parse_expr(&mut self) -> ParseResult<Expr> {
        self.parse_assign()
    }

    fn parse_assign(&mut self) -> ParseResult<Expr> {
        let target = self.parse_or()?;
        if !self.matches(&TokenKind::Assign) {
            return Ok(target);
        }
        let value = self.parse_assign()?;
        match target.kind {
            ExprKind::Variable(_) | ExprKind::Field { .. } | ExprKind::Index { .. } => {
                let span = SourceSpan::new(target.span.start, value.span.end);
                Ok(Expr {
                    kind: ExprKind::Assign {
                        target: Box::new(target),
                        value: Box::new(value),
                    },
                    span,
                })
            }
            _ => Err(SyntaxFailure {
                diagnostic: Diagnostic::parser("invalid assignment target")
                    .with_span(target.span),
                at_eof: false,
            }),
        }
    }

    fn parse_or(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_and()?;
        while self.matches(&TokenKind::OrOr) {
            let right = self.parse_and()?;
            left = binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_equality()?;
        while self.matches(&TokenKind::AndAnd) {
            let right = self.parse_equality()?;
            left = binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = if self.matches(&TokenKind::EqualEqual) {
                BinaryOp::Equal
            } else if self.matches(&TokenKind::BangEqual) {
                BinaryOp::NotEqual
            } else {
                return Ok(left);
            };
            let right = self.parse_comparison()?;
            left = binary(op, left, right);
        }
    }

    fn parse_comparison(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_term()?;
        loop {
            let op = if self.matches(&TokenKind::Less) {
                BinaryOp::Less
            } else if self.matches(&TokenKind::LessEqual) {
                BinaryOp::LessEqual
            } else if self.matches(&TokenKind::Greater) {
                BinaryOp::Greater
            } else if self.matches(&TokenKind::GreaterEqual) {
                BinaryOp::GreaterEqual
            } else {
                return Ok(left);
            };
            let right = self.parse_term()?;
            left = binary(op, left, right);
        }
    }

    fn parse_term(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_factor()?;
        loop {
            let op = if self.matches(&TokenKind::Plus) {
                BinaryOp::Add
            } else if self.matches(&TokenKind::Minus) {
                BinaryOp::Sub
            } else {
                return Ok(left);
            };
            let right = self.parse_factor()?;
            left = binary(op, left, right);
        }
    }

    fn parse_factor(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = if self.matches(&TokenKind::Star) {
                BinaryOp::Mul
            } else if self.matches(&TokenKind::Slash) {
                BinaryOp::Div
            } else if self.matches(&TokenKind::Percent) {
                BinaryOp::Mod
            } else {
                return Ok(left);
            };
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let op = if self.check(&TokenKind::Minus) {
            Some(UnaryOp::Negate)
        } else if self.check(&TokenKind::Bang) {
            Some(UnaryOp::Not)
        } else {
            None
        };
        let Some(op) = op else {
            return self.parse_postfix();
        };
        let op_token = self.advance();
        let operand = self.parse_unary()?;
        let span = SourceSpan::new(op_token.span.start, operand.span.end);
        Ok(Expr {
            kind: ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        })
    }

    fn parse_postfix(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.matches(&TokenKind::LParen) {
                let mut args = Vec::new();
                while !self.check(&TokenKind::RParen) {
                    args.push(self.parse_expr()?);
                    if !self.matches(&TokenKind::Comma) {
                        break;
                    }
                }
                self.consume(&TokenKind::RParen, "expected `)` after arguments")?;
                let span = SourceSpan::new(expr.span.start, self.prev_end());
                expr = Expr {
                    kind: ExprKind::Call {
                        callee: Box::new(expr),
                        args,
                    },
                    span,
                };
            } else if self.matches(&TokenKind::Dot) {
                let field = self.consume(&TokenKind::Identifier, "expected field name after `.`")?;
                let span = SourceSpan::new(expr.span.start, field.span.end);
                expr = Expr {
                    kind: ExprKind::Field {
                        target: Box::new(expr),
                        field: field.lexeme,
                    },
                    span,
                };
            } else if self.matches(&TokenKind::LBracket) {
                let index = self.parse_expr()?;
                self.consume(&TokenKind::RBracket, "expected `]` after index")?;
                let span = SourceSpan::new(expr.span.start, self.prev_end());
                expr = Expr {
                    kind: ExprKind::Index {
                        target: Box::new(expr),
                        index: Box::new(index),
                    },
                    span,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Int => {
                self.advance();
                let digits = token.lexeme.replace('_', "");
                let value = digits.parse::<i64>().map_err(|_| SyntaxFailure {
                    diagnostic: Diagnostic::parser(format!(
                        "integer literal `{}` out of range",
                        token.lexeme
                    ))
                    .with_span(token.span),
                    at_eof: false,
                })?;
                Ok(literal(Literal::Int(value), token.span))
            }
            TokenKind::Float => {
                self.advance();
                let digits = token.lexeme.replace('_', "");
                let value = digits.parse::<f64>().map_err(|_| SyntaxFailure {
                    diagnostic: Diagnostic::parser(format!(
                        "malformed float literal `{}`",
                        token.lexeme
                    ))
                    .with_span(token.span),
                    at_eof: false,
                })?;
                Ok(literal(Literal::Float(value), token.span))
            }
            TokenKind::Str => {
                self.advance();
                Ok(literal(Literal::Str(token.lexeme), token.span))
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                Ok(literal(Literal::Bool(true), token.span))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Ok(literal(Literal::Bool(false), token.span))
            }
            TokenKind::Keyword(Keyword::Nil) => {
                self.advance();
                Ok(literal(Literal::Nil, token.span))
            }
            TokenKind::Identifier => {
                self.advance();
                Ok(Expr {
                    kind: ExprKind::Variable(token.lexeme),
                    span: token.span,
                })
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.consume(&TokenKind::RParen, "expected `)` after expression")?;
                Ok(inner)
            }
            TokenKind::LBracket => self.parse_array(),
            TokenKind::LBrace => self.parse_map(),
            TokenKind::Keyword(Keyword::Fn) => self.parse_function_expr(),
            _ => Err(self.error(&token, "expected expression")),
        }
    }

    fn parse_array(&mut self) -> ParseResult<Expr> {
        let open = self.advance();
        let mut elements = Vec::new();
        while !self.check(&TokenKind::RBracket) {
            elements.push(self.parse_expr()?);
            if !self.matches(&TokenKind::Comma) {
                break;
            }
        }
        self.consume(&TokenKind::RBracket, "expected `]` after array elements")?;
        Ok(Expr {
            kind: ExprKind::Array(elements),
            span: SourceSpan::new(open.span.start, self.prev_end()),
        })
    }

    fn parse_map(&mut self) -> ParseResult<Expr> {
        let open = self.advance();
        let mut entries = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            let key_token = self.peek().clone();
            let key = match key_token.kind {
                TokenKind::Identifier | TokenKind::Str => {
                    self.advance();
                    key_token.lexeme
                }
                _ => return Err(self.error(&key_token, "expected map key")),
            };
            self.consume(&TokenKind::Colon, "expected `:` after map key")?;
            let value = self.parse_expr()?;
            entries.push((key, value));
            if !self.matches(&TokenKind::Comma) {
                break;
            }
        }
        self.consume(&TokenKind::RBrace, "expected `}` after map entries")?;
        Ok(Expr {
            kind: ExprKind::Map(entries),
            span: SourceSpan::new(open.span.start, self.prev_end()),
        })
    }

    fn parse_function_expr(&mut self) -> ParseResult<Expr> {
        let fn_token = self.advance();
        let params = self.parse_params()?;
        let body = self.parse_block()?;
        Ok(Expr {
            kind: ExprKind::Function { params, body },
            span: SourceSpan::new(fn_token.span.start, self.prev_end()),
        })
    }

    // ---- cursor helpers ----

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_ahead(&self, offset: usize) -> &Token {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    fn prev_end(&self) -> usize {
        self.tokens[self.pos.saturating_sub(1)].span.end
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn matches(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn matches_keyword(&mut self, keyword: Keyword) -> bool {
        self.matches(&TokenKind::Keyword(keyword))
    }

    fn consume(&mut self, kind: &TokenKind, message: &str) -> ParseResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            let token = self.peek().clone();
            Err(self.error(&token, message))
        }
    }

    fn consume_keyword(&mut self, keyword: Keyword, message: &str) -> ParseResult<Token> {
        self.consume(&TokenKind::Keyword(keyword), message)
    }

    fn error(&self, token: &Token, message: &str) -> SyntaxFailure {
        let at_eof = token.kind == TokenKind::Eof;
        let detail = if at_eof {
            format!("{message}, found end of input")
        } else {
            format!("{message}, found `{}`", token.lexeme)
        };
        SyntaxFailure {
            diagnostic: Diagnostic::parser(detail).with_span(token.span),
            at_eof,
        }
    }
}

fn literal(value: Literal, span: SourceSpan) -> Expr {
    Expr {
        kind: ExprKind::Literal(value),
        span,
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    let span = SourceSpan::new(left.span.start, right.span.end);
    Expr {
        kind: ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        span,
    }
}
