//! Parser that consumes the lexer and builds a `Chunk`.
//!
//! Besides the tree itself the parser records every directive, literal
//! and trailing comment it meets, so the resource loader and the
//! dependency graph never have to walk the tree again.

use super::ast::*;
use super::lexer::{SpannedToken, Token, lex};
use crate::error::BuildError;

/// Parse one file. Errors carry `filename` and the offending range.
pub fn parse(src: &str, filename: &str) -> Result<Chunk, BuildError> {
    let tokens = lex(src).map_err(|e| e.in_target(filename))?;
    let mut parser = Parser::new(tokens, filename);
    parser.parse_chunk().map_err(|e| e.in_target(filename))
}

static EOF_TOKEN: Token = Token::Eof;

fn compound_op(token: &Token) -> Option<BinaryOp> {
    let op = match token {
        Token::PlusAssign => BinaryOp::Add,
        Token::MinusAssign => BinaryOp::Sub,
        Token::StarAssign => BinaryOp::Mul,
        Token::SlashAssign => BinaryOp::Div,
        Token::PercentAssign => BinaryOp::Mod,
        Token::CaretAssign => BinaryOp::Pow,
        _ => return None,
    };
    Some(op)
}

fn is_directive(token: &Token, names: &[&str]) -> bool {
    matches!(token, Token::Directive(d) if names.contains(&d.as_str()))
}

struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
    filename: String,
    imports: Vec<Directive>,
    includes: Vec<Directive>,
    native_imports: Vec<Directive>,
    injects: Vec<Directive>,
    literals: Vec<Literal>,
    comments: Vec<Comment>,
    /// Line the previous statement ended on; a comment there trails it.
    last_line: usize,
}

impl Parser {
    fn new(tokens: Vec<SpannedToken>, filename: &str) -> Self {
        Self {
            tokens,
            pos: 0,
            filename: filename.to_string(),
            imports: Vec::new(),
            includes: Vec::new(),
            native_imports: Vec::new(),
            injects: Vec::new(),
            literals: Vec::new(),
            comments: Vec::new(),
            last_line: 0,
        }
    }

    fn parse_chunk(&mut self) -> Result<Chunk, BuildError> {
        let body = self.parse_block(|t| matches!(t, Token::Eof))?;
        if !matches!(self.peek(), Token::Eof) {
            return Err(self.error(format!("unexpected {:?}", self.peek())));
        }

        Ok(Chunk {
            filename: self.filename.clone(),
            body,
            imports: std::mem::take(&mut self.imports),
            includes: std::mem::take(&mut self.includes),
            native_imports: std::mem::take(&mut self.native_imports),
            injects: std::mem::take(&mut self.injects),
            literals: std::mem::take(&mut self.literals),
            comments: std::mem::take(&mut self.comments),
        })
    }

    // ── Helpers ────────────────────────────────────────────────────

    fn current(&self) -> Option<&SpannedToken> {
        self.tokens.get(self.pos)
    }

    fn peek(&self) -> &Token {
        self.current().map_or(&EOF_TOKEN, |t| &t.token)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        self.tokens
            .get(self.pos + offset)
            .map_or(&EOF_TOKEN, |t| &t.token)
    }

    fn range(&self) -> Range {
        self.current()
            .or_else(|| self.tokens.last())
            .map_or(Range::default(), |t| t.range)
    }

    /// Range of the most recently consumed token.
    fn prev_range(&self) -> Range {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or(Range::default(), |t| t.range)
    }

    fn advance(&mut self) -> SpannedToken {
        let tok = self.current().cloned().unwrap_or(SpannedToken {
            token: Token::Eof,
            range: self.range(),
            after_space: false,
        });
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, expected: &Token) -> bool {
        self.peek() == expected
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.check(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&self, message: impl Into<String>) -> BuildError {
        BuildError::parse(message, self.range())
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<Range, BuildError> {
        if self.check(expected) {
            Ok(self.advance().range)
        } else {
            Err(self.error(format!("expected {what}, got {:?}", self.peek())))
        }
    }

    fn expect_ident(&mut self) -> Result<String, BuildError> {
        if let Token::Ident(name) = self.peek() {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.error(format!("expected identifier, got {:?}", self.peek())))
        }
    }

    /// A string literal used as a path; returns the unescaped text.
    fn expect_path(&mut self) -> Result<String, BuildError> {
        if let Token::Str(raw) = self.peek() {
            let path = unquote(raw);
            self.advance();
            Ok(path)
        } else {
            Err(self.error(format!("expected quoted path, got {:?}", self.peek())))
        }
    }

    fn record_comment(&mut self, tok: SpannedToken) {
        if let Token::Comment(text) = tok.token {
            self.comments.push(Comment {
                line: tok.range.start.line,
                text,
            });
        }
    }

    /// Line continuation: newlines (and comments on them) are allowed
    /// after openers, separators and binary operators.
    fn skip_newlines(&mut self) {
        loop {
            match self.peek() {
                Token::Newline => {
                    self.advance();
                }
                Token::Comment(_) => {
                    let tok = self.advance();
                    self.record_comment(tok);
                }
                _ => break,
            }
        }
    }

    /// A comment right after a block header belongs to the header line.
    fn trailing_comment(&mut self) {
        if matches!(self.peek(), Token::Comment(_)) {
            let tok = self.advance();
            self.record_comment(tok);
        }
    }

    fn at_statement_end(&self) -> bool {
        matches!(
            self.peek(),
            Token::Newline | Token::Semicolon | Token::Eof | Token::Comment(_)
        )
    }

    fn at_line_end(&self) -> bool {
        matches!(self.peek(), Token::Newline | Token::Eof | Token::Comment(_))
    }

    fn end_statement(&mut self) -> Result<(), BuildError> {
        self.trailing_comment();
        match self.peek() {
            Token::Newline | Token::Semicolon => {
                self.advance();
                Ok(())
            }
            Token::Eof => Ok(()),
            other => Err(self.error(format!("expected end of statement, got {other:?}"))),
        }
    }

    fn push_literal(&mut self, kind: LiteralKind, raw: String) -> Expr {
        let literal = Literal { kind, raw };
        if kind != LiteralKind::Null {
            self.literals.push(literal.clone());
        }
        Expr::Literal(literal)
    }

    // ── Statements ─────────────────────────────────────────────────

    fn parse_block(&mut self, is_end: fn(&Token) -> bool) -> Result<Vec<Stmt>, BuildError> {
        let mut body = Vec::new();
        loop {
            loop {
                match self.peek() {
                    Token::Newline | Token::Semicolon => {
                        self.advance();
                    }
                    Token::Comment(_) => {
                        let tok = self.advance();
                        if tok.range.start.line == self.last_line {
                            self.record_comment(tok);
                        } else if let Token::Comment(text) = tok.token {
                            body.push(Stmt::new(StmtKind::Comment(text), tok.range));
                        }
                    }
                    _ => break,
                }
            }

            if is_end(self.peek()) || matches!(self.peek(), Token::Eof) {
                break;
            }

            let stmt = self.parse_statement()?;
            self.last_line = stmt.range.end.line;
            body.push(stmt);
            self.end_statement()?;
        }
        Ok(body)
    }

    fn parse_statement(&mut self) -> Result<Stmt, BuildError> {
        let start = self.range();
        match self.peek().clone() {
            Token::If => self.parse_if(start),
            Token::While => self.parse_while(start),
            Token::For => self.parse_for(start),
            Token::Directive(name) => self.parse_directive_statement(&name, start),
            _ => self.parse_simple_statement(),
        }
    }

    /// Statements allowed in the single-line `if` form.
    fn parse_simple_statement(&mut self) -> Result<Stmt, BuildError> {
        let start = self.range();
        let kind = match self.peek() {
            Token::Return => {
                self.advance();
                if self.at_statement_end() || self.check(&Token::Else) {
                    StmtKind::Return(None)
                } else {
                    StmtKind::Return(Some(self.parse_expr()?))
                }
            }
            Token::Break => {
                self.advance();
                StmtKind::Break
            }
            Token::Continue => {
                self.advance();
                StmtKind::Continue
            }
            Token::Ident(name)
                if name == "debugger"
                    && matches!(
                        self.peek_at(1),
                        Token::Newline
                            | Token::Semicolon
                            | Token::Eof
                            | Token::Comment(_)
                            | Token::Else
                    ) =>
            {
                self.advance();
                StmtKind::Debugger
            }
            _ => return self.parse_assignment_or_call(start),
        };
        Ok(Stmt::new(kind, start.merge(self.prev_range())))
    }

    fn parse_assignment_or_call(&mut self, start: Range) -> Result<Stmt, BuildError> {
        let target = self.parse_expr()?;

        if self.eat(&Token::Assign) {
            Self::check_assignable(&target, start)?;
            let init = self.parse_expr()?;
            return Ok(Stmt::new(
                StmtKind::Assignment {
                    variable: target,
                    init,
                },
                start.merge(self.prev_range()),
            ));
        }

        if let Some(op) = compound_op(self.peek()) {
            self.advance();
            Self::check_assignable(&target, start)?;
            let rhs = self.parse_expr()?;
            // `a -= b - c` must stay `a = a - (b - c)`
            let rhs = if rhs.precedence() <= op.precedence() {
                Expr::Paren(Box::new(rhs))
            } else {
                rhs
            };
            let init = Expr::binary(op, target.clone(), rhs);
            return Ok(Stmt::new(
                StmtKind::Assignment {
                    variable: target,
                    init,
                },
                start.merge(self.prev_range()),
            ));
        }

        if self.starts_command_argument()
            && matches!(
                target,
                Expr::Identifier(_) | Expr::Member { .. } | Expr::Index { .. }
            )
        {
            let mut args = vec![self.parse_expr()?];
            while self.eat(&Token::Comma) {
                self.skip_newlines();
                args.push(self.parse_expr()?);
            }
            let call = Expr::Call {
                callee: Box::new(target),
                args,
            };
            return Ok(Stmt::new(
                StmtKind::Expression(call),
                start.merge(self.prev_range()),
            ));
        }

        Ok(Stmt::new(
            StmtKind::Expression(target),
            start.merge(self.prev_range()),
        ))
    }

    fn check_assignable(target: &Expr, range: Range) -> Result<(), BuildError> {
        match target {
            Expr::Identifier(_) | Expr::Member { .. } | Expr::Index { .. } => Ok(()),
            other => Err(BuildError::parse(
                format!("cannot assign to {other:?}"),
                range,
            )),
        }
    }

    /// `print "hi"`: a callable followed by an argument on the same line.
    fn starts_command_argument(&self) -> bool {
        match self.peek() {
            Token::Ident(_)
            | Token::Number(_)
            | Token::Str(_)
            | Token::True
            | Token::False
            | Token::Null
            | Token::LParen
            | Token::LBracket
            | Token::LBrace
            | Token::At
            | Token::Not
            | Token::New
            | Token::Function => true,
            Token::Directive(d) => matches!(d.as_str(), "envar" | "inject" | "line" | "filename"),
            _ => false,
        }
    }

    fn parse_if(&mut self, start: Range) -> Result<Stmt, BuildError> {
        self.expect(&Token::If, "'if'")?;
        let condition = self.parse_expr()?;
        self.expect(&Token::Then, "'then'")?;

        if !self.at_line_end() {
            return self.parse_shortcut_if(start, condition);
        }

        self.trailing_comment();
        let is_else_or_end: fn(&Token) -> bool = |t| matches!(t, Token::Else | Token::End);
        let mut clauses = vec![IfClause {
            condition,
            body: self.parse_block(is_else_or_end)?,
        }];
        let mut else_body = None;

        loop {
            match self.peek() {
                Token::Else if else_body.is_none() => {
                    self.advance();
                    if self.eat(&Token::If) {
                        let condition = self.parse_expr()?;
                        self.expect(&Token::Then, "'then'")?;
                        self.trailing_comment();
                        let body = self.parse_block(is_else_or_end)?;
                        clauses.push(IfClause { condition, body });
                    } else {
                        self.trailing_comment();
                        else_body = Some(self.parse_block(|t| matches!(t, Token::End))?);
                    }
                }
                Token::End => {
                    self.advance();
                    self.expect(&Token::If, "'end if'")?;
                    break;
                }
                _ => return Err(self.error("expected 'end if'")),
            }
        }

        Ok(Stmt::new(
            StmtKind::If { clauses, else_body },
            start.merge(self.prev_range()),
        ))
    }

    /// `if a then b else c` on one line.
    fn parse_shortcut_if(&mut self, start: Range, condition: Expr) -> Result<Stmt, BuildError> {
        let mut clauses = vec![IfClause {
            condition,
            body: vec![self.parse_simple_statement()?],
        }];
        let mut else_body = None;

        while self.eat(&Token::Else) {
            if self.eat(&Token::If) {
                let condition = self.parse_expr()?;
                self.expect(&Token::Then, "'then'")?;
                clauses.push(IfClause {
                    condition,
                    body: vec![self.parse_simple_statement()?],
                });
            } else {
                else_body = Some(vec![self.parse_simple_statement()?]);
                break;
            }
        }

        Ok(Stmt::new(
            StmtKind::If { clauses, else_body },
            start.merge(self.prev_range()),
        ))
    }

    fn parse_while(&mut self, start: Range) -> Result<Stmt, BuildError> {
        self.expect(&Token::While, "'while'")?;
        let condition = self.parse_expr()?;
        self.trailing_comment();
        let body = self.parse_block(|t| matches!(t, Token::End))?;
        self.expect(&Token::End, "'end while'")?;
        self.expect(&Token::While, "'end while'")?;
        Ok(Stmt::new(
            StmtKind::While { condition, body },
            start.merge(self.prev_range()),
        ))
    }

    fn parse_for(&mut self, start: Range) -> Result<Stmt, BuildError> {
        self.expect(&Token::For, "'for'")?;
        let variable = self.expect_ident()?;
        self.expect(&Token::In, "'in'")?;
        let iterator = self.parse_expr()?;
        self.trailing_comment();
        let body = self.parse_block(|t| matches!(t, Token::End))?;
        self.expect(&Token::End, "'end for'")?;
        self.expect(&Token::For, "'end for'")?;
        Ok(Stmt::new(
            StmtKind::For {
                variable,
                iterator,
                body,
            },
            start.merge(self.prev_range()),
        ))
    }

    fn parse_directive_statement(&mut self, name: &str, start: Range) -> Result<Stmt, BuildError> {
        let kind = match name {
            "import" => {
                self.advance();
                let name = self.expect_ident()?;
                match self.peek() {
                    Token::Ident(from) if from == "from" => {
                        self.advance();
                    }
                    other => return Err(self.error(format!("expected 'from', got {other:?}"))),
                }
                let path = self.expect_path()?;
                self.imports.push(Directive {
                    path: path.clone(),
                    range: start.merge(self.prev_range()),
                });
                StmtKind::Import { name, path }
            }
            "include" => {
                self.advance();
                let path = self.expect_path()?;
                self.includes.push(Directive {
                    path: path.clone(),
                    range: start.merge(self.prev_range()),
                });
                StmtKind::Include { path }
            }
            "ifdef" | "ifndef" => {
                self.advance();
                let negated = name == "ifndef";
                let name = self.expect_ident()?;
                self.trailing_comment();
                let body = self.parse_block(|t| is_directive(t, &["else", "endif"]))?;
                let else_body = if is_directive(self.peek(), &["else"]) {
                    self.advance();
                    self.trailing_comment();
                    Some(self.parse_block(|t| is_directive(t, &["endif"]))?)
                } else {
                    None
                };
                if !is_directive(self.peek(), &["endif"]) {
                    return Err(self.error("expected '#endif'"));
                }
                self.advance();
                StmtKind::Conditional {
                    name,
                    negated,
                    body,
                    else_body,
                }
            }
            "envar" | "inject" | "line" | "filename" => return self.parse_simple_statement(),
            other => return Err(self.error(format!("unknown directive #{other}"))),
        };
        Ok(Stmt::new(kind, start.merge(self.prev_range())))
    }

    // ── Expressions ────────────────────────────────────────────────

    fn parse_expr(&mut self) -> Result<Expr, BuildError> {
        self.parse_or()
    }

    /// One left-associative precedence level.
    fn parse_level(
        &mut self,
        next: fn(&mut Self) -> Result<Expr, BuildError>,
        ops: fn(&Token) -> Option<BinaryOp>,
    ) -> Result<Expr, BuildError> {
        let mut left = next(self)?;
        while let Some(op) = ops(self.peek()) {
            self.advance();
            self.skip_newlines();
            let right = next(self)?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_or(&mut self) -> Result<Expr, BuildError> {
        self.parse_level(Self::parse_and, |t| {
            matches!(t, Token::Or).then_some(BinaryOp::Or)
        })
    }

    fn parse_and(&mut self) -> Result<Expr, BuildError> {
        self.parse_level(Self::parse_not, |t| {
            matches!(t, Token::And).then_some(BinaryOp::And)
        })
    }

    fn parse_not(&mut self) -> Result<Expr, BuildError> {
        if self.eat(&Token::Not) {
            let operand = self.parse_not()?;
            return Ok(Expr::Not(Box::new(operand)));
        }
        self.parse_isa()
    }

    fn parse_isa(&mut self) -> Result<Expr, BuildError> {
        self.parse_level(Self::parse_comparison, |t| {
            matches!(t, Token::Isa).then_some(BinaryOp::Isa)
        })
    }

    fn parse_comparison(&mut self) -> Result<Expr, BuildError> {
        self.parse_level(Self::parse_bit_or, |t| match t {
            Token::EqEq => Some(BinaryOp::Eq),
            Token::NotEq => Some(BinaryOp::Ne),
            Token::Lt => Some(BinaryOp::Lt),
            Token::Gt => Some(BinaryOp::Gt),
            Token::Le => Some(BinaryOp::Le),
            Token::Ge => Some(BinaryOp::Ge),
            _ => None,
        })
    }

    fn parse_bit_or(&mut self) -> Result<Expr, BuildError> {
        self.parse_level(Self::parse_bit_and, |t| {
            matches!(t, Token::Pipe).then_some(BinaryOp::BitOr)
        })
    }

    fn parse_bit_and(&mut self) -> Result<Expr, BuildError> {
        self.parse_level(Self::parse_shift, |t| {
            matches!(t, Token::Amp).then_some(BinaryOp::BitAnd)
        })
    }

    fn parse_shift(&mut self) -> Result<Expr, BuildError> {
        self.parse_level(Self::parse_additive, |t| match t {
            Token::Shl => Some(BinaryOp::Shl),
            Token::Shr => Some(BinaryOp::Shr),
            Token::UShr => Some(BinaryOp::UShr),
            _ => None,
        })
    }

    fn parse_additive(&mut self) -> Result<Expr, BuildError> {
        self.parse_level(Self::parse_multiplicative, |t| match t {
            Token::Plus => Some(BinaryOp::Add),
            Token::Minus => Some(BinaryOp::Sub),
            _ => None,
        })
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, BuildError> {
        self.parse_level(Self::parse_unary, |t| match t {
            Token::Star => Some(BinaryOp::Mul),
            Token::Slash => Some(BinaryOp::Div),
            Token::Percent => Some(BinaryOp::Mod),
            _ => None,
        })
    }

    fn parse_unary(&mut self) -> Result<Expr, BuildError> {
        if self.eat(&Token::Minus) {
            let operand = self.parse_unary()?;
            return Ok(Expr::Negation(Box::new(operand)));
        }
        self.parse_new()
    }

    fn parse_new(&mut self) -> Result<Expr, BuildError> {
        if self.eat(&Token::New) {
            let operand = self.parse_new()?;
            return Ok(Expr::New(Box::new(operand)));
        }
        self.parse_address_of()
    }

    fn parse_address_of(&mut self) -> Result<Expr, BuildError> {
        if self.eat(&Token::At) {
            let operand = self.parse_address_of()?;
            return Ok(Expr::AddressOf(Box::new(operand)));
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> Result<Expr, BuildError> {
        self.parse_level(Self::parse_postfix, |t| {
            matches!(t, Token::Caret).then_some(BinaryOp::Pow)
        })
    }

    /// `import_code("literal")`, exactly.
    fn native_import_ahead(&self) -> bool {
        let tight_paren = self
            .current()
            .is_some_and(|t| t.token == Token::LParen && !t.after_space);
        tight_paren
            && matches!(self.peek_at(1), Token::Str(_))
            && matches!(self.peek_at(2), Token::RParen)
    }

    fn parse_postfix(&mut self) -> Result<Expr, BuildError> {
        let start = self.range();
        let mut expr = self.parse_atom()?;

        if matches!(&expr, Expr::Identifier(name) if name == "import_code") && self.native_import_ahead()
        {
            self.advance();
            let path = self.expect_path()?;
            self.advance();
            self.native_imports.push(Directive {
                path: path.clone(),
                range: start.merge(self.prev_range()),
            });
            expr = Expr::ImportCode(path);
        }

        loop {
            let Some(tok) = self.current() else { break };
            match tok.token {
                Token::LParen if !tok.after_space => {
                    self.advance();
                    let args = self.parse_call_args()?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                    };
                }
                Token::LBracket if !tok.after_space => {
                    self.advance();
                    expr = self.parse_index(expr)?;
                }
                Token::Dot => {
                    self.advance();
                    let name = self.expect_ident()?;
                    expr = Expr::Member {
                        base: Box::new(expr),
                        name,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_call_args(&mut self) -> Result<Vec<Expr>, BuildError> {
        let mut args = Vec::new();
        self.skip_newlines();
        if self.eat(&Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            self.skip_newlines();
            if self.eat(&Token::Comma) {
                self.skip_newlines();
                continue;
            }
            self.expect(&Token::RParen, "')'")?;
            return Ok(args);
        }
    }

    fn parse_index(&mut self, base: Expr) -> Result<Expr, BuildError> {
        self.skip_newlines();
        let start = if self.check(&Token::Colon) {
            None
        } else {
            Some(Box::new(self.parse_expr()?))
        };
        self.skip_newlines();

        if self.eat(&Token::Colon) {
            self.skip_newlines();
            let end = if self.check(&Token::RBracket) {
                None
            } else {
                Some(Box::new(self.parse_expr()?))
            };
            self.skip_newlines();
            self.expect(&Token::RBracket, "']'")?;
            return Ok(Expr::Slice {
                base: Box::new(base),
                start,
                end,
            });
        }

        self.expect(&Token::RBracket, "']'")?;
        match start {
            Some(index) => Ok(Expr::Index {
                base: Box::new(base),
                index,
            }),
            None => Err(self.error("expected index expression")),
        }
    }

    fn parse_atom(&mut self) -> Result<Expr, BuildError> {
        let tok = self.advance();
        let expr = match tok.token {
            Token::Number(raw) => self.push_literal(LiteralKind::Number, raw),
            Token::Str(raw) => self.push_literal(LiteralKind::String, raw),
            Token::True => self.push_literal(LiteralKind::Boolean, "true".into()),
            Token::False => self.push_literal(LiteralKind::Boolean, "false".into()),
            Token::Null => self.push_literal(LiteralKind::Null, "null".into()),
            Token::Ident(name) => Expr::Identifier(name),
            Token::LParen => {
                self.skip_newlines();
                let inner = self.parse_expr()?;
                self.skip_newlines();
                self.expect(&Token::RParen, "')'")?;
                Expr::Paren(Box::new(inner))
            }
            Token::LBracket => self.parse_list()?,
            Token::LBrace => self.parse_map()?,
            Token::Function => Expr::Function(self.parse_function()?),
            Token::Directive(name) => match name.as_str() {
                "envar" => Expr::Envar(self.expect_ident()?),
                "inject" => {
                    let path = self.expect_path()?;
                    self.injects.push(Directive {
                        path: path.clone(),
                        range: tok.range.merge(self.prev_range()),
                    });
                    Expr::Inject(path)
                }
                "line" => Expr::Line(tok.range.start.line),
                "filename" => Expr::Filename(self.filename.clone()),
                other => {
                    return Err(BuildError::parse(
                        format!("#{other} cannot be used as a value"),
                        tok.range,
                    ));
                }
            },
            other => {
                return Err(BuildError::parse(
                    format!("unexpected token {other:?}"),
                    tok.range,
                ));
            }
        };
        Ok(expr)
    }

    fn parse_list(&mut self) -> Result<Expr, BuildError> {
        let mut items = Vec::new();
        self.skip_newlines();
        while !self.check(&Token::RBracket) {
            items.push(self.parse_expr()?);
            self.skip_newlines();
            if !self.eat(&Token::Comma) {
                break;
            }
            self.skip_newlines();
        }
        self.expect(&Token::RBracket, "']'")?;
        Ok(Expr::List(items))
    }

    fn parse_map(&mut self) -> Result<Expr, BuildError> {
        let mut entries = Vec::new();
        self.skip_newlines();
        while !self.check(&Token::RBrace) {
            let key = self.parse_expr()?;
            self.skip_newlines();
            self.expect(&Token::Colon, "':'")?;
            self.skip_newlines();
            let value = self.parse_expr()?;
            entries.push((key, value));
            self.skip_newlines();
            if !self.eat(&Token::Comma) {
                break;
            }
            self.skip_newlines();
        }
        self.expect(&Token::RBrace, "'}'")?;
        Ok(Expr::Map(entries))
    }

    /// Everything after the `function` keyword.
    fn parse_function(&mut self) -> Result<Function, BuildError> {
        let mut params = Vec::new();
        if self.eat(&Token::LParen) {
            self.skip_newlines();
            while !self.check(&Token::RParen) {
                let name = self.expect_ident()?;
                let default = if self.eat(&Token::Assign) {
                    Some(self.parse_expr()?)
                } else {
                    None
                };
                params.push(Param { name, default });
                self.skip_newlines();
                if !self.eat(&Token::Comma) {
                    break;
                }
                self.skip_newlines();
            }
            self.expect(&Token::RParen, "')'")?;
        }
        self.trailing_comment();
        let body = self.parse_block(|t| matches!(t, Token::End))?;
        self.expect(&Token::End, "'end function'")?;
        self.expect(&Token::Function, "'end function'")?;
        Ok(Function { params, body })
    }
}
