//! Syntax tree for one MiniScript source file.
//!
//! Expressions carry no positions; statements do, so errors and
//! comment re-attachment can point at source lines.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    pub fn merge(self, other: Range) -> Range {
        Range {
            start: self.start,
            end: other.end,
        }
    }
}

// Binding strength of rendered expressions, loosest first.
pub const PREC_LOWEST: u8 = 0;
pub const PREC_OR: u8 = 1;
pub const PREC_AND: u8 = 2;
pub const PREC_NOT: u8 = 3;
pub const PREC_ISA: u8 = 4;
pub const PREC_COMPARE: u8 = 5;
pub const PREC_BIT_OR: u8 = 6;
pub const PREC_BIT_AND: u8 = 7;
pub const PREC_SHIFT: u8 = 8;
pub const PREC_ADD: u8 = 9;
pub const PREC_MUL: u8 = 10;
pub const PREC_UNARY: u8 = 11;
pub const PREC_NEW: u8 = 12;
pub const PREC_ADDRESS: u8 = 13;
pub const PREC_POWER: u8 = 14;
pub const PREC_POSTFIX: u8 = 15;
pub const PREC_ATOM: u8 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Or,
    And,
    Isa,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    BitOr,
    BitAnd,
    Shl,
    Shr,
    UShr,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Or => "or",
            BinaryOp::And => "and",
            BinaryOp::Isa => "isa",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::BitOr => "|",
            BinaryOp::BitAnd => "&",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::UShr => ">>>",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "^",
        }
    }

    /// The target has no syntax for these; they are lowered to
    /// `bitwise(op, left, right)` calls.
    pub fn is_bitwise(self) -> bool {
        matches!(
            self,
            BinaryOp::BitOr | BinaryOp::BitAnd | BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr
        )
    }

    /// `a<b<c` chains: it means `a<b and b<c`.
    pub fn is_comparison(self) -> bool {
        self.precedence() == PREC_COMPARE
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    /// Word operators need surrounding spaces even in minified output.
    pub fn is_keyword(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or | BinaryOp::Isa)
    }

    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => PREC_OR,
            BinaryOp::And => PREC_AND,
            BinaryOp::Isa => PREC_ISA,
            BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::Lt
            | BinaryOp::Gt
            | BinaryOp::Le
            | BinaryOp::Ge => PREC_COMPARE,
            BinaryOp::BitOr => PREC_BIT_OR,
            BinaryOp::BitAnd => PREC_BIT_AND,
            BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr => PREC_SHIFT,
            BinaryOp::Add | BinaryOp::Sub => PREC_ADD,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => PREC_MUL,
            BinaryOp::Pow => PREC_POWER,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    Number,
    String,
    Boolean,
    Null,
}

/// A constant exactly as written in the source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Literal {
    pub kind: LiteralKind,
    /// Source text, quotes included for strings.
    pub raw: String,
}

impl Literal {
    pub fn string(value: &str) -> Self {
        Self {
            kind: LiteralKind::String,
            raw: quote(value),
        }
    }

    /// Unescaped contents of a string literal.
    pub fn string_value(&self) -> Option<String> {
        if self.kind != LiteralKind::String {
            return None;
        }
        Some(unquote(&self.raw))
    }
}

/// Wrap text in a MiniScript string literal (`"` is escaped by doubling).
pub fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

pub fn unquote(raw: &str) -> String {
    let inner = raw
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(raw);
    inner.replace("\"\"", "\"")
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Identifier(String),
    Literal(Literal),
    List(Vec<Expr>),
    Map(Vec<(Expr, Expr)>),
    Function(Function),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Not(Box<Expr>),
    Negation(Box<Expr>),
    New(Box<Expr>),
    AddressOf(Box<Expr>),
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Member {
        base: Box<Expr>,
        name: String,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    Slice {
        base: Box<Expr>,
        start: Option<Box<Expr>>,
        end: Option<Box<Expr>>,
    },
    Paren(Box<Expr>),
    /// `import_code("path")` with a literal path: a native import.
    ImportCode(String),
    /// `#envar NAME`
    Envar(String),
    /// `#inject "path"`
    Inject(String),
    /// `#line`, holding the line it was written on.
    Line(usize),
    /// `#filename`, holding the file it was written in.
    Filename(String),
}

impl Expr {
    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Binding strength of this expression once rendered. Bitwise
    /// operators render as calls and therefore bind like postfix forms.
    pub fn precedence(&self) -> u8 {
        match self {
            Expr::Function(_) => PREC_LOWEST,
            Expr::Binary { op, .. } if op.is_bitwise() => PREC_POSTFIX,
            Expr::Binary { op, .. } => op.precedence(),
            Expr::Not(_) => PREC_NOT,
            Expr::Negation(_) => PREC_UNARY,
            Expr::New(_) => PREC_NEW,
            Expr::AddressOf(_) => PREC_ADDRESS,
            Expr::Call { .. } | Expr::Member { .. } | Expr::Index { .. } | Expr::Slice { .. } => {
                PREC_POSTFIX
            }
            Expr::ImportCode(_) => PREC_POSTFIX,
            Expr::Identifier(_)
            | Expr::Literal(_)
            | Expr::List(_)
            | Expr::Map(_)
            | Expr::Paren(_)
            | Expr::Envar(_)
            | Expr::Inject(_)
            | Expr::Line(_)
            | Expr::Filename(_) => PREC_ATOM,
        }
    }

    /// Strip any number of redundant wrapping parentheses.
    pub fn unwrap_parens(&self) -> &Expr {
        let mut current = self;
        while let Expr::Paren(inner) = current {
            current = inner;
        }
        current
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfClause {
    pub condition: Expr,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Assignment {
        variable: Expr,
        init: Expr,
    },
    Expression(Expr),
    If {
        clauses: Vec<IfClause>,
        else_body: Option<Vec<Stmt>>,
    },
    While {
        condition: Expr,
        body: Vec<Stmt>,
    },
    For {
        variable: String,
        iterator: Expr,
        body: Vec<Stmt>,
    },
    Return(Option<Expr>),
    Break,
    Continue,
    /// A comment standing on its own line; text excludes the `//`.
    Comment(String),
    /// `#import name from "path"`
    Import {
        name: String,
        path: String,
    },
    /// `#include "path"`
    Include {
        path: String,
    },
    /// `#ifdef NAME` / `#ifndef NAME` block.
    Conditional {
        name: String,
        negated: bool,
        body: Vec<Stmt>,
        else_body: Option<Vec<Stmt>>,
    },
    Debugger,
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub range: Range,
}

impl Stmt {
    pub fn new(kind: StmtKind, range: Range) -> Self {
        Self { kind, range }
    }
}

/// Position-insensitive: two statements are equal when their shape is.
impl PartialEq for Stmt {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

/// A directive naming another file.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub path: String,
    pub range: Range,
}

/// A comment written after code on the same line.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub line: usize,
    pub text: String,
}

/// Parsed root of one file plus everything later stages look up
/// without walking the tree again.
#[derive(Debug, Clone, Default)]
pub struct Chunk {
    pub filename: String,
    pub body: Vec<Stmt>,
    pub imports: Vec<Directive>,
    pub includes: Vec<Directive>,
    pub native_imports: Vec<Directive>,
    pub injects: Vec<Directive>,
    /// Every non-null literal, in source order.
    pub literals: Vec<Literal>,
    pub comments: Vec<Comment>,
}
