// program ::= stmt*
// stmt ::= 'return' expr ';'
//        | 'if' '(' expr ')' stmt ['else' stmt]
//        | 'while' '(' expr ')' stmt
//        | 'for' '(' [expr] ';' [expr] ';' [expr] ')' stmt
//        | '{' stmt* '}'
//        | expr ';'
// expr ::= assign
// assign ::= equality ['=' assign]
// equality ::= relational (('==' | '!=') relational)*
// relational ::= add (('<' | '<=' | '>' | '>=') add)*
// add ::= mul (('+' | '-') mul)*
// mul ::= unary (('*' | '/') unary)*
// unary ::= ['+' | '-'] primary
// primary ::= number | ident | '(' expr ')'

// Precedence
//
// unary + -
// * /
// + -
// < <= > >=
// == !=
// =

use crate::{locals::Locals, locals::Offset, token::Span};

/// A compiled unit: the single routine of a program together with the
/// storage of every local it mentions.
#[derive(Debug, PartialEq)]
pub struct Program {
    pub name: Box<str>,
    pub body: Vec<Stmt>,
    pub locals: Locals,
}

/// Name of the implicit routine every program is compiled into.
pub const MAIN: &str = "main";

#[derive(Debug, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, PartialEq)]
pub enum StmtKind {
    /// An expression evaluated for its effects. The value is dropped.
    Expr(Expr),
    Return(Expr),
    If {
        predicate: Expr,
        then_arm: Box<Stmt>,
        else_arm: Option<Box<Stmt>>,
    },
    While {
        predicate: Expr,
        body: Box<Stmt>,
    },
    For {
        init: Option<Expr>,
        /// A missing predicate loops forever.
        predicate: Option<Expr>,
        step: Option<Expr>,
        body: Box<Stmt>,
    },
    Block {
        body: Vec<Stmt>,
    },
}

#[derive(Debug, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, PartialEq)]
pub enum ExprKind {
    Int(i64),
    /// A local variable, already resolved to its slot.
    Local(Offset),
    Binary {
        op: BinaryOperator,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

/// `>` and `>=` have no operator of their own: the parser swaps the operands
/// and uses [`BinaryOperator::Lt`] and [`BinaryOperator::Le`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    /// Only valid with a [`ExprKind::Local`] left operand.
    Assign,
}

impl Expr {
    pub fn binary(op: BinaryOperator, lhs: Expr, rhs: Expr) -> Expr {
        let span = lhs.span.to(rhs.span);
        Expr {
            kind: ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            span,
        }
    }

    pub fn with_span(mut self, span: Span) -> Expr {
        self.span = span;
        self
    }

    /// Whether this expression denotes a storage location.
    pub fn is_addressable(&self) -> bool {
        matches!(self.kind, ExprKind::Local(_))
    }
}
