#![allow(clippy::items_after_statements)]

use std::fmt;

use crate::{codegen, lexer, parser, token::Spanned};

impl fmt::Display for Spanned<lexer::Error> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Spanned { span, inner: error } = self;

        if f.alternate() {
            write!(f, "{span}: ")?;
        }

        use lexer::Error::*;
        match error {
            UnexpectedChar(c) => write!(f, "unexpected character {c:?}"),
            MissingRadixDigits { radix } => {
                write!(f, "expected base {radix} digits after number prefix")
            }
            NumberOutOfRange => write!(f, "number literal out of range"),
        }
    }
}

impl fmt::Display for Spanned<parser::Error> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Spanned { span, inner: error } = self;

        if f.alternate() {
            write!(f, "{span}: ")?;
        }

        use parser::Error::*;
        match error {
            InvalidAssignmentTarget => write!(f, "invalid assignment target"),
            UnexpectedTokenInExpr { token } => {
                write!(f, "expected an expression, but got {token}")
            }
            Unexpected { actual, expected } => {
                write!(f, "expected {expected}, but got {actual}")
            }
            ParseInt => write!(f, "parse int error, out of bounds"),
        }
    }
}

impl fmt::Display for Spanned<codegen::Error> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Spanned { span, inner: error } = self;

        if f.alternate() {
            write!(f, "{span}: ")?;
        }

        use codegen::Error::*;
        match error {
            NotAddressable => write!(f, "expression is not addressable"),
            UnresolvedLocal(offset) => write!(f, "no local variable at offset {offset}"),
        }
    }
}
