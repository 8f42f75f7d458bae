use std::fmt::{Debug, Display};

use crate::{
    codegen, lexer, parser,
    token::{Span, Spanned},
};

/// Any failure of a compilation attempt.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error(transparent)]
    Lex(#[from] Spanned<lexer::Error>),
    #[error(transparent)]
    Parse(#[from] Spanned<parser::Error>),
    /// The generator found a tree the parser can't produce.
    #[error("internal compiler error: {0}")]
    Internal(#[from] Spanned<codegen::Error>),
}

impl<T> std::error::Error for Spanned<T>
where
    T: Debug,
    Spanned<T>: Display,
{
}

impl CompileError {
    pub fn span(&self) -> Span {
        match self {
            CompileError::Lex(e) => e.span,
            CompileError::Parse(e) => e.span,
            CompileError::Internal(e) => e.span,
        }
    }

    /// Renders the error against the source it was produced from:
    ///
    /// ```text
    /// 1:7: error: expected ";", but got "return"
    /// a = 1 return a;
    ///       ^~~~~~
    /// ```
    ///
    /// Line and column are 1-based. Columns count characters.
    pub fn report(&self, src: &str) -> String {
        let span = self.span();
        let lo = span.lo.min(src.len());
        let line_lo = src[..lo].rfind('\n').map_or(0, |i| i + 1);
        let line_hi = src[lo..].find('\n').map_or(src.len(), |i| lo + i);
        let line = src[line_lo..line_hi].trim_end_matches('\r');

        let line_no = src[..lo].matches('\n').count() + 1;
        let col = src[line_lo..lo].chars().count() + 1;
        let line_end = line_lo + line.len();
        let hi = span.hi().min(line_end).max(lo);
        let width = src[lo..hi].chars().count().max(1);

        let mut out = format!("{line_no}:{col}: error: {self}\n{line}\n");
        for c in src[line_lo..lo].chars() {
            out.push(if c == '\t' { '\t' } else { ' ' });
        }
        out.push('^');
        out.extend(std::iter::repeat('~').take(width - 1));
        out.push('\n');
        out
    }
}
