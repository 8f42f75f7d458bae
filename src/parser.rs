use std::num::ParseIntError;

use crate::{
    ast::{BinaryOperator, Expr, ExprKind, Program, Stmt, StmtKind, MAIN},
    locals::Locals,
    token::{Spanned, Token, TokenKind},
};

type Result<T, E = Spanned<Error>> = std::result::Result<T, E>;

/// Parses a whole program, resolving every local variable it mentions.
///
/// The token slice must be terminated by a [`TokenKind::Eof`] token, as
/// produced by [`crate::lexer::lex`]. Parsing stops at the first error.
pub fn parse_program(tokens: &[Token]) -> Result<Program> {
    let mut p = Parser::new(tokens);
    let program = p.parse_program()?;
    log::debug!(
        "parsed {} statements with {} locals",
        program.body.len(),
        program.locals.len()
    );
    Ok(program)
}

/// Parses a single expression that must span the whole input.
pub fn parse_expr(tokens: &[Token]) -> Result<(Expr, Locals)> {
    let mut p = Parser::new(tokens);
    let expr = p.parse_expr()?;
    p.consume(TokenKind::Eof)?;
    Ok((expr, p.locals))
}

struct Parser<'tok> {
    tokens: &'tok [Token],
    cursor: usize,
    locals: Locals,
}

impl Parser<'_> {
    fn parse_program(&mut self) -> Result<Program> {
        let mut body = Vec::with_capacity(8);
        while self.except([]) {
            body.push(self.parse_stmt()?);
        }
        self.consume(TokenKind::Eof)?;
        Ok(Program {
            name: MAIN.into(),
            body,
            locals: std::mem::take(&mut self.locals),
        })
    }

    fn parse_stmt(&mut self) -> Result<Stmt> {
        let token = self.peek();
        let (kind, end) = match token.kind {
            // Return: return expr ;
            TokenKind::Return => {
                self.advance();
                let value = self.parse_expr()?;
                let end = self.consume(TokenKind::Semicolon)?.span();
                (StmtKind::Return(value), end)
            }

            // Conditional: if ( expr ) stmt [else stmt]
            TokenKind::If => {
                self.advance();
                let predicate = self.parse_paren_expr()?;
                let then_arm = self.parse_stmt()?;
                let (else_arm, end) = if self.take(TokenKind::Else) {
                    let else_arm = self.parse_stmt()?;
                    let end = else_arm.span;
                    (Some(Box::new(else_arm)), end)
                } else {
                    (None, then_arm.span)
                };
                let cond = StmtKind::If {
                    predicate,
                    then_arm: Box::new(then_arm),
                    else_arm,
                };
                (cond, end)
            }

            // Loop: while ( expr ) stmt
            TokenKind::While => {
                self.advance();
                let predicate = self.parse_paren_expr()?;
                let body = self.parse_stmt()?;
                let end = body.span;
                let w = StmtKind::While {
                    predicate,
                    body: Box::new(body),
                };
                (w, end)
            }

            // Loop: for ( [expr] ; [expr] ; [expr] ) stmt
            TokenKind::For => {
                self.advance();
                self.consume(TokenKind::LParen)?;
                let init = self.parse_expr_until(TokenKind::Semicolon)?;
                self.consume(TokenKind::Semicolon)?;
                let predicate = self.parse_expr_until(TokenKind::Semicolon)?;
                self.consume(TokenKind::Semicolon)?;
                let step = self.parse_expr_until(TokenKind::RParen)?;
                self.consume(TokenKind::RParen)?;
                let body = self.parse_stmt()?;
                let end = body.span;
                let f = StmtKind::For {
                    init,
                    predicate,
                    step,
                    body: Box::new(body),
                };
                (f, end)
            }

            // Block: { stmt* }
            TokenKind::LBrace => {
                self.advance();
                let mut body = Vec::new();
                while self.except([TokenKind::RBrace]) {
                    body.push(self.parse_stmt()?);
                }
                let end = self.consume(TokenKind::RBrace)?.span();
                (StmtKind::Block { body }, end)
            }

            // Expression statement: expr ;
            _ => {
                let expr = self.parse_expr()?;
                let end = self.consume(TokenKind::Semicolon)?.span();
                (StmtKind::Expr(expr), end)
            }
        };

        Ok(Stmt {
            kind,
            span: token.span().to(end),
        })
    }

    /// Parses `( expr )`.
    fn parse_paren_expr(&mut self) -> Result<Expr> {
        self.consume(TokenKind::LParen)?;
        let expr = self.parse_expr()?;
        self.consume(TokenKind::RParen)?;
        Ok(expr)
    }

    /// Parses an optional expression, which is absent if the current token is
    /// `end`. Does **NOT** consume `end`.
    fn parse_expr_until(&mut self, end: TokenKind) -> Result<Option<Expr>> {
        if self.is(end) {
            Ok(None)
        } else {
            self.parse_expr().map(Some)
        }
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_assign()
    }

    /// Assignment is right-associative: `a = b = 1` is `a = (b = 1)`.
    fn parse_assign(&mut self) -> Result<Expr> {
        let target = self.parse_equality()?;

        if self.take(TokenKind::Assign) {
            if !target.is_addressable() {
                return Err(target.span.wrap(Error::InvalidAssignmentTarget));
            }
            let value = self.parse_assign()?;
            return Ok(Expr::binary(BinaryOperator::Assign, target, value));
        }

        Ok(target)
    }

    fn parse_equality(&mut self) -> Result<Expr> {
        let mut node = self.parse_relational()?;

        loop {
            let op = match self.peek().kind {
                TokenKind::EqEq => BinaryOperator::Eq,
                TokenKind::NotEq => BinaryOperator::Ne,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_relational()?;
            node = Expr::binary(op, node, rhs);
        }

        Ok(node)
    }

    fn parse_relational(&mut self) -> Result<Expr> {
        let mut node = self.parse_add()?;

        loop {
            // `a > b` is `b < a`, and `a >= b` is `b <= a`.
            let (op, swap) = match self.peek().kind {
                TokenKind::Less => (BinaryOperator::Lt, false),
                TokenKind::LessEq => (BinaryOperator::Le, false),
                TokenKind::Greater => (BinaryOperator::Lt, true),
                TokenKind::GreaterEq => (BinaryOperator::Le, true),
                _ => break,
            };
            self.advance();
            let rhs = self.parse_add()?;
            node = if swap {
                let span = node.span.to(rhs.span);
                Expr::binary(op, rhs, node).with_span(span)
            } else {
                Expr::binary(op, node, rhs)
            };
        }

        Ok(node)
    }

    fn parse_add(&mut self) -> Result<Expr> {
        let mut node = self.parse_mul()?;

        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOperator::Add,
                TokenKind::Minus => BinaryOperator::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_mul()?;
            node = Expr::binary(op, node, rhs);
        }

        Ok(node)
    }

    fn parse_mul(&mut self) -> Result<Expr> {
        let mut node = self.parse_unary()?;

        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOperator::Mul,
                TokenKind::Slash => BinaryOperator::Div,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_unary()?;
            node = Expr::binary(op, node, rhs);
        }

        Ok(node)
    }

    /// A single optional sign. Negation is lowered to `0 - primary`.
    fn parse_unary(&mut self) -> Result<Expr> {
        let token = self.peek();
        match token.kind {
            TokenKind::Plus => {
                self.advance();
                let operand = self.parse_primary()?;
                let span = token.span().to(operand.span);
                Ok(operand.with_span(span))
            }
            TokenKind::Minus => {
                self.advance();
                let operand = self.parse_primary()?;
                let zero = Expr {
                    kind: ExprKind::Int(0),
                    span: token.span(),
                };
                Ok(Expr::binary(BinaryOperator::Sub, zero, operand))
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let token = self.advance();
        let kind = match token.kind {
            TokenKind::Number => {
                let value = token
                    .lexeme
                    .parse()
                    .map_err(|error: ParseIntError| token.span().wrap(error.into()))?;
                ExprKind::Int(value)
            }

            // Variables are declared by their first use.
            TokenKind::Identifier => ExprKind::Local(self.locals.resolve(&token.lexeme)),

            // Grouping: ( expr )
            TokenKind::LParen => {
                let expr = self.parse_expr()?;
                let end = self.consume(TokenKind::RParen)?;
                return Ok(expr.with_span(token.span().to(end.span())));
            }

            other => {
                let error = Error::UnexpectedTokenInExpr { token: other };
                return Err(token.span().wrap(error));
            }
        };

        Ok(Expr {
            kind,
            span: token.span(),
        })
    }
}

impl<'tok> Parser<'tok> {
    fn new(tokens: &'tok [Token]) -> Parser<'tok> {
        assert!(
            tokens.last().is_some_and(Token::is_eof),
            "token stream must be terminated by Eof"
        );
        Parser {
            tokens,
            cursor: 0,
            locals: Locals::with_capacity(8),
        }
    }

    /// Returns the current token. Once the input is exhausted this is always
    /// the terminating [`TokenKind::Eof`].
    #[inline]
    fn peek(&self) -> &'tok Token {
        let tokens = self.tokens;
        &tokens[self.cursor.min(tokens.len() - 1)]
    }

    /// Returns the current token and advances. Never moves past Eof.
    fn advance(&mut self) -> &'tok Token {
        let c = self.peek();
        if !c.is_eof() {
            self.cursor += 1;
        }
        c
    }

    /// Checks whether the current token matches the given one.
    fn is(&self, expect: TokenKind) -> bool {
        self.peek().kind == expect
    }

    /// Advances if the current token matches the provided one, returning true.
    /// If not, returns false and doesn't advance.
    fn take(&mut self, expect: TokenKind) -> bool {
        if self.is(expect) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Advances if the current token matches the provided one, returning it.
    /// If not, fails with the current token's span.
    fn consume(&mut self, expect: TokenKind) -> Result<&'tok Token> {
        let c = self.peek();
        if self.is(expect) {
            self.advance();
            Ok(c)
        } else {
            Err(c.span().wrap(Error::Unexpected {
                actual: c.kind,
                expected: expect,
            }))
        }
    }

    /// Returns true while the current token does *not* match one of the
    /// provided ones. [`TokenKind::Eof`] is implicitly included in the list.
    ///
    /// This won't advance the cursor.
    fn except(&self, except: impl IntoIterator<Item = TokenKind>) -> bool {
        let c = self.peek();
        for e in except {
            if c.kind == e {
                return false;
            }
        }
        c.kind != TokenKind::Eof
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    InvalidAssignmentTarget,
    /// A primary expression was required.
    UnexpectedTokenInExpr {
        token: TokenKind,
    },
    Unexpected {
        actual: TokenKind,
        expected: TokenKind,
    },
    ParseInt,
}

impl From<ParseIntError> for Error {
    fn from(_: ParseIntError) -> Self {
        Error::ParseInt
    }
}

#[cfg(test)]
mod tests {
    use crate::util::test_utils::tree_tests;

    tree_tests!(
        use parser;

        fn test_simple_expression() {
            let expr = "(1 * 2 + 3) - (1 + 2 * 3)";
            let tree_ok = "
                binary Sub (0..25)
                  binary Add (0..11)
                    binary Mul (1..6)
                      int 1 (1..2)
                      int 2 (5..6)
                    int 3 (9..10)
                  binary Add (14..25)
                    int 1 (15..16)
                    binary Mul (19..24)
                      int 2 (19..20)
                      int 3 (23..24)
            ";
        }

        fn test_identifier_expr() {
            let expr = "myVar";
            let tree_ok = "local myVar @8 (0..5)";
        }

        fn test_integer_literal_expr() {
            let expr = "12345";
            let tree_ok = "int 12345 (0..5)";
        }

        fn test_hex_literal_expr() {
            let expr = "0xef";
            let tree_ok = "int 239 (0..4)";
        }

        fn test_left_associative_sub() {
            let expr = "5 - 2 - 1";
            let tree_ok = "
                binary Sub (0..9)
                  binary Sub (0..5)
                    int 5 (0..1)
                    int 2 (4..5)
                  int 1 (8..9)
            ";
        }

        fn test_left_associative_div() {
            let expr = "8 / 4 / 2";
            let tree_ok = "
                binary Div (0..9)
                  binary Div (0..5)
                    int 8 (0..1)
                    int 4 (4..5)
                  int 2 (8..9)
            ";
        }

        fn test_unary_minus_expr() {
            let expr = "-3 + 4";
            let tree_ok = "
                binary Add (0..6)
                  binary Sub (0..2)
                    int 0 (0..1)
                    int 3 (1..2)
                  int 4 (5..6)
            ";
        }

        fn test_unary_plus_expr() {
            let expr = "+x";
            let tree_ok = "local x @8 (0..2)";
        }

        fn test_binary_less_than_expr() {
            let expr = "a < b";
            let tree_ok = "
                binary Lt (0..5)
                  local a @8 (0..1)
                  local b @16 (4..5)
            ";
        }

        fn test_binary_less_than_or_equal_expr() {
            let expr = "a <= b";
            let tree_ok = "
                binary Le (0..6)
                  local a @8 (0..1)
                  local b @16 (5..6)
            ";
        }

        fn test_binary_greater_than_swaps_operands() {
            let expr = "a > b";
            let tree_ok = "
                binary Lt (0..5)
                  local b @16 (4..5)
                  local a @8 (0..1)
            ";
        }

        fn test_binary_greater_than_or_equal_swaps_operands() {
            let expr = "a >= b";
            let tree_ok = "
                binary Le (0..6)
                  local b @16 (5..6)
                  local a @8 (0..1)
            ";
        }

        fn test_binary_equality_exprs() {
            let expr = "a == b != c";
            let tree_ok = "
                binary Ne (0..11)
                  binary Eq (0..6)
                    local a @8 (0..1)
                    local b @16 (5..6)
                  local c @24 (10..11)
            ";
        }

        fn test_precedence_arith_compare() {
            let expr = "a + b < c * d";
            let tree_ok = "
                binary Lt (0..13)
                  binary Add (0..5)
                    local a @8 (0..1)
                    local b @16 (4..5)
                  binary Mul (8..13)
                    local c @24 (8..9)
                    local d @32 (12..13)
            ";
        }

        fn test_assignment_expr() {
            let expr = "a = b";
            let tree_ok = "
                binary Assign (0..5)
                  local a @8 (0..1)
                  local b @16 (4..5)
            ";
        }

        fn test_precedence_assign() {
            let expr = "a = b = c + a";
            let tree_ok = "
                binary Assign (0..13)
                  local a @8 (0..1)
                  binary Assign (4..13)
                    local b @16 (4..5)
                    binary Add (8..13)
                      local c @24 (8..9)
                      local a @8 (12..13)
            ";
        }

        fn test_parenthesized_assignment_target() {
            let expr = "(a) = 1";
            let tree_ok = "
                binary Assign (0..7)
                  local a @8 (0..3)
                  int 1 (6..7)
            ";
        }

        fn test_return_stmt() {
            let program = "return 1+2;";
            let tree_ok = "
                return (0..11)
                  binary Add (7..10)
                    int 1 (7..8)
                    int 2 (9..10)
            ";
        }

        fn test_expression_stmts_share_locals() {
            let program = "foo = 1; bar = foo + 1; return bar;";
            let tree_ok = "
                local foo @8
                local bar @16
                expr (0..8)
                  binary Assign (0..7)
                    local foo @8 (0..3)
                    int 1 (6..7)
                expr (9..23)
                  binary Assign (9..22)
                    local bar @16 (9..12)
                    binary Add (15..22)
                      local foo @8 (15..18)
                      int 1 (21..22)
                return (24..35)
                  local bar @16 (31..34)
            ";
        }

        fn test_if_stmt() {
            let program = "if (1 == 1) return 2;";
            let tree_ok = "
                if (0..21)
                  binary Eq (4..10)
                    int 1 (4..5)
                    int 1 (9..10)
                  return (12..21)
                    int 2 (19..20)
            ";
        }

        fn test_if_else_stmt() {
            let program = "if (x) y = 1; else y = 2;";
            let tree_ok = "
                local x @8
                local y @16
                if (0..25)
                  local x @8 (4..5)
                  expr (7..13)
                    binary Assign (7..12)
                      local y @16 (7..8)
                      int 1 (11..12)
                  else
                    expr (19..25)
                      binary Assign (19..24)
                        local y @16 (19..20)
                        int 2 (23..24)
            ";
        }

        fn test_dangling_else_binds_to_inner_if() {
            let program = "if (1) if (2) 3; else 4;";
            let tree_ok = "
                if (0..24)
                  int 1 (4..5)
                  if (7..24)
                    int 2 (11..12)
                    expr (14..16)
                      int 3 (14..15)
                    else
                      expr (22..24)
                        int 4 (22..23)
            ";
        }

        fn test_while_stmt() {
            let program = "while (i < 5) i = i + 1;";
            let tree_ok = "
                local i @8
                while (0..24)
                  binary Lt (7..12)
                    local i @8 (7..8)
                    int 5 (11..12)
                  expr (14..24)
                    binary Assign (14..23)
                      local i @8 (14..15)
                      binary Add (18..23)
                        local i @8 (18..19)
                        int 1 (22..23)
            ";
        }

        fn test_for_stmt() {
            let program = "for (i = 0; i <= 9; i = i + 1) s = s + i;";
            let tree_ok = "
                local i @8
                local s @16
                for (0..41)
                  init
                    binary Assign (5..10)
                      local i @8 (5..6)
                      int 0 (9..10)
                  predicate
                    binary Le (12..18)
                      local i @8 (12..13)
                      int 9 (17..18)
                  step
                    binary Assign (20..29)
                      local i @8 (20..21)
                      binary Add (24..29)
                        local i @8 (24..25)
                        int 1 (28..29)
                  body
                    expr (31..41)
                      binary Assign (31..40)
                        local s @16 (31..32)
                        binary Add (35..40)
                          local s @16 (35..36)
                          local i @8 (39..40)
            ";
        }

        fn test_for_stmt_without_clauses() {
            let program = "for (;;) {}";
            let tree_ok = "
                for (0..11)
                  body
                    block (9..11)
            ";
        }

        fn test_block_stmt() {
            let program = "a = 0; { a; {} } return a;";
            let tree_ok = "
                local a @8
                expr (0..6)
                  binary Assign (0..5)
                    local a @8 (0..1)
                    int 0 (4..5)
                block (7..16)
                  expr (9..11)
                    local a @8 (9..10)
                  block (12..14)
                return (17..26)
                  local a @8 (24..25)
            ";
        }

        fn test_empty_program() {
            let program = "";
            let tree_ok = "";
        }

        fn test_error_missing_semicolon() {
            let program = "a = 1 return a;";
            let expected_errors = &["6..12: expected \";\", but got \"return\""];
        }

        fn test_error_missing_semicolon_at_end() {
            let program = "return 1";
            let expected_errors = &["8..8: expected \";\", but got end of input"];
        }

        fn test_error_expr_unexpected_token_in_expr() {
            let expr = "1 + ;";
            let expected_errors = &["4..5: expected an expression, but got \";\""];
        }

        fn test_error_expr_unmatched_paren_open() {
            let expr = "(1 + 2";
            let expected_errors = &["6..6: expected \")\", but got end of input"];
        }

        fn test_error_expr_unmatched_paren_close() {
            let expr = "1 + 2)";
            let expected_errors = &["5..6: expected end of input, but got \")\""];
        }

        fn test_error_stmt_unmatched_paren_close() {
            let program = "return (1 + 2));";
            let expected_errors = &["14..15: expected \";\", but got \")\""];
        }

        fn test_error_unclosed_block() {
            let program = "{ a = 1;";
            let expected_errors = &["8..8: expected \"}\", but got end of input"];
        }

        fn test_error_if_without_paren() {
            let program = "if 1 return 2;";
            let expected_errors = &["3..4: expected \"(\", but got number"];
        }

        fn test_error_double_negation() {
            let expr = "--1";
            let expected_errors = &["1..2: expected an expression, but got \"-\""];
        }

        fn test_error_invalid_assignment_target() {
            let expr = "1 = 2";
            let expected_errors = &["0..1: invalid assignment target"];
        }

        fn test_error_invalid_assignment_target_computed() {
            let program = "a = 1; a + 1 = 2;";
            let expected_errors = &["7..12: invalid assignment target"];
        }

        fn test_error_keyword_as_expression() {
            let program = "x = while;";
            let expected_errors = &["4..9: expected an expression, but got \"while\""];
        }
    );
}
