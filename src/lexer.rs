use crate::token::{Span, Spanned, Token, TokenKind, KEYWORDS, PUNCTUATORS};

type Result<T, E = Spanned<Error>> = std::result::Result<T, E>;

pub const SUGGESTED_TOKENS_CAPACITY: usize = 1_024;

/// Lexes the provided string, producing the tokens into the provided buffer.
///
/// On success the buffer ends with a single [`TokenKind::Eof`] token. Lexing
/// stops at the first character that can't start a token.
pub fn lex(src: &str, tokens: &mut Vec<Token>) -> Result<()> {
    Lexer::new(src, tokens).lex()
}

/// A convenience function that allocates a new buffer per lexed input and
/// returns it.
pub fn lex_in_new(src: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::with_capacity(SUGGESTED_TOKENS_CAPACITY);
    lex(src, &mut tokens)?;
    Ok(tokens)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    UnexpectedChar(char),
    /// A `0x`, `0o` or `0b` prefix not followed by any digit of its radix.
    MissingRadixDigits {
        radix: u32,
    },
    /// The literal doesn't fit in a machine word.
    NumberOutOfRange,
}

struct Lexer<'src, 'tok> {
    src: &'src str,
    cursor: usize,
    current_lo: usize,
    tokens: &'tok mut Vec<Token>,
}

impl Lexer<'_, '_> {
    /// Scans the source string until the input is exhausted or an error is
    /// found.
    fn lex(mut self) -> Result<()> {
        assert_eq!(self.tokens.len(), 0, "must pass clean tokens buffer");
        loop {
            self.whitespace();
            self.mark();
            let token = self.scan_token()?;
            let is_eof = token.is_eof();
            self.tokens.push(token);
            if is_eof {
                break;
            }
        }
        log::debug!("lexed {} tokens", self.tokens.len());
        Ok(())
    }

    /// Tries to scan a token starting at the current character.
    fn scan_token(&mut self) -> Result<Token> {
        let Some(c) = self.peek() else {
            return Ok(self.produce(TokenKind::Eof));
        };
        if let Some(kind) = self.punctuator() {
            return Ok(self.produce(kind));
        }
        match c {
            c if c.is_ascii_digit() => self.number(),
            c if c.is_ascii_alphabetic() || c == '_' => Ok(self.identifier_or_keyword()),
            c => {
                self.advance();
                Err(self.span().wrap(Error::UnexpectedChar(c)))
            }
        }
    }

    /// Matches the operator table in order, so two-character operators win
    /// over their one-character prefixes.
    fn punctuator(&mut self) -> Option<TokenKind> {
        let rest = self.rest();
        let &(symbol, kind) = PUNCTUATORS
            .iter()
            .find(|(symbol, _)| rest.starts_with(symbol))?;
        self.cursor += symbol.len();
        Some(kind)
    }

    fn number(&mut self) -> Result<Token> {
        let radix = match self.rest().as_bytes() {
            [b'0', b'x', ..] => 16,
            [b'0', b'o', ..] => 8,
            [b'0', b'b', ..] => 2,
            _ => 10,
        };
        if radix != 10 {
            self.cursor += 2;
        }

        let digits_lo = self.cursor;
        while self.peek().is_some_and(|c| c.is_digit(radix)) {
            self.advance();
        }
        let digits = &self.src[digits_lo..self.cursor];
        if digits.is_empty() {
            return Err(self.span().wrap(Error::MissingRadixDigits { radix }));
        }

        let Ok(value) = i64::from_str_radix(digits, radix) else {
            return Err(self.span().wrap(Error::NumberOutOfRange));
        };
        Ok(Token::new(TokenKind::Number, value.to_string(), self.span()))
    }

    fn identifier_or_keyword(&mut self) -> Token {
        let valid_identifier_suffix = |c: char| c.is_ascii_alphanumeric() || c == '_';

        while self.peek().is_some_and(valid_identifier_suffix) {
            self.advance();
        }
        let kind = KEYWORDS
            .get(self.substr())
            .copied()
            .unwrap_or(TokenKind::Identifier);
        self.produce(kind)
    }

    fn whitespace(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t' | '\n' | '\r')) {
            self.advance();
        }
    }
}

impl Lexer<'_, '_> {
    /// Constructs a new lexer with the default state.
    fn new<'src, 'tok>(src: &'src str, tokens: &'tok mut Vec<Token>) -> Lexer<'src, 'tok> {
        Lexer {
            src,
            cursor: 0,
            current_lo: 0,
            tokens,
        }
    }

    /// Starts a new token "mark" at the cursor.
    fn mark(&mut self) {
        self.current_lo = self.cursor;
    }

    /// Advances past the current character.
    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.cursor += c.len_utf8();
        }
    }

    /// Returns the current character without advancing.
    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// The not yet scanned part of the input.
    fn rest(&self) -> &str {
        &self.src[self.cursor..]
    }

    /// Returns the current span.
    fn span(&self) -> Span {
        Span::new_of_bounds(self.current_lo..self.cursor)
    }

    /// Returns the substring of the current marked bounds.
    fn substr(&self) -> &str {
        self.span().substr(self.src)
    }

    /// Produces a token using the marked bounds, with its text as lexeme.
    fn produce(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.substr(), self.span())
    }
}
