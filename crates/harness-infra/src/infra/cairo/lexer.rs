use logos::Logos;

/// Byte range in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn to(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub span: Span,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Logos)]
pub enum TokenKind {
    #[regex(r"#[^\n]*", logos::skip)]
    #[regex(r"//[^\n]*", logos::skip)]
    #[regex(r"[ \t\r\n]+", logos::skip)]
    #[error]
    Error,

    #[regex("[a-zA-Z_][a-zA-Z0-9_]*")]
    Name,
    #[regex("[0-9]+")]
    Int,
    #[regex("0[xX][0-9a-fA-F]+")]
    Hex,
    #[regex(r"'[^'\n]*'")]
    ShortString,
    #[regex(r"'[^'\n]*")]
    UnterminatedString,

    #[token("func")]
    Func,
    #[token("end")]
    End,
    #[token("return")]
    Return,
    #[token("let")]
    Let,
    #[token("tempvar")]
    Tempvar,
    #[token("local")]
    Local,
    #[token("assert")]
    Assert,
    #[token("from")]
    From,
    #[token("import")]
    Import,

    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token("{")]
    BraceOpen,
    #[token("}")]
    BraceClose,
    #[token(":")]
    Colon,
    #[token(",")]
    Comma,
    #[token("=")]
    Eq,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token(".")]
    Dot,
    #[token("@")]
    At,
    #[token("%")]
    Percent,
    #[token("->")]
    Arrow,
}

impl TokenKind {
    pub fn describe(&self) -> &'static str {
        match self {
            TokenKind::Error => "invalid character",
            TokenKind::Name => "identifier",
            TokenKind::Int | TokenKind::Hex => "integer",
            TokenKind::ShortString => "short string",
            TokenKind::UnterminatedString => "unterminated string",
            TokenKind::Func => "'func'",
            TokenKind::End => "'end'",
            TokenKind::Return => "'return'",
            TokenKind::Let => "'let'",
            TokenKind::Tempvar => "'tempvar'",
            TokenKind::Local => "'local'",
            TokenKind::Assert => "'assert'",
            TokenKind::From => "'from'",
            TokenKind::Import => "'import'",
            TokenKind::ParenOpen => "'('",
            TokenKind::ParenClose => "')'",
            TokenKind::BraceOpen => "'{'",
            TokenKind::BraceClose => "'}'",
            TokenKind::Colon => "':'",
            TokenKind::Comma => "','",
            TokenKind::Eq => "'='",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::Slash => "'/'",
            TokenKind::Dot => "'.'",
            TokenKind::At => "'@'",
            TokenKind::Percent => "'%'",
            TokenKind::Arrow => "'->'",
        }
    }
}

#[derive(Clone)]
pub struct Lexer<'a> {
    inner: logos::Lexer<'a, TokenKind>,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Lexer<'a> {
        Lexer {
            inner: TokenKind::lexer(src),
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let kind = self.inner.next()?;
        let span = self.inner.span();
        Some(Token {
            kind,
            text: self.inner.slice(),
            span: Span::new(span.start, span.end),
        })
    }
}

/// Maps byte offsets to 1-based line and column numbers.
#[derive(Debug, Clone)]
pub struct SourceMap {
    line_starts: Vec<usize>,
}

impl SourceMap {
    pub fn new(src: &str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(src.match_indices('\n').map(|(index, _)| index + 1))
            .collect();
        Self { line_starts }
    }

    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        (line + 1, offset - self.line_starts[line] + 1)
    }

    pub fn line(&self, offset: usize) -> usize {
        self.line_col(offset).0
    }
}
