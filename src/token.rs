use std::fmt;

/// Char offsets into the tokenized text, `end` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Token kinds produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Line comment (`# ...`).
    Comment,
    /// Double-quoted string, or a literal run inside one.
    String,
    /// Reserved control-flow or declaration word.
    Keyword,
    /// `TRUE` or `FALSE`.
    Boolean,
    /// Unsigned integer or decimal literal.
    Number,
    /// Symbolic or word operator.
    Operator,
    /// Brackets, braces, parentheses, comma.
    Punctuation,
    /// Primitive type name.
    Type,
    /// `{...}` block embedded in a string.
    Interpolation,
    /// The braces delimiting an interpolation block.
    InterpolationPunctuation,
    /// Identifiers, whitespace, and anything unclassified.
    Plain,
}

impl TokenKind {
    /// Stable lowercase name, used as the presentation class.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Comment => "comment",
            Self::String => "string",
            Self::Keyword => "keyword",
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::Operator => "operator",
            Self::Punctuation => "punctuation",
            Self::Type => "type",
            Self::Interpolation => "interpolation",
            Self::InterpolationPunctuation => "interpolation-punctuation",
            Self::Plain => "plain",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified span of source text.
///
/// `children` is empty unless the token has inner structure: a string
/// with interpolation blocks, or an interpolation block itself. When
/// present, the children partition `text` exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
    pub children: Vec<Self>,
}

impl Token {
    /// True for tokens that carry a nested token sequence.
    #[must_use]
    pub const fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Concatenate token texts back into source text.
#[must_use]
pub fn detokenize(tokens: &[Token]) -> String {
    tokens.iter().map(|t| t.text.as_str()).collect()
}
