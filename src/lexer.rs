use crate::token::{Span, Token, TokenKind};

const KEYWORDS: &[&str] = &[
    "IF",
    "THEN",
    "ELSE",
    "ENDIF",
    "FOR",
    "FROM",
    "TO",
    "DO",
    "ENDFOR",
    "WHILE",
    "ENDWHILE",
    "FUNCTION",
    "ENDFUNCTION",
    "RETURN",
    "ARRAY",
    "PRINT",
    "CALL",
];

const BOOLEANS: &[&str] = &["TRUE", "FALSE"];

const TYPES: &[&str] = &["INTEGER", "REAL", "STRING", "BOOLEAN", "CHAR"];

const WORD_OPERATORS: &[&str] = &["AND", "OR", "NOT"];

/// Tokenize pseudocode source into a lossless token stream.
///
/// Never fails: unterminated strings and comments run to end of
/// input, unbalanced interpolation braces stay literal string
/// content, and anything unclassified becomes a `Plain` token.
#[must_use]
pub fn tokenize(input: &str) -> Vec<Token> {
    let chars: Vec<char> = input.chars().collect();
    Lexer::new(&chars, 0).tokenize()
}

struct Lexer<'a> {
    input: &'a [char],
    /// Absolute offset of `input[0]` in the top-level text.
    base: usize,
    pos: usize,
}

impl<'a> Lexer<'a> {
    const fn new(input: &'a [char], base: usize) -> Self {
        Self {
            input,
            base,
            pos: 0,
        }
    }

    fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        while let Some(ch) = self.peek() {
            let token = match ch {
                '#' => self.read_comment(),
                '"' => self.read_string(),
                c if c.is_whitespace() => self.read_whitespace(),
                c if c.is_ascii_digit() => self.read_number(),
                c if is_word_char(c) => self.read_word(),
                _ => self.read_symbol(),
            };
            tokens.push(token);
        }

        tokens
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }

    fn consume_while(&mut self, pred: impl Fn(char) -> bool) {
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
    }

    fn make_token(&self, kind: TokenKind, start: usize, end: usize) -> Token {
        Token {
            kind,
            text: self.input[start..end].iter().collect(),
            span: Span::new(self.base + start, self.base + end),
            children: Vec::new(),
        }
    }

    fn read_comment(&mut self) -> Token {
        let start = self.pos;
        self.consume_while(|c| c != '\n');
        self.make_token(TokenKind::Comment, start, self.pos)
    }

    fn read_whitespace(&mut self) -> Token {
        let start = self.pos;
        self.consume_while(char::is_whitespace);
        self.make_token(TokenKind::Plain, start, self.pos)
    }

    fn read_word(&mut self) -> Token {
        let start = self.pos;
        self.consume_while(is_word_char);
        let word: String = self.input[start..self.pos].iter().collect();
        self.make_token(classify_word(&word), start, self.pos)
    }

    fn read_number(&mut self) -> Token {
        let start = self.pos;
        self.consume_while(is_word_char);

        // digits fused with letters are an identifier-like word
        if !self.input[start..self.pos].iter().all(char::is_ascii_digit) {
            return self.make_token(TokenKind::Plain, start, self.pos);
        }

        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            let save_pos = self.pos;
            self.pos += 1; // skip '.'
            let frac_start = self.pos;
            self.consume_while(is_word_char);
            if !self.input[frac_start..self.pos]
                .iter()
                .all(char::is_ascii_digit)
            {
                self.pos = save_pos;
            }
        }

        self.make_token(TokenKind::Number, start, self.pos)
    }

    fn read_symbol(&mut self) -> Token {
        let start = self.pos;
        let ch = self.input[self.pos];
        self.pos += 1;

        let kind = match ch {
            '+' | '-' | '*' | '/' | '=' | '<' | '>' | '!' => {
                if self.peek() == Some('=') {
                    self.pos += 1;
                }
                TokenKind::Operator
            }
            '%' | '&' | '|' | '^' | '~' => TokenKind::Operator,
            '(' | ')' | '{' | '}' | '[' | ']' | ',' => TokenKind::Punctuation,
            _ => TokenKind::Plain,
        };

        self.make_token(kind, start, self.pos)
    }

    fn read_string(&mut self) -> Token {
        let start = self.pos;
        self.pos += 1; // skip opening quote

        let mut terminated = false;
        while let Some(ch) = self.peek() {
            match ch {
                '\\' => {
                    self.pos += 1;
                    if self.peek().is_some() {
                        self.pos += 1;
                    }
                }
                '"' => {
                    self.pos += 1;
                    terminated = true;
                    break;
                }
                _ => self.pos += 1,
            }
        }

        let interior_end = if terminated { self.pos - 1 } else { self.pos };
        let mut token = self.make_token(TokenKind::String, start, self.pos);
        token.children = self.split_interpolations(start, start + 1, interior_end, self.pos);
        token
    }

    /// Split a string's text into literal runs and interpolation
    /// blocks. Returns no children when the string has no block.
    fn split_interpolations(
        &self,
        start: usize,
        interior_start: usize,
        interior_end: usize,
        end: usize,
    ) -> Vec<Token> {
        let mut children = Vec::new();
        let mut literal = start;
        let mut i = interior_start;

        while i < interior_end {
            match self.input[i] {
                '\\' => i += 2,
                '{' => {
                    let Some(close) = self.matching_brace(i, interior_end) else {
                        // unbalanced: rest of the string is literal
                        break;
                    };
                    if literal < i {
                        children.push(self.make_token(TokenKind::String, literal, i));
                    }
                    children.push(self.read_interpolation(i, close));
                    i = close + 1;
                    literal = i;
                }
                _ => i += 1,
            }
        }

        if children.is_empty() {
            return children;
        }
        if literal < end {
            children.push(self.make_token(TokenKind::String, literal, end));
        }
        children
    }

    fn matching_brace(&self, open: usize, limit: usize) -> Option<usize> {
        let mut depth = 0usize;
        let mut i = open;

        while i < limit {
            match self.input[i] {
                '\\' => {
                    i += 2;
                    continue;
                }
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
            i += 1;
        }

        None
    }

    fn read_interpolation(&self, open: usize, close: usize) -> Token {
        let inner = Lexer::new(&self.input[open + 1..close], self.base + open + 1).tokenize();

        let mut children = Vec::with_capacity(inner.len() + 2);
        children.push(self.make_token(TokenKind::InterpolationPunctuation, open, open + 1));
        children.extend(inner);
        children.push(self.make_token(TokenKind::InterpolationPunctuation, close, close + 1));

        let mut token = self.make_token(TokenKind::Interpolation, open, close + 1);
        token.children = children;
        token
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn classify_word(word: &str) -> TokenKind {
    if KEYWORDS.contains(&word) {
        TokenKind::Keyword
    } else if BOOLEANS.contains(&word) {
        TokenKind::Boolean
    } else if TYPES.contains(&word) {
        TokenKind::Type
    } else if WORD_OPERATORS.contains(&word) {
        TokenKind::Operator
    } else {
        TokenKind::Plain
    }
}
