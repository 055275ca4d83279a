//! Hand-written lexer for the MiniScript dialect.
//!
//! Keywords come out as their own tokens, everything else that looks like
//! a name is an `Ident`. Comments are kept (the beautifier puts them back)
//! and so are line breaks, which terminate statements.
//
//  Lexical items (informal):
//
//      Ident     ::= [A-Za-z_\u{a0}-][A-Za-z0-9_\u{a0}-]*
//      Number    ::= [0-9]* ('.' [0-9]+)? ([eE] [+-]? [0-9]+)?
//      String    ::= '"' ( [^"] | '""' )* '"'
//      Directive ::= '#' Ident
//      Comment   ::= '//' .* EOL

use std::iter::Peekable;
use std::str::Chars;

use super::ast::{Position, Range};
use crate::error::BuildError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    /// Raw number text.
    Number(String),
    /// Raw string text, quotes included.
    Str(String),
    /// `#name`, without the hash.
    Directive(String),
    /// Comment text after `//`.
    Comment(String),

    // Keywords
    If,
    Then,
    Else,
    End,
    While,
    For,
    In,
    Function,
    Return,
    Break,
    Continue,
    And,
    Or,
    Not,
    Isa,
    New,
    True,
    False,
    Null,

    // Punctuation
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Dot,
    At,
    Semicolon,

    // Operators
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    CaretAssign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    EqEq,
    NotEq,
    Lt,
    Gt,
    Le,
    Ge,
    Pipe,
    Amp,
    Shl,
    Shr,
    UShr,

    Newline,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub range: Range,
    /// Whitespace directly precedes this token. `f (x)` and `f(x)` differ.
    pub after_space: bool,
}

/// Tokenise a whole file. The result always ends with `Token::Eof`.
pub fn lex(src: &str) -> Result<Vec<SpannedToken>, BuildError> {
    Lexer::new(src).collect()
}

fn keyword(ident: &str) -> Option<Token> {
    let token = match ident {
        "if" => Token::If,
        "then" => Token::Then,
        "else" => Token::Else,
        "end" => Token::End,
        "while" => Token::While,
        "for" => Token::For,
        "in" => Token::In,
        "function" => Token::Function,
        "return" => Token::Return,
        "break" => Token::Break,
        "continue" => Token::Continue,
        "and" => Token::And,
        "or" => Token::Or,
        "not" => Token::Not,
        "isa" => Token::Isa,
        "new" => Token::New,
        "true" => Token::True,
        "false" => Token::False,
        "null" => Token::Null,
        _ => return None,
    };
    Some(token)
}

pub fn is_keyword(ident: &str) -> bool {
    keyword(ident).is_some()
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || (c as u32) > 0x9F
}

fn is_ident_char(c: char) -> bool {
    is_ident_start(c) || c.is_ascii_digit()
}

#[derive(Clone)]
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    column: usize,
    /// Whether the last token produced can end a value (`a.5` is not a number).
    after_value: bool,
    finished: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            chars: src.chars().peekable(),
            line: 1,
            column: 1,
            after_value: false,
            finished: false,
        }
    }

    fn here(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
        }
    }

    fn next_char(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn peek_second(&self) -> Option<char> {
        let mut ahead = self.chars.clone();
        ahead.next();
        ahead.next()
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek_char() == Some(expected) {
            self.next_char();
            true
        } else {
            false
        }
    }

    fn consume_while<F: Fn(char) -> bool>(&mut self, pred: F, buf: &mut String) {
        while let Some(c) = self.peek_char() {
            if pred(c) {
                buf.push(c);
                self.next_char();
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self, first: char) -> String {
        let mut id = String::new();
        id.push(first);
        self.consume_while(is_ident_char, &mut id);
        id
    }

    fn read_number(&mut self, first: char) -> String {
        let mut num = String::new();
        num.push(first);
        self.consume_while(|c| c.is_ascii_digit(), &mut num);
        if first != '.'
            && self.peek_char() == Some('.')
            && self.peek_second().is_some_and(|c| c.is_ascii_digit())
        {
            num.push('.');
            self.next_char();
            self.consume_while(|c| c.is_ascii_digit(), &mut num);
        }
        if matches!(self.peek_char(), Some('e' | 'E')) {
            let sign_or_digit = self.peek_second();
            if sign_or_digit.is_some_and(|c| c.is_ascii_digit() || c == '+' || c == '-') {
                num.extend(self.next_char());
                if matches!(self.peek_char(), Some('+' | '-')) {
                    num.extend(self.next_char());
                }
                self.consume_while(|c| c.is_ascii_digit(), &mut num);
            }
        }
        num
    }

    fn read_string(&mut self, start: Position) -> Result<String, BuildError> {
        let mut raw = String::from("\"");
        loop {
            match self.next_char() {
                Some('"') => {
                    raw.push('"');
                    if self.peek_char() == Some('"') {
                        raw.push('"');
                        self.next_char();
                    } else {
                        return Ok(raw);
                    }
                }
                Some(c) => raw.push(c),
                None => {
                    return Err(BuildError::parse(
                        "unterminated string literal",
                        Range::new(start, self.here()),
                    ));
                }
            }
        }
    }

    fn read_comment(&mut self) -> String {
        let mut text = String::new();
        self.consume_while(|c| c != '\n' && c != '\r', &mut text);
        text
    }

    /// Pick between `op` and `op=`.
    fn with_assign(&mut self, plain: Token, assign: Token) -> Token {
        if self.eat('=') { assign } else { plain }
    }

    fn scan(&mut self, ch: char, start: Position, after_space: bool) -> Result<Token, BuildError> {
        let token = match ch {
            '\n' => Token::Newline,
            ';' => Token::Semicolon,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            ',' => Token::Comma,
            ':' => Token::Colon,
            '@' => Token::At,
            '+' => self.with_assign(Token::Plus, Token::PlusAssign),
            '-' => self.with_assign(Token::Minus, Token::MinusAssign),
            '*' => self.with_assign(Token::Star, Token::StarAssign),
            '%' => self.with_assign(Token::Percent, Token::PercentAssign),
            '^' => self.with_assign(Token::Caret, Token::CaretAssign),
            '|' => Token::Pipe,
            '&' => Token::Amp,
            '/' => {
                if self.eat('/') {
                    Token::Comment(self.read_comment())
                } else {
                    self.with_assign(Token::Slash, Token::SlashAssign)
                }
            }
            '=' => self.with_assign(Token::Assign, Token::EqEq),
            '!' => {
                if self.eat('=') {
                    Token::NotEq
                } else {
                    return Err(BuildError::parse(
                        "expected '=' after '!'",
                        Range::new(start, self.here()),
                    ));
                }
            }
            '<' => {
                if self.eat('<') {
                    Token::Shl
                } else {
                    self.with_assign(Token::Lt, Token::Le)
                }
            }
            '>' => {
                if self.eat('>') {
                    if self.eat('>') { Token::UShr } else { Token::Shr }
                } else {
                    self.with_assign(Token::Gt, Token::Ge)
                }
            }
            '"' => Token::Str(self.read_string(start)?),
            '#' => match self.peek_char() {
                Some(c) if is_ident_start(c) => {
                    self.next_char();
                    Token::Directive(self.read_identifier(c))
                }
                _ => {
                    return Err(BuildError::parse(
                        "expected directive name after '#'",
                        Range::new(start, self.here()),
                    ));
                }
            },
            '.' => {
                if (!self.after_value || after_space) && self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                    Token::Number(self.read_number('.'))
                } else {
                    Token::Dot
                }
            }
            c if c.is_ascii_digit() => Token::Number(self.read_number(c)),
            c if is_ident_start(c) => {
                let ident = self.read_identifier(c);
                keyword(&ident).unwrap_or(Token::Ident(ident))
            }
            e => {
                return Err(BuildError::parse(
                    format!("unexpected character {e:?}"),
                    Range::new(start, self.here()),
                ));
            }
        };
        Ok(token)
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<SpannedToken, BuildError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        // Skip whitespace that isn't a newline
        let mut after_space = false;
        while let Some(c) = self.peek_char() {
            if c == ' ' || c == '\t' || c == '\r' {
                after_space = true;
                self.next_char();
            } else {
                break;
            }
        }

        let start = self.here();
        let ch = match self.next_char() {
            Some(c) => c,
            None => {
                self.finished = true;
                return Some(Ok(SpannedToken {
                    token: Token::Eof,
                    range: Range::new(start, start),
                    after_space,
                }));
            }
        };

        let result = self.scan(ch, start, after_space).map(|token| {
            self.after_value = matches!(
                token,
                Token::Ident(_)
                    | Token::Number(_)
                    | Token::Str(_)
                    | Token::RParen
                    | Token::RBracket
                    | Token::RBrace
                    | Token::True
                    | Token::False
                    | Token::Null
            );
            SpannedToken {
                token,
                range: Range::new(start, self.here()),
                after_space,
            }
        });
        if result.is_err() {
            self.finished = true;
        }
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::{Token, lex};

    fn tokens(src: &str) -> Vec<Token> {
        lex(src)
            .expect("lexes")
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    #[test]
    fn test_tokenisation() {
        let test_cases = vec![
            (
                "a = 42",
                vec![
                    Token::Ident("a".into()),
                    Token::Assign,
                    Token::Number("42".into()),
                    Token::Eof,
                ],
            ),
            (
                "print \"say \"\"hi\"\"\"",
                vec![
                    Token::Ident("print".into()),
                    Token::Str("\"say \"\"hi\"\"\"".into()),
                    Token::Eof,
                ],
            ),
            (
                "x = a << 2 >>> b >> c",
                vec![
                    Token::Ident("x".into()),
                    Token::Assign,
                    Token::Ident("a".into()),
                    Token::Shl,
                    Token::Number("2".into()),
                    Token::UShr,
                    Token::Ident("b".into()),
                    Token::Shr,
                    Token::Ident("c".into()),
                    Token::Eof,
                ],
            ),
        ];

        for (src, expected) in test_cases {
            assert_eq!(tokens(src), expected, "source: {src}");
        }
    }

    #[test]
    fn test_keywords_and_directives() {
        assert_eq!(
            tokens("#import lib from \"lib.src\"\nend if"),
            vec![
                Token::Directive("import".into()),
                Token::Ident("lib".into()),
                Token::Ident("from".into()),
                Token::Str("\"lib.src\"".into()),
                Token::Newline,
                Token::End,
                Token::If,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_are_kept() {
        assert_eq!(
            tokens("a += 1 // bump"),
            vec![
                Token::Ident("a".into()),
                Token::PlusAssign,
                Token::Number("1".into()),
                Token::Comment(" bump".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            tokens("1.5 .25 2e10 a.b"),
            vec![
                Token::Number("1.5".into()),
                Token::Number(".25".into()),
                Token::Number("2e10".into()),
                Token::Ident("a".into()),
                Token::Dot,
                Token::Ident("b".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_tracks_positions_and_spacing() {
        let toks = lex("f (x)\n  y").expect("lexes");
        assert!(!toks[0].after_space);
        assert!(toks[1].after_space);
        let y = &toks[5];
        assert_eq!(y.token, Token::Ident("y".into()));
        assert_eq!(y.range.start.line, 2);
        assert_eq!(y.range.start.column, 3);
    }

    #[test]
    fn test_unterminated_string_fails() {
        let err = lex("a = \"oops").unwrap_err();
        assert!(err.message.contains("unterminated"), "got: {err}");
    }
}
