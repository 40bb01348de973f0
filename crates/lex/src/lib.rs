//! A minimal tokenizer for Xvr source text.
//!
//! This crate exists so the workspace is runnable end to end; the
//! language's actual lexical grammar is an external contract the
//! compiler/VM core doesn't own. Keep it thin — anything beyond turning
//! characters into tokens belongs in `xvr-parse`.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Integer(i32),
    Float(f32),
    String(String),
    Identifier(String),

    Var,
    Const,
    If,
    Else,
    While,
    Break,
    Continue,
    Print,
    Assert,
    True,
    False,
    Null,
    TypeName(String), // int, float, string, bool, array, table, any

    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    PlusPlus,
    MinusMinus,
    PlusEqual,
    MinusEqual,
    StarEqual,
    SlashEqual,
    PercentEqual,
    DotDotEqual,
    Dot,
    DotDot,
    Equal,
    EqualEqual,
    Bang,
    BangEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    AmpAmp,
    PipePipe,

    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Semicolon,

    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub message: String,
    pub line: usize,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for LexError {}

const TYPE_NAMES: &[&str] = &["int", "float", "string", "bool", "array", "table", "any"];

pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    let mut line = 1;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\r' => i += 1,
            '\n' => {
                line += 1;
                i += 1;
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '0'..='9' => {
                let start = i;
                let mut is_float = false;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    if chars[i] == '.' {
                        if is_float || chars.get(i + 1) == Some(&'.') {
                            break; // `..` slice operator, not a decimal point
                        }
                        is_float = true;
                    }
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                if is_float {
                    let value: f32 = text.parse().map_err(|_| LexError {
                        message: format!("malformed float literal `{text}`"),
                        line,
                    })?;
                    tokens.push(Token::Float(value));
                } else {
                    let value: i32 = text.parse().map_err(|_| LexError {
                        message: format!("malformed integer literal `{text}`"),
                        line,
                    })?;
                    tokens.push(Token::Integer(value));
                }
            }
            '"' => {
                i += 1;
                let start = i;
                while i < chars.len() && chars[i] != '"' {
                    if chars[i] == '\n' {
                        line += 1;
                    }
                    i += 1;
                }
                if i >= chars.len() {
                    return Err(LexError {
                        message: "unterminated string literal".to_string(),
                        line,
                    });
                }
                let text: String = chars[start..i].iter().collect();
                i += 1; // closing quote
                tokens.push(Token::String(text));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                tokens.push(match text.as_str() {
                    "var" => Token::Var,
                    "const" => Token::Const,
                    "if" => Token::If,
                    "else" => Token::Else,
                    "while" => Token::While,
                    "break" => Token::Break,
                    "continue" => Token::Continue,
                    "print" => Token::Print,
                    "assert" => Token::Assert,
                    "true" => Token::True,
                    "false" => Token::False,
                    "null" => Token::Null,
                    t if TYPE_NAMES.contains(&t) => Token::TypeName(t.to_string()),
                    _ => Token::Identifier(text),
                });
            }
            _ => {
                let two: Option<char> = chars.get(i + 1).copied();
                let (token, width) = match (c, two) {
                    ('+', Some('+')) => (Token::PlusPlus, 2),
                    ('-', Some('-')) => (Token::MinusMinus, 2),
                    ('+', Some('=')) => (Token::PlusEqual, 2),
                    ('-', Some('=')) => (Token::MinusEqual, 2),
                    ('*', Some('=')) => (Token::StarEqual, 2),
                    ('/', Some('=')) => (Token::SlashEqual, 2),
                    ('%', Some('=')) => (Token::PercentEqual, 2),
                    ('=', Some('=')) => (Token::EqualEqual, 2),
                    ('!', Some('=')) => (Token::BangEqual, 2),
                    ('<', Some('=')) => (Token::LessEqual, 2),
                    ('>', Some('=')) => (Token::GreaterEqual, 2),
                    ('&', Some('&')) => (Token::AmpAmp, 2),
                    ('|', Some('|')) => (Token::PipePipe, 2),
                    ('.', Some('.')) => {
                        if chars.get(i + 2) == Some(&'=') {
                            (Token::DotDotEqual, 3)
                        } else {
                            (Token::DotDot, 2)
                        }
                    }
                    ('+', _) => (Token::Plus, 1),
                    ('-', _) => (Token::Minus, 1),
                    ('*', _) => (Token::Star, 1),
                    ('/', _) => (Token::Slash, 1),
                    ('%', _) => (Token::Percent, 1),
                    ('.', _) => (Token::Dot, 1),
                    ('=', _) => (Token::Equal, 1),
                    ('!', _) => (Token::Bang, 1),
                    ('<', _) => (Token::Less, 1),
                    ('>', _) => (Token::Greater, 1),
                    ('(', _) => (Token::LParen, 1),
                    (')', _) => (Token::RParen, 1),
                    ('{', _) => (Token::LBrace, 1),
                    ('}', _) => (Token::RBrace, 1),
                    ('[', _) => (Token::LBracket, 1),
                    (']', _) => (Token::RBracket, 1),
                    (',', _) => (Token::Comma, 1),
                    (':', _) => (Token::Colon, 1),
                    (';', _) => (Token::Semicolon, 1),
                    _ => {
                        return Err(LexError {
                            message: format!("unexpected character `{c}`"),
                            line,
                        })
                    }
                };
                tokens.push(token);
                i += width;
            }
        }
    }

    tokens.push(Token::Eof);
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_an_arithmetic_expression() {
        let tokens = tokenize("(1 + 2) * 3;").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::LParen,
                Token::Integer(1),
                Token::Plus,
                Token::Integer(2),
                Token::RParen,
                Token::Star,
                Token::Integer(3),
                Token::Semicolon,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn distinguishes_slice_dotdot_from_float() {
        let tokens = tokenize("3.5 1..2").unwrap();
        assert_eq!(tokens[0], Token::Float(3.5));
        assert_eq!(tokens[1], Token::Integer(1));
        assert_eq!(tokens[2], Token::DotDot);
        assert_eq!(tokens[3], Token::Integer(2));
    }

    #[test]
    fn keywords_and_identifiers_are_distinguished() {
        let tokens = tokenize("var int x").unwrap();
        assert_eq!(tokens[0], Token::Var);
        assert_eq!(tokens[1], Token::TypeName("int".to_string()));
        assert_eq!(tokens[2], Token::Identifier("x".to_string()));
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert!(tokenize("\"abc").is_err());
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn integer_literal_round_trips_through_the_token_stream(n in 0i32..i32::MAX) {
            // The lexer only reads unsigned digit runs; a leading `-` is
            // the parser's unary negate, not part of the literal token.
            let source = n.to_string();
            let tokens = tokenize(&source).unwrap();
            prop_assert_eq!(&tokens[..tokens.len() - 1], &[Token::Integer(n)]);
        }

        #[test]
        fn string_literal_contents_survive_unchanged(s in "[a-zA-Z0-9 ]{0,32}") {
            let source = format!("\"{s}\"");
            let tokens = tokenize(&source).unwrap();
            prop_assert_eq!(&tokens[..tokens.len() - 1], &[Token::String(s)]);
        }
    }
}
