//! Tokenizer for the jq-style query language.
//!
//! String interpolation is lexed flat: `"a\(.x)b"` becomes `InterpStart("a")`, the tokens
//! of `.x`, then `InterpEnd("b")`, with `InterpMid` between consecutive interpolations.

use state_error::{StateError, StateResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Dot,
    DotDot,
    /// `.name`
    Field(String),
    Ident(String),
    Str(String),
    InterpStart(String),
    InterpMid(String),
    InterpEnd(String),
    Num(f64),
    LBracket,
    RBracket,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Pipe,
    Comma,
    Colon,
    Semicolon,
    Question,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Alt,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
}

/// How a string segment ended.
enum SegmentEnd {
    Quote,
    Interpolation,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn parse_err(msg: impl Into<String>) -> StateError {
    StateError::QueryParse(msg.into())
}

pub fn tokenize(src: &str) -> StateResult<Vec<Token>> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    // Open-paren count inside each active `\( ... )`, innermost last.
    let mut interpolations: Vec<usize> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        let (token, width) = match c {
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            '.' => match next {
                Some('.') => (Token::DotDot, 2),
                Some(n) if is_ident_start(n) => {
                    let (ident, end) = read_ident(&chars, i + 1);
                    tokens.push(Token::Field(ident));
                    i = end;
                    continue;
                }
                _ => (Token::Dot, 1),
            },
            '"' => {
                let (text, end, how) = read_segment(&chars, i + 1)?;
                match how {
                    SegmentEnd::Quote => tokens.push(Token::Str(text)),
                    SegmentEnd::Interpolation => {
                        tokens.push(Token::InterpStart(text));
                        interpolations.push(0);
                    }
                }
                i = end;
                continue;
            }
            '(' => {
                if let Some(open) = interpolations.last_mut() {
                    *open += 1;
                }
                (Token::LParen, 1)
            }
            ')' if interpolations.last() == Some(&0) => {
                interpolations.pop();
                let (text, end, how) = read_segment(&chars, i + 1)?;
                match how {
                    SegmentEnd::Quote => tokens.push(Token::InterpEnd(text)),
                    SegmentEnd::Interpolation => {
                        tokens.push(Token::InterpMid(text));
                        interpolations.push(0);
                    }
                }
                i = end;
                continue;
            }
            ')' => {
                if let Some(open) = interpolations.last_mut() {
                    *open -= 1;
                }
                (Token::RParen, 1)
            }
            '[' => (Token::LBracket, 1),
            ']' => (Token::RBracket, 1),
            '{' => (Token::LBrace, 1),
            '}' => (Token::RBrace, 1),
            '|' => (Token::Pipe, 1),
            ',' => (Token::Comma, 1),
            ':' => (Token::Colon, 1),
            ';' => (Token::Semicolon, 1),
            '?' => (Token::Question, 1),
            '=' if next == Some('=') => (Token::Eq, 2),
            '!' if next == Some('=') => (Token::Ne, 2),
            '<' if next == Some('=') => (Token::Le, 2),
            '<' => (Token::Lt, 1),
            '>' if next == Some('=') => (Token::Ge, 2),
            '>' => (Token::Gt, 1),
            '/' if next == Some('/') => (Token::Alt, 2),
            '/' => (Token::Slash, 1),
            '+' => (Token::Plus, 1),
            '-' => (Token::Minus, 1),
            '*' => (Token::Star, 1),
            '%' => (Token::Percent, 1),
            c if c.is_ascii_digit() => {
                let (n, end) = read_number(&chars, i)?;
                tokens.push(Token::Num(n));
                i = end;
                continue;
            }
            c if is_ident_start(c) => {
                let (ident, end) = read_ident(&chars, i);
                tokens.push(Token::Ident(ident));
                i = end;
                continue;
            }
            other => {
                return Err(parse_err(format!(
                    "unexpected character {:?} at offset {}",
                    other, i
                )))
            }
        };
        tokens.push(token);
        i += width;
    }
    if !interpolations.is_empty() {
        return Err(parse_err("unterminated string interpolation"));
    }
    Ok(tokens)
}

fn read_ident(chars: &[char], start: usize) -> (String, usize) {
    let mut end = start;
    while end < chars.len() && is_ident_char(chars[end]) {
        end += 1;
    }
    (chars[start..end].iter().collect(), end)
}

fn read_number(chars: &[char], start: usize) -> StateResult<(f64, usize)> {
    let digits_from = |mut end: usize| {
        while end < chars.len() && chars[end].is_ascii_digit() {
            end += 1;
        }
        end
    };
    let mut end = digits_from(start);
    let digit_at = |idx: usize| chars.get(idx).map_or(false, |c| c.is_ascii_digit());
    if chars.get(end) == Some(&'.') && digit_at(end + 1) {
        end = digits_from(end + 1);
    }
    if matches!(chars.get(end), Some('e' | 'E')) {
        let mut exp = end + 1;
        if matches!(chars.get(exp), Some('+' | '-')) {
            exp += 1;
        }
        if digit_at(exp) {
            end = digits_from(exp);
        }
    }
    let text: String = chars[start..end].iter().collect();
    let n = text
        .parse::<f64>()
        .map_err(|_| parse_err(format!("invalid number {:?}", text)))?;
    Ok((n, end))
}

/// Reads string text from `start` up to the closing quote or the next `\(`; returns the
/// offset just past whichever ended the segment.
fn read_segment(chars: &[char], start: usize) -> StateResult<(String, usize, SegmentEnd)> {
    let mut out = String::new();
    let mut i = start;
    while i < chars.len() {
        match chars[i] {
            '"' => return Ok((out, i + 1, SegmentEnd::Quote)),
            '\\' => {
                let esc = chars
                    .get(i + 1)
                    .ok_or_else(|| parse_err("unterminated escape"))?;
                match esc {
                    '(' => return Ok((out, i + 2, SegmentEnd::Interpolation)),
                    '"' => out.push('"'),
                    '\\' => out.push('\\'),
                    '/' => out.push('/'),
                    'n' => out.push('\n'),
                    't' => out.push('\t'),
                    'r' => out.push('\r'),
                    'b' => out.push('\u{8}'),
                    'f' => out.push('\u{c}'),
                    'u' => {
                        let hex: String = chars.iter().skip(i + 2).take(4).collect();
                        let code = u32::from_str_radix(&hex, 16)
                            .ok()
                            .filter(|_| hex.len() == 4)
                            .and_then(char::from_u32)
                            .ok_or_else(|| {
                                parse_err(format!("invalid unicode escape \\u{}", hex))
                            })?;
                        out.push(code);
                        i += 4;
                    }
                    other => return Err(parse_err(format!("invalid escape \\{}", other))),
                }
                i += 2;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    Err(parse_err("unterminated string literal"))
}
