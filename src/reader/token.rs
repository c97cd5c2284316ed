//! Module for extracting micro-lang tokens from source text.

use std::fmt::{Display, Formatter};

use crate::data::{CellRef, Comparator, Integer};
use crate::reader::{ReadResult, SyntaxError, SyntaxErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Program,
    ProgramEnd,
    Write,
    Call,
    CallIf,
}

impl Keyword {
    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Program => "program",
            Keyword::ProgramEnd => "program-end",
            Keyword::Write => "write",
            Keyword::Call => "call",
            Keyword::CallIf => "call-if",
        }
    }
}

impl Display for Keyword {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A micro-lang token.
///
/// Whitespace and comments are ignored.
/// The Display form of a token is its lexeme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Keyword(Keyword),
    CellRef(CellRef),
    /// `:=`
    Assign,
    Comparator(Comparator),
    Comma,
    String(String),
    Integer(Integer),
    Identifier(String),
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Keyword(k) => k.fmt(f),
            Token::CellRef(c) => c.fmt(f),
            Token::Assign => f.write_str(":="),
            Token::Comparator(c) => c.fmt(f),
            Token::Comma => f.write_str(","),
            Token::String(s) => write!(f, "\"{s}\""),
            Token::Integer(i) => write!(f, "{i}"),
            Token::Identifier(s) => f.write_str(s),
        }
    }
}

/// A token along with its starting position in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenOffset {
    pub token: Token,
    pub line: usize,
    pub column: usize,
}

impl TokenOffset {
    fn new(line: usize, column: usize, token: Token) -> Self {
        // In useful output, lines and columns are 1-indexed
        TokenOffset {
            token,
            line: line + 1,
            column: column + 1,
        }
    }
}

impl From<TokenOffset> for Token {
    fn from(value: TokenOffset) -> Self {
        value.token
    }
}

/// Split the input into its constituent tokens.
pub fn tokenize(input: &str) -> ReadResult<Vec<TokenOffset>> {
    let input = strip_comments(input);
    let mut input = input.as_str();
    let mut result = Vec::new();

    // Line number (starting from 0 - fix it up when doing output)
    let mut line = 0;
    let mut column = 0;
    while !input.is_empty() {
        let next = get_next_token(input).map_err(|err| err.at_position(line + 1, column + 1))?;

        if let Some(token) = next.token {
            result.push(TokenOffset::new(line, column, token));
        }
        line += next.lines;
        if next.lines > 0 {
            column = next.columns
        } else {
            column += next.columns;
        }

        input = next.remainder;
    }

    Ok(result)
}

/// Drop everything from the first `;` of each line to the end of that line.
/// Line structure is kept so positions still point into the original text.
fn strip_comments(input: &str) -> String {
    input
        .split('\n')
        .map(|line| line.split_once(';').map(|(code, _)| code).unwrap_or(line))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Default)]
struct NextToken<'a> {
    // Token retrieved, if any.
    // None if only whitespace was consumed.
    token: Option<Token>,
    // Lines traversed in finding the token.
    lines: usize,
    // Columns in the final line traversed in finding the token.
    columns: usize,

    // Remaining string.
    remainder: &'a str,
}

mod regex {
    use regex::Regex;
    use std::sync::OnceLock;

    pub(super) fn space() -> &'static Regex {
        static SPACE: OnceLock<Regex> = OnceLock::new();
        SPACE.get_or_init(|| {
            Regex::new("\\A[[:space:]]+").expect("could not compile regex for empty space")
        })
    }

    pub(super) fn keyword() -> &'static Regex {
        static MATCH: OnceLock<Regex> = OnceLock::new();
        MATCH.get_or_init(|| {
            Regex::new(r#"\A(program-end|program|call-if|call|write)"#)
                .expect("could not compile regex for keyword")
        })
    }

    pub(super) fn cell_ref() -> &'static Regex {
        static MATCH: OnceLock<Regex> = OnceLock::new();
        MATCH.get_or_init(|| {
            Regex::new(r#"\A\[([0-9]+),([0-9]+)\]"#).expect("could not compile regex for cell")
        })
    }

    pub(super) fn operator() -> &'static Regex {
        static MATCH: OnceLock<Regex> = OnceLock::new();
        MATCH.get_or_init(|| {
            Regex::new(r#"\A(:=|<=|>=|=|<|>|,)"#).expect("could not compile regex for operator")
        })
    }

    pub(super) fn string() -> &'static Regex {
        static STRING: OnceLock<Regex> = OnceLock::new();
        STRING.get_or_init(|| {
            // No escapes: everything up to the next quote, newlines included.
            Regex::new(r#"\A"[^"]*""#).expect("could not compile regex for string")
        })
    }

    pub(super) fn integer() -> &'static Regex {
        static MATCH: OnceLock<Regex> = OnceLock::new();
        MATCH.get_or_init(|| Regex::new(r#"\A[0-9]+"#).expect("could not compile regex for integer"))
    }

    pub(super) fn identifier() -> &'static Regex {
        static MATCH: OnceLock<Regex> = OnceLock::new();
        MATCH.get_or_init(|| {
            Regex::new(r#"\A[A-Za-z_][A-Za-z0-9_]*"#)
                .expect("could not compile regex for identifier")
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum Lexeme {
    Keyword,
    CellRef,
    Operator,
    String,
    Integer,
    Identifier,
}

/// Returns the (line, column) that the cursor ends at, after following the given path,
/// assuming it started at (0, 0).
/// Tabs still count as a single column.
fn cursor_distance(s: &str) -> (usize, usize) {
    let line_count = s.matches('\n').count();
    let last_line_start = s.rfind('\n').map(|x| x + 1).unwrap_or(0);
    let column = s[last_line_start..].chars().count();
    (line_count, column)
}

/// Get the next token from the input, and return the remainder of the input.
fn get_next_token(input: &str) -> ReadResult<NextToken<'_>> {
    // Shouldn't bother calling if the remainder is none.
    assert!(!input.is_empty());

    if let Some(space) = regex::space().find(input) {
        let (lines, columns) = cursor_distance(space.as_str());
        return Ok(NextToken {
            token: None,
            lines,
            columns,
            remainder: &input[space.end()..],
        });
    }

    // Longest match wins; on a tie, the earlier pattern wins.
    // This is what makes "call" a keyword but "caller" an identifier.
    let candidates = [
        (Lexeme::Keyword, regex::keyword()),
        (Lexeme::CellRef, regex::cell_ref()),
        (Lexeme::Operator, regex::operator()),
        (Lexeme::String, regex::string()),
        (Lexeme::Integer, regex::integer()),
        (Lexeme::Identifier, regex::identifier()),
    ];
    let mut best: Option<(Lexeme, &str)> = None;
    for (lexeme, re) in candidates {
        if let Some(m) = re.find(input) {
            if best.map_or(true, |(_, s)| m.as_str().len() > s.len()) {
                best = Some((lexeme, m.as_str()));
            }
        }
    }

    let Some((lexeme, s)) = best else {
        let kind = match input.chars().next() {
            Some('"') => SyntaxErrorKind::UnterminatedString,
            Some(ch) => SyntaxErrorKind::UnrecognizedInput(ch.to_string()),
            None => unreachable!("input is nonempty"),
        };
        return Err(SyntaxError::new(kind));
    };

    let token = match lexeme {
        Lexeme::Keyword => Token::Keyword(match s {
            "program" => Keyword::Program,
            "program-end" => Keyword::ProgramEnd,
            "write" => Keyword::Write,
            "call" => Keyword::Call,
            "call-if" => Keyword::CallIf,
            _ => unreachable!("keyword regex matched {s:?}"),
        }),
        Lexeme::CellRef => {
            let caps = regex::cell_ref()
                .captures(s)
                .expect("internal error: cell reference matched once but not twice");
            let coordinate = |i: usize| {
                caps[i].parse::<usize>().map_err(|_| {
                    SyntaxError::new(SyntaxErrorKind::NumberOutOfRange(s.to_owned()))
                })
            };
            Token::CellRef(CellRef::new(coordinate(1)?, coordinate(2)?))
        }
        Lexeme::Operator => match s {
            ":=" => Token::Assign,
            "," => Token::Comma,
            _ => Token::Comparator(
                s.parse()
                    .expect("internal error: operator regex matched a non-comparator"),
            ),
        },
        // Strings may span lines.
        Lexeme::String => {
            let (lines, columns) = cursor_distance(s);
            return Ok(NextToken {
                token: Some(Token::String(s[1..s.len() - 1].to_owned())),
                lines,
                columns,
                remainder: &input[s.len()..],
            });
        }
        Lexeme::Integer => Token::Integer(s.parse().map_err(|_| {
            SyntaxError::new(SyntaxErrorKind::NumberOutOfRange(s.to_owned()))
        })?),
        Lexeme::Identifier => Token::Identifier(s.to_owned()),
    };

    Ok(NextToken {
        token: Some(token),
        lines: 0,
        columns: s.chars().count(),
        remainder: &input[s.len()..],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> ReadResult<Vec<Token>> {
        Ok(tokenize(input)?.into_iter().map(Token::from).collect())
    }

    #[test]
    fn comment_is_dropped() -> ReadResult<()> {
        let output = tokens("write [1,1] := 1 ; ignored := [2,2]")?;
        let want = vec![
            Token::Keyword(Keyword::Write),
            Token::CellRef(CellRef::new(1, 1)),
            Token::Assign,
            Token::Integer(1),
        ];
        assert_eq!(output, want);
        Ok(())
    }

    #[test]
    fn tokenize_program() -> ReadResult<()> {
        let input = r#"
        program main ; entry
            write [0,12] := "hello world"
            call-if [1,1] >= 10, done_
            call other
        program-end
        "#;
        let output = tokens(input)?;

        let want = &[
            Token::Keyword(Keyword::Program),
            Token::Identifier("main".to_owned()),
            Token::Keyword(Keyword::Write),
            Token::CellRef(CellRef::new(0, 12)),
            Token::Assign,
            Token::String("hello world".to_owned()),
            Token::Keyword(Keyword::CallIf),
            Token::CellRef(CellRef::new(1, 1)),
            Token::Comparator(Comparator::Ge),
            Token::Integer(10),
            Token::Comma,
            Token::Identifier("done_".to_owned()),
            Token::Keyword(Keyword::Call),
            Token::Identifier("other".to_owned()),
            Token::Keyword(Keyword::ProgramEnd),
        ];

        assert_eq!(output.len(), want.len());

        for ((i, got), want) in output.iter().enumerate().zip(want.iter()) {
            assert_eq!(got, want, "unexpected token in case {}", i);
        }
        Ok(())
    }

    #[test]
    fn operators() -> ReadResult<()> {
        let output = tokens("<= >= = < > := ,")?;
        let want = vec![
            Token::Comparator(Comparator::Le),
            Token::Comparator(Comparator::Ge),
            Token::Comparator(Comparator::Eq),
            Token::Comparator(Comparator::Lt),
            Token::Comparator(Comparator::Gt),
            Token::Assign,
            Token::Comma,
        ];
        assert_eq!(output, want);

        // No whitespace needed between tokens.
        let output = tokens("[1,2]<=3,x")?;
        assert_eq!(
            output,
            vec![
                Token::CellRef(CellRef::new(1, 2)),
                Token::Comparator(Comparator::Le),
                Token::Integer(3),
                Token::Comma,
                Token::Identifier("x".to_owned()),
            ]
        );
        Ok(())
    }

    #[test]
    fn longest_match() -> ReadResult<()> {
        let output = tokens("programs program-end caller call-if writer call_if")?;
        let want = vec![
            Token::Identifier("programs".to_owned()),
            Token::Keyword(Keyword::ProgramEnd),
            Token::Identifier("caller".to_owned()),
            Token::Keyword(Keyword::CallIf),
            Token::Identifier("writer".to_owned()),
            Token::Identifier("call_if".to_owned()),
        ];
        assert_eq!(output, want);
        Ok(())
    }

    #[test]
    fn semicolon_in_string_starts_comment() {
        let err = tokenize("write [1,1] := \"a;b\"").unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::UnterminatedString);
        assert_eq!(err.location, Some((1, 16)));
    }

    #[test]
    fn positions() -> ReadResult<()> {
        let output = tokenize("program P\n  write [1,1]\t:= \"two\nlines\" x")?;
        let positions: Vec<(usize, usize)> =
            output.iter().map(|t| (t.line, t.column)).collect();
        assert_eq!(
            positions,
            vec![(1, 1), (1, 9), (2, 3), (2, 9), (2, 15), (2, 18), (3, 8)]
        );
        Ok(())
    }

    #[test]
    fn error_on_unrecognized_character() {
        let err = tokenize("program P\n  write [1,1] := 1 + 2").unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::UnrecognizedInput("+".to_owned()));
        assert_eq!(err.location, Some((2, 20)));

        // Spaces inside a cell reference are not allowed.
        let err = tokenize("[1, 1]").unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::UnrecognizedInput("[".to_owned()));
    }

    #[test]
    fn error_on_huge_numbers() {
        let err = tokenize("99999999999999999999").unwrap_err();
        assert_eq!(
            err.kind,
            SyntaxErrorKind::NumberOutOfRange("99999999999999999999".to_owned())
        );
        let err = tokenize("[99999999999999999999999,0]").unwrap_err();
        assert!(matches!(err.kind, SyntaxErrorKind::NumberOutOfRange(_)));
    }

    #[test]
    fn empty_input() -> ReadResult<()> {
        assert!(tokens("")?.is_empty());
        assert!(tokens("  \n ; only a comment\n")?.is_empty());
        Ok(())
    }

    #[test]
    fn lexemes_round_trip() -> ReadResult<()> {
        let input = "call-if [3,4] <= \"x\", y";
        let output = tokens(input)?;
        let rendered: Vec<String> = output.iter().map(|t| t.to_string()).collect();
        assert_eq!(rendered, vec!["call-if", "[3,4]", "<=", "\"x\"", ",", "y"]);
        Ok(())
    }
}
